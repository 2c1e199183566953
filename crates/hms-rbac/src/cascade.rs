//! # Tree cascade
//!
//! Tri-state aggregation over the resource tree and parent-to-descendant
//! cascade of grant edits. Both are pure tree traversals: the check-state
//! computation reads a set of granted leaf codes, and the cascade returns
//! the list of writes to perform instead of mutating anything, so the
//! persistence layer stays out of the algorithm.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::actions::Action;
use crate::catalog::ResourceNode;

/// Aggregate grant state of a subtree for one action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Every descendant leaf has the action granted.
    Checked,
    /// No descendant leaf has the action granted.
    Unchecked,
    /// Some, but not all, descendant leaves have the action granted.
    Indeterminate,
}

/// One upsert the persistence layer must perform after a cascade toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeWrite {
    /// Resource the write targets.
    pub resource_id: Uuid,
    /// Resource code, for cache keys and logging.
    pub resource_code: String,
    /// The action being toggled.
    pub action: Action,
    /// Whether the action is being granted or revoked.
    pub enabled: bool,
}

/// Compute the tri-state value of a node for one action.
///
/// Leaves report `Checked`/`Unchecked` from the granted set directly;
/// interior nodes aggregate their children bottom-up.
///
/// # Arguments
///
/// * `node` - Subtree root
/// * `action` - Action being inspected
/// * `granted_codes` - Codes of resources whose resolved grant allows the action
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use hms_rbac::actions::Action;
/// use hms_rbac::cascade::{compute_check_state, CheckState};
/// use hms_rbac::catalog::{Catalog, Resource, ResourceCategory};
///
/// let parent = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
/// let leaf = Resource::new("hospital.patients.list", "List", ResourceCategory::Hospital)
///     .with_parent("hospital.patients");
/// let catalog = Catalog::from_resources(vec![parent, leaf]);
///
/// let granted: HashSet<String> = ["hospital.patients.list".to_string()].into();
/// let node = catalog.node("hospital.patients").unwrap();
/// assert_eq!(compute_check_state(node, Action::View, &granted), CheckState::Checked);
/// ```
pub fn compute_check_state(
    node: &ResourceNode,
    action: Action,
    granted_codes: &HashSet<String>,
) -> CheckState {
    if node.is_leaf() {
        return if granted_codes.contains(&node.resource.code) {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        };
    }

    let mut any_checked = false;
    let mut any_unchecked = false;
    for child in &node.children {
        match compute_check_state(child, action, granted_codes) {
            CheckState::Checked => any_checked = true,
            CheckState::Unchecked => any_unchecked = true,
            CheckState::Indeterminate => return CheckState::Indeterminate,
        }
        if any_checked && any_unchecked {
            return CheckState::Indeterminate;
        }
    }

    if any_checked {
        CheckState::Checked
    } else {
        CheckState::Unchecked
    }
}

/// Compute the writes for toggling an action on a node and its descendants.
///
/// Toggling a non-leaf node sets the action on the node itself and on every
/// descendant; one write per affected resource, in pre-order. Nothing is
/// persisted here; the caller applies the writes (sequentially, each with
/// its own cache invalidation).
pub fn cascade_toggle(node: &ResourceNode, action: Action, enabled: bool) -> Vec<CascadeWrite> {
    let mut writes = Vec::new();
    collect_writes(node, action, enabled, &mut writes);
    writes
}

fn collect_writes(node: &ResourceNode, action: Action, enabled: bool, out: &mut Vec<CascadeWrite>) {
    out.push(CascadeWrite {
        resource_id: node.resource.id,
        resource_code: node.resource.code.clone(),
        action,
        enabled,
    });
    for child in &node.children {
        collect_writes(child, action, enabled, out);
    }
}
