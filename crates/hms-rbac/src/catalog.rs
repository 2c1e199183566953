//! # Resource catalog
//!
//! The catalog of protected resources: pages, menus, buttons and field
//! groups, each identified by a stable dot-hierarchical code. The hierarchy
//! is carried by `parent_code` links only; code prefixes are not guaranteed
//! to encode it.
//!
//! The catalog is loaded from persistent storage and is read-mostly. Only
//! active rows participate in resolution; deactivating a resource hides it
//! from every future resolution while leaving existing grants in place, so
//! reactivation restores prior behavior.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::actions::Action;

/// Category a resource belongs to.
///
/// Admin-category resources are only ever resolved for super admins; hospital
/// staff never see them regardless of stored grants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Hospital-facing functionality (patients, appointments, billing).
    Hospital,
    /// Platform administration (tenants, subscriptions, catalog editing).
    Admin,
}

impl ResourceCategory {
    /// Get the string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Hospital => "hospital",
            ResourceCategory::Admin => "admin",
        }
    }
}

/// UI element kind a resource code maps to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Top-level navigation entry.
    Menu,
    /// Routed page.
    Page,
    /// Action button within a page.
    Button,
    /// Tab within a page.
    Tab,
}

/// A field exposed by a resource for view/edit gating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceField {
    /// Stable field code (e.g. "diagnosis", "insurance_number").
    pub field_code: String,
    /// Field data type hint for the admin UI.
    pub field_type: String,
}

/// A protected resource.
///
/// Resources are soft-deactivated, never hard-deleted while grants reference
/// them, and codes are never reused after retirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource ID (referenced by grant rows).
    pub id: Uuid,

    /// Stable dot-hierarchical code (e.g. "hospital.patients.detail").
    pub code: String,

    /// Human-readable name.
    pub name: String,

    /// Category (hospital or admin).
    pub category: ResourceCategory,

    /// Parent resource code; `None` for roots.
    pub parent_code: Option<String>,

    /// Ordering among siblings.
    pub sort_order: i32,

    /// UI element kind.
    pub element_type: ElementType,

    /// Whether the resource participates in resolution.
    pub is_active: bool,

    /// Actions this resource supports. Grants must stay within this set.
    pub actions: Vec<Action>,

    /// Fields exposed for field-level gating.
    #[serde(default)]
    pub fields: Vec<ResourceField>,
}

impl Resource {
    /// Creates an active resource with no parent, no fields and all actions.
    ///
    /// # Arguments
    ///
    /// * `code` - Stable resource code
    /// * `name` - Display name
    /// * `category` - Resource category
    pub fn new(code: impl Into<String>, name: impl Into<String>, category: ResourceCategory) -> Self {
        Self {
            id: Uuid::now_v7(),
            code: code.into(),
            name: name.into(),
            category,
            parent_code: None,
            sort_order: 0,
            element_type: ElementType::Page,
            is_active: true,
            actions: Action::all(),
            fields: Vec::new(),
        }
    }

    /// Set the parent code.
    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Set the sibling sort order.
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Set the UI element kind.
    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Restrict the supported actions.
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Declare gated fields.
    pub fn with_fields(mut self, fields: Vec<ResourceField>) -> Self {
        self.fields = fields;
        self
    }

    /// Check if the resource declares support for an action.
    pub fn supports(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// A node in the assembled resource tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    /// The resource at this node.
    pub resource: Resource,
    /// Direct children, ordered by `sort_order`.
    pub children: Vec<ResourceNode>,
}

impl ResourceNode {
    /// Check if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Find a descendant node (or self) by code.
    pub fn find(&self, code: &str) -> Option<&ResourceNode> {
        if self.resource.code == code {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(code))
    }
}

/// In-memory catalog of active resources, indexed by code, with the
/// parent/child tree assembled per category.
///
/// # Examples
///
/// ```
/// use hms_rbac::catalog::{Catalog, Resource, ResourceCategory};
///
/// let parent = Resource::new("hospital.patients", "Patients", ResourceCategory::Hospital);
/// let child = Resource::new("hospital.patients.detail", "Patient Detail", ResourceCategory::Hospital)
///     .with_parent("hospital.patients");
///
/// let catalog = Catalog::from_resources(vec![parent, child]);
/// assert_eq!(catalog.active().len(), 2);
/// assert_eq!(catalog.tree(ResourceCategory::Hospital).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    by_code: HashMap<String, Resource>,
    roots: Vec<ResourceNode>,
}

impl Catalog {
    /// Build a catalog from raw resource rows.
    ///
    /// Inactive rows are dropped. Rows whose `parent_code` does not name an
    /// active resource are treated as roots, so a deactivated parent does not
    /// silently hide its active children.
    pub fn from_resources(resources: Vec<Resource>) -> Self {
        let by_code: HashMap<String, Resource> = resources
            .into_iter()
            .filter(|r| r.is_active)
            .map(|r| (r.code.clone(), r))
            .collect();

        fn build(
            resource: &Resource,
            children_of: &HashMap<Option<String>, Vec<&Resource>>,
        ) -> ResourceNode {
            let children = children_of
                .get(&Some(resource.code.clone()))
                .map(|kids| kids.iter().map(|kid| build(kid, children_of)).collect())
                .unwrap_or_default();
            ResourceNode {
                resource: resource.clone(),
                children,
            }
        }

        let roots = {
            // Group children under their parent, keeping sibling order stable.
            let mut children_of: HashMap<Option<String>, Vec<&Resource>> = HashMap::new();
            for resource in by_code.values() {
                let parent = match &resource.parent_code {
                    Some(code) if by_code.contains_key(code) => Some(code.clone()),
                    _ => None,
                };
                children_of.entry(parent).or_default().push(resource);
            }
            for siblings in children_of.values_mut() {
                siblings.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.code.cmp(&b.code)));
            }

            children_of
                .get(&None)
                .map(|roots| roots.iter().map(|root| build(root, &children_of)).collect())
                .unwrap_or_default()
        };

        Self { by_code, roots }
    }

    /// Flat list of active resources, ordered by code for stable output.
    pub fn active(&self) -> Vec<&Resource> {
        let ordered: BTreeMap<&String, &Resource> =
            self.by_code.iter().map(|(code, r)| (code, r)).collect();
        ordered.into_values().collect()
    }

    /// Look up an active resource by code.
    pub fn get(&self, code: &str) -> Option<&Resource> {
        self.by_code.get(code)
    }

    /// Root-to-leaf tree for one category.
    pub fn tree(&self, category: ResourceCategory) -> Vec<&ResourceNode> {
        self.roots
            .iter()
            .filter(|node| node.resource.category == category)
            .collect()
    }

    /// Find the subtree rooted at a code, across both categories.
    pub fn node(&self, code: &str) -> Option<&ResourceNode> {
        self.roots.iter().find_map(|root| root.find(code))
    }

    /// Number of active resources.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Check if the catalog has no active resources.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
