//! # Actions
//!
//! Defines the fixed set of actions that can be performed on catalog
//! resources. Every grant row stores a subset of these, and every resource
//! declares which of them it supports.

use serde::{Deserialize, Serialize};

/// Actions that can be performed on resources.
///
/// The action set is deliberately small and closed:
/// - **View**: read resource data (pages, lists, detail screens)
/// - **Add**: create new records under the resource
/// - **Edit**: modify existing records
/// - **Delete**: remove records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// View/read resource data.
    View,

    /// Create new records.
    Add,

    /// Modify existing records.
    Edit,

    /// Remove records.
    Delete,
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, supports aliases)
    ///
    /// # Returns
    ///
    /// `Some(Action)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use hms_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("view"), Some(Action::View));
    /// assert_eq!(Action::parse("read"), Some(Action::View)); // Alias
    /// assert_eq!(Action::parse("update"), Some(Action::Edit)); // Alias
    /// assert_eq!(Action::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "read" | "get" => Some(Action::View),
            "add" | "create" | "new" => Some(Action::Add),
            "edit" | "update" | "write" | "modify" => Some(Action::Edit),
            "delete" | "remove" | "destroy" => Some(Action::Delete),
            _ => None,
        }
    }

    /// Get all actions.
    pub fn all() -> Vec<Self> {
        vec![Action::View, Action::Add, Action::Edit, Action::Delete]
    }

    /// Check if this is a write action.
    ///
    /// Write actions modify records; field-level checks gate them against
    /// the `editable` field list rather than `viewable`.
    pub fn is_write(&self) -> bool {
        matches!(self, Action::Add | Action::Edit | Action::Delete)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
