//! Deletion Actions
//!
//! What the deletion walk does with the rows of each element type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DbmsError, Result};
use crate::map::XmlName;

/// Action for the rows of one element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Delete; every failure aborts the walk
    Delete,
    /// Attempt to delete; constraint violations become warnings
    SoftDelete,
    /// Leave the rows alone but still visit their descendants
    None,
}

impl FromStr for Action {
    type Err = DbmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(|c: char| c == '_' || c == '-', "").as_str() {
            "delete" => Ok(Action::Delete),
            "softdelete" => Ok(Action::SoftDelete),
            "none" => Ok(Action::None),
            _ => Err(DbmsError::NoAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Delete => "Delete",
            Action::SoftDelete => "SoftDelete",
            Action::None => "None",
        })
    }
}

/// Actions per element type, with an optional default
#[derive(Debug, Clone, Default)]
pub struct Actions {
    default: Option<Action>,
    by_element: HashMap<String, Action>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same action for every element type
    pub fn all(action: Action) -> Self {
        Self::new().with_default(action)
    }

    pub fn with_default(mut self, action: Action) -> Self {
        self.default = Some(action);
        self
    }

    pub fn with_action(mut self, element_type: &XmlName, action: Action) -> Self {
        self.by_element.insert(element_type.qualified(), action);
        self
    }

    /// Action governing `element_type`
    pub fn action_for(&self, element_type: &XmlName) -> Result<Action> {
        self.by_element
            .get(&element_type.qualified())
            .copied()
            .or(self.default)
            .ok_or_else(|| DbmsError::NoAction(element_type.qualified()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_lookup() {
        let order = XmlName::new("Order");
        let line = XmlName::new("Line");

        let actions = Actions::new().with_action(&order, Action::SoftDelete);
        assert_eq!(actions.action_for(&order).unwrap(), Action::SoftDelete);
        assert!(matches!(actions.action_for(&line), Err(DbmsError::NoAction(ref n)) if n == "Line"));

        let actions = actions.with_default(Action::None);
        assert_eq!(actions.action_for(&line).unwrap(), Action::None);
        assert_eq!(Actions::all(Action::Delete).action_for(&order).unwrap(), Action::Delete);
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("SOFT_DELETE".parse::<Action>().unwrap(), Action::SoftDelete);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        assert!("drop".parse::<Action>().is_err());
    }
}
