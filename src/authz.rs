// src/authz.rs
use std::fmt;

use crate::error::PollError;
use crate::identity::{Identity, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Owners may update and delete. Admins may only delete.
///
/// Callers must have confirmed the resource exists before asking.
pub fn authorize(actor: &Identity, resource_owner: &str, action: Action) -> Result<(), PollError> {
    let is_owner = actor.id == resource_owner;
    let admin_delete = action == Action::Delete && actor.role == Role::Admin;

    if is_owner || admin_delete {
        Ok(())
    } else {
        Err(PollError::Authorization(format!(
            "Forbidden: you are not allowed to {action} this poll"
        )))
    }
}
