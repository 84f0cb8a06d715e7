use std::fmt;

use serde::{Deserialize, Serialize};

/// Key used to address one member across the remote source and the row store.
///
/// A member first seen on the remote roster starts with an [`Identity::Alias`];
/// one referenced through an external account link starts with
/// [`Identity::Linked`].  When both become known they must address the same
/// row.  An empty linked id means "unlinked" and never keys a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// Public alias on the remote scoreboard.
    Alias(String),
    /// Linked external account id.
    Linked(String),
}

impl Identity {
    pub fn alias(&self) -> Option<&str> {
        match self {
            Identity::Alias(alias) => Some(alias),
            Identity::Linked(_) => None,
        }
    }

    pub fn linked(&self) -> Option<&str> {
        match self {
            Identity::Alias(_) => None,
            Identity::Linked(id) => Some(id),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Alias(alias) => write!(f, "alias:{alias}"),
            Identity::Linked(id) => write!(f, "linked:{id}"),
        }
    }
}
