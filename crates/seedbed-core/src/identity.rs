use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role supplied by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Member,
    Moderator,
    Operator,
    Admin,
}

impl Role {
    /// Operator-level roles may mutate fixtures.
    pub fn is_operator(self) -> bool {
        self >= Role::Operator
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "member" => Ok(Role::Member),
            "moderator" => Ok(Role::Moderator),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Viewer => "viewer",
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Operator => "operator",
            Role::Admin => "admin",
        };
        f.write_str(label)
    }
}

/// Opaque "current identity + role" fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
}

impl Identity {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            role,
        }
    }
}
