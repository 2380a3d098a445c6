//! Participant roles.
//!
//! Roles are claims supplied by the identity provider; relief-grid trusts
//! them as given and uses them only for gating transitions and resource
//! mutations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a participant acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A citizen reporting or following disasters.
    User,
    /// A registered volunteer.
    Volunteer,
    /// A first responder.
    FirstResponder,
    /// A government agent.
    Government,
}

impl Role {
    /// The wire form of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Volunteer => "volunteer",
            Self::FirstResponder => "first_responder",
            Self::Government => "government",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for unknown role strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "volunteer" => Ok(Self::Volunteer),
            "first_responder" => Ok(Self::FirstResponder),
            "government" => Ok(Self::Government),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip() {
        for role in [
            Role::User,
            Role::Volunteer,
            Role::FirstResponder,
            Role::Government,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&Role::FirstResponder).unwrap();
        assert_eq!(json, "\"first_responder\"");
    }
}
