//! Entity identifiers
//!
//! Ids are UUIDs. Locally created entities get a time-sortable v7 id; ids
//! received from the remote are accepted in any UUID version. Identity is
//! always by id equality, so the same id on both sides names the same record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique ID using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

entity_id!(
    /// Identifier of a project
    ProjectId
);
entity_id!(
    /// Identifier of a task
    TaskId
);
entity_id!(
    /// Identifier of a time entry
    TimeEntryId
);
entity_id!(
    /// Identifier of the local active timer session
    TimerSessionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ProjectId::new(), ProjectId::new());
        assert_ne!(TimeEntryId::new(), TimeEntryId::new());
    }

    #[test]
    fn parse_roundtrip_and_trim() {
        let id = TaskId::new();
        let parsed: TaskId = format!("  {id} ").parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn accepts_v4_ids_from_remote() {
        let parsed: ProjectId = "0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11".parse().unwrap();
        assert_eq!(parsed.as_str(), "0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: ProjectId = "0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0b5d7f0c-7c1e-4a52-9a57-2f6d2b0c9d11\"");
    }
}
