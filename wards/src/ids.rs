//! Strongly-typed identifiers so organization, team, employee and policy ids
//! cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Organization (tenant) identifier.
    OrganizationId
);
string_id!(
    /// Team identifier.
    TeamId
);
string_id!(
    /// Employee identifier. Managers and actors are employees too.
    EmployeeId
);
string_id!(
    /// Policy identifier.
    PolicyId
);
string_id!(
    /// Assignment identifier.
    AssignmentId
);
string_id!(
    /// Time entry identifier, used to key approval requests.
    TimeEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(PolicyId::generate(), PolicyId::generate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TeamId::from("team-a");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"team-a\"");
        assert_eq!(id.to_string(), "team-a");
    }
}
