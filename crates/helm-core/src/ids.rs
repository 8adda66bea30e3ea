//! Branded ID newtypes.
//!
//! Sessions, runs, and gateway connections each get a distinct ID type
//! implemented as a newtype wrapper around `String`, so a run ID can never be
//! passed where a session ID is expected. Generated IDs are UUID v7
//! (time-ordered); caller-supplied IDs are accepted verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

branded_id! {
    /// Identifies a session (a durable conversation transcript).
    SessionId
}

branded_id! {
    /// Identifies one run of the agent loop.
    RunId
}

branded_id! {
    /// Identifies one gateway client connection.
    ConnectionId
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn new_ids_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(RunId::new().into_inner()));
        }
    }

    #[test]
    fn generated_ids_are_uuids() {
        let id = SessionId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = RunId::new();
        // v7 orders by millisecond timestamp; step past the current one
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RunId::new();
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn from_str_preserves_value() {
        let id = SessionId::from("main");
        assert_eq!(id.as_str(), "main");
        assert_eq!(id.to_string(), "main");
    }

    #[test]
    fn serde_is_transparent() {
        let id = RunId::from("run_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"run_1\"");
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deref_to_str() {
        let id = ConnectionId::from("conn_9");
        assert!(id.starts_with("conn"));
    }
}
