//! String identifiers used across the engine.
//!
//! Each id is a distinct newtype so an actor id can never be passed where a
//! control id is expected. All of them borrow as `str` for map lookups.

use std::{borrow::Borrow, fmt};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// The user clicking a control.
    ActorId
);

string_id!(
    /// Unique id of a clickable control. Unique across an entire action
    /// tree, nested choices included.
    ControlId
);

string_id!(
    /// Exclusive resource group. At most one actor may hold a group at a
    /// time.
    GroupId
);

string_id!(
    /// Render-surface message owned by a room.
    MessageId
);
