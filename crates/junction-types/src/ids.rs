//! Type-safe identifiers for vehicles and junctions.
//!
//! Vehicles get a UUID v7 (time-ordered) so that sorting by id roughly
//! follows arrival order. Junctions are named by a short operator-chosen
//! label (the reference deployment has a single junction called `A`).

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Maximum length of a junction label.
const MAX_JUNCTION_LABEL_LEN: usize = 32;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a vehicle admitted to a lane queue.
    VehicleId
}

/// A junction label was empty, too long, or contained unsupported characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid junction id {label:?}: {reason}")]
pub struct InvalidJunctionIdError {
    /// The rejected label.
    pub label: String,
    /// What is wrong with it.
    pub reason: &'static str,
}

/// Identifier of a junction (an independently scheduled intersection).
///
/// Labels are 1 to 32 characters of ASCII letters, digits, `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JunctionId(String);

impl JunctionId {
    /// Validate and wrap a junction label.
    ///
    /// Surrounding whitespace is trimmed before validation.
    pub fn new(label: &str) -> Result<Self, InvalidJunctionIdError> {
        let trimmed = label.trim();
        let reject = |reason| InvalidJunctionIdError {
            label: label.to_owned(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(reject("label is empty"));
        }
        if trimmed.len() > MAX_JUNCTION_LABEL_LEN {
            return Err(reject("label is longer than 32 characters"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(reject("only ASCII letters, digits, '-' and '_' are allowed"));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Return the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JunctionId {
    type Err = InvalidJunctionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl core::fmt::Display for JunctionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
