use serde::{Deserialize, Serialize};

/// Identifier assigned by the order store when an order row is inserted.
///
/// This is the authoritative identity of an order. The CRM only ever sees it
/// through [`OrderId::label`], which is used for human correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Wraps a raw store sequence value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw store sequence value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Returns the external correlation label, e.g. `#42`.
    pub fn label(&self) -> String {
        format!("#{}", self.0)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an identifier returned by the CRM.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

remote_id!(
    /// Identifier the CRM assigns to a deal.
    DealId
);

remote_id!(
    /// Identifier the CRM assigns to a vehicle record.
    VehicleId
);
