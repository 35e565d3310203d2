//! Newtype identifiers.
//!
//! Transaction and shopping batch identifiers are generated once per
//! checkout (or purchase batch) and shared by every row it writes:
//! `<prefix>-<BASE36 millisecond timestamp>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A string identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
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
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(TransactionId);
define_id!(ShoppingBatchId);

impl TransactionId {
    /// Generate a fresh transaction id, e.g. `RTN-M2K9Q1ZB`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, to_base36(next_stamp())))
    }
}

impl ShoppingBatchId {
    /// Generate a fresh batch id, e.g. `RTN-SHOP-M2K9Q1ZB`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-SHOP-{}", prefix, to_base36(next_stamp())))
    }
}

/// Millisecond timestamp, bumped so that no two calls in this process
/// return the same value.
fn next_stamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Upper-case base36 rendering.
fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
