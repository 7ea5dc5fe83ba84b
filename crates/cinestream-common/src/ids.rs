//! Typed ID wrappers for type safety across cinestream.
//!
//! Entities live in SQLite tables keyed by `INTEGER PRIMARY KEY`, so each ID
//! is a newtype over the row id. Clients historically send ids either as
//! JSON numbers or as numeric strings; both deserialize.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// Generate a newtype ID wrapper over an `i64` row id.
///
/// The macro produces a struct with:
/// - `get()` to read the inner row id
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Serialize`
/// - a lenient `Deserialize` accepting numbers and numeric strings
/// - `Display` and `FromStr` delegating to the inner integer
/// - `From<i64>` and `Into<i64>` conversions
macro_rules! row_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
            #[serde(transparent)]
            pub struct $name(i64);

            impl $name {
                /// Return the inner row id.
                #[must_use]
                pub fn get(&self) -> i64 {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                    s.trim().parse::<i64>().map(Self)
                }
            }

            impl From<i64> for $name {
                fn from(id: i64) -> Self {
                    Self(id)
                }
            }

            impl From<$name> for i64 {
                fn from(id: $name) -> Self {
                    id.0
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    match RawId::deserialize(deserializer)? {
                        RawId::Number(n) => Ok(Self(n)),
                        RawId::Text(s) => s.parse().map_err(serde::de::Error::custom),
                    }
                }
            }
        )+
    };
}

row_id! {
    /// Identifier of a movie record.
    MovieId,
    /// Identifier of a user account.
    UserId,
    /// Identifier of a forum thread.
    ForumId,
    /// Identifier of a forum comment.
    CommentId,
    /// Identifier of a direct message.
    MessageId,
}
