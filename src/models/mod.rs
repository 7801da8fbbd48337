pub mod gallery;
pub mod passkey;
pub mod photo;
pub mod session;
pub mod user;

pub use gallery::*;
pub use passkey::*;
pub use photo::*;
pub use session::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
