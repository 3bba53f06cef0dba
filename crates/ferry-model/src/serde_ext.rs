//! Serde helpers for gateway payloads.

use serde::{Deserialize, Deserializer};

/// Deserialize a value that may be JSON `null`, mapping `null` to `T::default()`.
///
/// Pair with `#[serde(default)]` so that absent fields behave the same way.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
