//! Typed reads over a sheet.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tillbook_store::{RowKey, Sheet, TabularStore};

use crate::CommerceError;

/// A typed row together with its store identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyed<T> {
    /// Stable row key.
    pub key: RowKey,
    /// Position at read time.
    pub position: usize,
    /// The row's contents.
    #[serde(flatten)]
    pub value: T,
}

/// Read every row of a sheet as `T`.
///
/// A row that fails to deserialize fails the whole read.
pub(crate) async fn read_sheet<T, S>(store: &S, sheet: Sheet) -> Result<Vec<Keyed<T>>, CommerceError>
where
    T: DeserializeOwned,
    S: TabularStore + ?Sized,
{
    store
        .read_all(sheet)
        .await?
        .into_iter()
        .map(|row| {
            let value = row.deserialize::<T>().map_err(|e| {
                CommerceError::Serialization(format!("{sheet} row {}: {e}", row.key))
            })?;
            Ok(Keyed {
                key: row.key,
                position: row.position,
                value,
            })
        })
        .collect()
}

/// Deserializers for cells that may be blank.
pub(crate) mod cells {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// An RFC 3339 timestamp, or `None` for an empty cell.
    pub fn optional_timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }

    /// Text, with an empty cell read as `None`.
    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()))
    }
}
