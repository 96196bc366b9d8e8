use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

/// One logged meal, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub id: String,         // opaque, display identity only
    pub image: String,      // data URI of the captured photo
    pub calories: u32,      // estimate in kcal
    pub created_at: String, // RFC 3339, kept verbatim
}

impl MealRecord {
    /// Stamps a new record with a fresh id and `created_at` in UTC.
    pub fn new(
        image: String,
        calories: u32,
        created_at: OffsetDateTime,
    ) -> Result<Self, time::error::Format> {
        let created_at = created_at.to_offset(UtcOffset::UTC).format(&Rfc3339)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            image,
            calories,
            created_at,
        })
    }

    /// `None` when the stored timestamp is not valid RFC 3339.
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.created_at, &Rfc3339).ok()
    }

    pub fn local_day(&self, offset: UtcOffset) -> Option<Date> {
        self.created_at().map(|t| t.to_offset(offset).date())
    }

    /// `HH:MM` in the given offset.
    pub fn local_time(&self, offset: UtcOffset) -> Option<String> {
        let fmt = format_description!("[hour]:[minute]");
        self.created_at()
            .and_then(|t| t.to_offset(offset).time().format(fmt).ok())
    }
}

/// Immutable point-in-time view of the ledger, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(Arc<[MealRecord]>);

impl Snapshot {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// New snapshot with `record` in front of every existing record.
    pub fn prepend(&self, record: MealRecord) -> Self {
        let mut records = Vec::with_capacity(self.0.len() + 1);
        records.push(record);
        records.extend(self.0.iter().cloned());
        Self(Arc::from(records))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<MealRecord>> for Snapshot {
    fn from(records: Vec<MealRecord>) -> Self {
        Self(Arc::from(records))
    }
}

impl Deref for Snapshot {
    type Target = [MealRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}
