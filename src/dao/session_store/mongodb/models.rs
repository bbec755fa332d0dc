use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{dao::models::SessionEntity, state::session::SessionStatus};

use super::error::MongoDaoError;

/// Session record as laid out in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    status: SessionStatus,
    current_level_index: i64,
    level_start_time: Option<DateTime>,
    #[serde(default)]
    registration_closed: bool,
    #[serde(default)]
    entries: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            status: value.status,
            current_level_index: value.current_level_index as i64,
            level_start_time: value.level_start_time.map(to_bson),
            registration_closed: value.registration_closed,
            entries: i64::from(value.entries),
            created_at: to_bson(value.created_at),
            updated_at: to_bson(value.updated_at),
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        let corrupted = |reason: String| MongoDaoError::Corrupted {
            id: value.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&value.id).map_err(|err| corrupted(err.to_string()))?;
        let current_level_index = usize::try_from(value.current_level_index)
            .map_err(|_| corrupted(format!("negative level index {}", value.current_level_index)))?;
        let entries = u32::try_from(value.entries)
            .map_err(|_| corrupted(format!("entry count {} out of range", value.entries)))?;
        let level_start_time = value
            .level_start_time
            .map(from_bson)
            .transpose()
            .map_err(&corrupted)?;

        Ok(Self {
            id,
            name: value.name.clone(),
            status: value.status,
            current_level_index,
            level_start_time,
            registration_closed: value.registration_closed,
            entries,
            created_at: from_bson(value.created_at).map_err(&corrupted)?,
            updated_at: from_bson(value.updated_at).map_err(&corrupted)?,
        })
    }
}

fn to_bson(instant: OffsetDateTime) -> DateTime {
    DateTime::from_millis((instant.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn from_bson(instant: DateTime) -> Result<OffsetDateTime, String> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(instant.timestamp_millis()) * 1_000_000)
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> SessionEntity {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        SessionEntity {
            id: Uuid::new_v4(),
            name: "Sunday main".into(),
            status: SessionStatus::Active,
            current_level_index: 4,
            level_start_time: Some(now),
            registration_closed: true,
            entries: 37,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn document_keeps_clock_fields_together() {
        let original = entity();
        let document = MongoSessionDocument::from(original.clone());
        let restored = SessionEntity::try_from(document).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn negative_index_is_reported_as_corruption() {
        let mut document = MongoSessionDocument::from(entity());
        document.current_level_index = -1;
        assert!(matches!(
            SessionEntity::try_from(document),
            Err(MongoDaoError::Corrupted { .. })
        ));
    }
}
