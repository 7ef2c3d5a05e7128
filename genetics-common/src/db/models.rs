//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Participant identifier in the store's native (text) id format
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named template describing the defaults of a class of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub id: Uuid,
    pub name: String,
    /// Metadata a new record starts with
    pub default_meta: Value,
}

/// One persisted record belonging to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub user_id: ParticipantId,
    pub record_at: DateTime<Utc>,
    pub meta: Value,
}

impl ResultRecord {
    /// Instantiate a new record for `user_id` from an entity template
    ///
    /// The record gets a fresh id, references the entity, and starts with the
    /// entity's default metadata and the current time as record timestamp.
    pub fn from_entity(entity: &EntityDefinition, user_id: ParticipantId) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: entity.id,
            user_id,
            record_at: Utc::now(),
            meta: entity.default_meta.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_entity_copies_template_defaults() {
        let entity = EntityDefinition {
            id: Uuid::new_v4(),
            name: "GeneticResults".to_string(),
            default_meta: json!({"results": {}}),
        };

        let first = ResultRecord::from_entity(&entity, ParticipantId::new("P1"));
        let second = ResultRecord::from_entity(&entity, ParticipantId::new("P1"));

        assert_eq!(first.entity_id, entity.id);
        assert_eq!(first.user_id.as_str(), "P1");
        assert_eq!(first.meta, json!({"results": {}}));
        assert_ne!(first.id, second.id, "each record gets its own id");
    }

    #[test]
    fn test_participant_id_serializes_as_plain_string() {
        let id = ParticipantId::new("b3c1f7a0");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b3c1f7a0\"");
        assert_eq!(id.to_string(), "b3c1f7a0");
    }
}
