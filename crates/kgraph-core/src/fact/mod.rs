//! Fact normalization.
//!
//! Incoming entities and relationships are trimmed here before they reach
//! the store. Labels and relationship types are already closed enums by
//! the time a fact exists, so the only remaining invariant to check is that
//! every identifier is non-empty after trimming.

pub mod model;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{KgError, KgResult};
use model::{Entity, IngestBatch, Relationship};

/// Return a copy of `entity` with `id` and `name` trimmed.
///
/// A name that is empty after trimming is dropped, so it can never
/// overwrite an existing name in the store.
pub fn normalize_entity(entity: &Entity) -> Entity {
    let mut out = entity.clone();
    out.id = entity.id.trim().to_string();
    out.name = entity
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    out
}

/// Return a copy of `rel` with `subj` and `obj` trimmed.
pub fn normalize_relationship(rel: &Relationship) -> Relationship {
    let mut out = rel.clone();
    out.subj = rel.subj.trim().to_string();
    out.obj = rel.obj.trim().to_string();
    out
}

/// Normalize a whole batch, rejecting it if any identifier is blank.
pub fn normalize_batch(batch: &IngestBatch) -> KgResult<IngestBatch> {
    let entities: Vec<Entity> = batch.entities.iter().map(normalize_entity).collect();
    let relationships: Vec<Relationship> =
        batch.relationships.iter().map(normalize_relationship).collect();

    for (i, entity) in entities.iter().enumerate() {
        ensure_present(&entity.id, || format!("entities[{}].id", i))?;
    }
    for (i, rel) in relationships.iter().enumerate() {
        ensure_present(&rel.subj, || format!("triples[{}].subj", i))?;
        ensure_present(&rel.obj, || format!("triples[{}].obj", i))?;
    }

    Ok(IngestBatch {
        entities,
        relationships,
    })
}

fn ensure_present(id: &str, path: impl FnOnce() -> String) -> KgResult<()> {
    if id.is_empty() {
        return Err(KgError::BlankIdentifier(path()));
    }
    Ok(())
}

/// Add `source_id` and `created_at` to every relationship that lacks them.
pub fn stamp_provenance(batch: &mut IngestBatch, source_id: &str, now: DateTime<Utc>) {
    let created_at = now.to_rfc3339();
    for rel in &mut batch.relationships {
        rel.props
            .entry("source_id")
            .or_insert_with(|| Value::String(source_id.to_string()));
        rel.props
            .entry("created_at")
            .or_insert_with(|| Value::String(created_at.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{NodeLabel, RelType};
    use serde_json::json;

    #[test]
    fn test_entity_trimmed() {
        let entity = Entity::new("  user:Bob ", NodeLabel::Person).with_name(" Bob ");
        let normalized = normalize_entity(&entity);
        assert_eq!(normalized.id, "user:Bob");
        assert_eq!(normalized.name.as_deref(), Some("Bob"));
        assert_eq!(normalized.label, NodeLabel::Person);
    }

    #[test]
    fn test_blank_name_dropped() {
        let entity = Entity::new("place:x", NodeLabel::Place).with_name("   ");
        assert_eq!(normalize_entity(&entity).name, None);
    }

    #[test]
    fn test_relationship_trimmed() {
        let rel = Relationship::new(" user:a", RelType::FriendOf, "user:b  ").with_prop("since", 2020);
        let normalized = normalize_relationship(&rel);
        assert_eq!(normalized.subj, "user:a");
        assert_eq!(normalized.obj, "user:b");
        assert_eq!(normalized.props["since"], json!(2020));
    }

    #[test]
    fn test_blank_id_rejects_batch() {
        let batch = IngestBatch {
            entities: vec![
                Entity::new("user:a", NodeLabel::Person),
                Entity::new("   ", NodeLabel::Thing),
            ],
            relationships: vec![],
        };
        match normalize_batch(&batch) {
            Err(KgError::BlankIdentifier(path)) => assert_eq!(path, "entities[1].id"),
            other => panic!("expected BlankIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_relationship_endpoint_rejects_batch() {
        let batch = IngestBatch {
            entities: vec![],
            relationships: vec![Relationship::new("user:a", RelType::LivesIn, " ")],
        };
        assert!(matches!(
            normalize_batch(&batch),
            Err(KgError::BlankIdentifier(ref p)) if p == "triples[0].obj"
        ));
    }

    #[test]
    fn test_unknown_vocabulary_rejected_on_parse() {
        let body = json!({
            "entities": [{"id": "user:a", "label": "Person"}],
            "triples": [{"subj": "user:a", "pred": "HATES", "obj": "user:b"}]
        });
        let err = serde_json::from_value::<IngestBatch>(body).unwrap_err();
        assert!(err.to_string().contains("unknown relationship type 'HATES'"));

        let body = json!({"entities": [{"id": "x", "label": "person"}]});
        assert!(serde_json::from_value::<IngestBatch>(body).is_err());
    }

    #[test]
    fn test_stamp_provenance_keeps_existing() {
        let mut batch = IngestBatch {
            entities: vec![],
            relationships: vec![
                Relationship::new("a", RelType::MetWith, "b"),
                Relationship::new("a", RelType::MetWith, "c").with_prop("source_id", "msg:old"),
            ],
        };
        let now = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        stamp_provenance(&mut batch, "msg:new", now);

        assert_eq!(batch.relationships[0].props["source_id"], json!("msg:new"));
        assert_eq!(batch.relationships[0].props["created_at"], json!("2026-01-02T03:04:05+00:00"));
        assert_eq!(batch.relationships[1].props["source_id"], json!("msg:old"));
    }
}
