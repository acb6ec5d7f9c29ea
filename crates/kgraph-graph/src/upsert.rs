//! Idempotent fact upserts.
//!
//! Every write is a `MERGE` keyed by the external id on the base `Entity`
//! label, so replaying a batch never duplicates nodes or relationships.
//! A batch goes to the store as one ordered statement list inside a single
//! transaction: entities first, then one statement per relationship type.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use kgraph_core::fact::model::BASE_LABEL;
use kgraph_core::fact::normalize_batch;
use kgraph_core::{Entity, IngestBatch, IngestSummary, KgResult, NodeLabel, RelType, Relationship};

use crate::client::GraphClient;
use crate::statement::Statement;

/// Merge entities by id in one transaction. Returns the number accepted.
pub async fn upsert_entities(client: &GraphClient, entities: &[Entity]) -> KgResult<usize> {
    let Some(statement) = entity_statement(entities) else {
        return Ok(0);
    };
    client.execute_write(&[statement]).await?;
    debug!(count = entities.len(), "Entities upserted");
    Ok(entities.len())
}

/// Merge relationships between existing entities in one transaction.
///
/// A relationship whose endpoint is not in the store is skipped.
pub async fn upsert_relationships(client: &GraphClient, relationships: &[Relationship]) -> KgResult<usize> {
    let statements = relationship_statements(relationships);
    client.execute_write(&statements).await?;
    debug!(count = relationships.len(), "Relationships upserted");
    Ok(relationships.len())
}

/// Merge a whole batch in one transaction.
pub async fn upsert_batch(client: &GraphClient, batch: &IngestBatch) -> KgResult<IngestSummary> {
    let statements = batch_statements(batch);
    client.execute_write(&statements).await?;

    let summary = IngestSummary {
        entities: batch.entities.len(),
        relationships: batch.relationships.len(),
    };
    if !batch.is_empty() {
        info!(
            entities = summary.entities,
            triples = summary.relationships,
            statements = statements.len(),
            "Batch upserted"
        );
    }
    Ok(summary)
}

/// Normalize then upsert. A blank identifier rejects the batch before any write.
pub async fn ingest(client: &GraphClient, batch: &IngestBatch) -> KgResult<IngestSummary> {
    let batch = normalize_batch(batch)?;
    upsert_batch(client, &batch).await
}

/// Statements for a batch, in execution order.
pub fn batch_statements(batch: &IngestBatch) -> Vec<Statement> {
    entity_statement(&batch.entities)
        .into_iter()
        .chain(relationship_statements(&batch.relationships))
        .collect()
}

/// One set-based merge for all entities, or `None` when there are none.
pub fn entity_statement(entities: &[Entity]) -> Option<Statement> {
    if entities.is_empty() {
        return None;
    }
    let rows: Vec<Value> = fold_entities(entities)
        .into_iter()
        .map(|entity| {
            json!({
                "id": entity.id,
                "label": entity.label.as_str(),
                "name": entity.name,
                "props": encode_props(&entity.props),
            })
        })
        .collect();

    Some(Statement::new(entity_merge_text()).param("entities", rows))
}

/// One set-based merge per relationship type present, in first-seen order.
pub fn relationship_statements(relationships: &[Relationship]) -> Vec<Statement> {
    let mut order: Vec<RelType> = Vec::new();
    let mut rows_by_type: HashMap<RelType, Vec<Value>> = HashMap::new();

    for rel in fold_relationships(relationships) {
        if !rows_by_type.contains_key(&rel.pred) {
            order.push(rel.pred);
        }
        rows_by_type.entry(rel.pred).or_default().push(json!({
            "subj": rel.subj,
            "pred": rel.pred.as_str(),
            "obj": rel.obj,
            "props": encode_props(&rel.props),
        }));
    }

    order
        .into_iter()
        .map(|pred| {
            let rows = rows_by_type.remove(&pred).unwrap_or_default();
            Statement::new(relationship_merge_text(pred)).param("rels", rows)
        })
        .collect()
}

fn entity_merge_text() -> String {
    let mut text = format!(
        "UNWIND $entities AS e\n\
         MERGE (n:{base} {{id: e.id}})\n\
         SET n += e.props\n\
         SET n.name = coalesce(e.name, n.name)",
        base = BASE_LABEL
    );
    for label in NodeLabel::ALL {
        text.push_str(&format!(
            "\nFOREACH (_ IN CASE WHEN e.label = '{label}' THEN [1] ELSE [] END | SET n:{label})",
            label = label.as_str()
        ));
    }
    text
}

/// Relationship types cannot be parameters; `pred` only ever comes from
/// the closed enum.
fn relationship_merge_text(pred: RelType) -> String {
    format!(
        "UNWIND $rels AS r\n\
         MATCH (s:{base} {{id: r.subj}})\n\
         MATCH (o:{base} {{id: r.obj}})\n\
         MERGE (s)-[rel:{pred}]->(o)\n\
         SET rel += r.props",
        base = BASE_LABEL,
        pred = pred.as_str()
    )
}

/// Fold same-id entities: first label wins, props merge in order, the last
/// present name wins.
fn fold_entities(entities: &[Entity]) -> Vec<Entity> {
    let mut folded: Vec<Entity> = Vec::with_capacity(entities.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entity in entities {
        match index.get(entity.id.as_str()) {
            Some(&i) => {
                let existing = &mut folded[i];
                existing.props.extend(entity.props.clone());
                if entity.name.is_some() {
                    existing.name = entity.name.clone();
                }
            }
            None => {
                index.insert(entity.id.as_str(), folded.len());
                folded.push(entity.clone());
            }
        }
    }
    folded
}

fn fold_relationships(relationships: &[Relationship]) -> Vec<Relationship> {
    let mut folded: Vec<Relationship> = Vec::with_capacity(relationships.len());
    let mut index: HashMap<(&str, RelType, &str), usize> = HashMap::new();

    for rel in relationships {
        let key = (rel.subj.as_str(), rel.pred, rel.obj.as_str());
        match index.get(&key) {
            Some(&i) => folded[i].props.extend(rel.props.clone()),
            None => {
                index.insert(key, folded.len());
                folded.push(rel.clone());
            }
        }
    }
    folded
}

/// Store-safe property map.
///
/// Nulls are dropped so they never erase a stored key. Maps, and lists that
/// are not made of one scalar type, become JSON text. The `id` key is
/// reserved.
pub fn encode_props(props: &Map<String, Value>) -> Map<String, Value> {
    props
        .iter()
        .filter(|(key, value)| key.as_str() != "id" && !value.is_null())
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(value.to_string()),
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter(|v| !v.is_null()).cloned().collect();
            if is_storable_list(&kept) {
                Value::Array(kept)
            } else {
                Value::String(value.to_string())
            }
        }
        other => other.clone(),
    }
}

/// The store only keeps lists whose elements share one scalar type.
fn is_storable_list(items: &[Value]) -> bool {
    let mut kinds = items.iter().map(scalar_kind);
    match kinds.next() {
        None => true,
        Some(None) => false,
        Some(first) => kinds.all(|kind| kind == first),
    }
}

fn scalar_kind(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("float"),
        Value::String(_) => Some("string"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_statement_folds_duplicates() {
        let entities = vec![
            Entity::new("user:a", NodeLabel::Person).with_name("A").with_prop("age", 30),
            Entity::new("place:x", NodeLabel::Place),
            Entity::new("user:a", NodeLabel::Place).with_prop("city", "Lyon"),
        ];
        let statement = entity_statement(&entities).unwrap();
        let rows = statement.params()["entities"].as_array().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "user:a");
        assert_eq!(rows[0]["label"], "Person");
        assert_eq!(rows[0]["name"], "A");
        assert_eq!(rows[0]["props"], json!({"age": 30, "city": "Lyon"}));
        assert_eq!(rows[1]["name"], Value::Null);
    }

    #[test]
    fn test_entity_statement_sets_every_label() {
        let text = entity_merge_text();
        assert!(text.starts_with("UNWIND $entities AS e"));
        assert!(text.contains("MERGE (n:Entity {id: e.id})"));
        assert!(text.contains("coalesce(e.name, n.name)"));
        for label in NodeLabel::ALL {
            assert!(text.contains(&format!("SET n:{})", label.as_str())), "{label}");
        }
    }

    #[test]
    fn test_relationship_statements_grouped_by_type() {
        let rels = vec![
            Relationship::new("user:a", RelType::LivesIn, "place:x"),
            Relationship::new("user:a", RelType::FriendOf, "user:b").with_prop("since", 2020),
            Relationship::new("user:b", RelType::LivesIn, "place:x"),
            Relationship::new("user:a", RelType::FriendOf, "user:b").with_prop("close", true),
        ];
        let statements = relationship_statements(&rels);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].text().contains("MERGE (s)-[rel:LIVES_IN]->(o)"));
        assert_eq!(statements[0].params()["rels"].as_array().unwrap().len(), 2);

        let friends = statements[1].params()["rels"].as_array().unwrap();
        assert!(statements[1].text().contains("[rel:FRIEND_OF]"));
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0]["props"], json!({"since": 2020, "close": true}));
    }

    #[test]
    fn test_encode_props() {
        let props = json!({
            "id": "ignored",
            "gone": null,
            "score": 1.5,
            "tags": ["a", null, "b"],
            "meta": {"k": "v"},
            "pairs": [{"a": 1}],
        });
        let encoded = encode_props(props.as_object().unwrap());

        assert!(!encoded.contains_key("id"));
        assert!(!encoded.contains_key("gone"));
        assert_eq!(encoded["score"], json!(1.5));
        assert_eq!(encoded["tags"], json!(["a", "b"]));
        assert_eq!(encoded["meta"], json!("{\"k\":\"v\"}"));
        assert_eq!(encoded["pairs"], json!("[{\"a\":1}]"));
    }

    #[test]
    fn test_encode_props_mixed_lists_become_text() {
        let props = json!({
            "mixed": ["a", 1, true],
            "numbers": [1, 2.5],
            "ints": [1, 2, null],
            "empty": [],
        });
        let encoded = encode_props(props.as_object().unwrap());

        assert_eq!(encoded["mixed"], json!("[\"a\",1,true]"));
        assert_eq!(encoded["numbers"], json!("[1,2.5]"));
        assert_eq!(encoded["ints"], json!([1, 2]));
        assert_eq!(encoded["empty"], json!([]));
    }

    #[test]
    fn test_batch_statements_entities_first() {
        let batch = IngestBatch {
            entities: vec![Entity::new("user:a", NodeLabel::Person)],
            relationships: vec![Relationship::new("user:a", RelType::HasGoal, "goal:run")],
        };
        let statements = batch_statements(&batch);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].text().starts_with("UNWIND $entities"));
        assert!(statements[1].text().starts_with("UNWIND $rels"));
        assert!(batch_statements(&IngestBatch::default()).is_empty());
    }
}
