//! # Document Serialization
//!
//! Converts entities to and from plain, insertion-ordered documents.
//!
//! ## Output Rules
//!
//! Fields are emitted in declaration order according to their policy:
//!
//! | Policy    | Emitted when                                              |
//! |-----------|-----------------------------------------------------------|
//! | `always`  | always; null scalars as `null`, empty containers as-is    |
//! | `present` | scalar is non-null, or container/nested document non-empty|
//! | `never`   | never                                                     |
//!
//! A flattened catch-all is not emitted under its own key. Its entries are
//! merged into the top level after the declared fields, skipping any key
//! that names a declared field or alias. An envelope, when declared, wraps
//! the finished document under a single root key.
//!
//! ## Input Rules
//!
//! Deserialization is the inverse. Each key resolves to a field or alias and
//! is coerced through its descriptor, recursing into nested entity and
//! container types. Unknown keys are captured on open types and rejected
//! with `UnknownField` on closed types. The entity is built fresh, so a
//! failure leaves nothing behind.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use crate::attribute::{describe, SerializeWhen};
use crate::entity::{CatchAllMode, Entity, EntityType, UnknownName};
use crate::error::EntityError;
use crate::value::{AttrValue, Document};

/// Serialize `entity` to a document.
pub fn to_document(entity: &Entity) -> Document {
    let ty = entity.entity_type();
    let flattened = match ty.catch_all_slot() {
        Some((slot, CatchAllMode::Flatten)) => Some(slot),
        _ => None,
    };

    let mut doc = Document::new();
    for (slot, (descriptor, value)) in ty.attributes().iter().zip(entity.values()).enumerate() {
        if Some(slot) == flattened {
            continue;
        }
        let emit = match descriptor.serialize_when() {
            SerializeWhen::Always => true,
            SerializeWhen::Present => value.is_present(),
            SerializeWhen::Never => false,
        };
        if emit {
            doc.insert(descriptor.name().to_string(), value.to_json());
        }
    }

    if let Some(AttrValue::Dict(extra)) = flattened.map(|slot| &entity.values()[slot]) {
        for (key, value) in extra {
            if !ty.has_attribute(key) {
                doc.insert(key.clone(), value.clone());
            }
        }
    }

    match ty.envelope() {
        Some(root) => {
            let mut wrapped = Document::new();
            wrapped.insert(root.to_string(), Value::Object(doc));
            wrapped
        }
        None => doc,
    }
}

/// Deserialize an entity of type `ty` from any document value.
///
/// Fails with `MalformedDocument` unless `value` is a mapping.
pub fn from_value(ty: &Arc<EntityType>, value: &Value) -> Result<Entity, EntityError> {
    match value {
        Value::Object(doc) => from_document(ty, doc),
        other => Err(EntityError::MalformedDocument {
            entity: ty.name().to_string(),
            reason: format!("expected a mapping, got {}", describe(other)),
        }),
    }
}

/// Deserialize an entity of type `ty` from a mapping.
///
/// With an envelope, keys beside the root key are rejected with
/// `UnknownField` on closed types. Open types read them ahead of the root
/// body, so a body field of the same name wins.
pub fn from_document(ty: &Arc<EntityType>, document: &Document) -> Result<Entity, EntityError> {
    let mut outer: Vec<(String, AttrValue)> = Vec::new();
    let body = match ty.envelope() {
        Some(root) => match document.get(root) {
            Some(Value::Object(inner)) => {
                for (key, value) in document.iter().filter(|(key, _)| *key != root) {
                    if !ty.is_open() {
                        return Err(EntityError::UnknownField {
                            entity: ty.name().to_string(),
                            field: key.clone(),
                        });
                    }
                    outer.push((key.clone(), AttrValue::from(value)));
                }
                inner
            }
            Some(other) => {
                return Err(EntityError::MalformedDocument {
                    entity: ty.name().to_string(),
                    reason: format!("'{root}' must be a mapping, got {}", describe(other)),
                })
            }
            None => {
                return Err(EntityError::MalformedDocument {
                    entity: ty.name().to_string(),
                    reason: format!("missing root key '{root}'"),
                })
            }
        },
        None => document,
    };

    let fields = outer.into_iter().chain(
        body.iter()
            .map(|(key, value)| (key.clone(), AttrValue::from(value))),
    );
    Entity::populate(ty, fields, UnknownName::Field)
}

/// Feed `document` into `state`, independent of key order.
pub fn hash_document<H: Hasher>(document: &Document, state: &mut H) {
    let mut entries: Vec<(&String, &Value)> = document.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.len().hash(state);
    for (key, value) in entries {
        key.hash(state);
        hash_value(value, state);
    }
}

/// Feed a document value into `state`, independent of mapping key order.
pub fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            hash_document(map, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use serde_json::json;

    fn policy_type() -> Arc<EntityType> {
        EntityType::builder("Policies")
            .attr("shown", Attribute::string())
            .attr("maybe", Attribute::string().serialize_when(SerializeWhen::Present))
            .attr("hidden", Attribute::string().serialize_when(SerializeWhen::Never))
            .attr("items", Attribute::list().serialize_when(SerializeWhen::Present))
            .build()
            .unwrap()
    }

    #[test]
    fn test_policies_on_unset_entity() {
        let o = Entity::empty(&policy_type()).unwrap();
        assert_eq!(Value::Object(to_document(&o)), json!({"shown": null}));
    }

    #[test]
    fn test_policies_on_populated_entity() {
        let o = Entity::new(
            &policy_type(),
            [
                ("shown", json!("a")),
                ("maybe", json!("b")),
                ("hidden", json!("c")),
                ("items", json!([1])),
            ],
        )
        .unwrap();
        assert_eq!(
            Value::Object(to_document(&o)),
            json!({"shown": "a", "maybe": "b", "items": [1]})
        );
    }

    #[test]
    fn test_output_follows_declaration_order() {
        let o = Entity::new(&policy_type(), [("maybe", "b"), ("shown", "a")]).unwrap();
        let doc = to_document(&o);
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, ["shown", "maybe"]);
    }

    #[test]
    fn test_closed_type_rejects_unknown_field() {
        let doc = json!({"unexpected": 1});
        assert_eq!(
            from_value(&policy_type(), &doc).unwrap_err(),
            EntityError::UnknownField {
                entity: "Policies".into(),
                field: "unexpected".into(),
            }
        );
    }

    #[test]
    fn test_non_mapping_document_rejected() {
        assert!(matches!(
            from_value(&policy_type(), &json!([1, 2])),
            Err(EntityError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_envelope_wraps_and_unwraps() {
        let ty = EntityType::builder("Wrapped")
            .attr("vars", Attribute::dict())
            .envelope("all")
            .build()
            .unwrap();
        let o = Entity::new(&ty, [("vars", json!({"a": 1}))]).unwrap();
        let doc = to_document(&o);
        assert_eq!(Value::Object(doc.clone()), json!({"all": {"vars": {"a": 1}}}));
        assert_eq!(from_document(&ty, &doc).unwrap(), o);
        assert!(matches!(
            from_value(&ty, &json!({"vars": {}})),
            Err(EntityError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_closed_envelope_rejects_keys_beside_root() {
        let ty = EntityType::builder("Wrapped")
            .attr("vars", Attribute::dict())
            .envelope("all")
            .build()
            .unwrap();
        assert_eq!(
            from_value(&ty, &json!({"all": {}, "bogus": 1})).unwrap_err(),
            EntityError::UnknownField {
                entity: "Wrapped".into(),
                field: "bogus".into(),
            }
        );
    }

    #[test]
    fn test_open_envelope_captures_keys_beside_root() {
        let ty = EntityType::builder("WrappedOpen")
            .attr("name", Attribute::string())
            .attr("vars", Attribute::dict().serialize_when(SerializeWhen::Never))
            .open("vars")
            .envelope("all")
            .build()
            .unwrap();
        let o = from_value(
            &ty,
            &json!({"name": "outer", "all": {"name": "inner"}, "extra": 1}),
        )
        .unwrap();
        assert_eq!(o.get_str("name").unwrap(), Some("inner"));
        assert_eq!(o.get_dict("vars").unwrap().get("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_declared_fields_win_over_flattened_extras() {
        let ty = EntityType::builder("Flat")
            .attr("name", Attribute::string())
            .attr("vars", Attribute::dict().serialize_when(SerializeWhen::Never))
            .open("vars")
            .build()
            .unwrap();
        let mut o = Entity::new(&ty, [("name", "real")]).unwrap();
        o.dict_mut("vars").unwrap().insert("name".into(), json!("shadow"));
        o.dict_mut("vars").unwrap().insert("extra".into(), json!(1));
        assert_eq!(
            Value::Object(to_document(&o)),
            json!({"name": "real", "extra": 1})
        );
    }

    #[test]
    fn test_nested_catch_all_stays_under_its_key() {
        let ty = EntityType::builder("Group")
            .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
            .attr("vars", Attribute::dict())
            .open_nested("vars")
            .build()
            .unwrap();
        let o = from_value(&ty, &json!({"name": "spine", "asn": 65000})).unwrap();
        assert_eq!(
            Value::Object(to_document(&o)),
            json!({"name": "spine", "vars": {"asn": 65000}})
        );
    }

    #[test]
    fn test_nested_documents_recurse() {
        let leaf = EntityType::builder("Leaf")
            .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
            .attr("port", Attribute::integer())
            .build()
            .unwrap();
        let tree = EntityType::builder("Tree")
            .attr("leaves", Attribute::index(&leaf))
            .attr("named", Attribute::map(&leaf))
            .build()
            .unwrap();
        let doc = json!({
            "leaves": [{"port": 1}, {"port": 2}],
            "named": {"a": {"port": 3}},
        });
        let o = from_value(&tree, &doc).unwrap();
        assert_eq!(o.get_index("leaves").unwrap().len(), 2);
        assert_eq!(
            o.get_map("named").unwrap().get("a").unwrap().get_int("port").unwrap(),
            Some(3)
        );
        assert_eq!(Value::Object(to_document(&o)), doc);

        let bad = json!({"leaves": [{"port": "x"}]});
        assert!(matches!(
            from_value(&tree, &bad),
            Err(EntityError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_hash_ignores_key_order() {
        use std::collections::hash_map::DefaultHasher;
        let hash = |v: &Value| {
            let mut h = DefaultHasher::new();
            hash_value(v, &mut h);
            h.finish()
        };
        assert_eq!(hash(&json!({"a": 1, "b": [1, 2]})), hash(&json!({"b": [1, 2], "a": 1})));
        assert_ne!(hash(&json!({"a": 1})), hash(&json!({"a": "1"})));
    }
}
