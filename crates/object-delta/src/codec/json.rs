//! JSON rendering of the wire model and the typed-payload codec.
//!
//! Scalar payloads are self-describing objects (`{"t":"string","v":...}`),
//! container and reference values nest structurally, so encoding never
//! consults a definition. Structural decode keeps every scalar payload as
//! [`TypedPayload::Raw`]; [`resolve_definitions`] performs the second,
//! definition-guided phase and may be retried later by callers that learn
//! the object type after the fact.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indexmap::IndexMap;
use serde_json::{json, Map, Value as Json};

use object_delta_path::{format_path, parse_path, ItemPath, QName};

use crate::codec::{
    DecodeError, SchemaError, WireItemModification, WireModificationKind, WireObjectDelta,
};
use crate::delta::{ChangeKind, ItemDelta, ObjectDelta};
use crate::item::{Item, ItemKind};
use crate::object::ObjectSnapshot;
use crate::registry::{DefinitionRegistry, ScalarType};
use crate::value::{ContainerValue, ReferenceValue, ScalarValue, TypedPayload, Value};

// ── QName rendering ───────────────────────────────────────────────────────

fn qname_to_string(name: &QName) -> String {
    name.to_string()
}

fn qname_from_string(text: &str) -> QName {
    match text.split_once(':') {
        Some((ns, local)) => QName::qualified(ns, local),
        None => QName::unqualified(text),
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────

/// Encode an object delta into its wire form. Infallible on well-formed
/// deltas and never requires a definition.
pub fn encode(delta: &ObjectDelta) -> WireObjectDelta {
    match delta {
        ObjectDelta::Add { object } => WireObjectDelta {
            change_kind: ChangeKind::Add,
            object_id: object.oid.clone(),
            object_type: Some(qname_to_string(&object.object_type)),
            object_payload: Some(encode_object(object)),
            item_modifications: Vec::new(),
        },
        ObjectDelta::Modify {
            oid,
            object_type,
            modifications,
        } => {
            let mut entries = Vec::new();
            for delta in modifications.values() {
                encode_item_delta(delta, &mut entries);
            }
            WireObjectDelta {
                change_kind: ChangeKind::Modify,
                object_id: oid.clone(),
                object_type: Some(qname_to_string(object_type)),
                object_payload: None,
                item_modifications: entries,
            }
        }
        ObjectDelta::Delete { oid, object_type } => WireObjectDelta {
            change_kind: ChangeKind::Delete,
            object_id: Some(oid.clone()),
            object_type: Some(qname_to_string(object_type)),
            object_payload: None,
            item_modifications: Vec::new(),
        },
    }
}

fn encode_item_delta(delta: &ItemDelta, out: &mut Vec<WireItemModification>) {
    let path = format_path(&delta.path);
    if let Some(replacement) = &delta.to_replace {
        out.push(WireItemModification {
            path,
            modification_kind: WireModificationKind::Replace,
            values: replacement.iter().map(encode_value).collect(),
        });
        return;
    }
    if !delta.to_add.is_empty() {
        out.push(WireItemModification {
            path: path.clone(),
            modification_kind: WireModificationKind::Add,
            values: delta.to_add.iter().map(encode_value).collect(),
        });
    }
    if !delta.to_delete.is_empty() {
        out.push(WireItemModification {
            path,
            modification_kind: WireModificationKind::Delete,
            values: delta.to_delete.iter().map(encode_value).collect(),
        });
    }
}

fn encode_value(value: &Value) -> Json {
    match value {
        Value::Scalar(sv) => encode_payload(&sv.payload),
        Value::Container(cv) => {
            let mut obj = Map::new();
            obj.insert("t".into(), json!("container"));
            if let Some(id) = cv.id {
                obj.insert("id".into(), json!(id));
            }
            obj.insert("items".into(), encode_items(&cv.items));
            Json::Object(obj)
        }
        Value::Reference(rv) => {
            let mut obj = Map::new();
            obj.insert("t".into(), json!("reference"));
            obj.insert("oid".into(), json!(rv.target_id));
            if let Some(target_type) = &rv.target_type {
                obj.insert("type".into(), json!(qname_to_string(target_type)));
            }
            if let Some(embedded) = &rv.embedded {
                obj.insert("embedded".into(), encode_object(embedded));
            }
            Json::Object(obj)
        }
    }
}

fn encode_payload(payload: &TypedPayload) -> Json {
    match payload {
        TypedPayload::Bool(b) => json!({"t": "bool", "v": b}),
        TypedPayload::Int(i) => json!({"t": "int", "v": i}),
        TypedPayload::Double(d) => json!({"t": "double", "v": d}),
        TypedPayload::String(s) => json!({"t": "string", "v": s}),
        TypedPayload::Bytes(b) => json!({"t": "bytes", "v": BASE64.encode(b)}),
        // Raw trees came off the wire self-describing; re-emit verbatim.
        TypedPayload::Raw(tree) => tree.clone(),
    }
}

fn encode_items(items: &IndexMap<QName, Item>) -> Json {
    let mut obj = Map::new();
    for (name, item) in items {
        obj.insert(
            qname_to_string(name),
            json!({
                "k": item.kind.to_string(),
                "values": item.values.iter().map(encode_value).collect::<Vec<_>>(),
            }),
        );
    }
    Json::Object(obj)
}

fn encode_object(snapshot: &ObjectSnapshot) -> Json {
    let mut obj = Map::new();
    if let Some(oid) = &snapshot.oid {
        obj.insert("oid".into(), json!(oid));
    }
    obj.insert(
        "objectType".into(),
        json!(qname_to_string(&snapshot.object_type)),
    );
    obj.insert("items".into(), encode_items(&snapshot.root.items));
    Json::Object(obj)
}

// ── Structural decoding (phase 1) ─────────────────────────────────────────

/// Decode a wire delta. With `defs` present, raw payloads are immediately
/// typed (phase 2); with `None`, scalar payloads stay raw and can be typed
/// later via [`resolve_definitions`].
pub fn decode(
    wire: &WireObjectDelta,
    defs: Option<&dyn DefinitionRegistry>,
) -> Result<ObjectDelta, DecodeError> {
    let mut delta = decode_structural(wire)?;
    if let Some(defs) = defs {
        resolve_definitions(&mut delta, defs)?;
    }
    Ok(delta)
}

fn decode_structural(wire: &WireObjectDelta) -> Result<ObjectDelta, DecodeError> {
    let object_type = || -> Result<QName, DecodeError> {
        wire.object_type
            .as_deref()
            .map(qname_from_string)
            .ok_or_else(|| DecodeError::Malformed("missing object type".into()))
    };
    match wire.change_kind {
        ChangeKind::Add => {
            let payload = wire
                .object_payload
                .as_ref()
                .ok_or_else(|| DecodeError::Malformed("ADD without object payload".into()))?;
            Ok(ObjectDelta::Add {
                object: decode_object(payload)?,
            })
        }
        ChangeKind::Delete => {
            let oid = wire
                .object_id
                .clone()
                .ok_or_else(|| DecodeError::Malformed("DELETE without object id".into()))?;
            Ok(ObjectDelta::Delete {
                oid,
                object_type: object_type()?,
            })
        }
        ChangeKind::Modify => {
            let mut modifications: IndexMap<ItemPath, ItemDelta> = IndexMap::new();
            for entry in &wire.item_modifications {
                let path = parse_path(&entry.path)?;
                let values = entry
                    .values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?;
                merge_entry(&mut modifications, path, entry.modification_kind, values)?;
            }
            Ok(ObjectDelta::Modify {
                oid: wire.object_id.clone(),
                object_type: object_type()?,
                modifications,
            })
        }
    }
}

/// Fold one wire entry into the per-path item delta being assembled.
fn merge_entry(
    modifications: &mut IndexMap<ItemPath, ItemDelta>,
    path: ItemPath,
    kind: WireModificationKind,
    values: Vec<Value>,
) -> Result<(), DecodeError> {
    let inferred = values.first().map(Value::kind);
    let delta = modifications.entry(path.clone()).or_insert_with(|| ItemDelta {
        path,
        kind: inferred.unwrap_or(ItemKind::Property),
        to_add: Vec::new(),
        to_replace: None,
        to_delete: Vec::new(),
    });
    if let Some(value_kind) = inferred {
        delta.kind = value_kind;
    }
    match kind {
        WireModificationKind::Replace => {
            if delta.to_replace.is_some() || !delta.to_add.is_empty() || !delta.to_delete.is_empty()
            {
                return Err(DecodeError::Malformed(format!(
                    "REPLACE conflicts with other modifications at '{}'",
                    delta.path
                )));
            }
            delta.to_replace = Some(values);
        }
        WireModificationKind::Add => {
            if delta.to_replace.is_some() {
                return Err(DecodeError::Malformed(format!(
                    "ADD conflicts with REPLACE at '{}'",
                    delta.path
                )));
            }
            delta.to_add.extend(values);
        }
        WireModificationKind::Delete => {
            if delta.to_replace.is_some() {
                return Err(DecodeError::Malformed(format!(
                    "DELETE conflicts with REPLACE at '{}'",
                    delta.path
                )));
            }
            delta.to_delete.extend(values);
        }
    }
    Ok(())
}

fn decode_value(tree: &Json) -> Result<Value, DecodeError> {
    let obj = tree
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("value payload is not an object".into()))?;
    let tag = obj
        .get("t")
        .and_then(Json::as_str)
        .ok_or_else(|| DecodeError::Malformed("value payload without type tag".into()))?;
    match tag {
        "container" => {
            let id = obj.get("id").and_then(Json::as_i64);
            let items = match obj.get("items") {
                Some(items) => decode_items(items)?,
                None => IndexMap::new(),
            };
            Ok(Value::Container(ContainerValue { id, items }))
        }
        "reference" => {
            let target_id = obj
                .get("oid")
                .and_then(Json::as_str)
                .ok_or_else(|| DecodeError::Malformed("reference without oid".into()))?;
            let mut reference = ReferenceValue::new(target_id);
            if let Some(target_type) = obj.get("type").and_then(Json::as_str) {
                reference.target_type = Some(qname_from_string(target_type));
            }
            if let Some(embedded) = obj.get("embedded") {
                reference.embedded = Some(Box::new(decode_object(embedded)?));
            }
            Ok(Value::Reference(reference))
        }
        "bool" | "int" | "double" | "string" | "bytes" => {
            // Deferred typing: keep the self-describing tree until a
            // definition resolves.
            Ok(Value::Scalar(ScalarValue {
                payload: TypedPayload::Raw(tree.clone()),
            }))
        }
        other => Err(DecodeError::Malformed(format!(
            "unknown value type tag '{other}'"
        ))),
    }
}

fn decode_items(tree: &Json) -> Result<IndexMap<QName, Item>, DecodeError> {
    let obj = tree
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("items payload is not an object".into()))?;
    let mut items = IndexMap::new();
    for (key, entry) in obj {
        let name = qname_from_string(key);
        let entry = entry
            .as_object()
            .ok_or_else(|| DecodeError::Malformed(format!("item '{key}' is not an object")))?;
        let kind = match entry.get("k").and_then(Json::as_str) {
            Some("property") => ItemKind::Property,
            Some("container") => ItemKind::Container,
            Some("reference") => ItemKind::Reference,
            other => {
                return Err(DecodeError::Malformed(format!(
                    "item '{key}' has bad kind {other:?}"
                )))
            }
        };
        let values = entry
            .get("values")
            .and_then(Json::as_array)
            .ok_or_else(|| DecodeError::Malformed(format!("item '{key}' without values")))?
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()?;
        items.insert(name.clone(), Item::with_values(name, kind, values));
    }
    Ok(items)
}

fn decode_object(tree: &Json) -> Result<ObjectSnapshot, DecodeError> {
    let obj = tree
        .as_object()
        .ok_or_else(|| DecodeError::Malformed("object payload is not an object".into()))?;
    let object_type = obj
        .get("objectType")
        .and_then(Json::as_str)
        .ok_or_else(|| DecodeError::Malformed("object payload without objectType".into()))?;
    let items = match obj.get("items") {
        Some(items) => decode_items(items)?,
        None => IndexMap::new(),
    };
    Ok(ObjectSnapshot {
        oid: obj.get("oid").and_then(Json::as_str).map(str::to_string),
        object_type: qname_from_string(object_type),
        root: ContainerValue { id: None, items },
        tombstoned: false,
    })
}

// ── Definition-guided typing (phase 2) ────────────────────────────────────

/// Type every raw scalar payload in `delta` against the registry.
///
/// Items the registry does not know stay raw (dynamic items are accepted);
/// a payload whose self-declared type contradicts its definition is a
/// [`SchemaError`]. Retryable: typing an already-typed delta is a no-op as
/// long as the declared types agree.
pub fn resolve_definitions(
    delta: &mut ObjectDelta,
    defs: &dyn DefinitionRegistry,
) -> Result<(), SchemaError> {
    match delta {
        ObjectDelta::Add { object } => {
            let object_type = object.object_type.clone();
            resolve_container(&ItemPath::empty(), &mut object.root, &object_type, defs)
        }
        ObjectDelta::Delete { .. } => Ok(()),
        ObjectDelta::Modify {
            object_type,
            modifications,
            ..
        } => {
            let object_type = object_type.clone();
            for delta in modifications.values_mut() {
                let definition = defs.item_definition(&object_type, &delta.path);
                if let Some(def) = &definition {
                    if def.kind != delta.kind {
                        return Err(SchemaError::KindMismatch {
                            path: delta.path.clone(),
                            expected: def.kind,
                            found: delta.kind,
                        });
                    }
                }
                let declared = definition.as_ref().and_then(|def| def.value_type);
                let path = delta.path.clone();
                for value in delta
                    .to_add
                    .iter_mut()
                    .chain(delta.to_delete.iter_mut())
                    .chain(delta.to_replace.iter_mut().flatten())
                {
                    resolve_value(&path, value, &object_type, declared, defs)?;
                }
            }
            Ok(())
        }
    }
}

fn resolve_container(
    path: &ItemPath,
    container: &mut ContainerValue,
    object_type: &QName,
    defs: &dyn DefinitionRegistry,
) -> Result<(), SchemaError> {
    for (name, item) in container.items.iter_mut() {
        let item_path = path.append_name(name.clone());
        let declared = defs
            .item_definition(object_type, &item_path)
            .and_then(|def| def.value_type);
        for value in item.values.iter_mut() {
            resolve_value(&item_path, value, object_type, declared, defs)?;
        }
    }
    Ok(())
}

fn resolve_value(
    path: &ItemPath,
    value: &mut Value,
    object_type: &QName,
    declared: Option<ScalarType>,
    defs: &dyn DefinitionRegistry,
) -> Result<(), SchemaError> {
    match value {
        Value::Scalar(sv) => {
            if let Some(declared) = declared {
                sv.payload = type_payload(path, &sv.payload, declared)?;
            }
            Ok(())
        }
        Value::Container(cv) => {
            let nested = path.append_id(cv.id);
            resolve_container(&nested, cv, object_type, defs)
        }
        Value::Reference(rv) => {
            if let Some(embedded) = &mut rv.embedded {
                let embedded_type = embedded.object_type.clone();
                resolve_container(&ItemPath::empty(), &mut embedded.root, &embedded_type, defs)?;
            }
            Ok(())
        }
    }
}

/// Convert one payload to the declared scalar type.
fn type_payload(
    path: &ItemPath,
    payload: &TypedPayload,
    declared: ScalarType,
) -> Result<TypedPayload, SchemaError> {
    let raw = match payload {
        TypedPayload::Raw(raw) => raw,
        already_typed => {
            if already_typed.type_tag() != declared.type_tag() {
                return Err(SchemaError::TypeMismatch {
                    path: path.clone(),
                    declared: declared.type_tag().to_string(),
                    found: already_typed.type_tag().to_string(),
                });
            }
            return Ok(already_typed.clone());
        }
    };
    let untypeable = |reason: &str| SchemaError::UntypeableRaw {
        path: path.clone(),
        reason: reason.to_string(),
    };
    let obj = raw.as_object().ok_or_else(|| untypeable("not an object"))?;
    let tag = obj
        .get("t")
        .and_then(Json::as_str)
        .ok_or_else(|| untypeable("missing type tag"))?;
    if tag != declared.type_tag() {
        return Err(SchemaError::TypeMismatch {
            path: path.clone(),
            declared: declared.type_tag().to_string(),
            found: tag.to_string(),
        });
    }
    let v = obj.get("v").ok_or_else(|| untypeable("missing value"))?;
    match declared {
        ScalarType::Bool => v
            .as_bool()
            .map(TypedPayload::Bool)
            .ok_or_else(|| untypeable("not a bool")),
        ScalarType::Int => v
            .as_i64()
            .map(TypedPayload::Int)
            .ok_or_else(|| untypeable("not an int")),
        ScalarType::Double => v
            .as_f64()
            .map(TypedPayload::Double)
            .ok_or_else(|| untypeable("not a double")),
        ScalarType::String => v
            .as_str()
            .map(|s| TypedPayload::String(s.to_string()))
            .ok_or_else(|| untypeable("not a string")),
        ScalarType::Bytes => {
            let text = v.as_str().ok_or_else(|| untypeable("not a string"))?;
            BASE64
                .decode(text)
                .map(TypedPayload::Bytes)
                .map_err(|_| untypeable("invalid base64"))
        }
    }
}

// ── Wire record JSON rendering ────────────────────────────────────────────

impl WireObjectDelta {
    /// Render the wire record itself as JSON.
    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        let kind = match self.change_kind {
            ChangeKind::Add => "ADD",
            ChangeKind::Modify => "MODIFY",
            ChangeKind::Delete => "DELETE",
        };
        obj.insert("changeKind".into(), json!(kind));
        if let Some(object_id) = &self.object_id {
            obj.insert("objectId".into(), json!(object_id));
        }
        if let Some(object_type) = &self.object_type {
            obj.insert("objectType".into(), json!(object_type));
        }
        if let Some(payload) = &self.object_payload {
            obj.insert("objectPayload".into(), payload.clone());
        }
        let entries: Vec<Json> = self
            .item_modifications
            .iter()
            .map(|entry| {
                json!({
                    "path": entry.path,
                    "kind": entry.modification_kind.as_str(),
                    "values": entry.values,
                })
            })
            .collect();
        obj.insert("itemModifications".into(), Json::Array(entries));
        Json::Object(obj)
    }

    /// Parse the wire record back from JSON.
    pub fn from_json(tree: &Json) -> Result<Self, DecodeError> {
        let obj = tree
            .as_object()
            .ok_or_else(|| DecodeError::Malformed("wire delta is not an object".into()))?;
        let change_kind = match obj.get("changeKind").and_then(Json::as_str) {
            Some("ADD") => ChangeKind::Add,
            Some("MODIFY") => ChangeKind::Modify,
            Some("DELETE") => ChangeKind::Delete,
            other => {
                return Err(DecodeError::Malformed(format!(
                    "bad change kind {other:?}"
                )))
            }
        };
        let mut item_modifications = Vec::new();
        if let Some(entries) = obj.get("itemModifications").and_then(Json::as_array) {
            for entry in entries {
                let entry_obj = entry.as_object().ok_or_else(|| {
                    DecodeError::Malformed("item modification is not an object".into())
                })?;
                let path = entry_obj
                    .get("path")
                    .and_then(Json::as_str)
                    .ok_or_else(|| DecodeError::Malformed("modification without path".into()))?;
                let modification_kind = match entry_obj.get("kind").and_then(Json::as_str) {
                    Some("ADD") => WireModificationKind::Add,
                    Some("REPLACE") => WireModificationKind::Replace,
                    Some("DELETE") => WireModificationKind::Delete,
                    other => {
                        return Err(DecodeError::Malformed(format!(
                            "bad modification kind {other:?}"
                        )))
                    }
                };
                let values = entry_obj
                    .get("values")
                    .and_then(Json::as_array)
                    .cloned()
                    .unwrap_or_default();
                item_modifications.push(WireItemModification {
                    path: path.to_string(),
                    modification_kind,
                    values,
                });
            }
        }
        Ok(WireObjectDelta {
            change_kind,
            object_id: obj
                .get("objectId")
                .and_then(Json::as_str)
                .map(str::to_string),
            object_type: obj
                .get("objectType")
                .and_then(Json::as_str)
                .map(str::to_string),
            object_payload: obj.get("objectPayload").cloned(),
            item_modifications,
        })
    }
}
