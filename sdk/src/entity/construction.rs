//! Conversion between field-value maps, generic records and typed entities

use crate::entity::extraction::json_kind;
use crate::entity::traits::{Entity, EntityDescriptor, FieldDef};
use crate::entity::types::{EntityError, EntityResult, FieldType, Timestamp};
use crate::entity::values::FieldValues;
use crate::partner::{FieldNode, SObject};
use serde_json::{Map, Number, Value};
use tracing::trace;

/// Build the generic record for a field-value map.
///
/// Present values become text nodes, nulls go to the clear-list. An empty map
/// yields an empty record without an object type.
pub fn construct_sobject(object_type: &str, values: &FieldValues) -> EntityResult<SObject> {
    if object_type.trim().is_empty() {
        return Err(EntityError::invalid_argument("objectTypeName"));
    }
    if values.is_empty() {
        return Ok(SObject::default());
    }

    let mut sobject = SObject::new(object_type);
    for (name, value) in values {
        match value.to_text() {
            Some(text) => sobject.fields.push(FieldNode::text(name.as_str(), text)),
            None => sobject.fields_to_null.push(name.clone()),
        }
    }
    Ok(sobject)
}

/// Materialize a typed entity from the field nodes of a returned record
pub fn construct_entity<T: Entity>(nodes: &[FieldNode]) -> EntityResult<T> {
    let object = materialize(&T::descriptor(), nodes)?;
    T::from_json(Value::Object(object))
}

/// Materialize a typed entity from a whole record.
///
/// Names on the record's clear-list come back as explicit nulls, so a
/// `Tristate::Null` written through [`construct_sobject`] reads back as `Null`.
pub fn construct_from_sobject<T: Entity>(sobject: &SObject) -> EntityResult<T> {
    let descriptor = T::descriptor();
    let mut object = materialize(&descriptor, &sobject.fields)?;
    for name in &sobject.fields_to_null {
        let Some(field) = descriptor.field(name) else {
            continue;
        };
        if !object.contains_key(field.name) {
            object.insert(field.name.to_string(), Value::Null);
        }
    }
    T::from_json(Value::Object(object))
}

/// Rebuild the serialized form of an entity from field nodes.
///
/// Nodes are matched on their local name against the field table. Unknown,
/// empty and non-element nodes are skipped. Directives play no part here.
pub fn materialize(
    descriptor: &EntityDescriptor,
    nodes: &[FieldNode],
) -> EntityResult<Map<String, Value>> {
    let mut object = Map::new();

    for node in nodes {
        if !node.is_element() || node.is_empty() {
            continue;
        }

        let Some(field) = descriptor.field(node.local_name()) else {
            trace!("No field {} on {}", node.local_name(), descriptor.object_type);
            continue;
        };

        let value = match field.nested_descriptor() {
            Some(nested) if node.has_attributes() || !node.children.is_empty() => {
                Value::Object(materialize(&nested, &node.children)?)
            }
            Some(nested) => {
                return Err(EntityError::type_conversion(
                    descriptor.object_type,
                    field.name,
                    nested.object_type,
                    "text",
                ));
            }
            None => convert_text(descriptor, field, &node.inner_text())?,
        };

        object.insert(field.name.to_string(), value);
    }

    Ok(object)
}

/// Convert node text into the JSON scalar for the field's declared type
fn convert_text(descriptor: &EntityDescriptor, field: &FieldDef, text: &str) -> EntityResult<Value> {
    let mismatch = || {
        EntityError::type_conversion(
            descriptor.object_type,
            field.name,
            field.field_type.wire_name(),
            format!("'{}'", text),
        )
    };

    let trimmed = text.trim();
    let value = match field.field_type {
        FieldType::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                return Err(mismatch());
            }
        }
        t if t.is_integer() => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch())?,
        t if t.is_decimal() => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch)?,
        FieldType::DateTime => Timestamp::parse(trimmed)
            .map(|ts| Value::String(ts.to_canonical()))
            .map_err(|_| mismatch())?,
        _ => Value::String(text.to_string()),
    };

    trace!(
        "Converted {}.{} to {}",
        descriptor.object_type,
        field.name,
        json_kind(&value)
    );
    Ok(value)
}
