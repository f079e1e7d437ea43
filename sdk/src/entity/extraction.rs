//! Field-name resolution and value extraction driven by the entity field table
//!
//! Both walks consult the same directive rules: a field is left out when its
//! [`DirectiveSet`](crate::entity::DirectiveSet) excludes the requested
//! [`ExtractionContext`]. Passing no context excludes nothing.

use crate::entity::directive::ExtractionContext;
use crate::entity::float_scan;
use crate::entity::traits::{Entity, EntityDescriptor, FieldDef};
use crate::entity::types::{EntityError, EntityResult, FieldType, Timestamp};
use crate::entity::values::{FieldValue, FieldValues};
use serde_json::{Map, Value};
use tracing::trace;

const PATH_SEPARATOR: char = '.';

fn skipped(field: &FieldDef, context: Option<ExtractionContext>) -> bool {
    context.is_some_and(|c| field.excluded_in(c))
}

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}{}{}", prefix, PATH_SEPARATOR, name),
        _ => name.to_string(),
    }
}

/// Flatten an entity's field table into the wire field names to request.
///
/// Fields marked `ExtractRecursively` never appear themselves; their nested entity's
/// fields are emitted instead, prefixed with the dotted path (`Account.Name`).
/// A nested type that re-enters one of its ancestors fails with
/// [`EntityError::CycleDetected`].
pub fn extract_field_names(
    descriptor: &EntityDescriptor,
    prefix: Option<&str>,
    context: Option<ExtractionContext>,
) -> EntityResult<Vec<String>> {
    let mut names = Vec::with_capacity(descriptor.fields.len());
    let mut path = vec![*descriptor];
    collect_field_names(descriptor, prefix, context, &mut path, &mut names)?;
    Ok(names)
}

fn collect_field_names(
    descriptor: &EntityDescriptor,
    prefix: Option<&str>,
    context: Option<ExtractionContext>,
    path: &mut Vec<EntityDescriptor>,
    names: &mut Vec<String>,
) -> EntityResult<()> {
    for field in descriptor.fields {
        if skipped(field, context) {
            continue;
        }

        let name = qualify(prefix, field.name);

        if !field.is_recursive() {
            names.push(name);
            continue;
        }

        let nested = field.nested_descriptor().ok_or_else(|| {
            EntityError::configuration(format!(
                "field '{}.{}' is marked ExtractRecursively but holds no entity",
                descriptor.object_type, field.name
            ))
        })?;

        if path.iter().any(|seen| seen.type_id == nested.type_id) {
            path.push(nested);
            let types: Vec<&str> = path.iter().map(|d| d.object_type).collect();
            return Err(EntityError::cycle_detected(types.as_slice()));
        }

        path.push(nested);
        collect_field_names(&nested, Some(&name), context, path, names)?;
        path.pop();
    }

    Ok(())
}

/// Extract the field-value map of an entity for the given operation.
///
/// Unset values become explicit nulls, so the server clears them. Fields skipped
/// during serialization (`Tristate::Unset`) are left out entirely and therefore
/// left unchanged. Relationship fields are never written.
pub fn extract_field_values<T: Entity>(
    entity: &T,
    context: Option<ExtractionContext>,
) -> EntityResult<FieldValues> {
    let descriptor = T::descriptor();
    reject_non_finite(&descriptor, entity, context)?;
    match entity.to_json()? {
        Value::Object(object) => extract_from_object(&descriptor, &object, context),
        other => Err(EntityError::Serialization {
            entity_type: descriptor.object_type.to_string(),
            message: format!("expected a struct, serialized to {}", json_kind(&other)),
        }),
    }
}

/// NaN and infinities would serialize as `null` and clear the remote field
fn reject_non_finite<T: Entity>(
    descriptor: &EntityDescriptor,
    entity: &T,
    context: Option<ExtractionContext>,
) -> EntityResult<()> {
    let found = float_scan::non_finite_fields(entity).map_err(|e| EntityError::Serialization {
        entity_type: descriptor.object_type.to_string(),
        message: e.to_string(),
    })?;

    for (name, value) in found {
        let written = descriptor
            .field(name)
            .filter(|field| !field.is_nested() && !skipped(field, context));
        if let Some(field) = written {
            return Err(EntityError::type_conversion(
                descriptor.object_type,
                field.name,
                "finite number",
                value.to_string(),
            ));
        }
    }
    Ok(())
}

/// Same as [`extract_field_values`], over an already serialized entity
pub fn extract_from_object(
    descriptor: &EntityDescriptor,
    object: &Map<String, Value>,
    context: Option<ExtractionContext>,
) -> EntityResult<FieldValues> {
    let mut values = FieldValues::with_capacity(descriptor.fields.len());

    for field in descriptor.fields {
        if skipped(field, context) {
            continue;
        }
        if field.is_nested() {
            trace!("Skipping relationship field {}.{}", descriptor.object_type, field.name);
            continue;
        }

        match object.get(field.name) {
            None => continue,
            Some(Value::Null) => {
                values.insert_null(field.name);
            }
            Some(value) => {
                values.insert(field.name, canonical_value(descriptor, field, value)?);
            }
        }
    }

    Ok(values)
}

/// Normalize a serialized field into its wire scalar
fn canonical_value(
    descriptor: &EntityDescriptor,
    field: &FieldDef,
    value: &Value,
) -> EntityResult<FieldValue> {
    let mismatch = |expected: &str| {
        EntityError::type_conversion(descriptor.object_type, field.name, expected, json_kind(value))
    };

    match value {
        Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(mismatch("number"))
            }
        }
        Value::String(s) if field.field_type == FieldType::DateTime => Timestamp::parse(s)
            .map(FieldValue::from)
            .map_err(|_| mismatch("timestamp")),
        Value::String(s) => Ok(FieldValue::String(s.clone())),
        Value::Null => Ok(FieldValue::Null),
        Value::Array(_) | Value::Object(_) => Err(mismatch("scalar")),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::directive::Directive;
    use crate::entity::types::Tristate;
    use crate::testing::{Account, Contact};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct TreeNode {
        #[serde(rename = "Id")]
        id: Option<String>,
        #[serde(rename = "Parent")]
        parent: Option<Box<TreeNode>>,
    }

    impl Entity for TreeNode {
        const OBJECT_TYPE: &'static str = "TreeNode__c";
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::id(),
            FieldDef::nested("Parent", TreeNode::descriptor).recursive(),
        ];
    }

    // Parent account projection without relationships of its own
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct ParentAccount {
        #[serde(rename = "Id")]
        id: Option<String>,
        #[serde(rename = "Name")]
        name: Option<String>,
    }

    impl Entity for ParentAccount {
        const OBJECT_TYPE: &'static str = "Account";
        const FIELDS: &'static [FieldDef] =
            &[FieldDef::id(), FieldDef::new("Name", FieldType::String)];
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct HierAccount {
        #[serde(rename = "Id")]
        id: Option<String>,
        #[serde(rename = "Parent")]
        parent: Option<ParentAccount>,
    }

    impl Entity for HierAccount {
        const OBJECT_TYPE: &'static str = "Account";
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::id(),
            FieldDef::nested("Parent", ParentAccount::descriptor).recursive(),
        ];
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Broken {
        #[serde(rename = "Owner")]
        owner: Option<String>,
    }

    impl Entity for Broken {
        const OBJECT_TYPE: &'static str = "Broken__c";
        const FIELDS: &'static [FieldDef] =
            &[FieldDef::new("Owner", FieldType::Reference).with(Directive::ExtractRecursively)];
    }

    #[test]
    fn test_field_names_without_context_include_everything() {
        let names = Account::field_names(None).unwrap();
        assert_eq!(
            names,
            vec![
                "Id",
                "Name",
                "NumberOfEmployees",
                "AnnualRevenue",
                "IsActive__c",
                "Description",
                "LastModifiedDate",
                "InternalNotes__c",
            ]
        );
    }

    #[test]
    fn test_field_names_get_context_drops_ignored_fields() {
        let names = Account::field_names(Some(ExtractionContext::Get)).unwrap();
        assert!(!names.contains(&"InternalNotes__c".to_string()));
        assert!(names.contains(&"LastModifiedDate".to_string()));
        assert_eq!(names.first().map(String::as_str), Some("Id"));
    }

    #[test]
    fn test_recursive_field_is_flattened_with_prefix() {
        let names = Contact::field_names(Some(ExtractionContext::Get)).unwrap();
        assert!(!names.contains(&"Account".to_string()));
        assert!(names.contains(&"Account.Id".to_string()));
        assert!(names.contains(&"Account.Name".to_string()));
        assert!(!names.contains(&"Account.InternalNotes__c".to_string()));
        assert!(names.contains(&"AccountId".to_string()));
    }

    #[test]
    fn test_explicit_prefix_applies_to_every_name() {
        let names =
            extract_field_names(&Account::descriptor(), Some("Parent"), Some(ExtractionContext::Get)).unwrap();
        assert!(names.iter().all(|n| n.starts_with("Parent.")));
    }

    #[test]
    fn test_self_referential_recursion_is_rejected() {
        let err = TreeNode::field_names(None).unwrap_err();
        match err {
            EntityError::CycleDetected { path } => assert_eq!(path, "TreeNode__c -> TreeNode__c"),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_same_object_type_through_a_different_entity_is_not_a_cycle() {
        let names = HierAccount::field_names(Some(ExtractionContext::Get)).unwrap();
        assert_eq!(names, vec!["Id", "Parent.Id", "Parent.Name"]);
    }

    #[test]
    fn test_recursive_scalar_is_a_configuration_error() {
        let err = Broken::field_names(None).unwrap_err();
        assert!(matches!(err, EntityError::Configuration { .. }));
    }

    #[test]
    fn test_create_values_skip_id_and_read_only_fields() {
        let account = Account {
            id: Some("001000000000001".to_string()),
            name: Some("Acme".to_string()),
            last_modified_date: Timestamp::from_timestamp(0),
            ..Default::default()
        };
        let values = account.field_values(Some(ExtractionContext::Create)).unwrap();
        assert!(!values.contains_key("Id"));
        assert!(!values.contains_key("LastModifiedDate"));
        assert_eq!(values.get("Name"), Some(&FieldValue::from("Acme")));
    }

    #[test]
    fn test_unset_values_become_explicit_nulls() {
        let account = Account {
            id: Some("001000000000001".to_string()),
            ..Default::default()
        };
        let values = account.field_values(Some(ExtractionContext::Update)).unwrap();
        assert_eq!(values.get("Name"), Some(&FieldValue::Null));
        assert_eq!(values.get("NumberOfEmployees"), Some(&FieldValue::Null));
        // Tristate::Unset never reaches the map
        assert!(!values.contains_key("Description"));
    }

    #[test]
    fn test_tristate_null_and_value() {
        let mut account = Account {
            description: Tristate::Null,
            ..Default::default()
        };
        let values = account.field_values(Some(ExtractionContext::Update)).unwrap();
        assert_eq!(values.get("Description"), Some(&FieldValue::Null));

        account.description = Tristate::Value("Key customer".to_string());
        let values = account.field_values(Some(ExtractionContext::Update)).unwrap();
        assert_eq!(values.get("Description"), Some(&FieldValue::from("Key customer")));
    }

    #[test]
    fn test_scalars_are_canonicalized() {
        let contact = Contact {
            last_name: Some("Doe".to_string()),
            last_contacted: Timestamp::from_timestamp(86_400),
            ..Default::default()
        };
        let values = contact.field_values(Some(ExtractionContext::Update)).unwrap();
        assert_eq!(
            values.get("LastContacted__c"),
            Some(&FieldValue::String("1970-01-02T00:00:00".to_string()))
        );
        // relationship fields are never written
        assert!(!values.contains_key("Account"));
    }

    #[test]
    fn test_numbers_and_booleans_keep_their_kind() {
        let account = Account {
            number_of_employees: Some(250),
            annual_revenue: Some(1.25e6),
            is_active: Some(true),
            ..Default::default()
        };
        let values = account.field_values(None).unwrap();
        assert_eq!(values.get("NumberOfEmployees"), Some(&FieldValue::Int(250)));
        assert_eq!(values.get("AnnualRevenue"), Some(&FieldValue::Float(1.25e6)));
        assert_eq!(values.get("IsActive__c"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for revenue in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let account = Account {
                id: Some("001000000000001".to_string()),
                annual_revenue: Some(revenue),
                ..Default::default()
            };
            let err = account
                .field_values(Some(ExtractionContext::Update))
                .unwrap_err();
            match err {
                EntityError::TypeConversion { field, actual, .. } => {
                    assert_eq!(field, "AnnualRevenue");
                    assert_eq!(actual, revenue.to_string());
                }
                other => panic!("expected conversion error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_non_finite_float_in_excluded_field_is_ignored() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(default)]
        struct Forecast {
            #[serde(rename = "Id")]
            id: Option<String>,
            #[serde(rename = "Score__c")]
            score: Option<f64>,
        }

        impl Entity for Forecast {
            const OBJECT_TYPE: &'static str = "Forecast__c";
            const FIELDS: &'static [FieldDef] = &[
                FieldDef::id(),
                FieldDef::new("Score__c", FieldType::Double)
                    .with(Directive::IgnoreForCreateAndUpdate),
            ];
        }

        let forecast = Forecast {
            id: Some("a00000000000001".to_string()),
            score: Some(f64::NAN),
        };
        let values = forecast
            .field_values(Some(ExtractionContext::Update))
            .unwrap();
        assert!(!values.contains_key("Score__c"));
        assert!(forecast.field_values(None).is_err());
    }

    #[test]
    fn test_non_scalar_value_is_rejected() {
        let descriptor = Account::descriptor();
        let object: Map<String, Value> = serde_json::from_value(serde_json::json!({
            "Name": ["a", "b"],
        }))
        .unwrap();
        let err = extract_from_object(&descriptor, &object, None).unwrap_err();
        assert!(matches!(err, EntityError::TypeConversion { .. }));
    }
}
