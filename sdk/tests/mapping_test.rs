//! Entity mapping through the public API: field tables, extraction and materialization

use serde::{Deserialize, Serialize};
use sforce_sdk::entity::{construct_sobject, extract_field_names};
use sforce_sdk::testing::Account;
use sforce_sdk::{
    Directive, Entity, EntityError, ExtractionContext, FieldDef, FieldNode, FieldType, FieldValue,
    SObject, Timestamp, Tristate,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Opportunity {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Amount")]
    amount: Option<f64>,
    #[serde(rename = "Probability")]
    probability: Option<f64>,
    #[serde(rename = "CloseDate")]
    close_date: Option<Timestamp>,
    #[serde(rename = "NextStep", skip_serializing_if = "Tristate::is_unset")]
    next_step: Tristate<String>,
    #[serde(rename = "AccountId")]
    account_id: Option<String>,
    #[serde(rename = "Account")]
    account: Option<Account>,
    #[serde(rename = "IsWon")]
    is_won: Option<bool>,
}

impl Entity for Opportunity {
    const OBJECT_TYPE: &'static str = "Opportunity";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::id(),
        FieldDef::new("Name", FieldType::String),
        FieldDef::new("Amount", FieldType::Currency),
        FieldDef::new("Probability", FieldType::Percent),
        FieldDef::new("CloseDate", FieldType::DateTime),
        FieldDef::new("NextStep", FieldType::String),
        FieldDef::new("AccountId", FieldType::Reference).with(Directive::IgnoreForUpdate),
        FieldDef::nested("Account", Account::descriptor).recursive(),
        FieldDef::new("IsWon", FieldType::Boolean).with(Directive::IgnoreForCreateAndUpdate),
    ];
}

#[test]
fn test_names_for_reads_flatten_relationships() {
    let names = Opportunity::field_names(Some(ExtractionContext::Get)).unwrap();
    assert_eq!(&names[..5], ["Id", "Name", "Amount", "Probability", "CloseDate"]);
    assert!(names.contains(&"Account.Name".to_string()));
    assert!(names.contains(&"Account.LastModifiedDate".to_string()));
    assert!(!names.contains(&"Account".to_string()));
    assert!(!names.contains(&"Account.InternalNotes__c".to_string()));
    assert!(names.contains(&"IsWon".to_string()));
}

#[test]
fn test_names_respect_write_contexts() {
    let create = Opportunity::field_names(Some(ExtractionContext::Create)).unwrap();
    assert!(!create.contains(&"Id".to_string()));
    assert!(!create.contains(&"IsWon".to_string()));
    assert!(create.contains(&"AccountId".to_string()));

    let update = Opportunity::field_names(Some(ExtractionContext::Update)).unwrap();
    assert!(update.contains(&"Id".to_string()));
    assert!(!update.contains(&"AccountId".to_string()));
    assert!(!update.contains(&"IsWon".to_string()));
}

#[test]
fn test_prefix_applies_to_every_name() {
    let names =
        extract_field_names(&Account::descriptor(), Some("Parent"), Some(ExtractionContext::Get))
            .unwrap();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.starts_with("Parent.")));
}

#[test]
fn test_values_for_update_keep_explicit_nulls() {
    let opportunity = Opportunity {
        id: Some("006000000000001".to_string()),
        name: Some("Renewal".to_string()),
        amount: Some(1250.5),
        next_step: Tristate::Null,
        account_id: Some("001000000000001".to_string()),
        is_won: Some(true),
        ..Default::default()
    };

    let values = opportunity
        .field_values(Some(ExtractionContext::Update))
        .unwrap();
    assert_eq!(values.get("Name"), Some(&FieldValue::from("Renewal")));
    assert_eq!(values.get("Amount"), Some(&FieldValue::Float(1250.5)));
    assert_eq!(values.get("NextStep"), Some(&FieldValue::Null));
    assert!(values.get("AccountId").is_none());
    assert!(values.get("IsWon").is_none());
    assert!(values.get("Account").is_none());

    let record = construct_sobject(Opportunity::OBJECT_TYPE, &values).unwrap();
    assert!(record.fields_to_null.contains(&"NextStep".to_string()));
    assert!(record.field("NextStep").is_none());
    assert_eq!(record.id(), Some("006000000000001"));
}

#[test]
fn test_unset_tristate_is_left_alone() {
    let opportunity = Opportunity {
        id: Some("006000000000001".to_string()),
        ..Default::default()
    };
    let values = opportunity
        .field_values(Some(ExtractionContext::Update))
        .unwrap();
    assert!(!values.contains_key("NextStep"));
}

#[test]
fn test_record_materializes_with_relationship() {
    let record = SObject {
        object_type: Some("Opportunity".to_string()),
        fields: vec![
            FieldNode::text("sf:Id", "006000000000001"),
            FieldNode::text("sf:Name", "Renewal"),
            FieldNode::text("sf:Amount", "1250.50"),
            FieldNode::text("sf:Probability", "75"),
            FieldNode::text("sf:CloseDate", "2024-03-31T00:00:00.000Z"),
            FieldNode::text("sf:IsWon", "FALSE"),
            FieldNode::empty("sf:NextStep"),
            FieldNode::nested(
                "sf:Account",
                "Account",
                vec![
                    FieldNode::text("sf:Id", "001000000000001"),
                    FieldNode::text("sf:Name", "Acme"),
                    FieldNode::text("sf:NumberOfEmployees", "250"),
                ],
            ),
        ],
        fields_to_null: Vec::new(),
    };

    let opportunity = Opportunity::from_sobject(&record).unwrap();
    assert_eq!(opportunity.name.as_deref(), Some("Renewal"));
    assert_eq!(opportunity.amount, Some(1250.5));
    assert_eq!(opportunity.probability, Some(75.0));
    assert_eq!(
        opportunity.close_date.map(|d| d.to_canonical()).as_deref(),
        Some("2024-03-31T00:00:00")
    );
    assert_eq!(opportunity.is_won, Some(false));
    assert_eq!(opportunity.next_step, Tristate::Unset);

    let account = opportunity.account.unwrap();
    assert_eq!(account.name.as_deref(), Some("Acme"));
    assert_eq!(account.number_of_employees, Some(250));
}

#[test]
fn test_bad_text_names_the_field() {
    let record = SObject::new("Opportunity").with_field("Amount", "lots");
    match Opportunity::from_sobject(&record).unwrap_err() {
        EntityError::TypeConversion { field, .. } => assert_eq!(field, "Amount"),
        other => panic!("expected a conversion error, got {other:?}"),
    }
}

#[test]
fn test_entity_survives_write_then_read() {
    let opportunity = Opportunity {
        name: Some("New Business".to_string()),
        amount: Some(99.0),
        close_date: Timestamp::from_timestamp(1_711_843_200),
        next_step: Tristate::Value("Call back".to_string()),
        account_id: Some("001000000000001".to_string()),
        ..Default::default()
    };

    let record = opportunity.to_sobject(ExtractionContext::Create).unwrap();
    assert_eq!(record.object_type.as_deref(), Some("Opportunity"));

    let back = Opportunity::from_sobject(&record).unwrap();
    assert_eq!(back, opportunity);
}
