//! Sample entities and record helpers for tests

use crate::entity::directive::Directive;
use crate::entity::traits::{Entity, FieldDef};
use crate::entity::types::{FieldType, Timestamp, Tristate};
use crate::partner::{FieldNode, GetUserInfoResult, RemoteField, SObject};
use serde::{Deserialize, Serialize};

/// A company record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "NumberOfEmployees")]
    pub number_of_employees: Option<i64>,
    #[serde(rename = "AnnualRevenue")]
    pub annual_revenue: Option<f64>,
    #[serde(rename = "IsActive__c")]
    pub is_active: Option<bool>,
    #[serde(rename = "Description", skip_serializing_if = "Tristate::is_unset")]
    pub description: Tristate<String>,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: Option<Timestamp>,
    #[serde(rename = "InternalNotes__c")]
    pub internal_notes: Option<String>,
}

impl Entity for Account {
    const OBJECT_TYPE: &'static str = "Account";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::id(),
        FieldDef::new("Name", FieldType::String),
        FieldDef::new("NumberOfEmployees", FieldType::Int),
        FieldDef::new("AnnualRevenue", FieldType::Currency),
        FieldDef::new("IsActive__c", FieldType::Boolean),
        FieldDef::new("Description", FieldType::TextArea),
        FieldDef::new("LastModifiedDate", FieldType::DateTime)
            .with(Directive::IgnoreForCreateAndUpdate),
        FieldDef::new("InternalNotes__c", FieldType::TextArea).with(Directive::IgnoreForGet),
    ];
}

/// A person attached to an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "FirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "LastName")]
    pub last_name: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "AccountId")]
    pub account_id: Option<String>,
    #[serde(rename = "Account")]
    pub account: Option<Account>,
    #[serde(rename = "LastContacted__c")]
    pub last_contacted: Option<Timestamp>,
    #[serde(rename = "CreatedDate")]
    pub created_date: Option<Timestamp>,
}

impl Entity for Contact {
    const OBJECT_TYPE: &'static str = "Contact";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::id(),
        FieldDef::new("FirstName", FieldType::String),
        FieldDef::new("LastName", FieldType::String),
        FieldDef::new("Email", FieldType::Email),
        FieldDef::new("AccountId", FieldType::Reference).with(Directive::IgnoreForUpdate),
        FieldDef::nested("Account", Account::descriptor).recursive(),
        FieldDef::new("LastContacted__c", FieldType::DateTime),
        FieldDef::new("CreatedDate", FieldType::DateTime).with(Directive::IgnoreForCreateAndUpdate),
    ];
}

/// A returned record with text fields, ids namespaced like the server does
pub fn record(object_type: &str, fields: &[(&str, &str)]) -> SObject {
    SObject {
        object_type: Some(object_type.to_string()),
        fields: fields
            .iter()
            .map(|(name, value)| FieldNode::text(format!("sf:{}", name), *value))
            .collect(),
        fields_to_null: Vec::new(),
    }
}

/// `count` account records named `Account <n>` with sequential ids
pub fn account_records(start: usize, count: usize) -> Vec<SObject> {
    (start..start + count)
        .map(|n| {
            let id = format!("001{:012}", n);
            let name = format!("Account {}", n);
            record("Account", &[("Id", &id), ("Name", &name)])
        })
        .collect()
}

pub fn remote_field(
    name: &str,
    field_type: FieldType,
    custom: bool,
    updateable: bool,
    filterable: bool,
) -> RemoteField {
    RemoteField {
        name: name.to_string(),
        field_type,
        label: name.to_string(),
        custom,
        updateable,
        filterable,
    }
}

pub fn sample_user() -> GetUserInfoResult {
    GetUserInfoResult {
        user_id: "005000000000001".to_string(),
        user_name: "jdoe@example.com".to_string(),
        user_full_name: "Jane Doe".to_string(),
        user_email: "jdoe@example.com".to_string(),
        organization_id: "00D000000000001".to_string(),
        organization_name: "Example Corp".to_string(),
    }
}
