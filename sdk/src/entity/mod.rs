//! Entity mapping layer
//!
//! Entities are plain serde structs paired with a declarative field table
//! ([`Entity::FIELDS`]). The table drives three conversions:
//!
//! - field-name resolution for reads ([`extraction::extract_field_names`])
//! - value extraction for writes ([`extraction::extract_field_values`])
//! - generic record construction and materialization ([`construction`])
//!
//! ```rust,ignore
//! use sforce_sdk::entity::{Directive, Entity, FieldDef, FieldType};
//!
//! #[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
//! #[serde(default)]
//! struct Lead {
//!     #[serde(rename = "Id")]
//!     id: Option<String>,
//!     #[serde(rename = "Company")]
//!     company: Option<String>,
//!     #[serde(rename = "CreatedDate")]
//!     created_date: Option<sforce_sdk::Timestamp>,
//! }
//!
//! impl Entity for Lead {
//!     const OBJECT_TYPE: &'static str = "Lead";
//!     const FIELDS: &'static [FieldDef] = &[
//!         FieldDef::id(),
//!         FieldDef::new("Company", FieldType::String),
//!         FieldDef::new("CreatedDate", FieldType::DateTime)
//!             .with(Directive::IgnoreForCreateAndUpdate),
//!     ];
//! }
//! ```

pub mod construction;
pub mod directive;
pub mod extraction;
mod float_scan;
pub mod traits;
pub mod types;
pub mod values;

// Re-export commonly used types and traits
pub use construction::{construct_entity, construct_from_sobject, construct_sobject, materialize};
pub use directive::{Directive, DirectiveSet, ExtractionContext};
pub use extraction::{extract_field_names, extract_field_values, extract_from_object};
pub use traits::{DescriptorFn, Entity, EntityDescriptor, FieldDef};
pub use types::{
    CANONICAL_TIMESTAMP_FORMAT, EntityError, EntityResult, FieldType, ID_FIELD_NAME, Timestamp,
    Tristate,
};
pub use values::{FieldValue, FieldValues};
