//! Core traits for the entity framework

use crate::entity::construction;
use crate::entity::directive::{Directive, DirectiveSet, ExtractionContext};
use crate::entity::extraction;
use crate::entity::types::{EntityError, EntityResult, FieldType, ID_FIELD_NAME};
use crate::entity::values::FieldValues;
use crate::partner::{FieldNode, SObject};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::fmt::Debug;

/// Resolves the field table of a nested entity type
pub type DescriptorFn = fn() -> EntityDescriptor;

/// One row of an entity's field table
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Remote field name, also the serde name of the Rust field
    pub name: &'static str,
    pub field_type: FieldType,
    pub directives: DirectiveSet,
    /// Set when the field holds another entity (a relationship)
    pub nested: Option<DescriptorFn>,
}

impl FieldDef {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            directives: DirectiveSet::EMPTY,
            nested: None,
        }
    }

    /// The server-assigned identifier, never sent on create
    pub const fn id() -> Self {
        Self::new(ID_FIELD_NAME, FieldType::Id).with(Directive::IgnoreForCreate)
    }

    /// A relationship field holding another entity
    pub const fn nested(name: &'static str, descriptor: DescriptorFn) -> Self {
        Self {
            name,
            field_type: FieldType::AnyType,
            directives: DirectiveSet::EMPTY,
            nested: Some(descriptor),
        }
    }

    pub const fn with(mut self, directive: Directive) -> Self {
        self.directives = self.directives.with(directive);
        self
    }

    /// Shorthand for `with(Directive::ExtractRecursively)`
    pub const fn recursive(self) -> Self {
        self.with(Directive::ExtractRecursively)
    }

    pub const fn is_recursive(&self) -> bool {
        self.directives.contains(Directive::ExtractRecursively)
    }

    pub const fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    pub fn nested_descriptor(&self) -> Option<EntityDescriptor> {
        self.nested.map(|resolve| resolve())
    }

    pub const fn excluded_in(&self, context: ExtractionContext) -> bool {
        self.directives.excludes(context)
    }
}

/// The object type name and field table of one entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub object_type: &'static str,
    pub fields: &'static [FieldDef],
    /// The Rust type; several types may map to one object type
    pub type_id: TypeId,
}

impl EntityDescriptor {
    pub fn of<T: Entity>() -> Self {
        Self {
            object_type: T::OBJECT_TYPE,
            fields: T::FIELDS,
            type_id: TypeId::of::<T>(),
        }
    }

    /// Look up a field by its exact wire name
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Core trait that all entities must implement.
///
/// The serde representation must be a struct whose keys are the wire names listed in
/// [`Entity::FIELDS`]; mark the struct `#[serde(default)]` so records that carry only a
/// subset of fields still materialize.
pub trait Entity:
    Default + Debug + Send + Sync + 'static + Serialize + DeserializeOwned
{
    /// Remote object type name (e.g. `Account`)
    const OBJECT_TYPE: &'static str;

    /// Field table, in declaration order
    const FIELDS: &'static [FieldDef];

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
    }

    /// Get the object type name (convenience method)
    fn object_type() -> &'static str {
        Self::OBJECT_TYPE
    }

    /// Wire field names to request for this entity in the given context
    fn field_names(context: Option<ExtractionContext>) -> EntityResult<Vec<String>> {
        extraction::extract_field_names(&Self::descriptor(), None, context)
    }

    /// Extract this entity's values for the given operation
    fn field_values(&self, context: Option<ExtractionContext>) -> EntityResult<FieldValues> {
        extraction::extract_field_values(self, context)
    }

    /// Convert entity to JSON
    fn to_json(&self) -> EntityResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| EntityError::serialization(Self::OBJECT_TYPE, e))
    }

    /// Create entity from JSON
    fn from_json(value: serde_json::Value) -> EntityResult<Self> {
        serde_json::from_value(value).map_err(|e| EntityError::serialization(Self::OBJECT_TYPE, e))
    }

    /// Build the generic record sent for the given write operation
    fn to_sobject(&self, context: ExtractionContext) -> EntityResult<SObject> {
        let values = self.field_values(Some(context))?;
        construction::construct_sobject(Self::OBJECT_TYPE, &values)
    }

    /// Rehydrate an entity from a generic record; clear-list names read back as null
    fn from_sobject(sobject: &SObject) -> EntityResult<Self> {
        construction::construct_from_sobject(sobject)
    }

    /// Rehydrate an entity from a list of field nodes
    fn from_nodes(nodes: &[FieldNode]) -> EntityResult<Self> {
        construction::construct_entity(nodes)
    }
}
