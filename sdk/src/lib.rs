pub mod config;
pub mod entity;
pub mod logging;
pub mod partner;
pub mod service;
pub mod testing;

// Re-export commonly used types for convenience
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use logging::init_logging;
pub use partner::{FieldNode, PartnerBinding, QueryResult, SObject, SessionHandle};
pub use service::{
    FieldAttributes, FieldDescriptor, QueryBuilder, QueryCursor, SalesforceService, TokenResponse,
    UserInfo, UserInfoResponse,
};

// Re-export async_trait macro for convenience
pub use async_trait::async_trait;

// Re-export entity framework components
pub use entity::{
    Directive, DirectiveSet, Entity, EntityDescriptor, EntityError, EntityResult,
    ExtractionContext, FieldDef, FieldType, FieldValue, FieldValues, Timestamp, Tristate,
};
