//! Query/CRUD orchestration on top of the entity mapping layer
//!
//! [`SalesforceService`] owns a [`PartnerBinding`](crate::partner::PartnerBinding)
//! plus the session state, and maps typed reads and writes onto remote calls.

pub mod fields;
pub mod oauth;
pub mod query;
pub mod salesforce;
pub mod session;

pub use fields::{FieldAttributes, FieldDescriptor, filter_fields};
pub use oauth::{TokenResponse, UserInfoResponse};
pub use query::{QueryBuilder, QueryCursor, ensure_id_field};
pub use salesforce::SalesforceService;
pub use session::{GlobalSchema, SessionState, UserInfo};

pub(crate) const ERR_FIELDS_ARE_EMPTY: &str = "no fields were given";
pub(crate) const ERR_ID_FIELD_IS_AUTOGENERATED: &str =
    "the Id field is assigned by the server and must not be set on create";
pub(crate) const ERR_ID_FIELD_IS_NOT_SET: &str = "the Id field is not set";
pub(crate) const ERR_WRONG_OAUTH_URL_FORMAT: &str =
    "OAuth user info carries no partner endpoint URL";
