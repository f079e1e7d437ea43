//! Partner protocol surface: the generic wire types and the transport trait
//!
//! The core never frames requests itself. It talks to a [`PartnerBinding`],
//! handing it [`SObject`] records and reading back [`QueryResult`] pages.

pub mod binding;
pub mod types;

pub use binding::PartnerBinding;
pub use types::{
    DeleteResult, DescribeGlobalResult, DescribeGlobalSObject, DescribeSObjectResult, FieldNode,
    GetUserInfoResult, LoginResult, NodeType, QueryResult, RemoteError, RemoteField, SObject,
    SOBJECT_XSI_TYPE, SaveResult, SessionHandle, XSI_NIL_ATTRIBUTE, XSI_TYPE_ATTRIBUTE,
};
