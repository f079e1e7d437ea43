//! Remote collaborator abstraction for the partner endpoint

use crate::partner::types::{
    DeleteResult, DescribeGlobalResult, DescribeSObjectResult, GetUserInfoResult, LoginResult,
    QueryResult, SObject, SaveResult, SessionHandle,
};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Transport to the remote object store.
///
/// Implementations own the wire framing, the endpoint and the session header.
/// Batch calls return one result per input, in input order.
#[async_trait]
pub trait PartnerBinding: Send + Sync {
    /// Authenticate with a username and a password (security token appended)
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult>;

    /// Point subsequent calls at the given endpoint with the given session
    fn bind_session(&mut self, session: SessionHandle);

    /// Connection-level timeout; the default ignores it
    fn set_timeout(&mut self, _timeout: Duration) {}

    async fn describe_global(&self) -> Result<DescribeGlobalResult>;

    async fn describe_sobject(&self, object_type: &str) -> Result<DescribeSObjectResult>;

    async fn query(&self, query: &str) -> Result<QueryResult>;

    /// Like [`PartnerBinding::query`], including deleted and archived records
    async fn query_all(&self, query: &str) -> Result<QueryResult>;

    async fn query_more(&self, query_locator: &str) -> Result<QueryResult>;

    async fn create(&self, records: Vec<SObject>) -> Result<Vec<SaveResult>>;

    async fn update(&self, records: Vec<SObject>) -> Result<Vec<SaveResult>>;

    async fn delete(&self, ids: Vec<String>) -> Result<Vec<DeleteResult>>;

    async fn get_user_info(&self) -> Result<GetUserInfoResult>;
}
