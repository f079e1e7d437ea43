//! OAuth responses accepted by [`SalesforceService::login_oauth`](crate::service::SalesforceService::login_oauth)
//!
//! The token exchange itself happens outside this crate; these types only carry
//! what the identity endpoints returned.

use crate::entity::types::{EntityError, EntityResult};
use crate::service::ERR_WRONG_OAUTH_URL_FORMAT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of the partner endpoint in [`UserInfoResponse::urls`]
pub const PARTNER_URL_KEY: &str = "partner";
/// Placeholder the identity service leaves in endpoint URLs
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Token endpoint response
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub id: String,
    pub issued_at: String,
    pub refresh_token: Option<String>,
    pub instance_url: String,
    pub signature: String,
    pub access_token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .field("instance_url", &self.instance_url)
            .finish_non_exhaustive()
    }
}

/// Identity endpoint response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfoResponse {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    pub urls: HashMap<String, String>,
    pub username: String,
    pub nick_name: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserInfoResponse {
    /// Partner endpoint for the given API version
    pub fn partner_url(&self, api_version: &str) -> EntityResult<String> {
        self.urls
            .get(PARTNER_URL_KEY)
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.replace(VERSION_PLACEHOLDER, api_version))
            .ok_or_else(|| EntityError::invalid_operation(ERR_WRONG_OAUTH_URL_FORMAT))
    }
}
