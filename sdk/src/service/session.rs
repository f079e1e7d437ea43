//! Per-service session state

use crate::partner::DescribeGlobalResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Length of the key prefix that identifies an object type inside an id
pub const KEY_PREFIX_LEN: usize = 3;

/// Summary of the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    pub organization_id: String,
    pub organization_name: String,
}

/// Key prefix to object type mapping taken from one `describeGlobal` call
#[derive(Debug, Clone, Default)]
pub struct GlobalSchema {
    by_prefix: HashMap<String, String>,
    object_types: Vec<String>,
}

impl GlobalSchema {
    pub fn from_describe(describe: &DescribeGlobalResult) -> Self {
        let mut schema = GlobalSchema::default();
        for sobject in &describe.sobjects {
            schema.object_types.push(sobject.name.clone());
            if let Some(prefix) = sobject.key_prefix.as_deref().filter(|p| !p.is_empty()) {
                // first object type listed under a prefix wins
                schema
                    .by_prefix
                    .entry(prefix.to_string())
                    .or_insert_with(|| sobject.name.clone());
            }
        }
        schema
    }

    /// Object type whose key prefix starts the given id
    pub fn object_type_for(&self, id: &str) -> Option<&str> {
        let prefix = id.get(..KEY_PREFIX_LEN)?;
        self.by_prefix.get(prefix).map(String::as_str)
    }

    pub fn object_types(&self) -> &[String] {
        &self.object_types
    }

    pub fn len(&self) -> usize {
        self.object_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_types.is_empty()
    }
}

/// Connected flag, user and schema snapshot of one service instance.
///
/// The snapshot is fetched at login and never refreshed.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub connected: bool,
    pub user: Option<UserInfo>,
    pub schema: GlobalSchema,
}

impl SessionState {
    pub fn connected(user: UserInfo, schema: GlobalSchema) -> Self {
        Self {
            connected: true,
            user: Some(user),
            schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::DescribeGlobalSObject;

    fn describe(entries: &[(&str, Option<&str>)]) -> DescribeGlobalResult {
        DescribeGlobalResult {
            sobjects: entries
                .iter()
                .map(|(name, prefix)| DescribeGlobalSObject {
                    name: name.to_string(),
                    key_prefix: prefix.map(str::to_string),
                    label: name.to_string(),
                    custom: name.ends_with("__c"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_prefix_lookup() {
        let schema = GlobalSchema::from_describe(&describe(&[
            ("Account", Some("001")),
            ("Contact", Some("003")),
            ("AccountHistory", None),
        ]));
        assert_eq!(schema.object_type_for("001000000000001"), Some("Account"));
        assert_eq!(schema.object_type_for("003000000000001AAA"), Some("Contact"));
        assert_eq!(schema.object_type_for("00Q000000000001"), None);
        assert_eq!(schema.object_type_for("00"), None);
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_first_prefix_wins() {
        let schema = GlobalSchema::from_describe(&describe(&[
            ("Account", Some("001")),
            ("AccountShadow", Some("001")),
        ]));
        assert_eq!(schema.object_type_for("001000000000001"), Some("Account"));
    }

    #[test]
    fn test_non_ascii_ids_do_not_panic() {
        let schema = GlobalSchema::from_describe(&describe(&[("Account", Some("001"))]));
        assert_eq!(schema.object_type_for("0é1"), None);
    }
}
