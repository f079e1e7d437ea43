//! Wire types exchanged with the partner endpoint

use crate::entity::types::{FieldType, ID_FIELD_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute the server puts on a node that carries a nested record
pub const XSI_TYPE_ATTRIBUTE: &str = "xsi:type";
/// Attribute marking a nil value
pub const XSI_NIL_ATTRIBUTE: &str = "xsi:nil";
/// `xsi:type` value of a nested record
pub const SOBJECT_XSI_TYPE: &str = "sf:sObject";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Element,
    Text,
    Comment,
}

/// One node of the attributed tree a record is carried in.
///
/// Leaf fields carry `text`; nested records carry an `xsi:type` attribute and
/// their own fields as `children`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNode {
    /// Qualified name, e.g. `sf:Name`
    pub name: String,
    pub node_type: NodeType,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    /// A leaf element holding text
    pub fn text<N: Into<String>, T: Into<String>>(name: N, text: T) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// An element with no content
    pub fn empty<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An element explicitly marked nil
    pub fn nil<N: Into<String>>(name: N) -> Self {
        Self::empty(name).with_attribute(XSI_NIL_ATTRIBUTE, "true")
    }

    /// An element carrying a nested record of the given object type
    pub fn nested<N: Into<String>, T: Into<String>>(
        name: N,
        object_type: T,
        children: Vec<FieldNode>,
    ) -> Self {
        let mut all = Vec::with_capacity(children.len() + 1);
        all.push(FieldNode::text("sf:type", object_type));
        all.extend(children);
        Self {
            name: name.into(),
            attributes: vec![(XSI_TYPE_ATTRIBUTE.to_string(), SOBJECT_XSI_TYPE.to_string())],
            children: all,
            ..Default::default()
        }
    }

    /// A comment node, ignored by the materializer
    pub fn comment<T: Into<String>>(text: T) -> Self {
        Self {
            node_type: NodeType::Comment,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// No text and no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().is_none_or(str::is_empty)
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text of this node and all descendants, in document order
    pub fn inner_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.push_text(out);
        }
    }
}

/// Generic record: an object type, its present fields and the fields to clear
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SObject {
    pub object_type: Option<String>,
    pub fields: Vec<FieldNode>,
    pub fields_to_null: Vec<String>,
}

impl SObject {
    pub fn new<T: Into<String>>(object_type: T) -> Self {
        Self {
            object_type: Some(object_type.into()),
            ..Default::default()
        }
    }

    pub fn with_field<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.fields.push(FieldNode::text(name, value));
        self
    }

    /// First field node whose local name matches
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.local_name() == name)
    }

    /// Text of a leaf field
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|f| f.text.as_deref())
    }

    pub fn id(&self) -> Option<&str> {
        self.get_text(ID_FIELD_NAME).filter(|id| !id.is_empty())
    }

    pub fn set_field<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.local_name() == name) {
            Some(node) => node.text = Some(value),
            None => self.fields.push(FieldNode::text(name, value)),
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldNode> {
        let position = self.fields.iter().position(|f| f.local_name() == name)?;
        Some(self.fields.remove(position))
    }
}

/// One page of a query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResult {
    pub records: Vec<SObject>,
    /// Total rows matched by the query, not the size of this page
    pub size: usize,
    pub done: bool,
    pub query_locator: Option<String>,
}

impl QueryResult {
    /// A final page holding every record
    pub fn complete(records: Vec<SObject>) -> Self {
        Self {
            size: records.len(),
            records,
            done: true,
            query_locator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteError {
    pub status_code: String,
    pub message: String,
    pub fields: Vec<String>,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)?;
        if !self.fields.is_empty() {
            write!(f, " ({})", self.fields.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveResult {
    pub success: bool,
    pub id: Option<String>,
    pub errors: Vec<RemoteError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteResult {
    pub success: bool,
    pub id: Option<String>,
    pub errors: Vec<RemoteError>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeGlobalSObject {
    pub name: String,
    pub key_prefix: Option<String>,
    pub label: String,
    pub custom: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeGlobalResult {
    pub sobjects: Vec<DescribeGlobalSObject>,
}

/// Field metadata as reported by `describeSObject`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteField {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub filterable: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeSObjectResult {
    pub name: String,
    pub fields: Vec<RemoteField>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetUserInfoResult {
    pub user_id: String,
    pub user_name: String,
    pub user_full_name: String,
    pub user_email: String,
    pub organization_id: String,
    pub organization_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResult {
    pub session_id: String,
    pub server_url: String,
    pub user_id: String,
    pub user_info: GetUserInfoResult,
}

/// Authenticated session the binding sends with every call
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub server_url: String,
    pub session_id: String,
}

impl SessionHandle {
    pub fn new<U: Into<String>, S: Into<String>>(server_url: U, session_id: S) -> Self {
        Self {
            server_url: server_url.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("server_url", &self.server_url)
            .field("session_id", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_namespace() {
        assert_eq!(FieldNode::text("sf:Name", "Acme").local_name(), "Name");
        assert_eq!(FieldNode::text("Name", "Acme").local_name(), "Name");
    }

    #[test]
    fn test_empty_nodes() {
        assert!(FieldNode::empty("sf:Phone").is_empty());
        assert!(FieldNode::nil("sf:Phone").is_empty());
        assert!(FieldNode::text("sf:Phone", "").is_empty());
        assert!(!FieldNode::text("sf:Phone", "555").is_empty());
        assert!(!FieldNode::nested("sf:Account", "Account", vec![]).is_empty());
    }

    #[test]
    fn test_nested_node_carries_type_metadata() {
        let node = FieldNode::nested(
            "sf:Account",
            "Account",
            vec![FieldNode::text("sf:Name", "Acme")],
        );
        assert!(node.has_attributes());
        assert_eq!(node.attribute(XSI_TYPE_ATTRIBUTE), Some(SOBJECT_XSI_TYPE));
        assert_eq!(node.inner_text(), "AccountAcme");
    }

    #[test]
    fn test_sobject_field_access() {
        let mut record = SObject::new("Account")
            .with_field("sf:Id", "001000000000001")
            .with_field("sf:Name", "Acme");
        assert_eq!(record.id(), Some("001000000000001"));
        assert_eq!(record.get_text("Name"), Some("Acme"));

        record.set_field("Name", "Globex");
        assert_eq!(record.get_text("Name"), Some("Globex"));
        assert_eq!(record.fields.len(), 2);

        assert!(record.remove_field("Id").is_some());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn test_session_handle_debug_hides_session_id() {
        let handle = SessionHandle::new("https://na1.example.com/services/Soap/u/26.0", "00Dsecret");
        let rendered = format!("{:?}", handle);
        assert!(!rendered.contains("00Dsecret"));
        assert!(rendered.contains("na1.example.com"));
    }

    #[test]
    fn test_remote_error_display() {
        let error = RemoteError {
            status_code: "REQUIRED_FIELD_MISSING".to_string(),
            message: "Required fields are missing".to_string(),
            fields: vec!["LastName".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "REQUIRED_FIELD_MISSING: Required fields are missing (LastName)"
        );
    }
}
