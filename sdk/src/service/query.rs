//! Query string building and paginated reads

use crate::entity::types::{EntityError, EntityResult, ID_FIELD_NAME};
use crate::partner::{PartnerBinding, QueryResult, SObject};
use crate::service::ERR_FIELDS_ARE_EMPTY;
use tracing::debug;

/// Builder for `SELECT` and `SELECT COUNT()` queries.
///
/// Clauses are passed through verbatim; callers own their escaping.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    object_type: String,
    fields: Vec<String>,
    where_clause: Option<String>,
    order_by: Option<String>,
    count: bool,
}

impl QueryBuilder {
    /// Start a `SELECT <fields> FROM <object_type>` query
    pub fn select<T: Into<String>>(object_type: T) -> Self {
        Self {
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    /// Start a `SELECT COUNT() FROM <object_type>` query
    pub fn count<T: Into<String>>(object_type: T) -> Self {
        Self {
            object_type: object_type.into(),
            count: true,
            ..Default::default()
        }
    }

    pub fn field<F: Into<String>>(mut self, field: F) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Set the `WHERE` clause; blank clauses are ignored
    pub fn filter<W: AsRef<str>>(mut self, clause: Option<W>) -> Self {
        self.where_clause = non_blank(clause);
        self
    }

    /// Set the `ORDER BY` clause; blank clauses are ignored
    pub fn order_by<O: AsRef<str>>(mut self, clause: Option<O>) -> Self {
        self.order_by = non_blank(clause);
        self
    }

    pub fn build(&self) -> EntityResult<String> {
        if self.object_type.trim().is_empty() {
            return Err(EntityError::invalid_argument("objectTypeName"));
        }

        let mut query = if self.count {
            format!("SELECT COUNT() FROM {}", self.object_type)
        } else {
            if self.fields.is_empty() {
                return Err(EntityError::invalid_operation(ERR_FIELDS_ARE_EMPTY));
            }
            let mut fields = self.fields.clone();
            ensure_id_field(&mut fields);
            format!("SELECT {} FROM {}", fields.join(", "), self.object_type)
        };

        if let Some(clause) = &self.where_clause {
            query.push_str(" WHERE ");
            query.push_str(clause);
        }
        if let Some(clause) = self.order_by.as_ref().filter(|_| !self.count) {
            query.push_str(" ORDER BY ");
            query.push_str(clause);
        }

        Ok(query)
    }
}

fn non_blank<S: AsRef<str>>(clause: Option<S>) -> Option<String> {
    clause
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Put `Id` at the front of a field list unless it is already there (any case)
pub fn ensure_id_field(fields: &mut Vec<String>) {
    if !fields.iter().any(|f| f.eq_ignore_ascii_case(ID_FIELD_NAME)) {
        fields.insert(0, ID_FIELD_NAME.to_string());
    }
}

/// Lazily walks the pages of one query.
///
/// The next page is only requested once the previous page's locator is known.
pub struct QueryCursor<'a, B: PartnerBinding> {
    binding: &'a B,
    pending: Option<QueryResult>,
    locator: Option<String>,
    done: bool,
    size: usize,
    pages: usize,
}

impl<'a, B: PartnerBinding> QueryCursor<'a, B> {
    /// Wrap the first page of a query
    pub fn new(binding: &'a B, first: QueryResult) -> Self {
        Self {
            binding,
            size: first.size,
            pending: Some(first),
            locator: None,
            done: false,
            pages: 0,
        }
    }

    /// A cursor over nothing
    pub fn empty(binding: &'a B) -> Self {
        Self {
            binding,
            pending: None,
            locator: None,
            done: true,
            size: 0,
            pages: 0,
        }
    }

    /// Total rows the server reported for the query
    pub fn size(&self) -> usize {
        self.size
    }

    /// Pages handed out so far
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn is_done(&self) -> bool {
        self.done && self.pending.is_none()
    }

    /// Next batch of records, `None` once the server reported completion
    pub async fn next_batch(&mut self) -> EntityResult<Option<Vec<SObject>>> {
        let page = match self.pending.take() {
            Some(page) => page,
            None if self.done => return Ok(None),
            None => {
                let locator = self.locator.take().ok_or_else(|| {
                    EntityError::remote("queryMore", "page is not done but carries no query locator")
                })?;
                debug!("Fetching next page with locator {}", locator);
                self.binding
                    .query_more(&locator)
                    .await
                    .map_err(|e| EntityError::remote("queryMore", e))?
            }
        };

        self.done = page.done;
        self.locator = page.query_locator;
        self.pages += 1;
        if !self.done && self.locator.is_none() {
            return Err(EntityError::remote(
                "queryMore",
                "page is not done but carries no query locator",
            ));
        }
        Ok(Some(page.records))
    }

    /// Drain every remaining page in order
    pub async fn collect_all(mut self) -> EntityResult<Vec<SObject>> {
        let mut records = Vec::with_capacity(self.size);
        while let Some(batch) = self.next_batch().await? {
            records.extend(batch);
        }
        debug!("Read {} records over {} pages", records.len(), self.pages);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_query() {
        let query = QueryBuilder::select("Account")
            .fields(["Name", "Phone"])
            .filter(Some("Name LIKE 'A%'"))
            .order_by(Some("Name"))
            .build()
            .unwrap();
        assert_eq!(
            query,
            "SELECT Id, Name, Phone FROM Account WHERE Name LIKE 'A%' ORDER BY Name"
        );
    }

    #[test]
    fn test_id_is_not_duplicated() {
        let query = QueryBuilder::select("Account")
            .fields(["Name", "ID"])
            .build()
            .unwrap();
        assert_eq!(query, "SELECT Name, ID FROM Account");
    }

    #[test]
    fn test_count_query() {
        let query = QueryBuilder::count("Contact")
            .filter(Some("LastName = 'Doe'"))
            .order_by(Some("LastName"))
            .build()
            .unwrap();
        assert_eq!(query, "SELECT COUNT() FROM Contact WHERE LastName = 'Doe'");

        let query = QueryBuilder::count("Contact").filter(Some("  ")).build().unwrap();
        assert_eq!(query, "SELECT COUNT() FROM Contact");
    }

    #[test]
    fn test_invalid_queries() {
        let err = QueryBuilder::select("").field("Name").build().unwrap_err();
        assert!(matches!(err, EntityError::InvalidArgument { .. }));

        let err = QueryBuilder::select("Account").build().unwrap_err();
        assert!(matches!(err, EntityError::InvalidOperation { .. }));
    }

    #[test]
    fn test_ensure_id_field() {
        let mut fields = vec!["Name".to_string()];
        ensure_id_field(&mut fields);
        assert_eq!(fields, vec!["Id", "Name"]);

        let mut fields = vec!["Name".to_string(), "id".to_string()];
        ensure_id_field(&mut fields);
        assert_eq!(fields, vec!["Name", "id"]);
    }
}
