// In-memory partner endpoint for testing
use crate::entity::types::ID_FIELD_NAME;
use crate::partner::{
    DeleteResult, DescribeGlobalResult, DescribeGlobalSObject, DescribeSObjectResult,
    GetUserInfoResult, LoginResult, PartnerBinding, QueryResult, RemoteError, RemoteField, SObject,
    SaveResult, SessionHandle,
};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 200;
const DEFAULT_KEY_PREFIX: &str = "a00";
const ID_LENGTH: usize = 15;

/// [`PartnerBinding`] that keeps records in memory.
///
/// Queries understand `SELECT ... FROM <type>` and `SELECT COUNT() FROM <type>`
/// only; any `WHERE` clause is ignored. Scripted pages take precedence over stored
/// records. Every call is counted, see [`MemoryBinding::call_count`].
#[derive(Debug)]
pub struct MemoryBinding {
    // object type -> record id -> record
    records: DashMap<String, DashMap<String, SObject>>,
    describes: DashMap<String, DescribeSObjectResult>,
    global: DashMap<String, DescribeGlobalSObject>,
    // username -> password with security token appended
    credentials: DashMap<String, String>,
    user_info: GetUserInfoResult,
    session: Option<SessionHandle>,
    timeout: Option<Duration>,
    page_size: usize,
    scripted: Mutex<VecDeque<QueryResult>>,
    cursors: DashMap<String, QueryResult>,
    failures: DashMap<&'static str, String>,
    calls: DashMap<&'static str, usize>,
    queries: Mutex<Vec<String>>,
    counter: AtomicU64,
}

impl MemoryBinding {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            describes: DashMap::new(),
            global: DashMap::new(),
            credentials: DashMap::new(),
            user_info: GetUserInfoResult::default(),
            session: None,
            timeout: None,
            page_size: DEFAULT_PAGE_SIZE,
            scripted: Mutex::new(VecDeque::new()),
            cursors: DashMap::new(),
            failures: DashMap::new(),
            calls: DashMap::new(),
            queries: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// A binding that already holds a session, as if logged in elsewhere
    pub fn connected() -> Self {
        let mut binding = Self::new();
        binding.session = Some(SessionHandle::new(
            "https://memory.example.com/services/Soap/u/26.0",
            "00Dmemory!session",
        ));
        binding
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_user(mut self, user_info: GetUserInfoResult) -> Self {
        self.user_info = user_info;
        self
    }

    /// Accept `password + security_token` for the given username
    pub fn with_credentials(self, username: &str, password: &str, security_token: &str) -> Self {
        self.credentials
            .insert(username.to_string(), format!("{}{}", password, security_token));
        self
    }

    /// Register an object type in the global describe
    pub fn with_object_type(self, name: &str, key_prefix: Option<&str>) -> Self {
        self.global.insert(
            name.to_string(),
            DescribeGlobalSObject {
                name: name.to_string(),
                key_prefix: key_prefix.map(str::to_string),
                label: name.to_string(),
                custom: name.ends_with("__c"),
            },
        );
        self
    }

    /// Register the field describe of an object type
    pub fn with_fields(self, object_type: &str, fields: Vec<RemoteField>) -> Self {
        self.describes.insert(
            object_type.to_string(),
            DescribeSObjectResult {
                name: object_type.to_string(),
                fields,
            },
        );
        self
    }

    /// Store a record as is; it must carry an `Id` field
    pub fn insert_record(&self, object_type: &str, record: SObject) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| anyhow!("record has no Id"))?
            .to_string();
        self.records
            .entry(object_type.to_string())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    /// Serve the next query from these pages instead of stored records.
    ///
    /// Pages are linked with generated locators; the last page is marked done.
    pub async fn script_pages(&self, pages: Vec<Vec<SObject>>) {
        let total: usize = pages.iter().map(Vec::len).sum();
        let prefix = format!("01gscript{}", self.next_counter());
        let mut results = self.link_pages(&prefix, pages, total);
        if results.is_empty() {
            results.push(QueryResult::complete(Vec::new()));
        }

        let first = results.remove(0);
        self.register_cursors(&prefix, results);
        self.scripted.lock().await.push_back(first);
    }

    /// Make the next call of `operation` fail with the given message
    pub fn fail_next(&self, operation: &'static str, message: &str) {
        self.failures.insert(operation, message.to_string());
    }

    /// Number of times `operation` (e.g. `"queryMore"`) was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// Every query string received, in order
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get_record(&self, object_type: &str, id: &str) -> Option<SObject> {
        self.records
            .get(object_type)
            .and_then(|table| table.get(id).map(|entry| entry.value().clone()))
    }

    /// Stored records of a type, ordered by id
    pub fn list_records(&self, object_type: &str) -> Vec<SObject> {
        let mut records: Vec<SObject> = self
            .records
            .get(object_type)
            .map(|table| table.iter().map(|entry| entry.value().clone()).collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.id().cmp(&b.id()));
        records
    }

    pub fn record_count(&self, object_type: &str) -> usize {
        self.records
            .get(object_type)
            .map(|table| table.len())
            .unwrap_or(0)
    }

    fn next_counter(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn generate_id(&self, object_type: &str) -> String {
        let prefix = self
            .global
            .get(object_type)
            .and_then(|entry| entry.key_prefix.clone())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        let width = ID_LENGTH.saturating_sub(prefix.len());
        format!("{}{:0width$}", prefix, self.next_counter(), width = width)
    }

    fn record_call(&self, operation: &'static str) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;

        if let Some((_, message)) = self.failures.remove(operation) {
            bail!("{}", message);
        }
        Ok(())
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_none() {
            bail!("INVALID_SESSION_ID: no session is bound");
        }
        Ok(())
    }

    fn link_pages(&self, prefix: &str, pages: Vec<Vec<SObject>>, total: usize) -> Vec<QueryResult> {
        let count = pages.len();
        pages
            .into_iter()
            .enumerate()
            .map(|(index, records)| {
                let done = index + 1 == count;
                QueryResult {
                    records,
                    size: total,
                    done,
                    query_locator: (!done).then(|| format!("{}-{}", prefix, index + 1)),
                }
            })
            .collect()
    }

    /// Page n of a linked sequence is reachable through `<prefix>-n`
    fn register_cursors(&self, prefix: &str, rest: Vec<QueryResult>) {
        for (index, page) in rest.into_iter().enumerate() {
            self.cursors.insert(format!("{}-{}", prefix, index + 1), page);
        }
    }

    async fn run_query(&self, query: &str) -> Result<QueryResult> {
        self.require_session()?;
        self.queries.lock().await.push(query.to_string());

        if let Some(page) = self.scripted.lock().await.pop_front() {
            return Ok(page);
        }

        let object_type = parse_object_type(query)
            .ok_or_else(|| anyhow!("MALFORMED_QUERY: no FROM clause in '{}'", query))?;

        if is_count_query(query) {
            return Ok(QueryResult {
                records: Vec::new(),
                size: self.record_count(&object_type),
                done: true,
                query_locator: None,
            });
        }

        let records = self.list_records(&object_type);
        let total = records.len();
        if total <= self.page_size {
            return Ok(QueryResult::complete(records));
        }

        let pages: Vec<Vec<SObject>> = records
            .chunks(self.page_size)
            .map(<[SObject]>::to_vec)
            .collect();
        let prefix = format!("01gquery{}", self.next_counter());
        let mut results = self.link_pages(&prefix, pages, total);
        let first = results.remove(0);
        self.register_cursors(&prefix, results);
        Ok(first)
    }

    fn find_record_type(&self, id: &str) -> Option<String> {
        self.records
            .iter()
            .find(|table| table.value().contains_key(id))
            .map(|table| table.key().clone())
    }
}

impl Default for MemoryBinding {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_object_type(query: &str) -> Option<String> {
    let mut tokens = query.split_whitespace();
    tokens
        .by_ref()
        .find(|token| token.eq_ignore_ascii_case("FROM"))?;
    tokens.next().map(str::to_string)
}

fn is_count_query(query: &str) -> bool {
    query.to_ascii_uppercase().contains("COUNT()")
}

fn failed_save(status_code: &str, message: &str) -> SaveResult {
    SaveResult {
        success: false,
        id: None,
        errors: vec![RemoteError {
            status_code: status_code.to_string(),
            message: message.to_string(),
            fields: Vec::new(),
        }],
    }
}

#[async_trait]
impl PartnerBinding for MemoryBinding {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult> {
        self.record_call("login")?;
        match self.credentials.get(username) {
            Some(expected) if expected.value() == password => {
                debug!("Memory login accepted for {}", username);
                Ok(LoginResult {
                    session_id: format!("00Dmemory!{}", self.next_counter()),
                    server_url: "https://memory.example.com/services/Soap/u/26.0".to_string(),
                    user_id: self.user_info.user_id.clone(),
                    user_info: self.user_info.clone(),
                })
            }
            _ => bail!("INVALID_LOGIN: Invalid username, password, security token; or user locked out."),
        }
    }

    fn bind_session(&mut self, session: SessionHandle) {
        self.session = Some(session);
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    async fn describe_global(&self) -> Result<DescribeGlobalResult> {
        self.record_call("describeGlobal")?;
        self.require_session()?;
        let mut sobjects: Vec<DescribeGlobalSObject> =
            self.global.iter().map(|entry| entry.value().clone()).collect();
        sobjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(DescribeGlobalResult { sobjects })
    }

    async fn describe_sobject(&self, object_type: &str) -> Result<DescribeSObjectResult> {
        self.record_call("describeSObject")?;
        self.require_session()?;
        self.describes
            .get(object_type)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow!("INVALID_TYPE: sObject type '{}' is not supported", object_type))
    }

    async fn query(&self, query: &str) -> Result<QueryResult> {
        self.record_call("query")?;
        self.run_query(query).await
    }

    async fn query_all(&self, query: &str) -> Result<QueryResult> {
        self.record_call("queryAll")?;
        self.run_query(query).await
    }

    async fn query_more(&self, query_locator: &str) -> Result<QueryResult> {
        self.record_call("queryMore")?;
        self.require_session()?;
        self.cursors
            .remove(query_locator)
            .map(|(_, page)| page)
            .ok_or_else(|| anyhow!("INVALID_QUERY_LOCATOR: {}", query_locator))
    }

    async fn create(&self, records: Vec<SObject>) -> Result<Vec<SaveResult>> {
        self.record_call("create")?;
        self.require_session()?;

        let results = records
            .into_iter()
            .map(|mut record| {
                let Some(object_type) = record.object_type.clone() else {
                    return failed_save("INVALID_TYPE", "record has no object type");
                };
                if record.id().is_some() {
                    return failed_save("INVALID_FIELD", "cannot specify Id in an insert call");
                }

                let id = self.generate_id(&object_type);
                record.set_field(ID_FIELD_NAME, id.clone());
                record.fields_to_null.clear();
                self.records
                    .entry(object_type)
                    .or_default()
                    .insert(id.clone(), record);

                SaveResult {
                    success: true,
                    id: Some(id),
                    errors: Vec::new(),
                }
            })
            .collect();
        Ok(results)
    }

    async fn update(&self, records: Vec<SObject>) -> Result<Vec<SaveResult>> {
        self.record_call("update")?;
        self.require_session()?;

        let results = records
            .into_iter()
            .map(|record| {
                let Some(id) = record.id().map(str::to_string) else {
                    return failed_save("MISSING_ARGUMENT", "Id not specified in an update call");
                };
                let Some(object_type) = self.find_record_type(&id) else {
                    return failed_save("ENTITY_IS_DELETED", "entity is deleted");
                };
                let Some(table) = self.records.get(&object_type) else {
                    return failed_save("ENTITY_IS_DELETED", "entity is deleted");
                };
                let Some(mut stored) = table.get_mut(&id) else {
                    return failed_save("ENTITY_IS_DELETED", "entity is deleted");
                };

                for node in &record.fields {
                    if let Some(text) = &node.text {
                        stored.set_field(node.local_name(), text.clone());
                    }
                }
                for name in &record.fields_to_null {
                    stored.remove_field(name);
                }

                SaveResult {
                    success: true,
                    id: Some(id),
                    errors: Vec::new(),
                }
            })
            .collect();
        Ok(results)
    }

    async fn delete(&self, ids: Vec<String>) -> Result<Vec<DeleteResult>> {
        self.record_call("delete")?;
        self.require_session()?;

        let results = ids
            .into_iter()
            .map(|id| {
                let removed = self
                    .find_record_type(&id)
                    .and_then(|object_type| self.records.get(&object_type))
                    .and_then(|table| table.remove(&id));
                match removed {
                    Some(_) => DeleteResult {
                        success: true,
                        id: Some(id),
                        errors: Vec::new(),
                    },
                    None => DeleteResult {
                        success: false,
                        id: Some(id),
                        errors: vec![RemoteError {
                            status_code: "ENTITY_IS_DELETED".to_string(),
                            message: "entity is deleted".to_string(),
                            fields: Vec::new(),
                        }],
                    },
                }
            })
            .collect();
        Ok(results)
    }

    async fn get_user_info(&self) -> Result<GetUserInfoResult> {
        self.record_call("getUserInfo")?;
        self.require_session()?;
        Ok(self.user_info.clone())
    }
}
