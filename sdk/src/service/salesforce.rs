//! Query and CRUD orchestration over a [`PartnerBinding`]

use crate::config::ServiceConfig;
use crate::entity::construction::construct_sobject;
use crate::entity::directive::ExtractionContext;
use crate::entity::traits::Entity;
use crate::entity::types::{EntityError, EntityResult, ID_FIELD_NAME};
use crate::entity::values::{FieldValue, FieldValues};
use crate::partner::{
    DeleteResult, GetUserInfoResult, PartnerBinding, QueryResult, RemoteError, SObject, SaveResult,
    SessionHandle,
};
use crate::service::fields::{FieldAttributes, FieldDescriptor, filter_fields};
use crate::service::oauth::{TokenResponse, UserInfoResponse};
use crate::service::query::{QueryBuilder, QueryCursor};
use crate::service::session::{GlobalSchema, SessionState, UserInfo};
use crate::service::{ERR_FIELDS_ARE_EMPTY, ERR_ID_FIELD_IS_AUTOGENERATED, ERR_ID_FIELD_IS_NOT_SET};
use tracing::{debug, info, warn};

/// Typed access to one remote organization through one authenticated session.
///
/// Every operation first checks the session. A disconnected service fails with
/// [`EntityError::NotConnected`], or, when `require_connection` is off, returns an
/// empty result (`Vec::new()`, `0`, `None`, `false`).
///
/// Writes handle exactly one record per call and succeed only when the server
/// returns a single successful result.
pub struct SalesforceService<B: PartnerBinding> {
    binding: B,
    config: ServiceConfig,
    session: SessionState,
}

impl<B: PartnerBinding> SalesforceService<B> {
    /// A disconnected service with the default configuration
    pub fn new(binding: B) -> Self {
        Self::with_config(binding, ServiceConfig::default())
    }

    /// A disconnected service; the configured timeout is handed to the binding
    pub fn with_config(mut binding: B, config: ServiceConfig) -> Self {
        binding.set_timeout(config.timeout());
        Self {
            binding,
            config,
            session: SessionState::default(),
        }
    }

    /// Attach to an already authenticated session
    pub async fn connect(
        binding: B,
        session: SessionHandle,
        config: ServiceConfig,
    ) -> EntityResult<Self> {
        let mut service = Self::with_config(binding, config);
        service.binding.bind_session(session);

        let info = service
            .binding
            .get_user_info()
            .await
            .map_err(|e| EntityError::remote("getUserInfo", e))?;
        let user = UserInfo {
            user_id: info.user_id,
            organization_id: info.organization_id,
            organization_name: info.organization_name,
        };
        service.establish(user).await?;
        Ok(service)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.connected
    }

    /// User of the current (or last) session
    pub fn user_info(&self) -> Option<&UserInfo> {
        self.session.user.as_ref()
    }

    /// Object types listed in the login snapshot
    pub fn object_types(&self) -> &[String] {
        self.session.schema.object_types()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut B {
        &mut self.binding
    }

    pub fn into_binding(self) -> B {
        self.binding
    }

    /// Log in with username, password and security token.
    ///
    /// Does nothing when already logged in. Returns the connected state.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        security_token: &str,
    ) -> EntityResult<bool> {
        if self.session.connected {
            debug!("Already logged in, ignoring login for {}", username);
            return Ok(true);
        }
        if username.trim().is_empty() {
            return Err(EntityError::invalid_argument("username"));
        }

        info!("Logging in as {}", username);
        let credential = format!("{}{}", password, security_token);
        let result = self
            .binding
            .login(username, &credential)
            .await
            .map_err(|e| EntityError::remote("login", e))?;

        self.binding
            .bind_session(SessionHandle::new(result.server_url, result.session_id));

        let user = UserInfo {
            user_id: result.user_id,
            organization_id: result.user_info.organization_id,
            organization_name: result.user_info.organization_name,
        };
        self.establish(user).await?;
        Ok(true)
    }

    /// Log in with the responses of an OAuth flow.
    ///
    /// The partner endpoint comes from `user_info.urls["partner"]` with `{version}`
    /// replaced by the configured API version.
    pub async fn login_oauth(
        &mut self,
        token: &TokenResponse,
        user_info: &UserInfoResponse,
    ) -> EntityResult<bool> {
        if self.session.connected {
            debug!("Already logged in, ignoring OAuth login");
            return Ok(true);
        }

        let url = user_info.partner_url(&self.config.api_version)?;
        if token.access_token.is_empty() {
            return Err(EntityError::invalid_argument("access_token"));
        }

        info!("Logging in through OAuth as {}", user_info.username);
        self.binding
            .bind_session(SessionHandle::new(url, token.access_token.clone()));

        let remote = self
            .binding
            .get_user_info()
            .await
            .map_err(|e| EntityError::remote("getUserInfo", e))?;

        let user = UserInfo {
            user_id: user_info.user_id.clone(),
            organization_id: user_info.organization_id.clone(),
            organization_name: remote.organization_name,
        };
        self.establish(user).await?;
        Ok(true)
    }

    /// Mark the session as closed. The schema snapshot is kept but no longer used.
    pub fn logout(&mut self) {
        if self.session.connected {
            info!("Logging out");
        }
        self.session.connected = false;
    }

    async fn establish(&mut self, user: UserInfo) -> EntityResult<()> {
        let describe = self
            .binding
            .describe_global()
            .await
            .map_err(|e| EntityError::remote("describeGlobal", e))?;
        let schema = GlobalSchema::from_describe(&describe);

        info!(
            "Connected to organization {} ({} object types)",
            user.organization_id,
            schema.len()
        );
        self.session = SessionState::connected(user, schema);
        Ok(())
    }

    /// `Ok(false)` means "disconnected, return an empty result"
    fn check_connected(&self) -> EntityResult<bool> {
        if self.session.connected {
            Ok(true)
        } else if self.config.require_connection {
            Err(EntityError::NotConnected)
        } else {
            debug!("Not logged in, returning an empty result");
            Ok(false)
        }
    }

    pub async fn get_user_info(&self) -> EntityResult<Option<GetUserInfoResult>> {
        if !self.check_connected()? {
            return Ok(None);
        }
        let info = self
            .binding
            .get_user_info()
            .await
            .map_err(|e| EntityError::remote("getUserInfo", e))?;
        Ok(Some(info))
    }

    /// Fields of an object type, narrowed by every requested attribute
    pub async fn get_fields(
        &self,
        object_type: &str,
        attributes: FieldAttributes,
    ) -> EntityResult<Vec<FieldDescriptor>> {
        if !self.check_connected()? {
            return Ok(Vec::new());
        }
        if object_type.trim().is_empty() {
            return Err(EntityError::invalid_argument("objectTypeName"));
        }

        let describe = self
            .binding
            .describe_sobject(object_type)
            .await
            .map_err(|e| EntityError::remote("describeSObject", e))?;

        let fields = filter_fields(&describe.fields, attributes);
        debug!(
            "{} of {} fields on {} match {:?}",
            fields.len(),
            describe.fields.len(),
            object_type,
            attributes
        );
        Ok(fields)
    }

    /// Object type of a record id, looked up by its key prefix
    pub fn get_object_type(&self, id: &str) -> EntityResult<Option<String>> {
        if !self.check_connected()? {
            return Ok(None);
        }
        if id.is_empty() {
            return Err(EntityError::invalid_argument("objectId"));
        }
        Ok(self.session.schema.object_type_for(id).map(str::to_string))
    }

    pub async fn count_records(
        &self,
        object_type: &str,
        where_clause: Option<&str>,
    ) -> EntityResult<usize> {
        if !self.check_connected()? {
            return Ok(0);
        }

        let query = QueryBuilder::count(object_type)
            .filter(where_clause)
            .build()?;
        debug!("Counting with: {}", query);

        let result = self
            .binding
            .query(&query)
            .await
            .map_err(|e| EntityError::remote("query", e))?;
        Ok(result.size)
    }

    pub async fn count<T: Entity>(&self, where_clause: Option<&str>) -> EntityResult<usize> {
        self.count_records(T::OBJECT_TYPE, where_clause).await
    }

    async fn first_page(&self, query: &str) -> EntityResult<QueryResult> {
        debug!("Running query: {}", query);
        if self.config.include_deleted {
            self.binding
                .query_all(query)
                .await
                .map_err(|e| EntityError::remote("queryAll", e))
        } else {
            self.binding
                .query(query)
                .await
                .map_err(|e| EntityError::remote("query", e))
        }
    }

    /// Page through a query one batch at a time
    pub async fn cursor(&self, query: &str) -> EntityResult<QueryCursor<'_, B>> {
        if !self.check_connected()? {
            return Ok(QueryCursor::empty(&self.binding));
        }
        if query.trim().is_empty() {
            return Err(EntityError::invalid_argument("queryString"));
        }

        let first = self.first_page(query).await?;
        Ok(QueryCursor::new(&self.binding, first))
    }

    /// Every record of a query, all pages concatenated in order
    pub async fn query(&self, query: &str) -> EntityResult<Vec<SObject>> {
        self.cursor(query).await?.collect_all().await
    }

    /// Like [`SalesforceService::query`], materializing each record as `T`
    pub async fn query_as<T: Entity>(&self, query: &str) -> EntityResult<Vec<T>> {
        let mut cursor = self.cursor(query).await?;
        let mut entities = Vec::with_capacity(cursor.size());
        while let Some(batch) = cursor.next_batch().await? {
            for record in &batch {
                entities.push(T::from_sobject(record)?);
            }
        }
        debug!(
            "Materialized {} {} records",
            entities.len(),
            T::OBJECT_TYPE
        );
        Ok(entities)
    }

    /// Select the given fields (plus `Id`) of an object type
    pub async fn get_objects<S: AsRef<str>>(
        &self,
        object_type: &str,
        fields: &[S],
        where_clause: Option<&str>,
        order_by: Option<&str>,
    ) -> EntityResult<Vec<SObject>> {
        if !self.check_connected()? {
            return Ok(Vec::new());
        }

        let query = QueryBuilder::select(object_type)
            .fields(fields.iter().map(|f| f.as_ref().to_string()))
            .filter(where_clause)
            .order_by(order_by)
            .build()?;
        self.query(&query).await
    }

    /// Select the given fields (plus `Id`) of `T`
    pub async fn get_entities_with<T: Entity, S: AsRef<str>>(
        &self,
        fields: &[S],
        where_clause: Option<&str>,
        order_by: Option<&str>,
    ) -> EntityResult<Vec<T>> {
        if !self.check_connected()? {
            return Ok(Vec::new());
        }

        let query = QueryBuilder::select(T::OBJECT_TYPE)
            .fields(fields.iter().map(|f| f.as_ref().to_string()))
            .filter(where_clause)
            .order_by(order_by)
            .build()?;
        self.query_as(&query).await
    }

    /// Select every readable field of `T`, including flattened relationship fields
    pub async fn get_entities<T: Entity>(
        &self,
        where_clause: Option<&str>,
        order_by: Option<&str>,
    ) -> EntityResult<Vec<T>> {
        if !self.check_connected()? {
            return Ok(Vec::new());
        }

        let fields = T::field_names(Some(ExtractionContext::Get))?;
        self.get_entities_with::<T, String>(&fields, where_clause, order_by)
            .await
    }

    pub async fn create_object(&self, object_type: &str, values: &FieldValues) -> EntityResult<bool> {
        if !self.check_connected()? {
            return Ok(false);
        }
        if object_type.trim().is_empty() {
            return Err(EntityError::invalid_argument("objectTypeName"));
        }
        if values.is_empty() {
            return Err(EntityError::invalid_operation(ERR_FIELDS_ARE_EMPTY));
        }
        if values.contains_key(ID_FIELD_NAME) {
            return Err(EntityError::invalid_operation(ERR_ID_FIELD_IS_AUTOGENERATED));
        }

        let record = construct_sobject(object_type, values)?;
        let results = self
            .binding
            .create(vec![record])
            .await
            .map_err(|e| EntityError::remote("create", e))?;
        Ok(save_succeeded("create", object_type, &results))
    }

    pub async fn create_object_for<T: Entity>(&self, values: &FieldValues) -> EntityResult<bool> {
        self.create_object(T::OBJECT_TYPE, values).await
    }

    /// Create a record from an entity's create-eligible fields
    pub async fn create<T: Entity>(&self, entity: &T) -> EntityResult<bool> {
        if !self.check_connected()? {
            return Ok(false);
        }
        let values = entity.field_values(Some(ExtractionContext::Create))?;
        self.create_object(T::OBJECT_TYPE, &values).await
    }

    pub async fn update_object(&self, object_type: &str, values: &FieldValues) -> EntityResult<bool> {
        if !self.check_connected()? {
            return Ok(false);
        }
        if object_type.trim().is_empty() {
            return Err(EntityError::invalid_argument("objectTypeName"));
        }
        if values.is_empty() {
            return Err(EntityError::invalid_operation(ERR_FIELDS_ARE_EMPTY));
        }
        let id_is_set = values
            .get(ID_FIELD_NAME)
            .and_then(FieldValue::to_text)
            .is_some_and(|id| !id.trim().is_empty());
        if !id_is_set {
            return Err(EntityError::invalid_operation(ERR_ID_FIELD_IS_NOT_SET));
        }

        let record = construct_sobject(object_type, values)?;
        let results = self
            .binding
            .update(vec![record])
            .await
            .map_err(|e| EntityError::remote("update", e))?;
        Ok(save_succeeded("update", object_type, &results))
    }

    pub async fn update_object_for<T: Entity>(&self, values: &FieldValues) -> EntityResult<bool> {
        self.update_object(T::OBJECT_TYPE, values).await
    }

    /// Update a record from an entity's update-eligible fields
    pub async fn update<T: Entity>(&self, entity: &T) -> EntityResult<bool> {
        if !self.check_connected()? {
            return Ok(false);
        }
        let values = entity.field_values(Some(ExtractionContext::Update))?;
        self.update_object(T::OBJECT_TYPE, &values).await
    }

    pub async fn delete(&self, id: &str) -> EntityResult<bool> {
        if !self.check_connected()? {
            return Ok(false);
        }
        if id.trim().is_empty() {
            return Err(EntityError::invalid_operation(ERR_ID_FIELD_IS_NOT_SET));
        }

        let results = self
            .binding
            .delete(vec![id.to_string()])
            .await
            .map_err(|e| EntityError::remote("delete", e))?;
        Ok(delete_succeeded(id, &results))
    }
}

fn describe_errors(errors: &[RemoteError]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(RemoteError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn save_succeeded(operation: &str, object_type: &str, results: &[SaveResult]) -> bool {
    match results {
        [result] if result.success => {
            debug!(
                "{} {} succeeded: {}",
                operation,
                object_type,
                result.id.as_deref().unwrap_or("-")
            );
            true
        }
        [result] => {
            warn!(
                "{} {} failed: {}",
                operation,
                object_type,
                describe_errors(&result.errors)
            );
            false
        }
        _ => {
            warn!(
                "{} {} returned {} results for one record",
                operation,
                object_type,
                results.len()
            );
            false
        }
    }
}

fn delete_succeeded(id: &str, results: &[DeleteResult]) -> bool {
    match results {
        [result] if result.success => {
            debug!("delete {} succeeded", id);
            true
        }
        [result] => {
            warn!("delete {} failed: {}", id, describe_errors(&result.errors));
            false
        }
        _ => {
            warn!("delete {} returned {} results for one id", id, results.len());
            false
        }
    }
}
