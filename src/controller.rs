use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ColumnType, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, Iterable, PaginatorTrait, QueryFilter, Select,
    TransactionTrait, sea_query::Expr,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::context::{Action, RequestContext};
use crate::errors::ApiError;
use crate::models::{PerPage, Trashed};
use crate::pagination::{PageMeta, calculate_content_range};
use crate::query::QuerySpec;
use crate::traits::{MergeIntoActiveModel, Resource};
use crate::validation::{Presence, ValidationErrors};

/// `{data, meta}` body of list responses, plus the `Content-Range` header
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Value>,
    pub meta: Map<String, Value>,
    #[serde(skip)]
    pub headers: HeaderMap,
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        let headers = self.headers.clone();
        (headers, Json(self)).into_response()
    }
}

/// Generic REST actions for one resource.
///
/// Every mutating action runs in its own transaction; hooks receive that
/// transaction so their writes commit or roll back together with the row.
pub struct ResourceController<R: Resource> {
    resource: R,
    config: ControllerConfig,
    db: DatabaseConnection,
}

impl<R: Resource> ResourceController<R> {
    pub fn new(resource: R, config: ControllerConfig, db: DatabaseConnection) -> Self {
        Self {
            resource,
            config,
            db,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// List the collection.
    ///
    /// # Errors
    /// Validator rejections, metadata hook errors and database failures.
    pub async fn index(&self, ctx: &RequestContext) -> Result<ListResponse, ApiError> {
        self.run_validator(Action::Index, ctx).await?;
        let spec = QuerySpec::resolve(&ctx.params, &self.config);

        if spec.only_meta {
            let meta = self.merge_metadata(ctx, &spec, Map::new()).await?;
            return Ok(ListResponse {
                data: Vec::new(),
                meta,
                headers: HeaderMap::new(),
            });
        }

        let query = self.resource.smart_sort(self.scoped(ctx, &spec), &spec);
        let (models, page) = match spec.per_page {
            PerPage::All => {
                let models = query.all(&self.db).await?;
                let page = PageMeta::all(models.len() as u64);
                (models, page)
            }
            PerPage::Count(per_page) => {
                (spec.page - 1)
                    .checked_mul(per_page)
                    .filter(|offset| i64::try_from(*offset).is_ok())
                    .ok_or_else(|| ApiError::bad_request(format!("page {} is out of range", spec.page)))?;
                let paginator = query.paginate(&self.db, per_page);
                let total = paginator.num_items().await?;
                let models = paginator.fetch_page(spec.page - 1).await?;
                let count = models.len() as u64;
                (models, PageMeta::new(total, per_page, spec.page, count))
            }
        };

        tracing::debug!(
            resource = R::RESOURCE_NAME_PLURAL,
            total = page.total,
            page = page.current_page,
            returned = models.len(),
            "Listed resources"
        );

        let headers = calculate_content_range(
            page.offset(),
            models.len() as u64,
            page.total,
            R::RESOURCE_NAME_PLURAL,
        );
        let data = self.render_many(&self.db, models, &spec).await?;
        let meta = self.merge_metadata(ctx, &spec, page.into_map()).await?;
        Ok(ListResponse {
            data,
            meta,
            headers,
        })
    }

    /// Fetch a single item by key.
    ///
    /// # Errors
    /// `NotFound` when the key matches nothing in the current trashed scope.
    pub async fn show(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        self.run_validator(Action::Show, ctx).await?;
        let spec = QuerySpec::resolve(&ctx.params, &self.config);
        let model = self.find_item(&self.db, ctx, &spec).await?;
        self.render_single(&self.db, model, &spec).await
    }

    /// Create an item from the JSON body.
    ///
    /// # Errors
    /// `ValidationFailed` for rule or payload failures; any hook error rolls
    /// the insert back.
    pub async fn store(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        self.run_validator(Action::Store, ctx).await?;
        let input = self.resource.prepare_input(Action::Store, ctx.body.clone());
        self.resource.rules(Action::Store).check(&input, Presence::Full)?;
        let payload: R::CreateModel = decode_payload(input)?;
        let spec = QuerySpec::resolve(&ctx.params, &self.config);

        let txn = self.db.begin().await?;
        let result = self.store_in(&txn, payload, &spec).await;
        finish(txn, result).await
    }

    async fn store_in(
        &self,
        txn: &DatabaseTransaction,
        payload: R::CreateModel,
        spec: &QuerySpec,
    ) -> Result<Value, ApiError> {
        let active: R::ActiveModel = payload.into();
        let active = self.resource.before_save(txn, active, Action::Store).await?;
        let model = active.insert(txn).await?;
        let model = self.resource.after_save(txn, model, Action::Store).await?;
        let model = self.refetch(txn, &model).await?;
        tracing::info!(resource = R::RESOURCE_NAME_SINGULAR, "Stored resource");
        self.render_single(txn, model, spec).await
    }

    /// Apply a partial update to an existing item.
    ///
    /// # Errors
    /// `NotFound` before anything is written; otherwise as for `store`.
    pub async fn update(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        self.run_validator(Action::Update, ctx).await?;
        let input = self.resource.prepare_input(Action::Update, ctx.body.clone());
        self.resource.rules(Action::Update).check(&input, Presence::Partial)?;
        let spec = QuerySpec::resolve(&ctx.params, &self.config);

        let txn = self.db.begin().await?;
        let result = self.update_in(&txn, ctx, input, &spec).await;
        finish(txn, result).await
    }

    async fn update_in(
        &self,
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        input: Map<String, Value>,
        spec: &QuerySpec,
    ) -> Result<Value, ApiError> {
        let existing = self.find_item(txn, ctx, spec).await?;
        let payload: R::UpdateModel = decode_payload(input)?;

        let original = R::ActiveModel::from(existing.clone());
        let merged = payload.merge_into_activemodel(original.clone())?;
        let merged = drop_unchanged::<R>(merged, &original);
        let active = self.resource.before_save(txn, merged, Action::Update).await?;

        let model = if active.is_changed() {
            active.update(txn).await?
        } else {
            tracing::debug!(resource = R::RESOURCE_NAME_SINGULAR, "Update carried no changes");
            existing
        };
        let model = self.resource.after_save(txn, model, Action::Update).await?;
        let model = self.refetch(txn, &model).await?;
        self.render_single(txn, model, spec).await
    }

    /// Delete an item, softly when the resource has a soft-delete column.
    ///
    /// # Errors
    /// `NotFound` when the key matches nothing in the current trashed scope.
    pub async fn destroy(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        self.run_validator(Action::Destroy, ctx).await?;
        let spec = QuerySpec::resolve(&ctx.params, &self.config);

        let txn = self.db.begin().await?;
        let result = self.destroy_in(&txn, ctx, &spec).await;
        finish(txn, result).await
    }

    async fn destroy_in(
        &self,
        txn: &DatabaseTransaction,
        ctx: &RequestContext,
        spec: &QuerySpec,
    ) -> Result<Value, ApiError> {
        let model = self.find_item(txn, ctx, spec).await?;
        match self.resource.soft_delete_column() {
            Some(column) => self.set_deleted_at(txn, &model, column, Some(Utc::now())).await?,
            None => {
                let result = R::ActiveModel::from(model).delete(txn).await?;
                if result.rows_affected == 0 {
                    return Err(self.not_found(ctx));
                }
            }
        }
        tracing::info!(
            resource = R::RESOURCE_NAME_SINGULAR,
            key = ctx.key_or_empty(),
            "Deleted resource"
        );
        Ok(Value::Object(Map::new()))
    }

    /// Clear the soft-delete marker of a trashed item.
    ///
    /// # Errors
    /// `NotPermitted` when the resource has no soft-delete column, checked
    /// before the validator runs.
    pub async fn restore(&self, ctx: &RequestContext) -> Result<Value, ApiError> {
        let Some(column) = self.resource.soft_delete_column() else {
            return Err(ApiError::not_permitted("Cannot restore non soft deletable object"));
        };
        self.run_validator(Action::Restore, ctx).await?;
        let mut spec = QuerySpec::resolve(&ctx.params, &self.config);
        spec.trashed = Trashed::With;

        let txn = self.db.begin().await?;
        let result: Result<Value, ApiError> = async {
            let model = self.find_item(&txn, ctx, &spec).await?;
            self.set_deleted_at(&txn, &model, column, None).await?;
            Ok(Value::from("ok"))
        }
        .await;
        finish(txn, result).await
    }

    /// Output of the metadata hook alone.
    ///
    /// # Errors
    /// Whatever the metadata hook returns.
    pub async fn metadata(&self, ctx: &RequestContext) -> Result<Map<String, Value>, ApiError> {
        self.run_validator(Action::Metadata, ctx).await?;
        self.resource.generate_metadata(&self.db, ctx).await
    }

    async fn run_validator(&self, action: Action, ctx: &RequestContext) -> Result<(), ApiError> {
        match self.config.validator_for(action) {
            Some(validator) => validator.validate(ctx).await,
            None => Ok(()),
        }
    }

    /// Pagination keys win over hook-provided keys of the same name
    async fn merge_metadata(
        &self,
        ctx: &RequestContext,
        spec: &QuerySpec,
        mut meta: Map<String, Value>,
    ) -> Result<Map<String, Value>, ApiError> {
        if !spec.only_data {
            for (key, value) in self.resource.generate_metadata(&self.db, ctx).await? {
                meta.entry(key).or_insert(value);
            }
        }
        Ok(meta)
    }

    fn scoped(&self, ctx: &RequestContext, spec: &QuerySpec) -> Select<R::Entity> {
        let query = self.resource.get_filtered(ctx, spec);
        let Some(column) = self.resource.soft_delete_column() else {
            return query;
        };
        match spec.trashed {
            Trashed::Without => query.filter(column.is_null()),
            Trashed::With => query,
            Trashed::Only => query.filter(column.is_not_null()),
        }
    }

    fn key_column(&self) -> Result<R::Column, ApiError> {
        match &self.config.get_item_by {
            None => Ok(R::ID_COLUMN),
            Some(name) => R::Column::from_str(name).map_err(|_| {
                ApiError::internal(
                    "Misconfigured lookup column",
                    Some(format!("{} has no column '{name}'", R::RESOURCE_NAME_PLURAL)),
                )
            }),
        }
    }

    fn not_found(&self, ctx: &RequestContext) -> ApiError {
        ApiError::not_found(R::RESOURCE_NAME_SINGULAR, ctx.key.clone())
    }

    async fn find_item<C>(
        &self,
        db: &C,
        ctx: &RequestContext,
        spec: &QuerySpec,
    ) -> Result<R::Model, ApiError>
    where
        C: ConnectionTrait,
    {
        let column = self.key_column()?;
        let Some(key) = parse_key(column, ctx.key_or_empty()) else {
            return Err(self.not_found(ctx));
        };
        self.scoped(ctx, spec)
            .filter(column.eq(key))
            .one(db)
            .await?
            .ok_or_else(|| self.not_found(ctx))
    }

    /// Reload a written row so the response reflects database defaults
    async fn refetch<C>(&self, db: &C, model: &R::Model) -> Result<R::Model, ApiError>
    where
        C: ConnectionTrait,
    {
        let id = primary_key_value::<R>(model)?;
        R::Entity::find()
            .filter(R::ID_COLUMN.eq(id))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found(R::RESOURCE_NAME_SINGULAR, None))
    }

    async fn set_deleted_at(
        &self,
        txn: &DatabaseTransaction,
        model: &R::Model,
        column: R::Column,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), ApiError> {
        let id = primary_key_value::<R>(model)?;
        let result = R::Entity::update_many()
            .col_expr(column, Expr::value(sea_orm::Value::from(at)))
            .filter(R::ID_COLUMN.eq(id))
            .exec(txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ApiError::not_found(R::RESOURCE_NAME_SINGULAR, None));
        }
        Ok(())
    }

    async fn render_single<C>(
        &self,
        db: &C,
        model: R::Model,
        spec: &QuerySpec,
    ) -> Result<Value, ApiError>
    where
        C: ConnectionTrait,
    {
        self.render_many(db, vec![model], spec)
            .await?
            .pop()
            .ok_or_else(|| ApiError::internal("Rendering produced no item", None))
    }

    async fn render_many<C>(
        &self,
        db: &C,
        models: Vec<R::Model>,
        spec: &QuerySpec,
    ) -> Result<Vec<Value>, ApiError>
    where
        C: ConnectionTrait,
    {
        let relations = if spec.with.is_empty() {
            vec![Map::new(); models.len()]
        } else {
            self.resource.load_relations(db, &models, &spec.with).await?
        };
        if relations.len() != models.len() {
            return Err(ApiError::internal(
                "Relation loader returned the wrong number of rows",
                Some(format!(
                    "{}: expected {}, got {}",
                    R::RESOURCE_NAME_PLURAL,
                    models.len(),
                    relations.len()
                )),
            ));
        }

        let appends = self.config.appends.resolve(&spec.with);
        models
            .iter()
            .zip(relations)
            .map(|(model, loaded)| self.render_item(model, loaded, &appends, spec))
            .collect()
    }

    /// transform → relations → appended attributes → field projection
    fn render_item(
        &self,
        model: &R::Model,
        loaded: Map<String, Value>,
        appends: &[&str],
        spec: &QuerySpec,
    ) -> Result<Value, ApiError> {
        let mut item = match self.resource.transform(model)? {
            Value::Object(item) => item,
            other => return Ok(other),
        };

        for (relation, value) in loaded {
            if spec.with.contains(&relation) {
                item.insert(relation, value);
            }
        }
        for &attribute in appends {
            if let Some(value) = self.resource.append_attribute(attribute, &item) {
                item.insert(attribute.to_string(), value);
            }
        }
        if let Some(fields) = &spec.fields {
            item.retain(|key, _| {
                fields.contains(key) || spec.with.contains(key) || appends.contains(&key.as_str())
            });
        }
        Ok(Value::Object(item))
    }
}

async fn finish<T>(txn: DatabaseTransaction, result: Result<T, ApiError>) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}

fn primary_key_value<R: Resource>(model: &R::Model) -> Result<sea_orm::Value, ApiError> {
    R::ActiveModel::from(model.clone())
        .get(R::ID_COLUMN)
        .into_value()
        .ok_or_else(|| ApiError::internal("Saved row has no primary key", None))
}

/// Turn Set values equal to the stored ones back into NotSet
fn drop_unchanged<R: Resource>(mut merged: R::ActiveModel, original: &R::ActiveModel) -> R::ActiveModel {
    for column in R::Column::iter() {
        if let ActiveValue::Set(value) = merged.get(column) {
            if original.get(column).into_value().as_ref() == Some(&value) {
                merged.not_set(column);
            }
        }
    }
    merged
}

/// Deserialize a checked body into the resource's input struct.
///
/// Shape errors the rules did not catch still surface as 406, keyed by the
/// missing field when serde names one.
fn decode_payload<T: DeserializeOwned>(input: Map<String, Value>) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(input)).map_err(|err| {
        let message = err.to_string();
        let field = payload_field(&message).to_string();
        ApiError::validation_failed(ValidationErrors::single(field, message))
    })
}

fn payload_field(message: &str) -> &str {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
        .unwrap_or("body")
}

/// Parse a path key into the lookup column's value type; `None` never matches
fn parse_key<C: ColumnTrait>(column: C, raw: &str) -> Option<sea_orm::Value> {
    let raw = raw.trim();
    match column.def().get_column_type() {
        ColumnType::Uuid => Uuid::parse_str(raw).ok().map(Into::into),
        ColumnType::TinyInteger | ColumnType::SmallInteger | ColumnType::Integer => {
            raw.parse::<i32>().ok().map(Into::into)
        }
        ColumnType::BigInteger => raw.parse::<i64>().ok().map(Into::into),
        ColumnType::TinyUnsigned | ColumnType::SmallUnsigned | ColumnType::Unsigned => {
            raw.parse::<u32>().ok().map(Into::into)
        }
        ColumnType::BigUnsigned => raw.parse::<u64>().ok().map(Into::into),
        _ => (!raw.is_empty()).then(|| raw.to_string().into()),
    }
}
