use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, FromQueryResult, IdenStatic, IntoActiveModel, Iterable,
    QueryOrder, Select,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::context::{Action, RequestContext};
use crate::errors::ApiError;
use crate::query::QuerySpec;
use crate::sort::resolve_sort;
use crate::validation::Rules;

/// Apply a partial update payload onto a loaded active model.
///
/// Fields absent from the payload must stay untouched so `update` only writes
/// the columns the client sent.
pub trait MergeIntoActiveModel<ActiveModelType> {
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// A database entity exposed as a REST resource.
///
/// Only the associated types and constants are required. Every hook has a
/// default that keeps the generic behaviour, so a resource overrides just the
/// parts it customises.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Entity: EntityTrait<Model = Self::Model, Column = Self::Column> + Sync;
    type Model: FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Serialize
        + Clone
        + Send
        + Sync
        + 'static;
    type Column: ColumnTrait + Send + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + From<Self::Model>
        + Send
        + Sync
        + 'static;
    type CreateModel: DeserializeOwned + Into<Self::ActiveModel> + Send;
    type UpdateModel: DeserializeOwned + MergeIntoActiveModel<Self::ActiveModel> + Send;

    const ID_COLUMN: Self::Column;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;

    /// Nullable timestamp marking soft-deleted rows. `None` disables soft
    /// deletes: destroy removes the row and restore is refused.
    fn soft_delete_column(&self) -> Option<Self::Column> {
        None
    }

    /// Columns a client may name in `sort`, keyed by the name it uses.
    /// Every column of the entity by default.
    #[must_use]
    fn sortable_columns(&self) -> Vec<(String, Self::Column)> {
        Self::Column::iter().map(|c| (c.as_str().to_string(), c)).collect()
    }

    /// Field rules checked against the request body of `store` and `update`
    fn rules(&self, _action: Action) -> Rules {
        Rules::new()
    }

    /// Reshape the raw body before rules and deserialization run
    fn prepare_input(&self, _action: Action, body: Map<String, Value>) -> Map<String, Value> {
        body
    }

    /// Base query for list and keyed lookups.
    ///
    /// Override to filter by raw query parameters or request headers; the
    /// soft-delete scope and ordering are applied on top.
    fn get_filtered(&self, _ctx: &RequestContext, _spec: &QuerySpec) -> Select<Self::Entity> {
        Self::Entity::find()
    }

    fn smart_sort(&self, query: Select<Self::Entity>, spec: &QuerySpec) -> Select<Self::Entity> {
        let columns = self.sortable_columns();
        let fallback = resolve_sort(spec.default_sort.as_deref(), &columns, Self::ID_COLUMN);
        let column = resolve_sort(spec.sort.as_deref(), &columns, fallback);
        query.order_by(column, spec.order.clone())
    }

    /// Render one model as JSON; must return an object for relations,
    /// appended attributes and field projection to apply
    fn transform(&self, model: &Self::Model) -> Result<Value, ApiError> {
        Ok(serde_json::to_value(model)?)
    }

    /// Computed attribute named in `appends`. `item` already carries the
    /// loaded relations. Returning `None` leaves the attribute out.
    fn append_attribute(&self, _name: &str, _item: &Map<String, Value>) -> Option<Value> {
        None
    }

    /// Load the requested relations for `models`.
    ///
    /// Returns one map per model, in the same order, keyed by relation name.
    /// `with` only ever contains allow-listed names.
    async fn load_relations<C>(
        &self,
        _db: &C,
        models: &[Self::Model],
        _with: &[String],
    ) -> Result<Vec<Map<String, Value>>, ApiError>
    where
        C: ConnectionTrait,
    {
        Ok(vec![Map::new(); models.len()])
    }

    /// Runs inside the write transaction right before insert or update
    async fn before_save(
        &self,
        _txn: &DatabaseTransaction,
        model: Self::ActiveModel,
        _action: Action,
    ) -> Result<Self::ActiveModel, ApiError> {
        Ok(model)
    }

    /// Runs inside the write transaction after the row is written.
    /// An error rolls the whole write back.
    async fn after_save(
        &self,
        _txn: &DatabaseTransaction,
        model: Self::Model,
        _action: Action,
    ) -> Result<Self::Model, ApiError> {
        Ok(model)
    }

    /// Extra keys for the `meta` object of list and metadata responses
    async fn generate_metadata(
        &self,
        _db: &DatabaseConnection,
        _ctx: &RequestContext,
    ) -> Result<Map<String, Value>, ApiError> {
        Ok(Map::new())
    }
}
