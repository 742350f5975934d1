use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rest_resource::{
    Action, ApiError, Appends, ControllerConfig, MergeIntoActiveModel, QuerySpec, RequestContext,
    RequestValidator, Resource, Rule, Rules, ValidationErrors,
};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseTransaction, PaginatorTrait, QueryOrder, Select,
    entity::prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::comment;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,
}

impl Related<comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Deserialize)]
pub struct PostCreate {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

impl From<PostCreate> for ActiveModel {
    fn from(input: PostCreate) -> Self {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(input.slug),
            title: Set(input.title),
            body: Set(input.body),
            published: Set(input.published),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PostUpdate {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
}

impl MergeIntoActiveModel<ActiveModel> for PostUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(slug) = self.slug {
            existing.slug = Set(slug);
        }
        if let Some(title) = self.title {
            existing.title = Set(title);
        }
        if let Some(body) = self.body {
            existing.body = Set(body);
        }
        if let Some(published) = self.published {
            existing.published = Set(published);
        }
        Ok(existing)
    }
}

/// Title that `after_save` refuses, to exercise rollback
pub const RESERVED_TITLE: &str = "reserved title";

pub struct PostResource;

#[async_trait]
impl Resource for PostResource {
    type Entity = Entity;
    type Model = Model;
    type Column = Column;
    type ActiveModel = ActiveModel;
    type CreateModel = PostCreate;
    type UpdateModel = PostUpdate;

    const ID_COLUMN: Column = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "post";
    const RESOURCE_NAME_PLURAL: &'static str = "posts";

    fn soft_delete_column(&self) -> Option<Column> {
        Some(Column::DeletedAt)
    }

    fn rules(&self, _action: Action) -> Rules {
        Rules::new()
            .field("slug", [Rule::Required, Rule::String, Rule::Max(64.0)])
            .field("title", [Rule::Required, Rule::String, Rule::Min(3.0)])
            .field("body", [Rule::Nullable, Rule::String])
            .field("published", [Rule::Boolean])
    }

    fn get_filtered(&self, ctx: &RequestContext, _spec: &QuerySpec) -> Select<Entity> {
        let query = Entity::find();
        match ctx.query("published") {
            Some("1" | "true") => query.filter(Column::Published.eq(true)),
            Some("0" | "false") => query.filter(Column::Published.eq(false)),
            _ => query,
        }
    }

    fn append_attribute(&self, name: &str, item: &Map<String, Value>) -> Option<Value> {
        match name {
            "comment_count" => item
                .get("comments")
                .and_then(Value::as_array)
                .map(|comments| json!(comments.len())),
            _ => None,
        }
    }

    async fn load_relations<C>(
        &self,
        db: &C,
        models: &[Model],
        with: &[String],
    ) -> Result<Vec<Map<String, Value>>, ApiError>
    where
        C: ConnectionTrait,
    {
        let mut loaded = vec![Map::new(); models.len()];
        if !with.iter().any(|w| w == "comments") {
            return Ok(loaded);
        }

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.is_in(ids))
            .order_by_asc(comment::Column::Body)
            .all(db)
            .await?;
        let mut by_post: HashMap<Uuid, Vec<Value>> = HashMap::new();
        for comment in comments {
            by_post
                .entry(comment.post_id)
                .or_default()
                .push(serde_json::to_value(&comment)?);
        }
        for (model, relations) in models.iter().zip(loaded.iter_mut()) {
            let comments = by_post.remove(&model.id).unwrap_or_default();
            relations.insert("comments".to_string(), Value::Array(comments));
        }
        Ok(loaded)
    }

    async fn before_save(
        &self,
        _txn: &DatabaseTransaction,
        mut model: ActiveModel,
        _action: Action,
    ) -> Result<ActiveModel, ApiError> {
        if let sea_orm::ActiveValue::Set(slug) = &model.slug {
            let normalized = slug.trim().to_lowercase();
            if normalized != *slug {
                model.slug = Set(normalized);
            }
        }
        Ok(model)
    }

    async fn after_save(
        &self,
        txn: &DatabaseTransaction,
        model: Model,
        action: Action,
    ) -> Result<Model, ApiError> {
        if model.title == RESERVED_TITLE {
            return Err(ApiError::validation_failed(ValidationErrors::single(
                "title",
                "The title is reserved.",
            )));
        }
        if action == Action::Store && model.title.starts_with("with comment") {
            comment::ActiveModel {
                id: Set(Uuid::new_v4()),
                post_id: Set(model.id),
                body: Set("first!".to_string()),
            }
            .insert(txn)
            .await?;
        }
        Ok(model)
    }

    async fn generate_metadata(
        &self,
        db: &DatabaseConnection,
        _ctx: &RequestContext,
    ) -> Result<Map<String, Value>, ApiError> {
        let published = Entity::find()
            .filter(Column::Published.eq(true))
            .filter(Column::DeletedAt.is_null())
            .count(db)
            .await?;
        let mut meta = Map::new();
        meta.insert("published_count".to_string(), json!(published));
        meta.insert("total".to_string(), json!("overridden by pagination"));
        Ok(meta)
    }
}

/// Writes only for callers sending `x-role: editor`
pub struct EditorsOnly;

#[async_trait]
impl RequestValidator for EditorsOnly {
    async fn validate(&self, ctx: &RequestContext) -> Result<(), ApiError> {
        match ctx.headers.get("x-role").and_then(|v| v.to_str().ok()) {
            Some("editor") => Ok(()),
            _ => Err(ApiError::forbidden("Editors only")),
        }
    }
}

pub fn config() -> ControllerConfig {
    ControllerConfig::new()
        .sort("created_at")
        .allowed_with(["comments"])
        .appends(Appends::mapped([("comment_count", "comments")]))
        .validator(Action::Destroy, EditorsOnly)
}
