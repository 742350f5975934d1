//! Blog API with soft-deletable articles
//!
//! ```bash
//! RUST_LOG=debug APP_DEBUG=1 cargo run --example blog
//! ```
//!
//! Then try:
//! - `curl -X POST localhost:3000/articles -H 'content-type: application/json' -d '{"title":"Hello"}'`
//! - `curl 'localhost:3000/articles?items_per_page=10&sort=title&order=asc'`
//! - `curl -X DELETE localhost:3000/articles/<id>` then `POST /articles/<id>/restore`

use std::env;

use async_trait::async_trait;
use chrono::Utc;
use rest_resource::{
    Action, ControllerConfig, ErrorConfig, MergeIntoActiveModel, Resource, ResourceRegistry, Rule,
    Rules,
};
use sea_orm::{ActiveValue::Set, ConnectionTrait, Database, Schema, entity::prelude::*};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Deserialize)]
pub struct ArticleCreate {
    title: String,
    #[serde(default)]
    content: String,
}

impl From<ArticleCreate> for ActiveModel {
    fn from(input: ArticleCreate) -> Self {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            content: Set(input.content),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
        }
    }
}

#[derive(Deserialize)]
pub struct ArticleUpdate {
    title: Option<String>,
    content: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for ArticleUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(title) = self.title {
            existing.title = Set(title);
        }
        if let Some(content) = self.content {
            existing.content = Set(content);
        }
        Ok(existing)
    }
}

struct Articles;

#[async_trait]
impl Resource for Articles {
    type Entity = Entity;
    type Model = Model;
    type Column = Column;
    type ActiveModel = ActiveModel;
    type CreateModel = ArticleCreate;
    type UpdateModel = ArticleUpdate;

    const ID_COLUMN: Column = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "article";
    const RESOURCE_NAME_PLURAL: &'static str = "articles";

    fn soft_delete_column(&self) -> Option<Column> {
        Some(Column::DeletedAt)
    }

    fn rules(&self, _action: Action) -> Rules {
        Rules::new()
            .field("title", [Rule::Required, Rule::String, Rule::Max(200.0)])
            .field("content", [Rule::Nullable, Rule::String])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let db = Database::connect(&database_url).await?;
    let backend = db.get_database_backend();
    db.execute(backend.build(Schema::new(backend).create_table_from_entity(Entity).if_not_exists()))
        .await?;

    let app = ResourceRegistry::new(db)
        .register("articles", Articles, ControllerConfig::new().sort("created_at"))?
        .with_error_config(ErrorConfig::from_env())
        .into_router()
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("API: http://0.0.0.0:3000/articles");
    axum::serve(listener, app).await?;
    Ok(())
}
