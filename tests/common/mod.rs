#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use hyper::HeaderMap;
use rest_resource::{ControllerConfig, ErrorConfig, ResourceRegistry};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbErr,
    Schema,
};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

pub mod comment;
pub mod post;
pub mod tag;

pub use post::PostResource;
pub use tag::TagResource;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    setup_test_app_with(db, post::config(), ErrorConfig::default())
}

pub fn setup_test_app_with(
    db: DatabaseConnection,
    post_config: ControllerConfig,
    errors: ErrorConfig,
) -> Router {
    let api = ResourceRegistry::new(db)
        .register("posts", PostResource, post_config)
        .expect("posts registers")
        .register("tags", TagResource, ControllerConfig::new())
        .expect("tags registers")
        .with_error_config(errors)
        .into_router();

    Router::new().nest("/api/v1", api)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request through the router and decode the JSON body
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    send_with_headers(app, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Insert a post directly, bypassing the controller.
/// `minute` spaces `created_at` so ordering is deterministic.
pub async fn seed_post(db: &DatabaseConnection, slug: &str, published: bool, minute: u32) -> post::Model {
    let created_at = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc)
        + chrono::Duration::minutes(i64::from(minute));
    post::ActiveModel {
        id: Set(uuid::Uuid::new_v4()),
        slug: Set(slug.to_string()),
        title: Set(format!("Post {slug}")),
        body: Set(String::new()),
        published: Set(published),
        created_at: Set(created_at),
        deleted_at: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_comment(db: &DatabaseConnection, post_id: uuid::Uuid, body: &str) -> comment::Model {
    comment::ActiveModel {
        id: Set(uuid::Uuid::new_v4()),
        post_id: Set(post_id),
        body: Set(body.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn count_rows<C: ConnectionTrait>(db: &C, table: &str) -> i64 {
    let row = db
        .query_one(sea_orm::Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBlogTables)]
    }
}

pub struct CreateBlogTables;

impl MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(post::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(comment::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(tag::Entity))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["comments", "posts", "tags"] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
