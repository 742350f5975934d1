use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{get, post},
};
use hyper::HeaderMap;
use serde_json::{Map, Value};

use crate::context::{Action, RequestContext};
use crate::controller::{ListResponse, ResourceController};
use crate::errors::ApiError;
use crate::models::ListParams;
use crate::traits::Resource;

type Shared<R> = State<Arc<ResourceController<R>>>;

fn list_params(params: Result<Query<ListParams>, QueryRejection>) -> Result<ListParams, ApiError> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn raw_query(query: Result<Query<HashMap<String, String>>, QueryRejection>) -> HashMap<String, String> {
    query.map(|Query(query)| query).unwrap_or_default()
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn context(
    action: Action,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<RequestContext, ApiError> {
    Ok(RequestContext::new(action)
        .with_headers(headers)
        .with_params(list_params(params)?)
        .with_query(raw_query(query)))
}

pub async fn index<R: Resource>(
    State(controller): Shared<R>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ListResponse, ApiError> {
    let ctx = context(Action::Index, headers, params, query)?;
    controller.index(&ctx).await
}

pub async fn show<R: Resource>(
    State(controller): Shared<R>,
    Path(key): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = context(Action::Show, headers, params, query)?.with_key(key);
    controller.show(&ctx).await.map(Json)
}

pub async fn store<R: Resource>(
    State(controller): Shared<R>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = context(Action::Store, headers, params, query)?.with_body(json_body(body)?)?;
    controller.store(&ctx).await.map(Json)
}

pub async fn update<R: Resource>(
    State(controller): Shared<R>,
    Path(key): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = context(Action::Update, headers, params, query)?
        .with_key(key)
        .with_body(json_body(body)?)?;
    controller.update(&ctx).await.map(Json)
}

pub async fn destroy<R: Resource>(
    State(controller): Shared<R>,
    Path(key): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = context(Action::Destroy, headers, params, query)?.with_key(key);
    controller.destroy(&ctx).await.map(Json)
}

pub async fn restore<R: Resource>(
    State(controller): Shared<R>,
    Path(key): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = context(Action::Restore, headers, params, query)?.with_key(key);
    controller.restore(&ctx).await.map(Json)
}

pub async fn metadata<R: Resource>(
    State(controller): Shared<R>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let ctx = context(Action::Metadata, headers, params, query)?;
    controller.metadata(&ctx).await.map(Json)
}

/// Routes for one resource, relative to its mount point
pub fn resource_router<R: Resource>(controller: Arc<ResourceController<R>>) -> Router {
    Router::new()
        .route("/", get(index::<R>).post(store::<R>))
        .route("/metadata", get(metadata::<R>))
        .route(
            "/{id}",
            get(show::<R>)
                .put(update::<R>)
                .patch(update::<R>)
                .delete(destroy::<R>),
        )
        .route("/{id}/restore", post(restore::<R>))
        .with_state(controller)
}
