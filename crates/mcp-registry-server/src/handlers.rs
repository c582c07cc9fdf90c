//! `/v0` route handlers.

use crate::auth::{AuthMethod, Authentication};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use mcp_registry::config::ServiceConfig;
use mcp_registry::{ConnectionInfo, ListFilter, Server, ServerDetail};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub auth_enabled: bool,
    pub version: String,
    pub database: ConnectionInfo,
}

/// Query string of `GET /v0/servers`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub next_cursor: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerListResponse {
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub message: String,
    pub id: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        auth_enabled: state.auth_enabled,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: state.service.connection_info(),
    })
}

pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ServerListResponse>, ApiError> {
    let Query(params) = params?;

    let limit = params.limit.unwrap_or(ServiceConfig::DEFAULT_PAGE_LIMIT);
    if !(1..=ServerConfig::MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {}",
            ServerConfig::MAX_PAGE_LIMIT
        )));
    }

    let cursor = params.cursor.filter(|c| !c.is_empty());
    if let Some(cursor) = &cursor {
        if uuid::Uuid::parse_str(cursor).is_err() {
            return Err(ApiError::bad_request("Invalid cursor parameter"));
        }
    }

    let mut filter = ListFilter::new();
    if let Some(name) = params.name {
        filter = filter.name(name);
    }
    if let Some(version) = params.version {
        filter = filter.version(version);
    }

    let page = state.service.list(&filter, cursor.as_deref(), limit).await?;
    debug!(
        "Listed {} servers (next cursor: {:?})",
        page.servers.len(),
        page.next_cursor
    );

    let metadata = page.next_cursor.map(|next_cursor| Metadata {
        next_cursor,
        count: page.servers.len(),
    });

    Ok(Json(ServerListResponse {
        servers: page.servers,
        metadata,
    }))
}

pub async fn get_server(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ServerDetail>, ApiError> {
    if uuid::Uuid::parse_str(&id).is_err() {
        return Err(ApiError::bad_request("Invalid server ID format"));
    }

    let detail = state.service.get_by_id(&id).await.map_err(|e| {
        let err = ApiError::from(e);
        if err.status() == StatusCode::NOT_FOUND {
            ApiError::new(StatusCode::NOT_FOUND, "Server not found")
        } else {
            err
        }
    })?;
    Ok(Json(detail))
}

pub async fn publish(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ServerDetail>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(detail) = body?;

    if detail.name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if detail.version().is_empty() {
        return Err(ApiError::bad_request("Version is required"));
    }

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header is required"))?;

    let auth = Authentication {
        method: Some(AuthMethod::for_server_name(&detail.name)),
        token: Some(bearer_token(authorization).to_string()),
        repo_ref: Some(detail.name.clone()),
    };

    match state.auth.validate(&auth).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Rejected publish credentials for {}", detail.name);
            return Err(ApiError::unauthorized("Invalid authentication credentials"));
        }
        Err(e) => {
            return Err(ApiError::unauthorized(format!(
                "Authentication failed: {}",
                e
            )));
        }
    }

    let stored = state
        .service
        .publish(Some(detail))
        .await
        .map_err(|e| ApiError::from(e).context("Failed to publish server details"))?;

    info!(
        "Published {} version {} as {}",
        stored.name,
        stored.version(),
        stored.id
    );

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse {
            message: "Server publication successful".to_string(),
            id: stored.id,
        }),
    ))
}

/// Strip a case-insensitive `Bearer ` prefix.
fn bearer_token(authorization: &str) -> &str {
    match authorization.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => &authorization[7..],
        _ => authorization,
    }
}
