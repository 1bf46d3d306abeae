// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use axum::{
    Router,
    extract::{Json, Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cadence_common::{
    api::{ManualSendRequest, ManualSendResponse},
    error::{CadenceError, CadenceErrorKind, Result},
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::conversation::store::ConversationStore;
use crate::db;
use crate::delivery::DeliveryExecutor;

#[derive(Clone)]
pub struct ApiState {
    pub db: DatabaseConnection,
    pub auth: String,
    pub executor: DeliveryExecutor,
    pub store: ConversationStore,
}

#[derive(Debug)]
pub struct ApiError(CadenceError);

impl<E: Into<CadenceError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.inner() {
            CadenceErrorKind::Api(_) => StatusCode::BAD_REQUEST,
            CadenceErrorKind::CorruptedCursor(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(%status, "API error: {}", self.0);
        (status, self.0.to_string()).into_response()
    }
}

async fn authenticate(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    match auth_header {
        Some(auth_header) if auth_header == state.auth => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub async fn post_send(
    State(state): State<ApiState>,
    Json(request): Json<ManualSendRequest>,
) -> std::result::Result<Json<ManualSendResponse>, ApiError> {
    if request.user_ids.is_empty() {
        return Err(CadenceErrorKind::Api("no users given".into()).into());
    }
    info!(
        touch = %request.touch,
        users = request.user_ids.len(),
        force = request.force,
        "Manual send"
    );
    let reports = state
        .executor
        .deliver_manual(request.touch, &request.user_ids, request.force, Utc::now())
        .await;
    Ok(Json(ManualSendResponse { reports }))
}

pub async fn get_cursor(
    Path(user_id): Path<i64>,
    State(state): State<ApiState>,
) -> std::result::Result<Response, ApiError> {
    let owner = state.store.owner(user_id);
    match state.store.load(&owner, Utc::now()).await? {
        Some(cursor) => Ok(Json(cursor).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn delete_cursor(
    Path(user_id): Path<i64>,
    State(state): State<ApiState>,
) -> std::result::Result<StatusCode, ApiError> {
    if db::user::get(user_id, &state.db).await?.is_none() {
        return Ok(StatusCode::NOT_FOUND);
    }
    state.store.clear(&state.store.owner(user_id)).await?;
    info!(user_id, "Cursor reset by admin");
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/touches/send", post(post_send))
        .route(
            "/api/v1/users/{id}/cursor",
            get(get_cursor).delete(delete_cursor),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

pub async fn serve(bind: &str, state: ApiState, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(bind, "Admin API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}
