//! Token authentication endpoints.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use recipedia_common::AppResult;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response, response::ApiResponse};

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Serialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

/// Exchange email and password for an access token.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let auth_token = state.user_service.login(&req.email, &req.password).await?;
    Ok(ApiResponse::ok(LoginResponse { auth_token }))
}

/// Invalidate the current access token.
async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.user_service.logout(&user.id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token/login", post(login))
        .route("/token/logout", post(logout))
}
