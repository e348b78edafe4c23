//! User and subscription endpoints.

use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use recipedia_common::AppResult;
use recipedia_core::{CreateUserInput, SubscriptionView};
use recipedia_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::{page_bounds, recipes::RecipeShortResponse},
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response,
    response::{ApiResponse, Paginated},
};

/// User read projection.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user; false for anonymous
    /// viewers and for the viewer themselves.
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserResponse {
    fn from_model(user: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            avatar: user.avatar_url,
        }
    }
}

/// Followed author read projection: the user plus their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: u64,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            id: view.user.id,
            username: view.user.username,
            email: view.user.email,
            first_name: view.user.first_name,
            last_name: view.user.last_name,
            avatar: view.user.avatar_url,
            is_subscribed: view.is_subscribed,
            recipes: view.recipes.into_iter().map(Into::into).collect(),
            recipes_count: view.recipes_count,
        }
    }
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Page query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// Subscription listing parameters.
#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Caps the per-author recipe list.
    pub recipes_limit: Option<u64>,
}

/// Register a new user.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .user_service
        .register(CreateUserInput {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        })
        .await?;

    Ok(ApiResponse::ok(UserResponse::from_model(user, false)))
}

/// List users.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Paginated<UserResponse>>> {
    let (limit, offset) = page_bounds(query.page, query.limit);
    let page = state.user_service.list(limit, offset).await?;

    let followed: HashSet<String> = match viewer {
        Some(ref viewer) => {
            let ids: Vec<String> = page.users.iter().map(|u| u.id.clone()).collect();
            state
                .follow_service
                .followed_ids_among(&viewer.id, &ids)
                .await?
                .into_iter()
                .collect()
        }
        None => HashSet::new(),
    };

    let results = page
        .users
        .into_iter()
        .map(|user| {
            let is_subscribed = followed.contains(&user.id);
            UserResponse::from_model(user, is_subscribed)
        })
        .collect();

    Ok(ApiResponse::ok(Paginated {
        count: page.count,
        results,
    }))
}

/// Get the current user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse::from_model(user, false))
}

/// Get a user by ID.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.get(&id).await?;

    let is_subscribed = match viewer {
        Some(ref viewer) => state.follow_service.is_following(&viewer.id, &id).await?,
        None => false,
    };

    Ok(ApiResponse::ok(UserResponse::from_model(
        user,
        is_subscribed,
    )))
}

/// List followed authors with their recipes.
async fn subscriptions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<ApiResponse<Paginated<SubscriptionResponse>>> {
    let (limit, offset) = page_bounds(query.page, query.limit);
    let page = state
        .follow_service
        .subscriptions(&user.id, limit, offset, query.recipes_limit)
        .await?;

    Ok(ApiResponse::ok(Paginated {
        count: page.count,
        results: page.users.into_iter().map(Into::into).collect(),
    }))
}

/// Subscribe to a user's recipes.
async fn subscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SubscriptionsQuery>,
) -> AppResult<ApiResponse<SubscriptionResponse>> {
    let view = state
        .follow_service
        .follow(&user.id, &id, query.recipes_limit)
        .await?;

    Ok(ApiResponse::ok(view.into()))
}

/// Unsubscribe from a user's recipes.
async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.follow_service.unfollow(&user.id, &id).await?;
    Ok(response::ok())
}

/// Avatar upload request.
#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    /// Base64 data URI.
    pub avatar: String,
}

/// Avatar response.
#[derive(Serialize)]
pub struct AvatarResponse {
    pub avatar: Option<String>,
}

/// Set the current user's avatar.
async fn set_avatar(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AvatarRequest>,
) -> AppResult<ApiResponse<AvatarResponse>> {
    let updated = state.user_service.set_avatar(&user.id, &req.avatar).await?;
    Ok(ApiResponse::ok(AvatarResponse {
        avatar: updated.avatar_url,
    }))
}

/// Remove the current user's avatar.
async fn delete_avatar(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.user_service.delete_avatar(&user.id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register).get(list))
        .route("/me", get(me))
        .route("/me/avatar", put(set_avatar).delete(delete_avatar))
        .route("/subscriptions", get(subscriptions))
        .route("/{id}", get(show))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}
