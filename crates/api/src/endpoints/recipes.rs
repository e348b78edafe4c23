//! Recipe endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use recipedia_common::AppResult;
use recipedia_core::{
    CreateRecipeInput, IngredientLineInput, RecipeDetail, RecipeFilters, ShoppingCartService,
    UpdateRecipeInput,
};
use recipedia_db::entities::recipe;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    endpoints::{page_bounds, tags::TagResponse, users::UserResponse},
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response,
    response::{ApiResponse, Paginated},
};

/// Ingredient line of the recipe read projection.
#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe read projection.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: String,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub tags: Vec<TagResponse>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl From<RecipeDetail> for RecipeResponse {
    fn from(detail: RecipeDetail) -> Self {
        Self {
            id: detail.recipe.id,
            author: UserResponse {
                id: detail.author.id,
                username: detail.author.username,
                email: detail.author.email,
                first_name: detail.author.first_name,
                last_name: detail.author.last_name,
                is_subscribed: detail.author_is_subscribed,
                avatar: detail.author.avatar_url,
            },
            ingredients: detail
                .ingredients
                .into_iter()
                .map(|line| RecipeIngredientResponse {
                    id: line.id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                    amount: line.amount,
                })
                .collect(),
            tags: detail.tags.into_iter().map(Into::into).collect(),
            image: detail.recipe.image_url,
            name: detail.recipe.name,
            text: detail.recipe.text,
            cooking_time: detail.recipe.cooking_time,
            is_favorited: detail.is_favorited,
            is_in_shopping_cart: detail.is_in_shopping_cart,
        }
    }
}

/// Short recipe projection used by favorite/cart responses and
/// subscription listings.
#[derive(Debug, Serialize)]
pub struct RecipeShortResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for RecipeShortResponse {
    fn from(recipe: recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image_url,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Recipe listing parameters.
#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    pub author: Option<String>,
    /// Comma-separated tag slugs, matched any-of.
    pub tags: Option<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// The membership filters are truthy only for the literal values `1`
/// and `true`; `0`, absence and anything else leave the filter off.
fn flag_is_set(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

/// One ingredient line of a recipe write request.
#[derive(Debug, Deserialize)]
pub struct IngredientLineRequest {
    pub id: String,
    pub amount: i32,
}

/// Recipe write contract: flat ids plus validated fields. The response
/// is always the full read projection.
#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    pub ingredients: Vec<IngredientLineRequest>,
    pub tags: Vec<String>,
    /// Base64 data URI.
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeRequest {
    fn lines(&self) -> Vec<IngredientLineInput> {
        self.ingredients
            .iter()
            .map(|line| IngredientLineInput {
                id: line.id.clone(),
                amount: line.amount,
            })
            .collect()
    }
}

/// List recipes with optional filters.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListRecipesQuery>,
) -> AppResult<ApiResponse<Paginated<RecipeResponse>>> {
    let (limit, offset) = page_bounds(query.page, query.limit);

    let filters = RecipeFilters {
        author_id: query.author,
        tag_slugs: query
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        is_favorited: flag_is_set(query.is_favorited.as_deref()),
        is_in_shopping_cart: flag_is_set(query.is_in_shopping_cart.as_deref()),
        limit,
        offset,
    };

    let page = state
        .recipe_service
        .list(viewer.as_ref().map(|u| u.id.as_str()), filters)
        .await?;

    Ok(ApiResponse::ok(Paginated {
        count: page.count,
        results: page.recipes.into_iter().map(Into::into).collect(),
    }))
}

/// Get one recipe.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<RecipeResponse>> {
    let detail = state
        .recipe_service
        .get(&id, viewer.as_ref().map(|u| u.id.as_str()))
        .await?;

    Ok(ApiResponse::ok(detail.into()))
}

/// Create a recipe.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RecipeRequest>,
) -> AppResult<ApiResponse<RecipeResponse>> {
    let input = CreateRecipeInput {
        name: req.name.clone(),
        text: req.text.clone(),
        cooking_time: req.cooking_time,
        image: req.image.clone(),
        ingredients: req.lines(),
        tags: req.tags.clone(),
    };

    let detail = state.recipe_service.create(&user, input).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Replace a recipe's fields and its full ingredient and tag sets.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecipeRequest>,
) -> AppResult<ApiResponse<RecipeResponse>> {
    let input = UpdateRecipeInput {
        name: req.name.clone(),
        text: req.text.clone(),
        cooking_time: req.cooking_time,
        image: req.image.clone(),
        ingredients: req.lines(),
        tags: req.tags.clone(),
    };

    let detail = state.recipe_service.update(&user, &id, input).await?;
    Ok(ApiResponse::ok(detail.into()))
}

/// Delete a recipe.
async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.recipe_service.delete(&user, &id).await?;
    Ok(response::ok())
}

/// Add a recipe to favorites.
async fn favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<RecipeShortResponse>> {
    let recipe = state.favorite_service.create(&user.id, &id).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

/// Remove a recipe from favorites.
async fn unfavorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.favorite_service.delete(&user.id, &id).await?;
    Ok(response::ok())
}

/// Add a recipe to the shopping cart.
async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<RecipeShortResponse>> {
    let recipe = state.shopping_cart_service.create(&user.id, &id).await?;
    Ok(ApiResponse::ok(recipe.into()))
}

/// Remove a recipe from the shopping cart.
async fn remove_from_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.shopping_cart_service.delete(&user.id, &id).await?;
    Ok(response::ok())
}

/// Canonical absolute link for a recipe.
async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let link = state.recipe_service.get_link(&id).await?;
    Ok(Json(json!({ "short-link": link })))
}

/// Download the aggregated shopping list as plain text.
async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let items = state.shopping_cart_service.shopping_list(&user.id).await?;
    let body = ShoppingCartService::render_text(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        body,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route("/{id}", get(show).patch(update).delete(destroy))
        .route("/{id}/favorite", axum::routing::post(favorite).delete(unfavorite))
        .route(
            "/{id}/shopping_cart",
            axum::routing::post(add_to_cart).delete(remove_from_cart),
        )
        .route("/{id}/get-link", get(get_link))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_set_convention() {
        assert!(flag_is_set(Some("1")));
        assert!(flag_is_set(Some("true")));
        assert!(!flag_is_set(Some("0")));
        assert!(!flag_is_set(Some("yes")));
        assert!(!flag_is_set(Some("")));
        assert!(!flag_is_set(None));
    }
}
