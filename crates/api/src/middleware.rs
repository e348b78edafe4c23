//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use recipedia_core::{
    FavoriteService, FollowService, IngredientService, RecipeService, ShoppingCartService,
    TagService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub recipe_service: RecipeService,
    pub tag_service: TagService,
    pub ingredient_service: IngredientService,
    pub favorite_service: FavoriteService,
    pub shopping_cart_service: ShoppingCartService,
    pub follow_service: FollowService,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a user and stores it in the request
/// extensions; handlers pick it up through `AuthUser`/`MaybeAuthUser`.
/// An invalid token simply leaves the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
