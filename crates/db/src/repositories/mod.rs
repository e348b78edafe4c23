//! Entity repositories.
//!
//! One repository per entity, each wrapping an `Arc<DatabaseConnection>`
//! and exposing the queries the service layer needs.

mod favorite;
mod follow;
mod ingredient;
mod recipe;
mod shopping_cart;
mod tag;
mod user;

pub use favorite::FavoriteRepository;
pub use follow::FollowRepository;
pub use ingredient::IngredientRepository;
pub use recipe::{RecipeListQuery, RecipeRepository};
pub use shopping_cart::{ShoppingCartRepository, ShoppingListItem};
pub use tag::TagRepository;
pub use user::UserRepository;
