//! Business logic services.

mod favorite;
mod follow;
mod ingredient;
mod media;
mod recipe;
mod shopping_cart;
mod tag;
mod user;

pub use favorite::FavoriteService;
pub use follow::{FollowService, SubscriptionPage, SubscriptionView};
pub use ingredient::IngredientService;
pub use media::MediaService;
pub use recipe::{
    CreateRecipeInput, IngredientLineInput, RecipeDetail, RecipeFilters, RecipeIngredientDetail,
    RecipePage, RecipeService, UpdateRecipeInput,
};
pub use shopping_cart::ShoppingCartService;
pub use tag::TagService;
pub use user::{CreateUserInput, UserPage, UserService};
