//! Database entities.

pub mod favorite;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod shopping_cart_entry;
pub mod tag;
pub mod user;

pub use favorite::Entity as Favorite;
pub use follow::Entity as Follow;
pub use ingredient::Entity as Ingredient;
pub use recipe::Entity as Recipe;
pub use recipe_ingredient::Entity as RecipeIngredient;
pub use recipe_tag::Entity as RecipeTag;
pub use shopping_cart_entry::Entity as ShoppingCartEntry;
pub use tag::Entity as Tag;
pub use user::Entity as User;
