//! Shopping cart service, including the downloadable shopping list.

use recipedia_common::{AppError, AppResult, IdGenerator};
use recipedia_db::{
    entities::{recipe, shopping_cart_entry},
    repositories::{RecipeRepository, ShoppingCartRepository, ShoppingListItem},
};
use sea_orm::Set;

/// Shopping cart service for managing per-user cart membership and the
/// aggregated shopping list.
#[derive(Clone)]
pub struct ShoppingCartService {
    cart_repo: ShoppingCartRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl ShoppingCartService {
    /// Create a new shopping cart service.
    #[must_use]
    pub const fn new(cart_repo: ShoppingCartRepository, recipe_repo: RecipeRepository) -> Self {
        Self {
            cart_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a recipe to the user's cart. Returns the recipe for the
    /// short response projection.
    pub async fn create(&self, user_id: &str, recipe_id: &str) -> AppResult<recipe::Model> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        if self.cart_repo.is_in_cart(user_id, recipe_id).await? {
            return Err(AppError::Conflict(
                "Recipe is already in the shopping cart".to_string(),
            ));
        }

        let model = shopping_cart_entry::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            recipe_id: Set(recipe_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.cart_repo.create(model).await?;

        Ok(recipe)
    }

    /// Remove a recipe from the user's cart.
    pub async fn delete(&self, user_id: &str, recipe_id: &str) -> AppResult<()> {
        self.recipe_repo.get_by_id(recipe_id).await?;

        if !self.cart_repo.delete_by_pair(user_id, recipe_id).await? {
            return Err(AppError::NotFound(
                "Recipe was not in the shopping cart".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if a recipe is in the user's cart.
    pub async fn is_in_cart(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        self.cart_repo.is_in_cart(user_id, recipe_id).await
    }

    /// Compute the user's aggregated shopping list, ordered by
    /// ingredient name.
    pub async fn shopping_list(&self, user_id: &str) -> AppResult<Vec<ShoppingListItem>> {
        self.cart_repo.aggregate_ingredients(user_id).await
    }

    /// Render a shopping list as the downloadable plain text body, one
    /// `{name} ({unit}) {total}` line per ingredient.
    #[must_use]
    pub fn render_text(items: &[ShoppingListItem]) -> String {
        items
            .iter()
            .map(|item| format!("{} ({}) {}", item.name, item.unit, item.total))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_recipe(id: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: "u1".to_string(),
            name: "Pancakes".to_string(),
            image_url: "/media/r.jpg".to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn item(name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            unit: unit.to_string(),
            total,
        }
    }

    #[test]
    fn test_render_text() {
        let items = vec![item("egg", "pcs", 1), item("flour", "g", 500)];

        let text = ShoppingCartService::render_text(&items);

        assert_eq!(text, "egg (pcs) 1\nflour (g) 500");
    }

    #[test]
    fn test_render_text_empty() {
        assert_eq!(ShoppingCartService::render_text(&[]), "");
    }

    #[tokio::test]
    async fn test_create_already_in_cart_is_conflict() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe("r1")]])
                .into_connection(),
        );
        let cart_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[shopping_cart_entry::Model {
                    id: "c1".to_string(),
                    user_id: "u1".to_string(),
                    recipe_id: "r1".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        let service = ShoppingCartService::new(
            ShoppingCartRepository::new(cart_db),
            RecipeRepository::new(recipe_db),
        );

        let result = service.create("u1", "r1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_not_in_cart_is_not_found() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe("r1")]])
                .into_connection(),
        );
        let cart_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let service = ShoppingCartService::new(
            ShoppingCartRepository::new(cart_db),
            RecipeRepository::new(recipe_db),
        );

        let result = service.delete("u1", "r1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_shopping_list_totals_are_summed() {
        let cart_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    btreemap! {
                        "name" => Value::from("egg"),
                        "unit" => Value::from("pcs"),
                        "total" => Value::from(1i64),
                    },
                    btreemap! {
                        "name" => Value::from("flour"),
                        "unit" => Value::from("g"),
                        "total" => Value::from(500i64),
                    },
                ]])
                .into_connection(),
        );
        let recipe_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = ShoppingCartService::new(
            ShoppingCartRepository::new(cart_db),
            RecipeRepository::new(recipe_db),
        );

        let items = service.shopping_list("u1").await.unwrap();
        let text = ShoppingCartService::render_text(&items);

        assert_eq!(text, "egg (pcs) 1\nflour (g) 500");
    }
}
