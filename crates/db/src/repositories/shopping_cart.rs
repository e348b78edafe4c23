//! Shopping cart repository, including the shopping list aggregation.

use std::sync::Arc;

use crate::entities::{
    RecipeIngredient, ShoppingCartEntry, ingredient, recipe, recipe_ingredient,
    shopping_cart_entry,
};
use recipedia_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, SqlErr,
};

/// One aggregated line of a user's shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingListItem {
    /// Ingredient name.
    pub name: String,
    /// Measurement unit.
    pub unit: String,
    /// Amount summed across every cart recipe using the ingredient.
    pub total: i64,
}

/// Shopping cart repository for database operations.
#[derive(Clone)]
pub struct ShoppingCartRepository {
    db: Arc<DatabaseConnection>,
}

impl ShoppingCartRepository {
    /// Create a new shopping cart repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a cart entry by user and recipe.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        recipe_id: &str,
    ) -> AppResult<Option<shopping_cart_entry::Model>> {
        ShoppingCartEntry::find()
            .filter(shopping_cart_entry::Column::UserId.eq(user_id))
            .filter(shopping_cart_entry::Column::RecipeId.eq(recipe_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a recipe is in the user's cart.
    pub async fn is_in_cart(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(user_id, recipe_id).await?.is_some())
    }

    /// Create a new cart entry.
    ///
    /// The unique index on (user, recipe) is the source of truth under
    /// concurrent duplicate requests; a storage-level violation surfaces
    /// as the same already-exists error as the advisory check.
    pub async fn create(
        &self,
        model: shopping_cart_entry::ActiveModel,
    ) -> AppResult<shopping_cart_entry::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Recipe is already in the shopping cart".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a cart entry by user and recipe. Returns whether a row
    /// was removed.
    pub async fn delete_by_pair(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        let result = ShoppingCartEntry::delete_many()
            .filter(shopping_cart_entry::Column::UserId.eq(user_id))
            .filter(shopping_cart_entry::Column::RecipeId.eq(recipe_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Of the given recipes, return the ids in the user's cart
    /// (one batch query for a whole listing page).
    pub async fn recipe_ids_for_user(
        &self,
        user_id: &str,
        recipe_ids: &[String],
    ) -> AppResult<Vec<String>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = ShoppingCartEntry::find()
            .filter(shopping_cart_entry::Column::UserId.eq(user_id))
            .filter(shopping_cart_entry::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|e| e.recipe_id).collect())
    }

    /// Aggregate the ingredient lines of every recipe in the user's
    /// cart into a shopping list: grouped by (name, unit), amounts
    /// summed, ordered by name.
    ///
    /// One aggregate query regardless of cart size; the totals never
    /// pass through an in-memory fold over per-recipe lists.
    pub async fn aggregate_ingredients(&self, user_id: &str) -> AppResult<Vec<ShoppingListItem>> {
        RecipeIngredient::find()
            .join(JoinType::InnerJoin, recipe_ingredient::Relation::Recipe.def())
            .join(JoinType::InnerJoin, recipe::Relation::CartEntries.def())
            .join(
                JoinType::InnerJoin,
                recipe_ingredient::Relation::Ingredient.def(),
            )
            .filter(shopping_cart_entry::Column::UserId.eq(user_id))
            .select_only()
            .column_as(ingredient::Column::Name, "name")
            .column_as(ingredient::Column::MeasurementUnit, "unit")
            .column_as(recipe_ingredient::Column::Amount.sum(), "total")
            .group_by(ingredient::Column::Name)
            .group_by(ingredient::Column::MeasurementUnit)
            .order_by_asc(ingredient::Column::Name)
            .into_model::<ShoppingListItem>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn create_test_entry(id: &str, user_id: &str, recipe_id: &str) -> shopping_cart_entry::Model {
        shopping_cart_entry::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_is_in_cart() {
        let entry = create_test_entry("c1", "u1", "r1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[entry.clone()]])
                .into_connection(),
        );

        let repo = ShoppingCartRepository::new(db);
        let result = repo.is_in_cart("u1", "r1").await.unwrap();

        assert!(result);
    }

    #[tokio::test]
    async fn test_delete_by_pair_reports_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ShoppingCartRepository::new(db);
        let deleted = repo.delete_by_pair("u1", "r1").await.unwrap();

        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_aggregate_ingredients() {
        let db = Arc::new(
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

        let repo = ShoppingCartRepository::new(db);
        let items = repo.aggregate_ingredients("u1").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "egg");
        assert_eq!(items[1].name, "flour");
        assert_eq!(items[1].total, 500);
    }

    #[tokio::test]
    async fn test_aggregate_ingredients_empty_cart() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );

        let repo = ShoppingCartRepository::new(db);
        let items = repo.aggregate_ingredients("u1").await.unwrap();

        assert!(items.is_empty());
    }
}
