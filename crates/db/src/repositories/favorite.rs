//! Favorite repository.

use std::sync::Arc;

use crate::entities::{Favorite, favorite};
use recipedia_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};

/// Favorite repository for database operations.
#[derive(Clone)]
pub struct FavoriteRepository {
    db: Arc<DatabaseConnection>,
}

impl FavoriteRepository {
    /// Create a new favorite repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a favorite by user and recipe.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        recipe_id: &str,
    ) -> AppResult<Option<favorite::Model>> {
        Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a recipe is favorited by user.
    pub async fn is_favorited(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(user_id, recipe_id).await?.is_some())
    }

    /// Create a new favorite.
    ///
    /// The unique index on (user, recipe) is the source of truth under
    /// concurrent duplicate requests; a storage-level violation surfaces
    /// as the same already-exists error as the advisory check.
    pub async fn create(&self, model: favorite::ActiveModel) -> AppResult<favorite::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::Conflict("Recipe is already in favorites".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a favorite by user and recipe. Returns whether a row was
    /// removed.
    pub async fn delete_by_pair(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        let result = Favorite::delete_many()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::RecipeId.eq(recipe_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Of the given recipes, return the ids the user has favorited
    /// (one batch query for a whole listing page).
    pub async fn recipe_ids_for_user(
        &self,
        user_id: &str,
        recipe_ids: &[String],
    ) -> AppResult<Vec<String>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|f| f.recipe_id).collect())
    }
}
