//! Favorite service.

use recipedia_common::{AppError, AppResult, IdGenerator};
use recipedia_db::{
    entities::{favorite, recipe},
    repositories::{FavoriteRepository, RecipeRepository},
};
use sea_orm::Set;

/// Favorite service for managing per-user recipe bookmarks.
#[derive(Clone)]
pub struct FavoriteService {
    favorite_repo: FavoriteRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl FavoriteService {
    /// Create a new favorite service.
    #[must_use]
    pub const fn new(favorite_repo: FavoriteRepository, recipe_repo: RecipeRepository) -> Self {
        Self {
            favorite_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a recipe to the user's favorites. Returns the recipe for the
    /// short response projection.
    pub async fn create(&self, user_id: &str, recipe_id: &str) -> AppResult<recipe::Model> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        if self.favorite_repo.is_favorited(user_id, recipe_id).await? {
            return Err(AppError::Conflict(
                "Recipe is already in favorites".to_string(),
            ));
        }

        let model = favorite::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            recipe_id: Set(recipe_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.favorite_repo.create(model).await?;

        Ok(recipe)
    }

    /// Remove a recipe from the user's favorites.
    pub async fn delete(&self, user_id: &str, recipe_id: &str) -> AppResult<()> {
        self.recipe_repo.get_by_id(recipe_id).await?;

        if !self.favorite_repo.delete_by_pair(user_id, recipe_id).await? {
            return Err(AppError::NotFound(
                "Recipe was not in favorites".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if a recipe is favorited by user.
    pub async fn is_favorited(&self, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        self.favorite_repo.is_favorited(user_id, recipe_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
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

    fn create_test_favorite(id: &str, user_id: &str, recipe_id: &str) -> favorite::Model {
        favorite::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            recipe_id: recipe_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_create_already_favorited_is_conflict() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe("r1")]])
                .into_connection(),
        );
        let fav_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_favorite("f1", "u1", "r1")]])
                .into_connection(),
        );

        let service = FavoriteService::new(
            FavoriteRepository::new(fav_db),
            RecipeRepository::new(recipe_db),
        );

        let result = service.create("u1", "r1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_unknown_recipe_is_not_found() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe::Model>::new()])
                .into_connection(),
        );
        let fav_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FavoriteService::new(
            FavoriteRepository::new(fav_db),
            RecipeRepository::new(recipe_db),
        );

        let result = service.create("u1", "missing").await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_not_favorited_is_not_found() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe("r1")]])
                .into_connection(),
        );
        let fav_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let service = FavoriteService::new(
            FavoriteRepository::new(fav_db),
            RecipeRepository::new(recipe_db),
        );

        let result = service.delete("u1", "r1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_favorited_succeeds() {
        let recipe_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_recipe("r1")]])
                .into_connection(),
        );
        let fav_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = FavoriteService::new(
            FavoriteRepository::new(fav_db),
            RecipeRepository::new(recipe_db),
        );

        assert!(service.delete("u1", "r1").await.is_ok());
    }
}
