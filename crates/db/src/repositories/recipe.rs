//! Recipe repository.

use std::sync::Arc;

use crate::entities::{
    Recipe, RecipeIngredient, RecipeTag, favorite, ingredient, recipe, recipe_ingredient,
    recipe_tag, shopping_cart_entry, tag,
};
use recipedia_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, TransactionTrait,
};

/// Filters for the recipe listing.
///
/// `favorited_by` / `in_cart_of` carry the caller's user id when the
/// corresponding flag was requested by an authenticated caller; for
/// anonymous callers the flags are dropped before reaching here.
#[derive(Debug, Clone, Default)]
pub struct RecipeListQuery {
    pub author_id: Option<String>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<String>,
    pub in_cart_of: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Recipe repository for database operations.
#[derive(Clone)]
pub struct RecipeRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeRepository {
    /// Create a new recipe repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a recipe by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<recipe::Model>> {
        Recipe::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<recipe::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// Apply the listing filters to a select.
    ///
    /// Tag matching is any-of over slugs; the join fans out one row per
    /// matched tag, hence the `DISTINCT`.
    fn apply_filters(mut query: Select<Recipe>, q: &RecipeListQuery) -> Select<Recipe> {
        if let Some(ref author_id) = q.author_id {
            query = query.filter(recipe::Column::AuthorId.eq(author_id));
        }

        if !q.tag_slugs.is_empty() {
            query = query
                .join(JoinType::InnerJoin, recipe::Relation::TagLinks.def())
                .join(JoinType::InnerJoin, recipe_tag::Relation::Tag.def())
                .filter(tag::Column::Slug.is_in(q.tag_slugs.clone()))
                .distinct();
        }

        if let Some(ref user_id) = q.favorited_by {
            query = query
                .join(JoinType::InnerJoin, recipe::Relation::FavoritedBy.def())
                .filter(favorite::Column::UserId.eq(user_id));
        }

        if let Some(ref user_id) = q.in_cart_of {
            query = query
                .join(JoinType::InnerJoin, recipe::Relation::CartEntries.def())
                .filter(shopping_cart_entry::Column::UserId.eq(user_id));
        }

        query
    }

    /// List recipes matching the filters, newest first.
    pub async fn list(&self, q: &RecipeListQuery) -> AppResult<Vec<recipe::Model>> {
        Self::apply_filters(Recipe::find(), q)
            .order_by_desc(recipe::Column::Id)
            .limit(q.limit)
            .offset(q.offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes matching the filters (ignores limit/offset).
    pub async fn count(&self, q: &RecipeListQuery) -> AppResult<u64> {
        Self::apply_filters(Recipe::find(), q)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get recipes by author (newest first, optionally capped).
    pub async fn find_by_author(
        &self,
        author_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<recipe::Model>> {
        let mut query = Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .order_by_desc(recipe::Column::Id);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes by author.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a recipe together with its ingredient lines and tag links
    /// in one transaction.
    pub async fn create_with_relations(
        &self,
        model: recipe::ActiveModel,
        lines: Vec<recipe_ingredient::ActiveModel>,
        tag_links: Vec<recipe_tag::ActiveModel>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeIngredient::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeTag::insert_many(tag_links)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Update a recipe and replace its full ingredient line and tag
    /// link sets in one transaction. The prior sets are deleted and the
    /// new ones inserted; on any failure the transaction rolls back and
    /// the previous state is retained.
    pub async fn update_with_relations(
        &self,
        model: recipe::ActiveModel,
        lines: Vec<recipe_ingredient::ActiveModel>,
        tag_links: Vec<recipe_tag::ActiveModel>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeIngredient::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(updated.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeTag::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(updated.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeIngredient::insert_many(lines)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        RecipeTag::insert_many(tag_links)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Delete a recipe. Join rows go with it via cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Recipe::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the ingredient lines of the given recipes together with
    /// their ingredients (one batch query for a whole listing page).
    pub async fn ingredient_lines(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<(recipe_ingredient::Model, Option<ingredient::Model>)>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(crate::entities::Ingredient)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the tag links of the given recipes together with their tags.
    pub async fn tag_links(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<(recipe_tag::Model, Option<tag::Model>)>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        RecipeTag::find()
            .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(crate::entities::Tag)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_recipe(id: &str, author_id: &str, name: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: name.to_string(),
            image_url: "/media/recipes/1.jpg".to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let recipe = create_test_recipe("r1", "u1", "Pancakes");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let result = repo.find_by_id("r1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "Pancakes");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe::Model>::new()])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let r1 = create_test_recipe("r2", "u1", "Omelette");
        let r2 = create_test_recipe("r1", "u1", "Pancakes");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r1, r2]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let q = RecipeListQuery {
            author_id: Some("u1".to_string()),
            tag_slugs: vec!["breakfast".to_string(), "lunch".to_string()],
            favorited_by: Some("u2".to_string()),
            in_cart_of: None,
            limit: 10,
            offset: 0,
        };
        let result = repo.list(&q).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "r2");
    }

    #[tokio::test]
    async fn test_ingredient_lines_empty_is_no_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = RecipeRepository::new(db);
        let result = repo.ingredient_lines(&[]).await.unwrap();

        assert!(result.is_empty());
    }
}
