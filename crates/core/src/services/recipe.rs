//! Recipe service.
//!
//! Owns the write-time validation rules for recipes and assembles the
//! nested read projection (author, tags, ingredient lines, viewer
//! membership flags) the API returns.

use std::collections::{HashMap, HashSet};

use recipedia_common::{AppError, AppResult, IdGenerator};
use recipedia_db::{
    entities::{recipe, recipe_ingredient, recipe_tag, tag, user},
    repositories::{
        FavoriteRepository, FollowRepository, IngredientRepository, RecipeListQuery,
        RecipeRepository, ShoppingCartRepository, TagRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::media::MediaService;

/// One ingredient line in a recipe write request.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientLineInput {
    /// Ingredient id.
    pub id: String,
    /// Amount in the ingredient's measurement unit.
    pub amount: i32,
}

/// Input for creating a recipe.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1))]
    pub text: String,

    pub cooking_time: i32,

    /// Base64 data URI; required on creation.
    pub image: Option<String>,

    pub ingredients: Vec<IngredientLineInput>,

    /// Tag ids.
    pub tags: Vec<String>,
}

/// Input for updating a recipe. The ingredient and tag sets replace the
/// stored ones in full; an omitted image keeps the stored one.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(min = 1))]
    pub text: String,

    pub cooking_time: i32,

    pub image: Option<String>,

    pub ingredients: Vec<IngredientLineInput>,

    pub tags: Vec<String>,
}

/// Listing filters as they arrive from the API layer.
///
/// The membership flags are requests, not user ids: they only become
/// effective when a viewer identity is present, and are silently
/// dropped for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilters {
    pub author_id: Option<String>,
    pub tag_slugs: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub limit: u64,
    pub offset: u64,
}

/// One ingredient line of the read projection.
#[derive(Debug, Clone)]
pub struct RecipeIngredientDetail {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full nested read projection of a recipe.
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: recipe::Model,
    pub author: user::Model,
    /// Whether the viewer follows the author; false for anonymous
    /// viewers.
    pub author_is_subscribed: bool,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<RecipeIngredientDetail>,
    /// Whether the viewer favorited this recipe; false for anonymous
    /// viewers.
    pub is_favorited: bool,
    /// Whether this recipe is in the viewer's cart; false for anonymous
    /// viewers.
    pub is_in_shopping_cart: bool,
}

/// A page of the recipe listing.
#[derive(Debug)]
pub struct RecipePage {
    /// Total number of recipes matching the filters.
    pub count: u64,
    /// The requested page, newest first.
    pub recipes: Vec<RecipeDetail>,
}

/// Recipe service for business logic.
#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    user_repo: UserRepository,
    tag_repo: TagRepository,
    ingredient_repo: IngredientRepository,
    favorite_repo: FavoriteRepository,
    cart_repo: ShoppingCartRepository,
    follow_repo: FollowRepository,
    media: MediaService,
    server_url: String,
    id_gen: IdGenerator,
}

/// Collection rules shared by create and update.
fn validate_collections(
    ingredients: &[IngredientLineInput],
    tags: &[String],
    cooking_time: i32,
) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::Validation(
            "ingredients: at least one ingredient is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for line in ingredients {
        if !seen.insert(line.id.as_str()) {
            return Err(AppError::Validation(
                "ingredients: ingredients must not repeat".to_string(),
            ));
        }
        if line.amount < 1 {
            return Err(AppError::Validation(
                "ingredients: amount must be at least 1".to_string(),
            ));
        }
    }

    if tags.is_empty() {
        return Err(AppError::Validation(
            "tags: at least one tag is required".to_string(),
        ));
    }

    let unique_tags: HashSet<&str> = tags.iter().map(String::as_str).collect();
    if unique_tags.len() != tags.len() {
        return Err(AppError::Validation(
            "tags: tags must not repeat".to_string(),
        ));
    }

    if cooking_time < 1 {
        return Err(AppError::Validation(
            "cooking_time: must be at least 1".to_string(),
        ));
    }

    Ok(())
}

impl RecipeService {
    /// Create a new recipe service.
    #[must_use]
    pub fn new(
        recipe_repo: RecipeRepository,
        user_repo: UserRepository,
        tag_repo: TagRepository,
        ingredient_repo: IngredientRepository,
        favorite_repo: FavoriteRepository,
        cart_repo: ShoppingCartRepository,
        follow_repo: FollowRepository,
        media: MediaService,
        server_url: String,
    ) -> Self {
        Self {
            recipe_repo,
            user_repo,
            tag_repo,
            ingredient_repo,
            favorite_repo,
            cart_repo,
            follow_repo,
            media,
            server_url,
            id_gen: IdGenerator::new(),
        }
    }

    /// List recipes visible to the viewer, newest first.
    ///
    /// The favorited/cart filters only apply for authenticated viewers;
    /// for anonymous callers they are no-ops rather than errors.
    pub async fn list(&self, viewer: Option<&str>, filters: RecipeFilters) -> AppResult<RecipePage> {
        let mut tag_slugs = filters.tag_slugs;
        tag_slugs.sort_unstable();
        tag_slugs.dedup();

        let query = RecipeListQuery {
            author_id: filters.author_id,
            tag_slugs,
            favorited_by: viewer
                .filter(|_| filters.is_favorited)
                .map(ToString::to_string),
            in_cart_of: viewer
                .filter(|_| filters.is_in_shopping_cart)
                .map(ToString::to_string),
            limit: filters.limit,
            offset: filters.offset,
        };

        let count = self.recipe_repo.count(&query).await?;
        let recipes = self.recipe_repo.list(&query).await?;
        let recipes = self.assemble_details(recipes, viewer).await?;

        Ok(RecipePage { count, recipes })
    }

    /// Get the full read projection of one recipe.
    pub async fn get(&self, id: &str, viewer: Option<&str>) -> AppResult<RecipeDetail> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        let mut details = self.assemble_details(vec![recipe], viewer).await?;
        details
            .pop()
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// Create a recipe with its full ingredient and tag sets.
    pub async fn create(
        &self,
        author: &user::Model,
        input: CreateRecipeInput,
    ) -> AppResult<RecipeDetail> {
        input.validate()?;
        validate_collections(&input.ingredients, &input.tags, input.cooking_time)?;

        let image = input
            .image
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("image: an image is required".to_string()))?;

        let tags = self.resolve_tags(&input.tags).await?;
        let ingredients = self.resolve_ingredient_lines(&input.ingredients).await?;

        let image_url = self.media.store_data_uri(&author.id, image).await?;
        let recipe_id = self.id_gen.generate();

        let model = recipe::ActiveModel {
            id: Set(recipe_id.clone()),
            author_id: Set(author.id.clone()),
            name: Set(input.name),
            image_url: Set(image_url),
            text: Set(input.text),
            cooking_time: Set(input.cooking_time),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self
            .recipe_repo
            .create_with_relations(
                model,
                self.build_line_models(&recipe_id, &input.ingredients),
                self.build_tag_models(&recipe_id, &input.tags),
            )
            .await?;

        Ok(RecipeDetail {
            recipe: created,
            author: author.clone(),
            author_is_subscribed: false,
            tags,
            ingredients,
            is_favorited: false,
            is_in_shopping_cart: false,
        })
    }

    /// Replace a recipe's fields and its full ingredient and tag sets.
    /// Only the author may update a recipe.
    pub async fn update(
        &self,
        caller: &user::Model,
        id: &str,
        input: UpdateRecipeInput,
    ) -> AppResult<RecipeDetail> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        if recipe.author_id != caller.id {
            return Err(AppError::Forbidden(
                "You cannot edit another user's recipe".to_string(),
            ));
        }

        input.validate()?;
        validate_collections(&input.ingredients, &input.tags, input.cooking_time)?;

        let tags = self.resolve_tags(&input.tags).await?;
        let ingredients = self.resolve_ingredient_lines(&input.ingredients).await?;

        let image_url = match input.image.as_deref().filter(|s| !s.is_empty()) {
            Some(data_uri) => self.media.store_data_uri(&caller.id, data_uri).await?,
            None => recipe.image_url.clone(),
        };

        let mut active: recipe::ActiveModel = recipe.into();
        active.name = Set(input.name);
        active.image_url = Set(image_url);
        active.text = Set(input.text);
        active.cooking_time = Set(input.cooking_time);
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        let updated = self
            .recipe_repo
            .update_with_relations(
                active,
                self.build_line_models(id, &input.ingredients),
                self.build_tag_models(id, &input.tags),
            )
            .await?;

        let is_favorited = self.favorite_repo.is_favorited(&caller.id, id).await?;
        let is_in_shopping_cart = self.cart_repo.is_in_cart(&caller.id, id).await?;

        Ok(RecipeDetail {
            recipe: updated,
            author: caller.clone(),
            author_is_subscribed: false,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }

    /// Delete a recipe. Only the author may delete a recipe.
    pub async fn delete(&self, caller: &user::Model, id: &str) -> AppResult<()> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        if recipe.author_id != caller.id {
            return Err(AppError::Forbidden(
                "You cannot delete another user's recipe".to_string(),
            ));
        }

        self.recipe_repo.delete(id).await
    }

    /// Canonical absolute URL for a recipe.
    pub async fn get_link(&self, id: &str) -> AppResult<String> {
        let recipe = self.recipe_repo.get_by_id(id).await?;
        Ok(format!(
            "{}/recipes/{}",
            self.server_url.trim_end_matches('/'),
            recipe.id
        ))
    }

    /// Resolve tag ids to models, rejecting unknown ids.
    async fn resolve_tags(&self, tag_ids: &[String]) -> AppResult<Vec<tag::Model>> {
        let found = self.tag_repo.find_by_ids(tag_ids).await?;
        if found.len() != tag_ids.len() {
            return Err(AppError::Validation("tags: unknown tag id".to_string()));
        }

        // Preserve request order
        let by_id: HashMap<&str, &tag::Model> =
            found.iter().map(|t| (t.id.as_str(), t)).collect();
        Ok(tag_ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|t| (*t).clone()))
            .collect())
    }

    /// Resolve ingredient line inputs to the read projection, rejecting
    /// unknown ingredient ids.
    async fn resolve_ingredient_lines(
        &self,
        lines: &[IngredientLineInput],
    ) -> AppResult<Vec<RecipeIngredientDetail>> {
        let ids: Vec<String> = lines.iter().map(|l| l.id.clone()).collect();
        let found = self.ingredient_repo.find_by_ids(&ids).await?;
        if found.len() != ids.len() {
            return Err(AppError::Validation(
                "ingredients: unknown ingredient id".to_string(),
            ));
        }

        let by_id: HashMap<&str, _> = found.iter().map(|i| (i.id.as_str(), i)).collect();
        Ok(lines
            .iter()
            .filter_map(|line| {
                by_id.get(line.id.as_str()).map(|i| RecipeIngredientDetail {
                    id: i.id.clone(),
                    name: i.name.clone(),
                    measurement_unit: i.measurement_unit.clone(),
                    amount: line.amount,
                })
            })
            .collect())
    }

    fn build_line_models(
        &self,
        recipe_id: &str,
        lines: &[IngredientLineInput],
    ) -> Vec<recipe_ingredient::ActiveModel> {
        lines
            .iter()
            .map(|line| recipe_ingredient::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                ingredient_id: Set(line.id.clone()),
                amount: Set(line.amount),
            })
            .collect()
    }

    fn build_tag_models(&self, recipe_id: &str, tag_ids: &[String]) -> Vec<recipe_tag::ActiveModel> {
        tag_ids
            .iter()
            .map(|tag_id| recipe_tag::ActiveModel {
                id: Set(self.id_gen.generate()),
                recipe_id: Set(recipe_id.to_string()),
                tag_id: Set(tag_id.clone()),
            })
            .collect()
    }

    /// Assemble full read projections for a page of recipes with batch
    /// queries: authors, ingredient lines, tag links and the viewer's
    /// membership flags are each fetched once per page.
    async fn assemble_details(
        &self,
        recipes: Vec<recipe::Model>,
        viewer: Option<&str>,
    ) -> AppResult<Vec<RecipeDetail>> {
        if recipes.is_empty() {
            return Ok(vec![]);
        }

        let recipe_ids: Vec<String> = recipes.iter().map(|r| r.id.clone()).collect();
        let mut author_ids: Vec<String> = recipes.iter().map(|r| r.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut lines_by_recipe: HashMap<String, Vec<RecipeIngredientDetail>> = HashMap::new();
        for (line, ingredient) in self.recipe_repo.ingredient_lines(&recipe_ids).await? {
            let Some(ingredient) = ingredient else {
                continue;
            };
            lines_by_recipe
                .entry(line.recipe_id)
                .or_default()
                .push(RecipeIngredientDetail {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: line.amount,
                });
        }

        let mut tags_by_recipe: HashMap<String, Vec<tag::Model>> = HashMap::new();
        for (link, tag) in self.recipe_repo.tag_links(&recipe_ids).await? {
            let Some(tag) = tag else {
                continue;
            };
            tags_by_recipe.entry(link.recipe_id).or_default().push(tag);
        }

        let (favorited, in_cart, followed) = match viewer {
            Some(viewer_id) => (
                self.favorite_repo
                    .recipe_ids_for_user(viewer_id, &recipe_ids)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
                self.cart_repo
                    .recipe_ids_for_user(viewer_id, &recipe_ids)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
                self.follow_repo
                    .followee_ids_among(viewer_id, &author_ids)
                    .await?
                    .into_iter()
                    .collect::<HashSet<_>>(),
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        let mut details = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("Author of recipe {} missing", recipe.id)))?;

            details.push(RecipeDetail {
                author_is_subscribed: followed.contains(&recipe.author_id),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                ingredients: lines_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author,
                recipe,
            });
        }

        Ok(details)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recipedia_common::LocalStorage;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn mock_db() -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn service() -> RecipeService {
        service_with_recipe_db(MockDatabase::new(DatabaseBackend::Postgres))
    }

    fn service_with_recipe_db(recipe_db: MockDatabase) -> RecipeService {
        let media = MediaService::new(
            Arc::new(LocalStorage::new(
                std::env::temp_dir(),
                "/media".to_string(),
            )),
            "https://example.com".to_string(),
        );

        RecipeService::new(
            RecipeRepository::new(Arc::new(recipe_db.into_connection())),
            UserRepository::new(mock_db()),
            TagRepository::new(mock_db()),
            IngredientRepository::new(mock_db()),
            FavoriteRepository::new(mock_db()),
            ShoppingCartRepository::new(mock_db()),
            FollowRepository::new(mock_db()),
            media,
            "https://example.com".to_string(),
        )
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            avatar_url: None,
            password_hash: "hash".to_string(),
            token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_recipe(id: &str, author_id: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: "Pancakes".to_string(),
            image_url: "https://example.com/media/r.jpg".to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn line(id: &str, amount: i32) -> IngredientLineInput {
        IngredientLineInput {
            id: id.to_string(),
            amount,
        }
    }

    fn valid_input() -> CreateRecipeInput {
        CreateRecipeInput {
            name: "Pancakes".to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
            ingredients: vec![line("i1", 200)],
            tags: vec!["t1".to_string()],
        }
    }

    #[test]
    fn test_validate_collections_ok() {
        assert!(validate_collections(&[line("i1", 1), line("i2", 5)], &["t1".to_string()], 1).is_ok());
    }

    #[tokio::test]
    async fn test_create_requires_ingredients() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.ingredients = vec![];

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("ingredient")));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_ingredients() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.ingredients = vec![line("i1", 200), line("i1", 100)];

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("repeat")));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_amount() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.ingredients = vec![line("i1", 0)];

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("amount")));
    }

    #[tokio::test]
    async fn test_create_requires_tags() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.tags = vec![];

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("tag")));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_tags() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.tags = vec!["t1".to_string(), "t1".to_string()];

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("repeat")));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_cooking_time() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.cooking_time = 0;

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("cooking_time")));
    }

    #[tokio::test]
    async fn test_create_requires_image() {
        let author = create_test_user("u1", "alice");
        let mut input = valid_input();
        input.image = None;

        let result = service().create(&author, input).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("image")));
    }

    #[tokio::test]
    async fn test_update_by_non_author_is_forbidden() {
        let recipe = create_test_recipe("r1", "u1");
        let caller = create_test_user("u2", "bob");

        let service = service_with_recipe_db(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[recipe]]),
        );

        let input = UpdateRecipeInput {
            name: "Stolen".to_string(),
            text: "Mine now.".to_string(),
            cooking_time: 5,
            image: None,
            ingredients: vec![line("i1", 1)],
            tags: vec!["t1".to_string()],
        };

        let result = service.update(&caller, "r1", input).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_non_author_is_forbidden() {
        let recipe = create_test_recipe("r1", "u1");
        let caller = create_test_user("u2", "bob");

        let service = service_with_recipe_db(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[recipe]]),
        );

        let result = service.delete(&caller, "r1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_get_link() {
        let recipe = create_test_recipe("r1", "u1");

        let service = service_with_recipe_db(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[recipe]]),
        );

        let link = service.get_link("r1").await.unwrap();

        assert_eq!(link, "https://example.com/recipes/r1");
    }
}
