//! Follow service.

use recipedia_common::{AppError, AppResult, IdGenerator};
use recipedia_db::{
    entities::{follow, recipe, user},
    repositories::{FollowRepository, RecipeRepository, UserRepository},
};
use sea_orm::Set;
use std::collections::HashMap;

/// A followed author together with their recipes, as returned by the
/// subscription endpoints.
#[derive(Debug, Clone)]
pub struct SubscriptionView {
    pub user: user::Model,
    /// Always true in subscription listings; kept explicit so the read
    /// projection is uniform with other user views.
    pub is_subscribed: bool,
    /// The author's recipes, newest first, optionally capped.
    pub recipes: Vec<recipe::Model>,
    /// Total recipe count of the author, regardless of the cap.
    pub recipes_count: u64,
}

/// A page of subscriptions.
#[derive(Debug)]
pub struct SubscriptionPage {
    /// Total number of followed users.
    pub count: u64,
    /// The requested page, newest subscription first.
    pub users: Vec<SubscriptionView>,
}

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    recipe_repo: RecipeRepository,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        recipe_repo: RecipeRepository,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            recipe_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Subscribe to a user's recipes.
    pub async fn follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        if follower_id == followee_id {
            return Err(AppError::Validation(
                "following: cannot subscribe to yourself".to_string(),
            ));
        }

        let followee = self.user_repo.get_by_id(followee_id).await?;

        // Advisory check for the friendly message; the unique index is
        // the source of truth under concurrent duplicate requests
        if self
            .follow_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Err(AppError::Conflict(
                "Already subscribed to this user".to_string(),
            ));
        }

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.follow_repo.create(model).await?;

        self.subscription_view(followee, recipes_limit).await
    }

    /// Unsubscribe from a user's recipes.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        self.user_repo.get_by_id(followee_id).await?;

        if !self
            .follow_repo
            .delete_by_pair(follower_id, followee_id)
            .await?
        {
            return Err(AppError::NotFound(
                "You are not subscribed to this user".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if a user is following another.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, followee_id).await
    }

    /// Of the given users, return the ids the follower is subscribed to
    /// (one batch query for a whole listing page).
    pub async fn followed_ids_among(
        &self,
        follower_id: &str,
        candidate_ids: &[String],
    ) -> AppResult<Vec<String>> {
        self.follow_repo
            .followee_ids_among(follower_id, candidate_ids)
            .await
    }

    /// Get the users the follower is subscribed to, with their recipes
    /// (paginated; each author's recipe list optionally capped).
    pub async fn subscriptions(
        &self,
        follower_id: &str,
        limit: u64,
        offset: u64,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionPage> {
        let count = self.follow_repo.count_followees(follower_id).await?;
        let follows = self
            .follow_repo
            .find_followees(follower_id, limit, offset)
            .await?;

        let followee_ids: Vec<String> = follows.iter().map(|f| f.followee_id.clone()).collect();
        let mut users: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&followee_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut views = Vec::with_capacity(follows.len());
        for follow in follows {
            let Some(user) = users.remove(&follow.followee_id) else {
                continue;
            };
            views.push(self.subscription_view(user, recipes_limit).await?);
        }

        Ok(SubscriptionPage {
            count,
            users: views,
        })
    }

    /// Build the subscription read projection for one followed author.
    async fn subscription_view(
        &self,
        user: user::Model,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        let recipes = self.recipe_repo.find_by_author(&user.id, recipes_limit).await?;
        let recipes_count = self.recipe_repo.count_by_author(&user.id).await?;

        Ok(SubscriptionView {
            user,
            is_subscribed: true,
            recipes,
            recipes_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

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

    fn create_test_follow(id: &str, follower_id: &str, followee_id: &str) -> follow::Model {
        follow::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn mock_conn(db: MockDatabase) -> Arc<sea_orm::DatabaseConnection> {
        Arc::new(db.into_connection())
    }

    #[tokio::test]
    async fn test_follow_yourself_is_a_validation_error() {
        let service = FollowService::new(
            FollowRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
            UserRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
            RecipeRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
        );

        let result = service.follow("u1", "u1", None).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("yourself")));
    }

    #[tokio::test]
    async fn test_follow_already_following_is_conflict() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "bob")]]);
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_follow("f1", "u1", "u2")]]);

        let service = FollowService::new(
            FollowRepository::new(mock_conn(follow_db)),
            UserRepository::new(mock_conn(user_db)),
            RecipeRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
        );

        let result = service.follow("u1", "u2", None).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_follow_unknown_user_is_not_found() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);

        let service = FollowService::new(
            FollowRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
            UserRepository::new(mock_conn(user_db)),
            RecipeRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
        );

        let result = service.follow("u1", "missing", None).await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_unfollow_not_subscribed_is_not_found() {
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "bob")]]);
        let follow_db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]);

        let service = FollowService::new(
            FollowRepository::new(mock_conn(follow_db)),
            UserRepository::new(mock_conn(user_db)),
            RecipeRepository::new(mock_conn(MockDatabase::new(DatabaseBackend::Postgres))),
        );

        let result = service.unfollow("u1", "u2").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
