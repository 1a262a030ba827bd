use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::api::Backend;
use crate::cache::{keys, CacheManager};
use crate::models::{ProfileUpdate, User, UserRole};

use super::{fetch_by_id, optional, RepositoryError, Result};

const TABLE: &str = "users";

/// User directory and per-user profiles.
///
/// Profiles are cached individually under `user_profile_<id>`; a role change
/// drops the whole family because dashboards derive from every profile's role.
pub struct UserRepository<B> {
    backend: Arc<B>,
    cache: CacheManager,
}

impl<B> Clone for UserRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> UserRepository<B> {
    pub fn new(backend: Arc<B>, cache: CacheManager) -> Self {
        Self { backend, cache }
    }

    /// All users, sorted by display name.
    pub async fn list(&self, force_refresh: bool) -> Result<Vec<User>> {
        let backend = Arc::clone(&self.backend);
        self.cache
            .users
            .get_with_background_refresh(
                keys::USERS,
                move || async move {
                    let mut rows: Vec<User> = backend.select(TABLE, &[]).await?;
                    rows.sort_by_key(|u| u.name().to_lowercase());
                    Ok::<_, RepositoryError>(rows)
                },
                self.cache.ttls().users,
                force_refresh,
            )
            .await
    }

    pub async fn by_role(&self, role: UserRole, force_refresh: bool) -> Result<Vec<User>> {
        let mut users = self.list(force_refresh).await?;
        users.retain(|u| u.role == role);
        Ok(users)
    }

    pub async fn profile(&self, id: &str, force_refresh: bool) -> Result<Option<User>> {
        let backend = Arc::clone(&self.backend);
        let row_id = id.to_string();
        let result = self
            .cache
            .user_profiles
            .get_with_background_refresh(
                &keys::user_profile(id),
                move || async move { fetch_by_id(&*backend, TABLE, &row_id).await },
                self.cache.ttls().user_profile,
                force_refresh,
            )
            .await;
        optional(result)
    }

    /// Insert a user row. The id comes from the auth account and is kept as is.
    pub async fn create(&self, user: User) -> Result<User> {
        self.backend.insert(TABLE, &user).await?;
        info!(id = %user.id, role = %user.role, "Created user");
        self.cache.users.remove(keys::USERS);
        Ok(user)
    }

    /// Apply a partial profile update. An empty update touches nothing.
    pub async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.backend.update(TABLE, id, update).await?;
        self.invalidate_user(id);
        Ok(())
    }

    pub async fn update_role(&self, id: &str, role: UserRole) -> Result<()> {
        let patch = json!({ "role": role, "updated_at": Utc::now() });
        self.backend.update(TABLE, id, &patch).await?;
        info!(id, role = %role, "Changed user role");
        self.cache.users.remove(keys::USERS);
        self.cache.user_profiles.remove_by_pattern(keys::USER_PROFILE);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete(TABLE, id).await?;
        info!(id, "Deleted user");
        self.invalidate_user(id);
        Ok(())
    }

    fn invalidate_user(&self, id: &str) {
        self.cache.user_profiles.remove(&keys::user_profile(id));
        self.cache.users.remove(keys::USERS);
    }
}
