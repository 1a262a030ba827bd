use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::api::Backend;
use crate::cache::{keys, CacheManager};
use crate::models::{Announcement, UserRole};

use super::{fetch_by_id, new_id, optional, RepositoryError, Result};

const TABLE: &str = "announcements";

pub struct AnnouncementRepository<B> {
    backend: Arc<B>,
    cache: CacheManager,
}

impl<B> Clone for AnnouncementRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> AnnouncementRepository<B> {
    pub fn new(backend: Arc<B>, cache: CacheManager) -> Self {
        Self { backend, cache }
    }

    /// Active announcements, newest first.
    pub async fn list(&self, force_refresh: bool) -> Result<Vec<Announcement>> {
        let backend = Arc::clone(&self.backend);
        self.cache
            .announcements
            .get_with_background_refresh(
                keys::ANNOUNCEMENTS,
                move || async move {
                    let mut rows: Vec<Announcement> = backend.select(TABLE, &[]).await?;
                    rows.retain(|a| a.is_active);
                    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                    Ok::<_, RepositoryError>(rows)
                },
                self.cache.ttls().announcements,
                force_refresh,
            )
            .await
    }

    pub async fn visible_to(&self, role: UserRole, force_refresh: bool) -> Result<Vec<Announcement>> {
        let mut announcements = self.list(force_refresh).await?;
        announcements.retain(|a| a.is_visible_to(role));
        Ok(announcements)
    }

    pub async fn get(&self, id: &str, force_refresh: bool) -> Result<Option<Announcement>> {
        let backend = Arc::clone(&self.backend);
        let row_id = id.to_string();
        let result = self
            .cache
            .announcement_details
            .get_with_background_refresh(
                &keys::announcement_detail(id),
                move || async move { fetch_by_id(&*backend, TABLE, &row_id).await },
                self.cache.ttls().details,
                force_refresh,
            )
            .await;
        optional(result)
    }

    /// Insert a new announcement with a fresh id and timestamps.
    pub async fn create(&self, announcement: Announcement) -> Result<Announcement> {
        let now = Utc::now();
        let announcement = Announcement {
            id: new_id(),
            created_at: now,
            updated_at: now,
            ..announcement
        };
        self.backend.insert(TABLE, &announcement).await?;
        info!(id = %announcement.id, "Created announcement");
        self.invalidate(None);
        Ok(announcement)
    }

    pub async fn update(&self, announcement: Announcement) -> Result<Announcement> {
        let announcement = Announcement {
            updated_at: Utc::now(),
            ..announcement
        };
        self.backend
            .update(TABLE, &announcement.id, &announcement)
            .await?;
        self.invalidate(Some(&announcement.id));
        Ok(announcement)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete(TABLE, id).await?;
        info!(id, "Deleted announcement");
        self.invalidate(Some(id));
        Ok(())
    }

    fn invalidate(&self, id: Option<&str>) {
        self.cache.announcements.remove(keys::ANNOUNCEMENTS);
        if let Some(id) = id {
            self.cache
                .announcement_details
                .remove(&keys::announcement_detail(id));
        }
    }
}
