use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::api::Backend;
use crate::cache::{keys, CacheManager};
use crate::models::Event;

use super::{fetch_by_id, new_id, optional, RepositoryError, Result};

const TABLE: &str = "events";

pub struct EventRepository<B> {
    backend: Arc<B>,
    cache: CacheManager,
}

impl<B> Clone for EventRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: Backend> EventRepository<B> {
    pub fn new(backend: Arc<B>, cache: CacheManager) -> Self {
        Self { backend, cache }
    }

    /// Active events, latest date first.
    pub async fn list(&self, force_refresh: bool) -> Result<Vec<Event>> {
        let backend = Arc::clone(&self.backend);
        self.cache
            .events
            .get_with_background_refresh(
                keys::EVENTS,
                move || async move {
                    let mut rows: Vec<Event> = backend.select(TABLE, &[]).await?;
                    rows.retain(|e| e.is_active);
                    rows.sort_by(|a, b| b.event_date.cmp(&a.event_date));
                    Ok::<_, RepositoryError>(rows)
                },
                self.cache.ttls().events,
                force_refresh,
            )
            .await
    }

    /// Events not yet over at `now`, soonest first.
    pub async fn upcoming(&self, now: DateTime<Utc>, force_refresh: bool) -> Result<Vec<Event>> {
        let mut events = self.list(force_refresh).await?;
        events.retain(|e| e.is_upcoming(now));
        events.sort_by(|a, b| a.event_date.cmp(&b.event_date));
        Ok(events)
    }

    pub async fn get(&self, id: &str, force_refresh: bool) -> Result<Option<Event>> {
        let backend = Arc::clone(&self.backend);
        let row_id = id.to_string();
        let result = self
            .cache
            .event_details
            .get_with_background_refresh(
                &keys::event_detail(id),
                move || async move { fetch_by_id(&*backend, TABLE, &row_id).await },
                self.cache.ttls().details,
                force_refresh,
            )
            .await;
        optional(result)
    }

    pub async fn create(&self, event: Event) -> Result<Event> {
        let now = Utc::now();
        let event = Event {
            id: new_id(),
            created_at: now,
            updated_at: now,
            ..event
        };
        self.backend.insert(TABLE, &event).await?;
        info!(id = %event.id, "Created event");
        self.invalidate(None);
        Ok(event)
    }

    pub async fn update(&self, event: Event) -> Result<Event> {
        let event = Event {
            updated_at: Utc::now(),
            ..event
        };
        self.backend.update(TABLE, &event.id, &event).await?;
        self.invalidate(Some(&event.id));
        Ok(event)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.backend.delete(TABLE, id).await?;
        info!(id, "Deleted event");
        self.invalidate(Some(id));
        Ok(())
    }

    /// Hide an event without deleting its attendance history.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        let patch = json!({ "is_active": false, "updated_at": Utc::now() });
        self.backend.update(TABLE, id, &patch).await?;
        self.invalidate(Some(id));
        Ok(())
    }

    /// Register `user_id` for an event. Reads the current row from the backend,
    /// not the cache, so the capacity check sees the latest attendee list.
    pub async fn add_attendee(&self, event_id: &str, user_id: &str) -> Result<Event> {
        let mut event: Event = fetch_by_id(&*self.backend, TABLE, event_id).await?;
        if event.is_attending(user_id) {
            return Ok(event);
        }
        if !event.has_capacity() {
            return Err(RepositoryError::EventFull(event_id.to_string()));
        }

        event.attendees.push(user_id.to_string());
        self.save_attendees(&event).await?;
        Ok(event)
    }

    pub async fn remove_attendee(&self, event_id: &str, user_id: &str) -> Result<Event> {
        let mut event: Event = fetch_by_id(&*self.backend, TABLE, event_id).await?;
        let before = event.attendees.len();
        event.attendees.retain(|a| a != user_id);
        if event.attendees.len() != before {
            self.save_attendees(&event).await?;
        }
        Ok(event)
    }

    async fn save_attendees(&self, event: &Event) -> Result<()> {
        let patch = json!({ "attendees": event.attendees, "updated_at": Utc::now() });
        self.backend.update(TABLE, &event.id, &patch).await?;
        self.invalidate(Some(&event.id));
        Ok(())
    }

    fn invalidate(&self, id: Option<&str>) {
        self.cache.events.remove(keys::EVENTS);
        if let Some(id) = id {
            self.cache.event_details.remove(&keys::event_detail(id));
        }
    }
}
