//! In-memory stand-in for the hosted backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use pesapp_core::api::{ApiError, Backend, Filter};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    selects: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<T: Serialize>(&self, table: &str, rows: &[T]) {
        let values = rows
            .iter()
            .map(|row| serde_json::to_value(row).expect("row should serialize"))
            .collect();
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), values);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    /// While set, every select fails with a server error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn matches(row: &Value, filter: &Filter) -> bool {
        match row.get(&filter.column) {
            Some(Value::String(s)) => *s == filter.value,
            Some(other) => other.to_string() == filter.value,
            None => false,
        }
    }
}

impl Backend for MemoryBackend {
    async fn select<T>(&self, table: &str, filters: &[Filter]) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        self.selects.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError("backend unavailable".to_string()));
        }

        self.rows(table)
            .into_iter()
            .filter(|row| filters.iter().all(|f| Self::matches(row, f)))
            .map(|row| {
                serde_json::from_value(row).map_err(|e| ApiError::InvalidResponse(e.to_string()))
            })
            .collect()
    }

    async fn insert<B>(&self, table: &str, row: &B) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        let value =
            serde_json::to_value(row).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn update<B>(&self, table: &str, id: &str, patch: &B) -> Result<(), ApiError>
    where
        B: Serialize + Sync,
    {
        let patch =
            serde_json::to_value(patch).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for row in rows.iter_mut() {
            if row.get("id").and_then(Value::as_str) == Some(id) {
                if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                    for (key, value) in fields {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), ApiError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }
}
