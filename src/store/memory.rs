use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordStore, SortOrder, StoreResult, SymptomFilter};
use crate::error::StoreError;
use crate::models::{
    Cycle, CyclePatch, Forecast, NewCycle, NewSymptom, Prediction, Settings, SettingsRecord,
    Symptom, SymptomPatch,
};

#[derive(Default)]
struct Tables {
    cycles: Vec<Cycle>,
    symptoms: Vec<Symptom>,
    settings: Vec<SettingsRecord>,
    predictions: Vec<Prediction>,
}

/// Process-local store, used when no database is configured and in tests.
/// Rows keep insertion order, so ties in a sort resolve oldest first.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every call fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str, entity_id: Option<Uuid>) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable(operation, entity_id, "memory store is offline"))
        }
    }
}

fn sort_by_key<T, K: Ord>(rows: &mut [T], order: SortOrder, key: impl Fn(&T) -> K) {
    match order {
        SortOrder::Asc => rows.sort_by(|a, b| key(a).cmp(&key(b))),
        SortOrder::Desc => rows.sort_by(|a, b| key(b).cmp(&key(a))),
    }
}

fn take_row<T>(
    rows: &mut Vec<T>,
    entity: &'static str,
    id: Uuid,
    row_id: impl Fn(&T) -> Uuid,
) -> StoreResult<T> {
    let index = rows
        .iter()
        .position(|row| row_id(row) == id)
        .ok_or_else(|| StoreError::not_found(entity, id))?;
    Ok(rows.remove(index))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_cycle(&self, cycle: NewCycle) -> StoreResult<Cycle> {
        self.check("insert_cycle", None)?;
        let row = Cycle {
            id: Uuid::new_v4(),
            user_id: cycle.user_id,
            start_date: cycle.start_date,
            end_date: cycle.end_date,
            period_length: cycle.period_length,
            cycle_length: cycle.cycle_length,
            symptoms: cycle.symptoms,
            notes: cycle.notes,
            created_at: cycle.created_at,
            updated_at: cycle.updated_at,
        };
        self.tables.write().await.cycles.push(row.clone());
        Ok(row)
    }

    async fn patch_cycle(&self, id: Uuid, patch: &CyclePatch) -> StoreResult<Cycle> {
        self.check("patch_cycle", Some(id))?;
        let mut tables = self.tables.write().await;
        let row = tables
            .cycles
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("cycle", id))?;
        patch.apply(row);
        Ok(row.clone())
    }

    async fn delete_cycle(&self, id: Uuid) -> StoreResult<Cycle> {
        self.check("delete_cycle", Some(id))?;
        let mut tables = self.tables.write().await;
        take_row(&mut tables.cycles, "cycle", id, |c| c.id)
    }

    async fn find_cycles(&self, user_id: Uuid, order: SortOrder) -> StoreResult<Vec<Cycle>> {
        self.check("find_cycles", None)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Cycle> = tables
            .cycles
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        sort_by_key(&mut rows, order, |c| c.start_date);
        Ok(rows)
    }

    async fn insert_symptom(&self, symptom: NewSymptom) -> StoreResult<Symptom> {
        self.check("insert_symptom", None)?;
        let row = Symptom {
            id: Uuid::new_v4(),
            user_id: symptom.user_id,
            date: symptom.date,
            symptoms: symptom.symptoms,
            mood: symptom.mood,
            notes: symptom.notes,
            created_at: symptom.created_at,
        };
        self.tables.write().await.symptoms.push(row.clone());
        Ok(row)
    }

    async fn patch_symptom(&self, id: Uuid, patch: &SymptomPatch) -> StoreResult<Symptom> {
        self.check("patch_symptom", Some(id))?;
        let mut tables = self.tables.write().await;
        let row = tables
            .symptoms
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found("symptom", id))?;
        patch.apply(row);
        Ok(row.clone())
    }

    async fn delete_symptom(&self, id: Uuid) -> StoreResult<Symptom> {
        self.check("delete_symptom", Some(id))?;
        let mut tables = self.tables.write().await;
        take_row(&mut tables.symptoms, "symptom", id, |s| s.id)
    }

    async fn find_symptoms(
        &self,
        filter: SymptomFilter,
        order: SortOrder,
    ) -> StoreResult<Vec<Symptom>> {
        self.check("find_symptoms", None)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Symptom> = tables
            .symptoms
            .iter()
            .filter(|s| s.user_id == filter.user_id)
            .filter(|s| filter.date.map_or(true, |date| s.date == date))
            .cloned()
            .collect();
        sort_by_key(&mut rows, order, |s| s.date);
        Ok(rows)
    }

    async fn insert_settings(
        &self,
        user_id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord> {
        self.check("insert_settings", None)?;
        let row = SettingsRecord {
            id: Uuid::new_v4(),
            user_id,
            settings,
            created_at: at,
            updated_at: at,
        };
        self.tables.write().await.settings.push(row.clone());
        Ok(row)
    }

    async fn update_settings(
        &self,
        id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord> {
        self.check("update_settings", Some(id))?;
        let mut tables = self.tables.write().await;
        let row = tables
            .settings
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found("settings", id))?;
        row.settings = settings;
        row.updated_at = at;
        Ok(row.clone())
    }

    async fn delete_settings(&self, id: Uuid) -> StoreResult<()> {
        self.check("delete_settings", Some(id))?;
        let mut tables = self.tables.write().await;
        take_row(&mut tables.settings, "settings", id, |s| s.id).map(|_| ())
    }

    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Vec<SettingsRecord>> {
        self.check("find_settings", None)?;
        let tables = self.tables.read().await;
        Ok(tables
            .settings
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_prediction(&self, user_id: Uuid, forecast: Forecast) -> StoreResult<Prediction> {
        self.check("insert_prediction", None)?;
        let row = Prediction {
            id: Uuid::new_v4(),
            user_id,
            forecast,
        };
        self.tables.write().await.predictions.push(row.clone());
        Ok(row)
    }

    async fn update_prediction(&self, id: Uuid, forecast: Forecast) -> StoreResult<Prediction> {
        self.check("update_prediction", Some(id))?;
        let mut tables = self.tables.write().await;
        let row = tables
            .predictions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("prediction", id))?;
        row.forecast = forecast;
        Ok(row.clone())
    }

    async fn delete_prediction(&self, id: Uuid) -> StoreResult<()> {
        self.check("delete_prediction", Some(id))?;
        let mut tables = self.tables.write().await;
        take_row(&mut tables.predictions, "prediction", id, |p| p.id).map(|_| ())
    }

    async fn find_predictions(&self, user_id: Uuid) -> StoreResult<Vec<Prediction>> {
        self.check("find_predictions", None)?;
        let tables = self.tables.read().await;
        Ok(tables
            .predictions
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
