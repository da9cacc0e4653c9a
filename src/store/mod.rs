//! Persistence seam for the four per-user collections.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Cycle, CyclePatch, Forecast, NewCycle, NewSymptom, Prediction, Settings, SettingsRecord,
    Symptom, SymptomPatch,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Equality filter for symptom queries. `date: None` matches every date.
#[derive(Debug, Clone, Copy)]
pub struct SymptomFilter {
    pub user_id: Uuid,
    pub date: Option<NaiveDate>,
}

/// Record store used by the service layer.
///
/// Every collection is scoped by `user_id`. Inserts assign the id, patches merge
/// only the fields that are set, and lookups by id that miss return
/// [`StoreError::NotFound`]. Queries never fail on an empty result.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_cycle(&self, cycle: NewCycle) -> StoreResult<Cycle>;
    async fn patch_cycle(&self, id: Uuid, patch: &CyclePatch) -> StoreResult<Cycle>;
    async fn delete_cycle(&self, id: Uuid) -> StoreResult<Cycle>;
    /// Cycles of a user ordered by `start_date`.
    async fn find_cycles(&self, user_id: Uuid, order: SortOrder) -> StoreResult<Vec<Cycle>>;

    async fn insert_symptom(&self, symptom: NewSymptom) -> StoreResult<Symptom>;
    async fn patch_symptom(&self, id: Uuid, patch: &SymptomPatch) -> StoreResult<Symptom>;
    async fn delete_symptom(&self, id: Uuid) -> StoreResult<Symptom>;
    /// Symptoms matching the filter ordered by `date`.
    async fn find_symptoms(
        &self,
        filter: SymptomFilter,
        order: SortOrder,
    ) -> StoreResult<Vec<Symptom>>;

    async fn insert_settings(
        &self,
        user_id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord>;
    /// Replaces the stored values of an existing settings record.
    async fn update_settings(
        &self,
        id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord>;
    async fn delete_settings(&self, id: Uuid) -> StoreResult<()>;
    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Vec<SettingsRecord>>;

    async fn insert_prediction(&self, user_id: Uuid, forecast: Forecast) -> StoreResult<Prediction>;
    async fn update_prediction(&self, id: Uuid, forecast: Forecast) -> StoreResult<Prediction>;
    async fn delete_prediction(&self, id: Uuid) -> StoreResult<()>;
    async fn find_predictions(&self, user_id: Uuid) -> StoreResult<Vec<Prediction>>;
}
