use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

use super::{RecordStore, SortOrder, StoreResult, SymptomFilter};
use crate::error::StoreError;
use crate::models::{
    Cycle, CyclePatch, FertileWindow, Forecast, NewCycle, NewSymptom, NotificationSettings,
    Prediction, Settings, SettingsRecord, Symptom, SymptomPatch,
};

const CYCLE_COLUMNS: &str = "id, user_id, start_date, end_date, period_length, cycle_length, \
     symptoms, notes, created_at, updated_at";
const SYMPTOM_COLUMNS: &str = "id, user_id, date, symptoms, mood, notes, created_at";
const SETTINGS_COLUMNS: &str = "id, user_id, average_cycle_length, average_period_length, \
     last_period_start, notifications, dark_mode, language, created_at, updated_at";
const PREDICTION_COLUMNS: &str = "id, user_id, next_period_start, next_ovulation_date, \
     fertile_window_start, fertile_window_end, last_updated";

#[derive(sqlx::FromRow)]
struct SettingsRow {
    id: Uuid,
    user_id: Uuid,
    average_cycle_length: i32,
    average_period_length: i32,
    last_period_start: Option<NaiveDate>,
    notifications: Json<NotificationSettings>,
    dark_mode: bool,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for SettingsRecord {
    fn from(row: SettingsRow) -> Self {
        SettingsRecord {
            id: row.id,
            user_id: row.user_id,
            settings: Settings {
                average_cycle_length: row.average_cycle_length,
                average_period_length: row.average_period_length,
                last_period_start: row.last_period_start,
                notifications: row.notifications.0,
                dark_mode: row.dark_mode,
                language: row.language,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PredictionRow {
    id: Uuid,
    user_id: Uuid,
    next_period_start: NaiveDate,
    next_ovulation_date: NaiveDate,
    fertile_window_start: NaiveDate,
    fertile_window_end: NaiveDate,
    last_updated: DateTime<Utc>,
}

impl From<PredictionRow> for Prediction {
    fn from(row: PredictionRow) -> Self {
        Prediction {
            id: row.id,
            user_id: row.user_id,
            forecast: Forecast {
                next_period_start: row.next_period_start,
                next_ovulation_date: row.next_ovulation_date,
                fertile_window: FertileWindow {
                    start: row.fertile_window_start,
                    end: row.fertile_window_end,
                },
                last_updated: row.last_updated,
            },
        }
    }
}

/// Postgres-backed store. Patches run select-for-update, merge, update in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_cycle(&self, cycle: NewCycle) -> StoreResult<Cycle> {
        let sql = format!(
            "INSERT INTO cycles ({CYCLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {CYCLE_COLUMNS}"
        );
        sqlx::query_as::<_, Cycle>(&sql)
            .bind(Uuid::new_v4())
            .bind(cycle.user_id)
            .bind(cycle.start_date)
            .bind(cycle.end_date)
            .bind(cycle.period_length)
            .bind(cycle.cycle_length)
            .bind(&cycle.symptoms)
            .bind(&cycle.notes)
            .bind(cycle.created_at)
            .bind(cycle.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("insert_cycle", None, e))
    }

    async fn patch_cycle(&self, id: Uuid, patch: &CyclePatch) -> StoreResult<Cycle> {
        let op = "patch_cycle";
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?;

        let select = format!("SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = $1 FOR UPDATE");
        let mut cycle = sqlx::query_as::<_, Cycle>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?
            .ok_or_else(|| StoreError::not_found("cycle", id))?;

        patch.apply(&mut cycle);

        sqlx::query(
            "UPDATE cycles SET start_date = $2, end_date = $3, period_length = $4, \
             cycle_length = $5, symptoms = $6, notes = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(id)
        .bind(cycle.start_date)
        .bind(cycle.end_date)
        .bind(cycle.period_length)
        .bind(cycle.cycle_length)
        .bind(&cycle.symptoms)
        .bind(&cycle.notes)
        .bind(cycle.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::unavailable(op, Some(id), e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?;
        Ok(cycle)
    }

    async fn delete_cycle(&self, id: Uuid) -> StoreResult<Cycle> {
        let sql = format!("DELETE FROM cycles WHERE id = $1 RETURNING {CYCLE_COLUMNS}");
        sqlx::query_as::<_, Cycle>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("delete_cycle", Some(id), e))?
            .ok_or_else(|| StoreError::not_found("cycle", id))
    }

    async fn find_cycles(&self, user_id: Uuid, order: SortOrder) -> StoreResult<Vec<Cycle>> {
        let sql = format!(
            "SELECT {CYCLE_COLUMNS} FROM cycles WHERE user_id = $1 \
             ORDER BY start_date {}, created_at",
            order.as_sql()
        );
        sqlx::query_as::<_, Cycle>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("find_cycles", None, e))
    }

    async fn insert_symptom(&self, symptom: NewSymptom) -> StoreResult<Symptom> {
        let sql = format!(
            "INSERT INTO symptoms ({SYMPTOM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {SYMPTOM_COLUMNS}"
        );
        sqlx::query_as::<_, Symptom>(&sql)
            .bind(Uuid::new_v4())
            .bind(symptom.user_id)
            .bind(symptom.date)
            .bind(&symptom.symptoms)
            .bind(&symptom.mood)
            .bind(&symptom.notes)
            .bind(symptom.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("insert_symptom", None, e))
    }

    async fn patch_symptom(&self, id: Uuid, patch: &SymptomPatch) -> StoreResult<Symptom> {
        let op = "patch_symptom";
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?;

        let select = format!("SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE id = $1 FOR UPDATE");
        let mut symptom = sqlx::query_as::<_, Symptom>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?
            .ok_or_else(|| StoreError::not_found("symptom", id))?;

        patch.apply(&mut symptom);

        sqlx::query("UPDATE symptoms SET date = $2, symptoms = $3, mood = $4, notes = $5 WHERE id = $1")
            .bind(id)
            .bind(symptom.date)
            .bind(&symptom.symptoms)
            .bind(&symptom.mood)
            .bind(&symptom.notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::unavailable(op, Some(id), e))?;
        Ok(symptom)
    }

    async fn delete_symptom(&self, id: Uuid) -> StoreResult<Symptom> {
        let sql = format!("DELETE FROM symptoms WHERE id = $1 RETURNING {SYMPTOM_COLUMNS}");
        sqlx::query_as::<_, Symptom>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("delete_symptom", Some(id), e))?
            .ok_or_else(|| StoreError::not_found("symptom", id))
    }

    async fn find_symptoms(
        &self,
        filter: SymptomFilter,
        order: SortOrder,
    ) -> StoreResult<Vec<Symptom>> {
        let sql = format!(
            "SELECT {SYMPTOM_COLUMNS} FROM symptoms \
             WHERE user_id = $1 AND ($2::date IS NULL OR date = $2) \
             ORDER BY date {}, created_at",
            order.as_sql()
        );
        sqlx::query_as::<_, Symptom>(&sql)
            .bind(filter.user_id)
            .bind(filter.date)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("find_symptoms", None, e))
    }

    async fn insert_settings(
        &self,
        user_id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord> {
        let sql = format!(
            "INSERT INTO settings ({SETTINGS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) RETURNING {SETTINGS_COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(settings.average_cycle_length)
            .bind(settings.average_period_length)
            .bind(settings.last_period_start)
            .bind(Json(&settings.notifications))
            .bind(settings.dark_mode)
            .bind(&settings.language)
            .bind(at)
            .fetch_one(&self.pool)
            .await
            .map(SettingsRecord::from)
            .map_err(|e| StoreError::unavailable("insert_settings", None, e))
    }

    async fn update_settings(
        &self,
        id: Uuid,
        settings: Settings,
        at: DateTime<Utc>,
    ) -> StoreResult<SettingsRecord> {
        let sql = format!(
            "UPDATE settings SET average_cycle_length = $2, average_period_length = $3, \
             last_period_start = $4, notifications = $5, dark_mode = $6, language = $7, \
             updated_at = $8 WHERE id = $1 RETURNING {SETTINGS_COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(id)
            .bind(settings.average_cycle_length)
            .bind(settings.average_period_length)
            .bind(settings.last_period_start)
            .bind(Json(&settings.notifications))
            .bind(settings.dark_mode)
            .bind(&settings.language)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("update_settings", Some(id), e))?
            .map(SettingsRecord::from)
            .ok_or_else(|| StoreError::not_found("settings", id))
    }

    async fn delete_settings(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM settings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("delete_settings", Some(id), e))?;
        match result.rows_affected() {
            0 => Err(StoreError::not_found("settings", id)),
            _ => Ok(()),
        }
    }

    async fn find_settings(&self, user_id: Uuid) -> StoreResult<Vec<SettingsRecord>> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM settings WHERE user_id = $1 ORDER BY created_at");
        let rows = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("find_settings", None, e))?;
        Ok(rows.into_iter().map(SettingsRecord::from).collect())
    }

    async fn insert_prediction(&self, user_id: Uuid, forecast: Forecast) -> StoreResult<Prediction> {
        let sql = format!(
            "INSERT INTO predictions ({PREDICTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PREDICTION_COLUMNS}"
        );
        sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(forecast.next_period_start)
            .bind(forecast.next_ovulation_date)
            .bind(forecast.fertile_window.start)
            .bind(forecast.fertile_window.end)
            .bind(forecast.last_updated)
            .fetch_one(&self.pool)
            .await
            .map(Prediction::from)
            .map_err(|e| StoreError::unavailable("insert_prediction", None, e))
    }

    async fn update_prediction(&self, id: Uuid, forecast: Forecast) -> StoreResult<Prediction> {
        let sql = format!(
            "UPDATE predictions SET next_period_start = $2, next_ovulation_date = $3, \
             fertile_window_start = $4, fertile_window_end = $5, last_updated = $6 \
             WHERE id = $1 RETURNING {PREDICTION_COLUMNS}"
        );
        sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(id)
            .bind(forecast.next_period_start)
            .bind(forecast.next_ovulation_date)
            .bind(forecast.fertile_window.start)
            .bind(forecast.fertile_window.end)
            .bind(forecast.last_updated)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("update_prediction", Some(id), e))?
            .map(Prediction::from)
            .ok_or_else(|| StoreError::not_found("prediction", id))
    }

    async fn delete_prediction(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("delete_prediction", Some(id), e))?;
        match result.rows_affected() {
            0 => Err(StoreError::not_found("prediction", id)),
            _ => Ok(()),
        }
    }

    async fn find_predictions(&self, user_id: Uuid) -> StoreResult<Vec<Prediction>> {
        let sql = format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE user_id = $1 \
             ORDER BY last_updated DESC"
        );
        let rows = sqlx::query_as::<_, PredictionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::unavailable("find_predictions", None, e))?;
        Ok(rows.into_iter().map(Prediction::from).collect())
    }
}
