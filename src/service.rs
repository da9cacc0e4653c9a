//! Store-facing operations. Every call takes the user explicitly; analytics are
//! recomputed through [`CycleService::recompute_derived`] after each cycle or
//! settings mutation.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::analytics::{self, MarkedDates};
use crate::models::{
    Cycle, CyclePatch, CycleStats, CycleSummary, DataExport, DataImport, ImportSummary, NewCycle,
    NewCycleRequest, NewSymptom, NewSymptomRequest, Prediction, Settings, SettingsPatch,
    SettingsRecord, Symptom, SymptomPatch,
};
use crate::store::{RecordStore, SortOrder, StoreResult, SymptomFilter};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct CycleService {
    store: Arc<dyn RecordStore>,
    clock: Clock,
}

impl CycleService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    // ---- cycles ----

    pub async fn add_cycle(&self, user_id: Uuid, request: NewCycleRequest) -> StoreResult<Cycle> {
        let settings = self.settings(user_id).await?;
        let cycle = self.insert_cycle(user_id, request, &settings).await?;
        tracing::info!(%user_id, cycle_id = %cycle.id, "cycle added");
        self.recompute_derived(user_id).await?;
        Ok(cycle)
    }

    async fn insert_cycle(
        &self,
        user_id: Uuid,
        request: NewCycleRequest,
        settings: &Settings,
    ) -> StoreResult<Cycle> {
        let now = self.now();
        self.store
            .insert_cycle(NewCycle {
                user_id,
                start_date: request.start_date,
                end_date: request.end_date,
                period_length: request
                    .period_length
                    .unwrap_or(settings.average_period_length),
                cycle_length: request.cycle_length.unwrap_or(settings.average_cycle_length),
                symptoms: request.symptoms,
                notes: request.notes,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn update_cycle(&self, cycle_id: Uuid, mut patch: CyclePatch) -> StoreResult<Cycle> {
        patch.updated_at = Some(self.now());
        let cycle = self.store.patch_cycle(cycle_id, &patch).await?;
        self.recompute_derived(cycle.user_id).await?;
        Ok(cycle)
    }

    pub async fn delete_cycle(&self, cycle_id: Uuid) -> StoreResult<Cycle> {
        let cycle = self.store.delete_cycle(cycle_id).await?;
        tracing::info!(user_id = %cycle.user_id, %cycle_id, "cycle deleted");
        self.recompute_derived(cycle.user_id).await?;
        Ok(cycle)
    }

    /// All cycles of the user, most recent start first.
    pub async fn cycles(&self, user_id: Uuid) -> StoreResult<Vec<Cycle>> {
        self.store.find_cycles(user_id, SortOrder::Desc).await
    }

    pub async fn current_cycle(&self, user_id: Uuid) -> StoreResult<Option<Cycle>> {
        let cycles = self.cycles(user_id).await?;
        Ok(analytics::resolve_current_cycle(&cycles, self.today()).cloned())
    }

    pub async fn cycle_stats(&self, user_id: Uuid) -> StoreResult<CycleStats> {
        let cycles = self.cycles(user_id).await?;
        let settings = self.settings(user_id).await?;
        Ok(analytics::compute_stats(&cycles, &settings))
    }

    pub async fn cycle_summary(&self, user_id: Uuid) -> StoreResult<Option<CycleSummary>> {
        let cycles = self.cycles(user_id).await?;
        let settings = self.settings(user_id).await?;
        let today = self.today();

        let stats = analytics::compute_stats(&cycles, &settings);
        let current = analytics::resolve_current_cycle(&cycles, today);
        let summary = current.zip(analytics::compute_predictions(current, &stats, self.now()));
        Ok(summary.map(|(cycle, forecast)| analytics::summarize(cycle, &forecast, today)))
    }

    // ---- predictions ----

    /// Recompute stats and predictions from a fresh snapshot and write them back.
    ///
    /// Upserts the single prediction record of the user (the first one when
    /// duplicates exist), or deletes the user's predictions when no current cycle
    /// resolves. Returns the stored prediction, if any.
    pub async fn recompute_derived(&self, user_id: Uuid) -> StoreResult<Option<Prediction>> {
        let cycles = self.cycles(user_id).await?;
        let settings = self.settings(user_id).await?;

        let stats = analytics::compute_stats(&cycles, &settings);
        let current = analytics::resolve_current_cycle(&cycles, self.today());
        let existing = self.store.find_predictions(user_id).await?;

        let Some(forecast) = analytics::compute_predictions(current, &stats, self.now()) else {
            for stale in &existing {
                self.store.delete_prediction(stale.id).await?;
            }
            if !existing.is_empty() {
                tracing::info!(%user_id, "no current cycle, predictions cleared");
            }
            return Ok(None);
        };

        let prediction = match existing.first() {
            Some(found) => self.store.update_prediction(found.id, forecast).await?,
            None => self.store.insert_prediction(user_id, forecast).await?,
        };
        tracing::debug!(
            %user_id,
            next_period_start = %prediction.forecast.next_period_start,
            regularity = stats.regularity,
            "predictions recomputed"
        );
        Ok(Some(prediction))
    }

    pub async fn predictions(&self, user_id: Uuid) -> StoreResult<Option<Prediction>> {
        Ok(self.store.find_predictions(user_id).await?.into_iter().next())
    }

    pub async fn marked_dates(&self, user_id: Uuid) -> StoreResult<MarkedDates> {
        let cycles = self.cycles(user_id).await?;
        let prediction = self.predictions(user_id).await?;
        Ok(analytics::compute_marked_dates(
            &cycles,
            prediction.as_ref().map(|p| &p.forecast),
        ))
    }

    // ---- settings ----

    async fn settings_record(&self, user_id: Uuid) -> StoreResult<Option<SettingsRecord>> {
        Ok(self.store.find_settings(user_id).await?.into_iter().next())
    }

    /// Stored settings, or the defaults when the user never saved any.
    pub async fn settings(&self, user_id: Uuid) -> StoreResult<Settings> {
        Ok(self
            .settings_record(user_id)
            .await?
            .map(|record| record.settings)
            .unwrap_or_default())
    }

    /// Merge the patch into the stored settings, creating the record from the
    /// defaults on first use.
    pub async fn update_settings(
        &self,
        user_id: Uuid,
        patch: SettingsPatch,
    ) -> StoreResult<SettingsRecord> {
        let record = self.store_settings(user_id, patch).await?;
        self.recompute_derived(user_id).await?;
        Ok(record)
    }

    async fn store_settings(
        &self,
        user_id: Uuid,
        patch: SettingsPatch,
    ) -> StoreResult<SettingsRecord> {
        let now = self.now();
        match self.settings_record(user_id).await? {
            Some(mut record) => {
                patch.apply(&mut record.settings);
                self.store.update_settings(record.id, record.settings, now).await
            }
            None => {
                let mut settings = Settings::default();
                patch.apply(&mut settings);
                tracing::info!(%user_id, "creating settings");
                self.store.insert_settings(user_id, settings, now).await
            }
        }
    }

    // ---- symptoms ----

    pub async fn add_symptom(
        &self,
        user_id: Uuid,
        request: NewSymptomRequest,
    ) -> StoreResult<Symptom> {
        self.store
            .insert_symptom(NewSymptom {
                user_id,
                date: request.date,
                symptoms: dedup_tags(request.symptoms),
                mood: request.mood,
                notes: request.notes,
                created_at: self.now(),
            })
            .await
    }

    pub async fn update_symptom(
        &self,
        symptom_id: Uuid,
        mut patch: SymptomPatch,
    ) -> StoreResult<Symptom> {
        patch.symptoms = patch.symptoms.map(dedup_tags);
        self.store.patch_symptom(symptom_id, &patch).await
    }

    pub async fn delete_symptom(&self, symptom_id: Uuid) -> StoreResult<Symptom> {
        self.store.delete_symptom(symptom_id).await
    }

    /// All symptom records of the user, most recent date first.
    pub async fn symptoms(&self, user_id: Uuid) -> StoreResult<Vec<Symptom>> {
        self.symptoms_matching(user_id, None).await
    }

    /// Symptom records of the user, restricted to one day when `date` is set.
    pub async fn symptoms_matching(
        &self,
        user_id: Uuid,
        date: Option<NaiveDate>,
    ) -> StoreResult<Vec<Symptom>> {
        let filter = SymptomFilter { user_id, date };
        self.store.find_symptoms(filter, SortOrder::Desc).await
    }

    pub async fn symptoms_on(&self, user_id: Uuid, date: NaiveDate) -> StoreResult<Option<Symptom>> {
        let filter = SymptomFilter {
            user_id,
            date: Some(date),
        };
        Ok(self
            .store
            .find_symptoms(filter, SortOrder::Desc)
            .await?
            .into_iter()
            .next())
    }

    // ---- data management ----

    pub async fn export_data(&self, user_id: Uuid) -> StoreResult<DataExport> {
        Ok(DataExport {
            cycles: self.cycles(user_id).await?,
            settings: self.settings(user_id).await?,
            symptoms: self.symptoms(user_id).await?,
            predictions: self.predictions(user_id).await?,
            exported_at: self.now(),
        })
    }

    /// Re-create the bundle's records under `user_id` with fresh ids, then
    /// recompute once. Bundle settings are stored first so cycles without
    /// lengths take their defaults from them.
    pub async fn import_data(&self, user_id: Uuid, bundle: DataImport) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary {
            cycles: 0,
            symptoms: 0,
            settings: false,
        };
        if let Some(patch) = bundle.settings {
            self.store_settings(user_id, patch).await?;
            summary.settings = true;
        }
        let settings = self.settings(user_id).await?;

        for cycle in bundle.cycles {
            self.insert_cycle(user_id, cycle, &settings).await?;
            summary.cycles += 1;
        }
        for symptom in bundle.symptoms {
            self.add_symptom(user_id, symptom).await?;
            summary.symptoms += 1;
        }

        self.recompute_derived(user_id).await?;
        tracing::info!(
            %user_id,
            cycles = summary.cycles,
            symptoms = summary.symptoms,
            "data imported"
        );
        Ok(summary)
    }

    /// Delete every record the user owns.
    pub async fn clear_all_data(&self, user_id: Uuid) -> StoreResult<()> {
        for cycle in self.cycles(user_id).await? {
            self.store.delete_cycle(cycle.id).await?;
        }
        for symptom in self.symptoms(user_id).await? {
            self.store.delete_symptom(symptom.id).await?;
        }
        for record in self.store.find_settings(user_id).await? {
            self.store.delete_settings(record.id).await?;
        }
        for prediction in self.store.find_predictions(user_id).await? {
            self.store.delete_prediction(prediction.id).await?;
        }
        tracing::info!(%user_id, "all data cleared");
        Ok(())
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
