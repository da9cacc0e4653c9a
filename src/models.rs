use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cycle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub period_length: i32,
    pub cycle_length: i32,
    pub symptoms: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cycle {
    pub fn is_completed(&self) -> bool {
        self.end_date.is_some()
    }
}

/// Cycle as submitted by a client, before defaults are filled in.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCycleRequest {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub period_length: Option<i32>,
    #[serde(default)]
    pub cycle_length: Option<i32>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// Fully resolved cycle handed to the store; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCycle {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub period_length: i32,
    pub cycle_length: i32,
    pub symptoms: Vec<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update. `end_date: Some(None)` clears the end date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CyclePatch {
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub period_length: Option<i32>,
    pub cycle_length: Option<i32>,
    pub symptoms: Option<Vec<String>>,
    pub notes: Option<String>,
    #[serde(skip)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CyclePatch {
    pub fn apply(&self, cycle: &mut Cycle) {
        if let Some(start_date) = self.start_date {
            cycle.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            cycle.end_date = end_date;
        }
        if let Some(period_length) = self.period_length {
            cycle.period_length = period_length;
        }
        if let Some(cycle_length) = self.cycle_length {
            cycle.cycle_length = cycle_length;
        }
        if let Some(symptoms) = &self.symptoms {
            cycle.symptoms = symptoms.clone();
        }
        if let Some(notes) = &self.notes {
            cycle.notes = notes.clone();
        }
        if let Some(updated_at) = self.updated_at {
            cycle.updated_at = updated_at;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Symptom {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub symptoms: Vec<String>,
    pub mood: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSymptomRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub symptoms: Vec<String>,
    pub mood: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymptomPatch {
    pub date: Option<NaiveDate>,
    pub symptoms: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub mood: Option<Option<String>>,
    pub notes: Option<String>,
}

impl SymptomPatch {
    pub fn apply(&self, symptom: &mut Symptom) {
        if let Some(date) = self.date {
            symptom.date = date;
        }
        if let Some(symptoms) = &self.symptoms {
            symptom.symptoms = symptoms.clone();
        }
        if let Some(mood) = &self.mood {
            symptom.mood = mood.clone();
        }
        if let Some(notes) = &self.notes {
            symptom.notes = notes.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub period_reminder: bool,
    pub ovulation_reminder: bool,
    pub reminder_days: i32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            period_reminder: true,
            ovulation_reminder: true,
            reminder_days: 2,
        }
    }
}

/// Per-user preferences. Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub average_cycle_length: i32,
    pub average_period_length: i32,
    pub last_period_start: Option<NaiveDate>,
    pub notifications: NotificationSettings,
    pub dark_mode: bool,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            average_cycle_length: 28,
            average_period_length: 5,
            last_period_start: None,
            notifications: NotificationSettings::default(),
            dark_mode: false,
            language: "vi".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub settings: Settings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub average_cycle_length: Option<i32>,
    pub average_period_length: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_period_start: Option<Option<NaiveDate>>,
    pub notifications: Option<NotificationSettings>,
    pub dark_mode: Option<bool>,
    pub language: Option<String>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(average_cycle_length) = self.average_cycle_length {
            settings.average_cycle_length = average_cycle_length;
        }
        if let Some(average_period_length) = self.average_period_length {
            settings.average_period_length = average_period_length;
        }
        if let Some(last_period_start) = self.last_period_start {
            settings.last_period_start = last_period_start;
        }
        if let Some(notifications) = &self.notifications {
            settings.notifications = notifications.clone();
        }
        if let Some(dark_mode) = self.dark_mode {
            settings.dark_mode = dark_mode;
        }
        if let Some(language) = &self.language {
            settings.language = language.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub average_cycle_length: i32,
    pub average_period_length: i32,
    pub total_cycles: usize,
    pub regularity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FertileWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FertileWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Freshly computed prediction values, not yet tied to a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub next_period_start: NaiveDate,
    pub next_ovulation_date: NaiveDate,
    pub fertile_window: FertileWindow,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub forecast: Forecast,
}

#[derive(Serialize)]
pub struct CycleSummary {
    pub cycle_day: i64,
    pub in_fertile_window: bool,
    pub period_expected_in_days: i64,
    pub start_date: NaiveDate,
    pub next_period_start: NaiveDate,
    pub next_ovulation_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataExport {
    pub cycles: Vec<Cycle>,
    pub settings: Settings,
    pub symptoms: Vec<Symptom>,
    pub predictions: Option<Prediction>,
    pub exported_at: DateTime<Utc>,
}

/// Import bundle. Accepts the export format; ids and owners in it are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataImport {
    #[serde(default)]
    pub cycles: Vec<NewCycleRequest>,
    #[serde(default)]
    pub symptoms: Vec<NewSymptomRequest>,
    #[serde(default)]
    pub settings: Option<SettingsPatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub cycles: usize,
    pub symptoms: usize,
    pub settings: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkingKind {
    Period,
    Ovulation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateMarking {
    pub kind: MarkingKind,
    pub marked: bool,
    pub dot_color: &'static str,
    pub custom_styles: CustomStyles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomStyles {
    pub container: ContainerStyle,
    pub text: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStyle {
    pub background_color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub color: &'static str,
    pub font_weight: &'static str,
}

// Distinguishes an explicit `null` (Some(None)) from an absent field (None).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
