use thiserror::Error;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable during {operation}{}", entity_suffix(.entity_id))]
    Unavailable {
        operation: &'static str,
        entity_id: Option<Uuid>,
        #[source]
        source: BoxError,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

impl StoreError {
    pub fn unavailable(
        operation: &'static str,
        entity_id: Option<Uuid>,
        source: impl Into<BoxError>,
    ) -> Self {
        let err = StoreError::Unavailable {
            operation,
            entity_id,
            source: source.into(),
        };
        tracing::error!("❌ {}", err);
        err
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }
}

fn entity_suffix(entity_id: &Option<Uuid>) -> String {
    entity_id.map(|id| format!(" (id {id})")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
