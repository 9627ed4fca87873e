use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Result of the visit; one per appointment.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Examination {
    pub id: i64,
    pub appointment_id: i64,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
