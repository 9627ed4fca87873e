use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::clock::wib_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Scheduled,
    Approved,
    Rejected,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Approved => "APPROVED",
            AppointmentStatus::Rejected => "REJECTED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub patient_user_id: i64,
    pub doctor_user_id: i64,
    #[serde(with = "wib_datetime")]
    pub date: OffsetDateTime,
    pub status: AppointmentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// List row: appointment joined with both parties and the examination, if any.
#[derive(Debug, Clone, FromRow)]
pub struct AppointmentRow {
    pub id: i64,
    pub date: OffsetDateTime,
    pub status: AppointmentStatus,
    pub patient_user_id: i64,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_user_id: i64,
    pub doctor_name: String,
    pub doctor_email: String,
    pub specialization: Option<String>,
    pub examination_id: Option<i64>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub examined_at: Option<OffsetDateTime>,
}

/// Filters for one list query; `None` means unfiltered.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<AppointmentStatus>,
    pub from: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
    pub patient_user_id: Option<i64>,
    pub doctor_user_id: Option<i64>,
    pub appointment_id: Option<i64>,
}
