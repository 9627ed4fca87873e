use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::repo_types::{AppointmentRow, AppointmentStatus};
use crate::{
    clock::{iso_date, wib_datetime},
    error::AppError,
    response::{empty_as_none, parsed_or_none, PageMeta, Pagination},
    users::repo_types::Role,
};

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_user_id: i64,
    pub doctor_user_id: i64,
    #[serde(deserialize_with = "wib_datetime::deserialize")]
    pub date: OffsetDateTime,
}

/// Patient reschedule: new doctor and date.
#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_user_id: i64,
    #[serde(deserialize_with = "wib_datetime::deserialize")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateRequest {
    pub doctor_user_id: i64,
    #[serde(deserialize_with = "wib_datetime::deserialize")]
    pub date: OffsetDateTime,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListAppointmentsQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default, deserialize_with = "iso_date::option::deserialize")]
    pub date: Option<Date>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "parsed_or_none")]
    pub appointment_id: Option<i64>,
}

impl ListAppointmentsQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(d.page),
            size: self.size.unwrap_or(d.size),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.pagination().validate()
    }
}

#[derive(Debug, Serialize)]
pub struct PartyView {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExaminationSummary {
    pub id: i64,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct AppointmentView {
    pub id: i64,
    #[serde(with = "wib_datetime")]
    pub date: OffsetDateTime,
    pub status: AppointmentStatus,
    pub patient: PartyView,
    pub doctor: PartyView,
    pub examination: Option<ExaminationSummary>,
}

impl From<AppointmentRow> for AppointmentView {
    fn from(r: AppointmentRow) -> Self {
        let examination = match (r.examination_id, r.examined_at) {
            (Some(id), Some(created_at)) => Some(ExaminationSummary {
                id,
                diagnosis: r.diagnosis.unwrap_or_default(),
                treatment: r.treatment.unwrap_or_default(),
                notes: r.notes.unwrap_or_default(),
                created_at,
            }),
            _ => None,
        };
        AppointmentView {
            id: r.id,
            date: r.date,
            status: r.status,
            patient: PartyView {
                user_id: r.patient_user_id,
                name: r.patient_name,
                email: r.patient_email,
                role: Role::Patient,
                specialization: None,
            },
            doctor: PartyView {
                user_id: r.doctor_user_id,
                name: r.doctor_name,
                email: r.doctor_email,
                role: Role::Doctor,
                specialization: Some(r.specialization.unwrap_or_default()),
            },
            examination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AppointmentPage {
    pub pagination: PageMeta,
    pub appointments: Vec<AppointmentView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn row() -> AppointmentRow {
        AppointmentRow {
            id: 12,
            date: datetime!(2025-10-20 03:00 UTC),
            status: AppointmentStatus::Approved,
            patient_user_id: 64,
            patient_name: "Budi Santoso".into(),
            patient_email: "budi.patient@example.com".into(),
            doctor_user_id: 65,
            doctor_name: "Anisa Putri".into(),
            doctor_email: "anisa.doctor@example.com".into(),
            specialization: Some("Pediatrics".into()),
            examination_id: None,
            diagnosis: None,
            treatment: None,
            notes: None,
            examined_at: None,
        }
    }

    #[test]
    fn create_accepts_naive_wib_date() {
        let req: CreateAppointmentRequest = serde_json::from_value(serde_json::json!({
            "patient_user_id": 64,
            "doctor_user_id": 65,
            "date": "2025-10-20T10:00"
        }))
        .unwrap();
        assert_eq!(req.date, datetime!(2025-10-20 03:00 UTC));
    }

    #[test]
    fn admin_update_treats_empty_status_as_absent() {
        let req: AdminUpdateRequest = serde_json::from_value(serde_json::json!({
            "doctor_user_id": 65,
            "date": "2025-10-20T10:00:00+07:00",
            "status": ""
        }))
        .unwrap();
        assert!(req.status.is_none());

        let req: AdminUpdateRequest = serde_json::from_value(serde_json::json!({
            "doctor_user_id": 65,
            "date": "2025-10-20T10:00:00+07:00",
            "status": "REJECTED"
        }))
        .unwrap();
        assert_eq!(req.status, Some(AppointmentStatus::Rejected));
    }

    #[test]
    fn status_must_be_known() {
        assert!(serde_json::from_value::<StatusUpdateRequest>(serde_json::json!({"status": "DONE"})).is_err());
    }

    #[test]
    fn list_query_parses_filters() {
        let q: ListAppointmentsQuery = serde_json::from_value(serde_json::json!({
            "date": "2025-10-20",
            "status": "",
            "appointment_id": "12"
        }))
        .unwrap();
        assert_eq!(q.date, Some(date!(2025-10-20)));
        assert!(q.status.is_none());
        assert_eq!(q.appointment_id, Some(12));
        assert_eq!(q.pagination().size, 10);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn list_view_nests_parties() {
        let json = serde_json::to_value(AppointmentView::from(row())).unwrap();
        assert_eq!(json["date"], "2025-10-20T10:00:00+07:00");
        assert_eq!(json["patient"]["role"], "PATIENT");
        assert_eq!(json["doctor"]["specialization"], "Pediatrics");
        assert!(json["patient"].get("specialization").is_none());
        assert!(json["examination"].is_null());
    }

    #[test]
    fn list_view_includes_examination() {
        let mut r = row();
        r.status = AppointmentStatus::Completed;
        r.examination_id = Some(3);
        r.diagnosis = Some("Flu".into());
        r.treatment = Some("Rest".into());
        r.notes = Some("Drink water".into());
        r.examined_at = Some(datetime!(2025-10-20 04:00 UTC));
        let json = serde_json::to_value(AppointmentView::from(r)).unwrap();
        assert_eq!(json["examination"]["diagnosis"], "Flu");
        assert_eq!(json["status"], "COMPLETED");
    }
}
