use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;

use super::{dto::CreateExaminationRequest, repo_types::Examination};
use crate::{
    appointments::{
        repo_types::{Appointment, AppointmentStatus},
        services::subject_of,
        status::Transition,
    },
    auth::{
        extractors::AuthUser,
        policy::{authorize, Action},
    },
    clock::is_future,
    error::{AppError, AppResult},
};

/// Every precondition for recording a result, in the order they are reported.
/// Returns the status the appointment moves to.
pub fn check_record(
    actor: &AuthUser,
    appointment: &Appointment,
    already_recorded: bool,
    now: OffsetDateTime,
) -> AppResult<AppointmentStatus> {
    let next = appointment.status.apply(Transition::RecordExamination)?;
    if is_future(appointment.date, now) {
        return Err(AppError::client(
            "Examination can only be added after the patient has met the doctor",
        ));
    }
    authorize(actor, Action::RecordExamination, subject_of(appointment))?;
    if already_recorded {
        return Err(AppError::conflict(
            "Examination for this appointment already exists",
        ));
    }
    Ok(next)
}

pub async fn create(
    db: &PgPool,
    actor: &AuthUser,
    req: &CreateExaminationRequest,
    now: OffsetDateTime,
) -> AppResult<Examination> {
    let mut tx = db.begin().await.context("begin tx")?;

    let appointment = Appointment::find_by_id_for_update(&mut *tx, req.appointment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;
    let recorded = Examination::exists_for_appointment(&mut *tx, appointment.id).await?;
    let next = check_record(actor, &appointment, recorded, now)?;

    // a concurrent insert surfaces here as a unique violation (409)
    let examination = Examination::create(&mut *tx, req).await?;
    Appointment::set_status(&mut *tx, appointment.id, next).await?;

    tx.commit().await.context("commit tx")?;
    info!(
        examination_id = examination.id,
        appointment_id = appointment.id,
        doctor_user_id = actor.user_id,
        "examination recorded"
    );
    Ok(examination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;
    use time::macros::datetime;
    use time::Duration;

    fn doctor(user_id: i64) -> AuthUser {
        AuthUser {
            user_id,
            email: format!("doctor{}@example.com", user_id),
            role: Role::Doctor,
        }
    }

    fn appointment(status: AppointmentStatus, date: OffsetDateTime) -> Appointment {
        Appointment {
            id: 12,
            patient_user_id: 64,
            doctor_user_id: 65,
            date,
            status,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn now() -> OffsetDateTime {
        datetime!(2025-10-21 12:00 +7)
    }

    fn past() -> OffsetDateTime {
        now() - Duration::hours(3)
    }

    #[test]
    fn status_is_checked_first() {
        let appt = appointment(AppointmentStatus::Scheduled, now() + Duration::days(1));
        let err = check_record(&doctor(99), &appt, true, now()).unwrap_err();
        assert!(matches!(err, AppError::Client(_)));
        assert_eq!(err.to_string(), "Examination can only be added to APPROVED appointments");
    }

    #[test]
    fn visit_must_have_happened() {
        let appt = appointment(AppointmentStatus::Approved, now() + Duration::minutes(1));
        let err = check_record(&doctor(65), &appt, false, now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Examination can only be added after the patient has met the doctor"
        );
        let appt = appointment(AppointmentStatus::Approved, now());
        assert!(check_record(&doctor(65), &appt, false, now()).is_ok());
    }

    #[test]
    fn only_the_assigned_doctor_records() {
        let appt = appointment(AppointmentStatus::Approved, past());
        let err = check_record(&doctor(66), &appt, false, now()).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let admin = AuthUser {
            user_id: 1,
            email: "admin@example.com".into(),
            role: Role::Admin,
        };
        assert!(matches!(
            check_record(&admin, &appt, false, now()),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn existing_result_is_conflict() {
        let appt = appointment(AppointmentStatus::Approved, past());
        let err = check_record(&doctor(65), &appt, true, now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn booking_to_completion() {
        let booked_at = datetime!(2025-10-20 10:00 +7);
        let tomorrow = booked_at + Duration::days(1);
        let mut appt = appointment(AppointmentStatus::Scheduled, tomorrow);

        crate::appointments::services::ensure_future(appt.date, booked_at).unwrap();
        appt.status = appt
            .status
            .apply(Transition::Review(AppointmentStatus::Approved))
            .unwrap();

        let too_early = check_record(&doctor(65), &appt, false, booked_at);
        assert!(matches!(too_early, Err(AppError::Client(_))));

        let after_visit = tomorrow + Duration::hours(1);
        appt.status = check_record(&doctor(65), &appt, false, after_visit).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);

        let again = check_record(&doctor(65), &appt, true, after_visit).unwrap_err();
        assert!(matches!(again, AppError::Client(_)));
        assert_eq!(appt.status, AppointmentStatus::Completed);
    }
}
