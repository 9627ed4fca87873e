use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;

use super::{
    dto::{
        AdminUpdateRequest, AppointmentPage, AppointmentView, CreateAppointmentRequest,
        ListAppointmentsQuery, UpdateAppointmentRequest,
    },
    repo,
    repo_types::{Appointment, AppointmentStatus, ListFilter},
    status::Transition,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{authorize, Action, Subject},
    },
    clock::{day_bounds, is_future},
    error::{AppError, AppResult},
    users::{
        repo_types::{Role, User},
        services::expect_role,
    },
};

pub fn subject_of(appointment: &Appointment) -> Subject {
    Subject::Appointment {
        patient_user_id: appointment.patient_user_id,
        doctor_user_id: appointment.doctor_user_id,
    }
}

pub fn ensure_future(date: OffsetDateTime, now: OffsetDateTime) -> AppResult<()> {
    if !is_future(date, now) {
        return Err(AppError::client("Date must be greater than now (WIB)"));
    }
    Ok(())
}

fn found(appointment: Option<Appointment>) -> AppResult<Appointment> {
    appointment.ok_or_else(|| AppError::not_found("Appointment not found"))
}

/// Ownership, then lifecycle: the order a patient edit is judged in.
pub fn check_reschedule(actor: &AuthUser, appointment: &Appointment) -> AppResult<AppointmentStatus> {
    authorize(actor, Action::RescheduleAppointment, subject_of(appointment))?;
    appointment.status.apply(Transition::Reschedule)
}

pub fn check_cancel(actor: &AuthUser, appointment: &Appointment) -> AppResult<()> {
    authorize(actor, Action::CancelAppointment, subject_of(appointment))?;
    appointment.status.apply(Transition::Cancel)?;
    Ok(())
}

/// Narrows a list to the actor's own appointments unless it is an admin.
pub fn scope_filter(actor: &AuthUser, query: &ListAppointmentsQuery) -> ListFilter {
    let (from, until) = match query.date.map(day_bounds) {
        Some((from, until)) => (Some(from), Some(until)),
        None => (None, None),
    };
    ListFilter {
        status: query.status,
        from,
        until,
        patient_user_id: (actor.role == Role::Patient).then_some(actor.user_id),
        doctor_user_id: (actor.role == Role::Doctor).then_some(actor.user_id),
        appointment_id: query.appointment_id,
    }
}

pub async fn create(
    db: &PgPool,
    actor: &AuthUser,
    req: &CreateAppointmentRequest,
    now: OffsetDateTime,
) -> AppResult<Appointment> {
    authorize(
        actor,
        Action::CreateAppointment,
        Subject::Appointment {
            patient_user_id: req.patient_user_id,
            doctor_user_id: req.doctor_user_id,
        },
    )?;

    expect_role(User::find_by_id(db, req.patient_user_id).await?, Role::Patient, "Patient")?;
    expect_role(User::find_by_id(db, req.doctor_user_id).await?, Role::Doctor, "Doctor")?;
    ensure_future(req.date, now)?;

    let appointment = Appointment::create(db, req.patient_user_id, req.doctor_user_id, req.date).await?;
    info!(
        appointment_id = appointment.id,
        patient_user_id = appointment.patient_user_id,
        doctor_user_id = appointment.doctor_user_id,
        "appointment created"
    );
    Ok(appointment)
}

pub async fn update_by_patient(
    db: &PgPool,
    actor: &AuthUser,
    id: i64,
    req: &UpdateAppointmentRequest,
    now: OffsetDateTime,
) -> AppResult<Appointment> {
    let mut tx = db.begin().await.context("begin tx")?;

    let current = found(Appointment::find_by_id_for_update(&mut *tx, id).await?)?;
    let status = check_reschedule(actor, &current)?;
    expect_role(User::find_by_id(&mut *tx, req.doctor_user_id).await?, Role::Doctor, "Doctor")?;
    ensure_future(req.date, now)?;

    let updated =
        Appointment::update(&mut *tx, id, actor.user_id, req.doctor_user_id, req.date, status).await?;
    tx.commit().await.context("commit tx")?;

    info!(appointment_id = id, "appointment rescheduled");
    Ok(updated)
}

pub async fn update_by_admin(
    db: &PgPool,
    actor: &AuthUser,
    id: i64,
    req: &AdminUpdateRequest,
    now: OffsetDateTime,
) -> AppResult<Appointment> {
    let mut tx = db.begin().await.context("begin tx")?;

    let current = found(Appointment::find_by_id_for_update(&mut *tx, id).await?)?;
    authorize(actor, Action::OverrideAppointment, subject_of(&current))?;
    expect_role(User::find_by_id(&mut *tx, req.doctor_user_id).await?, Role::Doctor, "Doctor")?;
    ensure_future(req.date, now)?;
    let status = current.status.apply(Transition::Override(req.status))?;

    let updated = Appointment::update(
        &mut *tx,
        id,
        current.patient_user_id,
        req.doctor_user_id,
        req.date,
        status,
    )
    .await?;
    tx.commit().await.context("commit tx")?;

    info!(appointment_id = id, from = %current.status, to = %status, "appointment overridden");
    Ok(updated)
}

pub async fn update_status(
    db: &PgPool,
    actor: &AuthUser,
    id: i64,
    status: AppointmentStatus,
) -> AppResult<()> {
    let mut tx = db.begin().await.context("begin tx")?;

    let current = found(Appointment::find_by_id_for_update(&mut *tx, id).await?)?;
    authorize(actor, Action::ReviewAppointment, subject_of(&current))?;
    let next = current.status.apply(Transition::Review(status))?;
    Appointment::set_status(&mut *tx, id, next).await?;

    tx.commit().await.context("commit tx")?;
    info!(appointment_id = id, from = %current.status, to = %next, "appointment status set");
    Ok(())
}

pub async fn delete(db: &PgPool, actor: &AuthUser, id: i64) -> AppResult<()> {
    let mut tx = db.begin().await.context("begin tx")?;

    let current = found(Appointment::find_by_id_for_update(&mut *tx, id).await?)?;
    check_cancel(actor, &current)?;
    Appointment::delete(&mut *tx, id).await?;

    tx.commit().await.context("commit tx")?;
    info!(appointment_id = id, by = actor.user_id, "appointment deleted");
    Ok(())
}

pub async fn list(
    db: &PgPool,
    actor: &AuthUser,
    query: &ListAppointmentsQuery,
) -> AppResult<AppointmentPage> {
    authorize(actor, Action::ListAppointments, Subject::Unscoped)?;
    query.validate()?;
    let page = query.pagination();
    let filter = scope_filter(actor, query);

    let (rows, total) = repo::list(db, &filter, page.limit(), page.offset()).await?;

    Ok(AppointmentPage {
        pagination: page.meta(total),
        appointments: rows.into_iter().map(AppointmentView::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use time::Duration;

    fn actor(user_id: i64, role: Role) -> AuthUser {
        AuthUser {
            user_id,
            email: format!("user{}@example.com", user_id),
            role,
        }
    }

    fn appointment(patient: i64, doctor: i64, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: 1,
            patient_user_id: patient,
            doctor_user_id: doctor,
            date: datetime!(2025-10-21 09:00 +7),
            status,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn query() -> ListAppointmentsQuery {
        ListAppointmentsQuery {
            page: None,
            size: None,
            date: None,
            status: None,
            appointment_id: None,
        }
    }

    #[test]
    fn future_check_is_strict() {
        let now = datetime!(2025-10-20 10:00 +7);
        let err = ensure_future(now, now).unwrap_err();
        assert_eq!(err.to_string(), "Date must be greater than now (WIB)");
        assert!(ensure_future(now + Duration::minutes(1), now).is_ok());
    }

    #[test]
    fn other_patient_cannot_reschedule() {
        let appt = appointment(71, 65, AppointmentStatus::Scheduled);
        let err = check_reschedule(&actor(70, Role::Patient), &appt).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn reschedule_requires_scheduled() {
        let appt = appointment(64, 65, AppointmentStatus::Approved);
        let err = check_reschedule(&actor(64, Role::Patient), &appt).unwrap_err();
        assert!(matches!(err, AppError::Client(_)));
        let appt = appointment(64, 65, AppointmentStatus::Scheduled);
        assert_eq!(
            check_reschedule(&actor(64, Role::Patient), &appt).unwrap(),
            AppointmentStatus::Scheduled
        );
    }

    #[test]
    fn admin_cancel_still_needs_scheduled() {
        let admin = actor(1, Role::Admin);
        assert!(check_cancel(&admin, &appointment(64, 65, AppointmentStatus::Scheduled)).is_ok());
        let err = check_cancel(&admin, &appointment(64, 65, AppointmentStatus::Completed)).unwrap_err();
        assert_eq!(err.to_string(), "Only SCHEDULED appointments can be cancelled");
    }

    #[test]
    fn list_is_scoped_by_role() {
        let f = scope_filter(&actor(64, Role::Patient), &query());
        assert_eq!(f.patient_user_id, Some(64));
        assert_eq!(f.doctor_user_id, None);

        let f = scope_filter(&actor(65, Role::Doctor), &query());
        assert_eq!(f.doctor_user_id, Some(65));
        assert_eq!(f.patient_user_id, None);

        let f = scope_filter(&actor(1, Role::Admin), &query());
        assert!(f.patient_user_id.is_none() && f.doctor_user_id.is_none());
    }

    #[test]
    fn list_date_filter_is_a_wib_day() {
        let mut q = query();
        q.date = Some(date!(2025-10-20));
        q.status = Some(AppointmentStatus::Approved);
        let f = scope_filter(&actor(1, Role::Admin), &q);
        assert_eq!(f.from, Some(datetime!(2025-10-20 00:00 +7)));
        assert_eq!(f.until, Some(datetime!(2025-10-21 00:00 +7)));
        assert_eq!(f.status, Some(AppointmentStatus::Approved));
    }

    #[tokio::test]
    async fn patient_cannot_book_for_someone_else() {
        let state = crate::state::AppState::fake();
        let req = CreateAppointmentRequest {
            patient_user_id: 66,
            doctor_user_id: 65,
            date: datetime!(2030-01-01 09:00 +7),
        };
        let err = create(&state.db, &actor(64, Role::Patient), &req, datetime!(2025-10-20 10:00 +7))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let state = crate::state::AppState::fake();
        let mut q = query();
        q.size = Some(101);
        let err = list(&state.db, &actor(1, Role::Admin), &q).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
