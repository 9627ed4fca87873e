use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    dto::{
        CreateDoctorRequest, ListUsersQuery, RegisterPatientRequest, UpdateDoctorRequest,
        UpdatePatientRequest, UserPage, UserProfile,
    },
    repo::{find_profile, list_profiles},
    repo_types::{Doctor, NewDoctor, NewPatient, Patient, Role, User},
};
use crate::{
    auth::{
        extractors::AuthUser,
        password::hash_password,
        policy::{authorize, Action, Subject},
    },
    config::AdminSeed,
    error::{AppError, AppResult},
};

/// Keeps `user` only if it exists with `role`; otherwise NotFound("<what> not found").
pub fn expect_role(user: Option<User>, role: Role, what: &str) -> AppResult<User> {
    match user {
        Some(u) if u.role == role => Ok(u),
        _ => Err(AppError::not_found(format!("{} not found", what))),
    }
}

/// Conflict unless `email` is free or already belongs to `owner`.
fn ensure_email_available(existing: Option<User>, owner: Option<i64>) -> AppResult<()> {
    match existing {
        Some(u) if Some(u.id) != owner => Err(AppError::conflict("Email already in use")),
        _ => Ok(()),
    }
}

pub async fn register_patient(db: &PgPool, req: &RegisterPatientRequest) -> AppResult<(User, Patient)> {
    let mut tx = db.begin().await.context("begin tx")?;

    ensure_email_available(User::find_by_email(&mut *tx, &req.email).await?, None)?;

    let hash = hash_password(&req.password)?;
    let user = User::create(&mut *tx, &req.name, &req.email, &hash, Role::Patient).await?;
    let patient = Patient::create(
        &mut *tx,
        user.id,
        &NewPatient {
            address: &req.profile.address,
            birth_date: req.profile.birth_date,
            gender: req.profile.gender,
            contact_number: &req.profile.contact_number,
        },
    )
    .await?;

    tx.commit().await.context("commit tx")?;
    info!(user_id = user.id, "patient registered");
    Ok((user, patient))
}

pub async fn create_doctor(db: &PgPool, req: &CreateDoctorRequest) -> AppResult<UserProfile> {
    let mut tx = db.begin().await.context("begin tx")?;

    ensure_email_available(User::find_by_email(&mut *tx, &req.email).await?, None)?;

    let hash = hash_password(&req.password)?;
    let user = User::create(&mut *tx, &req.name, &req.email, &hash, Role::Doctor).await?;
    let doctor = Doctor::create(
        &mut *tx,
        user.id,
        &NewDoctor {
            specialization: &req.specialization,
            schedule: req.schedule.as_deref(),
        },
    )
    .await?;

    tx.commit().await.context("commit tx")?;
    info!(user_id = user.id, "doctor created");

    Ok(UserProfile {
        user_id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        address: None,
        birth_date: None,
        gender: None,
        contact_number: None,
        specialization: Some(doctor.specialization),
        schedule: doctor.schedule,
    })
}

pub async fn update_doctor(
    db: &PgPool,
    actor: &AuthUser,
    user_id: i64,
    req: &UpdateDoctorRequest,
) -> AppResult<()> {
    authorize(actor, Action::UpdateDoctor, Subject::User(user_id))?;

    let mut tx = db.begin().await.context("begin tx")?;
    expect_role(User::find_by_id(&mut *tx, user_id).await?, Role::Doctor, "Doctor")?;
    ensure_email_available(User::find_by_email(&mut *tx, &req.email).await?, Some(user_id))?;

    User::update_identity(&mut *tx, user_id, &req.name, &req.email).await?;
    Doctor::update(
        &mut *tx,
        user_id,
        &NewDoctor {
            specialization: &req.specialization,
            schedule: req.schedule.as_deref(),
        },
    )
    .await?;

    tx.commit().await.context("commit tx")?;
    info!(user_id, "doctor updated");
    Ok(())
}

pub async fn update_patient(
    db: &PgPool,
    actor: &AuthUser,
    user_id: i64,
    req: &UpdatePatientRequest,
) -> AppResult<()> {
    authorize(actor, Action::UpdatePatient, Subject::User(user_id))?;

    let mut tx = db.begin().await.context("begin tx")?;
    expect_role(User::find_by_id(&mut *tx, user_id).await?, Role::Patient, "Patient")?;
    ensure_email_available(User::find_by_email(&mut *tx, &req.email).await?, Some(user_id))?;

    User::update_identity(&mut *tx, user_id, &req.name, &req.email).await?;
    Patient::update(
        &mut *tx,
        user_id,
        &NewPatient {
            address: &req.profile.address,
            birth_date: req.profile.birth_date,
            gender: req.profile.gender,
            contact_number: &req.profile.contact_number,
        },
    )
    .await?;

    tx.commit().await.context("commit tx")?;
    info!(user_id, "patient updated");
    Ok(())
}

async fn delete_with_role(
    db: &PgPool,
    actor: &AuthUser,
    user_id: i64,
    action: Action,
    role: Role,
    what: &str,
) -> AppResult<()> {
    authorize(actor, action, Subject::User(user_id))?;

    let mut tx = db.begin().await.context("begin tx")?;
    expect_role(User::find_by_id(&mut *tx, user_id).await?, role, what)?;
    User::delete(&mut *tx, user_id).await?;
    tx.commit().await.context("commit tx")?;

    info!(user_id, %role, by = actor.user_id, "user deleted");
    Ok(())
}

pub async fn delete_doctor(db: &PgPool, actor: &AuthUser, user_id: i64) -> AppResult<()> {
    delete_with_role(db, actor, user_id, Action::DeleteDoctor, Role::Doctor, "Doctor").await
}

pub async fn delete_patient(db: &PgPool, actor: &AuthUser, user_id: i64) -> AppResult<()> {
    delete_with_role(db, actor, user_id, Action::DeletePatient, Role::Patient, "Patient").await
}

/// Paginated non-admin users; `forced_role` pins the role filter (doctor directory).
pub async fn list_users(
    db: &PgPool,
    query: &ListUsersQuery,
    forced_role: Option<Role>,
) -> AppResult<UserPage> {
    query.validate()?;
    let page = query.pagination();
    let role = forced_role.or(query.role);

    let (rows, total) = list_profiles(
        db,
        role,
        query.search.as_deref(),
        page.limit(),
        page.offset(),
    )
    .await?;

    Ok(UserPage {
        pagination: page.meta(total),
        users: rows.into_iter().map(UserProfile::from).collect(),
    })
}

pub async fn get_user(db: &PgPool, actor: &AuthUser, user_id: i64) -> AppResult<UserProfile> {
    authorize(actor, Action::ViewUser, Subject::User(user_id))?;
    find_profile(db, user_id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Inserts the bootstrap admin if no user owns its email yet.
pub async fn ensure_admin(db: &PgPool, seed: &AdminSeed) -> anyhow::Result<()> {
    let email = seed.email.trim().to_lowercase();
    if let Some(existing) = User::find_by_email(db, &email).await? {
        if existing.role != Role::Admin {
            warn!(email = %email, role = %existing.role, "admin seed email belongs to a non-admin user");
        }
        return Ok(());
    }
    let hash = hash_password(&seed.password)?;
    let admin = User::create(db, "Admin", &email, &hash, Role::Admin).await?;
    info!(user_id = admin.id, email = %email, "admin user seeded");
    Ok(())
}
