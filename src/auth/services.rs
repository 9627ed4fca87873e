use sqlx::PgPool;
use tracing::{info, warn};

use super::{dto::AuthResponse, jwt::JwtKeys, password::verify_password};
use crate::{
    error::{AppError, AppResult},
    users::{
        dto::{RegisterPatientRequest, UserProfile},
        repo::find_profile,
        repo_types::User,
        services as user_services,
    },
};

const BAD_CREDENTIALS: &str = "Invalid email or password";

fn issue(keys: &JwtKeys, user: UserProfile) -> AppResult<AuthResponse> {
    let token = keys.sign(user.user_id, &user.email, user.role)?;
    Ok(AuthResponse { user, token })
}

pub async fn register_patient(
    db: &PgPool,
    keys: &JwtKeys,
    req: &RegisterPatientRequest,
) -> AppResult<AuthResponse> {
    let registered = user_services::register_patient(db, req).await?;
    issue(keys, UserProfile::from(registered))
}

pub async fn login(db: &PgPool, keys: &JwtKeys, email: &str, password: &str) -> AppResult<AuthResponse> {
    let user = match User::find_by_email(db, email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::Authentication(BAD_CREDENTIALS.into()));
    }

    let profile = find_profile(db, user.id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::Authentication(BAD_CREDENTIALS.into()))?;

    info!(user_id = user.id, role = %user.role, "user logged in");
    issue(keys, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::AppState, users::repo_types::Role};
    use axum::extract::FromRef;

    #[tokio::test]
    async fn issued_token_carries_profile_identity() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let profile = UserProfile {
            user_id: 64,
            name: "Budi Santoso".into(),
            email: "budi.patient@example.com".into(),
            role: Role::Patient,
            address: None,
            birth_date: None,
            gender: None,
            contact_number: None,
            specialization: None,
            schedule: None,
        };
        let res = issue(&keys, profile).unwrap();
        let claims = keys.verify(&res.token).unwrap();
        assert_eq!(claims.sub, 64);
        assert_eq!(claims.role, Role::Patient);
        assert_eq!(claims.email, "budi.patient@example.com");
    }
}
