use serde::{Deserialize, Serialize};

use crate::{error::AppError, users::dto::UserProfile};

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !crate::users::dto::is_valid_email(&self.email) {
            return Err(AppError::Validation("email must be a valid email".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }
        Ok(())
    }
}

/// Response returned after login or registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_email_is_normalized() {
        let mut req: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": " Siti.Patient@Example.com",
            "password": "siti123"
        }))
        .unwrap();
        req.normalize();
        assert_eq!(req.email, "siti.patient@example.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn login_requires_password() {
        let req = LoginRequest {
            email: "siti.patient@example.com".into(),
            password: String::new(),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
