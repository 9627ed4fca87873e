use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{Gender, Patient, Role, User, UserProfileRow};
use crate::{
    clock::iso_date,
    error::AppError,
    response::{empty_as_none, PageMeta, Pagination},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let n = value.chars().count();
    if n < min || n > max {
        return Err(invalid(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), AppError> {
    check_len("name", name.trim(), 2, 100)
}

fn check_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(invalid("email must be a valid email"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 6 {
        return Err(invalid("password must be at least 6 characters"));
    }
    Ok(())
}

/// Request body for patient self-registration.
#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: PatientProfile,
}

#[derive(Debug, Deserialize)]
pub struct PatientProfile {
    pub address: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub gender: Gender,
    pub contact_number: String,
}

impl PatientProfile {
    fn validate(&self) -> Result<(), AppError> {
        check_len("address", &self.address, 1, 255)?;
        check_len("contact_number", &self.contact_number, 1, 15)
    }
}

impl RegisterPatientRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_password(&self.password)?;
        self.profile.validate()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: PatientProfile,
}

impl UpdatePatientRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        self.profile.validate()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialization: String,
    #[serde(default)]
    pub schedule: Option<String>,
}

impl CreateDoctorRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_password(&self.password)?;
        check_len("specialization", &self.specialization, 1, 100)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: String,
    pub email: String,
    pub specialization: String,
    #[serde(default)]
    pub schedule: Option<String>,
}

impl UpdateDoctorRequest {
    pub fn normalize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_name(&self.name)?;
        check_email(&self.email)?;
        check_len("specialization", &self.specialization, 1, 100)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub role: Option<Role>,
}

impl ListUsersQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(d.page),
            size: self.size.unwrap_or(d.size),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.pagination().validate()?;
        if let Some(search) = &self.search {
            check_len("search", search, 0, 100)?;
        }
        if self.role == Some(Role::Admin) {
            return Err(invalid("role must be one of [DOCTOR, PATIENT]"));
        }
        Ok(())
    }
}

/// Public view of a user with the profile fields of its role.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "opt_date")]
    pub birth_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

fn opt_date<S: serde::Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => iso_date::serialize(d, s),
        None => s.serialize_none(),
    }
}

impl From<UserProfileRow> for UserProfile {
    fn from(r: UserProfileRow) -> Self {
        let mut view = UserProfile {
            user_id: r.id,
            name: r.name,
            email: r.email,
            role: r.role,
            address: None,
            birth_date: None,
            gender: None,
            contact_number: None,
            specialization: None,
            schedule: None,
        };
        match r.role {
            Role::Patient => {
                view.address = r.address;
                view.birth_date = r.birth_date;
                view.gender = r.gender;
                view.contact_number = r.contact_number;
            }
            Role::Doctor => {
                view.specialization = r.specialization;
                view.schedule = r.schedule;
            }
            Role::Admin => {}
        }
        view
    }
}

impl From<(User, Patient)> for UserProfile {
    fn from((user, patient): (User, Patient)) -> Self {
        UserProfile {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            address: Some(patient.address),
            birth_date: Some(patient.birth_date),
            gender: Some(patient.gender),
            contact_number: Some(patient.contact_number),
            specialization: None,
            schedule: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub pagination: PageMeta,
    pub users: Vec<UserProfile>,
}
