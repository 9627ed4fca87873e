use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::clock::iso_date;

/// Role of a user, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Patient => "PATIENT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub address: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub gender: Gender,
    pub contact_number: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Doctor {
    pub id: i64,
    pub user_id: i64,
    pub specialization: String,
    pub schedule: Option<String>,
}

/// A user joined with whichever profile row matches its role.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfileRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub address: Option<String>,
    pub birth_date: Option<Date>,
    pub gender: Option<Gender>,
    pub contact_number: Option<String>,
    pub specialization: Option<String>,
    pub schedule: Option<String>,
}

pub struct NewPatient<'a> {
    pub address: &'a str,
    pub birth_date: Date,
    pub gender: Gender,
    pub contact_number: &'a str,
}

pub struct NewDoctor<'a> {
    pub specialization: &'a str,
    pub schedule: Option<&'a str>,
}
