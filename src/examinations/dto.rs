use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateExaminationRequest {
    pub appointment_id: i64,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
}

impl CreateExaminationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("diagnosis", &self.diagnosis),
            ("treatment", &self.treatment),
            ("notes", &self.notes),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}
