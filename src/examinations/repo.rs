use anyhow::Context;
use sqlx::{Executor, Postgres};

use super::{dto::CreateExaminationRequest, repo_types::Examination};

impl Examination {
    pub async fn exists_for_appointment<'e, E>(db: E, appointment_id: i64) -> anyhow::Result<bool>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM examinations WHERE appointment_id = $1)",
        )
        .bind(appointment_id)
        .fetch_one(db)
        .await
        .context("check examination")?;
        Ok(exists)
    }

    pub async fn create<'e, E>(db: E, req: &CreateExaminationRequest) -> anyhow::Result<Examination>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Examination>(
            r#"
            INSERT INTO examinations (appointment_id, diagnosis, treatment, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, appointment_id, diagnosis, treatment, notes, created_at
            "#,
        )
        .bind(req.appointment_id)
        .bind(&req.diagnosis)
        .bind(&req.treatment)
        .bind(&req.notes)
        .fetch_one(db)
        .await
        .context("insert examination")?;
        Ok(row)
    }
}
