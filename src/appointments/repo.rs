use anyhow::Context;
use sqlx::{Executor, PgPool, Postgres};
use time::OffsetDateTime;

use super::repo_types::{Appointment, AppointmentRow, AppointmentStatus, ListFilter};

const COLUMNS: &str = "id, patient_user_id, doctor_user_id, date, status, created_at, updated_at";

const LIST_SELECT: &str = r#"
    SELECT a.id, a.date, a.status,
           p.id AS patient_user_id, p.name AS patient_name, p.email AS patient_email,
           d.id AS doctor_user_id, d.name AS doctor_name, d.email AS doctor_email,
           dp.specialization,
           e.id AS examination_id, e.diagnosis, e.treatment, e.notes,
           e.created_at AS examined_at
      FROM appointments a
      JOIN users p ON p.id = a.patient_user_id
      JOIN users d ON d.id = a.doctor_user_id
      LEFT JOIN doctors dp ON dp.user_id = d.id
      LEFT JOIN examinations e ON e.appointment_id = a.id
"#;

// $3..$4 is the half-open date window.
const LIST_FILTER: &str = r#"
     WHERE ($1::appointment_status IS NULL OR a.status = $1)
       AND ($2::timestamptz IS NULL OR a.date >= $2)
       AND ($3::timestamptz IS NULL OR a.date < $3)
       AND ($4::bigint IS NULL OR a.patient_user_id = $4)
       AND ($5::bigint IS NULL OR a.doctor_user_id = $5)
       AND ($6::bigint IS NULL OR a.id = $6)
"#;

fn select_for_update() -> String {
    format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE")
}

impl Appointment {
    /// New appointments always start out SCHEDULED.
    pub async fn create<'e, E>(
        db: E,
        patient_user_id: i64,
        doctor_user_id: i64,
        date: OffsetDateTime,
    ) -> anyhow::Result<Appointment>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            INSERT INTO appointments (patient_user_id, doctor_user_id, date, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(patient_user_id)
        .bind(doctor_user_id)
        .bind(date)
        .bind(AppointmentStatus::Scheduled)
        .fetch_one(db)
        .await
        .context("insert appointment")?;
        Ok(row)
    }

    /// Reads the row and locks it until the surrounding transaction ends.
    pub async fn find_by_id_for_update<'e, E>(db: E, id: i64) -> anyhow::Result<Option<Appointment>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Appointment>(&select_for_update())
            .bind(id)
            .fetch_optional(db)
            .await
            .context("lock appointment")?;
        Ok(row)
    }

    pub async fn update<'e, E>(
        db: E,
        id: i64,
        patient_user_id: i64,
        doctor_user_id: i64,
        date: OffsetDateTime,
        status: AppointmentStatus,
    ) -> anyhow::Result<Appointment>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            UPDATE appointments
               SET patient_user_id = $2, doctor_user_id = $3, date = $4, status = $5,
                   updated_at = now()
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patient_user_id)
        .bind(doctor_user_id)
        .bind(date)
        .bind(status)
        .fetch_one(db)
        .await
        .context("update appointment")?;
        Ok(row)
    }

    pub async fn set_status<'e, E>(db: E, id: i64, status: AppointmentStatus) -> anyhow::Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE appointments SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(db)
            .await
            .context("set appointment status")?;
        Ok(())
    }

    pub async fn delete<'e, E>(db: E, id: i64) -> anyhow::Result<u64>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let res = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete appointment")?;
        Ok(res.rows_affected())
    }
}

/// One page of appointments ordered by date, plus the total matching count.
pub async fn list(
    db: &PgPool,
    filter: &ListFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<AppointmentRow>, i64)> {
    let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
        "{LIST_SELECT} {LIST_FILTER} ORDER BY a.date ASC, a.id ASC LIMIT $7 OFFSET $8"
    ))
    .bind(filter.status)
    .bind(filter.from)
    .bind(filter.until)
    .bind(filter.patient_user_id)
    .bind(filter.doctor_user_id)
    .bind(filter.appointment_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list appointments")?;

    let (total,): (i64,) =
        sqlx::query_as(&format!("SELECT COUNT(*) FROM appointments a {LIST_FILTER}"))
            .bind(filter.status)
            .bind(filter.from)
            .bind(filter.until)
            .bind(filter.patient_user_id)
            .bind(filter.doctor_user_id)
            .bind(filter.appointment_id)
            .fetch_one(db)
            .await
            .context("count appointments")?;

    Ok((rows, total))
}
