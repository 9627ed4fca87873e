use anyhow::Context;
use sqlx::{Executor, PgPool, Postgres};

use super::repo_types::{Doctor, NewDoctor, NewPatient, Patient, Role, User, UserProfileRow};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.name, u.email, u.role,
           p.address, p.birth_date, p.gender, p.contact_number,
           d.specialization, d.schedule
      FROM users u
      LEFT JOIN patients p ON p.user_id = u.id
      LEFT JOIN doctors d ON d.user_id = u.id
"#;

// Admins are never listed; $1 narrows to one role, $2 is an ILIKE pattern.
const LIST_FILTER: &str = r#"
     WHERE u.role IN ('DOCTOR', 'PATIENT')
       AND ($1::user_role IS NULL OR u.role = $1)
       AND ($2::text IS NULL OR u.name ILIKE $2 ESCAPE '\')
"#;

impl User {
    /// Find a user by email.
    pub async fn find_by_email<'e, E>(db: E, email: &str) -> anyhow::Result<Option<User>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id<'e, E>(db: E, id: i64) -> anyhow::Result<Option<User>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create<'e, E>(
        db: E,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> anyhow::Result<User>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    pub async fn update_identity<'e, E>(db: E, id: i64, name: &str, email: &str) -> anyhow::Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET name = $2, email = $3, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(email)
            .execute(db)
            .await
            .context("update user")?;
        Ok(())
    }

    /// Deletes the user; profile rows and appointments go with it (ON DELETE CASCADE).
    pub async fn delete<'e, E>(db: E, id: i64) -> anyhow::Result<u64>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected())
    }
}

impl Patient {
    pub async fn create<'e, E>(db: E, user_id: i64, p: &NewPatient<'_>) -> anyhow::Result<Patient>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (user_id, address, birth_date, gender, contact_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, address, birth_date, gender, contact_number
            "#,
        )
        .bind(user_id)
        .bind(p.address)
        .bind(p.birth_date)
        .bind(p.gender)
        .bind(p.contact_number)
        .fetch_one(db)
        .await
        .context("insert patient")?;
        Ok(patient)
    }

    pub async fn update<'e, E>(db: E, user_id: i64, p: &NewPatient<'_>) -> anyhow::Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE patients
               SET address = $2, birth_date = $3, gender = $4, contact_number = $5
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(p.address)
        .bind(p.birth_date)
        .bind(p.gender)
        .bind(p.contact_number)
        .execute(db)
        .await
        .context("update patient")?;
        Ok(())
    }
}

impl Doctor {
    pub async fn create<'e, E>(db: E, user_id: i64, d: &NewDoctor<'_>) -> anyhow::Result<Doctor>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let doctor = sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors (user_id, specialization, schedule)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, specialization, schedule
            "#,
        )
        .bind(user_id)
        .bind(d.specialization)
        .bind(d.schedule)
        .fetch_one(db)
        .await
        .context("insert doctor")?;
        Ok(doctor)
    }

    pub async fn update<'e, E>(db: E, user_id: i64, d: &NewDoctor<'_>) -> anyhow::Result<()>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE doctors SET specialization = $2, schedule = $3 WHERE user_id = $1")
            .bind(user_id)
            .bind(d.specialization)
            .bind(d.schedule)
            .execute(db)
            .await
            .context("update doctor")?;
        Ok(())
    }
}

pub async fn find_profile(db: &PgPool, user_id: i64) -> anyhow::Result<Option<UserProfileRow>> {
    let row = sqlx::query_as::<_, UserProfileRow>(&format!("{PROFILE_SELECT} WHERE u.id = $1"))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find user profile")?;
    Ok(row)
}

/// `%needle%` with LIKE wildcards in `needle` matched literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// One page of non-admin users plus the total matching count.
pub async fn list_profiles(
    db: &PgPool,
    role: Option<Role>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<UserProfileRow>, i64)> {
    let pattern = search.map(contains_pattern);

    let rows = sqlx::query_as::<_, UserProfileRow>(&format!(
        "{PROFILE_SELECT} {LIST_FILTER} ORDER BY u.id ASC LIMIT $3 OFFSET $4"
    ))
    .bind(role)
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list users")?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users u {LIST_FILTER}"))
        .bind(role)
        .bind(pattern.as_deref())
        .fetch_one(db)
        .await
        .context("count users")?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_literal() {
        assert_eq!(contains_pattern("anisa"), "%anisa%");
        assert_eq!(contains_pattern("_"), "%\\_%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
        assert!(LIST_FILTER.contains("ESCAPE '\\'"));
    }
}
