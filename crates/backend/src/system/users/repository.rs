use anyhow::{Context, Result};
use contracts::system::users::User;
use sea_orm::{ConnectionTrait, DatabaseBackend, QueryResult, Statement};

fn user_from_row(row: &QueryResult) -> Result<User> {
    Ok(User {
        id: row.try_get("", "id")?,
        username: row.try_get("", "username")?,
        email: row.try_get("", "email")?,
        full_name: row.try_get("", "full_name")?,
        is_active: row.try_get::<i32>("", "is_active")? != 0,
    })
}

/// Активные пользователи, на которых можно назначать сделки
pub async fn list_active<C: ConnectionTrait>(conn: &C) -> Result<Vec<User>> {
    let rows = conn
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT id, username, email, full_name, is_active
             FROM sys_users WHERE is_active = 1 ORDER BY username"
                .to_string(),
        ))
        .await
        .context("Failed to list users")?;

    rows.iter().map(user_from_row).collect()
}

/// Добавить пользователя (справочник ведёт основное приложение; здесь для начального заполнения)
pub async fn insert<C: ConnectionTrait>(conn: &C, user: &User) -> Result<()> {
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO sys_users (id, username, email, full_name, is_active) VALUES (?, ?, ?, ?, ?)",
        [
            user.id.clone().into(),
            user.username.clone().into(),
            user.email.clone().into(),
            user.full_name.clone().into(),
            (if user.is_active { 1 } else { 0 }).into(),
        ],
    ))
    .await
    .context("Failed to insert user")?;

    Ok(())
}
