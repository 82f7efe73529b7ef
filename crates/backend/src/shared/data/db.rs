use anyhow::Context;
use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Сколько ключей передаётся в один `IN (...)`. SQLite ограничивает число параметров запроса.
pub const LOOKUP_CHUNK_SIZE: usize = 500;

/// Таблицы и индексы, нужные CRM. Все операторы идемпотентны.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS a101_contact (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL,
        comment TEXT,
        email TEXT,
        phone TEXT,
        position TEXT,
        company_name TEXT,
        notes TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        instagram TEXT,
        telegram TEXT,
        whatsapp TEXT,
        vk TEXT,
        linkedin TEXT,
        origin TEXT NOT NULL DEFAULT 'manual',
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_a101_contact_email ON a101_contact (email) WHERE email IS NOT NULL AND is_deleted = 0;",
    "CREATE INDEX IF NOT EXISTS idx_a101_contact_phone ON a101_contact (phone);",
    r#"
    CREATE TABLE IF NOT EXISTS a103_pipeline (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0,
        created_at TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS a103_pipeline_stage (
        id TEXT PRIMARY KEY NOT NULL,
        pipeline_id TEXT NOT NULL REFERENCES a103_pipeline (id),
        name TEXT NOT NULL,
        name_key TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT
    );
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_a103_stage_name ON a103_pipeline_stage (pipeline_id, name_key);",
    r#"
    CREATE TABLE IF NOT EXISTS a102_deal (
        id TEXT PRIMARY KEY NOT NULL,
        code TEXT NOT NULL,
        description TEXT NOT NULL,
        comment TEXT,
        amount REAL NOT NULL DEFAULT 0,
        budget REAL,
        pipeline_id TEXT NOT NULL,
        stage_id TEXT NOT NULL,
        assigned_to_id TEXT,
        contact_id TEXT,
        expected_close_at TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        origin TEXT NOT NULL DEFAULT 'manual',
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        updated_at TEXT,
        version INTEGER NOT NULL DEFAULT 0
    );
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_a102_deal_code ON a102_deal (code);",
    r#"
    CREATE TABLE IF NOT EXISTS sys_users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT,
        full_name TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sys_audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sys_audit_log_entity ON sys_audit_log (entity_type, entity_id);",
    r#"
    CREATE TABLE IF NOT EXISTS system_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        source TEXT NOT NULL,
        category TEXT NOT NULL,
        message TEXT NOT NULL
    );
    "#,
];

/// Построить URL подключения SQLite для файла (создаёт папку при необходимости)
pub fn sqlite_url(db_file: &Path) -> anyhow::Result<String> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    Ok(format!("sqlite://{}{}?mode=rwc", prefix, normalized))
}

/// Открыть файл БД и создать недостающие таблицы
pub async fn connect(db_file: &Path) -> anyhow::Result<DatabaseConnection> {
    let db_url = sqlite_url(db_file)?;
    let conn = Database::connect(&db_url)
        .await
        .with_context(|| format!("Cannot open database {}", db_file.display()))?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}

pub async fn bootstrap_schema<C: ConnectionTrait>(conn: &C) -> anyhow::Result<()> {
    for sql in SCHEMA {
        conn.execute(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
            .await
            .with_context(|| format!("Schema bootstrap failed on: {}", sql.trim()))?;
    }
    tracing::info!("Database schema is ready ({} statements)", SCHEMA.len());
    Ok(())
}

pub async fn initialize_database(db_path: &Path) -> anyhow::Result<()> {
    let conn = connect(db_path).await?;
    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> anyhow::Result<&'static DatabaseConnection> {
    DB_CONN
        .get()
        .ok_or_else(|| anyhow::anyhow!("Database connection has not been initialized"))
}
