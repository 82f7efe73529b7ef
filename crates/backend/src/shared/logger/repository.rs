use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "system_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub timestamp: String,
    pub source: String,
    pub category: String,
    pub message: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Добавить запись в лог в фоне. Без runtime или без БД запись пропускается.
pub fn log_event_internal(source: &str, category: &str, message: &str) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    let Ok(conn) = get_connection() else {
        tracing::debug!("system_log skipped, database is not initialized: {}", message);
        return;
    };
    let source = source.to_string();
    let category = category.to_string();
    let message = message.to_string();

    handle.spawn(async move {
        if let Err(e) = log_event(conn, &source, &category, &message).await {
            tracing::warn!("Failed to log event: {}", e);
        }
    });
}

/// Добавить запись в лог
pub async fn log_event<C: ConnectionTrait>(
    conn: &C,
    source: &str,
    category: &str,
    message: &str,
) -> anyhow::Result<()> {
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

    let active = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        timestamp: Set(now),
        source: Set(source.to_string()),
        category: Set(category.to_string()),
        message: Set(message.to_string()),
    };

    active.insert(conn).await?;
    Ok(())
}
