use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sys_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub actor: String,
    pub action: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Добавить запись аудита
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    entity_type: &str,
    entity_id: &str,
    actor: &str,
    action: &str,
) -> Result<()> {
    let active = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id.to_string()),
        actor: Set(actor.to_string()),
        action: Set(action.to_string()),
        created_at: Set(Utc::now().to_rfc3339()),
    };
    active
        .insert(conn)
        .await
        .with_context(|| format!("Failed to audit {} {}", entity_type, entity_id))?;
    Ok(())
}

/// История записи (по возрастанию времени)
#[cfg(test)]
pub async fn list_for_entity<C: ConnectionTrait>(
    conn: &C,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Model>> {
    use sea_orm::QueryOrder;

    let items = Entity::find()
        .filter(Column::EntityType.eq(entity_type))
        .filter(Column::EntityId.eq(entity_id))
        .order_by_asc(Column::Id)
        .all(conn)
        .await?;
    Ok(items)
}

/// Записи аудита с указанным действием
#[cfg(test)]
pub async fn list_by_action<C: ConnectionTrait>(conn: &C, action: &str) -> Result<Vec<Model>> {
    use sea_orm::QueryOrder;

    let items = Entity::find()
        .filter(Column::Action.eq(action))
        .order_by_asc(Column::Id)
        .all(conn)
        .await?;
    Ok(items)
}
