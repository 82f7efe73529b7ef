use chrono::{NaiveDate, Utc};
use contracts::domain::a102_deal::{Deal, DealId};
use contracts::domain::common::{AggregateId, BaseAggregate, EntityMetadata, Origin};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::data::db::LOOKUP_CHUNK_SIZE;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a102_deal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Номер сделки
    pub code: String,
    /// Название сделки
    pub description: String,
    pub comment: Option<String>,
    pub amount: f64,
    pub budget: Option<f64>,
    pub pipeline_id: String,
    pub stage_id: String,
    pub assigned_to_id: Option<String>,
    pub contact_id: Option<String>,
    pub expected_close_at: Option<NaiveDate>,
    pub tags: String,
    pub origin: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Deal {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Deal {
            base: BaseAggregate::with_metadata(
                DealId(uuid),
                m.code,
                m.description,
                m.comment,
                Origin::from_db(&m.origin),
                metadata,
            ),
            amount: m.amount,
            budget: m.budget,
            pipeline_id: m.pipeline_id,
            stage_id: m.stage_id,
            assigned_to_id: m.assigned_to_id,
            contact_id: m.contact_id,
            expected_close_at: m.expected_close_at,
            tags: serde_json::from_str(&m.tags).unwrap_or_default(),
        }
    }
}

fn to_active(aggregate: &Deal) -> Result<ActiveModel, DbErr> {
    let tags = serde_json::to_string(&aggregate.tags).map_err(|e| DbErr::Custom(e.to_string()))?;
    Ok(ActiveModel {
        id: Set(aggregate.base.id.as_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        amount: Set(aggregate.amount),
        budget: Set(aggregate.budget),
        pipeline_id: Set(aggregate.pipeline_id.clone()),
        stage_id: Set(aggregate.stage_id.clone()),
        assigned_to_id: Set(aggregate.assigned_to_id.clone()),
        contact_id: Set(aggregate.contact_id.clone()),
        expected_close_at: Set(aggregate.expected_close_at),
        tags: Set(tags),
        origin: Set(aggregate.base.origin.as_str().to_string()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

/// Id сделок по номерам
pub async fn find_ids_by_numbers<C: ConnectionTrait>(
    conn: &C,
    numbers: &[String],
) -> anyhow::Result<HashMap<String, String>> {
    let mut found = HashMap::new();
    for chunk in numbers.chunks(LOOKUP_CHUNK_SIZE) {
        let items = Entity::find()
            .filter(Column::Code.is_in(chunk.iter().cloned()))
            .all(conn)
            .await?;
        found.extend(items.into_iter().map(|m| (m.code, m.id)));
    }
    Ok(found)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<Option<Deal>> {
    let result = Entity::find_by_id(id.to_string()).one(conn).await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, aggregate: &Deal) -> Result<(), DbErr> {
    to_active(aggregate)?.insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, aggregate: &Deal) -> Result<(), DbErr> {
    to_active(aggregate)?.update(conn).await?;
    Ok(())
}
