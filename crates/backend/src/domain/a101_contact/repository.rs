use chrono::Utc;
use contracts::domain::a101_contact::{Contact, ContactId, SocialLinks};
use contracts::domain::common::{AggregateId, BaseAggregate, EntityMetadata, Origin};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set};
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::data::db::LOOKUP_CHUNK_SIZE;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a101_contact")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    /// JSON-массив строк
    pub tags: String,
    pub instagram: Option<String>,
    pub telegram: Option<String>,
    pub whatsapp: Option<String>,
    pub vk: Option<String>,
    pub linkedin: Option<String>,
    pub origin: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Contact {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        Contact {
            base: BaseAggregate::with_metadata(
                ContactId(uuid),
                m.code,
                m.description,
                m.comment,
                Origin::from_db(&m.origin),
                metadata,
            ),
            email: m.email,
            phone: m.phone,
            position: m.position,
            company_name: m.company_name,
            notes: m.notes,
            tags: serde_json::from_str(&m.tags).unwrap_or_default(),
            social: SocialLinks {
                instagram: m.instagram,
                telegram: m.telegram,
                whatsapp: m.whatsapp,
                vk: m.vk,
                linkedin: m.linkedin,
            },
        }
    }
}

fn to_active(aggregate: &Contact) -> Result<ActiveModel, DbErr> {
    let tags = serde_json::to_string(&aggregate.tags).map_err(|e| DbErr::Custom(e.to_string()))?;
    Ok(ActiveModel {
        id: Set(aggregate.base.id.as_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        email: Set(aggregate.email.clone()),
        phone: Set(aggregate.phone.clone()),
        position: Set(aggregate.position.clone()),
        company_name: Set(aggregate.company_name.clone()),
        notes: Set(aggregate.notes.clone()),
        tags: Set(tags),
        instagram: Set(aggregate.social.instagram.clone()),
        telegram: Set(aggregate.social.telegram.clone()),
        whatsapp: Set(aggregate.social.whatsapp.clone()),
        vk: Set(aggregate.social.vk.clone()),
        linkedin: Set(aggregate.social.linkedin.clone()),
        origin: Set(aggregate.base.origin.as_str().to_string()),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

/// Id неудалённых контактов по email (ключи уже нормализованы)
pub async fn find_ids_by_emails<C: ConnectionTrait>(
    conn: &C,
    emails: &[String],
) -> anyhow::Result<HashMap<String, String>> {
    let mut found = HashMap::new();
    for chunk in emails.chunks(LOOKUP_CHUNK_SIZE) {
        let items = Entity::find()
            .filter(Column::IsDeleted.eq(false))
            .filter(Column::Email.is_in(chunk.iter().cloned()))
            .all(conn)
            .await?;
        found.extend(items.into_iter().filter_map(|m| m.email.map(|email| (email, m.id))));
    }
    Ok(found)
}

/// Id неудалённых контактов по телефону в E.164. При дублях берётся первый созданный.
pub async fn find_ids_by_phones<C: ConnectionTrait>(
    conn: &C,
    phones: &[String],
) -> anyhow::Result<HashMap<String, String>> {
    let mut found = HashMap::new();
    for chunk in phones.chunks(LOOKUP_CHUNK_SIZE) {
        let items = Entity::find()
            .filter(Column::IsDeleted.eq(false))
            .filter(Column::Phone.is_in(chunk.iter().cloned()))
            .order_by_asc(Column::CreatedAt)
            .all(conn)
            .await?;
        for m in items {
            if let Some(phone) = m.phone {
                found.entry(phone).or_insert(m.id);
            }
        }
    }
    Ok(found)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<Option<Contact>> {
    let result = Entity::find_by_id(id.to_string()).one(conn).await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, aggregate: &Contact) -> Result<(), DbErr> {
    to_active(aggregate)?.insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, aggregate: &Contact) -> Result<(), DbErr> {
    to_active(aggregate)?.update(conn).await?;
    Ok(())
}
