use anyhow::Context;
use chrono::Utc;
use contracts::domain::a103_pipeline::{stage_name_key, Pipeline, PipelineStage};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, Set, SqlErr};
use uuid::Uuid;

pub mod pipeline_entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "a103_pipeline")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub name: String,
        pub is_default: bool,
        pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod stage_entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "a103_pipeline_stage")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub pipeline_id: String,
        pub name: String,
        /// `stage_name_key(name)`, по нему уникальный индекс в пределах воронки
        pub name_key: String,
        pub sort_order: i32,
        pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<stage_entity::Model> for PipelineStage {
    fn from(m: stage_entity::Model) -> Self {
        PipelineStage {
            id: m.id,
            pipeline_id: m.pipeline_id,
            name: m.name,
            order: m.sort_order,
        }
    }
}

/// Все воронки со своими этапами (этапы по порядку)
pub async fn list_with_stages<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Pipeline>> {
    let pipelines = pipeline_entity::Entity::find()
        .order_by_desc(pipeline_entity::Column::IsDefault)
        .order_by_asc(pipeline_entity::Column::Name)
        .all(conn)
        .await?;
    let stages = stage_entity::Entity::find()
        .order_by_asc(stage_entity::Column::SortOrder)
        .all(conn)
        .await?;

    Ok(pipelines
        .into_iter()
        .map(|p| Pipeline {
            stages: stages
                .iter()
                .filter(|s| s.pipeline_id == p.id)
                .cloned()
                .map(Into::into)
                .collect(),
            id: p.id,
            name: p.name,
            is_default: p.is_default,
        })
        .collect())
}

async fn find_stage_by_name<C: ConnectionTrait>(
    conn: &C,
    pipeline_id: &str,
    name: &str,
) -> anyhow::Result<Option<PipelineStage>> {
    let stage = stage_entity::Entity::find()
        .filter(stage_entity::Column::PipelineId.eq(pipeline_id))
        .filter(stage_entity::Column::NameKey.eq(stage_name_key(name)))
        .one(conn)
        .await?;
    Ok(stage.map(Into::into))
}

/// Создать этап, если в воронке ещё нет этапа с таким ключом названия.
/// Возвращает существующий либо созданный этап.
pub async fn create_stage_if_absent<C: ConnectionTrait>(
    conn: &C,
    pipeline_id: &str,
    name: &str,
    order: i32,
) -> anyhow::Result<PipelineStage> {
    if let Some(existing) = find_stage_by_name(conn, pipeline_id, name).await? {
        return Ok(existing);
    }

    let active = stage_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        pipeline_id: Set(pipeline_id.to_string()),
        name: Set(name.to_string()),
        name_key: Set(stage_name_key(name)),
        sort_order: Set(order),
        created_at: Set(Some(Utc::now())),
    };
    match active.insert(conn).await {
        Ok(model) => Ok(model.into()),
        // Параллельный импорт успел создать такой же этап
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_stage_by_name(conn, pipeline_id, name)
                .await?
                .with_context(|| format!("Stage '{}' vanished after conflict", name))
        }
        Err(err) => Err(err).with_context(|| format!("Failed to create stage '{}'", name)),
    }
}
