//! Хранилище, с которым работает импорт.

use async_trait::async_trait;
use contracts::domain::a101_contact::Contact;
use contracts::domain::a102_deal::Deal;
use contracts::domain::a103_pipeline::{Pipeline, PipelineStage};
use contracts::system::users::User;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{a101_contact, a102_deal, a103_pipeline};
use crate::system::{audit, users};

/// Ошибка записи одной строки. Не прерывает импорт.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("Запись с таким ключом уже существует: {0}")]
    Conflict(String),
    #[error("Запись не найдена: {0}")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DbErr> for WriteFailure {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return WriteFailure::Conflict(detail);
        }
        match err {
            DbErr::RecordNotUpdated => WriteFailure::NotFound("record was not updated".into()),
            DbErr::RecordNotFound(detail) => WriteFailure::NotFound(detail),
            other => WriteFailure::Other(other.into()),
        }
    }
}

#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn find_contacts_by_emails(&self, emails: &[String]) -> anyhow::Result<HashMap<String, String>>;
    async fn find_contacts_by_phones(&self, phones: &[String]) -> anyhow::Result<HashMap<String, String>>;
    async fn find_deals_by_numbers(&self, numbers: &[String]) -> anyhow::Result<HashMap<String, String>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    async fn list_pipelines(&self) -> anyhow::Result<Vec<Pipeline>>;

    async fn get_contact(&self, id: &str) -> anyhow::Result<Option<Contact>>;
    async fn get_deal(&self, id: &str) -> anyhow::Result<Option<Deal>>;

    async fn create_stage_if_absent(
        &self,
        pipeline_id: &str,
        name: &str,
        order: i32,
    ) -> anyhow::Result<PipelineStage>;

    async fn insert_contact(&self, contact: &Contact) -> Result<(), WriteFailure>;
    async fn update_contact(&self, contact: &Contact) -> Result<(), WriteFailure>;
    async fn insert_deal(&self, deal: &Deal) -> Result<(), WriteFailure>;
    async fn update_deal(&self, deal: &Deal) -> Result<(), WriteFailure>;

    async fn append_audit(&self, entity_type: &str, entity_id: &str, actor: &str) -> anyhow::Result<()>;
}

/// Хранилище поверх SQLite через sea-orm
#[derive(Clone)]
pub struct SeaOrmStore {
    conn: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ImportStore for SeaOrmStore {
    async fn find_contacts_by_emails(&self, emails: &[String]) -> anyhow::Result<HashMap<String, String>> {
        a101_contact::repository::find_ids_by_emails(&self.conn, emails).await
    }

    async fn find_contacts_by_phones(&self, phones: &[String]) -> anyhow::Result<HashMap<String, String>> {
        a101_contact::repository::find_ids_by_phones(&self.conn, phones).await
    }

    async fn find_deals_by_numbers(&self, numbers: &[String]) -> anyhow::Result<HashMap<String, String>> {
        a102_deal::repository::find_ids_by_numbers(&self.conn, numbers).await
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        users::repository::list_active(&self.conn).await
    }

    async fn list_pipelines(&self) -> anyhow::Result<Vec<Pipeline>> {
        a103_pipeline::repository::list_with_stages(&self.conn).await
    }

    async fn get_contact(&self, id: &str) -> anyhow::Result<Option<Contact>> {
        a101_contact::repository::get_by_id(&self.conn, id).await
    }

    async fn get_deal(&self, id: &str) -> anyhow::Result<Option<Deal>> {
        a102_deal::repository::get_by_id(&self.conn, id).await
    }

    async fn create_stage_if_absent(
        &self,
        pipeline_id: &str,
        name: &str,
        order: i32,
    ) -> anyhow::Result<PipelineStage> {
        a103_pipeline::repository::create_stage_if_absent(&self.conn, pipeline_id, name, order).await
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<(), WriteFailure> {
        Ok(a101_contact::repository::insert(&self.conn, contact).await?)
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), WriteFailure> {
        Ok(a101_contact::repository::update(&self.conn, contact).await?)
    }

    async fn insert_deal(&self, deal: &Deal) -> Result<(), WriteFailure> {
        Ok(a102_deal::repository::insert(&self.conn, deal).await?)
    }

    async fn update_deal(&self, deal: &Deal) -> Result<(), WriteFailure> {
        Ok(a102_deal::repository::update(&self.conn, deal).await?)
    }

    async fn append_audit(&self, entity_type: &str, entity_id: &str, actor: &str) -> anyhow::Result<()> {
        audit::repository::append(&self.conn, entity_type, entity_id, actor, audit::ACTION_IMPORTED).await
    }
}
