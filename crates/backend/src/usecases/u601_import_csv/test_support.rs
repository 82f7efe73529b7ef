//! Хранилище в памяти для тестов конвейера импорта.

use async_trait::async_trait;
use contracts::domain::a101_contact::Contact;
use contracts::domain::a102_deal::Deal;
use contracts::domain::a103_pipeline::{Pipeline, PipelineStage};
use contracts::system::users::User;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::store::{ImportStore, WriteFailure};

#[derive(Default)]
struct State {
    contacts: Vec<Contact>,
    deals: Vec<Deal>,
    pipelines: Vec<Pipeline>,
    users: Vec<User>,
    audit: Vec<(String, String, String)>,
    /// Ключи (email, телефон или номер сделки), запись которых падает
    failing_keys: HashSet<String>,
    lookups_fail: bool,
    stages_fail: bool,
    audit_fails: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(self, pipeline: Pipeline) -> Self {
        self.state.lock().unwrap().pipelines.push(pipeline);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn with_contact(self, contact: Contact) -> Self {
        self.state.lock().unwrap().contacts.push(contact);
        self
    }

    pub fn with_deal(self, deal: Deal) -> Self {
        self.state.lock().unwrap().deals.push(deal);
        self
    }

    pub fn fail_writes_for(&self, key: &str) {
        self.state.lock().unwrap().failing_keys.insert(key.to_string());
    }

    pub fn fail_lookups(&self) {
        self.state.lock().unwrap().lookups_fail = true;
    }

    pub fn fail_stage_creation(&self) {
        self.state.lock().unwrap().stages_fail = true;
    }

    pub fn fail_audit(&self) {
        self.state.lock().unwrap().audit_fails = true;
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state.lock().unwrap().contacts.clone()
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.state.lock().unwrap().deals.clone()
    }

    pub fn pipelines(&self) -> Vec<Pipeline> {
        self.state.lock().unwrap().pipelines.clone()
    }

    pub fn audit(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().audit.clone()
    }

    fn check_lookups(&self) -> anyhow::Result<()> {
        if self.state.lock().unwrap().lookups_fail {
            anyhow::bail!("store is offline");
        }
        Ok(())
    }
}

fn contact_conflict(state: &State, contact: &Contact) -> Result<(), WriteFailure> {
    let id = contact.to_string_id();
    for key in [&contact.email, &contact.phone].into_iter().flatten() {
        if state.failing_keys.contains(key) {
            return Err(WriteFailure::Other(anyhow::anyhow!("injected failure for {}", key)));
        }
    }
    if let Some(email) = &contact.email {
        if state
            .contacts
            .iter()
            .any(|c| c.email.as_ref() == Some(email) && c.to_string_id() != id)
        {
            return Err(WriteFailure::Conflict(email.clone()));
        }
    }
    Ok(())
}

fn deal_conflict(state: &State, deal: &Deal) -> Result<(), WriteFailure> {
    if state.failing_keys.contains(deal.number()) {
        return Err(WriteFailure::Other(anyhow::anyhow!("injected failure for {}", deal.number())));
    }
    let id = deal.to_string_id();
    if state
        .deals
        .iter()
        .any(|d| d.number() == deal.number() && d.to_string_id() != id)
    {
        return Err(WriteFailure::Conflict(deal.number().to_string()));
    }
    Ok(())
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn find_contacts_by_emails(&self, emails: &[String]) -> anyhow::Result<HashMap<String, String>> {
        self.check_lookups()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .filter_map(|c| c.email.clone().map(|e| (e, c.to_string_id())))
            .filter(|(e, _)| emails.contains(e))
            .collect())
    }

    async fn find_contacts_by_phones(&self, phones: &[String]) -> anyhow::Result<HashMap<String, String>> {
        self.check_lookups()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .filter_map(|c| c.phone.clone().map(|p| (p, c.to_string_id())))
            .filter(|(p, _)| phones.contains(p))
            .collect())
    }

    async fn find_deals_by_numbers(&self, numbers: &[String]) -> anyhow::Result<HashMap<String, String>> {
        self.check_lookups()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .deals
            .iter()
            .filter(|d| numbers.iter().any(|n| n == d.number()))
            .map(|d| (d.number().to_string(), d.to_string_id()))
            .collect())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.check_lookups()?;
        Ok(self.state.lock().unwrap().users.clone())
    }

    async fn list_pipelines(&self) -> anyhow::Result<Vec<Pipeline>> {
        self.check_lookups()?;
        Ok(self.state.lock().unwrap().pipelines.clone())
    }

    async fn get_contact(&self, id: &str) -> anyhow::Result<Option<Contact>> {
        let state = self.state.lock().unwrap();
        Ok(state.contacts.iter().find(|c| c.to_string_id() == id).cloned())
    }

    async fn get_deal(&self, id: &str) -> anyhow::Result<Option<Deal>> {
        let state = self.state.lock().unwrap();
        Ok(state.deals.iter().find(|d| d.to_string_id() == id).cloned())
    }

    async fn create_stage_if_absent(
        &self,
        pipeline_id: &str,
        name: &str,
        order: i32,
    ) -> anyhow::Result<PipelineStage> {
        let mut state = self.state.lock().unwrap();
        if state.stages_fail {
            anyhow::bail!("stage table is locked");
        }
        let pipeline = state
            .pipelines
            .iter_mut()
            .find(|p| p.id == pipeline_id)
            .ok_or_else(|| anyhow::anyhow!("pipeline {} not found", pipeline_id))?;
        if let Some(existing) = pipeline.find_stage(name) {
            return Ok(existing.clone());
        }
        let stage = PipelineStage {
            id: format!("{}-stage-{}", pipeline_id, pipeline.stages.len()),
            pipeline_id: pipeline_id.to_string(),
            name: name.to_string(),
            order,
        };
        pipeline.stages.push(stage.clone());
        Ok(stage)
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<(), WriteFailure> {
        let mut state = self.state.lock().unwrap();
        contact_conflict(&state, contact)?;
        state.contacts.push(contact.clone());
        Ok(())
    }

    async fn update_contact(&self, contact: &Contact) -> Result<(), WriteFailure> {
        let mut state = self.state.lock().unwrap();
        contact_conflict(&state, contact)?;
        let id = contact.to_string_id();
        let slot = state
            .contacts
            .iter_mut()
            .find(|c| c.to_string_id() == id)
            .ok_or_else(|| WriteFailure::NotFound(id.clone()))?;
        *slot = contact.clone();
        Ok(())
    }

    async fn insert_deal(&self, deal: &Deal) -> Result<(), WriteFailure> {
        let mut state = self.state.lock().unwrap();
        deal_conflict(&state, deal)?;
        state.deals.push(deal.clone());
        Ok(())
    }

    async fn update_deal(&self, deal: &Deal) -> Result<(), WriteFailure> {
        let mut state = self.state.lock().unwrap();
        deal_conflict(&state, deal)?;
        let id = deal.to_string_id();
        let slot = state
            .deals
            .iter_mut()
            .find(|d| d.to_string_id() == id)
            .ok_or_else(|| WriteFailure::NotFound(id.clone()))?;
        *slot = deal.clone();
        Ok(())
    }

    async fn append_audit(&self, entity_type: &str, entity_id: &str, actor: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.audit_fails {
            anyhow::bail!("audit log is read-only");
        }
        state
            .audit
            .push((entity_type.to_string(), entity_id.to_string(), actor.to_string()));
        Ok(())
    }
}

pub fn sales_pipeline() -> Pipeline {
    Pipeline {
        id: "p-sales".into(),
        name: "Продажи".into(),
        is_default: true,
        stages: vec![
            PipelineStage {
                id: "s-new".into(),
                pipeline_id: "p-sales".into(),
                name: "Новая".into(),
                order: 0,
            },
            PipelineStage {
                id: "s-talks".into(),
                pipeline_id: "p-sales".into(),
                name: "Переговоры".into(),
                order: 1,
            },
        ],
    }
}

pub fn manager() -> User {
    User {
        id: "u-petrova".into(),
        username: "petrova".into(),
        email: Some("petrova@example.com".into()),
        full_name: Some("Анна Петрова".into()),
        is_active: true,
    }
}

/// CSV из строк, склеенных через `\n`
pub fn csv(lines: &[&str]) -> Vec<u8> {
    lines.join("\n").into_bytes()
}
