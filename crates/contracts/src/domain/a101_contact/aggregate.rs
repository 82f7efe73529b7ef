use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, Origin};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================
crate::uuid_aggregate_id!(ContactId);

// ============================================================================
// Social links
// ============================================================================

/// Ссылки на профили контакта в соцсетях (уже нормализованные)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        self.instagram.is_none()
            && self.telegram.is_none()
            && self.whatsapp.is_none()
            && self.vk.is_none()
            && self.linkedin.is_none()
    }

    /// Перенести заполненные значения из `other`, пустые не затирают текущие
    pub fn merge_from(&mut self, other: &SocialLinks) {
        if other.instagram.is_some() {
            self.instagram = other.instagram.clone();
        }
        if other.telegram.is_some() {
            self.telegram = other.telegram.clone();
        }
        if other.whatsapp.is_some() {
            self.whatsapp = other.whatsapp.clone();
        }
        if other.vk.is_some() {
            self.vk = other.vk.clone();
        }
        if other.linkedin.is_some() {
            self.linkedin = other.linkedin.clone();
        }
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Контакт CRM. `base.description` хранит ФИО, `base.code` генерируется.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub base: BaseAggregate<ContactId>,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub position: Option<String>,

    #[serde(rename = "companyName")]
    pub company_name: Option<String>,

    pub notes: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub social: SocialLinks,
}

impl Contact {
    pub fn new_with_id(id: ContactId, full_name: String) -> Self {
        let code = Self::code_for(&id);
        Self {
            base: BaseAggregate::new(id, code, full_name),
            email: None,
            phone: None,
            position: None,
            company_name: None,
            notes: None,
            tags: Vec::new(),
            social: SocialLinks::default(),
        }
    }

    pub fn new_for_insert(full_name: String) -> Self {
        Self::new_with_id(ContactId::new_v4(), full_name)
    }

    /// Код контакта: "CNT-" + первые 8 символов UUID в верхнем регистре
    pub fn code_for(id: &ContactId) -> String {
        let raw = id.as_string().replace('-', "");
        format!("CNT-{}", raw[..8].to_uppercase())
    }

    /// ФИО контакта
    pub fn display_name(&self) -> &str {
        &self.base.description
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("ФИО не может быть пустым".into());
        }
        if self.base.description.chars().count() > 200 {
            return Err("ФИО не должно превышать 200 символов".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
        self.base.metadata.increment_version();
    }

    pub fn mark_imported(&mut self) {
        self.base.origin = Origin::CsvImport;
    }
}

impl AggregateRoot for Contact {
    fn aggregate_index() -> &'static str {
        "a101"
    }

    fn collection_name() -> &'static str {
        "contact"
    }
}
