use super::request::EntityType;
use serde::{Deserialize, Serialize};

/// Тип значения поля, определяет нормализацию
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Number,
    Date,
    Tags,
    Social,
    Reference,
}

/// Поле назначения импорта (объединение полей контакта и сделки)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportField {
    // Контакт
    FullName,
    Email,
    Phone,
    Position,
    CompanyName,
    Notes,
    Instagram,
    Telegram,
    Whatsapp,
    Vk,
    Linkedin,
    // Сделка
    Number,
    Title,
    Amount,
    Budget,
    Pipeline,
    Stage,
    AssignedTo,
    ContactEmail,
    ContactPhone,
    ExpectedCloseAt,
    Description,
    // Общие
    Tags,
}

impl ImportField {
    pub fn key(&self) -> &'static str {
        match self {
            ImportField::FullName => "fullName",
            ImportField::Email => "email",
            ImportField::Phone => "phone",
            ImportField::Position => "position",
            ImportField::CompanyName => "companyName",
            ImportField::Notes => "notes",
            ImportField::Instagram => "instagram",
            ImportField::Telegram => "telegram",
            ImportField::Whatsapp => "whatsapp",
            ImportField::Vk => "vk",
            ImportField::Linkedin => "linkedin",
            ImportField::Number => "number",
            ImportField::Title => "title",
            ImportField::Amount => "amount",
            ImportField::Budget => "budget",
            ImportField::Pipeline => "pipeline",
            ImportField::Stage => "stage",
            ImportField::AssignedTo => "assignedTo",
            ImportField::ContactEmail => "contactEmail",
            ImportField::ContactPhone => "contactPhone",
            ImportField::ExpectedCloseAt => "expectedCloseAt",
            ImportField::Description => "description",
            ImportField::Tags => "tags",
        }
    }

    /// Разбор идентификатора поля, включая старые ключи с суффиксом `Id`
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key.trim() {
            "fullName" => ImportField::FullName,
            "email" => ImportField::Email,
            "phone" => ImportField::Phone,
            "position" => ImportField::Position,
            "companyName" => ImportField::CompanyName,
            "notes" => ImportField::Notes,
            "instagram" => ImportField::Instagram,
            "telegram" => ImportField::Telegram,
            "whatsapp" => ImportField::Whatsapp,
            "vk" => ImportField::Vk,
            "linkedin" => ImportField::Linkedin,
            "number" => ImportField::Number,
            "title" => ImportField::Title,
            "amount" => ImportField::Amount,
            "budget" => ImportField::Budget,
            "pipeline" | "pipelineId" => ImportField::Pipeline,
            "stage" | "stageId" => ImportField::Stage,
            "assignedTo" | "assignedToId" => ImportField::AssignedTo,
            "contactEmail" => ImportField::ContactEmail,
            "contactPhone" => ImportField::ContactPhone,
            "expectedCloseAt" => ImportField::ExpectedCloseAt,
            "description" => ImportField::Description,
            "tags" => ImportField::Tags,
            _ => return None,
        };
        Some(field)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ImportField::Email | ImportField::ContactEmail => FieldKind::Email,
            ImportField::Phone | ImportField::ContactPhone => FieldKind::Phone,
            ImportField::Amount | ImportField::Budget => FieldKind::Number,
            ImportField::ExpectedCloseAt => FieldKind::Date,
            ImportField::Tags => FieldKind::Tags,
            ImportField::Instagram
            | ImportField::Telegram
            | ImportField::Whatsapp
            | ImportField::Vk
            | ImportField::Linkedin => FieldKind::Social,
            ImportField::Pipeline | ImportField::Stage | ImportField::AssignedTo => {
                FieldKind::Reference
            }
            _ => FieldKind::Text,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImportField::FullName => "ФИО",
            ImportField::Email => "Email",
            ImportField::Phone => "Телефон",
            ImportField::Position => "Должность",
            ImportField::CompanyName => "Компания",
            ImportField::Notes => "Заметки",
            ImportField::Instagram => "Instagram",
            ImportField::Telegram => "Telegram",
            ImportField::Whatsapp => "WhatsApp",
            ImportField::Vk => "ВКонтакте",
            ImportField::Linkedin => "LinkedIn",
            ImportField::Number => "Номер сделки",
            ImportField::Title => "Название",
            ImportField::Amount => "Сумма",
            ImportField::Budget => "Бюджет",
            ImportField::Pipeline => "Воронка",
            ImportField::Stage => "Этап",
            ImportField::AssignedTo => "Ответственный",
            ImportField::ContactEmail => "Email контакта",
            ImportField::ContactPhone => "Телефон контакта",
            ImportField::ExpectedCloseAt => "Ожидаемая дата закрытия",
            ImportField::Description => "Описание",
            ImportField::Tags => "Теги",
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        let text = match self {
            ImportField::Email => "Используется для поиска существующего контакта",
            ImportField::Phone => "Приводится к формату E.164",
            ImportField::Number => "Используется для поиска существующей сделки",
            ImportField::Pipeline => "ID или название воронки",
            ImportField::Stage => "ID или название этапа; отсутствующий этап будет создан",
            ImportField::AssignedTo => "Имя, email или ID пользователя",
            ImportField::ContactEmail | ImportField::ContactPhone => {
                "Связывает сделку с существующим контактом"
            }
            ImportField::ExpectedCloseAt => "ГГГГ-ММ-ДД, ДД.ММ.ГГГГ или ДД/ММ/ГГГГ",
            ImportField::Tags => "Список через запятую",
            _ => return None,
        };
        Some(text)
    }
}

impl std::fmt::Display for ImportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Поле в составе схемы назначения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: ImportField,
    pub required: bool,
}

const fn req(field: ImportField) -> FieldSpec {
    FieldSpec { field, required: true }
}

const fn opt(field: ImportField) -> FieldSpec {
    FieldSpec { field, required: false }
}

const CONTACT_FIELDS: &[FieldSpec] = &[
    req(ImportField::FullName),
    opt(ImportField::Email),
    opt(ImportField::Phone),
    opt(ImportField::Position),
    opt(ImportField::CompanyName),
    opt(ImportField::Notes),
    opt(ImportField::Tags),
    opt(ImportField::Instagram),
    opt(ImportField::Telegram),
    opt(ImportField::Whatsapp),
    opt(ImportField::Vk),
    opt(ImportField::Linkedin),
];

const DEAL_FIELDS: &[FieldSpec] = &[
    req(ImportField::Number),
    req(ImportField::Title),
    req(ImportField::Amount),
    req(ImportField::Pipeline),
    req(ImportField::Stage),
    opt(ImportField::Budget),
    opt(ImportField::AssignedTo),
    opt(ImportField::ContactEmail),
    opt(ImportField::ContactPhone),
    opt(ImportField::ExpectedCloseAt),
    opt(ImportField::Description),
    opt(ImportField::Tags),
];

impl EntityType {
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            EntityType::Contact => CONTACT_FIELDS,
            EntityType::Deal => DEAL_FIELDS,
        }
    }

    pub fn field(&self, field: ImportField) -> Option<FieldSpec> {
        self.fields().iter().copied().find(|s| s.field == field)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = ImportField> {
        self.fields().iter().filter(|s| s.required).map(|s| s.field)
    }

    pub fn describe(&self) -> ImportMeta {
        ImportMeta {
            fields: self
                .fields()
                .iter()
                .map(|spec| FieldDescriptor {
                    key: spec.field.key().to_string(),
                    label: spec.field.label().to_string(),
                    required: spec.required,
                    kind: spec.field.kind(),
                    description: spec.field.description().map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Описание поля для UI сопоставления колонок
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportMeta {
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoMapRequest {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoMappingSuggestion {
    pub column_name: String,
    pub suggested_field: Option<String>,
    pub confidence: f32,
}
