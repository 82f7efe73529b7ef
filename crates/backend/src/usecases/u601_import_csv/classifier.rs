use contracts::domain::a103_pipeline::{stage_name_key, Pipeline};
use contracts::system::users::User;
use contracts::usecases::u601_import_csv::{
    EntityType, ImportError, ImportField, ImportSummary, StageToCreate,
};
use phonenumber::country;
use std::collections::HashMap;
use uuid::Uuid;

use super::decoder::{RawRow, RawTable};
use super::mapping::{ResolvedMapping, ValueMapping};
use super::record::{ContactPatch, DealPatch, RowRecord, StageRef};
use crate::shared::normalization::{
    normalize_email, normalize_phone, normalize_social_handle, parse_amount, parse_date,
    parse_tags, sanitize_text, SocialPlatform,
};

/// Решение по строке
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Новая запись с заранее выданным id
    Create { id: Uuid },
    /// Обновление существующей записи (или созданной выше в этом же файле)
    Update { id: String },
    Skip,
    Fail,
}

#[derive(Debug, Clone)]
pub struct ClassifiedRow {
    pub row: u32,
    pub decision: Decision,
    pub record: Option<RowRecord>,
    /// Естественный ключ строки, попадает в ошибку записи
    pub key: Option<(ImportField, String)>,
}

/// Существующие записи, нужные для классификации, загруженные одним проходом
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub contacts_by_email: HashMap<String, String>,
    pub contacts_by_phone: HashMap<String, String>,
    pub deals_by_number: HashMap<String, String>,
    pub users: Vec<User>,
    pub pipelines: Vec<Pipeline>,
}

/// Нормализованные естественные ключи файла для пакетного поиска
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NaturalKeys {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub numbers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub entity: EntityType,
    pub rows: Vec<ClassifiedRow>,
    pub summary: ImportSummary,
    pub errors: Vec<ImportError>,
    pub warnings: Vec<String>,
    pub stages_to_create: Vec<StageToCreate>,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Собрать ключи поиска из колонок email/телефона/номера
pub fn collect_keys(
    table: &RawTable,
    mapping: &ResolvedMapping,
    entity: EntityType,
    region: Option<country::Id>,
) -> NaturalKeys {
    let (email_field, phone_field) = match entity {
        EntityType::Contact => (ImportField::Email, ImportField::Phone),
        EntityType::Deal => (ImportField::ContactEmail, ImportField::ContactPhone),
    };
    let mut keys = NaturalKeys::default();
    for row in &table.rows {
        if let Some(email) = mapping.index_of(email_field).and_then(|i| normalize_email(row.cell(i))) {
            push_unique(&mut keys.emails, email);
        }
        if let Some(phone) = mapping
            .index_of(phone_field)
            .and_then(|i| normalize_phone(row.cell(i), region))
        {
            push_unique(&mut keys.phones, phone);
        }
        if entity == EntityType::Deal {
            if let Some(number) = mapping
                .index_of(ImportField::Number)
                .and_then(|i| sanitize_text(row.cell(i)))
            {
                push_unique(&mut keys.numbers, number);
            }
        }
    }
    keys
}

/// Разбор одной строки: сырые значения, ошибки и предупреждения
struct RowScope<'a> {
    row: &'a RawRow,
    mapping: &'a ResolvedMapping,
    errors: Vec<ImportError>,
    warnings: Vec<String>,
}

impl<'a> RowScope<'a> {
    fn new(row: &'a RawRow, mapping: &'a ResolvedMapping) -> Self {
        Self {
            row,
            mapping,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Сырое значение сопоставленной колонки, если оно не пустое
    fn raw(&self, field: ImportField) -> Option<&'a str> {
        let row: &'a RawRow = self.row;
        self.mapping
            .index_of(field)
            .map(|i| row.cell(i))
            .filter(|v| !v.trim().is_empty())
    }

    fn all_blank(&self) -> bool {
        self.mapping
            .columns
            .iter()
            .all(|c| self.row.cell(c.index).trim().is_empty())
    }

    fn fail(&mut self, field: ImportField, value: Option<&str>, message: String) {
        let mut error = ImportError::new(self.row.number, message).with_field(field.key());
        if let Some(value) = value {
            error = error.with_value(value);
        }
        self.errors.push(error);
    }

    fn warn(&mut self, field: ImportField, value: &str, reason: &str) {
        self.warnings.push(format!(
            "Строка {}: поле «{}» со значением «{}» пропущено: {}",
            self.row.number,
            field.label(),
            value.trim(),
            reason
        ));
    }

    fn required<T>(&mut self, field: ImportField, normalize: impl Fn(&str) -> Option<T>) -> Option<T> {
        let Some(raw) = self.raw(field) else {
            self.fail(field, None, format!("Обязательное поле «{}» не заполнено", field.label()));
            return None;
        };
        let value = normalize(raw);
        if value.is_none() {
            self.fail(field, Some(raw), format!("Некорректное значение поля «{}»", field.label()));
        }
        value
    }

    fn optional<T>(&mut self, field: ImportField, normalize: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.raw(field)?;
        let value = normalize(raw);
        if value.is_none() {
            self.warn(field, raw, "значение не распознано");
        }
        value
    }

    fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Классификатор строк. Держит состояние одного файла: ключи записей,
/// встреченных выше по файлу, и предложенные этапы.
pub struct Classifier<'a> {
    entity: EntityType,
    mapping: &'a ResolvedMapping,
    values: &'a ValueMapping,
    lookups: &'a Lookups,
    region: Option<country::Id>,
    in_file_by_email: HashMap<String, String>,
    in_file_by_phone: HashMap<String, String>,
    in_file_by_number: HashMap<String, String>,
    stages: Vec<StageToCreate>,
}

impl<'a> Classifier<'a> {
    pub fn new(
        entity: EntityType,
        mapping: &'a ResolvedMapping,
        values: &'a ValueMapping,
        lookups: &'a Lookups,
        region: Option<country::Id>,
    ) -> Self {
        Self {
            entity,
            mapping,
            values,
            lookups,
            region,
            in_file_by_email: HashMap::new(),
            in_file_by_phone: HashMap::new(),
            in_file_by_number: HashMap::new(),
            stages: Vec::new(),
        }
    }

    pub fn classify(mut self, table: &RawTable) -> Classification {
        let mut rows = Vec::with_capacity(table.rows.len());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut summary = ImportSummary {
            total: table.total_rows,
            ..Default::default()
        };

        for raw in &table.rows {
            let mut scope = RowScope::new(raw, self.mapping);
            let classified = self.classify_row(&mut scope);
            match classified.decision {
                Decision::Create { .. } => summary.created += 1,
                Decision::Update { .. } => summary.updated += 1,
                Decision::Skip => summary.skipped += 1,
                Decision::Fail => summary.failed += 1,
            }
            errors.append(&mut scope.errors);
            warnings.append(&mut scope.warnings);
            rows.push(classified);
        }

        Classification {
            entity: self.entity,
            rows,
            summary,
            errors,
            warnings,
            stages_to_create: self.stages,
        }
    }

    fn classify_row(&mut self, scope: &mut RowScope<'_>) -> ClassifiedRow {
        let number = scope.row.number;
        if scope.all_blank() {
            return ClassifiedRow {
                row: number,
                decision: Decision::Skip,
                record: None,
                key: None,
            };
        }

        let built = match self.entity {
            EntityType::Contact => self.contact_row(scope),
            EntityType::Deal => self.deal_row(scope),
        };

        match built {
            Some((decision, record, key)) if !scope.failed() => ClassifiedRow {
                row: number,
                decision,
                record: Some(record),
                key,
            },
            _ => ClassifiedRow {
                row: number,
                decision: Decision::Fail,
                record: None,
                key: None,
            },
        }
    }

    fn contact_row(
        &mut self,
        scope: &mut RowScope<'_>,
    ) -> Option<(Decision, RowRecord, Option<(ImportField, String)>)> {
        let region = self.region;
        let full_name = scope.required(ImportField::FullName, sanitize_text);
        let email = scope.optional(ImportField::Email, normalize_email);
        let phone = scope.optional(ImportField::Phone, |v| normalize_phone(v, region));
        let position = scope.optional(ImportField::Position, sanitize_text);
        let company_name = scope.optional(ImportField::CompanyName, sanitize_text);
        let notes = scope.optional(ImportField::Notes, sanitize_text);
        let tags = scope.optional(ImportField::Tags, parse_tags);

        let mut patch = ContactPatch {
            full_name: full_name.unwrap_or_default(),
            email,
            phone,
            position,
            company_name,
            notes,
            tags,
            ..Default::default()
        };
        for (field, platform) in [
            (ImportField::Instagram, SocialPlatform::Instagram),
            (ImportField::Telegram, SocialPlatform::Telegram),
            (ImportField::Whatsapp, SocialPlatform::Whatsapp),
            (ImportField::Vk, SocialPlatform::Vk),
            (ImportField::Linkedin, SocialPlatform::Linkedin),
        ] {
            let value = scope.optional(field, |v| normalize_social_handle(v, platform, region));
            let slot = match platform {
                SocialPlatform::Instagram => &mut patch.social.instagram,
                SocialPlatform::Telegram => &mut patch.social.telegram,
                SocialPlatform::Whatsapp => &mut patch.social.whatsapp,
                SocialPlatform::Vk => &mut patch.social.vk,
                SocialPlatform::Linkedin => &mut patch.social.linkedin,
            };
            *slot = value;
        }

        if scope.failed() {
            return None;
        }

        let by_email = patch.email.as_ref().and_then(|e| {
            self.lookups
                .contacts_by_email
                .get(e)
                .or_else(|| self.in_file_by_email.get(e))
                .cloned()
        });
        let by_phone = patch.phone.as_ref().and_then(|p| {
            self.lookups
                .contacts_by_phone
                .get(p)
                .or_else(|| self.in_file_by_phone.get(p))
                .cloned()
        });

        if let (Some(a), Some(b)) = (&by_email, &by_phone) {
            if a != b {
                scope.fail(
                    ImportField::Phone,
                    patch.phone.as_deref(),
                    "Email и телефон принадлежат разным существующим контактам".into(),
                );
                return None;
            }
        }

        let key = patch
            .email
            .clone()
            .map(|e| (ImportField::Email, e))
            .or_else(|| patch.phone.clone().map(|p| (ImportField::Phone, p)));

        let (decision, target) = match by_email.or(by_phone) {
            Some(id) => (Decision::Update { id: id.clone() }, id),
            None => {
                let id = Uuid::new_v4();
                (Decision::Create { id }, id.to_string())
            }
        };
        // Ключи строки ведут к её контакту и для следующих строк файла
        if let Some(email) = &patch.email {
            self.in_file_by_email
                .entry(email.clone())
                .or_insert_with(|| target.clone());
        }
        if let Some(phone) = &patch.phone {
            self.in_file_by_phone.entry(phone.clone()).or_insert(target);
        }

        Some((decision, RowRecord::Contact(patch), key))
    }

    fn deal_row(
        &mut self,
        scope: &mut RowScope<'_>,
    ) -> Option<(Decision, RowRecord, Option<(ImportField, String)>)> {
        let region = self.region;
        let number = scope.required(ImportField::Number, sanitize_text);
        let title = scope.required(ImportField::Title, sanitize_text);
        let amount = scope.required(ImportField::Amount, parse_amount);
        let pipeline = self.resolve_pipeline(scope);
        let stage = pipeline.and_then(|p| self.resolve_stage(scope, p));
        if pipeline.is_none() && scope.raw(ImportField::Stage).is_none() {
            scope.fail(
                ImportField::Stage,
                None,
                format!("Обязательное поле «{}» не заполнено", ImportField::Stage.label()),
            );
        }

        let budget = scope.optional(ImportField::Budget, parse_amount);
        let assigned_to_id = self.resolve_user(scope);
        let contact_id = self.resolve_contact(scope, region);
        let expected_close_at = scope.optional(ImportField::ExpectedCloseAt, parse_date);
        let description = scope.optional(ImportField::Description, sanitize_text);
        let tags = scope.optional(ImportField::Tags, parse_tags);

        let (Some(number), Some(title), Some(amount), Some(pipeline), Some(stage)) =
            (number, title, amount, pipeline, stage)
        else {
            return None;
        };
        if scope.failed() {
            return None;
        }

        let existing = self
            .lookups
            .deals_by_number
            .get(&number)
            .or_else(|| self.in_file_by_number.get(&number))
            .cloned();
        let decision = match existing {
            Some(id) => Decision::Update { id },
            None => {
                let id = Uuid::new_v4();
                self.in_file_by_number.insert(number.clone(), id.to_string());
                Decision::Create { id }
            }
        };

        let key = Some((ImportField::Number, number.clone()));
        let patch = DealPatch {
            number,
            title,
            amount,
            pipeline_id: pipeline.id.clone(),
            stage,
            budget,
            assigned_to_id,
            contact_id,
            expected_close_at,
            description,
            tags,
        };
        Some((decision, RowRecord::Deal(patch), key))
    }

    /// Воронка: сопоставление значений, затем id или название без учёта регистра
    fn resolve_pipeline(&self, scope: &mut RowScope<'_>) -> Option<&'a Pipeline> {
        let field = ImportField::Pipeline;
        let Some(raw) = scope.raw(field) else {
            scope.fail(field, None, format!("Обязательное поле «{}» не заполнено", field.label()));
            return None;
        };
        let lookups: &'a Lookups = self.lookups;
        let found = match self.values.lookup(field, raw) {
            Some(id) => lookups.pipelines.iter().find(|p| p.id == id),
            None => lookups.pipelines.iter().find(|p| p.matches(raw)),
        };
        if found.is_none() {
            scope.fail(field, Some(raw), format!("Воронка «{}» не найдена", raw.trim()));
        }
        found
    }

    /// Этап внутри воронки. Неизвестное название ставится в очередь на создание.
    fn resolve_stage(&mut self, scope: &mut RowScope<'_>, pipeline: &Pipeline) -> Option<StageRef> {
        let field = ImportField::Stage;
        let Some(raw) = scope.raw(field) else {
            scope.fail(field, None, format!("Обязательное поле «{}» не заполнено", field.label()));
            return None;
        };

        if let Some(id) = self.values.lookup(field, raw) {
            return match pipeline.stages.iter().find(|s| s.id == id) {
                Some(stage) => Some(StageRef::Existing(stage.id.clone())),
                None => {
                    scope.fail(
                        field,
                        Some(raw),
                        format!("Этап {} не принадлежит воронке «{}»", id, pipeline.name),
                    );
                    None
                }
            };
        }

        if let Some(stage) = pipeline.find_stage(raw) {
            return Some(StageRef::Existing(stage.id.clone()));
        }

        let name = sanitize_text(raw)?;
        self.propose_stage(pipeline, &name);
        Some(StageRef::Proposed {
            pipeline_id: pipeline.id.clone(),
            name,
        })
    }

    fn propose_stage(&mut self, pipeline: &Pipeline, name: &str) {
        let key = stage_name_key(name);
        let mut queued_for_pipeline = 0;
        for stage in self.stages.iter().filter(|s| s.pipeline_id == pipeline.id) {
            if stage_name_key(&stage.name) == key {
                return;
            }
            queued_for_pipeline += 1;
        }
        self.stages.push(StageToCreate {
            pipeline_id: pipeline.id.clone(),
            name: name.to_string(),
            order: pipeline.next_stage_order() + queued_for_pipeline,
        });
    }

    /// Ответственный: сопоставление значений, затем логин/email/ФИО. Если не найден, поле остаётся пустым.
    fn resolve_user(&self, scope: &mut RowScope<'_>) -> Option<String> {
        let field = ImportField::AssignedTo;
        let raw = scope.raw(field)?;
        let users = &self.lookups.users;
        let found = match self.values.lookup(field, raw) {
            Some(id) => users.iter().find(|u| u.id == id),
            None => users.iter().find(|u| u.matches(raw)),
        };
        match found {
            Some(user) => Some(user.id.clone()),
            None => {
                scope.warn(field, raw, "пользователь не найден");
                None
            }
        }
    }

    /// Контакт сделки: сначала по email, затем по телефону
    fn resolve_contact(&self, scope: &mut RowScope<'_>, region: Option<country::Id>) -> Option<String> {
        let email = scope.optional(ImportField::ContactEmail, normalize_email);
        let phone = scope.optional(ImportField::ContactPhone, |v| normalize_phone(v, region));
        if email.is_none() && phone.is_none() {
            return None;
        }
        let found = email
            .as_ref()
            .and_then(|e| self.lookups.contacts_by_email.get(e))
            .or_else(|| phone.as_ref().and_then(|p| self.lookups.contacts_by_phone.get(p)))
            .cloned();
        if found.is_none() {
            let (field, value) = match (&email, &phone) {
                (Some(e), _) => (ImportField::ContactEmail, e.as_str()),
                (None, Some(p)) => (ImportField::ContactPhone, p.as_str()),
                (None, None) => return None,
            };
            scope.warn(field, value, "контакт не найден");
        }
        found
    }
}

/// Классифицировать все строки файла
pub fn classify(
    entity: EntityType,
    table: &RawTable,
    mapping: &ResolvedMapping,
    values: &ValueMapping,
    lookups: &Lookups,
    region: Option<country::Id>,
) -> Classification {
    Classifier::new(entity, mapping, values, lookups, region).classify(table)
}
