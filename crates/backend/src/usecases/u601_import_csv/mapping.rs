use contracts::usecases::u601_import_csv::{EntityType, ImportField};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::decoder::RawTable;
use super::errors::ImportAbort;

/// Значение в сопоставлении `{column: field}`, означающее "не импортировать"
const SKIP: &str = "skip";

/// Сопоставление, запрошенное клиентом: поле -> имя колонки
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedMapping {
    pub entries: Vec<(ImportField, String)>,
}

/// Проверенное сопоставление: поле -> индекс колонки в заголовках
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub field: ImportField,
    pub column: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedMapping {
    pub columns: Vec<MappedColumn>,
}

impl ResolvedMapping {
    pub fn index_of(&self, field: ImportField) -> Option<usize> {
        self.columns.iter().find(|c| c.field == field).map(|c| c.index)
    }
}

/// Разбор JSON сопоставления колонок.
///
/// Принимаются обе ориентации: `{fieldId: column}`, если все ключи (после
/// раскрытия вложенного `social`) являются полями схемы, иначе
/// `{column: fieldId | "skip" | null}`.
pub fn parse_mapping(json: &str, entity: EntityType) -> Result<RequestedMapping, ImportAbort> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ImportAbort::MalformedMapping(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(ImportAbort::MalformedMapping("ожидается JSON-объект".into()));
    };
    let flat = flatten_social(object);

    let by_field = flat
        .keys()
        .all(|k| ImportField::from_key(k).is_some_and(|f| entity.field(f).is_some()));

    let mut entries: Vec<(ImportField, String)> = Vec::new();
    for (key, value) in flat {
        let target = match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => {
                return Err(ImportAbort::MalformedMapping(format!(
                    "значение для «{}» должно быть строкой, получено {}",
                    key, other
                )))
            }
        };
        let Some(target) = target.filter(|t| !t.trim().is_empty()) else {
            continue;
        };

        let (field, column) = if by_field {
            match ImportField::from_key(&key) {
                Some(field) => (field, target),
                None => continue,
            }
        } else {
            if target.trim().eq_ignore_ascii_case(SKIP) {
                continue;
            }
            let field = ImportField::from_key(&target)
                .filter(|f| entity.field(*f).is_some())
                .ok_or_else(|| {
                    ImportAbort::MalformedMapping(format!(
                        "неизвестное поле «{}» для колонки «{}»",
                        target, key
                    ))
                })?;
            (field, key)
        };

        if entries.iter().any(|(f, _)| *f == field) {
            return Err(ImportAbort::DuplicateFieldMapping(field.key().to_string()));
        }
        entries.push((field, column));
    }

    // порядок полей схемы, а не порядок ключей в JSON
    let order = |f: &ImportField| entity.fields().iter().position(|s| s.field == *f);
    entries.sort_by_key(|(f, _)| order(f));
    Ok(RequestedMapping { entries })
}

fn flatten_social(object: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in object {
        match value {
            Value::Object(nested) if key == "social" => {
                for (platform, column) in nested {
                    flat.insert(platform, column);
                }
            }
            value => {
                flat.insert(key, value);
            }
        }
    }
    flat
}

/// Обязательные поля схемы, для которых не выбрана колонка
pub fn missing_required(mapping: &RequestedMapping, entity: EntityType) -> Vec<ImportField> {
    entity
        .required_fields()
        .filter(|f| !mapping.entries.iter().any(|(mapped, _)| mapped == f))
        .collect()
}

/// Проверка сопоставления по заголовкам файла и обязательным полям схемы
pub fn resolve(
    table: &RawTable,
    mapping: &RequestedMapping,
    entity: EntityType,
) -> Result<ResolvedMapping, ImportAbort> {
    let missing = missing_required(mapping, entity);
    if !missing.is_empty() {
        return Err(ImportAbort::MissingRequiredFields(
            missing.iter().map(|f| f.key().to_string()).collect(),
        ));
    }

    let mut columns = Vec::with_capacity(mapping.entries.len());
    let mut unknown = Vec::new();
    for (field, column) in &mapping.entries {
        match table.column_index(column) {
            Some(index) => columns.push(MappedColumn {
                field: *field,
                column: column.clone(),
                index,
            }),
            None => unknown.push(column.clone()),
        }
    }
    if !unknown.is_empty() {
        return Err(ImportAbort::UnknownColumns(unknown));
    }

    Ok(ResolvedMapping { columns })
}

/// Сопоставление значений для ссылочных полей: поле -> (сырое значение -> id)
#[derive(Debug, Clone, Default)]
pub struct ValueMapping {
    inner: HashMap<ImportField, HashMap<String, String>>,
}

impl ValueMapping {
    pub fn new(inner: HashMap<ImportField, HashMap<String, String>>) -> Self {
        let inner = inner
            .into_iter()
            .map(|(field, values)| {
                let trimmed = values
                    .into_iter()
                    .map(|(raw, id)| (raw.trim().to_string(), id.trim().to_string()))
                    .filter(|(_, id)| !id.is_empty())
                    .collect();
                (field, trimmed)
            })
            .collect();
        Self { inner }
    }

    /// Точное совпадение обрезанного значения
    pub fn lookup(&self, field: ImportField, raw: &str) -> Option<&str> {
        self.inner
            .get(&field)
            .and_then(|values| values.get(raw.trim()))
            .map(String::as_str)
    }
}

/// Разбор `{fieldId: {rawValue: entityId}}`; отсутствие JSON даёт пустое сопоставление
pub fn parse_value_mapping(
    json: Option<&str>,
    entity: EntityType,
) -> Result<ValueMapping, ImportAbort> {
    let Some(json) = json.filter(|j| !j.trim().is_empty()) else {
        return Ok(ValueMapping::default());
    };
    let raw: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)
        .map_err(|e| ImportAbort::MalformedValueMapping(e.to_string()))?;

    let mut inner = HashMap::new();
    for (key, values) in raw {
        let field = ImportField::from_key(&key)
            .filter(|f| entity.field(*f).is_some())
            .ok_or_else(|| ImportAbort::MalformedValueMapping(format!("неизвестное поле «{}»", key)))?;
        inner.insert(field, values);
    }
    Ok(ValueMapping::new(inner))
}
