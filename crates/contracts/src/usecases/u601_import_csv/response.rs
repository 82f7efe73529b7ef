use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Максимальная длина исходного значения в сообщении об ошибке
pub const MAX_ERROR_VALUE_CHARS: usize = 50;

/// Ключ группировки для ошибок уровня строки без конкретного поля
pub const ROW_LEVEL_FIELD: &str = "_row";

/// Итоговые счётчики импорта. `total` всегда равен числу строк данных.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: u32,
    pub created: u32,
    pub updated: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// Ошибка конкретной строки файла (нумерация строк данных с 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    pub row: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub error: String,
}

impl ImportError {
    pub fn new(row: u32, error: impl Into<String>) -> Self {
        Self {
            row,
            field: None,
            value: None,
            error: error.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Исходное значение ячейки, усечённое до `MAX_ERROR_VALUE_CHARS` символов
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(truncate_chars(value, MAX_ERROR_VALUE_CHARS));
        self
    }

    fn matches(&self, needle: &str) -> bool {
        self.row.to_string().contains(needle)
            || self.error.to_lowercase().contains(needle)
            || self
                .field
                .as_deref()
                .is_some_and(|f| f.to_lowercase().contains(needle))
            || self
                .value
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(needle))
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        value.chars().take(max).collect()
    }
}

/// Этап, который будет создан при фиксации импорта
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageToCreate {
    pub pipeline_id: String,
    pub name: String,
    pub order: i32,
}

/// Ответ на запрос импорта (и для dry-run, и для фиксации)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub summary: ImportSummary,
    #[serde(default)]
    pub errors: Vec<ImportError>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages_to_create: Vec<StageToCreate>,
    #[serde(default)]
    pub dry_run: bool,
}

impl ImportResponse {
    /// Ответ для импорта, отклонённого целиком: нулевые счётчики и одна глобальная ошибка
    pub fn rejected(message: impl Into<String>, dry_run: bool) -> Self {
        Self {
            global_errors: vec![message.into()],
            dry_run,
            ..Default::default()
        }
    }

    /// Ошибки строк, содержащие подстроку (без учёта регистра) в номере строки,
    /// поле, значении или тексте. Пустой запрос возвращает все ошибки.
    pub fn filter_errors(&self, query: &str) -> Vec<&ImportError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.errors.iter().collect();
        }
        self.errors.iter().filter(|e| e.matches(&needle)).collect()
    }

    /// Количество ошибок по полям
    pub fn error_counts_by_field(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            let key = error.field.clone().unwrap_or_else(|| ROW_LEVEL_FIELD.to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> ImportResponse {
        ImportResponse {
            summary: ImportSummary { total: 3, created: 1, updated: 0, failed: 2, skipped: 0 },
            errors: vec![
                ImportError::new(2, "Некорректный email").with_field("email").with_value("bad@"),
                ImportError::new(3, "Обязательное поле не заполнено").with_field("fullName"),
                ImportError::new(3, "Запись с таким ключом уже существует"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_value_is_truncated_to_fifty_chars() {
        let long = "я".repeat(80);
        let error = ImportError::new(1, "x").with_value(&long);
        assert_eq!(error.value.unwrap().chars().count(), MAX_ERROR_VALUE_CHARS);
    }

    #[test]
    fn test_filter_errors_matches_any_column() {
        let r = response();
        assert_eq!(r.filter_errors("EMAIL").len(), 1);
        assert_eq!(r.filter_errors("3").len(), 2);
        assert_eq!(r.filter_errors("bad@").len(), 1);
        assert_eq!(r.filter_errors("").len(), 3);
        assert!(r.filter_errors("нет такого").is_empty());
    }

    #[test]
    fn test_error_counts_group_rowless_errors() {
        let counts = response().error_counts_by_field();
        assert_eq!(counts.get("email"), Some(&1));
        assert_eq!(counts.get("fullName"), Some(&1));
        assert_eq!(counts.get(ROW_LEVEL_FIELD), Some(&1));
    }

    #[test]
    fn test_rejected_response_shape() {
        let r = ImportResponse::rejected("Файл не передан", true);
        assert_eq!(r.summary, ImportSummary::default());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["globalErrors"][0], "Файл не передан");
        assert_eq!(json["dryRun"], true);
        assert!(json.get("stagesToCreate").is_none());
        assert!(json["errors"].as_array().unwrap().is_empty());
    }
}
