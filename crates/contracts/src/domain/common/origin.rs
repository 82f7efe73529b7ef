use serde::{Deserialize, Serialize};

/// Как запись попала в CRM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Создана вручную через интерфейс
    #[default]
    Manual,
    /// Загружена из CSV файла
    CsvImport,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Manual => "manual",
            Origin::CsvImport => "csv_import",
        }
    }

    /// Разбор значения из колонки БД, неизвестные значения считаются ручными
    pub fn from_db(value: &str) -> Self {
        match value {
            "csv_import" => Origin::CsvImport,
            _ => Origin::Manual,
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
