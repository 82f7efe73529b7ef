use super::meta::AutoMappingSuggestion;
use super::request::Delimiter;
use serde::{Deserialize, Serialize};

/// Количество вхождений значения колонки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinctValue {
    pub value: String,
    pub count: u32,
}

/// Предпросмотр файла перед сопоставлением колонок
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub headers: Vec<String>,
    /// Первые строки файла, ячейки в порядке заголовков
    pub rows: Vec<Vec<String>>,
    pub total_rows: u32,
    pub delimiter: Delimiter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<AutoMappingSuggestion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinct_values: Vec<DistinctValue>,
}
