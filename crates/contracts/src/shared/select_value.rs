//! Адаптер между `Option` в модели сопоставления и виджетом выбора,
//! которому нужна строка-заглушка для состояния "не выбрано".

/// Значение виджета для колонки, которую не нужно импортировать
pub const SKIP_COLUMN_SENTINEL: &str = "__SKIP_COLUMN__";

pub fn to_select_value(field: Option<&str>) -> String {
    match field {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => SKIP_COLUMN_SENTINEL.to_string(),
    }
}

pub fn from_select_value(value: &str) -> Option<String> {
    if value.is_empty() || value == SKIP_COLUMN_SENTINEL {
        None
    } else {
        Some(value.to_string())
    }
}
