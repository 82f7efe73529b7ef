//! Приведение сырых значений ячеек к каноническому виду.
//!
//! Все функции чистые и тотальные: некорректный ввод даёт `None`, а повторное
//! применение к собственному результату ничего не меняет.

pub mod phone;
pub mod social;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

pub use phone::{normalize_phone, parse_region};
pub use social::{normalize_social_handle, SocialPlatform};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// Адрес в нижнем регистре без пробелов по краям, если он похож на email
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() || !EMAIL_RE.is_match(&normalized) {
        return None;
    }
    Some(normalized)
}

/// Обрезка по краям и схлопывание пробельных последовательностей в один пробел
pub fn sanitize_text(raw: &str) -> Option<String> {
    let sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Список тегов через `,` или `;`; дубликаты без учёта регистра отбрасываются
pub fn parse_tags(raw: &str) -> Option<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();
    for part in raw.split([',', ';']) {
        if let Some(tag) = sanitize_text(part) {
            if !tags.iter().any(|t| t.to_lowercase() == tag.to_lowercase()) {
                tags.push(tag);
            }
        }
    }
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Неотрицательное число: допускаются пробелы-разделители разрядов и десятичная запятая
pub fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if compact.is_empty() {
        return None;
    }
    let decimal = if compact.contains('.') {
        compact.replace(',', "")
    } else {
        compact.replace(',', ".")
    };
    let value: f64 = decimal.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Дата в одном из форматов `YYYY-MM-DD`, `DD.MM.YYYY`, `DD/MM/YYYY` или RFC 3339
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@B.COM ").as_deref(), Some("a@b.com"));
        assert_eq!(
            normalize_email("Ivan.Petrov+crm@Example.ru").as_deref(),
            Some("ivan.petrov+crm@example.ru")
        );
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert_eq!(normalize_email(""), None);
        assert_eq!(normalize_email("   "), None);
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email("a@"), None);
        assert_eq!(normalize_email("a b@example.com"), None);
        assert_eq!(normalize_email("a@-example.com"), None);
    }

    #[test]
    fn test_email_is_idempotent() {
        for raw in ["  A@B.COM ", "x.y@sub.domain.org"] {
            let once = normalize_email(raw).unwrap();
            assert_eq!(normalize_email(&once).as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  ООО   \"Ромашка\"\t и  партнёры ").as_deref(), Some("ООО \"Ромашка\" и партнёры"));
        assert_eq!(sanitize_text(" \n\t "), None);
        let once = sanitize_text(" a   b ").unwrap();
        assert_eq!(sanitize_text(&once), Some(once));
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags("vip, опт;VIP ,  новый  клиент").unwrap(),
            vec!["vip".to_string(), "опт".to_string(), "новый клиент".to_string()]
        );
        assert_eq!(parse_tags(" , ; "), None);
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1500"), Some(1500.0));
        assert_eq!(parse_amount("1 500,50"), Some(1500.5));
        assert_eq!(parse_amount("1,500.50"), Some(1500.5));
        assert_eq!(parse_amount("12\u{a0}000"), Some(12000.0));
        assert_eq!(parse_amount("-5"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 31);
        assert_eq!(parse_date("2025-03-31"), expected);
        assert_eq!(parse_date("31.03.2025"), expected);
        assert_eq!(parse_date("31/03/2025"), expected);
        assert_eq!(parse_date("2025-03-31T10:00:00+03:00"), expected);
        assert_eq!(parse_date("31-03-2025"), None);
        assert_eq!(parse_date("2025-02-30"), None);
    }
}
