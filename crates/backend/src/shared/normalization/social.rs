use once_cell::sync::Lazy;
use phonenumber::country;
use regex::Regex;
use std::ops::RangeInclusive;

use super::phone::normalize_phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialPlatform {
    Instagram,
    Telegram,
    Whatsapp,
    Vk,
    Linkedin,
}

/// Что остаётся после отрезания префиксов
#[derive(Debug, Clone)]
enum HandleShape {
    /// Имя пользователя из символов `charset` длиной `length`
    Handle {
        charset: &'static str,
        length: RangeInclusive<usize>,
        numeric_ids: bool,
    },
    /// Номер телефона
    Phone,
    /// Полный URL профиля или короткое имя, которое разворачивается в URL
    ProfileUrl {
        url_pattern: &'static str,
        slug_charset: &'static str,
        template: &'static str,
    },
}

#[derive(Debug, Clone)]
struct SocialRule {
    platform: SocialPlatform,
    url_prefixes: &'static [&'static str],
    shape: HandleShape,
    lowercase: bool,
}

const RULES: &[SocialRule] = &[
    SocialRule {
        platform: SocialPlatform::Instagram,
        url_prefixes: &[r"https?://(www\.)?instagram\.com/", r"instagram\.com/"],
        shape: HandleShape::Handle { charset: "[a-zA-Z0-9._]", length: 1..=30, numeric_ids: false },
        lowercase: true,
    },
    SocialRule {
        platform: SocialPlatform::Telegram,
        url_prefixes: &[r"https?://(t\.me|telegram\.me)/"],
        shape: HandleShape::Handle { charset: "[a-zA-Z0-9_]", length: 5..=32, numeric_ids: false },
        lowercase: true,
    },
    SocialRule {
        platform: SocialPlatform::Whatsapp,
        url_prefixes: &[r"https?://(wa\.me|api\.whatsapp\.com)/", r"whatsapp://"],
        shape: HandleShape::Phone,
        lowercase: false,
    },
    SocialRule {
        platform: SocialPlatform::Vk,
        url_prefixes: &[r"https?://(www\.)?vk\.com/", r"vk\.com/"],
        shape: HandleShape::Handle { charset: "[a-zA-Z0-9._]", length: 3..=32, numeric_ids: true },
        lowercase: true,
    },
    SocialRule {
        platform: SocialPlatform::Linkedin,
        url_prefixes: &[],
        shape: HandleShape::ProfileUrl {
            url_pattern: r"^https?://(www\.)?linkedin\.com/(in|company|pub|profile)/[a-zA-Z0-9-]+",
            slug_charset: "[a-zA-Z0-9-]",
            template: "https://www.linkedin.com/in/",
        },
        lowercase: false,
    },
];

/// Правило с заранее собранными регулярными выражениями
struct CompiledRule {
    rule: &'static SocialRule,
    prefixes: Vec<Regex>,
    accept: Option<Regex>,
    full_url: Option<Regex>,
}

fn compile(rule: &'static SocialRule) -> Result<CompiledRule, regex::Error> {
    let prefixes = rule
        .url_prefixes
        .iter()
        .map(|p| Regex::new(&format!("(?i)^{}", p)))
        .collect::<Result<Vec<_>, _>>()?;
    let (accept, full_url) = match &rule.shape {
        HandleShape::Handle { charset, length, numeric_ids } => {
            let mut pattern = format!("^{}{{{},{}}}$", charset, length.start(), length.end());
            if *numeric_ids {
                pattern.push_str(r"|^\d+$");
            }
            (Some(Regex::new(&pattern)?), None)
        }
        HandleShape::Phone => (None, None),
        HandleShape::ProfileUrl { url_pattern, slug_charset, .. } => (
            Some(Regex::new(&format!("^{}+$", slug_charset))?),
            Some(Regex::new(&format!("(?i){}", url_pattern))?),
        ),
    };
    Ok(CompiledRule { rule, prefixes, accept, full_url })
}

static COMPILED: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    RULES
        .iter()
        .filter_map(|rule| match compile(rule) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::error!("Social rule for {:?} does not compile: {}", rule.platform, e);
                None
            }
        })
        .collect()
});

/// Нормализовать ссылку или имя пользователя в соцсети.
///
/// Отрезаются известные префиксы URL платформы и ведущий `@`, затем значение
/// проверяется по набору символов и длине платформы. WhatsApp разбирается как
/// телефон, короткое имя LinkedIn разворачивается в URL профиля.
pub fn normalize_social_handle(
    raw: &str,
    platform: SocialPlatform,
    region: Option<country::Id>,
) -> Option<String> {
    let compiled = COMPILED.iter().find(|c| c.rule.platform == platform)?;
    let mut cleaned = raw.trim().to_string();
    if cleaned.is_empty() {
        return None;
    }

    for prefix in &compiled.prefixes {
        cleaned = prefix.replace(&cleaned, "").into_owned();
    }

    let normalized = match &compiled.rule.shape {
        HandleShape::Phone => return normalize_phone(&cleaned, region),
        HandleShape::Handle { .. } => {
            let handle = cleaned.strip_prefix('@').unwrap_or(&cleaned);
            if !compiled.accept.as_ref()?.is_match(handle) {
                return None;
            }
            handle.to_string()
        }
        HandleShape::ProfileUrl { template, .. } => {
            if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
                let full_url = compiled.full_url.as_ref()?;
                if !full_url.is_match(&cleaned) {
                    return None;
                }
                cleaned
            } else if compiled.accept.as_ref()?.is_match(&cleaned) {
                format!("{}{}", template, cleaned)
            } else {
                return None;
            }
        }
    };

    if compiled.rule.lowercase {
        Some(normalized.to_lowercase())
    } else {
        Some(normalized)
    }
}
