use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Схема назначения импорта
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Contact,
    Deal,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Contact => "contact",
            EntityType::Deal => "deal",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contact" | "contacts" => Ok(EntityType::Contact),
            "deal" | "deals" => Ok(EntityType::Deal),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Разделитель полей CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Delimiter {
    #[default]
    #[serde(rename = ",")]
    Comma,
    #[serde(rename = ";")]
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    pub fn as_char(&self) -> char {
        self.as_byte() as char
    }

    /// Выбор разделителя по строке заголовка: `;` только если его больше, чем `,`
    pub fn detect(header_line: &str) -> Self {
        let semicolons = header_line.matches(';').count();
        let commas = header_line.matches(',').count();
        if semicolons > commas {
            Delimiter::Semicolon
        } else {
            Delimiter::Comma
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// `{fieldId: {rawValue: entityId}}` в том виде, как его присылает UI
pub type ValueMappingDto = HashMap<String, HashMap<String, String>>;
