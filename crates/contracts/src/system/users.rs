use serde::{Deserialize, Serialize};

/// Пользователь CRM, на которого можно назначить сделку
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
}

impl User {
    /// Совпадение значения ячейки с пользователем: id, логин, email или ФИО без учёта регистра
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        if self.id == value {
            return true;
        }
        let needle = value.to_lowercase();
        self.username.to_lowercase() == needle
            || self.email.as_deref().is_some_and(|e| e.to_lowercase() == needle)
            || self.full_name.as_deref().is_some_and(|n| n.to_lowercase() == needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_any_display_attribute() {
        let user = User {
            id: "u1".into(),
            username: "ivanov".into(),
            email: Some("Ivan@Example.com".into()),
            full_name: Some("Иван Иванов".into()),
            is_active: true,
        };
        assert!(user.matches("u1"));
        assert!(user.matches("IVANOV"));
        assert!(user.matches("ivan@example.com"));
        assert!(user.matches("иван иванов"));
        assert!(!user.matches(""));
        assert!(!user.matches("Петров"));
    }
}
