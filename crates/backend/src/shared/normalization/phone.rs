use phonenumber::country;
use phonenumber::Mode;

/// Код региона ISO 3166-1 alpha-2, неизвестный код даёт `None`
pub fn parse_region(code: &str) -> Option<country::Id> {
    code.trim().to_uppercase().parse().ok()
}

/// Номер в формате E.164, если он разбирается и валиден для региона
pub fn normalize_phone(raw: &str, region: Option<country::Id>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match phonenumber::parse(region, trimmed) {
        Ok(number) => to_e164(&number),
        Err(_) => {
            // Повторная попытка только по цифрам и плюсу
            let cleaned: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            phonenumber::parse(region, &cleaned)
                .ok()
                .and_then(|number| to_e164(&number))
        }
    }
}

fn to_e164(number: &phonenumber::PhoneNumber) -> Option<String> {
    if !phonenumber::is_valid(number) {
        return None;
    }
    Some(number.format().mode(Mode::E164).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ru() -> Option<country::Id> {
        parse_region("ru")
    }

    #[test]
    fn test_region_parsing() {
        assert!(parse_region("RU").is_some());
        assert!(parse_region("ZZZ").is_none());
    }

    #[test]
    fn test_russian_formats_become_e164() {
        for raw in ["+7 999 123-45-67", "8 (999) 123-45-67", "+79991234567", " 9991234567 "] {
            assert_eq!(normalize_phone(raw, ru()).as_deref(), Some("+79991234567"), "{}", raw);
        }
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert_eq!(normalize_phone("", ru()), None);
        assert_eq!(normalize_phone("12", ru()), None);
        assert_eq!(normalize_phone("телефон", ru()), None);
    }

    #[test]
    fn test_phone_is_idempotent() {
        let once = normalize_phone("8 (999) 765-43-21", ru()).unwrap();
        assert_eq!(normalize_phone(&once, ru()), Some(once.clone()));
        assert_eq!(normalize_phone(&once, None), Some(once));
    }
}
