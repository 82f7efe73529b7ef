use contracts::usecases::u601_import_csv::{AutoMappingSuggestion, EntityType, ImportField};

const EXACT: f32 = 1.0;
const SYNONYM: f32 = 0.8;
const PARTIAL: f32 = 0.6;

/// Короче этого частичное совпадение не засчитывается
const MIN_PARTIAL_LEN: usize = 3;

/// Синонимы заголовков колонок. Сравниваются после `normalize`, поэтому
/// русские варианты записаны как есть.
fn synonyms(field: ImportField) -> &'static [&'static str] {
    match field {
        ImportField::FullName => &[
            "name", "full name", "fio", "contact name", "person name", "имя", "фио",
            "полное имя", "контакт", "клиент",
        ],
        ImportField::Email => &[
            "e-mail", "mail", "email address", "почта", "электронная почта", "эл почта",
        ],
        ImportField::Phone => &[
            "tel", "telephone", "mobile", "cell", "cellphone", "phone number", "телефон",
            "мобильный", "номер телефона", "тел",
        ],
        ImportField::CompanyName => &[
            "company", "organization", "organisation", "org", "компания", "организация",
        ],
        ImportField::Position => &["job title", "job", "role", "title", "должность"],
        ImportField::Tags => &["tag", "labels", "label", "categories", "category", "теги", "метки"],
        ImportField::Notes => &[
            "note", "comments", "comment", "description", "remarks", "заметки", "комментарий",
            "примечание",
        ],
        ImportField::Telegram => &["tg", "telegram username", "телеграм", "телеграмм"],
        ImportField::Instagram => &["insta", "ig", "инстаграм"],
        ImportField::Whatsapp => &["wa", "whats app", "whatsapp number", "ватсап"],
        ImportField::Vk => &["vkontakte", "vk id", "vk page", "вконтакте", "вк"],
        ImportField::Linkedin => &["linked in", "линкедин"],
        ImportField::Number => &["deal number", "deal id", "номер", "номер сделки", "№"],
        ImportField::Title => &["deal title", "name", "deal name", "название", "сделка"],
        ImportField::Amount => &["sum", "value", "price", "cost", "total", "deal amount", "сумма", "стоимость"],
        ImportField::Budget => &["planned", "planned amount", "бюджет"],
        ImportField::Description => &["desc", "details", "deal description", "описание"],
        ImportField::ExpectedCloseAt => &[
            "expected close", "expected close date", "close date", "closing date", "deadline",
            "дата закрытия", "срок",
        ],
        ImportField::Pipeline => &["pipeline id", "funnel", "воронка"],
        ImportField::Stage => &["stage id", "status", "этап", "стадия", "статус"],
        ImportField::AssignedTo => &[
            "assigned to id", "owner", "responsible", "manager", "ответственный", "менеджер",
        ],
        ImportField::ContactEmail => &["contact email", "client email", "email контакта"],
        ImportField::ContactPhone => &["contact phone", "client phone", "телефон контакта"],
    }
}

fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d", 'е' => "e", 'ё' => "e",
        'ж' => "zh", 'з' => "z", 'и' => "i", 'й' => "y", 'к' => "k", 'л' => "l", 'м' => "m",
        'н' => "n", 'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t", 'у' => "u",
        'ф' => "f", 'х' => "h", 'ц' => "ts", 'ч' => "ch", 'ш' => "sh", 'щ' => "sch",
        'ъ' => "", 'ы' => "y", 'ь' => "", 'э' => "e", 'ю' => "yu", 'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Нижний регистр, транслитерация кириллицы, без пробелов и символов `_ - .`
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() || matches!(c, '_' | '-' | '.') {
            continue;
        }
        match transliterate(c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn score(column: &str, field: ImportField) -> f32 {
    if column.is_empty() {
        return 0.0;
    }
    let key = normalize(field.key());
    if column == key {
        return EXACT;
    }
    if synonyms(field).iter().any(|s| normalize(s) == column) {
        return SYNONYM;
    }
    let shorter = column.len().min(key.len());
    if shorter >= MIN_PARTIAL_LEN && (column.contains(&key) || key.contains(column)) {
        return PARTIAL;
    }
    0.0
}

/// Предложить поле для каждой колонки. При равной уверенности побеждает
/// поле, стоящее в схеме раньше.
pub fn suggest(columns: &[String], entity: EntityType) -> Vec<AutoMappingSuggestion> {
    columns
        .iter()
        .map(|column_name| {
            let normalized = normalize(column_name);
            let mut best: Option<(ImportField, f32)> = None;
            for spec in entity.fields() {
                let confidence = score(&normalized, spec.field);
                if confidence > 0.0 && best.map_or(true, |(_, c)| confidence > c) {
                    best = Some((spec.field, confidence));
                }
            }
            AutoMappingSuggestion {
                column_name: column_name.clone(),
                suggested_field: best.map(|(f, _)| f.key().to_string()),
                confidence: best.map_or(0.0, |(_, c)| c),
            }
        })
        .collect()
}
