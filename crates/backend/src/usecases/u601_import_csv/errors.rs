use thiserror::Error;

/// Причины, по которым импорт отклоняется целиком, не обработав ни одной строки
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportAbort {
    #[error("Файл не передан")]
    FileMissing,

    #[error("Файл слишком большой: {size} байт при допустимых {limit} байт")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Файл пуст")]
    FileEmpty,

    #[error("В файле нет строки заголовков")]
    NoHeaders,

    #[error("Файл должен быть в кодировке UTF-8: {0}")]
    InvalidEncoding(String),

    #[error("Не удалось разобрать CSV: {0}")]
    MalformedCsv(String),

    #[error("Некорректный JSON сопоставления колонок: {0}")]
    MalformedMapping(String),

    #[error("Некорректный JSON сопоставления значений: {0}")]
    MalformedValueMapping(String),

    #[error("Поле «{0}» сопоставлено нескольким колонкам")]
    DuplicateFieldMapping(String),

    #[error("Колонки отсутствуют в файле: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),

    #[error("Не сопоставлены обязательные поля: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("Неизвестный тип импортируемых данных: {0}")]
    UnknownSchema(String),

    #[error("Недопустимый разделитель «{0}», ожидается «,» или «;»")]
    InvalidDelimiter(String),

    #[error("Хранилище недоступно: {0}")]
    StoreUnavailable(String),
}

impl ImportAbort {
    /// Ошибка со стороны сервера, а не входных данных
    pub fn is_internal(&self) -> bool {
        matches!(self, ImportAbort::StoreUnavailable(_))
    }

    pub fn store(err: anyhow::Error) -> Self {
        ImportAbort::StoreUnavailable(format!("{:#}", err))
    }
}
