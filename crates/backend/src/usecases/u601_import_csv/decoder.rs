use contracts::usecases::u601_import_csv::Delimiter;

use super::errors::ImportAbort;

/// Сколько структурных предупреждений попадает в ответ; остальные только считаются
const MAX_STRUCTURAL_WARNINGS: usize = 100;

/// Строка данных: номер (с 1, без учёта заголовка) и ячейки, выровненные по заголовкам
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub number: u32,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Разобранный файл: заголовки и строки с сырыми значениями
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Число строк данных в файле (может быть больше `rows.len()` при ограничении)
    pub total_rows: u32,
    pub warnings: Vec<String>,
}

impl RawTable {
    /// Индекс колонки: точное совпадение, затем без учёта регистра и пробелов по краям
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name).or_else(|| {
            let needle = name.trim().to_lowercase();
            self.headers
                .iter()
                .position(|h| h.trim().to_lowercase() == needle)
        })
    }
}

/// Байты файла в текст: только UTF-8, BOM отбрасывается
pub fn decode_text(bytes: &[u8]) -> Result<&str, ImportAbort> {
    let text = std::str::from_utf8(bytes).map_err(|e| ImportAbort::InvalidEncoding(e.to_string()))?;
    Ok(text.trim_start_matches('\u{FEFF}'))
}

/// Первая строка текста (для определения разделителя)
pub fn header_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Ошибка чтения записи: битая кодировка отдельно от прочих ошибок разбора
fn record_error(err: csv::Error) -> ImportAbort {
    match err.kind() {
        csv::ErrorKind::Utf8 { .. } => ImportAbort::InvalidEncoding(err.to_string()),
        _ => ImportAbort::MalformedCsv(err.to_string()),
    }
}

/// Разобрать CSV.
///
/// Кавычки экранируют разделители и переводы строк, удвоенная кавычка внутри
/// кавычек даёт одну литеральную. Полностью пустые строки пропускаются. Строки с
/// другим числом полей дополняются пустыми значениями или обрезаются, а в
/// `warnings` добавляется структурное предупреждение. `row_limit` ограничивает
/// число сохраняемых строк, но `total_rows` считает все.
pub fn decode(
    text: &str,
    delimiter: Delimiter,
    row_limit: Option<usize>,
) -> Result<RawTable, ImportAbort> {
    if text.trim().is_empty() {
        return Err(ImportAbort::FileEmpty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(|h| h.trim().to_string()).collect(),
        Some(Err(e)) => return Err(record_error(e)),
        None => return Err(ImportAbort::FileEmpty),
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportAbort::NoHeaders);
    }

    let mut table = RawTable {
        headers,
        ..Default::default()
    };
    let width = table.headers.len();
    let mut ragged = 0usize;

    for result in records {
        let record = result.map_err(record_error)?;
        table.total_rows += 1;
        let number = table.total_rows;

        if record.len() != width {
            ragged += 1;
            let message = if record.len() < width {
                format!(
                    "Строка {}: ожидалось полей {}, получено {}; недостающие значения оставлены пустыми",
                    number,
                    width,
                    record.len()
                )
            } else {
                format!(
                    "Строка {}: ожидалось полей {}, получено {}; лишние значения отброшены",
                    number,
                    width,
                    record.len()
                )
            };
            tracing::warn!("CSV structure: {}", message);
            if table.warnings.len() < MAX_STRUCTURAL_WARNINGS {
                table.warnings.push(message);
            }
        }

        if row_limit.is_some_and(|limit| table.rows.len() >= limit) {
            continue;
        }

        let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        cells.resize(width, String::new());
        table.rows.push(RawRow { number, cells });
    }

    if ragged > MAX_STRUCTURAL_WARNINGS {
        table.warnings.push(format!(
            "Ещё строк с неверным числом полей: {}",
            ragged - MAX_STRUCTURAL_WARNINGS
        ));
    }

    Ok(table)
}
