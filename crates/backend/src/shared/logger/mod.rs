pub mod repository;

use repository::log_event_internal;

/// Логирование события на сервере в таблицу `system_log`
///
/// # Примеры
/// ```ignore
/// logger::log("import", "Импорт контактов: 120 строк");
/// ```
pub fn log(category: &str, message: &str) {
    log_event_internal("server", category, message);
}
