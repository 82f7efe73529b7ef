pub mod repository;

/// Действие, которым помечаются записи, созданные или обновлённые импортом
pub const ACTION_IMPORTED: &str = "imported";
