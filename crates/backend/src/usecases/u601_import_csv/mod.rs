//! Массовый импорт контактов и сделок из CSV.
//!
//! Конвейер: decoder -> mapping -> classifier (нормализация и решение по строке)
//! -> commit -> report. Dry-run останавливается перед commit.

pub mod auto_mapping;
pub mod classifier;
pub mod commit;
pub mod decoder;
pub mod errors;
pub mod executor;
pub mod mapping;
pub mod record;
pub mod report;
pub mod store;

#[cfg(test)]
pub mod test_support;

pub use errors::ImportAbort;
pub use executor::{ImportExecutor, ImportRequest, ImportSettings, PreviewRequest};
pub use store::{ImportStore, SeaOrmStore, WriteFailure};
