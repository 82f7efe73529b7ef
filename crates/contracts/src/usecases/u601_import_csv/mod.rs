//! DTO импорта CSV: запрос, метаданные полей, предпросмотр и отчёт

pub mod meta;
pub mod preview;
pub mod request;
pub mod response;

pub use meta::{
    AutoMapRequest, AutoMappingSuggestion, FieldDescriptor, FieldKind, FieldSpec, ImportField,
    ImportMeta,
};
pub use preview::{DistinctValue, PreviewResponse};
pub use request::{Delimiter, EntityType, ValueMappingDto};
pub use response::{
    ImportError, ImportResponse, ImportSummary, StageToCreate, MAX_ERROR_VALUE_CHARS,
    ROW_LEVEL_FIELD,
};
