pub mod aggregate;

pub use aggregate::{stage_name_key, Pipeline, PipelineStage};
