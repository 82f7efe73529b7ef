use crate::domain::common::{AggregateId, AggregateRoot, BaseAggregate, Origin};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================
crate::uuid_aggregate_id!(DealId);

// ============================================================================
// Aggregate Root
// ============================================================================

/// Сделка. `base.code` хранит номер сделки (естественный ключ),
/// `base.description` хранит название.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    #[serde(flatten)]
    pub base: BaseAggregate<DealId>,

    pub amount: f64,

    pub budget: Option<f64>,

    #[serde(rename = "pipelineId")]
    pub pipeline_id: String,

    #[serde(rename = "stageId")]
    pub stage_id: String,

    #[serde(rename = "assignedToId")]
    pub assigned_to_id: Option<String>,

    #[serde(rename = "contactId")]
    pub contact_id: Option<String>,

    #[serde(rename = "expectedCloseAt")]
    pub expected_close_at: Option<NaiveDate>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Deal {
    pub fn new_with_id(
        id: DealId,
        number: String,
        title: String,
        amount: f64,
        pipeline_id: String,
        stage_id: String,
    ) -> Self {
        Self {
            base: BaseAggregate::new(id, number, title),
            amount,
            budget: None,
            pipeline_id,
            stage_id,
            assigned_to_id: None,
            contact_id: None,
            expected_close_at: None,
            tags: Vec::new(),
        }
    }

    pub fn number(&self) -> &str {
        &self.base.code
    }

    pub fn title(&self) -> &str {
        &self.base.description
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("Номер сделки не может быть пустым".into());
        }
        if self.base.description.trim().is_empty() {
            return Err("Название сделки не может быть пустым".into());
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err("Сумма сделки должна быть неотрицательным числом".into());
        }
        if self.pipeline_id.is_empty() || self.stage_id.is_empty() {
            return Err("Сделка должна ссылаться на воронку и этап".into());
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
        self.base.metadata.increment_version();
    }

    pub fn mark_imported(&mut self) {
        self.base.origin = Origin::CsvImport;
    }
}

impl AggregateRoot for Deal {
    fn aggregate_index() -> &'static str {
        "a102"
    }

    fn collection_name() -> &'static str {
        "deal"
    }
}
