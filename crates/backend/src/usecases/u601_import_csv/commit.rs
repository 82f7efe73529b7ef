//! Фиксация классифицированных строк в хранилище.
//!
//! Каждая строка пишется отдельно: ошибка записи строки K не мешает строке K+1.

use contracts::domain::a101_contact::Contact;
use contracts::domain::a102_deal::Deal;
use contracts::domain::a103_pipeline::stage_name_key;
use contracts::domain::common::AggregateRoot;
use contracts::usecases::u601_import_csv::{ImportError, ImportSummary, ROW_LEVEL_FIELD};
use std::collections::HashMap;
use tracing::warn;

use super::classifier::{ClassifiedRow, Classification, Decision};
use super::record::{ContactPatch, DealPatch, RowRecord, StageRef};
use super::store::{ImportStore, WriteFailure};
use crate::shared::logger;

#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    pub summary: ImportSummary,
    pub errors: Vec<ImportError>,
}

fn stage_key(pipeline_id: &str, name: &str) -> (String, String) {
    (pipeline_id.to_string(), stage_name_key(name))
}

pub struct Committer<'a, S: ImportStore + ?Sized> {
    store: &'a S,
    actor: &'a str,
    /// Результат создания этапов: id или текст ошибки
    stages: HashMap<(String, String), Result<String, String>>,
}

impl<'a, S: ImportStore + ?Sized> Committer<'a, S> {
    pub fn new(store: &'a S, actor: &'a str) -> Self {
        Self {
            store,
            actor,
            stages: HashMap::new(),
        }
    }

    pub async fn commit(mut self, classification: &Classification) -> CommitOutcome {
        for stage in &classification.stages_to_create {
            let result = self
                .store
                .create_stage_if_absent(&stage.pipeline_id, &stage.name, stage.order)
                .await
                .map(|s| s.id)
                .map_err(|e| {
                    warn!("Failed to create stage '{}': {:#}", stage.name, e);
                    format!("Не удалось создать этап «{}»: {}", stage.name, e)
                });
            self.stages.insert(stage_key(&stage.pipeline_id, &stage.name), result);
        }

        let mut outcome = CommitOutcome {
            summary: ImportSummary {
                total: classification.summary.total,
                ..Default::default()
            },
            errors: classification.errors.clone(),
        };

        for row in &classification.rows {
            match (&row.decision, &row.record) {
                (Decision::Skip, _) => outcome.summary.skipped += 1,
                (Decision::Fail, _) | (_, None) => outcome.summary.failed += 1,
                (decision, Some(record)) => match self.write_row(row, decision, record).await {
                    Ok(()) => match decision {
                        Decision::Create { .. } => outcome.summary.created += 1,
                        _ => outcome.summary.updated += 1,
                    },
                    Err(message) => {
                        outcome.summary.failed += 1;
                        outcome.errors.push(write_error(row, message));
                    }
                },
            }
        }

        outcome.errors.sort_by_key(|e| e.row);
        outcome
    }

    async fn write_row(
        &self,
        row: &ClassifiedRow,
        decision: &Decision,
        record: &RowRecord,
    ) -> Result<(), String> {
        let (entity_type, entity_id) = match record {
            RowRecord::Contact(patch) => (
                <Contact as AggregateRoot>::full_name(),
                self.write_contact(decision, patch).await?,
            ),
            RowRecord::Deal(patch) => (
                <Deal as AggregateRoot>::full_name(),
                self.write_deal(decision, patch).await?,
            ),
        };

        if let Err(e) = self.store.append_audit(&entity_type, &entity_id, self.actor).await {
            warn!("Audit failed for {} {} (row {}): {:#}", entity_type, entity_id, row.row, e);
            logger::log(
                "import",
                &format!("Не удалось записать аудит для {} {}: {}", entity_type, entity_id, e),
            );
        }
        Ok(())
    }

    async fn write_contact(&self, decision: &Decision, patch: &ContactPatch) -> Result<String, String> {
        let contact = match decision {
            Decision::Create { id } => {
                let mut contact = patch.create(*id);
                contact.validate()?;
                contact.before_write();
                self.store.insert_contact(&contact).await.map_err(describe)?;
                contact
            }
            Decision::Update { id } => {
                let mut contact = self
                    .store
                    .get_contact(id)
                    .await
                    .map_err(|e| describe(WriteFailure::Other(e)))?
                    .ok_or_else(|| describe(WriteFailure::NotFound(id.clone())))?;
                patch.apply(&mut contact);
                contact.validate()?;
                contact.before_write();
                self.store.update_contact(&contact).await.map_err(describe)?;
                contact
            }
            Decision::Skip | Decision::Fail => return Err("Строка не подлежит записи".into()),
        };
        Ok(contact.to_string_id())
    }

    async fn write_deal(&self, decision: &Decision, patch: &DealPatch) -> Result<String, String> {
        let stage_id = match &patch.stage {
            StageRef::Existing(id) => id.clone(),
            StageRef::Proposed { pipeline_id, name } => {
                match self.stages.get(&stage_key(pipeline_id, name)) {
                    Some(Ok(id)) => id.clone(),
                    Some(Err(message)) => return Err(message.clone()),
                    None => return Err(format!("Этап «{}» не был создан", name)),
                }
            }
        };

        let deal = match decision {
            Decision::Create { id } => {
                let mut deal = patch.create(*id, stage_id);
                deal.validate()?;
                deal.before_write();
                self.store.insert_deal(&deal).await.map_err(describe)?;
                deal
            }
            Decision::Update { id } => {
                let mut deal = self
                    .store
                    .get_deal(id)
                    .await
                    .map_err(|e| describe(WriteFailure::Other(e)))?
                    .ok_or_else(|| describe(WriteFailure::NotFound(id.clone())))?;
                patch.apply(&mut deal, stage_id);
                deal.validate()?;
                deal.before_write();
                self.store.update_deal(&deal).await.map_err(describe)?;
                deal
            }
            Decision::Skip | Decision::Fail => return Err("Строка не подлежит записи".into()),
        };
        Ok(deal.to_string_id())
    }
}

fn describe(failure: WriteFailure) -> String {
    if let WriteFailure::Other(e) = &failure {
        warn!("Import write failed: {:#}", e);
    }
    format!("Ошибка записи: {}", failure)
}

fn write_error(row: &ClassifiedRow, message: String) -> ImportError {
    match &row.key {
        Some((field, value)) => ImportError::new(row.row, message)
            .with_field(field.key())
            .with_value(value),
        None => ImportError::new(row.row, message).with_field(ROW_LEVEL_FIELD),
    }
}

/// Записать все строки классификации
pub async fn commit<S: ImportStore + ?Sized>(
    store: &S,
    actor: &str,
    classification: &Classification,
) -> CommitOutcome {
    Committer::new(store, actor).commit(classification).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::normalization::parse_region;
    use crate::usecases::u601_import_csv::classifier::{classify, Lookups};
    use crate::usecases::u601_import_csv::decoder::decode;
    use crate::usecases::u601_import_csv::mapping::{parse_mapping, resolve, ValueMapping};
    use crate::usecases::u601_import_csv::test_support::{sales_pipeline, MemoryStore};
    use contracts::usecases::u601_import_csv::{Delimiter, EntityType};

    fn classify_text(entity: EntityType, text: &str, mapping: &str, lookups: &Lookups) -> Classification {
        let table = decode(text, Delimiter::Comma, None).unwrap();
        let requested = parse_mapping(mapping, entity).unwrap();
        let resolved = resolve(&table, &requested, entity).unwrap();
        classify(entity, &table, &resolved, &ValueMapping::default(), lookups, parse_region("RU"))
    }

    #[tokio::test]
    async fn test_write_failure_does_not_block_next_rows() {
        let store = MemoryStore::new();
        store.fail_writes_for("b@example.com");
        let classification = classify_text(
            EntityType::Contact,
            "Имя,Email\nА,a@example.com\nБ,b@example.com\nВ,c@example.com",
            r#"{"fullName":"Имя","email":"Email"}"#,
            &Lookups::default(),
        );
        assert_eq!(classification.summary.created, 3);

        let outcome = commit(&store, "user-1", &classification).await;

        assert_eq!(
            outcome.summary,
            ImportSummary { total: 3, created: 2, updated: 0, failed: 1, skipped: 0 }
        );
        assert_eq!(outcome.errors.len(), 1);
        let error = &outcome.errors[0];
        assert_eq!(error.row, 2);
        assert_eq!(error.field.as_deref(), Some("email"));
        assert_eq!(error.value.as_deref(), Some("b@example.com"));

        let emails: Vec<_> = store.contacts().into_iter().filter_map(|c| c.email).collect();
        assert_eq!(emails, vec!["a@example.com".to_string(), "c@example.com".to_string()]);
        let audit = store.audit();
        assert_eq!(audit.len(), 2);
        assert!(audit.iter().all(|(entity, _, actor)| entity == "a101_contact" && actor == "user-1"));
    }

    #[tokio::test]
    async fn test_audit_failure_keeps_row_committed() {
        let store = MemoryStore::new();
        store.fail_audit();
        let classification = classify_text(
            EntityType::Contact,
            "Имя,Email\nА,a@example.com",
            r#"{"fullName":"Имя","email":"Email"}"#,
            &Lookups::default(),
        );

        let outcome = commit(&store, "user-1", &classification).await;

        assert_eq!(
            outcome.summary,
            ImportSummary { total: 1, created: 1, updated: 0, failed: 0, skipped: 0 }
        );
        assert!(outcome.errors.is_empty());
        assert_eq!(store.contacts().len(), 1);
        assert!(store.audit().is_empty());
    }

    #[tokio::test]
    async fn test_proposed_stage_is_materialized_before_rows() {
        let store = MemoryStore::new().with_pipeline(sales_pipeline());
        let lookups = Lookups {
            pipelines: store.pipelines(),
            ..Default::default()
        };
        let classification = classify_text(
            EntityType::Deal,
            "Номер,Название,Сумма,Воронка,Этап\nD-1,Сделка,100,Продажи,Счёт выставлен\nD-2,Ещё,50,Продажи,счёт выставлен",
            r#"{"number":"Номер","title":"Название","amount":"Сумма","pipeline":"Воронка","stage":"Этап"}"#,
            &lookups,
        );
        assert_eq!(classification.stages_to_create.len(), 1);

        let outcome = commit(&store, "user-1", &classification).await;
        assert_eq!(outcome.summary.created, 2);
        assert!(outcome.errors.is_empty());

        let pipeline = &store.pipelines()[0];
        let stage = pipeline.find_stage("Счёт выставлен").unwrap();
        assert_eq!(stage.order, 2);
        assert!(store.deals().iter().all(|d| d.stage_id == stage.id));
    }

    #[tokio::test]
    async fn test_failed_stage_creation_fails_only_dependent_rows() {
        let store = MemoryStore::new().with_pipeline(sales_pipeline());
        store.fail_stage_creation();
        let lookups = Lookups {
            pipelines: store.pipelines(),
            ..Default::default()
        };
        let classification = classify_text(
            EntityType::Deal,
            "Номер,Название,Сумма,Воронка,Этап\nD-1,Новая стадия,100,Продажи,Пилот\nD-2,Старая стадия,50,Продажи,Новая",
            r#"{"number":"Номер","title":"Название","amount":"Сумма","pipeline":"Воронка","stage":"Этап"}"#,
            &lookups,
        );

        let outcome = commit(&store, "user-1", &classification).await;
        assert_eq!(outcome.summary.created, 1);
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.errors[0].row, 1);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("number"));
        assert!(outcome.errors[0].error.contains("Пилот"));
        assert_eq!(store.deals()[0].number(), "D-2");
    }
}
