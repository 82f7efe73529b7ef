use contracts::usecases::u601_import_csv::{
    AutoMappingSuggestion, Delimiter, DistinctValue, EntityType, ImportMeta, ImportResponse,
    PreviewResponse,
};
use phonenumber::country;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::classifier::{self, Lookups};
use super::errors::ImportAbort;
use super::{auto_mapping, commit, decoder, mapping, report};
use super::store::ImportStore;
use crate::shared::config::Config;
use crate::shared::format::format_number;
use crate::shared::logger;
use crate::shared::normalization::parse_region;

/// Параметры импорта из конфигурации
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
    pub region: Option<country::Id>,
    pub default_delimiter: Delimiter,
}

impl ImportSettings {
    pub fn from_config(config: &Config) -> Self {
        let region = parse_region(&config.import.default_region);
        if region.is_none() {
            warn!(
                "Unknown default_region '{}', phones without country code will be rejected",
                config.import.default_region
            );
        }
        let default_delimiter = config
            .import
            .default_delimiter
            .parse()
            .unwrap_or_else(|value| {
                warn!("Unknown default_delimiter '{}', using ','", value);
                Delimiter::Comma
            });
        Self {
            max_upload_bytes: config.import.max_upload_bytes,
            preview_rows: config.import.preview_rows,
            region,
            default_delimiter,
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            preview_rows: 20,
            region: parse_region("RU"),
            default_delimiter: Delimiter::Comma,
        }
    }
}

/// Запрос импорта в том виде, как он пришёл по HTTP
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub entity_type: String,
    pub file: Option<Vec<u8>>,
    pub mapping: Option<String>,
    pub value_mapping: Option<String>,
    pub delimiter: Option<String>,
    pub dry_run: bool,
    /// Кто выполняет импорт (попадает в аудит)
    pub actor: String,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    pub file: Option<Vec<u8>>,
    pub delimiter: Option<String>,
    pub entity_type: Option<String>,
    pub column: Option<String>,
}

pub fn parse_entity(value: &str) -> Result<EntityType, ImportAbort> {
    value
        .parse()
        .map_err(|_| ImportAbort::UnknownSchema(value.to_string()))
}

fn parse_delimiter(value: Option<&str>) -> Result<Option<Delimiter>, ImportAbort> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(ImportAbort::InvalidDelimiter),
    }
}

/// Executor для UseCase импорта CSV
pub struct ImportExecutor<S: ImportStore + ?Sized> {
    store: Arc<S>,
    settings: ImportSettings,
}

impl<S: ImportStore + ?Sized> ImportExecutor<S> {
    pub fn new(store: Arc<S>, settings: ImportSettings) -> Self {
        Self { store, settings }
    }

    fn check_size(&self, file: &[u8]) -> Result<(), ImportAbort> {
        if file.len() > self.settings.max_upload_bytes {
            return Err(ImportAbort::FileTooLarge {
                size: file.len(),
                limit: self.settings.max_upload_bytes,
            });
        }
        if file.is_empty() {
            return Err(ImportAbort::FileEmpty);
        }
        Ok(())
    }

    /// Выполнить импорт: dry-run останавливается после классификации
    pub async fn run(&self, request: ImportRequest) -> Result<ImportResponse, ImportAbort> {
        let entity = parse_entity(&request.entity_type)?;
        let file = request.file.as_deref().ok_or(ImportAbort::FileMissing)?;
        self.check_size(file)?;
        let delimiter = parse_delimiter(request.delimiter.as_deref())?
            .unwrap_or(self.settings.default_delimiter);

        let mapping_json = request
            .mapping
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ImportAbort::MalformedMapping("mapping не передан".into()))?;
        let requested = mapping::parse_mapping(mapping_json, entity)?;
        let values = mapping::parse_value_mapping(request.value_mapping.as_deref(), entity)?;

        let text = decoder::decode_text(file)?;
        let table = decoder::decode(text, delimiter, None)?;
        let resolved = mapping::resolve(&table, &requested, entity)?;

        info!(
            "Import {} started by {}: {} rows, {} bytes, dry_run={}",
            entity,
            request.actor,
            table.total_rows,
            format_number(file.len() as u64),
            request.dry_run
        );

        let keys = classifier::collect_keys(&table, &resolved, entity, self.settings.region);
        let lookups = self.prefetch(entity, &keys).await?;
        let classification =
            classifier::classify(entity, &table, &resolved, &values, &lookups, self.settings.region);

        let committed = if request.dry_run {
            None
        } else {
            if !classification.stages_to_create.is_empty() {
                logger::log(
                    "import",
                    &format!(
                        "Создание этапов воронки: {}",
                        classification
                            .stages_to_create
                            .iter()
                            .map(|s| s.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
            }
            Some(commit::commit(self.store.as_ref(), &request.actor, &classification).await)
        };

        let response = report::build(&table, classification, committed, request.dry_run);
        let s = response.summary;
        let message = format!(
            "Импорт {} ({}): всего {}, создано {}, обновлено {}, ошибок {}, пропущено {}",
            entity,
            if request.dry_run { "проверка" } else { "запись" },
            s.total,
            s.created,
            s.updated,
            s.failed,
            s.skipped
        );
        info!("{}", message);
        logger::log("import", &message);
        Ok(response)
    }

    async fn prefetch(
        &self,
        entity: EntityType,
        keys: &classifier::NaturalKeys,
    ) -> Result<Lookups, ImportAbort> {
        let store = self.store.as_ref();
        let mut lookups = Lookups {
            contacts_by_email: store
                .find_contacts_by_emails(&keys.emails)
                .await
                .map_err(ImportAbort::store)?,
            contacts_by_phone: store
                .find_contacts_by_phones(&keys.phones)
                .await
                .map_err(ImportAbort::store)?,
            ..Default::default()
        };
        if entity == EntityType::Deal {
            lookups.deals_by_number = store
                .find_deals_by_numbers(&keys.numbers)
                .await
                .map_err(ImportAbort::store)?;
            lookups.users = store.list_users().await.map_err(ImportAbort::store)?;
            lookups.pipelines = store.list_pipelines().await.map_err(ImportAbort::store)?;
        }
        Ok(lookups)
    }

    /// Предпросмотр файла: первые строки, подсказки сопоставления,
    /// уникальные значения выбранной колонки
    pub fn preview(&self, request: PreviewRequest) -> Result<PreviewResponse, ImportAbort> {
        let entity = match request.entity_type.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(value) => parse_entity(value)?,
            None => EntityType::Contact,
        };
        let file = request.file.as_deref().ok_or(ImportAbort::FileMissing)?;
        self.check_size(file)?;
        let text = decoder::decode_text(file)?;
        let delimiter = parse_delimiter(request.delimiter.as_deref())?
            .unwrap_or_else(|| Delimiter::detect(decoder::header_line(text)));

        let column = request.column.as_deref().filter(|c| !c.trim().is_empty());
        let limit = if column.is_some() {
            None
        } else {
            Some(self.settings.preview_rows)
        };
        let table = decoder::decode(text, delimiter, limit)?;

        let distinct_values = match column {
            Some(name) => {
                let index = table
                    .column_index(name)
                    .ok_or_else(|| ImportAbort::UnknownColumns(vec![name.to_string()]))?;
                distinct_values(&table, index)
            }
            None => Vec::new(),
        };

        Ok(PreviewResponse {
            suggestions: auto_mapping::suggest(&table.headers, entity),
            rows: table
                .rows
                .iter()
                .take(self.settings.preview_rows)
                .map(|r| r.cells.clone())
                .collect(),
            headers: table.headers,
            total_rows: table.total_rows,
            delimiter,
            warnings: table.warnings,
            distinct_values,
        })
    }

    pub fn meta(&self, entity_type: &str) -> Result<ImportMeta, ImportAbort> {
        Ok(parse_entity(entity_type)?.describe())
    }

    pub fn auto_map(
        &self,
        entity_type: &str,
        columns: &[String],
    ) -> Result<Vec<AutoMappingSuggestion>, ImportAbort> {
        Ok(auto_mapping::suggest(columns, parse_entity(entity_type)?))
    }
}

fn distinct_values(table: &decoder::RawTable, index: usize) -> Vec<DistinctValue> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for row in &table.rows {
        let value = row.cell(index).trim();
        if !value.is_empty() {
            *counts.entry(value.to_string()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(value, count)| DistinctValue { value, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;
    use crate::system::audit;
    use crate::usecases::u601_import_csv::report;
    use crate::usecases::u601_import_csv::store::SeaOrmStore;
    use crate::usecases::u601_import_csv::test_support::{csv, manager, sales_pipeline, MemoryStore};
    use contracts::domain::a101_contact::Contact;
    use contracts::usecases::u601_import_csv::ImportSummary;

    const CONTACT_MAPPING: &str = r#"{"fullName":"Имя","email":"Email","phone":"Телефон"}"#;

    fn russian_contacts() -> Vec<u8> {
        csv(&[
            "Имя,Email,Телефон",
            "Иван Иванов,ivan@example.com,+79991234567",
            "Петр Петров,petr@example.com,+79997654321",
        ])
    }

    fn request(entity: &str, file: Vec<u8>, mapping: &str, dry_run: bool) -> ImportRequest {
        ImportRequest {
            entity_type: entity.into(),
            file: Some(file),
            mapping: Some(mapping.into()),
            dry_run,
            actor: "user-1".into(),
            ..Default::default()
        }
    }

    fn executor(store: Arc<MemoryStore>) -> ImportExecutor<MemoryStore> {
        ImportExecutor::new(store, ImportSettings::default())
    }

    #[tokio::test]
    async fn test_russian_contacts_dry_run_then_commit() {
        let store = Arc::new(MemoryStore::new());
        let executor = executor(store.clone());

        let dry = executor
            .run(request("contacts", russian_contacts(), CONTACT_MAPPING, true))
            .await
            .unwrap();
        assert_eq!(
            dry.summary,
            ImportSummary { total: 2, created: 2, updated: 0, failed: 0, skipped: 0 }
        );
        assert!(dry.errors.is_empty());
        assert!(dry.dry_run);
        assert!(store.contacts().is_empty());
        assert!(store.audit().is_empty());

        let committed = executor
            .run(request("contacts", russian_contacts(), CONTACT_MAPPING, false))
            .await
            .unwrap();
        assert_eq!(committed.summary, dry.summary);
        assert!(!committed.dry_run);

        let contacts = store.contacts();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].display_name(), "Иван Иванов");
        assert_eq!(contacts[0].phone.as_deref(), Some("+79991234567"));
        assert_eq!(contacts[1].email.as_deref(), Some("petr@example.com"));
        assert_eq!(store.audit().len(), 2);
    }

    #[tokio::test]
    async fn test_russian_contacts_persist_to_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::connect(&dir.path().join("import.db")).await.unwrap();
        let executor = ImportExecutor::new(
            Arc::new(SeaOrmStore::new(conn.clone())),
            ImportSettings::default(),
        );

        let file = csv(&[
            "Имя;Email;Телефон",
            "Иван Иванов;IVAN@Example.com;8 (999) 123-45-67",
            "Петр Петров;petr@example.com;+7 999 765-43-21",
        ]);
        let mut req = request("contact", file, CONTACT_MAPPING, false);
        req.delimiter = Some(";".into());
        let response = executor.run(req).await.unwrap();
        assert_eq!(response.summary.created, 2);
        assert!(response.errors.is_empty(), "{:?}", response.errors);

        let ids = crate::domain::a101_contact::repository::find_ids_by_phones(
            &conn,
            &["+79991234567".into(), "+79997654321".into()],
        )
        .await
        .unwrap();
        assert_eq!(ids.len(), 2);
        let ivan: Contact = crate::domain::a101_contact::repository::get_by_id(&conn, &ids["+79991234567"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ivan.email.as_deref(), Some("ivan@example.com"));

        let audit_rows = audit::repository::list_by_action(&conn, audit::ACTION_IMPORTED).await.unwrap();
        assert_eq!(audit_rows.len(), 2);
        assert!(audit_rows.iter().all(|r| r.actor == "user-1" && r.entity_type == "a101_contact"));

        // Повторный импорт того же файла обновляет, а не дублирует
        let again = executor
            .run(request(
                "contact",
                csv(&["Имя,Email", "Иван Иванович,ivan@example.com"]),
                r#"{"fullName":"Имя","email":"Email"}"#,
                false,
            ))
            .await
            .unwrap();
        assert_eq!(again.summary.updated, 1);
        let ivan = crate::domain::a101_contact::repository::get_by_id(&conn, &ids["+79991234567"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ivan.display_name(), "Иван Иванович");
        assert_eq!(ivan.phone.as_deref(), Some("+79991234567"));
    }

    #[tokio::test]
    async fn test_large_file_lookups_fit_sqlite_limits() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::connect(&dir.path().join("large.db")).await.unwrap();
        let executor = ImportExecutor::new(
            Arc::new(SeaOrmStore::new(conn.clone())),
            ImportSettings::default(),
        );

        let mut lines = vec!["Имя,Email".to_string()];
        lines.extend((0..40_000).map(|i| format!("Клиент {i},client{i}@example.com")));
        let file = lines.join("\n").into_bytes();
        assert!(file.len() < ImportSettings::default().max_upload_bytes);

        let response = executor
            .run(request("contacts", file, r#"{"fullName":"Имя","email":"Email"}"#, true))
            .await
            .unwrap();
        assert!(response.global_errors.is_empty());
        assert_eq!(
            response.summary,
            ImportSummary { total: 40_000, created: 40_000, updated: 0, failed: 0, skipped: 0 }
        );
    }

    #[tokio::test]
    async fn test_update_keeps_fields_absent_from_file() {
        let mut existing = Contact::new_for_insert("Ольга".into());
        existing.email = Some("olga@example.com".into());
        existing.position = Some("Бухгалтер".into());
        let store = Arc::new(MemoryStore::new().with_contact(existing));
        let executor = executor(store.clone());

        let response = executor
            .run(request(
                "contacts",
                csv(&["Имя,Email,Компания", "Ольга Смирнова,olga@example.com,ООО Ромашка"]),
                r#"{"fullName":"Имя","email":"Email","companyName":"Компания"}"#,
                false,
            ))
            .await
            .unwrap();
        assert_eq!(response.summary.updated, 1);

        let olga = &store.contacts()[0];
        assert_eq!(olga.display_name(), "Ольга Смирнова");
        assert_eq!(olga.position.as_deref(), Some("Бухгалтер"));
        assert_eq!(olga.company_name.as_deref(), Some("ООО Ромашка"));
        assert_eq!(olga.base.metadata.version, 1);
    }

    #[tokio::test]
    async fn test_malformed_mapping_aborts_without_counts() {
        let executor = executor(Arc::new(MemoryStore::new()));
        let abort = executor
            .run(request("contacts", russian_contacts(), "{not json", false))
            .await
            .unwrap_err();
        assert!(matches!(abort, ImportAbort::MalformedMapping(_)));

        let response = report::rejected(&abort, false);
        assert_eq!(response.summary, ImportSummary::default());
        assert_eq!(response.global_errors.len(), 1);
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_mapping_names_fields() {
        let executor = executor(Arc::new(MemoryStore::new()));
        let abort = executor
            .run(request("deals", csv(&["Номер,Название", "D-1,Сделка"]), r#"{"number":"Номер","title":"Название"}"#, true))
            .await
            .unwrap_err();
        let ImportAbort::MissingRequiredFields(fields) = abort else {
            panic!("unexpected abort {:?}", abort);
        };
        assert_eq!(fields, vec!["amount".to_string(), "pipeline".to_string(), "stage".to_string()]);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_parsing() {
        let store = Arc::new(MemoryStore::new());
        let executor = ImportExecutor::new(
            store,
            ImportSettings {
                max_upload_bytes: 16,
                ..Default::default()
            },
        );
        // Невалидный UTF-8: размер проверяется раньше кодировки
        let mut file = vec![0xFF; 17];
        file.extend_from_slice(b"\n");
        let abort = executor
            .run(request("contacts", file, CONTACT_MAPPING, false))
            .await
            .unwrap_err();
        assert!(matches!(abort, ImportAbort::FileTooLarge { size: 18, limit: 16 }));
    }

    #[tokio::test]
    async fn test_request_level_aborts() {
        let executor = executor(Arc::new(MemoryStore::new()));

        let mut no_file = request("contacts", Vec::new(), CONTACT_MAPPING, true);
        no_file.file = None;
        assert_eq!(executor.run(no_file).await.unwrap_err(), ImportAbort::FileMissing);

        let unknown = executor
            .run(request("tasks", russian_contacts(), CONTACT_MAPPING, true))
            .await
            .unwrap_err();
        assert_eq!(unknown, ImportAbort::UnknownSchema("tasks".into()));

        let mut tab = request("contacts", russian_contacts(), CONTACT_MAPPING, true);
        tab.delimiter = Some("\t".into());
        assert!(matches!(executor.run(tab).await.unwrap_err(), ImportAbort::InvalidDelimiter(_)));

        let unknown_column = executor
            .run(request("contacts", russian_contacts(), r#"{"fullName":"ФИО"}"#, true))
            .await
            .unwrap_err();
        assert_eq!(unknown_column, ImportAbort::UnknownColumns(vec!["ФИО".into()]));
    }

    #[tokio::test]
    async fn test_store_outage_is_internal_abort() {
        let store = Arc::new(MemoryStore::new());
        store.fail_lookups();
        let abort = executor(store)
            .run(request("contacts", russian_contacts(), CONTACT_MAPPING, true))
            .await
            .unwrap_err();
        assert!(abort.is_internal());
    }

    #[tokio::test]
    async fn test_ragged_rows_are_padded_and_reported() {
        let executor = executor(Arc::new(MemoryStore::new()));
        let file = csv(&[
            "Имя,Email,Телефон",
            "Иван,ivan@example.com",
            "Петр,petr@example.com,+79997654321,лишнее",
        ]);
        let response = executor
            .run(request("contacts", file, CONTACT_MAPPING, true))
            .await
            .unwrap();
        assert_eq!(response.summary.created, 2);
        assert_eq!(response.warnings.len(), 2);
        assert!(response.warnings[0].starts_with("Строка 1:"));
        assert!(response.warnings[1].starts_with("Строка 2:"));
    }

    #[tokio::test]
    async fn test_row_numbers_count_data_rows_from_one() {
        let executor = executor(Arc::new(MemoryStore::new()));
        let file = csv(&[
            "Имя,Email,Телефон",
            "Иван,ivan@example.com,",
            ",,",
            ",broken@example.com,",
        ]);
        let response = executor
            .run(request("contacts", file, CONTACT_MAPPING, true))
            .await
            .unwrap();
        assert_eq!(
            response.summary,
            ImportSummary { total: 3, created: 1, updated: 0, failed: 1, skipped: 1 }
        );
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].row, 3);
    }

    #[tokio::test]
    async fn test_deal_import_creates_stage_on_commit_only() {
        let store = Arc::new(MemoryStore::new().with_pipeline(sales_pipeline()).with_user(manager()));
        let executor = executor(store.clone());
        let mapping = r#"{"number":"Номер","title":"Название","amount":"Сумма","pipeline":"Воронка","stage":"Этап","assignedTo":"Ответственный","expectedCloseAt":"Закрытие"}"#;
        let file = || {
            csv(&[
                "Номер,Название,Сумма,Воронка,Этап,Ответственный,Закрытие",
                "D-100,Внедрение,\"1 200 000\",Продажи,Пилот,petrova,31.03.2025",
                "D-101,Поддержка,50000,Продажи,Новая,,",
            ])
        };

        let dry = executor.run(request("deals", file(), mapping, true)).await.unwrap();
        assert_eq!(dry.summary.created, 2);
        assert_eq!(dry.stages_to_create.len(), 1);
        assert_eq!(dry.stages_to_create[0].name, "Пилот");
        assert_eq!(store.pipelines()[0].stages.len(), 2);

        let committed = executor.run(request("deals", file(), mapping, false)).await.unwrap();
        assert_eq!(committed.summary, dry.summary);
        assert_eq!(store.pipelines()[0].stages.len(), 3);

        let deals = store.deals();
        assert_eq!(deals[0].amount, 1_200_000.0);
        assert_eq!(deals[0].assigned_to_id.as_deref(), Some("u-petrova"));
        assert_eq!(deals[0].expected_close_at, chrono::NaiveDate::from_ymd_opt(2025, 3, 31));
        assert_eq!(deals[1].stage_id, "s-new");
    }

    #[test]
    fn test_preview_detects_delimiter_and_limits_rows() {
        let executor = ImportExecutor::new(
            Arc::new(MemoryStore::new()),
            ImportSettings {
                preview_rows: 2,
                ..Default::default()
            },
        );
        let file = csv(&[
            "\u{FEFF}ФИО;Почта;Менеджер",
            "Иван;ivan@example.com;Анна",
            "Петр;petr@example.com;Борис",
            "Олег;oleg@example.com; Анна ",
        ]);

        let preview = executor
            .preview(PreviewRequest {
                file: Some(file.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(preview.delimiter, Delimiter::Semicolon);
        assert_eq!(preview.headers, vec!["ФИО", "Почта", "Менеджер"]);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.total_rows, 3);
        assert!(preview.distinct_values.is_empty());
        let full_name = preview
            .suggestions
            .iter()
            .find(|s| s.column_name == "ФИО")
            .unwrap();
        assert_eq!(full_name.suggested_field.as_deref(), Some("fullName"));

        let distinct = executor
            .preview(PreviewRequest {
                file: Some(file),
                column: Some("Менеджер".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(distinct.rows.len(), 2);
        let values: Vec<(&str, u32)> = distinct
            .distinct_values
            .iter()
            .map(|d| (d.value.as_str(), d.count))
            .collect();
        assert_eq!(values, vec![("Анна", 2), ("Борис", 1)]);
    }

    #[test]
    fn test_meta_and_auto_map_reject_unknown_schema() {
        let executor = executor(Arc::new(MemoryStore::new()));
        let meta = executor.meta("deal").unwrap();
        assert!(meta.fields.iter().any(|f| f.key == "stage" && f.required));
        assert!(matches!(executor.meta("tasks"), Err(ImportAbort::UnknownSchema(_))));

        let suggestions = executor
            .auto_map("contacts", &["Email".to_string(), "Непонятно".to_string()])
            .unwrap();
        assert_eq!(suggestions[0].suggested_field.as_deref(), Some("email"));
        assert_eq!(suggestions[1].suggested_field, None);
    }
}
