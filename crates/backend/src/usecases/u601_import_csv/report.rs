use contracts::usecases::u601_import_csv::ImportResponse;

use super::classifier::Classification;
use super::commit::CommitOutcome;
use super::decoder::RawTable;
use super::errors::ImportAbort;

/// Отчёт по результатам классификации и (если была) фиксации.
///
/// Предупреждения разбора файла идут первыми, за ними предупреждения строк.
pub fn build(
    table: &RawTable,
    classification: Classification,
    committed: Option<CommitOutcome>,
    dry_run: bool,
) -> ImportResponse {
    let mut warnings = table.warnings.clone();
    warnings.extend(classification.warnings);

    let (summary, errors) = match committed {
        Some(outcome) => (outcome.summary, outcome.errors),
        None => (classification.summary, classification.errors),
    };

    ImportResponse {
        summary,
        errors,
        warnings,
        global_errors: Vec::new(),
        stages_to_create: classification.stages_to_create,
        dry_run,
    }
}

/// Отчёт для импорта, прерванного до обработки строк
pub fn rejected(abort: &ImportAbort, dry_run: bool) -> ImportResponse {
    ImportResponse::rejected(abort.to_string(), dry_run)
}
