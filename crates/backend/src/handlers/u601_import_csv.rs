use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contracts::usecases::u601_import_csv::{
    AutoMapRequest, AutoMappingSuggestion, ImportMeta, ImportResponse, PreviewResponse,
};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::sync::Arc;

use crate::shared::config;
use crate::shared::data::db::get_connection;
use crate::system::auth::extractor::CurrentUser;
use crate::usecases::u601_import_csv::{
    report, ImportAbort, ImportExecutor, ImportRequest, ImportSettings, PreviewRequest,
    SeaOrmStore,
};

static IMPORT_EXECUTOR: OnceCell<ImportExecutor<SeaOrmStore>> = OnceCell::new();

fn executor() -> anyhow::Result<&'static ImportExecutor<SeaOrmStore>> {
    IMPORT_EXECUTOR.get_or_try_init(|| {
        let conn = get_connection()?.clone();
        let settings = ImportSettings::from_config(config::get()?);
        Ok(ImportExecutor::new(Arc::new(SeaOrmStore::new(conn)), settings))
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    pub dry_run: Option<bool>,
    pub entity_type: Option<String>,
}

pub fn status_for(abort: &ImportAbort) -> StatusCode {
    match abort {
        ImportAbort::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ImportAbort::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn abort_response(abort: &ImportAbort, dry_run: bool) -> Response {
    if abort.is_internal() {
        tracing::error!("Import aborted: {}", abort);
    } else {
        tracing::info!("Import rejected: {}", abort);
    }
    (status_for(abort), Json(report::rejected(abort, dry_run))).into_response()
}

fn unavailable(e: anyhow::Error) -> ImportAbort {
    ImportAbort::store(e)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Поля multipart-запроса импорта и предпросмотра
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    mapping: Option<String>,
    value_mapping: Option<String>,
    delimiter: Option<String>,
    dry_run: Option<bool>,
    column: Option<String>,
    entity_type: Option<String>,
}

/// Разбор multipart. Ошибка транспорта превращается в ответ с тем же статусом.
async fn read_form(multipart: &mut Multipart, dry_run: bool) -> Result<UploadForm, Response> {
    let mut form = UploadForm::default();
    let reject = |e: axum::extract::multipart::MultipartError| {
        let status = e.status();
        tracing::warn!("Multipart read failed ({}): {}", status, e.body_text());
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Файл превышает допустимый размер".to_string()
        } else {
            format!("Некорректный запрос: {}", e.body_text())
        };
        (status, Json(ImportResponse::rejected(message, dry_run))).into_response()
    };

    while let Some(field) = multipart.next_field().await.map_err(reject)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => form.file = Some(field.bytes().await.map_err(reject)?.to_vec()),
            "mapping" => form.mapping = Some(field.text().await.map_err(reject)?),
            "valueMapping" => form.value_mapping = Some(field.text().await.map_err(reject)?),
            "delimiter" => form.delimiter = Some(field.text().await.map_err(reject)?),
            "dryRun" => form.dry_run = Some(parse_flag(&field.text().await.map_err(reject)?)),
            "column" => form.column = Some(field.text().await.map_err(reject)?),
            "entityType" => form.entity_type = Some(field.text().await.map_err(reject)?),
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }
    Ok(form)
}

/// POST /api/import/:entity_type
pub async fn import(
    user: CurrentUser,
    Path(entity_type): Path<String>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Response {
    let query_dry_run = query.dry_run.unwrap_or(false);
    let form = match read_form(&mut multipart, query_dry_run).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let dry_run = form.dry_run.unwrap_or(query_dry_run);

    let executor = match executor() {
        Ok(executor) => executor,
        Err(e) => return abort_response(&unavailable(e), dry_run),
    };

    let request = ImportRequest {
        entity_type,
        file: form.file,
        mapping: form.mapping,
        value_mapping: form.value_mapping,
        delimiter: form.delimiter,
        dry_run,
        actor: user.actor().to_string(),
    };
    match executor.run(request).await {
        Ok(response) => Json(response).into_response(),
        Err(abort) => abort_response(&abort, dry_run),
    }
}

/// POST /api/import/preview
pub async fn preview(
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, Response> {
    let form = read_form(&mut multipart, false).await?;
    let executor = executor().map_err(|e| abort_response(&unavailable(e), false))?;
    let request = PreviewRequest {
        file: form.file,
        delimiter: form.delimiter,
        entity_type: form.entity_type.or(query.entity_type),
        column: form.column,
    };
    executor
        .preview(request)
        .map(Json)
        .map_err(|abort| abort_response(&abort, false))
}

/// GET /api/import/meta?entityType=
pub async fn meta(Query(query): Query<ImportQuery>) -> Result<Json<ImportMeta>, Response> {
    let executor = executor().map_err(|e| abort_response(&unavailable(e), false))?;
    executor
        .meta(query.entity_type.as_deref().unwrap_or_default())
        .map(Json)
        .map_err(|abort| abort_response(&abort, false))
}

/// POST /api/import/auto-map?entityType=
pub async fn auto_map(
    Query(query): Query<ImportQuery>,
    Json(request): Json<AutoMapRequest>,
) -> Result<Json<Vec<AutoMappingSuggestion>>, Response> {
    let executor = executor().map_err(|e| abort_response(&unavailable(e), false))?;
    executor
        .auto_map(query.entity_type.as_deref().unwrap_or_default(), &request.columns)
        .map(Json)
        .map_err(|abort| abort_response(&abort, false))
}
