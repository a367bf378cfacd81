//! Route handlers.

use crate::auth::Actor;
use crate::dto::{
    AdmissionReq, ArchiveReq, HealthRes, ListParams, NextSerialRes, OptionsRes, RecordListRes,
    RecordRes,
};
use crate::error::{ApiError, ErrorBody};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use chrono::NaiveDate;
use ward_core::export::export_title;
use ward_core::validation::{parse_date, Field};
use ward_core::view::{CensusFilter, DateRange};
use ward_core::{AdmissionForm, Collection, OperationContext, Unit, ValidationErrors};

fn parse_unit(unit: &str) -> Result<Unit, ApiError> {
    unit.parse::<Unit>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn context(unit: &str, actor: Actor) -> Result<OperationContext, ApiError> {
    Ok(OperationContext::new(parse_unit(unit)?, actor.role))
}

fn parse_query_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_date(v)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {name} date: '{v}'"))),
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// An empty body means no date of death was supplied. Any other body must be an
/// `application/json` archive request.
fn archive_body(headers: &HeaderMap, body: &Bytes) -> Result<ArchiveReq, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ArchiveReq::default());
    }
    if !is_json_content_type(headers) {
        return Err(ApiError::BadRequest(
            "request body must be sent as application/json".into(),
        ));
    }
    Json::<ArchiveReq>::from_bytes(body)
        .map(|Json(req)| req)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn require_admin(actor: Actor) -> Result<(), ApiError> {
    if actor.role.is_admin() {
        return Ok(());
    }
    Err(ApiError::Forbidden(format!(
        "role {} may not delete records",
        actor.role
    )))
}

async fn list(
    state: &AppState,
    collection: Collection,
    unit: &str,
    params: ListParams,
) -> Result<Json<RecordListRes>, ApiError> {
    let unit = parse_unit(unit)?;
    let range = DateRange::new(
        parse_query_date(params.from.as_deref(), "from")?,
        parse_query_date(params.to.as_deref(), "to")?,
    )?;

    let set = state.service.working_set(collection, unit).await?;
    let today = state.service.today();
    let filter = CensusFilter::new()
        .search(params.search.as_deref().unwrap_or_default())
        .within(range);
    let records = filter
        .apply(set.records(), today)
        .into_iter()
        .map(|record| RecordRes::from_record(record, today))
        .collect();

    Ok(Json(RecordListRes {
        unit: unit.to_string(),
        title: export_title(unit, collection),
        next_serial: set.next_serial(),
        total: set.len(),
        records,
    }))
}

async fn next_serial(
    state: &AppState,
    collection: Collection,
    unit: &str,
) -> Result<Json<NextSerialRes>, ApiError> {
    let unit = parse_unit(unit)?;
    let serial_no = state.service.next_serial(collection, unit).await?;
    Ok(Json(NextSerialRes { serial_no }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Ward REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/options",
    responses(
        (status = 200, description = "Units and admission form choices", body = OptionsRes),
        (status = 401, description = "Missing or invalid API key", body = ErrorBody)
    )
)]
/// Units and the choices offered by the admission form.
#[axum::debug_handler(state = AppState)]
pub async fn options(_actor: Actor) -> Json<OptionsRes> {
    Json(OptionsRes::current())
}

#[utoipa::path(
    get,
    path = "/units/{unit}/census",
    params(("unit" = String, Path, description = "Clinical unit, e.g. ICU"), ListParams),
    responses(
        (status = 200, description = "Live census, serial descending", body = RecordListRes),
        (status = 400, description = "Unknown unit or bad date", body = ErrorBody),
        (status = 401, description = "Missing or invalid API key", body = ErrorBody)
    )
)]
/// List a unit's live census.
#[axum::debug_handler(state = AppState)]
pub async fn list_census(
    State(state): State<AppState>,
    _actor: Actor,
    Path(unit): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecordListRes>, ApiError> {
    list(&state, Collection::Census, &unit, params).await
}

#[utoipa::path(
    get,
    path = "/units/{unit}/census/next-serial",
    params(("unit" = String, Path, description = "Clinical unit")),
    responses(
        (status = 200, description = "Serial the next admission would receive", body = NextSerialRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn census_next_serial(
    State(state): State<AppState>,
    _actor: Actor,
    Path(unit): Path<String>,
) -> Result<Json<NextSerialRes>, ApiError> {
    next_serial(&state, Collection::Census, &unit).await
}

#[utoipa::path(
    post,
    path = "/units/{unit}/census",
    params(("unit" = String, Path, description = "Clinical unit")),
    request_body = AdmissionReq,
    responses(
        (status = 201, description = "Patient admitted", body = RecordRes),
        (status = 403, description = "Role may not manage records", body = ErrorBody),
        (status = 422, description = "Field-level validation errors", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// Admit a patient into a unit's live census.
#[axum::debug_handler(state = AppState)]
pub async fn admit(
    State(state): State<AppState>,
    actor: Actor,
    Path(unit): Path<String>,
    Json(req): Json<AdmissionReq>,
) -> Result<(StatusCode, Json<RecordRes>), ApiError> {
    let ctx = context(&unit, actor)?;
    let record = state.service.admit(&ctx, &AdmissionForm::from(req)).await?;
    let today = state.service.today();
    Ok((StatusCode::CREATED, Json(RecordRes::from_record(&record, today))))
}

#[utoipa::path(
    put,
    path = "/units/{unit}/census/{id}",
    params(
        ("unit" = String, Path, description = "Clinical unit"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = AdmissionReq,
    responses(
        (status = 200, description = "Record saved", body = RecordRes),
        (status = 404, description = "No such record", body = ErrorBody),
        (status = 422, description = "Field-level validation errors", body = ErrorBody)
    )
)]
/// Save an edited census record. A discharge date marks it Discharged.
#[axum::debug_handler(state = AppState)]
pub async fn update_census(
    State(state): State<AppState>,
    actor: Actor,
    Path((unit, id)): Path<(String, String)>,
    Json(req): Json<AdmissionReq>,
) -> Result<Json<RecordRes>, ApiError> {
    let ctx = context(&unit, actor)?;
    let record = state.service.find(Collection::Census, &id).await?;
    let updated = state
        .service
        .update(&ctx, &record, &AdmissionForm::from(req))
        .await?;
    Ok(Json(RecordRes::from_record(&updated, state.service.today())))
}

#[utoipa::path(
    post,
    path = "/units/{unit}/census/{id}/archive",
    params(
        ("unit" = String, Path, description = "Clinical unit"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = ArchiveReq,
    responses(
        (status = 200, description = "Record moved to the mortality archive", body = RecordRes),
        (status = 400, description = "Body is not a JSON archive request", body = ErrorBody),
        (status = 404, description = "No such census record", body = ErrorBody),
        (status = 500, description = "Archive written but census record not removed", body = ErrorBody)
    )
)]
/// Archive a census record as deceased.
#[axum::debug_handler(state = AppState)]
pub async fn archive(
    State(state): State<AppState>,
    actor: Actor,
    Path((unit, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RecordRes>, ApiError> {
    let ctx = context(&unit, actor)?;
    let req = archive_body(&headers, &body)?;

    let date_of_death = match req.date_of_death.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => match parse_date(value) {
            Some(date) => Some(date),
            None => {
                let mut errors = ValidationErrors::new();
                errors.insert(Field::DischargeDate, "Invalid date.");
                return Err(ApiError::Validation(errors));
            }
        },
    };

    let record = state.service.find(Collection::Census, &id).await?;
    let archived = state.service.archive(&ctx, &record, date_of_death).await?;
    Ok(Json(RecordRes::from_record(&archived, state.service.today())))
}

#[utoipa::path(
    delete,
    path = "/units/{unit}/census/{id}",
    params(
        ("unit" = String, Path, description = "Clinical unit"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Only admins may delete", body = ErrorBody),
        (status = 404, description = "No such record", body = ErrorBody)
    )
)]
/// Permanently delete a census record. Admin only.
#[axum::debug_handler(state = AppState)]
pub async fn delete_census(
    State(state): State<AppState>,
    actor: Actor,
    Path((unit, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    delete(&state, actor, Collection::Census, &unit, &id).await
}

#[utoipa::path(
    get,
    path = "/units/{unit}/mortality",
    params(("unit" = String, Path, description = "Clinical unit"), ListParams),
    responses(
        (status = 200, description = "Mortality archive; date filters apply to date of death", body = RecordListRes)
    )
)]
/// List a unit's mortality archive.
#[axum::debug_handler(state = AppState)]
pub async fn list_mortality(
    State(state): State<AppState>,
    _actor: Actor,
    Path(unit): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecordListRes>, ApiError> {
    list(&state, Collection::Mortality, &unit, params).await
}

#[utoipa::path(
    get,
    path = "/units/{unit}/mortality/next-serial",
    params(("unit" = String, Path, description = "Clinical unit")),
    responses(
        (status = 200, description = "Next archive serial (M-prefixed)", body = NextSerialRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn mortality_next_serial(
    State(state): State<AppState>,
    _actor: Actor,
    Path(unit): Path<String>,
) -> Result<Json<NextSerialRes>, ApiError> {
    next_serial(&state, Collection::Mortality, &unit).await
}

#[utoipa::path(
    put,
    path = "/units/{unit}/mortality/{id}",
    params(
        ("unit" = String, Path, description = "Clinical unit"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = AdmissionReq,
    responses(
        (status = 200, description = "Archive record saved", body = RecordRes),
        (status = 404, description = "No such archive record", body = ErrorBody),
        (status = 422, description = "Field-level validation errors", body = ErrorBody)
    )
)]
/// Save an edited archive record. The date of death is required.
#[axum::debug_handler(state = AppState)]
pub async fn update_mortality(
    State(state): State<AppState>,
    actor: Actor,
    Path((unit, id)): Path<(String, String)>,
    Json(req): Json<AdmissionReq>,
) -> Result<Json<RecordRes>, ApiError> {
    let ctx = context(&unit, actor)?;
    let record = state.service.find(Collection::Mortality, &id).await?;
    let updated = state
        .service
        .update_archived(&ctx, &record, &AdmissionForm::from(req))
        .await?;
    Ok(Json(RecordRes::from_record(&updated, state.service.today())))
}

#[utoipa::path(
    delete,
    path = "/units/{unit}/mortality/{id}",
    params(
        ("unit" = String, Path, description = "Clinical unit"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Only admins may delete", body = ErrorBody)
    )
)]
/// Permanently delete an archive record. Admin only.
#[axum::debug_handler(state = AppState)]
pub async fn delete_mortality(
    State(state): State<AppState>,
    actor: Actor,
    Path((unit, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    delete(&state, actor, Collection::Mortality, &unit, &id).await
}

async fn delete(
    state: &AppState,
    actor: Actor,
    collection: Collection,
    unit: &str,
    id: &str,
) -> Result<StatusCode, ApiError> {
    let ctx = context(unit, actor)?;
    require_admin(actor)?;
    let record = state.service.find(collection, id).await?;
    state.service.delete(&ctx, &record).await?;
    Ok(StatusCode::NO_CONTENT)
}
