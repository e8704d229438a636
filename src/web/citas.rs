//! Cita handlers: CRUD, availability, conflicts, stats, export

use std::collections::HashMap;

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::{require_admin, AppState};
use crate::citas::export::{to_csv, to_ical, ExportFormat};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(
    query: web::Query<CitaFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let citas = state.citas.list(&query).await?;
    Ok(HttpResponse::Ok().json(citas))
}

pub async fn get(id: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let cita = state.citas.get(&id).await?;
    Ok(HttpResponse::Ok().json(cita))
}

pub async fn create(
    session: Session,
    req: web::Json<CreateCitaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let cita = state.citas.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(cita))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdateCitaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let cita = state.citas.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(cita))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.citas.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    date: NaiveDate,
    time: String,
    duration: Option<i64>,
    buffertime: Option<i64>,
    exclude: Option<String>,
}

pub async fn availability(
    query: web::Query<AvailabilityQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let result = state
        .citas
        .check_availability(
            query.date,
            &query.time,
            query.duration.unwrap_or(60),
            query.buffertime.unwrap_or(15),
            query.exclude.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[derive(Deserialize)]
pub struct ConflictsQuery {
    date: Option<NaiveDate>,
}

pub async fn conflicts(
    query: web::Query<ConflictsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let conflicts = state.citas.conflicts_for_date(date).await?;
    Ok(HttpResponse::Ok().json(conflicts))
}

pub async fn stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let stats = state.citas.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    format: Option<ExportFormat>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    status: Option<CitaStatus>,
    student_id: Option<String>,
    tipo: Option<CitaTipo>,
}

pub async fn export(
    query: web::Query<ExportQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let filter = CitaFilter {
        date_from: query.date_from,
        date_to: query.date_to,
        status: query.status,
        student_id: query.student_id.clone(),
        tipo: query.tipo,
    };
    let citas = state.citas.list(&filter).await?;
    let format = query.format.unwrap_or(ExportFormat::Csv);

    let body = match format {
        ExportFormat::Csv => {
            // Resolve student names for the Alumno column
            let mut nombres: HashMap<String, String> = HashMap::new();
            for cita in &citas {
                if let Some(student_id) = &cita.student_id {
                    if !nombres.contains_key(student_id) {
                        if let Ok(alumno) = state.alumnos.get(student_id).await {
                            nombres.insert(
                                student_id.clone(),
                                format!("{} {}", alumno.nombre, alumno.apellido),
                            );
                        }
                    }
                }
            }
            to_csv(&citas, &nombres)?
        }
        ExportFormat::Ical => to_ical(&citas),
    };

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", format.filename()),
        ))
        .body(body))
}
