//! Asistencia handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(
    query: web::Query<AsistenciaFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let page = state.asistencias.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create(
    session: Session,
    req: web::Json<CreateAsistenciaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let asistencia = state.asistencias.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(asistencia))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdateAsistenciaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let asistencia = state.asistencias.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(asistencia))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.asistencias.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

#[derive(Deserialize)]
pub struct EstadisticasQuery {
    desde: Option<NaiveDate>,
    hasta: Option<NaiveDate>,
}

pub async fn estadisticas(
    alumno_id: web::Path<String>,
    query: web::Query<EstadisticasQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let stats = state
        .asistencias
        .estadisticas(&alumno_id, query.desde, query.hasta)
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}
