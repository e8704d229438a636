//! Alumno handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(
    query: web::Query<AlumnoFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let page = state.alumnos.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get(id: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let alumno = state.alumnos.get(&id).await?;
    Ok(HttpResponse::Ok().json(alumno))
}

pub async fn create(
    session: Session,
    req: web::Json<CreateAlumnoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let alumno = state.alumnos.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(alumno))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdateAlumnoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let alumno = state.alumnos.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(alumno))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.alumnos.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

#[derive(Deserialize)]
pub struct EstadoPagoRequest {
    estado_pago: EstadoPago,
}

pub async fn set_estado_pago(
    session: Session,
    id: web::Path<String>,
    req: web::Json<EstadoPagoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.alumnos.set_estado_pago(&id, req.estado_pago).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

pub async fn reset_asistencias(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.alumnos.reset_asistencias_consecutivas(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
