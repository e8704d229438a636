//! Pago handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::{AppError, Result};

pub async fn list(
    query: web::Query<PagoFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let page = state.pagos.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn por_alumno(
    alumno_id: web::Path<String>,
    query: web::Query<PagoFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let pagos = state.pagos.por_alumno(&alumno_id, &query).await?;
    Ok(HttpResponse::Ok().json(pagos))
}

pub async fn pendientes(state: web::Data<AppState>) -> Result<HttpResponse> {
    let pagos = state.pagos.pendientes().await?;
    Ok(HttpResponse::Ok().json(pagos))
}

pub async fn create(
    session: Session,
    req: web::Json<CreatePagoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let pago = state.pagos.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(pago))
}

pub async fn create_bulk(
    session: Session,
    req: web::Json<Vec<CreatePagoRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let pagos = state.pagos.create_bulk(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(pagos))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdatePagoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let pago = state.pagos.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(pago))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.pagos.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

#[derive(Deserialize)]
pub struct ResumenQuery {
    desde: Option<NaiveDate>,
    hasta: Option<NaiveDate>,
}

pub async fn resumen(
    query: web::Query<ResumenQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (desde, hasta) = match (query.desde, query.hasta) {
        (Some(desde), Some(hasta)) => (desde, hasta),
        _ => {
            return Err(AppError::validation(
                "Los parámetros desde y hasta son requeridos",
            ))
        }
    };
    let resumen = state.pagos.resumen(desde, hasta).await?;
    Ok(HttpResponse::Ok().json(resumen))
}

pub async fn estadisticas(
    query: web::Query<ResumenQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let stats = state.pagos.estadisticas(query.desde, query.hasta).await?;
    Ok(HttpResponse::Ok().json(stats))
}
