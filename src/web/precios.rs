//! Historial de precios handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(
    query: web::Query<PrecioFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let precios = state.precios.list(&query).await?;
    Ok(HttpResponse::Ok().json(precios))
}

#[derive(Deserialize)]
pub struct VigenteQuery {
    fecha: Option<NaiveDate>,
}

pub async fn vigente(
    alumno_id: web::Path<String>,
    query: web::Query<VigenteQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let precio = state.precios.vigente(&alumno_id, query.fecha).await?;
    Ok(HttpResponse::Ok().json(precio))
}

pub async fn create(
    session: Session,
    req: web::Json<CreatePrecioRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let precio = state.precios.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(precio))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdatePrecioRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let precio = state.precios.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(precio))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.precios.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
