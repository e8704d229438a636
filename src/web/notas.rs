//! Nota handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(
    query: web::Query<NotaFilter>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let page = state.notas.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create(
    session: Session,
    req: web::Json<CreateNotaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let nota = state.notas.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(nota))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdateNotaRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let nota = state.notas.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(nota))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.notas.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
