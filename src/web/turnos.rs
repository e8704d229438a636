//! Turno (shift) handlers

use actix_session::Session;
use actix_web::{web, HttpResponse};

use super::{require_admin, AppState};
use crate::db::models::*;
use crate::error::Result;

pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse> {
    let turnos = state.turnos.list().await?;
    Ok(HttpResponse::Ok().json(turnos))
}

pub async fn create(
    session: Session,
    req: web::Json<CreateTurnoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let turno = state.turnos.create(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(turno))
}

pub async fn update(
    session: Session,
    id: web::Path<String>,
    req: web::Json<UpdateTurnoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    let turno = state.turnos.update(&id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(turno))
}

pub async fn delete(
    session: Session,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&session)?;
    state.turnos.delete(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}
