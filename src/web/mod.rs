//! HTTP surface
//!
//! actix-web application: server-rendered page shells, static assets, the
//! admin session, and the JSON API consumed by the admin frontend. Route
//! handlers live in one module per entity.

pub mod alumnos;
pub mod asistencias;
pub mod citas;
pub mod notas;
pub mod pagos;
pub mod precios;
pub mod turnos;

use actix_files::Files;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use rand::RngCore;
use serde::Deserialize;

use crate::citas::CitaService;
use crate::config::AppConfig;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::services::{
    AlumnosService, AsistenciasService, NotasService, PagosService, PreciosService, TurnosService,
};

/// Shared application state handed to every handler
pub struct AppState {
    pub alumnos: AlumnosService,
    pub asistencias: AsistenciasService,
    pub pagos: PagosService,
    pub notas: NotasService,
    pub precios: PreciosService,
    pub turnos: TurnosService,
    pub citas: CitaService,
    pub admin_password: String,
}

impl AppState {
    pub fn new(repo: Repository, admin_password: String) -> Self {
        Self {
            alumnos: AlumnosService::new(repo.clone()),
            asistencias: AsistenciasService::new(repo.clone()),
            pagos: PagosService::new(repo.clone()),
            notas: NotasService::new(repo.clone()),
            precios: PreciosService::new(repo.clone()),
            turnos: TurnosService::new(repo.clone()),
            citas: CitaService::new(repo),
            admin_password,
        }
    }
}

/// Mutating endpoints require a logged-in admin session
pub fn require_admin(session: &Session) -> Result<()> {
    match session.get::<bool>("admin") {
        Ok(Some(true)) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

async fn login(
    session: Session,
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        session
            .insert("admin", true)
            .map_err(|e| AppError::Generic(e.to_string()))?;
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Contraseña incorrecta"})))
    }
}

async fn logout(session: Session) -> Result<HttpResponse> {
    session.purge();
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// HTML page handlers
async fn index() -> Result<HttpResponse> {
    let html = include_str!("../../templates/index.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

async fn citas_page() -> Result<HttpResponse> {
    let html = include_str!("../../templates/citas.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

async fn admin_page() -> Result<HttpResponse> {
    let html = include_str!("../../templates/admin.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

fn session_key(config: &AppConfig) -> Key {
    match &config.session_key {
        Some(secret) if secret.len() >= 64 => Key::from(secret.as_bytes()),
        other => {
            if other.is_some() {
                tracing::warn!("SESSION_KEY shorter than 64 bytes, generating a random key");
            }
            let mut bytes = [0u8; 64];
            rand::thread_rng().fill_bytes(&mut bytes);
            Key::from(&bytes)
        }
    }
}

pub async fn start_server(config: AppConfig, repo: Repository) -> std::io::Result<()> {
    let key = session_key(&config);
    let app_state = web::Data::new(AppState::new(repo, config.admin_password.clone()));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .service(Files::new("/static", "static"))
            .route("/", web::get().to(index))
            .route("/citas", web::get().to(citas_page))
            .route("/admin", web::get().to(admin_page))
            .route("/api/login", web::post().to(login))
            .route("/api/logout", web::post().to(logout))
            .route("/api/stats", web::get().to(citas::stats))
            // alumnos
            .route("/api/alumnos", web::get().to(alumnos::list))
            .route("/api/alumnos", web::post().to(alumnos::create))
            .route("/api/alumnos/{id}", web::get().to(alumnos::get))
            .route("/api/alumnos/{id}", web::put().to(alumnos::update))
            .route("/api/alumnos/{id}", web::delete().to(alumnos::delete))
            .route(
                "/api/alumnos/{id}/estado-pago",
                web::put().to(alumnos::set_estado_pago),
            )
            .route(
                "/api/alumnos/{id}/reset-asistencias",
                web::post().to(alumnos::reset_asistencias),
            )
            // asistencias
            .route("/api/asistencias", web::get().to(asistencias::list))
            .route("/api/asistencias", web::post().to(asistencias::create))
            .route(
                "/api/asistencias/estadisticas/{alumno_id}",
                web::get().to(asistencias::estadisticas),
            )
            .route("/api/asistencias/{id}", web::put().to(asistencias::update))
            .route(
                "/api/asistencias/{id}",
                web::delete().to(asistencias::delete),
            )
            // pagos
            .route("/api/pagos", web::get().to(pagos::list))
            .route("/api/pagos", web::post().to(pagos::create))
            .route("/api/pagos/bulk", web::post().to(pagos::create_bulk))
            .route("/api/pagos/pendientes", web::get().to(pagos::pendientes))
            .route("/api/pagos/resumen", web::get().to(pagos::resumen))
            .route(
                "/api/pagos/estadisticas",
                web::get().to(pagos::estadisticas),
            )
            .route(
                "/api/pagos/alumno/{alumno_id}",
                web::get().to(pagos::por_alumno),
            )
            .route("/api/pagos/{id}", web::put().to(pagos::update))
            .route("/api/pagos/{id}", web::delete().to(pagos::delete))
            // notas
            .route("/api/notas", web::get().to(notas::list))
            .route("/api/notas", web::post().to(notas::create))
            .route("/api/notas/{id}", web::put().to(notas::update))
            .route("/api/notas/{id}", web::delete().to(notas::delete))
            // historial de precios
            .route("/api/precios", web::get().to(precios::list))
            .route("/api/precios", web::post().to(precios::create))
            .route(
                "/api/precios/vigente/{alumno_id}",
                web::get().to(precios::vigente),
            )
            .route("/api/precios/{id}", web::put().to(precios::update))
            .route("/api/precios/{id}", web::delete().to(precios::delete))
            // turnos
            .route("/api/shifts", web::get().to(turnos::list))
            .route("/api/shifts", web::post().to(turnos::create))
            .route("/api/shifts/{id}", web::put().to(turnos::update))
            .route("/api/shifts/{id}", web::delete().to(turnos::delete))
            // citas
            .route("/api/citas", web::get().to(citas::list))
            .route("/api/citas", web::post().to(citas::create))
            .route(
                "/api/citas/availability",
                web::get().to(citas::availability),
            )
            .route("/api/citas/conflicts", web::get().to(citas::conflicts))
            .route("/api/citas/export", web::get().to(citas::export))
            .route("/api/citas/{id}", web::get().to(citas::get))
            .route("/api/citas/{id}", web::put().to(citas::update))
            .route("/api/citas/{id}", web::delete().to(citas::delete))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
