//! Database models
//!
//! Rust structs representing database entities. Enum-valued columns are
//! stored as TEXT and round-trip through sqlx::Type; the wire names match
//! the values the admin frontend has always used.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ===== Enums =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CitaStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CitaTipo {
    Individual,
    Group,
    Evaluation,
    Consultation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurringType {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Sede {
    #[sqlx(rename = "Plaza Arenales")]
    #[serde(rename = "Plaza Arenales")]
    PlazaArenales,
    #[sqlx(rename = "Plaza Terán")]
    #[serde(rename = "Plaza Terán")]
    PlazaTeran,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AsistenciaEstado {
    Presente,
    Ausente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum MetodoPago {
    Efectivo,
    Transferencia,
    #[sqlx(rename = "Mercado Pago")]
    #[serde(rename = "Mercado Pago")]
    MercadoPago,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum PagoEstado {
    Pendiente,
    Pagado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoPago {
    AlDia,
    Pendiente,
    Atrasado,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum NotaTipo {
    Ausencia,
    #[sqlx(rename = "Lesión")]
    #[serde(rename = "Lesión")]
    Lesion,
    Vacaciones,
    General,
    #[sqlx(rename = "Evaluación")]
    #[serde(rename = "Evaluación")]
    Evaluacion,
    Progreso,
    Competencia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum NotaCategoria {
    #[sqlx(rename = "Técnica")]
    #[serde(rename = "Técnica")]
    Tecnica,
    #[sqlx(rename = "Física")]
    #[serde(rename = "Física")]
    Fisica,
    Actitudinal,
    Competitiva,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneda {
    Ars,
    Usd,
    Eur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Servicio {
    Clases,
    Competencia,
    Equipamiento,
    Otro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum TipoServicio {
    Individual,
    Grupal,
    Personalizado,
    Evento,
    Material,
    Otro,
}

// ===== Entities =====

/// Appointment between a student and the facility
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cita {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    /// Start time in HH:MM within the cita's day
    pub time: String,
    /// Duration in minutes
    pub duration: i64,
    pub student_id: Option<String>,
    pub status: CitaStatus,
    pub tipo: CitaTipo,
    pub notes: Option<String>,
    pub recurring: bool,
    pub recurringtype: Option<RecurringType>,
    /// Inclusive end of the generated series
    pub recurringend: Option<NaiveDate>,
    pub maxcapacity: i64,
    /// Required idle gap in minutes before and after
    pub buffertime: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student/member record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alumno {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub sede: Sede,
    pub activo: bool,
    pub alertas_activas: bool,
    pub fecha_ultima_asistencia: Option<NaiveDate>,
    pub dias_consecutivos_asistencia: i64,
    pub estado_pago: EstadoPago,
    pub shift_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asistencia {
    pub id: String,
    pub alumno_id: String,
    pub fecha: NaiveDate,
    pub sede: Sede,
    pub estado: AsistenciaEstado,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pago {
    pub id: String,
    pub alumno_id: String,
    pub monto: f64,
    pub fecha_pago: NaiveDate,
    pub mes: i64,
    pub anio: i64,
    pub metodo_pago: MetodoPago,
    pub estado: PagoEstado,
    pub periodo_desde: Option<NaiveDate>,
    pub periodo_hasta: Option<NaiveDate>,
    pub notas: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Nota {
    pub id: String,
    pub alumno_id: String,
    pub fecha: NaiveDate,
    pub contenido: String,
    pub tipo: NotaTipo,
    pub categoria: Option<NotaCategoria>,
    /// 1-10 when present
    pub calificacion: Option<i64>,
    pub visible_en_reporte: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistorialPrecio {
    pub id: String,
    pub alumno_id: String,
    pub precio: f64,
    pub moneda: Moneda,
    pub servicio: Servicio,
    pub tipo_servicio: TipoServicio,
    pub fecha_desde: NaiveDate,
    /// None while the price is the vigente one
    pub fecha_hasta: Option<NaiveDate>,
    pub activo: bool,
    pub notas: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Configured shift in the weekly grid
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Turno {
    pub id: String,
    pub name: String,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ===== Request payloads =====

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCitaRequest {
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default = "default_duration")]
    pub duration: i64,
    pub student_id: Option<String>,
    pub status: Option<CitaStatus>,
    pub tipo: Option<CitaTipo>,
    pub notes: Option<String>,
    #[serde(default)]
    pub recurring: bool,
    pub recurringtype: Option<RecurringType>,
    pub recurringend: Option<NaiveDate>,
    pub maxcapacity: Option<i64>,
    #[serde(default = "default_buffer")]
    pub buffertime: i64,
    /// Book the slot even when the availability check reports conflicts
    #[serde(default)]
    pub force: bool,
}

fn default_duration() -> i64 {
    60
}

fn default_buffer() -> i64 {
    15
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCitaRequest {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub duration: Option<i64>,
    pub student_id: Option<String>,
    pub status: Option<CitaStatus>,
    pub tipo: Option<CitaTipo>,
    pub notes: Option<String>,
    pub recurring: Option<bool>,
    pub recurringtype: Option<RecurringType>,
    pub recurringend: Option<NaiveDate>,
    pub maxcapacity: Option<i64>,
    pub buffertime: Option<i64>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlumnoRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub sede: Sede,
    pub activo: Option<bool>,
    pub alertas_activas: Option<bool>,
    pub estado_pago: Option<EstadoPago>,
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAlumnoRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub sede: Option<Sede>,
    pub activo: Option<bool>,
    pub alertas_activas: Option<bool>,
    pub estado_pago: Option<EstadoPago>,
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAsistenciaRequest {
    pub alumno_id: String,
    pub fecha: NaiveDate,
    pub sede: Sede,
    pub estado: AsistenciaEstado,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAsistenciaRequest {
    pub fecha: Option<NaiveDate>,
    pub sede: Option<Sede>,
    pub estado: Option<AsistenciaEstado>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePagoRequest {
    pub alumno_id: String,
    pub monto: f64,
    pub fecha_pago: NaiveDate,
    pub mes: i64,
    pub anio: i64,
    pub metodo_pago: MetodoPago,
    pub estado: Option<PagoEstado>,
    pub periodo_desde: Option<NaiveDate>,
    pub periodo_hasta: Option<NaiveDate>,
    pub notas: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePagoRequest {
    pub monto: Option<f64>,
    pub fecha_pago: Option<NaiveDate>,
    pub mes: Option<i64>,
    pub anio: Option<i64>,
    pub metodo_pago: Option<MetodoPago>,
    pub estado: Option<PagoEstado>,
    pub periodo_desde: Option<NaiveDate>,
    pub periodo_hasta: Option<NaiveDate>,
    pub notas: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotaRequest {
    pub alumno_id: String,
    pub fecha: NaiveDate,
    pub contenido: String,
    pub tipo: NotaTipo,
    pub categoria: Option<NotaCategoria>,
    pub calificacion: Option<i64>,
    pub visible_en_reporte: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNotaRequest {
    pub fecha: Option<NaiveDate>,
    pub contenido: Option<String>,
    pub tipo: Option<NotaTipo>,
    pub categoria: Option<NotaCategoria>,
    pub calificacion: Option<i64>,
    pub visible_en_reporte: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrecioRequest {
    pub alumno_id: String,
    pub precio: f64,
    pub moneda: Option<Moneda>,
    pub servicio: Servicio,
    pub tipo_servicio: TipoServicio,
    pub fecha_desde: NaiveDate,
    pub fecha_hasta: Option<NaiveDate>,
    pub activo: Option<bool>,
    pub notas: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrecioRequest {
    pub precio: Option<f64>,
    pub moneda: Option<Moneda>,
    pub servicio: Option<Servicio>,
    pub tipo_servicio: Option<TipoServicio>,
    pub fecha_hasta: Option<NaiveDate>,
    pub activo: Option<bool>,
    pub notas: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTurnoRequest {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTurnoRequest {
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

// ===== Listing options =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlumnoFilter {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sede: Option<Sede>,
    pub activo: Option<bool>,
    pub estado_pago: Option<EstadoPago>,
    pub order_direction: Option<OrderDirection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AsistenciaFilter {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub alumno_id: Option<String>,
    pub estado: Option<AsistenciaEstado>,
    pub sede: Option<Sede>,
    pub fecha: Option<NaiveDate>,
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagoFilter {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub alumno_id: Option<String>,
    pub estado: Option<PagoEstado>,
    pub metodo_pago: Option<MetodoPago>,
    pub fecha_desde: Option<NaiveDate>,
    pub fecha_hasta: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotaFilter {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub alumno_id: Option<String>,
    pub tipo: Option<NotaTipo>,
    pub categoria: Option<NotaCategoria>,
    pub visible_en_reporte: Option<bool>,
    pub calificacion_min: Option<i64>,
    pub calificacion_max: Option<i64>,
    pub fecha_desde: Option<NaiveDate>,
    pub fecha_hasta: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrecioFilter {
    pub alumno_id: Option<String>,
    /// Only records vigente at this date
    pub fecha: Option<NaiveDate>,
    pub solo_activos: Option<bool>,
    pub moneda: Option<Moneda>,
    pub tipo_servicio: Option<TipoServicio>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CitaFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<CitaStatus>,
    pub student_id: Option<String>,
    pub tipo: Option<CitaTipo>,
}

/// Listing page plus total row count
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub total_pages: i64,
}
