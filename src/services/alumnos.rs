//! Alumnos service
//!
//! Registration and lifecycle of student records, including the payment
//! state and the attendance counters kept denormalized on the alumno row.

use chrono::{Days, NaiveDate};

use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

/// Consecutive-day counter after an attendance on `fecha`: one more than
/// before when it extends the streak, unchanged on a repeat of the same
/// day, otherwise a fresh streak of one.
pub fn dias_consecutivos(
    ultima: Option<NaiveDate>,
    dias_actuales: i64,
    fecha: NaiveDate,
) -> i64 {
    match ultima {
        Some(prev) if prev.checked_add_days(Days::new(1)) == Some(fecha) => dias_actuales + 1,
        Some(prev) if prev == fecha => dias_actuales.max(1),
        _ => 1,
    }
}

#[derive(Clone)]
pub struct AlumnosService {
    repo: Repository,
}

impl AlumnosService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &AlumnoFilter) -> Result<Paginated<Alumno>> {
        self.repo.list_alumnos(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Alumno> {
        self.repo.get_alumno(id).await
    }

    pub async fn create(&self, req: CreateAlumnoRequest) -> Result<Alumno> {
        if req.nombre.trim().is_empty() {
            return Err(AppError::validation("El campo nombre es requerido"));
        }
        if req.apellido.trim().is_empty() {
            return Err(AppError::validation("El campo apellido es requerido"));
        }

        let alumno = self.repo.create_alumno(&req).await?;
        tracing::info!("Created alumno {} ({} {})", alumno.id, alumno.nombre, alumno.apellido);
        Ok(alumno)
    }

    pub async fn update(&self, id: &str, req: UpdateAlumnoRequest) -> Result<Alumno> {
        if matches!(&req.nombre, Some(n) if n.trim().is_empty()) {
            return Err(AppError::validation("El campo nombre es requerido"));
        }
        if matches!(&req.apellido, Some(a) if a.trim().is_empty()) {
            return Err(AppError::validation("El campo apellido es requerido"));
        }

        self.repo.update_alumno(id, &req).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting alumno {}", id);
        self.repo.delete_alumno(id).await
    }

    pub async fn set_estado_pago(&self, id: &str, estado: EstadoPago) -> Result<()> {
        self.repo.set_estado_pago(id, estado).await
    }

    /// Record an attendance date on the alumno row, maintaining the
    /// consecutive-day streak
    pub async fn registrar_asistencia(&self, id: &str, fecha: NaiveDate) -> Result<()> {
        let alumno = self.repo.get_alumno(id).await?;
        let dias = dias_consecutivos(
            alumno.fecha_ultima_asistencia,
            alumno.dias_consecutivos_asistencia,
            fecha,
        );
        self.repo.set_asistencia_fields(id, fecha, dias).await
    }

    pub async fn reset_asistencias_consecutivas(&self, id: &str) -> Result<()> {
        self.repo.reset_dias_consecutivos(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> AlumnosService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        AlumnosService::new(Repository::new(pool))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn req(nombre: &str) -> CreateAlumnoRequest {
        CreateAlumnoRequest {
            nombre: nombre.to_string(),
            apellido: "García".to_string(),
            email: Some("ana@example.com".to_string()),
            telefono: None,
            sede: Sede::PlazaTeran,
            activo: None,
            alertas_activas: None,
            estado_pago: None,
            shift_id: None,
        }
    }

    #[test]
    fn test_dias_consecutivos() {
        // Streak extends on the next day
        assert_eq!(dias_consecutivos(Some(d(2024, 3, 4)), 3, d(2024, 3, 5)), 4);
        // Same-day repeat keeps the streak
        assert_eq!(dias_consecutivos(Some(d(2024, 3, 4)), 3, d(2024, 3, 4)), 3);
        // A gap resets it
        assert_eq!(dias_consecutivos(Some(d(2024, 3, 4)), 3, d(2024, 3, 7)), 1);
        // First attendance ever
        assert_eq!(dias_consecutivos(None, 0, d(2024, 3, 4)), 1);
    }

    #[tokio::test]
    async fn test_create_requires_nombre() {
        let service = create_test_service().await;
        let result = service.create(req("   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_attendance_streak_through_service() {
        let service = create_test_service().await;
        let alumno = service.create(req("Ana")).await.unwrap();

        service.registrar_asistencia(&alumno.id, d(2024, 3, 4)).await.unwrap();
        service.registrar_asistencia(&alumno.id, d(2024, 3, 5)).await.unwrap();

        let alumno = service.get(&alumno.id).await.unwrap();
        assert_eq!(alumno.dias_consecutivos_asistencia, 2);
        assert_eq!(alumno.fecha_ultima_asistencia, Some(d(2024, 3, 5)));

        // Gap resets the streak
        service.registrar_asistencia(&alumno.id, d(2024, 3, 10)).await.unwrap();
        let alumno = service.get(&alumno.id).await.unwrap();
        assert_eq!(alumno.dias_consecutivos_asistencia, 1);

        service.reset_asistencias_consecutivas(&alumno.id).await.unwrap();
        let alumno = service.get(&alumno.id).await.unwrap();
        assert_eq!(alumno.dias_consecutivos_asistencia, 0);
    }
}
