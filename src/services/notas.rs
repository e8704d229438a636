//! Notas service
//!
//! Per-alumno observations: injuries, absences, evaluations. The optional
//! calificacion is bounded so report averages stay meaningful.

use crate::config::{MAX_CALIFICACION, MIN_CALIFICACION};
use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

fn validar_calificacion(calificacion: Option<i64>) -> Result<()> {
    if let Some(valor) = calificacion {
        if !(MIN_CALIFICACION..=MAX_CALIFICACION).contains(&valor) {
            return Err(AppError::validation(format!(
                "La calificación debe estar entre {} y {}",
                MIN_CALIFICACION, MAX_CALIFICACION
            )));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct NotasService {
    repo: Repository,
}

impl NotasService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &NotaFilter) -> Result<Paginated<Nota>> {
        self.repo.list_notas(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Nota> {
        self.repo.get_nota(id).await
    }

    pub async fn create(&self, req: CreateNotaRequest) -> Result<Nota> {
        if req.contenido.trim().is_empty() {
            return Err(AppError::validation("El contenido es requerido"));
        }
        validar_calificacion(req.calificacion)?;

        // Proper not-found for a bad alumno reference
        self.repo.get_alumno(&req.alumno_id).await?;

        let nota = self.repo.create_nota(&req).await?;
        tracing::debug!("Created nota {} for alumno {}", nota.id, req.alumno_id);
        Ok(nota)
    }

    pub async fn update(&self, id: &str, req: UpdateNotaRequest) -> Result<Nota> {
        if matches!(&req.contenido, Some(c) if c.trim().is_empty()) {
            return Err(AppError::validation("El contenido es requerido"));
        }
        validar_calificacion(req.calificacion)?;
        self.repo.update_nota(id, &req).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_nota(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (NotasService, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        let repo = Repository::new(pool);

        let alumno = repo
            .create_alumno(&CreateAlumnoRequest {
                nombre: "Ana".to_string(),
                apellido: "García".to_string(),
                email: None,
                telefono: None,
                sede: Sede::PlazaArenales,
                activo: None,
                alertas_activas: None,
                estado_pago: None,
                shift_id: None,
            })
            .await
            .unwrap();

        (NotasService::new(repo), alumno.id)
    }

    fn req(alumno_id: &str, tipo: NotaTipo) -> CreateNotaRequest {
        CreateNotaRequest {
            alumno_id: alumno_id.to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            contenido: "Progreso notable en barra".to_string(),
            tipo,
            categoria: Some(NotaCategoria::Tecnica),
            calificacion: Some(8),
            visible_en_reporte: Some(true),
        }
    }

    #[tokio::test]
    async fn test_create_and_filter_by_tipo() {
        let (service, alumno_id) = setup().await;

        service.create(req(&alumno_id, NotaTipo::Progreso)).await.unwrap();
        service.create(req(&alumno_id, NotaTipo::Lesion)).await.unwrap();

        let lesiones = service
            .list(&NotaFilter {
                tipo: Some(NotaTipo::Lesion),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(lesiones.total, 1);
        assert_eq!(lesiones.data[0].tipo, NotaTipo::Lesion);
    }

    #[tokio::test]
    async fn test_calificacion_bounds() {
        let (service, alumno_id) = setup().await;

        let mut bad = req(&alumno_id, NotaTipo::General);
        bad.calificacion = Some(11);
        let result = service.create(bad).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let nota = service.create(req(&alumno_id, NotaTipo::General)).await.unwrap();
        let result = service
            .update(
                &nota.id,
                UpdateNotaRequest {
                    calificacion: Some(0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_calificacion_range_filter() {
        let (service, alumno_id) = setup().await;

        let mut alta = req(&alumno_id, NotaTipo::Evaluacion);
        alta.calificacion = Some(9);
        service.create(alta).await.unwrap();

        let mut baja = req(&alumno_id, NotaTipo::Evaluacion);
        baja.calificacion = Some(4);
        service.create(baja).await.unwrap();

        let altas = service
            .list(&NotaFilter {
                calificacion_min: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(altas.total, 1);
        assert_eq!(altas.data[0].calificacion, Some(9));
    }
}
