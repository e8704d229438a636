//! Historial de precios service
//!
//! Price history per alumno. At most one record is vigente at a time:
//! creating a new active price closes the previous one in the same
//! transaction, stamping its end date with the new start date.

use chrono::{NaiveDate, Utc};

use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PreciosService {
    repo: Repository,
}

impl PreciosService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &PrecioFilter) -> Result<Vec<HistorialPrecio>> {
        self.repo.list_precios(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<HistorialPrecio> {
        self.repo.get_precio(id).await
    }

    /// Price in force for the alumno at the date (today when omitted)
    pub async fn vigente(
        &self,
        alumno_id: &str,
        fecha: Option<NaiveDate>,
    ) -> Result<Option<HistorialPrecio>> {
        let fecha = fecha.unwrap_or_else(|| Utc::now().date_naive());
        Repository::precio_vigente(self.repo.pool(), alumno_id, fecha).await
    }

    pub async fn create(&self, req: CreatePrecioRequest) -> Result<HistorialPrecio> {
        if req.precio <= 0.0 {
            return Err(AppError::validation("El precio debe ser mayor a cero"));
        }
        if let Some(hasta) = req.fecha_hasta {
            if hasta <= req.fecha_desde {
                return Err(AppError::validation(
                    "La fecha de inicio debe ser anterior a la fecha de fin",
                ));
            }
        }

        self.repo.get_alumno(&req.alumno_id).await?;

        let mut tx = self.repo.pool().begin().await?;

        // A new active price supersedes the one currently vigente
        if req.activo.unwrap_or(true) {
            if let Some(anterior) =
                Repository::precio_vigente(&mut *tx, &req.alumno_id, req.fecha_desde).await?
            {
                Repository::close_precio(&mut *tx, &anterior.id, req.fecha_desde).await?;
                tracing::debug!("Closed precio {} superseded by new record", anterior.id);
            }
        }

        let precio = Repository::insert_precio(&mut *tx, &req).await?;
        tx.commit().await?;

        tracing::info!("Created precio {} for alumno {}", precio.id, req.alumno_id);
        Ok(precio)
    }

    pub async fn update(&self, id: &str, req: UpdatePrecioRequest) -> Result<HistorialPrecio> {
        if matches!(req.precio, Some(precio) if precio <= 0.0) {
            return Err(AppError::validation("El precio debe ser mayor a cero"));
        }
        self.repo.update_precio(id, &req).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_precio(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (PreciosService, String) {
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

        (PreciosService::new(repo), alumno.id)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn req(alumno_id: &str, precio: f64, desde: NaiveDate) -> CreatePrecioRequest {
        CreatePrecioRequest {
            alumno_id: alumno_id.to_string(),
            precio,
            moneda: None,
            servicio: Servicio::Clases,
            tipo_servicio: TipoServicio::Grupal,
            fecha_desde: desde,
            fecha_hasta: None,
            activo: None,
            notas: None,
        }
    }

    #[tokio::test]
    async fn test_new_active_price_closes_previous() {
        let (service, alumno_id) = setup().await;

        let primero = service
            .create(req(&alumno_id, 10000.0, d(2024, 1, 1)))
            .await
            .unwrap();
        assert!(primero.activo);
        assert!(primero.fecha_hasta.is_none());

        let segundo = service
            .create(req(&alumno_id, 12000.0, d(2024, 3, 1)))
            .await
            .unwrap();

        let primero = service.get(&primero.id).await.unwrap();
        assert!(!primero.activo);
        assert_eq!(primero.fecha_hasta, Some(d(2024, 3, 1)));

        let vigente = service.vigente(&alumno_id, Some(d(2024, 3, 15))).await.unwrap();
        assert_eq!(vigente.map(|p| p.id), Some(segundo.id));
    }

    #[tokio::test]
    async fn test_vigente_before_first_price_is_none() {
        let (service, alumno_id) = setup().await;

        service
            .create(req(&alumno_id, 10000.0, d(2024, 2, 1)))
            .await
            .unwrap();

        let vigente = service.vigente(&alumno_id, Some(d(2024, 1, 15))).await.unwrap();
        assert!(vigente.is_none());
    }

    #[tokio::test]
    async fn test_invalid_ranges_rejected() {
        let (service, alumno_id) = setup().await;

        let result = service.create(req(&alumno_id, 0.0, d(2024, 1, 1))).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let mut invertido = req(&alumno_id, 100.0, d(2024, 5, 1));
        invertido.fecha_hasta = Some(d(2024, 4, 1));
        let result = service.create(invertido).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
