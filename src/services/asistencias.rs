//! Asistencias service
//!
//! Attendance records per alumno and the per-student statistics shown in
//! the reports view. Creating an attendance also refreshes the alumno's
//! denormalized last-attendance fields.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::alumnos::dias_consecutivos;
use crate::db::models::*;
use crate::db::Repository;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct PuntoTendencia {
    pub fecha: NaiveDate,
    pub presentes: i64,
    pub ausentes: i64,
}

/// Attendance statistics for one alumno over an optional period
#[derive(Debug, Clone, Serialize)]
pub struct EstadisticasAsistencia {
    pub total: i64,
    pub presentes: i64,
    pub ausentes: i64,
    pub porcentaje_presente: f64,
    pub porcentaje_ausente: f64,
    pub por_sede: BTreeMap<String, i64>,
    pub por_mes: BTreeMap<u32, i64>,
    pub tendencia: Vec<PuntoTendencia>,
}

#[derive(Clone)]
pub struct AsistenciasService {
    repo: Repository,
}

impl AsistenciasService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &AsistenciaFilter) -> Result<Paginated<Asistencia>> {
        self.repo.list_asistencias(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Asistencia> {
        self.repo.get_asistencia(id).await
    }

    pub async fn create(&self, req: CreateAsistenciaRequest) -> Result<Asistencia> {
        // The alumno must exist; the FK would catch it anyway but this way
        // the caller gets a proper not-found instead of a constraint error
        let alumno = self.repo.get_alumno(&req.alumno_id).await?;

        let asistencia = self.repo.create_asistencia(&req).await?;

        if req.estado == AsistenciaEstado::Presente {
            let dias = dias_consecutivos(
                alumno.fecha_ultima_asistencia,
                alumno.dias_consecutivos_asistencia,
                req.fecha,
            );
            self.repo
                .set_asistencia_fields(&alumno.id, req.fecha, dias)
                .await?;
        }

        tracing::info!("Created asistencia {} for alumno {}", asistencia.id, req.alumno_id);
        Ok(asistencia)
    }

    pub async fn update(&self, id: &str, req: UpdateAsistenciaRequest) -> Result<Asistencia> {
        self.repo.update_asistencia(id, &req).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_asistencia(id).await
    }

    pub async fn estadisticas(
        &self,
        alumno_id: &str,
        desde: Option<NaiveDate>,
        hasta: Option<NaiveDate>,
    ) -> Result<EstadisticasAsistencia> {
        let asistencias = self.repo.asistencias_de_alumno(alumno_id, desde, hasta).await?;

        let total = asistencias.len() as i64;
        let presentes = asistencias
            .iter()
            .filter(|a| a.estado == AsistenciaEstado::Presente)
            .count() as i64;
        let ausentes = total - presentes;

        let mut por_sede: BTreeMap<String, i64> = BTreeMap::new();
        let mut por_mes: BTreeMap<u32, i64> = BTreeMap::new();
        let mut por_fecha: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

        for asistencia in &asistencias {
            let sede = match asistencia.sede {
                Sede::PlazaArenales => "Plaza Arenales",
                Sede::PlazaTeran => "Plaza Terán",
            };
            *por_sede.entry(sede.to_string()).or_insert(0) += 1;
            *por_mes.entry(asistencia.fecha.month()).or_insert(0) += 1;

            let entry = por_fecha.entry(asistencia.fecha).or_insert((0, 0));
            if asistencia.estado == AsistenciaEstado::Presente {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        let tendencia = por_fecha
            .into_iter()
            .map(|(fecha, (presentes, ausentes))| PuntoTendencia {
                fecha,
                presentes,
                ausentes,
            })
            .collect();

        let pct = |n: i64| {
            if total > 0 {
                (n as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        };

        Ok(EstadisticasAsistencia {
            total,
            presentes,
            ausentes,
            porcentaje_presente: pct(presentes),
            porcentaje_ausente: pct(ausentes),
            por_sede,
            por_mes,
            tendencia,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use crate::error::AppError;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (AsistenciasService, Alumno) {
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

        (AsistenciasService::new(repo), alumno)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn req(alumno_id: &str, fecha: NaiveDate, estado: AsistenciaEstado) -> CreateAsistenciaRequest {
        CreateAsistenciaRequest {
            alumno_id: alumno_id.to_string(),
            fecha,
            sede: Sede::PlazaArenales,
            estado,
        }
    }

    #[tokio::test]
    async fn test_create_for_unknown_alumno_fails() {
        let (service, _) = setup().await;
        let result = service
            .create(req("missing", d(2024, 3, 4), AsistenciaEstado::Presente))
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_updates_alumno_counters() {
        let (service, alumno) = setup().await;

        service
            .create(req(&alumno.id, d(2024, 3, 4), AsistenciaEstado::Presente))
            .await
            .unwrap();
        service
            .create(req(&alumno.id, d(2024, 3, 5), AsistenciaEstado::Presente))
            .await
            .unwrap();
        // An absence does not move the counters
        service
            .create(req(&alumno.id, d(2024, 3, 6), AsistenciaEstado::Ausente))
            .await
            .unwrap();

        let refreshed = service.repo.get_alumno(&alumno.id).await.unwrap();
        assert_eq!(refreshed.dias_consecutivos_asistencia, 2);
        assert_eq!(refreshed.fecha_ultima_asistencia, Some(d(2024, 3, 5)));
    }

    #[tokio::test]
    async fn test_estadisticas() {
        let (service, alumno) = setup().await;

        service
            .create(req(&alumno.id, d(2024, 3, 4), AsistenciaEstado::Presente))
            .await
            .unwrap();
        service
            .create(req(&alumno.id, d(2024, 3, 5), AsistenciaEstado::Presente))
            .await
            .unwrap();
        service
            .create(req(&alumno.id, d(2024, 4, 1), AsistenciaEstado::Ausente))
            .await
            .unwrap();

        let stats = service.estadisticas(&alumno.id, None, None).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.presentes, 2);
        assert_eq!(stats.ausentes, 1);
        assert!((stats.porcentaje_presente - 66.66).abs() < 1.0);
        assert_eq!(stats.por_mes.get(&3), Some(&2));
        assert_eq!(stats.por_mes.get(&4), Some(&1));
        assert_eq!(stats.por_sede.get("Plaza Arenales"), Some(&3));
        assert_eq!(stats.tendencia.len(), 3);

        // Period filter narrows the set
        let march = service
            .estadisticas(&alumno.id, Some(d(2024, 3, 1)), Some(d(2024, 3, 31)))
            .await
            .unwrap();
        assert_eq!(march.total, 2);
    }
}
