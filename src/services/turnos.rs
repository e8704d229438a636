//! Turnos service
//!
//! Configured shifts in the weekly grid. Active turnos form a disjoint set
//! of daily intervals; overlap is rejected with a conflict error.

use crate::citas::horario::{parse_time_to_minutes, times_overlap};
use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

fn turno_interval(start_time: &str, end_time: &str) -> Result<(u32, u32)> {
    let start = parse_time_to_minutes(start_time)
        .ok_or_else(|| AppError::validation("Horario de inicio inválido, se espera HH:MM"))?;
    let end = parse_time_to_minutes(end_time)
        .ok_or_else(|| AppError::validation("Horario de fin inválido, se espera HH:MM"))?;
    if start >= end {
        return Err(AppError::validation(
            "El horario de inicio debe ser menor al de fin",
        ));
    }
    Ok((start, end))
}

#[derive(Clone)]
pub struct TurnosService {
    repo: Repository,
}

impl TurnosService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Turno>> {
        self.repo.list_turnos().await
    }

    pub async fn get(&self, id: &str) -> Result<Turno> {
        self.repo.get_turno(id).await
    }

    pub async fn create(&self, req: CreateTurnoRequest) -> Result<Turno> {
        if req.name.trim().is_empty() {
            return Err(AppError::validation("Faltan campos obligatorios"));
        }
        let (start, end) = turno_interval(&req.start_time, &req.end_time)?;

        if req.is_active.unwrap_or(true) {
            self.check_overlap(start, end, None).await?;
        }

        let turno = self.repo.create_turno(&req).await?;
        tracing::info!("Created turno {} ({}-{})", turno.id, turno.start_time, turno.end_time);
        Ok(turno)
    }

    pub async fn update(&self, id: &str, req: UpdateTurnoRequest) -> Result<Turno> {
        let mut turno = self.repo.get_turno(id).await?;

        if let Some(name) = req.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("Faltan campos obligatorios"));
            }
            turno.name = name;
        }
        if let Some(start_time) = req.start_time {
            turno.start_time = start_time;
        }
        if let Some(end_time) = req.end_time {
            turno.end_time = end_time;
        }
        if let Some(is_active) = req.is_active {
            turno.is_active = is_active;
        }

        let (start, end) = turno_interval(&turno.start_time, &turno.end_time)?;
        if turno.is_active {
            self.check_overlap(start, end, Some(id)).await?;
        }

        self.repo.update_turno_row(&turno).await?;
        Ok(turno)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_turno(id).await
    }

    async fn check_overlap(&self, start: u32, end: u32, exclude_id: Option<&str>) -> Result<()> {
        let activos = self.repo.active_turnos(exclude_id).await?;

        for turno in &activos {
            let (Some(turno_start), Some(turno_end)) = (
                parse_time_to_minutes(&turno.start_time),
                parse_time_to_minutes(&turno.end_time),
            ) else {
                tracing::warn!("Turno {} has unparseable times", turno.id);
                continue;
            };

            if times_overlap(start, end, turno_start, turno_end) {
                return Err(AppError::TurnoOverlap);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> TurnosService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_database(&pool).await.unwrap();
        TurnosService::new(Repository::new(pool))
    }

    fn req(name: &str, start: &str, end: &str) -> CreateTurnoRequest {
        CreateTurnoRequest {
            name: name.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_overlapping_active_turno() {
        let service = create_test_service().await;

        service.create(req("Mañana", "09:00", "12:00")).await.unwrap();

        let result = service.create(req("Solapado", "11:00", "14:00")).await;
        assert!(matches!(result, Err(AppError::TurnoOverlap)));

        // Back-to-back is allowed
        service.create(req("Tarde", "12:00", "18:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_inactive_turnos_do_not_block() {
        let service = create_test_service().await;

        let mut inactivo = req("Viejo", "09:00", "12:00");
        inactivo.is_active = Some(false);
        service.create(inactivo).await.unwrap();

        service.create(req("Nuevo", "10:00", "13:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_validates_times() {
        let service = create_test_service().await;
        let turno = service.create(req("Mañana", "09:00", "12:00")).await.unwrap();

        let result = service
            .update(
                &turno.id,
                UpdateTurnoRequest {
                    end_time: Some("08:00".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // A turno may be edited without tripping over itself
        let updated = service
            .update(
                &turno.id,
                UpdateTurnoRequest {
                    end_time: Some("13:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.end_time, "13:00");
    }
}
