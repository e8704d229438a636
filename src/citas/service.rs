//! Booking service for citas
//!
//! High-level operations over the appointment table: advisory availability
//! checks, conflict-checked creation and updates, recurring-series
//! expansion, the daily conflict scan and the dashboard statistics.
//!
//! The conflict check and the write run inside one transaction, so a
//! concurrent request cannot book the same slot between the check and the
//! insert. The standalone availability check stays read-only for the UI.

use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::horario::{conflicts_against, day_conflicts, parse_time_to_minutes, AvailabilityResult, ConflictInfo};
use super::recurrence::series_dates;
use crate::config::{MAX_BUFFER_MIN, MAX_CITA_DURATION_MIN, MIN_CITA_DURATION_MIN};
use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

/// Dashboard statistics for the citas view
#[derive(Debug, Clone, Serialize)]
pub struct CitaStats {
    pub total_citas: i64,
    pub citas_hoy: i64,
    pub citas_pendientes: i64,
    pub conflictos: i64,
    /// Share of this month's citas that fall today, rounded percentage
    pub utilizacion: i64,
}

#[derive(Clone)]
pub struct CitaService {
    repo: Repository,
}

impl CitaService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &str) -> Result<Cita> {
        self.repo.get_cita(id).await
    }

    pub async fn list(&self, filter: &CitaFilter) -> Result<Vec<Cita>> {
        self.repo.list_citas(filter).await
    }

    /// Advisory availability check for the booking form. Read-only; the
    /// caller may still create against a taken slot with `force`.
    pub async fn check_availability(
        &self,
        date: NaiveDate,
        time: &str,
        duration: i64,
        buffertime: i64,
        exclude_id: Option<&str>,
    ) -> Result<AvailabilityResult> {
        let start = validate_slot(time, duration, buffertime)?;
        let end = start + duration as u32;

        let existing = Repository::citas_on_date(self.repo.pool(), date, exclude_id).await?;
        Ok(AvailabilityResult::from_conflicts(conflicts_against(
            start, end, &existing,
        )))
    }

    pub async fn create(&self, req: CreateCitaRequest) -> Result<Cita> {
        if req.title.trim().is_empty() {
            return Err(AppError::validation("El título es requerido"));
        }
        let start = validate_slot(&req.time, req.duration, req.buffertime)?;
        let end = start + req.duration as u32;

        let maxcapacity = req.maxcapacity.unwrap_or(1);
        if maxcapacity < 1 {
            return Err(AppError::validation("La capacidad máxima debe ser al menos 1"));
        }

        let recurrencia = if req.recurring {
            let rtype = req
                .recurringtype
                .ok_or_else(|| AppError::validation("El tipo de recurrencia es requerido"))?;
            let rend = req
                .recurringend
                .ok_or_else(|| AppError::validation("La fecha de fin de recurrencia es requerida"))?;
            if rend < req.date {
                return Err(AppError::validation(
                    "La fecha de fin de recurrencia debe ser posterior a la cita",
                ));
            }
            Some((rtype, rend))
        } else {
            None
        };

        let now = Utc::now();
        let base = Cita {
            id: Uuid::new_v4().to_string(),
            title: req.title.clone(),
            date: req.date,
            time: req.time.clone(),
            duration: req.duration,
            student_id: req.student_id.clone(),
            status: req.status.unwrap_or(CitaStatus::Scheduled),
            tipo: req.tipo.unwrap_or(CitaTipo::Individual),
            notes: req.notes.clone(),
            recurring: req.recurring,
            recurringtype: req.recurringtype,
            recurringend: req.recurringend,
            maxcapacity,
            buffertime: req.buffertime,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.repo.pool().begin().await?;

        let existing = Repository::citas_on_date(&mut *tx, base.date, None).await?;
        let conflicts = conflicts_against(start, end, &existing);
        if !conflicts.is_empty() && !req.force {
            return Err(AppError::SlotUnavailable);
        }

        Repository::insert_cita(&mut *tx, &base).await?;

        if let Some((rtype, rend)) = recurrencia {
            let dates = series_dates(base.date, rtype, rend);

            if !req.force {
                let mut ocupadas = Vec::new();
                for date in &dates {
                    let existing = Repository::citas_on_date(&mut *tx, *date, None).await?;
                    if !conflicts_against(start, end, &existing).is_empty() {
                        ocupadas.push(date.to_string());
                    }
                }
                if !ocupadas.is_empty() {
                    return Err(AppError::validation(format!(
                        "El horario no está disponible en las fechas: {}",
                        ocupadas.join(", ")
                    )));
                }
            }

            for date in dates {
                let sibling = Cita {
                    id: Uuid::new_v4().to_string(),
                    date,
                    ..base.clone()
                };
                Repository::insert_cita(&mut *tx, &sibling).await?;
            }
        }

        tx.commit().await?;

        tracing::info!("Created cita {} on {} {}", base.id, base.date, base.time);
        Ok(base)
    }

    pub async fn update(&self, id: &str, req: UpdateCitaRequest) -> Result<Cita> {
        let current = self.repo.get_cita(id).await?;

        let slot_changed = req.date.is_some()
            || req.time.is_some()
            || req.duration.is_some()
            || req.buffertime.is_some();

        let mut updated = current.clone();
        if let Some(title) = req.title {
            if title.trim().is_empty() {
                return Err(AppError::validation("El título es requerido"));
            }
            updated.title = title;
        }
        if let Some(date) = req.date {
            updated.date = date;
        }
        if let Some(time) = req.time {
            updated.time = time;
        }
        if let Some(duration) = req.duration {
            updated.duration = duration;
        }
        if let Some(student_id) = req.student_id {
            updated.student_id = Some(student_id);
        }
        if let Some(status) = req.status {
            updated.status = status;
        }
        if let Some(tipo) = req.tipo {
            updated.tipo = tipo;
        }
        if let Some(notes) = req.notes {
            updated.notes = Some(notes);
        }
        if let Some(recurring) = req.recurring {
            updated.recurring = recurring;
        }
        if let Some(rtype) = req.recurringtype {
            updated.recurringtype = Some(rtype);
        }
        if let Some(rend) = req.recurringend {
            updated.recurringend = Some(rend);
        }
        if let Some(maxcapacity) = req.maxcapacity {
            if maxcapacity < 1 {
                return Err(AppError::validation("La capacidad máxima debe ser al menos 1"));
            }
            updated.maxcapacity = maxcapacity;
        }
        if let Some(buffertime) = req.buffertime {
            updated.buffertime = buffertime;
        }
        updated.updated_at = Utc::now();

        let start = validate_slot(&updated.time, updated.duration, updated.buffertime)?;
        let end = start + updated.duration as u32;

        let mut tx = self.repo.pool().begin().await?;

        if slot_changed && updated.status != CitaStatus::Cancelled {
            let existing = Repository::citas_on_date(&mut *tx, updated.date, Some(id)).await?;
            let conflicts = conflicts_against(start, end, &existing);
            if !conflicts.is_empty() && !req.force {
                return Err(AppError::SlotUnavailable);
            }
        }

        Repository::update_cita_row(&mut *tx, &updated).await?;
        tx.commit().await?;

        tracing::debug!("Updated cita {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_cita(id).await
    }

    /// Overlapping pairs among a day's non-cancelled citas
    pub async fn conflicts_for_date(&self, date: NaiveDate) -> Result<Vec<ConflictInfo>> {
        let citas = Repository::citas_on_date(self.repo.pool(), date, None).await?;
        Ok(day_conflicts(&citas))
    }

    pub async fn stats(&self) -> Result<CitaStats> {
        let today = Utc::now().date_naive();
        let start_of_month = today.with_day(1).unwrap_or(today);
        let end_of_month = start_of_month
            .checked_add_months(Months::new(1))
            .and_then(|d| d.checked_sub_days(Days::new(1)))
            .unwrap_or(today);

        let total_citas = self.repo.count_citas_between(start_of_month, end_of_month).await?;
        let citas_hoy = self.repo.count_citas_on(today).await?;
        let citas_pendientes = self.repo.count_citas_pendientes(today).await?;
        let conflictos = self.conflicts_for_date(today).await?.len() as i64;

        let utilizacion = if total_citas > 0 {
            ((citas_hoy as f64 / total_citas as f64) * 100.0).round() as i64
        } else {
            0
        };

        Ok(CitaStats {
            total_citas,
            citas_hoy,
            citas_pendientes,
            conflictos,
            utilizacion,
        })
    }
}

/// Validates the temporal fields of a slot and returns the start in
/// minutes since midnight. Citas may not cross midnight.
fn validate_slot(time: &str, duration: i64, buffertime: i64) -> Result<u32> {
    let start = parse_time_to_minutes(time)
        .ok_or_else(|| AppError::validation("Hora inválida, se espera HH:MM"))?;

    if duration < MIN_CITA_DURATION_MIN as i64 || duration > MAX_CITA_DURATION_MIN as i64 {
        return Err(AppError::validation(format!(
            "La duración debe estar entre {} y {} minutos",
            MIN_CITA_DURATION_MIN, MAX_CITA_DURATION_MIN
        )));
    }
    if buffertime < 0 || buffertime > MAX_BUFFER_MIN as i64 {
        return Err(AppError::validation(format!(
            "El buffer debe estar entre 0 y {} minutos",
            MAX_BUFFER_MIN
        )));
    }
    if start + duration as u32 > 24 * 60 {
        return Err(AppError::validation("La cita no puede cruzar la medianoche"));
    }

    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> CitaService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        CitaService::new(Repository::new(pool))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cita_req(date: NaiveDate, time: &str) -> CreateCitaRequest {
        CreateCitaRequest {
            title: "Entrenamiento".to_string(),
            date,
            time: time.to_string(),
            duration: 60,
            student_id: None,
            status: None,
            tipo: None,
            notes: None,
            recurring: false,
            recurringtype: None,
            recurringend: None,
            maxcapacity: None,
            buffertime: 0,
            force: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_check_own_slot_with_exclusion() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        let cita = service.create(cita_req(date, "09:00")).await.unwrap();

        // Without exclusion the slot reads as taken
        let taken = service
            .check_availability(date, "09:00", 60, 0, None)
            .await
            .unwrap();
        assert!(!taken.available);

        // Excluding the cita itself frees the slot (edit flow)
        let own = service
            .check_availability(date, "09:00", 60, 0, Some(cita.id.as_str()))
            .await
            .unwrap();
        assert!(own.available);
        assert!(own.conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_conflict_without_force() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        service.create(cita_req(date, "09:00")).await.unwrap();

        let result = service.create(cita_req(date, "09:30")).await;
        assert!(matches!(result, Err(AppError::SlotUnavailable)));

        // Explicit override books anyway
        let mut forced = cita_req(date, "09:30");
        forced.force = true;
        service.create(forced).await.unwrap();

        let conflicts = service.conflicts_for_date(date).await.unwrap();
        assert_eq!(conflicts.len(), 1);
    }

    #[tokio::test]
    async fn test_adjacent_slot_is_bookable() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        service.create(cita_req(date, "09:00")).await.unwrap();
        // Ends at 10:00; next one starts exactly there
        service.create(cita_req(date, "10:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_buffer_blocks_adjacent_slot() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        let mut with_buffer = cita_req(date, "09:00");
        with_buffer.buffertime = 15;
        service.create(with_buffer).await.unwrap();

        // Raw intervals touch but the stored cita demands a 15 min gap
        let result = service.create(cita_req(date, "10:00")).await;
        assert!(matches!(result, Err(AppError::SlotUnavailable)));

        let check = service
            .check_availability(date, "10:00", 60, 0, None)
            .await
            .unwrap();
        assert_eq!(check.conflicts.len(), 1);

        // 10:15 clears the buffer
        service.create(cita_req(date, "10:15")).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_citas_do_not_conflict() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        let cita = service.create(cita_req(date, "09:00")).await.unwrap();
        service
            .update(
                &cita.id,
                UpdateCitaRequest {
                    status: Some(CitaStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let check = service
            .check_availability(date, "09:00", 60, 0, None)
            .await
            .unwrap();
        assert!(check.available);

        service.create(cita_req(date, "09:00")).await.unwrap();
        assert!(service.conflicts_for_date(date).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_weekly_expansion() {
        let service = create_test_service().await;

        let mut req = cita_req(d(2024, 1, 1), "09:00");
        req.recurring = true;
        req.recurringtype = Some(RecurringType::Weekly);
        req.recurringend = Some(d(2024, 1, 22));
        service.create(req).await.unwrap();

        let citas = service.list(&CitaFilter::default()).await.unwrap();
        assert_eq!(citas.len(), 4); // base + 3 generated

        let dates: Vec<NaiveDate> = citas.iter().map(|c| c.date).collect();
        assert_eq!(
            dates,
            vec![d(2024, 1, 1), d(2024, 1, 8), d(2024, 1, 15), d(2024, 1, 22)]
        );

        // Generated instances share every field except the date
        for cita in &citas {
            assert_eq!(cita.time, "09:00");
            assert!(cita.recurring);
            assert_eq!(cita.recurringtype, Some(RecurringType::Weekly));
        }
    }

    #[tokio::test]
    async fn test_recurring_conflict_lists_dates_and_rolls_back() {
        let service = create_test_service().await;

        // Pre-existing cita on what would be the second instance
        service.create(cita_req(d(2024, 1, 15), "09:00")).await.unwrap();

        let mut req = cita_req(d(2024, 1, 1), "09:00");
        req.recurring = true;
        req.recurringtype = Some(RecurringType::Weekly);
        req.recurringend = Some(d(2024, 1, 22));
        let result = service.create(req).await;

        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("2024-01-15")),
            other => panic!("expected validation error, got {:?}", other.map(|c| c.id)),
        }

        // Nothing from the failed batch may remain, including the base
        let citas = service.list(&CitaFilter::default()).await.unwrap();
        assert_eq!(citas.len(), 1);
        assert_eq!(citas[0].date, d(2024, 1, 15));
    }

    #[tokio::test]
    async fn test_cross_midnight_rejected() {
        let service = create_test_service().await;

        let mut req = cita_req(d(2024, 3, 4), "23:30");
        req.duration = 60;
        let result = service.create(req).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_moves_slot_with_conflict_check() {
        let service = create_test_service().await;
        let date = d(2024, 3, 4);

        service.create(cita_req(date, "09:00")).await.unwrap();
        let second = service.create(cita_req(date, "11:00")).await.unwrap();

        // Moving the second onto the first must fail
        let result = service
            .update(
                &second.id,
                UpdateCitaRequest {
                    time: Some("09:30".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::SlotUnavailable)));

        // A free slot is fine
        let moved = service
            .update(
                &second.id,
                UpdateCitaRequest {
                    time: Some("14:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.time, "14:00");
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let service = create_test_service().await;
        let today = Utc::now().date_naive();

        service.create(cita_req(today, "09:00")).await.unwrap();
        let mut overlapping = cita_req(today, "09:30");
        overlapping.force = true;
        service.create(overlapping).await.unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_citas, 2);
        assert_eq!(stats.citas_hoy, 2);
        assert_eq!(stats.citas_pendientes, 2);
        assert_eq!(stats.conflictos, 1);
        assert_eq!(stats.utilizacion, 100);
    }
}
