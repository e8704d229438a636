//! Repository layer for database operations
//!
//! All SQL lives here. The repository owns the pool and is injected into
//! the services; operations that must share a transaction (conflict-checked
//! cita writes, price-history rollover) are associated functions generic
//! over the executor so they run on either the pool or an open transaction.

use super::models::*;
use crate::config::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::error::{AppError, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    (per_page, (page - 1) * per_page)
}

fn total_pages(total: i64, per_page: i64) -> i64 {
    if total == 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Citas =====

    /// Insert a fully-built cita row. The caller assigns id and timestamps
    /// so recurring expansion can batch sibling rows through one
    /// transaction.
    pub async fn insert_cita<'e, E>(ex: E, cita: &Cita) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO citas (id, title, date, time, duration, student_id, status, tipo, notes,
                               recurring, recurringtype, recurringend, maxcapacity, buffertime,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cita.id)
        .bind(&cita.title)
        .bind(cita.date)
        .bind(&cita.time)
        .bind(cita.duration)
        .bind(&cita.student_id)
        .bind(cita.status)
        .bind(cita.tipo)
        .bind(&cita.notes)
        .bind(cita.recurring)
        .bind(cita.recurringtype)
        .bind(cita.recurringend)
        .bind(cita.maxcapacity)
        .bind(cita.buffertime)
        .bind(cita.created_at)
        .bind(cita.updated_at)
        .execute(ex)
        .await?;

        tracing::debug!("Inserted cita: {}", cita.id);
        Ok(())
    }

    /// Same-day citas that count for conflict checks: everything not
    /// cancelled, optionally excluding one id (edit flows), ordered by time.
    pub async fn citas_on_date<'e, E>(
        ex: E,
        date: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Cita>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let citas = match exclude_id {
            Some(id) => {
                sqlx::query_as::<_, Cita>(
                    r#"
                    SELECT * FROM citas
                    WHERE date = ? AND status != 'cancelled' AND id != ?
                    ORDER BY time ASC
                    "#,
                )
                .bind(date)
                .bind(id)
                .fetch_all(ex)
                .await?
            }
            None => {
                sqlx::query_as::<_, Cita>(
                    r#"
                    SELECT * FROM citas
                    WHERE date = ? AND status != 'cancelled'
                    ORDER BY time ASC
                    "#,
                )
                .bind(date)
                .fetch_all(ex)
                .await?
            }
        };

        Ok(citas)
    }

    /// Rewrite every mutable field of an existing cita
    pub async fn update_cita_row<'e, E>(ex: E, cita: &Cita) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            r#"
            UPDATE citas
            SET title = ?, date = ?, time = ?, duration = ?, student_id = ?, status = ?,
                tipo = ?, notes = ?, recurring = ?, recurringtype = ?, recurringend = ?,
                maxcapacity = ?, buffertime = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&cita.title)
        .bind(cita.date)
        .bind(&cita.time)
        .bind(cita.duration)
        .bind(&cita.student_id)
        .bind(cita.status)
        .bind(cita.tipo)
        .bind(&cita.notes)
        .bind(cita.recurring)
        .bind(cita.recurringtype)
        .bind(cita.recurringend)
        .bind(cita.maxcapacity)
        .bind(cita.buffertime)
        .bind(cita.updated_at)
        .bind(&cita.id)
        .execute(ex)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Cita", cita.id.clone()));
        }

        Ok(())
    }

    pub async fn get_cita(&self, id: &str) -> Result<Cita> {
        sqlx::query_as::<_, Cita>("SELECT * FROM citas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Cita", id))
    }

    pub async fn list_citas(&self, filter: &CitaFilter) -> Result<Vec<Cita>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM citas WHERE 1=1");
        push_cita_filters(&mut qb, filter);
        qb.push(" ORDER BY date ASC, time ASC");

        let citas = qb.build_query_as::<Cita>().fetch_all(&self.pool).await?;
        Ok(citas)
    }

    /// Hard delete; recurring siblings are independent rows and stay
    pub async fn delete_cita(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM citas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Cita", id));
        }

        tracing::debug!("Deleted cita: {}", id);
        Ok(())
    }

    pub async fn count_citas_between(&self, from: NaiveDate, to: NaiveDate) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM citas WHERE date >= ? AND date <= ?")
                .bind(from)
                .bind(to)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count_citas_on(&self, date: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM citas WHERE date = ?")
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_citas_pendientes(&self, from: NaiveDate) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM citas WHERE date >= ? AND status IN ('scheduled', 'confirmed')",
        )
        .bind(from)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // ===== Alumnos =====

    pub async fn create_alumno(&self, req: &CreateAlumnoRequest) -> Result<Alumno> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let alumno = sqlx::query_as::<_, Alumno>(
            r#"
            INSERT INTO alumnos (id, nombre, apellido, email, telefono, sede, activo,
                                 alertas_activas, dias_consecutivos_asistencia, estado_pago,
                                 shift_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.nombre)
        .bind(&req.apellido)
        .bind(&req.email)
        .bind(&req.telefono)
        .bind(req.sede)
        .bind(req.activo.unwrap_or(true))
        .bind(req.alertas_activas.unwrap_or(false))
        .bind(req.estado_pago.unwrap_or(EstadoPago::AlDia))
        .bind(&req.shift_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created alumno: {}", id);
        Ok(alumno)
    }

    pub async fn get_alumno(&self, id: &str) -> Result<Alumno> {
        sqlx::query_as::<_, Alumno>("SELECT * FROM alumnos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Alumno", id))
    }

    pub async fn list_alumnos(&self, filter: &AlumnoFilter) -> Result<Paginated<Alumno>> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM alumnos WHERE 1=1");
        push_alumno_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM alumnos WHERE 1=1");
        push_alumno_filters(&mut qb, filter);
        match filter.order_direction {
            Some(OrderDirection::Desc) => qb.push(" ORDER BY apellido DESC, nombre DESC"),
            _ => qb.push(" ORDER BY apellido ASC, nombre ASC"),
        };
        let (per_page, offset) = page_bounds(filter.page, filter.per_page);
        qb.push(" LIMIT ").push_bind(per_page);
        qb.push(" OFFSET ").push_bind(offset);

        let data = qb.build_query_as::<Alumno>().fetch_all(&self.pool).await?;

        Ok(Paginated {
            data,
            total,
            total_pages: total_pages(total, per_page),
        })
    }

    pub async fn update_alumno(&self, id: &str, req: &UpdateAlumnoRequest) -> Result<Alumno> {
        let current = self.get_alumno(id).await?;

        sqlx::query(
            r#"
            UPDATE alumnos
            SET nombre = ?, apellido = ?, email = ?, telefono = ?, sede = ?, activo = ?,
                alertas_activas = ?, estado_pago = ?, shift_id = ?
            WHERE id = ?
            "#,
        )
        .bind(req.nombre.as_ref().unwrap_or(&current.nombre))
        .bind(req.apellido.as_ref().unwrap_or(&current.apellido))
        .bind(req.email.as_ref().or(current.email.as_ref()))
        .bind(req.telefono.as_ref().or(current.telefono.as_ref()))
        .bind(req.sede.unwrap_or(current.sede))
        .bind(req.activo.unwrap_or(current.activo))
        .bind(req.alertas_activas.unwrap_or(current.alertas_activas))
        .bind(req.estado_pago.unwrap_or(current.estado_pago))
        .bind(req.shift_id.as_ref().or(current.shift_id.as_ref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_alumno(id).await
    }

    pub async fn delete_alumno(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM alumnos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Alumno", id));
        }

        tracing::debug!("Deleted alumno: {}", id);
        Ok(())
    }

    pub async fn set_estado_pago(&self, id: &str, estado: EstadoPago) -> Result<()> {
        let rows = sqlx::query("UPDATE alumnos SET estado_pago = ? WHERE id = ?")
            .bind(estado)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Alumno", id));
        }
        Ok(())
    }

    pub async fn set_asistencia_fields(
        &self,
        id: &str,
        fecha: NaiveDate,
        dias_consecutivos: i64,
    ) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE alumnos SET fecha_ultima_asistencia = ?, dias_consecutivos_asistencia = ? WHERE id = ?",
        )
        .bind(fecha)
        .bind(dias_consecutivos)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Alumno", id));
        }
        Ok(())
    }

    pub async fn reset_dias_consecutivos(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE alumnos SET dias_consecutivos_asistencia = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Alumno", id));
        }
        Ok(())
    }

    // ===== Asistencias =====

    pub async fn create_asistencia(&self, req: &CreateAsistenciaRequest) -> Result<Asistencia> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let asistencia = sqlx::query_as::<_, Asistencia>(
            r#"
            INSERT INTO asistencias (id, alumno_id, fecha, sede, estado, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.alumno_id)
        .bind(req.fecha)
        .bind(req.sede)
        .bind(req.estado)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created asistencia: {} for alumno {}", id, req.alumno_id);
        Ok(asistencia)
    }

    pub async fn get_asistencia(&self, id: &str) -> Result<Asistencia> {
        sqlx::query_as::<_, Asistencia>("SELECT * FROM asistencias WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Asistencia", id))
    }

    pub async fn list_asistencias(&self, filter: &AsistenciaFilter) -> Result<Paginated<Asistencia>> {
        let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM asistencias JOIN alumnos ON alumnos.id = asistencias.alumno_id WHERE 1=1",
        );
        push_asistencia_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT asistencias.* FROM asistencias JOIN alumnos ON alumnos.id = asistencias.alumno_id WHERE 1=1",
        );
        push_asistencia_filters(&mut qb, filter);
        qb.push(" ORDER BY asistencias.fecha DESC");
        let (per_page, offset) = page_bounds(filter.page, filter.per_page);
        qb.push(" LIMIT ").push_bind(per_page);
        qb.push(" OFFSET ").push_bind(offset);

        let data = qb
            .build_query_as::<Asistencia>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated {
            data,
            total,
            total_pages: total_pages(total, per_page),
        })
    }

    pub async fn update_asistencia(
        &self,
        id: &str,
        req: &UpdateAsistenciaRequest,
    ) -> Result<Asistencia> {
        let current = self.get_asistencia(id).await?;
        let now = Utc::now();

        sqlx::query(
            "UPDATE asistencias SET fecha = ?, sede = ?, estado = ?, updated_at = ? WHERE id = ?",
        )
        .bind(req.fecha.unwrap_or(current.fecha))
        .bind(req.sede.unwrap_or(current.sede))
        .bind(req.estado.unwrap_or(current.estado))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_asistencia(id).await
    }

    pub async fn delete_asistencia(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM asistencias WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Asistencia", id));
        }
        Ok(())
    }

    pub async fn asistencias_de_alumno(
        &self,
        alumno_id: &str,
        desde: Option<NaiveDate>,
        hasta: Option<NaiveDate>,
    ) -> Result<Vec<Asistencia>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM asistencias WHERE alumno_id = ");
        qb.push_bind(alumno_id);
        if let Some(desde) = desde {
            qb.push(" AND fecha >= ").push_bind(desde);
        }
        if let Some(hasta) = hasta {
            qb.push(" AND fecha <= ").push_bind(hasta);
        }
        qb.push(" ORDER BY fecha ASC");

        let asistencias = qb
            .build_query_as::<Asistencia>()
            .fetch_all(&self.pool)
            .await?;
        Ok(asistencias)
    }

    // ===== Pagos =====

    pub async fn create_pago(&self, req: &CreatePagoRequest) -> Result<Pago> {
        let mut tx = self.pool.begin().await?;
        let pago = Self::insert_pago(&mut *tx, req).await?;
        tx.commit().await?;
        Ok(pago)
    }

    async fn insert_pago<'e, E>(ex: E, req: &CreatePagoRequest) -> Result<Pago>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let pago = sqlx::query_as::<_, Pago>(
            r#"
            INSERT INTO pagos (id, alumno_id, monto, fecha_pago, mes, anio, metodo_pago, estado,
                               periodo_desde, periodo_hasta, notas, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.alumno_id)
        .bind(req.monto)
        .bind(req.fecha_pago)
        .bind(req.mes)
        .bind(req.anio)
        .bind(req.metodo_pago)
        .bind(req.estado.unwrap_or(PagoEstado::Pendiente))
        .bind(req.periodo_desde)
        .bind(req.periodo_hasta)
        .bind(&req.notas)
        .bind(now)
        .fetch_one(ex)
        .await?;

        tracing::debug!("Created pago: {} for alumno {}", id, req.alumno_id);
        Ok(pago)
    }

    /// Bulk registration, one transaction for the whole batch
    pub async fn create_pagos_bulk(&self, reqs: &[CreatePagoRequest]) -> Result<Vec<Pago>> {
        let mut tx = self.pool.begin().await?;
        let mut pagos = Vec::with_capacity(reqs.len());

        for req in reqs {
            pagos.push(Self::insert_pago(&mut *tx, req).await?);
        }

        tx.commit().await?;
        Ok(pagos)
    }

    pub async fn get_pago(&self, id: &str) -> Result<Pago> {
        sqlx::query_as::<_, Pago>("SELECT * FROM pagos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Pago", id))
    }

    pub async fn list_pagos(&self, filter: &PagoFilter) -> Result<Paginated<Pago>> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM pagos WHERE 1=1");
        push_pago_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM pagos WHERE 1=1");
        push_pago_filters(&mut qb, filter);
        qb.push(" ORDER BY fecha_pago DESC");
        let (per_page, offset) = page_bounds(filter.page, filter.per_page);
        qb.push(" LIMIT ").push_bind(per_page);
        qb.push(" OFFSET ").push_bind(offset);

        let data = qb.build_query_as::<Pago>().fetch_all(&self.pool).await?;

        Ok(Paginated {
            data,
            total,
            total_pages: total_pages(total, per_page),
        })
    }

    /// Unpaginated filtered fetch, used by the summary/statistics views
    pub async fn pagos_por_filtros(&self, filter: &PagoFilter) -> Result<Vec<Pago>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM pagos WHERE 1=1");
        push_pago_filters(&mut qb, filter);
        qb.push(" ORDER BY fecha_pago DESC");

        let pagos = qb.build_query_as::<Pago>().fetch_all(&self.pool).await?;
        Ok(pagos)
    }

    pub async fn update_pago(&self, id: &str, req: &UpdatePagoRequest) -> Result<Pago> {
        let current = self.get_pago(id).await?;

        sqlx::query(
            r#"
            UPDATE pagos
            SET monto = ?, fecha_pago = ?, mes = ?, anio = ?, metodo_pago = ?, estado = ?,
                periodo_desde = ?, periodo_hasta = ?, notas = ?
            WHERE id = ?
            "#,
        )
        .bind(req.monto.unwrap_or(current.monto))
        .bind(req.fecha_pago.unwrap_or(current.fecha_pago))
        .bind(req.mes.unwrap_or(current.mes))
        .bind(req.anio.unwrap_or(current.anio))
        .bind(req.metodo_pago.unwrap_or(current.metodo_pago))
        .bind(req.estado.unwrap_or(current.estado))
        .bind(req.periodo_desde.or(current.periodo_desde))
        .bind(req.periodo_hasta.or(current.periodo_hasta))
        .bind(req.notas.as_ref().or(current.notas.as_ref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_pago(id).await
    }

    pub async fn delete_pago(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM pagos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Pago", id));
        }
        Ok(())
    }

    // ===== Notas =====

    pub async fn create_nota(&self, req: &CreateNotaRequest) -> Result<Nota> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let nota = sqlx::query_as::<_, Nota>(
            r#"
            INSERT INTO notas (id, alumno_id, fecha, contenido, tipo, categoria, calificacion,
                               visible_en_reporte, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.alumno_id)
        .bind(req.fecha)
        .bind(&req.contenido)
        .bind(req.tipo)
        .bind(req.categoria)
        .bind(req.calificacion)
        .bind(req.visible_en_reporte.unwrap_or(false))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created nota: {} for alumno {}", id, req.alumno_id);
        Ok(nota)
    }

    pub async fn get_nota(&self, id: &str) -> Result<Nota> {
        sqlx::query_as::<_, Nota>("SELECT * FROM notas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Nota", id))
    }

    pub async fn list_notas(&self, filter: &NotaFilter) -> Result<Paginated<Nota>> {
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM notas WHERE 1=1");
        push_nota_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM notas WHERE 1=1");
        push_nota_filters(&mut qb, filter);
        qb.push(" ORDER BY fecha DESC");
        let (per_page, offset) = page_bounds(filter.page, filter.per_page);
        qb.push(" LIMIT ").push_bind(per_page);
        qb.push(" OFFSET ").push_bind(offset);

        let data = qb.build_query_as::<Nota>().fetch_all(&self.pool).await?;

        Ok(Paginated {
            data,
            total,
            total_pages: total_pages(total, per_page),
        })
    }

    pub async fn update_nota(&self, id: &str, req: &UpdateNotaRequest) -> Result<Nota> {
        let current = self.get_nota(id).await?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notas
            SET fecha = ?, contenido = ?, tipo = ?, categoria = ?, calificacion = ?,
                visible_en_reporte = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.fecha.unwrap_or(current.fecha))
        .bind(req.contenido.as_ref().unwrap_or(&current.contenido))
        .bind(req.tipo.unwrap_or(current.tipo))
        .bind(req.categoria.or(current.categoria))
        .bind(req.calificacion.or(current.calificacion))
        .bind(req.visible_en_reporte.unwrap_or(current.visible_en_reporte))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_nota(id).await
    }

    pub async fn delete_nota(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Nota", id));
        }
        Ok(())
    }

    // ===== Historial de precios =====

    pub async fn insert_precio<'e, E>(ex: E, req: &CreatePrecioRequest) -> Result<HistorialPrecio>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let precio = sqlx::query_as::<_, HistorialPrecio>(
            r#"
            INSERT INTO historial_precios (id, alumno_id, precio, moneda, servicio, tipo_servicio,
                                           fecha_desde, fecha_hasta, activo, notas, created_at,
                                           updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.alumno_id)
        .bind(req.precio)
        .bind(req.moneda.unwrap_or(Moneda::Ars))
        .bind(req.servicio)
        .bind(req.tipo_servicio)
        .bind(req.fecha_desde)
        .bind(req.fecha_hasta)
        .bind(req.activo.unwrap_or(true))
        .bind(&req.notas)
        .bind(now)
        .bind(now)
        .fetch_one(ex)
        .await?;

        tracing::debug!("Created historial_precio: {}", id);
        Ok(precio)
    }

    /// Price vigente for the alumno at the date: active, started on or
    /// before it, not yet closed (or closing after it), newest first.
    pub async fn precio_vigente<'e, E>(
        ex: E,
        alumno_id: &str,
        fecha: NaiveDate,
    ) -> Result<Option<HistorialPrecio>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let precio = sqlx::query_as::<_, HistorialPrecio>(
            r#"
            SELECT * FROM historial_precios
            WHERE alumno_id = ? AND activo = 1 AND fecha_desde <= ?
              AND (fecha_hasta IS NULL OR fecha_hasta > ?)
            ORDER BY fecha_desde DESC
            LIMIT 1
            "#,
        )
        .bind(alumno_id)
        .bind(fecha)
        .bind(fecha)
        .fetch_optional(ex)
        .await?;

        Ok(precio)
    }

    pub async fn close_precio<'e, E>(ex: E, id: &str, fecha_fin: NaiveDate) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE historial_precios SET activo = 0, fecha_hasta = ?, updated_at = ? WHERE id = ?",
        )
        .bind(fecha_fin)
        .bind(Utc::now())
        .bind(id)
        .execute(ex)
        .await?;

        Ok(())
    }

    pub async fn list_precios(&self, filter: &PrecioFilter) -> Result<Vec<HistorialPrecio>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM historial_precios WHERE 1=1");
        if let Some(alumno_id) = &filter.alumno_id {
            qb.push(" AND alumno_id = ").push_bind(alumno_id);
        }
        if let Some(fecha) = filter.fecha {
            qb.push(" AND fecha_desde <= ").push_bind(fecha);
            qb.push(" AND (fecha_hasta IS NULL OR fecha_hasta > ")
                .push_bind(fecha);
            qb.push(")");
        }
        if filter.solo_activos.unwrap_or(false) {
            qb.push(" AND activo = 1");
        }
        if let Some(moneda) = filter.moneda {
            qb.push(" AND moneda = ").push_bind(moneda);
        }
        if let Some(tipo) = filter.tipo_servicio {
            qb.push(" AND tipo_servicio = ").push_bind(tipo);
        }
        qb.push(" ORDER BY fecha_desde DESC");

        let precios = qb
            .build_query_as::<HistorialPrecio>()
            .fetch_all(&self.pool)
            .await?;
        Ok(precios)
    }

    pub async fn get_precio(&self, id: &str) -> Result<HistorialPrecio> {
        sqlx::query_as::<_, HistorialPrecio>("SELECT * FROM historial_precios WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("HistorialPrecio", id))
    }

    pub async fn update_precio(&self, id: &str, req: &UpdatePrecioRequest) -> Result<HistorialPrecio> {
        let current = self.get_precio(id).await?;

        sqlx::query(
            r#"
            UPDATE historial_precios
            SET precio = ?, moneda = ?, servicio = ?, tipo_servicio = ?, fecha_hasta = ?,
                activo = ?, notas = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.precio.unwrap_or(current.precio))
        .bind(req.moneda.unwrap_or(current.moneda))
        .bind(req.servicio.unwrap_or(current.servicio))
        .bind(req.tipo_servicio.unwrap_or(current.tipo_servicio))
        .bind(req.fecha_hasta.or(current.fecha_hasta))
        .bind(req.activo.unwrap_or(current.activo))
        .bind(req.notas.as_ref().or(current.notas.as_ref()))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_precio(id).await
    }

    pub async fn delete_precio(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM historial_precios WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("HistorialPrecio", id));
        }
        Ok(())
    }

    // ===== Turnos =====

    pub async fn create_turno(&self, req: &CreateTurnoRequest) -> Result<Turno> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let turno = sqlx::query_as::<_, Turno>(
            r#"
            INSERT INTO turnos (id, name, start_time, end_time, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.start_time)
        .bind(&req.end_time)
        .bind(req.is_active.unwrap_or(true))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created turno: {}", id);
        Ok(turno)
    }

    pub async fn get_turno(&self, id: &str) -> Result<Turno> {
        sqlx::query_as::<_, Turno>("SELECT * FROM turnos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Turno", id))
    }

    pub async fn list_turnos(&self) -> Result<Vec<Turno>> {
        let turnos = sqlx::query_as::<_, Turno>("SELECT * FROM turnos ORDER BY start_time ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(turnos)
    }

    pub async fn active_turnos(&self, exclude_id: Option<&str>) -> Result<Vec<Turno>> {
        let turnos = match exclude_id {
            Some(id) => {
                sqlx::query_as::<_, Turno>(
                    "SELECT * FROM turnos WHERE is_active = 1 AND id != ? ORDER BY start_time ASC",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Turno>(
                    "SELECT * FROM turnos WHERE is_active = 1 ORDER BY start_time ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(turnos)
    }

    pub async fn update_turno_row(&self, turno: &Turno) -> Result<()> {
        let rows = sqlx::query(
            "UPDATE turnos SET name = ?, start_time = ?, end_time = ?, is_active = ? WHERE id = ?",
        )
        .bind(&turno.name)
        .bind(&turno.start_time)
        .bind(&turno.end_time)
        .bind(turno.is_active)
        .bind(&turno.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Turno", turno.id.clone()));
        }
        Ok(())
    }

    pub async fn delete_turno(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM turnos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Turno", id));
        }
        Ok(())
    }
}

fn push_cita_filters<'args>(qb: &mut QueryBuilder<'args, Sqlite>, filter: &'args CitaFilter) {
    if let Some(from) = filter.date_from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date <= ").push_bind(to);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(student_id) = &filter.student_id {
        qb.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(tipo) = filter.tipo {
        qb.push(" AND tipo = ").push_bind(tipo);
    }
}

fn push_alumno_filters<'args>(qb: &mut QueryBuilder<'args, Sqlite>, filter: &'args AlumnoFilter) {
    if let Some(sede) = filter.sede {
        qb.push(" AND sede = ").push_bind(sede);
    }
    if let Some(activo) = filter.activo {
        qb.push(" AND activo = ").push_bind(activo);
    }
    if let Some(estado) = filter.estado_pago {
        qb.push(" AND estado_pago = ").push_bind(estado);
    }
}

fn push_asistencia_filters<'args>(qb: &mut QueryBuilder<'args, Sqlite>, filter: &'args AsistenciaFilter) {
    if let Some(alumno_id) = &filter.alumno_id {
        qb.push(" AND asistencias.alumno_id = ").push_bind(alumno_id);
    }
    if let Some(estado) = filter.estado {
        qb.push(" AND asistencias.estado = ").push_bind(estado);
    }
    if let Some(sede) = filter.sede {
        qb.push(" AND asistencias.sede = ").push_bind(sede);
    }
    if let Some(fecha) = filter.fecha {
        qb.push(" AND asistencias.fecha = ").push_bind(fecha);
    }
    if let Some(shift_id) = &filter.shift_id {
        qb.push(" AND alumnos.shift_id = ").push_bind(shift_id);
    }
}

fn push_pago_filters<'args>(qb: &mut QueryBuilder<'args, Sqlite>, filter: &'args PagoFilter) {
    if let Some(alumno_id) = &filter.alumno_id {
        qb.push(" AND alumno_id = ").push_bind(alumno_id);
    }
    if let Some(estado) = filter.estado {
        qb.push(" AND estado = ").push_bind(estado);
    }
    if let Some(metodo) = filter.metodo_pago {
        qb.push(" AND metodo_pago = ").push_bind(metodo);
    }
    if let Some(desde) = filter.fecha_desde {
        qb.push(" AND fecha_pago >= ").push_bind(desde);
    }
    if let Some(hasta) = filter.fecha_hasta {
        qb.push(" AND fecha_pago <= ").push_bind(hasta);
    }
}

fn push_nota_filters<'args>(qb: &mut QueryBuilder<'args, Sqlite>, filter: &'args NotaFilter) {
    if let Some(alumno_id) = &filter.alumno_id {
        qb.push(" AND alumno_id = ").push_bind(alumno_id);
    }
    if let Some(tipo) = filter.tipo {
        qb.push(" AND tipo = ").push_bind(tipo);
    }
    if let Some(categoria) = filter.categoria {
        qb.push(" AND categoria = ").push_bind(categoria);
    }
    if let Some(visible) = filter.visible_en_reporte {
        qb.push(" AND visible_en_reporte = ").push_bind(visible);
    }
    if let Some(min) = filter.calificacion_min {
        qb.push(" AND calificacion >= ").push_bind(min);
    }
    if let Some(max) = filter.calificacion_max {
        qb.push(" AND calificacion <= ").push_bind(max);
    }
    if let Some(desde) = filter.fecha_desde {
        qb.push(" AND fecha >= ").push_bind(desde);
    }
    if let Some(hasta) = filter.fecha_hasta {
        qb.push(" AND fecha <= ").push_bind(hasta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    fn alumno_req(nombre: &str) -> CreateAlumnoRequest {
        CreateAlumnoRequest {
            nombre: nombre.to_string(),
            apellido: "Pérez".to_string(),
            email: None,
            telefono: None,
            sede: Sede::PlazaArenales,
            activo: None,
            alertas_activas: None,
            estado_pago: None,
            shift_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_alumno() {
        let repo = create_test_repo().await;

        let alumno = repo.create_alumno(&alumno_req("Ana")).await.unwrap();
        assert_eq!(alumno.nombre, "Ana");
        assert!(alumno.activo);
        assert_eq!(alumno.estado_pago, EstadoPago::AlDia);

        let fetched = repo.get_alumno(&alumno.id).await.unwrap();
        assert_eq!(fetched.id, alumno.id);
        assert_eq!(fetched.sede, Sede::PlazaArenales);
    }

    #[tokio::test]
    async fn test_list_alumnos_filters_and_pagination() {
        let repo = create_test_repo().await;

        for i in 1..=7 {
            repo.create_alumno(&alumno_req(&format!("Alumno {}", i)))
                .await
                .unwrap();
        }

        let page = repo
            .list_alumnos(&AlumnoFilter {
                page: Some(2),
                per_page: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 3);

        let filtered = repo
            .list_alumnos(&AlumnoFilter {
                sede: Some(Sede::PlazaTeran),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.total, 0);
    }

    #[tokio::test]
    async fn test_update_alumno_merges_fields() {
        let repo = create_test_repo().await;
        let alumno = repo.create_alumno(&alumno_req("Ana")).await.unwrap();

        let updated = repo
            .update_alumno(
                &alumno.id,
                &UpdateAlumnoRequest {
                    telefono: Some("11-5555".to_string()),
                    estado_pago: Some(EstadoPago::Atrasado),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.nombre, "Ana");
        assert_eq!(updated.telefono.as_deref(), Some("11-5555"));
        assert_eq!(updated.estado_pago, EstadoPago::Atrasado);
    }

    #[tokio::test]
    async fn test_delete_alumno_not_found() {
        let repo = create_test_repo().await;
        let result = repo.delete_alumno("missing").await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_citas_on_date_excludes_cancelled_and_id() {
        let repo = create_test_repo().await;
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let mut primera = test_cita(date, "09:00", 60);
        primera.id = "c1".to_string();
        Repository::insert_cita(repo.pool(), &primera).await.unwrap();

        let mut cancelada = test_cita(date, "10:00", 60);
        cancelada.id = "c2".to_string();
        cancelada.status = CitaStatus::Cancelled;
        Repository::insert_cita(repo.pool(), &cancelada)
            .await
            .unwrap();

        let all = Repository::citas_on_date(repo.pool(), date, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "c1");

        let excluded = Repository::citas_on_date(repo.pool(), date, Some("c1"))
            .await
            .unwrap();
        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn test_pagos_bulk_insert() {
        let repo = create_test_repo().await;
        let alumno = repo.create_alumno(&alumno_req("Ana")).await.unwrap();

        let reqs: Vec<CreatePagoRequest> = (1..=3)
            .map(|mes| CreatePagoRequest {
                alumno_id: alumno.id.clone(),
                monto: 15000.0,
                fecha_pago: NaiveDate::from_ymd_opt(2024, mes, 1).unwrap(),
                mes: mes as i64,
                anio: 2024,
                metodo_pago: MetodoPago::Efectivo,
                estado: Some(PagoEstado::Pagado),
                periodo_desde: None,
                periodo_hasta: None,
                notas: None,
            })
            .collect();

        let pagos = repo.create_pagos_bulk(&reqs).await.unwrap();
        assert_eq!(pagos.len(), 3);

        let listed = repo
            .list_pagos(&PagoFilter {
                alumno_id: Some(alumno.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.total, 3);
    }

    fn test_cita(date: NaiveDate, time: &str, duration: i64) -> Cita {
        let now = Utc::now();
        Cita {
            id: Uuid::new_v4().to_string(),
            title: "Entrenamiento".to_string(),
            date,
            time: time.to_string(),
            duration,
            student_id: None,
            status: CitaStatus::Scheduled,
            tipo: CitaTipo::Individual,
            notes: None,
            recurring: false,
            recurringtype: None,
            recurringend: None,
            maxcapacity: 1,
            buffertime: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
