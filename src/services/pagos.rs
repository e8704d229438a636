//! Pagos service
//!
//! Payment records plus the aggregated views: period summary for the
//! reports page and the month-by-month statistics for the dashboard.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::*;
use crate::db::Repository;
use crate::error::{AppError, Result};

fn metodo_label(metodo: MetodoPago) -> &'static str {
    match metodo {
        MetodoPago::Efectivo => "Efectivo",
        MetodoPago::Transferencia => "Transferencia",
        MetodoPago::MercadoPago => "Mercado Pago",
    }
}

fn estado_label(estado: PagoEstado) -> &'static str {
    match estado {
        PagoEstado::Pendiente => "Pendiente",
        PagoEstado::Pagado => "Pagado",
    }
}

/// Totals for a date range
#[derive(Debug, Clone, Serialize)]
pub struct ResumenPagos {
    pub total_recaudado: f64,
    pub cantidad_pagos: i64,
    pub promedio_monto: f64,
    pub por_metodo_pago: BTreeMap<String, f64>,
    pub por_estado: BTreeMap<String, i64>,
}

/// Month-by-month aggregation for the dashboard charts
#[derive(Debug, Clone, Serialize)]
pub struct EstadisticasPagos {
    pub total_recaudado: f64,
    pub pagos_por_mes: BTreeMap<String, f64>,
    pub pagos_por_metodo: BTreeMap<String, f64>,
    pub promedio_mensual: f64,
    pub cantidad_pagos: i64,
    pub monto_promedio: f64,
}

#[derive(Clone)]
pub struct PagosService {
    repo: Repository,
}

impl PagosService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, filter: &PagoFilter) -> Result<Paginated<Pago>> {
        self.repo.list_pagos(filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Pago> {
        self.repo.get_pago(id).await
    }

    pub async fn por_alumno(&self, alumno_id: &str, filter: &PagoFilter) -> Result<Vec<Pago>> {
        let filter = PagoFilter {
            alumno_id: Some(alumno_id.to_string()),
            ..filter.clone()
        };
        self.repo.pagos_por_filtros(&filter).await
    }

    pub async fn pendientes(&self) -> Result<Vec<Pago>> {
        self.repo
            .pagos_por_filtros(&PagoFilter {
                estado: Some(PagoEstado::Pendiente),
                ..Default::default()
            })
            .await
    }

    pub async fn create(&self, req: CreatePagoRequest) -> Result<Pago> {
        validar_pago(&req)?;
        let pago = self.repo.create_pago(&req).await?;
        tracing::info!("Created pago {} (${})", pago.id, pago.monto);
        Ok(pago)
    }

    /// Bulk registration used by the multi-month payment form; one
    /// transaction, all rows or none
    pub async fn create_bulk(&self, reqs: Vec<CreatePagoRequest>) -> Result<Vec<Pago>> {
        if reqs.is_empty() {
            return Err(AppError::validation("No hay pagos para registrar"));
        }
        for req in &reqs {
            validar_pago(req)?;
        }
        let pagos = self.repo.create_pagos_bulk(&reqs).await?;
        tracing::info!("Created {} pagos in bulk", pagos.len());
        Ok(pagos)
    }

    pub async fn update(&self, id: &str, req: UpdatePagoRequest) -> Result<Pago> {
        if matches!(req.monto, Some(monto) if monto <= 0.0) {
            return Err(AppError::validation("El monto debe ser mayor a cero"));
        }
        if matches!(req.mes, Some(mes) if !(1..=12).contains(&mes)) {
            return Err(AppError::validation("El mes debe estar entre 1 y 12"));
        }
        self.repo.update_pago(id, &req).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_pago(id).await
    }

    pub async fn resumen(&self, desde: NaiveDate, hasta: NaiveDate) -> Result<ResumenPagos> {
        let pagos = self
            .repo
            .pagos_por_filtros(&PagoFilter {
                fecha_desde: Some(desde),
                fecha_hasta: Some(hasta),
                ..Default::default()
            })
            .await?;

        let total_recaudado: f64 = pagos.iter().map(|p| p.monto).sum();
        let cantidad_pagos = pagos.len() as i64;

        let mut por_metodo_pago: BTreeMap<String, f64> = BTreeMap::new();
        let mut por_estado: BTreeMap<String, i64> = BTreeMap::new();
        for pago in &pagos {
            *por_metodo_pago
                .entry(metodo_label(pago.metodo_pago).to_string())
                .or_insert(0.0) += pago.monto;
            *por_estado
                .entry(estado_label(pago.estado).to_string())
                .or_insert(0) += 1;
        }

        Ok(ResumenPagos {
            total_recaudado,
            cantidad_pagos,
            promedio_monto: if cantidad_pagos > 0 {
                total_recaudado / cantidad_pagos as f64
            } else {
                0.0
            },
            por_metodo_pago,
            por_estado,
        })
    }

    pub async fn estadisticas(
        &self,
        desde: Option<NaiveDate>,
        hasta: Option<NaiveDate>,
    ) -> Result<EstadisticasPagos> {
        let pagos = self
            .repo
            .pagos_por_filtros(&PagoFilter {
                fecha_desde: desde,
                fecha_hasta: hasta,
                ..Default::default()
            })
            .await?;

        let total_recaudado: f64 = pagos.iter().map(|p| p.monto).sum();

        let mut pagos_por_mes: BTreeMap<String, f64> = BTreeMap::new();
        let mut pagos_por_metodo: BTreeMap<String, f64> = BTreeMap::new();
        for pago in &pagos {
            let key = format!("{}-{:02}", pago.anio, pago.mes);
            *pagos_por_mes.entry(key).or_insert(0.0) += pago.monto;
            *pagos_por_metodo
                .entry(metodo_label(pago.metodo_pago).to_string())
                .or_insert(0.0) += pago.monto;
        }

        let meses = pagos_por_mes.len().max(1) as f64;
        let cantidad_pagos = pagos.len() as i64;

        Ok(EstadisticasPagos {
            promedio_mensual: total_recaudado / meses,
            monto_promedio: total_recaudado / (cantidad_pagos.max(1) as f64),
            total_recaudado,
            pagos_por_mes,
            pagos_por_metodo,
            cantidad_pagos,
        })
    }
}

fn validar_pago(req: &CreatePagoRequest) -> Result<()> {
    if req.monto <= 0.0 {
        return Err(AppError::validation("El monto debe ser mayor a cero"));
    }
    if !(1..=12).contains(&req.mes) {
        return Err(AppError::validation("El mes debe estar entre 1 y 12"));
    }
    Ok(())
}
