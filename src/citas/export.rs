//! Export of citas to CSV and iCal
//!
//! Both formats are built in memory and handed back as strings for the
//! download endpoints.

use std::collections::HashMap;

use csv::WriterBuilder;
use serde::Deserialize;

use crate::citas::horario::parse_time_to_minutes;
use crate::db::models::{Cita, CitaStatus, CitaTipo};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Ical,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Ical => "text/calendar; charset=utf-8",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            ExportFormat::Csv => "citas.csv",
            ExportFormat::Ical => "citas.ics",
        }
    }
}

fn status_label(status: CitaStatus) -> &'static str {
    match status {
        CitaStatus::Scheduled => "scheduled",
        CitaStatus::Confirmed => "confirmed",
        CitaStatus::InProgress => "in-progress",
        CitaStatus::Completed => "completed",
        CitaStatus::Cancelled => "cancelled",
        CitaStatus::NoShow => "no-show",
    }
}

/// CSV export; `nombres` maps student_id to display name for the Alumno
/// column
pub fn to_csv(citas: &[Cita], nombres: &HashMap<String, String>) -> Result<String> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());

    wtr.write_record([
        "ID",
        "Título",
        "Fecha",
        "Hora",
        "Duración",
        "Alumno",
        "Estado",
        "Tipo",
        "Notas",
        "Recurrente",
    ])
    .map_err(|e| AppError::Generic(format!("Error al exportar las citas: {}", e)))?;

    for cita in citas {
        let alumno = cita
            .student_id
            .as_ref()
            .and_then(|id| nombres.get(id))
            .cloned()
            .unwrap_or_default();

        let tipo = match cita.tipo {
            CitaTipo::Individual => "individual",
            CitaTipo::Group => "group",
            CitaTipo::Evaluation => "evaluation",
            CitaTipo::Consultation => "consultation",
        };

        wtr.write_record([
            cita.id.as_str(),
            cita.title.as_str(),
            &cita.date.to_string(),
            cita.time.as_str(),
            &format!("{} min", cita.duration),
            alumno.as_str(),
            status_label(cita.status),
            tipo,
            cita.notes.as_deref().unwrap_or(""),
            if cita.recurring { "Sí" } else { "No" },
        ])
        .map_err(|e| AppError::Generic(format!("Error al exportar las citas: {}", e)))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Generic(format!("Error al exportar las citas: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Generic(format!("Error al exportar las citas: {}", e)))
}

/// iCal timestamp: YYYYMMDDTHHMMSSZ
fn ical_datetime(cita: &Cita, minutes_offset: u32) -> String {
    let start = parse_time_to_minutes(&cita.time).unwrap_or(0) + minutes_offset;
    format!(
        "{}T{:02}{:02}00Z",
        cita.date.format("%Y%m%d"),
        (start / 60) % 24,
        start % 60
    )
}

pub fn to_ical(citas: &[Cita]) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Gimnasia App//ES".to_string(),
    ];

    for cita in citas {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@gimnasia.app", cita.id));
        lines.push(format!("DTSTART:{}", ical_datetime(cita, 0)));
        lines.push(format!("DTEND:{}", ical_datetime(cita, cita.duration.max(0) as u32)));
        lines.push(format!("SUMMARY:{}", cita.title));
        lines.push(format!("DESCRIPTION:{}", cita.notes.as_deref().unwrap_or("")));
        lines.push(format!("STATUS:{}", status_label(cita.status).to_uppercase()));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CitaTipo;
    use chrono::{NaiveDate, Utc};

    fn cita(title: &str, time: &str) -> Cita {
        let now = Utc::now();
        Cita {
            id: "abc".to_string(),
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            time: time.to_string(),
            duration: 90,
            student_id: Some("al1".to_string()),
            status: CitaStatus::Confirmed,
            tipo: CitaTipo::Individual,
            notes: Some("traer equipo".to_string()),
            recurring: false,
            recurringtype: None,
            recurringend: None,
            maxcapacity: 1,
            buffertime: 15,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_csv_contains_row_and_headers() {
        let mut nombres = HashMap::new();
        nombres.insert("al1".to_string(), "Ana Pérez".to_string());

        let csv = to_csv(&[cita("Evaluación trimestral", "09:30")], &nombres).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "ID,Título,Fecha,Hora,Duración,Alumno,Estado,Tipo,Notas,Recurrente"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Evaluación trimestral"));
        assert!(row.contains("Ana Pérez"));
        assert!(row.contains("90 min"));
        assert!(row.contains("confirmed"));
        assert!(row.contains("No"));
    }

    #[test]
    fn test_ical_event_times() {
        let ical = to_ical(&[cita("Entrenamiento", "09:30")]);

        assert!(ical.starts_with("BEGIN:VCALENDAR"));
        assert!(ical.ends_with("END:VCALENDAR"));
        assert!(ical.contains("UID:abc@gimnasia.app"));
        assert!(ical.contains("DTSTART:20240304T093000Z"));
        assert!(ical.contains("DTEND:20240304T110000Z"));
        assert!(ical.contains("STATUS:CONFIRMED"));
    }
}
