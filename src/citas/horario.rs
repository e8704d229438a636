//! Minute-resolution interval math for the booking day
//!
//! All checks work on minutes since midnight within a single calendar day;
//! citas never cross a day boundary (creation rejects them).

use serde::Serialize;

use crate::db::models::Cita;

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_time_to_minutes(time_str: &str) -> Option<u32> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hours: u32 = parts[0].parse().ok()?;
    let minutes: u32 = parts[1].parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn minutes_to_time_string(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    format!("{:02}:{:02}", hours % 24, mins)
}

/// Strict half-open intersection of [start1, end1) and [start2, end2).
/// Back-to-back intervals (end1 == start2) do not overlap.
pub fn times_overlap(start1: u32, end1: u32, start2: u32, end2: u32) -> bool {
    start1 < end2 && start2 < end1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Overlap,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Medium,
    High,
}

/// One detected clash, as shown in the booking UI
#[derive(Debug, Clone, Serialize)]
pub struct ConflictInfo {
    pub id: String,
    pub title: String,
    pub time: String,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
}

/// Outcome of an availability check. Advisory: creation may still proceed
/// when the caller confirms the override.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub conflicts: Vec<ConflictInfo>,
}

impl AvailabilityResult {
    pub fn from_conflicts(conflicts: Vec<ConflictInfo>) -> Self {
        Self {
            available: conflicts.is_empty(),
            conflicts,
        }
    }
}

/// Interval of an existing cita in minutes, None when its stored time
/// string does not parse
fn cita_interval(cita: &Cita) -> Option<(u32, u32)> {
    let start = parse_time_to_minutes(&cita.time)?;
    Some((start, start + cita.duration.max(0) as u32))
}

/// Conflicts between a candidate interval and the existing citas of the
/// same day. Two kinds are reported per existing cita: raw interval
/// overlap, and intersection with the existing cita's interval expanded by
/// its own buffertime on both sides.
pub fn conflicts_against(start: u32, end: u32, existing: &[Cita]) -> Vec<ConflictInfo> {
    let mut conflicts = Vec::new();

    for cita in existing {
        let Some((cita_start, cita_end)) = cita_interval(cita) else {
            tracing::warn!("Cita {} has unparseable time '{}'", cita.id, cita.time);
            continue;
        };

        if times_overlap(start, end, cita_start, cita_end) {
            conflicts.push(ConflictInfo {
                id: cita.id.clone(),
                title: cita.title.clone(),
                time: cita.time.clone(),
                kind: ConflictKind::Overlap,
                severity: ConflictSeverity::High,
            });
        }

        let buffer = cita.buffertime.max(0) as u32;
        let buffer_start = cita_start.saturating_sub(buffer);
        let buffer_end = cita_end + buffer;

        if times_overlap(start, end, buffer_start, buffer_end) {
            conflicts.push(ConflictInfo {
                id: cita.id.clone(),
                title: cita.title.clone(),
                time: cita.time.clone(),
                kind: ConflictKind::Buffer,
                severity: ConflictSeverity::Medium,
            });
        }
    }

    conflicts
}

/// Pairwise scan of a day's citas for the statistics view. Buffers are not
/// applied here, only raw interval overlap.
pub fn day_conflicts(citas: &[Cita]) -> Vec<ConflictInfo> {
    let mut conflicts = Vec::new();

    for i in 0..citas.len() {
        for j in (i + 1)..citas.len() {
            let (a, b) = (&citas[i], &citas[j]);

            let (Some((start_a, end_a)), Some((start_b, end_b))) =
                (cita_interval(a), cita_interval(b))
            else {
                continue;
            };

            if times_overlap(start_a, end_a, start_b, end_b) {
                conflicts.push(ConflictInfo {
                    id: format!("{}-{}", a.id, b.id),
                    title: format!("{} vs {}", a.title, b.title),
                    time: b.time.clone(),
                    kind: ConflictKind::Overlap,
                    severity: ConflictSeverity::High,
                });
            }
        }
    }

    conflicts
}
