pub mod export;
pub mod horario;
pub mod recurrence;
pub mod service;

pub use horario::{AvailabilityResult, ConflictInfo};
pub use service::{CitaService, CitaStats};
