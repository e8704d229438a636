//! Business-logic services
//!
//! Each service wraps the repository with the validation and aggregation
//! rules of its entity. The citas service lives in its own module because
//! of the conflict and recurrence machinery around it.

pub mod alumnos;
pub mod asistencias;
pub mod notas;
pub mod pagos;
pub mod precios;
pub mod turnos;

pub use alumnos::AlumnosService;
pub use asistencias::AsistenciasService;
pub use notas::NotasService;
pub use pagos::PagosService;
pub use precios::PreciosService;
pub use turnos::TurnosService;
