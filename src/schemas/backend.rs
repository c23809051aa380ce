use serde::{Deserialize, Serialize};

/// Wire shapes for the attendance/grades backend. Field names follow the
/// backend's Spanish contract and must not leak past the service boundary.
#[derive(Debug, Serialize)]
pub(crate) struct AttendanceQuery<'a> {
    pub(crate) action: &'static str,
    pub(crate) profesor_nombre: &'a str,
}

impl<'a> AttendanceQuery<'a> {
    pub(crate) fn new(profesor_nombre: &'a str) -> Self {
        Self { action: "get-asistencias", profesor_nombre }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemoteAttendanceRow {
    pub(crate) alumno_id: String,
    pub(crate) fecha: String,
    pub(crate) status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AttendancePushRow {
    pub(crate) profesor_nombre: String,
    pub(crate) materia_nombre: String,
    pub(crate) grupo_id: String,
    pub(crate) grupo_nombre: String,
    pub(crate) alumno_id: String,
    pub(crate) alumno_nombre: String,
    pub(crate) fecha: String,
    pub(crate) status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GradePushRow {
    pub(crate) profesor_nombre: String,
    pub(crate) grupo_id: String,
    pub(crate) grupo_nombre: String,
    pub(crate) materia_nombre: String,
    pub(crate) alumno_id: String,
    pub(crate) alumno_nombre: String,
    pub(crate) alumno_matricula: String,
    pub(crate) evaluacion_id: String,
    pub(crate) evaluacion_nombre: String,
    pub(crate) parcial: u8,
    pub(crate) calificacion: f64,
    pub(crate) max_score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeSyncRequest {
    pub(crate) action: &'static str,
    pub(crate) data: Vec<GradePushRow>,
}

impl GradeSyncRequest {
    pub(crate) fn new(data: Vec<GradePushRow>) -> Self {
        Self { action: "sync-calificaciones", data }
    }
}
