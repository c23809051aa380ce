use crate::schemas::backend::GradePushRow;
use crate::services::backend::BackendService;
use crate::services::notifier::{Notifier, Severity};
use crate::store::models::AppData;
use crate::sync::SyncError;

/// Unlike attendance there is no remote diff: every run re-sends the full
/// current grade set in one `sync-calificaciones` write and the backend
/// upserts it.
pub(crate) async fn run(
    backend: &BackendService,
    data: &AppData,
    notifier: &dyn Notifier,
) -> Result<usize, SyncError> {
    let rows = collect(data, backend.professor_name());

    if rows.is_empty() {
        notifier.notify(Severity::Info, "No hay calificaciones capturadas para sincronizar.");
        return Ok(0);
    }

    let count = rows.len();
    backend.push_grades(rows).await?;
    notifier.notify(Severity::Success, &format!("Se enviaron {count} calificaciones."));
    Ok(count)
}

/// Every non-null (student, evaluation) score in the store, flattened in
/// group → student → evaluation order.
pub(crate) fn collect(data: &AppData, professor_name: &str) -> Vec<GradePushRow> {
    let mut rows = Vec::new();
    for group in &data.groups {
        let Some(by_student) = data.grades.get(&group.id) else {
            continue;
        };
        for student in &group.students {
            let Some(by_evaluation) = by_student.get(&student.id) else {
                continue;
            };
            for evaluation in &group.evaluations {
                let Some(score) = by_evaluation.get(&evaluation.id) else {
                    continue;
                };
                rows.push(GradePushRow {
                    profesor_nombre: professor_name.to_string(),
                    grupo_id: group.id.clone(),
                    grupo_nombre: group.name.clone(),
                    materia_nombre: group.subject.clone(),
                    alumno_id: student.id.clone(),
                    alumno_nombre: student.name.clone(),
                    alumno_matricula: student.enrollment_id.clone().unwrap_or_default(),
                    evaluacion_id: evaluation.id.clone(),
                    evaluacion_nombre: evaluation.name.clone(),
                    parcial: evaluation.partial,
                    calificacion: *score,
                    max_score: evaluation.max_score,
                });
            }
        }
    }
    rows
}
