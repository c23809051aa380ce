use std::collections::HashMap;

use crate::core::time::today_string;
use crate::schemas::backend::{AttendancePushRow, RemoteAttendanceRow};
use crate::services::backend::BackendService;
use crate::services::notifier::{Notifier, Severity};
use crate::store::models::AppData;
use crate::sync::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyncScope {
    Today,
    All,
}

/// One read, at most one write: fetch the professor's remote snapshot, diff
/// the local records against it, push only what is missing or different.
pub(crate) async fn run(
    backend: &BackendService,
    data: &AppData,
    scope: SyncScope,
    notifier: &dyn Notifier,
) -> Result<usize, SyncError> {
    let remote = backend.fetch_attendance().await?;
    let candidates = plan(data, &remote, scope, &today_string(), backend.professor_name());

    if candidates.is_empty() {
        notifier.notify(Severity::Info, "Las asistencias ya están sincronizadas.");
        return Ok(0);
    }

    backend.push_attendance(&candidates).await?;
    notifier.notify(
        Severity::Success,
        &format!("Se sincronizaron {} registros de asistencia.", candidates.len()),
    );
    Ok(candidates.len())
}

/// Pure diff of (local snapshot, remote rows, scope, today). Pending records
/// are never candidates; remote records are only added or overwritten, never
/// deleted.
pub(crate) fn plan(
    data: &AppData,
    remote: &[RemoteAttendanceRow],
    scope: SyncScope,
    today: &str,
    professor_name: &str,
) -> Vec<AttendancePushRow> {
    let remote_lookup: HashMap<(&str, &str), &str> = remote
        .iter()
        .map(|row| ((row.alumno_id.as_str(), row.fecha.as_str()), row.status.as_str()))
        .collect();

    let mut candidates = Vec::new();
    for group in &data.groups {
        let Some(by_student) = data.attendance.get(&group.id) else {
            continue;
        };
        for student in &group.students {
            let Some(by_date) = by_student.get(&student.id) else {
                continue;
            };
            for (date, status) in by_date {
                if status.is_pending() {
                    continue;
                }
                if scope == SyncScope::Today && date != today {
                    continue;
                }

                let up_to_date = remote_lookup
                    .get(&(student.id.as_str(), date.as_str()))
                    .is_some_and(|remote_status| *remote_status == status.as_wire());
                if up_to_date {
                    continue;
                }

                candidates.push(AttendancePushRow {
                    profesor_nombre: professor_name.to_string(),
                    materia_nombre: group.subject.clone(),
                    grupo_id: group.id.clone(),
                    grupo_nombre: group.name.clone(),
                    alumno_id: student.id.clone(),
                    alumno_nombre: student.name.clone(),
                    fecha: date.clone(),
                    status: status.as_wire().to_string(),
                });
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{AttendanceStatus, Group, Student};

    fn fixture(records: &[(&str, AttendanceStatus)]) -> AppData {
        let mut data = AppData::default();
        data.groups.push(Group {
            id: "g1".to_string(),
            name: "3A".to_string(),
            subject: "Química".to_string(),
            color: String::new(),
            tutor_name: None,
            students: vec![Student {
                id: "s1".to_string(),
                name: "Ana María".to_string(),
                enrollment_id: None,
                repeating: false,
            }],
            class_days: Vec::new(),
            evaluation_kinds: Vec::new(),
            evaluations: Vec::new(),
        });
        for (date, status) in records {
            data.attendance
                .entry("g1".to_string())
                .or_default()
                .entry("s1".to_string())
                .or_default()
                .insert(date.to_string(), *status);
        }
        data
    }

    fn remote_row(alumno_id: &str, fecha: &str, status: &str) -> RemoteAttendanceRow {
        RemoteAttendanceRow {
            alumno_id: alumno_id.to_string(),
            fecha: fecha.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn missing_remote_record_is_a_candidate() {
        let data = fixture(&[("2024-01-01", AttendanceStatus::Present)]);
        let candidates = plan(&data, &[], SyncScope::All, "2024-06-15", "J. Pérez");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alumno_id, "s1");
        assert_eq!(candidates[0].fecha, "2024-01-01");
        assert_eq!(candidates[0].status, "presente");
    }

    #[test]
    fn identical_remote_record_is_skipped() {
        let data = fixture(&[("2024-01-01", AttendanceStatus::Present)]);
        let remote = vec![remote_row("s1", "2024-01-01", "presente")];
        assert!(plan(&data, &remote, SyncScope::All, "2024-06-15", "J. Pérez").is_empty());
    }

    #[test]
    fn differing_remote_record_is_overwritten() {
        let data = fixture(&[("2024-01-01", AttendanceStatus::Late)]);
        let remote = vec![remote_row("s1", "2024-01-01", "presente")];
        let candidates = plan(&data, &remote, SyncScope::All, "2024-06-15", "J. Pérez");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].status, "retardo");
    }

    #[test]
    fn pending_records_are_never_candidates() {
        let data = fixture(&[("2024-01-01", AttendanceStatus::Pending)]);
        assert!(plan(&data, &[], SyncScope::All, "2024-06-15", "J. Pérez").is_empty());
        assert!(plan(&data, &[], SyncScope::Today, "2024-01-01", "J. Pérez").is_empty());
    }

    #[test]
    fn today_scope_keeps_only_todays_records() {
        let data = fixture(&[
            ("2024-01-01", AttendanceStatus::Present),
            ("2024-06-15", AttendanceStatus::Absent),
        ]);
        let candidates = plan(&data, &[], SyncScope::Today, "2024-06-15", "J. Pérez");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].fecha, "2024-06-15");
        assert_eq!(candidates[0].status, "ausente");
    }

    #[test]
    fn unknown_student_ids_in_attendance_are_skipped() {
        let mut data = fixture(&[("2024-01-01", AttendanceStatus::Present)]);
        data.attendance
            .get_mut("g1")
            .unwrap()
            .entry("ghost".to_string())
            .or_default()
            .insert("2024-01-01".to_string(), AttendanceStatus::Present);

        let candidates = plan(&data, &[], SyncScope::All, "2024-06-15", "J. Pérez");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].alumno_id, "s1");
    }
}
