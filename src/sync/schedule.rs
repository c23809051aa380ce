use std::collections::HashMap;

use uuid::Uuid;

use crate::services::schedule::{ReferenceRow, ScheduleRow, ScheduleSource};
use crate::store::models::{AppData, EvaluationKind, Group, Weekday};
use crate::store::Action;
use crate::sync::normalize::names_match;
use crate::sync::SyncError;

pub(crate) const UNKNOWN_SUBJECT: &str = "Materia desconocida";
pub(crate) const UNKNOWN_GROUP: &str = "Grupo desconocido";

const GROUP_COLORS: &[&str] = &["#1E88E5", "#43A047", "#F4511E", "#8E24AA", "#F9A825", "#00897B"];

#[derive(Debug, Clone)]
pub(crate) struct ProjectedEntry {
    pub(crate) weekday: Weekday,
    pub(crate) start_time: String,
    pub(crate) duration_minutes: i64,
    pub(crate) subject_name: String,
    pub(crate) group_name: String,
}

#[derive(Debug, Default)]
pub(crate) struct SchedulePlan {
    pub(crate) actions: Vec<Action>,
    pub(crate) created: usize,
    pub(crate) updated: usize,
}

/// Resolve the professor, pull their schedule and the reference tables, then
/// plan group creations/updates against the local state. All fetches are
/// sequential; the caller dispatches the returned actions.
pub(crate) async fn run(
    source: &dyn ScheduleSource,
    data: &AppData,
    professor_name: &str,
) -> Result<SchedulePlan, SyncError> {
    if professor_name.trim().is_empty() {
        return Err(SyncError::Config(
            "Configura el nombre del profesor antes de importar el horario.".to_string(),
        ));
    }

    let Some(teacher) = source.find_teacher(professor_name).await? else {
        return Err(SyncError::Config(format!(
            "No se encontró al profesor \"{professor_name}\" en el horario."
        )));
    };

    let rows = source.schedule_rows(&teacher.id).await?;
    let subjects = source.subjects().await?;
    let groups = source.groups().await?;

    let projected = project(&rows, &subjects, &groups);
    Ok(plan(&projected, &data.groups))
}

pub(crate) fn project(
    rows: &[ScheduleRow],
    subjects: &[ReferenceRow],
    groups: &[ReferenceRow],
) -> Vec<ProjectedEntry> {
    let subjects_by_id = reference_lookup(subjects);
    let groups_by_id = reference_lookup(groups);

    rows.iter()
        .map(|row| {
            let entry = ProjectedEntry {
                weekday: row.weekday,
                start_time: row.start_time.clone(),
                duration_minutes: row.duration_minutes,
                subject_name: resolve_name(&subjects_by_id, &row.subject_id, UNKNOWN_SUBJECT),
                group_name: resolve_name(&groups_by_id, &row.group_id, UNKNOWN_GROUP),
            };
            tracing::debug!(
                day = entry.weekday.spanish_name(),
                start = %entry.start_time,
                minutes = entry.duration_minutes,
                subject = %entry.subject_name,
                group = %entry.group_name,
                "schedule entry"
            );
            entry
        })
        .collect()
}

/// A teacher may teach the same external group two different subjects, so
/// entries group under `"<group> - <subject>"` and each combination becomes
/// one local Group. Existing groups (by normalized name) get their class
/// days overwritten; the rest are created with an empty roster.
pub(crate) fn plan(entries: &[ProjectedEntry], existing: &[Group]) -> SchedulePlan {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, (String, Vec<Weekday>)> = HashMap::new();

    for entry in entries {
        let key = format!("{} - {}", entry.group_name, entry.subject_name);
        let slot = merged.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (entry.subject_name.clone(), Vec::new())
        });
        if !slot.1.contains(&entry.weekday) {
            slot.1.push(entry.weekday);
        }
    }

    let mut result = SchedulePlan::default();
    for key in order {
        let Some((subject_name, mut class_days)) = merged.remove(&key) else {
            continue;
        };
        class_days.sort();

        match existing.iter().find(|group| names_match(&group.name, &key)) {
            Some(group) => {
                result.actions.push(Action::SetGroupClassDays {
                    group_id: group.id.clone(),
                    class_days,
                });
                result.updated += 1;
            }
            None => {
                let color = GROUP_COLORS[result.created % GROUP_COLORS.len()].to_string();
                result.actions.push(Action::UpsertGroup(Group {
                    id: Uuid::new_v4().to_string(),
                    name: key,
                    subject: subject_name,
                    color,
                    tutor_name: None,
                    students: Vec::new(),
                    class_days,
                    evaluation_kinds: default_evaluation_kinds(),
                    evaluations: Vec::new(),
                }));
                result.created += 1;
            }
        }
    }
    result
}

fn default_evaluation_kinds() -> Vec<EvaluationKind> {
    (1..=2)
        .map(|partial| EvaluationKind {
            id: Uuid::new_v4().to_string(),
            name: "Evaluación".to_string(),
            weight: 100.0,
            partial,
        })
        .collect()
}

fn reference_lookup(rows: &[ReferenceRow]) -> HashMap<&str, &str> {
    rows.iter()
        .filter(|row| !row.name.trim().is_empty())
        .map(|row| (row.id.as_str(), row.name.as_str()))
        .collect()
}

fn resolve_name(lookup: &HashMap<&str, &str>, id: &str, placeholder: &str) -> String {
    lookup.get(id).map(|name| name.to_string()).unwrap_or_else(|| placeholder.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(weekday: Weekday, subject_id: &str, group_id: &str) -> ScheduleRow {
        ScheduleRow {
            weekday,
            start_time: "07:00".to_string(),
            duration_minutes: 50,
            subject_id: subject_id.to_string(),
            group_id: group_id.to_string(),
        }
    }

    fn reference(id: &str, name: &str) -> ReferenceRow {
        ReferenceRow { id: id.to_string(), name: name.to_string() }
    }

    #[test]
    fn same_group_and_subject_merge_into_one_group_with_all_days() {
        let rows =
            vec![row(Weekday::Monday, "m1", "g1"), row(Weekday::Wednesday, "m1", "g1")];
        let projected =
            project(&rows, &[reference("m1", "Química")], &[reference("g1", "3A")]);
        let result = plan(&projected, &[]);

        assert_eq!(result.created, 1);
        assert_eq!(result.updated, 0);
        assert_eq!(result.actions.len(), 1);
        match &result.actions[0] {
            Action::UpsertGroup(group) => {
                assert_eq!(group.name, "3A - Química");
                assert_eq!(group.subject, "Química");
                assert_eq!(group.class_days, vec![Weekday::Monday, Weekday::Wednesday]);
                assert!(group.students.is_empty());
                assert_eq!(group.evaluation_kinds.len(), 2);
                assert!(group
                    .evaluation_kinds
                    .iter()
                    .all(|kind| (kind.weight - 100.0).abs() < f64::EPSILON));
                assert_eq!(group.evaluation_kinds[0].partial, 1);
                assert_eq!(group.evaluation_kinds[1].partial, 2);
            }
            other => panic!("expected UpsertGroup, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_days_are_not_repeated() {
        let rows = vec![row(Weekday::Monday, "m1", "g1"), row(Weekday::Monday, "m1", "g1")];
        let projected =
            project(&rows, &[reference("m1", "Química")], &[reference("g1", "3A")]);
        let result = plan(&projected, &[]);

        match &result.actions[0] {
            Action::UpsertGroup(group) => {
                assert_eq!(group.class_days, vec![Weekday::Monday]);
            }
            other => panic!("expected UpsertGroup, got {other:?}"),
        }
    }

    #[test]
    fn same_group_with_two_subjects_becomes_two_groups() {
        let rows = vec![row(Weekday::Monday, "m1", "g1"), row(Weekday::Tuesday, "m2", "g1")];
        let projected = project(
            &rows,
            &[reference("m1", "Química"), reference("m2", "Física")],
            &[reference("g1", "3A")],
        );
        let result = plan(&projected, &[]);

        assert_eq!(result.created, 2);
        let names: Vec<_> = result
            .actions
            .iter()
            .map(|action| match action {
                Action::UpsertGroup(group) => group.name.clone(),
                other => panic!("expected UpsertGroup, got {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["3A - Química", "3A - Física"]);
    }

    #[test]
    fn existing_group_is_updated_by_normalized_name() {
        let rows = vec![row(Weekday::Friday, "m1", "g1")];
        let projected =
            project(&rows, &[reference("m1", "Química")], &[reference("g1", "3A")]);

        let existing = Group {
            id: "local-1".to_string(),
            name: "3a - QUÍMICA".to_string(),
            subject: "Química".to_string(),
            color: String::new(),
            tutor_name: None,
            students: Vec::new(),
            class_days: vec![Weekday::Monday],
            evaluation_kinds: Vec::new(),
            evaluations: Vec::new(),
        };
        let result = plan(&projected, &[existing]);

        assert_eq!(result.created, 0);
        assert_eq!(result.updated, 1);
        match &result.actions[0] {
            Action::SetGroupClassDays { group_id, class_days } => {
                assert_eq!(group_id, "local-1");
                assert_eq!(class_days, &vec![Weekday::Friday]);
            }
            other => panic!("expected SetGroupClassDays, got {other:?}"),
        }
    }

    #[test]
    fn missing_references_fall_back_to_placeholders() {
        let rows = vec![row(Weekday::Monday, "missing", "g1")];
        let projected = project(&rows, &[], &[reference("g1", "3A")]);

        assert_eq!(projected[0].subject_name, UNKNOWN_SUBJECT);
        assert_eq!(projected[0].group_name, "3A");
        assert_eq!(projected[0].start_time, "07:00");
        assert_eq!(projected[0].duration_minutes, 50);

        let result = plan(&projected, &[]);
        match &result.actions[0] {
            Action::UpsertGroup(group) => {
                assert_eq!(group.name, format!("3A - {UNKNOWN_SUBJECT}"));
            }
            other => panic!("expected UpsertGroup, got {other:?}"),
        }
    }
}
