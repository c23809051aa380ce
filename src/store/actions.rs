use super::models::{AppData, AttendanceStatus, Evaluation, Group, TutorshipEntry, Weekday};

/// Every mutation of the application state is expressed as one of these
/// values and funneled through `Store::dispatch`. Sync routines return
/// actions instead of touching the state directly.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    UpsertGroup(Group),
    SetGroupClassDays { group_id: String, class_days: Vec<Weekday> },
    AddEvaluation { group_id: String, evaluation: Evaluation },
    SetAttendance { group_id: String, student_id: String, date: String, status: AttendanceStatus },
    SetGrade { group_id: String, student_id: String, evaluation_id: String, score: f64 },
    SetTutorship { student_id: String, entry: TutorshipEntry },
}

impl AppData {
    pub(crate) fn apply(&mut self, action: Action) {
        match action {
            Action::UpsertGroup(group) => {
                match self.groups.iter_mut().find(|existing| existing.id == group.id) {
                    Some(existing) => *existing = group,
                    None => self.groups.push(group),
                }
            }
            Action::SetGroupClassDays { group_id, mut class_days } => {
                class_days.sort();
                class_days.dedup();
                match self.groups.iter_mut().find(|group| group.id == group_id) {
                    Some(group) => group.class_days = class_days,
                    None => tracing::warn!(group_id = %group_id, "class days for unknown group"),
                }
            }
            Action::AddEvaluation { group_id, evaluation } => {
                match self.groups.iter_mut().find(|group| group.id == group_id) {
                    Some(group) => {
                        if group.evaluations.iter().all(|existing| existing.id != evaluation.id) {
                            group.evaluations.push(evaluation);
                        }
                    }
                    None => tracing::warn!(group_id = %group_id, "evaluation for unknown group"),
                }
            }
            Action::SetAttendance { group_id, student_id, date, status } => {
                self.attendance
                    .entry(group_id)
                    .or_default()
                    .entry(student_id)
                    .or_default()
                    .insert(date, status);
            }
            Action::SetGrade { group_id, student_id, evaluation_id, score } => {
                self.grades
                    .entry(group_id)
                    .or_default()
                    .entry(student_id)
                    .or_default()
                    .insert(evaluation_id, score);
            }
            Action::SetTutorship { student_id, entry } => {
                self.tutorship.insert(student_id, entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            name: name.to_string(),
            subject: "Química".to_string(),
            color: String::new(),
            tutor_name: None,
            students: Vec::new(),
            class_days: Vec::new(),
            evaluation_kinds: Vec::new(),
            evaluations: Vec::new(),
        }
    }

    #[test]
    fn upsert_group_replaces_by_id() {
        let mut data = AppData::default();
        data.apply(Action::UpsertGroup(group("g1", "3A")));
        data.apply(Action::UpsertGroup(group("g1", "3A Matutino")));

        assert_eq!(data.groups.len(), 1);
        assert_eq!(data.groups[0].name, "3A Matutino");
    }

    #[test]
    fn class_days_are_sorted_and_deduplicated() {
        let mut data = AppData::default();
        data.apply(Action::UpsertGroup(group("g1", "3A")));
        data.apply(Action::SetGroupClassDays {
            group_id: "g1".to_string(),
            class_days: vec![Weekday::Friday, Weekday::Monday, Weekday::Friday],
        });

        assert_eq!(data.groups[0].class_days, vec![Weekday::Monday, Weekday::Friday]);
    }

    #[test]
    fn add_evaluation_ignores_duplicate_ids() {
        let mut data = AppData::default();
        data.apply(Action::UpsertGroup(group("g1", "3A")));
        let evaluation = Evaluation {
            id: "e1".to_string(),
            name: "Examen 1".to_string(),
            max_score: 10.0,
            partial: 1,
            kind_id: "k1".to_string(),
        };
        data.apply(Action::AddEvaluation { group_id: "g1".to_string(), evaluation: evaluation.clone() });
        data.apply(Action::AddEvaluation { group_id: "g1".to_string(), evaluation });

        assert_eq!(data.groups[0].evaluations.len(), 1);
    }

    #[test]
    fn set_grade_overwrites_previous_score() {
        let mut data = AppData::default();
        data.apply(Action::SetGrade {
            group_id: "g1".to_string(),
            student_id: "s1".to_string(),
            evaluation_id: "e1".to_string(),
            score: 7.0,
        });
        data.apply(Action::SetGrade {
            group_id: "g1".to_string(),
            student_id: "s1".to_string(),
            evaluation_id: "e1".to_string(),
            score: 9.0,
        });

        assert_eq!(data.grades["g1"]["s1"]["e1"], 9.0);
    }
}
