use std::collections::HashMap;

use uuid::Uuid;

use crate::schemas::classroom::{Course, CourseWork};
use crate::services::classroom::ClassroomApi;
use crate::store::models::{Evaluation, Group};
use crate::store::Action;
use crate::sync::normalize::{names_contain, names_match};
use crate::sync::progress::ProgressLog;
use crate::sync::SyncError;

const DEFAULT_MAX_SCORE: f64 = 10.0;

/// Wizard states. Transitions are user-driven except the entry state, which
/// depends on whether the OAuth client is configured; everything else is
/// rejected structurally.
#[derive(Debug)]
pub(crate) enum ImportState {
    Unconfigured,
    AwaitingLogin,
    CourseSelection { courses: Vec<Course>, preselected: Option<usize> },
    AssignmentSelection { course: Course, course_work: Vec<CourseWork> },
    Syncing,
    Done,
}

impl ImportState {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "sin configurar",
            Self::AwaitingLogin => "esperando inicio de sesión",
            Self::CourseSelection { .. } => "selección de curso",
            Self::AssignmentSelection { .. } => "selección de tareas",
            Self::Syncing => "sincronizando",
            Self::Done => "finalizado",
        }
    }
}

/// One import run against a single target group. The session works on a
/// snapshot of the group and accumulates actions; the caller dispatches them
/// into the store. Earlier actions are never rolled back by later failures.
pub(crate) struct ImportSession {
    group: Group,
    state: ImportState,
    log: ProgressLog,
    actions: Vec<Action>,
}

impl ImportSession {
    pub(crate) fn new(group: Group, oauth_configured: bool) -> Self {
        let state =
            if oauth_configured { ImportState::AwaitingLogin } else { ImportState::Unconfigured };
        Self { group, state, log: ProgressLog::default(), actions: Vec::new() }
    }

    pub(crate) fn state(&self) -> &ImportState {
        &self.state
    }

    pub(crate) fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub(crate) fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// `AwaitingLogin → CourseSelection`: list the signed-in teacher's
    /// courses and preselect the one whose name best matches the target
    /// group (best effort, containment either way).
    pub(crate) async fn sign_in(
        &mut self,
        api: &dyn ClassroomApi,
        token: &str,
    ) -> Result<(), SyncError> {
        if !matches!(self.state, ImportState::AwaitingLogin) {
            return Err(self.invalid_transition("selección de curso"));
        }

        let courses = api.list_courses(token).await?;
        let preselected =
            courses.iter().position(|course| names_contain(&course.name, &self.group.name));
        self.log.push(format!("Se encontraron {} cursos en Classroom.", courses.len()));
        self.state = ImportState::CourseSelection { courses, preselected };
        Ok(())
    }

    /// `CourseSelection → AssignmentSelection`: fetch the selected course's
    /// work items.
    pub(crate) async fn choose_course(
        &mut self,
        api: &dyn ClassroomApi,
        token: &str,
        index: usize,
    ) -> Result<(), SyncError> {
        let ImportState::CourseSelection { courses, .. } = &self.state else {
            return Err(self.invalid_transition("selección de tareas"));
        };
        let Some(course) = courses.get(index).cloned() else {
            return Err(SyncError::Config("Selección de curso inválida.".to_string()));
        };

        let course_work = api.list_course_work(token, &course.id).await?;
        self.log
            .push(format!("Curso \"{}\": {} tareas disponibles.", course.name, course_work.len()));
        self.state = ImportState::AssignmentSelection { course, course_work };
        Ok(())
    }

    /// `AssignmentSelection → Syncing → Done`: import grades for the
    /// selected assignments. A failure aborts only the step it happened in;
    /// the log records it and the session stays on the syncing view.
    pub(crate) async fn import(
        &mut self,
        api: &dyn ClassroomApi,
        token: &str,
        selected: &[usize],
    ) -> Result<(), SyncError> {
        if !matches!(self.state, ImportState::AssignmentSelection { .. }) {
            return Err(self.invalid_transition("sincronizando"));
        }
        let ImportState::AssignmentSelection { course, course_work } =
            std::mem::replace(&mut self.state, ImportState::Syncing)
        else {
            unreachable!("state checked above");
        };

        let roster = match api.list_students(token, &course.id).await {
            Ok(roster) => roster,
            Err(err) => {
                self.log.push(format!("Error al obtener la lista de alumnos: {err:#}"));
                return Ok(());
            }
        };
        let roster_names: HashMap<&str, &str> = roster
            .iter()
            .filter_map(|student| {
                student.display_name().map(|name| (student.user_id.as_str(), name))
            })
            .collect();

        for &index in selected {
            let Some(work) = course_work.get(index) else {
                self.log.push("Tarea seleccionada inválida, se omite.".to_string());
                continue;
            };
            let evaluation_id = self.resolve_evaluation(work);

            let submissions = match api.list_submissions(token, &course.id, &work.id).await {
                Ok(submissions) => submissions,
                Err(err) => {
                    self.log.push(format!(
                        "Tarea \"{}\": error al obtener entregas: {err:#}",
                        work.title
                    ));
                    continue;
                }
            };

            let mut imported = 0_usize;
            let mut unmatched = 0_usize;
            for submission in &submissions {
                let Some(score) = submission.assigned_grade else {
                    continue;
                };
                let Some(profile_name) = roster_names.get(submission.user_id.as_str()) else {
                    tracing::debug!(submission = %submission.id, "submission without profile");
                    unmatched += 1;
                    continue;
                };
                let Some(student_id) = self
                    .group
                    .students
                    .iter()
                    .find(|student| names_match(&student.name, profile_name))
                    .map(|student| student.id.clone())
                else {
                    unmatched += 1;
                    continue;
                };

                self.actions.push(Action::SetGrade {
                    group_id: self.group.id.clone(),
                    student_id,
                    evaluation_id: evaluation_id.clone(),
                    score,
                });
                imported += 1;
            }

            self.log.push(format!(
                "Tarea \"{}\": {} calificaciones importadas, {} entregas sin coincidencia.",
                work.title, imported, unmatched
            ));
        }

        self.state = ImportState::Done;
        self.log.push("Importación completada.".to_string());
        Ok(())
    }

    /// Exact title equality within the target group; created at most once per
    /// title, so a re-run reuses the evaluation instead of duplicating it.
    fn resolve_evaluation(&mut self, work: &CourseWork) -> String {
        if let Some(existing) =
            self.group.evaluations.iter().find(|evaluation| evaluation.name == work.title)
        {
            return existing.id.clone();
        }

        let kind_id = self
            .group
            .evaluation_kinds
            .iter()
            .find(|kind| kind.partial == 1)
            .or_else(|| self.group.evaluation_kinds.first())
            .map(|kind| kind.id.clone())
            .unwrap_or_default();
        let evaluation = Evaluation {
            id: Uuid::new_v4().to_string(),
            name: work.title.clone(),
            max_score: work.max_points.unwrap_or(DEFAULT_MAX_SCORE),
            partial: 1,
            kind_id,
        };

        self.log.push(format!("Se creó la evaluación \"{}\".", work.title));
        self.group.evaluations.push(evaluation.clone());
        self.actions.push(Action::AddEvaluation {
            group_id: self.group.id.clone(),
            evaluation: evaluation.clone(),
        });
        evaluation.id
    }

    fn invalid_transition(&self, to: &'static str) -> SyncError {
        SyncError::InvalidTransition { from: self.state.name(), to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashSet;

    use crate::schemas::classroom::{
        ProfileName, RosterStudent, StudentProfile, StudentSubmission,
    };
    use crate::store::models::{EvaluationKind, Student};

    struct FakeApi {
        courses: Vec<Course>,
        course_work: Vec<CourseWork>,
        submissions: HashMap<String, Vec<StudentSubmission>>,
        roster: Vec<RosterStudent>,
        failing_work: HashSet<String>,
    }

    impl Default for FakeApi {
        fn default() -> Self {
            Self {
                courses: Vec::new(),
                course_work: Vec::new(),
                submissions: HashMap::new(),
                roster: Vec::new(),
                failing_work: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl ClassroomApi for FakeApi {
        async fn list_courses(&self, _token: &str) -> Result<Vec<Course>> {
            Ok(self.courses.clone())
        }

        async fn list_course_work(
            &self,
            _token: &str,
            _course_id: &str,
        ) -> Result<Vec<CourseWork>> {
            Ok(self.course_work.clone())
        }

        async fn list_submissions(
            &self,
            _token: &str,
            _course_id: &str,
            course_work_id: &str,
        ) -> Result<Vec<StudentSubmission>> {
            if self.failing_work.contains(course_work_id) {
                anyhow::bail!("connection reset");
            }
            Ok(self.submissions.get(course_work_id).cloned().unwrap_or_default())
        }

        async fn list_students(
            &self,
            _token: &str,
            _course_id: &str,
        ) -> Result<Vec<RosterStudent>> {
            Ok(self.roster.clone())
        }
    }

    fn course(id: &str, name: &str) -> Course {
        Course { id: id.to_string(), name: name.to_string(), section: None }
    }

    fn course_work(id: &str, title: &str, max_points: Option<f64>) -> CourseWork {
        CourseWork { id: id.to_string(), title: title.to_string(), max_points }
    }

    fn submission(user_id: &str, assigned_grade: Option<f64>) -> StudentSubmission {
        StudentSubmission {
            id: format!("sub-{user_id}"),
            user_id: user_id.to_string(),
            assigned_grade,
        }
    }

    fn roster_student(user_id: &str, full_name: &str) -> RosterStudent {
        RosterStudent {
            user_id: user_id.to_string(),
            profile: StudentProfile {
                name: Some(ProfileName { full_name: full_name.to_string() }),
            },
        }
    }

    fn target_group() -> Group {
        Group {
            id: "g1".to_string(),
            name: "3A - Química".to_string(),
            subject: "Química".to_string(),
            color: String::new(),
            tutor_name: None,
            students: vec![Student {
                id: "s1".to_string(),
                name: "Ana María López".to_string(),
                enrollment_id: None,
                repeating: false,
            }],
            class_days: Vec::new(),
            evaluation_kinds: vec![EvaluationKind {
                id: "k1".to_string(),
                name: "Evaluación".to_string(),
                weight: 100.0,
                partial: 1,
            }],
            evaluations: Vec::new(),
        }
    }

    #[test]
    fn entry_state_depends_on_oauth_configuration() {
        assert!(matches!(
            ImportSession::new(target_group(), false).state(),
            ImportState::Unconfigured
        ));
        assert!(matches!(
            ImportSession::new(target_group(), true).state(),
            ImportState::AwaitingLogin
        ));
    }

    #[tokio::test]
    async fn out_of_order_transitions_are_rejected() {
        let api = FakeApi::default();
        let mut session = ImportSession::new(target_group(), false);
        assert!(matches!(
            session.sign_in(&api, "tok").await,
            Err(SyncError::InvalidTransition { .. })
        ));

        let mut session = ImportSession::new(target_group(), true);
        assert!(matches!(
            session.import(&api, "tok", &[0]).await,
            Err(SyncError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.choose_course(&api, "tok", 0).await,
            Err(SyncError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn sign_in_preselects_course_by_name_containment() {
        let api = FakeApi {
            courses: vec![course("c1", "Matemáticas 2B"), course("c2", "QUIMICA 3a")],
            ..FakeApi::default()
        };
        let mut session = ImportSession::new(target_group(), true);
        session.sign_in(&api, "tok").await.unwrap();

        match session.state() {
            ImportState::CourseSelection { courses, preselected } => {
                assert_eq!(courses.len(), 2);
                assert_eq!(*preselected, Some(1));
            }
            other => panic!("unexpected state {}", other.name()),
        }
    }

    #[tokio::test]
    async fn import_creates_evaluation_and_grade_actions() {
        let mut submissions = HashMap::new();
        submissions.insert(
            "w1".to_string(),
            vec![submission("u1", Some(8.0)), submission("u2", None)],
        );
        let api = FakeApi {
            courses: vec![course("c1", "Química 3A")],
            course_work: vec![course_work("w1", "Práctica 1", None)],
            submissions,
            roster: vec![roster_student("u1", "ana maria lopez")],
            ..FakeApi::default()
        };

        let mut session = ImportSession::new(target_group(), true);
        session.sign_in(&api, "tok").await.unwrap();
        session.choose_course(&api, "tok", 0).await.unwrap();
        session.import(&api, "tok", &[0]).await.unwrap();

        assert!(matches!(session.state(), ImportState::Done));
        let actions = session.take_actions();
        assert_eq!(actions.len(), 2);

        let Action::AddEvaluation { evaluation, .. } = &actions[0] else {
            panic!("expected AddEvaluation, got {:?}", actions[0]);
        };
        assert_eq!(evaluation.name, "Práctica 1");
        assert_eq!(evaluation.max_score, DEFAULT_MAX_SCORE);
        assert_eq!(evaluation.partial, 1);
        assert_eq!(evaluation.kind_id, "k1");

        let Action::SetGrade { student_id, score, .. } = &actions[1] else {
            panic!("expected SetGrade, got {:?}", actions[1]);
        };
        assert_eq!(student_id, "s1");
        assert_eq!(*score, 8.0);

        assert!(session
            .log()
            .lines()
            .iter()
            .any(|line| line.contains("1 calificaciones importadas")));
    }

    #[tokio::test]
    async fn existing_evaluation_title_is_reused_not_duplicated() {
        let mut submissions = HashMap::new();
        submissions.insert("w1".to_string(), vec![submission("u1", Some(9.0))]);
        let api = FakeApi {
            courses: vec![course("c1", "Química 3A")],
            course_work: vec![course_work("w1", "Práctica 1", Some(20.0))],
            submissions,
            roster: vec![roster_student("u1", "Ana María López")],
            ..FakeApi::default()
        };

        let mut group = target_group();
        group.evaluations.push(Evaluation {
            id: "e-existing".to_string(),
            name: "Práctica 1".to_string(),
            max_score: 20.0,
            partial: 1,
            kind_id: "k1".to_string(),
        });

        let mut session = ImportSession::new(group, true);
        session.sign_in(&api, "tok").await.unwrap();
        session.choose_course(&api, "tok", 0).await.unwrap();
        session.import(&api, "tok", &[0]).await.unwrap();

        let actions = session.take_actions();
        assert_eq!(actions.len(), 1);
        let Action::SetGrade { evaluation_id, .. } = &actions[0] else {
            panic!("expected SetGrade, got {:?}", actions[0]);
        };
        assert_eq!(evaluation_id, "e-existing");
    }

    #[tokio::test]
    async fn unmatched_profile_names_produce_no_grades() {
        let mut submissions = HashMap::new();
        submissions.insert("w1".to_string(), vec![submission("u1", Some(7.0))]);
        let api = FakeApi {
            courses: vec![course("c1", "Química 3A")],
            course_work: vec![course_work("w1", "Práctica 1", None)],
            submissions,
            roster: vec![roster_student("u1", "Alguien Más")],
            ..FakeApi::default()
        };

        let mut session = ImportSession::new(target_group(), true);
        session.sign_in(&api, "tok").await.unwrap();
        session.choose_course(&api, "tok", 0).await.unwrap();
        session.import(&api, "tok", &[0]).await.unwrap();

        let actions = session.take_actions();
        assert_eq!(actions.len(), 1, "only the evaluation creation is expected");
        assert!(matches!(actions[0], Action::AddEvaluation { .. }));
        assert!(session
            .log()
            .lines()
            .iter()
            .any(|line| line.contains("0 calificaciones importadas, 1 entregas sin coincidencia")));
    }

    #[tokio::test]
    async fn failing_assignment_aborts_only_that_step() {
        let mut submissions = HashMap::new();
        submissions.insert("w2".to_string(), vec![submission("u1", Some(6.0))]);
        let mut failing_work = HashSet::new();
        failing_work.insert("w1".to_string());
        let api = FakeApi {
            courses: vec![course("c1", "Química 3A")],
            course_work: vec![
                course_work("w1", "Práctica 1", None),
                course_work("w2", "Práctica 2", None),
            ],
            submissions,
            roster: vec![roster_student("u1", "Ana María López")],
            failing_work,
        };

        let mut session = ImportSession::new(target_group(), true);
        session.sign_in(&api, "tok").await.unwrap();
        session.choose_course(&api, "tok", 0).await.unwrap();
        session.import(&api, "tok", &[0, 1]).await.unwrap();

        assert!(matches!(session.state(), ImportState::Done));
        assert!(session
            .log()
            .lines()
            .iter()
            .any(|line| line.contains("error al obtener entregas")));

        let actions = session.take_actions();
        let grades: Vec<_> =
            actions.iter().filter(|action| matches!(action, Action::SetGrade { .. })).collect();
        assert_eq!(grades.len(), 1);
    }
}
