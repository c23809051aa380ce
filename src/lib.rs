pub(crate) mod core;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod store;
pub(crate) mod sync;

use std::io::{self, BufRead, Write};

use crate::core::{config::Settings, telemetry};
use crate::services::backend::BackendService;
use crate::services::classroom::ClassroomService;
use crate::services::google_auth::GoogleAuthService;
use crate::services::notifier::{ConsoleNotifier, Notifier, Severity};
use crate::services::schedule::FirestoreScheduleSource;
use crate::store::Store;
use crate::sync::attendance::SyncScope;
use crate::sync::classroom_import::{ImportSession, ImportState};
use crate::sync::normalize::names_match;
use crate::sync::{BackendTarget, SyncError};

const USAGE: &str = "uso: aulasync <asistencias [--todo] | calificaciones | horario | tutoria>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Attendance(SyncScope),
    Grades,
    Schedule,
    Tutorship,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    tracing::debug!(
        environment = settings.runtime().environment.as_str(),
        "configuración cargada"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_command(&args) else {
        anyhow::bail!("{USAGE}");
    };

    let notifier = ConsoleNotifier;
    let mut store = Store::load(&settings.storage().state_file)?;

    match command {
        Command::Attendance(scope) => {
            if let Err(err) = run_attendance(&settings, &store, scope, &notifier).await {
                notify_sync_error(&notifier, "Error al sincronizar asistencias", err);
            }
        }
        Command::Grades => {
            if let Err(err) = run_grades(&settings, &store, &notifier).await {
                notify_sync_error(&notifier, "Error al sincronizar calificaciones", err);
            }
        }
        Command::Schedule => match run_schedule(&settings, &mut store).await {
            Ok((created, updated)) => {
                store.save()?;
                notifier.notify(
                    Severity::Success,
                    &format!(
                        "Horario importado: {created} grupos creados, {updated} actualizados."
                    ),
                );
            }
            Err(err) => notify_sync_error(&notifier, "Error al importar el horario", err),
        },
        Command::Tutorship => print_tutorship(&store, &settings, &notifier),
    }

    Ok(())
}

/// Lists the groups whose tutor of record is the configured professor, with
/// each student's current tutorship entry. Local-only, no network.
fn print_tutorship(store: &Store, settings: &Settings, notifier: &dyn Notifier) {
    let professor_name = &settings.backend().professor_name;
    if professor_name.trim().is_empty() {
        notifier.notify(
            Severity::Error,
            "Configura el nombre del profesor para consultar las tutorías.",
        );
        return;
    }

    let tutored = sync::tutored_groups(store.data(), professor_name);
    if tutored.is_empty() {
        notifier.notify(
            Severity::Info,
            &format!("\"{professor_name}\" no es tutor de ningún grupo."),
        );
        return;
    }

    for group in tutored {
        println!("{} ({})", group.name, group.subject);
        for student in &group.students {
            match store.data().tutorship.get(&student.id) {
                Some(entry) if !entry.summary.trim().is_empty() => {
                    println!("  {}: {}", student.name, entry.summary);
                }
                _ => println!("  {}: sin notas", student.name),
            }
        }
    }
}

/// Interactive Classroom import wizard for a single target group, named by
/// the first argument and matched against local groups by normalized name.
pub async fn run_import() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let notifier = ConsoleNotifier;
    let Some(group_name) = std::env::args().nth(1) else {
        anyhow::bail!("uso: classroom-import <grupo>");
    };

    let mut store = Store::load(&settings.storage().state_file)?;
    let Some(group) =
        store.data().groups.iter().find(|group| names_match(&group.name, &group_name)).cloned()
    else {
        notifier
            .notify(Severity::Error, &format!("No existe un grupo llamado \"{group_name}\"."));
        return Ok(());
    };

    let auth = GoogleAuthService::from_settings(&settings)?;
    let api = ClassroomService::from_settings(&settings)?;
    let mut session = ImportSession::new(group, auth.is_configured());

    if matches!(session.state(), ImportState::Unconfigured) {
        notifier.notify(
            Severity::Error,
            "Configura GOOGLE_CLIENT_ID para importar desde Google Classroom.",
        );
        return Ok(());
    }

    let token = match auth.ensure_token().await {
        Ok(token) => token,
        Err(err) => {
            notifier
                .notify(Severity::Error, &format!("No se pudo iniciar sesión con Google: {err}"));
            return Ok(());
        }
    };

    if let Err(err) = session.sign_in(&api, &token).await {
        notify_sync_error(&notifier, "Error al consultar los cursos", err);
        return Ok(());
    }

    let course_index = {
        let ImportState::CourseSelection { courses, preselected } = session.state() else {
            unreachable!("sign_in leaves the session in course selection");
        };
        if courses.is_empty() {
            notifier.notify(Severity::Info, "No hay cursos disponibles en Classroom.");
            return Ok(());
        }

        println!("Cursos disponibles:");
        for (index, course) in courses.iter().enumerate() {
            let mark = if Some(index) == *preselected { "*" } else { " " };
            match &course.section {
                Some(section) => println!("{mark} {}. {} ({section})", index + 1, course.name),
                None => println!("{mark} {}. {}", index + 1, course.name),
            }
        }
        prompt_index("Elige un curso", courses.len(), *preselected)?
    };

    if let Err(err) = session.choose_course(&api, &token, course_index).await {
        notify_sync_error(&notifier, "Error al consultar las tareas", err);
        return Ok(());
    }

    let selected = {
        let ImportState::AssignmentSelection { course_work, .. } = session.state() else {
            unreachable!("choose_course leaves the session in assignment selection");
        };
        if course_work.is_empty() {
            notifier.notify(Severity::Info, "El curso no tiene tareas con calificaciones.");
            return Ok(());
        }

        println!("Tareas del curso:");
        for (index, work) in course_work.iter().enumerate() {
            println!("  {}. {}", index + 1, work.title);
        }
        prompt_selection("Elige tareas (números separados por comas, vacío = todas)", course_work.len())?
    };

    if let Err(err) = session.import(&api, &token, &selected).await {
        notify_sync_error(&notifier, "Error durante la importación", err);
        return Ok(());
    }

    for line in session.log().lines() {
        println!("  {line}");
    }

    // Earlier grade actions stay applied even when a later step failed.
    let finished = matches!(session.state(), ImportState::Done);
    let applied = store.dispatch_all(session.take_actions());
    store.save()?;
    if finished {
        notifier.notify(
            Severity::Success,
            &format!("Importación de Classroom finalizada ({applied} cambios)."),
        );
    } else {
        notifier.notify(
            Severity::Error,
            &format!(
                "La importación quedó incompleta; revisa el registro ({applied} cambios aplicados)."
            ),
        );
    }

    Ok(())
}

async fn run_attendance(
    settings: &Settings,
    store: &Store,
    scope: SyncScope,
    notifier: &dyn Notifier,
) -> Result<(), SyncError> {
    BackendTarget::from_settings(settings)?;
    let backend = BackendService::from_settings(settings)?;
    sync::attendance::run(&backend, store.data(), scope, notifier).await?;
    Ok(())
}

async fn run_grades(
    settings: &Settings,
    store: &Store,
    notifier: &dyn Notifier,
) -> Result<(), SyncError> {
    BackendTarget::from_settings(settings)?;
    let backend = BackendService::from_settings(settings)?;
    sync::grades::run(&backend, store.data(), notifier).await?;
    Ok(())
}

async fn run_schedule(
    settings: &Settings,
    store: &mut Store,
) -> Result<(usize, usize), SyncError> {
    let source = FirestoreScheduleSource::from_settings(settings)?;
    let plan =
        sync::schedule::run(&source, store.data(), &settings.backend().professor_name).await?;
    let (created, updated) = (plan.created, plan.updated);
    store.dispatch_all(plan.actions);
    Ok((created, updated))
}

fn parse_command(args: &[String]) -> Option<Command> {
    let mut words = args.iter().map(String::as_str);
    let command = match words.next()? {
        "asistencias" => {
            let scope = match words.next() {
                None => SyncScope::Today,
                Some("--todo") => SyncScope::All,
                Some(_) => return None,
            };
            return match words.next() {
                None => Some(Command::Attendance(scope)),
                Some(_) => None,
            };
        }
        "calificaciones" => Command::Grades,
        "horario" => Command::Schedule,
        "tutoria" => Command::Tutorship,
        _ => return None,
    };

    match words.next() {
        None => Some(command),
        Some(_) => None,
    }
}

fn notify_sync_error(notifier: &dyn Notifier, prefix: &str, err: SyncError) {
    match err {
        SyncError::Config(message) => notifier.notify(Severity::Error, &message),
        other => notifier.notify(Severity::Error, &format!("{prefix}: {other}")),
    }
}

fn prompt_index(label: &str, len: usize, default: Option<usize>) -> anyhow::Result<usize> {
    loop {
        match default {
            Some(default) => print!("{label} [{}]: ", default + 1),
            None => print!("{label}: "),
        }
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            anyhow::bail!("entrada terminada");
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if let Some(default) = default {
                return Ok(default);
            }
            continue;
        }
        match trimmed.parse::<usize>() {
            Ok(choice) if (1..=len).contains(&choice) => return Ok(choice - 1),
            _ => println!("Opción inválida."),
        }
    }
}

fn prompt_selection(label: &str, len: usize) -> anyhow::Result<Vec<usize>> {
    loop {
        print!("{label}: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            anyhow::bail!("entrada terminada");
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok((0..len).collect());
        }

        let mut selected = Vec::new();
        let mut valid = true;
        for piece in trimmed.split(',') {
            match piece.trim().parse::<usize>() {
                Ok(choice) if (1..=len).contains(&choice) => {
                    if !selected.contains(&(choice - 1)) {
                        selected.push(choice - 1);
                    }
                }
                _ => {
                    valid = false;
                    break;
                }
            }
        }
        if valid && !selected.is_empty() {
            return Ok(selected);
        }
        println!("Selección inválida.");
    }
}
