#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Info,
    Success,
    Error,
}

/// User-facing outcome channel. Sync routines report through this instead of
/// returning rich result types to the caller.
pub(crate) trait Notifier {
    fn notify(&self, severity: Severity, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!("{message}"),
            _ => tracing::info!("{message}"),
        }

        let tag = match severity {
            Severity::Info => "[info]",
            Severity::Success => "[ok]",
            Severity::Error => "[error]",
        };
        println!("{tag} {message}");
    }
}
