/// Append-only log surfaced to the user during an import run. Besides the
/// dispatched actions this is the run's only structured result.
#[derive(Debug, Default, Clone)]
pub(crate) struct ProgressLog {
    lines: Vec<String>,
}

impl ProgressLog {
    pub(crate) fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{line}");
        self.lines.push(line);
    }

    pub(crate) fn lines(&self) -> &[String] {
        &self.lines
    }
}
