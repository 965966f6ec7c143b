use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Steps of a publish run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    History,
    Report,
    Upload,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::History, Phase::Report, Phase::Upload];

    fn running(self) -> &'static str {
        match self {
            Phase::History => "Fetching report history",
            Phase::Report => "Generating report",
            Phase::Upload => "Uploading report",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Phase::History => "Report history fetched",
            Phase::Report => "Report generated",
            Phase::Upload => "Report uploaded",
        }
    }

    fn skipped(self) -> &'static str {
        match self {
            Phase::History => "Report history skipped",
            Phase::Report => "Report generation skipped",
            Phase::Upload => "Upload skipped",
        }
    }
}

/// How a phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Done,
    Skipped(String),
}

/// Numbered stderr spinners, one per phase.
///
/// A phase still running when this is dropped (the run failed) is abandoned
/// so its spinner stops where it was.
pub struct PhaseProgress {
    total: usize,
    running: Option<(Phase, ProgressBar)>,
    outcomes: Vec<(Phase, PhaseOutcome)>,
}

impl PhaseProgress {
    pub fn new(total: usize) -> Self {
        eprintln!("{}", style("Phases").bright().underlined());
        Self {
            total,
            running: None,
            outcomes: Vec::new(),
        }
    }

    fn position(&self) -> usize {
        self.outcomes.len() + 1
    }

    fn line(&self, text: &str) -> String {
        format!("Phase {}/{}: {text}", self.position(), self.total)
    }

    pub fn start(&mut self, phase: Phase) {
        self.finish();
        let message = style(self.line(phase.running())).bright().yellow();
        let pb = spinner();
        pb.set_message(message.to_string());
        self.running = Some((phase, pb));
    }

    /// Marks the running phase as done.
    pub fn finish(&mut self) {
        let Some((phase, pb)) = self.running.take() else {
            return;
        };
        let message = style(format!("{} ✓", self.line(phase.done()))).bright().green();
        pb.finish_with_message(message.to_string());
        self.outcomes.push((phase, PhaseOutcome::Done));
    }

    pub fn skip(&mut self, phase: Phase, reason: &str) {
        self.finish();
        let message = style(format!("{} ({reason})", self.line(phase.skipped()))).dim();
        spinner().finish_with_message(message.to_string());
        self.outcomes
            .push((phase, PhaseOutcome::Skipped(reason.to_string())));
    }

    pub fn outcomes(&self) -> &[(Phase, PhaseOutcome)] {
        &self.outcomes
    }
}

impl Drop for PhaseProgress {
    fn drop(&mut self) {
        if let Some((_, pb)) = self.running.take() {
            pb.abandon();
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
