//! Request Phase Timing
//!
//! Lightweight elapsed-time recorder for the handler access logs. Each
//! request creates one [`Timing`], ticks named phases around the stages it
//! passes through, and renders them as `phase:ms` pairs at log time.

use std::fmt;
use std::time::Instant;

/// Records elapsed milliseconds for a sequence of named phases.
///
/// Phases render in insertion order; a phase that was started but never
/// stopped is closed implicitly when the timing is rendered. The `total`
/// phase is started at construction.
#[derive(Debug)]
pub struct Timing {
    phases: Vec<Phase>,
}

#[derive(Debug)]
struct Phase {
    name: &'static str,
    started: Instant,
    elapsed_ms: Option<u128>,
}

impl Timing {
    pub fn start() -> Self {
        let mut timing = Self { phases: Vec::new() };
        timing.tick_start("total");
        timing
    }

    /// Begin a named phase. Restarting an existing phase resets it.
    pub fn tick_start(&mut self, name: &'static str) {
        if let Some(phase) = self.phases.iter_mut().find(|p| p.name == name) {
            phase.started = Instant::now();
            phase.elapsed_ms = None;
            return;
        }
        self.phases.push(Phase {
            name,
            started: Instant::now(),
            elapsed_ms: None,
        });
    }

    /// End a named phase. Unknown names are ignored.
    pub fn tick_stop(&mut self, name: &'static str) {
        if let Some(phase) = self.phases.iter_mut().find(|p| p.name == name) {
            phase.elapsed_ms = Some(phase.started.elapsed().as_millis());
        }
    }

    /// Elapsed milliseconds of a finished phase.
    pub fn elapsed_ms(&self, name: &str) -> Option<u128> {
        self.phases.iter().find(|p| p.name == name).and_then(|p| p.elapsed_ms)
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, phase) in self.phases.iter().enumerate() {
            let elapsed = phase
                .elapsed_ms
                .unwrap_or_else(|| phase.started.elapsed().as_millis());
            if idx != 0 {
                write!(f, " ")?;
            }
            write!(f, "{}:{}", phase.name, elapsed)?;
        }
        Ok(())
    }
}
