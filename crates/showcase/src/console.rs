//! Console rendering of delivered people and batch progress.

use crate::person::Person;
use batchfetch_api::{progress::ProgressReporter, sink::Sink, Entity};
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Prints each delivered person as a multi-line record.
///
/// A record is written with several separate writes, so concurrent
/// deliveries would interleave. The sink declares itself unsafe for
/// concurrent writers and relies on the orchestrator to serialize it.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    fn render(entity: &Entity) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        match Person::decode(entity) {
            Ok(person) => {
                writeln!(out, "{person}")?;
                writeln!(out, "    id:      {}", person.id)?;
                writeln!(out, "    started: {}", person.start_date)?;
                writeln!(
                    out,
                    "    rating:  {} {}",
                    "*".repeat(person.rating as usize),
                    person.rating,
                )?;
            }
            Err(err) => writeln!(out, "<unreadable record {}: {err}>", entity.key)?,
        }
        out.flush()
    }
}

impl Sink for ConsoleSink {
    fn deliver(&self, entity: Entity) {
        if let Err(err) = Self::render(&entity) {
            tracing::warn!("failed to print record {}: {err}", entity.key);
        }
    }

    fn is_concurrent_safe(&self) -> bool {
        false
    }
}

/// Prints progress on stderr, once per new percentage step of ten.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last: AtomicU8,
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, percent_complete: u8) {
        let step = percent_complete / 10 * 10;
        if self.last.fetch_max(step, Ordering::SeqCst) < step {
            eprintln!("[{step:>3}%]");
        }
    }
}
