use std::io::{IsTerminal, Write};
use std::path::Path;

use crossterm::{cursor, execute, terminal};

use crate::generator::Generation;
use crate::language::Language;

/// Aggregate result of a one-shot run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub generated: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, generation: &Generation) {
        if generation.succeeded() {
            self.generated += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Report one generation: the destination on stdout, or the captured
/// diagnostics on stderr.
pub fn print_generation(generation: &Generation, language: Language) {
    match generation.error(language) {
        None => println!(
            "Successfully generated TypeScript to: {}",
            generation.destination.display()
        ),
        Some(err) => eprintln!("{err}"),
    }
}

/// Summary after a directory run. Single-file runs print nothing extra.
///
/// The failure count goes to stderr so stdout stays a list of written files.
pub fn print_summary(summary: &RunSummary) {
    if summary.generated + summary.failed <= 1 {
        return;
    }
    println!("Generated {} file(s)", summary.generated);
    if summary.failed > 0 {
        eprintln!("  {} file(s) failed", summary.failed);
    }
}

/// Clear the terminal and park the cursor at the top, leaving a blank line.
///
/// No-op when stdout is not a terminal so piped output stays clean.
pub fn clear_screen() {
    let mut stdout = std::io::stdout();
    if !stdout.is_terminal() {
        return;
    }
    if let Err(err) = execute!(stdout, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0)) {
        tracing::debug!("failed to clear terminal: {err}");
        return;
    }
    let _ = writeln!(stdout);
}

pub fn print_change_detected(path: &Path, language: Language) {
    println!("Detected change in {} file: {}", language, path.display());
}
