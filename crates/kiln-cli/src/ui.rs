//! Terminal output for command results.
//!
//! Diagnostics go through `tracing`; this module prints the lines a user
//! reads at the end of a command (step summaries, failures) to stderr.

use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static COLORS: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Configure output from the global flags. Call once, early in `main`.
pub fn init(no_color: bool, quiet: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether stderr should be colored, honouring `NO_COLOR` and `FORCE_COLOR`.
pub fn should_use_color() -> bool {
    color_enabled(
        std::env::var_os("NO_COLOR").is_some(),
        std::env::var_os("FORCE_COLOR").is_some(),
        console::user_attended_stderr(),
    )
}

/// `NO_COLOR` beats `FORCE_COLOR`, which beats terminal detection.
fn color_enabled(no_color: bool, force_color: bool, attended: bool) -> bool {
    if no_color {
        return false;
    }
    force_color || attended
}

fn colors() -> bool {
    COLORS.load(Ordering::Relaxed)
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a finished build step: `Compiled 3 files into build/ (120 ms)`.
pub fn step(step_name: &str, target: &str, duration: Duration) {
    if quiet() {
        return;
    }
    let time = format!("({})", format_duration(duration));
    if colors() {
        eprintln!("{} {} {}", step_name, target.cyan(), time.green());
    } else {
        eprintln!("{} {} {}", step_name, target, time);
    }
}

/// Print a success message.
pub fn success(message: &str) {
    if quiet() {
        return;
    }
    if colors() {
        eprintln!("{} {}", "✓".green().bold(), message);
    } else {
        eprintln!("✓ {}", message);
    }
}

/// Print an error line. Shown even in quiet mode.
pub fn error(message: &str) {
    if colors() {
        eprintln!("{} {}", "ERROR:".red(), message);
    } else {
        eprintln!("ERROR: {}", message);
    }
}

/// Format a step duration: `850 ms`, `2.050 s` or `1 m 5.300 s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let mins = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;

    if mins > 0 {
        format!("{} m {}.{:03} s", mins, secs, ms)
    } else if secs == 0 {
        format!("{} ms", ms)
    } else {
        format!("{}.{:03} s", secs, ms)
    }
}
