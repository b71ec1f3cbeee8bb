// Output formatting helpers for CLI commands

/// Print a status message: "     Action message"
pub fn status(action: &str, message: &str) {
    eprintln!("\x1b[1;36m{:>12}\x1b[0m {}", action, message);
}

/// Print a success message with checkmark
pub fn success(message: &str) {
    eprintln!("\x1b[1;32m  \u{2713}\x1b[0m {}", message);
}

/// Print a failure message with X
pub fn failure(message: &str) {
    eprintln!("\x1b[1;31m  \u{2717}\x1b[0m {}", message);
}

/// Print a check/pass item
pub fn check(message: &str) {
    eprintln!("\x1b[32m  \u{2713}\x1b[0m {}", message);
}

/// Print an info message
pub fn info(message: &str) {
    eprintln!("\x1b[36m  i\x1b[0m {}", message);
}

/// Print a dim/muted message
pub fn dim(message: &str) {
    eprintln!("\x1b[2m{}\x1b[0m", message);
}

/// Print a level header
pub fn level_header(index: usize, expressions: usize, workers: usize) {
    eprintln!(
        "\x1b[1;34m  Level\x1b[0m {} ({} expressions, {} workers)",
        index, expressions, workers
    );
}

/// Print a `name = value` binding (stdout)
pub fn binding(name: &str, value: i64) {
    println!("{} = {}", name, value);
}
