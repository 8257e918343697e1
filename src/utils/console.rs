/// Colored user-facing messages: info in light blue on stdout, errors in light red on stderr
use colored::Colorize;
use std::fmt::Display;

/// Print an informational line
pub fn info(msg: impl Display) {
    println!("{}", msg.to_string().bright_blue());
}

/// Print an error line
pub fn error(msg: impl Display) {
    eprintln!("{}", msg.to_string().bright_red());
}

/// Print a plain message followed by the colored cause
pub fn error_cause(msg: &str, cause: impl Display) {
    eprintln!("{} {}", msg, cause.to_string().bright_red());
}
