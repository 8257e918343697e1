/// Shared helpers for running scripts and printing to the terminal
pub mod command;
pub mod console;
