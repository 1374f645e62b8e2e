//! Logging: a context-passed handle instead of an implicit global logger.
//!
//! The process-global logging backend ([`env_logger`]) is installed exactly
//! once, at the CLI entry point. Everywhere else in the crate — coordinator,
//! collector, archiver, store — takes a [`LogContext`] as a parameter and
//! records through it; no component reaches for `log::info!` directly
//! against a bare, context-free target.

use std::path::Path;

/// Run verbosity, mapped from `Options.log_level` or repeated `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Off => log::LevelFilter::Off,
            Verbosity::Error => log::LevelFilter::Error,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }

    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Warn,
            1 => Verbosity::Info,
            2 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }
}

/// Install the global logging backend. Safe to call at most once per process;
/// the CLI entry point is the only caller.
pub fn init(verbosity: Verbosity, log_to_file: Option<&Path>) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(verbosity.to_level_filter());
    if let Some(dir) = log_to_file {
        if let Ok(file) = std::fs::File::create(dir.join("fdedup.log")) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }
    // Re-initializing an already-installed logger is a programmer error in
    // this binary's single entry point; ignore if a test harness beat us to it.
    let _ = builder.try_init();
}

/// A cheaply-cloneable scope the core threads through instead of touching
/// global logger state.
#[derive(Debug, Clone)]
pub struct LogContext {
    scope: String,
}

impl LogContext {
    pub fn new(scope: impl Into<String>) -> Self {
        LogContext { scope: scope.into() }
    }

    /// Derive a child context, e.g. `root.with_scope(format!("device[{id}]"))`.
    pub fn with_scope(&self, scope: impl std::fmt::Display) -> Self {
        LogContext { scope: format!("{}::{}", self.scope, scope) }
    }

    pub fn error(&self, msg: impl std::fmt::Display) {
        log::error!("[{}] {}", self.scope, msg);
    }

    pub fn info(&self, msg: impl std::fmt::Display) {
        log::info!("[{}] {}", self.scope, msg);
    }

    pub fn debug(&self, msg: impl std::fmt::Display) {
        log::debug!("[{}] {}", self.scope, msg);
    }
}

impl Default for LogContext {
    fn default() -> Self {
        LogContext::new("fdedup")
    }
}
