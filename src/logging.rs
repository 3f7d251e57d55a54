use std::io;
use std::sync::Mutex;

use clap::ValueEnum;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Target under which run events are emitted.
pub const RUN_LOG_TARGET: &str = "exchange_rates";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: RUN_LOG_TARGET, "{}", message),
            Severity::Error => tracing::error!(target: RUN_LOG_TARGET, "{}", message),
        }
    }
}

/// Keeps every entry in memory. Used by tests to assert on what a run logged.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.with_severity(Severity::Error)
    }

    pub fn infos(&self) -> Vec<String> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, message)| message)
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, severity: Severity, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines, for local runs
    Text,
    /// One JSON object per event, for the hosted log collector
    Json,
}

pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("ecb_rate_mailer=info,{}=info", RUN_LOG_TARGET)))
        .map_err(|e| anyhow::anyhow!("Failed to create tracing filter: {}", e))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true);
            registry.with(layer).init();
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stdout)
                .with_current_span(false)
                .flatten_event(true);
            registry.with(layer).init();
        }
    }

    Ok(())
}
