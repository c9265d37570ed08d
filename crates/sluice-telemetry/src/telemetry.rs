use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use fastrace::collector::{Config, ConsoleReporter, Reporter, SpanRecord};
use log::debug;
use sluice_common::config::TelemetryConfig;

use crate::error::{TelemetryError, TelemetryResult};
use crate::loggers::{ConsoleAndSpanLogger, SpanEventLogger};

enum TelemetryStatus {
    Uninitialized,
    Initialized,
    Failed,
    Finalized,
}

static TELEMETRY_STATUS: Mutex<TelemetryStatus> = Mutex::new(TelemetryStatus::Uninitialized);

pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    let mut status = TELEMETRY_STATUS
        .lock()
        .map_err(|e| TelemetryError::internal(e.to_string()))?;

    match *status {
        TelemetryStatus::Uninitialized => {
            init_traces(config);
            match init_logs(config) {
                Ok(()) => {
                    debug!("telemetry initialized");
                    *status = TelemetryStatus::Initialized;
                    Ok(())
                }
                Err(e) => {
                    *status = TelemetryStatus::Failed;
                    Err(e)
                }
            }
        }
        TelemetryStatus::Initialized => {
            Err(TelemetryError::internal("telemetry already initialized"))
        }
        TelemetryStatus::Failed => Err(TelemetryError::internal(
            "telemetry failed to initialize previously",
        )),
        TelemetryStatus::Finalized => Err(TelemetryError::internal(
            "telemetry has been finalized and cannot be re-initialized",
        )),
    }
}

fn init_traces(config: &TelemetryConfig) {
    if config.trace_spans {
        let reporter_config = Config::default().report_interval(Duration::from_secs(1));
        fastrace::set_reporter(ConsoleReporter, reporter_config)
    } else {
        let reporter_config = Config::default().report_interval(Duration::MAX);
        fastrace::set_reporter(NoOpReporter, reporter_config)
    }
}

fn init_logs(config: &TelemetryConfig) -> TelemetryResult<()> {
    let console =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format(move |buf, record| {
                let level = record.level();
                let target = record.target();
                let style = buf.default_level_style(level);
                let timestamp = buf.timestamp();
                let args = record.args();
                writeln!(buf, "[{timestamp} {style}{level}{style:#} {target}] {args}")
            })
            .build();
    let max_level = console.filter();
    let span = config.trace_spans.then_some(SpanEventLogger);

    log::set_boxed_logger(Box::new(ConsoleAndSpanLogger::new(Box::new(console), span)))?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn shutdown_telemetry() {
    debug!("shutting down telemetry...");
    fastrace::flush();
    if let Ok(mut status) = TELEMETRY_STATUS.lock() {
        if let TelemetryStatus::Initialized = *status {
            log::logger().flush();
            *status = TelemetryStatus::Finalized;
        }
    }
}

/// A fastrace reporter that does nothing.
pub struct NoOpReporter;

impl Reporter for NoOpReporter {
    fn report(&mut self, _spans: Vec<SpanRecord>) {}
}
