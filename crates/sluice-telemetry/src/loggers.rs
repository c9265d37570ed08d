use fastrace::local::LocalSpan;
use fastrace::Event;
use log::{Log, Metadata, Record};

/// Sends every record enabled by the console logger to the span event logger as well,
/// when span reporting is turned on.
pub struct ConsoleAndSpanLogger {
    console: Box<dyn Log>,
    span: Option<SpanEventLogger>,
}

impl ConsoleAndSpanLogger {
    pub fn new(console: Box<dyn Log>, span: Option<SpanEventLogger>) -> Self {
        Self { console, span }
    }
}

impl Log for ConsoleAndSpanLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.enabled(record.metadata()) {
            return;
        }
        self.console.log(record);
        if let Some(span) = &self.span {
            span.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

/// Attaches log records to the current local span as events.
pub struct SpanEventLogger;

impl Log for SpanEventLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let event = Event::new(record.level().as_str()).with_properties(|| {
            [
                ("target", record.target().to_string()),
                ("message", record.args().to_string()),
            ]
        });
        LocalSpan::add_event(event);
    }

    fn flush(&self) {}
}
