use std::fmt::Write as _;

use tracing::{Event, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "warn,lucky_wheel=info,tower_http=info";

/// Collects the message plus any structured fields as ` key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}

struct CustomLayer;

impl<S: Subscriber> Layer<S> for CustomLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if visitor.message.is_empty() && visitor.fields.is_empty() {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("{} - {}{}", metadata.target(), visitor.message, visitor.fields);
        match *metadata.level() {
            tracing::Level::ERROR => eprintln!("[{}] ❌ Error: {}", timestamp, line),
            tracing::Level::WARN => println!("[{}] ⚠️ Warning: {}", timestamp, line),
            tracing::Level::INFO => println!("[{}] ℹ️ {}", timestamp, line),
            tracing::Level::DEBUG => println!("[{}] 🔄 {}", timestamp, line),
            tracing::Level::TRACE => println!("[{}] 🔍 {}", timestamp, line),
        }
    }
}

pub fn setup() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = Registry::default().with(env_filter).with(CustomLayer);

    tracing::subscriber::set_global_default(subscriber)
}
