//! 日志收集层
//!
//! 自定义 tracing Layer，把每条日志写进守护进程的环形缓冲区，供 CLI `logs` 查询。

use imbridge_core::logging::{LogBuffer, LogEntry, LogLevel};
use std::fmt;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_log::NormalizeEvent;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub struct LogSinkLayer {
    buffer: Arc<LogBuffer>,
}

impl LogSinkLayer {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogSinkLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // 来自 log crate 的事件需要还原真实的 target
        let normalized = event.normalized_metadata();
        let metadata = normalized.as_ref().unwrap_or_else(|| event.metadata());

        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        if message.is_empty() {
            message = metadata.target().to_string();
        }

        self.buffer.push(LogEntry::new(
            level_of(*metadata.level()),
            metadata.target(),
            message,
        ));
    }
}

fn level_of(level: Level) -> LogLevel {
    match level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

/// 访问者，用于提取事件中的消息字段
struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
        } else if self.0.is_empty() && !field.name().starts_with("log.") {
            *self.0 = format!("{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.0 = value.to_string();
        } else if self.0.is_empty() && !field.name().starts_with("log.") {
            *self.0 = format!("{}={}", field.name(), value);
        }
    }
}
