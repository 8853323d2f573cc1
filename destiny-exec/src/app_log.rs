use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const APP_LOG_TARGET: &str = "destiny::app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }
}

/// Levels for messages written by endpoint, mock and interceptor code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppLogConfig {
    /// Applies to untagged messages and tags with no configured ancestor.
    pub default: LogLevel,

    /// Minimum level per dotted tag. `races.fetch` falls back to `races`.
    pub tags: BTreeMap<String, LogLevel>,

    /// Messages at or above this level are also sent as "Application Msg" http-log events.
    pub http_threshold: LogLevel,
}

impl Default for AppLogConfig {
    fn default() -> Self {
        Self {
            default: LogLevel::Off,
            tags: BTreeMap::new(),
            http_threshold: LogLevel::Error,
        }
    }
}

impl AppLogConfig {
    pub fn with_tag(mut self, tag: impl Into<String>, level: LogLevel) -> Self {
        self.tags.insert(tag.into(), level);
        self
    }

    /// The configured level of `tag` or its nearest dotted ancestor.
    pub fn tag_level(&self, tag: &str) -> Option<LogLevel> {
        let mut tag = tag;
        loop {
            if let Some(level) = self.tags.get(tag) {
                return Some(*level);
            }
            let (parent, _) = tag.rsplit_once('.')?;
            tag = parent;
        }
    }
}

/// A written message bound for the http log.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppRecord {
    pub(crate) level: LogLevel,
    pub(crate) line: String,
}

impl AppRecord {
    pub(crate) fn meta(&self) -> Value {
        json!({ "level": self.level.label(), "msg": self.line })
    }
}

/// The `log()` capability handed to endpoint, mock and interceptor code.
///
/// Clones share one queue of records awaiting the http log.
#[derive(Debug, Clone)]
pub struct AppLogger {
    config: Arc<AppLogConfig>,
    forwarded: Arc<Mutex<Vec<AppRecord>>>,
}

impl AppLogger {
    pub(crate) fn new(config: Arc<AppLogConfig>) -> Self {
        Self {
            config,
            forwarded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn debug(&self, tag: &str, msg: impl Into<String>) {
        self.log(LogLevel::Debug, Some(tag), msg);
    }

    pub fn info(&self, tag: &str, msg: impl Into<String>) {
        self.log(LogLevel::Info, Some(tag), msg);
    }

    pub fn warn(&self, tag: &str, msg: impl Into<String>) {
        self.log(LogLevel::Warn, Some(tag), msg);
    }

    pub fn error(&self, tag: &str, msg: impl Into<String>) {
        self.log(LogLevel::Error, Some(tag), msg);
    }

    /// Write `msg` at `level`. A tag with no configured level is dropped and
    /// the message is judged by the default level.
    pub fn log(&self, level: LogLevel, tag: Option<&str>, msg: impl Into<String>) {
        if level == LogLevel::Off {
            return;
        }
        let configured = tag.and_then(|t| self.config.tag_level(t).map(|lvl| (t, lvl)));
        let (tag, min) = match configured {
            Some((tag, min)) => (Some(tag), min),
            None => (None, self.config.default),
        };
        if level < min {
            return;
        }

        let msg = msg.into();
        let line = match tag {
            Some(tag) => format!("[{tag}] {msg}"),
            None => format!(" {msg}"),
        };
        let tag = tag.unwrap_or_default();
        match level {
            LogLevel::Debug => tracing::debug!(target: APP_LOG_TARGET, tag, "{msg}"),
            LogLevel::Info => tracing::info!(target: APP_LOG_TARGET, tag, "{msg}"),
            LogLevel::Warn => tracing::warn!(target: APP_LOG_TARGET, tag, "{msg}"),
            LogLevel::Error | LogLevel::Off => tracing::error!(target: APP_LOG_TARGET, tag, "{msg}"),
        }

        if level >= self.config.http_threshold {
            self.queue().push(AppRecord { level, line });
        }
    }

    /// Records written since the last call, oldest first.
    pub(crate) fn take_forwarded(&self) -> Vec<AppRecord> {
        std::mem::take(&mut *self.queue())
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, Vec<AppRecord>> {
        self.forwarded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
