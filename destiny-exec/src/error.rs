use std::fmt;

/// Location inside an endpoint, mock or interceptor source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

impl fmt::Display for SourceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Text of a unit of endpoint code, used to quote the failing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub file: String,
    pub content: String,
}

impl ScriptSource {
    pub fn new(file: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            content: content.into(),
        }
    }

    /// Trimmed text of a 1-based line, `None` when out of range or blank.
    pub fn line(&self, line: usize) -> Option<&str> {
        let text = self.content.lines().nth(line.checked_sub(1)?)?.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Error raised by endpoint, middleware, mock or interceptor code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("{message}")]
    Fault {
        message: String,
        frame: Option<SourceFrame>,
        trace: Vec<String>,
    },
    /// The workflow already carries the error; nothing further to report.
    #[error("request rejected")]
    Rejected,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        ScriptError::Fault {
            message: message.into(),
            frame: None,
            trace: Vec::new(),
        }
    }

    pub fn at(self, file: impl Into<String>, line: usize, column: usize) -> Self {
        match self {
            ScriptError::Fault { message, trace, .. } => ScriptError::Fault {
                message,
                frame: Some(SourceFrame {
                    file: file.into(),
                    line,
                    column,
                }),
                trace,
            },
            ScriptError::Rejected => ScriptError::Rejected,
        }
    }

    pub fn with_trace<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            ScriptError::Fault { message, frame, .. } => ScriptError::Fault {
                message,
                frame,
                trace: lines.into_iter().map(Into::into).collect(),
            },
            ScriptError::Rejected => ScriptError::Rejected,
        }
    }
}
