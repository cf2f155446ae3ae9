use thiserror::Error;

pub const ERROR_PREFIX: &str = "Error: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScribeError {
    #[error("{0}")]
    Initialization(String),

    #[error("{0}")]
    Generation(String),

    #[error("Invalid image link(s) provided: {}. Please use valid, public Dropbox or Imgur links.", .0.join(", "))]
    UnsupportedMedia(Vec<String>),

    #[error("{0}")]
    Clipboard(String),

    #[error("A profile is already being generated. Wait for it to finish.")]
    Busy,
}

impl ScribeError {
    /// Whether the failure wipes the preview for this submission.
    pub fn replaces_preview(&self) -> bool {
        matches!(
            self,
            ScribeError::Initialization(_) | ScribeError::Generation(_) | ScribeError::Busy
        )
    }
}

/// Append-only record of every failure seen during one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ScribeError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ScribeError) {
        tracing::warn!("{}", error);
        self.entries.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScribeError] {
        &self.entries
    }

    pub fn preview_failed(&self) -> bool {
        self.entries.iter().any(ScribeError::replaces_preview)
    }

    /// All messages, one per line, with the prefix written once.
    pub fn display(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let messages: Vec<String> = self.entries.iter().map(ToString::to_string).collect();
        Some(format!("{}{}", ERROR_PREFIX, messages.join("\n")))
    }
}
