use std::io;
use std::path::PathBuf;

use crate::exec::ExecError;

/// Clipboard read errors
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("{tool} is not installed")]
    ToolUnavailable { tool: String },

    #[error("no image on clipboard")]
    NoImage,

    #[error("no image file path found on clipboard")]
    NoImageFilePath,

    #[error("{tool} failed: {source}")]
    Tool {
        tool: &'static str,
        #[source]
        source: ExecError,
    },

    /// The tool worked but bridging its Windows path into WSL did not
    #[error("failed to translate Windows path {path:?}: {reason}")]
    PathTranslation { path: String, reason: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("all clipboard readers failed: {}", summarize(.0))]
    Aggregate(Vec<BackendFailure>),
}

impl ClipboardError {
    /// Wrap a subprocess failure, mapping a missing program to `ToolUnavailable`
    pub fn from_exec(tool: &'static str, source: ExecError) -> Self {
        if source.is_not_found() {
            ClipboardError::ToolUnavailable {
                tool: tool.to_string(),
            }
        } else {
            ClipboardError::Tool { tool, source }
        }
    }

    pub fn is_no_image(&self) -> bool {
        matches!(
            self,
            ClipboardError::NoImage | ClipboardError::NoImageFilePath
        )
    }

    /// Per-reader failures carried by an aggregate, in chain order
    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            ClipboardError::Aggregate(failures) => failures,
            _ => &[],
        }
    }

    /// Innermost failure worth showing a user: the first cause of an
    /// aggregate, or the error itself
    pub fn first_cause(&self) -> &ClipboardError {
        match self {
            ClipboardError::Aggregate(failures) => failures
                .first()
                .map_or(self, |f| f.error.first_cause()),
            _ => self,
        }
    }
}

/// One reader's failure inside an aggregate
#[derive(Debug)]
pub struct BackendFailure {
    pub backend: &'static str,
    pub error: ClipboardError,
}

fn summarize(failures: &[BackendFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.backend, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_message_joins_in_order() {
        let err = ClipboardError::Aggregate(vec![
            BackendFailure {
                backend: "xclip",
                error: ClipboardError::NoImage,
            },
            BackendFailure {
                backend: "wl-paste",
                error: ClipboardError::ToolUnavailable {
                    tool: "wl-paste".to_string(),
                },
            },
        ]);
        assert_eq!(
            err.to_string(),
            "all clipboard readers failed: xclip: no image on clipboard; wl-paste: wl-paste is not installed"
        );
        assert_eq!(err.failures().len(), 2);
        assert!(err.first_cause().is_no_image());
    }

    #[test]
    fn test_from_exec_maps_missing_program() {
        let err = ClipboardError::from_exec(
            "xclip",
            ExecError::NotFound {
                program: "xclip".to_string(),
            },
        );
        assert!(matches!(err, ClipboardError::ToolUnavailable { .. }));

        let err = ClipboardError::from_exec(
            "xclip",
            ExecError::Failed {
                program: "xclip".to_string(),
                code: Some(1),
                stderr: "Error: target image/png not available".to_string(),
            },
        );
        assert!(matches!(err, ClipboardError::Tool { tool: "xclip", .. }));
    }
}
