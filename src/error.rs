use thiserror::Error;
use xsltui_core::{PlaygroundError, StorageError, UpdateState};

/// Everything the command line can fail with.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Playground(#[from] PlaygroundError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("The {0} pane cannot be stored")]
    NotStorable(xsltui_core::EditorId),

    #[error("Update failed ({0:?})")]
    UpdateFailed(UpdateState),
}
