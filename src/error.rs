use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("failed to read score data: {0}")]
    Csv(#[from] csv::Error),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session on {date} records zero arrows, cannot compute a gold percentage")]
    ZeroArrows { date: NaiveDate },

    #[error("non-finite value in field '{field}'")]
    NonFinite { field: &'static str },

    #[error("{what} has {found} rows, at least {required} are needed")]
    InsufficientData {
        what: &'static str,
        found: usize,
        required: usize,
    },

    #[error("the {partition} partition contains no competition sessions")]
    MissingCompetitionData { partition: &'static str },

    #[error("singular value decomposition did not converge")]
    SvdNoConvergence,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TrackerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidRequest(message.into())
    }
}
