use gm_core::GmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `line` is the 1-based line in the file, header included.
    #[error("schedule line {line}: {source}")]
    Role { line: usize, source: GmError },

    #[error("cannot open schedule: {0}")]
    Io(#[from] std::io::Error),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
