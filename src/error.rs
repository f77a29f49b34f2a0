//! Error types shared by the sensation pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No drawable surface could be produced. Fatal for the current unit of work.
    #[error("no drawable surface for {width}x{height}: {reason}")]
    Surface {
        width: u32,
        height: u32,
        reason: String,
    },

    /// A point mapped to a bin that the grid never allocated.
    #[error("could not find bin ({nx}, {ny}) for point ({x}, {y})")]
    BinNotFound { nx: i64, ny: i64, x: f64, y: f64 },

    #[error("bin size must be positive and finite, got {width}x{height}")]
    InvalidBinSize { width: f64, height: f64 },

    #[error("bin domain [{start}, {end}) is not a finite interval")]
    InvalidDomain { start: f64, end: f64 },

    #[error("tabular data error on line {line}: {message}")]
    Tabular { line: usize, message: String },

    #[error("unknown anatomical side: {0}")]
    UnknownSide(String),

    #[error("derived data of participant {0} has not been computed")]
    NotComputed(String),

    #[error("{0} worker has stopped")]
    WorkerStopped(&'static str),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
