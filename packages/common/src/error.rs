use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing site files
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File store lock poisoned")]
    Poisoned,
}

pub type CommonResult<T> = Result<T, CommonError>;
