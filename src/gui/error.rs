use std::{error::Error, fmt::Display};

#[derive(Debug)]
pub enum SenseGuiError {
    IOError(std::io::Error),
}

impl Display for SenseGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenseGuiError::IOError(error) => write!(f, "terminal io error: {}", error),
        }
    }
}

impl Error for SenseGuiError {}

impl From<std::io::Error> for SenseGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}
