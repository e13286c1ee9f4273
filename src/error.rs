//! Error taxonomy (spec.md §7). Each component gets a closed enum in the
//! style of `loctree_rs/src/git.rs`'s `GitError`: hand-written `Display` +
//! `std::error::Error`, no `thiserror`, since the teacher's core crate does
//! not pull in that dependency.

use std::fmt;

/// Structural, missing-context, and malformed-input errors the primitive
/// builder can raise while absorbing the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    DuplicatePackage { uid: String },
    DuplicateFile { path: String },
    DuplicateImport { file: String, name: String },
    DuplicateDecl { file: String, name: String },
    UndefinedPackage,
    UndefinedFile,
    UndefinedImport { name: String },
    InvalidFunctionName(String),
    InvalidTypeName(String),
    InvalidVarName(String),
    InvalidReceiverMethod(String),
    UnhandledSpec(String),
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::DuplicatePackage { uid } => {
                write!(f, "duplicate package: {uid}")
            }
            BuilderError::DuplicateFile { path } => {
                write!(f, "duplicate file: {path}")
            }
            BuilderError::DuplicateImport { file, name } => {
                write!(f, "duplicate import {name:?} in {file}")
            }
            BuilderError::DuplicateDecl { file, name } => {
                write!(f, "duplicate declaration {name:?} in {file}")
            }
            BuilderError::UndefinedPackage => {
                write!(f, "event requires a current package but none is set")
            }
            BuilderError::UndefinedFile => {
                write!(f, "event requires a current file but none is set")
            }
            BuilderError::UndefinedImport { name } => {
                write!(f, "selector references unknown import binding {name:?}")
            }
            BuilderError::InvalidFunctionName(n) => write!(f, "invalid function name: {n:?}"),
            BuilderError::InvalidTypeName(n) => write!(f, "invalid type name: {n:?}"),
            BuilderError::InvalidVarName(n) => write!(f, "invalid var name: {n:?}"),
            BuilderError::InvalidReceiverMethod(n) => {
                write!(f, "invalid receiver method: {n:?}")
            }
            BuilderError::UnhandledSpec(n) => write!(f, "unhandled declaration spec: {n:?}"),
        }
    }
}

impl std::error::Error for BuilderError {}

/// Top-level crate error, covering the external/I-O boundary as well
/// (spec.md §7, "External").
#[derive(Debug)]
pub enum Error {
    Builder(BuilderError),
    Io(std::io::Error),
    Parse(String),
    Config(String),
    Module(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Builder(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Module(msg) => write!(f, "module descriptor error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Builder(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BuilderError> for Error {
    fn from(e: BuilderError) -> Self {
        Error::Builder(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
