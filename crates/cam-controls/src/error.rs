use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{} not found or not executable", .0.display())]
    MissingUtility(PathBuf),
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("command `{command}` exited with status {status:?}: {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("command `{command}` timed out after {after_ms} ms")]
    Timeout { command: String, after_ms: u64 },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("unknown control: {0}")]
    UnknownControl(String),
    #[error("control {control:?} has no choice labelled {label:?}")]
    UnknownChoice { control: String, label: String },
}

/// Non-fatal problems found while parsing a listing.
///
/// These never abort discovery; they are logged and kept on the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("control {control:?}: unrecognized value format: {text}")]
    MalformedValue { control: String, text: String },
    #[error("control {control:?}: unrecognized control type {kind:?}")]
    UnrecognizedKind { control: String, kind: String },
    #[error("control {control:?}: unhandled button outside the motor group")]
    ClassificationAnomaly { control: String },
    #[error("control {control:?}: values given before a type")]
    ValuesWithoutKind { control: String },
    #[error("control {control:?}: listed more than once, keeping the last")]
    DuplicateName { control: String },
}
