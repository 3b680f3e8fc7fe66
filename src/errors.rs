// Copyright 2025 Cornell University
// released under MIT License

use crate::ir::Polarity;
use thiserror::Error;

/// Problems with the PLC configuration. These are all reported before any
/// automaton is generated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read configuration `{path}`: {reason}")]
    Io { path: String, reason: String },
    #[error("failed to parse configuration: {0}")]
    Syntax(String),
    #[error("closing tag `</{found}>` does not match opening tag `<{expected}>`")]
    MismatchedTag { expected: String, found: String },
    #[error("tag `{path}` resolves to an empty signal name")]
    EmptyName { path: String },
    #[error("signal name `{name}` is not a valid identifier")]
    InvalidIdentifier { name: String },
    #[error("signal name `{name}` is a reserved word")]
    ReservedIdentifier { name: String },
    #[error("signal name `{name}` is declared more than once")]
    DuplicateSignal { name: String },
    #[error("configuration declares no input signals")]
    NoInputs,
    #[error("configuration declares no output signals")]
    NoOutputs,
}

/// Failures while building or validating the automaton network.
/// Apart from `Config` and `EmptyDeclarationList`, these indicate a bug in
/// the generator rather than in the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot declare an empty list of {group}")]
    EmptyDeclarationList { group: String },
    #[error("name `{name}` is used for both a {first} and a {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
    #[error("template `{template}` is malformed: {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("{polarity} on `{channel}` (value {value}) in `{template}` has {matches} partners, expected exactly one")]
    UnmatchedSync {
        template: String,
        channel: String,
        polarity: Polarity,
        value: String,
        matches: usize,
    },
    #[error("variable `{var}` must be written by exactly one template and read by the other ({writers} writers, {readers} readers)")]
    WriterConflict {
        var: String,
        writers: usize,
        readers: usize,
    },
    #[error("channel `{channel}` used in `{template}` is not declared")]
    UndeclaredChannel { template: String, channel: String },
    #[error("channel `{channel}` is declared but never used")]
    UnusedChannel { channel: String },
    #[error("malformed system composition: {0}")]
    MalformedSystem(String),
}

pub type GenerateResult<T> = Result<T, GenerateError>;

/// Errors while writing the UPPAAL document.
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("failed to write model: {0}")]
    Io(#[from] std::io::Error),
}
