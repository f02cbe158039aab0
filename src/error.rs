// src/error.rs

use std::path::PathBuf;

use ark_relations::r1cs::SynthesisError;
use ark_serialize::SerializationError;

pub type Result<T> = core::result::Result<T, Error>;

/// Which numeric base a rejected string was parsed as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidDecimal,
    InvalidHex,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot parse {input:?}: {kind:?}")]
    Parse { kind: ParseErrorKind, input: String },

    #[error("malformed bundle: field `{field}`")]
    MalformedBundle { field: String },

    #[error("cannot encode the point at infinity ({0})")]
    NilPoint(&'static str),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("inner proof does not verify")]
    InnerVerificationFailed,

    #[error("recursive circuit is not satisfied: {0}")]
    UnsatisfiableCircuit(String),

    #[error("outer circuit compilation failed: {0}")]
    CompileFailed(SynthesisError),

    #[error("outer setup failed: {0}")]
    SetupFailed(SynthesisError),

    #[error("outer proving failed: {0}")]
    ProveFailed(SynthesisError),

    #[error("outer proof does not verify")]
    OuterVerificationFailed,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt bundle: {0}")]
    CorruptBundle(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(field: impl Into<String>) -> Self {
        Error::MalformedBundle { field: field.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::CorruptBundle(e.to_string())
    }
}
