//! Error types for the crate.
//!
//! Structural failures (bad file, truncated container, dangling indices) are
//! recoverable in the sense that they are expected, nameable conditions —
//! they get a typed [`ClassFileError`] and travel up via `?`. Programmatic
//! preconditions inside the dispatcher (division by zero, negative shifts,
//! negative array lengths, stack/locals misuse) are not represented here:
//! the core does not synthesize runtime exceptions for those, it panics.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("failed to read class file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("truncated class file: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("class file string is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("bad magic number: expected {expected:#010X}, found {found:#010X}")]
    BadMagic { expected: u32, found: u32 },

    #[error("constant pool index {0} out of range")]
    PoolIndexOutOfRange(u16),

    #[error("constant pool entry {0} is not an integer constant")]
    NotAnInteger(u16),

    #[error("constant pool entry {0} is not a method reference")]
    NotAMethodRef(u16),

    #[error("unknown constant pool tag {tag} for entry {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("method index {0} out of range")]
    MethodIndexOutOfRange(u16),

    #[error("malformed method descriptor {0:?}")]
    BadDescriptor(String),

    #[error("method {name}{descriptor} not found")]
    MethodNotFound { name: String, descriptor: String },

    #[error("entry method {name} must return no value, but its descriptor {descriptor} declares a return type")]
    EntryMustReturnVoid { name: String, descriptor: String },
}
