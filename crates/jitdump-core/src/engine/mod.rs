//! Cranelift engine session
//!
//! A thin layer over the Cranelift JIT that produces the functions the dump
//! module renders. Functions are built through Cranelift's own
//! `FunctionBuilder`; the session adds declaration, optional verification,
//! value display names and a snapshot of the IR as handed to the backend.
//!
//! ```text
//! signature → define(body) → EngineFunction (IR snapshot) → finalize → call
//! ```

mod session;

pub use session::{EngineFunction, JitSession};

use thiserror::Error;

/// Errors that can occur inside the engine session
#[derive(Debug, Error)]
pub enum EngineError {
    /// The host ISA could not be configured
    #[error("host ISA error: {0}")]
    Isa(String),

    /// A Cranelift setting was rejected
    #[error("invalid Cranelift setting: {0}")]
    Settings(String),

    /// Cranelift module error (declaration, definition, finalization)
    #[error("Cranelift module error: {0}")]
    Module(String),

    /// The built function failed IR verification
    #[error("verifier rejected `{function}`: {detail}")]
    Verifier { function: String, detail: String },

    /// The function was called through a signature it does not have
    #[error("signature mismatch for `{function}`: expected {expected}, got {actual}")]
    SignatureMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    /// The function was called before the session was finalized
    #[error("function `{0}` has not been finalized")]
    NotFinalized(String),

    /// The function was not defined by this session
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Error reported by a function body builder
    #[error("failed to build `{function}`: {detail}")]
    Build { function: String, detail: String },
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Cranelift optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting
    pub const fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Engine session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub opt_level: OptLevel,
    /// Run the IR verifier on every function before it is defined
    pub verify: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opt_level: OptLevel::Speed,
            verify: true,
        }
    }
}
