//! jitdump - diagnostic dumps over the Cranelift JIT
//!
//! This crate provides:
//! - Labels: branch-target identifiers and the reserved "no label" sentinel
//! - Handles: borrowed views of functions, types and values
//! - Dump: canonical text rendering written to a sink or stdout
//! - Engine: a Cranelift JIT session producing dumpable functions

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label identifiers and the "no label" sentinel
pub mod label;

/// Borrowed function, type and value handles
pub mod handle;

/// Diagnostic dumps of functions, types and values
pub mod dump;

/// Cranelift engine session
/// Calling finalized JIT code requires unsafe code
#[allow(unsafe_code)]
pub mod engine;

/// Convenience re-export of the label sentinel
pub use label::{empty_label, is_empty_label, Label, LabelId, EMPTY_LABEL};

/// Convenience re-export of handle types
pub use handle::{FunctionHandle, TypeDescriptor, ValueNames};

/// Convenience re-export of dump operations
pub use dump::{
    dump_function, dump_type, dump_value, print_function, print_type, print_value, DumpError,
    DumpResult, HandleKind, DEFAULT_TAG,
};

/// Convenience re-export of output capture utilities
pub use dump::{with_output_capture, OutputCapture};

/// Convenience re-export of the engine session
pub use engine::{EngineConfig, EngineError, EngineFunction, EngineResult, JitSession, OptLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn sentinel_reexported() {
        assert_eq!(empty_label(), EMPTY_LABEL);
        assert!(!Label::new().is_bound());
    }
}
