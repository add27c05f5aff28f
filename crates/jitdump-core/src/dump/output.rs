//! Output capture for dump printing
//!
//! This module provides a thread-local buffer that captures the records
//! written by the `print_*` functions instead of sending them to stdout.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

type SharedRecords = Arc<Mutex<Vec<String>>>;

// Thread-local record buffer for capturing print output
thread_local! {
    static OUTPUT_BUFFER: RefCell<Option<SharedRecords>> = const { RefCell::new(None) };
}

/// Puts back the enclosing capture buffer when a capture scope ends, even
/// if the scope unwinds.
struct RestorePrevious(Option<SharedRecords>);

impl Drop for RestorePrevious {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = OUTPUT_BUFFER.try_with(|cell| {
            *cell.borrow_mut() = previous;
        });
    }
}

/// Captured dump output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputCapture {
    /// One entry per print call: the body followed by its newline
    pub records: Vec<String>,
}

impl OutputCapture {
    /// Create a new empty output capture
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written, exactly as stdout would have received it
    pub fn text(&self) -> String {
        self.records.concat()
    }
}

/// Execute a function with output capture enabled.
///
/// Any `print_function`, `print_type` or `print_value` call made on this
/// thread during `f` is recorded and returned in the `OutputCapture`.
/// Captures nest: the innermost one receives the records, and the enclosing
/// capture is active again once `f` returns.
///
/// # Example
/// ```
/// use cranelift_codegen::ir::types;
/// use jitdump_core::{print_type, with_output_capture};
///
/// let (result, output) = with_output_capture(|| print_type(types::I32));
/// assert!(result.is_ok());
/// assert_eq!(output.records, vec!["i32\n".to_string()]);
/// ```
pub fn with_output_capture<F, R>(f: F) -> (R, OutputCapture)
where
    F: FnOnce() -> R,
{
    let buffer = Arc::new(Mutex::new(Vec::new()));

    // Install the buffer, remembering the enclosing one
    let guard = RestorePrevious(OUTPUT_BUFFER.with(|cell| cell.replace(Some(buffer.clone()))));

    let result = f();

    // Restore the enclosing buffer and collect output
    drop(guard);

    let records = Arc::try_unwrap(buffer)
        .ok()
        .and_then(|m| m.into_inner().ok())
        .unwrap_or_default();

    (result, OutputCapture { records })
}

/// Record a complete dump in the capture buffer.
/// Returns true if output was captured, false if it should go to stdout.
pub(crate) fn capture_record(record: &str) -> bool {
    OUTPUT_BUFFER.with(|cell| {
        if let Some(buffer) = cell.borrow().as_ref() {
            if let Ok(mut buf) = buffer.lock() {
                buf.push(record.to_string());
                return true;
            }
        }
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_in_order() {
        let ((), output) = with_output_capture(|| {
            assert!(capture_record("first\n"));
            assert!(capture_record("second\n"));
        });

        assert_eq!(output.records, vec!["first\n", "second\n"]);
        assert_eq!(output.text(), "first\nsecond\n");
    }

    #[test]
    fn test_no_capture_returns_false() {
        // Outside of with_output_capture, capture_record returns false
        assert!(!capture_record("test"));
    }

    #[test]
    fn test_capture_ends_with_scope() {
        let ((), output) = with_output_capture(|| {
            capture_record("inside\n");
        });
        assert!(!capture_record("outside\n"));
        assert_eq!(output.records.len(), 1);
    }

    #[test]
    fn test_nested_capture_restores_outer() {
        let ((), outer) = with_output_capture(|| {
            assert!(capture_record("before\n"));
            let ((), inner) = with_output_capture(|| {
                assert!(capture_record("inner\n"));
            });
            assert_eq!(inner.records, vec!["inner\n"]);
            assert!(capture_record("after\n"));
        });

        assert_eq!(outer.records, vec!["before\n", "after\n"]);
        assert!(!capture_record("outside\n"));
    }

    #[test]
    fn test_panic_in_capture_uninstalls_buffer() {
        let unwound = std::panic::catch_unwind(|| {
            with_output_capture(|| {
                capture_record("lost\n");
                panic!("dump failed");
            })
        });

        assert!(unwound.is_err());
        assert!(!capture_record("after panic\n"));
    }

    #[test]
    fn test_empty_capture() {
        let (value, output) = with_output_capture(|| 7);
        assert_eq!(value, 7);
        assert_eq!(output, OutputCapture::new());
    }
}
