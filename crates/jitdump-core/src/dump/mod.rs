//! Diagnostic dumps of JIT functions, types and values
//!
//! Every dump renders one construct in full, appends a single `\n` record
//! separator, writes the record to its sink and flushes before returning.
//! Handles are validated while rendering, so a rejected call writes nothing.
//!
//! The `dump_*` functions take the sink explicitly. The `print_*` functions
//! target the process's stdout, or the active [`with_output_capture`] buffer
//! on the calling thread.
//!
//! ```text
//! construct → render (validate) → body + "\n" → sink → flush
//! ```
//!
//! Stdout is shared by every thread. Each `print_*` call holds the stdout
//! lock for its own record only, so records from different threads never
//! split each other but their relative order is unspecified.

mod output;
mod render;

use std::fmt;
use std::io::{self, Write};

use cranelift_codegen::ir::Value;
use thiserror::Error;

use crate::handle::{FunctionHandle, TypeDescriptor};

pub use output::{with_output_capture, OutputCapture};
pub use render::{render_function, render_type, render_value, ValueKind};

/// Tag written above function dumps by [`print_function`]
pub const DEFAULT_TAG: &str = "dumpfunc";

/// Record separator appended after every dump body
pub const RECORD_SEPARATOR: char = '\n';

/// Which kind of construct a rejected handle referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// A type descriptor
    Type,
    /// A value reference resolved against its function
    Value,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Type => write!(f, "type"),
            HandleKind::Value => write!(f, "value"),
        }
    }
}

/// Errors that can occur while dumping
#[derive(Debug, Error)]
pub enum DumpError {
    /// The construct reference does not name a live engine object
    #[error("invalid {kind} handle: {detail}")]
    InvalidHandle { kind: HandleKind, detail: String },

    /// Writing or flushing the sink failed
    #[error("dump sink error: {0}")]
    Io(#[from] io::Error),

    /// The engine's text renderer failed
    #[error("failed to render dump text")]
    Format(#[from] fmt::Error),
}

impl DumpError {
    pub(crate) fn invalid(kind: HandleKind, detail: impl Into<String>) -> Self {
        DumpError::InvalidHandle {
            kind,
            detail: detail.into(),
        }
    }
}

/// Result type for dump operations
pub type DumpResult<T> = Result<T, DumpError>;

fn to_record(body: &str) -> String {
    let mut record = String::with_capacity(body.len() + 1);
    record.push_str(body);
    record.push(RECORD_SEPARATOR);
    record
}

/// Write `body` plus the record separator to `sink` and flush it.
fn emit<W: Write + ?Sized>(sink: &mut W, body: &str) -> DumpResult<()> {
    let record = to_record(body);
    sink.write_all(record.as_bytes())?;
    sink.flush()?;
    Ok(())
}

/// Dump a function's IR to `sink`, headed by `tag`
pub fn dump_function<W, F>(sink: &mut W, function: &F, tag: &str) -> DumpResult<()>
where
    W: Write + ?Sized,
    F: FunctionHandle + ?Sized,
{
    let body = render_function(function.ir(), tag)?;
    emit(sink, &body)
}

/// Dump a type descriptor to `sink`
pub fn dump_type<'a, W>(sink: &mut W, ty: impl Into<TypeDescriptor<'a>>) -> DumpResult<()>
where
    W: Write + ?Sized,
{
    let body = render_type(ty.into())?;
    emit(sink, &body)
}

/// Dump one value of `function` to `sink`
pub fn dump_value<W, F>(sink: &mut W, function: &F, value: Value) -> DumpResult<()>
where
    W: Write + ?Sized,
    F: FunctionHandle + ?Sized,
{
    let body = render_value(function, value)?;
    emit(sink, &body)
}

/// Send a finished record to the capture buffer or to stdout.
fn print_record(body: &str) -> DumpResult<()> {
    let record = to_record(body);
    if output::capture_record(&record) {
        return Ok(());
    }

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    lock.write_all(record.as_bytes())?;
    lock.flush()?;
    Ok(())
}

/// Print a function's IR to stdout, tagged with [`DEFAULT_TAG`]
pub fn print_function<F: FunctionHandle + ?Sized>(function: &F) -> DumpResult<()> {
    print_record(&render_function(function.ir(), DEFAULT_TAG)?)
}

/// Print a type descriptor to stdout
pub fn print_type<'a>(ty: impl Into<TypeDescriptor<'a>>) -> DumpResult<()> {
    print_record(&render_type(ty.into())?)
}

/// Print one value of `function` to stdout
pub fn print_value<F: FunctionHandle + ?Sized>(function: &F, value: Value) -> DumpResult<()> {
    print_record(&render_value(function, value)?)
}
