//! Failure diagnostics.
//!
//! Backend failures are reported here as advisory messages. Reporting is
//! compiled in for debug builds and for release builds with the
//! `diagnostics` feature; it never changes what an operation returns.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                                   |
//! |-------|-------------------------------------------|
//! | MR001 | managed allocation primitive failed       |
//! | MR002 | release primitive failed (absorbed)       |
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use managedalloc::diagnostics::{set_sink, CollectingSink};
//!
//! let sink = Arc::new(CollectingSink::new());
//! set_sink(Some(sink.clone()));
//! // ... failing allocations now land in `sink` ...
//! set_sink(None);
//! ```

// Core diagnostic types
pub mod kind;
pub mod emit;
pub(crate) mod macros;

// Re-export core types
pub use kind::{Diagnostic, DiagnosticKind};
pub use emit::{
    emit, enabled, set_route, set_sink, set_verbose, suppress_diagnostics, CollectingSink,
    DiagnosticRoute, DiagnosticSink,
};

// Re-export predefined diagnostics
pub use kind::{MR001, MR002};
