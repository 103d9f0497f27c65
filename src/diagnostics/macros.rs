//! Diagnostic macros for internal failure reports.

/// Report a predefined diagnostic with a formatted runtime message.
///
/// The message is only formatted when diagnostics are enabled, so release
/// builds pay for a single branch on a constant.
///
/// # Example
///
/// ```rust,ignore
/// mr_report!(MR001, "{} failed: {}", "cudaMallocManaged", name);
/// ```
macro_rules! mr_report {
    ($code:ident, $($arg:tt)+) => {{
        if $crate::diagnostics::emit::enabled() {
            $crate::diagnostics::emit::emit(
                &$crate::diagnostics::kind::$code.with_message(format!($($arg)+)),
            );
        }
    }};
}

pub(crate) use mr_report;
