//! Diagnostics configuration.

use crate::diagnostics::emit::{self, DiagnosticRoute};

/// Process-wide settings for failure diagnostics.
///
/// Diagnostics are advisory: nothing here changes what an allocation or
/// deallocation returns. Whatever the configuration says, release builds
/// without the `diagnostics` feature report nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Report primitive failures (default: true where the build allows it)
    pub report_failures: bool,

    /// Include notes and help lines with each report
    pub verbose: bool,

    /// Output channel when no custom sink is installed
    pub route: DiagnosticRoute,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            report_failures: emit::build_enabled(),
            verbose: false,
            route: DiagnosticRoute::DEFAULT,
        }
    }
}

impl DiagnosticsConfig {
    /// A config that reports nothing.
    pub fn silent() -> Self {
        Self {
            report_failures: false,
            verbose: false,
            route: DiagnosticRoute::Stderr,
        }
    }

    /// A config that reports everything the build allows, with notes.
    pub fn verbose() -> Self {
        Self::default().with_verbose(true)
    }

    /// Builder pattern: enable or disable failure reports.
    pub fn with_reports(mut self, enable: bool) -> Self {
        self.report_failures = enable;
        self
    }

    /// Builder pattern: enable verbose output.
    pub fn with_verbose(mut self, enable: bool) -> Self {
        self.verbose = enable;
        self
    }

    /// Builder pattern: set the output channel.
    pub fn with_route(mut self, route: DiagnosticRoute) -> Self {
        self.route = route;
        self
    }

    /// Make this the process-wide configuration.
    pub fn install(&self) {
        emit::suppress_diagnostics(!self.report_failures);
        emit::set_verbose(self.verbose);
        emit::set_route(self.route);
    }

    /// The configuration currently in effect.
    pub fn current() -> Self {
        Self {
            report_failures: emit::enabled(),
            verbose: emit::is_verbose(),
            route: emit::route(),
        }
    }
}
