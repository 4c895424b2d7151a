use clap::Subcommand;

use super::after::AfterArgs;
use super::before::BeforeArgs;
use super::scan::ScanArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Decide whether a request may proceed (reads JSON on stdin, exits 1 on block)
    Before(BeforeArgs),

    /// Filter, optionally redact, and audit a response read from stdin
    After(AfterArgs),

    /// Print content findings and the risk score for stdin
    Scan(ScanArgs),

    /// Serve the hooks over HTTP
    Serve(ServeArgs),
}
