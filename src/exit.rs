//! Process exit codes
//!
//! Stable contract for CI scripts: `0` clean, `1` findings at or above the
//! minimum severity, `2` the run could not start, `130` interrupted.

use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SmellscanExit {
    /// No finding meets the minimum severity.
    Clean = 0,
    /// At least one finding meets the minimum severity.
    FindingsAtThreshold = 1,
    /// Invalid configuration, missing path, no input files or I/O on output.
    CouldNotStart = 2,
    /// Cancelled by Ctrl-C.
    Interrupted = 130,
}

impl SmellscanExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Termination for SmellscanExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}

impl From<anyhow::Result<SmellscanExit>> for SmellscanExit {
    fn from(res: anyhow::Result<SmellscanExit>) -> Self {
        match res {
            Ok(code) => code,
            Err(e) => {
                let cancelled = matches!(
                    e.downcast_ref::<crate::error::AnalysisError>(),
                    Some(crate::error::AnalysisError::Cancelled)
                );
                if cancelled {
                    eprintln!("Interrupted");
                    Self::Interrupted
                } else {
                    eprintln!("Error: {e:#}");
                    Self::CouldNotStart
                }
            }
        }
    }
}
