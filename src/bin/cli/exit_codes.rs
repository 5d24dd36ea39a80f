//! Exit codes for the CLI tool.

use bundlepatch::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Bad arguments or missing inputs
pub const BAD_INPUT: i32 = 1;
/// File system failure
pub const IO_ERROR: i32 = 2;
/// An input could not be decoded
pub const BAD_DATA: i32 = 3;
/// A batch finished but some members failed
pub const PARTIAL: i32 = 4;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    BadInput,
    IoError,
    BadData,
    Partial,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::BadInput => BAD_INPUT,
            Self::IoError => IO_ERROR,
            Self::BadData => BAD_DATA,
            Self::Partial => PARTIAL,
        }
    }
}

/// Converts a bundlepatch error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    if error.is_missing_input() {
        ExitCode::BadInput
    } else if error.is_parse_error() {
        ExitCode::BadData
    } else if error.is_io_error() {
        ExitCode::IoError
    } else {
        // DuplicateReplacer and future variants: caller mistakes
        ExitCode::BadInput
    }
}
