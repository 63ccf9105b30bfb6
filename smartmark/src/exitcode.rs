/// Standard Unix exit codes for the smartmark CLI.
///
/// Successful termination
pub const SUCCESS: i32 = 0;

/// Command line usage error or failed command
pub const USAGE: i32 = 64;

/// Command needs a signed-in session
pub const NOPERM: i32 = 77;

/// Operation was cancelled by user (typically Ctrl+C)
pub const CANCEL: i32 = 130;
