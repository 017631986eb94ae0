//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Description                                    |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 2    | CLI usage error (bad args, unsupported input)  |
//! | 3    | Reconciliation found differences               |
//! | 4    | Invalid config (parse or validation failure)   |
//! | 5    | Runtime error (IO, missing columns)            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, unsupported input format.
pub const EXIT_USAGE: u8 = 2;

/// The run completed and the two sides differ.
/// Like `diff(1)`, a clean run over differing inputs is not exit 0.
pub const EXIT_DIFFS: u8 = 3;

/// Config rejected (TOML parse error or failed validation).
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Runtime failure - unreadable file, missing column, write error.
pub const EXIT_RUNTIME: u8 = 5;
