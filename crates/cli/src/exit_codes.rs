//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain     | Description                                   |
//! |------|------------|-----------------------------------------------|
//! | 0    | Universal  | Success                                       |
//! | 1    | Universal  | General error (unspecified)                   |
//! | 2    | Universal  | CLI usage error (bad args, unreadable input)  |
//! | 3    | reconcile  | Invalid input payload or identifier           |
//! | 4    | reconcile  | Id or title not found                         |
//! | 5    | reconcile  | Remote API failure                            |
//! | 6    | config     | Config file unreadable or invalid             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` construction in `main.rs`

use mediarecon_recon::ReconcileError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, stdin unreadable.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconcile (3-5)
// =============================================================================

/// Malformed JSON payload or media id.
pub const EXIT_INVALID_INPUT: u8 = 3;

/// Page id with no title, or preview of a missing file.
pub const EXIT_NOT_FOUND: u8 = 4;

/// Repository or knowledge-graph API failed or answered with an unexpected shape.
pub const EXIT_REMOTE: u8 = 5;

// =============================================================================
// Config (6)
// =============================================================================

/// Config file could not be read, parsed, or validated.
pub const EXIT_CONFIG: u8 = 6;

/// Map an engine error to its exit code.
pub fn reconcile_exit_code(err: &ReconcileError) -> u8 {
    match err {
        ReconcileError::InvalidInput(_) => EXIT_INVALID_INPUT,
        ReconcileError::Lookup { .. } | ReconcileError::NotFound(_) => EXIT_NOT_FOUND,
        ReconcileError::Remote { .. } => EXIT_REMOTE,
    }
}
