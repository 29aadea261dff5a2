//! Process exit codes surfaced to whatever drives `quotawait run`

/// The run finished normally.
pub const EXIT_SUCCESS: i32 = 0;

/// Unrelated failure; needs an operator.
pub const EXIT_FAILURE: i32 = 1;

/// Quota exhausted and a resume task was created (sysexits `EX_TEMPFAIL`).
pub const EXIT_QUOTA_EXHAUSTED: i32 = 75;
