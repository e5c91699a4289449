//! Generator-wide constants

/// Cells per grid unit along each axis
pub const CHUNK_SIZE: u32 = 4;

/// Default ceiling on controller and loop-closing steps
pub const DEFAULT_STEP_LIMIT: u32 = 10_000;

/// Local re-attempts a node gets before backtracking escalates to its parent
pub const DEFAULT_RETRY_LIMIT: u32 = 1;
