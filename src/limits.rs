//! Fixed capacities the shell enforces. Kept in one place so the
//! executor, job table, and history ring agree on the same numbers.

/// Hard cap on the number of tokens a single input line may produce.
/// Overflow is truncated silently (interactive input should never block).
pub const MAX_TOKENS: usize = 256;

/// Maximum number of concurrent non-`Done` jobs tracked in the job table.
/// Jobs beyond this are still executed, just not tracked — a documented gap.
pub const MAX_JOBS: usize = 128;

/// Capacity of the on-disk/in-memory history ring.
pub const HISTORY_CAPACITY: usize = 1000;
