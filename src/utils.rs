//! Small helpers shared across components.

use std::time::Instant;

/// Milliseconds elapsed since `start`, saturating rather than panicking on
/// overflow (matches `execution_time_ms`'s `u64` shape everywhere it's used).
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
