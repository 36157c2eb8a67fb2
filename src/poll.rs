//! Bounded busy-polling.
//!
//! Nothing guarantees a running timer during bring-up, so waits are bounded by an iteration
//! count instead of wall-clock time.

use core::fmt;

/// A bounded poll gave up.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout {
    /// The iteration budget that was exhausted.
    pub limit: u32,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "condition not met within {} iterations", self.limit)
    }
}

/// Spins until `ready` returns `true`, checking it at most `limit + 1` times.
///
/// Returns the number of failed checks before `ready` held.
///
/// ```
/// use f411_regs::poll::{wait_until, Timeout};
///
/// let mut countdown = 3;
/// let spins = wait_until(10, || {
///     countdown -= 1;
///     countdown == 0
/// });
/// assert_eq!(spins, Ok(2));
///
/// assert_eq!(wait_until(5, || false), Err(Timeout { limit: 5 }));
/// ```
pub fn wait_until(limit: u32, mut ready: impl FnMut() -> bool) -> Result<u32, Timeout> {
    let mut spins = 0;
    while !ready() {
        if spins == limit {
            return Err(Timeout { limit });
        }
        spins += 1;
        core::hint::spin_loop();
    }
    Ok(spins)
}
