//! Bounded status polling.

use embedded_hal::delay::DelayNs;

/// A bounded wait ran out of budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedOut;

/// Poll `done` until it returns `true` or `timeout_us` has elapsed.
///
/// The condition is checked once before any delay, so an already-satisfied
/// condition costs nothing. Elapsed time is the sum of the delays issued.
///
/// # Errors
/// [`TimedOut`] if the condition never held within the budget.
pub fn poll_until<D, F>(
    delay: &mut D,
    timeout_us: u32,
    interval_us: u32,
    mut done: F,
) -> Result<(), TimedOut>
where
    D: DelayNs,
    F: FnMut() -> bool,
{
    let step = interval_us.max(1);
    let mut elapsed = 0u32;

    loop {
        if done() {
            return Ok(());
        }
        if elapsed >= timeout_us {
            return Err(TimedOut);
        }
        delay.delay_us(step);
        elapsed = elapsed.saturating_add(step);
    }
}
