//! Bounded polling of eventual state.
//!
//! Asynchronous device transitions (boot, shutdown) are observed by
//! repeatedly sampling fresh state until a predicate holds or a deadline
//! elapses. The sampler here is generic: it knows nothing about devices,
//! and callers supply both the fetch and the predicate
//! ([`Device::wait_until`](crate::device::Device::wait_until) wires it to a
//! directory re-fetch by udid).

use std::thread;
use std::time::{Duration, Instant};

/// Default deadline for state-transition waits. Generous enough to cover
/// real boot/shutdown latency, but bounded: a wait never hangs forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of a bounded sampling loop.
#[derive(Debug)]
pub enum Sampled<T> {
    /// The predicate held for this sample.
    Satisfied(T),
    /// The deadline elapsed; carries the last sample taken, if any.
    TimedOut(Option<T>),
}

/// Repeatedly fetches a sample and tests it against `predicate`, sleeping
/// `interval` between attempts, until the predicate holds or `timeout`
/// elapses.
///
/// At least one sample is always taken, so a zero timeout still observes
/// current state once. Fetch errors are propagated immediately; the
/// repeated sampling polls eventual state, it never retries a failed
/// fetch.
pub fn sample_until<T, E, F, P>(
    timeout: Duration,
    interval: Duration,
    mut fetch: F,
    predicate: P,
) -> Result<Sampled<T>, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&T) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut last = None;
    loop {
        let sample = fetch()?;
        if predicate(&sample) {
            return Ok(Sampled::Satisfied(sample));
        }
        last = Some(sample);
        if Instant::now() >= deadline {
            return Ok(Sampled::TimedOut(last));
        }
        thread::sleep(interval);
    }
}
