//! Fixed-interval status polling.
//!
//! [`run_polling`] invokes a status check immediately, then once per
//! [`PollConfig::interval`], until the check asks to stop, the optional
//! attempt cap is reached, or the [`CancellationToken`] is triggered.
//! Checks never overlap: the next tick is only awaited after the
//! previous check finished, and missed ticks are delayed rather than
//! bursted.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default spacing between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Tunable parameters for the polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between the start of consecutive checks.
    pub interval: Duration,
    /// Give up after this many checks. `None` polls until a terminal
    /// state or cancellation.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// What a single check wants the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Stop,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// A check returned [`PollStep::Stop`].
    Stopped { attempts: u32 },
    /// The cancellation token fired.
    Cancelled { attempts: u32 },
    /// `max_attempts` checks ran without a stop.
    Exhausted { attempts: u32 },
}

/// Drive `check` on a fixed interval. `check` receives the 1-based
/// attempt number.
pub async fn run_polling<F, Fut>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut check: F,
) -> PollExit
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep>,
{
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        // The first tick completes immediately.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled { attempts },
            _ = ticker.tick() => {}
        }

        attempts += 1;
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollExit::Cancelled { attempts },
            step = check(attempts) => step,
        };

        if step == PollStep::Stop {
            return PollExit::Stopped { attempts };
        }
        if config.max_attempts.is_some_and(|max| attempts >= max) {
            return PollExit::Exhausted { attempts };
        }
    }
}
