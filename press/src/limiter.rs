use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use press_core::{RateMode, WorkConfig};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Pool-level rate limit, turned into one [`Throttle`] per worker.
pub(crate) enum Limiter {
    Unlimited,
    PerWorker(Duration),
    Shared(Arc<DefaultDirectRateLimiter>),
}

impl Limiter {
    pub fn new(config: &WorkConfig) -> Self {
        let Some(period) = config.rate_period() else {
            return Self::Unlimited;
        };

        match config.rate_mode {
            RateMode::PerWorker => Self::PerWorker(period),
            RateMode::Shared => match rate_limiter(period) {
                Some(limiter) => Self::Shared(Arc::new(limiter)),
                None => Self::Unlimited,
            },
        }
    }

    /// Must be called from within the runtime.
    pub fn throttle(&self) -> Throttle {
        match self {
            Self::Unlimited => Throttle::Unlimited,
            Self::PerWorker(period) => {
                // NOTE: The first tick lands one period after the worker starts.
                let mut ticker = interval_at(Instant::now() + *period, *period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Throttle::Ticker(ticker)
            }
            Self::Shared(limiter) => Throttle::Shared(limiter.clone()),
        }
    }
}

pub(crate) enum Throttle {
    Unlimited,
    Ticker(Interval),
    Shared(Arc<DefaultDirectRateLimiter>),
}

impl Throttle {
    pub async fn wait(&mut self) {
        match self {
            Self::Unlimited => {}
            Self::Ticker(ticker) => {
                ticker.tick().await;
            }
            Self::Shared(limiter) => limiter.until_ready().await,
        }
    }
}

fn rate_limiter(period: Duration) -> Option<DefaultDirectRateLimiter> {
    let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
    Some(RateLimiter::direct(quota))
}
