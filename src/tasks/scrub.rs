//! Synthetic scroll driver: moves progress linearly between two frame positions.

use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Progress after `elapsed` of a `duration`-long linear scrub from `from` to `to`.
pub fn progress_at(from: f32, to: f32, elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return to;
    }
    let t = (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0) as f32;
    from + (to - from) * t
}

#[instrument(skip(progress_tx, cancel))]
pub async fn run(
    progress_tx: watch::Sender<f32>,
    from: f32,
    to: f32,
    duration: Duration,
    tick_interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    progress_tx.send_replace(from);

    loop {
        select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let elapsed = start.elapsed();
                progress_tx.send_replace(progress_at(from, to, elapsed, duration));
                if elapsed >= duration {
                    debug!(progress = to, "scrub finished");
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_both_directions() {
        let d = Duration::from_secs(10);
        assert_eq!(progress_at(0.0, 100.0, Duration::from_secs(5), d), 50.0);
        assert_eq!(progress_at(900.0, 600.0, Duration::from_secs(5), d), 750.0);
        assert_eq!(progress_at(900.0, 600.0, Duration::from_secs(20), d), 600.0);
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        assert_eq!(progress_at(3.0, 7.0, Duration::ZERO, Duration::ZERO), 7.0);
    }

    #[tokio::test]
    async fn ends_on_target() {
        let (tx, rx) = watch::channel(0.0_f32);
        run(
            tx,
            10.0,
            2.0,
            Duration::from_millis(100),
            Duration::from_millis(16),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(*rx.borrow(), 2.0);
    }
}
