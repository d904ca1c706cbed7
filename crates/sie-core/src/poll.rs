// ── Poll driver ──
//
// One-shot mode reconciles each configured interface once and stops at
// the first failure. Daemon mode loops forever, isolating per-interface
// failures so one bad cycle never terminates the process, and jitters
// the inter-cycle sleep to avoid thundering-herd synchronization across
// many hosts polling the same service.

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, error, info, warn};

use crate::backend::NetBackend;
use crate::config::AgentConfig;
use crate::error::UpdateError;
use crate::fetch::Fetcher;
use crate::reconcile::reconcile;

/// Reconcile every configured interface exactly once, in sequence.
///
/// The first failure terminates the run; interfaces already processed
/// are not rolled back.
pub async fn run_once(
    backend: &dyn NetBackend,
    config: &AgentConfig,
    fetcher: &Fetcher,
) -> Result<(), UpdateError> {
    for iface in &config.interfaces {
        reconcile(backend, iface, config, fetcher).await?;
    }
    Ok(())
}

/// Run reconciliation cycles forever.
///
/// Per-interface pass failures are logged and swallowed: quietly for
/// the expected per-pass failure classes, with full diagnostic detail
/// for anything unexpected. The loop itself never exits; availability
/// of the control loop wins over crash-on-error.
pub async fn run_daemon(backend: &dyn NetBackend, config: &AgentConfig, fetcher: &Fetcher) {
    info!(
        interval_secs = config.poll_interval.as_secs(),
        interfaces = ?config.interfaces,
        "starting poll loop"
    );
    loop {
        for iface in &config.interfaces {
            match reconcile(backend, iface, config, fetcher).await {
                Ok(()) => {}
                Err(err) if err.is_pass_failure() => {
                    warn!(%iface, error = %err, "reconciliation pass failed");
                }
                Err(err) => {
                    error!(%iface, error = ?err, "unexpected error during reconciliation");
                }
            }
        }

        let delay = jittered_interval(config.poll_interval, &mut rand::thread_rng());
        debug!(delay_secs = delay.as_secs_f64(), "sleeping until next cycle");
        tokio::time::sleep(delay).await;
    }
}

/// Draw a sleep duration from `Normal(interval, interval / 10)`,
/// clamped at zero.
fn jittered_interval<R: Rng>(interval: Duration, rng: &mut R) -> Duration {
    let mean = interval.as_secs_f64();
    let drawn = match Normal::new(mean, mean / 10.0) {
        Ok(normal) => normal.sample(rng),
        // Only reachable with a non-finite sigma; fall back to no jitter.
        Err(_) => mean,
    };
    Duration::from_secs_f64(drawn.max(0.0))
}
