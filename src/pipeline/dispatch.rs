//! Request dispatch: deliver one half across the client pool with
//! retry/backoff.
//!
//! ## Rotation strategy
//!
//! Client order is shuffled fresh for every call. Under repeated failures a
//! fixed order would hammer the first key until its quota died while the
//! rest of the pool sat idle; a per-call shuffle spreads load evenly without
//! any shared counter.
//!
//! ## Retry strategy
//!
//! Each client gets up to `tries_per_client` attempts before the dispatcher
//! rotates to the next one. After every failed attempt the task sleeps
//! `backoff_base_ms * 2^attempt` plus a uniform jitter, so with the 500 ms
//! default the per-client wait sequence is ~0.5 s → 1 s → 2 s. The first
//! success wins immediately; clients later in the shuffled order are never
//! touched on that call.

use crate::backend::{ClientPool, VisionBackend, IMAGE_MIME};
use crate::config::BatchConfig;
use crate::error::{BackendError, HalfError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Deliver one image half to the first client that answers.
///
/// Returns the raw reply text, or [`HalfError::DispatchExhausted`] once every
/// client has burned every try. Transport and HTTP failures never propagate
/// individually — they are retried here and only their last representative
/// survives in the error detail.
pub async fn dispatch(
    pool: &ClientPool,
    image: &[u8],
    config: &BatchConfig,
) -> Result<String, HalfError> {
    // Not the thread-local rng: that one is !Send and this future crosses
    // awaits between draws.
    let mut rng = StdRng::from_os_rng();
    dispatch_with_rng(pool, image, config, &mut rng).await
}

/// [`dispatch`] with a caller-supplied RNG, so tests can seed the shuffle
/// and make retry order deterministic.
pub async fn dispatch_with_rng<R>(
    pool: &ClientPool,
    image: &[u8],
    config: &BatchConfig,
    rng: &mut R,
) -> Result<String, HalfError>
where
    R: Rng + ?Sized,
{
    let mut order: Vec<Arc<dyn VisionBackend>> = pool.clients().to_vec();
    order.shuffle(rng);

    let tries = config.tries_per_client;
    let instruction = config.instruction_text();
    let mut last_err: Option<BackendError> = None;

    for client in &order {
        for attempt in 0..tries {
            match client
                .generate(&config.model, image, IMAGE_MIME, instruction)
                .await
            {
                Ok(text) => {
                    debug!(
                        "{}: reply after attempt {} ({} chars)",
                        client.label(),
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} on {} failed — {}",
                        client.label(),
                        attempt + 1,
                        tries,
                        config.model,
                        e
                    );
                    last_err = Some(e);
                    sleep(backoff_delay(config, attempt, rng)).await;
                }
            }
        }
    }

    Err(HalfError::DispatchExhausted {
        clients: order.len(),
        attempts: order.len() as u32 * tries,
        detail: last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string()),
    })
}

/// `base * 2^attempt` plus uniform jitter in `[0, jitter_ms)`.
fn backoff_delay<R: Rng + ?Sized>(config: &BatchConfig, attempt: u32, rng: &mut R) -> Duration {
    let exp = config
        .backoff_base_ms
        .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let jitter = if config.backoff_jitter_ms > 0 {
        rng.random_range(0..config.backoff_jitter_ms)
    } else {
        0
    };
    Duration::from_millis(exp.saturating_add(jitter))
}
