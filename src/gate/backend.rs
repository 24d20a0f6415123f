//! Flood control trait for abstracting the gate from request handlers.

use async_trait::async_trait;

use crate::context::CheckContext;
use crate::error::Result;

/// Trait for flood control implementations.
///
/// Request-handling layers depend on this trait rather than on
/// [`RateGate`](super::RateGate) directly, so the gate can be injected
/// behind an `Arc<dyn FloodControl>`.
#[async_trait]
pub trait FloodControl: Send + Sync {
    /// Record a check for `user_id` and decide whether it is admitted.
    ///
    /// Returns `Ok(false)` when the identifier is over its limit. An `Err`
    /// means the decision is unknown and must not be read as either outcome.
    async fn check(&self, ctx: &CheckContext, user_id: i64) -> Result<bool>;
}
