//! Sliding-window admission gate and its per-identifier state.

mod backend;
mod history;
mod limiter;

pub use backend::FloodControl;
pub(crate) use history::CheckHistory;
pub use limiter::RateGate;
