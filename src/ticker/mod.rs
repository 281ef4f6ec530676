//! Periodic user callbacks
//!
//! A ticker is anything with a `tick` method. The manager runs each
//! registered ticker at its own interval on a shared worker pool.

pub mod manager;

pub use self::manager::TickerManager;

use std::sync::Arc;

/// A user callback invoked periodically by a `TickerManager`.
///
/// Errors and panics are logged by the manager and do not stop the ticker.
pub trait Ticker: Send + Sync {
    fn tick(&self) -> anyhow::Result<()>;
}

impl<F> Ticker for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn tick(&self) -> anyhow::Result<()> {
        self()
    }
}

/// Shared ticker as stored by the manager
pub type SharedTicker = Arc<dyn Ticker>;

/// Identity of a ticker: the address of its shared allocation
pub(crate) fn ticker_key<T: ?Sized>(ticker: &Arc<T>) -> usize {
    Arc::as_ptr(ticker) as *const () as usize
}
