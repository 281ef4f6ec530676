use crate::error::{panic_message, EngineError};
use crate::ticker::{ticker_key, SharedTicker, Ticker};
use crate::Result;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Interval given to tickers registered without one
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Worker threads of a manager created with `TickerManager::new`
pub const DEFAULT_POOL_SIZE: usize = 10;

struct TickerTask {
    task: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl TickerTask {
    // A tick that is already running completes; the task ends at its next
    // suspension point
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

struct TickerOrder {
    ticker: SharedTicker,
    interval_ms: u64,
    task: Option<TickerTask>,

    /// Held while `tick` runs; shared by every task the order ever had
    running: Arc<AsyncMutex<()>>,
}

impl TickerOrder {
    fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .map_or(false, |task| !task.cancelled.load(Ordering::SeqCst))
    }
}

/// Runs registered tickers, each at its own interval, on a shared pool of
/// worker threads.
///
/// Ticks are fixed-rate: the next one is due one interval after the
/// scheduled start of the previous one. Missed ticks are skipped, and the
/// same ticker never runs twice at once.
pub struct TickerManager {
    name: String,
    pool_size: usize,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    orders: Mutex<Vec<TickerOrder>>,
}

impl TickerManager {
    /// Creates a manager with the default pool of 10 workers
    pub fn new() -> Result<Self> {
        Self::with_name("ticker", DEFAULT_POOL_SIZE)
    }

    /// Creates a manager with `pool_size` workers
    pub fn with_pool_size(pool_size: usize) -> Result<Self> {
        Self::with_name("ticker", pool_size)
    }

    /// Creates a manager whose worker threads are called `<name>-worker`
    pub fn with_name(name: impl Into<String>, pool_size: usize) -> Result<Self> {
        let name = name.into();
        if pool_size == 0 {
            return Err(EngineError::Precondition("ticker pool size must be positive".to_string()));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(pool_size)
            .thread_name(format!("{}-worker", name))
            .enable_time()
            .build()
            .map_err(|e| EngineError::Resource(format!("failed to create ticker pool {}: {}", name, e)))?;

        debug!(manager = %name, pool_size, "ticker manager created");

        Ok(Self {
            name,
            pool_size,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            orders: Mutex::new(Vec::new()),
        })
    }

    /// Returns the manager name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of worker threads
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    fn lock_orders(&self) -> MutexGuard<'_, Vec<TickerOrder>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shut_down(&self) -> bool {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    fn find<'a>(orders: &'a mut [TickerOrder], key: usize) -> Option<&'a mut TickerOrder> {
        orders.iter_mut().find(|order| ticker_key(&order.ticker) == key)
    }

    /// Registers `ticker` with the default interval, without starting it.
    /// Registering twice only logs a warning.
    pub fn register(&self, ticker: SharedTicker) -> Result<()> {
        let key = ticker_key(&ticker);
        let mut orders = self.lock_orders();

        if Self::find(&mut orders, key).is_some() {
            warn!(manager = %self.name, "ticker is already registered");
            return Ok(());
        }

        orders.push(TickerOrder {
            ticker,
            interval_ms: DEFAULT_INTERVAL_MS,
            task: None,
            running: Arc::new(AsyncMutex::new(())),
        });
        Ok(())
    }

    /// Registers `ticker` and starts it at `interval_ms`
    pub fn register_with_interval(&self, ticker: SharedTicker, interval_ms: u64) -> Result<()> {
        if interval_ms == 0 {
            error!(manager = %self.name, "ticker interval must be positive");
            return Err(EngineError::Precondition("ticker interval must be positive".to_string()));
        }

        self.register(Arc::clone(&ticker))?;
        self.start(&ticker, interval_ms)
    }

    /// Starts a registered, inactive ticker. The first tick is due one
    /// interval from now.
    pub fn start<T: Ticker + ?Sized>(&self, ticker: &Arc<T>, interval_ms: u64) -> Result<()> {
        if interval_ms == 0 {
            error!(manager = %self.name, "ticker interval must be positive");
            return Err(EngineError::Precondition("ticker interval must be positive".to_string()));
        }

        let mut orders = self.lock_orders();
        let order = match Self::find(&mut orders, ticker_key(ticker)) {
            Some(order) => order,
            None => {
                error!(manager = %self.name, "cannot start a ticker that is not registered");
                return Err(EngineError::NotRegistered);
            }
        };

        if order.is_active() {
            error!(manager = %self.name, "ticker is already running");
            return Err(EngineError::Lifecycle("the ticker is already running".to_string()));
        }

        self.schedule(order, interval_ms)
    }

    fn schedule(&self, order: &mut TickerOrder, interval_ms: u64) -> Result<()> {
        if self.is_shut_down() {
            error!(manager = %self.name, "cannot start tickers after shutdown");
            return Err(EngineError::Lifecycle(format!("ticker manager {} is shut down", self.name)));
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let task = self.handle.spawn(run_order(
            self.name.clone(),
            Arc::clone(&order.ticker),
            Duration::from_millis(interval_ms),
            Arc::clone(&cancelled),
            Arc::clone(&order.running),
        ));

        order.interval_ms = interval_ms;
        order.task = Some(TickerTask { task, cancelled });
        debug!(manager = %self.name, interval_ms, "ticker started");
        Ok(())
    }

    /// Stops a registered ticker. A tick that is already running completes.
    pub fn stop<T: Ticker + ?Sized>(&self, ticker: &Arc<T>) -> Result<()> {
        let mut orders = self.lock_orders();
        let order = match Self::find(&mut orders, ticker_key(ticker)) {
            Some(order) => order,
            None => {
                error!(manager = %self.name, "cannot stop a ticker that is not registered");
                return Err(EngineError::NotRegistered);
            }
        };

        match order.task.take() {
            Some(task) => {
                task.cancel();
                debug!(manager = %self.name, "ticker stopped");
            }
            None => warn!(manager = %self.name, "ticker is already stopped"),
        }
        Ok(())
    }

    /// Changes the interval. A running ticker is restarted with the new
    /// interval; a stopped one keeps it for its next start.
    pub fn change_interval<T: Ticker + ?Sized>(&self, ticker: &Arc<T>, interval_ms: u64) -> Result<()> {
        if interval_ms == 0 {
            error!(manager = %self.name, "ticker interval must be positive");
            return Err(EngineError::Precondition("ticker interval must be positive".to_string()));
        }

        let mut orders = self.lock_orders();
        let order = match Self::find(&mut orders, ticker_key(ticker)) {
            Some(order) => order,
            None => {
                error!(manager = %self.name, "cannot change the interval of a ticker that is not registered");
                return Err(EngineError::NotRegistered);
            }
        };

        match order.task.take() {
            Some(task) => {
                task.cancel();
                self.schedule(order, interval_ms)
            }
            None => {
                order.interval_ms = interval_ms;
                Ok(())
            }
        }
    }

    /// Stops the ticker if needed and forgets it
    pub fn unregister<T: Ticker + ?Sized>(&self, ticker: &Arc<T>) -> Result<()> {
        let key = ticker_key(ticker);
        let mut orders = self.lock_orders();

        let index = match orders.iter().position(|order| ticker_key(&order.ticker) == key) {
            Some(index) => index,
            None => {
                error!(manager = %self.name, "cannot unregister a ticker that is not registered");
                return Err(EngineError::NotRegistered);
            }
        };

        let order = orders.remove(index);
        if let Some(task) = order.task {
            task.cancel();
        }
        Ok(())
    }

    /// Stops and forgets every ticker
    pub fn stop_all(&self) {
        let orders: Vec<TickerOrder> = std::mem::take(&mut *self.lock_orders());

        for order in orders {
            if let Some(task) = order.task {
                task.cancel();
            }
        }
    }

    /// Returns true if `ticker` is registered
    pub fn is_registered<T: Ticker + ?Sized>(&self, ticker: &Arc<T>) -> bool {
        let key = ticker_key(ticker);
        self.lock_orders().iter().any(|order| ticker_key(&order.ticker) == key)
    }

    /// Returns true if `ticker` is registered and running
    pub fn is_active<T: Ticker + ?Sized>(&self, ticker: &Arc<T>) -> bool {
        let key = ticker_key(ticker);
        self.lock_orders()
            .iter()
            .any(|order| ticker_key(&order.ticker) == key && order.is_active())
    }

    /// Returns true if any ticker is running
    pub fn has_active_tickers(&self) -> bool {
        self.lock_orders().iter().any(TickerOrder::is_active)
    }

    /// Returns the interval of a registered ticker
    pub fn interval_of<T: Ticker + ?Sized>(&self, ticker: &Arc<T>) -> Option<u64> {
        let key = ticker_key(ticker);
        self.lock_orders()
            .iter()
            .find(|order| ticker_key(&order.ticker) == key)
            .map(|order| order.interval_ms)
    }

    /// Returns the number of registered tickers
    pub fn ticker_count(&self) -> usize {
        self.lock_orders().len()
    }

    /// Stops every ticker and tears the pool down, waiting for running ticks
    /// to return. Called from inside a tick, the pool is released without
    /// waiting.
    pub fn shutdown(&self) {
        self.stop_all();

        let runtime = self.runtime.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(runtime) = runtime {
            if Handle::try_current().is_ok() {
                warn!(manager = %self.name, "ticker manager shut down from async context, not waiting for ticks");
                runtime.shutdown_background();
            } else {
                drop(runtime);
            }
            info!(manager = %self.name, "ticker manager shut down");
        }
    }
}

impl Drop for TickerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TickerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerManager")
            .field("name", &self.name)
            .field("pool_size", &self.pool_size)
            .field("tickers", &self.ticker_count())
            .finish()
    }
}

async fn run_order(
    manager: String,
    ticker: SharedTicker,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    running: Arc<AsyncMutex<()>>,
) {
    let mut next = Instant::now() + period;

    loop {
        tokio::time::sleep_until(next).await;

        let guard = running.lock().await;
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        invoke(&manager, ticker.as_ref());
        drop(guard);

        next += period;
        let now = Instant::now();
        if next < now {
            let missed = ((now - next).as_nanos() / period.as_nanos()).min(u128::from(u32::MAX - 1)) as u32 + 1;
            next += period * missed;
            debug!(manager = %manager, missed, "ticker fell behind, skipping ticks");
        }
    }
}

fn invoke(manager: &str, ticker: &dyn Ticker) {
    match catch_unwind(AssertUnwindSafe(|| ticker.tick())) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let message = format!("{:#}", e);
            error!(manager = %manager, error = %message, "ticker failed");
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(manager = %manager, panic = %message, "ticker panicked");
        }
    }
}
