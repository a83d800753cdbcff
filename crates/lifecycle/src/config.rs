use std::time::Duration;

/// Tuning knobs for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Bound applied to every store and ledger call.
    pub store_timeout: Duration,

    /// Insert attempts before order placement gives up on numbering.
    pub order_number_attempts: u32,

    /// Retries of a transition after an optimistic-concurrency conflict.
    pub update_retries: u32,

    /// Put an order's quantities back into stock when it is cancelled.
    pub restock_on_cancel: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            order_number_attempts: 5,
            update_retries: 3,
            restock_on_cancel: false,
        }
    }
}

impl LifecycleConfig {
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_order_number_attempts(mut self, attempts: u32) -> Self {
        self.order_number_attempts = attempts.max(1);
        self
    }

    pub fn with_update_retries(mut self, retries: u32) -> Self {
        self.update_retries = retries;
        self
    }

    pub fn with_restock_on_cancel(mut self, restock: bool) -> Self {
        self.restock_on_cancel = restock;
        self
    }
}
