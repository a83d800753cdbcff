//! Order lifecycle engine.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{OrderId, Version};
use domain::{
    Aggregate, DomainEvent, Order, OrderError, OrderEvent, OrderStatus, PaymentStatus, PlaceOrder,
};
use order_store::{
    InventoryLedger, OrderQuery, OrderStore, OrderStoreExt, StockLine, StoreError, with_timeout,
};

use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, Result};
use crate::numbering::OrderNumberAuthority;

/// Result of a placement or transition.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The order as stored after the command.
    pub order: Order,

    /// The events the command produced. Empty when nothing changed.
    pub events: Vec<OrderEvent>,

    /// The stored document version after the command.
    pub new_version: Version,
}

impl CommandResult {
    /// Returns true if the command changed the order.
    pub fn changed(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Orchestrates order placement and status transitions.
///
/// Stock, numbering and persistence are reached through the store traits,
/// so the same engine runs on the in-memory and PostgreSQL backends.
pub struct OrderLifecycle<S, L>
where
    S: OrderStore,
    L: InventoryLedger,
{
    store: S,
    ledger: L,
    numbering: OrderNumberAuthority<S>,
    config: LifecycleConfig,
}

impl<S, L> OrderLifecycle<S, L>
where
    S: OrderStore + Clone,
    L: InventoryLedger,
{
    /// Creates a new lifecycle engine.
    pub fn new(store: S, ledger: L, config: LifecycleConfig) -> Self {
        let numbering = OrderNumberAuthority::new(store.clone(), config.store_timeout);
        Self {
            store,
            ledger,
            numbering,
            config,
        }
    }

    /// Returns a reference to the order store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the inventory ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Turns a checkout into a persisted order.
    ///
    /// Stock for every line is reserved in one all-or-nothing step before the
    /// order is numbered and stored. A failed insert puts the stock back. An
    /// insert that times out is checked against the store first: a stored
    /// order counts as placed, and stock stays reserved while the outcome
    /// cannot be read.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, items = cmd.items.len()))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult> {
        let started = Instant::now();
        let result = self.try_place_order(&cmd).await;

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_number = %placed.order.order_number(),
                    payment_method = %placed.order.payment_info().payment_method,
                    order_status = %placed.order.order_status(),
                    total = %placed.order.total(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_placement_failures_total", "reason" => e.reason())
                    .increment(1);
            }
        }

        result
    }

    async fn try_place_order(&self, cmd: &PlaceOrder) -> Result<CommandResult> {
        cmd.validate()?;

        let lines = StockLine::from_items(&cmd.items);
        if let Err(e) = self.timed(self.ledger.reserve(&lines)).await {
            tracing::warn!(error = %e, "stock reservation rejected");
            return Err(e.into());
        }

        match self.insert_numbered(cmd).await {
            Ok(placed) => Ok(placed),
            Err(InsertError::Rejected(e)) => {
                tracing::warn!(error = %e, "order insert failed, restoring reserved stock");
                self.restore_stock(&lines).await;
                Err(e)
            }
            Err(InsertError::Unconfirmed(e)) => {
                tracing::error!(
                    error = %e,
                    ?lines,
                    "order insert outcome unknown, stock stays reserved for reconciliation"
                );
                Err(e)
            }
        }
    }

    /// Inserts the order, moving to fallback numbers while the chosen number
    /// is taken by a concurrent placement.
    async fn insert_numbered(
        &self,
        cmd: &PlaceOrder,
    ) -> std::result::Result<CommandResult, InsertError> {
        let attempts = self.config.order_number_attempts.max(1);

        for attempt in 1..=attempts {
            let number = if attempt == 1 {
                self.numbering
                    .next()
                    .await
                    .map_err(|e| InsertError::Rejected(e.into()))?
            } else {
                OrderNumberAuthority::<S>::fallback(Utc::now())
            };

            let mut order = Order::default();
            let events = order
                .place(cmd, number, Utc::now())
                .map_err(|e| InsertError::Rejected(e.into()))?;
            order.apply_events(events.clone());
            order.set_version(Version::first());

            match self.timed(self.store.insert(&order)).await {
                Ok(()) => {
                    return Ok(CommandResult {
                        order,
                        events,
                        new_version: Version::first(),
                    });
                }
                Err(StoreError::DuplicateOrderNumber(taken)) => {
                    tracing::warn!(%taken, attempt, "order number already taken, retrying");
                    metrics::counter!("order_number_fallbacks_total").increment(1);
                }
                Err(StoreError::Timeout(limit)) => {
                    return self.confirm_insert(cmd.order_id, events, limit).await;
                }
                Err(e) => return Err(InsertError::Rejected(e.into())),
            }
        }

        Err(InsertError::Rejected(LifecycleError::StoreUnavailable(format!(
            "no free order number after {attempts} attempts"
        ))))
    }

    /// Resolves an insert that timed out. The write may still have
    /// committed, so the stored order decides the outcome.
    async fn confirm_insert(
        &self,
        order_id: OrderId,
        events: Vec<OrderEvent>,
        limit: Duration,
    ) -> std::result::Result<CommandResult, InsertError> {
        match self.timed(self.store.get(order_id)).await {
            Ok(Some(order)) => {
                tracing::warn!(%order_id, "order insert committed after timing out");
                Ok(CommandResult {
                    new_version: order.version(),
                    order,
                    events,
                })
            }
            Ok(None) => Err(InsertError::Rejected(LifecycleError::Timeout(limit))),
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "could not confirm timed out insert");
                Err(InsertError::Unconfirmed(LifecycleError::Timeout(limit)))
            }
        }
    }

    async fn restore_stock(&self, lines: &[StockLine]) {
        if let Err(e) = self.timed(self.ledger.restore(lines)).await {
            tracing::error!(error = %e, ?lines, "failed to restore stock, manual reconciliation needed");
        }
    }

    /// Sets the payment status of an order.
    ///
    /// Completing the payment of a pending order also moves it to
    /// processing.
    #[tracing::instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        order_id: OrderId,
        target: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<CommandResult> {
        self.execute(order_id, |order, now| {
            order.update_payment_status(target, paid_at, now)
        })
        .await
    }

    /// Moves an order to a new status.
    ///
    /// When restocking on cancel is enabled, a successful cancellation puts
    /// the order's quantities back into stock.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<CommandResult> {
        let result = self
            .execute(order_id, |order, now| order.update_order_status(target, now))
            .await?;

        if target == OrderStatus::Cancelled && result.changed() && self.config.restock_on_cancel {
            let lines = StockLine::from_items(result.order.items());
            tracing::info!(order_number = %result.order.order_number(), "restocking cancelled order");
            self.restore_stock(&lines).await;
        }

        Ok(result)
    }

    /// Retrieves an order, failing with `NotFound` if it is absent.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        Ok(self.timed(self.store.get_required(order_id)).await?)
    }

    /// Lists orders matching the query, newest first.
    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(self.timed(self.store.query(query)).await?)
    }

    /// Loads the order, runs `command_fn` and writes the result back.
    ///
    /// A concurrent write between load and update is retried from a fresh
    /// load up to `update_retries` times. Commands that produce no events
    /// are not written.
    async fn execute<F>(&self, order_id: OrderId, command_fn: F) -> Result<CommandResult>
    where
        F: Fn(&Order, DateTime<Utc>) -> std::result::Result<Vec<OrderEvent>, OrderError>,
    {
        let mut conflicts = 0;

        loop {
            let mut order = self.get_order(order_id).await?;
            let current_version = order.version();

            let events = command_fn(&order, Utc::now())?;
            if events.is_empty() {
                return Ok(CommandResult {
                    order,
                    events,
                    new_version: current_version,
                });
            }

            order.apply_events(events.clone());
            let new_version = current_version.next();
            order.set_version(new_version);

            match self
                .timed(self.store.update(&order, current_version))
                .await
            {
                Ok(()) => {
                    record_transitions(&order, &events);
                    return Ok(CommandResult {
                        order,
                        events,
                        new_version,
                    });
                }
                Err(StoreError::ConcurrencyConflict { .. }) if conflicts < self.config.update_retries => {
                    conflicts += 1;
                    tracing::debug!(%order_id, conflicts, "concurrent update, retrying");
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    return Err(LifecycleError::Conflict {
                        order_id,
                        attempts: conflicts + 1,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn timed<T, F>(&self, future: F) -> std::result::Result<T, StoreError>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        with_timeout(self.config.store_timeout, future).await
    }
}

/// Why an insert did not produce an order.
enum InsertError {
    /// Nothing was stored; reserved stock can be returned.
    Rejected(LifecycleError),
    /// The order may have been stored; reserved stock must stay put.
    Unconfirmed(LifecycleError),
}

fn record_transitions(order: &Order, events: &[OrderEvent]) {
    for event in events {
        let (kind, from, to) = match event {
            OrderEvent::PaymentStatusChanged(data) => {
                ("payment", data.from.as_str(), data.to.as_str())
            }
            OrderEvent::OrderStatusChanged(data) => ("order", data.from.as_str(), data.to.as_str()),
            OrderEvent::OrderPlaced(_) => continue,
        };
        metrics::counter!("order_status_transitions_total", "kind" => kind, "to" => to)
            .increment(1);
        tracing::info!(
            order_number = %order.order_number(),
            event = event.event_type(),
            kind,
            from,
            to,
            "order status changed"
        );
    }
}
