//! Payment and order status state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Fulfilment status of an order.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered
///    │            │             │
///    └────────────┴─────────────┴──► Cancelled
/// ```
/// Moving to Processing requires a completed payment; Delivered is only
/// reachable from Shipped. Delivered and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment or confirmation.
    #[default]
    Pending,

    /// Paid and being prepared.
    Processing,

    /// Handed over to the carrier.
    Shipped,

    /// Received by the customer (terminal state).
    Delivered,

    /// Cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in progression order with Cancelled last.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Position along the forward path. Cancelled sits outside it.
    pub fn progression(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    /// Returns true if administrators and payment callbacks may set this status.
    pub fn is_settable(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid through the payment processor at checkout.
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Reference prefix marking a cash-on-delivery checkout.
    pub const CASH_ON_DELIVERY_PREFIX: &'static str = "cod_";

    /// Reference prefix marking a bank-transfer checkout.
    pub const BANK_TRANSFER_PREFIX: &'static str = "bank_transfer_";

    /// Infers the method from a payment reference.
    ///
    /// Only meant for callers that cannot send the method explicitly; any
    /// reference without a manual-payment prefix is a processor intent.
    pub fn from_reference(reference: &str) -> Self {
        if reference.starts_with(Self::CASH_ON_DELIVERY_PREFIX) {
            PaymentMethod::CashOnDelivery
        } else if reference.starts_with(Self::BANK_TRANSFER_PREFIX) {
            PaymentMethod::BankTransfer
        } else {
            PaymentMethod::Card
        }
    }

    /// Returns true if the payment is settled outside the processor.
    pub fn is_manual(&self) -> bool {
        !matches!(self, PaymentMethod::Card)
    }

    /// Payment status an order starts with.
    pub fn initial_payment_status(&self) -> PaymentStatus {
        if self.is_manual() {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Completed
        }
    }

    /// Order status an order starts with.
    pub fn initial_order_status(&self) -> OrderStatus {
        if self.is_manual() {
            OrderStatus::Pending
        } else {
            OrderStatus::Processing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(OrderError::validation(
                "paymentMethod",
                format!("unknown payment method '{other}'"),
            )),
        }
    }
}

/// Why an order status changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// An administrator asked for it.
    Requested,
    /// The payment completed while the order was pending.
    PaymentCompleted,
}
