//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use super::{OrderError, PaymentMethod, PaymentStatus};

/// Money amount in minor units (cents) to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Multiplies by a quantity, saturating at the bounds of the amount.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line item captured at checkout.
///
/// Name, price and image are a snapshot taken when the order is placed and are
/// never refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at order time.
    pub name: String,

    /// Unit price at order time.
    pub price: Money,

    /// Product image URL at order time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Quantity ordered.
    pub quantity: u32,

    /// Chosen size, if the product has sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Chosen color, if the product has colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OrderItem {
    /// Creates a new order item without image or variant.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        quantity: u32,
        price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            image: None,
            quantity,
            size: None,
            color: None,
        }
    }

    /// Returns the line total (quantity * price), saturating on overflow.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), OrderError> {
        if self.product_id.as_str().trim().is_empty() {
            return Err(OrderError::validation(
                format!("items[{index}].productId"),
                "is required",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(OrderError::validation(
                format!("items[{index}].name"),
                "is required",
            ));
        }
        if self.quantity == 0 {
            return Err(OrderError::validation(
                format!("items[{index}].quantity"),
                "must be at least 1",
            ));
        }
        if self.price.is_negative() {
            return Err(OrderError::validation(
                format!("items[{index}].price"),
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Shipping address snapshot taken at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub(crate) fn validate(&self) -> Result<(), OrderError> {
        let required = [
            ("shippingAddress.fullName", &self.full_name),
            ("shippingAddress.phone", &self.phone),
            ("shippingAddress.street", &self.street),
            ("shippingAddress.city", &self.city),
            ("shippingAddress.postalCode", &self.postal_code),
            ("shippingAddress.country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::validation(field, "is required"));
            }
        }

        if let Some(email) = &self.email
            && !email.contains('@')
        {
            return Err(OrderError::validation(
                "shippingAddress.email",
                "is not a valid email address",
            ));
        }

        Ok(())
    }
}

/// Payment sub-record of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// Reference handed out by the payment processor, or a manual-payment token.
    pub payment_intent_id: String,

    pub payment_method: PaymentMethod,

    pub payment_status: PaymentStatus,

    /// Set once, when the payment first completes.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Default for PaymentInfo {
    fn default() -> Self {
        Self {
            payment_intent_id: String::new(),
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Pending,
            paid_at: None,
        }
    }
}
