use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::UserId;
use crate::domain::status::RequestStatus;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FundId(pub String);

/// One priced line of a request. Money is in the smallest currency unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub amount: i64,
}

impl LineItem {
    /// Builds a line with `amount` derived from quantity and unit price.
    /// Returns `None` when the product does not fit in an `i64`.
    pub fn priced(name: impl Into<String>, quantity: i64, unit_price: i64) -> Option<Self> {
        let amount = quantity.checked_mul(unit_price)?;
        Some(Self { name: name.into(), quantity, unit_price, amount })
    }
}

/// Sum of line amounts, `None` on overflow.
pub fn line_items_total(items: &[LineItem]) -> Option<i64> {
    items.iter().try_fold(0_i64, |sum, item| sum.checked_add(item.amount))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub id: RequestId,
    pub title: String,
    pub organization: String,
    pub payee: String,
    pub amount: i64,
    pub status: RequestStatus,
    pub owner_id: UserId,
    pub fund_id: FundId,
    pub reason: String,
    pub line_items: Vec<LineItem>,
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where notifications for a request owner are delivered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerContact {
    pub email: String,
    pub full_name: Option<String>,
}

/// Usage of a named item within an organization for a budget year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUsage {
    pub name: String,
    pub department: String,
    pub unit_price: i64,
    pub year: i32,
}

/// Accumulated usage of an item name, used to suggest names and prices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCategory {
    pub name: String,
    pub department: String,
    pub unit_price: i64,
    pub year: i32,
    pub use_count: u32,
}

#[cfg(test)]
mod tests {
    use super::{line_items_total, LineItem};

    #[test]
    fn priced_line_computes_amount() {
        let item = LineItem::priced("ball", 2, 500).expect("fits");
        assert_eq!(item.amount, 1000);
    }

    #[test]
    fn total_is_sum_of_line_amounts() {
        let items = vec![
            LineItem::priced("ball", 2, 500).expect("fits"),
            LineItem::priced("net", 1, 3000).expect("fits"),
        ];
        assert_eq!(line_items_total(&items), Some(4000));
    }

    #[test]
    fn overflow_is_reported_instead_of_wrapping() {
        assert!(LineItem::priced("gold", i64::MAX, 2).is_none());
        let items = vec![
            LineItem { name: "a".into(), quantity: 1, unit_price: i64::MAX, amount: i64::MAX },
            LineItem { name: "b".into(), quantity: 1, unit_price: 1, amount: 1 },
        ];
        assert_eq!(line_items_total(&items), None);
    }
}
