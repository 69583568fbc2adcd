//! Order Model
//!
//! An order reserves quantity of one budidaya. It starts `pending` and ends
//! in exactly one of `success` or `cancelled`.

use super::audit::Audit;
use crate::error::ValidationErrors;
use crate::validation::require_id;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "order_status", rename_all = "lowercase"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Success,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// pending -> success | cancelled, nothing else
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success) | (Self::Pending, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub budidaya_id: Uuid,
    pub pricelist_id: Option<Uuid>,
    /// Buyer
    pub user_id: Option<Uuid>,
    pub qty: i64,
    pub status: OrderStatus,
    pub booking_date: NaiveDate,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

impl Order {
    /// Pending and not deleted
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Pending && !self.audit.is_deleted()
    }
}

/// Create order payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderInput {
    #[serde(default)]
    pub budidaya_id: Uuid,
    pub pricelist_id: Option<Uuid>,
    pub qty: i64,
    /// Today when absent
    pub booking_date: Option<NaiveDate>,
}

impl CreateOrderInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, "order", "budidaya_id", self.budidaya_id);
        if let Some(id) = self.pricelist_id {
            require_id(&mut errors, "order", "pricelist_id", id);
        }
        errors.check(self.qty > 0, "order", "qty", "must be greater than zero");
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Success));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Success.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Success));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Success.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_create_input_validation() {
        let errors = CreateOrderInput {
            pricelist_id: Some(Uuid::nil()),
            qty: -3,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.has_field("budidaya_id"));
        assert!(errors.has_field("pricelist_id"));
        assert!(errors.has_field("qty"));

        let ok = CreateOrderInput {
            budidaya_id: Uuid::new_v4(),
            pricelist_id: None,
            qty: 5,
            booking_date: None,
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
