//! Budidaya Model
//!
//! A budidaya is one seeding-to-harvest cultivation cycle inside a pool.
//! `stock` is the total produced quantity, `sold` the part already committed
//! to orders; `0 <= sold <= stock` always holds for persisted rows.

use super::audit::Audit;
use crate::error::ValidationErrors;
use crate::validation::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, optional_text, require_id, require_text};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Production status of a cultivation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "budidaya_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum BudidayaStatus {
    /// Seeded
    #[default]
    Benih,
    /// Growing out
    Pembesaran,
    /// Harvested (terminal)
    Panen,
}

impl BudidayaStatus {
    /// Active cycles block their pool from starting another one
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Panen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benih => "BENIH",
            Self::Pembesaran => "PEMBESARAN",
            Self::Panen => "PANEN",
        }
    }
}

impl fmt::Display for BudidayaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budidaya entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Budidaya {
    pub id: Uuid,
    pub pond_id: Uuid,
    pub pool_id: Uuid,
    pub fish_species_id: Uuid,
    /// Human-readable label, unique among non-deleted cycles
    pub code: String,
    pub date_of_seed: NaiveDate,
    pub estimated_panen_date: Option<NaiveDate>,
    /// Estimated harvest weight in tonnes
    pub estimated_tonase: Option<f64>,
    pub status: BudidayaStatus,
    pub stock: i64,
    pub sold: i64,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

impl Budidaya {
    /// Not deleted and not yet harvested
    pub fn is_active(&self) -> bool {
        !self.audit.is_deleted() && self.status.is_active()
    }

    /// Quantity still available for orders
    pub fn remaining(&self) -> i64 {
        self.stock - self.sold
    }
}

/// Pricelist entity (per-grade price of a harvest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Pricelist {
    pub id: Uuid,
    pub budidaya_id: Uuid,
    /// Grade / size label, e.g. "5-7 ekor/kg"
    pub limit: String,
    pub price: Decimal,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

/// Fish species reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct FishSpecies {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub audit: Audit,
}

// ── Inputs ──────────────────────────────────────────────────────────

/// Create budidaya payload. An empty `code` is generated from the pond name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBudidayaInput {
    #[serde(default)]
    pub pond_id: Uuid,
    #[serde(default)]
    pub pool_id: Uuid,
    #[serde(default)]
    pub fish_species_id: Uuid,
    #[serde(default)]
    pub code: String,
    pub date_of_seed: Option<NaiveDate>,
    /// Initial status, BENIH when absent
    pub status: Option<BudidayaStatus>,
    #[serde(default)]
    pub stock: i64,
}

impl CreateBudidayaInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, "budidaya", "pond_id", self.pond_id);
        require_id(&mut errors, "budidaya", "pool_id", self.pool_id);
        require_id(&mut errors, "budidaya", "fish_species_id", self.fish_species_id);
        optional_text(
            &mut errors,
            "budidaya",
            "code",
            Some(&self.code),
            MAX_SHORT_TEXT_LEN,
        );
        errors.check(
            self.date_of_seed.is_some(),
            "budidaya",
            "date_of_seed",
            "is required",
        );
        errors.check(
            self.status != Some(BudidayaStatus::Panen),
            "budidaya",
            "status",
            "a new cycle cannot start as PANEN",
        );
        errors.check(self.stock >= 0, "budidaya", "stock", "must not be negative");
        errors.into_result()
    }
}

/// Create fish species payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFishSpeciesInput {
    pub name: String,
}

impl CreateFishSpeciesInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "fish_species", "name", &self.name, MAX_NAME_LEN);
        errors.into_result()
    }
}

/// One grade of a new pricelist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePricelistInput {
    pub limit: String,
    pub price: Decimal,
}

/// Harvest finalization: pricelist rows plus the PANEN transition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMultiplePricelistInput {
    #[serde(default)]
    pub budidaya_id: Uuid,
    pub estimate_date: Option<NaiveDate>,
    pub estimated_tonase: Option<f64>,
    #[serde(default)]
    pub pricelists: Vec<CreatePricelistInput>,
}

impl CreateMultiplePricelistInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, "pricelist", "budidaya_id", self.budidaya_id);
        errors.check(
            self.estimate_date.is_some(),
            "pricelist",
            "estimate_date",
            "is required",
        );
        check_tonase(&mut errors, "pricelist", self.estimated_tonase);
        errors.check(
            !self.pricelists.is_empty(),
            "pricelist",
            "pricelists",
            "at least one pricelist is required",
        );
        for (i, item) in self.pricelists.iter().enumerate() {
            let mut nested = ValidationErrors::new();
            check_price(&mut nested, &item.limit, item.price);
            errors.merge_nested(&format!("pricelists[{i}]"), nested);
        }
        errors.into_result()
    }
}

/// Direct update of a cycle's status, estimate and stock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBudidayaStatusInput {
    #[serde(default)]
    pub id: Uuid,
    pub status: Option<BudidayaStatus>,
    pub estimate_date: Option<NaiveDate>,
    pub estimated_tonase: Option<f64>,
    pub stock: Option<i64>,
}

impl UpdateBudidayaStatusInput {
    fn check(&self, errors: &mut ValidationErrors) {
        require_id(errors, "budidaya", "id", self.id);
        check_tonase(errors, "budidaya", self.estimated_tonase);
        if let Some(stock) = self.stock {
            errors.check(stock >= 0, "budidaya", "stock", "must not be negative");
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check(&mut errors);
        errors.into_result()
    }
}

/// Pricelist upsert entry. A nil `id` inserts a new row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePricelistInput {
    #[serde(default)]
    pub id: Uuid,
    pub limit: String,
    pub price: Decimal,
}

/// Status update plus pricelist upsert in one transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBudidayaWithPricelistInput {
    #[serde(flatten)]
    pub budidaya: UpdateBudidayaStatusInput,
    #[serde(default)]
    pub pricelists: Vec<UpdatePricelistInput>,
}

impl UpdateBudidayaWithPricelistInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.budidaya.check(&mut errors);
        for (i, item) in self.pricelists.iter().enumerate() {
            let mut nested = ValidationErrors::new();
            check_price(&mut nested, &item.limit, item.price);
            errors.merge_nested(&format!("pricelists[{i}]"), nested);
        }
        errors.into_result()
    }
}

/// Reserve (or release, when `is_cancel`) sold quantity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBudidayaSoldQtyInput {
    #[serde(default)]
    pub id: Uuid,
    pub qty: i64,
    #[serde(default)]
    pub is_cancel: bool,
}

impl UpdateBudidayaSoldQtyInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_id(&mut errors, "budidaya", "id", self.id);
        errors.check(self.qty > 0, "budidaya", "qty", "must be greater than zero");
        errors.into_result()
    }
}

fn check_price(errors: &mut ValidationErrors, limit: &str, price: Decimal) {
    require_text(errors, "pricelist", "limit", limit, MAX_SHORT_TEXT_LEN);
    errors.check(
        price > Decimal::ZERO,
        "pricelist",
        "price",
        "must be greater than zero",
    );
}

fn check_tonase(errors: &mut ValidationErrors, entity: &str, tonase: Option<f64>) {
    if let Some(t) = tonase {
        errors.check(
            t.is_finite() && t >= 0.0,
            entity,
            "estimated_tonase",
            "must not be negative",
        );
    }
}
