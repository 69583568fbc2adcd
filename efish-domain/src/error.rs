//! Domain error taxonomy
//!
//! `DomainError` is what every command and query returns. It converts into
//! the shared [`AppError`] for callers without logging. Commands log their
//! own failures through `DomainError::trace`: business-rule rejections at
//! `warn`, infrastructure failures at `error`.

use chrono::NaiveDate;
use shared::error::{AppError, ErrorCode, ValidationErrors};
use shared::models::{OrderStatus, PondStatus};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Aggregates a lookup can miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Pond,
    Pool,
    Berkas,
    Budidaya,
    Pricelist,
    FishSpecies,
    Order,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pond => "pond",
            Self::Pool => "pool",
            Self::Berkas => "berkas",
            Self::Budidaya => "budidaya",
            Self::Pricelist => "pricelist",
            Self::FishSpecies => "fish species",
            Self::Order => "order",
        }
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Pond => ErrorCode::PondNotFound,
            Self::Pool => ErrorCode::PoolNotFound,
            Self::Berkas => ErrorCode::BerkasNotFound,
            Self::Budidaya => ErrorCode::BudidayaNotFound,
            Self::Pricelist => ErrorCode::NotFound,
            Self::FishSpecies => ErrorCode::FishSpeciesNotFound,
            Self::Order => ErrorCode::OrderNotFound,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniqueness and sequencing rules
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Conflict {
    #[error("pool {pool_id} already has an active budidaya")]
    ActiveCycleExists { pool_id: Uuid },

    #[error("harvest estimate {estimate_date} is before the sowing period {date_of_seed}")]
    HarvestBeforeSeeding {
        date_of_seed: NaiveDate,
        estimate_date: NaiveDate,
    },

    #[error("Order Estimate Exceeded Capacity: requested {requested}, remaining {remaining}")]
    Oversell {
        budidaya_id: Uuid,
        requested: i64,
        remaining: i64,
    },

    #[error("cannot release {requested}, only {sold} sold")]
    SoldUnderflow {
        budidaya_id: Uuid,
        requested: i64,
        sold: i64,
    },

    #[error("stock {stock} is below the sold quantity {sold}")]
    StockBelowSold {
        budidaya_id: Uuid,
        stock: i64,
        sold: i64,
    },

    #[error("budidaya code {code} already exists")]
    DuplicateCode { code: String },

    #[error("order {order_id} cannot move from {from} to {to}")]
    InvalidOrderTransition {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("budidaya {budidaya_id} is already harvested")]
    TerminalStatus { budidaya_id: Uuid },
}

impl Conflict {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::ActiveCycleExists { .. } => ErrorCode::BudidayaActiveExists,
            Self::HarvestBeforeSeeding { .. } => ErrorCode::HarvestBeforeSeeding,
            Self::Oversell { .. } => ErrorCode::StockExceeded,
            Self::SoldUnderflow { .. } => ErrorCode::SoldUnderflow,
            Self::StockBelowSold { .. } => ErrorCode::StockBelowSold,
            Self::DuplicateCode { .. } => ErrorCode::BudidayaCodeExists,
            Self::InvalidOrderTransition { .. } => ErrorCode::OrderStatusInvalid,
            Self::TerminalStatus { .. } => ErrorCode::BudidayaHarvested,
        }
    }

    fn into_app_error(self) -> AppError {
        let err = AppError::with_message(self.error_code(), self.to_string());
        match self {
            Self::ActiveCycleExists { pool_id } => err.with_detail("pool_id", pool_id.to_string()),
            Self::HarvestBeforeSeeding {
                date_of_seed,
                estimate_date,
            } => err
                .with_detail("Sowing-period", date_of_seed.to_string())
                .with_detail("Harvest-estimate", estimate_date.to_string()),
            Self::Oversell {
                budidaya_id,
                requested,
                remaining,
            } => err
                .with_detail("budidaya_id", budidaya_id.to_string())
                .with_detail("requested", requested)
                .with_detail("remaining", remaining),
            Self::SoldUnderflow {
                budidaya_id,
                requested,
                sold,
            } => err
                .with_detail("budidaya_id", budidaya_id.to_string())
                .with_detail("requested", requested)
                .with_detail("sold", sold),
            Self::StockBelowSold {
                budidaya_id,
                stock,
                sold,
            } => err
                .with_detail("budidaya_id", budidaya_id.to_string())
                .with_detail("stock", stock)
                .with_detail("sold", sold),
            Self::DuplicateCode { code } => err.with_detail("code", code),
            Self::InvalidOrderTransition {
                order_id,
                from,
                to,
            } => err
                .with_detail("order_id", order_id.to_string())
                .with_detail("from", from.as_str())
                .with_detail("to", to.as_str()),
            Self::TerminalStatus { budidaya_id } => {
                err.with_detail("budidaya_id", budidaya_id.to_string())
            }
        }
    }
}

/// Transaction step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
    Begin,
    Commit,
    Rollback,
    /// Any use after commit or rollback
    Reuse,
}

impl fmt::Display for TxAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Reuse => "reuse",
        })
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: Uuid },

    #[error("pond {pond_id} is not active (status {status})")]
    PondNotActive { pond_id: Uuid, status: PondStatus },

    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// The store rejected a read or write
    #[error("{op} failed: {source}")]
    Persistence {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    /// Begin, commit or rollback itself failed. After a failed commit the
    /// caller cannot tell whether the change applied.
    #[error("transaction {action} failed: {source}")]
    Transaction {
        action: TxAction,
        #[source]
        source: StoreError,
    },

    #[error("{original} (rollback failed: {rollback})")]
    RollbackFailed {
        original: Box<DomainError>,
        rollback: Box<DomainError>,
    },

    #[error("{op} exceeded its deadline")]
    DeadlineExceeded { op: &'static str },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn not_found(resource: Resource, id: Uuid) -> Self {
        Self::NotFound { resource, id }
    }

    /// The error that decides what the caller should do. For a failed
    /// rollback this is the error that triggered it.
    pub fn primary(&self) -> &DomainError {
        match self {
            Self::RollbackFailed { original, .. } => original.primary(),
            other => other,
        }
    }

    /// Unit already committed or rolled back
    pub(crate) fn closed() -> Self {
        Self::Transaction {
            action: TxAction::Reuse,
            source: StoreError::Closed,
        }
    }

    /// Business-rule rejection, as opposed to an infrastructure failure
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.primary(),
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::PondNotActive { .. }
                | Self::Conflict(_)
        )
    }

    /// Log a failed command: rejections at warn, infrastructure failures at error
    pub(crate) fn trace(&self, op: &'static str) {
        let code = self.error_code().code();
        if self.is_rejection() {
            tracing::warn!(op, code, error = %self, "Command rejected");
        } else {
            tracing::error!(op, code, error = %self, "Command failed");
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::NotFound { resource, .. } => resource.error_code(),
            Self::PondNotActive { .. } => ErrorCode::PondNotActive,
            Self::Conflict(c) => c.error_code(),
            Self::Persistence { .. } => ErrorCode::DatabaseError,
            Self::Transaction { .. } => ErrorCode::TransactionFailed,
            Self::RollbackFailed { .. } => ErrorCode::RollbackFailed,
            Self::DeadlineExceeded { .. } => ErrorCode::TimeoutError,
        }
    }
}

/// Tag a store failure with the operation that hit it
pub(crate) trait StoreResultExt<T> {
    fn op(self, op: &'static str) -> DomainResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn op(self, op: &'static str) -> DomainResult<T> {
        self.map_err(|source| DomainError::Persistence { op, source })
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => AppError::from(errors),
            DomainError::NotFound { resource, id } => AppError::with_message(
                resource.error_code(),
                format!("{resource} not found"),
            )
            .with_detail("resource", resource.as_str())
            .with_detail("id", id.to_string()),
            DomainError::PondNotActive { pond_id, status } => {
                AppError::new(ErrorCode::PondNotActive)
                    .with_detail("pond_id", pond_id.to_string())
                    .with_detail("pond-status", status.as_str())
            }
            DomainError::Conflict(conflict) => conflict.into_app_error(),
            DomainError::Persistence { op, source } => AppError::new(ErrorCode::DatabaseError)
                .with_detail("op", op)
                .with_detail("error", source.to_string()),
            DomainError::Transaction { action, source } => {
                AppError::new(ErrorCode::TransactionFailed)
                    .with_detail("action", action.to_string())
                    .with_detail("error", source.to_string())
            }
            DomainError::RollbackFailed { original, rollback } => {
                let rollback_message = rollback.to_string();
                AppError::from(*original).with_detail("rollback_error", rollback_message)
            }
            DomainError::DeadlineExceeded { op } => {
                AppError::new(ErrorCode::TimeoutError).with_detail("op", op)
            }
        }
    }
}
