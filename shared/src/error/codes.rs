//! Unified error codes for the e-fish domain
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Pond errors (pond, pool, berkas)
//! - 2xxx: Budidaya errors (cultivation cycle, pricelist, fish species)
//! - 3xxx: Order errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Pond ====================
    /// Pond not found
    PondNotFound = 1001,
    /// Pool not found
    PoolNotFound = 1002,
    /// Berkas not found
    BerkasNotFound = 1003,
    /// Pond is not ACTIVED
    PondNotActive = 1004,

    // ==================== 2xxx: Budidaya ====================
    /// Budidaya not found
    BudidayaNotFound = 2001,
    /// Pool already hosts an active budidaya
    BudidayaActiveExists = 2002,
    /// Harvest estimate is earlier than the seeding date
    HarvestBeforeSeeding = 2003,
    /// Requested quantity exceeds remaining stock
    StockExceeded = 2004,
    /// Released quantity exceeds sold quantity
    SoldUnderflow = 2005,
    /// Stock would drop below the sold quantity
    StockBelowSold = 2006,
    /// Budidaya code already in use
    BudidayaCodeExists = 2007,
    /// Budidaya already harvested (PANEN is terminal)
    BudidayaHarvested = 2008,
    /// Fish species not found
    FishSpeciesNotFound = 2009,

    // ==================== 3xxx: Order ====================
    /// Order not found
    OrderNotFound = 3001,
    /// Order status transition not allowed
    OrderStatusInvalid = 3002,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Commit/begin failed, outcome of the write is unknown
    TransactionFailed = 9006,
    /// Rollback failed after an earlier error
    RollbackFailed = 9007,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Pond
            ErrorCode::PondNotFound => "Pond not found",
            ErrorCode::PoolNotFound => "Pool not found",
            ErrorCode::BerkasNotFound => "Berkas not found",
            ErrorCode::PondNotActive => "Pond is not active",

            // Budidaya
            ErrorCode::BudidayaNotFound => "Budidaya not found",
            ErrorCode::BudidayaActiveExists => "Pool already has an active budidaya",
            ErrorCode::HarvestBeforeSeeding => "Harvest estimate is before the sowing period",
            ErrorCode::StockExceeded => "Order estimate exceeded capacity",
            ErrorCode::SoldUnderflow => "Released quantity exceeds sold quantity",
            ErrorCode::StockBelowSold => "Stock cannot be lower than sold quantity",
            ErrorCode::BudidayaCodeExists => "Budidaya code already exists",
            ErrorCode::BudidayaHarvested => "Budidaya has already been harvested",
            ErrorCode::FishSpeciesNotFound => "Fish species not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderStatusInvalid => "Order status transition not allowed",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::TransactionFailed => "Transaction failed",
            ErrorCode::RollbackFailed => "Rollback failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Pond
            1001 => Ok(ErrorCode::PondNotFound),
            1002 => Ok(ErrorCode::PoolNotFound),
            1003 => Ok(ErrorCode::BerkasNotFound),
            1004 => Ok(ErrorCode::PondNotActive),

            // Budidaya
            2001 => Ok(ErrorCode::BudidayaNotFound),
            2002 => Ok(ErrorCode::BudidayaActiveExists),
            2003 => Ok(ErrorCode::HarvestBeforeSeeding),
            2004 => Ok(ErrorCode::StockExceeded),
            2005 => Ok(ErrorCode::SoldUnderflow),
            2006 => Ok(ErrorCode::StockBelowSold),
            2007 => Ok(ErrorCode::BudidayaCodeExists),
            2008 => Ok(ErrorCode::BudidayaHarvested),
            2009 => Ok(ErrorCode::FishSpeciesNotFound),

            // Order
            3001 => Ok(ErrorCode::OrderNotFound),
            3002 => Ok(ErrorCode::OrderStatusInvalid),

            // System
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9006 => Ok(ErrorCode::TransactionFailed),
            9007 => Ok(ErrorCode::RollbackFailed),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::PondNotActive.code(), 1004);
        assert_eq!(ErrorCode::StockExceeded.code(), 2004);
        assert_eq!(ErrorCode::OrderStatusInvalid.code(), 3002);
        assert_eq!(ErrorCode::RollbackFailed.code(), 9007);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::BerkasNotFound,
            ErrorCode::BudidayaCodeExists,
            ErrorCode::OrderNotFound,
            ErrorCode::TransactionFailed,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
        // retired slots stay unassigned
        assert!(ErrorCode::try_from(0).is_err());
        assert!(ErrorCode::try_from(9001).is_err());
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::StockExceeded).unwrap();
        assert_eq!(json, "2004");
        let code: ErrorCode = serde_json::from_str("1004").unwrap();
        assert_eq!(code, ErrorCode::PondNotActive);
    }
}
