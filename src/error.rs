use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use ulid::Ulid;

use crate::model::Ms;
use crate::store::StoreError;

/// Every way a booking operation can be refused.
///
/// All variants are per-request failures; the transport layer maps
/// [`ErrorKind`] to its own status codes and shows the `Display` text.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("end must be after start (start {start}, end {end})")]
    InvalidRange { start: Ms, end: Ms },

    #[error("visitor count {0} is out of range")]
    InvalidVisitors(u32),

    #[error("selected date range already booked (conflicts with {0})")]
    SlotUnavailable(Ulid),

    #[error("invalid rate {0}: must be positive with at most 2 decimal places")]
    InvalidRate(Decimal),

    #[error("booking not found: {0}")]
    NotFound(Ulid),

    #[error("no daily rate set for {0}")]
    OverrideNotFound(NaiveDate),

    #[error("booking {0} already paid")]
    AlreadyPaid(Ulid),

    #[error("payment window expired for booking {0}")]
    PaymentWindowExpired(Ulid),

    #[error("cannot cancel paid booking {0}")]
    CannotCancelPaid(Ulid),

    #[error("authentication required")]
    Unauthorized,

    #[error("admin only")]
    Forbidden,

    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRange,
    InvalidVisitors,
    SlotUnavailable,
    InvalidRate,
    NotFound,
    AlreadyPaid,
    PaymentWindowExpired,
    CannotCancelPaid,
    Unauthorized,
    Forbidden,
    LimitExceeded,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRange => "invalid_range",
            ErrorKind::InvalidVisitors => "invalid_visitors",
            ErrorKind::SlotUnavailable => "slot_unavailable",
            ErrorKind::InvalidRate => "invalid_rate",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyPaid => "already_paid",
            ErrorKind::PaymentWindowExpired => "payment_window_expired",
            ErrorKind::CannotCancelPaid => "cannot_cancel_paid",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidRange { .. } => ErrorKind::InvalidRange,
            BookingError::InvalidVisitors(_) => ErrorKind::InvalidVisitors,
            BookingError::SlotUnavailable(_) => ErrorKind::SlotUnavailable,
            BookingError::InvalidRate(_) => ErrorKind::InvalidRate,
            BookingError::NotFound(_) | BookingError::OverrideNotFound(_) => ErrorKind::NotFound,
            BookingError::AlreadyPaid(_) => ErrorKind::AlreadyPaid,
            BookingError::PaymentWindowExpired(_) => ErrorKind::PaymentWindowExpired,
            BookingError::CannotCancelPaid(_) => ErrorKind::CannotCancelPaid,
            BookingError::Unauthorized => ErrorKind::Unauthorized,
            BookingError::Forbidden => ErrorKind::Forbidden,
            BookingError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            BookingError::Storage(_) => ErrorKind::Storage,
        }
    }
}
