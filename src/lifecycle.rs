//! Booking lifecycle.
//!
//! ```text
//! create ──► Tentative ──pay──► Paid
//!               │  └─(hold window lapses)─► Expired
//!               └──cancel──► (row removed)
//! ```
//!
//! Only the payment flag is stored. `Tentative` vs `Expired` is recomputed
//! from `(created_at, now, paid)` on every read.

use serde::Serialize;
use ulid::Ulid;

use crate::availability::is_active;
use crate::error::BookingError;
use crate::model::{Booking, HOLD_WINDOW_MS, Ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    Tentative,
    Expired,
    Paid,
}

pub fn state_of(booking: &Booking, now: Ms) -> BookingState {
    if booking.paid {
        BookingState::Paid
    } else if is_active(booking, now) {
        BookingState::Tentative
    } else {
        BookingState::Expired
    }
}

pub fn reserved_until(created_at: Ms) -> Ms {
    created_at + HOLD_WINDOW_MS
}

/// Request to flip a booking's payment flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayCommand {
    pub booking_id: Ulid,
    pub owner: String,
    pub now: Ms,
}

impl PayCommand {
    /// Guard for `Tentative --pay--> Paid`.
    ///
    /// A booking owned by someone else is reported as missing.
    pub fn check(&self, booking: &Booking) -> Result<(), BookingError> {
        if booking.id != self.booking_id || booking.owner != self.owner {
            return Err(BookingError::NotFound(self.booking_id));
        }
        if booking.paid {
            return Err(BookingError::AlreadyPaid(booking.id));
        }
        if self.now - booking.created_at > HOLD_WINDOW_MS {
            return Err(BookingError::PaymentWindowExpired(booking.id));
        }
        Ok(())
    }
}

/// Request to remove an unpaid booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelCommand {
    pub booking_id: Ulid,
    pub owner: String,
}

impl CancelCommand {
    pub fn check(&self, booking: &Booking) -> Result<(), BookingError> {
        if booking.id != self.booking_id || booking.owner != self.owner {
            return Err(BookingError::NotFound(self.booking_id));
        }
        if booking.paid {
            return Err(BookingError::CannotCancelPaid(booking.id));
        }
        Ok(())
    }
}
