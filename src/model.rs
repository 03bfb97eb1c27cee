use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::lifecycle::{BookingState, reserved_until, state_of};

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const DAY_MS: Ms = 24 * 60 * MINUTE_MS;

/// How long an unpaid booking keeps blocking the calendar after creation.
pub const HOLD_WINDOW_MS: Ms = 10 * MINUTE_MS;

/// Wall-clock now. Only the binary and background tasks read the clock;
/// every engine operation takes `now` as an argument.
pub fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| Ms::try_from(d.as_millis()).unwrap_or(Ms::MAX))
        .unwrap_or(0)
}

/// UTC calendar date containing `ms`.
pub fn date_of(ms: Ms) -> NaiveDate {
    DateTime::from_timestamp_millis(ms)
        .unwrap_or_default()
        .date_naive()
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whole nights covered, end exclusive.
    pub fn day_count(&self) -> u32 {
        crate::pricing::day_count(self.start, self.end)
    }
}

/// Half-open range of calendar dates `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }
}

/// A reservation of the venue. Snapshots are immutable; the only stored
/// mutation is the payment flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub owner: String,
    pub span: Span,
    pub visitors: u32,
    pub day_count: u32,
    pub paid: bool,
    pub total_price: Decimal,
    pub created_at: Ms,
}

impl Booking {
    pub fn reserved_until(&self) -> Ms {
        reserved_until(self.created_at)
    }
}

/// The singleton base nightly rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub nightly_rate: Decimal,
    pub updated_at: Ms,
}

/// Price override for a single calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRate {
    pub date: NaiveDate,
    pub price: Decimal,
    pub created_by: Option<String>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

/// Flat calendar events. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        id: Ulid,
        owner: String,
        span: Span,
        visitors: u32,
        day_count: u32,
        paid: bool,
        total_price: Decimal,
        created_at: Ms,
    },
    PaymentFlagSet {
        id: Ulid,
        paid: bool,
    },
    BookingDeleted {
        id: Ulid,
    },
    RateSet {
        nightly_rate: Decimal,
        updated_at: Ms,
    },
    OverrideSet {
        date: NaiveDate,
        price: Decimal,
        created_by: Option<String>,
        created_at: Ms,
        updated_at: Ms,
    },
    OverrideDeleted {
        date: NaiveDate,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub id: Ulid,
    pub owner: String,
    pub start: Ms,
    pub end: Ms,
    pub visitors: u32,
    pub day_count: u32,
    pub paid: bool,
    pub total_price: Decimal,
    pub created_at: Ms,
    /// Countdown target for the payment window.
    pub reserved_until: Ms,
    pub state: BookingState,
}

impl BookingView {
    pub fn at(booking: &Booking, now: Ms) -> Self {
        Self {
            id: booking.id,
            owner: booking.owner.clone(),
            start: booking.span.start,
            end: booking.span.end,
            visitors: booking.visitors,
            day_count: booking.day_count,
            paid: booking.paid,
            total_price: booking.total_price,
            created_at: booking.created_at,
            reserved_until: booking.reserved_until(),
            state: state_of(booking, now),
        }
    }
}

/// Availability display: when the venue is taken, never by whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicBooking {
    pub start: Ms,
    pub end: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateView {
    pub nightly_rate: Decimal,
    pub updated_at: Option<Ms>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRateView {
    pub date: NaiveDate,
    pub price: Decimal,
    pub created_by: Option<String>,
}

impl From<&DailyRate> for DailyRateView {
    fn from(rate: &DailyRate) -> Self {
        Self {
            date: rate.date,
            price: rate.price,
            created_by: rate.created_by.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NightPrice {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// Price of a range without reserving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub start: Ms,
    pub end: Ms,
    pub day_count: u32,
    pub total_price: Decimal,
    pub nights: Vec<NightPrice>,
}
