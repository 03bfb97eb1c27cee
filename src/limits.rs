use crate::model::{DAY_MS, Ms};

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

pub const MAX_STAY_DAYS: Ms = 366;
pub const MAX_STAY_MS: Ms = MAX_STAY_DAYS * DAY_MS;

pub const MAX_VISITORS: u32 = 64;
pub const MAX_OWNER_LEN: usize = 256;

/// Upper bound for a single nightly price, in whole currency units.
/// Keeps a full-length stay far away from decimal overflow.
pub const MAX_PRICE_UNITS: i64 = 1_000_000_000_000;

/// Widest date window accepted when listing daily overrides.
pub const MAX_OVERRIDE_QUERY_DAYS: i64 = 3 * 366;

/// Bookings that may block the calendar at once. Lapsed holds do not count.
pub const MAX_ACTIVE_BOOKINGS: usize = 100_000;
