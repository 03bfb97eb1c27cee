mod calendar;
mod wal_store;

pub use calendar::Calendar;
pub use wal_store::Store;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use ulid::Ulid;

use crate::model::*;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(String),
    #[error("not found: {0}")]
    NotFound(Ulid),
}

/// Persistence boundary for the booking engine.
///
/// Implementations apply each mutation durably before returning. Callers
/// that need check-then-write atomicity serialize through their own gate;
/// see `BookingService`.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError>;

    /// Bookings of one owner, or all when `owner` is `None`, newest first.
    async fn list_bookings(&self, owner: Option<&str>) -> Result<Vec<Booking>, StoreError>;

    /// Bookings that still block the calendar at `now`.
    async fn count_active(&self, now: Ms) -> Result<usize, StoreError>;

    /// Every booking whose span overlaps `span`, active or not.
    async fn bookings_overlapping(&self, span: Span) -> Result<Vec<Booking>, StoreError>;

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError>;

    async fn update_payment_flag(&self, id: Ulid, paid: bool) -> Result<(), StoreError>;

    async fn delete_booking(&self, id: Ulid) -> Result<(), StoreError>;

    async fn get_rate(&self) -> Result<Option<Rate>, StoreError>;

    async fn upsert_rate(&self, rate: Rate) -> Result<(), StoreError>;

    async fn find_override(&self, date: NaiveDate) -> Result<Option<DailyRate>, StoreError>;

    async fn upsert_override(&self, rate: DailyRate) -> Result<(), StoreError>;

    /// Returns false when no override existed for `date`.
    async fn delete_override(&self, date: NaiveDate) -> Result<bool, StoreError>;

    /// Overrides ordered by date, optionally limited to `range`.
    async fn list_overrides(&self, range: Option<DateRange>) -> Result<Vec<DailyRate>, StoreError>;

    /// Base rate and the overrides in `range`, read as one consistent view.
    async fn rates_for(&self, range: DateRange) -> Result<(Option<Rate>, Vec<DailyRate>), StoreError>;
}
