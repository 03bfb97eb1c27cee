//! Booking operations as seen by a caller.
//!
//! Every operation takes the caller's capability and the request's `now`
//! explicitly. Every write runs under one calendar-wide gate, so two
//! overlapping creates can never both see a free slot and a pay racing a
//! cancel sees the other's outcome.

mod caller;
#[cfg(test)]
mod tests;

pub use caller::Caller;

use std::sync::Arc;
use std::time::Instant;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};
use ulid::Ulid;

use crate::availability::{active_spans, find_conflict, validate_span};
use crate::error::BookingError;
use crate::lifecycle::{CancelCommand, PayCommand};
use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::pricing::{RateTable, compute_total, day_count, nightly_breakdown, validate_price};
use crate::store::Repository;

/// Input for [`BookingService::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRequest {
    pub start: Ms,
    pub end: Ms,
    pub visitors: u32,
}

pub struct BookingService<R> {
    repo: Arc<R>,
    /// Serializes read-then-write sequences on the calendar.
    write_gate: Mutex<()>,
    /// Base rate reported and charged while no rate has been set.
    default_rate: Decimal,
    max_active: usize,
}

fn checked_span(start: Ms, end: Ms) -> Result<Span, BookingError> {
    if end <= start {
        return Err(BookingError::InvalidRange { start, end });
    }
    let span = Span::new(start, end);
    validate_span(&span)?;
    Ok(span)
}

impl<R: Repository> BookingService<R> {
    pub fn new(repo: Arc<R>, default_rate: Decimal) -> Self {
        Self {
            repo,
            write_gate: Mutex::new(()),
            default_rate,
            max_active: MAX_ACTIVE_BOOKINGS,
        }
    }

    /// Override the cap on bookings blocking the calendar at once.
    pub fn with_max_active_bookings(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    fn rate_view(&self, rate: Option<Rate>) -> RateView {
        match rate {
            Some(rate) => RateView {
                nightly_rate: rate.nightly_rate,
                updated_at: Some(rate.updated_at),
            },
            None => RateView {
                nightly_rate: self.default_rate,
                updated_at: None,
            },
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    // ── Public reads ─────────────────────────────────────────

    /// Ranges currently taken, without owner identity.
    pub async fn list_public_ranges(&self, now: Ms) -> Result<Vec<PublicBooking>, BookingError> {
        let started = Instant::now();
        let result = async {
            let bookings = self.repo.list_bookings(None).await?;
            Ok::<_, BookingError>(active_spans(&bookings, now)
                .into_iter()
                .map(|s| PublicBooking {
                    start: s.start,
                    end: s.end,
                })
                .collect())
        }
        .await;
        observability::record("list_public_ranges", &result, started);
        result
    }

    pub async fn get_rate(&self) -> Result<RateView, BookingError> {
        let started = Instant::now();
        let result = async {
            let rate = self.repo.get_rate().await?;
            Ok::<_, BookingError>(self.rate_view(rate))
        }
        .await;
        observability::record("get_rate", &result, started);
        result
    }

    pub async fn list_daily_overrides(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<DailyRateView>, BookingError> {
        let started = Instant::now();
        let result = async {
            if let Some(r) = range
                && (r.to - r.from).num_days() > MAX_OVERRIDE_QUERY_DAYS
            {
                return Err(BookingError::LimitExceeded("override query window too wide"));
            }
            let overrides = self.repo.list_overrides(range).await?;
            Ok::<_, BookingError>(overrides.iter().map(DailyRateView::from).collect())
        }
        .await;
        observability::record("list_daily_overrides", &result, started);
        result
    }

    /// Price a range without reserving it.
    pub async fn quote(&self, start: Ms, end: Ms) -> Result<Quote, BookingError> {
        let started = Instant::now();
        let result = async {
            let span = checked_span(start, end)?;
            let rates = self.rate_table(&span).await?;
            Ok::<_, BookingError>(Quote {
                start,
                end,
                day_count: span.day_count(),
                total_price: compute_total(start, end, &rates),
                nights: nightly_breakdown(start, end, &rates),
            })
        }
        .await;
        observability::record("quote", &result, started);
        result
    }

    /// Base rate plus every override that can fall on a night of `span`,
    /// taken from one consistent read.
    async fn rate_table(&self, span: &Span) -> Result<RateTable, BookingError> {
        let first = date_of(span.start);
        let nights = u64::from(day_count(span.start, span.end));
        let last = first.checked_add_days(Days::new(nights)).unwrap_or(NaiveDate::MAX);
        let (rate, overrides) = self.repo.rates_for(DateRange::new(first, last)).await?;
        let base = self.rate_view(rate).nightly_rate;
        Ok(RateTable::from_parts(base, &overrides))
    }

    // ── Rate administration ──────────────────────────────────

    pub async fn set_rate(&self, caller: &Caller, price: Decimal, now: Ms) -> Result<RateView, BookingError> {
        let started = Instant::now();
        let result = async {
            let admin = caller.require_admin()?;
            let nightly_rate = validate_price(price)?;
            let _gate = self.write_gate.lock().await;
            self.repo
                .upsert_rate(Rate {
                    nightly_rate,
                    updated_at: now,
                })
                .await?;
            info!("base rate set to {nightly_rate} by {admin}");
            Ok::<_, BookingError>(RateView {
                nightly_rate,
                updated_at: Some(now),
            })
        }
        .await;
        observability::record("set_rate", &result, started);
        result
    }

    /// Upsert the override for `date`. A replaced override keeps its
    /// original author and creation time.
    pub async fn set_daily_override(
        &self,
        caller: &Caller,
        date: NaiveDate,
        price: Decimal,
        now: Ms,
    ) -> Result<DailyRateView, BookingError> {
        let started = Instant::now();
        let result = async {
            let admin = caller.require_admin()?;
            let price = validate_price(price)?;
            let _gate = self.write_gate.lock().await;
            let rate = match self.repo.find_override(date).await? {
                Some(existing) => DailyRate {
                    price,
                    updated_at: now,
                    ..existing
                },
                None => DailyRate {
                    date,
                    price,
                    created_by: Some(admin.to_string()),
                    created_at: now,
                    updated_at: now,
                },
            };
            let view = DailyRateView::from(&rate);
            self.repo.upsert_override(rate).await?;
            info!("daily rate for {date} set to {price} by {admin}");
            Ok::<_, BookingError>(view)
        }
        .await;
        observability::record("set_daily_override", &result, started);
        result
    }

    pub async fn delete_daily_override(&self, caller: &Caller, date: NaiveDate) -> Result<(), BookingError> {
        let started = Instant::now();
        let result = async {
            let admin = caller.require_admin()?;
            let _gate = self.write_gate.lock().await;
            if !self.repo.delete_override(date).await? {
                return Err(BookingError::OverrideNotFound(date));
            }
            info!("daily rate for {date} removed by {admin}");
            Ok::<_, BookingError>(())
        }
        .await;
        observability::record("delete_daily_override", &result, started);
        result
    }

    // ── Bookings ─────────────────────────────────────────────

    pub async fn create(
        &self,
        caller: &Caller,
        request: BookingRequest,
        now: Ms,
    ) -> Result<BookingView, BookingError> {
        let started = Instant::now();
        let result = self.create_inner(caller, request, now).await;
        observability::record("create", &result, started);
        result
    }

    async fn create_inner(
        &self,
        caller: &Caller,
        request: BookingRequest,
        now: Ms,
    ) -> Result<BookingView, BookingError> {
        let owner = caller.require_identity()?;
        if owner.len() > MAX_OWNER_LEN {
            return Err(BookingError::LimitExceeded("owner identity too long"));
        }
        let span = checked_span(request.start, request.end)?;
        if request.visitors == 0 || request.visitors > MAX_VISITORS {
            return Err(BookingError::InvalidVisitors(request.visitors));
        }

        let _gate = self.write_gate.lock().await;

        if self.repo.count_active(now).await? >= self.max_active {
            return Err(BookingError::LimitExceeded("too many active bookings"));
        }
        let existing = self.repo.bookings_overlapping(span).await?;
        if let Some(conflict) = find_conflict(&span, &existing, now) {
            debug!(
                "create [{}, {}) for {owner} rejected: overlaps {}",
                span.start, span.end, conflict.id
            );
            return Err(BookingError::SlotUnavailable(conflict.id));
        }

        let rates = self.rate_table(&span).await?;
        let booking = Booking {
            id: Ulid::new(),
            owner: owner.to_string(),
            span,
            visitors: request.visitors,
            day_count: span.day_count(),
            paid: false,
            total_price: compute_total(span.start, span.end, &rates),
            created_at: now,
        };
        self.repo.insert_booking(booking.clone()).await?;
        info!(
            "booking {} created for {owner}: [{}, {}) {} nights, total {}",
            booking.id, span.start, span.end, booking.day_count, booking.total_price
        );
        Ok(BookingView::at(&booking, now))
    }

    pub async fn list_mine(&self, caller: &Caller, now: Ms) -> Result<Vec<BookingView>, BookingError> {
        let started = Instant::now();
        let result = async {
            let owner = caller.require_identity()?;
            let bookings = self.repo.list_bookings(Some(owner)).await?;
            Ok::<_, BookingError>(bookings.iter().map(|b| BookingView::at(b, now)).collect())
        }
        .await;
        observability::record("list_mine", &result, started);
        result
    }

    pub async fn list_all(&self, caller: &Caller, now: Ms) -> Result<Vec<BookingView>, BookingError> {
        let started = Instant::now();
        let result = async {
            caller.require_admin()?;
            let bookings = self.repo.list_bookings(None).await?;
            Ok::<_, BookingError>(bookings.iter().map(|b| BookingView::at(b, now)).collect())
        }
        .await;
        observability::record("list_all", &result, started);
        result
    }

    pub async fn pay(&self, caller: &Caller, id: Ulid, now: Ms) -> Result<BookingView, BookingError> {
        let started = Instant::now();
        let result = async {
            let command = PayCommand {
                booking_id: id,
                owner: caller.require_identity()?.to_string(),
                now,
            };
            self.apply_pay(command).await
        }
        .await;
        observability::record("pay", &result, started);
        result
    }

    async fn apply_pay(&self, command: PayCommand) -> Result<BookingView, BookingError> {
        let _gate = self.write_gate.lock().await;
        let booking = self
            .repo
            .find_booking(command.booking_id)
            .await?
            .ok_or(BookingError::NotFound(command.booking_id))?;
        command.check(&booking)?;
        self.repo.update_payment_flag(booking.id, true).await?;
        info!("booking {} paid by {}", booking.id, command.owner);
        let paid = Booking { paid: true, ..booking };
        Ok(BookingView::at(&paid, command.now))
    }

    /// Remove an unpaid booking. Returns its last state as seen at `now`.
    pub async fn cancel(&self, caller: &Caller, id: Ulid, now: Ms) -> Result<BookingView, BookingError> {
        let started = Instant::now();
        let result = async {
            let command = CancelCommand {
                booking_id: id,
                owner: caller.require_identity()?.to_string(),
            };
            self.apply_cancel(command, now).await
        }
        .await;
        observability::record("cancel", &result, started);
        result
    }

    async fn apply_cancel(&self, command: CancelCommand, now: Ms) -> Result<BookingView, BookingError> {
        let _gate = self.write_gate.lock().await;
        let booking = self
            .repo
            .find_booking(command.booking_id)
            .await?
            .ok_or(BookingError::NotFound(command.booking_id))?;
        command.check(&booking)?;
        self.repo.delete_booking(booking.id).await?;
        info!("booking {} cancelled by {}", booking.id, command.owner);
        Ok(BookingView::at(&booking, now))
    }

    /// Delete unpaid bookings whose hold window closed more than
    /// `retention` ms before `now`. Paid bookings are never touched.
    pub async fn purge_stale(&self, now: Ms, retention: Ms) -> Result<usize, BookingError> {
        let cutoff = now.saturating_sub(HOLD_WINDOW_MS).saturating_sub(retention);
        let _gate = self.write_gate.lock().await;
        let stale: Vec<Ulid> = self
            .repo
            .list_bookings(None)
            .await?
            .into_iter()
            .filter(|b| !b.paid && b.created_at <= cutoff)
            .map(|b| b.id)
            .collect();
        for id in &stale {
            self.repo.delete_booking(*id).await?;
            debug!("purged stale booking {id}");
        }
        if !stale.is_empty() {
            metrics::counter!(observability::BOOKINGS_PURGED_TOTAL).increment(stale.len() as u64);
        }
        Ok(stale.len())
    }
}
