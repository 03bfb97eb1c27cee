use std::collections::BTreeMap;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

/// In-memory state of the venue: bookings, the base rate, and overrides.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    /// All bookings, sorted by `span.start`.
    bookings: Vec<Booking>,
    /// At most one base rate can exist.
    rate: Option<Rate>,
    overrides: BTreeMap<NaiveDate, DailyRate>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut calendar = Self::new();
        for event in events {
            calendar.apply(event);
        }
        calendar
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn rate(&self) -> Option<&Rate> {
        self.rate.as_ref()
    }

    pub fn overrides(&self) -> impl Iterator<Item = &DailyRate> {
        self.overrides.values()
    }

    pub fn override_for(&self, date: NaiveDate) -> Option<&DailyRate> {
        self.overrides.get(&date)
    }

    pub fn overrides_in(&self, range: DateRange) -> impl Iterator<Item = &DailyRate> {
        // An inverted range would make BTreeMap::range panic.
        let to = range.to.max(range.from);
        self.overrides.range(range.from..to).map(|(_, r)| r)
    }

    pub fn get(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn contains(&self, id: Ulid) -> bool {
        self.get(id).is_some()
    }

    /// Insert maintaining sort order by span.start.
    fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .partition_point(|b| b.span.start <= booking.span.start);
        self.bookings.insert(pos, booking);
    }

    fn remove_booking(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    /// Bookings whose span overlaps `query`.
    /// Everything at or past the first start >= `query.end` is skipped.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::BookingCreated {
                id,
                owner,
                span,
                visitors,
                day_count,
                paid,
                total_price,
                created_at,
            } => self.insert_booking(Booking {
                id: *id,
                owner: owner.clone(),
                span: *span,
                visitors: *visitors,
                day_count: *day_count,
                paid: *paid,
                total_price: *total_price,
                created_at: *created_at,
            }),
            Event::PaymentFlagSet { id, paid } => {
                if let Some(b) = self.bookings.iter_mut().find(|b| b.id == *id) {
                    b.paid = *paid;
                }
            }
            Event::BookingDeleted { id } => {
                self.remove_booking(*id);
            }
            Event::RateSet {
                nightly_rate,
                updated_at,
            } => {
                self.rate = Some(Rate {
                    nightly_rate: *nightly_rate,
                    updated_at: *updated_at,
                });
            }
            Event::OverrideSet {
                date,
                price,
                created_by,
                created_at,
                updated_at,
            } => {
                self.overrides.insert(
                    *date,
                    DailyRate {
                        date: *date,
                        price: *price,
                        created_by: created_by.clone(),
                        created_at: *created_at,
                        updated_at: *updated_at,
                    },
                );
            }
            Event::OverrideDeleted { date } => {
                self.overrides.remove(date);
            }
        }
    }

    /// Minimal event sequence that rebuilds this calendar.
    pub fn to_events(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.bookings.len() + self.overrides.len() + 1);
        if let Some(rate) = &self.rate {
            events.push(Event::RateSet {
                nightly_rate: rate.nightly_rate,
                updated_at: rate.updated_at,
            });
        }
        for o in self.overrides.values() {
            events.push(Event::OverrideSet {
                date: o.date,
                price: o.price,
                created_by: o.created_by.clone(),
                created_at: o.created_at,
                updated_at: o.updated_at,
            });
        }
        for b in &self.bookings {
            events.push(Event::BookingCreated {
                id: b.id,
                owner: b.owner.clone(),
                span: b.span,
                visitors: b.visitors,
                day_count: b.day_count,
                paid: b.paid,
                total_price: b.total_price,
                created_at: b.created_at,
            });
        }
        events
    }
}
