use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::info;
use ulid::Ulid;

use crate::availability::is_active;
use crate::model::*;
use crate::wal::Wal;

use super::{Calendar, Repository, StoreError};

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type Pending = Vec<(Event, oneshot::Sender<io::Result<()>>)>;

/// Background task that owns the WAL and batches appends for group commit:
/// block for the first append, drain whatever else is queued, then one
/// fsync for the whole batch and a reply to every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_control(&mut wal, other);
                continue;
            }
        };
        let mut batch: Pending = vec![(event, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                // Control commands must observe the batch already on disk.
                other => {
                    deferred = Some(other);
                    break;
                }
            }
        }
        commit_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_control(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: Pending) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = std::time::Instant::now();

    let mut result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Always flush, even after an append error, so half-buffered bytes never
    // leak into the next batch.
    let flushed = wal.flush_sync();
    if result.is_ok() {
        result = flushed;
    }

    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(reply);
    }
}

fn handle_control(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.compact(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => {}
    }
}

/// Durable [`Repository`]: the whole calendar in memory behind a `RwLock`,
/// every mutation written to the WAL before it is applied.
pub struct Store {
    calendar: RwLock<Calendar>,
    wal_tx: mpsc::Sender<WalCommand>,
}

impl Store {
    /// Replay the WAL at `wal_path` and start the writer task.
    /// Must be called inside a Tokio runtime.
    pub fn open(wal_path: PathBuf) -> io::Result<Self> {
        let replay = Wal::replay(&wal_path)?;
        let calendar = Calendar::from_events(&replay.events);
        info!(
            "replayed {} events from {} ({} bookings)",
            replay.events.len(),
            wal_path.display(),
            calendar.bookings().len()
        );
        let wal = Wal::open_replayed(&wal_path, &replay)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));
        Ok(Self {
            calendar: RwLock::new(calendar),
            wal_tx,
        })
    }

    async fn wal_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()))
    }

    /// WAL-append then apply, under the calendar write lock. A failed append
    /// leaves memory untouched.
    async fn persist_and_apply(&self, calendar: &mut Calendar, event: &Event) -> Result<(), StoreError> {
        self.wal_append(event).await?;
        calendar.apply(event);
        Ok(())
    }

    async fn commit(&self, event: Event) -> Result<(), StoreError> {
        let mut guard = self.calendar.write().await;
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Copy of the current calendar.
    pub async fn snapshot(&self) -> Calendar {
        self.calendar.read().await.clone()
    }

    /// Rewrite the WAL with only the events needed to rebuild current state.
    pub async fn compact(&self) -> Result<(), StoreError> {
        // Held across the round trip so no write slips between snapshot and swap.
        let guard = self.calendar.read().await;
        let events = guard.to_events();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

fn newest_first(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl Repository for Store {
    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.calendar.read().await.get(id).cloned())
    }

    async fn list_bookings(&self, owner: Option<&str>) -> Result<Vec<Booking>, StoreError> {
        let guard = self.calendar.read().await;
        let mut out: Vec<Booking> = guard
            .bookings()
            .iter()
            .filter(|b| owner.is_none_or(|o| b.owner == o))
            .cloned()
            .collect();
        drop(guard);
        newest_first(&mut out);
        Ok(out)
    }

    async fn count_active(&self, now: Ms) -> Result<usize, StoreError> {
        Ok(self
            .calendar
            .read()
            .await
            .bookings()
            .iter()
            .filter(|b| is_active(b, now))
            .count())
    }

    async fn bookings_overlapping(&self, span: Span) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .calendar
            .read()
            .await
            .overlapping(&span)
            .cloned()
            .collect())
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.commit(Event::BookingCreated {
            id: booking.id,
            owner: booking.owner,
            span: booking.span,
            visitors: booking.visitors,
            day_count: booking.day_count,
            paid: booking.paid,
            total_price: booking.total_price,
            created_at: booking.created_at,
        })
        .await
    }

    async fn update_payment_flag(&self, id: Ulid, paid: bool) -> Result<(), StoreError> {
        let mut guard = self.calendar.write().await;
        if !guard.contains(id) {
            return Err(StoreError::NotFound(id));
        }
        self.persist_and_apply(&mut guard, &Event::PaymentFlagSet { id, paid })
            .await
    }

    async fn delete_booking(&self, id: Ulid) -> Result<(), StoreError> {
        let mut guard = self.calendar.write().await;
        if !guard.contains(id) {
            return Err(StoreError::NotFound(id));
        }
        self.persist_and_apply(&mut guard, &Event::BookingDeleted { id })
            .await
    }

    async fn get_rate(&self) -> Result<Option<Rate>, StoreError> {
        Ok(self.calendar.read().await.rate().cloned())
    }

    async fn upsert_rate(&self, rate: Rate) -> Result<(), StoreError> {
        self.commit(Event::RateSet {
            nightly_rate: rate.nightly_rate,
            updated_at: rate.updated_at,
        })
        .await
    }

    async fn find_override(&self, date: NaiveDate) -> Result<Option<DailyRate>, StoreError> {
        Ok(self.calendar.read().await.override_for(date).cloned())
    }

    async fn upsert_override(&self, rate: DailyRate) -> Result<(), StoreError> {
        self.commit(Event::OverrideSet {
            date: rate.date,
            price: rate.price,
            created_by: rate.created_by,
            created_at: rate.created_at,
            updated_at: rate.updated_at,
        })
        .await
    }

    async fn delete_override(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let mut guard = self.calendar.write().await;
        if guard.override_for(date).is_none() {
            return Ok(false);
        }
        self.persist_and_apply(&mut guard, &Event::OverrideDeleted { date })
            .await?;
        Ok(true)
    }

    async fn list_overrides(&self, range: Option<DateRange>) -> Result<Vec<DailyRate>, StoreError> {
        let guard = self.calendar.read().await;
        Ok(match range {
            Some(range) => guard.overrides_in(range).cloned().collect(),
            None => guard.overrides().cloned().collect(),
        })
    }

    async fn rates_for(&self, range: DateRange) -> Result<(Option<Rate>, Vec<DailyRate>), StoreError> {
        let guard = self.calendar.read().await;
        Ok((guard.rate().cloned(), guard.overrides_in(range).cloned().collect()))
    }
}
