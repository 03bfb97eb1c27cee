use std::path::PathBuf;
use std::str::FromStr;

use futures::future::join_all;

use super::*;
use crate::error::ErrorKind;
use crate::lifecycle::BookingState;
use crate::store::Store;

/// 2025-06-01T00:00:00Z
const JUNE_1: Ms = 1_748_736_000_000;
const D: Ms = DAY_MS;
/// Request clock: a week before the stays start.
const NOW: Ms = JUNE_1 - 7 * D;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("staybook_test_service");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn service(name: &str) -> BookingService<Store> {
    let store = Arc::new(Store::open(test_wal_path(name)).unwrap());
    BookingService::new(store, dec("500000"))
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
}

fn nights(first: i64, count: i64) -> BookingRequest {
    BookingRequest {
        start: JUNE_1 + first * D,
        end: JUNE_1 + (first + count) * D,
        visitors: 2,
    }
}

fn guest() -> Caller {
    Caller::user("guest@example.com")
}

fn other_guest() -> Caller {
    Caller::user("other@example.com")
}

fn host() -> Caller {
    Caller::admin("host@example.com")
}

fn kind<T: std::fmt::Debug>(r: Result<T, BookingError>) -> ErrorKind {
    r.unwrap_err().kind()
}

// ── create ───────────────────────────────────────────────

#[tokio::test]
async fn create_prices_with_default_rate() {
    let svc = service("create_default.wal");
    let b = svc.create(&guest(), nights(0, 2), NOW).await.unwrap();
    assert_eq!(b.owner, "guest@example.com");
    assert_eq!(b.day_count, 2);
    assert_eq!(b.total_price, dec("1000000"));
    assert!(!b.paid);
    assert_eq!(b.state, BookingState::Tentative);
    assert_eq!(b.reserved_until, NOW + HOLD_WINDOW_MS);
}

#[tokio::test]
async fn create_charges_override_for_middle_night() {
    let svc = service("create_override.wal");
    svc.set_daily_override(&host(), june(2), dec("750000"), NOW)
        .await
        .unwrap();
    let b = svc.create(&guest(), nights(0, 3), NOW).await.unwrap();
    assert_eq!(b.day_count, 3);
    assert_eq!(b.total_price, dec("1750000"));
}

#[tokio::test]
async fn create_snapshots_price_at_creation() {
    let svc = service("create_snapshot.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.set_rate(&host(), dec("900000"), NOW + 1).await.unwrap();
    let mine = svc.list_mine(&guest(), NOW + 2).await.unwrap();
    assert_eq!(mine[0].id, b.id);
    assert_eq!(mine[0].total_price, dec("500000"));
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let svc = service("create_bad_input.wal");
    let empty = BookingRequest {
        start: JUNE_1,
        end: JUNE_1,
        visitors: 1,
    };
    assert_eq!(kind(svc.create(&guest(), empty, NOW).await), ErrorKind::InvalidRange);

    let backwards = BookingRequest {
        start: JUNE_1 + D,
        end: JUNE_1,
        visitors: 1,
    };
    assert_eq!(kind(svc.create(&guest(), backwards, NOW).await), ErrorKind::InvalidRange);

    let nobody = BookingRequest { visitors: 0, ..nights(0, 1) };
    assert_eq!(kind(svc.create(&guest(), nobody, NOW).await), ErrorKind::InvalidVisitors);

    let crowd = BookingRequest {
        visitors: MAX_VISITORS + 1,
        ..nights(0, 1)
    };
    assert_eq!(kind(svc.create(&guest(), crowd, NOW).await), ErrorKind::InvalidVisitors);

    let forever = nights(0, MAX_STAY_DAYS + 1);
    assert_eq!(kind(svc.create(&guest(), forever, NOW).await), ErrorKind::LimitExceeded);

    let long_name = Caller::user("x".repeat(MAX_OWNER_LEN + 1));
    assert_eq!(
        kind(svc.create(&long_name, nights(0, 1), NOW).await),
        ErrorKind::LimitExceeded
    );

    assert_eq!(
        kind(svc.create(&Caller::anonymous(), nights(0, 1), NOW).await),
        ErrorKind::Unauthorized
    );
    assert!(svc.list_all(&host(), NOW).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_sub_day_range_costs_nothing() {
    let svc = service("create_sub_day.wal");
    let request = BookingRequest {
        start: JUNE_1 + 14 * 3_600_000,
        end: JUNE_1 + 20 * 3_600_000,
        visitors: 1,
    };
    let b = svc.create(&guest(), request, NOW).await.unwrap();
    assert_eq!(b.day_count, 0);
    assert_eq!(b.total_price, Decimal::ZERO);
}

#[tokio::test]
async fn overlapping_create_rejected_touching_allowed() {
    let svc = service("overlap.wal");
    let first = svc.create(&guest(), nights(0, 3), NOW).await.unwrap();

    let err = svc.create(&other_guest(), nights(2, 2), NOW).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable(id) if id == first.id));

    // Checkout day of one stay is check-in day of the next.
    svc.create(&other_guest(), nights(3, 2), NOW).await.unwrap();
    svc.create(&other_guest(), nights(-2, 2), NOW).await.unwrap();
}

#[tokio::test]
async fn expired_tentative_frees_the_slot() {
    let svc = service("expired_frees.wal");
    let t = NOW;
    let stale = svc.create(&guest(), nights(0, 2), t).await.unwrap();

    // Still held at the window edge.
    assert_eq!(
        kind(svc.create(&other_guest(), nights(0, 2), t + HOLD_WINDOW_MS).await),
        ErrorKind::SlotUnavailable
    );

    let later = t + 11 * MINUTE_MS;
    let fresh = svc.create(&other_guest(), nights(0, 2), later).await.unwrap();
    assert_ne!(fresh.id, stale.id);

    let states: Vec<(Ulid, BookingState)> = svc
        .list_all(&host(), later)
        .await
        .unwrap()
        .into_iter()
        .map(|b| (b.id, b.state))
        .collect();
    assert_eq!(
        states,
        vec![
            (fresh.id, BookingState::Tentative),
            (stale.id, BookingState::Expired)
        ]
    );
    assert_eq!(
        kind(svc.pay(&guest(), stale.id, later).await),
        ErrorKind::PaymentWindowExpired
    );
}

#[tokio::test]
async fn paid_booking_blocks_forever() {
    let svc = service("paid_blocks.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.pay(&guest(), b.id, NOW + MINUTE_MS).await.unwrap();
    assert_eq!(
        kind(svc.create(&other_guest(), nights(0, 1), NOW + 30 * D).await),
        ErrorKind::SlotUnavailable
    );
}

#[tokio::test]
async fn concurrent_identical_creates_one_wins() {
    let svc = Arc::new(service("concurrent_create.wal"));
    let attempts = (0..16).map(|i| {
        let svc = svc.clone();
        async move {
            let caller = Caller::user(format!("guest{i}@example.com"));
            svc.create(&caller, nights(10, 3), NOW).await
        }
    });
    let results = join_all(attempts).await;

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for r in results.into_iter().filter(|r| r.is_err()) {
        assert_eq!(kind(r), ErrorKind::SlotUnavailable);
    }
    assert_eq!(svc.list_public_ranges(NOW).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_creates_from_tasks_one_wins() {
    let svc = Arc::new(service("concurrent_tasks.wal"));
    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            let caller = Caller::user(format!("guest{i}@example.com"));
            // Staggered but all overlapping night 21.
            svc.create(&caller, nights(20 + i % 2, 2), NOW).await
        }));
    }
    let mut wins = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}

// ── pay ──────────────────────────────────────────────────

#[tokio::test]
async fn pay_within_window() {
    let svc = service("pay_ok.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    let paid = svc.pay(&guest(), b.id, NOW + 5 * MINUTE_MS).await.unwrap();
    assert!(paid.paid);
    assert_eq!(paid.state, BookingState::Paid);
    assert_eq!(paid.total_price, b.total_price);

    assert_eq!(
        kind(svc.pay(&guest(), b.id, NOW + 6 * MINUTE_MS).await),
        ErrorKind::AlreadyPaid
    );
}

#[tokio::test]
async fn pay_at_window_edge_succeeds() {
    let svc = service("pay_edge.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.pay(&guest(), b.id, NOW + HOLD_WINDOW_MS).await.unwrap();
}

#[tokio::test]
async fn pay_after_window_fails_and_stays_unpaid() {
    let svc = service("pay_late.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    let late = NOW + HOLD_WINDOW_MS + 1;
    assert_eq!(
        kind(svc.pay(&guest(), b.id, late).await),
        ErrorKind::PaymentWindowExpired
    );
    let mine = svc.list_mine(&guest(), late).await.unwrap();
    assert!(!mine[0].paid);
    assert_eq!(mine[0].state, BookingState::Expired);
}

#[tokio::test]
async fn pay_someone_elses_booking_is_not_found() {
    let svc = service("pay_foreign.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    assert_eq!(kind(svc.pay(&other_guest(), b.id, NOW).await), ErrorKind::NotFound);
    // Admins get no bypass either.
    assert_eq!(kind(svc.pay(&host(), b.id, NOW).await), ErrorKind::NotFound);
    assert_eq!(kind(svc.pay(&guest(), Ulid::new(), NOW).await), ErrorKind::NotFound);
    assert_eq!(
        kind(svc.pay(&Caller::anonymous(), b.id, NOW).await),
        ErrorKind::Unauthorized
    );
}

// ── cancel ───────────────────────────────────────────────

#[tokio::test]
async fn cancel_unpaid_frees_slot() {
    let svc = service("cancel_ok.wal");
    let b = svc.create(&guest(), nights(0, 2), NOW).await.unwrap();
    svc.cancel(&guest(), b.id, NOW).await.unwrap();
    assert!(svc.list_mine(&guest(), NOW).await.unwrap().is_empty());
    svc.create(&other_guest(), nights(0, 2), NOW).await.unwrap();
    assert_eq!(kind(svc.cancel(&guest(), b.id, NOW).await), ErrorKind::NotFound);
}

#[tokio::test]
async fn cancel_expired_unpaid_is_allowed() {
    let svc = service("cancel_expired.wal");
    let b = svc.create(&guest(), nights(0, 2), NOW - D).await.unwrap();
    svc.cancel(&guest(), b.id, NOW).await.unwrap();
}

#[tokio::test]
async fn cancel_paid_is_refused() {
    let svc = service("cancel_paid.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.pay(&guest(), b.id, NOW).await.unwrap();
    assert_eq!(kind(svc.cancel(&guest(), b.id, NOW).await), ErrorKind::CannotCancelPaid);
    assert_eq!(svc.list_mine(&guest(), NOW).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_someone_elses_booking_is_not_found() {
    let svc = service("cancel_foreign.wal");
    let b = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    assert_eq!(kind(svc.cancel(&other_guest(), b.id, NOW).await), ErrorKind::NotFound);
    assert_eq!(svc.list_mine(&guest(), NOW).await.unwrap().len(), 1);
}

// ── listings ─────────────────────────────────────────────

#[tokio::test]
async fn public_ranges_hide_owner_and_expired() {
    let svc = service("public_ranges.wal");
    svc.create(&guest(), nights(5, 1), NOW - D).await.unwrap(); // long expired
    let paid = svc.create(&guest(), nights(3, 1), NOW - D).await.unwrap();
    svc.pay(&guest(), paid.id, NOW - D).await.unwrap();
    svc.create(&other_guest(), nights(0, 2), NOW).await.unwrap();

    let ranges = svc.list_public_ranges(NOW).await.unwrap();
    assert_eq!(
        ranges,
        vec![
            PublicBooking {
                start: JUNE_1,
                end: JUNE_1 + 2 * D
            },
            PublicBooking {
                start: JUNE_1 + 3 * D,
                end: JUNE_1 + 4 * D
            },
        ]
    );
    let json = serde_json::to_string(&ranges).unwrap();
    assert!(!json.contains("example.com"));
}

#[tokio::test]
async fn list_mine_only_own_newest_first() {
    let svc = service("list_mine.wal");
    let a = svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.create(&other_guest(), nights(1, 1), NOW + 1).await.unwrap();
    let c = svc.create(&guest(), nights(2, 1), NOW + 2).await.unwrap();

    let ids: Vec<Ulid> = svc
        .list_mine(&guest(), NOW + 3)
        .await
        .unwrap()
        .iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(ids, vec![c.id, a.id]);
    assert_eq!(
        kind(svc.list_mine(&Caller::anonymous(), NOW).await),
        ErrorKind::Unauthorized
    );
}

#[tokio::test]
async fn list_all_is_admin_only() {
    let svc = service("list_all.wal");
    svc.create(&guest(), nights(0, 1), NOW).await.unwrap();
    svc.create(&other_guest(), nights(1, 1), NOW + 1).await.unwrap();
    assert_eq!(svc.list_all(&host(), NOW).await.unwrap().len(), 2);
    assert_eq!(kind(svc.list_all(&guest(), NOW).await), ErrorKind::Forbidden);
    assert_eq!(
        kind(svc.list_all(&Caller::anonymous(), NOW).await),
        ErrorKind::Unauthorized
    );
}

// ── rates ────────────────────────────────────────────────

#[tokio::test]
async fn rate_defaults_until_set() {
    let svc = service("rate_default.wal");
    let rate = svc.get_rate().await.unwrap();
    assert_eq!(rate.nightly_rate, dec("500000"));
    assert_eq!(rate.updated_at, None);

    let set = svc.set_rate(&host(), dec("650000.5"), NOW).await.unwrap();
    assert_eq!(set.nightly_rate.to_string(), "650000.50");
    assert_eq!(svc.get_rate().await.unwrap(), set);
    assert_eq!(set.updated_at, Some(NOW));
}

#[tokio::test]
async fn set_rate_role_checks_come_first() {
    let svc = service("rate_roles.wal");
    // Invalid price, but the caller's role is what gets reported.
    assert_eq!(
        kind(svc.set_rate(&guest(), dec("-1"), NOW).await),
        ErrorKind::Forbidden
    );
    assert_eq!(
        kind(svc.set_rate(&Caller::anonymous(), dec("-1"), NOW).await),
        ErrorKind::Unauthorized
    );
    for bad in ["0", "-1", "10.005"] {
        assert_eq!(
            kind(svc.set_rate(&host(), dec(bad), NOW).await),
            ErrorKind::InvalidRate
        );
    }
    assert_eq!(svc.get_rate().await.unwrap().updated_at, None);
}

#[tokio::test]
async fn daily_override_upsert_keeps_author() {
    let svc = service("override_upsert.wal");
    let first = Caller::admin("first@example.com");
    let second = Caller::admin("second@example.com");
    svc.set_daily_override(&first, june(2), dec("700000"), NOW)
        .await
        .unwrap();
    let updated = svc
        .set_daily_override(&second, june(2), dec("800000"), NOW + 1)
        .await
        .unwrap();
    assert_eq!(updated.price, dec("800000"));
    assert_eq!(updated.created_by.as_deref(), Some("first@example.com"));

    let stored = svc.repository().find_override(june(2)).await.unwrap().unwrap();
    assert_eq!(stored.created_at, NOW);
    assert_eq!(stored.updated_at, NOW + 1);
    assert_eq!(svc.list_daily_overrides(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn daily_override_admin_and_price_checks() {
    let svc = service("override_checks.wal");
    assert_eq!(
        kind(svc.set_daily_override(&guest(), june(2), dec("1"), NOW).await),
        ErrorKind::Forbidden
    );
    assert_eq!(
        kind(svc.set_daily_override(&host(), june(2), dec("0"), NOW).await),
        ErrorKind::InvalidRate
    );
    assert_eq!(
        kind(svc.delete_daily_override(&host(), june(2)).await),
        ErrorKind::NotFound
    );
    assert_eq!(
        kind(svc.delete_daily_override(&guest(), june(2)).await),
        ErrorKind::Forbidden
    );
}

#[tokio::test]
async fn deleted_override_reverts_to_base_rate() {
    let svc = service("override_delete.wal");
    svc.set_daily_override(&host(), june(1), dec("900000"), NOW)
        .await
        .unwrap();
    assert_eq!(
        svc.quote(JUNE_1, JUNE_1 + D).await.unwrap().total_price,
        dec("900000")
    );
    svc.delete_daily_override(&host(), june(1)).await.unwrap();
    assert_eq!(
        svc.quote(JUNE_1, JUNE_1 + D).await.unwrap().total_price,
        dec("500000")
    );
}

#[tokio::test]
async fn list_daily_overrides_by_range() {
    let svc = service("override_list.wal");
    for day in [1, 10, 20] {
        svc.set_daily_override(&host(), june(day), dec("1000"), NOW)
            .await
            .unwrap();
    }
    let dates: Vec<NaiveDate> = svc
        .list_daily_overrides(Some(DateRange::new(june(5), june(20))))
        .await
        .unwrap()
        .iter()
        .map(|o| o.date)
        .collect();
    assert_eq!(dates, vec![june(10)]);

    let huge = DateRange::new(
        june(1),
        june(1) + chrono::Duration::days(MAX_OVERRIDE_QUERY_DAYS + 1),
    );
    assert_eq!(
        kind(svc.list_daily_overrides(Some(huge)).await),
        ErrorKind::LimitExceeded
    );
}

// ── quote ────────────────────────────────────────────────

#[tokio::test]
async fn quote_breaks_down_each_night() {
    let svc = service("quote.wal");
    svc.set_daily_override(&host(), june(2), dec("750000"), NOW)
        .await
        .unwrap();
    // Override on the checkout date is never charged.
    svc.set_daily_override(&host(), june(4), dec("1"), NOW)
        .await
        .unwrap();

    let q = svc.quote(JUNE_1, JUNE_1 + 3 * D).await.unwrap();
    assert_eq!(q.day_count, 3);
    assert_eq!(q.total_price, dec("1750000"));
    let breakdown: Vec<(NaiveDate, Decimal)> =
        q.nights.iter().map(|n| (n.date, n.price)).collect();
    assert_eq!(
        breakdown,
        vec![
            (june(1), dec("500000")),
            (june(2), dec("750000")),
            (june(3), dec("500000")),
        ]
    );
    assert_eq!(
        kind(svc.quote(JUNE_1, JUNE_1).await),
        ErrorKind::InvalidRange
    );
    // Quoting reserves nothing.
    assert!(svc.list_public_ranges(NOW).await.unwrap().is_empty());
}

// ── purge ────────────────────────────────────────────────

#[tokio::test]
async fn purge_stale_respects_retention() {
    let svc = service("purge.wal");
    let old = svc.create(&guest(), nights(0, 1), NOW - 10 * D).await.unwrap();
    let recent = svc.create(&guest(), nights(1, 1), NOW - D).await.unwrap();
    let paid = svc.create(&guest(), nights(2, 1), NOW - 10 * D).await.unwrap();
    svc.pay(&guest(), paid.id, NOW - 10 * D).await.unwrap();

    let purged = svc.purge_stale(NOW, 7 * D).await.unwrap();
    assert_eq!(purged, 1);
    let left: Vec<Ulid> = svc
        .list_mine(&guest(), NOW)
        .await
        .unwrap()
        .iter()
        .map(|b| b.id)
        .collect();
    assert!(!left.contains(&old.id));
    assert!(left.contains(&recent.id));
    assert!(left.contains(&paid.id));

    assert_eq!(svc.purge_stale(NOW, 7 * D).await.unwrap(), 0);
}

#[tokio::test]
async fn state_survives_restart() {
    let path = test_wal_path("restart.wal");
    let (paid_id, tentative_id) = {
        let store = Arc::new(Store::open(path.clone()).unwrap());
        let svc = BookingService::new(store, dec("500000"));
        svc.set_rate(&host(), dec("400000"), NOW).await.unwrap();
        svc.set_daily_override(&host(), june(9), dec("100"), NOW)
            .await
            .unwrap();
        let a = svc.create(&guest(), nights(0, 2), NOW).await.unwrap();
        svc.pay(&guest(), a.id, NOW).await.unwrap();
        let b = svc.create(&guest(), nights(4, 1), NOW).await.unwrap();
        (a.id, b.id)
    };

    let store = Arc::new(Store::open(path).unwrap());
    let svc = BookingService::new(store, dec("500000"));
    assert_eq!(svc.get_rate().await.unwrap().nightly_rate, dec("400000"));
    assert_eq!(svc.list_daily_overrides(None).await.unwrap().len(), 1);
    let mine = svc.list_mine(&guest(), NOW).await.unwrap();
    assert_eq!(mine.len(), 2);
    let paid = mine.iter().find(|b| b.id == paid_id).unwrap();
    assert!(paid.paid);
    assert_eq!(paid.total_price, dec("800000"));
    assert!(mine.iter().any(|b| b.id == tentative_id && !b.paid));
}

// ── limits and races ─────────────────────────────────────

#[tokio::test]
async fn lapsed_holds_do_not_count_toward_active_cap() {
    let svc = service("active_cap.wal").with_max_active_bookings(3);
    for first in 0..3 {
        svc.create(&guest(), nights(first, 1), NOW).await.unwrap();
    }
    assert_eq!(
        kind(svc.create(&other_guest(), nights(50, 1), NOW).await),
        ErrorKind::LimitExceeded
    );

    // Half an hour later all three holds have lapsed and block nothing.
    let later = NOW + 30 * MINUTE_MS;
    assert!(svc.list_public_ranges(later).await.unwrap().is_empty());
    svc.create(&other_guest(), nights(50, 1), later).await.unwrap();
    assert_eq!(svc.list_all(&host(), later).await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pay_racing_cancel_one_wins() {
    let svc = Arc::new(service("pay_vs_cancel.wal"));
    for round in 0..20 {
        let b = svc.create(&guest(), nights(round * 2, 1), NOW).await.unwrap();

        let pay_svc = svc.clone();
        let pay = tokio::spawn(async move { pay_svc.pay(&guest(), b.id, NOW).await });
        let cancel_svc = svc.clone();
        let cancel = tokio::spawn(async move { cancel_svc.cancel(&guest(), b.id, NOW).await });
        let paid = pay.await.unwrap();
        let cancelled = cancel.await.unwrap();

        let stored = svc.repository().find_booking(b.id).await.unwrap();
        match (paid, cancelled) {
            (Ok(view), Err(e)) => {
                assert!(view.paid);
                assert_eq!(e.kind(), ErrorKind::CannotCancelPaid);
                assert!(stored.unwrap().paid);
            }
            (Err(e), Ok(_)) => {
                assert_eq!(e.kind(), ErrorKind::NotFound);
                assert!(stored.is_none());
            }
            (paid, cancelled) => panic!("round {round}: pay {paid:?}, cancel {cancelled:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_override_creates_keep_one_author() {
    let svc = Arc::new(service("override_race.wal"));
    for day in 1..=20 {
        let date = june(day);
        let handles: Vec<_> = ["first@example.com", "second@example.com"]
            .into_iter()
            .map(|admin| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.set_daily_override(&Caller::admin(admin), date, dec("1000"), NOW)
                        .await
                })
            })
            .collect();
        let mut authors = Vec::new();
        for h in handles {
            authors.push(h.await.unwrap().unwrap().created_by);
        }
        let stored = svc.repository().find_override(date).await.unwrap().unwrap();
        assert_eq!(authors[0], authors[1]);
        assert_eq!(stored.created_by, authors[0]);
    }
}

#[tokio::test]
async fn cancel_returns_removed_booking() {
    let svc = service("cancel_view.wal");
    let b = svc.create(&guest(), nights(0, 2), NOW).await.unwrap();
    let later = NOW + 20 * MINUTE_MS;
    let removed = svc.cancel(&guest(), b.id, later).await.unwrap();
    assert_eq!(removed.id, b.id);
    assert_eq!(removed.total_price, b.total_price);
    assert_eq!(removed.state, BookingState::Expired);
    assert!(svc.repository().find_booking(b.id).await.unwrap().is_none());
}

#[tokio::test]
async fn quote_sees_rate_and_overrides_together() {
    let svc = service("quote_snapshot.wal");
    svc.set_rate(&host(), dec("300"), NOW).await.unwrap();
    svc.set_daily_override(&host(), june(2), dec("100"), NOW)
        .await
        .unwrap();
    let (rate, overrides) = svc
        .repository()
        .rates_for(DateRange::new(june(1), june(3)))
        .await
        .unwrap();
    assert_eq!(rate.unwrap().nightly_rate, dec("300"));
    assert_eq!(overrides.len(), 1);
    assert_eq!(
        svc.quote(JUNE_1, JUNE_1 + 2 * D).await.unwrap().total_price,
        dec("400")
    );
}
