use crate::error::BookingError;
use crate::limits::*;
use crate::model::*;

pub(crate) fn validate_span(span: &Span) -> Result<(), BookingError> {
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(BookingError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_STAY_MS {
        return Err(BookingError::LimitExceeded("stay too long"));
    }
    Ok(())
}

/// A booking blocks the calendar while it is paid, or while its hold window
/// is still open. The window is inclusive at `created_at + HOLD_WINDOW_MS`.
pub fn is_active(booking: &Booking, now: Ms) -> bool {
    booking.paid || booking.created_at >= now - HOLD_WINDOW_MS
}

/// First active booking overlapping `candidate`, if any.
pub fn find_conflict<'a>(
    candidate: &Span,
    bookings: impl IntoIterator<Item = &'a Booking>,
    now: Ms,
) -> Option<&'a Booking> {
    bookings
        .into_iter()
        .find(|b| is_active(b, now) && b.span.overlaps(candidate))
}

/// Spans of every active booking, sorted by start.
pub fn active_spans<'a>(bookings: impl IntoIterator<Item = &'a Booking>, now: Ms) -> Vec<Span> {
    let mut spans: Vec<Span> = bookings
        .into_iter()
        .filter(|b| is_active(b, now))
        .map(|b| b.span)
        .collect();
    spans.sort_by_key(|s| s.start);
    spans
}
