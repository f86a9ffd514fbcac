//! Duration of a single session.

use chrono::{Duration, NaiveTime};

use crate::event::CheckEvent;

/// The measured length of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDuration {
    pub duration: Duration,
    /// The closing event was automatic, so the end is an estimate.
    pub estimated: bool,
}

/// Computes the duration of the session closed by `closing`.
///
/// `opening` is the person's event immediately before `closing`; without
/// one the duration is zero. Real checkouts measure the exact delta. Auto
/// checkouts measure up to `average_checkout` on the closing event's date.
/// An estimate that would end before the session started counts as zero
/// instead of a negative duration: a session opened at 20:00 on a day whose
/// average checkout is 17:00 adds nothing to the day.
pub fn session_duration(
    closing: &CheckEvent,
    opening: Option<&CheckEvent>,
    average_checkout: NaiveTime,
) -> SessionDuration {
    let estimated = closing.auto;
    let Some(opening) = opening else {
        return SessionDuration {
            duration: Duration::zero(),
            estimated,
        };
    };

    let end = if estimated {
        closing.date().and_time(average_checkout)
    } else {
        closing.time
    };

    SessionDuration {
        // never negative, even when the estimate precedes the opening
        duration: (end - opening.time).max(Duration::zero()),
        estimated,
    }
}
