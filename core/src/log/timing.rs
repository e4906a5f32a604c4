//! Derived event times.
//!
//! Every event's time is the log start plus the difference between its raw id
//! and the `BEGIN_LOG` raw id, in milliseconds. Kinds with an embedded
//! timestamp keep it.

use chrono::TimeDelta;

use super::LogError;
use crate::combat_log::{Event, SequenceId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

pub fn assign_times(
    events: &mut [Event],
    begin_log: SequenceId,
    diagnostics: &mut Diagnostics,
) -> Result<(), LogError> {
    let begin = &events[begin_log];
    let (Some(base_time), Some(base_raw)) = (begin.time(), begin.raw_event_id) else {
        return Err(LogError::BeginLogWithoutTime(begin_log));
    };

    for event in events.iter_mut() {
        if event.carries_own_time() {
            continue;
        }
        let seq = event.sequence_id;
        let Some(raw) = event.raw_event_id else {
            diagnostics.debug(
                DiagnosticKind::TimeAssignment,
                Some(seq),
                "event has no raw id, time left unset",
            );
            continue;
        };
        let time = raw
            .checked_sub(base_raw)
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|offset| base_time.checked_add_signed(offset));
        let Some(time) = time else {
            diagnostics.error(
                DiagnosticKind::TimeAssignment,
                Some(seq),
                format!("raw id {raw} is out of the representable time range"),
            );
            continue;
        };
        if let Err(e) = event.set_time(time) {
            diagnostics.error(DiagnosticKind::TimeAssignment, Some(seq), e.to_string());
        }
    }
    Ok(())
}
