//! Begin/end cast matching.
//!
//! Casts are grouped by `cast_effect_id`, then by ability id. Each bucket is
//! matched by the first rule that applies:
//!
//! 1. one begin, one end: direct match
//! 2. many begins, one end: the end is shared by every begin
//! 3. one begin, many ends: the latest completed end wins
//! 4. two begins, two ends: the shorter cast completed, the longer did not
//! 5. anything else is left unmatched
//!
//! End casts whose ability id has no begin in their group are orphans. They
//! attach to the group's only begin cast when there is exactly one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::push_unique;
use crate::combat_log::{CastStatus, Event, EventKind, SequenceId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMatchSummary {
    pub begin_casts: usize,
    pub end_casts: usize,
    pub unmatched_begins: usize,
    pub unmatched_ends: usize,
    pub ambiguous_buckets: usize,
    pub unresolvable_buckets: usize,
    pub orphans_attached: usize,
    pub unresolved_orphans: usize,
}

#[derive(Debug, Default)]
struct Bucket {
    begins: Vec<SequenceId>,
    ends: Vec<SequenceId>,
}

type Groups = BTreeMap<i64, BTreeMap<i64, Bucket>>;

pub fn match_casts(events: &mut [Event], diagnostics: &mut Diagnostics) -> CastMatchSummary {
    let mut summary = CastMatchSummary::default();
    let groups = group_casts(events, &mut summary);

    for (&cast_effect_id, buckets) in &groups {
        let mut orphans = Vec::new();
        for (&ability_id, bucket) in buckets {
            if bucket.begins.is_empty() {
                orphans.extend_from_slice(&bucket.ends);
                continue;
            }
            if bucket.ends.is_empty() {
                continue;
            }
            match_bucket(events, cast_effect_id, ability_id, bucket, &mut summary, diagnostics);
        }
        if !orphans.is_empty() {
            attach_orphans(events, cast_effect_id, buckets, &orphans, &mut summary, diagnostics);
        }
    }

    for event in events.iter() {
        match &event.kind {
            EventKind::BeginCast(begin) if begin.end_cast.is_none() => {
                summary.unmatched_begins += 1
            }
            EventKind::EndCast(end) if end.begin_casts.is_empty() => summary.unmatched_ends += 1,
            _ => {}
        }
    }
    if summary.unmatched_begins > 0 || summary.unmatched_ends > 0 {
        diagnostics.info(
            DiagnosticKind::UnmatchedCast,
            None,
            format!(
                "{} begin casts and {} end casts left unmatched",
                summary.unmatched_begins, summary.unmatched_ends
            ),
        );
    }
    summary
}

fn group_casts(events: &[Event], summary: &mut CastMatchSummary) -> Groups {
    let mut groups = Groups::new();
    for event in events {
        match &event.kind {
            EventKind::BeginCast(begin) => {
                summary.begin_casts += 1;
                groups
                    .entry(begin.cast_effect_id)
                    .or_default()
                    .entry(begin.targeting.ability_id)
                    .or_default()
                    .begins
                    .push(event.sequence_id);
            }
            EventKind::EndCast(end) => {
                summary.end_casts += 1;
                groups
                    .entry(end.cast_effect_id)
                    .or_default()
                    .entry(end.ability_id)
                    .or_default()
                    .ends
                    .push(event.sequence_id);
            }
            _ => {}
        }
    }
    groups
}

fn match_bucket(
    events: &mut [Event],
    cast_effect_id: i64,
    ability_id: i64,
    bucket: &Bucket,
    summary: &mut CastMatchSummary,
    diagnostics: &mut Diagnostics,
) {
    let (begins, ends) = (&bucket.begins, &bucket.ends);
    match (begins.len(), ends.len()) {
        (1, 1) => link(events, begins[0], ends[0]),
        (_, 1) => {
            for &begin in begins {
                link(events, begin, ends[0]);
            }
        }
        (1, _) => {
            summary.ambiguous_buckets += 1;
            let completed: Vec<_> = ends
                .iter()
                .copied()
                .filter(|&end| end_status(events, end) == Some(CastStatus::Completed))
                .collect();
            let chosen = match completed.iter().max() {
                Some(&end) => {
                    diagnostics.warn(
                        DiagnosticKind::CastAmbiguity,
                        Some(begins[0]),
                        format!(
                            "cast {cast_effect_id} ability {ability_id}: {} end casts for one begin, \
                             {} completed, linked {end}",
                            ends.len(),
                            completed.len()
                        ),
                    );
                    end
                }
                None => {
                    let latest = ends.iter().copied().max().unwrap_or(ends[0]);
                    diagnostics.error(
                        DiagnosticKind::CastAmbiguity,
                        Some(begins[0]),
                        format!(
                            "cast {cast_effect_id} ability {ability_id}: none of {} end casts completed, \
                             linked latest {latest}",
                            ends.len()
                        ),
                    );
                    latest
                }
            };
            link(events, begins[0], chosen);
        }
        (2, 2) => {
            match_two_by_two(events, cast_effect_id, ability_id, bucket, summary, diagnostics)
        }
        (begin_count, end_count) => {
            summary.unresolvable_buckets += 1;
            let statuses: Vec<String> = ends
                .iter()
                .filter_map(|&end| end_status(events, end))
                .map(|s| s.to_string())
                .collect();
            let reason = if begin_count == end_count {
                format!("end states {statuses:?} cannot be assigned")
            } else {
                "counts differ".to_string()
            };
            diagnostics.error(
                DiagnosticKind::CastAmbiguity,
                begins.first().copied(),
                format!(
                    "cast {cast_effect_id} ability {ability_id}: {begin_count} begins and \
                     {end_count} ends left unmatched, {reason}"
                ),
            );
        }
    }
}

/// The shorter cast pairs with the completed end, the longer with the other.
fn match_two_by_two(
    events: &mut [Event],
    cast_effect_id: i64,
    ability_id: i64,
    bucket: &Bucket,
    summary: &mut CastMatchSummary,
    diagnostics: &mut Diagnostics,
) {
    let mut begins = bucket.begins.clone();
    begins.sort_by_key(|&seq| {
        let duration = events[seq].as_begin_cast().map(|b| b.duration).unwrap_or_default();
        (duration, seq)
    });
    let completed = bucket
        .ends
        .iter()
        .copied()
        .find(|&end| end_status(events, end) == Some(CastStatus::Completed));
    let other = bucket
        .ends
        .iter()
        .copied()
        .find(|&end| end_status(events, end) != Some(CastStatus::Completed));

    match (completed, other) {
        (Some(completed), Some(other)) => {
            link(events, begins[0], completed);
            link(events, begins[1], other);
        }
        _ => {
            summary.unresolvable_buckets += 1;
            diagnostics.error(
                DiagnosticKind::CastAmbiguity,
                Some(begins[0]),
                format!(
                    "cast {cast_effect_id} ability {ability_id}: two begins and two ends without \
                     one completed and one unfinished end"
                ),
            );
        }
    }
}

fn attach_orphans(
    events: &mut [Event],
    cast_effect_id: i64,
    buckets: &BTreeMap<i64, Bucket>,
    orphans: &[SequenceId],
    summary: &mut CastMatchSummary,
    diagnostics: &mut Diagnostics,
) {
    let candidates: Vec<(i64, &Bucket)> = buckets
        .iter()
        .filter(|(_, bucket)| !bucket.begins.is_empty())
        .map(|(&ability_id, bucket)| (ability_id, bucket))
        .collect();

    let reason = match candidates.as_slice() {
        // Groups without any begin only hold unmatched ends
        [] => return,
        [(_, bucket)] if bucket.begins.len() == 1 => {
            let begin = bucket.begins[0];
            for &end in orphans {
                if let Some(begin_cast) = events[begin].as_begin_cast_mut() {
                    push_unique(&mut begin_cast.orphaned_end_casts, end);
                }
                if let Some(end_cast) = events[end].as_end_cast_mut() {
                    push_unique(&mut end_cast.begin_casts, begin);
                }
            }
            summary.orphans_attached += orphans.len();
            return;
        }
        [(ability_id, bucket)] => format!(
            "{} begin casts with ability {ability_id} are viable",
            bucket.begins.len()
        ),
        _ => format!("{} begin cast ability ids are viable", candidates.len()),
    };

    summary.unresolved_orphans += orphans.len();
    diagnostics.debug(
        DiagnosticKind::OrphanEndCast,
        orphans.first().copied(),
        format!(
            "cast {cast_effect_id}: {} orphaned end casts left unmatched, {reason}",
            orphans.len()
        ),
    );
}

fn end_status(events: &[Event], end: SequenceId) -> Option<CastStatus> {
    events[end].as_end_cast().map(|e| e.status)
}

fn link(events: &mut [Event], begin: SequenceId, end: SequenceId) {
    if let Some(begin_cast) = events[begin].as_begin_cast_mut() {
        begin_cast.end_cast = Some(end);
    }
    if let Some(end_cast) = events[end].as_end_cast_mut() {
        push_unique(&mut end_cast.begin_casts, begin);
    }
}
