//! Vote ledger transitions.
//!
//! Everything here works on in-memory snapshots and does no I/O.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{
    track::Track,
    vote::{Ledger, VoteRecord, VoterId},
};

pub mod error;
pub mod nominate;
pub mod promotion;

/// What a vote did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    /// first vote on the track, a new record was added
    Created,
    VoteAdded,
    /// the voter had already voted for this track, nothing changed
    AlreadyVoted,
}

impl VoteOutcome {
    pub fn changed_ledger(&self) -> bool {
        !matches!(self, VoteOutcome::AlreadyVoted)
    }

    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Created => "Track nominated, thanks for the first vote!",
            VoteOutcome::VoteAdded => "Vote added.",
            VoteOutcome::AlreadyVoted => "You already voted for this track.",
        }
    }
}

/// Records `voter`'s vote for `track`, returning the next ledger snapshot.
///
/// `now` is only used as `added_at` when the track gets its first vote.
pub fn cast_vote(
    ledger: &Ledger,
    track: &Track,
    voter: &VoterId,
    now: NaiveDate,
) -> (Ledger, VoteOutcome) {
    let mut next = ledger.clone();

    let outcome = match next.get_mut(&track.url) {
        Some(record) if record.has_voted(voter) => VoteOutcome::AlreadyVoted,
        Some(record) => {
            record.add_vote(voter.clone());
            VoteOutcome::VoteAdded
        }
        None => {
            next.insert_new(VoteRecord::new(track, voter.clone(), now));
            VoteOutcome::Created
        }
    };

    (next, outcome)
}

/// Records with strictly more than `threshold` votes, in ledger order
pub fn find_promotable(ledger: &Ledger, threshold: usize) -> Vec<VoteRecord> {
    ledger
        .iter()
        .filter(|record| record.votes() > threshold)
        .cloned()
        .collect()
}

/// Records nominated on or after `window_start`, most voted first.
///
/// Equal vote counts put the longest pending nomination first.
pub fn filter_for_display(ledger: &Ledger, window_start: NaiveDate) -> Vec<VoteRecord> {
    let mut shown = ledger
        .iter()
        .filter(|record| record.added_at() >= window_start)
        .cloned()
        .collect::<Vec<_>>();

    shown.sort_by(|a, b| {
        b.votes()
            .cmp(&a.votes())
            .then_with(|| a.added_at().cmp(&b.added_at()))
    });
    shown
}

/// first day of a display window of `days` days ending at `today`
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(chrono::Days::new(days.into()))
        .unwrap_or(NaiveDate::MIN)
}
