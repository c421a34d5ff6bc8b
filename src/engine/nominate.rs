//! From a user query to a vote in the stored ledger

use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    catalog::{PlaylistMembership, TrackCatalog, error::CatalogError},
    domain::{
        query::TrackQuery,
        track::Track,
        vote::{Ledger, VoterId},
    },
    engine::{VoteOutcome, cast_vote, error::VoteError},
    storage::{LedgerStore, error::StorageError},
};

/// Whether a track may enter the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistCheck {
    NotInPlaylist,
    AlreadyInPlaylist,
}

impl PlaylistCheck {
    pub fn is_eligible(&self) -> bool {
        matches!(self, PlaylistCheck::NotInPlaylist)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            PlaylistCheck::NotInPlaylist => "Track not in playlist.",
            PlaylistCheck::AlreadyInPlaylist => "Track already in playlist.",
        }
    }
}

#[derive(Debug)]
pub struct Nomination {
    pub track: Track,
    pub outcome: VoteOutcome,
    /// ledger as re-read from the store after the vote was written
    pub ledger: Ledger,
}

/// `Ok(None)` when the catalog has no match
pub fn resolve_track<C: TrackCatalog + ?Sized>(
    catalog: &C,
    query: &TrackQuery,
) -> Result<Option<Track>, CatalogError> {
    match query {
        TrackQuery::Url(url) => catalog.resolve_by_url(url),
        TrackQuery::Search { name, artist } => catalog.resolve_by_query(name, artist),
    }
}

pub fn check_not_in_playlist<P: PlaylistMembership + ?Sized>(
    playlist: &P,
    track_url: &str,
) -> Result<PlaylistCheck, CatalogError> {
    if playlist.contains(track_url)? {
        Ok(PlaylistCheck::AlreadyInPlaylist)
    } else {
        Ok(PlaylistCheck::NotInPlaylist)
    }
}

/// Re-reads the ledger after a write.
///
/// Other sessions write the same store without any isolation, so the snapshot written a
/// moment ago may already be replaced. Decisions that follow a write must be taken on the
/// re-read ledger. A write landing between our read and our replace is still lost: that
/// race is accepted, the store is last-writer-wins.
pub fn refresh<S: LedgerStore + ?Sized>(store: &mut S) -> Result<Ledger, StorageError> {
    store.read_all()
}

/// Resolves the query, refuses tracks already on the playlist, then records the vote.
///
/// Runs read, compute, replace, re-read against the store. The store is only written when
/// the vote changed the ledger.
pub fn nominate<C, S>(
    catalog: &C,
    store: &mut S,
    query: &TrackQuery,
    voter: &VoterId,
    today: NaiveDate,
) -> Result<Nomination, VoteError>
where
    C: TrackCatalog + PlaylistMembership + ?Sized,
    S: LedgerStore + ?Sized,
{
    let track = resolve_track(catalog, query)?.ok_or(VoteError::NotFound)?;
    debug!("Resolved {query:?} to {}", track.url);

    let check = check_not_in_playlist(catalog, &track.url)?;
    if !check.is_eligible() {
        return Err(VoteError::AlreadyInPlaylist(check.reason().to_string()));
    }

    let ledger = store.read_all()?;
    let (next, outcome) = cast_vote(&ledger, &track, voter, today);
    if outcome.changed_ledger() {
        store.replace_all(&next)?;
    }
    info!("{voter} voted for {}: {outcome:?}", track.url);

    let ledger = refresh(store)?;
    Ok(Nomination {
        track,
        outcome,
        ledger,
    })
}
