//! Moves nominations that crossed the vote threshold into the playlist

use std::collections::HashSet;

use log::{info, warn};

use crate::{
    catalog::{PlaylistMembership, PlaylistMutation, error::CatalogError},
    domain::vote::VoteRecord,
    engine::{error::VoteError, find_promotable, nominate::refresh},
    storage::LedgerStore,
};

#[derive(Debug)]
pub struct PromotionFailure {
    pub record: VoteRecord,
    pub error: CatalogError,
}

#[derive(Debug, Default)]
pub struct PromotionReport {
    pub promoted: Vec<VoteRecord>,
    /// records the playlist refused, they stay in the ledger
    pub failed: Vec<PromotionFailure>,
}

impl PromotionReport {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.failed.is_empty()
    }
}

pub struct PromotionDispatcher {
    threshold: usize,
}

impl PromotionDispatcher {
    /// records with more than `threshold` votes get promoted
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Promotes every record above the threshold, one at a time.
    ///
    /// After each successful promotion the shrunk ledger is written and read back before the
    /// next record is picked. A record the playlist refuses is kept, reported and not retried
    /// during this scan. Storage failures end the scan.
    ///
    /// A record whose track is already on the playlist is only dropped from the ledger. This
    /// happens when an earlier scan added the track but could not write the ledger.
    pub fn run<P, S>(&self, playlist: &P, store: &mut S) -> Result<PromotionReport, VoteError>
    where
        P: PlaylistMembership + PlaylistMutation + ?Sized,
        S: LedgerStore + ?Sized,
    {
        let mut report = PromotionReport::default();
        let mut attempted: HashSet<String> = HashSet::new();
        let mut ledger = store.read_all()?;

        loop {
            let Some(record) = find_promotable(&ledger, self.threshold)
                .into_iter()
                .find(|r| !attempted.contains(r.url()))
            else {
                break;
            };
            attempted.insert(record.url().to_string());

            match add_once(playlist, record.url()) {
                Ok(()) => {
                    ledger.remove(record.url());
                    store.replace_all(&ledger)?;
                    ledger = refresh(store)?;
                    info!(
                        "Promoted {} - {} with {} votes",
                        record.name(),
                        record.artist(),
                        record.votes()
                    );
                    report.promoted.push(record);
                }
                Err(error) => {
                    warn!("Could not promote {}: {error}", record.url());
                    report.failed.push(PromotionFailure { record, error });
                }
            }
        }

        Ok(report)
    }
}

fn add_once<P>(playlist: &P, track_url: &str) -> Result<(), CatalogError>
where
    P: PlaylistMembership + PlaylistMutation + ?Sized,
{
    if playlist.contains(track_url)? {
        info!("{track_url} is already in the playlist, not adding it again");
        return Ok(());
    }
    playlist.add_item(track_url)
}
