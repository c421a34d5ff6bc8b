use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    catalog::{Catalog, spotify::SpotifyClient},
    config::{Config, PlaylistConfig},
    domain::{
        query::TrackQuery,
        vote::{VoteRecord, VoterId},
    },
    engine::{
        error::VoteError,
        filter_for_display,
        nominate::{Nomination, nominate},
        promotion::{PromotionDispatcher, PromotionReport},
        window_start,
    },
    storage::{LedgerStore, ledger::SqliteLedger},
};

/// Capabilities of one voting session: the ledger store, the catalog client and the rules.
///
/// Built once and passed to every operation, nothing is kept in globals.
pub struct Session {
    store: Box<dyn LedgerStore + Send>,
    catalog: Box<dyn Catalog + Send>,
    rules: PlaylistConfig,
}

#[derive(Debug)]
pub struct VoteReceipt {
    pub nomination: Nomination,
    /// None when automatic promotion is disabled or failed
    pub promotions: Option<PromotionReport>,
    /// why the automatic promotion scan stopped, the vote itself is stored
    pub promotion_error: Option<VoteError>,
}

impl Session {
    pub fn new(
        store: Box<dyn LedgerStore + Send>,
        catalog: Box<dyn Catalog + Send>,
        rules: PlaylistConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            rules,
        }
    }

    /// opens the configured ledger and logs in to Spotify
    pub fn connect(cfg: &Config) -> anyhow::Result<Self> {
        let store = SqliteLedger::open(&cfg.database)?;
        let catalog = SpotifyClient::connect(&cfg.spotify, &cfg.playlist.id)?;
        info!("Session ready for playlist {}", cfg.playlist.id);
        Ok(Self::new(
            Box::new(store),
            Box::new(catalog),
            cfg.playlist.clone(),
        ))
    }

    pub fn rules(&self) -> &PlaylistConfig {
        &self.rules
    }

    /// Records a vote, then runs a promotion scan if the rules ask for it.
    ///
    /// Once the vote is stored the call succeeds, a failing scan only ends up in the receipt.
    pub fn vote(
        &mut self,
        query: &TrackQuery,
        voter: &VoterId,
        today: NaiveDate,
    ) -> Result<VoteReceipt, VoteError> {
        let nomination = nominate(&*self.catalog, &mut *self.store, query, voter, today)?;

        let (promotions, promotion_error) = if self.rules.auto_promote {
            match self.promote() {
                Ok(report) => (Some(report), None),
                Err(err) => {
                    warn!("Promotion after vote failed: {err}");
                    (None, Some(err))
                }
            }
        } else {
            (None, None)
        };

        Ok(VoteReceipt {
            nomination,
            promotions,
            promotion_error,
        })
    }

    pub fn promote(&mut self) -> Result<PromotionReport, VoteError> {
        PromotionDispatcher::new(self.rules.promotion_threshold)
            .run(&*self.catalog, &mut *self.store)
    }

    pub fn pending(&mut self, today: NaiveDate) -> Result<Vec<VoteRecord>, VoteError> {
        pending(&mut *self.store, &self.rules, today)
    }
}

/// Nominations of the display window, most voted first
pub fn pending<S: LedgerStore + ?Sized>(
    store: &mut S,
    rules: &PlaylistConfig,
    today: NaiveDate,
) -> Result<Vec<VoteRecord>, VoteError> {
    let ledger = store.read_all()?;
    Ok(filter_for_display(
        &ledger,
        window_start(today, rules.display_window_days),
    ))
}
