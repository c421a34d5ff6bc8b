use std::{collections::BTreeSet, fmt::Display};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::track::Track;

/// Identifies a user casting votes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    /// trims the identifier, returns None if nothing is left
    pub fn new(id: &str) -> Option<Self> {
        let id = id.trim();
        (!id.is_empty()).then(|| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VoterId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value).ok_or(LedgerError::EmptyVoter)
    }
}

impl From<VoterId> for String {
    fn from(value: VoterId) -> Self {
        value.0
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("url {0} appears more than once in the ledger")]
    DuplicateUrl(String),

    #[error("record {0} has no voters")]
    NoVoters(String),

    #[error("voter id is empty")]
    EmptyVoter,
}

/// A pending nomination.
///
/// The vote count is the size of the voter set, so `votes == |voted_by|` cannot be broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    url: String,
    name: String,
    artist: String,
    added_at: NaiveDate,
    voted_by: BTreeSet<VoterId>,
}

impl VoteRecord {
    /// first vote on a track
    pub fn new(track: &Track, voter: VoterId, added_at: NaiveDate) -> Self {
        Self {
            url: track.url.clone(),
            name: track.name.clone(),
            artist: track.artist.clone(),
            added_at,
            voted_by: BTreeSet::from([voter]),
        }
    }

    /// rebuilds a record from persisted fields
    pub fn restore(
        url: String,
        name: String,
        artist: String,
        added_at: NaiveDate,
        voted_by: BTreeSet<VoterId>,
    ) -> Result<Self, LedgerError> {
        if voted_by.is_empty() {
            return Err(LedgerError::NoVoters(url));
        }
        Ok(Self {
            url,
            name,
            artist,
            added_at,
            voted_by,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn added_at(&self) -> NaiveDate {
        self.added_at
    }

    pub fn voted_by(&self) -> &BTreeSet<VoterId> {
        &self.voted_by
    }

    pub fn votes(&self) -> usize {
        self.voted_by.len()
    }

    pub fn has_voted(&self, voter: &VoterId) -> bool {
        self.voted_by.contains(voter)
    }

    /// returns false if the voter had already voted
    pub(crate) fn add_vote(&mut self, voter: VoterId) -> bool {
        self.voted_by.insert(voter)
    }
}

/// Ordered collection of pending nominations, unique by url
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    records: Vec<VoteRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<VoteRecord>) -> Result<Self, LedgerError> {
        let mut seen = BTreeSet::new();
        for record in &records {
            if !seen.insert(record.url()) {
                return Err(LedgerError::DuplicateUrl(record.url.clone()));
            }
        }
        Ok(Self { records })
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoteRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&VoteRecord> {
        self.records.iter().find(|r| r.url == url)
    }

    pub(crate) fn get_mut(&mut self, url: &str) -> Option<&mut VoteRecord> {
        self.records.iter_mut().find(|r| r.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Appends a record the caller just failed to find.
    ///
    /// Returns the record already holding that url instead of adding a second one.
    pub(crate) fn insert_new(&mut self, record: VoteRecord) -> &mut VoteRecord {
        match self.records.iter().position(|r| r.url == record.url) {
            Some(index) => &mut self.records[index],
            None => {
                self.records.push(record);
                let last = self.records.len() - 1;
                &mut self.records[last]
            }
        }
    }

    /// removes a record keeping the order of the rest
    pub fn remove(&mut self, url: &str) -> Option<VoteRecord> {
        let index = self.records.iter().position(|r| r.url == url)?;
        Some(self.records.remove(index))
    }
}
