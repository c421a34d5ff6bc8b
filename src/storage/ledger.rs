use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use log::debug;
use rusqlite::params;

use crate::{
    config,
    domain::vote::{Ledger, VoteRecord, VoterId},
    storage::{
        LedgerStore, db,
        error::StorageError,
        schema::{DATE_FORMAT, columns, tables},
    },
};

use columns::*;
use tables::*;

/// Ledger kept in SQLite, one row per nomination plus one row per vote
pub struct SqliteLedger {
    pub(crate) db: rusqlite::Connection,
}

struct NominationRow {
    url: String,
    name: String,
    artist: String,
    votes: i64,
    added_at: String,
}

impl SqliteLedger {
    /// when called, opens a data base connection
    pub fn open(config: &config::Database) -> Result<Self, StorageError> {
        Ok(Self::from_existing_conn(db::open(config)?))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    fn into_record(
        row: NominationRow,
        voters: &mut HashMap<String, BTreeSet<VoterId>>,
    ) -> Result<VoteRecord, StorageError> {
        let voted_by = voters.remove(&row.url).unwrap_or_default();
        if usize::try_from(row.votes).ok() != Some(voted_by.len()) {
            return Err(StorageError::CorruptLedger(format!(
                "{} has {} votes but {} voters",
                row.url,
                row.votes,
                voted_by.len()
            )));
        }
        let added_at = NaiveDate::parse_from_str(&row.added_at, DATE_FORMAT).map_err(|e| {
            StorageError::CorruptLedger(format!(
                "{} has invalid {ADDED_AT} '{}': {e}",
                row.url, row.added_at
            ))
        })?;

        Ok(VoteRecord::restore(
            row.url,
            row.name,
            row.artist,
            added_at,
            voted_by,
        )?)
    }
}

impl LedgerStore for SqliteLedger {
    fn read_all(&mut self) -> Result<Ledger, StorageError> {
        let tx = self.db.transaction()?;

        let (rows, voter_rows) = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {URL}, {NAME}, {ARTIST}, {VOTES}, {ADDED_AT} FROM {NOMINATIONS} ORDER BY {POSITION}"
            ))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(NominationRow {
                        url: row.get(0)?,
                        name: row.get(1)?,
                        artist: row.get(2)?,
                        votes: row.get(3)?,
                        added_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = tx.prepare(&format!(
                "SELECT {URL}, {VOTER_ID} FROM {NOMINATION_VOTERS}"
            ))?;
            let voter_rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            (rows, voter_rows)
        };

        tx.commit()?;

        let mut voters: HashMap<String, BTreeSet<VoterId>> = HashMap::new();
        for (url, voter_id) in voter_rows {
            let voter = VoterId::new(&voter_id).ok_or_else(|| {
                StorageError::CorruptLedger(format!("{url} has an empty {VOTER_ID}"))
            })?;
            voters.entry(url).or_default().insert(voter);
        }

        let records = rows
            .into_iter()
            .map(|row| Self::into_record(row, &mut voters))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Read ledger with {} nominations", records.len());
        Ok(Ledger::from_records(records)?)
    }

    fn replace_all(&mut self, ledger: &Ledger) -> Result<(), StorageError> {
        let tx = self.db.transaction()?;

        tx.execute(&format!("DELETE FROM {NOMINATION_VOTERS}"), [])?;
        tx.execute(&format!("DELETE FROM {NOMINATIONS}"), [])?;

        for (position, record) in ledger.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {NOMINATIONS} ({POSITION}, {URL}, {NAME}, {ARTIST}, {VOTES}, {ADDED_AT})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ),
                params![
                    position as i64,
                    record.url(),
                    record.name(),
                    record.artist(),
                    record.votes() as i64,
                    record.added_at().format(DATE_FORMAT).to_string(),
                ],
            )?;

            for voter in record.voted_by() {
                tx.execute(
                    &format!(
                        "INSERT INTO {NOMINATION_VOTERS} ({URL}, {VOTER_ID}) VALUES (?1, ?2)"
                    ),
                    params![record.url(), voter.as_str()],
                )?;
            }
        }

        tx.commit()?;
        debug!("Replaced ledger with {} nominations", ledger.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, params};

    use crate::{
        domain::vote::{
            Ledger,
            tests::{date, record, voter},
        },
        storage::{
            LedgerStore,
            error::StorageError,
            ledger::SqliteLedger,
            schema::{self, columns::*, tables::*},
        },
    };

    fn setup_ledger() -> anyhow::Result<SqliteLedger> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(SqliteLedger::from_existing_conn(conn))
    }

    #[test]
    fn test_read_empty_ledger() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;
        assert!(store.read_all()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_replace_then_read_keeps_order_and_voters() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;

        let ledger = Ledger::from_records(vec![
            record("u2", &["alice", "bob"], date(2024, 1, 3)),
            record("u1", &["carol"], date(2024, 1, 1)),
            record("u3", &["Johan", "Jo", "dave"], date(2024, 1, 2)),
        ])?;

        store.replace_all(&ledger)?;
        let read = store.read_all()?;

        assert_eq!(read, ledger);
        assert_eq!(
            read.iter().map(|r| r.url()).collect::<Vec<_>>(),
            vec!["u2", "u1", "u3"]
        );
        let u3 = read.get("u3").unwrap();
        assert_eq!(u3.votes(), 3);
        assert!(u3.has_voted(&voter("Jo")));
        Ok(())
    }

    #[test]
    fn test_replace_all_overwrites_previous_rows() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;

        store.replace_all(&Ledger::from_records(vec![
            record("u1", &["alice"], date(2024, 1, 1)),
            record("u2", &["bob"], date(2024, 1, 1)),
        ])?)?;
        store.replace_all(&Ledger::from_records(vec![record(
            "u2",
            &["bob", "carol"],
            date(2024, 1, 1),
        )])?)?;

        let read = store.read_all()?;
        assert_eq!(read.len(), 1);
        assert_eq!(read.get("u2").unwrap().votes(), 2);

        let voter_rows: i64 = store.db.query_row(
            &format!("SELECT COUNT(*) FROM {NOMINATION_VOTERS}"),
            [],
            |row| row.get(0),
        )?;
        assert_eq!(voter_rows, 2);
        Ok(())
    }

    #[test]
    fn test_votes_column_matches_voters() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;
        store.replace_all(&Ledger::from_records(vec![record(
            "u1",
            &["alice", "bob"],
            date(2024, 1, 1),
        )])?)?;

        let votes: i64 = store.db.query_row(
            &format!("SELECT {VOTES} FROM {NOMINATIONS} WHERE {URL} = ?1"),
            params!["u1"],
            |row| row.get(0),
        )?;
        assert_eq!(votes, 2);
        Ok(())
    }

    #[test]
    fn test_read_rejects_vote_count_mismatch() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;

        store.db.execute(
            &format!(
                "INSERT INTO {NOMINATIONS} ({POSITION}, {URL}, {NAME}, {ARTIST}, {VOTES}, {ADDED_AT})
                 VALUES (0, 'u1', 'n', 'a', 3, '2024-01-01')"
            ),
            [],
        )?;
        store.db.execute(
            &format!("INSERT INTO {NOMINATION_VOTERS} ({URL}, {VOTER_ID}) VALUES ('u1', 'alice')"),
            [],
        )?;

        let err = store.read_all().unwrap_err();
        assert!(matches!(err, StorageError::CorruptLedger(..)));
        Ok(())
    }

    #[test]
    fn test_read_rejects_bad_date() -> anyhow::Result<()> {
        let mut store = setup_ledger()?;

        store.db.execute(
            &format!(
                "INSERT INTO {NOMINATIONS} ({POSITION}, {URL}, {NAME}, {ARTIST}, {VOTES}, {ADDED_AT})
                 VALUES (0, 'u1', 'n', 'a', 1, 'yesterday')"
            ),
            [],
        )?;
        store.db.execute(
            &format!("INSERT INTO {NOMINATION_VOTERS} ({URL}, {VOTER_ID}) VALUES ('u1', 'alice')"),
            [],
        )?;

        let err = store.read_all().unwrap_err();
        assert!(matches!(err, StorageError::CorruptLedger(msg) if msg.contains("yesterday")));
        Ok(())
    }

    #[test]
    fn test_schema_refuses_zero_votes() -> anyhow::Result<()> {
        let store = setup_ledger()?;

        let result = store.db.execute(
            &format!(
                "INSERT INTO {NOMINATIONS} ({POSITION}, {URL}, {NAME}, {ARTIST}, {VOTES}, {ADDED_AT})
                 VALUES (0, 'u1', 'n', 'a', 0, '2024-01-01')"
            ),
            [],
        );
        assert!(result.is_err());
        Ok(())
    }
}
