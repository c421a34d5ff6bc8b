use std::path::Path;

use anyhow::anyhow;
use rusqlite::Connection;

use crate::{
    config::Database,
    storage::{error::StorageError, schema},
};

fn open_in_memory() -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open_in_memory()
}

fn open_from_file(path: &Path) -> Result<rusqlite::Connection, rusqlite::Error> {
    Connection::open(path)
}

pub fn open(config: &Database) -> Result<rusqlite::Connection, StorageError> {
    let db = if config.in_memory {
        open_in_memory()?
    } else {
        let path = config.path.as_deref().ok_or_else(|| {
            StorageError::Internal(anyhow!("database.path is required unless in_memory = true"))
        })?;
        open_from_file(path)?
    };
    schema::init(&db)?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use crate::{
        config::Database,
        storage::{db::open, error::StorageError, schema},
    };

    fn table_names(db: &rusqlite::Connection) -> Vec<String> {
        let mut stmt = db
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();

        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn open_in_memory_db_initializes_schema() {
        let db = open(&Database {
            in_memory: true,
            path: None,
        })
        .unwrap();

        let tables = table_names(&db);
        for table in schema::tables::ALL_TABLES {
            assert!(tables.contains(&table.to_string()));
        }
    }

    #[test]
    fn open_file_db_initializes_schema() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ledger.db");

        let db = open(&Database {
            in_memory: false,
            path: Some(path.clone()),
        })?;
        drop(db);
        assert!(path.exists());

        // opening twice keeps the existing schema
        let db = open(&Database {
            in_memory: false,
            path: Some(path),
        })?;
        assert_eq!(table_names(&db).len(), schema::tables::ALL_TABLES.len());
        Ok(())
    }

    #[test]
    fn open_file_db_without_path_fails() {
        let err = open(&Database {
            in_memory: false,
            path: None,
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::Internal(_)));
    }
}
