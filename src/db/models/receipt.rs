// src/db/models/receipt.rs

//! Receipt model - one installed formula release

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, name, version, source_url, digest, installed_at";

/// Record of an installed formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: Option<i64>,
    pub name: String,
    pub version: String,
    pub source_url: String,
    /// Prefixed digest the source archive was verified against
    pub digest: String,
    pub installed_at: Option<String>,
}

impl Receipt {
    pub fn new(name: String, version: String, source_url: String, digest: String) -> Self {
        Self {
            id: None,
            name,
            version,
            source_url,
            digest,
            installed_at: None,
        }
    }

    /// Insert this receipt into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO receipts (name, version, source_url, digest) VALUES (?1, ?2, ?3, ?4)",
            params![&self.name, &self.version, &self.source_url, &self.digest],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM receipts WHERE id = ?1"))?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM receipts WHERE name = ?1"))?;
        Ok(stmt.query_row([name], Self::from_row).optional()?)
    }

    /// All receipts, ordered by name
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM receipts ORDER BY name"))?;
        let receipts = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(receipts)
    }

    /// Delete a receipt; its files go with it
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM receipts WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Whether this receipt records exactly the given release
    pub fn matches(&self, version: &str, digest: &str) -> bool {
        self.version == version && self.digest == digest
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            version: row.get(2)?,
            source_url: row.get(3)?,
            digest: row.get(4)?,
            installed_at: row.get(5)?,
        })
    }
}
