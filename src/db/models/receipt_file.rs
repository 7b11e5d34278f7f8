// src/db/models/receipt_file.rs

//! ReceiptFile model - a file a receipt placed in the prefix

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, receipt_id, path, sha256, size, mode";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    pub id: Option<i64>,
    pub receipt_id: i64,
    /// Absolute path inside the prefix
    pub path: String,
    pub sha256: String,
    pub size: i64,
    pub mode: u32,
}

impl ReceiptFile {
    pub fn new(receipt_id: i64, path: String, sha256: String, size: i64, mode: u32) -> Self {
        Self {
            id: None,
            receipt_id,
            path,
            sha256,
            size,
            mode,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO receipt_files (receipt_id, path, sha256, size, mode)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.receipt_id,
                &self.path,
                &self.sha256,
                &self.size,
                &self.mode,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find the file record for a path, whichever receipt owns it
    pub fn find_by_path(conn: &Connection, path: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM receipt_files WHERE path = ?1"))?;
        Ok(stmt.query_row([path], Self::from_row).optional()?)
    }

    pub fn find_by_receipt(conn: &Connection, receipt_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM receipt_files WHERE receipt_id = ?1 ORDER BY path"
        ))?;
        let files = stmt
            .query_map([receipt_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            receipt_id: row.get(1)?,
            path: row.get(2)?,
            sha256: row.get(3)?,
            size: row.get(4)?,
            mode: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::Receipt;

    #[test]
    fn test_files_follow_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let conn = db::init(&dir.path().join("test.db")).unwrap();

        let mut receipt = Receipt::new(
            "logformat".into(),
            "0.0.1".into(),
            "https://example.com/a.tar.gz".into(),
            "sha256:00".into(),
        );
        let receipt_id = receipt.insert(&conn).unwrap();

        let mut file = ReceiptFile::new(
            receipt_id,
            "/prefix/bin/logformat".into(),
            "cd".repeat(32),
            1024,
            0o755,
        );
        file.insert(&conn).unwrap();

        let found = ReceiptFile::find_by_path(&conn, "/prefix/bin/logformat")
            .unwrap()
            .unwrap();
        assert_eq!(found.receipt_id, receipt_id);
        assert_eq!(found.mode, 0o755);
        assert_eq!(ReceiptFile::find_by_receipt(&conn, receipt_id).unwrap().len(), 1);

        Receipt::delete(&conn, receipt_id).unwrap();
        assert!(
            ReceiptFile::find_by_path(&conn, "/prefix/bin/logformat")
                .unwrap()
                .is_none()
        );
    }
}
