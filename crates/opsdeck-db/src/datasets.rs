use anyhow::Result;
use rusqlite::Row;

use opsdeck_types::api::{NewDataset, UploaderSummary};
use opsdeck_types::models::DatasetRecord;

use crate::Database;

fn map_dataset(row: &Row<'_>) -> rusqlite::Result<DatasetRecord> {
    Ok(DatasetRecord {
        id: row.get(0)?,
        dataset_id: row.get(1)?,
        name: row.get(2)?,
        row_count: row.get(3)?,
        column_count: row.get(4)?,
        uploaded_by: row.get(5)?,
        upload_date: row.get(6)?,
    })
}

impl Database {
    pub fn insert_dataset(&self, dataset: &NewDataset) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO datasets_metadata
                    (dataset_id, name, row_count, column_count, uploaded_by, upload_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    dataset.dataset_id,
                    dataset.name,
                    dataset.row_count,
                    dataset.column_count,
                    dataset.uploaded_by,
                    dataset.upload_date,
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_dataset(&self, id: i64, dataset: &NewDataset) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE datasets_metadata
                 SET dataset_id = ?1, name = ?2, row_count = ?3,
                     column_count = ?4, uploaded_by = ?5, upload_date = ?6
                 WHERE id = ?7",
                rusqlite::params![
                    dataset.dataset_id,
                    dataset.name,
                    dataset.row_count,
                    dataset.column_count,
                    dataset.uploaded_by,
                    dataset.upload_date,
                    id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_dataset(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM datasets_metadata WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// All dataset records, most recently uploaded first.
    pub fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, dataset_id, name, row_count, column_count, uploaded_by, upload_date
                 FROM datasets_metadata ORDER BY upload_date DESC",
            )?;
            let rows = stmt
                .query_map([], map_dataset)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_datasets(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count =
                conn.query_row("SELECT COUNT(*) FROM datasets_metadata", [], |r| r.get(0))?;
            Ok(count)
        })
    }

    /// Sum of row counts across every dataset; 0 when the table is empty.
    pub fn total_dataset_rows(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let total = conn.query_row(
                "SELECT COALESCE(SUM(row_count), 0) FROM datasets_metadata",
                [],
                |r| r.get(0),
            )?;
            Ok(total)
        })
    }

    pub fn datasets_by_uploader(&self) -> Result<Vec<UploaderSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT uploaded_by, COUNT(*), SUM(row_count)
                 FROM datasets_metadata GROUP BY uploaded_by ORDER BY uploaded_by",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UploaderSummary {
                        uploaded_by: row.get(0)?,
                        dataset_count: row.get(1)?,
                        total_rows: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
