//! libSQL storage layer for the FRB catalog.
//!
//! The [`Catalog`] struct wraps an embedded libSQL database holding the
//! `frbs` table: one row per confirmed burst, keyed by canonical name.
//!
//! **Access rules:**
//! - Commit runs: read-write via [`Catalog::open`]
//! - Dry runs and reporting: read-only via [`Catalog::open_readonly`]
//!
//! The table's column set is authoritative. Callers learn it from
//! [`Catalog::columns`] and must not assume the full default schema.

mod migrations;
mod row;

use std::path::{Path, PathBuf};

use frbsync_shared::{CatalogRecord, CatalogValue, FrbSyncError, Result};
use libsql::{Connection, Database, params};
use serde::Serialize;

pub use row::CatalogRow;
use row::{from_sql, quote_ident};

/// Name of the catalog table.
pub const TABLE: &str = "frbs";

/// Columns an inserted row must always carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["Name", "ra", "dec"];

/// A `(name, ra, dec)` triple from a full-table scan.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPosition {
    pub name: String,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
}

/// Summary numbers for a catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total: u64,
    pub with_redshift: u64,
    /// `(telescope, count)`, most common first.
    pub by_telescope: Vec<(String, u64)>,
    pub z_min: Option<f64>,
    pub z_max: Option<f64>,
}

/// Primary catalog handle wrapping a libSQL database.
pub struct Catalog {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    path: PathBuf,
}

fn storage_err(e: impl std::fmt::Display) -> FrbSyncError {
    FrbSyncError::Storage(e.to_string())
}

impl Catalog {
    /// Open or create a catalog at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FrbSyncError::io(parent, e))?;
        }

        let catalog = Self::connect(path, false).await?;
        catalog
            .run_migrations()
            .await
            .map_err(|e| FrbSyncError::CatalogUnavailable(e.to_string()))?;
        Ok(catalog)
    }

    /// Open an existing catalog at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FrbSyncError::CatalogUnavailable(format!(
                "no catalog at {}",
                path.display()
            )));
        }

        let catalog = Self::connect(path, true).await?;
        let columns = catalog
            .columns()
            .await
            .map_err(|e| FrbSyncError::CatalogUnavailable(e.to_string()))?;
        if columns.is_empty() {
            return Err(FrbSyncError::CatalogUnavailable(format!(
                "{} has no '{TABLE}' table",
                path.display()
            )));
        }
        Ok(catalog)
    }

    async fn connect(path: &Path, readonly: bool) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| FrbSyncError::CatalogUnavailable(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| FrbSyncError::CatalogUnavailable(e.to_string()))?;

        tracing::debug!(path = %path.display(), readonly, "catalog opened");
        Ok(Self {
            db,
            conn,
            readonly,
            path: path.to_path_buf(),
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    FrbSyncError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(FrbSyncError::Storage(
                "catalog is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// The columns the `frbs` table currently defines, in declaration order.
    /// Empty if the table does not exist.
    pub async fn columns(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(&format!("PRAGMA table_info({TABLE})"), params![])
            .await
            .map_err(storage_err)?;

        let mut columns = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            columns.push(row.get::<String>(1).map_err(storage_err)?);
        }
        Ok(columns)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Return the stored name equal to any of `candidates`, if one exists.
    /// Comparison is exact and case-sensitive; the earliest row wins.
    pub async fn find_by_name(&self, candidates: &[String]) -> Result<Option<String>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let placeholders = (1..=candidates.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT Name FROM {TABLE} WHERE Name IN ({placeholders}) ORDER BY rowid LIMIT 1"
        );
        let values: Vec<libsql::Value> = candidates
            .iter()
            .map(|n| libsql::Value::Text(n.clone()))
            .collect();

        let mut rows = self
            .conn
            .query(&sql, libsql::params::Params::Positional(values))
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => name_cell(&row),
            None => Ok(None),
        }
    }

    /// Every `(name, ra, dec)` in the catalog, in insertion order.
    /// Rows without a name are skipped.
    pub async fn all_positions(&self) -> Result<Vec<CatalogPosition>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT Name, ra, dec FROM {TABLE} WHERE Name IS NOT NULL ORDER BY rowid"),
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut positions = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let coord = |idx: i32| -> Result<Option<f64>> {
                Ok(from_sql(row.get_value(idx).map_err(storage_err)?).and_then(|v| v.as_f64()))
            };
            let Some(name) = name_cell(&row)? else {
                continue;
            };
            positions.push(CatalogPosition {
                name,
                ra: coord(1)?,
                dec: coord(2)?,
            });
        }
        Ok(positions)
    }

    /// Number of records in the catalog.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query(&format!("SELECT COUNT(*) FROM {TABLE}"), params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            None => Ok(0),
        }
    }

    /// Get a full record by exact canonical name.
    pub async fn get(&self, name: &str) -> Result<Option<CatalogRecord>> {
        let columns = self.columns().await?;
        let mut rows = self
            .conn
            .query(
                &format!("SELECT * FROM {TABLE} WHERE Name = ?1"),
                params![name],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(CatalogRecord::from_cells(read_cells(&row, &columns)?)?)),
            None => Ok(None),
        }
    }

    /// All records, in insertion order.
    pub async fn list(&self) -> Result<Vec<CatalogRecord>> {
        let columns = self.columns().await?;
        let mut rows = self
            .conn
            .query(
                &format!("SELECT * FROM {TABLE} WHERE Name IS NOT NULL ORDER BY rowid"),
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            records.push(CatalogRecord::from_cells(read_cells(&row, &columns)?)?);
        }
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert one row. The statement is atomic: on failure nothing is written.
    ///
    /// Fails if the row lacks a [`REQUIRED_COLUMNS`] entry or names a column
    /// the table does not declare. Callers filter optional columns first.
    pub async fn insert(&self, row: &CatalogRow) -> Result<()> {
        self.check_writable()?;

        let declared = self.columns().await?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !row.contains(c) || !declared.iter().any(|d| d == c))
            .collect();
        if !missing.is_empty() {
            return Err(FrbSyncError::validation(format!(
                "row cannot satisfy required column(s): {}",
                missing.join(", ")
            )));
        }
        if let Some(unknown) = row.columns().find(|c| !declared.iter().any(|d| d == c)) {
            return Err(FrbSyncError::validation(format!(
                "column '{unknown}' is not defined by the catalog"
            )));
        }

        let column_list = row.columns().map(quote_ident).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=row.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("INSERT INTO {TABLE} ({column_list}) VALUES ({placeholders})");

        self.conn
            .execute(&sql, libsql::params::Params::Positional(row.values()))
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    /// Counts and redshift range, for status output.
    pub async fn stats(&self) -> Result<CatalogStats> {
        let columns = self.columns().await?;
        let has = |c: &str| columns.iter().any(|d| d == c);

        let mut stats = CatalogStats {
            total: self.count().await?,
            ..CatalogStats::default()
        };

        if has("z") {
            let mut rows = self
                .conn
                .query(
                    &format!(
                        "SELECT COUNT(*), MIN(z), MAX(z) FROM {TABLE} WHERE z IS NOT NULL AND z != ''"
                    ),
                    params![],
                )
                .await
                .map_err(storage_err)?;
            if let Some(row) = rows.next().await.map_err(storage_err)? {
                stats.with_redshift = row.get::<i64>(0).map_err(storage_err)? as u64;
                stats.z_min = from_sql(row.get_value(1).map_err(storage_err)?).and_then(|v| v.as_f64());
                stats.z_max = from_sql(row.get_value(2).map_err(storage_err)?).and_then(|v| v.as_f64());
            }
        }

        if has("telescope") {
            let mut rows = self
                .conn
                .query(
                    &format!(
                        "SELECT telescope, COUNT(*) FROM {TABLE} GROUP BY telescope ORDER BY COUNT(*) DESC, telescope"
                    ),
                    params![],
                )
                .await
                .map_err(storage_err)?;
            while let Some(row) = rows.next().await.map_err(storage_err)? {
                let telescope = from_sql(row.get_value(0).map_err(storage_err)?)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown".into());
                let n = row.get::<i64>(1).map_err(storage_err)? as u64;
                stats.by_telescope.push((telescope, n));
            }
        }

        Ok(stats)
    }

    /// Write the whole table to `out` as CSV with a header row.
    /// Returns the number of data rows written.
    pub async fn export_csv(&self, out: &Path) -> Result<usize> {
        let columns = self.columns().await?;
        let mut writer = csv::Writer::from_path(out).map_err(|e| csv_err(out, e))?;
        writer.write_record(&columns).map_err(|e| csv_err(out, e))?;

        let mut rows = self
            .conn
            .query(&format!("SELECT * FROM {TABLE} ORDER BY rowid"), params![])
            .await
            .map_err(storage_err)?;

        let mut written = 0;
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let record: Vec<String> = read_cells(&row, &columns)?
                .into_iter()
                .map(|(_, v)| v.map(|v| v.to_string()).unwrap_or_default())
                .collect();
            writer.write_record(&record).map_err(|e| csv_err(out, e))?;
            written += 1;
        }
        writer.flush().map_err(|e| FrbSyncError::io(out, e))?;

        tracing::info!(rows = written, path = %out.display(), "catalog exported");
        Ok(written)
    }
}

fn csv_err(path: &Path, e: csv::Error) -> FrbSyncError {
    FrbSyncError::Storage(format!("csv export to {}: {e}", path.display()))
}

/// First column as a name. `NULL` or blank reads as `None`.
fn name_cell(row: &libsql::Row) -> Result<Option<String>> {
    let value = from_sql(row.get_value(0).map_err(storage_err)?);
    Ok(value
        .map(|v| v.to_string())
        .filter(|name| !name.trim().is_empty()))
}

/// Pair every value of a `SELECT *` row with its column name.
fn read_cells(row: &libsql::Row, columns: &[String]) -> Result<Vec<(String, Option<CatalogValue>)>> {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let value = row.get_value(i as i32).map_err(storage_err)?;
            Ok((c.clone(), from_sql(value)))
        })
        .collect()
}
