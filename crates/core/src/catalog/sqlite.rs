use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogError, CatalogQuery, CatalogResult, CatalogScope};
use crate::model::{split_path, PackageMetadata};
use crate::services::runner::CheckOutcome;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Summary row for a package stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub pkgname: String,
    pub catalogname: Option<String>,
    pub arch: String,
    pub md5_sum: Option<String>,
    pub file_count: i64,
}

/// A diagnostic tag persisted with a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTag {
    pub pkgname: String,
    pub tag_name: String,
    pub tag_info: Option<String>,
    pub msg: Option<String>,
    pub overridden: bool,
}

/// SQLite-backed package catalog.
///
/// A thin wrapper around `rusqlite::Connection` responsible for:
/// - Opening/creating the DB file and applying schema migrations.
/// - Importing package metadata (files and providers) per catalog scope.
/// - Answering the [`CatalogQuery`] lookups.
/// - Recording check runs and their tags.
///
/// The connection sits behind a mutex so the catalog can be shared by
/// worker threads running individual checks.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (or create) a catalog database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open a throwaway catalog living only in memory.
    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog connection lock poisoned".into()))
    }

    /// Read the schema version from `PRAGMA user_version`.
    pub fn schema_version(&self) -> CatalogResult<i32> {
        let conn = self.conn()?;
        current_schema_version(&conn)
    }

    /// Insert a package and its files into the catalog for `scope`.
    ///
    /// An existing package with the same name in the same scope is replaced.
    pub fn import_package(
        &self,
        pkg: &PackageMetadata,
        scope: &CatalogScope,
    ) -> CatalogResult<i64> {
        let metadata_json = serde_json::to_string(pkg)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            DELETE FROM files WHERE package_id IN (
                SELECT id FROM packages
                WHERE pkgname = ?1 AND osrel = ?2 AND arch = ?3 AND catrel = ?4
            )
            "#,
            params![pkg.pkgname, scope.osrel, scope.arch.as_str(), scope.catrel],
        )?;
        tx.execute(
            r#"
            DELETE FROM packages
            WHERE pkgname = ?1 AND osrel = ?2 AND arch = ?3 AND catrel = ?4
            "#,
            params![pkg.pkgname, scope.osrel, scope.arch.as_str(), scope.catrel],
        )?;
        tx.execute(
            r#"
            INSERT INTO packages (pkgname, catalogname, pkg_arch, md5_sum, osrel, arch, catrel, metadata_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                pkg.pkgname,
                pkg.catalogname,
                pkg.arch.as_str(),
                pkg.md5_sum,
                scope.osrel,
                scope.arch.as_str(),
                scope.catrel,
                metadata_json
            ],
        )?;
        let package_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO files (package_id, path, basename)
                VALUES (?1, ?2, ?3)
                "#,
            )?;
            for full_path in pkg.files.iter().filter(|p| !p.is_empty()) {
                let (dir, basename) = split_path(full_path);
                stmt.execute(params![package_id, dir, basename])?;
            }
        }

        tx.commit()?;
        debug!(pkgname = %pkg.pkgname, %scope, files = pkg.files.len(), "imported package");
        Ok(package_id)
    }

    /// List packages in `scope` (ordered by pkgname).
    pub fn list_packages(&self, scope: &CatalogScope) -> CatalogResult<Vec<PackageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.pkgname, p.catalogname, p.pkg_arch, p.md5_sum,
                   (SELECT COUNT(*) FROM files f WHERE f.package_id = p.id)
            FROM packages p
            WHERE p.osrel = ?1 AND p.arch = ?2 AND p.catrel = ?3
            ORDER BY p.pkgname
            "#,
        )?;
        let rows = stmt.query_map(params![scope.osrel, scope.arch.as_str(), scope.catrel], |row| {
            Ok(PackageRecord {
                pkgname: row.get(0)?,
                catalogname: row.get(1)?,
                arch: row.get(2)?,
                md5_sum: row.get(3)?,
                file_count: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Load the full metadata stored for a package, if present.
    pub fn load_package(
        &self,
        pkgname: &str,
        scope: &CatalogScope,
    ) -> CatalogResult<Option<PackageMetadata>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT metadata_json FROM packages
            WHERE pkgname = ?1 AND osrel = ?2 AND arch = ?3 AND catrel = ?4
            "#,
        )?;
        let mut rows =
            stmt.query(params![pkgname, scope.osrel, scope.arch.as_str(), scope.catrel])?;
        match rows.next()? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    /// Persist every tag of a finished run, flagging the overridden ones.
    pub fn record_check_run(
        &self,
        outcome: &CheckOutcome,
        scope: &CatalogScope,
        fingerprint: Option<&str>,
    ) -> CatalogResult<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            r#"
            INSERT INTO check_runs (name, osrel, arch, catrel, fingerprint, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![outcome.name, scope.osrel, scope.arch.as_str(), scope.catrel, fingerprint, now],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO check_tags (run_id, pkgname, tag_name, tag_info, msg, overridden)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            let reported = outcome.reported.values().flatten().map(|t| (t, false));
            let overridden = outcome.overridden.iter().map(|t| (t, true));
            for (tag, is_overridden) in reported.chain(overridden) {
                stmt.execute(params![
                    run_id,
                    tag.bucket(),
                    tag.tag_name,
                    tag.tag_info,
                    tag.msg,
                    if is_overridden { 1 } else { 0 }
                ])?;
            }
        }

        tx.commit()?;
        Ok(run_id)
    }

    /// Tags stored for a run, in insertion order.
    pub fn list_check_tags(&self, run_id: i64) -> CatalogResult<Vec<StoredTag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT pkgname, tag_name, tag_info, msg, overridden
            FROM check_tags
            WHERE run_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            let overridden: i64 = row.get(4)?;
            Ok(StoredTag {
                pkgname: row.get(0)?,
                tag_name: row.get(1)?,
                tag_info: row.get(2)?,
                msg: row.get(3)?,
                overridden: overridden != 0,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl CatalogQuery for SqliteCatalog {
    fn resolve_by_path(
        &self,
        path: &str,
        scope: &CatalogScope,
    ) -> CatalogResult<BTreeSet<String>> {
        let (dir, basename) = split_path(path);
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT DISTINCT p.pkgname
            FROM files f
            JOIN packages p ON p.id = f.package_id
            WHERE f.path = ?1 AND f.basename = ?2
              AND p.osrel = ?3 AND p.arch = ?4 AND p.catrel = ?5
            "#,
        )?;
        let rows = stmt.query_map(
            params![dir, basename, scope.osrel, scope.arch.as_str(), scope.catrel],
            |row| row.get::<_, String>(0),
        )?;

        let mut out = BTreeSet::new();
        for row in rows {
            out.insert(row?);
        }
        Ok(out)
    }

    fn resolve_by_basename(
        &self,
        basename: &str,
        scope: &CatalogScope,
    ) -> CatalogResult<BTreeMap<String, Vec<String>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT f.path, p.pkgname
            FROM files f
            JOIN packages p ON p.id = f.package_id
            WHERE f.basename = ?1
              AND p.osrel = ?2 AND p.arch = ?3 AND p.catrel = ?4
            ORDER BY f.path, p.pkgname
            "#,
        )?;
        let rows = stmt.query_map(
            params![basename, scope.osrel, scope.arch.as_str(), scope.catrel],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            let (dir, pkgname) = row?;
            out.entry(dir).or_default().push(pkgname);
        }
        Ok(out)
    }

    fn list_installed_packages(&self, scope: &CatalogScope) -> CatalogResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT pkgname FROM packages
            WHERE osrel = ?1 AND arch = ?2 AND catrel = ?3
            ORDER BY pkgname
            "#,
        )?;
        let rows = stmt.query_map(params![scope.osrel, scope.arch.as_str(), scope.catrel], |row| {
            row.get::<_, String>(0)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: packages and files
/// - 2: check_runs and check_tags
fn apply_migrations(conn: &Connection) -> CatalogResult<()> {
    let current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(CatalogError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS packages (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                pkgname       TEXT NOT NULL,
                catalogname   TEXT,
                pkg_arch      TEXT NOT NULL,
                md5_sum       TEXT,
                osrel         TEXT NOT NULL,
                arch          TEXT NOT NULL,
                catrel        TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                UNIQUE (pkgname, osrel, arch, catrel)
            );

            CREATE TABLE IF NOT EXISTS files (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL REFERENCES packages(id),
                path       TEXT NOT NULL,
                basename   TEXT NOT NULL,
                UNIQUE (package_id, path, basename)
            );

            CREATE INDEX IF NOT EXISTS files_by_basename ON files (basename);
            CREATE INDEX IF NOT EXISTS files_by_path ON files (path, basename);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS check_runs (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                osrel       TEXT NOT NULL,
                arch        TEXT NOT NULL,
                catrel      TEXT NOT NULL,
                fingerprint TEXT,
                finished_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS check_tags (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id     INTEGER NOT NULL REFERENCES check_runs(id),
                pkgname    TEXT NOT NULL,
                tag_name   TEXT NOT NULL,
                tag_info   TEXT,
                msg        TEXT,
                overridden INTEGER NOT NULL
            );

            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> CatalogResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
