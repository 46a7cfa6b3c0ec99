//! Persistent road-lookup cache backed by SQLite.
//!
//! Maps coordinate fingerprints to resolved [`RoadInfo`] so repeated
//! grouping requests skip the external snap and naming round trips.
//!
//! The cache is strictly best-effort. A missing, unreadable, or corrupt
//! database never fails a grouping request: reads behave as if the store
//! were empty and writes are skipped with a warning, while the in-memory
//! table keeps serving the current process.
//!
//! One writer per database path is assumed. SQLite's own file locking
//! keeps a second process from corrupting the store, but entries written
//! by another process after our lazy load are not seen until reopen.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use rusqlite::{params, Connection};

use crate::{LatLon, RoadInfo};

/// Fingerprint-keyed road cache with SQLite persistence.
pub struct RoadCache {
    conn: Option<Connection>,
    table: HashMap<String, RoadInfo>,
    loaded: bool,
}

impl RoadCache {
    /// Open (or create) the cache database at `path`.
    ///
    /// Never fails: when the database cannot be opened or initialized the
    /// cache runs memory-only for this process.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let opened = Connection::open(path).and_then(|conn| {
            Self::init_schema(&conn)?;
            Ok(conn)
        });
        match opened {
            Ok(conn) => Self {
                conn: Some(conn),
                table: HashMap::new(),
                loaded: false,
            },
            Err(err) => {
                warn!(
                    "road cache at {} unavailable: {}; continuing without persistence",
                    path.display(),
                    err
                );
                Self {
                    conn: None,
                    table: HashMap::new(),
                    loaded: true,
                }
            }
        }
    }

    /// Open a private in-memory cache. Entries live for this process only.
    pub fn in_memory() -> Self {
        let opened = Connection::open_in_memory().and_then(|conn| {
            Self::init_schema(&conn)?;
            Ok(conn)
        });
        match opened {
            Ok(conn) => Self {
                conn: Some(conn),
                table: HashMap::new(),
                loaded: false,
            },
            Err(err) => {
                warn!("in-memory road cache unavailable: {}", err);
                Self {
                    conn: None,
                    table: HashMap::new(),
                    loaded: true,
                }
            }
        }
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS road_cache (
                fingerprint TEXT PRIMARY KEY,
                road_name   TEXT NOT NULL,
                road_id     TEXT NOT NULL,
                snapped_lat REAL NOT NULL,
                snapped_lon REAL NOT NULL
            );",
        )
    }

    /// Populate the in-memory table from disk on first use.
    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        let loaded = match &self.conn {
            Some(conn) => Self::load_table(conn),
            None => return,
        };
        match loaded {
            Ok(table) => {
                debug!("loaded {} cached road entries", table.len());
                self.table = table;
            }
            Err(err) => {
                warn!("road cache unreadable: {}; starting with an empty table", err);
            }
        }
    }

    fn load_table(conn: &Connection) -> rusqlite::Result<HashMap<String, RoadInfo>> {
        let mut stmt = conn.prepare(
            "SELECT fingerprint, road_name, road_id, snapped_lat, snapped_lon FROM road_cache",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                RoadInfo {
                    road_name: row.get(1)?,
                    road_id: row.get(2)?,
                    snapped: LatLon::new(row.get(3)?, row.get(4)?),
                },
            ))
        })?;
        rows.collect()
    }

    /// Look up the road info cached for a coordinate fingerprint.
    pub fn get(&mut self, fingerprint: &str) -> Option<&RoadInfo> {
        self.ensure_loaded();
        self.table.get(fingerprint)
    }

    /// Merge freshly resolved entries into the cache and persist them.
    ///
    /// Persistence is best-effort: on any write error the entries are kept
    /// in memory and the error is logged.
    pub fn put_all(&mut self, entries: HashMap<String, RoadInfo>) {
        if entries.is_empty() {
            return;
        }
        self.ensure_loaded();
        if let Err(err) = self.persist(&entries) {
            warn!(
                "could not persist {} road cache entries: {}",
                entries.len(),
                err
            );
        }
        self.table.extend(entries);
    }

    fn persist(&mut self, entries: &HashMap<String, RoadInfo>) -> rusqlite::Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO road_cache
                 (fingerprint, road_name, road_id, snapped_lat, snapped_lon)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (fingerprint, info) in entries {
                stmt.execute(params![
                    fingerprint,
                    info.road_name,
                    info.road_id,
                    info.snapped.latitude,
                    info.snapped.longitude,
                ])?;
            }
        }
        tx.commit()
    }

    /// Number of cached entries.
    pub fn len(&mut self) -> usize {
        self.ensure_loaded();
        self.table.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }
}
