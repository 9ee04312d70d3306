//! SQLite-backed association ledger.
//!
//! Same replace/read contract as the in-memory ledger, with each replace
//! executed inside a single SQL transaction: a failure anywhere before the
//! commit rolls back to the prior link set. The connection mutex serializes
//! writers, which also satisfies the per-entity single-writer discipline.

use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::ledger::{
    EventSink, LedgerEvent, LinkLedger, ProximityLink, ProximityScope, TerritoryLink,
};
use crate::model::UnitKind;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS territory_links (
    entity_id TEXT NOT NULL,
    level     TEXT NOT NULL,
    unit_id   TEXT NOT NULL,
    fraction  REAL NOT NULL CHECK (fraction > 0.0 AND fraction <= 1.0)
);
CREATE INDEX IF NOT EXISTS idx_territory_entity ON territory_links (entity_id, level);
CREATE INDEX IF NOT EXISTS idx_territory_unit ON territory_links (unit_id);

CREATE TABLE IF NOT EXISTS proximity_links (
    entity_id   TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    radius_m    INTEGER NOT NULL,
    target_id   TEXT NOT NULL,
    distance_m  REAL NOT NULL CHECK (distance_m <= radius_m)
);
CREATE INDEX IF NOT EXISTS idx_proximity_entity
    ON proximity_links (entity_id, target_kind, radius_m);
";

/// Durable association ledger on SQLite.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    sinks: RwLock<Vec<Box<dyn EventSink>>>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory ledger, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            sinks: RwLock::new(Vec::new()),
        })
    }

    /// Register a sink for post-commit domain events.
    pub fn register_sink(&self, sink: Box<dyn EventSink>) {
        self.sinks.write().unwrap().push(sink);
    }

    fn publish(&self, event: LedgerEvent) {
        for sink in self.sinks.read().unwrap().iter() {
            sink.on_event(&event);
        }
    }
}

impl LinkLedger for SqliteLedger {
    fn replace_territory_links(
        &self,
        entity_id: &str,
        level: UnitKind,
        links: Vec<TerritoryLink>,
    ) -> Result<()> {
        crate::ledger::check_territory_batch(entity_id, &links)?;
        let link_count = links.len();
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM territory_links WHERE entity_id = ?1 AND level = ?2",
                params![entity_id, level.as_str()],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO territory_links (entity_id, level, unit_id, fraction)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for link in &links {
                    stmt.execute(params![
                        link.entity_id,
                        level.as_str(),
                        link.unit_id,
                        link.fraction
                    ])?;
                }
            }
            tx.commit()?;
        }

        self.publish(LedgerEvent::TerritoryLinksReplaced {
            entity_id: entity_id.to_string(),
            level,
            link_count,
        });
        Ok(())
    }

    fn replace_proximity_links(
        &self,
        entity_id: &str,
        scope: ProximityScope,
        links: Vec<ProximityLink>,
    ) -> Result<()> {
        crate::ledger::check_proximity_batch(entity_id, scope, &links)?;
        let link_count = links.len();
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM proximity_links
                 WHERE entity_id = ?1 AND target_kind = ?2 AND radius_m = ?3",
                params![entity_id, scope.target.as_str(), scope.radius_m],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO proximity_links
                         (entity_id, target_kind, radius_m, target_id, distance_m)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for link in &links {
                    stmt.execute(params![
                        link.entity_id,
                        scope.target.as_str(),
                        link.radius_m,
                        link.target_id,
                        link.distance_m
                    ])?;
                }
            }
            tx.commit()?;
        }

        self.publish(LedgerEvent::ProximityLinksReplaced {
            entity_id: entity_id.to_string(),
            scope,
            link_count,
        });
        Ok(())
    }

    fn territory_links(&self, entity_id: &str, level: UnitKind) -> Result<Vec<TerritoryLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entity_id, unit_id, fraction FROM territory_links
             WHERE entity_id = ?1 AND level = ?2",
        )?;
        let rows = stmt.query_map(params![entity_id, level.as_str()], territory_row)?;
        collect_rows(rows)
    }

    fn all_territory_links(&self, entity_id: &str) -> Result<Vec<TerritoryLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entity_id, unit_id, fraction FROM territory_links WHERE entity_id = ?1",
        )?;
        let rows = stmt.query_map(params![entity_id], territory_row)?;
        collect_rows(rows)
    }

    fn proximity_links(
        &self,
        entity_id: &str,
        scope: ProximityScope,
    ) -> Result<Vec<ProximityLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entity_id, target_id, radius_m, distance_m FROM proximity_links
             WHERE entity_id = ?1 AND target_kind = ?2 AND radius_m = ?3",
        )?;
        let rows = stmt.query_map(
            params![entity_id, scope.target.as_str(), scope.radius_m],
            |row| {
                Ok(ProximityLink {
                    entity_id: row.get(0)?,
                    target_id: row.get(1)?,
                    radius_m: row.get(2)?,
                    distance_m: row.get(3)?,
                })
            },
        )?;
        collect_rows(rows)
    }

    fn links_into_unit(&self, unit_id: &str) -> Result<Vec<TerritoryLink>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT entity_id, unit_id, fraction FROM territory_links WHERE unit_id = ?1",
        )?;
        let rows = stmt.query_map(params![unit_id], territory_row)?;
        collect_rows(rows)
    }
}

fn territory_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TerritoryLink> {
    Ok(TerritoryLink {
        entity_id: row.get(0)?,
        unit_id: row.get(1)?,
        fraction: row.get(2)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
