//! Output schema DDL. Applied idempotently (`CREATE TABLE IF NOT EXISTS`) so
//! a fresh or partially-migrated database is always ready for the builder
//! to write into.

use rusqlite::Connection;

pub const CREATE_CLUSTER_ENTRANCES: &str = r#"
CREATE TABLE IF NOT EXISTS cluster_entrances (
    entrance_id INTEGER PRIMARY KEY AUTOINCREMENT,
    chunk_x INTEGER NOT NULL,
    chunk_z INTEGER NOT NULL,
    plane INTEGER NOT NULL,
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    neighbor_dir TEXT NOT NULL CHECK (neighbor_dir IN ('N','S','E','W')),
    UNIQUE (chunk_x, chunk_z, plane, x, y)
)"#;

pub const CREATE_CLUSTER_INTERCONNECTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS cluster_interconnections (
    entrance_from INTEGER NOT NULL,
    entrance_to INTEGER NOT NULL,
    cost INTEGER NOT NULL,
    PRIMARY KEY (entrance_from, entrance_to),
    FOREIGN KEY (entrance_from) REFERENCES cluster_entrances (entrance_id),
    FOREIGN KEY (entrance_to) REFERENCES cluster_entrances (entrance_id)
)"#;

pub const CREATE_CLUSTER_INTRACONNECTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS cluster_intraconnections (
    chunk_x_from INTEGER NOT NULL,
    chunk_z_from INTEGER NOT NULL,
    plane_from INTEGER NOT NULL,
    entrance_from INTEGER NOT NULL,
    entrance_to INTEGER NOT NULL,
    cost INTEGER NOT NULL,
    path_blob BLOB,
    PRIMARY KEY (chunk_x_from, chunk_z_from, plane_from, entrance_from, entrance_to),
    FOREIGN KEY (entrance_from) REFERENCES cluster_entrances (entrance_id),
    FOREIGN KEY (entrance_to) REFERENCES cluster_entrances (entrance_id)
)"#;

/// Create the output tables if they are missing. No-op (and safe under a
/// read-only connection, since `IF NOT EXISTS` on an already-present table
/// still issues nothing but a no-op CREATE) when they already exist.
pub fn ensure_output_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "{};\n{};\n{};",
        CREATE_CLUSTER_ENTRANCES, CREATE_CLUSTER_INTERCONNECTIONS, CREATE_CLUSTER_INTRACONNECTIONS
    ))
}
