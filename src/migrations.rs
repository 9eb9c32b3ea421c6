//! SQL migration system for the Intervue database
//!
//! Migrations are embedded at compile time and applied in order.
//! The system tracks applied migrations in a `_migrations` table.

use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Embedded migration files (compiled into binary)
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema.sql",
        include_str!("../migrations/001_initial_schema.sql"),
    ),
    (
        "002_add_flashcard_card_type.sql",
        include_str!("../migrations/002_add_flashcard_card_type.sql"),
    ),
    (
        "003_add_practice_attempts.sql",
        include_str!("../migrations/003_add_practice_attempts.sql"),
    ),
];

/// Run all pending migrations on the database
pub fn run_migrations(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let applied = applied_migrations(conn)?;
    let mut applied_count = 0;

    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|a| a == name) {
            debug!("Migration already applied: {}", name);
            continue;
        }

        info!("Applying migration: {}", name);

        match conn.execute_batch(sql) {
            Ok(()) => {
                conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
                applied_count += 1;
            }
            Err(e) => {
                // ALTER TABLE on a database that already has the column
                let err_str = e.to_string();
                if err_str.contains("duplicate column name") || err_str.contains("already exists") {
                    warn!(
                        "Migration {} partially applied (some changes already exist): {}",
                        name, e
                    );
                    conn.execute(
                        "INSERT OR IGNORE INTO _migrations (name) VALUES (?1)",
                        [name],
                    )?;
                    applied_count += 1;
                } else {
                    return Err(e);
                }
            }
        }
    }

    if applied_count > 0 {
        info!("Applied {} new migration(s)", applied_count);
    } else {
        debug!("Database schema is up to date");
    }

    Ok(applied_count)
}

/// Names of all applied migrations, oldest first
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM _migrations ORDER BY id")?;
    stmt.query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()
}
