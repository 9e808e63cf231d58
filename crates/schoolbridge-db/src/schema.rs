//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "seed_catalog",
        sql: CATALOG_SEED_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Catalog categories (global, read-only reference data)
-- =======================================================================
DEFINE TABLE category SCHEMAFULL;
DEFINE FIELD name ON TABLE category TYPE string;
DEFINE FIELD subcategories ON TABLE category TYPE array;
DEFINE FIELD subcategories.* ON TABLE category TYPE string;
DEFINE FIELD position ON TABLE category TYPE int DEFAULT 0;
DEFINE INDEX idx_category_name ON TABLE category COLUMNS name UNIQUE;

-- =======================================================================
-- Requests (school scope)
-- =======================================================================
DEFINE TABLE request SCHEMAFULL;
DEFINE FIELD school_id ON TABLE request TYPE string;
DEFINE FIELD category ON TABLE request TYPE string;
DEFINE FIELD subcategory ON TABLE request TYPE string;
DEFINE FIELD description ON TABLE request TYPE string;
DEFINE FIELD required_quantity ON TABLE request TYPE int \
    ASSERT $value >= 1;
DEFINE FIELD remaining_quantity ON TABLE request TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD status ON TABLE request TYPE string \
    ASSERT $value IN ['Open', 'Approved', 'Fulfilled', 'Completed'];
DEFINE FIELD created_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_request_school ON TABLE request COLUMNS school_id;
DEFINE INDEX idx_request_status ON TABLE request COLUMNS status;

-- =======================================================================
-- Applications (scoped through the owning school of the request)
-- =======================================================================
DEFINE TABLE application SCHEMAFULL;
DEFINE FIELD request_id ON TABLE application TYPE string;
DEFINE FIELD volunteer_id ON TABLE application TYPE string;
DEFINE FIELD school_id ON TABLE application TYPE string;
DEFINE FIELD offered_quantity ON TABLE application TYPE int \
    ASSERT $value >= 1;
DEFINE FIELD status ON TABLE application TYPE string \
    ASSERT $value IN ['Pending', 'Approved', 'Rejected', 'Fulfilled'];
DEFINE FIELD feedback ON TABLE application TYPE option<string>;
DEFINE FIELD applied_at ON TABLE application TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD fulfilled_at ON TABLE application TYPE option<datetime>;
DEFINE FIELD updated_at ON TABLE application TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_application_volunteer_request ON TABLE application \
    COLUMNS volunteer_id, request_id UNIQUE;
DEFINE INDEX idx_application_request ON TABLE application \
    COLUMNS request_id;
DEFINE INDEX idx_application_school ON TABLE application \
    COLUMNS school_id;
";

// -----------------------------------------------------------------------
// v2: default catalog
// -----------------------------------------------------------------------

const CATALOG_SEED_V2: &str = "\
CREATE category SET position = 0, name = 'Furniture', \
    subcategories = ['Desks', 'Chairs', 'Blackboards', 'Cupboards'];
CREATE category SET position = 1, name = 'Electronics', \
    subcategories = ['Computers', 'Projectors', 'Printers', 'Tablets'];
CREATE category SET position = 2, name = 'Books', \
    subcategories = ['Textbooks', 'Storybooks', 'Reference'];
CREATE category SET position = 3, name = 'Stationery', \
    subcategories = ['Notebooks', 'Pens', 'Art Supplies'];
CREATE category SET position = 4, name = 'Sports', \
    subcategories = ['Balls', 'Nets', 'Kits'];
CREATE category SET position = 5, name = 'Sanitation', \
    subcategories = ['Water Filters', 'Handwash Stations', 'Toilets'];
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Lets tests check the table constraints on their own, without the
/// migration runner or the catalog seed.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn application_pair_is_unique() {
        assert!(SCHEMA_V1.contains("COLUMNS volunteer_id, request_id UNIQUE"));
    }
}
