use sqlx::sqlite::SqlitePool;
use std::fmt;

#[derive(Clone, Debug)]
pub struct Migration {
    version: i32,
    up: &'static str,
    down: &'static str,
}

impl Migration {
    pub const fn new(version: i32, up: &'static str, down: &'static str) -> Self {
        Self { version, up, down }
    }

    pub fn version(&self) -> i32 {
        self.version
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Migration {}", self.version)
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            source_id TEXT,
            source_url TEXT,
            kind TEXT NOT NULL,
            operation_type TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            price REAL NOT NULL,
            currency TEXT NOT NULL,
            price_per_sqm REAL,
            address TEXT,
            neighborhood TEXT,
            city TEXT NOT NULL,
            province TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            covered_area REAL,
            total_area REAL,
            bedrooms INTEGER,
            bathrooms INTEGER,
            parking_spaces INTEGER,
            amenities TEXT,
            agency TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            scraped_at DATETIME,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        );

        CREATE INDEX idx_properties_source_id ON properties(source, source_id);
        CREATE INDEX idx_properties_source_url ON properties(source, source_url);
        CREATE INDEX idx_properties_status ON properties(status);

        CREATE TABLE IF NOT EXISTS property_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            is_primary INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            FOREIGN KEY(property_id) REFERENCES properties(id) ON DELETE CASCADE,
            UNIQUE(property_id, url)
        );

        CREATE TABLE IF NOT EXISTS price_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id INTEGER NOT NULL,
            price REAL NOT NULL,
            currency TEXT NOT NULL,
            change_percentage REAL,
            recorded_at DATETIME NOT NULL,
            FOREIGN KEY(property_id) REFERENCES properties(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_price_history_property ON price_history(property_id, recorded_at);
        "#,
        r#"
        DROP INDEX IF EXISTS idx_price_history_property;
        DROP TABLE IF EXISTS price_history;
        DROP TABLE IF EXISTS property_images;
        DROP INDEX IF EXISTS idx_properties_status;
        DROP INDEX IF EXISTS idx_properties_source_url;
        DROP INDEX IF EXISTS idx_properties_source_id;
        DROP TABLE IF EXISTS properties;
        "#,
    ),
    Migration::new(
        2,
        r#"
        CREATE TABLE IF NOT EXISTS saved_searches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            portals TEXT NOT NULL,
            property_kind TEXT,
            operation_type TEXT NOT NULL,
            city TEXT,
            neighborhoods TEXT,
            province TEXT,
            min_price REAL,
            max_price REAL,
            currency TEXT NOT NULL DEFAULT 'USD',
            min_area REAL,
            max_area REAL,
            min_bedrooms INTEGER,
            max_bedrooms INTEGER,
            min_bathrooms INTEGER,
            auto_scrape INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_executed_at DATETIME,
            total_executions INTEGER NOT NULL DEFAULT 0,
            total_properties_found INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        );

        CREATE INDEX idx_searches_active ON saved_searches(is_active);
        CREATE INDEX idx_searches_last_executed ON saved_searches(last_executed_at);

        CREATE TABLE IF NOT EXISTS pending_properties (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            saved_search_id INTEGER NOT NULL,
            source TEXT NOT NULL,
            source_id TEXT,
            source_url TEXT NOT NULL,
            title TEXT,
            price REAL,
            currency TEXT,
            thumbnail_url TEXT,
            location_preview TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            error_message TEXT,
            property_id INTEGER,
            discovered_at DATETIME NOT NULL,
            scraped_at DATETIME,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY(saved_search_id) REFERENCES saved_searches(id) ON DELETE CASCADE,
            FOREIGN KEY(property_id) REFERENCES properties(id) ON DELETE SET NULL
        );

        CREATE INDEX idx_pending_search_status ON pending_properties(saved_search_id, status);
        CREATE INDEX idx_pending_source_id ON pending_properties(saved_search_id, source, source_id);
        CREATE INDEX idx_pending_source_url ON pending_properties(saved_search_id, source, source_url);
        CREATE INDEX idx_pending_discovered ON pending_properties(discovered_at);
        "#,
        r#"
        DROP INDEX IF EXISTS idx_pending_discovered;
        DROP INDEX IF EXISTS idx_pending_source_url;
        DROP INDEX IF EXISTS idx_pending_source_id;
        DROP INDEX IF EXISTS idx_pending_search_status;
        DROP TABLE IF EXISTS pending_properties;
        DROP INDEX IF EXISTS idx_searches_last_executed;
        DROP INDEX IF EXISTS idx_searches_active;
        DROP TABLE IF EXISTS saved_searches;
        "#,
    ),
    Migration::new(
        3,
        r#"
        -- Older history rows only carried the observed price; keep the
        -- previous price alongside so drops are visible without a window scan.
        ALTER TABLE price_history ADD COLUMN previous_price REAL;
        "#,
        r#"
        ALTER TABLE price_history DROP COLUMN previous_price;
        "#,
    ),
];

pub async fn apply_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create migrations table if it doesn't exist
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // Get applied migrations
    let applied_versions: Vec<i32> =
        sqlx::query_scalar("SELECT version FROM migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    // Apply pending migrations
    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::debug!("applying {}", migration);
            sqlx::query(migration.up).execute(pool).await?;

            sqlx::query("INSERT INTO migrations (version, applied_at) VALUES (?, ?)")
                .bind(migration.version)
                .bind(chrono::Utc::now())
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

pub async fn rollback_migration(pool: &SqlitePool, version: i32) -> Result<(), sqlx::Error> {
    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .ok_or_else(|| sqlx::Error::Decode("Migration not found".into()))?;

    sqlx::query(migration.down).execute(pool).await?;

    sqlx::query("DELETE FROM migrations WHERE version = ?")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<Migration>, sqlx::Error> {
    let applied_versions: Vec<i32> =
        sqlx::query_scalar("SELECT version FROM migrations ORDER BY version")
            .fetch_all(pool)
            .await?;

    Ok(MIGRATIONS
        .iter()
        .filter(|m| applied_versions.contains(&m.version))
        .cloned()
        .collect())
}
