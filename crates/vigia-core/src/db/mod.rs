pub mod migrations;
pub mod queries;

pub use migrations::{apply_migrations, get_applied_migrations, rollback_migration, Migration, MIGRATIONS};
pub use queries::{PendingQueryBuilder, PropertyQueryBuilder};

use crate::{
    PendingProperty, PendingStatus, Portal, PriceHistoryEntry, Property, PropertyImage,
    PropertyStatus, Result, SavedSearch,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Listing filters for the pending queue. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct PendingFilter {
    pub search_id: Option<i64>,
    pub status: Option<PendingStatus>,
    pub portal: Option<Portal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingPage {
    pub items: Vec<PendingProperty>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyPage {
    pub items: Vec<Property>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingStats {
    pub total: i64,
    pub pending: i64,
    pub scraped: i64,
    pub skipped: i64,
    pub error: i64,
    pub duplicate: i64,
    pub by_search: Vec<SearchStatusCount>,
    pub by_portal: Vec<(Portal, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchStatusCount {
    pub search_id: i64,
    pub name: String,
    pub pending: i64,
    pub total: i64,
}

#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.as_ref().display()))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;
        apply_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests. Pinned to one connection: every
    /// connection to `sqlite::memory:` is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        apply_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // --- saved searches ---

    pub async fn insert_saved_search(&self, search: &mut SavedSearch) -> Result<()> {
        let portals_json = serde_json::to_string(&search.portals)?;
        let neighborhoods_json = search
            .neighborhoods
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let id = sqlx::query(
            r#"
            INSERT INTO saved_searches (
                name, description, portals, property_kind, operation_type,
                city, neighborhoods, province, min_price, max_price, currency,
                min_area, max_area, min_bedrooms, max_bedrooms, min_bathrooms,
                auto_scrape, is_active, last_executed_at, total_executions,
                total_properties_found, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&search.name)
        .bind(&search.description)
        .bind(&portals_json)
        .bind(search.property_kind)
        .bind(search.operation_type)
        .bind(&search.city)
        .bind(&neighborhoods_json)
        .bind(&search.province)
        .bind(search.min_price)
        .bind(search.max_price)
        .bind(search.currency)
        .bind(search.min_area)
        .bind(search.max_area)
        .bind(search.min_bedrooms)
        .bind(search.max_bedrooms)
        .bind(search.min_bathrooms)
        .bind(search.auto_scrape)
        .bind(search.is_active)
        .bind(search.last_executed_at)
        .bind(search.total_executions)
        .bind(search.total_properties_found)
        .bind(search.created_at)
        .bind(search.updated_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        search.id = Some(id);
        Ok(())
    }

    pub async fn update_saved_search(&self, search: &SavedSearch) -> Result<()> {
        let portals_json = serde_json::to_string(&search.portals)?;
        let neighborhoods_json = search
            .neighborhoods
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            UPDATE saved_searches SET
                name = ?,
                description = ?,
                portals = ?,
                property_kind = ?,
                operation_type = ?,
                city = ?,
                neighborhoods = ?,
                province = ?,
                min_price = ?,
                max_price = ?,
                currency = ?,
                min_area = ?,
                max_area = ?,
                min_bedrooms = ?,
                max_bedrooms = ?,
                min_bathrooms = ?,
                auto_scrape = ?,
                is_active = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&search.name)
        .bind(&search.description)
        .bind(&portals_json)
        .bind(search.property_kind)
        .bind(search.operation_type)
        .bind(&search.city)
        .bind(&neighborhoods_json)
        .bind(&search.province)
        .bind(search.min_price)
        .bind(search.max_price)
        .bind(search.currency)
        .bind(search.min_area)
        .bind(search.max_area)
        .bind(search.min_bedrooms)
        .bind(search.max_bedrooms)
        .bind(search.min_bathrooms)
        .bind(search.auto_scrape)
        .bind(search.is_active)
        .bind(search.updated_at)
        .bind(search.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_saved_search(&self, id: i64) -> Result<Option<SavedSearch>> {
        let search = sqlx::query_as::<_, SavedSearch>("SELECT * FROM saved_searches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(search)
    }

    pub async fn list_saved_searches(&self, active_only: bool) -> Result<Vec<SavedSearch>> {
        let query = if active_only {
            "SELECT * FROM saved_searches WHERE is_active = 1 ORDER BY created_at DESC"
        } else {
            "SELECT * FROM saved_searches ORDER BY created_at DESC"
        };

        let searches = sqlx::query_as::<_, SavedSearch>(query)
            .fetch_all(&self.pool)
            .await?;

        Ok(searches)
    }

    /// Pending rows go with their search (cascade).
    pub async fn delete_saved_search(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn record_execution(
        &self,
        search_id: i64,
        new_properties: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE saved_searches SET
                last_executed_at = ?,
                total_executions = total_executions + 1,
                total_properties_found = total_properties_found + ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(new_properties)
        .bind(at)
        .bind(search_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn pending_count(&self, search_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_properties WHERE saved_search_id = ? AND status = 'pending'",
        )
        .bind(search_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // --- pending queue ---

    pub async fn insert_pending(&self, pending: &mut PendingProperty) -> Result<()> {
        let id = sqlx::query(
            r#"
            INSERT INTO pending_properties (
                saved_search_id, source, source_id, source_url, title, price,
                currency, thumbnail_url, location_preview, status, error_message,
                property_id, discovered_at, scraped_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(pending.saved_search_id)
        .bind(pending.source)
        .bind(&pending.source_id)
        .bind(&pending.source_url)
        .bind(&pending.title)
        .bind(pending.price)
        .bind(pending.currency)
        .bind(&pending.thumbnail_url)
        .bind(&pending.location_preview)
        .bind(pending.status)
        .bind(&pending.error_message)
        .bind(pending.property_id)
        .bind(pending.discovered_at)
        .bind(pending.scraped_at)
        .bind(pending.updated_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        pending.id = Some(id);
        Ok(())
    }

    pub async fn get_pending(&self, id: i64) -> Result<Option<PendingProperty>> {
        let pending =
            sqlx::query_as::<_, PendingProperty>("SELECT * FROM pending_properties WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(pending)
    }

    pub async fn list_pending(&self, filter: &PendingFilter) -> Result<PendingPage> {
        let items = PendingQueryBuilder::new()
            .with_search(filter.search_id)
            .with_status(filter.status)
            .with_portal(filter.portal)
            .order_by_discovered(true)
            .with_limit(filter.limit)
            .with_offset(filter.offset)
            .execute(&self.pool)
            .await?;

        let total = PendingQueryBuilder::new_count()
            .with_search(filter.search_id)
            .with_status(filter.status)
            .with_portal(filter.portal)
            .fetch_count(&self.pool)
            .await?;

        Ok(PendingPage { items, total })
    }

    /// Rows eligible for a scrape batch, oldest discoveries first.
    pub async fn next_scrape_batch(
        &self,
        search_id: Option<i64>,
        limit: i64,
        include_errors: bool,
    ) -> Result<Vec<PendingProperty>> {
        let statuses: &[PendingStatus] = if include_errors {
            &[PendingStatus::Pending, PendingStatus::Error]
        } else {
            &[PendingStatus::Pending]
        };

        PendingQueryBuilder::new()
            .with_search(search_id)
            .with_statuses(statuses)
            .order_by_discovered(false)
            .with_limit(Some(limit))
            .execute(&self.pool)
            .await
    }

    /// Claim the transition to `scraped`. Succeeds only from `pending`
    /// or `error`; returns false when another actor resolved the row first.
    pub async fn mark_scraped(
        &self,
        pending_id: i64,
        property_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_properties SET
                status = 'scraped',
                property_id = ?,
                error_message = NULL,
                scraped_at = ?,
                updated_at = ?
            WHERE id = ? AND status IN ('pending', 'error')
            "#,
        )
        .bind(property_id)
        .bind(at)
        .bind(at)
        .bind(pending_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_error(&self, pending_id: i64, message: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_properties SET
                status = 'error',
                error_message = ?,
                updated_at = ?
            WHERE id = ? AND status IN ('pending', 'error')
            "#,
        )
        .bind(message)
        .bind(at)
        .bind(pending_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_skipped(&self, pending_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_properties SET
                status = 'skipped',
                updated_at = ?
            WHERE id = ? AND status IN ('pending', 'error')
            "#,
        )
        .bind(at)
        .bind(pending_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_pending(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_properties WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drops errored rows instead of requeueing them; a kept row can be
    /// retried through a single scrape.
    pub async fn clear_errors(&self, search_id: Option<i64>) -> Result<u64> {
        let result = match search_id {
            Some(search_id) => {
                sqlx::query(
                    "DELETE FROM pending_properties WHERE status = 'error' AND saved_search_id = ?",
                )
                .bind(search_id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("DELETE FROM pending_properties WHERE status = 'error'")
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    pub async fn find_pending_by_source_id(
        &self,
        search_id: i64,
        source: Portal,
        source_id: &str,
    ) -> Result<Option<PendingProperty>> {
        let pending = sqlx::query_as::<_, PendingProperty>(
            "SELECT * FROM pending_properties WHERE saved_search_id = ? AND source = ? AND source_id = ?",
        )
        .bind(search_id)
        .bind(source)
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pending)
    }

    pub async fn find_pending_by_url(
        &self,
        search_id: i64,
        source: Portal,
        source_url: &str,
    ) -> Result<Option<PendingProperty>> {
        let pending = sqlx::query_as::<_, PendingProperty>(
            "SELECT * FROM pending_properties WHERE saved_search_id = ? AND source = ? AND source_url = ?",
        )
        .bind(search_id)
        .bind(source)
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pending)
    }

    pub async fn pending_stats(&self) -> Result<PendingStats> {
        let by_status: Vec<(PendingStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM pending_properties GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = PendingStats {
            total: 0,
            pending: 0,
            scraped: 0,
            skipped: 0,
            error: 0,
            duplicate: 0,
            by_search: Vec::new(),
            by_portal: Vec::new(),
        };

        for (status, count) in by_status {
            stats.total += count;
            match status {
                PendingStatus::Pending => stats.pending = count,
                PendingStatus::Scraped => stats.scraped = count,
                PendingStatus::Skipped => stats.skipped = count,
                PendingStatus::Error => stats.error = count,
                PendingStatus::Duplicate => stats.duplicate = count,
            }
        }

        let by_search: Vec<(i64, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.id, s.name,
                   SUM(CASE WHEN p.status = 'pending' THEN 1 ELSE 0 END),
                   COUNT(p.id)
            FROM saved_searches s
            JOIN pending_properties p ON p.saved_search_id = s.id
            GROUP BY s.id, s.name
            ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        stats.by_search = by_search
            .into_iter()
            .map(|(search_id, name, pending, total)| SearchStatusCount {
                search_id,
                name,
                pending,
                total,
            })
            .collect();

        stats.by_portal =
            sqlx::query_as("SELECT source, COUNT(*) FROM pending_properties GROUP BY source")
                .fetch_all(&self.pool)
                .await?;

        Ok(stats)
    }

    // --- properties ---

    /// Insert, or refresh the existing row with the same identity.
    /// Returns (row id, created). Identity is (source, source_id),
    /// falling back to (source, source_url).
    pub async fn upsert_property(&self, property: &mut Property) -> Result<(i64, bool)> {
        let existing = match (&property.source_id, &property.source_url) {
            (Some(source_id), _) => {
                self.find_property_by_source_id(property.source, source_id).await?
            }
            (None, Some(source_url)) => {
                self.find_property_by_url(property.source, source_url).await?
            }
            (None, None) => None,
        };

        match existing {
            Some(existing) => {
                let id = existing.id.ok_or(sqlx::Error::RowNotFound)?;
                property.id = Some(id);
                property.created_at = existing.created_at;
                self.update_property(property).await?;
                Ok((id, false))
            }
            None => {
                self.insert_property(property).await?;
                let id = property.id.ok_or(sqlx::Error::RowNotFound)?;
                Ok((id, true))
            }
        }
    }

    pub async fn insert_property(&self, property: &mut Property) -> Result<()> {
        let amenities_json = if property.amenities.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&property.amenities)?)
        };

        let id = sqlx::query(
            r#"
            INSERT INTO properties (
                source, source_id, source_url, kind, operation_type, title,
                description, price, currency, price_per_sqm, address,
                neighborhood, city, province, latitude, longitude,
                covered_area, total_area, bedrooms, bathrooms, parking_spaces,
                amenities, agency, status, scraped_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(property.source)
        .bind(&property.source_id)
        .bind(&property.source_url)
        .bind(property.kind)
        .bind(property.operation_type)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price)
        .bind(property.currency)
        .bind(property.price_per_sqm)
        .bind(&property.address)
        .bind(&property.neighborhood)
        .bind(&property.city)
        .bind(&property.province)
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.covered_area)
        .bind(property.total_area)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.parking_spaces)
        .bind(&amenities_json)
        .bind(&property.agency)
        .bind(property.status)
        .bind(property.scraped_at)
        .bind(property.created_at)
        .bind(property.updated_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        property.id = Some(id);
        Ok(())
    }

    pub async fn update_property(&self, property: &Property) -> Result<()> {
        let amenities_json = if property.amenities.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&property.amenities)?)
        };

        sqlx::query(
            r#"
            UPDATE properties SET
                source = ?,
                source_id = ?,
                source_url = ?,
                kind = ?,
                operation_type = ?,
                title = ?,
                description = ?,
                price = ?,
                currency = ?,
                price_per_sqm = ?,
                address = ?,
                neighborhood = ?,
                city = ?,
                province = ?,
                latitude = ?,
                longitude = ?,
                covered_area = ?,
                total_area = ?,
                bedrooms = ?,
                bathrooms = ?,
                parking_spaces = ?,
                amenities = ?,
                agency = ?,
                status = ?,
                scraped_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(property.source)
        .bind(&property.source_id)
        .bind(&property.source_url)
        .bind(property.kind)
        .bind(property.operation_type)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.price)
        .bind(property.currency)
        .bind(property.price_per_sqm)
        .bind(&property.address)
        .bind(&property.neighborhood)
        .bind(&property.city)
        .bind(&property.province)
        .bind(property.latitude)
        .bind(property.longitude)
        .bind(property.covered_area)
        .bind(property.total_area)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.parking_spaces)
        .bind(&amenities_json)
        .bind(&property.agency)
        .bind(property.status)
        .bind(property.scraped_at)
        .bind(property.updated_at)
        .bind(property.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_property(&self, id: i64) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    /// Dedup lookup: removed properties do not count, so a delisted
    /// listing can be discovered again.
    pub async fn find_property_by_source_id(
        &self,
        source: Portal,
        source_id: &str,
    ) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE source = ? AND source_id = ? AND status != 'removed'",
        )
        .bind(source)
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(property)
    }

    pub async fn find_property_by_url(
        &self,
        source: Portal,
        source_url: &str,
    ) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE source = ? AND source_url = ? AND status != 'removed'",
        )
        .bind(source)
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(property)
    }

    pub async fn list_properties(&self, limit: Option<i64>, offset: Option<i64>) -> Result<PropertyPage> {
        let items = PropertyQueryBuilder::new()
            .order_by_created(true)
            .with_limit(limit)
            .with_offset(offset)
            .execute(&self.pool)
            .await?;

        let total = PropertyQueryBuilder::new_count().fetch_count(&self.pool).await?;

        Ok(PropertyPage { items, total })
    }

    /// Properties that can be re-fetched from their portal.
    pub async fn list_refreshable_properties(&self, portal: Option<Portal>) -> Result<Vec<Property>> {
        PropertyQueryBuilder::new()
            .refreshable()
            .with_source(portal)
            .order_by_created(false)
            .execute(&self.pool)
            .await
    }

    /// Images and history go with the property (cascade).
    pub async fn delete_property(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Price write conditioned on the last-known price so concurrent
    /// observers serialize; the loser re-reads and retries.
    pub async fn conditional_price_update(
        &self,
        property_id: i64,
        old_price: f64,
        new_price: f64,
        currency: crate::Currency,
        price_per_sqm: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE properties SET
                price = ?,
                currency = ?,
                price_per_sqm = ?,
                scraped_at = ?,
                updated_at = ?
            WHERE id = ? AND price = ?
            "#,
        )
        .bind(new_price)
        .bind(currency)
        .bind(price_per_sqm)
        .bind(at)
        .bind(at)
        .bind(property_id)
        .bind(old_price)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_property_status(
        &self,
        property_id: i64,
        status: PropertyStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE properties SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(at)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn touch_scraped_at(&self, property_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE properties SET scraped_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // --- images ---

    pub async fn insert_property_image(&self, image: &mut PropertyImage) -> Result<()> {
        let id = sqlx::query(
            r#"
            INSERT INTO property_images (property_id, url, is_primary, position, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(property_id, url) DO NOTHING
            "#,
        )
        .bind(image.property_id)
        .bind(&image.url)
        .bind(image.is_primary)
        .bind(image.position)
        .bind(image.created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        image.id = Some(id);
        Ok(())
    }

    pub async fn replace_property_images(
        &self,
        property_id: i64,
        urls: &[String],
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("DELETE FROM property_images WHERE property_id = ?")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        for (position, url) in urls.iter().enumerate() {
            let mut image = PropertyImage {
                id: None,
                property_id,
                url: url.clone(),
                is_primary: position == 0,
                position: position as i64,
                created_at: at,
            };
            self.insert_property_image(&mut image).await?;
        }

        Ok(())
    }

    pub async fn get_property_images(&self, property_id: i64) -> Result<Vec<PropertyImage>> {
        let images = sqlx::query_as::<_, PropertyImage>(
            "SELECT * FROM property_images WHERE property_id = ? ORDER BY position",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    // --- price history ---

    pub async fn record_price_history(&self, entry: &mut PriceHistoryEntry) -> Result<()> {
        let id = sqlx::query(
            r#"
            INSERT INTO price_history (
                property_id, price, previous_price, currency, change_percentage, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.property_id)
        .bind(entry.price)
        .bind(entry.previous_price)
        .bind(entry.currency)
        .bind(entry.change_percentage)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        entry.id = Some(id);
        Ok(())
    }

    pub async fn get_price_history(&self, property_id: i64) -> Result<Vec<PriceHistoryEntry>> {
        let entries = sqlx::query_as::<_, PriceHistoryEntry>(
            "SELECT * FROM price_history WHERE property_id = ? ORDER BY recorded_at ASC, id ASC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
