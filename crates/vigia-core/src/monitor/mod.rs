//! Monitoring engine: runs saved searches against the portals, keeps
//! the pending queue moving and tracks price changes over time.

mod dedup;
mod executor;
mod tracker;
mod worker;

use crate::db::{Database, PendingFilter, PendingPage, PendingStats, PropertyPage};
use crate::portal::PortalRegistry;
use crate::{
    Currency, OperationType, PendingProperty, PendingStatus, Portal, PriceHistoryEntry, Property,
    PropertyImage, PropertyKind, PropertyStatus, Result, SavedSearch, VigiaError,
};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

/// Tuning knobs for search execution and scraping.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Budget for a single detail-page fetch.
    pub detail_timeout: Duration,
    /// Budget for a single result-page fetch.
    pub search_timeout: Duration,
    /// Concurrent detail fetches allowed against one portal.
    pub per_portal_concurrency: usize,
    /// Wall-clock cap for a whole scrape batch. Tasks not yet
    /// dispatched when it expires are counted as deferred.
    pub batch_deadline: Option<Duration>,
    /// Pause between successive result pages of one portal.
    pub page_delay: Duration,
    /// Hard stop for result pagination.
    pub max_pages_per_portal: u32,
    /// Cap on auto-scraped rows per execution. None scrapes every
    /// newly discovered row.
    pub auto_scrape_cap: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detail_timeout: Duration::from_secs(30),
            search_timeout: Duration::from_secs(30),
            per_portal_concurrency: 4,
            batch_deadline: None,
            page_delay: Duration::from_millis(500),
            max_pages_per_portal: 10,
            auto_scrape_cap: None,
        }
    }
}

/// Payload for creating a saved search.
#[derive(Debug, Clone)]
pub struct SavedSearchSpec {
    pub name: String,
    pub description: Option<String>,
    pub portals: Vec<Portal>,
    pub property_kind: Option<PropertyKind>,
    pub operation_type: OperationType,
    pub city: Option<String>,
    pub neighborhoods: Option<Vec<String>>,
    pub province: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub currency: Currency,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_bedrooms: Option<i64>,
    pub max_bedrooms: Option<i64>,
    pub min_bathrooms: Option<i64>,
    pub auto_scrape: bool,
}

/// Partial update for a saved search. Outer None leaves the field
/// alone; inner None clears it.
#[derive(Debug, Clone, Default)]
pub struct SavedSearchPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub portals: Option<Vec<Portal>>,
    pub property_kind: Option<Option<PropertyKind>>,
    pub operation_type: Option<OperationType>,
    pub city: Option<Option<String>>,
    pub neighborhoods: Option<Option<Vec<String>>>,
    pub province: Option<Option<String>>,
    pub min_price: Option<Option<f64>>,
    pub max_price: Option<Option<f64>>,
    pub currency: Option<Currency>,
    pub min_area: Option<Option<f64>>,
    pub max_area: Option<Option<f64>>,
    pub min_bedrooms: Option<Option<i64>>,
    pub max_bedrooms: Option<Option<i64>>,
    pub min_bathrooms: Option<Option<i64>>,
    pub auto_scrape: Option<bool>,
    pub is_active: Option<bool>,
}

/// What one execution of a saved search found and did.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub search_id: i64,
    pub total_found: i64,
    pub new_properties: i64,
    pub duplicates: i64,
    pub scraped: i64,
    pub pending: i64,
    pub errors: Vec<ExecutionError>,
}

impl ExecutionSummary {
    pub(crate) fn new(search_id: i64) -> Self {
        Self {
            search_id,
            total_found: 0,
            new_properties: 0,
            duplicates: 0,
            scraped: 0,
            pending: 0,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionError {
    pub portal: Portal,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Scraped { property_id: i64 },
    AlreadyResolved { status: PendingStatus },
    Failed { message: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub attempted: i64,
    pub scraped: i64,
    pub failed: i64,
    pub skipped: i64,
    pub deferred: i64,
    pub errors: Vec<ExecutionError>,
}

/// What one observation of a live listing did to the stored property.
/// Both fields false/None is the common case: the portal still shows
/// the same price.
#[derive(Debug, Clone, Serialize)]
pub struct PriceObservation {
    pub price_change: Option<PriceChange>,
    pub status_changed: bool,
}

impl PriceObservation {
    pub fn price_changed(&self) -> bool {
        self.price_change.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceChange {
    pub property_id: i64,
    pub old_price: f64,
    pub new_price: f64,
    pub currency: Currency,
    pub change_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceUpdateSummary {
    pub checked: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub failed: i64,
    pub changes: Vec<PriceChange>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RescrapeSummary {
    pub attempted: i64,
    pub refreshed: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedSearchOverview {
    #[serde(flatten)]
    pub search: SavedSearch,
    pub pending_count: i64,
}

/// Facade over the store, the portal registry and the engine pieces.
#[derive(Debug)]
pub struct Monitor {
    db: Database,
    registry: PortalRegistry,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(db: Database, registry: PortalRegistry) -> Self {
        Self::with_config(db, registry, MonitorConfig::default())
    }

    pub fn with_config(db: Database, registry: PortalRegistry, config: MonitorConfig) -> Self {
        Self { db, registry, config }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn registry(&self) -> &PortalRegistry {
        &self.registry
    }

    pub(crate) fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // --- saved searches ---

    pub async fn create_saved_search(&self, spec: SavedSearchSpec) -> Result<SavedSearch> {
        let now = Utc::now();
        let mut search = SavedSearch {
            id: None,
            name: spec.name,
            description: spec.description,
            portals: spec.portals,
            property_kind: spec.property_kind,
            operation_type: spec.operation_type,
            city: spec.city,
            neighborhoods: spec.neighborhoods,
            province: spec.province,
            min_price: spec.min_price,
            max_price: spec.max_price,
            currency: spec.currency,
            min_area: spec.min_area,
            max_area: spec.max_area,
            min_bedrooms: spec.min_bedrooms,
            max_bedrooms: spec.max_bedrooms,
            min_bathrooms: spec.min_bathrooms,
            auto_scrape: spec.auto_scrape,
            is_active: true,
            last_executed_at: None,
            total_executions: 0,
            total_properties_found: 0,
            created_at: now,
            updated_at: now,
        };
        validate_search(&search)?;
        self.db.insert_saved_search(&mut search).await?;
        Ok(search)
    }

    pub async fn update_saved_search(&self, id: i64, patch: SavedSearchPatch) -> Result<SavedSearch> {
        let mut search = self.require_search(id).await?;

        if let Some(name) = patch.name {
            search.name = name;
        }
        if let Some(description) = patch.description {
            search.description = description;
        }
        if let Some(portals) = patch.portals {
            search.portals = portals;
        }
        if let Some(property_kind) = patch.property_kind {
            search.property_kind = property_kind;
        }
        if let Some(operation_type) = patch.operation_type {
            search.operation_type = operation_type;
        }
        if let Some(city) = patch.city {
            search.city = city;
        }
        if let Some(neighborhoods) = patch.neighborhoods {
            search.neighborhoods = neighborhoods;
        }
        if let Some(province) = patch.province {
            search.province = province;
        }
        if let Some(min_price) = patch.min_price {
            search.min_price = min_price;
        }
        if let Some(max_price) = patch.max_price {
            search.max_price = max_price;
        }
        if let Some(currency) = patch.currency {
            search.currency = currency;
        }
        if let Some(min_area) = patch.min_area {
            search.min_area = min_area;
        }
        if let Some(max_area) = patch.max_area {
            search.max_area = max_area;
        }
        if let Some(min_bedrooms) = patch.min_bedrooms {
            search.min_bedrooms = min_bedrooms;
        }
        if let Some(max_bedrooms) = patch.max_bedrooms {
            search.max_bedrooms = max_bedrooms;
        }
        if let Some(min_bathrooms) = patch.min_bathrooms {
            search.min_bathrooms = min_bathrooms;
        }
        if let Some(auto_scrape) = patch.auto_scrape {
            search.auto_scrape = auto_scrape;
        }
        if let Some(is_active) = patch.is_active {
            search.is_active = is_active;
        }

        validate_search(&search)?;
        search.updated_at = Utc::now();
        self.db.update_saved_search(&search).await?;
        Ok(search)
    }

    pub async fn get_saved_search(&self, id: i64) -> Result<SavedSearch> {
        self.require_search(id).await
    }

    pub async fn list_saved_searches(&self, active_only: bool) -> Result<Vec<SavedSearchOverview>> {
        let searches = self.db.list_saved_searches(active_only).await?;
        let mut overviews = Vec::with_capacity(searches.len());
        for search in searches {
            let Some(id) = search.id else { continue };
            let pending_count = self.db.pending_count(id).await?;
            overviews.push(SavedSearchOverview { search, pending_count });
        }
        Ok(overviews)
    }

    pub async fn set_search_active(&self, id: i64, active: bool) -> Result<SavedSearch> {
        self.update_saved_search(
            id,
            SavedSearchPatch { is_active: Some(active), ..Default::default() },
        )
        .await
    }

    pub async fn delete_saved_search(&self, id: i64) -> Result<()> {
        if !self.db.delete_saved_search(id).await? {
            return Err(VigiaError::NotFound("saved search", id));
        }
        Ok(())
    }

    // --- pending queue ---

    pub async fn get_pending(&self, id: i64) -> Result<PendingProperty> {
        self.db
            .get_pending(id)
            .await?
            .ok_or(VigiaError::NotFound("pending property", id))
    }

    pub async fn list_pending(&self, filter: &PendingFilter) -> Result<PendingPage> {
        self.db.list_pending(filter).await
    }

    pub async fn skip_pending(&self, id: i64) -> Result<()> {
        let pending = self.get_pending(id).await?;
        if !self.db.mark_skipped(id, Utc::now()).await? {
            return Err(VigiaError::Conflict(format!(
                "pending property {id} is already {}",
                pending.status
            )));
        }
        Ok(())
    }

    pub async fn delete_pending(&self, id: i64) -> Result<()> {
        if !self.db.delete_pending(id).await? {
            return Err(VigiaError::NotFound("pending property", id));
        }
        Ok(())
    }

    pub async fn clear_errors(&self, search_id: Option<i64>) -> Result<u64> {
        self.db.clear_errors(search_id).await
    }

    pub async fn pending_stats(&self) -> Result<PendingStats> {
        self.db.pending_stats().await
    }

    // --- properties ---

    pub async fn get_property(&self, id: i64) -> Result<Property> {
        self.require_property(id).await
    }

    pub async fn list_properties(&self, limit: Option<i64>, offset: Option<i64>) -> Result<PropertyPage> {
        self.db.list_properties(limit, offset).await
    }

    pub async fn get_property_images(&self, property_id: i64) -> Result<Vec<PropertyImage>> {
        self.db.get_property_images(property_id).await
    }

    pub async fn get_price_history(&self, property_id: i64) -> Result<Vec<PriceHistoryEntry>> {
        self.db.get_price_history(property_id).await
    }

    pub async fn set_property_status(&self, id: i64, status: PropertyStatus) -> Result<()> {
        self.require_property(id).await?;
        self.db.set_property_status(id, status, Utc::now()).await
    }

    pub async fn delete_property(&self, id: i64) -> Result<()> {
        if !self.db.delete_property(id).await? {
            return Err(VigiaError::NotFound("property", id));
        }
        Ok(())
    }

    // --- shared lookups ---

    pub(crate) async fn require_search(&self, id: i64) -> Result<SavedSearch> {
        self.db
            .get_saved_search(id)
            .await?
            .ok_or(VigiaError::NotFound("saved search", id))
    }

    pub(crate) async fn require_property(&self, id: i64) -> Result<Property> {
        self.db
            .get_property(id)
            .await?
            .ok_or(VigiaError::NotFound("property", id))
    }
}

fn validate_search(search: &SavedSearch) -> Result<()> {
    if search.name.trim().is_empty() {
        return Err(VigiaError::Validation("name must not be empty".to_string()));
    }
    if search.portals.is_empty() {
        return Err(VigiaError::Validation(
            "at least one portal is required".to_string(),
        ));
    }
    if search.portals.contains(&Portal::Manual) {
        return Err(VigiaError::Validation(
            "manual is not a searchable portal".to_string(),
        ));
    }
    check_range("price", search.min_price, search.max_price)?;
    check_range("area", search.min_area, search.max_area)?;
    if let (Some(min), Some(max)) = (search.min_bedrooms, search.max_bedrooms) {
        if min > max {
            return Err(VigiaError::Validation(
                "min_bedrooms is greater than max_bedrooms".to_string(),
            ));
        }
    }
    for (label, value) in [
        ("min_price", search.min_price),
        ("max_price", search.max_price),
        ("min_area", search.min_area),
        ("max_area", search.max_area),
    ] {
        if value.is_some_and(|v| v < 0.0) {
            return Err(VigiaError::Validation(format!("{label} must not be negative")));
        }
    }
    Ok(())
}

fn check_range(label: &str, min: Option<f64>, max: Option<f64>) -> Result<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(VigiaError::Validation(format!(
                "min_{label} is greater than max_{label}"
            )));
        }
    }
    Ok(())
}
