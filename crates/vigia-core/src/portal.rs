use crate::{Currency, OperationType, Portal, PropertyKind, SavedSearch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub type PortalResult<T> = std::result::Result<T, PortalError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortalErrorKind {
    /// Worth retrying: network failures, timeouts, throttling.
    Transient,
    /// Retrying will not help: gone listings, unsupported portals, bad markup.
    Permanent,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{portal}: {message}")]
pub struct PortalError {
    pub portal: Portal,
    pub kind: PortalErrorKind,
    pub message: String,
}

impl PortalError {
    pub fn transient(portal: Portal, message: impl Into<String>) -> Self {
        Self {
            portal,
            kind: PortalErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(portal: Portal, message: impl Into<String>) -> Self {
        Self {
            portal,
            kind: PortalErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == PortalErrorKind::Transient
    }
}

/// Filters a portal search understands, derived from a saved search.
/// Every field except the operation is optional; adapters ignore what
/// their portal cannot express.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub operation_type: OperationType,
    pub property_kind: Option<PropertyKind>,
    pub city: Option<String>,
    pub neighborhoods: Vec<String>,
    pub province: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub currency: Currency,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub min_bedrooms: Option<i64>,
    pub max_bedrooms: Option<i64>,
    pub min_bathrooms: Option<i64>,
}

impl From<&SavedSearch> for SearchCriteria {
    fn from(search: &SavedSearch) -> Self {
        Self {
            operation_type: search.operation_type,
            property_kind: search.property_kind,
            city: search.city.clone(),
            neighborhoods: search.neighborhoods.clone().unwrap_or_default(),
            province: search.province.clone(),
            min_price: search.min_price,
            max_price: search.max_price,
            currency: search.currency,
            min_area: search.min_area,
            max_area: search.max_area,
            min_bedrooms: search.min_bedrooms,
            max_bedrooms: search.max_bedrooms,
            min_bathrooms: search.min_bathrooms,
        }
    }
}

/// A listing as it appears on a search result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub source: Portal,
    pub source_url: String,
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub thumbnail_url: Option<String>,
    pub location_preview: Option<String>,
}

/// One page of search results. An empty page or `has_next == false`
/// terminates the walk; the caller enforces any overall cap.
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    pub candidates: Vec<CandidateSummary>,
    pub has_next: bool,
}

/// Everything a detail page yields about a single listing.
#[derive(Debug, Clone, Default)]
pub struct ListingDetail {
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<PropertyKind>,
    pub operation_type: Option<OperationType>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub covered_area: Option<f64>,
    pub total_area: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub parking_spaces: Option<i64>,
    pub amenities: Vec<String>,
    pub agency: Option<String>,
    pub image_urls: Vec<String>,
}

/// A listing portal the engine can search and fetch details from.
#[async_trait]
pub trait PortalAdapter: Send + Sync {
    /// The portal this adapter serves.
    fn portal(&self) -> Portal;

    /// Fetch one page of search results. Pages are 1-indexed and
    /// restartable: the same page may be requested again.
    async fn search_page(&self, criteria: &SearchCriteria, page: u32) -> PortalResult<CandidatePage>;

    /// Fetch the full detail of a single listing.
    async fn fetch_detail(&self, url: &str) -> PortalResult<ListingDetail>;
}

/// Adapters keyed by portal. The engine resolves the owning adapter per
/// item; tests register scripted ones.
#[derive(Default)]
pub struct PortalRegistry {
    adapters: HashMap<Portal, Arc<dyn PortalAdapter>>,
}

impl PortalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn PortalAdapter>) {
        self.adapters.insert(adapter.portal(), adapter);
    }

    pub fn get(&self, portal: Portal) -> Option<Arc<dyn PortalAdapter>> {
        self.adapters.get(&portal).cloned()
    }

    pub fn portals(&self) -> Vec<Portal> {
        self.adapters.keys().copied().collect()
    }
}

impl std::fmt::Debug for PortalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalRegistry")
            .field("portals", &self.portals())
            .finish()
    }
}
