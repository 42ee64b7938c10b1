#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigia_core::{
    CandidatePage, CandidateSummary, Currency, Database, ListingDetail, Monitor, MonitorConfig,
    OperationType, PendingProperty, PendingStatus, Portal, PortalAdapter, PortalError,
    PortalRegistry, PortalResult, Property, PropertyKind, PropertyStatus, SavedSearchSpec,
    SearchCriteria,
};

/// Scripted portal. Pages and details are keyed responses; a detail
/// scripted more than once is consumed in order and the last response
/// repeats for every later fetch.
pub struct StubPortal {
    portal: Portal,
    pages: Mutex<HashMap<u32, PortalResult<CandidatePage>>>,
    details: Mutex<HashMap<String, VecDeque<PortalResult<ListingDetail>>>>,
    search_delay: Mutex<Option<Duration>>,
    detail_delay: Mutex<Option<Duration>>,
    detail_urls: Mutex<Vec<String>>,
}

impl StubPortal {
    pub fn new(portal: Portal) -> Self {
        Self {
            portal,
            pages: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            search_delay: Mutex::new(None),
            detail_delay: Mutex::new(None),
            detail_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page(self, page: u32, result: PortalResult<CandidatePage>) -> Self {
        self.set_page(page, result);
        self
    }

    pub fn with_detail(self, url: &str, result: PortalResult<ListingDetail>) -> Self {
        self.push_detail(url, result);
        self
    }

    pub fn with_search_delay(self, delay: Duration) -> Self {
        *self.search_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_detail_delay(self, delay: Duration) -> Self {
        *self.detail_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn set_page(&self, page: u32, result: PortalResult<CandidatePage>) {
        self.pages.lock().unwrap().insert(page, result);
    }

    pub fn push_detail(&self, url: &str, result: PortalResult<ListingDetail>) {
        self.details
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    /// Every detail URL fetched, in order.
    pub fn detail_fetches(&self) -> Vec<String> {
        self.detail_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PortalAdapter for StubPortal {
    fn portal(&self) -> Portal {
        self.portal
    }

    async fn search_page(
        &self,
        _criteria: &SearchCriteria,
        page: u32,
    ) -> PortalResult<CandidatePage> {
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.pages.lock().unwrap().get(&page).cloned();
        scripted.unwrap_or_else(|| Ok(CandidatePage::default()))
    }

    async fn fetch_detail(&self, url: &str) -> PortalResult<ListingDetail> {
        self.detail_urls.lock().unwrap().push(url.to_string());
        let delay = *self.detail_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = {
            let mut details = self.details.lock().unwrap();
            match details.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        scripted.unwrap_or_else(|| {
            Err(PortalError::permanent(
                self.portal,
                format!("no detail scripted for {url}"),
            ))
        })
    }
}

pub fn candidate_url(portal: Portal, id: &str) -> String {
    format!("https://example.com/{}/{id}", portal.as_str())
}

pub fn candidate(portal: Portal, id: &str) -> CandidateSummary {
    CandidateSummary {
        source: portal,
        source_url: candidate_url(portal, id),
        source_id: Some(id.to_string()),
        title: Some(format!("Listing {id}")),
        price: Some(100_000.0),
        currency: Some(Currency::Usd),
        thumbnail_url: None,
        location_preview: Some("Palermo, Capital Federal".to_string()),
    }
}

/// A bare card with no portal id, identified only by its URL.
pub fn candidate_at(portal: Portal, url: &str) -> CandidateSummary {
    CandidateSummary {
        source: portal,
        source_url: url.to_string(),
        source_id: None,
        title: None,
        price: None,
        currency: None,
        thumbnail_url: None,
        location_preview: None,
    }
}

pub fn page_of(candidates: Vec<CandidateSummary>, has_next: bool) -> CandidatePage {
    CandidatePage { candidates, has_next }
}

pub fn detail_with_price(price: f64) -> ListingDetail {
    ListingDetail {
        title: Some("Departamento 3 ambientes".to_string()),
        description: Some("Luminoso, con balcón a la calle".to_string()),
        price: Some(price),
        currency: Some(Currency::Usd),
        neighborhood: Some("Palermo".to_string()),
        city: Some("Capital Federal".to_string()),
        covered_area: Some(75.0),
        total_area: Some(80.0),
        bedrooms: Some(2),
        bathrooms: Some(1),
        amenities: vec!["balcón".to_string()],
        image_urls: vec![
            "https://img.example.com/1.jpg".to_string(),
            "https://img.example.com/2.jpg".to_string(),
        ],
        ..Default::default()
    }
}

pub fn search_spec(name: &str, portals: Vec<Portal>) -> SavedSearchSpec {
    SavedSearchSpec {
        name: name.to_string(),
        description: None,
        portals,
        property_kind: None,
        operation_type: OperationType::Venta,
        city: Some("Capital Federal".to_string()),
        neighborhoods: None,
        province: None,
        min_price: None,
        max_price: None,
        currency: Currency::Usd,
        min_area: None,
        max_area: None,
        min_bedrooms: None,
        max_bedrooms: None,
        min_bathrooms: None,
        auto_scrape: false,
    }
}

/// Default config with the politeness delay removed so tests do not
/// sleep between pages and catalog entries.
pub fn fast_config() -> MonitorConfig {
    MonitorConfig {
        page_delay: Duration::ZERO,
        ..Default::default()
    }
}

pub async fn monitor_with(adapters: Vec<Arc<StubPortal>>) -> Monitor {
    monitor_with_config(adapters, fast_config()).await
}

pub async fn monitor_with_config(adapters: Vec<Arc<StubPortal>>, config: MonitorConfig) -> Monitor {
    let db = Database::open_in_memory().await.unwrap();
    let mut registry = PortalRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    Monitor::with_config(db, registry, config)
}

pub async fn create_search(monitor: &Monitor, name: &str, portals: Vec<Portal>) -> i64 {
    monitor
        .create_saved_search(search_spec(name, portals))
        .await
        .unwrap()
        .id
        .unwrap()
}

pub async fn seed_pending(
    db: &Database,
    search_id: i64,
    portal: Portal,
    source_id: &str,
    status: PendingStatus,
    discovered_at: DateTime<Utc>,
) -> i64 {
    let mut row = PendingProperty {
        id: None,
        saved_search_id: search_id,
        source: portal,
        source_id: Some(source_id.to_string()),
        source_url: candidate_url(portal, source_id),
        title: Some(format!("Listing {source_id}")),
        price: Some(100_000.0),
        currency: Some(Currency::Usd),
        thumbnail_url: None,
        location_preview: None,
        status,
        error_message: None,
        property_id: None,
        discovered_at,
        scraped_at: None,
        updated_at: discovered_at,
    };
    db.insert_pending(&mut row).await.unwrap();
    row.id.unwrap()
}

pub fn property(portal: Portal, source_id: &str, price: f64) -> Property {
    let now = Utc::now();
    Property {
        id: None,
        source: portal,
        source_id: Some(source_id.to_string()),
        source_url: Some(candidate_url(portal, source_id)),
        kind: PropertyKind::Departamento,
        operation_type: OperationType::Venta,
        title: format!("Listing {source_id}"),
        description: None,
        price,
        currency: Currency::Usd,
        price_per_sqm: None,
        address: None,
        neighborhood: Some("Palermo".to_string()),
        city: "Capital Federal".to_string(),
        province: "Buenos Aires".to_string(),
        latitude: None,
        longitude: None,
        covered_area: None,
        total_area: None,
        bedrooms: None,
        bathrooms: None,
        parking_spaces: None,
        amenities: Vec::new(),
        agency: None,
        status: PropertyStatus::Active,
        scraped_at: None,
        created_at: now,
        updated_at: now,
    }
}
