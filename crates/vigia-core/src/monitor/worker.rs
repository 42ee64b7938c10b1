use super::{BatchSummary, ExecutionError, Monitor, ScrapeOutcome};
use crate::portal::ListingDetail;
use crate::{
    Currency, OperationType, PendingProperty, PendingStatus, Portal, PriceHistoryEntry, Property,
    PropertyKind, PropertyStatus, Result,
};
use chrono::Utc;
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub(crate) const MAX_IMAGES: usize = 20;
const MAX_ERROR_LEN: usize = 500;

enum TaskOutcome {
    Scraped,
    Settled,
    Failed(Portal, String),
    Deferred,
}

impl Monitor {
    /// Fetch the detail page for one queued row and promote it to a
    /// full property. Works from `pending` and retries `error` rows;
    /// anything already settled is left alone.
    pub async fn scrape_single(&self, pending_id: i64) -> Result<ScrapeOutcome> {
        let pending = self.get_pending(pending_id).await?;
        if !matches!(pending.status, PendingStatus::Pending | PendingStatus::Error) {
            return Ok(ScrapeOutcome::AlreadyResolved { status: pending.status });
        }

        let Some(adapter) = self.registry().get(pending.source) else {
            return self.fail_pending(pending_id, "no adapter registered").await;
        };

        debug!(pending_id, url = %pending.source_url, "fetching detail page");
        let fetch = tokio::time::timeout(
            self.config().detail_timeout,
            adapter.fetch_detail(&pending.source_url),
        );
        let mut detail = match fetch.await {
            Ok(Ok(detail)) => detail,
            Ok(Err(err)) => return self.fail_pending(pending_id, &err.to_string()).await,
            Err(_) => return self.fail_pending(pending_id, "detail fetch timed out").await,
        };

        let mut image_urls = std::mem::take(&mut detail.image_urls);
        image_urls.truncate(MAX_IMAGES);

        let Some(mut property) = build_property(&pending, detail) else {
            return self.fail_pending(pending_id, "listing has no price").await;
        };

        let (property_id, created) = self.db().upsert_property(&mut property).await?;

        if created {
            self.db()
                .replace_property_images(property_id, &image_urls, property.updated_at)
                .await?;
            let mut initial = PriceHistoryEntry {
                id: None,
                property_id,
                price: property.price,
                previous_price: None,
                currency: property.currency,
                change_percentage: None,
                recorded_at: property.updated_at,
            };
            self.db().record_price_history(&mut initial).await?;
        }

        if self.db().mark_scraped(pending_id, property_id, Utc::now()).await? {
            Ok(ScrapeOutcome::Scraped { property_id })
        } else {
            // Someone resolved the row while we were fetching.
            let status = self
                .db()
                .get_pending(pending_id)
                .await?
                .map(|row| row.status)
                .unwrap_or(PendingStatus::Skipped);
            Ok(ScrapeOutcome::AlreadyResolved { status })
        }
    }

    /// Scrape eligible rows, oldest first. `include_errors` requeues
    /// failed rows alongside fresh ones.
    pub async fn scrape_batch(
        &self,
        search_id: Option<i64>,
        limit: i64,
        include_errors: bool,
    ) -> Result<BatchSummary> {
        let rows = self
            .db()
            .next_scrape_batch(search_id, limit, include_errors)
            .await?;
        self.run_batch(rows).await
    }

    /// Drive a set of queued rows through [`Monitor::scrape_single`]
    /// with a per-portal concurrency window. Rows that have not been
    /// dispatched when the batch deadline passes are deferred, still
    /// queued for next time.
    pub(crate) async fn run_batch(&self, rows: Vec<PendingProperty>) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        if rows.is_empty() {
            return Ok(summary);
        }

        let deadline = self.config().batch_deadline.map(|limit| Instant::now() + limit);
        let mut semaphores: HashMap<Portal, Arc<Semaphore>> = HashMap::new();
        for row in &rows {
            semaphores
                .entry(row.source)
                .or_insert_with(|| Arc::new(Semaphore::new(self.config().per_portal_concurrency)));
        }
        let window = self
            .config()
            .per_portal_concurrency
            .saturating_mul(semaphores.len())
            .max(1);

        let tasks: Vec<_> = rows
            .into_iter()
            .filter_map(|row| {
                let pending_id = row.id?;
                let portal = row.source;
                let semaphore = Arc::clone(semaphores.get(&portal)?);
                Some(async move {
                    if past(deadline) {
                        return Ok(TaskOutcome::Deferred);
                    }
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return Ok(TaskOutcome::Deferred),
                    };
                    if past(deadline) {
                        return Ok(TaskOutcome::Deferred);
                    }
                    match self.scrape_single(pending_id).await {
                        Ok(ScrapeOutcome::Scraped { .. }) => Ok(TaskOutcome::Scraped),
                        Ok(ScrapeOutcome::AlreadyResolved { .. }) => Ok(TaskOutcome::Settled),
                        Ok(ScrapeOutcome::Failed { message }) => {
                            Ok(TaskOutcome::Failed(portal, message))
                        }
                        Err(err) => Err(err),
                    }
                })
            })
            .collect();

        let results: Vec<Result<TaskOutcome>> =
            stream::iter(tasks).buffer_unordered(window).collect().await;

        for result in results {
            match result? {
                TaskOutcome::Scraped => {
                    summary.attempted += 1;
                    summary.scraped += 1;
                }
                TaskOutcome::Settled => {
                    summary.attempted += 1;
                    summary.skipped += 1;
                }
                TaskOutcome::Failed(portal, message) => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    warn!(%portal, %message, "scrape failed");
                    summary.errors.push(ExecutionError { portal, message });
                }
                TaskOutcome::Deferred => summary.deferred += 1,
            }
        }

        Ok(summary)
    }

    async fn fail_pending(&self, pending_id: i64, message: &str) -> Result<ScrapeOutcome> {
        let clipped = clip_error(message);
        self.db().mark_error(pending_id, &clipped, Utc::now()).await?;
        Ok(ScrapeOutcome::Failed { message: clipped })
    }
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn clip_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_LEN).collect()
}

/// Merge the queue row and the fetched detail into a property row.
/// Returns None when no price could be read; a listing without a
/// price cannot be tracked.
fn build_property(pending: &PendingProperty, detail: ListingDetail) -> Option<Property> {
    let price = detail.price?;
    let now = Utc::now();

    let total_area = detail.total_area.filter(|area| *area > 0.0);
    let price_per_sqm = total_area.map(|area| price / area);

    Some(Property {
        id: None,
        source: pending.source,
        source_id: detail.source_id.or_else(|| pending.source_id.clone()),
        source_url: Some(pending.source_url.clone()),
        kind: detail.kind.unwrap_or(PropertyKind::Departamento),
        operation_type: detail.operation_type.unwrap_or(OperationType::Venta),
        title: detail
            .title
            .or_else(|| pending.title.clone())
            .unwrap_or_else(|| "Sin título".to_string()),
        description: detail.description,
        price,
        currency: detail.currency.or(pending.currency).unwrap_or(Currency::Usd),
        price_per_sqm,
        address: detail.address,
        neighborhood: detail.neighborhood,
        city: detail.city.unwrap_or_else(|| "Buenos Aires".to_string()),
        province: detail.province.unwrap_or_else(|| "Buenos Aires".to_string()),
        latitude: detail.latitude,
        longitude: detail.longitude,
        covered_area: detail.covered_area,
        total_area: detail.total_area,
        bedrooms: detail.bedrooms,
        bathrooms: detail.bathrooms,
        parking_spaces: detail.parking_spaces,
        amenities: detail.amenities,
        agency: detail.agency,
        status: PropertyStatus::Active,
        scraped_at: Some(now),
        created_at: now,
        updated_at: now,
    })
}
