use super::{Monitor, PriceChange, PriceObservation, PriceUpdateSummary, RescrapeSummary};
use crate::portal::PortalError;
use crate::{Currency, Portal, PriceHistoryEntry, Property, PropertyStatus, Result, VigiaError};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Quotes inside this band are noise, not a price move.
const PRICE_EPSILON: f64 = 0.01;
const UPDATE_RETRIES: usize = 3;

impl Monitor {
    /// Record a freshly observed price, and optionally a status, for a
    /// property. The price write is conditioned on the price we read,
    /// so concurrent observers serialize; each retry re-reads the
    /// current price.
    pub async fn observe(
        &self,
        property_id: i64,
        new_price: f64,
        currency: Currency,
        new_status: Option<PropertyStatus>,
    ) -> Result<PriceObservation> {
        let mut status_changed = false;
        if let Some(status) = new_status {
            let property = self.require_property(property_id).await?;
            if property.status != status {
                self.db()
                    .set_property_status(property_id, status, Utc::now())
                    .await?;
                info!(property_id, old = %property.status, new = %status, "status changed");
                status_changed = true;
            }
        }

        for _ in 0..UPDATE_RETRIES {
            let property = self.require_property(property_id).await?;
            let old_price = property.price;

            if (new_price - old_price).abs() <= PRICE_EPSILON {
                return Ok(PriceObservation {
                    price_change: None,
                    status_changed,
                });
            }

            let total_area = property.total_area.filter(|area| *area > 0.0);
            let price_per_sqm = total_area.map(|area| new_price / area);
            let now = Utc::now();

            let won = self
                .db()
                .conditional_price_update(property_id, old_price, new_price, currency, price_per_sqm, now)
                .await?;
            if !won {
                debug!(property_id, "price update lost the race, retrying");
                continue;
            }

            let change_percentage = if old_price == 0.0 {
                None
            } else {
                Some((new_price - old_price) / old_price * 100.0)
            };
            let mut entry = PriceHistoryEntry {
                id: None,
                property_id,
                price: new_price,
                previous_price: Some(old_price),
                currency,
                change_percentage,
                recorded_at: now,
            };
            self.db().record_price_history(&mut entry).await?;

            info!(property_id, old_price, new_price, "price changed");
            return Ok(PriceObservation {
                price_change: Some(PriceChange {
                    property_id,
                    old_price,
                    new_price,
                    currency,
                    change_percentage,
                }),
                status_changed,
            });
        }

        Err(VigiaError::Conflict(format!(
            "price update for property {property_id} kept losing races"
        )))
    }

    /// Re-fetch every refreshable property and record price moves.
    /// Individual fetch failures are tallied, not fatal.
    pub async fn update_all_prices(&self, portal: Option<Portal>) -> Result<PriceUpdateSummary> {
        let properties = self.db().list_refreshable_properties(portal).await?;
        let mut summary = PriceUpdateSummary::default();

        for property in properties {
            let Some(id) = property.id else { continue };
            summary.checked += 1;

            let detail = match self.fetch_current(&property).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(property_id = id, error = %err, "price check fetch failed");
                    summary.failed += 1;
                    continue;
                }
            };

            self.db().touch_scraped_at(id, Utc::now()).await?;

            let Some(price) = detail.price else {
                warn!(property_id = id, "no price on detail page");
                summary.failed += 1;
                continue;
            };
            let currency = detail.currency.unwrap_or(property.currency);

            match self.observe(id, price, currency, None).await {
                Ok(observation) => match observation.price_change {
                    Some(change) => {
                        summary.updated += 1;
                        summary.changes.push(change);
                    }
                    None => summary.unchanged += 1,
                },
                Err(VigiaError::Conflict(_)) | Err(VigiaError::NotFound(..)) => summary.failed += 1,
                Err(err) => return Err(err),
            }

            tokio::time::sleep(self.config().page_delay).await;
        }

        Ok(summary)
    }

    /// Full refresh of one property from its portal: price move
    /// recorded first, then the descriptive fields and images.
    pub async fn rescrape_property(&self, property_id: i64) -> Result<Property> {
        let property = self.require_property(property_id).await?;
        let mut detail = self.fetch_current(&property).await?;

        if let Some(price) = detail.price {
            let currency = detail.currency.unwrap_or(property.currency);
            self.observe(property_id, price, currency, None).await?;
        }

        let mut image_urls = std::mem::take(&mut detail.image_urls);
        image_urls.truncate(super::worker::MAX_IMAGES);

        // Re-read: the observation may have moved price and price_per_sqm.
        let mut current = self.require_property(property_id).await?;
        let now = Utc::now();
        if let Some(title) = detail.title {
            current.title = title;
        }
        if detail.description.is_some() {
            current.description = detail.description;
        }
        if detail.address.is_some() {
            current.address = detail.address;
        }
        if detail.neighborhood.is_some() {
            current.neighborhood = detail.neighborhood;
        }
        if let Some(city) = detail.city {
            current.city = city;
        }
        if let Some(province) = detail.province {
            current.province = province;
        }
        if detail.latitude.is_some() {
            current.latitude = detail.latitude;
        }
        if detail.longitude.is_some() {
            current.longitude = detail.longitude;
        }
        if detail.covered_area.is_some() {
            current.covered_area = detail.covered_area;
        }
        if detail.total_area.is_some() {
            current.total_area = detail.total_area;
        }
        if detail.bedrooms.is_some() {
            current.bedrooms = detail.bedrooms;
        }
        if detail.bathrooms.is_some() {
            current.bathrooms = detail.bathrooms;
        }
        if detail.parking_spaces.is_some() {
            current.parking_spaces = detail.parking_spaces;
        }
        if !detail.amenities.is_empty() {
            current.amenities = detail.amenities;
        }
        if detail.agency.is_some() {
            current.agency = detail.agency;
        }
        current.scraped_at = Some(now);
        current.updated_at = now;
        self.db().update_property(&current).await?;

        if !image_urls.is_empty() {
            self.db()
                .replace_property_images(property_id, &image_urls, now)
                .await?;
        }

        self.require_property(property_id).await
    }

    /// Rescrape the whole refreshable catalog, optionally one portal.
    pub async fn rescrape_all(&self, portal: Option<Portal>) -> Result<RescrapeSummary> {
        let properties = self.db().list_refreshable_properties(portal).await?;
        let mut summary = RescrapeSummary::default();

        for property in properties {
            let Some(id) = property.id else { continue };
            summary.attempted += 1;

            match self.rescrape_property(id).await {
                Ok(_) => summary.refreshed += 1,
                Err(VigiaError::Portal(err)) => {
                    warn!(property_id = id, error = %err, "rescrape failed");
                    summary.failed += 1;
                }
                Err(VigiaError::Validation(_) | VigiaError::Conflict(_) | VigiaError::NotFound(..)) => {
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }

            tokio::time::sleep(self.config().page_delay).await;
        }

        Ok(summary)
    }

    /// Detail fetch for an already-promoted property, with the same
    /// timeout the queue worker uses.
    async fn fetch_current(&self, property: &Property) -> Result<crate::portal::ListingDetail> {
        let Some(url) = property.source_url.as_deref() else {
            return Err(VigiaError::Validation(
                "property has no source url".to_string(),
            ));
        };
        if property.source == Portal::Manual {
            return Err(VigiaError::Validation(
                "manual properties have no portal to refresh from".to_string(),
            ));
        }
        let Some(adapter) = self.registry().get(property.source) else {
            return Err(VigiaError::Validation(format!(
                "no adapter registered for {}",
                property.source
            )));
        };

        let fetch = tokio::time::timeout(self.config().detail_timeout, adapter.fetch_detail(url));
        match fetch.await {
            Ok(Ok(detail)) => Ok(detail),
            Ok(Err(err)) => Err(VigiaError::Portal(err)),
            Err(_) => Err(VigiaError::Portal(PortalError::transient(
                property.source,
                "detail fetch timed out",
            ))),
        }
    }
}
