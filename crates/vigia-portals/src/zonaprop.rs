use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use vigia_core::{
    CandidatePage, CandidateSummary, Currency, ListingDetail, Portal, PortalAdapter, PortalError,
    PortalResult, SearchCriteria,
};

use crate::parse::{self, FeatureMiner};

const BASE_URL: &str = "https://www.zonaprop.com.ar";

/// Zonaprop folds the whole search into one hyphen-joined `.html` path
/// (`/departamentos-venta-palermo-0-150000-dolar.html`) and paginates
/// with `?pagina=N`. Listing ids are the 7+ digit tail of the slug.
#[derive(Debug)]
pub struct ZonapropAdapter {
    client: Client,
    base_url: String,
    listing_id: Regex,
    digit_run: Regex,
    location_heading: Regex,
    features: FeatureMiner,
}

impl ZonapropAdapter {
    pub fn new(timeout: Duration) -> PortalResult<Self> {
        Self::with_base_url(timeout, BASE_URL)
    }

    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> PortalResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(parse::USER_AGENT)
            .build()
            .map_err(|e| PortalError::permanent(Portal::Zonaprop, e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            listing_id: parse::compile(Portal::Zonaprop, r"-(\d{7,})\.html")?,
            digit_run: parse::compile(Portal::Zonaprop, r"(\d{7,})")?,
            location_heading: parse::compile(Portal::Zonaprop, parse::LOCATION_PATTERN)?,
            features: FeatureMiner::new(Portal::Zonaprop)?,
        })
    }

    fn parse_selector(selector: &str) -> PortalResult<Selector> {
        Selector::parse(selector)
            .map_err(|e| PortalError::permanent(Portal::Zonaprop, format!("bad selector: {e}")))
    }

    fn card_selectors() -> PortalResult<(
        Selector, // posting card
        Selector, // link
        Selector, // title
        Selector, // price
        Selector, // location
        Selector, // thumbnail
    )> {
        Ok((
            Self::parse_selector("div[data-qa=\"posting PROPERTY\"], div.postingCard")?,
            Self::parse_selector("a[href]")?,
            Self::parse_selector("[data-qa=\"POSTING_CARD_TITLE\"], h2")?,
            Self::parse_selector("[data-qa=\"POSTING_CARD_PRICE\"], .firstPrice")?,
            Self::parse_selector("[data-qa=\"POSTING_CARD_LOCATION\"], .postingCardlocation")?,
            Self::parse_selector("img")?,
        ))
    }

    async fn fetch_page(&self, url: &str) -> PortalResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| parse::classify_request_error(Portal::Zonaprop, &e))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PortalError::permanent(
                Portal::Zonaprop,
                format!("HTTP {status} for {url}"),
            ));
        }
        if !status.is_success() {
            return Err(PortalError::transient(
                Portal::Zonaprop,
                format!("HTTP {status} for {url}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| parse::classify_request_error(Portal::Zonaprop, &e))
    }

    fn build_search_url(&self, criteria: &SearchCriteria, page: u32) -> String {
        let mut parts = vec![
            parse::kind_segment(criteria.property_kind).to_string(),
            parse::operation_segment(criteria.operation_type).to_string(),
            self.location_segment(criteria),
        ];

        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            let currency = match criteria.currency {
                Currency::Usd => "dolar",
                Currency::Ars => "peso",
            };
            let min = criteria.min_price.unwrap_or(0.0) as i64;
            let max = criteria.max_price.unwrap_or(99_999_999.0) as i64;
            parts.push(format!("{min}-{max}-{currency}"));
        }
        if criteria.min_area.is_some() || criteria.max_area.is_some() {
            let min = criteria.min_area.unwrap_or(0.0) as i64;
            let max = criteria.max_area.unwrap_or(9_999.0) as i64;
            parts.push(format!("{min}-{max}-m2-cubiertos"));
        }
        match (criteria.min_bedrooms, criteria.max_bedrooms) {
            (Some(min), Some(max)) if min == max => parts.push(format!("{min}-ambientes")),
            (Some(min), Some(max)) => parts.push(format!("{min}-a-{max}-ambientes")),
            (Some(min), None) => parts.push(format!("{min}-ambientes-o-mas")),
            _ => {}
        }

        let mut url = format!("{}/{}.html", self.base_url, parts.join("-"));
        if page > 1 {
            url.push_str(&format!("?pagina={page}"));
        }
        url
    }

    fn location_segment(&self, criteria: &SearchCriteria) -> String {
        if let Some(neighborhood) = criteria.neighborhoods.first() {
            return parse::slugify(neighborhood);
        }
        let place = criteria
            .city
            .as_deref()
            .or(criteria.province.as_deref())
            .unwrap_or("capital federal");
        match place.to_lowercase().as_str() {
            "capital federal" | "caba" | "buenos aires" | "ciudad de buenos aires" => {
                "capital-federal".to_string()
            }
            "zona norte" => "zona-norte-buenos-aires".to_string(),
            "zona sur" => "zona-sur-buenos-aires".to_string(),
            "zona oeste" => "zona-oeste-buenos-aires".to_string(),
            other => parse::slugify(other),
        }
    }

    fn extract_listing_id(&self, url: &str) -> Option<String> {
        self.listing_id
            .captures(url)
            .or_else(|| self.digit_run.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn parse_search_page(&self, html: &str) -> PortalResult<CandidatePage> {
        let document = Html::parse_document(html);
        let (card, link, title, price, location, thumbnail) = Self::card_selectors()?;

        let mut candidates = Vec::new();
        for item in document.select(&card) {
            // The card itself carries the listing path; anchors are a
            // fallback for older markup.
            let href = item
                .value()
                .attr("data-to-posting")
                .map(|path| path.to_string())
                .or_else(|| {
                    item.select(&link)
                        .filter_map(|el| el.value().attr("href"))
                        .find(|href| href.contains(".html"))
                        .map(|href| href.to_string())
                });
            let Some(href) = href else {
                continue;
            };
            let source_url = if href.starts_with("http") {
                href
            } else {
                format!("{}{}", self.base_url, href)
            };

            let (amount, currency) = item
                .select(&price)
                .next()
                .map(|el| parse::parse_price(&parse::element_text(el)))
                .unwrap_or((None, None));

            candidates.push(CandidateSummary {
                source: Portal::Zonaprop,
                source_id: self.extract_listing_id(&source_url),
                title: parse::first_text(item, &title),
                price: amount,
                currency,
                thumbnail_url: item
                    .select(&thumbnail)
                    .next()
                    .and_then(|el| {
                        el.value()
                            .attr("src")
                            .or_else(|| el.value().attr("data-src"))
                            .or_else(|| el.value().attr("data-flickity-lazyload"))
                    })
                    .and_then(|src| parse::normalize_image_url(src, None)),
                location_preview: parse::first_text(item, &location),
                source_url,
            });
        }

        let has_next = document
            .select(&Self::parse_selector("a[data-qa=\"PAGING_NEXT\"]")?)
            .next()
            .is_some();

        Ok(CandidatePage { candidates, has_next })
    }

    fn parse_detail(&self, html: &str, url: &str) -> PortalResult<ListingDetail> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let page_url = Url::parse(url).ok();

        let title = parse::first_text(root, &Self::parse_selector("h1")?);
        let description = parse::first_text(
            root,
            &Self::parse_selector(
                "[data-qa=\"POSTING_DESCRIPTION\"], #longDescription, [class*=\"description\"]",
            )?,
        );

        let (price, currency) = parse::first_text(
            root,
            &Self::parse_selector("[data-qa=\"PRICE\"], .price-value, [class*=\"price\"]")?,
        )
        .as_deref()
        .map(parse::parse_price)
        .unwrap_or((None, None));

        let (neighborhood, city, province) = self.extract_location(root)?;

        let mined = self.features.mine(&format!(
            "{} {}",
            title.as_deref().unwrap_or_default(),
            description.as_deref().unwrap_or_default()
        ));

        Ok(ListingDetail {
            source_id: self.extract_listing_id(url),
            kind: parse::kind_from_url(url),
            operation_type: parse::operation_from_url(url),
            address: parse::first_text(
                root,
                &Self::parse_selector("[data-qa=\"POSTING_LOCATION\"], [class*=\"address\"]")?,
            ),
            amenities: parse::find_amenities(description.as_deref().unwrap_or_default()),
            agency: parse::first_text(
                root,
                &Self::parse_selector("[data-qa=\"POSTING_PUBLISHER\"], [class*=\"publisher\"]")?,
            ),
            latitude: None,
            longitude: None,
            bedrooms: mined.bedrooms,
            bathrooms: mined.bathrooms,
            parking_spaces: mined.parking_spaces,
            covered_area: mined.covered_area,
            total_area: mined.total_area,
            image_urls: Self::extract_images(root, page_url.as_ref())?,
            title,
            description,
            price,
            currency,
            neighborhood,
            city,
            province,
        })
    }

    fn extract_location(
        &self,
        root: ElementRef<'_>,
    ) -> PortalResult<(Option<String>, Option<String>, Option<String>)> {
        let headings = Self::parse_selector("h2, h4")?;
        for element in root.select(&headings) {
            let text = parse::element_text(element);
            if text.len() < 10 || text.len() > 150 {
                continue;
            }
            if let Some(caps) = self.location_heading.captures(&text) {
                let neighborhood = caps.get(1).map(|m| m.as_str().trim().to_string());
                let city = caps.get(2).map(|m| m.as_str().trim().to_string());
                let province = city.as_deref().and_then(|city| {
                    city.to_lowercase()
                        .contains("capital federal")
                        .then(|| "Capital Federal".to_string())
                });
                return Ok((neighborhood, city, province));
            }
        }
        Ok((None, None, None))
    }

    fn extract_images(root: ElementRef<'_>, page_url: Option<&Url>) -> PortalResult<Vec<String>> {
        let gallery = Self::parse_selector(
            "[data-qa*=\"gallery\"] img, .gallery img, img[data-flickity-lazyload]",
        )?;

        let mut urls = Vec::new();
        for img in root.select(&gallery) {
            let attrs = img.value();
            let Some(raw) = attrs
                .attr("src")
                .or_else(|| attrs.attr("data-src"))
                .or_else(|| attrs.attr("data-flickity-lazyload"))
            else {
                continue;
            };
            if let Some(normalized) = parse::normalize_image_url(raw, page_url) {
                urls.push(normalized);
            }
        }

        let mut urls = parse::dedup_urls(urls);
        urls.truncate(parse::MAX_DETAIL_IMAGES);
        Ok(urls)
    }
}

#[async_trait]
impl PortalAdapter for ZonapropAdapter {
    fn portal(&self) -> Portal {
        Portal::Zonaprop
    }

    async fn search_page(&self, criteria: &SearchCriteria, page: u32) -> PortalResult<CandidatePage> {
        let url = self.build_search_url(criteria, page);
        info!("zonaprop: searching page {page}: {url}");
        let html = self.fetch_page(&url).await?;
        self.parse_search_page(&html)
    }

    async fn fetch_detail(&self, url: &str) -> PortalResult<ListingDetail> {
        debug!("zonaprop: fetching detail {url}");
        let html = self.fetch_page(url).await?;
        self.parse_detail(&html, url)
    }
}
