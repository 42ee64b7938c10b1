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

const BASE_URL: &str = "https://www.argenprop.com";

/// Argenprop publishes searches as slash-joined path segments
/// (`/departamentos/venta/palermo/dolares-0-150000`) with pagination as
/// a `?pagina-N` suffix.
#[derive(Debug)]
pub struct ArgenpropAdapter {
    client: Client,
    base_url: String,
    listing_id: Regex,
    location_heading: Regex,
    features: FeatureMiner,
}

impl ArgenpropAdapter {
    pub fn new(timeout: Duration) -> PortalResult<Self> {
        Self::with_base_url(timeout, BASE_URL)
    }

    /// Tests point this at fixture servers; everything else goes
    /// through [`ArgenpropAdapter::new`].
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> PortalResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(parse::USER_AGENT)
            .build()
            .map_err(|e| PortalError::permanent(Portal::Argenprop, e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            listing_id: parse::compile(Portal::Argenprop, r"/(\d+)(?:[/-]|$)")?,
            location_heading: parse::compile(Portal::Argenprop, parse::LOCATION_PATTERN)?,
            features: FeatureMiner::new(Portal::Argenprop)?,
        })
    }

    fn parse_selector(selector: &str) -> PortalResult<Selector> {
        Selector::parse(selector)
            .map_err(|e| PortalError::permanent(Portal::Argenprop, format!("bad selector: {e}")))
    }

    fn card_selectors() -> PortalResult<(
        Selector, // listing item
        Selector, // link
        Selector, // title
        Selector, // price
        Selector, // address
        Selector, // thumbnail
    )> {
        Ok((
            Self::parse_selector("div.listing__item")?,
            Self::parse_selector("a.card, a.card__link")?,
            Self::parse_selector(".card__title")?,
            Self::parse_selector(".card__price")?,
            Self::parse_selector(".card__address")?,
            Self::parse_selector(".card__photos img, img.card__photo")?,
        ))
    }

    async fn fetch_page(&self, url: &str) -> PortalResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| parse::classify_request_error(Portal::Argenprop, &e))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PortalError::permanent(
                Portal::Argenprop,
                format!("HTTP {status} for {url}"),
            ));
        }
        if !status.is_success() {
            return Err(PortalError::transient(
                Portal::Argenprop,
                format!("HTTP {status} for {url}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| parse::classify_request_error(Portal::Argenprop, &e))
    }

    fn build_search_url(&self, criteria: &SearchCriteria, page: u32) -> String {
        let mut segments = vec![
            parse::kind_segment(criteria.property_kind).to_string(),
            parse::operation_segment(criteria.operation_type).to_string(),
            self.location_segment(criteria),
        ];

        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            let currency = match criteria.currency {
                Currency::Usd => "dolares",
                Currency::Ars => "pesos",
            };
            let min = criteria.min_price.unwrap_or(0.0) as i64;
            let max = criteria.max_price.unwrap_or(999_999_999.0) as i64;
            segments.push(format!("{currency}-{min}-{max}"));
        }

        let mut url = format!("{}/{}", self.base_url, segments.join("/"));
        if page > 1 {
            url.push_str(&format!("?pagina-{page}"));
        }
        url
    }

    // A neighborhood narrows the search more than the city does, so it
    // takes the location slot when present.
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
            other => parse::slugify(other),
        }
    }

    fn extract_listing_id(&self, url: &str) -> Option<String> {
        if let Some(caps) = self.listing_id.captures(url) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
        // Slug URLs end in "...-en-palermo--14123456".
        url.trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit('-').next())
            .filter(|tail| !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()))
            .map(|tail| tail.to_string())
    }

    fn parse_search_page(&self, html: &str) -> PortalResult<CandidatePage> {
        let document = Html::parse_document(html);
        let (card, link, title, price, address, thumbnail) = Self::card_selectors()?;

        let mut candidates = Vec::new();
        for item in document.select(&card) {
            let Some(href) = item
                .select(&link)
                .next()
                .and_then(|el| el.value().attr("href"))
            else {
                continue;
            };
            let source_url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", self.base_url, href)
            };

            let (amount, currency) = item
                .select(&price)
                .next()
                .map(|el| parse::parse_price(&parse::element_text(el)))
                .unwrap_or((None, None));

            candidates.push(CandidateSummary {
                source: Portal::Argenprop,
                source_id: self.extract_listing_id(&source_url),
                title: parse::first_text(item, &title),
                price: amount,
                currency,
                thumbnail_url: item
                    .select(&thumbnail)
                    .next()
                    .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
                    .and_then(|src| parse::normalize_image_url(src, None)),
                location_preview: parse::first_text(item, &address),
                source_url,
            });
        }

        Ok(CandidatePage {
            has_next: Self::has_next_page(&document)?,
            candidates,
        })
    }

    fn has_next_page(document: &Html) -> PortalResult<bool> {
        // A disabled next button still renders on the last page.
        let disabled = document
            .select(&Self::parse_selector(
                ".pagination__page-next.pagination__page--disable",
            )?)
            .next()
            .is_some();
        if disabled {
            debug!("argenprop: next page button disabled, stopping");
            return Ok(false);
        }

        Ok(document
            .select(&Self::parse_selector(".pagination__page-next")?)
            .next()
            .is_some())
    }

    fn parse_detail(&self, html: &str, url: &str) -> PortalResult<ListingDetail> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let page_url = Url::parse(url).ok();

        let title = parse::first_text(root, &Self::parse_selector("h1")?);
        let description = parse::first_text(
            root,
            &Self::parse_selector(".section-description, [class*=\"description\"]")?,
        );

        let (price, currency) = parse::first_text(
            root,
            &Self::parse_selector(".titlebar__price, .price, [class*=\"price\"]")?,
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
                &Self::parse_selector(".titlebar__address, [class*=\"address\"]")?,
            ),
            amenities: parse::find_amenities(description.as_deref().unwrap_or_default()),
            agency: parse::first_text(
                root,
                &Self::parse_selector(".form-details__agency-name, [class*=\"agency\"]")?,
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
        let headings = Self::parse_selector("h2, h3")?;
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
            ".gallery img, [class*=\"gallery\"] img, .simple-carousel img, img[data-lazy]",
        )?;

        let mut urls = Vec::new();
        for img in root.select(&gallery) {
            let attrs = img.value();
            let Some(raw) = attrs
                .attr("src")
                .or_else(|| attrs.attr("data-src"))
                .or_else(|| attrs.attr("data-original"))
                .or_else(|| attrs.attr("data-lazy"))
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
impl PortalAdapter for ArgenpropAdapter {
    fn portal(&self) -> Portal {
        Portal::Argenprop
    }

    async fn search_page(&self, criteria: &SearchCriteria, page: u32) -> PortalResult<CandidatePage> {
        let url = self.build_search_url(criteria, page);
        info!("argenprop: searching page {page}: {url}");
        let html = self.fetch_page(&url).await?;
        self.parse_search_page(&html)
    }

    async fn fetch_detail(&self, url: &str) -> PortalResult<ListingDetail> {
        debug!("argenprop: fetching detail {url}");
        let html = self.fetch_page(url).await?;
        self.parse_detail(&html, url)
    }
}
