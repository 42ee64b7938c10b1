//! Text helpers shared by every adapter: price strings, URL slugs and
//! the feature mining both portals need.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use url::Url;
use vigia_core::{Currency, OperationType, Portal, PortalError, PortalResult, PropertyKind};

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Detail pages routinely carry 100+ gallery entries; only the first
/// few are worth keeping.
pub(crate) const MAX_DETAIL_IMAGES: usize = 20;

/// Matches "Venta en Palermo, Capital Federal" style headings, which
/// both portals use on detail pages.
pub(crate) const LOCATION_PATTERN: &str =
    r"(?i)(?:venta|alquiler(?:\s+temporario)?)\s+en\s+([^,]+),\s*(.+)";

pub(crate) fn compile(portal: Portal, pattern: &str) -> PortalResult<Regex> {
    Regex::new(pattern).map_err(|e| PortalError::permanent(portal, format!("bad pattern: {e}")))
}

pub(crate) fn classify_request_error(portal: Portal, err: &reqwest::Error) -> PortalError {
    if err.is_builder() {
        PortalError::permanent(portal, err.to_string())
    } else {
        PortalError::transient(portal, err.to_string())
    }
}

/// Pulls an amount and a currency out of a raw portal price string.
///
/// Portals format prices inconsistently ("USD 150.000", "$ 85.000,50",
/// "U$S 1.500"), so separator roles are inferred: repeated separators
/// are thousands marks, a two-digit tail after a comma is decimals.
/// "Consultar precio" and friends yield `(None, None)`.
pub(crate) fn parse_price(text: &str) -> (Option<f64>, Option<Currency>) {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() {
        return (None, None);
    }

    let currency = if upper.contains("USD") || upper.contains("U$S") || upper.contains("US$") {
        Some(Currency::Usd)
    } else if upper.contains("ARS") || upper.contains("AR$") || upper.contains('$') {
        Some(Currency::Ars)
    } else {
        None
    };

    let Some(run) = first_number_run(&upper) else {
        return (None, currency);
    };

    (normalize_separators(&run).parse::<f64>().ok(), currency)
}

fn first_number_run(text: &str) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let run = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    Some(run)
}

fn normalize_separators(number: &str) -> String {
    let mut n = number.to_string();
    if n.matches('.').count() > 1 {
        n = n.replace('.', "");
    }
    if n.matches(',').count() > 1 {
        n = n.replace(',', "");
    }

    match (n.find('.'), n.find(',')) {
        (Some(dot), Some(comma)) => {
            if comma < dot {
                n.replace(',', "")
            } else {
                n.replace('.', "").replace(',', ".")
            }
        }
        (None, Some(_)) => {
            let parts: Vec<&str> = n.split(',').collect();
            if parts.len() == 2 && parts[1].len() == 2 {
                n.replace(',', ".")
            } else {
                n.replace(',', "")
            }
        }
        (Some(_), None) => {
            let tail_len = n.split('.').next_back().map(str::len).unwrap_or(0);
            if tail_len == 3 {
                n.replace('.', "")
            } else {
                n
            }
        }
        (None, None) => n,
    }
}

/// Lowercases and strips accents the way portal URL paths expect:
/// "Núñez" becomes "nunez", "Villa Crespo" becomes "villa-crespo".
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match c {
            'á' => slug.push('a'),
            'é' => slug.push('e'),
            'í' => slug.push('i'),
            'ó' => slug.push('o'),
            'ú' | 'ü' => slug.push('u'),
            'ñ' => slug.push('n'),
            c if c.is_ascii_alphanumeric() => slug.push(c),
            _ => {
                if !slug.ends_with('-') {
                    slug.push('-');
                }
            }
        }
    }
    slug.trim_matches('-').to_string()
}

pub(crate) fn kind_segment(kind: Option<PropertyKind>) -> &'static str {
    match kind {
        Some(PropertyKind::Casa) => "casas",
        Some(PropertyKind::Ph) => "ph",
        Some(PropertyKind::Terreno) => "terrenos",
        Some(PropertyKind::Local) => "locales-comerciales",
        Some(PropertyKind::Oficina) => "oficinas",
        Some(PropertyKind::Departamento) | None => "departamentos",
    }
}

pub(crate) fn operation_segment(operation: OperationType) -> &'static str {
    match operation {
        OperationType::Venta => "venta",
        OperationType::Alquiler => "alquiler",
        OperationType::AlquilerTemporal => "alquiler-temporario",
    }
}

/// Listing URLs encode kind and operation as path words, which is more
/// reliable than anything on the page itself.
pub(crate) fn kind_from_url(url: &str) -> Option<PropertyKind> {
    let lower = url.to_lowercase();
    if lower.contains("departamento") || lower.contains("depto") {
        Some(PropertyKind::Departamento)
    } else if lower.contains("casa") {
        Some(PropertyKind::Casa)
    } else if lower.contains("-ph-") || lower.contains("/ph-") || lower.contains("/ph/") {
        Some(PropertyKind::Ph)
    } else if lower.contains("terreno") || lower.contains("lote") {
        Some(PropertyKind::Terreno)
    } else if lower.contains("local") {
        Some(PropertyKind::Local)
    } else if lower.contains("oficina") {
        Some(PropertyKind::Oficina)
    } else {
        None
    }
}

pub(crate) fn operation_from_url(url: &str) -> Option<OperationType> {
    let lower = url.to_lowercase();
    if lower.contains("alquiler-temporario") || lower.contains("temporal") {
        Some(OperationType::AlquilerTemporal)
    } else if lower.contains("alquiler") {
        Some(OperationType::Alquiler)
    } else if lower.contains("venta") {
        Some(OperationType::Venta)
    } else {
        None
    }
}

const AMENITY_KEYWORDS: [&str; 10] = [
    "pileta", "piscina", "gimnasio", "seguridad", "parrilla", "balcón", "terraza", "jardín",
    "quincho", "sum",
];

pub(crate) fn find_amenities(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    AMENITY_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(**keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

/// Mines room counts and areas out of free text. Detail pages bury
/// these in the title and description rather than structured markup.
#[derive(Debug)]
pub(crate) struct FeatureMiner {
    // Tried in order: an explicit bedroom count beats a room count.
    bedroom_patterns: Vec<Regex>,
    bathrooms: Regex,
    parking: Regex,
    covered_area: Regex,
    total_area: Regex,
}

#[derive(Debug, Default)]
pub(crate) struct MinedFeatures {
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub parking_spaces: Option<i64>,
    pub covered_area: Option<f64>,
    pub total_area: Option<f64>,
}

impl FeatureMiner {
    pub(crate) fn new(portal: Portal) -> PortalResult<Self> {
        Ok(Self {
            bedroom_patterns: vec![
                compile(portal, r"(?i)(\d+)\s*dormitorios?\b")?,
                compile(portal, r"(?i)(\d+)\s*ambientes?\b")?,
                compile(portal, r"(?i)(\d+)\s*cuartos?\b")?,
            ],
            bathrooms: compile(portal, r"(?i)(\d+)\s*baños?\b")?,
            parking: compile(portal, r"(?i)(\d+)\s*(?:cocheras?|garages?|estacionamientos?)\b")?,
            covered_area: compile(
                portal,
                r"(?i)(\d+(?:[.,]\d+)?)\s*(?:m2|m²|mts2|metros)?\s*cubiert",
            )?,
            total_area: compile(
                portal,
                r"(?i)(\d+(?:[.,]\d+)?)\s*(?:m2|m²|mts2|metros)?\s*(?:total|terreno)",
            )?,
        })
    }

    pub(crate) fn mine(&self, text: &str) -> MinedFeatures {
        MinedFeatures {
            bedrooms: self
                .bedroom_patterns
                .iter()
                .find_map(|pattern| capture_i64(pattern, text)),
            bathrooms: capture_i64(&self.bathrooms, text),
            parking_spaces: capture_i64(&self.parking, text),
            covered_area: capture_f64(&self.covered_area, text),
            total_area: capture_f64(&self.total_area, text),
        }
    }
}

fn capture_i64(pattern: &Regex, text: &str) -> Option<i64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn capture_f64(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Cleans one raw image reference. Tracking pixels, inline data URIs
/// and placeholder art are dropped; protocol-relative and page-relative
/// references are made absolute.
pub(crate) fn normalize_image_url(raw: &str, page_url: Option<&Url>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("data:") || trimmed.contains("placeholder") {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if trimmed.starts_with("http") {
        return Some(trimmed.to_string());
    }
    page_url?.join(trimmed).ok().map(|joined| joined.to_string())
}

pub(crate) fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}
