use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row};
use std::str::FromStr;

mod db;
mod display;
mod graph;
pub mod monitor;
pub mod portal;

pub use db::{Database, PendingFilter, PendingPage, PendingStats, PropertyPage, SearchStatusCount};
pub use display::{
    create_pending_table, create_property_table, create_search_table, create_stats_table,
    render_property_report,
};
pub use graph::PriceGraph;
pub use monitor::{
    BatchSummary, ExecutionError, ExecutionSummary, Monitor, MonitorConfig, PriceChange,
    PriceObservation, PriceUpdateSummary, RescrapeSummary, SavedSearchOverview, SavedSearchPatch,
    SavedSearchSpec, ScrapeOutcome,
};
pub use portal::{
    CandidatePage, CandidateSummary, ListingDetail, PortalAdapter, PortalError, PortalErrorKind,
    PortalRegistry, PortalResult, SearchCriteria,
};

pub type Result<T> = std::result::Result<T, VigiaError>;

#[derive(Debug, thiserror::Error)]
pub enum VigiaError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{0} {1} not found")]
    NotFound(&'static str, i64),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Portal error: {0}")]
    Portal(#[from] portal::PortalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Listing portals a saved search can monitor. `Manual` marks properties
/// entered by hand and never appears in a search's portal set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Argenprop,
    Zonaprop,
    Remax,
    Mercadolibre,
    Manual,
}

impl Portal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Portal::Argenprop => "argenprop",
            Portal::Zonaprop => "zonaprop",
            Portal::Remax => "remax",
            Portal::Mercadolibre => "mercadolibre",
            Portal::Manual => "manual",
        }
    }
}

impl std::fmt::Display for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Portal::Argenprop => write!(f, "Argenprop"),
            Portal::Zonaprop => write!(f, "Zonaprop"),
            Portal::Remax => write!(f, "Remax"),
            Portal::Mercadolibre => write!(f, "MercadoLibre"),
            Portal::Manual => write!(f, "Manual"),
        }
    }
}

impl FromStr for Portal {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argenprop" => Ok(Portal::Argenprop),
            "zonaprop" => Ok(Portal::Zonaprop),
            "remax" => Ok(Portal::Remax),
            "mercadolibre" | "meli" => Ok(Portal::Mercadolibre),
            "manual" => Ok(Portal::Manual),
            _ => Err(format!(
                "Invalid portal: {}. Valid options are: argenprop, zonaprop, remax, mercadolibre, manual",
                s
            )),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Portal {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Portal {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<Portal>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for Portal {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Casa,
    Ph,
    Departamento,
    Terreno,
    Local,
    Oficina,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Casa => "casa",
            PropertyKind::Ph => "ph",
            PropertyKind::Departamento => "departamento",
            PropertyKind::Terreno => "terreno",
            PropertyKind::Local => "local",
            PropertyKind::Oficina => "oficina",
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKind::Casa => write!(f, "Casa"),
            PropertyKind::Ph => write!(f, "PH"),
            PropertyKind::Departamento => write!(f, "Departamento"),
            PropertyKind::Terreno => write!(f, "Terreno"),
            PropertyKind::Local => write!(f, "Local"),
            PropertyKind::Oficina => write!(f, "Oficina"),
        }
    }
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "casa" | "casas" | "house" => Ok(PropertyKind::Casa),
            "ph" => Ok(PropertyKind::Ph),
            "departamento" | "departamentos" | "depto" | "apartment" => Ok(PropertyKind::Departamento),
            "terreno" | "terrenos" | "lote" | "land" => Ok(PropertyKind::Terreno),
            "local" | "locales" | "local-comercial" => Ok(PropertyKind::Local),
            "oficina" | "oficinas" | "office" => Ok(PropertyKind::Oficina),
            _ => Err(format!(
                "Invalid property kind: {}. Valid options are: casa, ph, departamento, terreno, local, oficina",
                s
            )),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for PropertyKind {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for PropertyKind {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<PropertyKind>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for PropertyKind {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Venta,
    Alquiler,
    AlquilerTemporal,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Venta => "venta",
            OperationType::Alquiler => "alquiler",
            OperationType::AlquilerTemporal => "alquiler_temporal",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Venta => write!(f, "Venta"),
            OperationType::Alquiler => write!(f, "Alquiler"),
            OperationType::AlquilerTemporal => write!(f, "Alquiler temporal"),
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "venta" | "sale" => Ok(OperationType::Venta),
            "alquiler" | "rent" => Ok(OperationType::Alquiler),
            "alquiler_temporal" | "alquiler-temporal" | "alquiler-temporario" | "temporal" => {
                Ok(OperationType::AlquilerTemporal)
            }
            _ => Err(format!(
                "Invalid operation type: {}. Valid options are: venta, alquiler, alquiler_temporal",
                s
            )),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for OperationType {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for OperationType {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<OperationType>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for OperationType {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ars,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ars => "ARS",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" | "u$s" | "us$" | "dolares" => Ok(Currency::Usd),
            "ars" | "ar$" | "pesos" => Ok(Currency::Ars),
            _ => Err(format!("Invalid currency: {}. Valid options are: USD, ARS", s)),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for Currency {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Currency {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<Currency>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for Currency {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Active,
    Sold,
    Rented,
    Reserved,
    Removed,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Active => "active",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Rented => "rented",
            PropertyStatus::Reserved => "reserved",
            PropertyStatus::Removed => "removed",
        }
    }
}

impl std::fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyStatus::Active => write!(f, "Active"),
            PropertyStatus::Sold => write!(f, "Sold"),
            PropertyStatus::Rented => write!(f, "Rented"),
            PropertyStatus::Reserved => write!(f, "Reserved"),
            PropertyStatus::Removed => write!(f, "Removed"),
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" | "activa" => Ok(PropertyStatus::Active),
            "sold" | "vendida" => Ok(PropertyStatus::Sold),
            "rented" | "alquilada" => Ok(PropertyStatus::Rented),
            "reserved" | "reservada" => Ok(PropertyStatus::Reserved),
            "removed" | "retirada" => Ok(PropertyStatus::Removed),
            _ => Err(format!(
                "Invalid property status: {}. Valid options are: active, sold, rented, reserved, removed",
                s
            )),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for PropertyStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for PropertyStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<PropertyStatus>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for PropertyStatus {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

/// Lifecycle of a queued discovery. `Scraped` and `Skipped` are terminal;
/// `Duplicate` is only ever assigned at insertion; `Error` rows stay
/// retryable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
    Scraped,
    Skipped,
    Error,
    Duplicate,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Scraped => "scraped",
            PendingStatus::Skipped => "skipped",
            PendingStatus::Error => "error",
            PendingStatus::Duplicate => "duplicate",
        }
    }
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingStatus::Pending => write!(f, "Pending"),
            PendingStatus::Scraped => write!(f, "Scraped"),
            PendingStatus::Skipped => write!(f, "Skipped"),
            PendingStatus::Error => write!(f, "Error"),
            PendingStatus::Duplicate => write!(f, "Duplicate"),
        }
    }
}

impl FromStr for PendingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PendingStatus::Pending),
            "scraped" => Ok(PendingStatus::Scraped),
            "skipped" => Ok(PendingStatus::Skipped),
            "error" => Ok(PendingStatus::Error),
            "duplicate" => Ok(PendingStatus::Duplicate),
            _ => Err(format!(
                "Invalid pending status: {}. Valid options are: pending, scraped, skipped, error, duplicate",
                s
            )),
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for PendingStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for PendingStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let text = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(text.parse::<PendingStatus>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Sqlite> for PendingStatus {
    fn encode_by_ref(&self, args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'_>>) -> sqlx::encode::IsNull {
        args.push(sqlx::sqlite::SqliteArgumentValue::Text(self.as_str().into()));
        sqlx::encode::IsNull::No
    }
}

/// A stored search configuration executed against one or more portals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: Option<i64>,
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
    pub is_active: bool,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub total_executions: i64,
    pub total_properties_found: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// portals and neighborhoods live in TEXT columns as JSON
impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for SavedSearch {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let portals_json: String = row.try_get("portals")?;
        let portals: Vec<Portal> = serde_json::from_str(&portals_json)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let neighborhoods_json: Option<String> = row.try_get("neighborhoods")?;
        let neighborhoods = neighborhoods_json
            .map(|json| serde_json::from_str::<Vec<String>>(&json))
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(SavedSearch {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            portals,
            property_kind: row.try_get("property_kind")?,
            operation_type: row.try_get("operation_type")?,
            city: row.try_get("city")?,
            neighborhoods,
            province: row.try_get("province")?,
            min_price: row.try_get("min_price")?,
            max_price: row.try_get("max_price")?,
            currency: row.try_get("currency")?,
            min_area: row.try_get("min_area")?,
            max_area: row.try_get("max_area")?,
            min_bedrooms: row.try_get("min_bedrooms")?,
            max_bedrooms: row.try_get("max_bedrooms")?,
            min_bathrooms: row.try_get("min_bathrooms")?,
            auto_scrape: row.try_get("auto_scrape")?,
            is_active: row.try_get("is_active")?,
            last_executed_at: row.try_get("last_executed_at")?,
            total_executions: row.try_get("total_executions")?,
            total_properties_found: row.try_get("total_properties_found")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A listing discovered by a search execution, queued for scraping.
/// `property_id` is set exactly when the row reaches `Scraped`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingProperty {
    pub id: Option<i64>,
    pub saved_search_id: i64,
    pub source: Portal,
    pub source_id: Option<String>,
    pub source_url: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub thumbnail_url: Option<String>,
    pub location_preview: Option<String>,
    pub status: PendingStatus,
    pub error_message: Option<String>,
    pub property_id: Option<i64>,
    pub discovered_at: DateTime<Utc>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Option<i64>,
    pub source: Portal,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub kind: PropertyKind,
    pub operation_type: OperationType,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub currency: Currency,
    pub price_per_sqm: Option<f64>,
    pub address: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub province: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub covered_area: Option<f64>,
    pub total_area: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub parking_spaces: Option<i64>,
    pub amenities: Vec<String>,
    pub agency: Option<String>,
    pub status: PropertyStatus,
    pub scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// amenities live in a TEXT column as a JSON array, NULL meaning none
impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for Property {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let amenities_json: Option<String> = row.try_get("amenities")?;
        let amenities = amenities_json
            .map(|json| serde_json::from_str::<Vec<String>>(&json))
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .unwrap_or_default();

        Ok(Property {
            id: row.try_get("id")?,
            source: row.try_get("source")?,
            source_id: row.try_get("source_id")?,
            source_url: row.try_get("source_url")?,
            kind: row.try_get("kind")?,
            operation_type: row.try_get("operation_type")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            currency: row.try_get("currency")?,
            price_per_sqm: row.try_get("price_per_sqm")?,
            address: row.try_get("address")?,
            neighborhood: row.try_get("neighborhood")?,
            city: row.try_get("city")?,
            province: row.try_get("province")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            covered_area: row.try_get("covered_area")?,
            total_area: row.try_get("total_area")?,
            bedrooms: row.try_get("bedrooms")?,
            bathrooms: row.try_get("bathrooms")?,
            parking_spaces: row.try_get("parking_spaces")?,
            amenities,
            agency: row.try_get("agency")?,
            status: row.try_get("status")?,
            scraped_at: row.try_get("scraped_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PropertyImage {
    pub id: Option<i64>,
    pub property_id: i64,
    pub url: String,
    pub is_primary: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// One observation in a property's append-only price history. The first
/// entry of a property has no `previous_price`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceHistoryEntry {
    pub id: Option<i64>,
    pub property_id: i64,
    pub price: f64,
    pub previous_price: Option<f64>,
    pub currency: Currency,
    pub change_percentage: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
