use crate::db::PendingStats;
use crate::graph::PriceGraph;
use crate::monitor::SavedSearchOverview;
use crate::{Currency, PendingProperty, PriceHistoryEntry, Property, PropertyImage};
use chrono::{DateTime, Utc};
use colored::Colorize;
use tabled::settings::{object::Columns, Modify, Style, Width};
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub struct SearchTableRow {
    #[tabled(rename = "ID", display_with = "display_right_4")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Portals")]
    pub portals: String,
    #[tabled(rename = "Operation")]
    pub operation: String,
    #[tabled(rename = "Active")]
    pub active: String,
    #[tabled(rename = "Auto")]
    pub auto: String,
    #[tabled(rename = "Pending", display_with = "display_right_7")]
    pub pending: String,
    #[tabled(rename = "Last run")]
    pub last_run: String,
}

#[derive(Tabled)]
pub struct PendingTableRow {
    #[tabled(rename = "ID", display_with = "display_right_4")]
    pub id: String,
    #[tabled(rename = "Search", display_with = "display_right_6")]
    pub search: String,
    #[tabled(rename = "Portal")]
    pub portal: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Price", display_with = "display_right_10")]
    pub price: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Discovered")]
    pub discovered: String,
}

#[derive(Tabled)]
pub struct PropertyTableRow {
    #[tabled(rename = "ID", display_with = "display_right_4")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Price", display_with = "display_right_10")]
    pub price: String,
    #[tabled(rename = "Size (m²)", display_with = "display_right_8")]
    pub size: String,
    #[tabled(rename = "Beds", display_with = "display_right_4")]
    pub beds: String,
    #[tabled(rename = "Neighborhood")]
    pub neighborhood: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Tabled)]
pub struct StatsTableRow {
    #[tabled(rename = "Search")]
    pub search: String,
    #[tabled(rename = "Pending", display_with = "display_right_7")]
    pub pending: String,
    #[tabled(rename = "Total", display_with = "display_right_7")]
    pub total: String,
}

fn display_right_4(s: &str) -> String {
    format!("{:>4}", s)
}

fn display_right_6(s: &str) -> String {
    format!("{:>6}", s)
}

fn display_right_7(s: &str) -> String {
    format!("{:>7}", s)
}

fn display_right_8(s: &str) -> String {
    format!("{:>8}", s)
}

fn display_right_10(s: &str) -> String {
    format!("{:>10}", s)
}

fn format_price(price: f64, currency: Currency) -> String {
    format!("{} {}k", currency.as_str(), (price / 1000.0).round() as i64)
}

fn format_when(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

impl SearchTableRow {
    pub fn from_overview(overview: &SavedSearchOverview) -> Self {
        let search = &overview.search;
        let portals = search
            .portals
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");

        Self {
            id: search.id.map(|id| id.to_string()).unwrap_or_default(),
            name: search.name.clone(),
            portals,
            operation: search.operation_type.to_string(),
            active: if search.is_active { "yes" } else { "no" }.to_string(),
            auto: if search.auto_scrape { "yes" } else { "no" }.to_string(),
            pending: overview.pending_count.to_string(),
            last_run: format_when(search.last_executed_at),
        }
    }
}

impl PendingTableRow {
    pub fn from_pending(pending: &PendingProperty) -> Self {
        let price = match (pending.price, pending.currency) {
            (Some(price), Some(currency)) => format_price(price, currency),
            (Some(price), None) => format!("{}k", (price / 1000.0).round() as i64),
            _ => "N/A".to_string(),
        };

        Self {
            id: pending.id.map(|id| id.to_string()).unwrap_or_default(),
            search: pending.saved_search_id.to_string(),
            portal: pending.source.to_string(),
            status: pending.status.to_string(),
            price,
            title: pending.title.clone().unwrap_or_else(|| "N/A".to_string()),
            discovered: format_when(Some(pending.discovered_at)),
        }
    }
}

impl PropertyTableRow {
    pub fn from_property(property: &Property) -> Self {
        let size = property.total_area.or(property.covered_area)
            .map(|s| format!("{}m²", s.round() as i64))
            .unwrap_or_else(|| "N/A".to_string());

        let beds = property.bedrooms
            .map(|b| b.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            id: property.id.map(|id| id.to_string()).unwrap_or_default(),
            title: property.title.clone(),
            price: format_price(property.price, property.currency),
            size,
            beds,
            neighborhood: property.neighborhood.clone().unwrap_or_else(|| "N/A".to_string()),
            status: property.status.to_string(),
        }
    }
}

pub fn create_search_table(overviews: &[SavedSearchOverview]) -> String {
    let rows: Vec<SearchTableRow> = overviews.iter().map(SearchTableRow::from_overview).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(1)).with(Width::truncate(24)))
        .with(Modify::new(Columns::single(2)).with(Width::truncate(22)));

    table.to_string()
}

pub fn create_pending_table(pending: &[PendingProperty]) -> String {
    let rows: Vec<PendingTableRow> = pending.iter().map(PendingTableRow::from_pending).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(5)).with(Width::truncate(40)))
        .with(Modify::new(Columns::single(6)).with(Width::truncate(16)));

    table.to_string()
}

pub fn create_property_table(properties: &[Property]) -> String {
    let rows: Vec<PropertyTableRow> =
        properties.iter().map(PropertyTableRow::from_property).collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(1)).with(Width::truncate(40)))
        .with(Modify::new(Columns::single(5)).with(Width::truncate(18)));

    table.to_string()
}

pub fn create_stats_table(stats: &PendingStats) -> String {
    let rows: Vec<StatsTableRow> = stats
        .by_search
        .iter()
        .map(|entry| StatsTableRow {
            search: format!("{} (#{})", entry.name, entry.search_id),
            pending: entry.pending.to_string(),
            total: entry.total.to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::modern())
        .with(Modify::new(Columns::single(0)).with(Width::truncate(32)));

    table.to_string()
}

/// Multi-line report for one property, with its price history plotted.
pub fn render_property_report(
    property: &Property,
    images: &[PropertyImage],
    history: &[PriceHistoryEntry],
) -> String {
    let mut result = String::new();

    result.push_str(&format!(
        "{} - {}\n",
        property.title.bold(),
        format_price(property.price, property.currency)
    ));

    let size_str = property.total_area.or(property.covered_area)
        .map(|s| format!("{}m²", s.round() as i64))
        .unwrap_or_else(|| "N/A".to_string());

    let beds_str = property.bedrooms
        .map(|b| format!("{} bed", b))
        .unwrap_or_else(|| "N/A".to_string());

    let location = [
        property.neighborhood.as_deref(),
        Some(property.city.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");

    result.push_str(&format!("{} - {}, {}\n", location, size_str, beds_str));
    result.push_str(&format!(
        "{} {} | {} | {}\n",
        property.operation_type,
        property.kind,
        property.source,
        property.status
    ));

    if let Some(address) = &property.address {
        result.push_str(&format!("Address: {}\n", address));
    }
    if let Some(agency) = &property.agency {
        result.push_str(&format!("Agency: {}\n", agency));
    }
    if let Some(per_sqm) = property.price_per_sqm {
        result.push_str(&format!("Per m²: {} {:.0}\n", property.currency.as_str(), per_sqm));
    }
    if let Some(url) = &property.source_url {
        result.push_str(&format!("URL: {}\n", url));
    }
    if !property.amenities.is_empty() {
        result.push_str(&format!("Amenities: {}\n", property.amenities.join(", ")));
    }
    if !images.is_empty() {
        result.push_str(&format!("Images: {}\n", images.len()));
    }

    if !history.is_empty() {
        result.push_str("\nPrice History:\n");
        result.push_str(&PriceGraph::from_history(history).to_ascii_graph(40, 5));
        result.push('\n');
    }

    result
}
