use crate::PriceHistoryEntry;
use chrono::{DateTime, Utc};
use rasciigraph::{plot, Config};
use serde::{Deserialize, Serialize};

/// Price points for one property, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceGraph {
    pub prices: Vec<(f64, DateTime<Utc>)>,
}

impl PriceGraph {
    pub fn new(prices: Vec<(f64, DateTime<Utc>)>) -> Self {
        Self { prices }
    }

    pub fn from_history(history: &[PriceHistoryEntry]) -> Self {
        Self {
            prices: history
                .iter()
                .map(|entry| (entry.price, entry.recorded_at))
                .collect(),
        }
    }

    pub fn to_ascii_graph(&self, width: usize, height: usize) -> String {
        if self.prices.is_empty() {
            return "No hist".to_string();
        }

        // Plot in thousands, rounded, so the axis stays narrow
        let prices: Vec<f64> = self.prices.iter()
            .map(|(price, _)| (*price / 1000.0).round())
            .collect();

        let config = Config::default()
            .with_width(width as u32)
            .with_height(height as u32);
        let graph = plot(prices, config);

        // Pad every line to the requested width
        graph.lines()
            .map(|line| format!("{:width$}", line, width = width))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
