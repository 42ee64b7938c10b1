use super::dedup::{self, Classification};
use super::{ExecutionError, ExecutionSummary, Monitor};
use crate::portal::{CandidateSummary, PortalAdapter, PortalError, SearchCriteria};
use crate::{PendingProperty, PendingStatus, Portal, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

impl Monitor {
    /// Run one saved search: page through every configured portal,
    /// queue unseen candidates and bump the execution counters.
    /// `max_properties` caps how many candidates are examined across
    /// all portals. Deactivated searches still run when asked for
    /// directly; the active flag only gates [`Monitor::execute_all`].
    pub async fn execute_search(
        &self,
        search_id: i64,
        max_properties: Option<i64>,
    ) -> Result<ExecutionSummary> {
        let search = self.require_search(search_id).await?;
        let criteria = SearchCriteria::from(&search);
        let mut summary = ExecutionSummary::new(search_id);
        let mut new_rows: Vec<PendingProperty> = Vec::new();

        info!(search_id, name = %search.name, "executing saved search");

        for portal in search.portals.iter().copied() {
            let budget = max_properties.map(|cap| (cap - summary.total_found).max(0));
            if budget == Some(0) {
                break;
            }

            let Some(adapter) = self.registry().get(portal) else {
                warn!(%portal, "no adapter registered");
                summary.errors.push(ExecutionError {
                    portal,
                    message: "no adapter registered".to_string(),
                });
                continue;
            };

            let (candidates, portal_error) =
                self.collect_portal(adapter, &criteria, portal, budget).await;
            if let Some(err) = portal_error {
                warn!(%portal, error = %err, "portal search failed");
                summary.errors.push(ExecutionError { portal, message: err.to_string() });
            }

            for candidate in candidates {
                summary.total_found += 1;
                if candidate.source_url.trim().is_empty() {
                    summary.errors.push(ExecutionError {
                        portal,
                        message: "candidate has no url".to_string(),
                    });
                    continue;
                }
                match self.queue_candidate(search_id, &candidate).await? {
                    Some(row) => {
                        summary.new_properties += 1;
                        new_rows.push(row);
                    }
                    None => summary.duplicates += 1,
                }
            }
        }

        self.db()
            .record_execution(search_id, summary.new_properties, Utc::now())
            .await?;

        if search.auto_scrape && !new_rows.is_empty() {
            let cap = self.config().auto_scrape_cap.unwrap_or(new_rows.len());
            new_rows.truncate(cap);
            let batch = self.run_batch(new_rows).await?;
            summary.scraped = batch.scraped;
            summary.errors.extend(batch.errors);
        }
        summary.pending = summary.new_properties - summary.scraped;

        info!(
            search_id,
            found = summary.total_found,
            new = summary.new_properties,
            duplicates = summary.duplicates,
            scraped = summary.scraped,
            "execution finished"
        );

        Ok(summary)
    }

    /// Run every active saved search in turn. Portal trouble lands in
    /// the per-search summaries; only storage errors abort the sweep.
    pub async fn execute_all(&self, max_properties: Option<i64>) -> Result<Vec<ExecutionSummary>> {
        let searches = self.db().list_saved_searches(true).await?;
        let mut summaries = Vec::with_capacity(searches.len());
        for search in searches {
            let Some(id) = search.id else { continue };
            summaries.push(self.execute_search(id, max_properties).await?);
        }
        Ok(summaries)
    }

    /// Walk result pages until the portal reports no more, a page
    /// comes back empty, the page cap is hit, or `budget` candidates
    /// have been gathered. A failure on the first page loses the
    /// portal; later failures keep what was already collected.
    async fn collect_portal(
        &self,
        adapter: Arc<dyn PortalAdapter>,
        criteria: &SearchCriteria,
        portal: Portal,
        budget: Option<i64>,
    ) -> (Vec<CandidateSummary>, Option<PortalError>) {
        let mut collected = Vec::new();

        for page in 1..=self.config().max_pages_per_portal {
            let fetch = tokio::time::timeout(
                self.config().search_timeout,
                adapter.search_page(criteria, page),
            );
            let result = match fetch.await {
                Ok(result) => result,
                Err(_) => Err(PortalError::transient(portal, "search page timed out")),
            };

            let page_result = match result {
                Ok(page_result) => page_result,
                Err(err) => return (collected, Some(err)),
            };

            if page_result.candidates.is_empty() {
                break;
            }
            collected.extend(page_result.candidates);
            if let Some(budget) = budget {
                if collected.len() as i64 >= budget {
                    collected.truncate(budget.max(0) as usize);
                    break;
                }
            }
            if !page_result.has_next {
                break;
            }
            tokio::time::sleep(self.config().page_delay).await;
        }

        (collected, None)
    }

    /// Queue a candidate unless it is already known. Returns the
    /// inserted row for fresh candidates, None for duplicates.
    async fn queue_candidate(
        &self,
        search_id: i64,
        candidate: &CandidateSummary,
    ) -> Result<Option<PendingProperty>> {
        let normalized = dedup::normalize_url(&candidate.source_url);
        let classification = dedup::classify(
            self.db(),
            search_id,
            candidate.source,
            candidate.source_id.as_deref(),
            &normalized,
        )
        .await?;

        if classification != Classification::New {
            return Ok(None);
        }

        let now = Utc::now();
        let mut pending = PendingProperty {
            id: None,
            saved_search_id: search_id,
            source: candidate.source,
            source_id: candidate.source_id.clone(),
            source_url: normalized,
            title: candidate.title.clone(),
            price: candidate.price,
            currency: candidate.currency,
            thumbnail_url: candidate.thumbnail_url.clone(),
            location_preview: candidate.location_preview.clone(),
            status: PendingStatus::Pending,
            error_message: None,
            property_id: None,
            discovered_at: now,
            scraped_at: None,
            updated_at: now,
        };
        self.db().insert_pending(&mut pending).await?;
        Ok(Some(pending))
    }
}
