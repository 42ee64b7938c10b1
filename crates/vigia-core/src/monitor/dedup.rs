use crate::db::Database;
use crate::{Portal, Result};
use url::Url;

/// Where a discovered candidate already lives, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classification {
    New,
    KnownProperty(i64),
    AlreadyQueued(i64),
}

/// Properties are checked across the whole catalog; queue rows only
/// within the executing search, so two searches can each track the
/// same listing.
pub(crate) async fn classify(
    db: &Database,
    search_id: i64,
    source: Portal,
    source_id: Option<&str>,
    source_url: &str,
) -> Result<Classification> {
    if let Some(source_id) = source_id {
        if let Some(property) = db.find_property_by_source_id(source, source_id).await? {
            return Ok(Classification::KnownProperty(property.id.unwrap_or(0)));
        }
        if let Some(pending) = db.find_pending_by_source_id(search_id, source, source_id).await? {
            return Ok(Classification::AlreadyQueued(pending.id.unwrap_or(0)));
        }
        return Ok(Classification::New);
    }

    if let Some(property) = db.find_property_by_url(source, source_url).await? {
        return Ok(Classification::KnownProperty(property.id.unwrap_or(0)));
    }
    if let Some(pending) = db.find_pending_by_url(search_id, source, source_url).await? {
        return Ok(Classification::AlreadyQueued(pending.id.unwrap_or(0)));
    }
    Ok(Classification::New)
}

/// Canonical form of a listing URL: no query, no fragment, no
/// trailing slash. Scheme and host come out lowercased by the parser.
/// Unparseable input is kept as-is so it can still act as a dedup key.
pub(crate) fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    url.set_query(None);
    url.set_fragment(None);
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }
    url.to_string()
}
