use crate::{PendingProperty, PendingStatus, Portal, Property, Result};
use sqlx::{sqlite::Sqlite, sqlite::SqlitePool, QueryBuilder};

pub struct PendingQueryBuilder<'a> {
    builder: QueryBuilder<'a, Sqlite>,
}

impl<'a> PendingQueryBuilder<'a> {
    pub fn new() -> Self {
        let builder = QueryBuilder::new("SELECT * FROM pending_properties WHERE 1=1");
        Self { builder }
    }

    pub fn new_count() -> Self {
        let builder = QueryBuilder::new("SELECT COUNT(*) FROM pending_properties WHERE 1=1");
        Self { builder }
    }

    pub fn with_search(mut self, search_id: Option<i64>) -> Self {
        if let Some(search_id) = search_id {
            self.builder.push(" AND saved_search_id = ");
            self.builder.push_bind(search_id);
        }
        self
    }

    pub fn with_status(mut self, status: Option<PendingStatus>) -> Self {
        if let Some(status) = status {
            self.builder.push(" AND status = ");
            self.builder.push_bind(status);
        }
        self
    }

    pub fn with_statuses(mut self, statuses: &[PendingStatus]) -> Self {
        if !statuses.is_empty() {
            self.builder.push(" AND status IN (");
            for (i, status) in statuses.iter().enumerate() {
                if i > 0 {
                    self.builder.push(", ");
                }
                self.builder.push_bind(*status);
            }
            self.builder.push(")");
        }
        self
    }

    pub fn with_portal(mut self, portal: Option<Portal>) -> Self {
        if let Some(portal) = portal {
            self.builder.push(" AND source = ");
            self.builder.push_bind(portal);
        }
        self
    }

    pub fn order_by_discovered(mut self, desc: bool) -> Self {
        self.builder.push(" ORDER BY discovered_at");
        if desc {
            self.builder.push(" DESC");
        }
        self
    }

    pub fn with_limit(mut self, limit: Option<i64>) -> Self {
        if let Some(limit) = limit {
            self.builder.push(" LIMIT ");
            self.builder.push_bind(limit);
        }
        self
    }

    pub fn with_offset(mut self, offset: Option<i64>) -> Self {
        if let Some(offset) = offset {
            self.builder.push(" OFFSET ");
            self.builder.push_bind(offset);
        }
        self
    }

    pub async fn execute(mut self, pool: &SqlitePool) -> Result<Vec<PendingProperty>> {
        let query = self.builder.build_query_as::<PendingProperty>();
        let rows = query.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn fetch_count(mut self, pool: &SqlitePool) -> Result<i64> {
        let query = self.builder.build_query_scalar::<i64>();
        let count = query.fetch_one(pool).await?;
        Ok(count)
    }
}

pub struct PropertyQueryBuilder<'a> {
    builder: QueryBuilder<'a, Sqlite>,
}

impl<'a> PropertyQueryBuilder<'a> {
    pub fn new() -> Self {
        let builder = QueryBuilder::new("SELECT * FROM properties WHERE 1=1");
        Self { builder }
    }

    pub fn new_count() -> Self {
        let builder = QueryBuilder::new("SELECT COUNT(*) FROM properties WHERE 1=1");
        Self { builder }
    }

    pub fn with_source(mut self, source: Option<Portal>) -> Self {
        if let Some(source) = source {
            self.builder.push(" AND source = ");
            self.builder.push_bind(source);
        }
        self
    }

    pub fn refreshable(mut self) -> Self {
        self.builder
            .push(" AND source_url IS NOT NULL AND source != 'manual' AND status != 'removed'");
        self
    }

    pub fn order_by_created(mut self, desc: bool) -> Self {
        self.builder.push(" ORDER BY created_at");
        if desc {
            self.builder.push(" DESC");
        }
        self
    }

    pub fn with_limit(mut self, limit: Option<i64>) -> Self {
        if let Some(limit) = limit {
            self.builder.push(" LIMIT ");
            self.builder.push_bind(limit);
        }
        self
    }

    pub fn with_offset(mut self, offset: Option<i64>) -> Self {
        if let Some(offset) = offset {
            self.builder.push(" OFFSET ");
            self.builder.push_bind(offset);
        }
        self
    }

    pub async fn execute(mut self, pool: &SqlitePool) -> Result<Vec<Property>> {
        let query = self.builder.build_query_as::<Property>();
        let rows = query.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn fetch_count(mut self, pool: &SqlitePool) -> Result<i64> {
        let query = self.builder.build_query_scalar::<i64>();
        let count = query.fetch_one(pool).await?;
        Ok(count)
    }
}
