// src/analyze/budget.rs
//! Per-UTC-day cap on classifier calls.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};

use super::{Enricher, Enrichment};

pub const DEFAULT_DAILY_LIMIT: u32 = 200;

type Today = Box<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn new(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }

    /// Rolls over on a new day, then claims one call if budget remains.
    fn try_take(&mut self, today: NaiveDate, limit: u32) -> bool {
        if self.date != today {
            *self = DailyCounter::new(today);
        }
        if self.count >= limit {
            return false;
        }
        self.count = self.count.saturating_add(1);
        true
    }
}

/// Wraps another enricher; once the day's budget is spent every item is a `Skip`.
pub struct BudgetedEnricher {
    inner: Arc<dyn Enricher>,
    daily_limit: u32,
    today: Today,
    counter: Mutex<DailyCounter>,
}

impl BudgetedEnricher {
    pub fn new(inner: Arc<dyn Enricher>, daily_limit: u32) -> Self {
        Self::with_clock(inner, daily_limit, || Utc::now().date_naive())
    }

    pub fn with_clock(
        inner: Arc<dyn Enricher>,
        daily_limit: u32,
        today: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> Self {
        let start = today();
        Self {
            inner,
            daily_limit,
            today: Box::new(today),
            counter: Mutex::new(DailyCounter::new(start)),
        }
    }

    /// Calls already spent today.
    pub fn used(&self) -> u32 {
        let c = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if c.date == (self.today)() {
            c.count
        } else {
            0
        }
    }

    fn take(&self) -> bool {
        let today = (self.today)();
        let mut c = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        c.try_take(today, self.daily_limit)
    }
}

#[async_trait]
impl Enricher for BudgetedEnricher {
    async fn classify(&self, title: &str, body: &str) -> Enrichment {
        if !self.take() {
            tracing::warn!(limit = self.daily_limit, enricher = self.inner.name(), "daily classification budget spent");
            return Enrichment::Skip;
        }
        self.inner.classify(title, body).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
