use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::Config;
use crate::service::{
    Clock, marking::MarkingService, registry::Registry, summary::SummaryService,
};
use crate::store::AttendanceStore;

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub registry: Registry,
    pub marking: MarkingService,
    pub summary: SummaryService,
    pub bulk_max_items: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>, config: &Config, clock: Clock) -> Self {
        Self {
            registry: Registry::new(store.clone()),
            marking: MarkingService::new(store.clone(), clock),
            summary: SummaryService::new(store),
            bulk_max_items: config.bulk_max_items,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.marking.today()
    }
}
