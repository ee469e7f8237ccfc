pub mod marking;
pub mod payload;
pub mod registry;
pub mod summary;

#[cfg(test)]
pub mod test_support;

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

/// Source of "now" for marking and for resolving "today".
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}
