//! Domain types shared across the pipeline stages.

pub mod panel;

pub use panel::{BarRecord, PanelError, PricePanel};
