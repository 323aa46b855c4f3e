pub mod align;
pub mod clock;
pub mod compare;
pub mod config;
pub mod explorer;
pub mod filter;
pub mod kpi;
pub mod memo;
pub mod models;
pub mod navigation;
pub mod prefs;
pub mod render;
pub mod store;

pub use explorer::Explorer;
pub use store::{Store, StoreError};
