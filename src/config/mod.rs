//! Settings loading.

mod settings;

pub use settings::Settings;
