pub mod browser;
pub mod fields;
pub mod images;
pub mod navigator;
pub mod pipeline;
pub mod slug;
pub mod traits;
pub mod types;

/// In-memory stand-ins for the browser and classifier
#[cfg(test)]
pub mod testing;

pub use browser::ChromeLauncher;
pub use pipeline::{ExtractorSettings, ListingExtractor};
pub use types::{PinnedLayout, Timings};
