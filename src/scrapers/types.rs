use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number of gallery positions scanned for a room photo
pub const MAX_IMAGE_CANDIDATES: usize = 5;

/// Elements the pipeline needs to find on the source pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Container holding the agent's listings on the profile page
    ListingsSection,
    /// First entry inside the listings section
    FirstListing,
    /// Street address on the listing detail page
    Address,
    /// Days-on-market cell (third row of the details table)
    DaysOnMarket,
    /// Gallery image at a 1-based position
    GalleryImage(usize),
}

/// Maps a role to the structural path used to query it
pub trait Locator: Send + Sync {
    fn path(&self, role: Role) -> String;
}

/// XPath expressions pinned to the observed source layout
///
/// Any redesign of the source site invalidates these. They can be replaced
/// without a rebuild by loading a JSON file with the same keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinnedLayout {
    pub listings_section: String,
    /// Relative to `listings_section`
    pub first_listing: String,
    pub address: String,
    pub days_on_market: String,
    /// Gallery image path with a `{n}` placeholder for the position
    pub gallery_image: String,
}

impl Default for PinnedLayout {
    fn default() -> Self {
        Self {
            listings_section: "/html/body/div[1]/main/div[2]/section[2]/div[2]".to_string(),
            first_listing: "div[1]/div[1]".to_string(),
            address: "/html/body/div[1]/main/div[1]/div[2]/div[1]/div[1]/h1".to_string(),
            days_on_market:
                "/html/body/div[1]/main/div[3]/div[1]/section[1]/table/tbody/tr[3]/td[2]"
                    .to_string(),
            gallery_image: "/html/body/div[1]/main/div[1]/div[1]/div/div[{n}]//img".to_string(),
        }
    }
}

impl PinnedLayout {
    /// Load a layout override from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse layout file {}", path.display()))
    }
}

impl Locator for PinnedLayout {
    fn path(&self, role: Role) -> String {
        match role {
            Role::ListingsSection => self.listings_section.clone(),
            Role::FirstListing => format!("{}/{}", self.listings_section, self.first_listing),
            Role::Address => self.address.clone(),
            Role::DaysOnMarket => self.days_on_market.clone(),
            Role::GalleryImage(n) => self.gallery_image.replace("{n}", &n.to_string()),
        }
    }
}

/// Waiting budget for one extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Budget for page loads and post-click transitions
    pub navigation_timeout: Duration,
    /// Pause before the single retry of a missing element
    pub grace: Duration,
    /// How often the URL is sampled while waiting for a transition
    pub transition_poll: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            grace: Duration::from_secs(2),
            transition_poll: Duration::from_millis(250),
        }
    }
}
