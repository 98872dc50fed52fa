use crate::error::{ExtractionError, SessionError};
use crate::models::{DebugCapture, ListingRecord};
use crate::scrapers::fields::extract_fields;
use crate::scrapers::images::first_room_image;
use crate::scrapers::navigator::Navigator;
use crate::scrapers::slug::normalize;
use crate::scrapers::traits::{PageSession, RoomClassifier, SessionLauncher};
use crate::scrapers::types::{Locator, Timings};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress of one extraction; anything after `SessionAcquired` ends in release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SessionAcquired,
    ProfileLoaded,
    ListingLoaded,
    FieldsExtracted,
    ImagesScanned,
}

/// Per-process settings for the extractor
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Credential callers must present
    pub endpoint_credential: String,
    /// Root that agent slugs are appended to
    pub profile_base_url: String,
    pub timings: Timings,
    /// Where page captures go when the listings section is missing
    pub debug_dir: Option<PathBuf>,
}

/// Turns an agent name into a `ListingRecord`, one browser session per call
pub struct ListingExtractor {
    launcher: Arc<dyn SessionLauncher>,
    classifier: Arc<dyn RoomClassifier>,
    locator: Arc<dyn Locator>,
    settings: ExtractorSettings,
}

impl ListingExtractor {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        classifier: Arc<dyn RoomClassifier>,
        locator: Arc<dyn Locator>,
        settings: ExtractorSettings,
    ) -> Self {
        Self {
            launcher,
            classifier,
            locator,
            settings,
        }
    }

    /// Validate the caller, then run the whole pipeline in a fresh session.
    ///
    /// The credential is checked before the identifier and both before any
    /// browser is started. Once a session exists it is released exactly once,
    /// whatever the outcome.
    pub async fn extract(
        &self,
        agent_identifier: Option<&str>,
        credential: Option<&str>,
    ) -> Result<ListingRecord, ExtractionError> {
        let expected = self.settings.endpoint_credential.as_bytes();
        let authorized = credential.is_some_and(|c| constant_time_eq(c.as_bytes(), expected));
        if !authorized {
            warn!("Rejected request with invalid credential");
            return Err(ExtractionError::AuthenticationFailed);
        }

        let raw = agent_identifier
            .filter(|name| !name.trim().is_empty())
            .ok_or(ExtractionError::MissingIdentifier)?;
        let slug = normalize(raw);
        info!("Extracting first listing for '{}' ({})", raw, slug);

        let session = self
            .launcher
            .launch()
            .await
            .map_err(launch_failed)?;
        debug!("Stage: {:?}", Stage::SessionAcquired);

        let result = self.run(session.as_ref(), &slug).await;

        if let Err(e) = session.release().await {
            warn!("Failed to release browser session: {}", e);
        }

        match &result {
            Ok(record) => info!(
                "Extraction for '{}' finished (room photo: {})",
                slug,
                record.first_room_image.is_some()
            ),
            Err(e) => warn!("Extraction for '{}' failed: {}", slug, e),
        }
        result
    }

    async fn run(
        &self,
        session: &dyn PageSession,
        slug: &str,
    ) -> Result<ListingRecord, ExtractionError> {
        let timings = self.settings.timings;
        let navigator = Navigator::new(session, self.locator.as_ref(), timings);

        navigator
            .open_profile(&self.settings.profile_base_url, slug)
            .await?;
        debug!("Stage: {:?}", Stage::ProfileLoaded);

        let listing = match navigator.first_listing(slug).await {
            Ok(listing) => listing,
            Err(e) => {
                if matches!(e, ExtractionError::ListingsSectionNotFound { .. }) {
                    self.capture(session, slug).await;
                }
                return Err(e);
            }
        };
        navigator.open_listing(&listing).await?;
        debug!("Stage: {:?}", Stage::ListingLoaded);

        let fields = extract_fields(session, self.locator.as_ref(), &timings).await;
        debug!("Stage: {:?}", Stage::FieldsExtracted);

        let first_room_image =
            first_room_image(session, self.locator.as_ref(), self.classifier.as_ref()).await;
        debug!("Stage: {:?}", Stage::ImagesScanned);

        Ok(ListingRecord {
            address: fields.address,
            days_on_market: fields.days_on_market,
            first_room_image,
        })
    }

    /// Save page HTML and a screenshot when debugging is on. Never fails the request.
    async fn capture(&self, session: &dyn PageSession, slug: &str) {
        let Some(dir) = self.settings.debug_dir.as_ref() else {
            return;
        };
        match save_capture(session, dir, slug).await {
            Ok(capture) => info!(
                "Saved debug capture for '{}' at {}: html={:?} screenshot={:?}",
                capture.slug, capture.captured_at, capture.html_path, capture.screenshot_path
            ),
            Err(e) => warn!("Could not save debug capture: {:#}", e),
        }
    }
}

fn launch_failed(e: SessionError) -> ExtractionError {
    ExtractionError::ExtractionFailed(anyhow::Error::new(e).context("Failed to launch browser"))
}

async fn save_capture(
    session: &dyn PageSession,
    dir: &Path,
    slug: &str,
) -> anyhow::Result<DebugCapture> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let captured_at = Utc::now();
    let stem = format!("{}-{}", slug, captured_at.format("%Y%m%dT%H%M%S"));
    let mut capture = DebugCapture {
        slug: slug.to_string(),
        html_path: None,
        screenshot_path: None,
        captured_at,
    };

    match session.page_html().await {
        Ok(html) => {
            let path = dir.join(format!("{stem}.html"));
            tokio::fs::write(&path, html).await?;
            capture.html_path = Some(path.display().to_string());
        }
        Err(e) => warn!("Could not read page HTML: {}", e),
    }

    match session.screenshot().await {
        Ok(png) => {
            let path = dir.join(format!("{stem}.png"));
            tokio::fs::write(&path, png).await?;
            capture.screenshot_path = Some(path.display().to_string());
        }
        Err(e) => warn!("Could not capture screenshot: {}", e),
    }

    Ok(capture)
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
