use crate::error::{ExtractionError, SessionError};
use crate::scrapers::traits::{ElementHandle, PageSession};
use crate::scrapers::types::{Locator, Role, Timings};
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Attributes that may carry the listing link, in the order they are tried
const LINK_ATTRIBUTES: [&str; 2] = ["href", "data-href"];

/// Result of one way of getting from the listing card to its detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Detail page is loaded
    Navigated,
    /// Strategy has nothing to work with on this element
    NotApplicable,
}

/// One way of opening the listing detail page from its card
#[async_trait]
pub trait ClickStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        session: &dyn PageSession,
        listing: &ElementHandle,
        timings: &Timings,
    ) -> Result<Outcome, SessionError>;
}

/// Follow a link read off the card
pub struct DirectLink;

/// Real mouse click, then wait for the page to change
pub struct NativeClick;

/// Scripted click on a nested link or a synthetic click event
pub struct ScriptedClick;

/// Default strategy order
pub fn default_strategies() -> Vec<Box<dyn ClickStrategy>> {
    vec![Box::new(DirectLink), Box::new(NativeClick), Box::new(ScriptedClick)]
}

#[async_trait]
impl ClickStrategy for DirectLink {
    fn name(&self) -> &'static str {
        "direct link"
    }

    async fn attempt(
        &self,
        session: &dyn PageSession,
        listing: &ElementHandle,
        timings: &Timings,
    ) -> Result<Outcome, SessionError> {
        let Some(href) = find_link(session, listing).await? else {
            return Ok(Outcome::NotApplicable);
        };

        let base = session.current_url().await?;
        let target = resolve_link(&base, &href)
            .ok_or_else(|| SessionError::Browser(anyhow!("unusable listing link '{href}'")))?;

        info!("Opening listing via link: {}", target);
        session.goto(&target, timings.navigation_timeout).await?;
        Ok(Outcome::Navigated)
    }
}

#[async_trait]
impl ClickStrategy for NativeClick {
    fn name(&self) -> &'static str {
        "native click"
    }

    async fn attempt(
        &self,
        session: &dyn PageSession,
        listing: &ElementHandle,
        timings: &Timings,
    ) -> Result<Outcome, SessionError> {
        let before = session.current_url().await?;
        session.click(listing).await?;
        wait_for_transition(session, &before, timings).await?;
        Ok(Outcome::Navigated)
    }
}

#[async_trait]
impl ClickStrategy for ScriptedClick {
    fn name(&self) -> &'static str {
        "scripted click"
    }

    async fn attempt(
        &self,
        session: &dyn PageSession,
        listing: &ElementHandle,
        timings: &Timings,
    ) -> Result<Outcome, SessionError> {
        let before = session.current_url().await?;
        session.script_click(listing).await?;
        wait_for_transition(session, &before, timings).await?;
        Ok(Outcome::Navigated)
    }
}

/// Drives the session from an agent slug to that agent's first listing page
pub struct Navigator<'a> {
    session: &'a dyn PageSession,
    locator: &'a dyn Locator,
    timings: Timings,
    strategies: Vec<Box<dyn ClickStrategy>>,
}

impl<'a> Navigator<'a> {
    pub fn new(session: &'a dyn PageSession, locator: &'a dyn Locator, timings: Timings) -> Self {
        Self {
            session,
            locator,
            timings,
            strategies: default_strategies(),
        }
    }

    /// Load the agent's profile page
    pub async fn open_profile(&self, base_url: &str, slug: &str) -> Result<(), ExtractionError> {
        let url = profile_url(base_url, slug);
        info!("Opening agent profile: {}", url);

        self.session
            .goto(&url, self.timings.navigation_timeout)
            .await
            .map_err(|e| match e {
                SessionError::Timeout { after, .. } => ExtractionError::NavigationTimeout {
                    url: url.clone(),
                    after,
                },
                SessionError::Browser(cause) => ExtractionError::ExtractionFailed(
                    cause.context(format!("Failed to load profile {url}")),
                ),
            })
    }

    /// Find the first listing card, retrying once after the grace interval
    pub async fn first_listing(&self, slug: &str) -> Result<ElementHandle, ExtractionError> {
        let path = self.locator.path(Role::FirstListing);
        match find_with_retry(self.session, &path, self.timings.grace).await {
            Ok(Some(listing)) => Ok(listing),
            Ok(None) => {
                warn!("No listings section for '{}' after retry", slug);
                Err(ExtractionError::ListingsSectionNotFound {
                    slug: slug.to_string(),
                })
            }
            Err(e) => Err(ExtractionError::ExtractionFailed(
                anyhow::Error::new(e).context("Failed to query the listings section"),
            )),
        }
    }

    /// Move from the listing card to its detail page using the first strategy that works
    pub async fn open_listing(&self, listing: &ElementHandle) -> Result<(), ExtractionError> {
        let mut last_error = None;

        for strategy in &self.strategies {
            debug!("Trying {} on {}", strategy.name(), listing.path());
            match strategy.attempt(self.session, listing, &self.timings).await {
                Ok(Outcome::Navigated) => {
                    info!("Listing opened via {}", strategy.name());
                    return Ok(());
                }
                Ok(Outcome::NotApplicable) => {
                    debug!("{} not applicable", strategy.name());
                }
                Err(e) => {
                    warn!("{} failed: {}", strategy.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(ExtractionError::ListingClickFailed {
            source: last_error.unwrap_or_else(|| {
                SessionError::Browser(anyhow!("no click strategy applied to {}", listing.path()))
            }),
        })
    }
}

pub fn profile_url(base_url: &str, slug: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), slug)
}

/// Query once, and if nothing is there wait `grace` and query exactly once more
pub async fn find_with_retry(
    session: &dyn PageSession,
    path: &str,
    grace: Duration,
) -> Result<Option<ElementHandle>, SessionError> {
    if let Some(found) = session.find(path).await? {
        return Ok(Some(found));
    }
    debug!("{} not rendered yet, retrying in {:?}", path, grace);
    sleep(grace).await;
    session.find(path).await
}

/// Link carried by the card: a nested (or self) anchor, then the card's own attributes
async fn find_link(
    session: &dyn PageSession,
    listing: &ElementHandle,
) -> Result<Option<String>, SessionError> {
    let anchor_path = listing.relative("descendant-or-self::a[@href]");
    if let Some(anchor) = session.find(&anchor_path).await? {
        if let Some(href) = non_empty(session.attribute(&anchor, "href").await?) {
            return Ok(Some(href));
        }
    }

    for name in LINK_ATTRIBUTES {
        if let Some(href) = non_empty(session.attribute(listing, name).await?) {
            return Ok(Some(href));
        }
    }
    Ok(None)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.starts_with("javascript:") && v != "#")
}

/// Absolute URL for a possibly relative link
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(href) {
        return matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string());
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .ok()
        .map(|u| u.to_string())
}

/// Wait until the URL moves away from `before` and the new page has loaded
async fn wait_for_transition(
    session: &dyn PageSession,
    before: &str,
    timings: &Timings,
) -> Result<(), SessionError> {
    let budget = timings.navigation_timeout;
    let deadline = Instant::now() + budget;

    loop {
        if session.current_url().await? != before {
            break;
        }
        if Instant::now() >= deadline {
            return Err(SessionError::Timeout {
                action: "page transition",
                after: budget,
            });
        }
        sleep(timings.transition_poll).await;
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    session.wait_for_load(remaining).await
}
