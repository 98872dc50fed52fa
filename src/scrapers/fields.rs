use crate::models::{ADDRESS_NOT_FOUND, DAYS_ON_MARKET_NOT_FOUND};
use crate::scrapers::navigator::find_with_retry;
use crate::scrapers::traits::PageSession;
use crate::scrapers::types::{Locator, Role, Timings};
use tracing::{debug, warn};

/// Scalar fields read off the listing detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFields {
    pub address: String,
    pub days_on_market: String,
}

/// Read address and days-on-market. Missing fields fall back to their placeholders.
pub async fn extract_fields(
    session: &dyn PageSession,
    locator: &dyn Locator,
    timings: &Timings,
) -> ListingFields {
    let address = read_field(session, locator, Role::Address, ADDRESS_NOT_FOUND, timings).await;
    let days_on_market = read_field(
        session,
        locator,
        Role::DaysOnMarket,
        DAYS_ON_MARKET_NOT_FOUND,
        timings,
    )
    .await;

    ListingFields {
        address,
        days_on_market,
    }
}

/// Trimmed text of the element for `role`, or `fallback` if it never shows up.
///
/// Content is not validated: whatever non-empty text sits at the path is returned.
async fn read_field(
    session: &dyn PageSession,
    locator: &dyn Locator,
    role: Role,
    fallback: &str,
    timings: &Timings,
) -> String {
    let path = locator.path(role);

    let element = match find_with_retry(session, &path, timings.grace).await {
        Ok(Some(element)) => element,
        Ok(None) => {
            warn!("{:?} not found after retry, using placeholder", role);
            return fallback.to_string();
        }
        Err(e) => {
            warn!("{:?} lookup failed: {}", role, e);
            return fallback.to_string();
        }
    };

    match session.text(&element).await {
        Ok(text) if !text.trim().is_empty() => {
            let text = text.trim().to_string();
            debug!("{:?} = {:?}", role, text);
            text
        }
        Ok(_) => {
            warn!("{:?} is empty, using placeholder", role);
            fallback.to_string()
        }
        Err(e) => {
            warn!("Could not read {:?}: {}", role, e);
            fallback.to_string()
        }
    }
}
