use crate::error::SessionError;
use crate::scrapers::traits::{ElementHandle, PageSession, RoomClassifier};
use crate::scrapers::types::{Locator, Role, MAX_IMAGE_CANDIDATES};
use tracing::{debug, info, warn};

/// Image attributes checked for a usable URL: the real source first, then lazy-load slots
const SOURCE_ATTRIBUTES: [&str; 5] = ["src", "data-src", "data-lazy-src", "data-original", "srcset"];

/// Scan gallery positions 1..=5 in order and return the first one the classifier
/// calls an empty room. No position is retried and at most one classifier call
/// is in flight.
pub async fn first_room_image(
    session: &dyn PageSession,
    locator: &dyn Locator,
    classifier: &dyn RoomClassifier,
) -> Option<String> {
    for position in 1..=MAX_IMAGE_CANDIDATES {
        let path = locator.path(Role::GalleryImage(position));

        let image = match session.find(&path).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!("No image at position {}", position);
                continue;
            }
            Err(e) => {
                warn!("Image lookup at position {} failed: {}", position, e);
                continue;
            }
        };

        let url = match image_url(session, &image).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!("Image at position {} has no usable source", position);
                continue;
            }
            Err(e) => {
                warn!("Could not read image source at position {}: {}", position, e);
                continue;
            }
        };

        let verdict = classifier.classify(&url).await;
        debug!("Position {} classified as {:?}: {}", position, verdict, url);
        if verdict.is_room() {
            info!("Room photo found at position {}", position);
            return Some(url);
        }
    }

    info!("No room photo among the first {} images", MAX_IMAGE_CANDIDATES);
    None
}

/// First attribute value that resolves to an http(s) URL
async fn image_url(
    session: &dyn PageSession,
    image: &ElementHandle,
) -> Result<Option<String>, SessionError> {
    for name in SOURCE_ATTRIBUTES {
        let Some(value) = session.attribute(image, name).await? else {
            continue;
        };
        let candidate = if name == "srcset" {
            first_srcset_entry(&value)
        } else {
            value.trim()
        };
        if let Some(url) = absolute_image_url(candidate) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

/// URL part of the first `url [descriptor]` entry in a srcset
fn first_srcset_entry(srcset: &str) -> &str {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .unwrap_or("")
}

/// Keep network URLs; protocol-relative ones become https.
///
/// Only sources that name a host are accepted. Path-only values such as
/// `/img/placeholder.gif` are lazy-load stand-ins, not gallery photos, so they
/// are not resolved against the page the way listing links are.
fn absolute_image_url(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(value.to_string())
    } else if value.starts_with("//") {
        Some(format!("https:{value}"))
    } else {
        None
    }
}
