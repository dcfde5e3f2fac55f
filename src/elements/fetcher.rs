use std::time::Duration;

use super::error::FetchError;
use super::tle::{parse_fields, parse_tle_payload};
use super::types::FetchedElements;

/// Source of fresh element sets for a catalog number.
pub trait ElementFetcher: Send {
    fn fetch_element_set(&mut self, catalog_id: u32) -> Result<FetchedElements, FetchError>;
}

/// Fetches TLE text over HTTP from a URL template containing `{catalog_id}`.
pub struct CelestrakFetcher {
    url_template: String,
    agent: ureq::Agent,
}

impl CelestrakFetcher {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url_template: url_template.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn url_for(&self, catalog_id: u32) -> String {
        self.url_template
            .replace("{catalog_id}", &catalog_id.to_string())
    }
}

impl ElementFetcher for CelestrakFetcher {
    fn fetch_element_set(&mut self, catalog_id: u32) -> Result<FetchedElements, FetchError> {
        let url = self.url_for(catalog_id);
        log::debug!("Fetching elements from {}", url);

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(FetchError::Status(code)),
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        };
        let body = response
            .into_string()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        validate_payload(&body, catalog_id)
    }
}

/// Checks that a payload holds one element set for `catalog_id`.
pub fn validate_payload(body: &str, catalog_id: u32) -> Result<FetchedElements, FetchError> {
    let fetched = parse_tle_payload(body, &format!("NORAD {catalog_id}"))
        .map_err(|e| FetchError::Payload(e.to_string()))?;
    let fields = parse_fields(&fetched.line1, &fetched.line2)
        .map_err(|e| FetchError::Payload(e.to_string()))?;
    if fields.catalog_id != catalog_id {
        return Err(FetchError::CatalogMismatch {
            expected: catalog_id,
            found: fields.catalog_id,
        });
    }
    Ok(fetched)
}
