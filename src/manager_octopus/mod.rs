pub mod errors;
#[cfg(test)]
pub mod mock;

use std::time::Duration;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use ureq::Agent;
use url::Url;
use crate::config;
use crate::manager_octopus::errors::OctopusError;
use crate::models::octopus_consumption::Reading;
use crate::models::octopus_page::Page;
use crate::models::octopus_rates::UnitRate;

/// Performs a single GET against the Octopus API and returns the response body
pub trait Transport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, OctopusError>;
}

/// Blocking http transport authenticating with the account API key
pub struct HttpTransport {
    agent: Agent,
    authorization: String,
}

impl HttpTransport {
    /// Returns a new HttpTransport
    ///
    /// # Arguments
    ///
    /// * 'api_key' - Octopus API key, sent as basic auth user name with an empty password
    /// * 'timeout' - global timeout for each request
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let agent = agent_config.into();
        let authorization = format!("Basic {}", STANDARD.encode(format!("{}:", api_key)));

        Self { agent, authorization }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, OctopusError> {
        let mut req = self.agent
            .get(url)
            .header("Authorization", self.authorization.as_str());

        for &(key, value) in query {
            req = req.query(key, value);
        }

        let json = req
            .call()?
            .body_mut()
            .read_to_string()?;

        Ok(json)
    }
}

/// Client for the parts of the Octopus API needed to price consumption
pub struct Octopus<T: Transport> {
    transport: T,
    max_pages: usize,
}

impl Octopus<HttpTransport> {
    /// Returns a new Octopus client talking http
    ///
    /// # Arguments
    ///
    /// * 'config' - Octopus section of the configuration
    pub fn new(config: &config::Octopus) -> Self {
        let transport = HttpTransport::new(&config.api_key, Duration::from_secs(config.timeout_secs));

        Self { transport, max_pages: config.max_pages }
    }
}

impl<T: Transport> Octopus<T> {
    /// Returns a new Octopus client using the given transport
    ///
    /// # Arguments
    ///
    /// * 'transport' - the transport to send requests through
    /// * 'max_pages' - max number of pages to follow in one retrieval
    #[cfg(test)]
    pub fn with_transport(transport: T, max_pages: usize) -> Self {
        Self { transport, max_pages }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Retrieves all consumption readings for the given period, in the order the pages
    /// were returned.
    ///
    /// # Arguments
    ///
    /// * 'url' - consumption endpoint for a meter
    /// * 'from' - start of the period
    /// * 'to' - end of the period
    pub fn get_consumption(&self, url: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Reading>, OctopusError> {
        self.get_paginated(url, from, to)
    }

    /// Retrieves all unit rates for the given period, used for agile tariffs
    ///
    /// # Arguments
    ///
    /// * 'url' - standard unit rates endpoint of a tariff
    /// * 'from' - start of the period
    /// * 'to' - end of the period
    pub fn get_unit_rates(&self, url: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<UnitRate>, OctopusError> {
        self.get_paginated(url, from, to)
    }

    /// Retrieves the current standing charge, i.e. the first entry of the standing charges
    /// endpoint of a tariff
    ///
    /// # Arguments
    ///
    /// * 'url' - standing charges endpoint of a tariff
    pub fn get_standing_charge(&self, url: &str) -> Result<f64, OctopusError> {
        let json = self.transport.get(url, &[])?;
        let page: Page<UnitRate> = serde_json::from_str(&json)?;

        page.results
            .first()
            .map(|r| r.value_inc_vat)
            .ok_or_else(|| OctopusError::NoStandingCharge(url.to_string()))
    }

    /// Follows the next links of a paginated endpoint until there are no more pages.
    /// Any failing page aborts the whole retrieval.
    ///
    /// # Arguments
    ///
    /// * 'url' - the paginated endpoint
    /// * 'from' - start of the period
    /// * 'to' - end of the period
    fn get_paginated<R: DeserializeOwned>(&self, url: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<R>, OctopusError> {
        let period_from = format_period(from);
        let period_to = format_period(to);

        let mut results: Vec<R> = Vec::new();
        let mut page: Option<String> = None;

        for page_no in 1..=self.max_pages {
            let json = {
                let mut query = vec![("period_from", period_from.as_str()), ("period_to", period_to.as_str())];
                if let Some(p) = &page {
                    query.push(("page", p.as_str()));
                }
                self.transport.get(url, &query)?
            };
            let batch: Page<R> = serde_json::from_str(&json)?;
            debug!("page {} from {}: {} results", page_no, url, batch.results.len());
            results.extend(batch.results);

            page = match batch.next {
                None => return Ok(results),
                Some(next) => match page_cursor(&next) {
                    Some(cursor) => Some(cursor),
                    None => {
                        warn!("next link without page parameter, treating as end of data: {}", next);
                        return Ok(results);
                    }
                },
            };
        }

        Err(OctopusError::PageLimit(self.max_pages))
    }
}

/// Formats an instant the way Octopus expects period parameters
fn format_period(date_time: DateTime<Utc>) -> String {
    date_time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Extracts the page parameter from a next link
///
/// # Arguments
///
/// * 'next' - the next url as returned by Octopus
fn page_cursor(next: &str) -> Option<String> {
    let next = Url::parse(next).ok()?;

    next.query_pairs()
        .find(|(key, _)| key.as_ref() == "page")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
