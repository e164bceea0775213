//! tel.search.ch directory lookup
//!
//! The phone directory is the ground truth for address verification. The
//! API answers with an Atom feed; entries carry the address either in the
//! free-text `<content>` block, in structured `<tel:*>` tags, or only in the
//! entry title, so extraction tries those three shapes in order.
//!
//! Lookup failures are part of normal operation (people move, names are
//! misspelled), so [`PersonDirectory::search`] never fails hard: HTTP and
//! transport problems come back as `Error: …` text the agent can read.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::tool::{Tool, ToolResult};

const DEFAULT_BASE_URL: &str = "https://search.ch/tel/api/";
const API_KEY_ENV: &str = "TELSEARCH_API_KEY";
const MAX_RESULTS: u32 = 10;

static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("entry regex"));
static CONTENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<content[^>]*>(.*?)</content>").expect("content regex"));
static CONTENT_ADDR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^,\d\n<]+)\s+(\d+),\s*(\d{4})\s+([^,\n<]+)").expect("address regex"));
static STREET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<tel:street>(.*?)</tel:street>").expect("street regex"));
static STREET_NO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<tel:streetno>(.*?)</tel:streetno>").expect("streetno regex"));
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<tel:zip>(.*?)</tel:zip>").expect("zip regex"));
static CITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<tel:city>(.*?)</tel:city>").expect("city regex"));
static TITLE_LOCALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<title[^>]*>.*?(\d{4}\s+[^<,]+)</title>").expect("title regex"));

/// Source of directory lookups, swappable for tests.
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// Looks up `name` in `location` and returns the raw response body, or
    /// `Error: …` text when the lookup itself could not be made.
    async fn search(&self, name: &str, location: &str) -> String;
}

/// Production client for the tel.search.ch API.
pub struct TelsearchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Default for TelsearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TelsearchClient {
    /// Creates a client against the public API, picking up an API key from
    /// the `TELSEARCH_API_KEY` environment variable when present.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Points the client at a different endpoint, for testing against a
    /// local server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PersonDirectory for TelsearchClient {
    async fn search(&self, name: &str, location: &str) -> String {
        let mut params: Vec<(&str, String)> = vec![
            ("was", name.to_string()),
            ("wo", location.to_string()),
            ("maxnum", MAX_RESULTS.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        debug!(name, location, "Querying directory");

        let response = match self.http.get(&self.base_url).query(&params).send().await {
            Ok(response) => response,
            Err(e) => return format!("Error: directory request failed: {}", e),
        };

        if !response.status().is_success() {
            return format!("Error: directory returned status {}", response.status());
        }

        match response.text().await {
            Ok(body) => body,
            Err(e) => format!("Error: could not read directory response: {}", e),
        }
    }
}

/// Address pieces extracted from a directory entry. Any subset may be
/// present; formatting works with whatever is there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressComponents {
    pub street: Option<String>,
    pub street_no: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
}

impl AddressComponents {
    pub fn is_empty(&self) -> bool {
        self.street.is_none() && self.street_no.is_none() && self.zip.is_none() && self.city.is_none()
    }

    /// Renders the components as `Street No, ZIP City`, dropping whatever
    /// parts are missing. Returns `None` when nothing is present.
    pub fn format(&self) -> Option<String> {
        let street_part = match (&self.street, &self.street_no) {
            (Some(street), Some(no)) => Some(format!("{} {}", street, no)),
            (Some(street), None) => Some(street.clone()),
            _ => None,
        };
        let locality_part = match (&self.zip, &self.city) {
            (Some(zip), Some(city)) => Some(format!("{} {}", zip, city)),
            (Some(zip), None) => Some(zip.clone()),
            (None, Some(city)) => Some(city.clone()),
            _ => None,
        };

        match (street_part, locality_part) {
            (Some(s), Some(l)) => Some(format!("{}, {}", s, l)),
            (Some(s), None) => Some(s),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        }
    }
}

fn clean(fragment: &str) -> Option<String> {
    let collapsed = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Extracts address components from the first entry of an Atom response.
///
/// Tries, in order: the free-text address line in `<content>`, structured
/// `<tel:*>` tags, and finally the `ZIP City` tail of the entry title.
/// Returns `None` when the feed has no entries or no recognizable address.
pub fn parse_address(xml: &str) -> Option<AddressComponents> {
    let entry = ENTRY_RE.captures(xml)?.get(1)?.as_str();

    if let Some(content) = CONTENT_RE.captures(entry).and_then(|c| c.get(1)) {
        if let Some(addr) = CONTENT_ADDR_RE.captures(content.as_str()) {
            let components = AddressComponents {
                street: clean(addr.get(1).map_or("", |m| m.as_str())),
                street_no: clean(addr.get(2).map_or("", |m| m.as_str())),
                zip: clean(addr.get(3).map_or("", |m| m.as_str())),
                city: clean(addr.get(4).map_or("", |m| m.as_str())),
            };
            if !components.is_empty() {
                return Some(components);
            }
        }
    }

    let structured = AddressComponents {
        street: STREET_RE
            .captures(entry)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str())),
        street_no: STREET_NO_RE
            .captures(entry)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str())),
        zip: ZIP_RE
            .captures(entry)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str())),
        city: CITY_RE
            .captures(entry)
            .and_then(|c| c.get(1))
            .and_then(|m| clean(m.as_str())),
    };
    if !structured.is_empty() {
        return Some(structured);
    }

    if let Some(locality) = TITLE_LOCALITY_RE.captures(entry).and_then(|c| c.get(1)) {
        let mut parts = locality.as_str().split_whitespace();
        let zip = parts.next().map(str::to_string);
        let city = clean(&parts.collect::<Vec<_>>().join(" "));
        if zip.is_some() || city.is_some() {
            return Some(AddressComponents {
                street: None,
                street_no: None,
                zip,
                city,
            });
        }
    }

    None
}

/// Normalizes a person's name and pairs it with a formatted address.
///
/// Directory entries often use `Last, First` order; that is flipped back to
/// `First Last`. The address is `None` when no components were extracted.
pub fn format_address(name: &str, components: Option<&AddressComponents>) -> (String, Option<String>) {
    let display_name = match name.split_once(',') {
        Some((last, first)) => {
            let first = first.trim();
            let last = last.trim();
            if first.is_empty() {
                last.to_string()
            } else {
                format!("{} {}", first, last)
            }
        }
        None => name.split_whitespace().collect::<Vec<_>>().join(" "),
    };

    let address = components.and_then(|c| c.format());
    (display_name, address)
}

/// Agent-facing lookup tool over any [`PersonDirectory`].
pub struct SearchPersonTool {
    directory: Arc<dyn PersonDirectory>,
}

impl SearchPersonTool {
    pub fn new(directory: Arc<dyn PersonDirectory>) -> Self {
        Self { directory }
    }
}

impl std::fmt::Debug for SearchPersonTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPersonTool").finish()
    }
}

#[async_trait]
impl Tool for SearchPersonTool {
    fn name(&self) -> &str {
        "search_person"
    }

    fn description(&self) -> &str {
        "Search the public phone directory for a person's registered address. \
         Takes the person's full name and the municipality to search in."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Full name of the person to look up"
                },
                "location": {
                    "type": "string",
                    "description": "Municipality or town to search in"
                }
            },
            "required": ["name", "location"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        let name = match arguments.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Ok(ToolResult::error("Missing required field: name")),
        };
        let location = match arguments.get("location").and_then(Value::as_str) {
            Some(location) if !location.trim().is_empty() => location.trim().to_string(),
            _ => return Ok(ToolResult::error("Missing required field: location")),
        };

        let raw = self.directory.search(&name, &location).await;
        if let Some(rest) = raw.strip_prefix("Error:") {
            return Ok(ToolResult::error(format!("Directory lookup failed:{}", rest)));
        }

        let components = parse_address(&raw);
        let (display_name, address) = format_address(&name, components.as_ref());

        Ok(ToolResult::success(serde_json::json!({
            "name": display_name,
            "address": address,
        })))
    }
}
