pub mod cache;
pub mod schema;
pub mod throttle;
pub mod transport;

use crate::fetch::cache::ResponseCache;
use crate::fetch::throttle::Throttle;
use crate::fetch::transport::Transport;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats/";
pub const DEFAULT_DELAY_MS: u64 = 600;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Remote endpoints served by the stats API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    PlayByPlayV2,
    PlayByPlayV3,
    LeagueGameFinder,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::PlayByPlayV2 => "playbyplayv2",
            Endpoint::PlayByPlayV3 => "playbyplayv3",
            Endpoint::LeagueGameFinder => "leaguegamefinder",
        }
    }

    /// Play-by-play endpoint for a schema version (2 or 3).
    pub fn play_by_play(version: u8) -> Option<Self> {
        match version {
            2 => Some(Endpoint::PlayByPlayV2),
            3 => Some(Endpoint::PlayByPlayV3),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Query parameters for one request. Keys are kept sorted so that the same
/// logical request always produces the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn play_by_play(game_id: &str) -> Self {
        Self::new()
            .with("EndPeriod", 0)
            .with("GameID", game_id)
            .with("StartPeriod", 0)
    }

    pub fn season(season: &str) -> Self {
        Self::new().with("Season", season)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn canonical(&self) -> String {
        self.pairs()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Regular-season (`1996-97`) and postseason (`1996`) identifiers for each
/// year in `start..=end`, in the order the game-listing endpoint expects.
pub fn season_strings(start: u16, end: u16) -> Vec<String> {
    let years = start..=end;
    let regular = years
        .clone()
        .map(|y| format!("{y}-{:02}", (y % 100 + 1) % 100));
    let post = years.map(|y| y.to_string());
    regular.chain(post).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("response from {endpoint} is not valid JSON: {source}")]
    Parse {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub endpoint: Endpoint,
    pub params: RequestParams,
    pub from_cache: bool,
    pub body: Value,
}

/// Fetches documents through the response cache, throttling only the
/// requests that reach the network.
pub struct RateLimitedFetcher<T: Transport> {
    cache: ResponseCache,
    transport: T,
    throttle: Throttle,
}

impl<T: Transport> RateLimitedFetcher<T> {
    pub fn new(cache: ResponseCache, transport: T, delay: Duration) -> Self {
        Self {
            cache,
            transport,
            throttle: Throttle::new(delay),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches one document. Transport and parse failures are logged and
    /// yield `None`; nothing is retried.
    pub fn fetch(&mut self, endpoint: Endpoint, params: &RequestParams) -> Option<FetchedDocument> {
        match self.cache.get(endpoint, params) {
            Ok(Some(body)) => {
                debug!(%endpoint, params = %params.canonical(), "cache hit");
                return Some(FetchedDocument {
                    endpoint,
                    params: params.clone(),
                    from_cache: true,
                    body,
                });
            }
            Ok(None) => {}
            Err(err) => warn!(%endpoint, error = %err, "cache lookup failed; requesting from network"),
        }

        let waited = self.throttle.wait_turn();
        debug!(
            %endpoint,
            params = %params.canonical(),
            waited_ms = waited.as_millis() as u64,
            "cache miss"
        );

        let text = match self.transport.get(endpoint, params) {
            Ok(text) => text,
            Err(err) => {
                warn!(%endpoint, params = %params.canonical(), error = %err, "request failed; skipping");
                return None;
            }
        };
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(source) => {
                let err = FetchError::Parse { endpoint, source };
                warn!(params = %params.canonical(), error = %err, "unparsable response; skipping");
                return None;
            }
        };

        if let Err(err) = self.cache.put(endpoint, params, &text) {
            warn!(%endpoint, error = %err, "failed to store response in cache");
        }

        Some(FetchedDocument {
            endpoint,
            params: params.clone(),
            from_cache: false,
            body,
        })
    }

    pub fn request(&mut self, endpoint: Endpoint, params: &RequestParams) -> Option<Value> {
        self.fetch(endpoint, params).map(|doc| doc.body)
    }

    /// Lazily fetches one document per parameter set, in input order. Items
    /// whose fetch fails are left out of the sequence.
    pub fn requests<I>(&mut self, endpoint: Endpoint, params: I) -> Documents<'_, T, I::IntoIter>
    where
        I: IntoIterator<Item = RequestParams>,
    {
        Documents {
            fetcher: self,
            endpoint,
            params: params.into_iter(),
        }
    }
}

pub struct Documents<'a, T: Transport, I> {
    fetcher: &'a mut RateLimitedFetcher<T>,
    endpoint: Endpoint,
    params: I,
}

impl<T, I> Iterator for Documents<'_, T, I>
where
    T: Transport,
    I: Iterator<Item = RequestParams>,
{
    type Item = FetchedDocument;

    fn next(&mut self) -> Option<Self::Item> {
        for params in self.params.by_ref() {
            if let Some(doc) = self.fetcher.fetch(self.endpoint, &params) {
                return Some(doc);
            }
        }
        None
    }
}
