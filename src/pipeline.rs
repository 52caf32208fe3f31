use crate::extract::{RawActionRecord, attach_slots, extract_actions};
use crate::fetch::transport::Transport;
use crate::fetch::{Endpoint, RateLimitedFetcher, RequestParams};
use crate::normalize::{EventNormalizer, NormalizedEvent};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Endpoint whose actions become events.
    pub endpoint: Endpoint,
    /// When reading the nested schema, join player slots from the tabular one.
    pub attach_slots: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::PlayByPlayV3,
            attach_slots: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameEvents {
    pub game_id: String,
    /// True only when every document read for the game, slot source
    /// included, came from the cache.
    pub from_cache: bool,
    pub events: Vec<NormalizedEvent>,
}

/// Lazily turns game ids into normalized events, one game per item. Games
/// whose documents cannot be fetched or extracted are skipped.
pub struct PlayByPlay<'a, T: Transport, I> {
    fetcher: &'a mut RateLimitedFetcher<T>,
    game_ids: I,
    options: PipelineOptions,
}

pub fn play_by_play<T, I>(
    fetcher: &mut RateLimitedFetcher<T>,
    game_ids: I,
    options: PipelineOptions,
) -> PlayByPlay<'_, T, I::IntoIter>
where
    T: Transport,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    PlayByPlay {
        fetcher,
        game_ids: game_ids.into_iter(),
        options,
    }
}

impl<T, I> PlayByPlay<'_, T, I>
where
    T: Transport,
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn records(&mut self, endpoint: Endpoint, game_id: &str) -> Option<(bool, Vec<RawActionRecord>)> {
        let doc = self
            .fetcher
            .fetch(endpoint, &RequestParams::play_by_play(game_id))?;
        match extract_actions(&doc.body) {
            Ok(records) => Some((doc.from_cache, records)),
            Err(err) => {
                warn!(game_id, %endpoint, error = %err, "dropping malformed document");
                None
            }
        }
    }

    fn game(&mut self, game_id: &str) -> Option<GameEvents> {
        let (mut from_cache, mut records) = self.records(self.options.endpoint, game_id)?;

        if self.options.attach_slots && self.options.endpoint == Endpoint::PlayByPlayV3 {
            match self.records(Endpoint::PlayByPlayV2, game_id) {
                Some((slots_cached, slot_rows)) => {
                    from_cache &= slots_cached;
                    attach_slots(&mut records, &slot_rows);
                }
                None => warn!(game_id, "no player slots available; continuing without them"),
            }
        }

        let total = records.len();
        let events = EventNormalizer::new().normalize_all(records);
        info!(
            game_id,
            from_cache,
            actions = total,
            events = events.len(),
            "normalized game"
        );
        Some(GameEvents {
            game_id: game_id.to_string(),
            from_cache,
            events,
        })
    }
}

impl<T, I> Iterator for PlayByPlay<'_, T, I>
where
    T: Transport,
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = GameEvents;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(game_id) = self.game_ids.next() {
            if let Some(game) = self.game(game_id.as_ref()) {
                return Some(game);
            }
        }
        None
    }
}

/// Row count of the first result set in a game-listing document.
pub fn listed_games(doc: &Value) -> Option<usize> {
    doc.get("resultSets")?
        .get(0)?
        .get("rowSet")?
        .as_array()
        .map(Vec::len)
}
