pub mod fields;
mod tabular;
mod nested;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One atomic in-game action, in the shape shared by both upstream schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawActionRecord {
    pub game_id: String,
    pub action_number: u32,
    pub period: u8,
    pub clock: Option<String>,
    pub team_id: Option<i64>,
    pub person_id: Option<i64>,
    pub action_type: Option<String>,
    pub sub_type: Option<String>,
    pub description: Option<String>,
    pub score_home: Option<i64>,
    pub score_away: Option<i64>,
    pub x_legacy: Option<i64>,
    pub y_legacy: Option<i64>,
    pub shot_result: Option<String>,
    pub shot_value: Option<u8>,
    pub shot_distance: Option<i64>,
    /// Anonymous participants in feed order; their roles depend on the event type.
    pub slots: [Option<i64>; 3],
}

impl RawActionRecord {
    pub fn action_id(&self) -> String {
        action_id(&self.game_id, self.action_number)
    }

    /// Trims text, turns blank text into null and turns the `0` id sentinel
    /// (and a zero shot distance) into null.
    pub fn normalize_nulls(mut self) -> Self {
        for text in [
            &mut self.clock,
            &mut self.action_type,
            &mut self.sub_type,
            &mut self.description,
            &mut self.shot_result,
        ] {
            *text = fields::blank_to_none(text.take());
        }
        self.team_id = self.team_id.filter(|id| *id != 0);
        self.person_id = self.person_id.filter(|id| *id != 0);
        self.shot_distance = self.shot_distance.filter(|d| *d != 0);
        for slot in &mut self.slots {
            *slot = slot.filter(|id| *id != 0);
        }
        self
    }
}

pub fn action_id(game_id: &str, action_number: u32) -> String {
    format!("{game_id}{action_number:04}")
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("document matches neither the nested nor the tabular play-by-play shape")]
    UnknownShape,
    #[error("tabular result set is missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("action at index {index} is malformed: {reason}")]
    MalformedAction { index: usize, reason: String },
}

/// The two upstream response layouts, resolved once per document.
#[derive(Debug)]
pub enum ResponseShape<'a> {
    /// `{"game": {"gameId": .., "actions": [{..}, ..]}}`
    Nested {
        game_id: &'a str,
        actions: &'a [Value],
    },
    /// `{"resultSets": [{"headers": [..], "rowSet": [[..], ..]}]}`
    Tabular {
        headers: Vec<&'a str>,
        rows: &'a [Value],
    },
}

impl<'a> ResponseShape<'a> {
    pub fn detect(doc: &'a Value) -> Result<Self, ExtractError> {
        let game = doc.get("game");
        if let Some(game_id) = game.and_then(|g| g.get("gameId")).and_then(Value::as_str)
            && let Some(actions) = game
                .and_then(|g| g.get("actions"))
                .and_then(Value::as_array)
        {
            return Ok(ResponseShape::Nested { game_id, actions });
        }

        let set = doc
            .get("resultSets")
            .and_then(Value::as_array)
            .and_then(|sets| sets.first());
        if let Some(headers) = set.and_then(|s| s.get("headers")).and_then(Value::as_array)
            && let Some(rows) = set.and_then(|s| s.get("rowSet")).and_then(Value::as_array)
        {
            let headers = headers
                .iter()
                .map(|h| h.as_str().ok_or(ExtractError::UnknownShape))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ResponseShape::Tabular { headers, rows });
        }

        Err(ExtractError::UnknownShape)
    }
}

/// Converts one response document into action records sorted by action number.
pub fn extract_actions(doc: &Value) -> Result<Vec<RawActionRecord>, ExtractError> {
    let mut records = match ResponseShape::detect(doc)? {
        ResponseShape::Nested { game_id, actions } => nested::records(game_id, actions)?,
        ResponseShape::Tabular { headers, rows } => tabular::records(&headers, rows)?,
    };
    records.sort_by_key(|r| r.action_number);
    Ok(records)
}

/// Flattens many documents into one table, dropping documents that fail to
/// extract.
pub fn extract_batch<'a, I>(docs: I) -> Vec<RawActionRecord>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = Vec::new();
    for (idx, doc) in docs.into_iter().enumerate() {
        match extract_actions(doc) {
            Ok(records) => out.extend(records),
            Err(err) => warn!(document = idx, error = %err, "dropping malformed document"),
        }
    }
    out
}

/// Copies player slots from `source` onto `records` with the same action id.
/// Returns how many records received slots.
pub fn attach_slots(records: &mut [RawActionRecord], source: &[RawActionRecord]) -> usize {
    let by_action: HashMap<String, [Option<i64>; 3]> =
        source.iter().map(|r| (r.action_id(), r.slots)).collect();

    let mut attached = 0;
    for record in records.iter_mut() {
        if let Some(slots) = by_action.get(&record.action_id()) {
            record.slots = *slots;
            attached += 1;
        }
    }
    debug!(attached, total = records.len(), "attached player slots");
    attached
}
