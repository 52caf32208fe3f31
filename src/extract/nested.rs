use crate::extract::fields::{id, int, small, text};
use crate::extract::{ExtractError, RawActionRecord};
use serde_json::Value;

pub(super) fn records(game_id: &str, actions: &[Value]) -> Result<Vec<RawActionRecord>, ExtractError> {
    actions
        .iter()
        .enumerate()
        .map(|(index, action)| record(game_id, index, action))
        .collect()
}

fn record(game_id: &str, index: usize, action: &Value) -> Result<RawActionRecord, ExtractError> {
    if !action.is_object() {
        return Err(ExtractError::MalformedAction {
            index,
            reason: "action is not an object".to_string(),
        });
    }
    let action_number = small(action.get("actionNumber")).ok_or_else(|| {
        ExtractError::MalformedAction {
            index,
            reason: "missing `actionNumber`".to_string(),
        }
    })?;

    Ok(RawActionRecord {
        game_id: game_id.to_string(),
        action_number,
        period: small(action.get("period")).unwrap_or_default(),
        clock: text(action.get("clock")),
        team_id: id(action.get("teamId")),
        person_id: id(action.get("personId")),
        action_type: text(action.get("actionType")),
        sub_type: text(action.get("subType")),
        description: text(action.get("description")),
        score_home: int(action.get("scoreHome")),
        score_away: int(action.get("scoreAway")),
        x_legacy: int(action.get("xLegacy")),
        y_legacy: int(action.get("yLegacy")),
        shot_result: text(action.get("shotResult")),
        shot_value: small(action.get("shotValue")).filter(|v: &u8| *v > 0),
        shot_distance: int(action.get("shotDistance")).filter(|d| *d != 0),
        slots: [None; 3],
    })
}
