use crate::extract::fields::{id, int, small, text};
use crate::extract::{ExtractError, RawActionRecord};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const GAME_ID: &str = "GAME_ID";
const EVENTNUM: &str = "EVENTNUM";

fn free_throw_fragment_re() -> &'static Regex {
    static FREE_THROW_FRAGMENT_RE: OnceLock<Regex> = OnceLock::new();
    FREE_THROW_FRAGMENT_RE
        .get_or_init(|| Regex::new(r"\d+ of \d+").expect("valid free throw fragment regex"))
}

/// Maps `EVENTMSGTYPE` codes onto the action-type vocabulary of the nested schema.
fn action_type(code: i64) -> Option<&'static str> {
    Some(match code {
        1 => "Made Shot",
        2 => "Missed Shot",
        3 => "Free Throw",
        4 => "Rebound",
        5 => "Turnover",
        6 => "Foul",
        7 => "Violation",
        8 => "Substitution",
        9 => "Timeout",
        10 => "Jump Ball",
        11 => "Ejection",
        12 | 13 => "period",
        18 => "Instant Replay",
        _ => return None,
    })
}

struct Columns<'a> {
    index: HashMap<&'a str, usize>,
}

impl<'a> Columns<'a> {
    fn new(headers: &[&'a str]) -> Self {
        Self {
            index: headers.iter().enumerate().map(|(i, h)| (*h, i)).collect(),
        }
    }

    fn require(&self, name: &'static str) -> Result<(), ExtractError> {
        if self.index.contains_key(name) {
            Ok(())
        } else {
            Err(ExtractError::MissingColumn(name))
        }
    }

    fn cell<'r>(&self, row: &'r [Value], name: &str) -> Option<&'r Value> {
        self.index.get(name).and_then(|i| row.get(*i))
    }
}

pub(super) fn records(headers: &[&str], rows: &[Value]) -> Result<Vec<RawActionRecord>, ExtractError> {
    let columns = Columns::new(headers);
    columns.require(GAME_ID)?;
    columns.require(EVENTNUM)?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let row = row
                .as_array()
                .ok_or_else(|| ExtractError::MalformedAction {
                    index,
                    reason: "row is not an array".to_string(),
                })?;
            record(&columns, index, row)
        })
        .collect()
}

fn record(columns: &Columns<'_>, index: usize, row: &[Value]) -> Result<RawActionRecord, ExtractError> {
    let malformed = |reason: &str| ExtractError::MalformedAction {
        index,
        reason: reason.to_string(),
    };
    let game_id = text(columns.cell(row, GAME_ID)).ok_or_else(|| malformed("missing GAME_ID"))?;
    let action_number =
        small(columns.cell(row, EVENTNUM)).ok_or_else(|| malformed("missing EVENTNUM"))?;

    let code = int(columns.cell(row, "EVENTMSGTYPE"));
    let description = description(columns, row);
    let (score_away, score_home) = score(columns.cell(row, "SCORE"));

    let is_field_goal = matches!(code, Some(1 | 2));
    let shot_value = is_field_goal.then(|| {
        if description.as_deref().is_some_and(|d| d.contains("3PT")) {
            3
        } else {
            2
        }
    });
    let shot_result = match code {
        Some(1) => Some("Made".to_string()),
        Some(2) => Some("Missed".to_string()),
        _ => None,
    };
    let sub_type = match code {
        Some(3) => description
            .as_deref()
            .and_then(|d| free_throw_fragment_re().find(d))
            .map(|m| m.as_str().to_string()),
        _ => None,
    };

    Ok(RawActionRecord {
        game_id,
        action_number,
        period: small(columns.cell(row, "PERIOD")).unwrap_or_default(),
        clock: text(columns.cell(row, "PCTIMESTRING")).and_then(|c| clock(&c)),
        team_id: id(columns.cell(row, "PLAYER1_TEAM_ID")),
        person_id: id(columns.cell(row, "PLAYER1_ID")),
        action_type: code.and_then(action_type).map(ToString::to_string),
        sub_type,
        description,
        score_home,
        score_away,
        x_legacy: None,
        y_legacy: None,
        shot_result,
        shot_value,
        shot_distance: None,
        slots: [
            id(columns.cell(row, "PLAYER1_ID")),
            id(columns.cell(row, "PLAYER2_ID")),
            id(columns.cell(row, "PLAYER3_ID")),
        ],
    })
}

fn description(columns: &Columns<'_>, row: &[Value]) -> Option<String> {
    let parts = ["HOMEDESCRIPTION", "NEUTRALDESCRIPTION", "VISITORDESCRIPTION"]
        .into_iter()
        .filter_map(|name| text(columns.cell(row, name)))
        .collect::<Vec<_>>();
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// `SCORE` is `"<away> - <home>"` on scoring rows and null elsewhere.
fn score(cell: Option<&Value>) -> (Option<i64>, Option<i64>) {
    let Some(raw) = text(cell) else {
        return (None, None);
    };
    match raw.split_once('-') {
        Some((away, home)) => (away.trim().parse().ok(), home.trim().parse().ok()),
        None => (None, None),
    }
}

/// `PCTIMESTRING` is `M:SS`; rewrite it into the `PT<m>M<s>S` form.
fn clock(raw: &str) -> Option<String> {
    let (minutes, seconds) = raw.split_once(':')?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: f64 = seconds.trim().parse().ok()?;
    Some(format!("PT{minutes:02}M{seconds:05.2}S"))
}
