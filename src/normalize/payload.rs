use crate::normalize::EventType;
use regex::Regex;
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;
use std::sync::OnceLock;

fn assist_re() -> &'static Regex {
    static ASSIST_RE: OnceLock<Regex> = OnceLock::new();
    ASSIST_RE.get_or_init(|| Regex::new(r"\(([^()]+?) \d+ AST\)").expect("valid assist regex"))
}

fn free_throw_re() -> &'static Regex {
    static FREE_THROW_RE: OnceLock<Regex> = OnceLock::new();
    FREE_THROW_RE.get_or_init(|| {
        Regex::new(r"(?<attempt>\d+) of (?<of>\d+)").expect("valid free throw regex")
    })
}

/// A participant known either by feed id or only by the name in the play text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Participant {
    Id(i64),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReboundKind {
    Offensive,
    Defensive,
    /// Telling offensive from defensive needs a lookback rule that is not
    /// defined yet.
    Unknown,
}

/// Shot position in feet with the basket at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotGeometry {
    pub location: (f64, f64),
    pub distance: f64,
    /// `atan(x / y)` in radians; a baseline shot (`y == 0`) is `±π/2`.
    pub angle: f64,
}

impl ShotGeometry {
    pub fn from_legacy(x_legacy: i64, y_legacy: i64) -> Self {
        let x = x_legacy as f64 / 10.0;
        let y = y_legacy as f64 / 10.0;
        let angle = if y == 0.0 {
            if x > 0.0 {
                FRAC_PI_2
            } else if x < 0.0 {
                -FRAC_PI_2
            } else {
                0.0
            }
        } else {
            (x / y).atan()
        };
        Self {
            location: (x, y),
            distance: (x * x + y * y).sqrt(),
            angle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotDetails {
    pub points: u8,
    pub made: bool,
    #[serde(rename = "type")]
    pub shot_type: Option<String>,
    pub geometry: Option<ShotGeometry>,
    pub by: Option<i64>,
    pub assisted_by: Option<Participant>,
}

/// `attempt` and `of` are null for subtypes without an `<n> of <m>` count,
/// such as technical free throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeThrowDetails {
    pub attempt: Option<u8>,
    pub of: Option<u8>,
    pub made: bool,
}

/// Type-specific event details; the variant always matches the event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Shot(ShotDetails),
    FreeThrow(FreeThrowDetails),
    Foul {
        by: Option<i64>,
        on: Option<i64>,
    },
    Turnover {
        by: Option<i64>,
        recovered_by: Option<i64>,
        #[serde(rename = "type")]
        turnover_type: Option<String>,
    },
    Steal {
        by: i64,
        stolen_from: Option<i64>,
    },
    Block {
        by: i64,
        on: Option<i64>,
    },
    Rebound {
        by: Option<i64>,
        #[serde(rename = "type")]
        kind: ReboundKind,
    },
    JumpBall {
        players: (i64, i64),
        recovered_by: Option<i64>,
    },
    Substitution {
        #[serde(rename = "in")]
        player_in: i64,
        #[serde(rename = "out")]
        player_out: i64,
    },
    Timeout,
    Other,
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Shot(_) => EventType::Shot,
            EventPayload::FreeThrow(_) => EventType::FreeThrow,
            EventPayload::Foul { .. } => EventType::Foul,
            EventPayload::Turnover { .. } => EventType::Turnover,
            EventPayload::Steal { .. } => EventType::Steal,
            EventPayload::Block { .. } => EventType::Block,
            EventPayload::Rebound { .. } => EventType::Rebound,
            EventPayload::JumpBall { .. } => EventType::JumpBall,
            EventPayload::Substitution { .. } => EventType::Substitution,
            EventPayload::Timeout => EventType::Timeout,
            EventPayload::Other => EventType::Other,
        }
    }
}

/// Assisting player's name from play text such as `"(Curry 4 AST)"`.
pub fn assist_name(description: &str) -> Option<String> {
    assist_re()
        .captures(description)
        .map(|caps| caps[1].trim().to_string())
}

/// `(attempt, of)` from a free-throw subtype such as `"Free Throw 1 of 2"`.
pub fn free_throw_attempt(sub_type: &str) -> Option<(u8, u8)> {
    let caps = free_throw_re().captures(sub_type)?;
    Some((caps["attempt"].parse().ok()?, caps["of"].parse().ok()?))
}
