pub mod clock;
pub mod payload;
pub mod roles;
pub mod score;

use crate::extract::RawActionRecord;
use crate::normalize::payload::{
    EventPayload, FreeThrowDetails, Participant, ReboundKind, ShotDetails, ShotGeometry,
    assist_name, free_throw_attempt,
};
use crate::normalize::roles::{Participants, Role};
use crate::normalize::score::ScoreState;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

fn steal_or_block_re() -> &'static Regex {
    static STEAL_OR_BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    STEAL_OR_BLOCK_RE
        .get_or_init(|| Regex::new(r"STEAL|BLOCK").expect("valid steal/block regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Shot,
    FreeThrow,
    Foul,
    Turnover,
    Steal,
    Block,
    Rebound,
    JumpBall,
    Substitution,
    Timeout,
    Other,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        EventType::Shot,
        EventType::FreeThrow,
        EventType::Foul,
        EventType::Turnover,
        EventType::Steal,
        EventType::Block,
        EventType::Rebound,
        EventType::JumpBall,
        EventType::Substitution,
        EventType::Timeout,
        EventType::Other,
    ];

    fn from_action_type(action_type: &str) -> Option<Self> {
        Some(match action_type {
            "Made Shot" | "Missed Shot" => EventType::Shot,
            "Free Throw" => EventType::FreeThrow,
            "Foul" | "Violation" => EventType::Foul,
            "Turnover" => EventType::Turnover,
            "Steal" => EventType::Steal,
            "Block" => EventType::Block,
            "Rebound" => EventType::Rebound,
            "Jump Ball" => EventType::JumpBall,
            "Substitution" => EventType::Substitution,
            "Timeout" => EventType::Timeout,
            _ => return None,
        })
    }

    /// Resolves the action type, falling back to a `STEAL`/`BLOCK` mention in
    /// the play text when the action type is absent or unrecognised.
    pub fn classify(action_type: Option<&str>, description: Option<&str>) -> Self {
        if let Some(event_type) = action_type.and_then(Self::from_action_type) {
            return event_type;
        }
        match description.and_then(|d| steal_or_block_re().find(d)).map(|m| m.as_str()) {
            Some("STEAL") => EventType::Steal,
            Some("BLOCK") => EventType::Block,
            _ => EventType::Other,
        }
    }
}

/// One normalized action. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    pub game_id: String,
    pub action_id: String,
    pub team_id: Option<i64>,
    pub person_id: Option<i64>,
    pub period: u8,
    pub minutes_remaining: f64,
    pub event_type: EventType,
    pub event_subtype: Option<String>,
    pub points_scored: u32,
    pub description: Option<String>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("action {action_id}: clock {clock:?} is not PT<m>M<s>S")]
    Clock {
        action_id: String,
        clock: Option<String>,
    },
    #[error("action {action_id}: {event_type:?} requires a player for {role:?}")]
    MissingRole {
        action_id: String,
        event_type: EventType,
        role: Role,
    },
    #[error("action {action_id}: shot has no shot value")]
    ShotValue { action_id: String },
}

/// Folds action records into normalized events, keeping one running score
/// per game. Records of a game must arrive in ascending action number.
#[derive(Debug, Default)]
pub struct EventNormalizer {
    scores: HashMap<String, ScoreState>,
}

impl EventNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, game_id: &str) -> Option<ScoreState> {
        self.scores.get(game_id).copied()
    }

    pub fn normalize(&mut self, record: RawActionRecord) -> Result<NormalizedEvent, NormalizeError> {
        let record = record.normalize_nulls();
        let action_id = record.action_id();

        // Score state advances even when the record is later rejected.
        let points_scored = self
            .scores
            .entry(record.game_id.clone())
            .or_default()
            .advance(record.score_home, record.score_away);

        let minutes_remaining = record
            .clock
            .as_deref()
            .and_then(clock::minutes_remaining)
            .ok_or_else(|| NormalizeError::Clock {
                action_id: action_id.clone(),
                clock: record.clock.clone(),
            })?;

        let event_type =
            EventType::classify(record.action_type.as_deref(), record.description.as_deref());
        let payload = build_payload(event_type, &record, &action_id, points_scored)?;

        Ok(NormalizedEvent {
            game_id: record.game_id,
            action_id,
            team_id: record.team_id,
            person_id: record.person_id,
            period: record.period,
            minutes_remaining,
            event_type,
            event_subtype: record.sub_type,
            points_scored,
            description: record.description,
            payload,
        })
    }

    /// Normalizes a batch in order, dropping records that fail.
    pub fn normalize_all<I>(&mut self, records: I) -> Vec<NormalizedEvent>
    where
        I: IntoIterator<Item = RawActionRecord>,
    {
        let mut events = Vec::new();
        let mut dropped = 0usize;
        for record in records {
            match self.normalize(record) {
                Ok(event) => events.push(event),
                Err(err) => {
                    dropped += 1;
                    debug!(error = %err, "dropping record");
                }
            }
        }
        if dropped > 0 {
            debug!(kept = events.len(), dropped, "normalized batch");
        }
        events
    }
}

pub fn normalize_batch(records: Vec<RawActionRecord>) -> Vec<NormalizedEvent> {
    EventNormalizer::new().normalize_all(records)
}

fn build_payload(
    event_type: EventType,
    record: &RawActionRecord,
    action_id: &str,
    points_scored: u32,
) -> Result<EventPayload, NormalizeError> {
    let players = Participants::new(event_type, &record.slots);
    let require = |role: Role| {
        players.get(role).ok_or_else(|| NormalizeError::MissingRole {
            action_id: action_id.to_string(),
            event_type,
            role,
        })
    };
    if let Some(role) = players.missing_required() {
        return Err(NormalizeError::MissingRole {
            action_id: action_id.to_string(),
            event_type,
            role,
        });
    }

    Ok(match event_type {
        EventType::Shot => {
            let points = record.shot_value.ok_or_else(|| NormalizeError::ShotValue {
                action_id: action_id.to_string(),
            })?;
            let geometry = match (record.x_legacy, record.y_legacy) {
                (Some(x), Some(y)) => Some(ShotGeometry::from_legacy(x, y)),
                _ => None,
            };
            let assisted_by = players
                .get(Role::AssistedBy)
                .map(Participant::Id)
                .or_else(|| {
                    record
                        .description
                        .as_deref()
                        .and_then(assist_name)
                        .map(Participant::Name)
                });
            EventPayload::Shot(ShotDetails {
                points,
                made: points_scored > 0,
                shot_type: record.sub_type.clone(),
                geometry,
                by: players.get(Role::By).or(record.person_id),
                assisted_by,
            })
        }
        EventType::FreeThrow => {
            let count = record.sub_type.as_deref().and_then(free_throw_attempt);
            EventPayload::FreeThrow(FreeThrowDetails {
                attempt: count.map(|(attempt, _)| attempt),
                of: count.map(|(_, of)| of),
                made: points_scored > 0,
            })
        }
        EventType::Foul => EventPayload::Foul {
            by: players.get(Role::By),
            on: players.get(Role::On),
        },
        EventType::Turnover => EventPayload::Turnover {
            by: players.get(Role::By),
            recovered_by: players.get(Role::RecoveredBy),
            turnover_type: record.sub_type.clone(),
        },
        EventType::Steal => EventPayload::Steal {
            by: require(Role::By)?,
            stolen_from: players.get(Role::StolenFrom),
        },
        EventType::Block => EventPayload::Block {
            by: require(Role::By)?,
            on: players.get(Role::On),
        },
        EventType::Rebound => EventPayload::Rebound {
            by: players.get(Role::By),
            kind: ReboundKind::Unknown,
        },
        EventType::JumpBall => EventPayload::JumpBall {
            players: (require(Role::JumpBallFirst)?, require(Role::JumpBallSecond)?),
            recovered_by: players.get(Role::RecoveredBy),
        },
        EventType::Substitution => EventPayload::Substitution {
            player_in: require(Role::In)?,
            player_out: require(Role::Out)?,
        },
        EventType::Timeout => EventPayload::Timeout,
        EventType::Other => EventPayload::Other,
    })
}
