//! Which anonymous player slot plays which role, per event type.

use crate::normalize::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    By,
    On,
    AssistedBy,
    RecoveredBy,
    StolenFrom,
    JumpBallFirst,
    JumpBallSecond,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSlot {
    pub role: Role,
    pub slot: usize,
    pub required: bool,
}

const fn optional(role: Role, slot: usize) -> RoleSlot {
    RoleSlot {
        role,
        slot,
        required: false,
    }
}

const fn required(role: Role, slot: usize) -> RoleSlot {
    RoleSlot {
        role,
        slot,
        required: true,
    }
}

const SHOT: &[RoleSlot] = &[optional(Role::By, 0), optional(Role::AssistedBy, 1)];
const FOUL: &[RoleSlot] = &[optional(Role::By, 0), optional(Role::On, 1)];
const TURNOVER: &[RoleSlot] = &[optional(Role::By, 0), optional(Role::RecoveredBy, 1)];
const STEAL: &[RoleSlot] = &[required(Role::By, 1), optional(Role::StolenFrom, 0)];
const BLOCK: &[RoleSlot] = &[required(Role::By, 2), optional(Role::On, 0)];
const REBOUND: &[RoleSlot] = &[optional(Role::By, 0)];
const JUMP_BALL: &[RoleSlot] = &[
    required(Role::JumpBallFirst, 0),
    required(Role::JumpBallSecond, 1),
    optional(Role::RecoveredBy, 2),
];
const SUBSTITUTION: &[RoleSlot] = &[required(Role::In, 1), required(Role::Out, 0)];

pub fn slot_roles(event_type: EventType) -> &'static [RoleSlot] {
    match event_type {
        EventType::Shot => SHOT,
        EventType::Foul => FOUL,
        EventType::Turnover => TURNOVER,
        EventType::Steal => STEAL,
        EventType::Block => BLOCK,
        EventType::Rebound => REBOUND,
        EventType::JumpBall => JUMP_BALL,
        EventType::Substitution => SUBSTITUTION,
        EventType::FreeThrow | EventType::Timeout | EventType::Other => &[],
    }
}

/// Slot values of one record viewed through its event type's role table.
#[derive(Debug, Clone, Copy)]
pub struct Participants<'a> {
    table: &'static [RoleSlot],
    slots: &'a [Option<i64>; 3],
}

impl<'a> Participants<'a> {
    pub fn new(event_type: EventType, slots: &'a [Option<i64>; 3]) -> Self {
        Self {
            table: slot_roles(event_type),
            slots,
        }
    }

    pub fn get(&self, role: Role) -> Option<i64> {
        self.table
            .iter()
            .find(|r| r.role == role)
            .and_then(|r| self.slots.get(r.slot).copied().flatten())
    }

    /// First required role whose slot is empty.
    pub fn missing_required(&self) -> Option<Role> {
        self.table
            .iter()
            .find(|r| r.required && self.slots.get(r.slot).copied().flatten().is_none())
            .map(|r| r.role)
    }
}
