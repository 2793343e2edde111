//! Classroom model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionType;

/// What a room is equipped for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    /// Lecture room.
    #[default]
    Theoretical,
    /// Laboratory.
    Lab,
    /// Usable for both.
    Hybrid,
}

impl RoomType {
    /// Whether a session of `session_type` can be taught here.
    ///
    /// Combined sessions fit any room; lectures and labs need a matching
    /// or hybrid room.
    pub fn accepts(&self, session_type: SessionType) -> bool {
        match (self, session_type) {
            (RoomType::Hybrid, _) | (_, SessionType::Combined) => true,
            (RoomType::Theoretical, SessionType::Theoretical) => true,
            (RoomType::Lab, SessionType::Lab) => true,
            _ => false,
        }
    }
}

fn default_active() -> bool {
    true
}

/// A classroom as supplied by the data layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomRecord {
    /// Unique classroom identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Nominal seat count.
    pub capacity: u32,
    /// Room type.
    #[serde(default)]
    pub room_type: RoomType,
    /// Department that gets preference for this room.
    #[serde(default)]
    pub priority_department: Option<String>,
    /// Opening hours (raw JSON). `None` = unrestricted.
    #[serde(default)]
    pub available_hours: Option<Value>,
    /// Inactive rooms take no sessions.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ClassroomRecord {
    /// Creates an active, unrestricted lecture room.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capacity,
            room_type: RoomType::Theoretical,
            priority_department: None,
            available_hours: None,
            active: true,
        }
    }

    /// Sets the room type.
    pub fn with_type(mut self, room_type: RoomType) -> Self {
        self.room_type = room_type;
        self
    }

    /// Sets the priority department.
    pub fn with_priority_department(mut self, department: impl Into<String>) -> Self {
        self.priority_department = Some(department.into());
        self
    }

    /// Sets the opening hours.
    pub fn with_available_hours(mut self, hours: Value) -> Self {
        self.available_hours = Some(hours);
        self
    }

    /// Marks the room inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Seats available once a course's over-enrollment margin is applied.
    ///
    /// Saturates at `u32::MAX`.
    pub fn effective_capacity(&self, margin_percent: u32) -> u32 {
        let capacity = u64::from(self.capacity);
        let seats = capacity + capacity * u64::from(margin_percent) / 100;
        u32::try_from(seats).unwrap_or(u32::MAX)
    }
}
