use marquee_shared::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The verified caller of an operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }

    /// True if the actor may manage an event owned by `organizer_id`.
    pub fn manages(&self, organizer_id: Uuid) -> bool {
        self.is_admin() || (self.is_organizer() && self.user_id == organizer_id)
    }
}
