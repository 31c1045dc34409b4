use uuid::Uuid;

use crate::models::{MemberRole, Team, TeamMember};

/// Mutating team-level resources requires the team creator or a leader
/// membership. The creator qualifies even without a membership row.
pub fn can_modify(team: &Team, membership: Option<&TeamMember>, user_id: Uuid) -> bool {
    if team.created_by == user_id {
        return true;
    }
    membership
        .map(|m| m.user_id == user_id && m.role == MemberRole::Leader)
        .unwrap_or(false)
}

/// Viewing or contributing only requires membership or creatorship.
pub fn can_view(team: &Team, membership: Option<&TeamMember>, user_id: Uuid) -> bool {
    if team.created_by == user_id {
        return true;
    }
    membership.map(|m| m.user_id == user_id).unwrap_or(false)
}
