use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verify_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The subset of a user that is safe to embed in API responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        UserPublic {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Leader,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Leader => "leader",
            MemberRole::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "leader" => Some(MemberRole::Leader),
            "member" => Some(MemberRole::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMemberWithUser {
    #[serde(flatten)]
    pub member: TeamMember,
    pub user: Option<UserPublic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamInvite {
    pub id: Uuid,
    pub team_id: Uuid,
    pub invite_code: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamLog {
    pub id: Uuid,
    pub team_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub what_learned: Vec<String>,
    pub improvements: Vec<String>,
    pub next_steps: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamLogWithAuthor {
    #[serde(flatten)]
    pub log: TeamLog,
    pub author: Option<UserPublic>,
}

/// Partial update for a team log; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamLogPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub what_learned: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
    pub next_steps: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub log_date: NaiveDate,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalLogPatch {
    pub content: Option<String>,
    pub log_date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub team_id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub public_url: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalPortfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub achievements: Vec<String>,
    pub is_public: bool,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
