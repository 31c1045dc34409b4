use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth;
use crate::models::{
    MemberRole, PersonalLog, PersonalLogPatch, PersonalPortfolio, Portfolio, PortfolioPatch,
    Session, Team, TeamInvite, TeamLog, TeamLogPatch, TeamLogWithAuthor, TeamMember,
    TeamMemberWithUser, User, UserPublic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOrder {
    CreatedDesc,
    CreatedAsc,
}

/// Narrow repository interface; handlers never see the backing store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Consumes a one-time verification token; returns the verified user id.
    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<Uuid>>;

    async fn create_session(&self, session: Session) -> anyhow::Result<()>;
    async fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>>;
    async fn delete_session(&self, token: &str) -> anyhow::Result<()>;

    /// Inserts the team and its leader membership. If the membership insert
    /// fails the team row is removed again, best effort.
    async fn create_team_with_leader(&self, team: Team, leader: TeamMember) -> anyhow::Result<()>;
    async fn find_team(&self, id: Uuid) -> anyhow::Result<Option<Team>>;
    async fn list_teams_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Team>>;
    async fn update_team(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> anyhow::Result<Option<Team>>;
    async fn delete_team(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<TeamMember>>;
    async fn list_members(&self, team_id: Uuid) -> anyhow::Result<Vec<TeamMemberWithUser>>;
    async fn add_member(&self, member: TeamMember) -> anyhow::Result<()>;
    async fn find_member(&self, team_id: Uuid, member_id: Uuid)
        -> anyhow::Result<Option<TeamMember>>;
    async fn remove_member(&self, member_id: Uuid) -> anyhow::Result<bool>;

    async fn active_invite_for_team(
        &self,
        team_id: Uuid,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>>;
    async fn active_invite_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>>;
    async fn create_invite(&self, invite: TeamInvite) -> anyhow::Result<()>;

    async fn create_team_log(&self, log: TeamLog) -> anyhow::Result<()>;
    async fn list_team_logs(
        &self,
        team_id: Uuid,
        order: LogOrder,
    ) -> anyhow::Result<Vec<TeamLogWithAuthor>>;
    async fn find_team_log(
        &self,
        team_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>>;
    async fn update_team_log(
        &self,
        log_id: Uuid,
        patch: TeamLogPatch,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>>;
    async fn delete_team_log(&self, log_id: Uuid) -> anyhow::Result<bool>;
    async fn count_team_logs_since(
        &self,
        team_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<u64>;

    async fn list_portfolios(&self, team_id: Uuid) -> anyhow::Result<Vec<Portfolio>>;
    async fn find_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
    ) -> anyhow::Result<Option<Portfolio>>;
    /// Overwrites the team's existing portfolio in place (keeping id,
    /// visibility, and public URL), or inserts `fresh` when none exists.
    async fn upsert_team_portfolio(&self, fresh: Portfolio) -> anyhow::Result<Portfolio>;
    async fn update_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
        patch: PortfolioPatch,
    ) -> anyhow::Result<Option<Portfolio>>;
    async fn delete_portfolio(&self, portfolio_id: Uuid) -> anyhow::Result<bool>;

    async fn create_personal_log(&self, log: PersonalLog) -> anyhow::Result<()>;
    async fn list_personal_logs(&self, user_id: Uuid) -> anyhow::Result<Vec<PersonalLog>>;
    async fn find_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<PersonalLog>>;
    async fn update_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
        patch: PersonalLogPatch,
    ) -> anyhow::Result<Option<PersonalLog>>;
    async fn delete_personal_log(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool>;

    async fn find_personal_portfolio(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<PersonalPortfolio>>;
    async fn is_slug_taken(&self, slug: &str, exclude_user: Uuid) -> anyhow::Result<bool>;
    /// Updates the user's portfolio in place (keeping id, slug, and
    /// created_at) or inserts `fresh` when none exists.
    async fn upsert_personal_portfolio(
        &self,
        fresh: PersonalPortfolio,
    ) -> anyhow::Result<PersonalPortfolio>;
}

pub const DEMO_USER_ID: &str = "1f1cdbec-5d48-4f2e-9a63-2b1f24d1c0de";
pub const DEMO_SESSION_TOKEN: &str = "demo-access-token";

#[derive(Default)]
struct MemInner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
    teams: HashMap<Uuid, Team>,
    members: HashMap<Uuid, TeamMember>,
    invites: HashMap<Uuid, TeamInvite>,
    team_logs: HashMap<Uuid, TeamLog>,
    personal_logs: HashMap<Uuid, PersonalLog>,
    portfolios: HashMap<Uuid, Portfolio>,
    personal_portfolios: HashMap<Uuid, PersonalPortfolio>,
}

/// In-process repository used by demo mode and tests. Constructed per
/// instance so parallel tests never share state.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a demo user, team, membership, one learning
    /// log, and a fixed session token, mirroring the `seed` CLI command.
    pub fn with_demo_data() -> anyhow::Result<Self> {
        let store = Self::new();
        let now = Utc::now();
        let user_id = Uuid::parse_str(DEMO_USER_ID).context("invalid demo user id")?;

        {
            let mut inner = store.inner.write().expect("mem store poisoned");
            inner.users.insert(
                user_id,
                User {
                    id: user_id,
                    email: "demo@learnteam.dev".to_string(),
                    name: "Demo User".to_string(),
                    password_hash: auth::hash_password("demo-password"),
                    email_verified: true,
                    verify_token: None,
                    created_at: now,
                },
            );
            inner.sessions.insert(
                DEMO_SESSION_TOKEN.to_string(),
                Session {
                    token: DEMO_SESSION_TOKEN.to_string(),
                    user_id,
                    created_at: now,
                    expires_at: now + chrono::Duration::days(auth::SESSION_TTL_DAYS),
                },
            );

            let team_id = Uuid::new_v4();
            inner.teams.insert(
                team_id,
                Team {
                    id: team_id,
                    name: "Sample Project Team".to_string(),
                    description: Some("Demo-mode sample team.".to_string()),
                    created_by: user_id,
                    created_at: now,
                    updated_at: now,
                },
            );

            let member_id = Uuid::new_v4();
            inner.members.insert(
                member_id,
                TeamMember {
                    id: member_id,
                    team_id,
                    user_id,
                    role: MemberRole::Leader,
                    joined_at: now,
                },
            );

            let log_id = Uuid::new_v4();
            inner.team_logs.insert(
                log_id,
                TeamLog {
                    id: log_id,
                    team_id,
                    created_by: user_id,
                    title: "First learning log".to_string(),
                    description: Some("Notes from kicking off the project.".to_string()),
                    what_learned: vec![
                        "Set up the axum router".to_string(),
                        "Wired sqlx migrations".to_string(),
                    ],
                    improvements: vec!["Review process needs structure".to_string()],
                    next_steps: vec!["Write integration tests".to_string()],
                    tags: vec!["rust".to_string(), "axum".to_string()],
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Ok(store)
    }

    fn author_of(inner: &MemInner, user_id: Uuid) -> Option<UserPublic> {
        inner.users.get(&user_id).map(UserPublic::from)
    }

    fn with_author(inner: &MemInner, log: &TeamLog) -> TeamLogWithAuthor {
        TeamLogWithAuthor {
            log: log.clone(),
            author: Self::author_of(inner, log.created_by),
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let user = inner
            .users
            .values_mut()
            .find(|u| u.verify_token.as_deref() == Some(token));
        Ok(user.map(|u| {
            u.email_verified = true;
            u.verify_token = None;
            u.id
        }))
    }

    async fn create_session(&self, session: Session) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.sessions.remove(token);
        Ok(())
    }

    async fn create_team_with_leader(&self, team: Team, leader: TeamMember) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.teams.insert(team.id, team);
        inner.members.insert(leader.id, leader);
        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> anyhow::Result<Option<Team>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner.teams.get(&id).cloned())
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Team>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let member_of: Vec<Uuid> = inner
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.team_id)
            .collect();

        let mut teams: Vec<Team> = inner
            .teams
            .values()
            .filter(|t| t.created_by == user_id || member_of.contains(&t.id))
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(teams)
    }

    async fn update_team(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> anyhow::Result<Option<Team>> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let Some(team) = inner.teams.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            team.name = name;
        }
        if let Some(description) = description {
            team.description = Some(description);
        }
        team.updated_at = Utc::now();
        Ok(Some(team.clone()))
    }

    async fn delete_team(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        if inner.teams.remove(&id).is_none() {
            return Ok(false);
        }
        inner.members.retain(|_, m| m.team_id != id);
        inner.team_logs.retain(|_, l| l.team_id != id);
        inner.invites.retain(|_, i| i.team_id != id);
        inner.portfolios.retain(|_, p| p.team_id != id);
        Ok(true)
    }

    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<TeamMember>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .members
            .values()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(&self, team_id: Uuid) -> anyhow::Result<Vec<TeamMemberWithUser>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let mut members: Vec<TeamMember> = inner
            .members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));

        Ok(members
            .into_iter()
            .map(|member| {
                let user = Self::author_of(&inner, member.user_id);
                TeamMemberWithUser { member, user }
            })
            .collect())
    }

    async fn add_member(&self, member: TeamMember) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.members.insert(member.id, member);
        Ok(())
    }

    async fn find_member(
        &self,
        team_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<Option<TeamMember>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .members
            .get(&member_id)
            .filter(|m| m.team_id == team_id)
            .cloned())
    }

    async fn remove_member(&self, member_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        Ok(inner.members.remove(&member_id).is_some())
    }

    async fn active_invite_for_team(
        &self,
        team_id: Uuid,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let mut invites: Vec<&TeamInvite> = inner
            .invites
            .values()
            .filter(|i| i.team_id == team_id && i.expires_at > now)
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites.first().map(|i| (*i).clone()))
    }

    async fn active_invite_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .invites
            .values()
            .find(|i| i.invite_code == code && i.expires_at > now)
            .cloned())
    }

    async fn create_invite(&self, invite: TeamInvite) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.invites.insert(invite.id, invite);
        Ok(())
    }

    async fn create_team_log(&self, log: TeamLog) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.team_logs.insert(log.id, log);
        Ok(())
    }

    async fn list_team_logs(
        &self,
        team_id: Uuid,
        order: LogOrder,
    ) -> anyhow::Result<Vec<TeamLogWithAuthor>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let mut logs: Vec<&TeamLog> = inner
            .team_logs
            .values()
            .filter(|l| l.team_id == team_id)
            .collect();
        match order {
            LogOrder::CreatedDesc => logs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            LogOrder::CreatedAsc => logs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        Ok(logs
            .into_iter()
            .map(|l| Self::with_author(&inner, l))
            .collect())
    }

    async fn find_team_log(
        &self,
        team_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .team_logs
            .get(&log_id)
            .filter(|l| l.team_id == team_id)
            .map(|l| Self::with_author(&inner, l)))
    }

    async fn update_team_log(
        &self,
        log_id: Uuid,
        patch: TeamLogPatch,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let Some(log) = inner.team_logs.get_mut(&log_id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            log.title = title;
        }
        if let Some(description) = patch.description {
            log.description = Some(description);
        }
        if let Some(what_learned) = patch.what_learned {
            log.what_learned = what_learned;
        }
        if let Some(improvements) = patch.improvements {
            log.improvements = improvements;
        }
        if let Some(next_steps) = patch.next_steps {
            log.next_steps = next_steps;
        }
        if let Some(tags) = patch.tags {
            log.tags = tags;
        }
        log.updated_at = Utc::now();
        let log = log.clone();
        Ok(Some(Self::with_author(&inner, &log)))
    }

    async fn delete_team_log(&self, log_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        Ok(inner.team_logs.remove(&log_id).is_some())
    }

    async fn count_team_logs_since(
        &self,
        team_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .team_logs
            .values()
            .filter(|l| l.team_id == team_id && l.created_at >= since)
            .count() as u64)
    }

    async fn list_portfolios(&self, team_id: Uuid) -> anyhow::Result<Vec<Portfolio>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let mut portfolios: Vec<Portfolio> = inner
            .portfolios
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        portfolios.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(portfolios)
    }

    async fn find_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
    ) -> anyhow::Result<Option<Portfolio>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .portfolios
            .get(&portfolio_id)
            .filter(|p| p.team_id == team_id)
            .cloned())
    }

    async fn upsert_team_portfolio(&self, fresh: Portfolio) -> anyhow::Result<Portfolio> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let existing_id = inner
            .portfolios
            .values()
            .find(|p| p.team_id == fresh.team_id)
            .map(|p| p.id);

        if let Some(id) = existing_id {
            let p = inner
                .portfolios
                .get_mut(&id)
                .expect("portfolio row vanished under write lock");
            p.title = fresh.title;
            p.summary = fresh.summary;
            p.content = fresh.content;
            p.updated_at = fresh.updated_at;
            Ok(p.clone())
        } else {
            inner.portfolios.insert(fresh.id, fresh.clone());
            Ok(fresh)
        }
    }

    async fn update_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
        patch: PortfolioPatch,
    ) -> anyhow::Result<Option<Portfolio>> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let Some(p) = inner
            .portfolios
            .get_mut(&portfolio_id)
            .filter(|p| p.team_id == team_id)
        else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            p.title = title;
        }
        if let Some(content) = patch.content {
            p.content = content;
        }
        if let Some(is_public) = patch.is_public {
            p.is_public = is_public;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    async fn delete_portfolio(&self, portfolio_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        Ok(inner.portfolios.remove(&portfolio_id).is_some())
    }

    async fn create_personal_log(&self, log: PersonalLog) -> anyhow::Result<()> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        inner.personal_logs.insert(log.id, log);
        Ok(())
    }

    async fn list_personal_logs(&self, user_id: Uuid) -> anyhow::Result<Vec<PersonalLog>> {
        let inner = self.inner.read().expect("mem store poisoned");
        let mut logs: Vec<PersonalLog> = inner
            .personal_logs
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| {
            b.log_date
                .cmp(&a.log_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(logs)
    }

    async fn find_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<PersonalLog>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .personal_logs
            .get(&log_id)
            .filter(|l| l.user_id == user_id)
            .cloned())
    }

    async fn update_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
        patch: PersonalLogPatch,
    ) -> anyhow::Result<Option<PersonalLog>> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let Some(log) = inner
            .personal_logs
            .get_mut(&log_id)
            .filter(|l| l.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(content) = patch.content {
            log.content = content;
        }
        if let Some(log_date) = patch.log_date {
            log.log_date = log_date;
        }
        if let Some(tags) = patch.tags {
            log.tags = if tags.is_empty() { None } else { Some(tags) };
        }
        Ok(Some(log.clone()))
    }

    async fn delete_personal_log(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let owned = inner
            .personal_logs
            .get(&log_id)
            .is_some_and(|l| l.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        Ok(inner.personal_logs.remove(&log_id).is_some())
    }

    async fn find_personal_portfolio(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<PersonalPortfolio>> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .personal_portfolios
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn is_slug_taken(&self, slug: &str, exclude_user: Uuid) -> anyhow::Result<bool> {
        let inner = self.inner.read().expect("mem store poisoned");
        Ok(inner
            .personal_portfolios
            .values()
            .any(|p| p.slug == slug && p.user_id != exclude_user))
    }

    async fn upsert_personal_portfolio(
        &self,
        fresh: PersonalPortfolio,
    ) -> anyhow::Result<PersonalPortfolio> {
        let mut inner = self.inner.write().expect("mem store poisoned");
        let existing_id = inner
            .personal_portfolios
            .values()
            .find(|p| p.user_id == fresh.user_id)
            .map(|p| p.id);

        if let Some(id) = existing_id {
            let p = inner
                .personal_portfolios
                .get_mut(&id)
                .expect("portfolio row vanished under write lock");
            p.bio = fresh.bio;
            p.skills = fresh.skills;
            p.achievements = fresh.achievements;
            p.is_public = fresh.is_public;
            p.updated_at = fresh.updated_at;
            Ok(p.clone())
        } else {
            inner.personal_portfolios.insert(fresh.id, fresh.clone());
            Ok(fresh)
        }
    }
}
