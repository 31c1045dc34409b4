use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::auth;
use crate::models::{
    MemberRole, PersonalLog, PersonalLogPatch, PersonalPortfolio, Portfolio, PortfolioPatch,
    Session, Team, TeamInvite, TeamLog, TeamLogPatch, TeamLogWithAuthor, TeamMember,
    TeamMemberWithUser, User, UserPublic,
};
use crate::store::{LogOrder, Store, DEMO_SESSION_TOKEN, DEMO_USER_ID};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let user_id = Uuid::parse_str(DEMO_USER_ID)?;
    let team_id = Uuid::parse_str("7be4a8d0-93c2-4bd1-8a4e-52e3a6f0c9b1")?;
    let member_id = Uuid::parse_str("9c61e3a7-08d4-40f9-9ad2-6f1b2c8e7d45")?;
    let log_id = Uuid::parse_str("c2f9d5b3-7a1e-48c6-b0d9-3e8f4a6c1b27")?;

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, email_verified)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(user_id)
    .bind("demo@learnteam.dev")
    .bind("Demo User")
    .bind(auth::hash_password("demo-password"))
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO sessions (token, user_id, expires_at)
        VALUES ($1, $2, NOW() + INTERVAL '30 days')
        ON CONFLICT (token) DO NOTHING
        "#,
    )
    .bind(DEMO_SESSION_TOKEN)
    .bind(user_id)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO teams (id, name, description, created_by)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(team_id)
    .bind("Sample Project Team")
    .bind("Seeded sample team.")
    .bind(user_id)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO team_members (id, team_id, user_id, role)
        VALUES ($1, $2, $3, 'leader')
        ON CONFLICT (team_id, user_id) DO NOTHING
        "#,
    )
    .bind(member_id)
    .bind(team_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO learning_logs
        (id, team_id, created_by, title, description, what_learned, improvements, next_steps, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(log_id)
    .bind(team_id)
    .bind(user_id)
    .bind("First learning log")
    .bind("Notes from kicking off the project.")
    .bind(vec![
        "Set up the axum router".to_string(),
        "Wired sqlx migrations".to_string(),
    ])
    .bind(vec!["Review process needs structure".to_string()])
    .bind(vec!["Write integration tests".to_string()])
    .bind(vec!["rust".to_string(), "axum".to_string()])
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &Path,
    team_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        title: String,
        description: Option<String>,
        what_learned: String,
        improvements: Option<String>,
        next_steps: Option<String>,
        tags: Option<String>,
    }

    fn split_list(value: Option<&str>) -> Vec<String> {
        value
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    let team_exists: bool = sqlx::query("SELECT 1 AS one FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(pool)
        .await?
        .is_some();
    anyhow::ensure!(team_exists, "team {team_id} does not exist");

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let what_learned = split_list(Some(&row.what_learned));
        anyhow::ensure!(
            !what_learned.is_empty(),
            "row {:?} has no what_learned items",
            row.title
        );

        sqlx::query(
            r#"
            INSERT INTO learning_logs
            (id, team_id, created_by, title, description,
             what_learned, improvements, next_steps, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(user_id)
        .bind(&row.title)
        .bind(row.description.as_deref().filter(|d| !d.is_empty()))
        .bind(&what_learned)
        .bind(split_list(row.improvements.as_deref()))
        .bind(split_list(row.next_steps.as_deref()))
        .bind(split_list(row.tags.as_deref()))
        .execute(pool)
        .await?;

        inserted += 1;
    }

    Ok(inserted)
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        email_verified: row.get("email_verified"),
        verify_token: row.get("verify_token"),
        created_at: row.get("created_at"),
    }
}

fn team_from_row(row: &PgRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn member_from_row(row: &PgRow) -> anyhow::Result<TeamMember> {
    let role: String = row.get("role");
    Ok(TeamMember {
        id: row.get("id"),
        team_id: row.get("team_id"),
        user_id: row.get("user_id"),
        role: MemberRole::parse(&role).with_context(|| format!("unknown member role {role}"))?,
        joined_at: row.get("joined_at"),
    })
}

fn invite_from_row(row: &PgRow) -> TeamInvite {
    TeamInvite {
        id: row.get("id"),
        team_id: row.get("team_id"),
        invite_code: row.get("invite_code"),
        created_by: row.get("created_by"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }
}

fn team_log_from_row(row: &PgRow) -> TeamLog {
    TeamLog {
        id: row.get("id"),
        team_id: row.get("team_id"),
        created_by: row.get("created_by"),
        title: row.get("title"),
        description: row.get("description"),
        what_learned: row.get("what_learned"),
        improvements: row.get("improvements"),
        next_steps: row.get("next_steps"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn log_with_author_from_row(row: &PgRow) -> TeamLogWithAuthor {
    let author_id: Option<Uuid> = row.get("author_id");
    let author = author_id.map(|id| UserPublic {
        id,
        name: row.get("author_name"),
        email: row.get("author_email"),
    });
    TeamLogWithAuthor {
        log: team_log_from_row(row),
        author,
    }
}

fn portfolio_from_row(row: &PgRow) -> Portfolio {
    Portfolio {
        id: row.get("id"),
        team_id: row.get("team_id"),
        title: row.get("title"),
        summary: row.get("summary"),
        content: row.get("content"),
        public_url: row.get("public_url"),
        is_public: row.get("is_public"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn personal_log_from_row(row: &PgRow) -> PersonalLog {
    PersonalLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        log_date: row.get("log_date"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
    }
}

fn personal_portfolio_from_row(row: &PgRow) -> PersonalPortfolio {
    PersonalPortfolio {
        id: row.get("id"),
        user_id: row.get("user_id"),
        bio: row.get("bio"),
        skills: row.get("skills"),
        achievements: row.get("achievements"),
        is_public: row.get("is_public"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const LOG_WITH_AUTHOR_SELECT: &str = "SELECT l.id, l.team_id, l.created_by, l.title, \
     l.description, l.what_learned, l.improvements, l.next_steps, l.tags, \
     l.created_at, l.updated_at, \
     u.id AS author_id, u.name AS author_name, u.email AS author_email \
     FROM learning_logs l LEFT JOIN users u ON u.id = l.created_by";

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, email_verified, verify_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.email_verified)
        .bind(&user.verify_token)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn verify_email(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let row = sqlx::query(
            r#"
            UPDATE users SET email_verified = TRUE, verify_token = NULL
            WHERE verify_token = $1
            RETURNING id
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn create_session(&self, session: Session) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Session {
            token: r.get("token"),
            user_id: r.get("user_id"),
            created_at: r.get("created_at"),
            expires_at: r.get("expires_at"),
        }))
    }

    async fn delete_session(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_team_with_leader(&self, team: Team, leader: TeamMember) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (id, name, description, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(team.created_by)
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&self.pool)
        .await?;

        let member_insert = sqlx::query(
            r#"
            INSERT INTO team_members (id, team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(leader.id)
        .bind(leader.team_id)
        .bind(leader.user_id)
        .bind(leader.role.as_str())
        .bind(leader.joined_at)
        .execute(&self.pool)
        .await;

        if let Err(err) = member_insert {
            // Best-effort rollback of the orphaned team row.
            if let Err(cleanup) = sqlx::query("DELETE FROM teams WHERE id = $1")
                .bind(team.id)
                .execute(&self.pool)
                .await
            {
                tracing::warn!(error = %cleanup, team_id = %team.id, "orphaned team cleanup failed");
            }
            return Err(err.into());
        }

        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> anyhow::Result<Option<Team>> {
        let row = sqlx::query("SELECT * FROM teams WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(team_from_row))
    }

    async fn list_teams_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Team>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT t.id, t.name, t.description, t.created_by, t.created_at, t.updated_at
            FROM teams t
            LEFT JOIN team_members m ON m.team_id = t.id AND m.user_id = $1
            WHERE t.created_by = $1 OR m.user_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(team_from_row).collect())
    }

    async fn update_team(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> anyhow::Result<Option<Team>> {
        let row = sqlx::query(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(team_from_row))
    }

    async fn delete_team(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_membership(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<TeamMember>> {
        let row = sqlx::query("SELECT * FROM team_members WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn list_members(&self, team_id: Uuid) -> anyhow::Result<Vec<TeamMemberWithUser>> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.team_id, m.user_id, m.role, m.joined_at,
                   u.id AS user_row_id, u.name AS user_name, u.email AS user_email
            FROM team_members m
            LEFT JOIN users u ON u.id = m.user_id
            WHERE m.team_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_row_id: Option<Uuid> = row.get("user_row_id");
            let user = user_row_id.map(|id| UserPublic {
                id,
                name: row.get("user_name"),
                email: row.get("user_email"),
            });
            members.push(TeamMemberWithUser {
                member: member_from_row(row)?,
                user,
            });
        }
        Ok(members)
    }

    async fn add_member(&self, member: TeamMember) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO team_members (id, team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(member.id)
        .bind(member.team_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .bind(member.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_member(
        &self,
        team_id: Uuid,
        member_id: Uuid,
    ) -> anyhow::Result<Option<TeamMember>> {
        let row = sqlx::query("SELECT * FROM team_members WHERE id = $1 AND team_id = $2")
            .bind(member_id)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn remove_member(&self, member_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn active_invite_for_team(
        &self,
        team_id: Uuid,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM team_invites
            WHERE team_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(invite_from_row))
    }

    async fn active_invite_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TeamInvite>> {
        let row = sqlx::query("SELECT * FROM team_invites WHERE invite_code = $1 AND expires_at > $2")
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(invite_from_row))
    }

    async fn create_invite(&self, invite: TeamInvite) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO team_invites (id, team_id, invite_code, created_by, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(invite.id)
        .bind(invite.team_id)
        .bind(&invite.invite_code)
        .bind(invite.created_by)
        .bind(invite.expires_at)
        .bind(invite.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_team_log(&self, log: TeamLog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learning_logs
            (id, team_id, created_by, title, description,
             what_learned, improvements, next_steps, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(log.id)
        .bind(log.team_id)
        .bind(log.created_by)
        .bind(&log.title)
        .bind(&log.description)
        .bind(&log.what_learned)
        .bind(&log.improvements)
        .bind(&log.next_steps)
        .bind(&log.tags)
        .bind(log.created_at)
        .bind(log.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_team_logs(
        &self,
        team_id: Uuid,
        order: LogOrder,
    ) -> anyhow::Result<Vec<TeamLogWithAuthor>> {
        let direction = match order {
            LogOrder::CreatedDesc => "DESC",
            LogOrder::CreatedAsc => "ASC",
        };
        let query = format!("{LOG_WITH_AUTHOR_SELECT} WHERE l.team_id = $1 ORDER BY l.created_at {direction}");
        let rows = sqlx::query(&query)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(log_with_author_from_row).collect())
    }

    async fn find_team_log(
        &self,
        team_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>> {
        let query = format!("{LOG_WITH_AUTHOR_SELECT} WHERE l.id = $1 AND l.team_id = $2");
        let row = sqlx::query(&query)
            .bind(log_id)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(log_with_author_from_row))
    }

    async fn update_team_log(
        &self,
        log_id: Uuid,
        patch: TeamLogPatch,
    ) -> anyhow::Result<Option<TeamLogWithAuthor>> {
        let updated = sqlx::query(
            r#"
            UPDATE learning_logs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                what_learned = COALESCE($4, what_learned),
                improvements = COALESCE($5, improvements),
                next_steps = COALESCE($6, next_steps),
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, team_id
            "#,
        )
        .bind(log_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.what_learned)
        .bind(patch.improvements)
        .bind(patch.next_steps)
        .bind(patch.tags)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => self.find_team_log(row.get("team_id"), log_id).await,
            None => Ok(None),
        }
    }

    async fn delete_team_log(&self, log_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM learning_logs WHERE id = $1")
            .bind(log_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_team_logs_since(
        &self,
        team_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM learning_logs WHERE team_id = $1 AND created_at >= $2",
        )
        .bind(team_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn list_portfolios(&self, team_id: Uuid) -> anyhow::Result<Vec<Portfolio>> {
        let rows = sqlx::query(
            "SELECT * FROM portfolios WHERE team_id = $1 ORDER BY created_at DESC",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(portfolio_from_row).collect())
    }

    async fn find_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
    ) -> anyhow::Result<Option<Portfolio>> {
        let row = sqlx::query("SELECT * FROM portfolios WHERE id = $1 AND team_id = $2")
            .bind(portfolio_id)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(portfolio_from_row))
    }

    async fn upsert_team_portfolio(&self, fresh: Portfolio) -> anyhow::Result<Portfolio> {
        let updated = sqlx::query(
            r#"
            UPDATE portfolios
            SET title = $2, summary = $3, content = $4, updated_at = $5
            WHERE team_id = $1
            RETURNING *
            "#,
        )
        .bind(fresh.team_id)
        .bind(&fresh.title)
        .bind(&fresh.summary)
        .bind(&fresh.content)
        .bind(fresh.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(portfolio_from_row(&row));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO portfolios
            (id, team_id, title, summary, content, public_url, is_public, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(fresh.id)
        .bind(fresh.team_id)
        .bind(&fresh.title)
        .bind(&fresh.summary)
        .bind(&fresh.content)
        .bind(&fresh.public_url)
        .bind(fresh.is_public)
        .bind(fresh.created_at)
        .bind(fresh.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(portfolio_from_row(&row))
    }

    async fn update_portfolio(
        &self,
        team_id: Uuid,
        portfolio_id: Uuid,
        patch: PortfolioPatch,
    ) -> anyhow::Result<Option<Portfolio>> {
        let row = sqlx::query(
            r#"
            UPDATE portfolios
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                is_public = COALESCE($5, is_public),
                updated_at = NOW()
            WHERE id = $1 AND team_id = $2
            RETURNING *
            "#,
        )
        .bind(portfolio_id)
        .bind(team_id)
        .bind(patch.title)
        .bind(patch.content)
        .bind(patch.is_public)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(portfolio_from_row))
    }

    async fn delete_portfolio(&self, portfolio_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM portfolios WHERE id = $1")
            .bind(portfolio_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_personal_log(&self, log: PersonalLog) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO personal_learning_logs (id, user_id, content, log_date, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(&log.content)
        .bind(log.log_date)
        .bind(&log.tags)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_personal_logs(&self, user_id: Uuid) -> anyhow::Result<Vec<PersonalLog>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM personal_learning_logs
            WHERE user_id = $1
            ORDER BY log_date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(personal_log_from_row).collect())
    }

    async fn find_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> anyhow::Result<Option<PersonalLog>> {
        let row = sqlx::query("SELECT * FROM personal_learning_logs WHERE id = $1 AND user_id = $2")
            .bind(log_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(personal_log_from_row))
    }

    async fn update_personal_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
        patch: PersonalLogPatch,
    ) -> anyhow::Result<Option<PersonalLog>> {
        let Some(current) = self.find_personal_log(user_id, log_id).await? else {
            return Ok(None);
        };

        let content = patch.content.unwrap_or(current.content);
        let log_date = patch.log_date.unwrap_or(current.log_date);
        let tags = match patch.tags {
            Some(tags) if tags.is_empty() => None,
            Some(tags) => Some(tags),
            None => current.tags,
        };

        let row = sqlx::query(
            r#"
            UPDATE personal_learning_logs
            SET content = $3, log_date = $4, tags = $5
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(log_id)
        .bind(user_id)
        .bind(&content)
        .bind(log_date)
        .bind(&tags)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(personal_log_from_row))
    }

    async fn delete_personal_log(&self, user_id: Uuid, log_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM personal_learning_logs WHERE id = $1 AND user_id = $2")
            .bind(log_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_personal_portfolio(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<PersonalPortfolio>> {
        let row = sqlx::query("SELECT * FROM personal_portfolios WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(personal_portfolio_from_row))
    }

    async fn is_slug_taken(&self, slug: &str, exclude_user: Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM personal_portfolios WHERE slug = $1 AND user_id <> $2",
        )
        .bind(slug)
        .bind(exclude_user)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn upsert_personal_portfolio(
        &self,
        fresh: PersonalPortfolio,
    ) -> anyhow::Result<PersonalPortfolio> {
        let row = sqlx::query(
            r#"
            INSERT INTO personal_portfolios
            (id, user_id, bio, skills, achievements, is_public, slug, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE
            SET bio = EXCLUDED.bio,
                skills = EXCLUDED.skills,
                achievements = EXCLUDED.achievements,
                is_public = EXCLUDED.is_public,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(fresh.id)
        .bind(fresh.user_id)
        .bind(&fresh.bio)
        .bind(&fresh.skills)
        .bind(&fresh.achievements)
        .bind(fresh.is_public)
        .bind(&fresh.slug)
        .bind(fresh.created_at)
        .bind(fresh.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(personal_portfolio_from_row(&row))
    }
}
