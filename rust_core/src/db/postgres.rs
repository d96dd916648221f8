//! PostgreSQL-backed match store, upserting on `team_heading`.

use super::retry::{execute_with_retry, RetryPolicy};
use super::store::MatchStore;
use crate::models::{MatchFormat, MatchRecord, MatchStatus, TossDecision, TossInfo, TossSource};
use crate::parsing::ParsedScore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};

const SELECT_COLUMNS: &str = r#"
    match_id, team_heading, match_number_venue, team1, team2, city,
    batting_team, batting_score, batting_runs, batting_wickets, batting_overs,
    bowling_team, bowling_score, bowling_runs, bowling_wickets, bowling_overs,
    batting_first, live_text, completion_text, match_format, status, link,
    toss_winner, toss_decision, toss_source, last_updated
"#;

#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `cricket_matches` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cricket_matches (
                match_id BIGSERIAL PRIMARY KEY,
                team_heading TEXT NOT NULL UNIQUE,
                match_number_venue TEXT NOT NULL DEFAULT '',
                team1 TEXT NOT NULL,
                team2 TEXT NOT NULL,
                city TEXT NOT NULL,
                batting_team TEXT NOT NULL,
                batting_score TEXT NOT NULL,
                batting_runs INTEGER,
                batting_wickets INTEGER,
                batting_overs DOUBLE PRECISION,
                bowling_team TEXT NOT NULL DEFAULT '',
                bowling_score TEXT NOT NULL DEFAULT '',
                bowling_runs INTEGER,
                bowling_wickets INTEGER,
                bowling_overs DOUBLE PRECISION,
                batting_first BOOLEAN NOT NULL,
                live_text TEXT NOT NULL DEFAULT '',
                completion_text TEXT NOT NULL DEFAULT '',
                match_format TEXT NOT NULL,
                status TEXT NOT NULL,
                link TEXT NOT NULL DEFAULT '',
                toss_winner TEXT,
                toss_decision TEXT,
                toss_source TEXT,
                last_updated TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create cricket_matches table")?;

        info!("cricket_matches schema ready");
        Ok(())
    }

    async fn upsert(&self, record: &MatchRecord) -> Result<i64> {
        let (batting_runs, batting_wickets, batting_overs) = score_columns(record.batting_parsed)?;
        let (bowling_runs, bowling_wickets, bowling_overs) = score_columns(record.bowling_parsed)?;
        let toss = record.toss.as_ref();

        let match_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cricket_matches (
                team_heading, match_number_venue, team1, team2, city,
                batting_team, batting_score, batting_runs, batting_wickets, batting_overs,
                bowling_team, bowling_score, bowling_runs, bowling_wickets, bowling_overs,
                batting_first, live_text, completion_text, match_format, status, link,
                toss_winner, toss_decision, toss_source, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            ON CONFLICT (team_heading) DO UPDATE SET
                match_number_venue = EXCLUDED.match_number_venue,
                team1 = EXCLUDED.team1,
                team2 = EXCLUDED.team2,
                city = EXCLUDED.city,
                batting_team = EXCLUDED.batting_team,
                batting_score = EXCLUDED.batting_score,
                batting_runs = EXCLUDED.batting_runs,
                batting_wickets = EXCLUDED.batting_wickets,
                batting_overs = EXCLUDED.batting_overs,
                bowling_team = EXCLUDED.bowling_team,
                bowling_score = EXCLUDED.bowling_score,
                bowling_runs = EXCLUDED.bowling_runs,
                bowling_wickets = EXCLUDED.bowling_wickets,
                bowling_overs = EXCLUDED.bowling_overs,
                batting_first = EXCLUDED.batting_first,
                live_text = EXCLUDED.live_text,
                completion_text = EXCLUDED.completion_text,
                match_format = EXCLUDED.match_format,
                status = EXCLUDED.status,
                link = EXCLUDED.link,
                toss_winner = EXCLUDED.toss_winner,
                toss_decision = EXCLUDED.toss_decision,
                toss_source = EXCLUDED.toss_source,
                last_updated = EXCLUDED.last_updated
            RETURNING match_id
            "#,
        )
        .bind(&record.team_heading)
        .bind(&record.match_number_venue)
        .bind(&record.team1)
        .bind(&record.team2)
        .bind(&record.city)
        .bind(&record.batting_team)
        .bind(&record.batting_score)
        .bind(batting_runs)
        .bind(batting_wickets)
        .bind(batting_overs)
        .bind(&record.bowling_team)
        .bind(&record.bowling_score)
        .bind(bowling_runs)
        .bind(bowling_wickets)
        .bind(bowling_overs)
        .bind(record.batting_first)
        .bind(&record.live_text)
        .bind(&record.completion_text)
        .bind(record.match_format.as_str())
        .bind(record.status.as_str())
        .bind(&record.link)
        .bind(toss.map(|t| t.winner.as_str()))
        .bind(toss.map(|t| t.decision.as_str()))
        .bind(toss.map(|t| t.source.as_str()))
        .bind(record.last_updated)
        .fetch_one(&self.pool)
        .await?;

        Ok(match_id)
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn find_by_team_heading(&self, team_heading: &str) -> Result<Option<MatchRecord>> {
        let query = format!(
            "SELECT {} FROM cricket_matches WHERE team_heading = $1",
            SELECT_COLUMNS
        );
        let (query, pool) = (query.as_str(), &self.pool);
        let row = execute_with_retry(
            move || async move {
                Ok(sqlx::query(query)
                    .bind(team_heading)
                    .fetch_optional(pool)
                    .await?)
            },
            self.retry,
        )
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_id(&self, match_id: i64) -> Result<Option<MatchRecord>> {
        let query = format!(
            "SELECT {} FROM cricket_matches WHERE match_id = $1",
            SELECT_COLUMNS
        );
        let (query, pool) = (query.as_str(), &self.pool);
        let row = execute_with_retry(
            move || async move {
                Ok(sqlx::query(query)
                    .bind(match_id)
                    .fetch_optional(pool)
                    .await?)
            },
            self.retry,
        )
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn save(&self, mut record: MatchRecord) -> Result<MatchRecord> {
        let pending = &record;
        let match_id = execute_with_retry(move || self.upsert(pending), self.retry)
            .await
            .with_context(|| format!("Failed to save match '{}'", record.team_heading))?;

        if record.match_id.is_some_and(|id| id != match_id) {
            warn!(
                "Stored id {} differs from record id {:?} for '{}'",
                match_id, record.match_id, record.team_heading
            );
        }
        record.match_id = Some(match_id);
        debug!("Saved match {}", record.label());
        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<MatchRecord>> {
        let query = format!(
            "SELECT {} FROM cricket_matches ORDER BY match_id",
            SELECT_COLUMNS
        );
        let (query, pool) = (query.as_str(), &self.pool);
        let rows = execute_with_retry(
            move || async move { Ok(sqlx::query(query).fetch_all(pool).await?) },
            self.retry,
        )
        .await?;
        rows.iter().map(record_from_row).collect()
    }
}

type ScoreColumns = (Option<i32>, Option<i32>, Option<f64>);

fn score_columns(score: Option<ParsedScore>) -> Result<ScoreColumns> {
    let Some(s) = score else {
        return Ok((None, None, None));
    };
    let runs = i32::try_from(s.runs).with_context(|| format!("runs {} out of range", s.runs))?;
    let wickets =
        i32::try_from(s.wickets).with_context(|| format!("wickets {} out of range", s.wickets))?;
    Ok((Some(runs), Some(wickets), Some(s.overs)))
}

fn parsed_from_columns(
    runs: Option<i32>,
    wickets: Option<i32>,
    overs: Option<f64>,
) -> Option<ParsedScore> {
    Some(ParsedScore {
        runs: u32::try_from(runs?).ok()?,
        wickets: u32::try_from(wickets?).ok()?,
        overs: overs?,
    })
}

fn toss_from_columns(
    winner: Option<String>,
    decision: Option<String>,
    source: Option<String>,
) -> Option<TossInfo> {
    let winner = winner.filter(|w| !w.is_empty())?;
    let decision = TossDecision::parse(&decision?)?;
    let source = match source.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("MANUAL") => TossSource::Manual,
        _ => TossSource::Scraped,
    };
    Some(TossInfo {
        winner,
        decision,
        source,
    })
}

fn record_from_row(row: &PgRow) -> Result<MatchRecord> {
    let match_format: String = row.try_get("match_format")?;
    let status: String = row.try_get("status")?;
    let last_updated: DateTime<Utc> = row.try_get("last_updated")?;

    Ok(MatchRecord {
        match_id: Some(row.try_get("match_id")?),
        team_heading: row.try_get("team_heading")?,
        match_number_venue: row.try_get("match_number_venue")?,
        team1: row.try_get("team1")?,
        team2: row.try_get("team2")?,
        city: row.try_get("city")?,
        batting_team: row.try_get("batting_team")?,
        batting_score: row.try_get("batting_score")?,
        batting_parsed: parsed_from_columns(
            row.try_get("batting_runs")?,
            row.try_get("batting_wickets")?,
            row.try_get("batting_overs")?,
        ),
        bowling_team: row.try_get("bowling_team")?,
        bowling_score: row.try_get("bowling_score")?,
        bowling_parsed: parsed_from_columns(
            row.try_get("bowling_runs")?,
            row.try_get("bowling_wickets")?,
            row.try_get("bowling_overs")?,
        ),
        batting_first: row.try_get("batting_first")?,
        live_text: row.try_get("live_text")?,
        completion_text: row.try_get("completion_text")?,
        match_format: MatchFormat::from_str_lossy(&match_format),
        status: MatchStatus::from_str_lossy(&status),
        link: row.try_get("link")?,
        toss: toss_from_columns(
            row.try_get("toss_winner")?,
            row.try_get("toss_decision")?,
            row.try_get("toss_source")?,
        ),
        last_updated,
    })
}
