//! Postgres store over the `game_data` schema.
//!
//! Tables: `actions`, `players`, `games`, `play_by_plays` and `lineups`.
//! Id columns are cast to `BIGINT` in every query so the row types do not
//! depend on how the schema declared them.

use super::{GameRecord, LineupRecord, PlayRecord, StatsStore};
use crate::models::{Action, ActionKind, GameId, Player, SchoolId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ActionRow {
    action_id: i64,
    action: String,
    points: i32,
    action_type: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PlayerRow {
    player_id: i64,
    school_id: i64,
    last_name: String,
    first_name: String,
    title: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct GameRow {
    game_id: i64,
    home_school_id: i64,
    away_school_id: i64,
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PlayRow {
    play_id: i64,
    player_id: i64,
    action_id: i64,
    time: i32,
    section: i32,
    home_lineup: Option<Vec<i64>>,
    away_lineup: Option<Vec<i64>>,
}

impl From<GameRow> for GameRecord {
    fn from(row: GameRow) -> Self {
        Self {
            game_id: row.game_id,
            home_school_id: row.home_school_id,
            away_school_id: row.away_school_id,
            date: row.date,
        }
    }
}

impl TryFrom<PlayRow> for PlayRecord {
    type Error = anyhow::Error;

    fn try_from(row: PlayRow) -> Result<Self> {
        Ok(Self {
            play_id: row.play_id,
            player_id: row.player_id,
            action_id: row.action_id,
            time: u32::try_from(row.time)
                .with_context(|| format!("play {} has a negative clock", row.play_id))?,
            section: u8::try_from(row.section)
                .with_context(|| format!("play {} has section {}", row.play_id, row.section))?,
            home_lineup: row.home_lineup,
            away_lineup: row.away_lineup,
        })
    }
}

const GAME_COLUMNS: &str =
    "game_id::BIGINT, home_school_id::BIGINT, away_school_id::BIGINT, date::DATE";

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn actions(&self) -> Result<Vec<Action>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT action_id::BIGINT, action, points::INT, type AS action_type
            FROM actions
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch actions")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                Action::new(
                    row.action_id,
                    &row.action,
                    row.points,
                    ActionKind::parse(&row.action_type),
                )
            })
            .collect())
    }

    async fn roster(&self, school_id: SchoolId) -> Result<Vec<Player>> {
        let rows = sqlx::query_as::<_, PlayerRow>(
            r#"
            SELECT player_id::BIGINT, school_id::BIGINT, last_name, first_name, title
            FROM players
            WHERE school_id = $1
            "#,
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch roster of school {}", school_id))?;

        Ok(rows
            .into_iter()
            .map(|row| Player {
                player_id: row.player_id,
                school_id: row.school_id,
                last_name: row.last_name,
                first_name: row.first_name,
                title: row.title,
            })
            .collect())
    }

    async fn games_for_school(&self, school_id: SchoolId) -> Result<Vec<GameRecord>> {
        let rows = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM games WHERE $1 IN (home_school_id, away_school_id) ORDER BY date, game_id",
            GAME_COLUMNS
        ))
        .bind(school_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch games of school {}", school_id))?;

        Ok(rows.into_iter().map(GameRecord::from).collect())
    }

    async fn game(&self, game_id: GameId) -> Result<Option<GameRecord>> {
        let row = sqlx::query_as::<_, GameRow>(&format!(
            "SELECT {} FROM games WHERE game_id = $1",
            GAME_COLUMNS
        ))
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch game {}", game_id))?;

        Ok(row.map(GameRecord::from))
    }

    async fn plays(&self, game_id: GameId) -> Result<Vec<PlayRecord>> {
        let rows = sqlx::query_as::<_, PlayRow>(
            r#"
            SELECT pbp.play_id::BIGINT, pbp.player_id::BIGINT, pbp.action_id::BIGINT,
                   pbp.time::INT, pbp.section::INT,
                   L.home_lineup::BIGINT[], L.away_lineup::BIGINT[]
            FROM play_by_plays pbp LEFT JOIN lineups L
                ON pbp.play_id = L.play_id
            WHERE pbp.game_id = $1
            ORDER BY pbp.play_id
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch plays of game {}", game_id))?;

        rows.into_iter().map(PlayRecord::try_from).collect()
    }

    async fn save_lineups(&self, records: &[LineupRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.context("Failed to begin lineup write")?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO lineups (play_id, home_lineup, away_lineup)
                VALUES ($1, $2, $3)
                ON CONFLICT (play_id) DO UPDATE
                SET home_lineup = EXCLUDED.home_lineup, away_lineup = EXCLUDED.away_lineup
                "#,
            )
            .bind(record.play_id)
            .bind(&record.home_lineup)
            .bind(&record.away_lineup)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to save lineups of play {}", record.play_id))?;
        }
        tx.commit().await.context("Failed to commit lineups")?;

        debug!("Saved {} lineup rows", records.len());
        Ok(())
    }

    fn store_name(&self) -> &str {
        "postgres"
    }
}
