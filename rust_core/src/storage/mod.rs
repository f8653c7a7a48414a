//! Storage collaborator for games, rosters and lineups.
//!
//! The registry never talks to a database directly. It is handed a
//! [`StatsStore`] at construction and uses it to:
//! - load the action taxonomy once per session;
//! - load rosters and games on demand;
//! - write back lineups it had to reconstruct.

use crate::models::{Action, ActionId, GameId, Lineup, Play, PlayId, Player, PlayerId, SchoolId};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::MemoryStore;
pub use pool::PoolConfig;
pub use postgres::PgStatsStore;

/// Source and sink for everything the registry loads.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Every action in the taxonomy.
    async fn actions(&self) -> Result<Vec<Action>>;

    /// All players of a school, including its `TEAM` placeholder.
    async fn roster(&self, school_id: SchoolId) -> Result<Vec<Player>>;

    /// Games in which the school played, home or away.
    async fn games_for_school(&self, school_id: SchoolId) -> Result<Vec<GameRecord>>;

    async fn game(&self, game_id: GameId) -> Result<Option<GameRecord>>;

    /// Plays of a game ordered by play id, with any stored lineups.
    async fn plays(&self, game_id: GameId) -> Result<Vec<PlayRecord>>;

    /// Persist reconstructed lineups.
    async fn save_lineups(&self, records: &[LineupRecord]) -> Result<()>;

    /// Store name for logging
    fn store_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub home_school_id: SchoolId,
    pub away_school_id: SchoolId,
    pub date: Option<NaiveDate>,
}

impl GameRecord {
    pub fn new(game_id: GameId, home_school_id: SchoolId, away_school_id: SchoolId) -> Self {
        Self {
            game_id,
            home_school_id,
            away_school_id,
            date: None,
        }
    }
}

/// A play row joined with its lineup row, if there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub play_id: PlayId,
    pub player_id: PlayerId,
    pub action_id: ActionId,
    pub time: u32,
    pub section: u8,
    pub home_lineup: Option<Vec<PlayerId>>,
    pub away_lineup: Option<Vec<PlayerId>>,
}

impl PlayRecord {
    pub fn new(play_id: PlayId, player_id: PlayerId, action_id: ActionId, time: u32, section: u8) -> Self {
        Self {
            play_id,
            player_id,
            action_id,
            time,
            section,
            home_lineup: None,
            away_lineup: None,
        }
    }

    pub fn with_lineups(mut self, home: &[PlayerId], away: &[PlayerId]) -> Self {
        self.home_lineup = Some(home.to_vec());
        self.away_lineup = Some(away.to_vec());
        self
    }

    /// A missing lineup on either side leaves both empty for reconstruction.
    pub fn into_play(self) -> Play {
        let play = Play::new(
            self.play_id,
            self.player_id,
            self.action_id,
            self.time,
            self.section,
        );
        match (self.home_lineup, self.away_lineup) {
            (Some(home), Some(away)) => play.with_lineups(
                home.into_iter().collect::<Lineup>(),
                away.into_iter().collect::<Lineup>(),
            ),
            _ => play,
        }
    }
}

/// Lineups written back for one reconstructed play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupRecord {
    pub play_id: PlayId,
    pub home_lineup: Vec<PlayerId>,
    pub away_lineup: Vec<PlayerId>,
}

impl LineupRecord {
    pub fn from_play(play: &Play) -> Self {
        Self {
            play_id: play.play_id,
            home_lineup: play.home.to_vec(),
            away_lineup: play.away.to_vec(),
        }
    }
}
