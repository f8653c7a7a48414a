//! In-process store.
//!
//! Holds the same tables as the Postgres schema behind a single lock. Used
//! for embedding and tests; lineup writes are counted so callers can check
//! that reconstruction only happens once.

use super::{GameRecord, LineupRecord, PlayRecord, StatsStore};
use crate::models::{Action, GameId, PlayId, Player, SchoolId};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Tables {
    actions: Vec<Action>,
    players: Vec<Player>,
    games: BTreeMap<GameId, GameRecord>,
    plays: BTreeMap<GameId, Vec<PlayRecord>>,
    lineups: FxHashMap<PlayId, LineupRecord>,
    lineup_writes: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_action(&self, action: Action) {
        self.tables.write().actions.push(action);
    }

    pub fn insert_player(&self, player: Player) {
        self.tables.write().players.push(player);
    }

    pub fn insert_game(&self, game: GameRecord) {
        self.tables.write().games.insert(game.game_id, game);
    }

    /// Append a play; plays are returned sorted by id regardless.
    pub fn insert_play(&self, game_id: GameId, play: PlayRecord) {
        self.tables.write().plays.entry(game_id).or_default().push(play);
    }

    /// Stored lineup rows, ordered by play id.
    pub fn saved_lineups(&self) -> Vec<LineupRecord> {
        let tables = self.tables.read();
        let mut records: Vec<LineupRecord> = tables.lineups.values().cloned().collect();
        records.sort_by_key(|r| r.play_id);
        records
    }

    /// Number of lineup rows ever written.
    pub fn lineup_writes(&self) -> usize {
        self.tables.read().lineup_writes
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn actions(&self) -> Result<Vec<Action>> {
        Ok(self.tables.read().actions.clone())
    }

    async fn roster(&self, school_id: SchoolId) -> Result<Vec<Player>> {
        Ok(self
            .tables
            .read()
            .players
            .iter()
            .filter(|p| p.school_id == school_id)
            .cloned()
            .collect())
    }

    async fn games_for_school(&self, school_id: SchoolId) -> Result<Vec<GameRecord>> {
        Ok(self
            .tables
            .read()
            .games
            .values()
            .filter(|g| g.home_school_id == school_id || g.away_school_id == school_id)
            .cloned()
            .collect())
    }

    async fn game(&self, game_id: GameId) -> Result<Option<GameRecord>> {
        Ok(self.tables.read().games.get(&game_id).cloned())
    }

    async fn plays(&self, game_id: GameId) -> Result<Vec<PlayRecord>> {
        let tables = self.tables.read();
        let mut plays: Vec<PlayRecord> = tables
            .plays
            .get(&game_id)
            .map(|plays| {
                plays
                    .iter()
                    .map(|play| match tables.lineups.get(&play.play_id) {
                        Some(row) => play
                            .clone()
                            .with_lineups(&row.home_lineup, &row.away_lineup),
                        None => play.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        plays.sort_by_key(|p| p.play_id);
        Ok(plays)
    }

    async fn save_lineups(&self, records: &[LineupRecord]) -> Result<()> {
        let mut tables = self.tables.write();
        for record in records {
            tables.lineups.insert(record.play_id, record.clone());
        }
        tables.lineup_writes += records.len();
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plays_join_saved_lineups() {
        let store = MemoryStore::new();
        store.insert_play(1, PlayRecord::new(20, 5, 1, 900, 1));
        store.insert_play(1, PlayRecord::new(10, 5, 1, 1000, 1));

        let plays = store.plays(1).await.unwrap();
        assert_eq!(plays.iter().map(|p| p.play_id).collect::<Vec<_>>(), vec![10, 20]);
        assert!(plays[0].home_lineup.is_none());

        store
            .save_lineups(&[LineupRecord {
                play_id: 10,
                home_lineup: vec![5],
                away_lineup: vec![6],
            }])
            .await
            .unwrap();
        let plays = store.plays(1).await.unwrap();
        assert_eq!(plays[0].away_lineup, Some(vec![6]));
        assert_eq!(store.lineup_writes(), 1);
    }

    #[tokio::test]
    async fn test_games_for_school_home_or_away() {
        let store = MemoryStore::new();
        store.insert_game(GameRecord::new(1, 10, 20));
        store.insert_game(GameRecord::new(2, 30, 10));
        store.insert_game(GameRecord::new(3, 30, 20));

        let games = store.games_for_school(10).await.unwrap();
        assert_eq!(games.iter().map(|g| g.game_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(store.game(4).await.unwrap().is_none());
    }
}
