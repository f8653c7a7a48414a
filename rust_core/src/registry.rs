//! Stats registry
//!
//! Session-scoped cache of everything loaded from a [`StatsStore`]:
//! the action taxonomy, rosters, and games. Queries are answered by
//! broadcasting every play of every loaded game to a batch of
//! [`Question`]s in one pass.

use crate::error::StatsError;
use crate::game::Game;
use crate::models::{ActionTable, GameId, Lineup, PlayerId, Roster, SchoolId};
use crate::query::{QueryResults, Question, ResultContext};
use crate::storage::{GameRecord, StatsStore};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StatsRegistry {
    store: Arc<dyn StatsStore>,
    actions: ActionTable,
    roster: Roster,
    /// Schools whose roster has been requested from the store.
    schools: FxHashSet<SchoolId>,
    games: BTreeMap<GameId, Game>,
}

impl StatsRegistry {
    /// Create a registry and load the action taxonomy.
    pub async fn new(store: Arc<dyn StatsStore>) -> Result<Self> {
        let actions = ActionTable::new(store.actions().await.context("Failed to load actions")?);
        info!(
            "StatsRegistry initialized with {} actions from {} store",
            actions.len(),
            store.store_name()
        );

        Ok(Self {
            store,
            actions,
            roster: Roster::new(),
            schools: FxHashSet::default(),
            games: BTreeMap::new(),
        })
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.games.get(&game_id)
    }

    pub fn game_ids(&self) -> impl Iterator<Item = GameId> + '_ {
        self.games.keys().copied()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a school's players. Does nothing if they are already loaded.
    pub async fn add_roster(&mut self, school_id: SchoolId) -> Result<()> {
        if self.schools.contains(&school_id) || self.roster.has_school(school_id) {
            return Ok(());
        }
        let players = self.store.roster(school_id).await?;
        debug!("Loaded {} players of school {}", players.len(), school_id);
        for player in players {
            self.roster.insert(player);
        }
        self.schools.insert(school_id);
        Ok(())
    }

    /// Load a game by id. Does nothing if it is already loaded.
    pub async fn add_game(&mut self, game_id: GameId) -> Result<()> {
        if self.games.contains_key(&game_id) {
            return Ok(());
        }
        let record = self
            .store
            .game(game_id)
            .await?
            .ok_or(StatsError::UnknownGame(game_id))?;
        self.add_game_record(record).await
    }

    /// Load a game whose teams are already known.
    pub async fn add_game_record(&mut self, record: GameRecord) -> Result<()> {
        if self.games.contains_key(&record.game_id) {
            return Ok(());
        }
        self.add_roster(record.home_school_id).await?;
        self.add_roster(record.away_school_id).await?;

        let plays = self
            .store
            .plays(record.game_id)
            .await?
            .into_iter()
            .map(|p| p.into_play())
            .collect();
        let game = Game::new(record.game_id, record.home_school_id, record.away_school_id, plays);
        if let Some(reason) = game.invalid_reason() {
            warn!("Game {} has invalid data: {}", record.game_id, reason);
        }

        self.games.insert(record.game_id, game);
        Ok(())
    }

    /// Load every game a school played in, home or away.
    pub async fn add_games_from_school(&mut self, school_id: SchoolId) -> Result<usize> {
        let records = self.store.games_for_school(school_id).await?;
        let mut added = 0;
        for record in records {
            if !self.games.contains_key(&record.game_id) {
                self.add_game_record(record).await?;
                added += 1;
            }
        }
        info!(
            "Loaded {} new games for school {} ({} total)",
            added,
            school_id,
            self.games.len()
        );
        Ok(added)
    }

    // ========================================================================
    // Lineups
    // ========================================================================

    /// Reconstruct every missing lineup, writing each section back to the
    /// store as soon as it is done. Returns the number of plays completed.
    pub async fn ensure_lineups(&mut self) -> Result<usize> {
        let mut completed = 0;

        for game in self.games.values_mut() {
            for section in game.incomplete_sections() {
                let records = game.complete_section(section, &self.roster, &self.actions)?;
                self.store.save_lineups(&records).await.with_context(|| {
                    format!(
                        "Failed to write lineups for game {} section {}",
                        game.game_id, section
                    )
                })?;
                debug!(
                    "Game {} section {}: {} lineups reconstructed",
                    game.game_id,
                    section,
                    records.len()
                );
                completed += records.len();
            }
        }

        if completed > 0 {
            info!("Reconstructed lineups for {} plays", completed);
        }
        Ok(completed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Regulation plus overtime minutes of each loaded game.
    pub fn game_minutes(&self) -> BTreeMap<GameId, f64> {
        self.games
            .iter()
            .map(|(id, game)| (*id, game.length_minutes()))
            .collect()
    }

    /// Total length in minutes of the given loaded games.
    pub fn length_of_games<'g>(&self, game_ids: impl IntoIterator<Item = &'g GameId>) -> f64 {
        game_ids
            .into_iter()
            .filter_map(|id| self.games.get(id))
            .map(Game::length_minutes)
            .sum()
    }

    /// Offer every play of every loaded game to the questions.
    pub fn distribute(&self, questions: &mut [Question]) -> Result<(), StatsError> {
        for game in self.games.values() {
            game.offer_plays(questions, &self.roster, &self.actions)?;
        }
        Ok(())
    }

    /// Complete lineups, then answer a batch of questions in one pass.
    pub async fn answer(&mut self, questions: &mut [Question]) -> Result<Vec<QueryResults>> {
        self.ensure_lineups().await?;

        for question in questions.iter_mut() {
            question
                .prepare(&self.roster)
                .with_context(|| format!("Invalid {} query", question.name()))?;
        }
        self.distribute(questions)?;

        let game_minutes = self.game_minutes();
        let ctx = ResultContext {
            actions: &self.actions,
            game_minutes: &game_minutes,
        };
        Ok(questions.iter_mut().map(|q| q.results(&ctx)).collect())
    }

    /// Every `size`-player subset of the lineups a school actually used.
    pub fn lineup_combinations(&self, size: usize, school_id: SchoolId) -> BTreeSet<Lineup> {
        let mut combinations = BTreeSet::new();
        for game in self.games.values() {
            for lineup in game.lineups(school_id, &self.actions) {
                let players = lineup.to_vec();
                let mut current = Vec::with_capacity(size);
                collect_combinations(&players, size, 0, &mut current, &mut combinations);
            }
        }
        combinations
    }
}

fn collect_combinations(
    players: &[PlayerId],
    size: usize,
    start: usize,
    current: &mut Vec<PlayerId>,
    out: &mut BTreeSet<Lineup>,
) {
    if current.len() == size {
        out.insert(current.iter().copied().collect());
        return;
    }
    for i in start..players.len() {
        current.push(players[i]);
        collect_combinations(players, size, i + 1, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{actions, AWAY, GAME, HOME, MADE_2};
    use crate::storage::{MemoryStore, PlayRecord};
    use crate::models::Player;

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for action in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15] {
            if let Some(a) = actions().get(action) {
                store.insert_action(a.clone());
            }
        }
        store.insert_player(Player::team(100, HOME));
        store.insert_player(Player::team(200, AWAY));
        for i in 1..=6 {
            store.insert_player(Player::new(100 + i, HOME, &format!("H{i}"), "x"));
            store.insert_player(Player::new(200 + i, AWAY, &format!("A{i}"), "y"));
        }
        store.insert_game(GameRecord::new(GAME, HOME, AWAY));
        for (i, id) in [101, 201, 102, 202, 103, 203, 104, 204, 105, 205].iter().enumerate() {
            store.insert_play(
                GAME,
                PlayRecord::new(i as i64 + 1, *id, MADE_2, 1190 - 10 * i as u32, 1),
            );
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_loading_is_idempotent() {
        let store = store();
        let mut registry = StatsRegistry::new(store.clone()).await.unwrap();
        assert_eq!(registry.actions().len(), 15);

        registry.add_game(GAME).await.unwrap();
        registry.add_game(GAME).await.unwrap();
        assert_eq!(registry.add_games_from_school(HOME).await.unwrap(), 0);
        assert_eq!(registry.game_ids().collect::<Vec<_>>(), vec![GAME]);
        assert_eq!(registry.roster().len(), 14);

        let err = registry.add_game(999).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StatsError>(), Some(&StatsError::UnknownGame(999)));
    }

    #[tokio::test]
    async fn test_ensure_lineups_writes_through_once() {
        let store = store();
        let mut registry = StatsRegistry::new(store.clone()).await.unwrap();
        registry.add_games_from_school(AWAY).await.unwrap();

        assert_eq!(registry.ensure_lineups().await.unwrap(), 10);
        assert_eq!(store.lineup_writes(), 10);
        assert_eq!(registry.ensure_lineups().await.unwrap(), 0);
        assert_eq!(store.lineup_writes(), 10);

        // A fresh session reads the stored lineups back instead of rebuilding.
        let mut fresh = StatsRegistry::new(store.clone()).await.unwrap();
        fresh.add_game(GAME).await.unwrap();
        assert_eq!(fresh.ensure_lineups().await.unwrap(), 0);
        assert_eq!(
            fresh.game(GAME).unwrap().plays(),
            registry.game(GAME).unwrap().plays()
        );
    }

    #[tokio::test]
    async fn test_one_sided_section_is_rebuilt_once() {
        let store = store();
        // Overtime where only the home team shows up.
        for (i, id) in [101, 102, 103].iter().enumerate() {
            store.insert_play(
                GAME,
                PlayRecord::new(50 + i as i64, *id, MADE_2, 290 - 10 * i as u32, 3),
            );
        }
        let mut registry = StatsRegistry::new(store.clone()).await.unwrap();
        registry.add_game(GAME).await.unwrap();

        assert_eq!(registry.ensure_lineups().await.unwrap(), 13);
        assert_eq!(registry.ensure_lineups().await.unwrap(), 0);
        let saved = store.saved_lineups();
        assert!(saved[10..].iter().all(|r| r.away_lineup.is_empty()));

        let mut fresh = StatsRegistry::new(store.clone()).await.unwrap();
        fresh.add_game(GAME).await.unwrap();
        assert_eq!(fresh.ensure_lineups().await.unwrap(), 0);
        assert_eq!(store.lineup_writes(), 13);
    }

    #[tokio::test]
    async fn test_lineup_combinations() {
        let mut registry = StatsRegistry::new(store()).await.unwrap();
        registry.add_game(GAME).await.unwrap();
        registry.ensure_lineups().await.unwrap();

        let pairs = registry.lineup_combinations(2, HOME);
        assert_eq!(pairs.len(), 10);
        assert!(pairs.contains(&[101, 105].into_iter().collect()));
        assert_eq!(registry.lineup_combinations(5, HOME).len(), 1);
        assert!(registry.lineup_combinations(6, HOME).is_empty());
        assert_eq!(registry.length_of_games(&[GAME, 12345]), 40.0);
    }
}
