//! Lineup reconstruction.
//!
//! Substitution entries in play-by-play logs are often missing or out of
//! order, so lineups are inferred per play from the nearest players who
//! appear around it. Enter/leave entries are still used, but only to rule
//! players out:
//! - scanning backward, a player seen leaving cannot be on court;
//! - scanning forward, a player seen entering cannot be on court.
//!
//! For each team the nearest candidates from both directions are merged by
//! distance. The acting player always anchors their own team's lineup
//! unless the actor is the synthetic `TEAM` placeholder.

use crate::error::StatsError;
use crate::models::{
    ActionKind, ActionTable, GameId, Lineup, Matchup, Play, PlayerId, Roster, SchoolId, Side,
};
use crate::storage::LineupRecord;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Players per side on court.
pub const LINEUP_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

impl Direction {
    /// Action that proves a player cannot be on court at the origin play.
    fn rules_out(&self, kind: &ActionKind) -> bool {
        match self {
            Direction::Backward => *kind == ActionKind::Leave,
            Direction::Forward => *kind == ActionKind::Enter,
        }
    }
}

/// Fills missing lineups for the plays of one game, one section at a time.
pub struct LineupReconstructor<'a> {
    game_id: GameId,
    matchup: Matchup,
    roster: &'a Roster,
    actions: &'a ActionTable,
}

impl<'a> LineupReconstructor<'a> {
    pub fn new(
        game_id: GameId,
        matchup: Matchup,
        roster: &'a Roster,
        actions: &'a ActionTable,
    ) -> Self {
        Self {
            game_id,
            matchup,
            roster,
            actions,
        }
    }

    /// Complete every play in `section` that lacks a lineup.
    ///
    /// The slice must hold exactly one section in play order. Plays that
    /// already carry both lineups are left untouched, so running this again
    /// over a completed section changes nothing and returns no records.
    pub fn complete_section(&self, section: &mut [Play]) -> Result<Vec<LineupRecord>, StatsError> {
        let mut records = Vec::new();
        let mut degraded = 0usize;

        for index in 0..section.len() {
            if section[index].has_lineups() {
                continue;
            }

            let play = &section[index];
            let actor = self
                .roster
                .get(play.player_id)
                .ok_or(StatsError::UnknownPlayer(play.player_id))?;
            let actor_side = self
                .matchup
                .side_of(actor.school_id)
                .ok_or(StatsError::ActorNotInGame {
                    game_id: self.game_id,
                    play_id: play.play_id,
                    school_id: actor.school_id,
                })?;

            let teammates_needed = if actor.is_team() {
                LINEUP_SIZE
            } else {
                LINEUP_SIZE - 1
            };

            let mut teammates =
                self.nearest_players(section, index, actor.school_id, teammates_needed);
            if !actor.is_team() {
                teammates.insert(actor.player_id);
            }
            let opponents = self.nearest_players(
                section,
                index,
                self.matchup.school_on(actor_side.other()),
                LINEUP_SIZE,
            );

            if teammates.len() < LINEUP_SIZE || opponents.len() < LINEUP_SIZE {
                degraded += 1;
                debug!(
                    "Game {} play {}: short lineup ({} / {} players)",
                    self.game_id,
                    play.play_id,
                    teammates.len(),
                    opponents.len()
                );
            }

            let (home, away) = match actor_side {
                Side::Home => (teammates, opponents),
                Side::Away => (opponents, teammates),
            };
            let play = &mut section[index];
            play.set_lineups(home, away);
            records.push(LineupRecord::from_play(play));
        }

        if degraded > 0 {
            warn!(
                "Game {}: {} of {} reconstructed lineups have fewer than {} players",
                self.game_id,
                degraded,
                records.len(),
                LINEUP_SIZE
            );
        }

        Ok(records)
    }

    /// The `n` nearest plausible players of `school_id` around `index`.
    ///
    /// Backward candidates come first in the merge, so at equal distance the
    /// earlier play wins.
    fn nearest_players(&self, section: &[Play], index: usize, school_id: SchoolId, n: usize) -> Lineup {
        let mut candidates = self.scan(section, index, school_id, n, Direction::Backward);
        candidates.extend(self.scan(section, index, school_id, n, Direction::Forward));
        // Stable: ties keep backward-then-forward order.
        candidates.sort_by_key(|(distance, _)| *distance);

        let mut chosen: Vec<PlayerId> = Vec::with_capacity(n);
        for (_, player_id) in candidates {
            if chosen.len() == n {
                break;
            }
            if !chosen.contains(&player_id) {
                chosen.push(player_id);
            }
        }
        chosen.into_iter().collect()
    }

    /// Walk away from `index` in one direction collecting up to `n`
    /// `(distance, player)` candidates from `school_id`.
    ///
    /// `TEAM` plays and plays by players already seen are skipped without
    /// advancing the distance; every other play advances it by one.
    fn scan(
        &self,
        section: &[Play],
        index: usize,
        school_id: SchoolId,
        n: usize,
        direction: Direction,
    ) -> Vec<(usize, PlayerId)> {
        let origin_actor = section[index].player_id;
        let indices: Box<dyn Iterator<Item = usize>> = match direction {
            Direction::Backward => Box::new((0..index).rev()),
            Direction::Forward => Box::new(index + 1..section.len()),
        };

        let mut seen: FxHashSet<PlayerId> = FxHashSet::default();
        let mut found = Vec::with_capacity(n);
        let mut distance = 1;

        for i in indices {
            if found.len() == n {
                break;
            }
            let play = &section[i];
            let Some(player) = self.roster.get(play.player_id) else {
                continue;
            };
            if player.is_team() || seen.contains(&player.player_id) {
                continue;
            }

            if player.school_id == school_id {
                let ruled_out = self
                    .actions
                    .kind(play.action_id)
                    .is_some_and(|kind| direction.rules_out(kind));
                if ruled_out {
                    seen.insert(player.player_id);
                } else if player.player_id != origin_actor {
                    found.push((distance, player.player_id));
                    seen.insert(player.player_id);
                }
            }
            distance += 1;
        }

        found
    }
}
