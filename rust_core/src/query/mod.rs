//! Conditional query engine.
//!
//! A [`Question`] is offered every play of every loaded game. It keeps:
//! - a [`LineupFilter`] deciding whether the play happened with the
//!   requested players on (and off) court;
//! - a [`Tally`] of per-action totals, games played in, and a [`Timeline`]
//!   for minutes;
//! - a [`Variant`] holding the actor condition and the formulas for the
//!   metric family that was asked for.
//!
//! Minutes depend only on the lineup condition; action totals need both
//! the lineup and the actor condition.

pub mod formulas;
pub mod ratings;
pub mod variants;

use crate::error::StatsError;
use crate::models::{
    Action, ActionId, ActionTable, GameId, Play, Player, PlayerId, Roster, SchoolId, StatType,
};
use crate::timeline::Timeline;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub use formulas::{StatValue, ZeroDenominator};
pub use ratings::{BoxLine, DefensiveRating, OffensiveRating};
pub use variants::{AssistRate, ReboundKind, ReboundRate, Stat, StandardQuery};

/// A play with its actor and action resolved, as offered to queries.
#[derive(Debug, Clone, Copy)]
pub struct PlayEvent<'a> {
    pub game_id: GameId,
    pub play: &'a Play,
    pub actor: &'a Player,
    pub action: &'a Action,
}

// ============================================================================
// Action totals
// ============================================================================

/// Occurrences per action id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionTotals(BTreeMap<ActionId, u32>);

impl ActionTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, action_id: ActionId) {
        *self.0.entry(action_id).or_insert(0) += 1;
    }

    pub fn get(&self, action_id: ActionId) -> u32 {
        self.0.get(&action_id).copied().unwrap_or(0)
    }

    /// Sum over every action recorded.
    pub fn sum(&self) -> u32 {
        self.0.values().sum()
    }

    /// Sum over actions whose kind falls under `stat`.
    pub fn of_type(&self, stat: StatType, actions: &ActionTable) -> u32 {
        self.0
            .iter()
            .filter(|(id, _)| actions.kind(**id).is_some_and(|k| stat.includes(k)))
            .map(|(_, n)| n)
            .sum()
    }

    /// Points scored by the recorded actions.
    pub fn points(&self, actions: &ActionTable) -> i64 {
        self.0
            .iter()
            .map(|(id, n)| *n as i64 * actions.points(*id) as i64)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionId, u32)> + '_ {
        self.0.iter().map(|(id, n)| (*id, *n))
    }
}

// ============================================================================
// Lineup filter
// ============================================================================

/// Which games to look at and who must (not) be on court.
#[derive(Debug, Clone, Default)]
pub struct LineupFilter {
    pub games: FxHashSet<GameId>,
    pub on_court: FxHashSet<PlayerId>,
    pub not_on_court: FxHashSet<PlayerId>,
}

impl LineupFilter {
    pub fn for_games(games: impl IntoIterator<Item = GameId>) -> Self {
        Self {
            games: games.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_on_court(mut self, players: impl IntoIterator<Item = PlayerId>) -> Self {
        self.on_court.extend(players);
        self
    }

    pub fn with_not_on_court(mut self, players: impl IntoIterator<Item = PlayerId>) -> Self {
        self.not_on_court.extend(players);
        self
    }

    pub fn wants_game(&self, game_id: GameId) -> bool {
        self.games.contains(&game_id)
    }

    /// `on_court` is a subset of both lineups and `not_on_court` is
    /// disjoint from them.
    pub fn matches(&self, play: &Play) -> bool {
        self.on_court.iter().all(|p| play.is_on_court(*p))
            && !self.not_on_court.iter().any(|p| play.is_on_court(*p))
    }

    fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.on_court.iter().chain(self.not_on_court.iter()).copied()
    }
}

// ============================================================================
// Tally
// ============================================================================

/// Aggregates shared by every variant.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    pub action_totals: ActionTotals,
    pub games_played_in: BTreeSet<GameId>,
    pub timeline: Timeline,
    type_totals: FxHashMap<StatType, u32>,
}

impl Tally {
    pub fn count(&mut self, action_id: ActionId) {
        self.action_totals.add(action_id);
        self.type_totals.clear();
    }

    /// Total of a type over `action_totals`, memoized.
    pub fn type_total(&mut self, stat: StatType, actions: &ActionTable) -> u32 {
        if let Some(total) = self.type_totals.get(&stat) {
            return *total;
        }
        let total = self.action_totals.of_type(stat, actions);
        self.type_totals.insert(stat, total);
        total
    }

    pub fn points(&self, actions: &ActionTable) -> i64 {
        self.action_totals.points(actions)
    }

    pub fn minutes(&mut self) -> f64 {
        self.timeline.minutes()
    }
}

/// Session data formulas need besides the tally.
pub struct ResultContext<'a> {
    pub actions: &'a ActionTable,
    /// Regulation plus overtime minutes of every loaded game.
    pub game_minutes: &'a BTreeMap<GameId, f64>,
}

impl ResultContext<'_> {
    /// Total length in minutes of the given games.
    pub fn length_of_games<'g>(&self, games: impl IntoIterator<Item = &'g GameId>) -> f64 {
        games
            .into_iter()
            .filter_map(|g| self.game_minutes.get(g))
            .sum()
    }
}

// ============================================================================
// Variant interface
// ============================================================================

/// Actor condition, accumulation and formulas of one metric family.
pub trait Metric {
    /// Label used in logs and errors.
    fn name(&self) -> &'static str;

    /// Resolve ids against the session roster before any play is offered.
    fn prepare(&mut self, _roster: &Roster) -> Result<(), StatsError> {
        Ok(())
    }

    /// Does this play (already past the lineup filter) concern the metric?
    fn matches(&self, event: &PlayEvent<'_>) -> bool;

    /// Record a matching play.
    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally);

    /// Final metric values, in request order.
    fn results(&mut self, tally: &mut Tally, ctx: &ResultContext<'_>) -> Vec<StatValue>;

    /// Overrides the summary's `total_all`.
    fn headline_total(&self) -> Option<u32> {
        None
    }
}

/// The closed set of query kinds.
#[derive(Debug, Clone)]
pub enum Variant {
    Standard(StandardQuery),
    AssistRate(AssistRate),
    ReboundRate(ReboundRate),
    OffensiveRating(OffensiveRating),
    DefensiveRating(DefensiveRating),
}

impl Variant {
    fn metric(&self) -> &dyn Metric {
        match self {
            Variant::Standard(q) => q,
            Variant::AssistRate(q) => q,
            Variant::ReboundRate(q) => q,
            Variant::OffensiveRating(q) => q,
            Variant::DefensiveRating(q) => q,
        }
    }

    fn metric_mut(&mut self) -> &mut dyn Metric {
        match self {
            Variant::Standard(q) => q,
            Variant::AssistRate(q) => q,
            Variant::ReboundRate(q) => q,
            Variant::OffensiveRating(q) => q,
            Variant::DefensiveRating(q) => q,
        }
    }
}

/// School of the requested players, taken from the lowest id.
pub(crate) fn school_of_players(
    players: &FxHashSet<PlayerId>,
    roster: &Roster,
    variant: &'static str,
) -> Result<SchoolId, StatsError> {
    let first = players
        .iter()
        .min()
        .ok_or(StatsError::NoRequestedPlayers(variant))?;
    roster
        .school_of(*first)
        .ok_or(StatsError::UnknownPlayer(*first))
}

/// Every id must be a loaded player.
pub(crate) fn check_known(
    players: impl IntoIterator<Item = PlayerId>,
    roster: &Roster,
) -> Result<(), StatsError> {
    for player_id in players {
        if roster.get(player_id).is_none() {
            return Err(StatsError::UnknownPlayer(player_id));
        }
    }
    Ok(())
}

// ============================================================================
// Question
// ============================================================================

/// Counts and minutes reported with every result.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_each: ActionTotals,
    pub total_all: u32,
    pub points: i64,
    pub minutes: f64,
    pub games: BTreeSet<GameId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResults {
    pub summary: Summary,
    pub values: Vec<StatValue>,
}

/// One query: a filter, running aggregates and a metric variant.
#[derive(Debug, Clone)]
pub struct Question {
    filter: LineupFilter,
    tally: Tally,
    variant: Variant,
}

impl Question {
    pub fn new(filter: LineupFilter, variant: Variant) -> Self {
        Self {
            filter,
            tally: Tally::default(),
            variant,
        }
    }

    pub fn filter(&self) -> &LineupFilter {
        &self.filter
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn name(&self) -> &'static str {
        self.variant.metric().name()
    }

    /// Check ids against the roster and let the variant bind its players.
    pub fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(self.filter.players(), roster)?;
        self.variant.metric_mut().prepare(roster)
    }

    /// Feed one play.
    pub fn offer(&mut self, event: &PlayEvent<'_>) {
        if !self.filter.wants_game(event.game_id) {
            return;
        }

        let lineup_ok = self.filter.matches(event.play);
        if lineup_ok {
            self.tally.games_played_in.insert(event.game_id);
            if self.variant.metric().matches(event) {
                self.variant.metric_mut().accumulate(event, &mut self.tally);
            }
        }

        self.tally
            .timeline
            .record(event.game_id, event.play.section, event.play.time, lineup_ok);
    }

    /// Summary plus metric values.
    pub fn results(&mut self, ctx: &ResultContext<'_>) -> QueryResults {
        let values = self.variant.metric_mut().results(&mut self.tally, ctx);
        let total_all = self
            .variant
            .metric()
            .headline_total()
            .unwrap_or_else(|| self.tally.action_totals.sum());

        QueryResults {
            summary: Summary {
                total_each: self.tally.action_totals.clone(),
                total_all,
                points: self.tally.points(ctx.actions),
                minutes: self.tally.minutes(),
                games: self.tally.games_played_in.clone(),
            },
            values,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Small two-team fixture shared by the query tests.
    use super::*;
    use crate::models::{ActionKind, Lineup};

    pub const HOME: SchoolId = 1;
    pub const AWAY: SchoolId = 2;
    pub const GAME: GameId = 50;

    pub const MADE_2: ActionId = 1;
    pub const MISSED_2: ActionId = 2;
    pub const MADE_3: ActionId = 3;
    pub const MISSED_3: ActionId = 4;
    pub const MADE_FT: ActionId = 5;
    pub const MISSED_FT: ActionId = 6;
    pub const AST: ActionId = 7;
    pub const TOV: ActionId = 8;
    pub const OREB: ActionId = 9;
    pub const DREB: ActionId = 10;
    pub const STL: ActionId = 11;
    pub const BLK: ActionId = 12;
    pub const FOUL: ActionId = 13;
    pub const ENTER: ActionId = 14;
    pub const LEAVE: ActionId = 15;

    pub fn actions() -> ActionTable {
        ActionTable::new([
            Action::new(MADE_2, "made two", 2, ActionKind::Made2FG),
            Action::new(MISSED_2, "missed two", 0, ActionKind::Missed2FG),
            Action::new(MADE_3, "made three", 3, ActionKind::Made3FG),
            Action::new(MISSED_3, "missed three", 0, ActionKind::Missed3FG),
            Action::new(MADE_FT, "made free throw", 1, ActionKind::MadeFT),
            Action::new(MISSED_FT, "missed free throw", 0, ActionKind::MissedFT),
            Action::new(AST, "assist", 0, ActionKind::Assist),
            Action::new(TOV, "turnover", 0, ActionKind::Turnover),
            Action::new(OREB, "offensive rebound", 0, ActionKind::OffensiveRebound),
            Action::new(DREB, "defensive rebound", 0, ActionKind::DefensiveRebound),
            Action::new(STL, "steal", 0, ActionKind::Steal),
            Action::new(BLK, "block", 0, ActionKind::Block),
            Action::new(FOUL, "foul", 0, ActionKind::Foul),
            Action::new(ENTER, "enters", 0, ActionKind::Enter),
            Action::new(LEAVE, "leaves", 0, ActionKind::Leave),
        ])
    }

    /// Home 101..=106, away 201..=206, TEAM actors 100 and 200.
    pub fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.insert(Player::team(100, HOME));
        roster.insert(Player::team(200, AWAY));
        for i in 1..=6 {
            roster.insert(Player::new(100 + i, HOME, &format!("H{i}"), "x"));
            roster.insert(Player::new(200 + i, AWAY, &format!("A{i}"), "y"));
        }
        roster
    }

    pub fn starters() -> (Lineup, Lineup) {
        (
            [101, 102, 103, 104, 105].into_iter().collect(),
            [201, 202, 203, 204, 205].into_iter().collect(),
        )
    }

    /// A play with the starting lineups on court.
    pub fn play(id: i64, player: PlayerId, action: ActionId, time: u32) -> Play {
        let (home, away) = starters();
        Play::new(id, player, action, time, 1).with_lineups(home, away)
    }

    /// Offer every play of one game to `question`.
    pub fn run(question: &mut Question, plays: &[Play], roster: &Roster, actions: &ActionTable) {
        for play in plays {
            let event = PlayEvent {
                game_id: GAME,
                play,
                actor: roster.get(play.player_id).unwrap(),
                action: actions.get(play.action_id).unwrap(),
            };
            question.offer(&event);
        }
    }

    /// One 40-minute game.
    pub fn game_minutes() -> BTreeMap<GameId, f64> {
        BTreeMap::from([(GAME, 40.0)])
    }
}
