//! Single-condition query and the rate variants.
//!
//! [`StandardQuery`] counts actions by an include/exclude set of actors and
//! evaluates any number of [`Stat`]s. Assist rate and rebound rate need two
//! conditions at once (the player's own actions and their team's or the
//! opponent's), so each gets its own matching rule and formula.

use super::formulas::{self, divide, resolve, StatValue};
use super::{check_known, school_of_players, Metric, PlayEvent, ResultContext, Tally};
use crate::error::StatsError;
use crate::models::{ActionId, ActionKind, PlayerId, Roster, SchoolId, StatType};
use rustc_hash::FxHashSet;

/// Metrics available on a standard query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Total,
    PerGame,
    PerMinute,
    /// First requested action over the second.
    Rate,
    /// First requested action over both, as a percentage.
    Percent,
    EffectiveFieldGoalPct,
    TrueShootingPct,
    TurnoverRate,
    AssistTurnoverRatio,
}

// ============================================================================
// Standard query
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct StandardQuery {
    pub who_made_action: FxHashSet<PlayerId>,
    pub not_made_action: FxHashSet<PlayerId>,
    /// Order matters for `Rate` and `Percent`. Empty means every action.
    pub actions_requested: Vec<ActionId>,
    pub stats: Vec<Stat>,
    /// Total, per game and per minute use points instead of counts.
    pub points_requested: bool,
}

impl StandardQuery {
    fn requested_total(&self, tally: &Tally, ctx: &ResultContext<'_>) -> f64 {
        if self.points_requested {
            tally.points(ctx.actions) as f64
        } else if self.actions_requested.is_empty() {
            tally.action_totals.sum() as f64
        } else {
            self.actions_requested
                .iter()
                .map(|id| tally.action_totals.get(*id) as f64)
                .sum()
        }
    }

    /// The two requested action totals, if exactly two were requested.
    fn pair(&self, tally: &Tally) -> Option<(f64, f64)> {
        match self.actions_requested.as_slice() {
            [a, b] => Some((
                tally.action_totals.get(*a) as f64,
                tally.action_totals.get(*b) as f64,
            )),
            _ => None,
        }
    }

    fn evaluate(&self, stat: Stat, total: f64, tally: &mut Tally, ctx: &ResultContext<'_>) -> StatValue {
        let actions = ctx.actions;
        match stat {
            Stat::Total => StatValue::Value(total),
            Stat::PerGame => resolve(divide(total, tally.games_played_in.len() as f64)),
            Stat::PerMinute => resolve(divide(total, tally.minutes())),
            Stat::Rate => match self.pair(tally) {
                Some((a, b)) => resolve(formulas::rate(a, b)),
                None => StatValue::Undefined,
            },
            Stat::Percent => match self.pair(tally) {
                Some((a, b)) => resolve(formulas::percent(a, b)),
                None => StatValue::Undefined,
            },
            Stat::EffectiveFieldGoalPct => {
                let made_2 = tally.type_total(StatType::Made2FG, actions) as f64;
                let made_3 = tally.type_total(StatType::Made3FG, actions) as f64;
                let fga = tally.type_total(StatType::FGA, actions) as f64;
                resolve(formulas::effective_fg_pct(made_2, made_3, fga))
            }
            Stat::TrueShootingPct => {
                let points = tally.points(actions) as f64;
                let fga = tally.type_total(StatType::FGA, actions) as f64;
                let fta = tally.type_total(StatType::FTA, actions) as f64;
                resolve(formulas::true_shooting_pct(points, fga, fta))
            }
            Stat::TurnoverRate => {
                let tov = tally.type_total(StatType::TOV, actions) as f64;
                let fga = tally.type_total(StatType::FGA, actions) as f64;
                let fta = tally.type_total(StatType::FTA, actions) as f64;
                resolve(formulas::turnover_rate(tov, fga, fta))
            }
            Stat::AssistTurnoverRatio => {
                let ast = tally.type_total(StatType::AST, actions) as f64;
                let tov = tally.type_total(StatType::TOV, actions) as f64;
                resolve(formulas::assist_turnover_ratio(ast, tov))
            }
        }
    }
}

impl Metric for StandardQuery {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(
            self.who_made_action
                .iter()
                .chain(self.not_made_action.iter())
                .copied(),
            roster,
        )
    }

    fn matches(&self, event: &PlayEvent<'_>) -> bool {
        let actor = event.actor.player_id;
        self.who_made_action.contains(&actor) && !self.not_made_action.contains(&actor)
    }

    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally) {
        tally.count(event.play.action_id);
    }

    fn results(&mut self, tally: &mut Tally, ctx: &ResultContext<'_>) -> Vec<StatValue> {
        let total = self.requested_total(tally, ctx);
        self.stats
            .iter()
            .map(|stat| self.evaluate(*stat, total, tally, ctx))
            .collect()
    }
}

// ============================================================================
// Assist rate
// ============================================================================

/// Requested players' assists over their teammates' made field goals.
#[derive(Debug, Clone, Default)]
pub struct AssistRate {
    pub players: FxHashSet<PlayerId>,
    school: Option<SchoolId>,
}

impl AssistRate {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            players: players.into_iter().collect(),
            school: None,
        }
    }
}

impl Metric for AssistRate {
    fn name(&self) -> &'static str {
        "assist rate"
    }

    fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(self.players.iter().copied(), roster)?;
        self.school = Some(school_of_players(&self.players, roster, self.name())?);
        Ok(())
    }

    fn matches(&self, event: &PlayEvent<'_>) -> bool {
        let requested = self.players.contains(&event.actor.player_id);
        let kind = &event.action.kind;
        if requested {
            *kind == ActionKind::Assist
        } else {
            self.school == Some(event.actor.school_id) && StatType::FGM.includes(kind)
        }
    }

    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally) {
        tally.count(event.play.action_id);
    }

    fn results(&mut self, tally: &mut Tally, ctx: &ResultContext<'_>) -> Vec<StatValue> {
        let assists = tally.type_total(StatType::AST, ctx.actions) as f64;
        let field_goals = tally.type_total(StatType::FGM, ctx.actions) as f64;
        // No field goals means no assists either.
        vec![StatValue::Value(divide(assists, field_goals).unwrap_or(0.0))]
    }
}

// ============================================================================
// Rebound rate
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReboundKind {
    Offensive,
    Defensive,
}

impl ReboundKind {
    pub fn action_kind(&self) -> ActionKind {
        match self {
            ReboundKind::Offensive => ActionKind::OffensiveRebound,
            ReboundKind::Defensive => ActionKind::DefensiveRebound,
        }
    }

    /// The rebound the opponent gets on the same missed shot.
    pub fn complement(&self) -> ReboundKind {
        match self {
            ReboundKind::Offensive => ReboundKind::Defensive,
            ReboundKind::Defensive => ReboundKind::Offensive,
        }
    }
}

/// Share of available rebounds of one kind that the requested players grab.
#[derive(Debug, Clone)]
pub struct ReboundRate {
    pub players: FxHashSet<PlayerId>,
    pub rebound: ReboundKind,
    school: Option<SchoolId>,
    player_rebounds: u32,
    team_rebounds: u32,
    opponent_rebounds: u32,
}

impl ReboundRate {
    pub fn new(players: impl IntoIterator<Item = PlayerId>, rebound: ReboundKind) -> Self {
        Self {
            players: players.into_iter().collect(),
            rebound,
            school: None,
            player_rebounds: 0,
            team_rebounds: 0,
            opponent_rebounds: 0,
        }
    }
}

impl Metric for ReboundRate {
    fn name(&self) -> &'static str {
        match self.rebound {
            ReboundKind::Offensive => "offensive rebound rate",
            ReboundKind::Defensive => "defensive rebound rate",
        }
    }

    fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(self.players.iter().copied(), roster)?;
        self.school = Some(school_of_players(&self.players, roster, self.name())?);
        Ok(())
    }

    fn matches(&self, event: &PlayEvent<'_>) -> bool {
        let kind = &event.action.kind;
        *kind == self.rebound.action_kind() || *kind == self.rebound.complement().action_kind()
    }

    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally) {
        let same_kind = event.action.kind == self.rebound.action_kind();
        let own_team = self.school == Some(event.actor.school_id);

        if same_kind && self.players.contains(&event.actor.player_id) {
            self.player_rebounds += 1;
            tally.count(event.play.action_id);
        }
        if own_team && same_kind {
            self.team_rebounds += 1;
        } else if !own_team && event.action.kind == self.rebound.complement().action_kind() {
            self.opponent_rebounds += 1;
        }
    }

    fn results(&mut self, _tally: &mut Tally, _ctx: &ResultContext<'_>) -> Vec<StatValue> {
        let available = (self.team_rebounds + self.opponent_rebounds) as f64;
        vec![resolve(divide(100.0 * self.player_rebounds as f64, available))]
    }

    fn headline_total(&self) -> Option<u32> {
        Some(self.player_rebounds)
    }
}
