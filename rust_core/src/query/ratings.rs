//! Offensive and defensive ratings.
//!
//! Both follow the basketball-reference individual ratings with the
//! free-throw possession weight set to 0.475. They need three sets of
//! totals (requested players, their team, the opponent) so the variants
//! keep their own per-team counters next to the shared tally.
//!
//! Any zero denominator anywhere in a rating means there is not enough
//! data and the rating is reported as 0.

use super::formulas::{divide, FormulaResult, StatValue, FT_POSSESSION_FACTOR};
use super::{
    check_known, school_of_players, ActionTotals, Metric, PlayEvent, ResultContext, Tally,
};
use crate::error::StatsError;
use crate::models::{ActionKind, ActionTable, PlayerId, Roster, SchoolId, StatType};
use rustc_hash::FxHashSet;

const FT: f64 = FT_POSSESSION_FACTOR;

/// Box-score counts for one side, as floats for the formulas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxLine {
    pub fgm: f64,
    pub fga: f64,
    pub fgm3: f64,
    pub ftm: f64,
    pub fta: f64,
    pub tov: f64,
    pub oreb: f64,
    pub dreb: f64,
    pub ast: f64,
    pub stl: f64,
    pub blk: f64,
    pub pf: f64,
    pub pts: f64,
}

impl BoxLine {
    pub fn from_totals(totals: &ActionTotals, actions: &ActionTable) -> Self {
        let of = |stat| totals.of_type(stat, actions) as f64;
        Self {
            fgm: of(StatType::FGM),
            fga: of(StatType::FGA),
            fgm3: of(StatType::Made3FG),
            ftm: of(StatType::FTM),
            fta: of(StatType::FTA),
            tov: of(StatType::TOV),
            oreb: of(StatType::OREB),
            dreb: of(StatType::DREB),
            ast: of(StatType::AST),
            stl: of(StatType::STL),
            blk: of(StatType::BLK),
            pf: of(StatType::Foul),
            pts: totals.points(actions) as f64,
        }
    }
}

/// `(1 - (1 - made/attempts)^2)`, the share of trips that score.
fn trips_scoring(made: f64, attempts: f64) -> FormulaResult {
    Ok(1.0 - (1.0 - divide(made, attempts)?).powi(2))
}

// ============================================================================
// Formulas
// ============================================================================

/// Points produced per 100 individual possessions.
///
/// `minutes` is the requested players' time on court and `team_minutes`
/// the length of the games they appeared in.
pub fn offensive_rating(
    player: &BoxLine,
    team: &BoxLine,
    opponent_dreb: f64,
    minutes: f64,
    team_minutes: f64,
) -> FormulaResult {
    let (p, t) = (player, team);
    let share = divide(minutes, team_minutes / 5.0)?;

    // Scoring possessions
    let q_ast = share * (1.14 * divide(t.ast - p.ast, t.fgm)?)
        + divide(
            divide(t.ast, team_minutes)? * minutes * 5.0 - p.ast,
            divide(t.fgm, team_minutes)? * minutes * 5.0 - p.fgm,
        )? * (1.0 - share);

    let field_goal_scoring = divide(p.pts - p.ftm, 2.0 * p.fga)?;
    let fg_part = p.fgm * (1.0 - 0.5 * field_goal_scoring * q_ast);

    let teammate_scoring = divide((t.pts - t.ftm) - (p.pts - p.ftm), 2.0 * (t.fga - p.fga))?;
    let ast_part = 0.5 * teammate_scoring * p.ast;

    let ft_part = trips_scoring(p.ftm, p.fta)? * FT * p.fta;

    let team_scoring_poss = t.fgm + trips_scoring(t.ftm, t.fta)? * t.fta * FT;
    let team_oreb_pct = divide(t.oreb, t.oreb + opponent_dreb)?;
    let team_play_pct = divide(team_scoring_poss, t.fga + t.fta * FT + t.tov)?;
    let oreb_weight = divide(
        (1.0 - team_oreb_pct) * team_play_pct,
        (1.0 - team_oreb_pct) * team_play_pct + team_oreb_pct * (1.0 - team_play_pct),
    )?;
    let oreb_part = p.oreb * oreb_weight * team_play_pct;
    let oreb_discount = 1.0 - divide(t.oreb, team_scoring_poss)? * oreb_weight * team_play_pct;

    let scoring_poss = (fg_part + ast_part + ft_part) * oreb_discount + oreb_part;

    // Possessions
    let missed_fg_poss = (p.fga - p.fgm) * (1.0 - 1.07 * team_oreb_pct);
    let missed_ft_poss = (1.0 - divide(p.ftm, p.fta)?).powi(2) * FT * p.fta;
    let total_poss = scoring_poss + missed_fg_poss + missed_ft_poss + p.tov;

    // Points produced
    let pprod_fg = 2.0 * (p.fgm + 0.5 * p.fgm3) * (1.0 - 0.5 * field_goal_scoring * q_ast);
    let pprod_ast = 2.0
        * divide(t.fgm - p.fgm + 0.5 * (t.fgm3 - p.fgm3), t.fgm - p.fgm)?
        * 0.5
        * teammate_scoring
        * p.ast;
    let pprod_oreb = p.oreb
        * oreb_weight
        * team_play_pct
        * divide(t.pts, t.fgm + trips_scoring(t.ftm, t.fta)? * FT * t.fta)?;
    let pprod = (pprod_fg + pprod_ast + p.ftm) * oreb_discount + pprod_oreb;

    Ok(100.0 * divide(pprod, total_poss)?)
}

/// Opponent points allowed per 100 possessions while on court.
pub fn defensive_rating(
    player: &BoxLine,
    team: &BoxLine,
    opponent: &BoxLine,
    minutes: f64,
    team_minutes: f64,
) -> FormulaResult {
    let (p, t, o) = (player, team, opponent);
    let opponent_minutes = team_minutes;

    let dor_pct = divide(o.oreb, o.oreb + t.dreb)?;
    let dfg_pct = divide(o.fgm, o.fga)?;
    let fm_weight = divide(
        dfg_pct * (1.0 - dor_pct),
        dfg_pct * (1.0 - dor_pct) + (1.0 - dfg_pct) * dor_pct,
    )?;

    let stops_1 = p.stl + p.blk * fm_weight * (1.0 - 1.07 * dor_pct) + p.dreb * (1.0 - fm_weight);
    let stops_2 = (divide(o.fga - o.fgm - t.blk, team_minutes)?
        * fm_weight
        * (1.0 - 1.07 * dor_pct)
        + divide(o.tov - t.stl, team_minutes)?)
        * minutes
        + divide(p.pf, t.pf)? * FT * o.fta * (1.0 - divide(o.ftm, o.fta)?).powi(2);
    let stops = stops_1 + stops_2;

    let team_poss = 0.5
        * ((t.fga + FT * t.fta - 1.07 * divide(t.oreb, t.oreb + o.dreb)? * (t.fga - t.fgm)
            + t.tov)
            + (o.fga + FT * o.fta - 1.07 * divide(o.oreb, o.oreb + t.dreb)? * (o.fga - o.fgm)
                + o.tov));

    let stop_pct = divide(stops * opponent_minutes, team_poss * minutes)?;
    let team_rating = 100.0 * divide(o.pts, team_poss)?;
    let points_per_scoring_poss =
        divide(o.pts, o.fgm + trips_scoring(o.ftm, o.fta)? * o.fta * FT)?;

    Ok(team_rating + 0.2 * (100.0 * points_per_scoring_poss * (1.0 - stop_pct) - team_rating))
}

// ============================================================================
// Variants
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct OffensiveRating {
    pub players: FxHashSet<PlayerId>,
    school: Option<SchoolId>,
    team_totals: ActionTotals,
    opponent_dreb: u32,
}

impl OffensiveRating {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            players: players.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl Metric for OffensiveRating {
    fn name(&self) -> &'static str {
        "offensive rating"
    }

    fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(self.players.iter().copied(), roster)?;
        self.school = Some(school_of_players(&self.players, roster, self.name())?);
        Ok(())
    }

    fn matches(&self, _event: &PlayEvent<'_>) -> bool {
        true
    }

    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally) {
        let action_id = event.play.action_id;
        if self.players.contains(&event.actor.player_id) {
            tally.count(action_id);
        }
        if self.school == Some(event.actor.school_id) {
            self.team_totals.add(action_id);
        } else if event.action.kind == ActionKind::DefensiveRebound {
            self.opponent_dreb += 1;
        }
    }

    fn results(&mut self, tally: &mut Tally, ctx: &ResultContext<'_>) -> Vec<StatValue> {
        let player = BoxLine::from_totals(&tally.action_totals, ctx.actions);
        let team = BoxLine::from_totals(&self.team_totals, ctx.actions);
        let team_minutes = ctx.length_of_games(&tally.games_played_in);
        let rating = offensive_rating(
            &player,
            &team,
            self.opponent_dreb as f64,
            tally.minutes(),
            team_minutes,
        );
        vec![StatValue::Value(rating.unwrap_or(0.0))]
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefensiveRating {
    pub players: FxHashSet<PlayerId>,
    school: Option<SchoolId>,
    team_totals: ActionTotals,
    opponent_totals: ActionTotals,
}

impl DefensiveRating {
    pub fn new(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            players: players.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl Metric for DefensiveRating {
    fn name(&self) -> &'static str {
        "defensive rating"
    }

    fn prepare(&mut self, roster: &Roster) -> Result<(), StatsError> {
        check_known(self.players.iter().copied(), roster)?;
        self.school = Some(school_of_players(&self.players, roster, self.name())?);
        Ok(())
    }

    fn matches(&self, _event: &PlayEvent<'_>) -> bool {
        true
    }

    fn accumulate(&mut self, event: &PlayEvent<'_>, tally: &mut Tally) {
        let action_id = event.play.action_id;
        if self.players.contains(&event.actor.player_id) {
            tally.count(action_id);
        }
        if self.school == Some(event.actor.school_id) {
            self.team_totals.add(action_id);
        } else {
            self.opponent_totals.add(action_id);
        }
    }

    fn results(&mut self, tally: &mut Tally, ctx: &ResultContext<'_>) -> Vec<StatValue> {
        let player = BoxLine::from_totals(&tally.action_totals, ctx.actions);
        let team = BoxLine::from_totals(&self.team_totals, ctx.actions);
        let opponent = BoxLine::from_totals(&self.opponent_totals, ctx.actions);
        let team_minutes = ctx.length_of_games(&tally.games_played_in);
        let rating = defensive_rating(&player, &team, &opponent, tally.minutes(), team_minutes);
        vec![StatValue::Value(rating.unwrap_or(0.0))]
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{LineupFilter, Question, Variant};
    use super::*;

    fn guard() -> BoxLine {
        BoxLine {
            fgm: 6.0,
            fga: 12.0,
            fgm3: 2.0,
            ftm: 3.0,
            fta: 4.0,
            tov: 2.0,
            oreb: 2.0,
            dreb: 6.0,
            ast: 4.0,
            stl: 2.0,
            blk: 1.0,
            pf: 3.0,
            pts: 17.0,
        }
    }

    fn home_team() -> BoxLine {
        BoxLine {
            fgm: 25.0,
            fga: 55.0,
            fgm3: 6.0,
            ftm: 12.0,
            fta: 16.0,
            tov: 12.0,
            oreb: 10.0,
            dreb: 25.0,
            ast: 14.0,
            stl: 7.0,
            blk: 4.0,
            pf: 18.0,
            pts: 68.0,
        }
    }

    fn away_team() -> BoxLine {
        BoxLine {
            fgm: 24.0,
            fga: 60.0,
            fgm3: 7.0,
            ftm: 10.0,
            fta: 14.0,
            tov: 14.0,
            oreb: 8.0,
            dreb: 22.0,
            ast: 12.0,
            stl: 6.0,
            blk: 3.0,
            pf: 16.0,
            pts: 65.0,
        }
    }

    #[test]
    fn test_offensive_rating_realistic_line() {
        let ortg = offensive_rating(&guard(), &home_team(), 22.0, 30.0, 40.0).unwrap();
        assert!(ortg.is_finite());
        assert!((100.0..150.0).contains(&ortg), "ortg = {ortg}");
    }

    #[test]
    fn test_defensive_rating_realistic_line() {
        let drtg = defensive_rating(&guard(), &home_team(), &away_team(), 30.0, 40.0).unwrap();
        assert!(drtg.is_finite());
        assert!((80.0..130.0).contains(&drtg), "drtg = {drtg}");
    }

    #[test]
    fn test_ratings_without_data_are_zero_marker() {
        let empty = BoxLine::default();
        assert!(offensive_rating(&empty, &empty, 0.0, 0.0, 0.0).is_err());
        assert!(defensive_rating(&guard(), &home_team(), &empty, 30.0, 40.0).is_err());
    }

    #[test]
    fn test_box_line_from_totals() {
        let actions = actions();
        let mut totals = ActionTotals::new();
        for id in [MADE_2, MADE_3, MISSED_3, MADE_FT, FOUL, FOUL] {
            totals.add(id);
        }
        let line = BoxLine::from_totals(&totals, &actions);
        assert_eq!(line.fgm, 2.0);
        assert_eq!(line.fga, 3.0);
        assert_eq!(line.fgm3, 1.0);
        assert_eq!(line.ftm, 1.0);
        assert_eq!(line.fta, 1.0);
        assert_eq!(line.pf, 2.0);
        assert_eq!(line.pts, 6.0);
    }

    #[test]
    fn test_rating_questions_split_totals_by_team() {
        let roster = roster();
        let actions = actions();
        let plays = vec![
            play(1, 101, MADE_2, 1100),
            play(2, 102, MADE_3, 1000),
            play(3, 201, DREB, 900),
            play(4, 201, MADE_2, 800),
        ];

        let mut offense = OffensiveRating::new([101]);
        offense.prepare(&roster).unwrap();
        let mut defense = DefensiveRating::new([101]);
        defense.prepare(&roster).unwrap();

        let mut tally = Tally::default();
        for play in &plays {
            let event = PlayEvent {
                game_id: GAME,
                play,
                actor: roster.get(play.player_id).unwrap(),
                action: actions.get(play.action_id).unwrap(),
            };
            offense.accumulate(&event, &mut tally);
            defense.accumulate(&event, &mut Tally::default());
        }

        assert_eq!(tally.action_totals.sum(), 1);
        assert_eq!(offense.team_totals.sum(), 2);
        assert_eq!(offense.opponent_dreb, 1);
        assert_eq!(defense.team_totals.sum(), 2);
        assert_eq!(defense.opponent_totals.sum(), 2);
    }

    #[test]
    fn test_rating_with_too_little_data_reports_zero() {
        let roster = roster();
        let actions = actions();
        let mut question = Question::new(
            LineupFilter::for_games([GAME]),
            Variant::OffensiveRating(OffensiveRating::new([101])),
        );
        question.prepare(&roster).unwrap();
        run(&mut question, &[play(1, 101, MADE_2, 1100)], &roster, &actions);
        let minutes = game_minutes();
        let ctx = ResultContext {
            actions: &actions,
            game_minutes: &minutes,
        };
        let results = question.results(&ctx);
        assert_eq!(results.values, vec![StatValue::Value(0.0)]);
        assert_eq!(results.summary.total_all, 1);
        assert_eq!(results.summary.points, 2);
    }
}
