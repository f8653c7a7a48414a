//! One loaded game: its plays in order, split into sections.

use crate::error::StatsError;
use crate::lineup::LineupReconstructor;
use crate::models::{ActionTable, GameId, Lineup, Matchup, Play, Roster, SchoolId, Side};
use crate::query::{PlayEvent, Question};
use crate::storage::LineupRecord;
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::warn;

/// Regulation length in minutes (two halves).
pub const REGULATION_MINUTES: f64 = 40.0;
/// Length of each overtime period in minutes.
pub const OVERTIME_MINUTES: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct Game {
    pub game_id: GameId,
    pub matchup: Matchup,
    plays: Vec<Play>,
    /// Contiguous play ranges per section, in play order. Section numbers
    /// strictly increase.
    sections: Vec<(u8, Range<usize>)>,
    invalid: Option<&'static str>,
}

impl Game {
    /// Build a game from its plays, already ordered by play id.
    ///
    /// A section opens at the first play labelled with a higher section
    /// number. A play labelled with an earlier section stays in the
    /// current one.
    pub fn new(game_id: GameId, home_id: SchoolId, away_id: SchoolId, plays: Vec<Play>) -> Self {
        let mut sections: Vec<(u8, Range<usize>)> = Vec::new();
        for (index, play) in plays.iter().enumerate() {
            match sections.last_mut() {
                Some((section, range)) if play.section <= *section => {
                    if play.section < *section {
                        warn!(
                            "Game {} play {}: section {} after section {}, kept in section {}",
                            game_id, play.play_id, play.section, section, section
                        );
                    }
                    range.end = index + 1;
                }
                _ => sections.push((play.section, index..index + 1)),
            }
        }
        let invalid = plays.is_empty().then_some("No play data");

        Self {
            game_id,
            matchup: Matchup::new(home_id, away_id),
            plays,
            sections,
            invalid,
        }
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    /// Why the game cannot be used, if it can't.
    pub fn invalid_reason(&self) -> Option<&'static str> {
        self.invalid
    }

    pub fn side_of(&self, school_id: SchoolId) -> Option<Side> {
        self.matchup.side_of(school_id)
    }

    pub fn other_team(&self, school_id: SchoolId) -> Option<SchoolId> {
        let side = self.side_of(school_id)?;
        Some(self.matchup.school_on(side.other()))
    }

    /// Section numbers in play order.
    pub fn section_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.sections.iter().map(|(section, _)| *section)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Plays of one section; empty if the section never happened.
    pub fn section(&self, section: u8) -> &[Play] {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, range)| &self.plays[range.clone()])
            .unwrap_or(&[])
    }

    /// Minutes of regulation plus overtime.
    pub fn length_minutes(&self) -> f64 {
        REGULATION_MINUTES + OVERTIME_MINUTES * self.section_count().saturating_sub(2) as f64
    }

    pub fn needs_lineups(&self) -> bool {
        self.plays.iter().any(|p| !p.has_lineups())
    }

    /// Sections with at least one play still missing a lineup.
    pub fn incomplete_sections(&self) -> Vec<u8> {
        self.sections
            .iter()
            .filter(|(_, range)| self.plays[range.clone()].iter().any(|p| !p.has_lineups()))
            .map(|(section, _)| *section)
            .collect()
    }

    /// Reconstruct the missing lineups of one section.
    ///
    /// Returns the records to write back; a complete or absent section
    /// yields none.
    pub fn complete_section(
        &mut self,
        section: u8,
        roster: &Roster,
        actions: &ActionTable,
    ) -> Result<Vec<LineupRecord>, StatsError> {
        let Some(range) = self
            .sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, range)| range.clone())
        else {
            return Ok(Vec::new());
        };
        LineupReconstructor::new(self.game_id, self.matchup, roster, actions)
            .complete_section(&mut self.plays[range])
    }

    /// Distinct lineups a school put on court, ignoring substitution plays.
    pub fn lineups(&self, school_id: SchoolId, actions: &ActionTable) -> BTreeSet<Lineup> {
        let Some(side) = self.side_of(school_id) else {
            return BTreeSet::new();
        };
        self.plays
            .iter()
            .filter(|p| !actions.kind(p.action_id).is_some_and(|k| k.is_substitution()))
            .map(|p| p.lineup(side))
            .filter(|lineup| !lineup.is_empty())
            .cloned()
            .collect()
    }

    /// Offer every play to every question interested in this game.
    pub fn offer_plays(
        &self,
        questions: &mut [Question],
        roster: &Roster,
        actions: &ActionTable,
    ) -> Result<(), StatsError> {
        if self.invalid.is_some() {
            return Ok(());
        }

        for play in &self.plays {
            let actor = roster
                .get(play.player_id)
                .ok_or(StatsError::UnknownPlayer(play.player_id))?;
            let action = actions
                .get(play.action_id)
                .ok_or(StatsError::UnknownAction(play.action_id))?;
            let event = PlayEvent {
                game_id: self.game_id,
                play,
                actor,
                action,
            };
            for question in questions.iter_mut() {
                question.offer(&event);
            }
        }
        Ok(())
    }
}
