//! Play events and the lineups attached to them.

use super::{ActionId, ActionTable, PlayId, PlayerId, Roster, SchoolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which side of a game a school plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// The two schools of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub home_id: SchoolId,
    pub away_id: SchoolId,
}

impl Matchup {
    pub fn new(home_id: SchoolId, away_id: SchoolId) -> Self {
        Self { home_id, away_id }
    }

    pub fn side_of(&self, school_id: SchoolId) -> Option<Side> {
        if school_id == self.home_id {
            Some(Side::Home)
        } else if school_id == self.away_id {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn school_on(&self, side: Side) -> SchoolId {
        match side {
            Side::Home => self.home_id,
            Side::Away => self.away_id,
        }
    }
}

/// Players from one team believed to be on court. Fewer than five means
/// degraded data; none at all is possible when a team never shows up in a
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lineup(BTreeSet<PlayerId>);

impl Lineup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.0.contains(&player_id)
    }

    pub fn insert(&mut self, player_id: PlayerId) -> bool {
        self.0.insert(player_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.0.iter().copied()
    }

    /// Ids in ascending order, as written back to storage.
    pub fn to_vec(&self) -> Vec<PlayerId> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<PlayerId> for Lineup {
    fn from_iter<I: IntoIterator<Item = PlayerId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One recorded event within a game section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub play_id: PlayId,
    pub player_id: PlayerId,
    pub action_id: ActionId,
    /// Seconds left on the section clock.
    pub time: u32,
    /// 1 and 2 are halves, 3 and up are overtime periods.
    pub section: u8,
    pub home: Lineup,
    pub away: Lineup,
    /// Set once lineups were logged, loaded or reconstructed. Either side
    /// may still be empty.
    #[serde(default)]
    lineups_known: bool,
}

impl Play {
    pub fn new(play_id: PlayId, player_id: PlayerId, action_id: ActionId, time: u32, section: u8) -> Self {
        Self {
            play_id,
            player_id,
            action_id,
            time,
            section,
            home: Lineup::new(),
            away: Lineup::new(),
            lineups_known: false,
        }
    }

    pub fn with_lineups(mut self, home: Lineup, away: Lineup) -> Self {
        self.set_lineups(home, away);
        self
    }

    pub fn set_lineups(&mut self, home: Lineup, away: Lineup) {
        self.home = home;
        self.away = away;
        self.lineups_known = true;
    }

    /// False until lineups are attached; an empty side still counts.
    pub fn has_lineups(&self) -> bool {
        self.lineups_known
    }

    pub fn lineup(&self, side: Side) -> &Lineup {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    /// Is the player on court for either team?
    pub fn is_on_court(&self, player_id: PlayerId) -> bool {
        self.home.contains(player_id) || self.away.contains(player_id)
    }

    /// `MM:SS` of the section clock.
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.time / 60, self.time % 60)
    }

    /// One-line diagnostic rendering with names resolved.
    pub fn describe(&self, roster: &Roster, actions: &ActionTable) -> String {
        let name_of = |id: PlayerId| {
            roster
                .get(id)
                .map(|p| p.last_name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let join = |lineup: &Lineup| lineup.iter().map(name_of).collect::<Vec<_>>().join("; ");
        let actor = roster
            .get(self.player_id)
            .map(|p| p.to_string())
            .unwrap_or_else(|| self.player_id.to_string());
        let action = actions
            .get(self.action_id)
            .map(|a| a.name.as_str())
            .unwrap_or("?");

        format!(
            "{}   {:20.20} {} with {} ||| {}",
            self.clock(),
            actor,
            action,
            join(&self.home),
            join(&self.away)
        )
    }
}
