// Reference data shared by the lineup, timeline and query layers.
//
// Everything is keyed by integer ids; plays and games hold ids and resolve
// them through `Roster` / `ActionTable` on demand.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod action;
pub mod play;

pub use action::{Action, ActionKind, ActionTable, StatType};
pub use play::{Lineup, Matchup, Play, Side};

pub type PlayerId = i64;
pub type SchoolId = i64;
pub type ActionId = i64;
pub type GameId = i64;
pub type PlayId = i64;

/// Last name of the synthetic actor credited with team plays (team
/// rebounds, team turnovers). It never occupies a lineup slot.
pub const TEAM_ACTOR: &str = "TEAM";

// ============================================================================
// Players
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub school_id: SchoolId,
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Player {
    pub fn new(player_id: PlayerId, school_id: SchoolId, last_name: &str, first_name: &str) -> Self {
        Self {
            player_id,
            school_id,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            title: None,
        }
    }

    /// Placeholder actor for a school's team plays.
    pub fn team(player_id: PlayerId, school_id: SchoolId) -> Self {
        Self::new(player_id, school_id, TEAM_ACTOR, "")
    }

    /// True for the synthetic `TEAM` actor.
    pub fn is_team(&self) -> bool {
        self.last_name == TEAM_ACTOR
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.player_id == other.player_id
    }
}

impl Eq for Player {}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{}, {}, {}", self.last_name, self.first_name, title),
            None => write!(f, "{}, {}", self.last_name, self.first_name),
        }
    }
}

/// Flat player table for every school loaded in a session.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: FxHashMap<PlayerId, Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, player: Player) {
        self.players.insert(player.player_id, player);
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// School of a player, if the player is known.
    pub fn school_of(&self, player_id: PlayerId) -> Option<SchoolId> {
        self.players.get(&player_id).map(|p| p.school_id)
    }

    /// True if at least one player from this school is loaded.
    pub fn has_school(&self, school_id: SchoolId) -> bool {
        self.players.values().any(|p| p.school_id == school_id)
    }

    /// Real (non-`TEAM`) players of a school, sorted by last name.
    pub fn school_players(&self, school_id: SchoolId) -> Vec<&Player> {
        let mut players: Vec<&Player> = self
            .players
            .values()
            .filter(|p| p.school_id == school_id && !p.is_team())
            .collect();
        players.sort_by(|a, b| a.last_name.cmp(&b.last_name));
        players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_display() {
        let mut player = Player::new(1, 10, "Smith", "John");
        assert_eq!(player.to_string(), "Smith, John");
        player.title = Some("Jr.".to_string());
        assert_eq!(player.to_string(), "Smith, John, Jr.");
    }

    #[test]
    fn test_player_equality_by_id() {
        let a = Player::new(1, 10, "Smith", "John");
        let b = Player::new(1, 11, "Smyth", "Jon");
        assert_eq!(a, b);
        assert!(Player::team(2, 10).is_team());
        assert!(!a.is_team());
    }

    #[test]
    fn test_roster_school_lookup() {
        let mut roster = Roster::new();
        roster.insert(Player::new(1, 10, "Young", "A"));
        roster.insert(Player::new(2, 10, "Adams", "B"));
        roster.insert(Player::team(3, 10));
        roster.insert(Player::new(4, 20, "Other", "C"));

        assert!(roster.has_school(10));
        assert!(!roster.has_school(30));
        assert_eq!(roster.school_of(4), Some(20));

        let names: Vec<&str> = roster
            .school_players(10)
            .iter()
            .map(|p| p.last_name.as_str())
            .collect();
        assert_eq!(names, vec!["Adams", "Young"]);
    }
}
