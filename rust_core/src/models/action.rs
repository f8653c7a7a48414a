//! Action taxonomy.
//!
//! Every play records one action id. Ids map to a display name, a point
//! value and a semantic kind; formulas work on kinds and on `StatType`
//! groupings of kinds rather than on raw ids.

use super::ActionId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of an action as stored in the taxonomy source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Made2FG,
    Missed2FG,
    Made3FG,
    Missed3FG,
    MadeFT,
    MissedFT,
    Assist,
    Turnover,
    OffensiveRebound,
    DefensiveRebound,
    Steal,
    Block,
    Foul,
    Enter,
    Leave,
    /// Any type string the engine has no formula for.
    Other(String),
}

impl ActionKind {
    pub fn parse(type_name: &str) -> Self {
        match type_name {
            "made_2FG" => Self::Made2FG,
            "missed_2FG" => Self::Missed2FG,
            "made_3FG" => Self::Made3FG,
            "missed_3FG" => Self::Missed3FG,
            "made_FT" => Self::MadeFT,
            "missed_FT" => Self::MissedFT,
            "AST" => Self::Assist,
            "TOV" => Self::Turnover,
            "OREB" => Self::OffensiveRebound,
            "DREB" => Self::DefensiveRebound,
            "STL" => Self::Steal,
            "BLK" => Self::Block,
            "foul" => Self::Foul,
            "enter" => Self::Enter,
            "leave" => Self::Leave,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Made2FG => "made_2FG",
            Self::Missed2FG => "missed_2FG",
            Self::Made3FG => "made_3FG",
            Self::Missed3FG => "missed_3FG",
            Self::MadeFT => "made_FT",
            Self::MissedFT => "missed_FT",
            Self::Assist => "AST",
            Self::Turnover => "TOV",
            Self::OffensiveRebound => "OREB",
            Self::DefensiveRebound => "DREB",
            Self::Steal => "STL",
            Self::Block => "BLK",
            Self::Foul => "foul",
            Self::Enter => "enter",
            Self::Leave => "leave",
            Self::Other(name) => name,
        }
    }

    /// Substitution bookkeeping rather than basketball activity.
    pub fn is_substitution(&self) -> bool {
        matches!(self, Self::Enter | Self::Leave)
    }
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A kind, or a supertype spanning several kinds, that formulas total over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatType {
    /// Field goal attempts: made and missed twos and threes.
    FGA,
    /// Field goals made.
    FGM,
    /// Free throw attempts.
    FTA,
    /// Free throws made.
    FTM,
    Made2FG,
    Made3FG,
    AST,
    TOV,
    OREB,
    DREB,
    STL,
    BLK,
    Foul,
}

impl StatType {
    /// Does an action of this kind count toward this type?
    pub fn includes(&self, kind: &ActionKind) -> bool {
        use ActionKind as K;
        match self {
            StatType::FGA => matches!(kind, K::Made2FG | K::Missed2FG | K::Made3FG | K::Missed3FG),
            StatType::FGM => matches!(kind, K::Made2FG | K::Made3FG),
            StatType::FTA => matches!(kind, K::MadeFT | K::MissedFT),
            StatType::FTM => matches!(kind, K::MadeFT),
            StatType::Made2FG => matches!(kind, K::Made2FG),
            StatType::Made3FG => matches!(kind, K::Made3FG),
            StatType::AST => matches!(kind, K::Assist),
            StatType::TOV => matches!(kind, K::Turnover),
            StatType::OREB => matches!(kind, K::OffensiveRebound),
            StatType::DREB => matches!(kind, K::DefensiveRebound),
            StatType::STL => matches!(kind, K::Steal),
            StatType::BLK => matches!(kind, K::Block),
            StatType::Foul => matches!(kind, K::Foul),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_id: ActionId,
    pub name: String,
    pub points: i32,
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(action_id: ActionId, name: &str, points: i32, kind: ActionKind) -> Self {
        Self {
            action_id,
            name: name.to_string(),
            points,
            kind,
        }
    }
}

/// Session-wide action taxonomy keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: FxHashMap<ActionId, Action>,
}

impl ActionTable {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            actions: actions.into_iter().map(|a| (a.action_id, a)).collect(),
        }
    }

    pub fn get(&self, action_id: ActionId) -> Option<&Action> {
        self.actions.get(&action_id)
    }

    pub fn kind(&self, action_id: ActionId) -> Option<&ActionKind> {
        self.actions.get(&action_id).map(|a| &a.kind)
    }

    /// Point value of an action; unknown ids score nothing.
    pub fn points(&self, action_id: ActionId) -> i32 {
        self.actions.get(&action_id).map_or(0, |a| a.points)
    }

    /// All ids whose kind counts toward `stat`, ascending.
    pub fn ids_of(&self, stat: StatType) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self
            .actions
            .values()
            .filter(|a| stat.includes(&a.kind))
            .map(|a| a.action_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ActionTable {
        ActionTable::new([
            Action::new(1, "made layup", 2, ActionKind::Made2FG),
            Action::new(2, "made three", 3, ActionKind::Made3FG),
            Action::new(3, "missed jumper", 0, ActionKind::Missed2FG),
            Action::new(4, "missed three", 0, ActionKind::Missed3FG),
            Action::new(5, "made free throw", 1, ActionKind::MadeFT),
            Action::new(6, "missed free throw", 0, ActionKind::MissedFT),
            Action::new(7, "made dunk", 2, ActionKind::Made2FG),
        ])
    }

    #[test]
    fn test_kind_parse_round_trip() {
        for name in ["made_2FG", "AST", "OREB", "foul", "enter", "leave"] {
            assert_eq!(ActionKind::parse(name).as_str(), name);
        }
        assert_eq!(
            ActionKind::parse("timeout"),
            ActionKind::Other("timeout".to_string())
        );
    }

    #[test]
    fn test_supertype_ids() {
        let actions = table();
        assert_eq!(actions.ids_of(StatType::FGA), vec![1, 2, 3, 4, 7]);
        assert_eq!(actions.ids_of(StatType::FGM), vec![1, 2, 7]);
        assert_eq!(actions.ids_of(StatType::FTA), vec![5, 6]);
        assert_eq!(actions.ids_of(StatType::FTM), vec![5]);
        assert!(actions.ids_of(StatType::AST).is_empty());
    }

    #[test]
    fn test_points_lookup() {
        let actions = table();
        assert_eq!(actions.points(2), 3);
        assert_eq!(actions.points(99), 0);
    }

    #[test]
    fn test_action_deserializes_type_string() {
        let action: Action =
            serde_json::from_str(r#"{"action_id": 9, "name": "steal", "points": 0, "type": "STL"}"#)
                .unwrap();
        assert_eq!(action.kind, ActionKind::Steal);
    }
}
