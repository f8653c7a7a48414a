//! Domain error types.
//!
//! Storage and registry operations return `anyhow::Result`; these enums are
//! the typed failures that flow through them and through the request
//! boundary.

use crate::models::{ActionId, GameId, PlayId, PlayerId, SchoolId};
use thiserror::Error;

/// Failures while loading games or preparing queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("game {0} is not loaded")]
    UnknownGame(GameId),

    #[error("player {0} is not in any loaded roster")]
    UnknownPlayer(PlayerId),

    #[error("action {0} is not in the action taxonomy")]
    UnknownAction(ActionId),

    #[error("play {play_id}: actor's school {school_id} is neither team in game {game_id}")]
    ActorNotInGame {
        game_id: GameId,
        play_id: PlayId,
        school_id: SchoolId,
    },

    #[error("{0} query needs at least one requested player")]
    NoRequestedPlayers(&'static str),
}

/// Failures while parsing a query request. Any of these turns the whole
/// response into the failure marker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("request is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("request is missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` holds a non-numeric id: {value}")]
    NotAnId { field: &'static str, value: String },

    #[error("unexpected stat type `{0}`")]
    UnknownStat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StatsError::ActorNotInGame {
            game_id: 7,
            play_id: 12,
            school_id: 99,
        };
        assert_eq!(
            err.to_string(),
            "play 12: actor's school 99 is neither team in game 7"
        );

        let err = RequestError::NotAnId {
            field: "games",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "field `games` holds a non-numeric id: abc");
    }
}
