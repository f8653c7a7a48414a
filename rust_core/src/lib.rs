//! StatDunk Core - Lineup-aware basketball play-by-play analytics.
//!
//! This module provides:
//! - Lineup reconstruction for plays whose on-court players were not logged
//! - Minutes accounting from lineup-conditioned play timelines
//! - Conditional stat queries (totals, per game, per minute, shooting and
//!   turnover percentages)
//! - Assist rate, rebound rate, and offensive/defensive ratings
//! - A session registry that loads games from a pluggable store and answers
//!   batches of queries in one pass
//! - JSON request parsing with ordered string answers

pub mod error;
pub mod game;
pub mod lineup;
pub mod models;
pub mod query;
pub mod registry;
pub mod request;
pub mod storage;
pub mod timeline;

pub use error::{RequestError, StatsError};
pub use game::Game;
pub use models::{Action, ActionKind, ActionTable, Lineup, Matchup, Play, Player, Roster, StatType};
pub use query::{LineupFilter, QueryResults, Question, Stat, StandardQuery, StatValue, Variant};
pub use registry::StatsRegistry;
pub use request::{handle_request, QueryRequest, Response};
pub use storage::{MemoryStore, PgStatsStore, PoolConfig, StatsStore};
