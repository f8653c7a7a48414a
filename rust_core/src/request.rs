//! JSON query requests.
//!
//! A request names a school, the games and lineup conditions to look at,
//! and a list of stats. Ids may arrive as numbers or numeric strings.
//! The response is the stats in request order, each as `"%.2f"` or
//! `"Inf."`, or a single `false` if anything about the request is wrong.

use crate::error::RequestError;
use crate::models::{GameId, PlayerId, SchoolId};
use crate::query::{
    AssistRate, DefensiveRating, LineupFilter, OffensiveRating, Question, ReboundKind,
    ReboundRate, Stat, StandardQuery, StatValue, Variant,
};
use crate::registry::StatsRegistry;
use anyhow::Result;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Stat types a request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedStat {
    AssistRate,
    OffensiveReboundRate,
    DefensiveReboundRate,
    OffensiveRating,
    DefensiveRating,
    EffectiveFieldGoalPct,
    TrueShootingPct,
    TurnoverRate,
    AssistTurnoverRatio,
}

impl RequestedStat {
    pub fn parse(name: &str) -> Result<Self, RequestError> {
        Ok(match name {
            "ASTrate" => Self::AssistRate,
            "Orebrate" => Self::OffensiveReboundRate,
            "Drebrate" => Self::DefensiveReboundRate,
            "Ortg" => Self::OffensiveRating,
            "Drtg" => Self::DefensiveRating,
            "EFG" => Self::EffectiveFieldGoalPct,
            "TSperc" => Self::TrueShootingPct,
            "TOrate" => Self::TurnoverRate,
            "ASTTOVratio" => Self::AssistTurnoverRatio,
            other => return Err(RequestError::UnknownStat(other.to_string())),
        })
    }

    /// The stat if it is answered by the shared base query.
    fn base_stat(&self) -> Option<Stat> {
        match self {
            Self::EffectiveFieldGoalPct => Some(Stat::EffectiveFieldGoalPct),
            Self::TrueShootingPct => Some(Stat::TrueShootingPct),
            Self::TurnoverRate => Some(Stat::TurnoverRate),
            Self::AssistTurnoverRatio => Some(Stat::AssistTurnoverRatio),
            _ => None,
        }
    }

    fn variant(&self, players: &FxHashSet<PlayerId>) -> Option<Variant> {
        let players = players.iter().copied();
        match self {
            Self::AssistRate => Some(Variant::AssistRate(AssistRate::new(players))),
            Self::OffensiveReboundRate => Some(Variant::ReboundRate(ReboundRate::new(
                players,
                ReboundKind::Offensive,
            ))),
            Self::DefensiveReboundRate => Some(Variant::ReboundRate(ReboundRate::new(
                players,
                ReboundKind::Defensive,
            ))),
            Self::OffensiveRating => Some(Variant::OffensiveRating(OffensiveRating::new(players))),
            Self::DefensiveRating => Some(Variant::DefensiveRating(DefensiveRating::new(players))),
            _ => None,
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawStat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    school_id: Option<RawId>,
    games: Option<Vec<RawId>>,
    on_court: Option<Vec<RawId>>,
    off_court: Option<Vec<RawId>>,
    making_actions: Option<Vec<RawId>>,
    not_making_actions: Option<Vec<RawId>>,
    stats: Option<Vec<RawStat>>,
}

fn parse_id(field: &'static str, raw: RawId) -> Result<i64, RequestError> {
    match raw {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(|_| RequestError::NotAnId {
            field,
            value: text,
        }),
    }
}

fn parse_ids<C: FromIterator<i64>>(
    field: &'static str,
    raw: Option<Vec<RawId>>,
) -> Result<C, RequestError> {
    raw.ok_or(RequestError::MissingField(field))?
        .into_iter()
        .map(|id| parse_id(field, id))
        .collect()
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub school_id: SchoolId,
    pub games: BTreeSet<GameId>,
    pub on_court: FxHashSet<PlayerId>,
    pub off_court: FxHashSet<PlayerId>,
    /// Players whose actions are counted; also the subject of rate stats.
    pub making_actions: FxHashSet<PlayerId>,
    pub not_making_actions: FxHashSet<PlayerId>,
    pub stats: Vec<RequestedStat>,
}

/// Where one requested stat's value lives in the answered batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    question: usize,
    value: usize,
}

impl QueryRequest {
    pub fn parse(json: &str) -> Result<Self, RequestError> {
        let raw: RawRequest =
            serde_json::from_str(json).map_err(|e| RequestError::InvalidJson(e.to_string()))?;

        let school_id = parse_id(
            "school_id",
            raw.school_id.ok_or(RequestError::MissingField("school_id"))?,
        )?;
        let stats = raw
            .stats
            .ok_or(RequestError::MissingField("stats"))?
            .iter()
            .map(|s| RequestedStat::parse(&s.kind))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            school_id,
            games: parse_ids("games", raw.games)?,
            on_court: parse_ids("on_court", raw.on_court)?,
            off_court: parse_ids("off_court", raw.off_court)?,
            making_actions: parse_ids("making_actions", raw.making_actions)?,
            not_making_actions: parse_ids("not_making_actions", raw.not_making_actions)?,
            stats,
        })
    }

    fn filter(&self) -> LineupFilter {
        LineupFilter::for_games(self.games.iter().copied())
            .with_on_court(self.on_court.iter().copied())
            .with_not_on_court(self.off_court.iter().copied())
    }

    /// One base query carrying every base stat, then one query per rate
    /// or rating stat.
    fn questions(&self) -> (Vec<Question>, Vec<Slot>) {
        let mut base = StandardQuery {
            who_made_action: self.making_actions.clone(),
            not_made_action: self.not_making_actions.clone(),
            ..Default::default()
        };
        let mut variants = Vec::new();
        let mut slots = Vec::with_capacity(self.stats.len());

        for stat in &self.stats {
            if let Some(base_stat) = stat.base_stat() {
                slots.push(Slot {
                    question: 0,
                    value: base.stats.len(),
                });
                base.stats.push(base_stat);
            } else if let Some(variant) = stat.variant(&self.making_actions) {
                variants.push(variant);
                slots.push(Slot {
                    question: variants.len(),
                    value: 0,
                });
            }
        }

        let questions = std::iter::once(Variant::Standard(base))
            .chain(variants)
            .map(|variant| Question::new(self.filter(), variant))
            .collect();
        (questions, slots)
    }
}

// ============================================================================
// Answering
// ============================================================================

/// Either the ordered answers or the failure marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Answers(Vec<String>),
    Failed,
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Response::Answers(answers) => answers.serialize(serializer),
            Response::Failed => serializer.serialize_bool(false),
        }
    }
}

/// Load the school's games and answer every requested stat in order.
pub async fn answer_request(
    registry: &mut StatsRegistry,
    request: &QueryRequest,
) -> Result<Vec<String>> {
    registry.add_games_from_school(request.school_id).await?;

    let (mut questions, slots) = request.questions();
    let results = registry.answer(&mut questions).await?;

    Ok(slots
        .iter()
        .map(|slot| {
            results[slot.question]
                .values
                .get(slot.value)
                .and_then(StatValue::display)
                .unwrap_or_else(|| "None".to_string())
        })
        .collect())
}

/// Parse and answer a raw request, collapsing any failure to `false`.
pub async fn handle_request(registry: &mut StatsRegistry, json: &str) -> Response {
    let request = match QueryRequest::parse(json) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected request: {}", e);
            return Response::Failed;
        }
    };

    match answer_request(registry, &request).await {
        Ok(answers) => {
            info!(
                "Answered {} stats for school {}",
                answers.len(),
                request.school_id
            );
            Response::Answers(answers)
        }
        Err(e) => {
            warn!("Failed to answer request: {:#}", e);
            Response::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"{
        "school_id": "1",
        "games": ["50", 51],
        "on_court": [],
        "off_court": ["106"],
        "making_actions": ["101"],
        "not_making_actions": [],
        "stats": [{"type": "Ortg"}, {"type": "EFG"}, {"type": "ASTrate"}, {"type": "TOrate"}]
    }"#;

    #[test]
    fn test_parse_mixed_ids() {
        let request = QueryRequest::parse(REQUEST).unwrap();
        assert_eq!(request.school_id, 1);
        assert_eq!(request.games, BTreeSet::from([50, 51]));
        assert!(request.off_court.contains(&106));
        assert_eq!(
            request.stats,
            vec![
                RequestedStat::OffensiveRating,
                RequestedStat::EffectiveFieldGoalPct,
                RequestedStat::AssistRate,
                RequestedStat::TurnoverRate,
            ]
        );
    }

    #[test]
    fn test_questions_keep_request_order() {
        let request = QueryRequest::parse(REQUEST).unwrap();
        let (questions, slots) = request.questions();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].name(), "standard");
        assert_eq!(questions[1].name(), "offensive rating");
        assert_eq!(questions[2].name(), "assist rate");
        assert_eq!(
            slots,
            vec![
                Slot { question: 1, value: 0 },
                Slot { question: 0, value: 0 },
                Slot { question: 2, value: 0 },
                Slot { question: 0, value: 1 },
            ]
        );
    }

    #[test]
    fn test_rejects_bad_requests() {
        assert_eq!(
            QueryRequest::parse(r#"{"games": []}"#),
            Err(RequestError::MissingField("school_id"))
        );
        assert!(matches!(
            QueryRequest::parse("not json"),
            Err(RequestError::InvalidJson(_))
        ));

        let bad_id = REQUEST.replace(r#"["101"]"#, r#"["abc"]"#);
        assert_eq!(
            QueryRequest::parse(&bad_id),
            Err(RequestError::NotAnId {
                field: "making_actions",
                value: "abc".to_string()
            })
        );

        let bad_stat = REQUEST.replace("TOrate", "PER");
        assert_eq!(
            QueryRequest::parse(&bad_stat),
            Err(RequestError::UnknownStat("PER".to_string()))
        );

        let missing = REQUEST.replace(r#""on_court": [],"#, "");
        assert_eq!(
            QueryRequest::parse(&missing),
            Err(RequestError::MissingField("on_court"))
        );
    }

    #[test]
    fn test_response_encoding() {
        let answers = Response::Answers(vec!["60.00".to_string(), "Inf.".to_string()]);
        assert_eq!(serde_json::to_string(&answers).unwrap(), r#"["60.00","Inf."]"#);
        assert_eq!(serde_json::to_string(&Response::Failed).unwrap(), "false");
    }
}
