//! On-court time accounting.
//!
//! A query only sees discrete plays, each either matching its lineup
//! condition or not. Runs of plays with the same answer form spans along
//! the section clock (which counts down). Minutes are the length of the
//! matching spans plus a share of the gaps around them, since the real
//! substitution happened somewhere between two recorded plays:
//! - a gap next to a degenerate span (one sample, `start == end`) goes
//!   entirely to the neighbour;
//! - any other gap is split in half;
//! - the last span of a section also gets the clock left after its final
//!   play, because nothing records the clock reaching zero.

use crate::models::GameId;
use std::collections::BTreeMap;

/// Section clock at tip-off of a half.
pub const HALF_SECONDS: u32 = 1200;
/// Section clock at the start of an overtime period.
pub const OVERTIME_SECONDS: u32 = 300;

/// Clock value a section starts from.
pub fn section_start(section: u8) -> u32 {
    if section <= 2 {
        HALF_SECONDS
    } else {
        OVERTIME_SECONDS
    }
}

/// A maximal run of plays sharing one condition flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub matched: bool,
    pub start: u32,
    pub end: u32,
}

impl Span {
    fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// Spans per (game, section) for one query.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    sections: BTreeMap<(GameId, u8), Vec<Span>>,
    minutes: Option<f64>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one play's condition flag at clock `time`.
    pub fn record(&mut self, game_id: GameId, section: u8, time: u32, matched: bool) {
        self.minutes = None;
        let spans = self.sections.entry((game_id, section)).or_default();
        match spans.last_mut() {
            Some(last) if last.matched == matched => last.end = time,
            Some(_) => spans.push(Span {
                matched,
                start: time,
                end: time,
            }),
            None => spans.push(Span {
                matched,
                start: section_start(section),
                end: time,
            }),
        }
    }

    pub fn spans(&self, game_id: GameId, section: u8) -> &[Span] {
        self.sections
            .get(&(game_id, section))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Minutes the condition held, memoized until the next `record`.
    pub fn minutes(&mut self) -> f64 {
        if let Some(minutes) = self.minutes {
            return minutes;
        }
        let minutes = self.seconds() / 60.0;
        self.minutes = Some(minutes);
        minutes
    }

    /// Seconds the condition held, with boundary compensation.
    pub fn seconds(&self) -> f64 {
        self.sections
            .values()
            .map(|spans| {
                (0..spans.len())
                    .filter(|&i| spans[i].matched)
                    .map(|i| {
                        let span = spans[i];
                        (span.start as f64 - span.end as f64)
                            + compensate_left(spans, i)
                            + compensate_right(spans, i)
                    })
                    .sum::<f64>()
            })
            .sum()
    }
}

/// Extra time owed to `spans[i]` from the gap before it.
fn compensate_left(spans: &[Span], i: usize) -> f64 {
    if i == 0 {
        return 0.0;
    }
    let prev = spans[i - 1];
    let gap = prev.end as f64 - spans[i].start as f64;
    if prev.is_degenerate() {
        gap
    } else {
        gap / 2.0
    }
}

/// Extra time owed to `spans[i]` from the gap after it.
fn compensate_right(spans: &[Span], i: usize) -> f64 {
    let Some(next) = spans.get(i + 1) else {
        return spans[i].end as f64;
    };
    let gap = spans[i].end as f64 - next.start as f64;
    if next.is_degenerate() {
        gap
    } else {
        gap / 2.0
    }
}
