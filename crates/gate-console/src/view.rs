use timing_protocol::{PenaltyValue, ResultStatus};

use crate::commands::CommandQueue;
use crate::state::RaceSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CellSource {
    Confirmed,
    Pending,
    Preview,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CellView {
    pub(crate) value: Option<PenaltyValue>,
    pub(crate) source: CellSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GridRow {
    pub(crate) bib: String,
    pub(crate) name: String,
    pub(crate) rank: Option<u32>,
    pub(crate) time: Option<String>,
    pub(crate) status: Option<ResultStatus>,
    pub(crate) on_course: bool,
}

/// Competitors shown for a race: result rows in feed order, then anyone still
/// on course who has no result row yet.
pub(crate) fn grid_rows(snapshot: &RaceSnapshot, race_id: &str) -> Vec<GridRow> {
    let results = snapshot.results(race_id);
    let on_course: Vec<_> = snapshot.on_course(race_id).collect();
    let mut rows: Vec<GridRow> = results
        .iter()
        .map(|row| GridRow {
            bib: row.bib.clone(),
            name: row.name.clone(),
            rank: row.rank,
            time: row.time.clone(),
            status: row.status,
            on_course: on_course.iter().any(|competitor| competitor.bib == row.bib),
        })
        .collect();
    rows.extend(
        on_course
            .iter()
            .filter(|competitor| results.iter().all(|row| row.bib != competitor.bib))
            .map(|competitor| GridRow {
                bib: competitor.bib.clone(),
                name: competitor.name.clone(),
                rank: None,
                time: None,
                status: None,
                on_course: true,
            }),
    );
    rows
}

/// What a gate cell shows.
///
/// A staged preview on the focused cell wins, then an unresolved command for
/// that gate, then the confirmed feed value. Pushes that arrive while a command
/// is unresolved do not replace the operator's value; once it resolves the
/// feed is authoritative again.
pub(crate) fn gate_cell(
    snapshot: &RaceSnapshot,
    queue: &CommandQueue,
    race_id: &str,
    bib: &str,
    gate: u32,
    preview: Option<PenaltyValue>,
) -> CellView {
    if preview.is_some() {
        return CellView {
            value: preview,
            source: CellSource::Preview,
        };
    }
    if let Some(value) = queue.desired_penalty(bib, gate) {
        return CellView {
            value,
            source: CellSource::Pending,
        };
    }
    CellView {
        value: snapshot
            .gate_penalty(race_id, bib, gate)
            .and_then(|penalty| penalty.value),
        source: CellSource::Confirmed,
    }
}
