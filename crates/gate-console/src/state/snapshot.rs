use std::collections::BTreeMap;

use timing_protocol::gates::{gate_penalties, parse_gate_kinds};
use timing_protocol::{
    GateKind, GatePenalty, OnCourseCompetitor, RaceConfig, RaceSummary, ResultRow, ServerInfo,
};

/// Server-confirmed view of the feed. Only `RaceStateStore` writes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RaceSnapshot {
    pub(crate) server_info: Option<ServerInfo>,
    pub(crate) schedule: Vec<RaceSummary>,
    pub(crate) results_by_race: BTreeMap<String, Vec<ResultRow>>,
    pub(crate) on_course_by_race: BTreeMap<String, Vec<OnCourseCompetitor>>,
    pub(crate) configs: BTreeMap<String, RaceConfig>,
    pub(crate) last_server_error: Option<String>,
    pub(crate) refresh_epoch: u64,
}

impl RaceSnapshot {
    pub(crate) fn race_config(&self, race_id: &str) -> Option<&RaceConfig> {
        self.configs.get(race_id)
    }

    pub(crate) fn results(&self, race_id: &str) -> &[ResultRow] {
        self.results_by_race
            .get(race_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn on_course(&self, race_id: &str) -> impl Iterator<Item = &OnCourseCompetitor> {
        self.on_course_by_race
            .get(race_id)
            .into_iter()
            .flatten()
            .filter(|competitor| competitor.is_on_course())
    }

    pub(crate) fn running_race(&self) -> Option<&RaceSummary> {
        self.schedule
            .iter()
            .find(|race| race.status == timing_protocol::RaceStatus::Running)
    }

    pub(crate) fn active_races(&self) -> impl Iterator<Item = &RaceSummary> {
        self.schedule.iter().filter(|race| race.status.is_active())
    }

    pub(crate) fn gate_kinds(&self, race_id: &str) -> Vec<GateKind> {
        self.race_config(race_id)
            .map(|config| parse_gate_kinds(&config.gate_type_string))
            .unwrap_or_default()
    }

    pub(crate) fn gate_count(&self, race_id: &str) -> u32 {
        self.race_config(race_id)
            .map(|config| config.gate_count)
            .unwrap_or(0)
    }

    /// Confirmed penalties for one competitor, one entry per configured gate.
    ///
    /// Result rows are authoritative; a competitor still on course without a
    /// result row falls back to the live on-course judgements.
    pub(crate) fn gate_penalties(&self, race_id: &str, bib: &str) -> Vec<GatePenalty> {
        let gate_count = self.gate_count(race_id);
        let kinds = self.gate_kinds(race_id);
        let values = self
            .results(race_id)
            .iter()
            .find(|row| row.bib == bib)
            .map(ResultRow::gate_values)
            .or_else(|| {
                self.on_course_by_race
                    .get(race_id)
                    .and_then(|list| list.iter().find(|competitor| competitor.bib == bib))
                    .map(OnCourseCompetitor::gate_values)
            })
            .unwrap_or_default();
        gate_penalties(&values, &kinds, gate_count)
    }

    pub(crate) fn gate_penalty(&self, race_id: &str, bib: &str, gate: u32) -> Option<GatePenalty> {
        if gate == 0 {
            return None;
        }
        self.gate_penalties(race_id, bib)
            .get(gate as usize - 1)
            .copied()
    }
}
