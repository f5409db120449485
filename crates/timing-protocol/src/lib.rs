use serde::{Deserialize, Serialize};

pub mod command;
pub mod gates;
pub mod stream;

pub use gates::{GateKind, GatePenalty, PenaltyValue};
pub use stream::{ProtocolError, StreamMessage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub protocol_version: u32,
    #[serde(default)]
    pub upstream_timing_connected: bool,
    #[serde(default)]
    pub upstream_host: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaceStatus {
    Scheduled,
    StartList,
    Running,
    Unofficial,
    Official,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RaceStatus {
    /// Races an operator may still be correcting.
    pub fn is_active(self) -> bool {
        matches!(self, RaceStatus::Running | RaceStatus::Unofficial)
    }

    pub fn label(self) -> &'static str {
        match self {
            RaceStatus::Scheduled => "scheduled",
            RaceStatus::StartList => "start list",
            RaceStatus::Running => "running",
            RaceStatus::Unofficial => "unofficial",
            RaceStatus::Official => "official",
            RaceStatus::Cancelled => "cancelled",
            RaceStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaceSummary {
    pub race_id: String,
    pub order: u32,
    pub main_title: String,
    #[serde(default)]
    pub sub_title: Option<String>,
    pub status: RaceStatus,
    #[serde(default)]
    pub on_course_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub races: Vec<RaceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaceConfig {
    pub race_id: String,
    pub gate_count: u32,
    /// One `N` (normal) or `R` (reverse) per gate, gate 1 first.
    #[serde(default)]
    pub gate_type_string: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Dns,
    Dnf,
    Dsq,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub bib: String,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_order: u32,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub penalty_total: Option<u32>,
    /// Space separated, one token per gate; an empty token is an unjudged gate.
    #[serde(default)]
    pub gates_string: String,
    #[serde(default)]
    pub status: Option<ResultStatus>,
}

impl ResultRow {
    pub fn gate_values(&self) -> Vec<Option<PenaltyValue>> {
        gates::parse_result_gates(&self.gates_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaceResults {
    pub race_id: String,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnCourseCompetitor {
    pub bib: String,
    #[serde(default)]
    pub name: String,
    /// 1 is the competitor closest to the finish.
    pub position: u32,
    #[serde(default)]
    pub dt_start: Option<String>,
    #[serde(default)]
    pub dt_finish: Option<String>,
    /// Comma separated, empty entries are unjudged gates.
    #[serde(default)]
    pub gates_string: String,
}

impl OnCourseCompetitor {
    /// A competitor without a finish timestamp is still on course.
    pub fn is_on_course(&self) -> bool {
        self.dt_finish
            .as_deref()
            .map(|value| value.trim().is_empty())
            .unwrap_or(true)
    }

    pub fn is_finished(&self) -> bool {
        !self.is_on_course()
    }

    pub fn gate_values(&self) -> Vec<Option<PenaltyValue>> {
        gates::parse_on_course_gates(&self.gates_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnCourse {
    pub race_id: String,
    pub competitors: Vec<OnCourseCompetitor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForceRefresh {
    #[serde(default)]
    pub reason: Option<String>,
}
