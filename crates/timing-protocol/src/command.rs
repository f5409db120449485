use serde::{Deserialize, Serialize};

use crate::PenaltyValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemovalReason {
    Dns,
    Dnf,
    Cap,
}

impl RemovalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RemovalReason::Dns => "DNS",
            RemovalReason::Dnf => "DNF",
            RemovalReason::Cap => "CAP",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimingChannel {
    Start,
    Finish,
    Split1,
    Split2,
}

impl TimingChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            TimingChannel::Start => "Start",
            TimingChannel::Finish => "Finish",
            TimingChannel::Split1 => "Split1",
            TimingChannel::Split2 => "Split2",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRequest {
    pub bib: String,
    pub gate: u32,
    /// Penalty seconds; `None` removes the judgement.
    pub value: Option<u32>,
}

impl ScoringRequest {
    pub fn new(bib: impl Into<String>, gate: u32, value: Option<PenaltyValue>) -> Self {
        Self {
            bib: bib.into(),
            gate,
            value: value.map(PenaltyValue::seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveFromCourseRequest {
    pub bib: String,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingRequest {
    pub bib: String,
    pub channel: TimingChannel,
}

/// Body of a correction POST. Serialized without a tag; the path names the kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandRequest {
    Scoring(ScoringRequest),
    RemoveFromCourse(RemoveFromCourseRequest),
    Timing(TimingRequest),
}

impl CommandRequest {
    pub fn path(&self) -> &'static str {
        match self {
            CommandRequest::Scoring(_) => "/api/scoring",
            CommandRequest::RemoveFromCourse(_) => "/api/remove-from-course",
            CommandRequest::Timing(_) => "/api/timing",
        }
    }

    pub fn bib(&self) -> &str {
        match self {
            CommandRequest::Scoring(request) => &request.bib,
            CommandRequest::RemoveFromCourse(request) => &request.bib,
            CommandRequest::Timing(request) => &request.bib,
        }
    }
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandReply {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scoring_request_encodes_clear_as_null() {
        let request = CommandRequest::Scoring(ScoringRequest::new("42", 3, None));
        assert_eq!(
            serde_json::to_value(&request).expect("encode"),
            json!({"bib": "42", "gate": 3, "value": null})
        );
        assert_eq!(request.path(), "/api/scoring");

        let request = CommandRequest::Scoring(ScoringRequest::new("42", 3, Some(PenaltyValue::Miss)));
        assert_eq!(
            serde_json::to_value(&request).expect("encode")["value"],
            json!(50)
        );
    }

    #[test]
    fn removal_and_timing_use_wire_names() {
        let removal = CommandRequest::RemoveFromCourse(RemoveFromCourseRequest {
            bib: "7".to_string(),
            reason: RemovalReason::Dnf,
        });
        assert_eq!(
            serde_json::to_value(&removal).expect("encode"),
            json!({"bib": "7", "reason": "DNF"})
        );
        let timing = CommandRequest::Timing(TimingRequest {
            bib: "7".to_string(),
            channel: TimingChannel::Split1,
        });
        assert_eq!(
            serde_json::to_value(&timing).expect("encode"),
            json!({"bib": "7", "channel": "Split1"})
        );
        assert_eq!(timing.bib(), "7");
    }

    #[test]
    fn reply_defaults_to_success() {
        let reply: CommandReply = serde_json::from_str("{}").expect("decode");
        assert_eq!(reply, CommandReply::ok());
        let reply: CommandReply =
            serde_json::from_str(r#"{"success":false,"error":"unknown bib"}"#).expect("decode");
        assert_eq!(reply, CommandReply::failed("unknown bib"));
    }
}
