use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ForceRefresh, OnCourse, RaceConfig, RaceResults, Schedule, ServerError, ServerInfo,
};

/// Server push messages. On the wire each is `{"type": <tag>, "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum StreamMessage {
    ServerInfo(ServerInfo),
    Schedule(Schedule),
    RaceConfig(RaceConfig),
    OnCourse(OnCourse),
    Results(RaceResults),
    Error(ServerError),
    ForceRefresh(ForceRefresh),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message is not valid json: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("message has no type tag")]
    MissingType,
    #[error("unknown message type {0}")]
    UnknownType(String),
    #[error("invalid {tag} payload: {source}")]
    InvalidPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StreamMessage {
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw).map_err(ProtocolError::Malformed)?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?
            .to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        let invalid = |source: serde_json::Error| ProtocolError::InvalidPayload {
            tag: tag.clone(),
            source,
        };
        let message = match tag.as_str() {
            "ServerInfo" => StreamMessage::ServerInfo(serde_json::from_value(data).map_err(invalid)?),
            "Schedule" => StreamMessage::Schedule(serde_json::from_value(data).map_err(invalid)?),
            "RaceConfig" => StreamMessage::RaceConfig(serde_json::from_value(data).map_err(invalid)?),
            "OnCourse" => StreamMessage::OnCourse(serde_json::from_value(data).map_err(invalid)?),
            "Results" => StreamMessage::Results(serde_json::from_value(data).map_err(invalid)?),
            "Error" => StreamMessage::Error(serde_json::from_value(data).map_err(invalid)?),
            "ForceRefresh" => {
                if data.is_null() {
                    StreamMessage::ForceRefresh(ForceRefresh::default())
                } else {
                    StreamMessage::ForceRefresh(serde_json::from_value(data).map_err(invalid)?)
                }
            }
            _ => return Err(ProtocolError::UnknownType(tag.clone())),
        };
        Ok(message)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::ServerInfo(_) => "ServerInfo",
            StreamMessage::Schedule(_) => "Schedule",
            StreamMessage::RaceConfig(_) => "RaceConfig",
            StreamMessage::OnCourse(_) => "OnCourse",
            StreamMessage::Results(_) => "Results",
            StreamMessage::Error(_) => "Error",
            StreamMessage::ForceRefresh(_) => "ForceRefresh",
        }
    }

    /// The race a per-race message refers to.
    pub fn race_id(&self) -> Option<&str> {
        match self {
            StreamMessage::RaceConfig(config) => Some(&config.race_id),
            StreamMessage::OnCourse(on_course) => Some(&on_course.race_id),
            StreamMessage::Results(results) => Some(&results.race_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RaceStatus;

    #[test]
    fn classifies_tagged_messages() {
        let message = StreamMessage::from_json(
            r#"{"type":"ServerInfo","data":{"protocolVersion":2,"upstreamTimingConnected":true,"upstreamHost":"192.168.1.20:27333"}}"#,
        )
        .expect("parse");
        assert_eq!(
            message,
            StreamMessage::ServerInfo(ServerInfo {
                protocol_version: 2,
                upstream_timing_connected: true,
                upstream_host: Some("192.168.1.20:27333".to_string()),
            })
        );

        let message = StreamMessage::from_json(
            r#"{"type":"Schedule","data":{"races":[{"raceId":"K1M-1","order":1,"mainTitle":"K1 Men","status":"running","onCourseCount":2}]}}"#,
        )
        .expect("parse");
        let StreamMessage::Schedule(schedule) = message else {
            panic!("expected schedule");
        };
        assert_eq!(schedule.races[0].status, RaceStatus::Running);
    }

    #[test]
    fn force_refresh_needs_no_payload() {
        let message = StreamMessage::from_json(r#"{"type":"ForceRefresh"}"#).expect("parse");
        assert_eq!(message, StreamMessage::ForceRefresh(ForceRefresh::default()));
    }

    #[test]
    fn rejects_unknown_and_malformed_messages() {
        assert!(matches!(
            StreamMessage::from_json(r#"{"type":"Heartbeat","data":{}}"#),
            Err(ProtocolError::UnknownType(tag)) if tag == "Heartbeat"
        ));
        assert!(matches!(
            StreamMessage::from_json("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            StreamMessage::from_json(r#"{"data":{}}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            StreamMessage::from_json(r#"{"type":"Results","data":{"rows":[]}}"#),
            Err(ProtocolError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn encodes_with_type_and_data() {
        let message = StreamMessage::RaceConfig(RaceConfig {
            race_id: "K1M-1".to_string(),
            gate_count: 3,
            gate_type_string: "NNR".to_string(),
        });
        let json = message.to_json().expect("encode");
        assert_eq!(StreamMessage::from_json(&json).expect("parse"), message);
        assert_eq!(message.race_id(), Some("K1M-1"));
    }
}
