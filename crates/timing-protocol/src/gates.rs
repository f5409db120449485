use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyValue {
    Clear,
    Touch,
    Miss,
}

impl PenaltyValue {
    pub fn seconds(self) -> u32 {
        match self {
            PenaltyValue::Clear => 0,
            PenaltyValue::Touch => 2,
            PenaltyValue::Miss => 50,
        }
    }

    pub fn from_seconds(seconds: u32) -> Option<Self> {
        match seconds {
            0 => Some(PenaltyValue::Clear),
            2 => Some(PenaltyValue::Touch),
            50 => Some(PenaltyValue::Miss),
            _ => None,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        token
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_seconds)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GateKind {
    Normal,
    Reverse,
}

impl GateKind {
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'N' => Some(GateKind::Normal),
            'R' => Some(GateKind::Reverse),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            GateKind::Normal => 'N',
            GateKind::Reverse => 'R',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePenalty {
    /// 1-based gate number.
    pub gate: u32,
    pub value: Option<PenaltyValue>,
    pub kind: GateKind,
}

/// Result rows separate gates with single spaces; an empty token keeps its slot.
pub fn parse_result_gates(raw: &str) -> Vec<Option<PenaltyValue>> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(' ').map(PenaltyValue::from_token).collect()
}

pub fn parse_on_course_gates(raw: &str) -> Vec<Option<PenaltyValue>> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(PenaltyValue::from_token).collect()
}

/// Unrecognised codes fall back to normal gates so numbering stays aligned.
pub fn parse_gate_kinds(raw: &str) -> Vec<GateKind> {
    raw.trim()
        .chars()
        .map(|code| GateKind::from_code(code).unwrap_or(GateKind::Normal))
        .collect()
}

pub fn gate_penalties(
    values: &[Option<PenaltyValue>],
    kinds: &[GateKind],
    gate_count: u32,
) -> Vec<GatePenalty> {
    (0..gate_count as usize)
        .map(|index| GatePenalty {
            gate: index as u32 + 1,
            value: values.get(index).copied().flatten(),
            kind: kinds.get(index).copied().unwrap_or(GateKind::Normal),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_separated_result_gates() {
        assert_eq!(
            parse_result_gates("0 0 2"),
            vec![
                Some(PenaltyValue::Clear),
                Some(PenaltyValue::Clear),
                Some(PenaltyValue::Touch)
            ]
        );
        assert_eq!(
            parse_result_gates("50  2"),
            vec![Some(PenaltyValue::Miss), None, Some(PenaltyValue::Touch)]
        );
        assert!(parse_result_gates("   ").is_empty());
    }

    #[test]
    fn parses_comma_separated_on_course_gates() {
        assert_eq!(
            parse_on_course_gates("0,,50,"),
            vec![Some(PenaltyValue::Clear), None, Some(PenaltyValue::Miss), None]
        );
    }

    #[test]
    fn unknown_tokens_read_as_unset() {
        assert_eq!(parse_result_gates("3 x"), vec![None, None]);
    }

    #[test]
    fn pads_missing_gates_and_kinds() {
        let values = parse_result_gates("0 0 2");
        let kinds = parse_gate_kinds("NNR");
        let gates = gate_penalties(&values, &kinds, 4);
        assert_eq!(gates.len(), 4);
        assert_eq!(
            gates[2],
            GatePenalty {
                gate: 3,
                value: Some(PenaltyValue::Touch),
                kind: GateKind::Reverse
            }
        );
        assert_eq!(gates[3].value, None);
        assert_eq!(gates[3].kind, GateKind::Normal);
    }

    #[test]
    fn penalty_seconds_are_stable() {
        for value in [PenaltyValue::Clear, PenaltyValue::Touch, PenaltyValue::Miss] {
            assert_eq!(PenaltyValue::from_seconds(value.seconds()), Some(value));
        }
        assert_eq!(PenaltyValue::from_seconds(5), None);
    }
}
