use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage of a lead. Declaration order is board order, left to right.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    InspectionScheduled,
    QuoteSent,
    Won,
    Lost,
}

impl LeadStatus {
    /// Every status in board order.
    pub const ALL: [LeadStatus; 6] = [
        Self::New,
        Self::Contacted,
        Self::InspectionScheduled,
        Self::QuoteSent,
        Self::Won,
        Self::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Contacted => "CONTACTED",
            Self::InspectionScheduled => "INSPECTION_SCHEDULED",
            Self::QuoteSent => "QUOTE_SENT",
            Self::Won => "WON",
            Self::Lost => "LOST",
        }
    }

    /// Zero-based column index on the board.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "CONTACTED" => Ok(Self::Contacted),
            "INSPECTION_SCHEDULED" => Ok(Self::InspectionScheduled),
            "QUOTE_SENT" => Ok(Self::QuoteSent),
            "WON" => Ok(Self::Won),
            "LOST" => Ok(Self::Lost),
            _ => Err(format!("Invalid lead status: {}", s)),
        }
    }
}

/// Opaque lead identifier as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A lead as the backend reports it.
///
/// `status` stays a free string so that values this client does not know
/// can be rejected during grouping instead of failing the whole fetch.
/// `position` may be sparse, duplicated or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLeadRecord {
    pub id: LeadId,
    pub status: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated lead held in a board column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: LeadId,
    pub status: LeadStatus,
    /// Zero-based rank within `status`.
    pub position: usize,
    pub created_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Validate a wire record. The position is carried over clamped at zero;
    /// callers re-number columns after grouping.
    pub fn from_raw(raw: &RawLeadRecord) -> Result<Self, String> {
        let status = LeadStatus::from_str(&raw.status)?;
        Ok(Self {
            id: raw.id.clone(),
            status,
            position: usize::try_from(raw.position).unwrap_or(0),
            created_at: raw.created_at,
        })
    }

    pub fn to_raw(&self) -> RawLeadRecord {
        RawLeadRecord {
            id: self.id.clone(),
            status: self.status.as_str().to_string(),
            position: self.position as i64,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_status_roundtrip() {
        for s in &[
            "NEW",
            "CONTACTED",
            "INSPECTION_SCHEDULED",
            "QUOTE_SENT",
            "WON",
            "LOST",
        ] {
            let parsed: LeadStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!("new".parse::<LeadStatus>().is_err());
        assert!("ARCHIVED".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_lead_status_index_follows_board_order() {
        for (i, status) in LeadStatus::ALL.iter().enumerate() {
            assert_eq!(status.index(), i);
        }
        assert!(LeadStatus::New < LeadStatus::Lost);
    }

    #[test]
    fn test_lead_status_serde_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::InspectionScheduled).unwrap(),
            "\"INSPECTION_SCHEDULED\""
        );
        assert_eq!(
            serde_json::from_str::<LeadStatus>("\"QUOTE_SENT\"").unwrap(),
            LeadStatus::QuoteSent
        );
    }

    #[test]
    fn test_lead_id_is_transparent_in_json() {
        let id = LeadId::new("lead-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lead-7\"");
        assert_eq!(id.to_string(), "lead-7");
    }

    #[test]
    fn test_raw_record_deserializes_unknown_status() {
        let raw: RawLeadRecord = serde_json::from_str(
            r#"{"id":"lead-1","status":"ARCHIVED","position":3,"created_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(raw.status, "ARCHIVED");
        assert!(LeadRecord::from_raw(&raw).is_err());
    }

    #[test]
    fn test_from_raw_clamps_negative_position() {
        let raw = RawLeadRecord {
            id: LeadId::from("lead-1"),
            status: "WON".to_string(),
            position: -4,
            created_at: Utc::now(),
        };
        let record = LeadRecord::from_raw(&raw).unwrap();
        assert_eq!(record.status, LeadStatus::Won);
        assert_eq!(record.position, 0);
        assert_eq!(record.to_raw().status, "WON");
    }
}
