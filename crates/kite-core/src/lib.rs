pub mod columns;
pub mod config;
pub mod filter;
pub mod source;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub incident_id: String,
    pub alert_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity: String,
    /// Alert body fields in the order the service reported them.
    #[serde(default)]
    pub details: Vec<(String, String)>,
}

impl Alert {
    /// Login context for the cluster this alert fired on, if the alert carries one.
    pub fn cluster_target(&self) -> Option<ClusterTarget> {
        if self.cluster_id.trim().is_empty() {
            return None;
        }
        Some(ClusterTarget {
            cluster_id: self.cluster_id.clone(),
            cluster_name: self.cluster_name.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub severity: String,
    pub status: IncidentStatus,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Triggered => "triggered",
            IncidentStatus::Acknowledged => "acknowledged",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "triggered" => Ok(IncidentStatus::Triggered),
            "acknowledged" | "ack" => Ok(IncidentStatus::Acknowledged),
            "resolved" => Ok(IncidentStatus::Resolved),
            other => Err(format!("Unknown incident status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    High,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "high" => Ok(Urgency::High),
            "low" => Ok(Urgency::Low),
            other => Err(format!("Unknown urgency: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OncallEntry {
    pub escalation_policy: String,
    pub level: u32,
    pub user: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OncallScope {
    Current,
    Next,
    AllTeams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    pub cluster_id: String,
    pub cluster_name: String,
}

impl ClusterTarget {
    pub fn label(&self) -> &str {
        if self.cluster_name.trim().is_empty() {
            &self.cluster_id
        } else {
            &self.cluster_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_aliases_and_rejects_unknown() {
        assert_eq!(
            "Acknowledged".parse::<IncidentStatus>(),
            Ok(IncidentStatus::Acknowledged)
        );
        assert_eq!("ack".parse::<IncidentStatus>(), Ok(IncidentStatus::Acknowledged));
        assert!("snoozed".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn alert_without_cluster_id_has_no_login_target() {
        let mut alert = Alert {
            incident_id: "Q1".to_string(),
            alert_id: "A1".to_string(),
            name: String::new(),
            cluster_name: "prod-east".to_string(),
            cluster_id: "  ".to_string(),
            summary: String::new(),
            status: "triggered".to_string(),
            severity: "critical".to_string(),
            details: Vec::new(),
        };
        assert!(alert.cluster_target().is_none());

        alert.cluster_id = "c-123".to_string();
        let target = alert.cluster_target().expect("target");
        assert_eq!(target.label(), "prod-east");
    }

    #[test]
    fn incident_deserializes_with_defaults() {
        let incident: Incident = serde_json::from_str(
            r#"{"id":"Q1ABC","name":"API down","status":"triggered"}"#,
        )
        .expect("parse incident");
        assert_eq!(incident.urgency, Urgency::High);
        assert!(incident.assignee_id.is_none());
        assert_eq!(incident.status.to_string(), "triggered");
    }
}
