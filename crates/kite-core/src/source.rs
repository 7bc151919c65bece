use crate::filter::IncidentFilter;
use crate::{Alert, Incident, IncidentStatus, OncallEntry, OncallScope, User};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("incident not found: {0}")]
    UnknownIncident(String),
    #[error("{0}")]
    Remote(String),
}

/// Data-fetch capability of the incident service.
///
/// Failures are opaque to the dashboard: they are shown to the operator as-is
/// and never retried.
pub trait IncidentSource {
    fn current_user(&self) -> Result<User, SourceError>;
    fn fetch_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, SourceError>;
    fn fetch_alerts_for_incident(&self, incident_id: &str) -> Result<Vec<Alert>, SourceError>;
    /// Returns the ids that were acknowledged.
    fn acknowledge_incidents(&mut self, ids: &[String]) -> Result<Vec<String>, SourceError>;
    fn fetch_oncall(&self, scope: OncallScope) -> Result<Vec<OncallEntry>, SourceError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub user: User,
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub oncall: Vec<OncallEntry>,
    #[serde(default)]
    pub next_oncall: Vec<OncallEntry>,
    #[serde(default)]
    pub all_teams_oncall: Vec<OncallEntry>,
}

/// Incident source backed by a JSON snapshot of the service's data.
pub struct SnapshotSource {
    path: Option<PathBuf>,
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            snapshot,
        })
    }

    pub fn in_memory(snapshot: Snapshot) -> Self {
        Self {
            path: None,
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), SourceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl IncidentSource for SnapshotSource {
    fn current_user(&self) -> Result<User, SourceError> {
        Ok(self.snapshot.user.clone())
    }

    fn fetch_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, SourceError> {
        Ok(self
            .snapshot
            .incidents
            .iter()
            .filter(|incident| filter.matches(incident, &self.snapshot.user))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    fn fetch_alerts_for_incident(&self, incident_id: &str) -> Result<Vec<Alert>, SourceError> {
        let known = self
            .snapshot
            .incidents
            .iter()
            .any(|incident| incident.id == incident_id);
        let alerts: Vec<Alert> = self
            .snapshot
            .alerts
            .iter()
            .filter(|alert| alert.incident_id == incident_id)
            .cloned()
            .collect();
        if !known && alerts.is_empty() {
            return Err(SourceError::UnknownIncident(incident_id.to_string()));
        }
        Ok(alerts)
    }

    fn acknowledge_incidents(&mut self, ids: &[String]) -> Result<Vec<String>, SourceError> {
        if let Some(missing) = ids
            .iter()
            .find(|id| !self.snapshot.incidents.iter().any(|incident| &incident.id == *id))
        {
            return Err(SourceError::UnknownIncident(missing.clone()));
        }

        // Edit a copy; the in-memory state only changes once the file write succeeded.
        let mut next = self.snapshot.clone();
        let mut acknowledged = Vec::new();
        for incident in next
            .incidents
            .iter_mut()
            .filter(|incident| ids.contains(&incident.id))
        {
            if incident.status == IncidentStatus::Triggered {
                incident.status = IncidentStatus::Acknowledged;
                acknowledged.push(incident.id.clone());
            }
        }
        for alert in next
            .alerts
            .iter_mut()
            .filter(|alert| acknowledged.contains(&alert.incident_id))
        {
            alert.status = IncidentStatus::Acknowledged.to_string();
        }

        self.persist(&next)?;
        self.snapshot = next;
        Ok(acknowledged)
    }

    fn fetch_oncall(&self, scope: OncallScope) -> Result<Vec<OncallEntry>, SourceError> {
        let entries = match scope {
            OncallScope::Current => &self.snapshot.oncall,
            OncallScope::Next => &self.snapshot.next_oncall,
            OncallScope::AllTeams => &self.snapshot.all_teams_oncall,
        };
        Ok(entries.clone())
    }
}
