use kite_core::{Alert, Incident, OncallEntry};
use std::collections::BTreeMap;

/// Incidents marked by the operator, incident id -> row label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    entries: BTreeMap<String, String>,
}

impl SelectionSet {
    /// Inserts or removes the incident; returns whether it is selected afterwards.
    pub fn toggle(&mut self, incident_id: &str, label: &str) -> bool {
        if self.entries.remove(incident_id).is_some() {
            return false;
        }
        self.entries
            .insert(incident_id.to_string(), label.to_string());
        true
    }

    pub fn contains(&self, incident_id: &str) -> bool {
        self.entries.contains_key(incident_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentView {
    Acknowledged,
    Triggered,
}

/// Fetched records backing the tables. Every setter replaces, never merges.
#[derive(Debug, Default)]
pub struct RecordStore {
    alerts: Vec<Alert>,
    incident_alerts: Vec<Alert>,
    opened_incident: Option<String>,
    opened_alert: Option<Alert>,
    acknowledged: Vec<Incident>,
    triggered: Vec<Incident>,
    oncall: Vec<OncallEntry>,
    selection: SelectionSet,
}

impl RecordStore {
    pub fn replace_alerts(&mut self, alerts: Vec<Alert>) {
        self.alerts = alerts;
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn replace_incident_alerts(&mut self, incident_id: &str, alerts: Vec<Alert>) {
        self.opened_incident = Some(incident_id.to_string());
        self.incident_alerts = alerts;
    }

    pub fn incident_alerts(&self) -> &[Alert] {
        &self.incident_alerts
    }

    pub fn opened_incident(&self) -> Option<&str> {
        self.opened_incident.as_deref()
    }

    pub fn open_alert(&mut self, alert: Alert) {
        self.opened_alert = Some(alert);
    }

    pub fn opened_alert(&self) -> Option<&Alert> {
        self.opened_alert.as_ref()
    }

    pub fn replace_incidents(&mut self, view: IncidentView, incidents: Vec<Incident>) {
        match view {
            IncidentView::Acknowledged => self.acknowledged = incidents,
            IncidentView::Triggered => self.triggered = incidents,
        }
    }

    pub fn incidents(&self, view: IncidentView) -> &[Incident] {
        match view {
            IncidentView::Acknowledged => &self.acknowledged,
            IncidentView::Triggered => &self.triggered,
        }
    }

    pub fn replace_oncall(&mut self, entries: Vec<OncallEntry>) {
        self.oncall = entries;
    }

    pub fn oncall(&self) -> &[OncallEntry] {
        &self.oncall
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }
}
