use crate::config::{ConfigError, KiteConfig};
use crate::{Incident, IncidentStatus, Urgency, User};
use regex::Regex;
use std::sync::OnceLock;

pub const INCIDENTS_LIMIT: usize = 100;
const INCIDENT_ID_PATTERN: &str = r"^[A-Z0-9]+$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Me,
    Team { id: String, name: String },
    User { id: String, name: String },
}

impl Assignment {
    /// Resolves an `--assigned-to` value: `self`, `team`, or a configured user alias.
    pub fn parse(raw: &str, config: &KiteConfig) -> Result<Self, ConfigError> {
        match raw {
            "self" => Ok(Assignment::Me),
            "team" => {
                if config.team_id.trim().is_empty() {
                    return Err(ConfigError::MissingTeam);
                }
                Ok(Assignment::Team {
                    id: config.team_id.clone(),
                    name: config.team.clone(),
                })
            }
            other => match config.named_users.get(other) {
                Some(id) => Ok(Assignment::User {
                    id: id.clone(),
                    name: other.to_string(),
                }),
                None => Err(ConfigError::InvalidAssignment(other.to_string())),
            },
        }
    }

    /// Human label for the secondary window, e.g. the user's or team's name.
    pub fn label(&self, user: &User) -> String {
        match self {
            Assignment::Me => user.name.clone(),
            Assignment::Team { id, name } | Assignment::User { id, name } => {
                if name.is_empty() {
                    id.clone()
                } else {
                    name.clone()
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentFilter {
    pub assignment: Assignment,
    pub statuses: Vec<IncidentStatus>,
    pub urgencies: Vec<Urgency>,
    pub limit: usize,
}

impl IncidentFilter {
    /// Own incidents default to acknowledged only; team and user views also show triggered.
    pub fn for_assignment(assignment: Assignment) -> Self {
        let statuses = match assignment {
            Assignment::Me => vec![IncidentStatus::Acknowledged],
            _ => vec![IncidentStatus::Triggered, IncidentStatus::Acknowledged],
        };
        Self {
            assignment,
            statuses,
            urgencies: vec![Urgency::Low, Urgency::High],
            limit: INCIDENTS_LIMIT,
        }
    }

    pub fn with_statuses(&self, statuses: &[IncidentStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..self.clone()
        }
    }

    pub fn matches(&self, incident: &Incident, user: &User) -> bool {
        if !self.statuses.contains(&incident.status) {
            return false;
        }
        if !self.urgencies.contains(&incident.urgency) {
            return false;
        }
        match &self.assignment {
            Assignment::Me => incident.assignee_id.as_deref() == Some(user.id.as_str()),
            Assignment::Team { id, .. } => incident.team_id.as_deref() == Some(id.as_str()),
            Assignment::User { id, .. } => incident.assignee_id.as_deref() == Some(id.as_str()),
        }
    }
}

pub fn validate_incident_id(raw: &str) -> Result<String, ConfigError> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let id = raw.trim();
    let valid = PATTERN
        .get_or_init(|| Regex::new(INCIDENT_ID_PATTERN).ok())
        .as_ref()
        .map(|re| re.is_match(id))
        .unwrap_or(false);
    if valid {
        Ok(id.to_string())
    } else {
        Err(ConfigError::InvalidIncidentId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator() -> User {
        User {
            id: "PME".to_string(),
            name: "Ada Operator".to_string(),
            role: "responder".to_string(),
        }
    }

    fn incident(status: IncidentStatus, assignee: &str, team: &str) -> Incident {
        Incident {
            id: "Q1".to_string(),
            name: "disk pressure".to_string(),
            severity: "warning".to_string(),
            status,
            service: "osd".to_string(),
            assigned_to: assignee.to_string(),
            urgency: Urgency::High,
            assignee_id: Some(assignee.to_string()),
            team_id: Some(team.to_string()),
            created_at: None,
            html_url: None,
        }
    }

    #[test]
    fn team_assignment_requires_selected_team() {
        let config = KiteConfig::default();
        assert!(matches!(
            Assignment::parse("team", &config),
            Err(ConfigError::MissingTeam)
        ));

        let config = KiteConfig {
            team_id: "PTEAM".to_string(),
            team: "SRE".to_string(),
            ..KiteConfig::default()
        };
        let assignment = Assignment::parse("team", &config).expect("team");
        assert_eq!(assignment.label(&operator()), "SRE");
    }

    #[test]
    fn unknown_assignment_is_rejected_and_aliases_resolve() {
        let mut config = KiteConfig::default();
        assert!(matches!(
            Assignment::parse("everyone", &config),
            Err(ConfigError::InvalidAssignment(_))
        ));

        config
            .named_users
            .insert("silentTest".to_string(), "PSILENT".to_string());
        assert_eq!(
            Assignment::parse("silentTest", &config).expect("alias"),
            Assignment::User {
                id: "PSILENT".to_string(),
                name: "silentTest".to_string()
            }
        );
    }

    #[test]
    fn self_filter_only_matches_own_acknowledged_incidents() {
        let filter = IncidentFilter::for_assignment(Assignment::Me);
        assert_eq!(filter.statuses, vec![IncidentStatus::Acknowledged]);
        assert!(filter.matches(&incident(IncidentStatus::Acknowledged, "PME", "T"), &operator()));
        assert!(!filter.matches(&incident(IncidentStatus::Triggered, "PME", "T"), &operator()));
        assert!(!filter.matches(
            &incident(IncidentStatus::Acknowledged, "POTHER", "T"),
            &operator()
        ));
    }

    #[test]
    fn team_filter_matches_by_team_and_both_open_statuses() {
        let filter = IncidentFilter::for_assignment(Assignment::Team {
            id: "PTEAM".to_string(),
            name: "SRE".to_string(),
        });
        assert!(filter.matches(
            &incident(IncidentStatus::Triggered, "POTHER", "PTEAM"),
            &operator()
        ));
        assert!(!filter.matches(
            &incident(IncidentStatus::Resolved, "POTHER", "PTEAM"),
            &operator()
        ));
        let triggered = filter.with_statuses(&[IncidentStatus::Triggered]);
        assert!(!triggered.matches(
            &incident(IncidentStatus::Acknowledged, "POTHER", "PTEAM"),
            &operator()
        ));
    }

    #[test]
    fn incident_ids_are_validated() {
        assert_eq!(validate_incident_id(" Q1ABC2 ").expect("valid"), "Q1ABC2");
        assert!(validate_incident_id("q1-abc").is_err());
        assert!(validate_incident_id("").is_err());
    }
}
