use crate::config::ConfigError;
use crate::{Alert, Incident};

pub const DEFAULT_ALERT_COLUMNS: &str =
    "incident.id,alert.id,cluster.name,alert,cluster.id,status,severity";
pub const DEFAULT_INCIDENT_COLUMNS: &str = "incident.id,name,severity,status,service,assigned.to";

pub trait Column: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn key(self) -> &'static str;
    fn header(self) -> &'static str;
}

/// A fetched record that can be projected into table cells.
pub trait TableRecord {
    type Column: Column;

    fn cell(&self, column: Self::Column) -> String;
    /// Incident the row belongs to; selection and acknowledgement are keyed by it.
    fn incident_id(&self) -> &str;
    fn label(&self) -> String;
}

/// Ordered, validated column list parsed from a comma-separated specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec<C> {
    columns: Vec<C>,
}

impl<C: Column> ColumnSpec<C> {
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        if spec.is_empty() {
            return Err(ConfigError::EmptyColumns);
        }
        let mut columns = Vec::new();
        for name in spec.split(',') {
            let column = C::ALL
                .iter()
                .copied()
                .find(|column| column.key() == name)
                .ok_or_else(|| ConfigError::InvalidColumn {
                    column: name.to_string(),
                    valid: C::ALL
                        .iter()
                        .map(|column| column.key())
                        .collect::<Vec<_>>()
                        .join(","),
                })?;
            columns.push(column);
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.header().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColumn {
    IncidentId,
    AlertId,
    AlertName,
    ClusterName,
    Summary,
    ClusterId,
    Status,
    Severity,
}

impl Column for AlertColumn {
    const ALL: &'static [Self] = &[
        AlertColumn::IncidentId,
        AlertColumn::AlertId,
        AlertColumn::AlertName,
        AlertColumn::ClusterName,
        AlertColumn::Summary,
        AlertColumn::ClusterId,
        AlertColumn::Status,
        AlertColumn::Severity,
    ];

    fn key(self) -> &'static str {
        match self {
            AlertColumn::IncidentId => "incident.id",
            AlertColumn::AlertId => "alert.id",
            AlertColumn::AlertName => "alert.name",
            AlertColumn::ClusterName => "cluster.name",
            AlertColumn::Summary => "alert",
            AlertColumn::ClusterId => "cluster.id",
            AlertColumn::Status => "status",
            AlertColumn::Severity => "severity",
        }
    }

    fn header(self) -> &'static str {
        match self {
            AlertColumn::IncidentId => "INCIDENT ID",
            AlertColumn::AlertId => "ALERT ID",
            AlertColumn::AlertName => "ALERT NAME",
            AlertColumn::ClusterName => "CLUSTER NAME",
            AlertColumn::Summary => "ALERT",
            AlertColumn::ClusterId => "CLUSTER ID",
            AlertColumn::Status => "STATUS",
            AlertColumn::Severity => "SEVERITY",
        }
    }
}

impl TableRecord for Alert {
    type Column = AlertColumn;

    fn cell(&self, column: AlertColumn) -> String {
        match column {
            AlertColumn::IncidentId => self.incident_id.clone(),
            AlertColumn::AlertId => self.alert_id.clone(),
            AlertColumn::AlertName => self.name.clone(),
            AlertColumn::ClusterName => self.cluster_name.clone(),
            AlertColumn::Summary => self.summary.clone(),
            AlertColumn::ClusterId => self.cluster_id.clone(),
            AlertColumn::Status => self.status.clone(),
            AlertColumn::Severity => self.severity.clone(),
        }
    }

    fn incident_id(&self) -> &str {
        &self.incident_id
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            self.summary.clone()
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentColumn {
    Id,
    Name,
    Severity,
    Status,
    Service,
    AssignedTo,
    Urgency,
}

impl Column for IncidentColumn {
    const ALL: &'static [Self] = &[
        IncidentColumn::Id,
        IncidentColumn::Name,
        IncidentColumn::Severity,
        IncidentColumn::Status,
        IncidentColumn::Service,
        IncidentColumn::AssignedTo,
        IncidentColumn::Urgency,
    ];

    fn key(self) -> &'static str {
        match self {
            IncidentColumn::Id => "incident.id",
            IncidentColumn::Name => "name",
            IncidentColumn::Severity => "severity",
            IncidentColumn::Status => "status",
            IncidentColumn::Service => "service",
            IncidentColumn::AssignedTo => "assigned.to",
            IncidentColumn::Urgency => "urgency",
        }
    }

    fn header(self) -> &'static str {
        match self {
            IncidentColumn::Id => "INCIDENT ID",
            IncidentColumn::Name => "NAME",
            IncidentColumn::Severity => "SEVERITY",
            IncidentColumn::Status => "STATUS",
            IncidentColumn::Service => "SERVICE",
            IncidentColumn::AssignedTo => "ASSIGNED TO",
            IncidentColumn::Urgency => "URGENCY",
        }
    }
}

impl TableRecord for Incident {
    type Column = IncidentColumn;

    fn cell(&self, column: IncidentColumn) -> String {
        match column {
            IncidentColumn::Id => self.id.clone(),
            IncidentColumn::Name => self.name.clone(),
            IncidentColumn::Severity => self.severity.clone(),
            IncidentColumn::Status => self.status.to_string(),
            IncidentColumn::Service => self.service.clone(),
            IncidentColumn::AssignedTo => self.assigned_to.clone(),
            IncidentColumn::Urgency => self.urgency.to_string(),
        }
    }

    fn incident_id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_specs_parse() {
        let alerts = ColumnSpec::<AlertColumn>::parse(DEFAULT_ALERT_COLUMNS).expect("alerts");
        assert_eq!(alerts.columns().len(), 7);
        let incidents =
            ColumnSpec::<IncidentColumn>::parse(DEFAULT_INCIDENT_COLUMNS).expect("incidents");
        assert_eq!(
            incidents.headers(),
            vec!["INCIDENT ID", "NAME", "SEVERITY", "STATUS", "SERVICE", "ASSIGNED TO"]
        );
    }

    #[test]
    fn headers_follow_spec_order() {
        let spec = ColumnSpec::<AlertColumn>::parse("severity,cluster.name,incident.id")
            .expect("spec");
        assert_eq!(spec.headers(), vec!["SEVERITY", "CLUSTER NAME", "INCIDENT ID"]);
    }

    #[test]
    fn unknown_or_padded_names_are_errors() {
        let err = ColumnSpec::<AlertColumn>::parse("incident.id,cluster.region")
            .expect_err("unknown column");
        match err {
            ConfigError::InvalidColumn { column, valid } => {
                assert_eq!(column, "cluster.region");
                assert!(valid.contains("cluster.name"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ColumnSpec::<AlertColumn>::parse("incident.id, alert.id").is_err());
        assert!(ColumnSpec::<AlertColumn>::parse("incident.id,,alert.id").is_err());
        assert!(matches!(
            ColumnSpec::<AlertColumn>::parse(""),
            Err(ConfigError::EmptyColumns)
        ));
    }
}
