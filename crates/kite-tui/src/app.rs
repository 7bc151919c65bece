use crate::keymap::{self, Action, InputMode};
use crate::logging::LogBuffer;
use crate::mux::{Multiplexer, MuxOutcome};
use crate::pages::{
    oncall_page_title, Page, PageView, Pages, TextView, ACK_INCIDENTS_PAGE, ACK_INCIDENTS_TITLE,
    ALERTS_PAGE, ALERTS_TITLE, ALERT_DATA_TITLE, ALL_TEAMS_ONCALL_PAGE, ALL_TEAMS_ONCALL_TITLE,
    INCIDENTS_PAGE, INCIDENTS_TITLE, METADATA_PAGE, NEXT_ONCALL_PAGE, NEXT_ONCALL_TITLE,
    ONCALL_PAGE, ONCALL_TITLE, TRIGGERED_ALERTS_PAGE, TRIGGERED_ALERTS_TITLE,
};
use crate::session::{LaunchSpec, SessionSpawner, TermSize};
use crate::store::{IncidentView, RecordStore, SelectionSet};
use crate::table::{project_rows, TableRow, TableView};
use chrono::{DateTime, Utc};
use crossterm::event::KeyEvent;
use kite_core::columns::{AlertColumn, ColumnSpec, IncidentColumn};
use kite_core::config::ConfigError;
use kite_core::filter::IncidentFilter;
use kite_core::source::{IncidentSource, SourceError};
use kite_core::{Alert, IncidentStatus, OncallEntry, OncallScope, User};
use tracing::{error, info, warn};

/// Blocking work queued by a key handler. The event loop repaints the loading
/// popup first and only then runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    RefreshAlerts,
    LoadIncidents(IncidentView),
    OpenIncident { id: String, origin: String },
    Acknowledge(Vec<String>),
    LoadOncall(OncallScope),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// What `kite alerts` should do after the initial fetch.
#[derive(Debug)]
pub enum Startup {
    NoIncidents(String),
    Alerts(Vec<Alert>),
}

/// Initial fetch, done before the terminal is taken over so failures abort cleanly.
pub fn load_startup(
    source: &dyn IncidentSource,
    filter: &IncidentFilter,
    user: &User,
) -> Result<Startup, SourceError> {
    let incidents = source.fetch_incidents(filter)?;
    if incidents.is_empty() {
        return Ok(Startup::NoIncidents(format!(
            "Currently there are no alerts assigned to {}",
            filter.assignment.label(user)
        )));
    }
    let mut alerts = Vec::new();
    for incident in &incidents {
        alerts.extend(source.fetch_alerts_for_incident(&incident.id)?);
    }
    Ok(Startup::Alerts(alerts))
}

pub struct AppConfig {
    pub filter: IncidentFilter,
    pub alert_columns: String,
    pub incident_columns: String,
}

/// Borrowed view of the app for one frame.
pub struct FrameParts<'a> {
    pub mode: InputMode,
    pub front: Option<&'a mut Page>,
    pub selection: &'a SelectionSet,
    pub footer: &'static str,
    pub secondary: String,
    pub secondary_is_prompt: bool,
    pub notice: Option<&'a Notice>,
    pub loading: Option<&'a str>,
    pub logs: &'a LogBuffer,
    pub mux: &'a Multiplexer,
}

pub struct App {
    source: Box<dyn IncidentSource>,
    filter: IncidentFilter,
    user: User,
    assigned_to: String,
    alert_columns: ColumnSpec<AlertColumn>,
    incident_columns: ColumnSpec<IncidentColumn>,
    store: RecordStore,
    pages: Pages,
    mux: Multiplexer,
    mode: InputMode,
    logs: LogBuffer,
    pending: Option<Deferred>,
    loading: Option<String>,
    notice: Option<Notice>,
    alert_origin: String,
    incident_origin: String,
    oncall_levels: Vec<u32>,
    oncall_layer: usize,
    should_quit: bool,
}

impl App {
    pub fn new(
        source: Box<dyn IncidentSource>,
        spawner: Box<dyn SessionSpawner>,
        config: AppConfig,
        user: User,
        logs: LogBuffer,
    ) -> Result<Self, ConfigError> {
        let alert_columns = ColumnSpec::parse(&config.alert_columns)?;
        let incident_columns = ColumnSpec::parse(&config.incident_columns)?;
        let assigned_to = config.filter.assignment.label(&user);
        Ok(Self {
            source,
            filter: config.filter,
            user,
            assigned_to,
            alert_columns,
            incident_columns,
            store: RecordStore::default(),
            pages: Pages::new(),
            mux: Multiplexer::new(spawner, TermSize::new(80, 24)),
            mode: InputMode::Dashboard,
            logs,
            pending: None,
            loading: None,
            notice: None,
            alert_origin: ALERTS_PAGE.to_string(),
            incident_origin: INCIDENTS_PAGE.to_string(),
            oncall_levels: Vec::new(),
            oncall_layer: 0,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[cfg(test)]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&Deferred> {
        self.pending.as_ref()
    }

    #[cfg(test)]
    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    #[cfg(test)]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[cfg(test)]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    #[cfg(test)]
    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    #[cfg(test)]
    pub fn mux(&self) -> &Multiplexer {
        &self.mux
    }

    pub fn front_title(&self) -> &str {
        self.pages.front_title().unwrap_or("")
    }

    /// Shows `alerts` on the main alerts page and brings it to the front.
    pub fn open_alerts(&mut self, alerts: Vec<Alert>) {
        info!("Fetched {} alerts", alerts.len());
        self.store.replace_alerts(alerts);
        let view = self.alert_table(ALERTS_TITLE, self.store.alerts());
        self.pages.add_page(ALERTS_PAGE, PageView::Table(view), true);
    }

    /// Shows the current on-call layers, one page per escalation level.
    pub fn open_oncall(&mut self, entries: Vec<OncallEntry>) {
        self.pages.remove_matching(ONCALL_PAGE);
        let mut levels: Vec<u32> = entries.iter().map(|entry| entry.level).collect();
        levels.sort_unstable();
        levels.dedup();
        if levels.is_empty() {
            levels.push(1);
        }
        for level in &levels {
            let layer: Vec<&OncallEntry> =
                entries.iter().filter(|entry| entry.level == *level).collect();
            let view = oncall_table(&format!("[ {ONCALL_TITLE} - LAYER {level} ]"), &layer);
            self.pages
                .add_page(&oncall_page_title(*level), PageView::Table(view), false);
        }
        self.store.replace_oncall(entries);
        self.oncall_levels = levels;
        self.oncall_layer = 0;
        self.show_oncall_layer();
    }

    pub fn resize(&mut self, size: TermSize) {
        self.mux.resize(size);
    }

    /// Drains shell output into the terminal tabs.
    pub fn pump(&mut self) {
        self.mux.pump();
    }

    pub fn shutdown(&mut self) {
        self.mux.quit();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.pending.is_some() {
            return;
        }
        let action = keymap::resolve(self.mode, self.front_title(), &key);
        match action {
            Some(Action::Multiplexer) => {
                if self.mux.handle_key(&key) == MuxOutcome::Leave {
                    info!("Left terminal multiplexer");
                    self.mode = InputMode::Dashboard;
                }
            }
            Some(action) => {
                self.notice = None;
                self.apply(action);
            }
            None => {}
        }
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Refresh => self.schedule(Deferred::RefreshAlerts, "Refreshing alerts..."),
            Action::ShowAcknowledged => self.schedule(
                Deferred::LoadIncidents(IncidentView::Acknowledged),
                "Fetching acknowledged incidents...",
            ),
            Action::ShowTriggered => self.schedule(
                Deferred::LoadIncidents(IncidentView::Triggered),
                "Fetching triggered incidents...",
            ),
            Action::OpenRow => self.open_row(),
            Action::ToggleSelect => self.toggle_select(),
            Action::Acknowledge => {
                let ids = self.store.selection().ids();
                if ids.is_empty() {
                    self.notice = Some(Notice::Info("No incidents selected".to_string()));
                    return;
                }
                info!(
                    "Marked for acknowledgement: {}",
                    self.store.selection().labels().join(", ")
                );
                let message = format!("Acknowledging {} incident(s)...", ids.len());
                self.schedule(Deferred::Acknowledge(ids), &message);
            }
            Action::Back => self.back(),
            Action::MoveDown => self.move_cursor(1),
            Action::MoveUp => self.move_cursor(-1),
            Action::Top => self.cursor_edge(true),
            Action::Bottom => self.cursor_edge(false),
            Action::ClusterLogin => self.cluster_login(),
            Action::NextOncall => self.schedule(
                Deferred::LoadOncall(OncallScope::Next),
                "Fetching your next on-call schedule...",
            ),
            Action::AllTeamsOncall => self.schedule(
                Deferred::LoadOncall(OncallScope::AllTeams),
                "Fetching on-call for all teams...",
            ),
            Action::PrevLayer => self.step_oncall_layer(-1),
            Action::NextLayer => self.step_oncall_layer(1),
            Action::Multiplexer => {}
        }
    }

    fn schedule(&mut self, job: Deferred, message: &str) {
        info!("{message}");
        self.pending = Some(job);
        self.loading = Some(message.to_string());
    }

    /// Runs queued blocking work. Returns whether anything ran.
    pub fn run_pending(&mut self) -> bool {
        let Some(job) = self.pending.take() else {
            return false;
        };
        let result = match job {
            Deferred::RefreshAlerts => self.refresh_alerts(),
            Deferred::LoadIncidents(view) => self.load_incidents(view),
            Deferred::OpenIncident { id, origin } => self.open_incident(&id, origin),
            Deferred::Acknowledge(ids) => self.acknowledge(&ids),
            Deferred::LoadOncall(scope) => self.load_oncall(scope),
        };
        if let Err(err) = result {
            error!("{err}");
            self.notice = Some(Notice::Error(err.to_string()));
        }
        self.loading = None;
        true
    }

    fn refresh_alerts(&mut self) -> Result<(), SourceError> {
        let incidents = self.source.fetch_incidents(&self.filter)?;
        let mut alerts = Vec::new();
        for incident in &incidents {
            alerts.extend(self.source.fetch_alerts_for_incident(&incident.id)?);
        }
        let keep_front = self.pages.front_title().is_some_and(|title| title != ALERTS_PAGE);
        self.store.replace_alerts(alerts);
        let view = self.alert_table(ALERTS_TITLE, self.store.alerts());
        self.pages
            .add_page(ALERTS_PAGE, PageView::Table(view), !keep_front);
        info!("Fetched {} alerts", self.store.alerts().len());
        Ok(())
    }

    fn load_incidents(&mut self, view: IncidentView) -> Result<(), SourceError> {
        let (status, page, title, selectable) = match view {
            IncidentView::Acknowledged => (
                IncidentStatus::Acknowledged,
                ACK_INCIDENTS_PAGE,
                ACK_INCIDENTS_TITLE,
                false,
            ),
            IncidentView::Triggered => {
                (IncidentStatus::Triggered, INCIDENTS_PAGE, INCIDENTS_TITLE, true)
            }
        };
        let incidents = self
            .source
            .fetch_incidents(&self.filter.with_statuses(&[status]))?;
        info!("Fetched {} {status} incidents", incidents.len());
        self.store.replace_incidents(view, incidents);
        self.store.selection_mut().clear();
        let (headers, rows) = project_rows(self.store.incidents(view), &self.incident_columns);
        let table = TableView::new(title, headers, rows, selectable, true);
        self.pages.add_page(page, PageView::Table(table), true);
        Ok(())
    }

    fn open_incident(&mut self, id: &str, origin: String) -> Result<(), SourceError> {
        let alerts = self.source.fetch_alerts_for_incident(id)?;
        info!("Fetched {} alerts for incident {id}", alerts.len());
        self.store.replace_incident_alerts(id, alerts);
        let view = self.alert_table(TRIGGERED_ALERTS_TITLE, self.store.incident_alerts());
        self.pages
            .add_page(TRIGGERED_ALERTS_PAGE, PageView::Table(view), true);
        self.incident_origin = origin;
        Ok(())
    }

    fn acknowledge(&mut self, ids: &[String]) -> Result<(), SourceError> {
        let acknowledged = self.source.acknowledge_incidents(ids)?;
        self.store.selection_mut().clear();
        let message = if acknowledged.is_empty() {
            "No incidents needed acknowledging".to_string()
        } else {
            format!("Acknowledged incidents: {}", acknowledged.join(", "))
        };
        info!("{message}");
        self.notice = Some(Notice::Info(message));
        self.load_incidents(IncidentView::Triggered)
    }

    fn load_oncall(&mut self, scope: OncallScope) -> Result<(), SourceError> {
        let entries = self.source.fetch_oncall(scope)?;
        info!("Fetched {} on-call entries", entries.len());
        match scope {
            OncallScope::Current => self.open_oncall(entries),
            OncallScope::Next => {
                let refs: Vec<&OncallEntry> = entries.iter().collect();
                let view = oncall_table(NEXT_ONCALL_TITLE, &refs);
                self.pages
                    .add_page(NEXT_ONCALL_PAGE, PageView::Table(view), true);
            }
            OncallScope::AllTeams => {
                let refs: Vec<&OncallEntry> = entries.iter().collect();
                let view = oncall_table(ALL_TEAMS_ONCALL_TITLE, &refs);
                self.pages
                    .add_page(ALL_TEAMS_ONCALL_PAGE, PageView::Table(view), true);
            }
        }
        Ok(())
    }

    fn open_row(&mut self) {
        let front = self.front_title().to_string();
        let cursor = match self.pages.front().map(|page| &page.view) {
            Some(PageView::Table(view)) => view
                .cursor()
                .zip(view.cursor_row().map(|row| row.incident_id.clone())),
            _ => None,
        };
        let Some((index, incident_id)) = cursor else {
            return;
        };
        match front.as_str() {
            ALERTS_PAGE | TRIGGERED_ALERTS_PAGE => {
                let alerts = if front == ALERTS_PAGE {
                    self.store.alerts()
                } else {
                    self.store.incident_alerts()
                };
                let Some(alert) = alerts.get(index).cloned() else {
                    return;
                };
                self.open_alert(alert, front);
            }
            INCIDENTS_PAGE | ACK_INCIDENTS_PAGE => {
                let message = format!("Loading alerts for incident {incident_id}...");
                self.schedule(
                    Deferred::OpenIncident {
                        id: incident_id,
                        origin: front,
                    },
                    &message,
                );
            }
            _ => {}
        }
    }

    fn open_alert(&mut self, alert: Alert, origin: String) {
        let mut entries = vec![
            ("Incident ID".to_string(), alert.incident_id.clone()),
            ("Alert ID".to_string(), alert.alert_id.clone()),
            ("Alert".to_string(), alert.name.clone()),
            ("Cluster Name".to_string(), alert.cluster_name.clone()),
            ("Cluster ID".to_string(), alert.cluster_id.clone()),
            ("Status".to_string(), alert.status.clone()),
            ("Severity".to_string(), alert.severity.clone()),
            ("Summary".to_string(), alert.summary.clone()),
        ];
        entries.extend(alert.details.iter().cloned());
        self.pages.add_page(
            METADATA_PAGE,
            PageView::Text(TextView::new(ALERT_DATA_TITLE, entries)),
            true,
        );
        self.mux.set_context(alert.cluster_target());
        self.store.open_alert(alert);
        self.alert_origin = origin;
    }

    fn toggle_select(&mut self) {
        let Some(page) = self.pages.front_mut() else {
            return;
        };
        let PageView::Table(view) = &page.view else {
            return;
        };
        let Some(row) = view.cursor_row() else {
            return;
        };
        let id = row.incident_id.clone();
        match view.toggle_cursor_row(self.store.selection_mut()) {
            Some(true) => info!("Selected incident {id}"),
            Some(false) => info!("Deselected incident {id}"),
            None => {}
        }
    }

    /// Returns to the page the caller remembered; the page set keeps no history.
    fn back(&mut self) {
        let front = self.front_title().to_string();
        let target = match front.as_str() {
            METADATA_PAGE => self.alert_origin.clone(),
            TRIGGERED_ALERTS_PAGE => self.incident_origin.clone(),
            INCIDENTS_PAGE | ACK_INCIDENTS_PAGE => {
                self.store.selection_mut().clear();
                ALERTS_PAGE.to_string()
            }
            NEXT_ONCALL_PAGE | ALL_TEAMS_ONCALL_PAGE => {
                self.show_oncall_layer();
                return;
            }
            _ => return,
        };
        self.pages.show(&target);
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.pages.front_mut().map(|page| &mut page.view) {
            Some(PageView::Table(view)) => view.move_cursor(delta),
            Some(PageView::Text(view)) => view.scroll_by(delta as i32),
            None => {}
        }
    }

    fn cursor_edge(&mut self, first: bool) {
        match self.pages.front_mut().map(|page| &mut page.view) {
            Some(PageView::Table(view)) => view.cursor_to(first),
            Some(PageView::Text(view)) => {
                let span = view.entries.len() as i32;
                view.scroll_by(if first { -span } else { span });
            }
            None => {}
        }
    }

    fn cluster_login(&mut self) {
        let Some(target) = self.store.opened_alert().and_then(Alert::cluster_target) else {
            self.notice = Some(Notice::Error(
                "This alert has no cluster to log into".to_string(),
            ));
            return;
        };
        info!("Logging into cluster {}", target.label());
        self.mux.set_context(Some(target.clone()));
        match self.mux.add_tab(LaunchSpec::cluster_login(target)) {
            Ok(_) => self.mode = InputMode::Terminal,
            Err(err) => {
                error!("cluster login failed: {err}");
                self.notice = Some(Notice::Error(err.to_string()));
            }
        }
    }

    fn show_oncall_layer(&mut self) {
        let Some(level) = self.oncall_levels.get(self.oncall_layer).copied() else {
            warn!("no on-call layers loaded");
            return;
        };
        self.pages.show(&oncall_page_title(level));
    }

    fn step_oncall_layer(&mut self, delta: isize) {
        if !self.front_title().starts_with(ONCALL_PAGE) || self.oncall_levels.is_empty() {
            return;
        }
        let last = self.oncall_levels.len() as isize - 1;
        self.oncall_layer = (self.oncall_layer as isize + delta).clamp(0, last) as usize;
        self.show_oncall_layer();
    }

    fn alert_table(&self, title: &str, alerts: &[Alert]) -> TableView {
        let (headers, rows) = project_rows(alerts, &self.alert_columns);
        TableView::new(title, headers, rows, false, true)
    }

    fn secondary(&self) -> (String, bool) {
        let front = self.front_title();
        if front == METADATA_PAGE {
            return match self.store.opened_alert().and_then(Alert::cluster_target) {
                Some(target) => (
                    format!("Press 'Y' to log into the cluster: {}", target.label()),
                    true,
                ),
                None => ("No cluster is associated with this alert".to_string(), true),
            };
        }
        if front.contains("Oncall") {
            let primary = oncall_user(self.store.oncall(), 1);
            let secondary = oncall_user(self.store.oncall(), 2);
            return (
                format!(
                    "Logged in user: {}\nCurrent Oncall Primary: {primary}\nCurrent Oncall Secondary: {secondary}",
                    self.user.name
                ),
                false,
            );
        }
        let role = if self.user.role.is_empty() {
            "-"
        } else {
            self.user.role.as_str()
        };
        (
            format!(
                "Logged in user: {}\n\nViewing alerts assigned to: {}\n\nRole: {role}\n\nNumber of alerts fetched: {}",
                self.user.name,
                self.assigned_to,
                self.store.alerts().len()
            ),
            false,
        )
    }

    pub fn frame_parts(&mut self) -> FrameParts<'_> {
        let (secondary, secondary_is_prompt) = self.secondary();
        let footer = self.pages.footer();
        FrameParts {
            mode: self.mode,
            front: self.pages.front_mut(),
            selection: self.store.selection(),
            footer,
            secondary,
            secondary_is_prompt,
            notice: self.notice.as_ref(),
            loading: self.loading.as_deref(),
            logs: &self.logs,
            mux: &self.mux,
        }
    }
}

fn oncall_user(entries: &[OncallEntry], level: u32) -> String {
    entries
        .iter()
        .find(|entry| entry.level == level)
        .map(|entry| entry.user.clone())
        .unwrap_or_else(|| "N/A".to_string())
}

fn format_time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn oncall_table(title: &str, entries: &[&OncallEntry]) -> TableView {
    let headers = ["ESCALATION POLICY", "LEVEL", "USER", "TEAM", "START", "END"]
        .iter()
        .map(|header| header.to_string())
        .collect();
    let rows = entries
        .iter()
        .map(|entry| TableRow {
            incident_id: String::new(),
            label: entry.user.clone(),
            cells: vec![
                entry.escalation_policy.clone(),
                entry.level.to_string(),
                entry.user.clone(),
                entry.team.clone(),
                format_time(entry.start),
                format_time(entry.end),
            ],
        })
        .collect();
    TableView::new(title, headers, rows, false, true)
}
