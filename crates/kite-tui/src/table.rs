use crate::store::SelectionSet;
use crate::theme::{self, icons};
use kite_core::columns::{ColumnSpec, TableRecord};
use ratatui::{
    layout::Constraint,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
};

const MAX_COLUMN_WIDTH: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub incident_id: String,
    pub label: String,
    pub cells: Vec<String>,
}

/// Projects records onto the columns named in `column_spec`, in spec order.
#[cfg(test)]
pub fn build_rows<R: TableRecord>(
    records: &[R],
    column_spec: &str,
) -> Result<(Vec<String>, Vec<TableRow>), kite_core::config::ConfigError> {
    let spec = ColumnSpec::<R::Column>::parse(column_spec)?;
    Ok(project_rows(records, &spec))
}

pub fn project_rows<R: TableRecord>(
    records: &[R],
    spec: &ColumnSpec<R::Column>,
) -> (Vec<String>, Vec<TableRow>) {
    let rows = records
        .iter()
        .map(|record| TableRow {
            incident_id: record.incident_id().to_string(),
            label: record.label(),
            cells: spec
                .columns()
                .iter()
                .map(|column| record.cell(*column))
                .collect(),
        })
        .collect();
    (spec.headers(), rows)
}

/// A navigable table page.
#[derive(Debug, Clone)]
pub struct TableView {
    title: String,
    headers: Vec<String>,
    rows: Vec<TableRow>,
    selectable: bool,
    show_header: bool,
    state: TableState,
}

impl TableView {
    pub fn new(
        title: &str,
        headers: Vec<String>,
        rows: Vec<TableRow>,
        selectable: bool,
        show_header: bool,
    ) -> Self {
        let mut state = TableState::default();
        if !rows.is_empty() {
            state.select(Some(0));
        }
        Self {
            title: title.to_string(),
            headers,
            rows,
            selectable,
            show_header,
            state,
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn cursor(&self) -> Option<usize> {
        self.state.selected().filter(|idx| *idx < self.rows.len())
    }

    pub fn cursor_row(&self) -> Option<&TableRow> {
        self.cursor().and_then(|idx| self.rows.get(idx))
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.state.select(None);
            return;
        }
        let current = self.state.selected().unwrap_or(0) as isize;
        let len = self.rows.len() as isize;
        let mut next = current + delta;
        if next < 0 {
            next = len - 1;
        }
        if next >= len {
            next = 0;
        }
        self.state.select(Some(next as usize));
    }

    pub fn cursor_to(&mut self, first: bool) {
        if self.rows.is_empty() {
            self.state.select(None);
        } else if first {
            self.state.select(Some(0));
        } else {
            self.state.select(Some(self.rows.len() - 1));
        }
    }

    /// Toggles the row under the cursor in `selection`. `None` when the table
    /// is not selectable or empty.
    pub fn toggle_cursor_row(&self, selection: &mut SelectionSet) -> Option<bool> {
        if !self.selectable {
            return None;
        }
        let row = self.cursor_row()?;
        Some(selection.toggle(&row.incident_id, &row.label))
    }

    pub fn state_mut(&mut self) -> &mut TableState {
        &mut self.state
    }

    pub fn widget(&self, selection: &SelectionSet) -> Table<'static> {
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| {
                let marked = self.selectable && selection.contains(&row.incident_id);
                let mut cells = Vec::with_capacity(row.cells.len() + 1);
                if self.selectable {
                    let marker = if marked {
                        icons::MARKED
                    } else {
                        icons::UNMARKED
                    };
                    cells.push(Cell::from(marker));
                }
                for (header, value) in self.headers.iter().zip(row.cells.iter()) {
                    cells.push(styled_cell(header, value));
                }
                let style = if marked {
                    theme::MARKED_STYLE
                } else {
                    Style::default()
                };
                Row::new(cells).style(style)
            })
            .collect();

        let mut table = Table::new(rows, self.column_widths())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme::BORDER_COLOR))
                    .title(Span::styled(format!(" {} ", self.title), theme::TITLE_STYLE)),
            )
            .highlight_style(theme::CURSOR_STYLE)
            .highlight_symbol(icons::CURSOR);

        if self.show_header {
            let mut header: Vec<String> = Vec::with_capacity(self.headers.len() + 1);
            if self.selectable {
                header.push(String::new());
            }
            header.extend(self.headers.iter().cloned());
            table = table.header(Row::new(header).style(theme::HEADER_STYLE));
        }
        table
    }

    fn column_widths(&self) -> Vec<Constraint> {
        let mut widths = Vec::with_capacity(self.headers.len() + 1);
        if self.selectable {
            widths.push(Constraint::Length(3));
        }
        for (idx, header) in self.headers.iter().enumerate() {
            let content = self
                .rows
                .iter()
                .filter_map(|row| row.cells.get(idx))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            let width = content.max(header.chars().count()).min(MAX_COLUMN_WIDTH);
            if idx + 1 == self.headers.len() {
                widths.push(Constraint::Min(width as u16));
            } else {
                widths.push(Constraint::Length(width as u16));
            }
        }
        widths
    }
}

fn styled_cell(header: &str, value: &str) -> Cell<'static> {
    let color = match header {
        "SEVERITY" => theme::severity_color(value),
        "STATUS" => theme::status_color(value),
        _ => return Cell::from(value.to_string()),
    };
    Cell::from(Span::styled(value.to_string(), Style::default().fg(color)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_core::columns::{IncidentColumn, DEFAULT_INCIDENT_COLUMNS};
    use kite_core::config::ConfigError;
    use kite_core::{Alert, Incident, IncidentStatus, Urgency};

    fn alert(incident_id: &str, alert_id: &str, cluster: &str) -> Alert {
        Alert {
            incident_id: incident_id.to_string(),
            alert_id: alert_id.to_string(),
            name: "ClusterOperatorDown".to_string(),
            cluster_name: cluster.to_string(),
            cluster_id: format!("id-{cluster}"),
            summary: "operator degraded".to_string(),
            status: "triggered".to_string(),
            severity: "critical".to_string(),
            details: Vec::new(),
        }
    }

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.to_string(),
            name: format!("incident {id}"),
            severity: "warning".to_string(),
            status: IncidentStatus::Triggered,
            service: "osd".to_string(),
            assigned_to: "Ada".to_string(),
            urgency: Urgency::Low,
            assignee_id: None,
            team_id: None,
            created_at: None,
            html_url: None,
        }
    }

    #[test]
    fn headers_follow_column_order_and_cells_follow() {
        let alerts = vec![alert("Q1", "A1", "prod-east")];
        let (headers, rows) =
            build_rows(&alerts, "cluster.name,severity,incident.id").expect("rows");
        assert_eq!(headers, vec!["CLUSTER NAME", "SEVERITY", "INCIDENT ID"]);
        assert_eq!(rows[0].cells, vec!["prod-east", "critical", "Q1"]);
        assert_eq!(rows[0].incident_id, "Q1");
    }

    #[test]
    fn unknown_column_is_a_configuration_error() {
        let alerts = vec![alert("Q1", "A1", "prod-east")];
        let err = build_rows(&alerts, "incident.id,region").expect_err("bad column");
        assert!(matches!(err, ConfigError::InvalidColumn { ref column, .. } if column == "region"));
    }

    #[test]
    fn rebuilt_rows_never_keep_stale_records() {
        let first = vec![alert("Q1", "A1", "prod-east"), alert("Q2", "A2", "prod-west")];
        let (_, rows) = build_rows(&first, "incident.id,alert.id").expect("rows");
        assert_eq!(rows.len(), 2);

        let refreshed = vec![alert("Q2", "A2", "prod-west")];
        let (headers, rows) = build_rows(&refreshed, "incident.id,alert.id").expect("rows");
        let view = TableView::new("[ ALERTS ]", headers, rows, false, true);
        assert!(view.rows().iter().all(|row| row.incident_id != "Q1"));
        assert_eq!(view.rows().len(), 1);
    }

    #[test]
    fn toggling_requires_selectable_table() {
        let incidents = vec![incident("Q1"), incident("Q2")];
        let (headers, rows) =
            build_rows(&incidents, DEFAULT_INCIDENT_COLUMNS).expect("rows");

        let mut selection = SelectionSet::default();
        let readonly = TableView::new("ro", headers.clone(), rows.clone(), false, true);
        assert_eq!(readonly.toggle_cursor_row(&mut selection), None);

        let mut view = TableView::new("rw", headers, rows, true, true);
        view.move_cursor(1);
        assert_eq!(view.toggle_cursor_row(&mut selection), Some(true));
        assert!(selection.contains("Q2"));
        assert_eq!(view.toggle_cursor_row(&mut selection), Some(false));
        assert!(selection.is_empty());
    }

    #[test]
    fn cursor_wraps_and_handles_empty_tables() {
        let spec = ColumnSpec::<IncidentColumn>::parse("incident.id").expect("spec");
        let (headers, rows) = project_rows(&[incident("Q1"), incident("Q2")], &spec);
        let mut view = TableView::new("t", headers.clone(), rows, false, false);
        view.move_cursor(-1);
        assert_eq!(view.cursor(), Some(1));
        view.move_cursor(1);
        assert_eq!(view.cursor(), Some(0));

        let mut empty = TableView::new("t", headers, Vec::new(), true, true);
        empty.move_cursor(1);
        assert_eq!(empty.cursor(), None);
        assert!(empty.cursor_row().is_none());
    }
}
