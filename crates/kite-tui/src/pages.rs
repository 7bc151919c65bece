use crate::table::TableView;

pub const ALERTS_PAGE: &str = "Alerts";
pub const TRIGGERED_ALERTS_PAGE: &str = "Triggered";
pub const METADATA_PAGE: &str = "Metadata";
pub const INCIDENTS_PAGE: &str = "Incidents";
pub const ACK_INCIDENTS_PAGE: &str = "AckIncidents";
pub const ONCALL_PAGE: &str = "Oncall Layer";
pub const NEXT_ONCALL_PAGE: &str = "Next Oncall";
pub const ALL_TEAMS_ONCALL_PAGE: &str = "All Teams Oncall";

pub const ALERTS_TITLE: &str = "[ ALERTS ]";
pub const TRIGGERED_ALERTS_TITLE: &str = "[ TRIGGERED ALERTS ]";
pub const ALERT_DATA_TITLE: &str = "[ ALERT DATA ]";
pub const INCIDENTS_TITLE: &str = "[ TRIGGERED INCIDENTS ]";
pub const ACK_INCIDENTS_TITLE: &str = "[ ACKNOWLEDGED INCIDENTS ]";
pub const ONCALL_TITLE: &str = "ONCALL";
pub const NEXT_ONCALL_TITLE: &str = "[ NEXT ONCALL ]";
pub const ALL_TEAMS_ONCALL_TITLE: &str = "[ ALL TEAMS ONCALL ]";

pub const FOOTER_TEXT: &str = "[Esc] Go Back";
pub const FOOTER_ALERTS: &str =
    "[R] Refresh Alerts | [1] Acknowledged Incidents | [2] Triggered Incidents\n[Esc] Go Back";
pub const FOOTER_TRIGGERED_ALERTS: &str =
    "[1] Acknowledged Incidents | [2] Triggered Incidents\n[Esc] Go Back";
pub const FOOTER_INCIDENTS: &str =
    "[ENTER] Select Incident | [SPACE] Mark | [CTRL+A] Acknowledge Incidents\n[Esc] Go Back";
pub const FOOTER_METADATA: &str = "[Y] Login to Cluster\n[Esc] Go Back";
pub const FOOTER_ONCALL: &str = "[N] Your Next Oncall Schedule | [A] All Teams Oncall | [<-] Previous Layer Oncall | [->] Next Layer Oncall\n[Esc] Go Back";

/// Title of the paginated oncall page for escalation `level`.
pub fn oncall_page_title(level: u32) -> String {
    format!("{ONCALL_PAGE} {level}")
}

/// Footer hint bound to a page title. Oncall pages share one footer by substring.
pub fn footer_for(title: &str) -> &'static str {
    if title.contains("Oncall") {
        return FOOTER_ONCALL;
    }
    match title {
        ALERTS_PAGE => FOOTER_ALERTS,
        TRIGGERED_ALERTS_PAGE => FOOTER_TRIGGERED_ALERTS,
        INCIDENTS_PAGE => FOOTER_INCIDENTS,
        ACK_INCIDENTS_PAGE => FOOTER_TRIGGERED_ALERTS,
        METADATA_PAGE => FOOTER_METADATA,
        _ => FOOTER_TEXT,
    }
}

/// Read-only key/value page, e.g. the alert data view.
#[derive(Debug, Clone, Default)]
pub struct TextView {
    pub title: String,
    pub entries: Vec<(String, String)>,
    pub scroll: u16,
}

impl TextView {
    pub fn new(title: &str, entries: Vec<(String, String)>) -> Self {
        Self {
            title: title.to_string(),
            entries,
            scroll: 0,
        }
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let max = self.entries.len().saturating_sub(1) as i32;
        let next = (self.scroll as i32 + delta).clamp(0, max.max(0));
        self.scroll = next as u16;
    }
}

#[derive(Debug, Clone)]
pub enum PageView {
    Table(TableView),
    Text(TextView),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub view: PageView,
    pub visible: bool,
}

/// Named pages with at most one visible. Holds no history: callers decide
/// where `Esc` returns to.
#[derive(Debug, Default)]
pub struct Pages {
    pages: Vec<Page>,
    footer: &'static str,
}

impl Pages {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            footer: FOOTER_TEXT,
        }
    }

    /// Adds `view` under `title`, replacing any page with the same title.
    pub fn add_page(&mut self, title: &str, view: PageView, switch_to_front: bool) {
        let page = Page {
            title: title.to_string(),
            view,
            visible: false,
        };
        match self.pages.iter().position(|page| page.title == title) {
            Some(idx) => {
                let visible = self.pages[idx].visible;
                self.pages[idx] = page;
                self.pages[idx].visible = visible;
            }
            None => self.pages.push(page),
        }
        if switch_to_front {
            self.show(title);
        }
    }

    pub fn has_page(&self, title: &str) -> bool {
        self.pages.iter().any(|page| page.title == title)
    }

    /// Makes `title` the only visible page. Unknown titles leave state untouched.
    pub fn show(&mut self, title: &str) -> bool {
        if !self.has_page(title) {
            return false;
        }
        for page in &mut self.pages {
            page.visible = page.title == title;
        }
        self.footer = footer_for(title);
        true
    }

    pub fn front(&self) -> Option<&Page> {
        self.pages.iter().find(|page| page.visible)
    }

    pub fn front_mut(&mut self) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.visible)
    }

    pub fn front_title(&self) -> Option<&str> {
        self.front().map(|page| page.title.as_str())
    }

    /// Drops every page whose title contains `fragment`, e.g. stale oncall layers.
    pub fn remove_matching(&mut self, fragment: &str) {
        self.pages.retain(|page| !page.title.contains(fragment));
    }

    pub fn footer(&self) -> &'static str {
        self.footer
    }

    #[cfg(test)]
    pub fn visible_count(&self) -> usize {
        self.pages.iter().filter(|page| page.visible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(title: &str) -> PageView {
        PageView::Table(TableView::new(title, Vec::new(), Vec::new(), false, true))
    }

    #[test]
    fn show_keeps_exactly_one_page_visible() {
        let mut pages = Pages::new();
        pages.add_page(ALERTS_PAGE, table(ALERTS_TITLE), true);
        pages.add_page(INCIDENTS_PAGE, table(INCIDENTS_TITLE), false);
        assert_eq!(pages.front_title(), Some(ALERTS_PAGE));

        assert!(pages.show(INCIDENTS_PAGE));
        assert_eq!(pages.visible_count(), 1);
        assert_eq!(pages.front_title(), Some(INCIDENTS_PAGE));
        assert_eq!(pages.footer(), FOOTER_INCIDENTS);

        assert!(!pages.show("Nope"));
        assert_eq!(pages.front_title(), Some(INCIDENTS_PAGE));
    }

    #[test]
    fn oncall_pages_share_a_footer() {
        let mut pages = Pages::new();
        pages.add_page(&oncall_page_title(1), table(ONCALL_TITLE), true);
        assert_eq!(pages.footer(), FOOTER_ONCALL);
        pages.add_page(&oncall_page_title(2), table(ONCALL_TITLE), true);
        assert_eq!(pages.footer(), FOOTER_ONCALL);
        pages.add_page(NEXT_ONCALL_PAGE, table(NEXT_ONCALL_TITLE), true);
        assert_eq!(pages.footer(), FOOTER_ONCALL);
        assert_eq!(footer_for("Unknown"), FOOTER_TEXT);
    }

    #[test]
    fn re_adding_a_title_replaces_the_page() {
        let mut pages = Pages::new();
        pages.add_page(ALERTS_PAGE, table(ALERTS_TITLE), true);
        pages.add_page(
            ALERTS_PAGE,
            PageView::Text(TextView::new(ALERT_DATA_TITLE, Vec::new())),
            false,
        );
        let front = pages.front().expect("front page");
        assert!(matches!(front.view, PageView::Text(_)));
        assert!(front.visible);

        pages.add_page(&oncall_page_title(1), table(ONCALL_TITLE), false);
        pages.add_page(&oncall_page_title(2), table(ONCALL_TITLE), false);
        pages.remove_matching(ONCALL_PAGE);
        assert!(!pages.has_page(&oncall_page_title(1)));
        assert!(pages.has_page(ALERTS_PAGE));
    }

    #[test]
    fn text_scroll_is_clamped() {
        let mut view = TextView::new(
            ALERT_DATA_TITLE,
            vec![("a".into(), "1".into()), ("b".into(), "2".into())],
        );
        view.scroll_by(-3);
        assert_eq!(view.scroll, 0);
        view.scroll_by(10);
        assert_eq!(view.scroll, 1);
    }
}
