//! Interactive application state.
//!
//! Wraps the [`Session`] with everything the terminal UI needs on top of it:
//! focused pane, per-pane scrolling, input modes, the text shown in the
//! detail/sequence/hits panes and status messages.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::formats::gene_table::{BEST_HIT_EVALUE_COL, CONTIG_NAME_COL, GENE_NAME_COL, TAXON_ASSIGNMENT_COL};
use crate::legend::LegendVisibility;
use crate::model::{SelectionMode, EVALUE_SLIDER_MAX};
use crate::reconcile::{EventKind, HitsPane, Outcome};
use crate::session::{Session, NO_SEQUENCE};

/// Slider step of the coarse slider keys.
pub const SLIDER_FAST_STEP: u32 = 10;

/// Text of the detail pane before any interaction.
const INITIAL_DETAIL: &str = "Select a gene with Enter";

/// Columns of the selection table until `:columns` changes them.
pub const DEFAULT_TABLE_COLUMNS: [&str; 4] = [
    GENE_NAME_COL,
    CONTIG_NAME_COL,
    TAXON_ASSIGNMENT_COL,
    BEST_HIT_EVALUE_COL,
];

/// The panes that can take the keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Plot,
    Legend,
    Selection,
    Hits,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Pane::Plot => Pane::Legend,
            Pane::Legend => Pane::Selection,
            Pane::Selection => Pane::Hits,
            Pane::Hits => Pane::Plot,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Pane::Plot => Pane::Hits,
            Pane::Legend => Pane::Plot,
            Pane::Selection => Pane::Legend,
            Pane::Hits => Pane::Selection,
        }
    }
}

impl fmt::Display for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pane::Plot => "Plot",
            Pane::Legend => "Legend",
            Pane::Selection => "Selection",
            Pane::Hits => "Hits",
        };
        write!(f, "{}", name)
    }
}

/// Scroll position and cursor of one list pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Index of the first visible row
    pub first_row: usize,
    /// Number of visible rows
    pub visible_rows: usize,
    /// Highlighted row
    pub cursor: usize,
}

impl Viewport {
    pub fn new(visible_rows: usize) -> Self {
        Self {
            visible_rows,
            ..Self::default()
        }
    }

    /// Updates the viewport height, keeping the cursor in view.
    pub fn resize(&mut self, visible_rows: usize, row_count: usize) {
        self.visible_rows = visible_rows;
        self.clamp(row_count);
    }

    /// Returns the range of visible rows.
    pub fn row_range(&self, row_count: usize) -> Range<usize> {
        self.first_row.min(row_count)..(self.first_row + self.visible_rows).min(row_count)
    }

    pub fn move_by(&mut self, delta: isize, row_count: usize) {
        self.cursor = self.cursor.saturating_add_signed(delta);
        self.clamp(row_count);
    }

    pub fn goto(&mut self, row: usize, row_count: usize) {
        self.cursor = row;
        self.clamp(row_count);
    }

    /// Clamps the cursor to `row_count` rows and scrolls it into view.
    pub fn clamp(&mut self, row_count: usize) {
        self.cursor = self.cursor.min(row_count.saturating_sub(1));
        if self.cursor < self.first_row {
            self.first_row = self.cursor;
        } else if self.visible_rows > 0 && self.cursor >= self.first_row + self.visible_rows {
            self.first_row = self.cursor + 1 - self.visible_rows;
        }
        if self.first_row + self.visible_rows > row_count {
            self.first_row = row_count.saturating_sub(self.visible_rows);
        }
    }
}

/// Input mode of the application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Command input mode (after pressing ':')
    Command(String),
    /// Gene search input (after pressing '/')
    Search(String),
}

/// Full-screen text shown over the panes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Summary(String),
    /// Selectable columns with their glossary labels
    Columns,
}

/// Visible row counts of the list panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleRows {
    pub plot: usize,
    pub legend: usize,
    pub selection: usize,
    pub hits: usize,
}

#[derive(Debug)]
pub struct AppState {
    pub session: Session,
    pub mode: AppMode,
    pub focus: Pane,
    pub plot: Viewport,
    pub legend: Viewport,
    pub selection: Viewport,
    pub hits_view: Viewport,
    /// Detail pane text
    pub detail: String,
    /// Protein sequence of the current target
    pub sequence: String,
    /// Taxonomy link of the last clicked point
    pub taxonomy_link: Option<String>,
    pub hits: HitsPane,
    /// Requested selection table columns, resolved against each dataset
    pub table_columns: Vec<String>,
    pub overlay: Option<Overlay>,
    pub should_quit: bool,
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            mode: AppMode::Normal,
            focus: Pane::default(),
            plot: Viewport::new(0),
            legend: Viewport::new(0),
            selection: Viewport::new(0),
            hits_view: Viewport::new(0),
            detail: INITIAL_DETAIL.to_string(),
            sequence: NO_SEQUENCE.to_string(),
            taxonomy_link: None,
            hits: HitsPane::Cleared,
            table_columns: DEFAULT_TABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            overlay: None,
            should_quit: false,
            status_message: None,
        }
    }

    fn row_count(&self, pane: Pane) -> usize {
        match pane {
            Pane::Plot => self.session.view().len(),
            Pane::Legend => self.session.legend().legend_order().len(),
            Pane::Selection => self.session.selected_rows().len(),
            Pane::Hits => match &self.hits {
                HitsPane::Rows(rows) => rows.len(),
                _ => 0,
            },
        }
    }

    fn viewport_mut(&mut self, pane: Pane) -> &mut Viewport {
        match pane {
            Pane::Plot => &mut self.plot,
            Pane::Legend => &mut self.legend,
            Pane::Selection => &mut self.selection,
            Pane::Hits => &mut self.hits_view,
        }
    }

    /// Updates the pane heights based on terminal dimensions.
    pub fn update_viewport_size(&mut self, rows: VisibleRows) {
        for (pane, visible) in [
            (Pane::Plot, rows.plot),
            (Pane::Legend, rows.legend),
            (Pane::Selection, rows.selection),
            (Pane::Hits, rows.hits),
        ] {
            let count = self.row_count(pane);
            self.viewport_mut(pane).resize(visible, count);
        }
    }

    /// Re-clamps every cursor after the underlying rows changed.
    fn clamp_all(&mut self) {
        for pane in [Pane::Plot, Pane::Legend, Pane::Selection, Pane::Hits] {
            let count = self.row_count(pane);
            self.viewport_mut(pane).clamp(count);
        }
    }

    /// Moves the cursor of the focused pane.
    pub fn move_cursor(&mut self, delta: isize) {
        let pane = self.focus;
        let count = self.row_count(pane);
        self.viewport_mut(pane).move_by(delta, count);
    }

    pub fn half_page(&self) -> isize {
        self.page().max(2) / 2
    }

    pub fn page(&self) -> isize {
        let visible = match self.focus {
            Pane::Plot => self.plot.visible_rows,
            Pane::Legend => self.legend.visible_rows,
            Pane::Selection => self.selection.visible_rows,
            Pane::Hits => self.hits_view.visible_rows,
        };
        visible.max(1) as isize
    }

    pub fn goto_first_row(&mut self) {
        let pane = self.focus;
        let count = self.row_count(pane);
        self.viewport_mut(pane).goto(0, count);
    }

    pub fn goto_last_row(&mut self) {
        let pane = self.focus;
        let count = self.row_count(pane);
        self.viewport_mut(pane).goto(count.saturating_sub(1), count);
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Gene name of the plot row under the cursor.
    fn gene_at_plot_cursor(&self) -> Option<String> {
        self.session
            .view()
            .record(self.session.store().all_records(), self.plot.cursor)
            .map(|record| record.gene_name.clone())
    }

    /// Sends an event to the session and shows its outcome.
    pub fn dispatch(&mut self, event: EventKind) {
        let outcome = self.session.dispatch(event);
        self.show_outcome(outcome);
        self.clamp_all();
    }

    fn show_outcome(&mut self, outcome: Outcome) {
        if let Some(detail) = outcome.detail {
            self.detail = detail;
            self.taxonomy_link = outcome.taxonomy_link;
            self.sequence = match &outcome.target {
                Some(target) => self.session.protein_sequence(&target.gene_name),
                None => NO_SEQUENCE.to_string(),
            };
        }
        if outcome.hits != HitsPane::Unchanged {
            self.hits = outcome.hits;
            self.hits_view = Viewport::new(self.hits_view.visible_rows);
        }
    }

    /// Enter on the focused pane.
    pub fn activate(&mut self) {
        match self.focus {
            Pane::Plot => match self.gene_at_plot_cursor() {
                Some(gene) => self.dispatch(EventKind::PlotClick(gene)),
                None => self.status_message = Some("No gene plotted".to_string()),
            },
            Pane::Selection => {
                if self.row_count(Pane::Selection) > 0 {
                    self.dispatch(EventKind::TableCellClick(self.selection.cursor));
                }
            }
            Pane::Legend => self.toggle_legend_entry(),
            Pane::Hits => {}
        }
    }

    fn toggle_legend_entry(&mut self) {
        let index = self.legend.cursor;
        let Some(label) = self.session.legend().legend_order().get(index) else {
            return;
        };
        let visibility = if self.session.legend().is_visible(label) {
            LegendVisibility::LegendOnly
        } else {
            LegendVisibility::Visible
        };
        self.dispatch(EventKind::LegendToggle(BTreeMap::from([(index, visibility)])));
    }

    /// Matrix click on the gene under the plot cursor.
    pub fn matrix_click(&mut self) {
        if let Some(gene) = self.gene_at_plot_cursor() {
            self.dispatch(EventKind::MatrixClick(gene));
        }
    }

    /// Box selection of the plot rows currently on screen.
    pub fn matrix_select_visible(&mut self) {
        let records = self.session.store().all_records();
        let range = self.plot.row_range(self.session.view().len());
        let genes: Vec<String> = range
            .filter_map(|row| self.session.view().record(records, row))
            .map(|record| record.gene_name.clone())
            .collect();
        if genes.is_empty() {
            return;
        }
        self.status_message = Some(format!("Box-selected {} genes", genes.len()));
        self.dispatch(EventKind::MatrixMultiSelect(genes));
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.session.set_mode(mode);
        self.status_message = Some(format!("Selection mode: {}", mode));
    }

    pub fn reset_selection(&mut self) {
        self.dispatch(EventKind::ResetButton);
        self.status_message = Some("Selection cleared".to_string());
    }

    pub fn add_visible(&mut self) {
        let before = self.session.selection().len();
        self.dispatch(EventKind::AddVisibleButton);
        let added = self.session.selection().len().saturating_sub(before);
        self.status_message = Some(format!("Added {} visible genes", added));
    }

    pub fn reload_session(&mut self) {
        let before = self.session.selection().len();
        self.dispatch(EventKind::ReloadSession);
        let added = self.session.selection().len().saturating_sub(before);
        self.status_message = Some(format!("Reloaded {} genes from the save file", added));
    }

    /// Moves the e-value slider by `delta`, clamped to its range.
    pub fn move_slider(&mut self, delta: i64) {
        let slider = (self.session.evalue_slider() as i64 + delta).clamp(0, EVALUE_SLIDER_MAX as i64);
        self.set_slider(slider as u32);
    }

    fn set_slider(&mut self, slider: u32) {
        self.session.set_evalue_slider(slider);
        self.clamp_all();
        self.status_message = Some(format!(
            "e-value < {:.3e} ({} genes plotted)",
            self.session.filter().evalue_threshold,
            self.session.view().len()
        ));
    }

    pub fn restrict_contigs(&mut self) {
        self.session.restrict_to_selected_contigs();
        self.clamp_all();
        self.status_message = Some(format!(
            "Showing contigs of the selection ({} genes plotted)",
            self.session.view().len()
        ));
    }

    pub fn clear_contigs(&mut self) {
        self.session.clear_contigs();
        self.clamp_all();
        self.status_message = Some("All contigs hidden".to_string());
    }

    pub fn all_contigs(&mut self) {
        self.session.all_contigs();
        self.clamp_all();
        self.status_message = Some("All contigs shown".to_string());
    }

    /// Sets the selection table columns.
    ///
    /// Names may be comma separated; a metric family such as `g_cov_` shows
    /// every replicate. The request is kept unchanged when nothing matches.
    pub fn set_table_columns<S: AsRef<str>>(&mut self, requested: &[S]) {
        let requested: Vec<String> = requested
            .iter()
            .flat_map(|arg| arg.as_ref().split(','))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        let known = self.session.store().describe_columns(&requested);
        if known.is_empty() {
            self.status_message = Some(format!("No such column: {}", requested.join(", ")));
            return;
        }
        let labels: Vec<&str> = known.iter().map(|c| c.display_name()).collect();
        self.status_message = Some(format!("Selection columns: {}", labels.join(", ")));
        self.table_columns = requested;
    }

    pub fn show_help(&mut self) {
        self.overlay = Some(Overlay::Help);
    }

    pub fn dismiss_overlay(&mut self) {
        self.overlay = None;
    }

    /// Enters command mode.
    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    /// Handles a character input in command mode.
    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    /// Handles backspace in command mode.
    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.pop();
            if cmd.is_empty() {
                self.mode = AppMode::Normal;
            }
        }
    }

    /// Cancels command mode and returns to normal mode.
    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Executes the current command.
    pub fn execute_command(&mut self) {
        let AppMode::Command(cmd) = std::mem::take(&mut self.mode) else {
            return;
        };
        let mut parts = cmd.split_whitespace();
        let name = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match name {
            "q" | "quit" => self.should_quit = true,
            "h" | "help" => self.show_help(),
            "summary" => self.overlay = Some(Overlay::Summary(self.session.summary())),
            "columns" | "cols" => {
                if args.is_empty() {
                    self.overlay = Some(Overlay::Columns);
                } else {
                    self.set_table_columns(&args);
                }
            }
            "datasets" | "ls" => {
                let names: Vec<String> = self
                    .session
                    .datasets()
                    .iter()
                    .enumerate()
                    .map(|(i, d)| format!("{}:{}", i + 1, d.name()))
                    .collect();
                self.status_message = Some(names.join("  "));
            }
            "open" | "dataset" => match args.first() {
                Some(target) => self.open_dataset(target),
                None => self.status_message = Some("Usage: open <name|number>".to_string()),
            },
            "evalue" => match args.first().and_then(|s| s.parse::<u32>().ok()) {
                Some(slider) => self.set_slider(slider.min(EVALUE_SLIDER_MAX)),
                None => {
                    self.status_message = Some(format!("Usage: evalue <0-{}>", EVALUE_SLIDER_MAX))
                }
            },
            "export" => {
                let columns: Vec<&str> = args
                    .iter()
                    .flat_map(|a| a.split(','))
                    .filter(|c| !c.is_empty())
                    .collect();
                self.status_message = Some(match self.session.export_selection_csv(&columns) {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(e) => format!("Export failed: {}", e),
                });
            }
            "fasta" => {
                self.status_message = Some(match self.session.export_selected_proteins() {
                    Ok(path) => format!("Saved to {}", path.display()),
                    Err(e) => format!("Export failed: {}", e),
                });
            }
            _ => self.status_message = Some(format!("Unknown command: {}", cmd)),
        }
    }

    /// Switches dataset by 1-based number or name.
    fn open_dataset(&mut self, target: &str) {
        let result = match target.parse::<usize>() {
            Ok(number) if number >= 1 => self.session.switch_dataset(number - 1),
            _ => self.session.switch_dataset_by_name(target),
        };
        match result {
            Ok(()) => {
                self.detail = INITIAL_DETAIL.to_string();
                self.sequence = NO_SEQUENCE.to_string();
                self.taxonomy_link = None;
                self.hits = HitsPane::Cleared;
                for pane in [Pane::Plot, Pane::Legend, Pane::Selection, Pane::Hits] {
                    let viewport = self.viewport_mut(pane);
                    *viewport = Viewport::new(viewport.visible_rows);
                }
                self.status_message = Some(format!("Opened {}", self.session.dataset_name()));
            }
            Err(e) => self.status_message = Some(format!("Cannot open {}: {}", target, e)),
        }
    }

    pub fn enter_search_mode(&mut self) {
        self.mode = AppMode::Search(String::new());
    }

    pub fn search_input(&mut self, c: char) {
        if let AppMode::Search(ref mut text) = self.mode {
            text.push(c);
        }
    }

    pub fn search_backspace(&mut self) {
        if let AppMode::Search(ref mut text) = self.mode {
            text.pop();
        }
    }

    pub fn cancel_search(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Submits the search; an empty search clears the active one.
    pub fn execute_search(&mut self) {
        let AppMode::Search(text) = std::mem::take(&mut self.mode) else {
            return;
        };
        self.dispatch(EventKind::SearchSubmit(text.trim().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::formats::DatasetPaths;
    use crate::session::SessionConfig;

    const TABLE: &str = "\
g_name,c_name,fasta_header,bh_evalue,plot_label
g1,contig_1,prot_1,1e-30,Mammalia
g2,contig_1,prot_2,0.01,Bacteria
g3,contig_2,prot_3,1e-5,Bacteria
";

    fn app() -> (TempDir, AppState) {
        let dir = tempdir().unwrap();
        for name in ["run1", "run2"] {
            let paths = DatasetPaths::new(dir.path().join(name));
            fs::create_dir_all(paths.gene_table().parent().unwrap()).unwrap();
            fs::write(paths.gene_table(), TABLE).unwrap();
        }
        let session = Session::open(dir.path(), None, SessionConfig::default()).unwrap();
        let mut state = AppState::new(session);
        state.update_viewport_size(VisibleRows {
            plot: 2,
            legend: 5,
            selection: 5,
            hits: 5,
        });
        (dir, state)
    }

    #[test]
    fn test_viewport_scrolls_with_cursor() {
        let mut viewport = Viewport::new(2);
        viewport.move_by(3, 5);
        assert_eq!(viewport.cursor, 3);
        assert_eq!(viewport.first_row, 2);
        assert_eq!(viewport.row_range(5), 2..4);

        viewport.move_by(-10, 5);
        assert_eq!(viewport.cursor, 0);
        assert_eq!(viewport.first_row, 0);

        viewport.goto(9, 3);
        assert_eq!(viewport.cursor, 2);
        assert_eq!(viewport.row_range(3), 1..3);
    }

    #[test]
    fn test_focus_cycle() {
        let mut pane = Pane::Plot;
        for _ in 0..4 {
            pane = pane.next();
        }
        assert_eq!(pane, Pane::Plot);
        assert_eq!(Pane::Plot.previous(), Pane::Hits);
    }

    #[test]
    fn test_activate_plot_row_in_add_mode() {
        let (_dir, mut state) = app();
        state.set_selection_mode(SelectionMode::Add);
        state.move_cursor(1);
        state.activate();

        assert_eq!(state.session.selection().to_tokens(), vec!["g2"]);
        assert!(state.detail.contains("Gene: g2"));
        assert_eq!(state.sequence, NO_SEQUENCE);
        assert_eq!(state.hits, HitsPane::Unavailable);
    }

    #[test]
    fn test_legend_toggle_from_pane() {
        let (_dir, mut state) = app();
        state.focus = Pane::Legend;
        state.move_cursor(1);
        state.activate();
        assert!(!state.session.legend().is_visible("Bacteria"));

        state.add_visible();
        assert_eq!(state.session.selection().to_tokens(), vec!["g1"]);
        assert_eq!(state.status_message.as_deref(), Some("Added 1 visible genes"));
    }

    #[test]
    fn test_box_select_visible_rows() {
        let (_dir, mut state) = app();
        state.matrix_select_visible();
        assert_eq!(state.session.selection().to_tokens(), vec!["g1", "g2"]);
    }

    #[test]
    fn test_selection_cursor_clamped_after_reset() {
        let (_dir, mut state) = app();
        state.matrix_select_visible();
        state.focus = Pane::Selection;
        state.move_cursor(1);
        assert_eq!(state.selection.cursor, 1);

        state.reset_selection();
        assert_eq!(state.selection.cursor, 0);
        assert!(state.session.selection().is_empty());
    }

    #[test]
    fn test_slider_clamped() {
        let (_dir, mut state) = app();
        state.move_slider(-5);
        assert_eq!(state.session.evalue_slider(), 0);
        state.move_slider(10);
        assert_eq!(state.session.view().len(), 2);
        state.move_slider(1000);
        assert_eq!(state.session.evalue_slider(), EVALUE_SLIDER_MAX);
    }

    #[test]
    fn test_search_mode() {
        let (_dir, mut state) = app();
        state.enter_search_mode();
        for c in "g3".chars() {
            state.search_input(c);
        }
        state.execute_search();
        assert_eq!(state.mode, AppMode::Normal);
        assert_eq!(state.session.search_text(), Some("g3"));
        assert!(state.detail.contains("Gene: g3"));
    }

    #[test]
    fn test_commands() {
        let (_dir, mut state) = app();
        for (cmd, check) in [("open 2", "Opened run2"), ("open nope", "Cannot open nope")] {
            state.enter_command_mode();
            for c in cmd.chars() {
                state.command_input(c);
            }
            state.execute_command();
            assert!(state.status_message.as_deref().unwrap().starts_with(check));
        }
        assert_eq!(state.session.dataset_name(), "run2");

        state.enter_command_mode();
        state.command_input('q');
        state.execute_command();
        assert!(state.should_quit);
    }

    fn run_command(state: &mut AppState, cmd: &str) {
        state.enter_command_mode();
        for c in cmd.chars() {
            state.command_input(c);
        }
        state.execute_command();
    }

    #[test]
    fn test_columns_command() {
        let (_dir, mut state) = app();
        run_command(&mut state, "columns bh_evalue,nope g_name");
        assert_eq!(state.table_columns, vec!["bh_evalue", "nope", "g_name"]);
        assert_eq!(
            state.status_message.as_deref(),
            Some("Selection columns: bh_evalue, g_name")
        );

        run_command(&mut state, "columns nope");
        assert_eq!(state.table_columns, vec!["bh_evalue", "nope", "g_name"]);
        assert_eq!(state.status_message.as_deref(), Some("No such column: nope"));

        run_command(&mut state, "columns");
        assert_eq!(state.overlay, Some(Overlay::Columns));
    }

    #[test]
    fn test_summary_overlay() {
        let (_dir, mut state) = app();
        state.enter_command_mode();
        for c in "summary".chars() {
            state.command_input(c);
        }
        state.execute_command();
        assert_eq!(
            state.overlay,
            Some(Overlay::Summary("File summary.txt not found".to_string()))
        );
        state.dismiss_overlay();
        assert_eq!(state.overlay, None);
    }
}
