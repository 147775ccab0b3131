//! TUI rendering module.
//!
//! Layout:
//! - plot table (one row per plotted gene, coloured by taxon) with the legend
//!   and the detail/sequence pane on its right
//! - selection table and taxonomic hits table below
//! - status bar with input line, selection mode and filter state
//!
//! Help and the run summary are drawn as overlays.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::formats::gene_table::{BEST_HIT_EVALUE_COL, GENE_NAME_COL};
use crate::formats::hits::format_significant;
use crate::model::{ColumnDescriptor, GeneRecord};
use crate::palette::Rgb;
use crate::reconcile::HitsPane;
use crate::state::{AppMode, AppState, Overlay, Pane, VisibleRows};

/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;
/// Height of the selection and hits tables (including borders).
const BOTTOM_PANEL_HEIGHT: u16 = 10;
/// Width of the legend and detail column.
const SIDE_PANEL_WIDTH: u16 = 44;
/// Height of the legend (including borders).
const LEGEND_HEIGHT: u16 = 12;
/// Minimum height of the plot table.
const MIN_PLOT_HEIGHT: u16 = 5;
/// Minimum width of the plot table.
const MIN_PLOT_WIDTH: u16 = 30;
/// Borders plus the column header row.
const TABLE_CHROME: u16 = 3;

const GENE_WIDTH: usize = 18;
const CONTIG_WIDTH: usize = 16;
const LABEL_WIDTH: usize = 26;
const DIM_WIDTH: usize = 8;
const EVALUE_WIDTH: usize = 9;
/// Narrowest selection table column.
const MIN_COLUMN_WIDTH: usize = 6;

const HELP_TEXT: &[&str] = &[
    "Navigation",
    "  j/k, arrows       move in the focused pane",
    "  PgUp/PgDn ^U/^D   page / half page",
    "  Home/End          first / last row",
    "  Tab / Shift+Tab   next / previous pane",
    "",
    "Selection",
    "  Enter             click plot row, selection row, or toggle legend entry",
    "  m                 matrix click on the plot row",
    "  M                 box-select the plot rows on screen",
    "  a / r / n         mode ADD / REMOVE / NEUTRAL",
    "  R                 reset the selection",
    "  A                 add every visible gene",
    "  L                 reload the saved selection",
    "  /                 search a gene (empty search clears)",
    "",
    "Filters",
    "  + / -             e-value slider by 1",
    "  } / {             e-value slider by 10",
    "  c / X / C         selected contigs / no contig / all contigs",
    "",
    "Commands",
    "  :open <name|n>    switch dataset      :datasets   list datasets",
    "  :export [a,b]     write selection.csv :fasta      write selected proteins",
    "  :evalue <n>       set the slider      :summary    run summary",
    "  :columns [a,b]    selection table columns (no argument lists them)",
    "  :q                quit                ?           this help",
];

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MIN_PLOT_HEIGHT),
            Constraint::Length(BOTTOM_PANEL_HEIGHT),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);

    let top_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(MIN_PLOT_WIDTH), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(main_layout[0]);

    let side_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(LEGEND_HEIGHT), Constraint::Min(3)])
        .split(top_layout[1]);

    let bottom_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_layout[1]);

    render_plot_panel(frame, state, top_layout[0]);
    render_legend_panel(frame, state, side_layout[0]);
    render_detail_panel(frame, state, side_layout[1]);
    render_selection_panel(frame, state, bottom_layout[0]);
    render_hits_panel(frame, state, bottom_layout[1]);
    render_status_bar(frame, state, main_layout[2]);

    match &state.overlay {
        Some(Overlay::Help) => render_overlay(frame, "Help", HELP_TEXT.join("\n")),
        Some(Overlay::Summary(summary)) => render_overlay(frame, "Summary", summary.clone()),
        Some(Overlay::Columns) => render_overlay(frame, "Columns", columns_text(state)),
        None => {}
    }
}

/// Converts a palette colour to a terminal colour.
pub fn to_color(colour: Rgb) -> Color {
    Color::Rgb(colour.0, colour.1, colour.2)
}

/// Pads or truncates `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let truncated: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", truncated)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

fn format_dim(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:>width$.3}", v, width = DIM_WIDTH),
        None => format!("{:>width$}", "NA", width = DIM_WIDTH),
    }
}

fn format_evalue(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |e| format_significant(e, 3))
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title)
}

fn cursor_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn header_line(text: String) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

/// Renders the plot table: one row per plotted gene.
fn render_plot_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let session = &state.session;
    let view = session.view();
    let records = session.store().all_records();
    let focused = state.focus == Pane::Plot;

    let mut lines = vec![header_line(format!(
        "    {} {} {} {:>w$} {:>w$} {:>w$} {:>ew$}",
        fit("gene", GENE_WIDTH),
        fit("contig", CONTIG_WIDTH),
        fit("label", LABEL_WIDTH),
        "Dim.1",
        "Dim.2",
        "Dim.3",
        "e-value",
        w = DIM_WIDTH,
        ew = EVALUE_WIDTH,
    ))];

    let range = state.plot.row_range(view.len());
    let rows = &view.rows()[range.clone()];
    let visible: Vec<&GeneRecord> = rows.iter().filter_map(|row| records.get(row.index)).collect();
    let annotated = session.selection().annotate(visible);

    for ((row_idx, row), (record, selected)) in range.zip(rows).zip(annotated) {
        let is_cursor = row_idx == state.plot.cursor;
        let text = format!(
            "{} {} {} {} {} {} {} {:>ew$}",
            if selected { '*' } else { ' ' },
            fit(&record.gene_name, GENE_WIDTH),
            fit(&record.contig_name, CONTIG_WIDTH),
            fit(&row.display_label, LABEL_WIDTH),
            format_dim(record.dims[0]),
            format_dim(record.dims[1]),
            format_dim(record.dims[2]),
            format_evalue(record.best_hit_evalue),
            ew = EVALUE_WIDTH,
        );
        let visible_label = session.legend().is_visible(&record.plot_label);
        let marker = if visible_label { "● " } else { "○ " };
        let style = if is_cursor {
            cursor_style(focused)
        } else if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(to_color(row.colour))),
            Span::styled(text, style),
        ]));
    }

    let unselected = session
        .selection()
        .unselected_rows(view.records(records))
        .len();
    let title = format!(
        "Plot: {} [{} of {} genes | {} unselected]",
        session.dataset_name(),
        view.len(),
        session.store().len(),
        unselected
    );
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, focused)), area);
}

/// Renders the legend with each label's colour and visibility.
fn render_legend_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let session = &state.session;
    let legend = session.legend();
    let focused = state.focus == Pane::Legend;
    let width = (area.width as usize).saturating_sub(4);

    let range = state.legend.row_range(legend.legend_order().len());
    let lines: Vec<Line> = legend
        .entries()
        .enumerate()
        .skip(range.start)
        .take(range.len())
        .map(|(idx, (label, visible))| {
            let colour = session.view().colour_of(label).map_or(Color::Gray, to_color);
            let (marker, text_style) = if visible {
                ("● ", Style::default())
            } else {
                ("○ ", Style::default().fg(Color::DarkGray))
            };
            let style = if idx == state.legend.cursor {
                cursor_style(focused)
            } else {
                text_style
            };
            let entry = format!("{} ({})", label, session.view().count_of(label));
            Line::from(vec![
                Span::styled(marker, Style::default().fg(colour)),
                Span::styled(fit(&entry, width), style),
            ])
        })
        .collect();

    let title = format!("Legend ({})", legend.legend_order().len());
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, focused)), area);
}

/// Renders the detail text and the wrapped protein sequence.
fn render_detail_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let width = (area.width as usize).saturating_sub(2).max(1);
    let mut lines: Vec<Line> = state
        .detail
        .lines()
        .flat_map(|line| textwrap::wrap(line, width))
        .map(|line| Line::from(line.into_owned()))
        .collect();

    if let Some(link) = &state.taxonomy_link {
        lines.push(Line::from(Span::styled(
            link.clone(),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        )));
    }

    lines.push(Line::from(""));
    lines.push(header_line("Sequence".to_string()));
    lines.extend(
        textwrap::wrap(&state.sequence, width)
            .into_iter()
            .map(|line| Line::from(Span::styled(line.into_owned(), Style::default().fg(Color::Green)))),
    );

    let title = match state.session.search_text() {
        Some(search) => format!("Detail [search: {}]", search),
        None => "Detail".to_string(),
    };
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, false)), area);
}

/// Renders the table of selected genes with the chosen columns.
fn render_selection_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let session = &state.session;
    let store = session.store();
    let rows = session.selected_rows();
    let focused = state.focus == Pane::Selection;

    let mut columns = store.describe_columns(&state.table_columns);
    if columns.is_empty() {
        columns = store.describe_columns(&[GENE_NAME_COL]);
    }
    let inner_width = (area.width as usize).saturating_sub(2);
    let width = (inner_width / columns.len().max(1))
        .saturating_sub(1)
        .max(MIN_COLUMN_WIDTH);

    let header: Vec<String> = columns.iter().map(|c| fit(c.display_name(), width)).collect();
    let mut lines = vec![header_line(header.join(" "))];

    let range = state.selection.row_range(rows.len());
    for (row_idx, record) in range.clone().zip(&rows[range]) {
        let style = if row_idx == state.selection.cursor {
            cursor_style(focused)
        } else {
            Style::default()
        };
        let cells: Vec<String> = columns
            .iter()
            .map(|column| fit(&cell_text(store.value_of(record, &column.name), column), width))
            .collect();
        lines.push(Line::from(Span::styled(cells.join(" "), style)));
    }

    let title = format!("Selection ({})", rows.len());
    frame.render_widget(Paragraph::new(lines).block(panel_block(title, focused)), area);
}

/// Text of one selection table cell; e-values are shortened.
fn cell_text(value: Option<&str>, column: &ColumnDescriptor) -> String {
    match value {
        None | Some("") => "NA".to_string(),
        Some(raw) if column.name == BEST_HIT_EVALUE_COL => raw
            .parse::<f64>()
            .map_or_else(|_| raw.to_string(), |e| format_significant(e, 3)),
        Some(raw) => raw.to_string(),
    }
}

/// Selectable columns with their labels and descriptions.
fn columns_text(state: &AppState) -> String {
    let store = state.session.store();
    let shown: Vec<&str> = store
        .describe_columns(&state.table_columns)
        .into_iter()
        .map(|c| c.name.as_str())
        .collect();
    store
        .selectable_variables()
        .iter()
        .map(|column| {
            let marker = if shown.contains(&column.name.as_str()) { '*' } else { ' ' };
            match &column.details {
                Some(details) if !details.is_empty() => {
                    format!("{} {:<20} {} - {}", marker, column.name, column.display_name(), details)
                }
                _ => format!("{} {:<20} {}", marker, column.name, column.display_name()),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the taxonomic hits of the clicked gene.
fn render_hits_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let focused = state.focus == Pane::Hits;
    let dim = Style::default().fg(Color::DarkGray);

    let (title, lines) = match &state.hits {
        HitsPane::Rows(rows) => {
            let mut lines = vec![header_line(format!(
                "{} {} {:>8} {:>6} {:>6} {:>ew$} {:>7}",
                fit("subject", 14),
                fit("taxon", 22),
                "taxid",
                "pident",
                "len",
                "e-value",
                "bits",
                ew = EVALUE_WIDTH,
            ))];
            let range = state.hits_view.row_range(rows.len());
            for (row_idx, hit) in range.clone().zip(&rows[range]) {
                let style = if row_idx == state.hits_view.cursor {
                    cursor_style(focused)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(
                    format!(
                        "{} {} {:>8} {:>6.1} {:>6} {:>ew$} {:>7.1}",
                        fit(&hit.subject_id, 14),
                        fit(&hit.taxon_name, 22),
                        hit.taxon_id,
                        hit.percent_identity,
                        hit.length,
                        hit.evalue,
                        hit.bit_score,
                        ew = EVALUE_WIDTH,
                    ),
                    style,
                )));
            }
            (format!("Taxonomic hits ({})", rows.len()), lines)
        }
        HitsPane::Unavailable => (
            "Taxonomic hits".to_string(),
            vec![Line::from(Span::styled("No taxonomic hits data for this dataset", dim))],
        ),
        HitsPane::Cleared | HitsPane::Unchanged if !state.session.store().hits_available() => (
            "Taxonomic hits".to_string(),
            vec![Line::from(Span::styled("No taxonomic hits data for this dataset", dim))],
        ),
        HitsPane::Cleared | HitsPane::Unchanged => (
            "Taxonomic hits".to_string(),
            vec![Line::from(Span::styled("Click a gene to list its hits", dim))],
        ),
    };

    frame.render_widget(Paragraph::new(lines).block(panel_block(title, focused)), area);
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let session = &state.session;
    let (mode_str, input) = match &state.mode {
        AppMode::Normal => ("NORMAL", None),
        AppMode::Command(cmd) => ("COMMAND", Some(format!(":{}", cmd))),
        AppMode::Search(text) => ("SEARCH", Some(format!("/{}", text))),
    };

    let message = state.status_message.as_deref().unwrap_or("");
    let left_content = match input {
        Some(input) => format!(" {} | {} ", mode_str, input),
        None => format!(" {} | {} ", mode_str, message),
    };

    let position_info = format!(
        "{} | e-value < {:.1e} | {} selected | {} ",
        session.mode(),
        session.filter().evalue_threshold,
        session.selection().len(),
        state.focus,
    );

    let left_len = left_content.chars().count();
    let status_line = Line::from(vec![
        Span::styled(left_content, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(
            " ".repeat((area.width as usize).saturating_sub(left_len + position_info.len())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

/// Draws `text` in a centered box over the panes.
fn render_overlay(frame: &mut Frame, title: &str, text: String) {
    let area = centered_rect(80, 80, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} (any key to close)", title));
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// A rectangle of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Calculates the visible row counts of the list panes.
pub fn calculate_visible_dimensions(terminal_height: u16) -> VisibleRows {
    let plot_height = terminal_height
        .saturating_sub(STATUS_BAR_HEIGHT + BOTTOM_PANEL_HEIGHT)
        .max(MIN_PLOT_HEIGHT);
    VisibleRows {
        plot: plot_height.saturating_sub(TABLE_CHROME) as usize,
        legend: LEGEND_HEIGHT.saturating_sub(2) as usize,
        selection: BOTTOM_PANEL_HEIGHT.saturating_sub(TABLE_CHROME) as usize,
        hits: BOTTOM_PANEL_HEIGHT.saturating_sub(TABLE_CHROME) as usize,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::ops::Range;

    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    use super::*;
    use crate::formats::DatasetPaths;
    use crate::glossary::Glossary;
    use crate::session::{Session, SessionConfig};

    #[test]
    fn test_visible_dimensions() {
        // 50 - 1 (status) - 10 (bottom) = 39 rows, minus borders and header
        let rows = calculate_visible_dimensions(50);
        assert_eq!(rows.plot, 36);
        assert_eq!(rows.legend, 10);
        assert_eq!(rows.selection, 7);
        assert_eq!(rows.hits, 7);

        // Tiny terminals keep a minimal plot
        assert_eq!(calculate_visible_dimensions(4).plot, 2);
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("Ψυχή", 4), "Ψυχή");
    }

    #[test]
    fn test_to_color() {
        assert_eq!(to_color(Rgb(1, 2, 3)), Color::Rgb(1, 2, 3));
    }

    fn session_with(table: &str, glossary: Glossary) -> (tempfile::TempDir, AppState) {
        let dir = tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path().join("run1"));
        fs::create_dir_all(paths.gene_table().parent().unwrap()).unwrap();
        fs::write(paths.gene_table(), table).unwrap();
        let config = SessionConfig {
            glossary,
            ..SessionConfig::default()
        };
        let session = Session::open(dir.path(), None, config).unwrap();
        let mut state = AppState::new(session);
        state.update_viewport_size(calculate_visible_dimensions(40));
        (dir, state)
    }

    fn render_to_string(state: &AppState) -> String {
        render_region(state, 0..140, 0..40)
    }

    /// Renders on a 140x40 screen and keeps the cells in `columns` x `rows`.
    fn render_region(state: &AppState, columns: Range<usize>, rows: Range<usize>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(frame, state)).unwrap();
        let content = terminal.backend().buffer().content();
        let text: String = rows
            .flat_map(|y| columns.clone().map(move |x| y * 140 + x))
            .map(|idx| content[idx].symbol())
            .collect();
        text
    }

    #[test]
    fn test_render_shows_dataset() {
        let (_dir, mut state) = session_with(
            "g_name,c_name,fasta_header,bh_evalue,plot_label\ng1,contig_1,prot_1,1e-30,Mammalia\n",
            Glossary::default(),
        );
        state.show_help();

        let screen = render_to_string(&state);
        assert!(screen.contains("Plot: run1"));
        assert!(screen.contains("Mammalia (1)"));
        assert!(screen.contains("NEUTRAL"));
        assert!(screen.contains("Help"));
    }

    #[test]
    fn test_render_selection_columns_and_link() {
        let glossary = Glossary::from_json(r#"{"bh_evalue": {"short": "Best hit e-value"}}"#).unwrap();
        let (_dir, mut state) = session_with(
            "g_name,c_name,fasta_header,best_hit,bh_evalue,plot_label\n\
             g1,contig_1,prot_1,Homo sapiens,1.2345e-30,Mammalia\n",
            glossary,
        );
        state.matrix_click();
        state.activate();

        let screen = render_to_string(&state);
        assert!(screen.contains("Best hit e-value"));
        assert!(screen.contains("1.23e-30"));
        assert!(screen.contains("http://www.ncbi.nlm.nih.gov/taxonomy"));
        assert!(screen.contains("No taxonomic hits data for this dataset"));

        // Legend column right of the plot, above the detail pane
        let legend = render_region(&state, 96..140, 0..12);
        assert!(legend.contains("Mammalia (1)"));

        state.set_table_columns(&["c_name"]);
        let screen = render_to_string(&state);
        assert!(!screen.contains("Best hit e-value"));
    }

    #[test]
    fn test_cell_text() {
        let glossary = Glossary::default();
        let evalue = glossary.describe("bh_evalue");
        assert_eq!(cell_text(Some("1.23456e-10"), &evalue), "1.23e-10");
        assert_eq!(cell_text(Some("n/a"), &evalue), "n/a");
        assert_eq!(cell_text(Some(""), &evalue), "NA");
        assert_eq!(cell_text(None, &glossary.describe("c_name")), "NA");
    }
}
