//! Selection reconciler.
//!
//! Every user interaction (plot click, matrix click or multi-select, click in
//! the selection table, search, buttons, legend toggles) is turned into one
//! [`EventKind`] and handled by [`Reconciler::handle`], which:
//! - writes the event payload into its input channel,
//! - resolves the clicked gene over all channels in a fixed priority order,
//! - applies the selection mode to the clicked gene,
//! - runs the button action, if any,
//! - and returns the text and hits to show for the target.
//!
//! Channel payloads persist between invocations (search text stays active
//! until an empty search is submitted). An active search only decides which
//! gene the detail pane describes; clicks keep mutating the selection. A per-channel memo of the last
//! processed payload makes a repeated identical event a no-op, so clicking
//! the same point twice does not toggle it twice.

use std::collections::BTreeMap;

use crate::filter::FilteredView;
use crate::formats::hits::format_shortest;
use crate::formats::savefile::SaveStore;
use crate::legend::{LegendVisibility, LegendVisibilityMap};
use crate::model::{HitRow, SelectionMode};
use crate::selection::SelectionSet;
use crate::store::RecordStore;

/// Detail text when the target matches no gene.
pub const NO_MATCHING_GENES: &str = "No matching genes found";

/// NCBI taxonomy search, completed with the best hit name.
pub const TAXONOMY_SEARCH_URL: &str = "http://www.ncbi.nlm.nih.gov/taxonomy/?term=";

/// One discrete user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Click on a point of the main plot
    PlotClick(String),
    /// Click on a point of the scatter matrix
    MatrixClick(String),
    /// Box/lasso selection in the scatter matrix
    MatrixMultiSelect(Vec<String>),
    /// Click on a row of the selection table
    TableCellClick(usize),
    /// Search bar submission; empty text clears the search
    SearchSubmit(String),
    ResetButton,
    AddVisibleButton,
    ReloadSession,
    /// Legend entries shown or hidden, by legend position
    LegendToggle(BTreeMap<usize, LegendVisibility>),
}

impl EventKind {
    fn name(&self) -> &'static str {
        match self {
            EventKind::PlotClick(_) => "plot click",
            EventKind::MatrixClick(_) => "matrix click",
            EventKind::MatrixMultiSelect(_) => "matrix multi-select",
            EventKind::TableCellClick(_) => "table cell click",
            EventKind::SearchSubmit(_) => "search",
            EventKind::ResetButton => "reset",
            EventKind::AddVisibleButton => "add visible",
            EventKind::ReloadSession => "reload",
            EventKind::LegendToggle(_) => "legend toggle",
        }
    }
}

/// Where the target of an invocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    PlotClick,
    TableClick,
    Search,
}

/// The gene an invocation is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub gene_name: String,
    pub source: TargetSource,
}

/// What the taxonomic hits table should show after an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HitsPane {
    /// Keep whatever is shown
    Unchanged,
    /// No clicked point this round
    Cleared,
    /// A point was clicked but the dataset has no hits table
    Unavailable,
    Rows(Vec<HitRow>),
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// New detail text, `None` when the event leaves the detail pane alone
    pub detail: Option<String>,
    pub target: Option<Target>,
    pub hits: HitsPane,
    /// Taxonomy link of the clicked point's best hit
    pub taxonomy_link: Option<String>,
}

/// Shared state an invocation reads and mutates.
pub struct ReconcileContext<'a> {
    pub store: &'a RecordStore,
    pub view: &'a FilteredView,
    pub selection: &'a mut SelectionSet,
    pub legend: &'a mut LegendVisibilityMap,
    pub saves: &'a mut dyn SaveStore,
    pub mode: SelectionMode,
}

/// Current payload of each input channel.
#[derive(Debug, Clone, Default)]
struct Channels {
    plot_click: Option<String>,
    matrix_click: Option<String>,
    matrix_select: Option<Vec<String>>,
    table_cell: Option<usize>,
    search: Option<String>,
}

/// Last processed payload of each channel.
#[derive(Debug, Clone, Default)]
struct Memos {
    plot_click: Option<String>,
    matrix_click: Option<String>,
    matrix_select: Option<Vec<String>>,
    last_target: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    channels: Channels,
    memos: Memos,
    first_hit_only: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows only the first hit per taxon in the hits pane.
    pub fn with_first_hit_only(mut self, first_hit_only: bool) -> Self {
        self.first_hit_only = first_hit_only;
        self
    }

    /// Forgets every channel payload and memo, as after a dataset switch.
    pub fn reset(&mut self) {
        self.channels = Channels::default();
        self.memos = Memos::default();
    }

    /// Active search text, if any.
    pub fn search_text(&self) -> Option<&str> {
        self.channels.search.as_deref()
    }

    /// Gene targeted by the last invocation that resolved one.
    pub fn last_target(&self) -> Option<&str> {
        self.memos.last_target.as_deref()
    }

    /// Handles one event.
    pub fn handle(&mut self, event: EventKind, ctx: &mut ReconcileContext<'_>) -> Outcome {
        log::debug!("Handling {} in {} mode", event.name(), ctx.mode);

        let is_plot_click = matches!(event, EventKind::PlotClick(_));
        let button = match event {
            EventKind::LegendToggle(toggles) => {
                ctx.legend.apply_toggle_event(&toggles);
                return Outcome {
                    detail: None,
                    target: None,
                    hits: HitsPane::Unchanged,
                    taxonomy_link: None,
                };
            }
            EventKind::PlotClick(gene) => {
                self.channels.plot_click = Some(gene);
                None
            }
            EventKind::MatrixClick(gene) => {
                self.channels.matrix_click = Some(gene);
                None
            }
            EventKind::MatrixMultiSelect(genes) => {
                self.channels.matrix_select = Some(genes);
                None
            }
            EventKind::TableCellClick(row) => {
                self.channels.table_cell = Some(row);
                None
            }
            EventKind::SearchSubmit(text) => {
                self.channels.search = if text.trim().is_empty() { None } else { Some(text) };
                None
            }
            button @ (EventKind::ResetButton
            | EventKind::AddVisibleButton
            | EventKind::ReloadSession) => Some(button),
        };

        // Matrix interactions select even in neutral mode
        if let Some(genes) = fresh(&self.channels.matrix_select, &mut self.memos.matrix_select) {
            for gene in &genes {
                apply_matrix_mode(ctx, gene);
            }
        } else if let Some(gene) = fresh(&self.channels.matrix_click, &mut self.memos.matrix_click) {
            apply_matrix_mode(ctx, &gene);
        }

        let mut clicked = None;
        let mut hits_query = None;

        if let Some(gene) = fresh(&self.channels.plot_click, &mut self.memos.plot_click) {
            hits_query = ctx.store.lookup_fasta_header(&gene).map(str::to_string);
            clicked = Some(Target {
                gene_name: gene,
                source: TargetSource::PlotClick,
            });
        }

        if let Some(row) = self.channels.table_cell.take() {
            let selected = ctx.selection.selected_rows(ctx.store.all_records());
            match selected.get(row) {
                Some(record) if self.memos.last_target.as_deref() != Some(record.gene_name.as_str()) => {
                    hits_query = Some(record.fasta_header.clone());
                    clicked = Some(Target {
                        gene_name: record.gene_name.clone(),
                        source: TargetSource::TableClick,
                    });
                }
                Some(_) => {}
                None => log::debug!(
                    "Ignoring click on selection row {} of {}",
                    row,
                    selected.len()
                ),
            }
        }

        if let Some(target) = &clicked {
            match ctx.mode {
                SelectionMode::Add => ctx.selection.select(&target.gene_name),
                SelectionMode::Remove => ctx.selection.unselect(&target.gene_name),
                SelectionMode::Neutral => {}
            }
        }

        let taxonomy_link = clicked
            .as_ref()
            .filter(|t| t.source == TargetSource::PlotClick)
            .and_then(|t| taxonomy_link(ctx.store, &t.gene_name));

        let hits = match hits_query {
            Some(fasta_header) => match ctx.store.taxonomic_hits_for(&fasta_header, self.first_hit_only) {
                Some(rows) => HitsPane::Rows(rows),
                None => HitsPane::Unavailable,
            },
            None => HitsPane::Cleared,
        };

        // The search text wins the detail pane over any click
        let target = match &self.channels.search {
            Some(text) => Some(Target {
                gene_name: text.clone(),
                source: TargetSource::Search,
            }),
            None => clicked.clone(),
        };
        let detail = detail_text(ctx.store, target.as_ref().map(|t| t.gene_name.as_str()));

        self.memos.last_target = clicked.or_else(|| target.clone()).map(|t| t.gene_name);

        match button {
            Some(EventKind::ResetButton) => {
                ctx.selection.reset();
                log::info!("Selection cleared");
            }
            Some(EventKind::AddVisibleButton) => add_visible(ctx),
            Some(EventKind::ReloadSession) => match ctx.saves.load() {
                Ok(tokens) => {
                    log::info!("Reloaded {} saved genes", tokens.len());
                    ctx.selection.bulk_add(&tokens);
                }
                Err(e) => log::warn!("Failed to reload saved selection: {}", e),
            },
            _ => {}
        }

        if is_plot_click {
            if let Err(e) = ctx.saves.store(&ctx.selection.to_tokens()) {
                log::warn!("Failed to save selection: {}", e);
            }
        }

        Outcome {
            detail: Some(detail),
            target,
            hits,
            taxonomy_link,
        }
    }
}

/// Returns the channel payload if it differs from the memo, updating the memo.
fn fresh<T: Clone + PartialEq>(value: &Option<T>, memo: &mut Option<T>) -> Option<T> {
    match value {
        Some(v) if memo.as_ref() != Some(v) => {
            *memo = Some(v.clone());
            Some(v.clone())
        }
        _ => None,
    }
}

fn apply_matrix_mode(ctx: &mut ReconcileContext<'_>, gene: &str) {
    match ctx.mode {
        SelectionMode::Remove => ctx.selection.unselect(gene),
        SelectionMode::Add | SelectionMode::Neutral => ctx.selection.select(gene),
    }
}

/// Selects every plotted gene whose label is assigned and visible.
fn add_visible(ctx: &mut ReconcileContext<'_>) {
    let records = ctx.store.all_records();
    let visible: Vec<&str> = ctx
        .legend
        .visible_records(ctx.view.records(records))
        .into_iter()
        .map(|record| record.gene_name.as_str())
        .collect();
    log::info!("Adding {} visible genes to the selection", visible.len());
    ctx.selection.bulk_add(visible);
}

/// Detail pane text for `gene_name`.
pub fn detail_text(store: &RecordStore, gene_name: Option<&str>) -> String {
    let Some(record) = gene_name.and_then(|g| store.lookup_by_gene_name(g)) else {
        return NO_MATCHING_GENES.to_string();
    };
    format!(
        "Label: {}\nGene: {} | Contig: {}\nBest hit: {} | e-value: {}",
        record.plot_label,
        record.gene_name,
        record.contig_name,
        record.best_hit.as_deref().unwrap_or("NA"),
        record
            .best_hit_evalue
            .map_or_else(|| "NA".to_string(), format_shortest),
    )
}

/// NCBI taxonomy search link for the best hit of `gene_name`.
pub fn taxonomy_link(store: &RecordStore, gene_name: &str) -> Option<String> {
    let best_hit = store.lookup_by_gene_name(gene_name)?.best_hit.as_deref()?;
    if best_hit.is_empty() {
        return None;
    }
    Some(format!("{}{}", TAXONOMY_SEARCH_URL, best_hit.replace(' ', "+")))
}
