//! The explorer session.
//!
//! A session owns the available datasets, the active one (store, selection,
//! legend, filtered view, save file) and the process-wide settings: selection
//! mode, e-value slider, contig scope and colour root. All user events go
//! through [`Session::dispatch`].

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::export::{self, ExportError};
use crate::filter::{self, FilteredView};
use crate::formats::fasta::{parse_fasta_file, ProteinIndex};
use crate::formats::savefile::SaveFile;
use crate::formats::{discover_datasets, read_summary, DatasetLoadError, DatasetPaths};
use crate::glossary::Glossary;
use crate::legend::LegendVisibilityMap;
use crate::model::{
    evalue_threshold, ActiveFilter, GeneRecord, SelectionMode, EVALUE_SLIDER_MAX, UNASSIGNED,
};
use crate::palette::Rgb;
use crate::reconcile::{EventKind, Outcome, ReconcileContext, Reconciler};
use crate::selection::SelectionSet;
use crate::store::RecordStore;

/// Sequence pane text when the target has no protein.
pub const NO_SEQUENCE: &str = "No matching Sequence data";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot list datasets in {}: {source}", .path.display())]
    Discover { path: PathBuf, source: io::Error },

    #[error("No dataset found in {}", .0.display())]
    NoDatasets(PathBuf),

    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error(transparent)]
    Load(#[from] DatasetLoadError),
}

/// Settings chosen at startup.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub glossary: Glossary,
    pub colour_root: Option<Rgb>,
    pub evalue_slider: u32,
    /// Show only the first hit per taxon
    pub first_hit_only: bool,
}

/// Everything tied to the active dataset.
#[derive(Debug)]
struct Dataset {
    paths: DatasetPaths,
    store: RecordStore,
    selection: SelectionSet,
    legend: LegendVisibilityMap,
    view: FilteredView,
    saves: SaveFile,
    proteins: OnceCell<Option<ProteinIndex>>,
}

impl Dataset {
    fn new(paths: DatasetPaths, store: RecordStore, filter: &ActiveFilter, colour_root: Option<Rgb>) -> Self {
        let view = filter::apply(store.all_records(), filter, colour_root);
        let legend = LegendVisibilityMap::from_records(view.records(store.all_records()));
        let saves = SaveFile::new(paths.save_file());
        Self {
            paths,
            store,
            selection: SelectionSet::new(),
            legend,
            view,
            saves,
            proteins: OnceCell::new(),
        }
    }

    fn proteins(&self) -> Option<&ProteinIndex> {
        self.proteins
            .get_or_init(|| match parse_fasta_file(self.paths.proteins()) {
                Ok(index) => {
                    log::info!("Loaded {} proteins for {}", index.len(), self.paths.name());
                    Some(index)
                }
                Err(e) => {
                    log::warn!("Protein sequences unavailable for {}: {}", self.paths.name(), e);
                    None
                }
            })
            .as_ref()
    }
}

#[derive(Debug)]
pub struct Session {
    datasets: Vec<DatasetPaths>,
    active_index: usize,
    active: Dataset,
    mode: SelectionMode,
    slider: u32,
    filter: ActiveFilter,
    colour_root: Option<Rgb>,
    glossary: Glossary,
    reconciler: Reconciler,
}

impl Session {
    /// Opens the data root and loads `initial` (by directory name) or the first dataset.
    pub fn open(data_root: &Path, initial: Option<&str>, config: SessionConfig) -> Result<Self, SessionError> {
        let datasets = discover_datasets(data_root).map_err(|source| SessionError::Discover {
            path: data_root.to_path_buf(),
            source,
        })?;
        if datasets.is_empty() {
            return Err(SessionError::NoDatasets(data_root.to_path_buf()));
        }

        let active_index = match initial {
            Some(name) => datasets
                .iter()
                .position(|d| d.name() == name)
                .ok_or_else(|| SessionError::UnknownDataset(name.to_string()))?,
            None => 0,
        };

        let slider = config.evalue_slider.min(EVALUE_SLIDER_MAX);
        let filter = ActiveFilter::from_slider(slider);
        let paths = datasets[active_index].clone();
        let store = RecordStore::load(&paths, &config.glossary)?;
        let active = Dataset::new(paths, store, &filter, config.colour_root);

        log::info!(
            "Session opened on {} ({} datasets available)",
            active.paths.name(),
            datasets.len()
        );

        Ok(Self {
            datasets,
            active_index,
            active,
            mode: SelectionMode::default(),
            slider,
            filter,
            colour_root: config.colour_root,
            glossary: config.glossary,
            reconciler: Reconciler::new().with_first_hit_only(config.first_hit_only),
        })
    }

    pub fn datasets(&self) -> &[DatasetPaths] {
        &self.datasets
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn dataset_name(&self) -> String {
        self.active.paths.name()
    }

    pub fn dataset_paths(&self) -> &DatasetPaths {
        &self.active.paths
    }

    /// Switches to the dataset at `index`.
    ///
    /// The new dataset is loaded before anything is replaced, so a failed
    /// load leaves the current dataset, selection and legend untouched. On
    /// success the selection starts empty, every legend entry is visible and
    /// the contig scope is lifted.
    pub fn switch_dataset(&mut self, index: usize) -> Result<(), SessionError> {
        let paths = self
            .datasets
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::UnknownDataset(index.to_string()))?;

        let store = match RecordStore::load(&paths, &self.glossary) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("Keeping {}: failed to load {}: {}", self.dataset_name(), paths.name(), e);
                return Err(e.into());
            }
        };

        let filter = ActiveFilter::from_slider(self.slider);
        self.active = Dataset::new(paths, store, &filter, self.colour_root);
        self.filter = filter;
        self.active_index = index;
        self.reconciler.reset();
        log::info!("Switched to dataset {}", self.dataset_name());
        Ok(())
    }

    /// Switches to the dataset named `name`.
    pub fn switch_dataset_by_name(&mut self, name: &str) -> Result<(), SessionError> {
        let index = self
            .datasets
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| SessionError::UnknownDataset(name.to_string()))?;
        self.switch_dataset(index)
    }

    /// Handles one user event.
    pub fn dispatch(&mut self, event: EventKind) -> Outcome {
        let Dataset {
            store,
            view,
            selection,
            legend,
            saves,
            ..
        } = &mut self.active;
        let mut ctx = ReconcileContext {
            store,
            view,
            selection,
            legend,
            saves,
            mode: self.mode,
        };
        self.reconciler.handle(event, &mut ctx)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        log::debug!("Selection mode set to {}", mode);
        self.mode = mode;
    }

    pub fn evalue_slider(&self) -> u32 {
        self.slider
    }

    pub fn filter(&self) -> &ActiveFilter {
        &self.filter
    }

    /// Moves the e-value slider, clamped to `0..=EVALUE_SLIDER_MAX`.
    pub fn set_evalue_slider(&mut self, slider: u32) {
        self.slider = slider.min(EVALUE_SLIDER_MAX);
        self.filter.evalue_threshold = evalue_threshold(self.slider);
        self.refresh_view();
    }

    /// Restricts the plot to the contigs of the selected genes.
    pub fn restrict_to_selected_contigs(&mut self) {
        let contigs: BTreeSet<String> = self
            .selected_rows()
            .into_iter()
            .map(|record| record.contig_name.clone())
            .collect();
        log::info!("Restricting plot to {} contigs", contigs.len());
        self.filter.contig_allowlist = Some(contigs);
        self.refresh_view();
    }

    /// Hides every contig.
    pub fn clear_contigs(&mut self) {
        self.filter.contig_allowlist = Some(BTreeSet::new());
        self.refresh_view();
    }

    /// Lifts the contig restriction.
    pub fn all_contigs(&mut self) {
        self.filter.contig_allowlist = None;
        self.refresh_view();
    }

    /// Recomputes the view; the legend is rebuilt only if its labels changed.
    fn refresh_view(&mut self) {
        let dataset = &mut self.active;
        dataset.view = filter::apply(dataset.store.all_records(), &self.filter, self.colour_root);

        let labels_changed = {
            let new_labels = dataset
                .view
                .labels()
                .iter()
                .map(|(label, _)| label.as_str())
                .filter(|label| *label != UNASSIGNED);
            !new_labels.eq(dataset.legend.legend_order().iter().map(String::as_str))
        };
        if labels_changed {
            dataset
                .legend
                .rebuild(dataset.view.records(dataset.store.all_records()));
        }
        log::debug!(
            "Filter applied: {} of {} genes plotted",
            dataset.view.len(),
            dataset.store.len()
        );
    }

    pub fn store(&self) -> &RecordStore {
        &self.active.store
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.active.selection
    }

    pub fn legend(&self) -> &LegendVisibilityMap {
        &self.active.legend
    }

    pub fn view(&self) -> &FilteredView {
        &self.active.view
    }

    /// Selected records in table order.
    pub fn selected_rows(&self) -> Vec<&GeneRecord> {
        self.active.selection.selected_rows(self.active.store.all_records())
    }

    pub fn search_text(&self) -> Option<&str> {
        self.reconciler.search_text()
    }

    /// Protein sequence of `gene_name`, or a placeholder.
    pub fn protein_sequence(&self, gene_name: &str) -> String {
        self.active
            .store
            .lookup_fasta_header(gene_name)
            .and_then(|header| self.active.proteins().and_then(|p| p.get(header)))
            .map_or_else(|| NO_SEQUENCE.to_string(), |record| record.sequence.clone())
    }

    /// Text of the run summary.
    pub fn summary(&self) -> String {
        read_summary(&self.active.paths)
    }

    /// Writes the selection to `selection.csv` in the dataset directory.
    pub fn export_selection_csv<S: AsRef<str>>(&self, columns: &[S]) -> Result<PathBuf, ExportError> {
        export::export_selection_csv(
            &self.active.store,
            &self.active.selection,
            columns,
            &self.active.paths.selection_export(),
        )
    }

    /// Writes the selected proteins to `selected_proteins.fasta` in the dataset directory.
    pub fn export_selected_proteins(&self) -> Result<PathBuf, ExportError> {
        export::export_selected_proteins(
            &self.active.store,
            &self.active.selection,
            &self.active.paths.proteins(),
            &self.active.paths.protein_export(),
        )
    }
}
