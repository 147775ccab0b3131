//! # taxview - Terminal Taxonomic Assignment Explorer
//!
//! A terminal explorer for per-gene taxonomic assignment tables using ratatui.
//!
//! ## Architecture
//!
//! The application follows an event-driven architecture with clear separation:
//! - `model`: Gene records, hits, selection mode and filter settings
//! - `formats`: Dataset files (gene table, diamond hits, proteins, save file)
//! - `store`: Read-only records of one dataset
//! - `selection`, `legend`, `filter`: the selection set, legend visibility and plot filter
//! - `reconcile`: turns user events into selection and pane updates
//! - `session`: active dataset, process-wide settings and exports
//! - `event`: Keyboard event handling
//! - `ui`: TUI rendering with ratatui
//! - `controller`: Orchestration of state transitions

pub mod controller;
pub mod event;
pub mod export;
pub mod filter;
pub mod formats;
pub mod glossary;
pub mod legend;
pub mod logging;
pub mod model;
pub mod palette;
pub mod reconcile;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;
pub mod ui;
