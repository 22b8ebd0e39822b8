//! Directory-scanning catalogs of EcoTyper results: cell types, cell
//! states, and ecotypes.
//!
//! All collections are built once from directory listings and read-only
//! afterwards, exposing iteration, get-by-key, and length.

pub mod cell_states;
pub mod cell_types;
pub mod ecotypes;

pub use cell_states::{gene_set_filename, CellStateCollection};
pub use cell_types::CellTypeCollection;
pub use ecotypes::{Ecotype, EcotypeCollection};
