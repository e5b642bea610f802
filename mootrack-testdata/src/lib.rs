// MooTrack Testdata - Synthetic data for MooTrack
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # MooTrack Testdata
//!
//! Synthetic training data and farm scenarios for MooTrack.
//!
//! - **Labeled samples**: distance-to-forest, distance-to-leopard and
//!   time-of-day rows labeled by leopard distance bands, escalated at
//!   night and near the forest edge
//! - **Farm scenarios**: pasture location, forest zone polygon and
//!   seeded leopard sightings that can be written into any store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mootrack::model::{self, dataset, TrainingConfig};
//! use mootrack_testdata::{generate_samples, GeneratorConfig};
//!
//! let config = GeneratorConfig::new().with_num_samples(1000).with_seed(42);
//! let samples = generate_samples(&config);
//!
//! dataset::write_csv(dataset::DATASET_FILE, &samples).unwrap();
//! let outcome = model::train(&samples, &TrainingConfig::default()).unwrap();
//! outcome.model.save(".").unwrap();
//! ```
//!
//! ## Seeding a store
//!
//! ```rust
//! use mootrack::MemoryStore;
//! use mootrack_testdata::FarmScenario;
//!
//! let store = MemoryStore::new();
//! let report = FarmScenario::forest_edge().apply(&store, chrono::Utc::now()).unwrap();
//! assert_eq!(report.sightings_inserted, 1);
//! ```

pub mod generator;
pub mod manifest;
pub mod scenario;

// Re-exports for convenience
pub use generator::{generate_samples, label_distribution, GeneratorConfig};
pub use manifest::DatasetManifest;
pub use scenario::{FarmScenario, ScenarioError, SeedReport, SightingPreset};
