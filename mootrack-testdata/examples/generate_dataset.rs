//! Example: Generate the risk training dataset and scenario files.
//!
//! Run with: cargo run --example generate_dataset

use mootrack::model::dataset;
use mootrack_testdata::{generate_samples, label_distribution, DatasetManifest, FarmScenario, GeneratorConfig};
use std::fs;

fn main() {
    println!("MooTrack Testdata Generator");
    println!("===========================\n");

    fs::create_dir_all("datasets").expect("Failed to create datasets directory");

    let config = GeneratorConfig::new().with_num_samples(1000).with_seed(42);
    let samples = generate_samples(&config);

    let csv_path = format!("datasets/{}", dataset::DATASET_FILE);
    dataset::write_csv(&csv_path, &samples).expect("Failed to write CSV");
    DatasetManifest::describe("mootrack_risk_dataset", &config, &samples)
        .save("datasets/mootrack_risk_dataset.json")
        .expect("Failed to write manifest");

    println!("  Created: {} ({} rows)", csv_path, samples.len());
    for (label, count) in label_distribution(&samples) {
        println!("    {:<10} {}", label, count);
    }

    for scenario in FarmScenario::presets() {
        let path = format!("datasets/scenario_{}.json", scenario.name);
        scenario.save(&path).expect("Failed to write scenario");
        println!("  Created: {}", path);
    }

    println!("\nAll datasets generated successfully!");
}
