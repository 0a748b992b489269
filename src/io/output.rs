//! Result file writer.
//!
//! The JSON tree follows the archival dataset layout:
//!
//! ```text
//! runtime                                   scalar
//! <tally>/{spatial,time,energy,angular}_grid   present filters only
//! <tally>/<score>/mean                      flat array
//! <tally>/<score>/sdev                      flat array
//! keff                                      per-iteration array, k mode
//! ```

use crate::simulation::Simulator;
use crate::tally::Tally;
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Writes the run results next to the configured output basename and
/// returns the path of the written file.
pub fn save_output(sim: &Simulator) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = PathBuf::from(format!("{}.json", sim.output));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut root = Map::new();
    root.insert("runtime".to_string(), json!(sim.time_total));

    for tally in &sim.tallies {
        root.insert(tally.name.clone(), tally_value(tally));
    }

    if sim.mode_k {
        root.insert("keff".to_string(), json!(sim.k_mean));
    }

    let file = File::create(&path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &Value::Object(root))?;
    Ok(path)
}

fn tally_value(tally: &Tally) -> Value {
    let mut node = Map::new();
    if let Some(f) = &tally.spatial {
        node.insert("spatial_grid".to_string(), json!(f.grid));
    }
    if let Some(f) = &tally.time {
        node.insert("time_grid".to_string(), json!(f.grid));
    }
    if let Some(f) = &tally.energy {
        node.insert("energy_grid".to_string(), json!(f.grid));
    }
    if let Some(f) = &tally.angular {
        node.insert("angular_grid".to_string(), json!(f.grid));
    }
    for score in &tally.scores {
        node.insert(
            score.kind.name().to_string(),
            json!({
                "mean": score.mean,
                "sdev": score.sdev,
            }),
        );
    }
    Value::Object(node)
}
