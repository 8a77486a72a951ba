//! CSV writers for prediction traces, fitness-over-time traces, and the
//! per-episode training-score table.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn write_predictions_csv(
    path: &Path,
    output_names: &[String],
    predictions: &[Vec<f64>],
) -> std::io::Result<()> {
    let file_exists = path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !file_exists {
        writeln!(file, "timestep,{}", output_names.join(","))?;
    }
    for (t, row) in predictions.iter().enumerate() {
        let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(file, "{t},{}", values.join(","))?;
    }
    Ok(())
}

pub fn write_score_trace_csv(path: &Path, generation: u64, best_fitness: f64) -> std::io::Result<()> {
    let file_exists = path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !file_exists {
        writeln!(file, "generation,best_fitness")?;
    }
    writeln!(file, "{generation},{best_fitness}")
}

pub fn write_training_log_csv(
    path: &Path,
    generation: u64,
    island_id: usize,
    fitness: f64,
    num_nodes: usize,
) -> std::io::Result<()> {
    let file_exists = path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !file_exists {
        writeln!(file, "generation,island_id,fitness,num_nodes")?;
    }
    writeln!(file, "{generation},{island_id},{fitness},{num_nodes}")
}

pub fn write_training_scores_csv(path: &Path, generation: u64, scores: &[i64]) -> std::io::Result<()> {
    let file_exists = path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !file_exists {
        let headers: Vec<String> = (1..=scores.len()).map(|i| format!("episode_{i}")).collect();
        writeln!(file, "generation,{}", headers.join(","))?;
    }
    let values: Vec<String> = scores.iter().map(|s| s.to_string()).collect();
    writeln!(file, "{generation},{}", values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile_free_tests::temp_path;

    mod tempfile_free_tests {
        use std::path::PathBuf;

        pub fn temp_path(name: &str) -> PathBuf {
            let mut path = std::env::temp_dir();
            path.push(format!("onenas_output_test_{name}_{}.csv", std::process::id()));
            path
        }
    }

    #[test]
    fn predictions_csv_writes_header_once() {
        let path = temp_path("predictions");
        let _ = std::fs::remove_file(&path);
        write_predictions_csv(&path, &["y".to_string()], &[vec![1.0], vec![2.0]]).unwrap();
        write_predictions_csv(&path, &["y".to_string()], &[vec![3.0]]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().filter(|l| l.starts_with("timestep")).count(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
