// src/persistence.rs
//! CSV persistence for runs and health-index tables
//!
//! Run files carry `time`, the seven channel columns and `label`. Columns are
//! located by header name, so their order does not matter and extra columns
//! are ignored.

use crate::config::paths::HEALTH_INDEX_FILE;
use crate::error::{EngineError, EngineErrorBuilder, EngineResult, IntoEngineError, PipelineStage};
use crate::ml::{HealthIndexRow, HealthIndexTable};
use crate::simulation::{Channel, Corpus, Label, Run, CHANNEL_COUNT};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TIME_COLUMN: &str = "time";
const LABEL_COLUMN: &str = "label";
const HEALTH_INDEX_COLUMN: &str = "health_index";

fn shape_error(path: &Path, operation: &str, reason: String) -> EngineError {
    EngineErrorBuilder::new(PipelineStage::Persistence, operation)
        .data_shape(path.display().to_string(), reason)
}

/// Position of every required column in `headers`
fn column_indices<const N: usize>(
    headers: &StringRecord,
    names: [&str; N],
    path: &Path,
    operation: &str,
) -> EngineResult<[usize; N]> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .collect();
    if !missing.is_empty() {
        return Err(shape_error(
            path,
            operation,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }
    Ok(names.map(|name| headers.iter().position(|h| h == name).unwrap_or_default()))
}

fn parse_number(
    record: &StringRecord,
    index: usize,
    column: &str,
    row: usize,
    path: &Path,
    operation: &str,
) -> EngineResult<f64> {
    let cell = record.get(index).unwrap_or("");
    cell.trim().parse::<f64>().map_err(|_| {
        shape_error(
            path,
            operation,
            format!("row {}: column {} holds '{}', not a number", row + 1, column, cell),
        )
    })
}

/// Write one run as CSV with a header row
pub fn write_run<P: AsRef<Path>>(path: P, run: &Run) -> EngineResult<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).engine_err(path, "write_run")?;

    let header: Vec<&str> = std::iter::once(TIME_COLUMN)
        .chain(Channel::ALL.iter().map(|channel| channel.name()))
        .chain(std::iter::once(LABEL_COLUMN))
        .collect();
    writer.write_record(&header).engine_err(path, "write_run")?;

    let label = run.label().to_string();
    for (i, time) in run.time().iter().enumerate() {
        let mut record = Vec::with_capacity(CHANNEL_COUNT + 2);
        record.push(time.to_string());
        record.extend(run.sample(i).iter().map(f64::to_string));
        record.push(label.clone());
        writer.write_record(&record).engine_err(path, "write_run")?;
    }

    writer.flush().engine_err(path, "write_run")?;
    debug!("Wrote {} samples to {}", run.len(), path.display());
    Ok(())
}

/// Save every run of `corpus` into `dir` as `<label>_run_<i>.csv`
///
/// `i` counts runs per label from 0. Returns the written paths in corpus order.
pub fn save_corpus<P: AsRef<Path>>(dir: P, corpus: &Corpus) -> EngineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).engine_err(dir, "save_corpus")?;

    let mut per_label: BTreeMap<Label, usize> = BTreeMap::new();
    let mut written = Vec::with_capacity(corpus.len());
    for run in corpus.runs() {
        let counter = per_label.entry(run.label()).or_insert(0);
        let path = dir.join(format!("{}_run_{}.csv", run.label(), counter));
        *counter += 1;
        write_run(&path, run)?;
        written.push(path);
    }

    info!("Saved {} runs to {}", written.len(), dir.display());
    Ok(written)
}

/// Read one run file
///
/// Every row must carry the same label and the time column must be strictly
/// increasing.
pub fn read_run<P: AsRef<Path>>(path: P) -> EngineResult<Run> {
    const OP: &str = "read_run";
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).engine_err(path, OP)?;
    let headers = reader.headers().engine_err(path, OP)?.clone();

    let [time_index, label_index] = column_indices(&headers, [TIME_COLUMN, LABEL_COLUMN], path, OP)?;
    let channel_indices = column_indices(&headers, Channel::ALL.map(Channel::name), path, OP)?;

    let mut time = Vec::new();
    let mut channels: [Vec<f64>; CHANNEL_COUNT] = Default::default();
    let mut label: Option<Label> = None;

    for (row, result) in reader.records().enumerate() {
        let record = result.engine_err(path, OP)?;

        let cell = record.get(label_index).unwrap_or("").trim();
        let row_label: Label = cell
            .parse()
            .map_err(|err: EngineError| err.with_info("file", path.display().to_string()))?;
        match label {
            None => label = Some(row_label),
            Some(first) if first != row_label => {
                return Err(shape_error(
                    path,
                    OP,
                    format!("row {}: label '{}' differs from '{}'", row + 1, row_label, first),
                ));
            }
            Some(_) => {}
        }

        time.push(parse_number(&record, time_index, TIME_COLUMN, row, path, OP)?);
        for (channel, &index) in Channel::ALL.iter().zip(&channel_indices) {
            channels[channel.index()].push(parse_number(&record, index, channel.name(), row, path, OP)?);
        }
    }

    let label = label.ok_or_else(|| shape_error(path, OP, "file has no data rows".to_string()))?;
    Run::new(time, channels, label).map_err(|err| err.with_info("file", path.display().to_string()))
}

/// Load one run per file, in the given order
pub fn load_corpus<P: AsRef<Path>>(paths: &[P]) -> EngineResult<Corpus> {
    if paths.is_empty() {
        return Err(EngineErrorBuilder::new(PipelineStage::CorpusBuilding, "load_corpus")
            .configuration("no run files given"));
    }

    let runs = paths.iter().map(read_run).collect::<EngineResult<Vec<_>>>()?;
    let corpus = Corpus::from_runs(runs);
    info!(
        "Loaded {} runs ({} samples) from {} files",
        corpus.len(),
        corpus.total_samples(),
        paths.len()
    );
    Ok(corpus)
}

/// Whether `path` holds a health-index table rather than a run
///
/// Decided by the header, so outputs written under a custom name are
/// recognized too. Unreadable files are left for [`read_run`] to report.
fn is_health_index_file(path: &Path) -> bool {
    if path.file_name().and_then(|name| name.to_str()) == Some(HEALTH_INDEX_FILE) {
        return true;
    }
    let Ok(mut reader) = csv::Reader::from_path(path) else {
        return false;
    };
    let is_output = match reader.headers() {
        Ok(headers) => headers.iter().any(|column| column == HEALTH_INDEX_COLUMN),
        Err(_) => false,
    };
    is_output
}

/// Run files in `dir`: every `*.csv` except health-index outputs, sorted by name
pub fn run_files<P: AsRef<Path>>(dir: P) -> EngineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).engine_err(dir, "run_files")? {
        let path = entry.engine_err(dir, "run_files")?.path();
        let is_csv = path.extension().and_then(|ext| ext.to_str()) == Some("csv");
        if path.is_file() && is_csv && !is_health_index_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every run file of `dir`, see [`run_files`]
pub fn load_corpus_dir<P: AsRef<Path>>(dir: P) -> EngineResult<Corpus> {
    let dir = dir.as_ref();
    let paths = run_files(dir)?;
    load_corpus(paths.as_slice()).map_err(|err| err.with_info("directory", dir.display().to_string()))
}

/// Write the health-index table as `time,health_index,label`
pub fn write_health_index<P: AsRef<Path>>(path: P, table: &HealthIndexTable) -> EngineResult<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).engine_err(path, "write_health_index")?;
    writer
        .write_record([TIME_COLUMN, HEALTH_INDEX_COLUMN, LABEL_COLUMN])
        .engine_err(path, "write_health_index")?;
    for row in table.rows() {
        writer
            .write_record([row.time.to_string(), row.health_index.to_string(), row.label.to_string()])
            .engine_err(path, "write_health_index")?;
    }
    writer.flush().engine_err(path, "write_health_index")?;
    info!("Saved health index ({} rows) to {}", table.len(), path.display());
    Ok(())
}

/// Read a health-index table written by [`write_health_index`]
pub fn read_health_index<P: AsRef<Path>>(path: P) -> EngineResult<HealthIndexTable> {
    const OP: &str = "read_health_index";
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).engine_err(path, OP)?;
    let headers = reader.headers().engine_err(path, OP)?.clone();
    let [time_index, health_index, label_index] =
        column_indices(&headers, [TIME_COLUMN, HEALTH_INDEX_COLUMN, LABEL_COLUMN], path, OP)?;

    let mut rows = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.engine_err(path, OP)?;
        let label: Label = record
            .get(label_index)
            .unwrap_or("")
            .trim()
            .parse()
            .map_err(|err: EngineError| err.with_info("file", path.display().to_string()))?;
        rows.push(HealthIndexRow {
            time: parse_number(&record, time_index, TIME_COLUMN, row, path, OP)?,
            health_index: parse_number(&record, health_index, HEALTH_INDEX_COLUMN, row, path, OP)?,
            label,
        });
    }
    Ok(HealthIndexTable::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{FaultKind, FaultModel, SignalModel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;

    fn sample_run(label: Label) -> Run {
        let time = SignalModel::generate_time_axis(20.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        match label {
            Label::Normal => SignalModel::default().generate_nominal(&time, &mut rng).unwrap(),
            Label::Fault(kind) => FaultModel::default().faulty_run(&time, kind, &mut rng).unwrap(),
        }
    }

    #[test]
    fn test_run_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normal_run_0.csv");
        let run = sample_run(Label::Normal);

        write_run(&path, &run).unwrap();
        assert_eq!(read_run(&path).unwrap(), run);

        let header = fs::read_to_string(&path).unwrap().lines().next().unwrap().to_string();
        assert_eq!(header, "time,Pc,N_pump,T_in,Vib,fuel_flow,bearing_temp,thrust,label");
    }

    #[test]
    fn test_columns_found_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shuffled.csv");
        fs::write(
            &path,
            "label,thrust,extra,bearing_temp,fuel_flow,Vib,T_in,N_pump,Pc,time\n\
             fuel_leak,7,x,6,5,4,3,2,1,0\n\
             fuel_leak,7,y,6,5,4,3,2,1,1\n",
        )
        .unwrap();

        let run = read_run(&path).unwrap();
        assert_eq!(run.label(), Label::Fault(FaultKind::FuelLeak));
        assert_eq!(run.time(), &[0.0, 1.0]);
        assert_eq!(run.sample(0), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_missing_column_is_data_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        fs::write(&path, "time,Pc,N_pump,T_in,fuel_flow,bearing_temp,thrust,label\n0,1,2,3,5,6,7,normal\n").unwrap();

        let err = read_run(&path).unwrap_err();
        assert!(err.is_data_shape());
        assert!(err.to_string().contains("Vib"));
    }

    #[test]
    fn test_bad_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let header = "time,Pc,N_pump,T_in,Vib,fuel_flow,bearing_temp,thrust,label\n";

        let mixed = dir.path().join("mixed.csv");
        fs::write(&mixed, format!("{header}0,1,2,3,4,5,6,7,normal\n1,1,2,3,4,5,6,7,temp_rise\n")).unwrap();
        assert!(read_run(&mixed).unwrap_err().is_data_shape());

        let unordered = dir.path().join("unordered.csv");
        fs::write(&unordered, format!("{header}1,1,2,3,4,5,6,7,normal\n0,1,2,3,4,5,6,7,normal\n")).unwrap();
        assert!(read_run(&unordered).unwrap_err().is_data_shape());

        let garbage = dir.path().join("garbage.csv");
        fs::write(&garbage, format!("{header}0,1,2,abc,4,5,6,7,normal\n")).unwrap();
        let err = read_run(&garbage).unwrap_err();
        assert!(err.is_data_shape());
        assert!(err.to_string().contains("T_in"));

        let unknown = dir.path().join("unknown.csv");
        fs::write(&unknown, format!("{header}0,1,2,3,4,5,6,7,meltdown\n")).unwrap();
        assert!(read_run(&unknown).unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_file_is_persistence_error() {
        let err = read_run("/nonexistent/run.csv").unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn test_corpus_directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::from_runs(vec![
            sample_run(Label::Normal),
            sample_run(Label::Normal),
            sample_run(Label::Fault(FaultKind::PressureDecay)),
        ]);

        let written = save_corpus(dir.path(), &corpus).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["normal_run_0.csv", "normal_run_1.csv", "pressure_decay_run_0.csv"]);

        fs::write(dir.path().join(HEALTH_INDEX_FILE), "time,health_index,label\n0,1,normal\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_corpus_dir(dir.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.label_counts(), corpus.label_counts());
    }

    #[test]
    fn test_custom_named_health_index_is_not_a_run() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path().join("normal_run_0.csv"), &sample_run(Label::Normal)).unwrap();
        let table = HealthIndexTable::from_rows(vec![HealthIndexRow {
            time: 9.0,
            health_index: 0.5,
            label: Label::Normal,
        }]);
        write_health_index(dir.path().join("scores_2024.csv"), &table).unwrap();

        let files = run_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("normal_run_0.csv")]);
        assert_eq!(load_corpus_dir(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_inputs_are_configuration_errors() {
        let no_paths: [&Path; 0] = [];
        assert!(load_corpus(&no_paths).unwrap_err().is_configuration());

        let dir = tempfile::tempdir().unwrap();
        assert!(load_corpus_dir(dir.path()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_health_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HEALTH_INDEX_FILE);
        let table = HealthIndexTable::from_rows(vec![
            HealthIndexRow { time: 9.0, health_index: 0.985, label: Label::Normal },
            HealthIndexRow { time: 10.0, health_index: 0.125, label: Label::Fault(FaultKind::TempRise) },
        ]);

        write_health_index(&path, &table).unwrap();
        assert_eq!(read_health_index(&path).unwrap(), table);
        assert!(fs::read_to_string(&path).unwrap().starts_with("time,health_index,label\n"));
    }
}
