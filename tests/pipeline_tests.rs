use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use mlp_sweep::config::Properties;
use mlp_sweep::report::{HEADER, SHEET_NAME};
use mlp_sweep::{
    publish, ActivationType, ConfigError, DataLoadError, Error, ExperimentConfig, OutputOptions,
    Pipeline, Updater,
};
use tempfile::TempDir;

/// Two well separated clusters, label in the last column.
const TRAIN: &str = "\
0.1;0.2;0
0.2;0.1;0
0.0;0.3;0
0.3;0.0;0
2.1;2.2;1
2.2;2.1;1
2.0;2.3;1
2.3;2.0;1
";

const TEST: &str = "\
0.15;0.15;0
0.25;0.05;0
2.15;2.15;1
2.05;2.25;1
";

struct Fixture {
    dir: TempDir,
    properties: Properties,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let train = write(dir.path(), "train.csv", TRAIN);
        let test = write(dir.path(), "test.csv", TEST);

        let text = format!(
            "\
# two-blob sweep
data.training_dataset_filepath={}
data.training_dataset_size=8
data.test_dataset_filepath={}
data.test_dataset_size=4
data.label_column_index=2
data.number_of_labels=2
number_of_epochs=5
network_architecture.number_of_inputs=2
network_architecture.number_of_outputs=2
network_architecture.numbers_of_hidden_neurons=3,5
activation_functions=tanh
updaters=SGD,ADAM
seed=42
iterations=10
learning_rate=0.1
report_directory_path={}
",
            train.display(),
            test.display(),
            dir.path().display()
        );
        let properties = Properties::parse(&text);
        Fixture { dir, properties }
    }

    fn config(&self) -> ExperimentConfig {
        ExperimentConfig::from_properties(&self.properties).unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_sweep_reports_every_configuration_in_grid_order() {
    let fixture = Fixture::new();
    let report = Pipeline::new(fixture.config()).run().unwrap();

    let summary: Vec<(usize, ActivationType, Option<Updater>)> = report
        .records()
        .iter()
        .map(|r| (r.hidden_neurons, r.activation, r.updater))
        .collect();
    assert_eq!(
        summary,
        vec![
            (3, ActivationType::Tanh, Some(Updater::Sgd)),
            (3, ActivationType::Tanh, Some(Updater::Adam)),
            (5, ActivationType::Tanh, Some(Updater::Sgd)),
            (5, ActivationType::Tanh, Some(Updater::Adam)),
        ]
    );
    for record in report.records() {
        assert_eq!(record.evaluation.total(), 4);
        assert!((0.0..=1.0).contains(&record.accuracy()));
    }
}

#[test]
fn test_csv_report_matches_records() {
    let mut fixture = Fixture::new();
    fixture
        .properties
        .set("network_architecture.numbers_of_hidden_neurons", "4");
    let config = fixture.config();
    let report = Pipeline::new(config.clone()).run().unwrap();

    let csv_path = fixture.path("results.csv");
    let options = OutputOptions {
        csv_path: Some(csv_path.clone()),
        ..OutputOptions::default()
    };
    let written = publish(&report, &config, &options).unwrap();
    assert_eq!(written, vec![csv_path.clone()]);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        header,
        vec![
            "Neurons in hidden layer",
            "Activation function",
            "Updater",
            "F1 score",
            "Accuracy",
            "Recall"
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    for (row, record) in rows.iter().zip(report.records()) {
        assert_eq!(&row[0], "4");
        assert_eq!(&row[1], "tanh");
        assert_eq!(&row[2], record.updater_name());
        let accuracy: f64 = row[4].parse().unwrap();
        assert_eq!(accuracy, record.accuracy());
    }
}

#[test]
fn test_spreadsheet_goes_to_timestamped_file() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let report = Pipeline::new(config.clone()).run().unwrap();

    let options = OutputOptions {
        spreadsheet: true,
        ..OutputOptions::default()
    };
    let written = publish(&report, &config, &options).unwrap();

    assert_eq!(written.len(), 1);
    let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("results_"));
    assert!(name.ends_with(".xlsx"));
    assert_eq!(written[0].parent(), Some(fixture.dir.path()));
    assert!(written[0].exists());
}

#[test]
fn test_spreadsheet_cells_match_records() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let report = Pipeline::new(config.clone()).run().unwrap();

    let path = fixture.path("sweep.xlsx");
    let options = OutputOptions {
        spreadsheet: true,
        spreadsheet_path: Some(path.clone()),
        ..OutputOptions::default()
    };
    publish(&report, &config, &options).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let range = workbook.worksheet_range(SHEET_NAME).unwrap();
    let rows: Vec<&[Data]> = range.rows().collect();
    assert_eq!(rows.len(), 1 + report.records().len());

    let header: Vec<String> = rows[0].iter().map(|cell| cell.to_string()).collect();
    assert_eq!(header, HEADER);

    for (row, record) in rows[1..].iter().zip(report.records()) {
        assert_eq!(row.len(), 6);
        assert_eq!(row[0], Data::Float(record.hidden_neurons as f64));
        assert_eq!(row[1], Data::String(record.activation.to_string()));
        assert_eq!(row[2], Data::String(record.updater_name().to_string()));
        assert_eq!(row[3], Data::Float(record.f1()));
        assert_eq!(row[4], Data::Float(record.accuracy()));
        assert_eq!(row[5], Data::Float(record.recall()));
    }
}

#[test]
fn test_missing_report_target_is_a_config_error() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.report_directory_path = None;

    let spreadsheet = OutputOptions {
        spreadsheet: true,
        ..OutputOptions::default()
    };
    assert!(matches!(
        spreadsheet.check(&config),
        Err(ConfigError::Invalid(ref problems)) if problems.len() == 1
    ));

    let explicit = OutputOptions {
        spreadsheet_path: Some(fixture.path("out.xlsx")),
        ..spreadsheet.clone()
    };
    assert_eq!(explicit.check(&config), Ok(()));

    let text_only = OutputOptions {
        print: true,
        ..OutputOptions::default()
    };
    assert_eq!(text_only.check(&config), Ok(()));
}

#[test]
fn test_spreadsheet_write_failure_is_reported() {
    let fixture = Fixture::new();
    let config = fixture.config();
    let report = Pipeline::new(config.clone()).run().unwrap();

    let options = OutputOptions {
        spreadsheet: true,
        spreadsheet_path: Some(fixture.path("missing").join("results.xlsx")),
        ..OutputOptions::default()
    };
    assert!(publish(&report, &config, &options).is_err());
}

#[test]
fn test_empty_width_list_is_a_config_error() {
    let mut fixture = Fixture::new();
    fixture
        .properties
        .set("network_architecture.numbers_of_hidden_neurons", "");

    let err = Pipeline::new(fixture.config()).run().unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::EmptyList(ref field))
            if field == "network_architecture.numbers_of_hidden_neurons"
    ));
}

#[test]
fn test_invalid_widths_are_skipped() {
    let mut fixture = Fixture::new();
    fixture
        .properties
        .set("network_architecture.numbers_of_hidden_neurons", "4,-1,abc,8");
    fixture.properties.set("updaters", "SGD");

    let report = Pipeline::new(fixture.config()).run().unwrap();
    let widths: Vec<usize> = report.records().iter().map(|r| r.hidden_neurons).collect();
    assert_eq!(widths, vec![4, 8]);
}

#[test]
fn test_unknown_updaters_only_is_a_config_error() {
    let mut fixture = Fixture::new();
    fixture.properties.set("updaters", "FOO,BAR");

    let err = Pipeline::new(fixture.config()).build_grid().unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::EmptyList(_))));
}

#[test]
fn test_dataset_size_mismatch_fails_before_training() {
    let mut fixture = Fixture::new();
    fixture.properties.set("data.training_dataset_size", "9");

    let err = Pipeline::new(fixture.config()).run().unwrap_err();
    assert!(matches!(
        err,
        Error::DataLoad(DataLoadError::SampleCount { expected: 9, found: 8, .. })
    ));
}

#[test]
fn test_test_set_with_different_width_is_rejected() {
    let mut fixture = Fixture::new();
    let wide = write(
        fixture.dir.path(),
        "wide.csv",
        "0.1;0.2;0;0.5\n0.2;0.1;0;0.5\n2.1;2.2;1;0.5\n2.2;2.1;1;0.5\n",
    );
    fixture
        .properties
        .set("data.test_dataset_filepath", wide.display().to_string());

    let err = Pipeline::new(fixture.config()).prepare_data().unwrap_err();
    assert_eq!(err, DataLoadError::FeatureWidth { train: 2, test: 3 });
}

#[test]
fn test_cross_validation_evaluates_every_training_row() {
    let mut fixture = Fixture::new();
    fixture.properties.set("cross_validation.folds", "4");
    fixture.properties.set("updaters", "ADAM");

    let report = Pipeline::new(fixture.config()).run().unwrap();
    assert_eq!(report.records().len(), 2);
    for record in report.records() {
        assert_eq!(record.evaluation.total(), 8);
    }
}

#[test]
fn test_sweep_is_reproducible() {
    let fixture = Fixture::new();
    let first = Pipeline::new(fixture.config()).run().unwrap();
    let second = Pipeline::new(fixture.config()).run().unwrap();
    assert_eq!(first, second);
}
