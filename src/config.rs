use crate::error::Error;
use crate::train::TrainParams;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::BTreeMap, fmt::Display, fs::File, io::BufReader, path::{Path, PathBuf}};
use tracing::debug;


/// A word with its true language.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Example {
    #[serde(rename = "word")]
    pub token: String,
    #[serde(rename = "language")]
    pub label: String,
}

impl Example {
    pub fn new(token: &str, label: &str) -> Example {
        Self { token: token.to_owned(), label: label.to_owned() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LabeledData {
    #[serde(default)]
    pub training_data: Vec<Example>,
    #[serde(default)]
    pub validation_data: Vec<Example>,
}

/// word -> other word -> similarity score. Ordered so that a file listing
/// the same pair twice always resolves to the same value.
pub type SimilarityTable = BTreeMap<String, BTreeMap<String, f64>>;


#[derive(Clone, Debug, PartialEq)]
pub struct RunParams {
    pub training_file: PathBuf,
    pub similarity_file: PathBuf,
    pub num_threads: usize,
    pub classify: Vec<String>,
    pub similarity_queries: Vec<(String, String)>,
    pub train: TrainParams,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            training_file: PathBuf::from("training_data.json"),
            similarity_file: PathBuf::from("word_similarity.json"),
            num_threads: 1,
            classify: vec!["boat".to_string()],
            similarity_queries: vec![("car".to_string(), "automobile".to_string())],
            train: TrainParams::default(),
        }
    }
}

impl Display for RunParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using hyper-params:
        training_file: {}
        similarity_file: {}
        num_threads: {}
        classify: {:?}
        similarity_queries: {:?},
        Using {}",
        self.training_file.display(), self.similarity_file.display(), self.num_threads,
        self.classify, self.similarity_queries, self.train)
    }
}


pub struct Config {
    params: RunParams
}

impl Config {

    pub fn get_params(&self) -> RunParams {
        self.params.clone()
    }

    /// Build the run parameters from an optional JSON file. Keys missing
    /// from the file keep their default value.
    pub fn new(config_file: Option<&Path>) -> Result<Config, Error> {

        let json = match config_file {
            Some(path) => read_json::<Value>(path)?,
            None => Value::Object(Default::default()),
        };
        if !json.is_object() {
            return Err(Error::invalid("config", "expected a json object"));
        }

        let defaults = RunParams::default();
        let params = RunParams {
            training_file: match json.get("training_file") {
                Some(value) => PathBuf::from(as_str(value, "training_file")?),
                None => defaults.training_file
            },
            similarity_file: match json.get("similarity_file") {
                Some(value) => PathBuf::from(as_str(value, "similarity_file")?),
                None => defaults.similarity_file
            },
            num_threads: match json.get("num_threads") {
                Some(value) => as_usize(value, "num_threads")?,
                None => defaults.num_threads
            },
            classify: match json.get("classify") {
                Some(value) => as_words(value, "classify")?,
                None => defaults.classify
            },
            similarity_queries: match json.get("similarity_queries") {
                Some(value) => as_pairs(value, "similarity_queries")?,
                None => defaults.similarity_queries
            },
            train: TrainParams {
                initial_rate: match json.get("initial_rate") {
                    Some(value) => as_f64(value, "initial_rate")?,
                    None => defaults.train.initial_rate
                },
                epochs: match json.get("epochs") {
                    Some(value) => as_usize(value, "epochs")?,
                    None => defaults.train.epochs
                },
                decay_rate: match json.get("decay_rate") {
                    Some(value) => as_f64(value, "decay_rate")?,
                    None => defaults.train.decay_rate
                },
                patience: match json.get("patience") {
                    Some(value) => as_usize(value, "patience")?,
                    None => defaults.train.patience
                },
                reinforce_on_create: match json.get("reinforce_on_create") {
                    Some(value) => value.as_bool().ok_or_else(|| Error::invalid("reinforce_on_create", "expected a boolean"))?,
                    None => defaults.train.reinforce_on_create
                },
            },
        };

        let config = Self { params };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {

        let params = &self.params;
        if !(params.train.initial_rate > 0.0 && params.train.initial_rate.is_finite()) {
            return Err(Error::invalid("initial_rate", "must be a finite number above 0"));
        }
        if !(params.train.decay_rate >= 0.0 && params.train.decay_rate.is_finite()) {
            return Err(Error::invalid("decay_rate", "must be a finite number, 0 or above"));
        }
        if params.train.patience < 1 {
            return Err(Error::invalid("patience", "must be at least 1"));
        }
        if params.num_threads < 1 {
            return Err(Error::invalid("num_threads", "must be at least 1"));
        }
        Ok(())
    }

}

impl Default for Config {
    fn default() -> Self {
        Self { params: RunParams::default() }
    }
}


fn as_f64(value: &Value, name: &str) -> Result<f64, Error> {
    value.as_f64().ok_or_else(|| Error::invalid(name, "expected a number"))
}

fn as_usize(value: &Value, name: &str) -> Result<usize, Error> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::invalid(name, "expected a non-negative integer"))
}

fn as_str<'a>(value: &'a Value, name: &str) -> Result<&'a str, Error> {
    value.as_str().ok_or_else(|| Error::invalid(name, "expected a string"))
}

fn as_words(value: &Value, name: &str) -> Result<Vec<String>, Error> {
    let items = value.as_array().ok_or_else(|| Error::invalid(name, "expected a list of words"))?;
    items.iter().map(|item| as_str(item, name).map(str::to_owned)).collect()
}

fn as_pairs(value: &Value, name: &str) -> Result<Vec<(String, String)>, Error> {
    let items = value.as_array().ok_or_else(|| Error::invalid(name, "expected a list of word pairs"))?;
    items
        .iter()
        .map(|item| match as_words(item, name)?.as_slice() {
            [first, second] => Ok((first.to_owned(), second.to_owned())),
            _ => Err(Error::invalid(name, "each query must hold exactly two words")),
        })
        .collect()
}


pub fn read_input<R: ReadFile>(file_path: &Path) -> Result<<R as ReadFile>::Item, Error> {
    let input = <R as ReadFile>::read_file(file_path)?;
    Ok(input)
}

pub trait ReadFile {
    type Item;
    fn read_file(file_path: &Path) -> Result<Self::Item, Error>;
}

impl ReadFile for LabeledData {
    type Item = Self;
    fn read_file(file_path: &Path) -> Result<Self::Item, Error> {
        let item: LabeledData = read_json(file_path)?;
        debug!("loaded {} training and {} validation examples from {}",
            item.training_data.len(), item.validation_data.len(), file_path.display());
        Ok(item)
    }
}

impl ReadFile for SimilarityTable {
    type Item = Self;
    fn read_file(file_path: &Path) -> Result<Self::Item, Error> {
        let item: SimilarityTable = read_json(file_path)?;
        debug!("loaded similarities for {} words from {}", item.len(), file_path.display());
        Ok(item)
    }
}

fn read_json<T: DeserializeOwned>(file_path: &Path) -> Result<T, Error> {
    let f = File::open(file_path).map_err(|source| Error::Unavailable {
        path: file_path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::Malformed {
        path: file_path.to_path_buf(),
        source,
    })
}


#[cfg(test)]
mod tests {

    use super::{Config, LabeledData, RunParams, SimilarityTable, as_usize, read_input};
    use crate::error::Error;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_without_file() {

        let config = Config::new(None).unwrap();
        let params = config.get_params();
        assert_eq!(params, RunParams::default());
        assert_eq!(params.train.initial_rate, 0.1);
        assert_eq!(params.train.decay_rate, 0.01);
        assert_eq!(params.train.epochs, 10);
        assert_eq!(params.train.patience, 3);
        assert!(params.train.reinforce_on_create);
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "run.json", r#"{
            "training_file": "data/train.json",
            "epochs": 4,
            "initial_rate": 0.5,
            "reinforce_on_create": false,
            "classify": ["gato", "boat"],
            "similarity_queries": [["house", "home"]]
        }"#);

        let params = Config::new(Some(&path)).unwrap().get_params();
        assert_eq!(params.training_file, Path::new("data/train.json"));
        assert_eq!(params.similarity_file, Path::new("word_similarity.json"));
        assert_eq!(params.train.epochs, 4);
        assert_eq!(params.train.initial_rate, 0.5);
        assert_eq!(params.train.patience, 3);
        assert!(!params.train.reinforce_on_create);
        assert_eq!(params.classify, vec!["gato".to_string(), "boat".to_string()]);
        assert_eq!(params.similarity_queries, vec![("house".to_string(), "home".to_string())]);
    }

    #[test]
    fn rejects_out_of_range_values() {

        let dir = TempDir::new().unwrap();
        let cases = [
            (r#"{"initial_rate": 0.0}"#, "initial_rate"),
            (r#"{"decay_rate": -0.1}"#, "decay_rate"),
            (r#"{"patience": 0}"#, "patience"),
            (r#"{"epochs": -3}"#, "epochs"),
            (r#"{"num_threads": 0}"#, "num_threads"),
            (r#"{"epochs": "ten"}"#, "epochs"),
            (r#"{"similarity_queries": [["car"]]}"#, "similarity_queries"),
        ];

        for (content, field) in cases {
            let path = write(&dir, "bad.json", content);
            match Config::new(Some(&path)) {
                Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, field),
                Err(e) => panic!("unexpected error for {}: {}", content, e),
                Ok(_) => panic!("{} should be rejected", content),
            }
        }
    }

    #[test]
    fn reads_labeled_data() {

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "training_data.json", r#"{
            "training_data": [
                {"word": "boat", "language": "english"},
                {"word": "gato", "language": "spanish"}
            ],
            "validation_data": [
                {"word": "boat", "language": "english"}
            ]
        }"#);

        let data = read_input::<LabeledData>(&path).unwrap();
        assert_eq!(data.training_data.len(), 2);
        assert_eq!(data.training_data[1].token, "gato");
        assert_eq!(data.training_data[1].label, "spanish");
        assert_eq!(data.validation_data.len(), 1);
    }

    #[test]
    fn missing_example_lists_are_empty() {

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "only_validation.json", r#"{
            "validation_data": [{"word": "boat", "language": "english"}]
        }"#);
        let data = read_input::<LabeledData>(&path).unwrap();
        assert!(data.training_data.is_empty());
        assert_eq!(data.validation_data.len(), 1);

        let path = write(&dir, "empty.json", "{}");
        assert_eq!(read_input::<LabeledData>(&path).unwrap(), LabeledData::default());
    }

    #[test]
    fn integer_values_must_fit_usize() {

        assert_eq!(as_usize(&json!(12), "epochs").unwrap(), 12);
        assert!(as_usize(&json!(1e20), "epochs").is_err());
        assert!(as_usize(&json!(-1), "epochs").is_err());

        #[cfg(target_pointer_width = "64")]
        assert_eq!(as_usize(&json!(u64::MAX), "epochs").unwrap(), usize::MAX);
        #[cfg(target_pointer_width = "32")]
        assert!(matches!(
            as_usize(&json!(u64::from(u32::MAX) + 1), "epochs"),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn reads_similarity_table() {

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "word_similarity.json", r#"{
            "car": {"automobile": 0.9, "bicycle": 0.3},
            "house": {"home": 0.8}
        }"#);

        let table = read_input::<SimilarityTable>(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["car"]["automobile"], 0.9);
        assert_eq!(table["house"]["home"], 0.8);
    }

    #[test]
    fn missing_file_is_unavailable() {

        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(read_input::<LabeledData>(&missing), Err(Error::Unavailable { .. })));
        assert!(matches!(Config::new(Some(&missing)), Err(Error::Unavailable { .. })));
    }

    #[test]
    fn wrong_shape_is_malformed() {

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", r#"{"training_data": [{"word": "boat"}]}"#);
        assert!(matches!(read_input::<LabeledData>(&path), Err(Error::Malformed { .. })));

        let path = write(&dir, "scores.json", r#"{"car": {"automobile": "high"}}"#);
        assert!(matches!(read_input::<SimilarityTable>(&path), Err(Error::Malformed { .. })));
    }

}
