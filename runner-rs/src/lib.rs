//! Run environment for PathFlow model binaries.
//!
//! A run request is a JSON document (on stdin) or TOML file with three
//! sections: `input` holds the model's own parameters plus the reserved
//! `seed` and `replicate` keys, `model.files` maps logical names to paths,
//! and `output` says where result files go.

pub mod error;
pub mod logging;

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use error::{Result, RunnerError};

pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: I,
    pub seed: u64,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    /// Splits a parsed run request into its sections. Missing sections
    /// leave the corresponding fields empty.
    pub fn from_json(mut data: Value) -> Self {
        let mut input_json = match data.get_mut("input").map(Value::take) {
            Some(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        let seed = take_reserved(&mut input_json, "seed");
        let replicate = take_reserved(&mut input_json, "replicate");

        let files = data
            .pointer("/model/files")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(key, path)| Some((key.clone(), PathBuf::from(path.as_str()?))))
            .collect();

        Self {
            input_json,
            input: (),
            seed,
            replicate,
            files,
            output: data.get_mut("output").map(Value::take).unwrap_or_default(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(RunnerError::EmptyInput);
        }
        let data: Value = serde_json::from_str(raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> Result<Self> {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        Self::from_json_str(&raw)
    }

    /// Reads a run request written as TOML; the section layout is the same
    /// as the JSON form.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let data: Value = toml::from_str(raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reads the run request from the file named by the first command line
    /// argument, or from stdin when there is none.
    pub fn from_args() -> Result<Self> {
        match std::env::args_os().nth(1) {
            Some(path) => {
                log::debug!("reading run request from {:?}", path);
                Self::from_toml_path(path)
            }
            None => Self::from_stdin(),
        }
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value).map_err(RunnerError::Input)?;
        Ok(Environment {
            input_json: self.input_json,
            input,
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    pub fn load() -> Result<Self> {
        Environment::from_args()?.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn file(&self, key: &str) -> Option<&Path> {
        self.files.get(key).map(PathBuf::as_path)
    }

    /// Hex SHA-256 of the input section together with seed and replicate.
    /// Object keys serialize in sorted order, so equal requests hash equally.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // A map of JSON values always serializes.
        if let Ok(bytes) = serde_json::to_vec(&self.input_json) {
            hasher.update(&bytes);
        }
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.replicate.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Directory for result files, taken from a filesystem output or from
    /// the `default` (else first) entry of a profiled output.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = filesystem_dir(&self.output) {
            return Some(dir);
        }
        let profiles = self.output.get("profile")?.as_object()?;
        profiles
            .get("default")
            .or_else(|| profiles.values().next())
            .and_then(filesystem_dir)
    }

    fn sink(&self, filename: &str) -> Result<Box<dyn Write>> {
        match self.output_dir() {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                let path = dir.join(filename);
                log::debug!("writing {}", path.display());
                Ok(Box::new(io::BufWriter::new(fs::File::create(path)?)))
            }
            None => Ok(Box::new(io::stdout())),
        }
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<()> {
        let mut sink = self.sink(filename)?;
        sink.write_all(data)?;
        sink.flush()?;
        Ok(())
    }

    pub fn write_csv<S: AsRef<str>>(
        &self,
        filename: &str,
        headers: &[S],
        rows: &[Vec<String>],
    ) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(self.sink(filename)?);
        wtr.write_record(headers.iter().map(|h| AsRef::<str>::as_ref(h)))?;
        for row in rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes serde records as CSV, with headers taken from field names.
    pub fn write_records<T: Serialize>(&self, filename: &str, records: &[T]) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(self.sink(filename)?);
        for record in records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Removes a reserved key from the input section; absent or non-integer
/// values read as 0.
fn take_reserved(input: &mut serde_json::Map<String, Value>, key: &str) -> u64 {
    input.remove(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn filesystem_dir(target: &Value) -> Option<PathBuf> {
    if target.get("spec")?.as_str()? != "filesystem" {
        return None;
    }
    target.get("dir")?.as_str().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_from_json_basic() {
        let data = json!({
            "input": {
                "seed": 42,
                "replicate": 1,
                "analysis": "global_spread"
            },
            "model": {
                "files": {
                    "regions": "/tmp/country_data.csv"
                }
            },
            "output": {
                "spec": "filesystem",
                "dir": "/tmp/output"
            }
        });
        let env = Environment::from_json(data);
        assert_eq!(env.seed, 42);
        assert_eq!(env.replicate, 1);
        assert_eq!(
            env.input_json().get("analysis").and_then(|v| v.as_str()),
            Some("global_spread")
        );
        assert!(!env.input_json().contains_key("seed"));
        assert!(!env.input_json().contains_key("replicate"));
        assert_eq!(env.file("regions"), Some(Path::new("/tmp/country_data.csv")));
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_with_input_type() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Params {
            horizon_days: usize,
        }
        let data = json!({
            "input": {
                "seed": 42,
                "horizon_days": 30
            }
        });
        let env = Environment::from_json(data).with_input_type::<Params>().unwrap();
        assert_eq!(env.input, Params { horizon_days: 30 });
        assert_eq!(env.seed, 42);
    }

    #[test]
    fn test_with_input_type_mismatch() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Params {
            horizon_days: usize,
        }
        let data = json!({ "input": { "horizon_days": "thirty" } });
        let result = Environment::from_json(data).with_input_type::<Params>();
        assert!(matches!(result, Err(RunnerError::Input(_))));
    }

    #[test]
    fn test_from_json_str_empty() {
        assert!(matches!(
            Environment::from_json_str("  \n"),
            Err(RunnerError::EmptyInput)
        ));
        assert!(matches!(
            Environment::from_json_str("{not json"),
            Err(RunnerError::Json(_))
        ));
    }

    #[test]
    fn test_from_toml_str() {
        let raw = r#"
            [input]
            seed = 7
            analysis = "healthcare_load"
            horizon_days = 45

            [model.files]
            regions = "data/country_data.csv"

            [output]
            spec = "filesystem"
            dir = "out"
        "#;
        let env = Environment::from_toml_str(raw).unwrap();
        assert_eq!(env.seed, 7);
        assert_eq!(env.replicate, 0);
        assert_eq!(
            env.input_json().get("horizon_days").and_then(|v| v.as_u64()),
            Some(45)
        );
        assert_eq!(env.file("regions"), Some(Path::new("data/country_data.csv")));
        assert_eq!(env.output_dir(), Some(PathBuf::from("out")));
    }

    #[test]
    fn test_output_dir_profiles() {
        let with_default = Environment::from_json(json!({
            "input": { "analysis": "healthcare_load", "country": "Kenya" },
            "output": {
                "profile": {
                    "archive": { "spec": "filesystem", "dir": "runs/archive" },
                    "default": { "spec": "filesystem", "dir": "runs/latest" }
                }
            }
        }));
        assert_eq!(with_default.output_dir(), Some(PathBuf::from("runs/latest")));

        // serde_json maps iterate in key order, so "batch" comes first.
        let first_listed = Environment::from_json(json!({
            "input": { "analysis": "global_spread" },
            "output": {
                "profile": {
                    "batch": { "spec": "filesystem", "dir": "runs/batch" },
                    "screen": { "spec": "stdout" }
                }
            }
        }));
        assert_eq!(first_listed.output_dir(), Some(PathBuf::from("runs/batch")));
    }

    #[test]
    fn test_stdout_output() {
        let env = Environment::from_json(json!({
            "input": { "analysis": "variant_tracking" },
            "output": { "spec": "stdout", "dir": "ignored" }
        }));
        assert_eq!(env.output_dir(), None);

        let profiled_stdout = Environment::from_json(json!({
            "output": { "profile": { "default": { "spec": "stdout" } } }
        }));
        assert_eq!(profiled_stdout.output_dir(), None);
    }

    #[test]
    fn test_bare_request() {
        let env = Environment::from_json(json!({
            "input": { "analysis": "infection_progress", "seed": "not a number" },
            "model": { "files": { "regions": 17 } }
        }));
        assert_eq!(env.seed, 0);
        assert_eq!(env.replicate, 0);
        assert_eq!(env.input_json().len(), 1);
        assert!(env.files.is_empty());
        assert_eq!(env.output_dir(), None);

        let empty = Environment::from_json(json!({}));
        assert!(empty.input_json().is_empty());
        assert_eq!(empty.output_dir(), None);
    }

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a = Environment::from_json(json!({"input": {"a": 1, "b": [1, 2]}}));
        let b = Environment::from_json(json!({"input": {"b": [1, 2], "a": 1}}));
        let c = Environment::from_json(json!({"input": {"a": 1, "b": [1, 2], "seed": 3}}));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_write_csv_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!({
            "output": {"spec": "filesystem", "dir": dir.path().join("nested")}
        });
        let env = Environment::from_json(data);
        env.write_csv(
            "series.csv",
            &["day", "infected"],
            &[
                vec!["0".to_string(), "100".to_string()],
                vec!["1".to_string(), "101.5".to_string()],
            ],
        )
        .unwrap();
        let written = fs::read_to_string(dir.path().join("nested/series.csv")).unwrap();
        assert_eq!(written, "day,infected\n0,100\n1,101.5\n");
    }

    #[test]
    fn test_write_records_uses_field_names() {
        #[derive(Serialize)]
        struct Row {
            country: &'static str,
            active_cases: u64,
        }
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::from_json(json!({
            "output": {"spec": "filesystem", "dir": dir.path()}
        }));
        env.write_records(
            "rankings.csv",
            &[Row {
                country: "Kenya",
                active_cases: 12,
            }],
        )
        .unwrap();
        let written = fs::read_to_string(dir.path().join("rankings.csv")).unwrap();
        assert_eq!(written, "country,active_cases\nKenya,12\n");
    }
}
