//! Translate a parsed config document into a `ConfigInput`.
//!
//! Only shape is checked here (is `gamma` a number, is `constraints` a list).
//! Value rules live in `ConfigModel::new`. A `null` value counts as absent.
//!
//! YAML and TOML trees are walked into `serde_json::Value` by hand: JSON has
//! no NaN or infinity, and a plain conversion would turn them into `null`.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{ConfigError, ConfigInput, SlurmInput};

const TOP_LEVEL_KEYS: &[&str] = &[
    "signal_name",
    "gamma",
    "data_path",
    "project_root",
    "email",
    "byu_email",
    "constraints",
    "output_dir",
    "logs_dir",
    "constraint_registry",
    "worker",
    "slurm",
];

const SLURM_KEYS: &[&str] = &["n_cpus", "mem", "time", "mail_type", "max_concurrent_jobs"];

/// Parsed YAML → document tree. Non-finite floats are an `InvalidField`.
pub(crate) fn from_yaml(value: &serde_yaml::Value, path: &str) -> Result<Value, ConfigError> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                float(n.as_f64().unwrap_or(f64::NAN), path)?
            }
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .map(|item| from_yaml(item, path))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Number(n) => n.to_string(),
                    other => {
                        return Err(ConfigError::invalid(
                            &child(path, "<key>"),
                            format!("{other:?}"),
                            "a string key",
                        ))
                    }
                };
                let item = from_yaml(item, &child(path, &key))?;
                map.insert(key, item);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => from_yaml(&tagged.value, path)?,
    })
}

/// Parsed TOML → document tree. Non-finite floats are an `InvalidField`.
pub(crate) fn from_toml(value: &toml::Value, path: &str) -> Result<Value, ConfigError> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => float(*f, path)?,
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| from_toml(item, path))
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => {
            let mut map = Map::new();
            for (key, item) in table {
                map.insert(key.clone(), from_toml(item, &child(path, key))?);
            }
            Value::Object(map)
        }
    })
}

fn float(f: f64, path: &str) -> Result<Value, ConfigError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ConfigError::invalid(field_name(path), f, "a finite number"))
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn field_name(path: &str) -> &str {
    if path.is_empty() {
        "<document>"
    } else {
        path
    }
}

pub(crate) fn input_from_document(doc: &Value) -> Result<ConfigInput, ConfigError> {
    let map = doc
        .as_object()
        .ok_or_else(|| ConfigError::invalid("<document>", doc, "a mapping of config keys"))?;
    reject_unknown_keys(map, TOP_LEVEL_KEYS, "")?;

    let email = match (string(map, "email", "email")?, string(map, "byu_email", "byu_email")?) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::invalid(
                "email",
                "both `email` and `byu_email`",
                "only one of `email` / `byu_email`",
            ))
        }
        (email, byu_email) => email.or(byu_email),
    };

    Ok(ConfigInput {
        signal_name: string(map, "signal_name", "signal_name")?,
        gamma: gamma(map)?,
        data_path: string(map, "data_path", "data_path")?.map(PathBuf::from),
        project_root: string(map, "project_root", "project_root")?.map(PathBuf::from),
        email,
        constraints: string_list(map, "constraints")?,
        output_dir: string(map, "output_dir", "output_dir")?.map(PathBuf::from),
        logs_dir: string(map, "logs_dir", "logs_dir")?.map(PathBuf::from),
        constraint_registry: registry(map)?,
        worker: string(map, "worker", "worker")?,
        slurm: slurm(map)?,
    })
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn reject_unknown_keys(
    map: &Map<String, Value>,
    known: &[&str],
    prefix: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|k| !known.contains(&k.as_str())) {
        Some(key) => Err(ConfigError::invalid(
            &format!("{prefix}{key}"),
            "unrecognised key",
            &format!("one of: {}", known.join(", ")),
        )),
        None => Ok(()),
    }
}

fn string(map: &Map<String, Value>, key: &str, field: &str) -> Result<Option<String>, ConfigError> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::invalid(field, other, "a string")),
    }
}

/// Accepts a number or a numeric string (`gamma: "0.5"`).
fn gamma(map: &Map<String, Value>) -> Result<Option<f64>, ConfigError> {
    match present(map, "gamma") {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid("gamma", n, "a number")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::invalid("gamma", format!("{s:?}"), "a number")),
        Some(other) => Err(ConfigError::invalid("gamma", other, "a number")),
    }
}

fn string_list(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
    const EXPECTED: &str = "a list of strings";
    match present(map, key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ConfigError::invalid(key, other, EXPECTED)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(ConfigError::invalid(key, other, EXPECTED)),
    }
}

fn registry(map: &Map<String, Value>) -> Result<Option<BTreeMap<String, String>>, ConfigError> {
    const EXPECTED: &str = "a mapping of constraint name to import path";
    match present(map, "constraint_registry") {
        None => Ok(None),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(name, target)| match target {
                Value::String(s) => Ok((name.clone(), s.clone())),
                other => Err(ConfigError::invalid(
                    &format!("constraint_registry.{name}"),
                    other,
                    "an import path string",
                )),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some),
        Some(other) => Err(ConfigError::invalid("constraint_registry", other, EXPECTED)),
    }
}

fn integer(map: &Map<String, Value>, key: &str, field: &str) -> Result<Option<i64>, ConfigError> {
    match present(map, key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(field, n, "a positive integer")),
        Some(other) => Err(ConfigError::invalid(field, other, "a positive integer")),
    }
}

fn slurm(map: &Map<String, Value>) -> Result<SlurmInput, ConfigError> {
    let section = match present(map, "slurm") {
        None => return Ok(SlurmInput::default()),
        Some(Value::Object(section)) => section,
        Some(other) => {
            return Err(ConfigError::invalid(
                "slurm",
                other,
                "a mapping of scheduler settings",
            ))
        }
    };
    reject_unknown_keys(section, SLURM_KEYS, "slurm.")?;

    Ok(SlurmInput {
        n_cpus: integer(section, "n_cpus", "slurm.n_cpus")?,
        mem: string(section, "mem", "slurm.mem")?,
        time: string(section, "time", "slurm.time")?,
        mail_type: string(section, "mail_type", "slurm.mail_type")?,
        max_concurrent_jobs: integer(section, "max_concurrent_jobs", "slurm.max_concurrent_jobs")?,
    })
}
