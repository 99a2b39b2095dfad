use std::collections::HashMap;
use std::path::Path;

use super::value::{yaml_key, ConfigValue};
use super::{normalize_key, ConfigError};

pub(crate) type Values = HashMap<String, ConfigValue>;

/// Merge `path` into `values`. A missing file is not an error.
pub(crate) fn load_yaml_file(path: &Path, values: &mut Values) -> Result<(), ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(ConfigError::Load(format!("{}: {e}", path.display()))),
    };
    load_yaml_str(&content, values).map_err(|e| match e {
        ConfigError::Load(msg) => ConfigError::Load(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::debug!(file = %path.display(), "Merged configuration file");
    Ok(())
}

pub(crate) fn load_yaml_str(content: &str, values: &mut Values) -> Result<(), ConfigError> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml(&document, values);
    Ok(())
}

/// Every node below the root is stored under its dotted path, so a section
/// such as `servers` is readable whole and leaf by leaf (`servers.0.url`).
fn flatten_yaml(root: &serde_yaml::Value, out: &mut Values) {
    let mut pending: Vec<(String, &serde_yaml::Value)> = vec![(String::new(), root)];
    while let Some((path, node)) = pending.pop() {
        if !path.is_empty() {
            out.insert(normalize_key(&path), ConfigValue::from(node));
        }
        let child = |segment: String| {
            if path.is_empty() {
                segment
            } else {
                format!("{path}.{segment}")
            }
        };
        match node {
            serde_yaml::Value::Mapping(map) => {
                pending.extend(map.iter().map(|(k, v)| (child(yaml_key(k)), v)));
            }
            serde_yaml::Value::Sequence(items) if !path.is_empty() => {
                pending.extend(items.iter().enumerate().map(|(i, v)| (child(i.to_string()), v)));
            }
            _ => {}
        }
    }
}
