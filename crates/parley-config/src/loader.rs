// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use std::path::{Path, PathBuf};

use crate::schema::Config;

/// Search paths, in priority order (first wins), mirroring an XDG-ish
/// layered lookup: an explicit override, a user config directory, then a
/// project-local dotfile.
fn config_search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
        return paths;
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("parley").join("config.yaml"));
    }
    paths.push(PathBuf::from(".parley.yaml"));
    paths
}

/// Load configuration, merging the first file found on the search path
/// over the built-in defaults. An explicit path that doesn't exist is an
/// error; an implicit search path that doesn't exist is silently skipped.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = serde_yaml::to_value(Config::default())?;

    for path in config_search_paths(explicit) {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                tracing::info!(path = %path.display(), "loading config");
                let file_value: serde_yaml::Value = serde_yaml::from_str(&text)?;
                merge_yaml(&mut merged, &file_value);
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if explicit.is_some() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(serde_yaml::from_value(merged)?)
}

/// Deep-merge `src` into `dst` in place. Scalars and sequences in `src`
/// replace `dst`; mappings merge key by key; keys present only in `dst`
/// are preserved.
fn merge_yaml(dst: &mut serde_yaml::Value, src: &serde_yaml::Value) {
    match (dst, src) {
        (serde_yaml::Value::Mapping(dst_map), serde_yaml::Value::Mapping(src_map)) => {
            for (key, src_val) in src_map {
                match dst_map.get_mut(key) {
                    Some(dst_val) => merge_yaml(dst_val, src_val),
                    None => {
                        dst_map.insert(key.clone(), src_val.clone());
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merge_scalar_src_wins() {
        let mut dst: serde_yaml::Value = serde_yaml::from_str("a: 1").unwrap();
        let src: serde_yaml::Value = serde_yaml::from_str("a: 2").unwrap();
        merge_yaml(&mut dst, &src);
        assert_eq!(dst["a"], serde_yaml::Value::from(2));
    }

    #[test]
    fn merge_preserves_keys_not_in_src() {
        let mut dst: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: 2").unwrap();
        let src: serde_yaml::Value = serde_yaml::from_str("a: 9").unwrap();
        merge_yaml(&mut dst, &src);
        assert_eq!(dst["a"], serde_yaml::Value::from(9));
        assert_eq!(dst["b"], serde_yaml::Value::from(2));
    }

    #[test]
    fn merge_nested_tables() {
        let mut dst: serde_yaml::Value = serde_yaml::from_str("locale:\n  locale: en-US\n  timezone: PST").unwrap();
        let src: serde_yaml::Value = serde_yaml::from_str("locale:\n  locale: sv-SE").unwrap();
        merge_yaml(&mut dst, &src);
        assert_eq!(dst["locale"]["locale"], serde_yaml::Value::from("sv-SE"));
        assert_eq!(dst["locale"]["timezone"], serde_yaml::Value::from("PST"));
    }

    #[test]
    fn load_returns_error_when_explicit_path_missing() {
        let result = load(Some(Path::new("/nonexistent/parley-config-test.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_with_no_extra_path_returns_defaults() {
        let cfg = load(Some(Path::new("/nonexistent/parley-config-test.yaml")));
        assert!(cfg.is_err());
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "locale:\n  locale: sv-SE\n  timezone: Europe/Stockholm\n  temperature_unit: C").unwrap();
        let cfg = load(Some(file.path())).unwrap();
        assert_eq!(cfg.locale.locale, "sv-SE");
        assert_eq!(cfg.locale.temperature_unit, "C");
        assert_eq!(cfg.rulebuilder.page_size, 5);
    }
}
