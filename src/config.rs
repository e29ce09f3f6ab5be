use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use datacol_core::Settings;

fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("org", "datacol", "datacol")?;
    Some(proj.config_dir().to_path_buf())
}

pub(crate) fn default_functions_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("default.rhai");
    Some(path)
}

pub(crate) fn default_settings_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("datacol.toml");
    Some(path)
}

pub(crate) fn prepend_default_functions_if_present(functions: &mut Vec<PathBuf>, no_default_functions: bool) {
    if no_default_functions {
        return;
    }
    let Some(path) = default_functions_path() else {
        return;
    };
    if path.is_file() {
        functions.insert(0, path);
    } else {
        tracing::debug!(path = %path.display(), "no default functions file");
    }
}

/// Concatenated contents of all function files, or `None` when there are none.
pub(crate) fn read_functions(paths: &[PathBuf]) -> anyhow::Result<Option<String>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let mut script = String::new();
    for path in paths {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read functions file {}: {}", path.display(), e))?;
        script.push_str(&content);
        script.push('\n');
    }
    Ok(Some(script))
}

/// Settings from `explicit` if given (must exist), else from the default
/// location if present, else defaults.
pub(crate) fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e));
    }
    match default_settings_path() {
        Some(path) if path.is_file() => Ok(Settings::load(&path)?),
        _ => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_deterministic() {
        // Should never panic and should either be Some(path) or None.
        assert_eq!(default_functions_path(), default_functions_path());
        assert_eq!(default_settings_path(), default_settings_path());
    }

    #[test]
    fn no_default_functions_leaves_list_alone() {
        let mut functions = vec![PathBuf::from("mine.rhai")];
        prepend_default_functions_if_present(&mut functions, true);
        assert_eq!(functions, vec![PathBuf::from("mine.rhai")]);
    }

    #[test]
    fn missing_functions_file_is_an_error() {
        let missing = vec![PathBuf::from("/definitely/not/here.rhai")];
        assert!(read_functions(&missing).is_err());
        assert!(read_functions(&[]).unwrap().is_none());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load_settings(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
