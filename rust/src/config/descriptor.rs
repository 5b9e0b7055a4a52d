use crate::error::{CscopeError, Result};
use crate::util::{absolutize, expand_tilde};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s*$").expect("section pattern"));
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^=:\s][^=:]*?)\s*[=:]\s*(.*)$").expect("option pattern"));

/// Validated project descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub name: String,
    /// Absolute, existing directory.
    pub root_path: PathBuf,
    /// Never empty.
    pub file_patterns: Vec<String>,
    pub library_paths: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Reads and validates the descriptor at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let origin = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|source| CscopeError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
            cwd.join(path)
        };
        let text = fs::read_to_string(&origin).map_err(|source| CscopeError::ConfigRead {
            path: origin.clone(),
            source,
        })?;
        Self::parse(&text, &origin)
    }

    /// Parses descriptor text. `origin` names the file in errors and anchors
    /// relative `path`/`libs` entries to its directory.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let entries = parse_entries(text, origin)?;
        let base = origin.parent().unwrap_or_else(|| Path::new("/"));

        let missing = |field: &'static str| CscopeError::ConfigMissingField {
            path: origin.to_path_buf(),
            field,
        };

        let name = entries.get("name").ok_or_else(|| missing("name"))?.trim();
        let raw_path = entries.get("path").ok_or_else(|| missing("path"))?.trim();
        let file_patterns: Vec<String> = entries
            .get("files")
            .ok_or_else(|| missing("files"))?
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if file_patterns.is_empty() {
            return Err(missing("files"));
        }
        let library_paths: Vec<PathBuf> = entries
            .get("libs")
            .map(|libs| {
                libs.split('\n')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| absolutize(expand_tilde(l), base))
                    .collect()
            })
            .unwrap_or_default();

        if !is_valid_name(name) {
            return Err(CscopeError::ConfigInvalidName(name.to_string()));
        }

        let root_path = absolutize(expand_tilde(raw_path), base);
        if !root_path.is_dir() {
            return Err(CscopeError::ConfigPathNotFound(root_path));
        }

        Ok(Self {
            name: name.to_string(),
            root_path,
            file_patterns,
            library_paths,
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

/// Collects the options of the implicit top-level section.
///
/// Keys are lowercased. An indented line continues the previous value on a
/// new line; blank lines inside a value are kept for the caller to filter.
fn parse_entries(text: &str, origin: &Path) -> Result<HashMap<String, String>> {
    let mut entries: HashMap<String, String> = HashMap::new();
    let mut current: Option<String> = None;
    let mut in_root = true;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let Some(key) = &current {
                if let Some(value) = entries.get_mut(key) {
                    value.push('\n');
                }
            }
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let indented = line.starts_with(|c: char| c.is_whitespace());
        if indented {
            if let Some(key) = &current {
                if let Some(value) = entries.get_mut(key) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }
            if !in_root {
                continue;
            }
        }

        if let Some(caps) = SECTION_RE.captures(trimmed) {
            log::debug!(
                "{}: section [{}] ends the project options",
                origin.display(),
                &caps[1]
            );
            in_root = false;
            current = None;
            continue;
        }

        let Some(caps) = OPTION_RE.captures(trimmed) else {
            return Err(CscopeError::ConfigSyntax {
                path: origin.to_path_buf(),
                line: idx + 1,
                text: trimmed.to_string(),
            });
        };
        if !in_root {
            current = None;
            continue;
        }

        let key = caps[1].trim().to_lowercase();
        if entries.contains_key(&key) {
            return Err(CscopeError::ConfigDuplicateField {
                path: origin.to_path_buf(),
                field: key,
            });
        }
        entries.insert(key.clone(), caps[2].trim().to_string());
        current = Some(key);
    }

    for value in entries.values_mut() {
        let end = value.trim_end_matches('\n').len();
        value.truncate(end);
    }
    Ok(entries)
}
