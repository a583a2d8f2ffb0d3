use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::table::Syntax;

pub const DEFAULT_MARKER: &str = "…";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Flags that can be stored in a config file or given on the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub syntax: Option<Syntax>,
    pub marker: Option<String>,
    pub debounce_ms: Option<u64>,
    pub todo_keywords: Option<Vec<String>>,
    pub verbose: bool,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            syntax: other.syntax.or(self.syntax),
            marker: other.marker.clone().or_else(|| self.marker.clone()),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            todo_keywords: other
                .todo_keywords
                .clone()
                .or_else(|| self.todo_keywords.clone()),
            verbose: self.verbose || other.verbose,
        }
    }

    /// Fill in defaults for everything left unset.
    pub fn resolve(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            syntax: self.syntax,
            marker: self.marker.clone().unwrap_or(defaults.marker),
            debounce_ms: self.debounce_ms.unwrap_or(defaults.debounce_ms),
            todo_keywords: self
                .todo_keywords
                .clone()
                .unwrap_or(defaults.todo_keywords),
        }
    }
}

/// Resolved settings handed to a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Forced table syntax. `None` means guess from the file extension.
    pub syntax: Option<Syntax>,
    /// Glyph drawn where a max-width cell is cut.
    pub marker: String,
    /// Quiet period before projections are recomputed.
    pub debounce_ms: u64,
    /// TODO state sequence used by outline sorting.
    pub todo_keywords: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            syntax: None,
            marker: DEFAULT_MARKER.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            todo_keywords: vec!["TODO".to_string(), "DONE".to_string()],
        }
    }
}

impl EngineConfig {
    /// Syntax to use for `path`.
    pub fn syntax_for(&self, path: &Path) -> Syntax {
        self.syntax.unwrap_or_else(|| Syntax::for_path(path))
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("pipetable").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("pipetable")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("pipetable").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("pipetable")
                .join("config");
        }
    }

    PathBuf::from(".pipetablerc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".pipetablerc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# pipetable defaults (saved with --save)".to_string()];
    if let Some(syntax) = flags.syntax {
        let name = match syntax {
            Syntax::Org => "org",
            Syntax::Markdown => "markdown",
        };
        lines.push(format!("--syntax {name}"));
    }
    if let Some(marker) = &flags.marker {
        lines.push(format!("--marker {marker}"));
    }
    if let Some(ms) = flags.debounce_ms {
        lines.push(format!("--debounce-ms {ms}"));
    }
    if let Some(keywords) = &flags.todo_keywords {
        lines.push(format!("--todo-keywords {}", keywords.join(",")));
    }
    if flags.verbose {
        lines.push("--verbose".to_string());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list. Unknown tokens are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        if name == "--verbose" || name == "-v" {
            flags.verbose = true;
            i += 1;
            continue;
        }
        if !matches!(
            name,
            "--syntax" | "--marker" | "--debounce-ms" | "--todo-keywords"
        ) {
            i += 1;
            continue;
        }
        let value = match inline {
            Some(value) => Some(value),
            None => {
                i += 1;
                tokens.get(i).map(String::as_str)
            }
        };
        if let Some(value) = value {
            apply_option(&mut flags, name, value);
        }
        i += 1;
    }
    flags
}

fn apply_option(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--syntax" => flags.syntax = parse_syntax(value),
        "--marker" if !value.is_empty() => flags.marker = Some(value.to_string()),
        "--debounce-ms" => flags.debounce_ms = value.parse().ok(),
        "--todo-keywords" => {
            let keywords: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect();
            flags.todo_keywords = (!keywords.is_empty()).then_some(keywords);
        }
        _ => {}
    }
}

fn parse_syntax(s: &str) -> Option<Syntax> {
    match s {
        "org" => Some(Syntax::Org),
        "markdown" | "md" => Some(Syntax::Markdown),
        _ => None,
    }
}
