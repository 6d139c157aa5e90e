use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::error::{Result, SwitchError};

const DEFAULT_CONFIG_DIR: &str = "~/.config/t-switch";
const CONFIG_DIR_ENV: &str = "T_SWITCH_CONFIG_DIR";
const THEMES_FILE: &str = "themes.yaml";
const RULES_FILE: &str = "configs.yaml";

pub type PropertyMap = BTreeMap<String, String>;
pub type ThemeTable = BTreeMap<String, PropertyMap>;
pub type RuleSet = BTreeMap<String, AppRule>;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AppRule {
    pub path: String,
    #[serde(default)]
    pub replacements: Vec<ReplacementRule>,
    #[serde(default)]
    pub cmd: Option<String>,
}

impl AppRule {
    /// The post-apply command, if one is configured and not blank.
    pub fn command(&self) -> Option<&str> {
        self.cmd
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ReplacementRule {
    pub key: String,
    pub regex: String,
    pub replace: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigPaths {
    pub themes_file: PathBuf,
    pub rules_file: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self> {
        Self::with_override(std::env::var(CONFIG_DIR_ENV).ok())
    }

    fn with_override(dir: Option<String>) -> Result<Self> {
        let dir = dir
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());
        Ok(Self::from_dir(expand_path(&dir)?))
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            themes_file: dir.join(THEMES_FILE),
            rules_file: dir.join(RULES_FILE),
        }
    }
}

pub fn load(paths: &ConfigPaths) -> Result<(ThemeTable, RuleSet)> {
    let themes = load_themes(&paths.themes_file)?;
    let rules = load_rules(&paths.rules_file)?;
    Ok((themes, rules))
}

pub fn load_themes(path: &Path) -> Result<ThemeTable> {
    let raw: BTreeMap<String, BTreeMap<String, ThemeValue>> = read_document(path)?;
    Ok(raw
        .into_iter()
        .map(|(name, props)| {
            let props = props.into_iter().map(|(key, value)| (key, value.0)).collect();
            (name, props)
        })
        .collect())
}

/// A theme property as written in YAML. Plain scalars such as `0.9`, `12` or
/// `true` keep their text.
#[derive(Deserialize)]
struct ThemeValue(#[serde(deserialize_with = "scalar_text")] String);

fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        Value::Sequence(_) => Err(not_scalar("a sequence")),
        Value::Mapping(_) => Err(not_scalar("a mapping")),
        Value::Tagged(_) => Err(not_scalar("a tagged value")),
    }
}

fn not_scalar<E: de::Error>(found: &str) -> E {
    E::custom(format!("expected a scalar theme value, found {found}"))
}

pub fn load_rules(path: &Path) -> Result<RuleSet> {
    read_document(path)
}

fn read_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let data = fs::read_to_string(path).map_err(|source| SwitchError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    // an empty or comment-only document parses to null
    let value: serde_yaml::Value =
        serde_yaml::from_str(&data).map_err(|source| SwitchError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(|source| SwitchError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces a leading `~` with the current user's home directory.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };
    let home = dirs::home_dir().ok_or_else(|| SwitchError::PathExpansion {
        path: path.to_string(),
    })?;
    let mut expanded = OsString::from(home);
    expanded.push(rest);
    Ok(PathBuf::from(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const THEMES: &str = r##"
tokyo-night:
  background: "#1a1b26"
  foreground: "#c0caf5"
dark:
  bg: "#000000"
gruvbox:
  background: "#282828"
"##;

    const RULES: &str = r##"
kitty:
  path: ~/.config/kitty/theme.conf
  replacements:
    - key: background
      regex: "background .*"
      replace: "background {}"
  cmd: kill -SIGUSR1 $(pidof kitty)
tmux:
  path: /tmp/tmux.conf
"##;

    fn write_config(dir: &Path, themes: &str, rules: &str) -> ConfigPaths {
        let paths = ConfigPaths::from_dir(dir);
        fs::write(&paths.themes_file, themes).unwrap();
        fs::write(&paths.rules_file, rules).unwrap();
        paths
    }

    #[test]
    fn loads_both_documents() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), THEMES, RULES);

        let (themes, rules) = load(&paths).unwrap();

        assert_eq!(themes.len(), 3);
        assert_eq!(themes["dark"].get("bg").map(String::as_str), Some("#000000"));
        let kitty = &rules["kitty"];
        assert_eq!(kitty.replacements.len(), 1);
        assert_eq!(kitty.replacements[0].replace, "background {}");
        assert_eq!(kitty.command(), Some("kill -SIGUSR1 $(pidof kitty)"));

        let tmux = &rules["tmux"];
        assert!(tmux.replacements.is_empty());
        assert_eq!(tmux.command(), None);
    }

    #[test]
    fn theme_names_are_sorted_and_stable() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), THEMES, RULES);

        let first: Vec<String> = load_themes(&paths.themes_file).unwrap().into_keys().collect();
        let second: Vec<String> = load_themes(&paths.themes_file).unwrap().into_keys().collect();

        assert_eq!(first, vec!["dark", "gruvbox", "tokyo-night"]);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_source_is_a_read_error_naming_the_file() {
        let dir = tempdir().unwrap();
        let paths = ConfigPaths::from_dir(dir.path());

        let err = load(&paths).unwrap_err();

        match &err {
            SwitchError::ConfigRead { path, .. } => assert_eq!(path, &paths.themes_file),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("themes.yaml"));
    }

    #[test]
    fn malformed_rules_are_a_parse_error_naming_the_file() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), THEMES, "kitty: [unterminated");

        let err = load(&paths).unwrap_err();

        match &err {
            SwitchError::ConfigParse { path, .. } => assert_eq!(path, &paths.rules_file),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("configs.yaml"));
    }

    #[test]
    fn wrong_shape_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), "dark: [1, 2, 3]", RULES);

        assert!(matches!(
            load(&paths),
            Err(SwitchError::ConfigParse { .. })
        ));
    }

    #[test]
    fn plain_scalar_values_keep_their_text() {
        let dir = tempdir().unwrap();
        let themes = "dark:\n  bg: \"#000000\"\n  opacity: 0.9\n  size: 12\n  bold: true\n";
        let paths = write_config(dir.path(), themes, RULES);

        let (themes, _) = load(&paths).unwrap();

        let dark = &themes["dark"];
        assert_eq!(dark["bg"], "#000000");
        assert_eq!(dark["opacity"], "0.9");
        assert_eq!(dark["size"], "12");
        assert_eq!(dark["bold"], "true");
    }

    #[test]
    fn nested_theme_values_are_a_parse_error() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), "dark:\n  bg: [1, 2]\n", RULES);

        let err = load(&paths).unwrap_err();

        match &err {
            SwitchError::ConfigParse { path, .. } => assert_eq!(path, &paths.themes_file),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("scalar theme value"), "{err}");
    }

    #[test]
    fn empty_documents_yield_empty_tables() {
        let dir = tempdir().unwrap();
        let paths = write_config(dir.path(), "", "# nothing yet\n");

        let (themes, rules) = load(&paths).unwrap();

        assert!(themes.is_empty());
        assert!(rules.is_empty());
    }

    #[test]
    fn blank_command_is_treated_as_absent() {
        let rule = AppRule {
            path: "/tmp/x".into(),
            replacements: Vec::new(),
            cmd: Some("   ".into()),
        };
        assert_eq!(rule.command(), None);
    }

    #[test]
    fn expands_leading_tilde_only() {
        let home = dirs::home_dir().unwrap();

        assert_eq!(
            expand_path("~/.config/kitty.conf").unwrap(),
            home.join(".config/kitty.conf")
        );
        assert_eq!(expand_path("~").unwrap(), home);
        assert_eq!(
            expand_path("/etc/~/file").unwrap(),
            PathBuf::from("/etc/~/file")
        );
    }

    #[test]
    fn config_dir_override_is_used_when_set() {
        let paths = ConfigPaths::with_override(Some("/opt/themes".into())).unwrap();
        assert_eq!(paths.themes_file, PathBuf::from("/opt/themes/themes.yaml"));
        assert_eq!(paths.rules_file, PathBuf::from("/opt/themes/configs.yaml"));

        let default = ConfigPaths::with_override(None).unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            default.themes_file,
            home.join(".config/t-switch/themes.yaml")
        );
    }
}
