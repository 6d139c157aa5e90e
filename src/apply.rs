use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use regex::bytes::Regex;
use tracing::{debug, warn};

use crate::command;
use crate::config::{self, AppRule, PropertyMap, ReplacementRule, RuleSet, ThemeTable};
use crate::error::{Result, SwitchError};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const PLACEHOLDER: &str = "{}";

/// Applies `theme_name` to every configured application, stopping at the
/// first fatal error. Applications already rewritten stay rewritten.
pub fn apply_theme(theme_name: &str, themes: &ThemeTable, rules: &RuleSet) -> Result<()> {
    let values = themes
        .get(theme_name)
        .ok_or_else(|| SwitchError::UnknownTheme {
            theme: theme_name.to_string(),
        })?;

    for (app, rule) in rules {
        apply_rule_to_app(app, rule, values, theme_name)?;
    }
    Ok(())
}

fn apply_rule_to_app(app: &str, rule: &AppRule, values: &PropertyMap, theme: &str) -> Result<()> {
    let path = config::expand_path(&rule.path)?;
    let file_error = |source| SwitchError::FileIo {
        app: app.to_string(),
        path: path.clone(),
        source,
    };

    let content = fs::read(&path).map_err(file_error)?;
    let rewritten = rewrite(&content, &rule.replacements, values, app, theme)?;
    write_target(&path, &rewritten).map_err(file_error)?;
    debug!(app, path = %path.display(), "applied theme '{theme}'");

    if let Some(cmd) = rule.command() {
        command::run(cmd, app);
    }
    Ok(())
}

/// Runs each replacement over `content` in order, feeding each output into the
/// next. Keys missing from `values` are skipped with a warning. Works on raw
/// bytes so lines that are not UTF-8 pass through untouched.
pub fn rewrite(
    content: &[u8],
    replacements: &[ReplacementRule],
    values: &PropertyMap,
    app: &str,
    theme: &str,
) -> Result<Vec<u8>> {
    let mut text = content.to_vec();
    for rep in replacements {
        let Some(value) = values.get(&rep.key) else {
            warn!(app, key = %rep.key, "key '{}' not found in theme '{theme}'", rep.key);
            continue;
        };

        let re = Regex::new(&rep.regex).map_err(|source| SwitchError::InvalidRegex {
            key: rep.key.clone(),
            app: app.to_string(),
            source,
        })?;

        let replacement = substitution(&rep.replace, value);
        text = re.replace_all(&text, replacement.as_bytes()).into_owned();
    }
    Ok(text)
}

/// Fills the first `{}` in `template` with `value`; later ones stay literal.
pub fn substitution(template: &str, value: &str) -> String {
    template.replacen(PLACEHOLDER, value, 1)
}

fn write_target(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.flush()
}
