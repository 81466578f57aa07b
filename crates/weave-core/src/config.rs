//! Run configuration (`weave.toml`)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CoreError;
use crate::module_path::ModulePath;
use crate::naming::flat_identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Output directory; generated code goes to `<out-dir>/<binding package>`.
    pub out_dir: PathBuf,
    /// Primary module path to bind.
    pub package: String,
    /// Version of the primary module.
    pub version: String,
    /// Drop a leading `New` from constructor-like function names.
    #[serde(default)]
    pub cut_new: bool,
    /// Build tag that disables the generated bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dont_build_flag: Option<String>,
    /// Sub-modules that are never parsed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Descending naming priority; listed modules get unprefixed names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no_prefix: Vec<String>,
    /// `[prefix, module]` pairs overriding the display-name prefix of a module.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_prefixes: Vec<[String; 2]>,
    /// Standard-library modules bound in addition to the primary package.
    #[serde(default)]
    pub include_std_libs: Vec<String>,
}

impl Config {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, CoreError> {
        let config: Config = toml::from_str(content).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        Self::from_toml(&content, path)
    }

    /// Loads the config, writing the commented default first when the file is
    /// missing. The flag is true when a default was created; its placeholder
    /// values still need editing before a run makes sense.
    pub fn load_or_create_default(path: &Path) -> Result<(Self, bool), CoreError> {
        let created = if path.exists() {
            false
        } else {
            fs::write(path, default_config_toml(None, None, None, None))
                .map_err(|e| CoreError::io(path, e))?;
            info!("created default config at {}", path.display());
            true
        };
        let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let config: Config = toml::from_str(&content).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if !created {
            config.validate(path)?;
        }
        Ok((config, created))
    }

    fn validate(&self, path: &Path) -> Result<(), CoreError> {
        let invalid = |message: String| CoreError::Config {
            path: path.to_path_buf(),
            message,
        };
        if self.package.trim().is_empty() {
            return Err(invalid("`package` must not be empty".to_string()));
        }
        if self.version.trim().is_empty() {
            return Err(invalid("`version` must not be empty".to_string()));
        }
        if let Some([prefix, module]) = self
            .custom_prefixes
            .iter()
            .find(|[prefix, module]| prefix.is_empty() || module.is_empty())
        {
            return Err(invalid(format!(
                "custom prefix entry [{:?}, {:?}] has an empty element",
                prefix, module
            )));
        }
        Ok(())
    }

    /// Flat identifier of the generated package.
    pub fn binding_package(&self) -> String {
        flat_identifier(&self.package)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.out_dir.join(self.binding_package())
    }

    /// Root module paths whose sub-modules get bindings.
    pub fn target_roots(&self) -> Vec<String> {
        std::iter::once(self.package.clone())
            .chain(self.include_std_libs.iter().cloned())
            .collect()
    }

    pub fn is_excluded(&self, module: &ModulePath) -> bool {
        self.exclude.iter().any(|e| e == module.as_str())
    }
}

/// Whether an environment flag is switched on. Unset, empty and the usual
/// negative spellings count as off.
pub fn is_env_enabled(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off" | "disabled"
        ),
        Err(_) => false,
    }
}

/// Commented default configuration text.
pub fn default_config_toml(
    out_dir: Option<&str>,
    package: Option<&str>,
    version: Option<&str>,
    dont_build_flag: Option<&str>,
) -> String {
    let out_dir = out_dir.unwrap_or("../weave_bindings");
    let package = package.unwrap_or("github.com/<user>/<repo>");
    let version = version.unwrap_or("vX.Y.Z");
    let (flag_comment, flag_line) = match dont_build_flag {
        Some(flag) => ("", format!("dont-build-flag = \"{}\"", flag)),
        None => ("#", "#dont-build-flag = \"b_no_mylib\"".to_string()),
    };

    format!(
        r#"# Output directory (relative).
out-dir = "{out_dir}"
# Module path of the package to bind.
package = "{package}"
# Version of the package.
version = "{version}"
# Drop a leading "New" from function names (widget.NewLabel => widget-label, app.New => app).
cut-new = true

{flag_comment}# Build flag that disables the generated bindings (optional).
{flag_line}

## Never parse the listed modules. Useful when a repository contains
## modules that are not meant to be imported.
#exclude = [
#  "github.com/<user>/<repo>/non_runnable_code_snippets",
#]

## Descending priority. Modules not listed are always prefixed.
## When display names collide, only the module with the highest priority
## keeps the unprefixed name.
#no-prefix = [
#  "github.com/<user>/<repo>",
#  "github.com/<user>/<repo>/important",
#]

## Custom display-name prefix for every symbol of a module.
#custom-prefixes = [
#  ["my-widget", "github.com/<user>/<repo>/widget"],
#]

## Standard-library modules to bind as well.
include-std-libs = []
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Config {
        Config::from_toml(
            r#"
out-dir = "out"
package = "example.com/App"
version = "v1.2.0"
cut-new = true
no-prefix = ["example.com/App", "fmt"]
custom-prefixes = [["w", "example.com/App/widget"]]
include-std-libs = ["fmt"]
"#,
            Path::new("weave.toml"),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_kebab_keys() {
        let config = sample();
        assert!(config.cut_new);
        assert_eq!(config.dont_build_flag, None);
        assert_eq!(config.target_roots(), vec!["example.com/App", "fmt"]);
        assert_eq!(config.binding_package(), "example_com_app");
        assert_eq!(config.output_dir(), PathBuf::from("out/example_com_app"));
    }

    #[test]
    fn test_priorities_and_prefixes() {
        let config = sample();
        assert_eq!(config.no_prefix, vec!["example.com/App", "fmt"]);
        assert_eq!(
            config.custom_prefixes,
            vec![["w".to_string(), "example.com/App/widget".to_string()]]
        );
    }

    #[test]
    fn test_rejects_empty_package() {
        let err = Config::from_toml(
            "out-dir = \"o\"\npackage = \"\"\nversion = \"v1\"\n",
            Path::new("weave.toml"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("package"));
    }

    #[test]
    fn test_creates_default_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weave.toml");

        let (config, created) = Config::load_or_create_default(&path).unwrap();
        assert!(created);
        assert_eq!(config.package, "github.com/<user>/<repo>");

        let (_, created_again) = Config::load_or_create_default(&path).unwrap();
        assert!(!created_again);
    }

    #[test]
    fn test_env_flag() {
        std::env::remove_var("WEAVE_TEST_FLAG_UNSET");
        assert!(!is_env_enabled("WEAVE_TEST_FLAG_UNSET"));
        std::env::set_var("WEAVE_TEST_FLAG_OFF", "Off");
        assert!(!is_env_enabled("WEAVE_TEST_FLAG_OFF"));
        std::env::set_var("WEAVE_TEST_FLAG_ON", "1");
        assert!(is_env_enabled("WEAVE_TEST_FLAG_ON"));
    }

    #[test]
    fn test_default_template_with_flag() {
        let text = default_config_toml(Some("bindings"), Some("x.io/y"), Some("v0.1.0"), Some("b_no_y"));
        let config = Config::from_toml(&text, Path::new("weave.toml")).unwrap();
        assert_eq!(config.dont_build_flag.as_deref(), Some("b_no_y"));
        assert_eq!(config.out_dir, PathBuf::from("bindings"));
    }
}
