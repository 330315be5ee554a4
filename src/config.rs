//! Engine configuration.
//!
//! Defaults reproduce the stock migration: `utils.Logger.<Level>(msg, zap.<Kind>(..))`
//! becomes `logger.<Level>().<Method>(..).Msg(msg)`. A YAML file (schema `version: 1`)
//! can switch the policy and scope, rename the APIs involved, and extend the level and
//! field tables. Table entries from the file are merged onto the defaults.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported configuration schema versions.
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing 'version' field in configuration file; add 'version: 1' at the top")]
    MissingVersion,

    #[error("unsupported configuration version {found}; supported versions: {supported:?}")]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("'{field}' must be a Go identifier, got {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("'{field}' must not be empty")]
    Empty { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What to do with a field argument that is not a `<ns>.<Kind>(..)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Skip the field with a diagnostic and keep rewriting.
    #[default]
    Lenient,
    /// Abort the rewrite of the whole file.
    Strict,
}

/// How the logger is reached, both in the matched call and in the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerScope {
    /// A package-level accessor (`utils.Logger`), replaced by a free identifier.
    #[default]
    Global,
    /// A field of the method receiver (`s.logger`).
    Receiver,
}

/// The logging API being migrated away from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceApi {
    pub import_path: String,
    /// Package part of the global accessor.
    pub accessor_package: String,
    /// Name part of the global accessor.
    pub accessor_name: String,
}

impl Default for SourceApi {
    fn default() -> Self {
        Self {
            import_path: "go.uber.org/zap".into(),
            accessor_package: "utils".into(),
            accessor_name: "Logger".into(),
        }
    }
}

/// The logging API being migrated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetApi {
    pub import_path: String,
    /// Free identifier holding the logger in global scope.
    pub logger_ident: String,
    /// Receiver field holding the logger in receiver scope (`s.logger`).
    pub receiver_field: String,
    /// Terminal method receiving the message.
    pub message_method: String,
    /// Field method taking an error; its argument gets wrapped.
    pub error_method: String,
}

impl Default for TargetApi {
    fn default() -> Self {
        Self {
            import_path: "github.com/rs/zerolog".into(),
            logger_ident: "logger".into(),
            receiver_field: "logger".into(),
            message_method: "Msg".into(),
            error_method: "Err".into(),
        }
    }
}

/// `errors.Wrap(err, "from error")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WrapHelper {
    pub import_path: String,
    /// Preferred local name of the helper package.
    pub package: String,
    /// Local name used when `package` is already taken by another import.
    pub fallback_alias: String,
    pub function: String,
    pub message: String,
}

impl Default for WrapHelper {
    fn default() -> Self {
        Self {
            import_path: "github.com/pkg/errors".into(),
            package: "errors".into(),
            fallback_alias: "pkgerrors".into(),
            function: "Wrap".into(),
            message: "from error".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub policy: ErrorPolicy,
    pub scope: LoggerScope,
    pub source: SourceApi,
    pub target: TargetApi,
    pub wrap: WrapHelper,
    /// Source level method → target level method.
    pub levels: IndexMap<String, String>,
    /// Source field constructor → target field method.
    pub fields: IndexMap<String, String>,
}

fn table(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::default(),
            scope: LoggerScope::default(),
            source: SourceApi::default(),
            target: TargetApi::default(),
            wrap: WrapHelper::default(),
            levels: table(&[
                ("Debug", "Debug"),
                ("Info", "Info"),
                ("Warn", "Warn"),
                ("Error", "Error"),
                ("DPanic", "Panic"),
                ("Panic", "Panic"),
                ("Fatal", "Fatal"),
            ]),
            fields: table(&[
                ("String", "Str"),
                ("Int", "Int"),
                ("Int8", "Int8"),
                ("Int16", "Int16"),
                ("Int32", "Int32"),
                ("Int64", "Int64"),
                ("Uint", "Uint"),
                ("Uint8", "Uint8"),
                ("Uint16", "Uint16"),
                ("Uint32", "Uint32"),
                ("Uint64", "Uint64"),
                ("Float32", "Float32"),
                ("Float64", "Float64"),
                ("Bool", "Bool"),
                ("Duration", "Dur"),
                ("Time", "Time"),
                ("Any", "Interface"),
                ("Error", "Err"),
                ("Strings", "Strs"),
                ("Stringer", "Stringer"),
            ]),
        }
    }
}

/// On-disk schema, version 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileV1 {
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<ErrorPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<LoggerScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceApi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetApi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap: Option<WrapHelper>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub levels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, String>,
}

fn is_go_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn check_ident(field: &str, value: &str) -> ConfigResult<()> {
    if is_go_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

fn check_non_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        Err(ConfigError::Empty {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}

impl Config {
    /// Loads a v1 YAML file and merges it onto the defaults.
    pub fn from_yaml_file(path: &Path) -> ConfigResult<Config> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Config> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;
        let version = file.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let mut config = Config::default();
        if let Some(policy) = file.policy {
            config.policy = policy;
        }
        if let Some(scope) = file.scope {
            config.scope = scope;
        }
        if let Some(source) = file.source {
            config.source = source;
        }
        if let Some(target) = file.target {
            config.target = target;
        }
        if let Some(wrap) = file.wrap {
            config.wrap = wrap;
        }
        config.levels.extend(file.levels);
        config.fields.extend(file.fields);

        config.validate()?;
        Ok(config)
    }

    /// Checks that every name the rewriter will emit is a valid identifier.
    pub fn validate(&self) -> ConfigResult<()> {
        check_non_empty("source.import_path", &self.source.import_path)?;
        check_ident("source.accessor_package", &self.source.accessor_package)?;
        check_ident("source.accessor_name", &self.source.accessor_name)?;

        check_non_empty("target.import_path", &self.target.import_path)?;
        check_ident("target.logger_ident", &self.target.logger_ident)?;
        check_ident("target.receiver_field", &self.target.receiver_field)?;
        check_ident("target.message_method", &self.target.message_method)?;
        check_ident("target.error_method", &self.target.error_method)?;

        check_non_empty("wrap.import_path", &self.wrap.import_path)?;
        check_ident("wrap.package", &self.wrap.package)?;
        check_ident("wrap.fallback_alias", &self.wrap.fallback_alias)?;
        check_ident("wrap.function", &self.wrap.function)?;

        for (from, to) in &self.levels {
            check_ident("levels", from)?;
            check_ident("levels", to)?;
        }
        for (from, to) in &self.fields {
            check_ident("fields", from)?;
            check_ident("fields", to)?;
        }
        Ok(())
    }

    #[inline]
    pub fn target_level(&self, source_level: &str) -> Option<&str> {
        self.levels.get(source_level).map(String::as_str)
    }

    #[inline]
    pub fn target_field(&self, source_kind: &str) -> Option<&str> {
        self.fields.get(source_kind).map(String::as_str)
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_scope(mut self, scope: LoggerScope) -> Self {
        self.scope = scope;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_migration() {
        let c = Config::default();
        assert_eq!(c.policy, ErrorPolicy::Lenient);
        assert_eq!(c.scope, LoggerScope::Global);
        assert_eq!(c.target_level("DPanic"), Some("Panic"));
        assert_eq!(c.target_field("Duration"), Some("Dur"));
        assert_eq!(c.target_field("Any"), Some("Interface"));
        assert_eq!(c.target_field("Reflect"), None);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_merge_onto_defaults() {
        let yaml = r#"
version: 1
policy: strict
scope: receiver
target:
  receiver_field: log
fields:
  Reflect: Interface
  String: Str
"#;
        let c = Config::from_yaml_str(yaml).expect("valid config");
        assert_eq!(c.policy, ErrorPolicy::Strict);
        assert_eq!(c.scope, LoggerScope::Receiver);
        assert_eq!(c.target.receiver_field, "log");
        // untouched keys of a section keep their defaults
        assert_eq!(c.target.logger_ident, "logger");
        assert_eq!(c.target_field("Reflect"), Some("Interface"));
        assert_eq!(c.target_field("Bool"), Some("Bool"));
    }

    #[test]
    fn version_is_required_and_checked() {
        assert!(matches!(
            Config::from_yaml_str("policy: strict\n"),
            Err(ConfigError::MissingVersion)
        ));
        assert!(matches!(
            Config::from_yaml_str("version: 2\n"),
            Err(ConfigError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            Config::from_yaml_str("version: 1\nverbose: true\n"),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            Config::from_yaml_str("version: 1\ntarget:\n  logger: l\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn table_entries_must_be_identifiers() {
        let err = Config::from_yaml_str("version: 1\nfields:\n  String: \"Str()\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentifier { .. }));
    }
}
