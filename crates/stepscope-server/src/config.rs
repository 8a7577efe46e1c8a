//! Server configuration and editor settings.
//!
//! Two layers feed the server. [`ServerConfig`] is process-level and read
//! from environment variables prefixed with `STEPSCOPE_`. [`Settings`] is
//! workspace-level, sent by the editor as initialisation options or through
//! `workspace/didChangeConfiguration`, and converted into the engine's
//! [`MatchOptions`].

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use stepscope_patterns::{
    CustomParameter, CustomParameterMap, GherkinKind, KeywordTable, MatchOptions,
};

use crate::error::ServerError;

/// Key editors nest the settings under.
pub const SETTINGS_SECTION: &str = "cucumberautocomplete";

/// Step definition location used when the editor configures none.
const DEFAULT_STEPS_DIR: &str = "test/features/step_definitions";

/// Log level enumeration matching tracing crate levels.
///
/// Defaults to `Info` when not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Most verbose logging, includes all trace spans.
    Trace,
    /// Debug-level information for development.
    Debug,
    /// Standard informational messages.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for failures.
    Error,
}

impl FromStr for LogLevel {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ServerError::InvalidConfig(format!(
                "unknown log level '{s}', expected one of: trace, debug, info, warn, error"
            ))),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Process-level configuration for the language server.
///
/// # Environment Variables
///
/// - `STEPSCOPE_LOG_LEVEL`: Sets the log level (trace, debug, info, warn,
///   error)
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidConfig` if `STEPSCOPE_LOG_LEVEL` holds an
    /// unknown level.
    pub fn from_env() -> Result<Self, ServerError> {
        let log_level = match env::var("STEPSCOPE_LOG_LEVEL") {
            Ok(val) => val.parse()?,
            Err(_) => LogLevel::default(),
        };
        Ok(Self { log_level })
    }

    /// Apply CLI overrides, which take precedence over the environment.
    #[must_use]
    pub fn apply_overrides(mut self, log_level: Option<LogLevel>) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

/// Whether, and from where, feature files are read to count step usage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SyncFeatures {
    /// `true` reads every feature file of the workspace.
    Enabled(bool),
    /// A workspace-relative directory or glob naming the feature files.
    Pattern(String),
}

impl Default for SyncFeatures {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl SyncFeatures {
    /// Workspace-relative glob for the feature files, if syncing is
    /// enabled. The empty pattern stands for the whole workspace.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Enabled(true) => Some(""),
            Self::Enabled(false) => None,
            Self::Pattern(pattern) => Some(pattern),
        }
    }
}

/// One configured custom parameter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParameterSetting {
    /// Token written in step definitions, for example `{color}`.
    pub parameter: String,
    /// Regex source substituted for the token.
    pub value: String,
    /// Values offered when the cursor sits inside the token.
    #[serde(default)]
    pub autocomplete: Vec<String>,
    /// Shown in step documentation.
    #[serde(default)]
    pub documentation: Option<String>,
}

impl CustomParameterSetting {
    fn to_parameter(&self) -> CustomParameter {
        let parameter = CustomParameter::literal(self.parameter.as_str(), self.value.as_str())
            .with_autocomplete(self.autocomplete.iter().map(String::as_str));
        let Some(docs) = &self.documentation else {
            return parameter;
        };
        parameter.with_documentation(docs.as_str())
    }
}

/// Workspace settings sent by the editor.
///
/// Every key is optional. The object may be given flat or nested under
/// [`SETTINGS_SECTION`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "keys mirror the editor's settings schema"
)]
pub struct Settings {
    /// Workspace-relative files or directories holding step definitions.
    pub steps: Vec<String>,
    /// Feature files counted for step usage.
    #[serde(rename = "syncfeatures")]
    pub sync_features: SyncFeatures,
    /// Offer only steps declared under the effective keyword.
    pub strict_gherkin_completion: bool,
    /// Accept only steps declared under the effective keyword.
    pub strict_gherkin_validation: bool,
    /// Turn capture groups of inserted text into snippet stops.
    pub smart_snippets: bool,
    /// Register one step per alternation variant.
    pub steps_invariants: bool,
    /// Named parameters substituted into definitions.
    pub custom_parameters: Vec<CustomParameterSetting>,
    /// Fill snippet stops with custom-parameter choices.
    pub custom_parameters_autocomplete: bool,
    /// Text wrapped around choice snippets.
    pub wrap_snippets_in_character: String,
    /// Replacement keyword group of the definition grammar.
    pub gherkin_definition_part: Option<String>,
    /// Replacement delimiter of the definition grammar.
    #[serde(rename = "stepRegExSymbol")]
    pub step_regex_symbol: Option<String>,
    /// Extra keyword spellings, keyed by kind name (`Given`, `And`, ...).
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steps: vec![DEFAULT_STEPS_DIR.to_owned()],
            sync_features: SyncFeatures::default(),
            strict_gherkin_completion: false,
            strict_gherkin_validation: false,
            smart_snippets: false,
            steps_invariants: false,
            custom_parameters: Vec::new(),
            custom_parameters_autocomplete: false,
            wrap_snippets_in_character: String::new(),
            gherkin_definition_part: None,
            step_regex_symbol: None,
            keywords: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings sent by the editor.
    ///
    /// `null` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidSettings` when a key has the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use stepscope_server::config::Settings;
    ///
    /// let nested = json!({ "cucumberautocomplete": { "smartSnippets": true } });
    /// assert!(Settings::from_value(nested).expect("valid settings").smart_snippets);
    /// ```
    pub fn from_value(value: Value) -> Result<Self, ServerError> {
        let value = match value {
            Value::Object(mut map) => map
                .remove(SETTINGS_SECTION)
                .unwrap_or_else(|| Value::Object(map)),
            other => other,
        };
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Engine options equivalent to these settings.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidConfig` when `keywords` names an unknown
    /// kind.
    pub fn match_options(&self) -> Result<MatchOptions, ServerError> {
        let mut keywords = KeywordTable::default();
        for (name, words) in &self.keywords {
            let kind: GherkinKind = name
                .parse()
                .map_err(|err| ServerError::InvalidConfig(format!("keywords: {err}")))?;
            keywords = keywords.with_synonyms(kind, words.iter().map(String::as_str));
        }
        Ok(MatchOptions {
            expand_invariants: self.steps_invariants,
            strict_gherkin_completion: self.strict_gherkin_completion,
            strict_gherkin_validation: self.strict_gherkin_validation,
            smart_snippets: self.smart_snippets,
            custom_parameters_autocomplete: self.custom_parameters_autocomplete,
            wrap_snippets_in: self.wrap_snippets_in_character.clone(),
            gherkin_definition_part: self.gherkin_definition_part.clone(),
            step_regex_symbol: self.step_regex_symbol.clone(),
            keywords,
            custom_parameters: CustomParameterMap::new(
                self.custom_parameters
                    .iter()
                    .map(CustomParameterSetting::to_parameter),
            ),
        })
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("trace", LogLevel::Trace)]
    #[case("DEBUG", LogLevel::Debug)]
    #[case("Info", LogLevel::Info)]
    #[case("warning", LogLevel::Warn)]
    #[case("error", LogLevel::Error)]
    fn log_level_parses_valid_values(#[case] input: &str, #[case] expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().ok(), Some(expected));
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let Err(err) = "invalid".parse::<LogLevel>() else {
            panic!("unknown level should be rejected");
        };
        assert!(err.to_string().contains("unknown log level"));
    }

    #[test]
    fn server_config_apply_overrides_updates_level() {
        let config = ServerConfig::default().apply_overrides(Some(LogLevel::Error));
        assert_eq!(config.log_level, LogLevel::Error);
        let config = ServerConfig::default().apply_overrides(None);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn defaults_apply_to_missing_keys() {
        let settings = Settings::from_value(json!({})).expect("empty object");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.steps, vec![DEFAULT_STEPS_DIR.to_owned()]);
        assert_eq!(Settings::from_value(Value::Null).expect("null"), Settings::default());
    }

    #[rstest]
    #[case(json!({ "strictGherkinCompletion": true }))]
    #[case(json!({ "cucumberautocomplete": { "strictGherkinCompletion": true } }))]
    fn reads_flat_and_nested_settings(#[case] value: Value) {
        let settings = Settings::from_value(value).expect("valid settings");
        assert!(settings.strict_gherkin_completion);
    }

    #[test]
    fn reads_every_key() {
        let settings = Settings::from_value(json!({
            "steps": ["steps", "more/steps.js"],
            "syncfeatures": "features",
            "strictGherkinValidation": true,
            "smartSnippets": true,
            "stepsInvariants": true,
            "customParameters": [
                { "parameter": "{color}", "value": "(red|blue)", "autocomplete": ["red", "blue"], "documentation": "a colour" },
                { "parameter": "{any}", "value": ".*" }
            ],
            "customParametersAutocomplete": true,
            "wrapSnippetsInCharacter": "\"",
            "gherkinDefinitionPart": "(Given|When)\\(",
            "stepRegExSymbol": "'",
            "keywords": { "Given": ["Dado"] }
        }))
        .expect("valid settings");

        assert_eq!(settings.sync_features, SyncFeatures::Pattern("features".to_owned()));
        let options = settings.match_options().expect("valid options");
        assert!(options.expand_invariants);
        assert!(options.strict_gherkin_validation);
        assert!(!options.strict_gherkin_completion);
        assert!(options.smart_snippets);
        assert!(options.custom_parameters_autocomplete);
        assert_eq!(options.wrap_snippets_in, "\"");
        assert_eq!(options.step_regex_symbol.as_deref(), Some("'"));
        assert_eq!(options.keywords.classify("Dado"), GherkinKind::Given);
        let color = options.custom_parameters.get("{color}").expect("configured");
        assert_eq!(color.autocomplete, vec!["red", "blue"]);
        assert_eq!(color.documentation.as_deref(), Some("a colour"));
        assert!(options.custom_parameters.get("{any}").is_some());
    }

    #[test]
    fn rejects_malformed_settings() {
        let result = Settings::from_value(json!({ "steps": 3 }));
        assert!(matches!(result, Err(ServerError::InvalidSettings(_))));
    }

    #[test]
    fn rejects_unknown_keyword_kind() {
        let settings = Settings::from_value(json!({ "keywords": { "Whence": ["x"] } }))
            .expect("shape is valid");
        assert!(matches!(
            settings.match_options(),
            Err(ServerError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(SyncFeatures::Enabled(false), None)]
    #[case(SyncFeatures::Enabled(true), Some(""))]
    #[case(SyncFeatures::Pattern("test/features/*.feature".to_owned()), Some("test/features/*.feature"))]
    fn resolves_sync_pattern(#[case] sync: SyncFeatures, #[case] expected: Option<&str>) {
        assert_eq!(sync.pattern(), expected);
    }
}
