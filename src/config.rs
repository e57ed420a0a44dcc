use std::path::PathBuf;

use crate::error::ConfigError;
use crate::input::InputSource;

pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Log detail for backend traffic, mirrored through the `log` facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiLogLevel {
    #[default]
    Off,
    Info,
    Debug,
}

impl ApiLogLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => ApiLogLevel::Info,
            "debug" => ApiLogLevel::Debug,
            _ => ApiLogLevel::Off,
        }
    }
}

/// Settings for one batch. Built once from the command line and read-only
/// after [`Config::validate`].
#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: Option<String>,
    pub prompt_path: Option<String>,
    pub prompt_optimize: bool,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub max_completion_repeat_count: usize,
    pub dry_run: bool,
    pub silent: bool,
    pub verbose: bool,
    pub show_cost: bool,
    pub diff: bool,
    pub input_file_list: Option<PathBuf>,
    pub input_encoding: Option<String>,
    pub log_api_level: ApiLogLevel,
    pub rewrite: bool,
    pub outpath: Option<PathBuf>,
    pub use_first_code_block: bool,
    pub confirm: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: None,
            prompt_path: None,
            prompt_optimize: true,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            max_completion_repeat_count: 1,
            dry_run: false,
            silent: false,
            verbose: false,
            show_cost: false,
            diff: false,
            input_file_list: None,
            input_encoding: None,
            log_api_level: ApiLogLevel::Off,
            rewrite: false,
            outpath: None,
            use_first_code_block: false,
            confirm: false,
        }
    }
}

impl Config {
    pub fn validate(&self, inputs: &[InputSource]) -> Result<(), ConfigError> {
        let has_prompt = self.prompt.as_deref().is_some_and(|p| !p.is_empty());
        let has_prompt_path = self.prompt_path.as_deref().is_some_and(|p| !p.is_empty());
        if !has_prompt && !has_prompt_path {
            return Err(ConfigError::MissingPrompt);
        }
        if self.outpath.is_some() {
            if self.rewrite {
                return Err(ConfigError::OutpathWithRewrite);
            }
            if inputs.len() > 1 {
                return Err(ConfigError::OutpathWithMultipleInputs(inputs.len()));
            }
        }
        Ok(())
    }

    /// Number of backend attempts allowed per item; never below one.
    pub fn repeat_budget(&self) -> usize {
        self.max_completion_repeat_count.max(1)
    }
}
