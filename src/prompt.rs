use anyhow::Result;

use crate::config::Config;
use crate::error::ConfigError;
use crate::input::{InputSource, StdinReader, read_prompt_file};

pub const INPUT_TAG: &str = "textshaper-input";

const SUPPLEMENTS: [&str; 4] = [
    "The subject of the Instruction is the area enclosed by the textshaper-input tag.",
    "Do not include the textshaper-input tags in the answer.",
    "The result should be returned in the language of the Instruction, but if the Instruction has a language specification, that language should be given priority.",
    "Only results should be returned and no explanation or supplementary information is required, but additional explanation or details should be provided if explicitly requested in the instructions.",
];

/// Resolves the instruction: inline `--prompt` wins, otherwise `--prompt-path`
/// is read (`-` meaning stdin).
pub fn resolve_prompt_text(config: &Config, stdin: &mut StdinReader) -> Result<String> {
    if let Some(prompt) = config.prompt.as_deref().filter(|p| !p.is_empty()) {
        return Ok(prompt.to_string());
    }
    match config.prompt_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => read_prompt_file(path, stdin),
        None => Err(ConfigError::MissingPrompt.into()),
    }
}

/// Prompt actually sent to the backend for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRequest {
    pub prompt: String,
    pub source: InputSource,
}

/// Builds the request text for one input. Without optimization and without
/// input text the instruction goes out verbatim.
pub fn make_shape_request(
    source: &InputSource,
    instruction: &str,
    input: &str,
    optimize: bool,
) -> ShapeRequest {
    let prompt = if input.is_empty() && !optimize {
        instruction.to_string()
    } else {
        augment(source, instruction, input)
    };
    ShapeRequest {
        prompt,
        source: source.clone(),
    }
}

fn augment(source: &InputSource, instruction: &str, input: &str) -> String {
    let supplementation = SUPPLEMENTS.join(" ");
    let header = source
        .path()
        .map(|path| format!("filepath=\"{}\"\n", path.display()))
        .unwrap_or_default();
    format!(
        "<Instruction>{instruction}. ({supplementation})</Instruction>\n{header}<{INPUT_TAG}>\n{input}\n</{INPUT_TAG}>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_stdin() -> StdinReader {
        StdinReader::from_reader(std::io::empty())
    }

    fn file(path: &str) -> InputSource {
        InputSource::File(path.into())
    }

    #[test]
    fn input_sits_between_tags() {
        let request = make_shape_request(&file("a.txt"), "translate to French", "Hello\nWorld", true);
        let open = format!("<{INPUT_TAG}>\n");
        let close = format!("\n</{INPUT_TAG}>");
        let start = request.prompt.find(&open).unwrap() + open.len();
        let end = request.prompt.rfind(&close).unwrap();
        assert_eq!(&request.prompt[start..end], "Hello\nWorld");
    }

    #[test]
    fn instruction_appears_once() {
        let request = make_shape_request(&file("a.txt"), "summarize", "text", true);
        assert_eq!(request.prompt.matches("summarize").count(), 1);
    }

    #[test]
    fn file_inputs_get_path_header() {
        let request = make_shape_request(&file("docs/readme.md"), "fix typos", "teh", true);
        assert!(request.prompt.contains("filepath=\"docs/readme.md\"\n<textshaper-input>"));
    }

    #[test]
    fn stdin_gets_no_path_header() {
        let request = make_shape_request(&InputSource::Stdin, "fix typos", "teh", true);
        assert!(!request.prompt.contains("filepath="));
    }

    #[test]
    fn empty_input_without_optimization_passes_through() {
        let request = make_shape_request(&InputSource::Stdin, "write a haiku", "", false);
        assert_eq!(request.prompt, "write a haiku");
    }

    #[test]
    fn empty_input_with_optimization_is_still_wrapped() {
        let request = make_shape_request(&InputSource::Stdin, "write a haiku", "", true);
        assert!(request.prompt.starts_with("<Instruction>write a haiku."));
    }

    #[test]
    fn inline_prompt_wins() {
        let config = Config {
            prompt: Some("inline".into()),
            prompt_path: Some("/does/not/exist".into()),
            ..Config::default()
        };
        assert_eq!(resolve_prompt_text(&config, &mut no_stdin()).unwrap(), "inline");
    }

    #[test]
    fn prompt_path_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "from file").unwrap();
        let config = Config {
            prompt_path: Some(path.to_string_lossy().into_owned()),
            ..Config::default()
        };
        assert_eq!(resolve_prompt_text(&config, &mut no_stdin()).unwrap(), "from file");
    }

    #[test]
    fn no_prompt_is_config_error() {
        let err = resolve_prompt_text(&Config::default(), &mut no_stdin()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingPrompt)
        );
    }
}
