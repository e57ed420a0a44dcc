use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::backend::GenerativeBackend;
use crate::config::Config;
use crate::confirm::Confirm;
use crate::diff::{DiffStyle, render_diff_block};
use crate::encoding::InputDecoder;
use crate::files;
use crate::input::{InputSource, StdinReader, read_input};
use crate::prompt::make_shape_request;
use crate::shaper::{ShapeResult, Shaper};

const CONFIRM_QUESTION: &str = "Continue?";

/// How one item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Result written to this path.
    Written(PathBuf),
    /// Nothing to write (stdout only, or a dry run).
    Done,
    /// Operator declined; the write for this file was skipped.
    Skipped,
    /// Operator declined for stdin input; the whole process must exit with
    /// failure without touching anything else.
    AbortProcess,
}

/// Input text and shaping result for one item.
#[derive(Debug, Clone)]
pub struct ShapedItem {
    pub source: InputSource,
    pub input: String,
    pub result: ShapeResult,
}

/// Runs one input through shape, display, confirm and write.
pub struct ItemProcessor<'a> {
    config: &'a Config,
    decoder: &'a InputDecoder,
    diff_style: DiffStyle,
}

impl<'a> ItemProcessor<'a> {
    pub fn new(config: &'a Config, decoder: &'a InputDecoder, diff_style: DiffStyle) -> Self {
        Self {
            config,
            decoder,
            diff_style,
        }
    }

    /// Reads the input and shapes it. Under dry run the backend is not called
    /// and the result only carries the prompt that would have been sent.
    pub fn shape<B: GenerativeBackend>(
        &self,
        shaper: &Shaper<B>,
        source: &InputSource,
        instruction: &str,
        stdin: &mut StdinReader,
    ) -> Result<ShapedItem> {
        let input = read_input(source, self.decoder, stdin)?;
        let request =
            make_shape_request(source, instruction, &input, self.config.prompt_optimize);

        let result = if self.config.dry_run {
            log::debug!("dry-run prompt for {source}:\n{}", request.prompt);
            ShapeResult::dry_run(&request.prompt)
        } else {
            shaper
                .shape(&request)
                .with_context(|| format!("failed to shape {source}"))?
        };

        Ok(ShapedItem {
            source: source.clone(),
            input,
            result,
        })
    }

    /// Display, confirm and write steps. Must only run once the status
    /// display for this item has been stopped.
    pub fn finish(
        &self,
        index: usize,
        item: &ShapedItem,
        out: &mut dyn Write,
        confirm: &mut dyn Confirm,
    ) -> Result<ItemOutcome> {
        let config = self.config;
        log::debug!(
            "[{index}] raw result: {} bytes, {:?}",
            item.result.raw.len(),
            item.result.raw
        );
        log::debug!("[{index}] result text: {:?}", item.result.text);

        if !config.silent && !config.dry_run && !config.rewrite {
            self.display(item, out)?;
        }

        if config.confirm {
            let accepted = confirm.ask(CONFIRM_QUESTION)?;
            log::debug!("[{index}] confirmation: {accepted}");
            if !accepted {
                if item.source.is_stdin() {
                    return Ok(ItemOutcome::AbortProcess);
                }
                return Ok(ItemOutcome::Skipped);
            }
        }

        self.write(index, item, out)
    }

    fn display(&self, item: &ShapedItem, out: &mut dyn Write) -> Result<()> {
        out.write_all(item.result.text.as_bytes())?;
        if self.config.diff {
            let block = render_diff_block(&item.input, &item.result.text, self.diff_style);
            out.write_all(block.as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    fn target_path(&self, source: &InputSource) -> Option<PathBuf> {
        if let Some(outpath) = &self.config.outpath {
            return Some(outpath.clone());
        }
        if self.config.rewrite {
            return source.path().map(|path| path.to_path_buf());
        }
        None
    }

    fn write(&self, index: usize, item: &ShapedItem, out: &mut dyn Write) -> Result<ItemOutcome> {
        let config = self.config;
        if config.rewrite && item.source.is_stdin() {
            log::warn!("[{index}] --rewrite has no file to rewrite for stdin input");
        }
        let Some(target) = self.target_path(&item.source) else {
            return Ok(ItemOutcome::Done);
        };

        if config.rewrite {
            if config.dry_run {
                writeln!(out, "Rewrite file:{}, dry-run skipped.", target.display())?;
            } else {
                writeln!(out, "Rewrite file:{}", target.display())?;
            }
        }
        if config.dry_run {
            return Ok(ItemOutcome::Done);
        }

        log::debug!("[{index}] writing to file: {}", target.display());
        files::write_result(&target, &item.result.text)
            .with_context(|| format!("failed to write result to {}", target.display()))?;
        Ok(ItemOutcome::Written(target))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::confirm::ScriptedConfirm;

    fn config() -> Config {
        Config {
            prompt: Some("translate to French".into()),
            ..Config::default()
        }
    }

    fn shaped(source: InputSource, input: &str, text: &str) -> ShapedItem {
        ShapedItem {
            source,
            input: input.to_string(),
            result: ShapeResult {
                text: text.to_string(),
                raw: text.to_string(),
                ..ShapeResult::default()
            },
        }
    }

    fn finish(config: &Config, item: &ShapedItem, answers: &[bool]) -> (ItemOutcome, String) {
        let decoder = InputDecoder::default();
        let processor = ItemProcessor::new(config, &decoder, DiffStyle::default());
        let mut out = Vec::new();
        let mut confirm = ScriptedConfirm::new(answers.iter().copied());
        let outcome = processor.finish(1, item, &mut out, &mut confirm).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn prints_result_without_diff() {
        let item = shaped(InputSource::Stdin, "Hello", "Bonjour\n");
        let (outcome, out) = finish(&config(), &item, &[]);
        assert_eq!(outcome, ItemOutcome::Done);
        assert_eq!(out, "Bonjour\n");
    }

    #[test]
    fn diff_block_follows_result() {
        let config = Config {
            diff: true,
            ..config()
        };
        let item = shaped(InputSource::Stdin, "A\nB\n", "A\nC\n");
        let (_, out) = finish(&config, &item, &[]);
        assert!(out.starts_with("A\nC\n\n====begin of diff==== in size: 4, out size: 4\n"));
        assert!(out.ends_with("====end of diff====\n"));
    }

    #[test]
    fn silent_prints_nothing() {
        let config = Config {
            silent: true,
            ..config()
        };
        let item = shaped(InputSource::Stdin, "Hello", "Bonjour\n");
        assert_eq!(finish(&config, &item, &[]).1, "");
    }

    #[test]
    fn outpath_receives_result() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let config = Config {
            outpath: Some(target.clone()),
            ..config()
        };
        let item = shaped(InputSource::Stdin, "Hello", "Bonjour\n");
        let (outcome, _) = finish(&config, &item, &[]);
        assert_eq!(outcome, ItemOutcome::Written(target.clone()));
        assert_eq!(fs::read_to_string(target).unwrap(), "Bonjour\n");
    }

    #[test]
    fn rewrite_announces_instead_of_printing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        fs::write(&path, "Hello\n").unwrap();
        let config = Config {
            rewrite: true,
            ..config()
        };
        let item = shaped(InputSource::File(path.clone()), "Hello\n", "Bonjour\n");
        let (outcome, out) = finish(&config, &item, &[]);
        assert_eq!(outcome, ItemOutcome::Written(path.clone()));
        assert_eq!(out, format!("Rewrite file:{}\n", path.display()));
        assert_eq!(fs::read_to_string(path).unwrap(), "Bonjour\n");
    }

    #[test]
    fn dry_run_rewrite_only_announces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");
        fs::write(&path, "Hello\n").unwrap();
        let config = Config {
            rewrite: true,
            dry_run: true,
            ..config()
        };
        let item = ShapedItem {
            source: InputSource::File(path.clone()),
            input: "Hello\n".into(),
            result: ShapeResult::dry_run("prompt"),
        };
        let (outcome, out) = finish(&config, &item, &[]);
        assert_eq!(outcome, ItemOutcome::Done);
        assert_eq!(
            out,
            format!("Rewrite file:{}, dry-run skipped.\n", path.display())
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "Hello\n");
    }

    #[test]
    fn declined_file_skips_write_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.txt");
        fs::write(&path, "original\n").unwrap();
        let config = Config {
            rewrite: true,
            confirm: true,
            ..config()
        };
        let item = shaped(InputSource::File(path.clone()), "original\n", "changed\n");
        let (outcome, _) = finish(&config, &item, &[false]);
        assert_eq!(outcome, ItemOutcome::Skipped);
        assert_eq!(fs::read_to_string(path).unwrap(), "original\n");
    }

    #[test]
    fn declined_stdin_aborts_process() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let config = Config {
            outpath: Some(target.clone()),
            confirm: true,
            ..config()
        };
        let item = shaped(InputSource::Stdin, "Hello", "Bonjour\n");
        let (outcome, out) = finish(&config, &item, &[false]);
        assert_eq!(outcome, ItemOutcome::AbortProcess);
        assert_eq!(out, "Bonjour\n");
        assert!(!target.exists());
    }

    #[test]
    fn accepted_confirmation_writes() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let config = Config {
            outpath: Some(target.clone()),
            confirm: true,
            ..config()
        };
        let item = shaped(InputSource::Stdin, "Hello", "Bonjour\n");
        let (outcome, _) = finish(&config, &item, &[true]);
        assert_eq!(outcome, ItemOutcome::Written(target));
    }

    #[test]
    fn dry_run_never_calls_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "Hello").unwrap();
        let config = Config {
            dry_run: true,
            ..config()
        };
        let backend = FakeBackend::new("gpt-4o");
        let shaper = Shaper::new(&backend, 1, false);
        let decoder = InputDecoder::default();
        let processor = ItemProcessor::new(&config, &decoder, DiffStyle::default());
        let item = processor
            .shape(
                &shaper,
                &InputSource::File(path),
                "translate to French",
                &mut StdinReader::from_reader(std::io::empty()),
            )
            .unwrap();
        assert_eq!(backend.calls(), 0);
        assert!(item.result.prompt.contains("Hello"));
        assert!(item.result.completion.is_none());
        assert_eq!(item.result.text, "");
    }
}
