use std::io::Write;

use anyhow::{Context, Result};

use crate::backend::{GenerativeBackend, OpenAiClient};
use crate::config::Config;
use crate::confirm::Confirm;
use crate::cost::{CostAggregator, UsageRecord};
use crate::credentials;
use crate::diff::DiffStyle;
use crate::encoding::InputDecoder;
use crate::input::{InputSource, StdinReader};
use crate::process::{ItemOutcome, ItemProcessor};
use crate::prompt::resolve_prompt_text;
use crate::shaper::Shaper;

/// Callbacks around the shape phase of each item (the part that waits on
/// the backend).
pub trait ItemHooks {
    fn before_shape(&mut self, index: usize, total: usize, source: &InputSource);
    fn after_shape(&mut self, index: usize, total: usize, source: &InputSource);
}

/// Everything resolved once per batch and shared by all items.
pub struct Prepared<B> {
    pub backend: B,
    pub prompt_text: String,
    pub inputs: Vec<InputSource>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ItemOutcome>,
    pub cost: CostAggregator,
    /// Set when a declined stdin confirmation demands an immediate exit.
    pub aborted: bool,
}

pub struct BatchRunner<'a> {
    config: &'a Config,
    decoder: InputDecoder,
    diff_style: DiffStyle,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a Config, diff_style: DiffStyle) -> Result<Self> {
        let decoder = InputDecoder::new(config.input_encoding.as_deref())?;
        Ok(Self {
            config,
            decoder,
            diff_style,
        })
    }

    pub fn validate(&self, inputs: &[InputSource]) -> Result<()> {
        self.config.validate(inputs)?;
        Ok(())
    }

    /// Validates, then loads the API key and the instruction text.
    pub fn setup(
        &self,
        inputs: Vec<InputSource>,
        stdin: &mut StdinReader,
    ) -> Result<Prepared<OpenAiClient>> {
        self.validate(&inputs)?;
        log::debug!("loading API key");
        let api_key = credentials::load_api_key().context("failed to get API key")?;
        let backend = OpenAiClient::new(
            api_key,
            &self.config.model,
            self.config.max_tokens,
            self.config.log_api_level,
        )?;
        self.load_prompt(backend, inputs, stdin)
    }

    /// Same as [`BatchRunner::setup`] with a caller-supplied backend.
    pub fn prepare<B: GenerativeBackend>(
        &self,
        backend: B,
        inputs: Vec<InputSource>,
        stdin: &mut StdinReader,
    ) -> Result<Prepared<B>> {
        self.validate(&inputs)?;
        self.load_prompt(backend, inputs, stdin)
    }

    fn load_prompt<B>(
        &self,
        backend: B,
        inputs: Vec<InputSource>,
        stdin: &mut StdinReader,
    ) -> Result<Prepared<B>> {
        log::debug!("reading prompt");
        let prompt_text = resolve_prompt_text(self.config, stdin)?;
        Ok(Prepared {
            backend,
            prompt_text,
            inputs,
        })
    }

    /// Processes items one after another; the first error ends the batch.
    /// A declined stdin result returns at once, without the cost summary.
    pub fn run<B: GenerativeBackend>(
        &self,
        prepared: &Prepared<B>,
        hooks: &mut dyn ItemHooks,
        stdin: &mut StdinReader,
        out: &mut dyn Write,
        confirm: &mut dyn Confirm,
    ) -> Result<RunReport> {
        let shaper = Shaper::new(
            &prepared.backend,
            self.config.repeat_budget(),
            self.config.use_first_code_block,
        );
        let processor = ItemProcessor::new(self.config, &self.decoder, self.diff_style);
        let total = prepared.inputs.len();
        let mut report = RunReport::default();

        for (index, source) in prepared.inputs.iter().enumerate() {
            log::debug!("[{}/{total}] processing {source}", index + 1);
            hooks.before_shape(index, total, source);
            let shaped = processor.shape(&shaper, source, &prepared.prompt_text, stdin);
            hooks.after_shape(index, total, source);
            let item = shaped?;

            let outcome = processor.finish(index + 1, &item, out, confirm)?;
            if let Some(completion) = &item.result.completion {
                report
                    .cost
                    .record(UsageRecord::new(&completion.model, item.result.usage));
            }
            let abort = outcome == ItemOutcome::AbortProcess;
            report.outcomes.push(outcome);
            if abort {
                report.aborted = true;
                return Ok(report);
            }
        }

        if self.config.show_cost {
            let totals = report.cost.totals();
            log::debug!(
                "tokens: prompt={}, completion={}, total={}",
                totals.prompt_tokens,
                totals.completion_tokens,
                totals.total_tokens
            );
            writeln!(out, "{}", report.cost.summary_line())?;
        }
        Ok(report)
    }
}
