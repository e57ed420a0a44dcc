use crate::backend::{Completion, GenerativeBackend, Usage};
use crate::error::ShapeError;
use crate::postprocess;
use crate::prompt::ShapeRequest;

/// Outcome of shaping one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapeResult {
    pub prompt: String,
    /// Completion from the last attempt; `None` for dry runs.
    pub completion: Option<Completion>,
    /// Token usage summed over every attempt.
    pub usage: Usage,
    pub attempts: usize,
    pub raw: String,
    /// Post-processed text, always ending in exactly one newline.
    pub text: String,
}

impl ShapeResult {
    /// Placeholder carrying only the would-be prompt.
    pub fn dry_run(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            ..Self::default()
        }
    }
}

pub struct Shaper<B> {
    backend: B,
    max_attempts: usize,
    use_first_code_block: bool,
}

impl<B: GenerativeBackend> Shaper<B> {
    pub fn new(backend: B, max_attempts: usize, use_first_code_block: bool) -> Self {
        Self {
            backend,
            max_attempts: max_attempts.max(1),
            use_first_code_block,
        }
    }

    /// Sends the request, repeating while the answer was cut off by the
    /// token limit and attempts remain. Every repeat re-sends the original
    /// prompt; the answers are concatenated.
    pub fn shape(&self, request: &ShapeRequest) -> Result<ShapeResult, ShapeError> {
        let built = self.backend.build_request(&request.prompt);
        let mut raw = String::new();
        let mut usage = Usage::default();
        let mut attempts = 0;
        let mut last: Option<Completion> = None;

        while attempts < self.max_attempts {
            attempts += 1;
            let completion = self.backend.execute(&built)?;
            let Some(choice) = completion.choices.first() else {
                return Err(ShapeError::NoChoices);
            };
            raw.push_str(&choice.message.content);
            usage += completion.usage;
            let truncated = choice.truncated_by_length();
            log::debug!(
                "attempt {attempts}/{}: finish_reason={:?}, {} chars",
                self.max_attempts,
                choice.finish_reason,
                choice.message.content.len()
            );
            last = Some(completion);
            if !truncated {
                break;
            }
        }

        if last
            .as_ref()
            .and_then(|c| c.choices.first())
            .is_some_and(|c| c.truncated_by_length())
        {
            log::warn!(
                "output for {} still truncated after {attempts} attempt(s)",
                request.source
            );
        }

        let text = postprocess::finalize(&raw, self.use_first_code_block);
        Ok(ShapeResult {
            prompt: request.prompt.clone(),
            completion: last,
            usage,
            attempts,
            raw,
            text,
        })
    }
}
