use std::time::Duration;

use reqwest::blocking::Client;

use super::{Completion, CompletionRequest, ErrorBody, GenerativeBackend};
use crate::config::ApiLogLevel;
use crate::error::ShapeError;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const ERROR_BODY_SNIPPET: usize = 200;

/// Blocking client for the OpenAI chat completions endpoint.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
    log_level: ApiLogLevel,
    url: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        model: &str,
        max_tokens: Option<u32>,
        log_level: ApiLogLevel,
    ) -> Result<Self, ShapeError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ShapeError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            max_tokens,
            log_level,
            url: CHAT_COMPLETIONS_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn log_request(&self, request: &CompletionRequest) {
        match self.log_level {
            ApiLogLevel::Off => {}
            ApiLogLevel::Info => log::info!(
                "model: {}, n: {}, seed: {}, max_tokens: {:?}",
                request.model,
                request.n,
                request.seed,
                request.max_tokens
            ),
            ApiLogLevel::Debug => match serde_json::to_string(request) {
                Ok(body) => log::debug!("chat completion request: {body}"),
                Err(err) => log::debug!("chat completion request not serializable: {err}"),
            },
        }
    }

    fn log_response(&self, completion: &Completion, body: &str) {
        match self.log_level {
            ApiLogLevel::Off => {}
            ApiLogLevel::Info => {
                log::info!(
                    "id: {}, model: {}, choices: {}",
                    completion.id,
                    completion.model,
                    completion.choices.len()
                );
                if let Some(first) = completion.choices.first() {
                    log::info!(
                        "[0] finish_reason: {:?}, index: {}",
                        first.finish_reason,
                        first.index
                    );
                }
            }
            ApiLogLevel::Debug => log::debug!("chat completion response: {body}"),
        }
    }
}

impl GenerativeBackend for OpenAiClient {
    fn build_request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest::new(&self.model, prompt, self.max_tokens)
    }

    fn execute(&self, request: &CompletionRequest) -> Result<Completion, ShapeError> {
        self.log_request(request);

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|err| ShapeError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| ShapeError::Transport(format!("failed to read response body: {err}")))?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }

        let completion: Completion = serde_json::from_str(&body).map_err(|err| {
            ShapeError::Transport(format!("failed to parse chat completion: {err}"))
        })?;
        self.log_response(&completion, &body);
        Ok(completion)
    }
}

fn parse_error_body(status: u16, body: &str) -> ShapeError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => {
            let snippet: String = body.chars().take(ERROR_BODY_SNIPPET).collect();
            format!("unparsable error response: {snippet}")
        }
    };
    ShapeError::Backend { status, message }
}
