use crate::{context::Context, helper::http_client, log_error, log_internal};
use anyhow::{anyhow, Result};

pub const NOT_CONFIGURED: &str = "I regret to inform you that no GPT API key was configured.";

/// Which system prompt to speak with
pub enum Persona {
    Assistant,
    /// Turns down a command the user may not run
    PermissionDenied,
}

/// LLM generation settings
pub struct LlmSettings<'a> {
    pub model_name: &'a str,
    pub system: &'a str,
}

/// OpenAI-style chat completion request: a system prompt followed by one user turn.
#[derive(serde::Serialize)]
pub struct LlmChatRequest {
    /// LLM model name
    model: String,
    /// Chat conversation to continue.
    messages: Vec<ChatMessage>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ChatMessage {
    role: ChatMessageRole,
    #[serde(default)]
    content: Option<String>,
}

#[allow(non_camel_case_types)] // Serialized literally; case matters
#[derive(serde::Serialize, serde::Deserialize)]
enum ChatMessageRole {
    system,
    user,
    assistant,
}

#[derive(serde::Deserialize)]
struct LlmChatResponse {
    #[serde(default)]
    choices: Vec<LlmChoice>,
}

#[derive(serde::Deserialize)]
struct LlmChoice {
    message: ChatMessage,
}

impl LlmChatResponse {
    /// Trimmed text of the first choice.  `None` when the model had nothing to say.
    fn into_reply(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
    }
}

impl LlmChatRequest {
    pub fn new(settings: &LlmSettings<'_>, prompt: &str) -> Self {
        let prompt = match prompt.trim() {
            "" => "The user addressed you without providing any content.",
            prompt => prompt,
        };

        Self {
            model: settings.model_name.to_owned(),
            messages: vec![
                ChatMessage {
                    role: ChatMessageRole::system,
                    content: Some(settings.system.to_owned()),
                },
                ChatMessage {
                    role: ChatMessageRole::user,
                    content: Some(prompt.to_owned()),
                },
            ],
        }
    }

    /// Send the request.  Fails if no API key is configured or the endpoint misbehaves.
    pub async fn post(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        let (url, api_key) = {
            let cfg = ctx.cfg.read().await;
            (cfg.llm.chat_url.clone(), cfg.llm.api_key.clone())
        };
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or(anyhow!("No GPT API key configured"))?;

        log_internal!("Sending request to chat endpoint {}... ", url);
        let response = http_client()?
            .post(&url)
            .bearer_auth(api_key)
            .json(self)
            .send()
            .await?
            .error_for_status()?
            .json::<LlmChatResponse>()
            .await?;
        log_internal!("Sending request to chat endpoint {}... done", url);

        Ok(response.into_reply())
    }
}

/// Ask the model and phrase the outcome for chat.  Problems are explained in the returned text
/// rather than returned as errors.
pub async fn consult(ctx: &Context<'_>, persona: Persona, prompt: &str) -> String {
    let request = {
        let cfg = ctx.cfg.read().await;
        if !cfg.llm.is_configured() {
            return NOT_CONFIGURED.to_owned();
        }
        let settings = match persona {
            Persona::Assistant => cfg.llm.as_llm_settings(),
            Persona::PermissionDenied => cfg.llm.as_permission_denied_settings(),
        };
        LlmChatRequest::new(&settings, prompt)
    };

    match request.post(ctx).await {
        Ok(Some(reply)) => reply,
        Ok(None) => "I am afraid GPT had no response to offer.".to_owned(),
        Err(err) => {
            log_error!("Chat completion failed: {}", err);
            format!("I encountered a difficulty consulting GPT: {}", err)
        }
    }
}
