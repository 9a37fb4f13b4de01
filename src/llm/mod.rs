use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ResearchError;

/// External knowledge-research capability used by the classifier.
#[async_trait]
pub trait ResearchApi: Send + Sync {
    async fn research(&self, system_prompt: &str, query: &str) -> Result<String, ResearchError>;
}

#[derive(Clone)]
pub struct LLMClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
}

impl LLMClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        let client = Client::with_config(config);
        Self { client, model }
    }

    pub async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String, ResearchError> {
        info!("🤖 Sending request to LLM (Model: {})...", self.model);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.2)
            .messages([
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()?,
                ),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ResearchError::EmptyResponse)?;

        info!("🤖 LLM Response received.");
        debug!("🤖 LLM Response: {}", content);
        Ok(content)
    }
}

#[async_trait]
impl ResearchApi for LLMClient {
    async fn research(&self, system_prompt: &str, query: &str) -> Result<String, ResearchError> {
        self.chat(system_prompt, query).await
    }
}
