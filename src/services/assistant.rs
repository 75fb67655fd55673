//! AI assistant service
//!
//! Conversational SEO help and one-shot analyses backed by the Anthropic
//! Messages API. Conversations and their messages are persisted so a chat
//! can be resumed; analyses are stateless prompts over stored project data.

use crate::db::repositories::{
    ConversationRepository, KeywordRepository, ProjectRepository, RankCheckRepository,
    SerpRepository,
};
use crate::models::{
    ChatMessage, ChatRole, Conversation, Keyword, Project, Provider, SerpEntry,
};
use crate::services::claude::{ClaudeClient, ClaudeMessage};
use crate::services::dataforseo::ProviderError;
use crate::services::usage::UsageService;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Response token budget for chat turns
const CHAT_MAX_TOKENS: u32 = 1024;

/// Response token budget for one-shot analyses
const ANALYSIS_MAX_TOKENS: u32 = 2048;

/// Keywords included in an opportunity analysis
const ANALYSIS_KEYWORD_LIMIT: usize = 50;

/// SERP entries included in a competition analysis
const ANALYSIS_SERP_LIMIT: usize = 10;

/// Endpoint name used in the usage log
const MESSAGES_ENDPOINT: &str = "messages";

/// Error types for assistant operations
#[derive(Debug, thiserror::Error)]
pub enum AssistantServiceError {
    /// Conversation, project, or keyword missing, or owned by another user
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub conversation_id: Uuid,
    pub reply: String,
}

/// A conversation with its full message history
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<ChatMessage>,
}

/// AI assistant service
pub struct AssistantService {
    conversation_repo: Arc<dyn ConversationRepository>,
    project_repo: Arc<dyn ProjectRepository>,
    keyword_repo: Arc<dyn KeywordRepository>,
    rank_repo: Arc<dyn RankCheckRepository>,
    serp_repo: Arc<dyn SerpRepository>,
    usage: Arc<UsageService>,
}

impl AssistantService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        project_repo: Arc<dyn ProjectRepository>,
        keyword_repo: Arc<dyn KeywordRepository>,
        rank_repo: Arc<dyn RankCheckRepository>,
        serp_repo: Arc<dyn SerpRepository>,
        usage: Arc<UsageService>,
    ) -> Self {
        Self {
            conversation_repo,
            project_repo,
            keyword_repo,
            rank_repo,
            serp_repo,
            usage,
        }
    }

    /// Send a chat message, creating or resuming a conversation
    pub async fn chat(
        &self,
        user_id: Uuid,
        input: ChatInput,
        client: &ClaudeClient,
    ) -> Result<ChatReply, AssistantServiceError> {
        let message = input.message.trim().to_string();
        if message.is_empty() {
            return Err(AssistantServiceError::ValidationError(
                "Message cannot be empty".to_string(),
            ));
        }

        let project = match input.project_id {
            Some(project_id) => Some(
                self.project_repo
                    .get_for_user(project_id, user_id)
                    .await
                    .context("Failed to get project")?
                    .ok_or(AssistantServiceError::NotFound("Project"))?,
            ),
            None => None,
        };

        let conversation = match input.conversation_id {
            Some(id) => self
                .conversation_repo
                .get_for_user(id, user_id)
                .await
                .context("Failed to get conversation")?
                .ok_or(AssistantServiceError::NotFound("Conversation"))?,
            None => {
                let conversation = Conversation::new(
                    user_id,
                    project.as_ref().map(|p| p.id),
                    Some(conversation_title(&message)),
                );
                self.conversation_repo
                    .create(&conversation)
                    .await
                    .context("Failed to create conversation")?
            }
        };

        let history = self
            .conversation_repo
            .list_messages(conversation.id)
            .await
            .context("Failed to load conversation history")?;

        let system = match &project {
            Some(project) => {
                let context = self.project_context(project).await?;
                system_prompt(Some(&context))
            }
            None => system_prompt(None),
        };

        let mut messages = history_messages(&history);
        messages.push(ClaudeMessage::user(message.clone()));

        let response = client
            .complete(Some(&system), &messages, CHAT_MAX_TOKENS)
            .await?;

        self.usage
            .log(
                user_id,
                Provider::Anthropic,
                MESSAGES_ENDPOINT,
                response.estimated_cost(),
                Some(200),
            )
            .await;

        self.conversation_repo
            .add_message(&ChatMessage::new(conversation.id, ChatRole::User, message))
            .await
            .context("Failed to save user message")?;
        self.conversation_repo
            .add_message(&ChatMessage::new(
                conversation.id,
                ChatRole::Assistant,
                response.text.clone(),
            ))
            .await
            .context("Failed to save assistant message")?;

        Ok(ChatReply {
            conversation_id: conversation.id,
            reply: response.text,
        })
    }

    /// List the user's conversations, most recently updated first
    pub async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Conversation>, AssistantServiceError> {
        let conversations = self
            .conversation_repo
            .list_by_user(user_id)
            .await
            .context("Failed to list conversations")?;

        Ok(conversations)
    }

    /// Fetch a conversation and its messages
    pub async fn get_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<ConversationDetail, AssistantServiceError> {
        let conversation = self
            .conversation_repo
            .get_for_user(conversation_id, user_id)
            .await
            .context("Failed to get conversation")?
            .ok_or(AssistantServiceError::NotFound("Conversation"))?;

        let messages = self
            .conversation_repo
            .list_messages(conversation.id)
            .await
            .context("Failed to load messages")?;

        Ok(ConversationDetail {
            conversation,
            messages,
        })
    }

    /// Delete a conversation and its messages
    pub async fn delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<(), AssistantServiceError> {
        self.conversation_repo
            .get_for_user(conversation_id, user_id)
            .await
            .context("Failed to get conversation")?
            .ok_or(AssistantServiceError::NotFound("Conversation"))?;

        self.conversation_repo
            .delete(conversation_id)
            .await
            .context("Failed to delete conversation")?;

        Ok(())
    }

    /// One-shot keyword-opportunity analysis for a project
    pub async fn analyze_keywords(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        client: &ClaudeClient,
    ) -> Result<String, AssistantServiceError> {
        let project = self
            .project_repo
            .get_for_user(project_id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(AssistantServiceError::NotFound("Project"))?;

        let mut keywords: Vec<Keyword> = self
            .keyword_repo
            .list_by_project(project_id)
            .await
            .context("Failed to list keywords")?
            .into_iter()
            .filter(|k| k.has_metrics())
            .collect();
        if keywords.is_empty() {
            return Err(AssistantServiceError::ValidationError(
                "No keywords with metrics to analyze. Refresh metrics first.".to_string(),
            ));
        }
        keywords.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
        keywords.truncate(ANALYSIS_KEYWORD_LIMIT);

        let prompt = keyword_analysis_prompt(&project, &keywords);
        let response = client
            .complete(Some(&system_prompt(None)), &[ClaudeMessage::user(prompt)], ANALYSIS_MAX_TOKENS)
            .await?;

        self.usage
            .log(
                user_id,
                Provider::Anthropic,
                MESSAGES_ENDPOINT,
                response.estimated_cost(),
                Some(200),
            )
            .await;

        Ok(response.text)
    }

    /// One-shot SERP-competition analysis for a tracked keyword
    pub async fn analyze_serp(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        keyword_id: Uuid,
        client: &ClaudeClient,
    ) -> Result<String, AssistantServiceError> {
        let project = self
            .project_repo
            .get_for_user(project_id, user_id)
            .await
            .context("Failed to get project")?
            .ok_or(AssistantServiceError::NotFound("Project"))?;

        let keyword = self
            .keyword_repo
            .get_for_project(keyword_id, project_id)
            .await
            .context("Failed to get keyword")?
            .ok_or(AssistantServiceError::NotFound("Keyword"))?;

        let snapshot = self
            .serp_repo
            .latest_snapshot(keyword_id)
            .await
            .context("Failed to load SERP snapshot")?;
        if snapshot.is_empty() {
            return Err(AssistantServiceError::ValidationError(
                "No SERP snapshot for this keyword. Run a rank check first.".to_string(),
            ));
        }

        let prompt = serp_analysis_prompt(&project, &keyword, &snapshot);
        let response = client
            .complete(Some(&system_prompt(None)), &[ClaudeMessage::user(prompt)], ANALYSIS_MAX_TOKENS)
            .await?;

        self.usage
            .log(
                user_id,
                Provider::Anthropic,
                MESSAGES_ENDPOINT,
                response.estimated_cost(),
                Some(200),
            )
            .await;

        Ok(response.text)
    }

    /// Summarize a project for the chat system prompt
    async fn project_context(&self, project: &Project) -> Result<String, AssistantServiceError> {
        let keywords = self
            .keyword_repo
            .list_by_project(project.id)
            .await
            .context("Failed to list keywords")?;

        let latest = self
            .rank_repo
            .latest_per_keyword(project.id)
            .await
            .context("Failed to load latest checks")?;
        let positions: Vec<i64> = latest.iter().filter_map(|c| c.position).collect();
        let average_position = if positions.is_empty() {
            None
        } else {
            Some(positions.iter().sum::<i64>() as f64 / positions.len() as f64)
        };

        Ok(format_project_context(
            project,
            keywords.len(),
            average_position,
        ))
    }
}

/// Title for a new conversation, taken from its opening message
fn conversation_title(message: &str) -> String {
    const MAX_TITLE: usize = 60;
    if message.chars().count() <= MAX_TITLE {
        message.to_string()
    } else {
        let truncated: String = message.chars().take(MAX_TITLE - 3).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Replay stored history as API messages, preserving who said what
///
/// System entries never go back out on the wire.
fn history_messages(history: &[ChatMessage]) -> Vec<ClaudeMessage> {
    history
        .iter()
        .filter_map(|m| match m.role {
            ChatRole::User => Some(ClaudeMessage::user(m.content.clone())),
            ChatRole::Assistant => Some(ClaudeMessage::assistant(m.content.clone())),
            ChatRole::System => None,
        })
        .collect()
}

fn system_prompt(project_context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are an SEO assistant for a rank-tracking tool. Give specific, \
         actionable advice grounded in the data you are shown. Be concise.",
    );
    if let Some(context) = project_context {
        prompt.push_str("\n\n");
        prompt.push_str(context);
    }
    prompt
}

fn format_project_context(
    project: &Project,
    keyword_count: usize,
    average_position: Option<f64>,
) -> String {
    let mut context = format!(
        "Current project: {} ({})\nKeywords tracked: {}",
        project.name, project.domain, keyword_count
    );
    if let Some(avg) = average_position {
        context.push_str(&format!("\nAverage position: {:.1}", avg));
    }
    context
}

fn keyword_analysis_prompt(project: &Project, keywords: &[Keyword]) -> String {
    let mut prompt = format!(
        "Analyze these keywords for {} ({}) and recommend which to prioritize. \
         Group them into quick wins, strategic bets, and low value. \
         Keyword | volume | difficulty | cpc:\n",
        project.name, project.domain
    );
    for keyword in keywords {
        prompt.push_str(&format!(
            "{} | {} | {} | {}\n",
            keyword.keyword,
            keyword
                .search_volume
                .map_or("?".to_string(), |v| v.to_string()),
            keyword
                .keyword_difficulty
                .map_or("?".to_string(), |d| format!("{:.0}", d)),
            keyword.cpc.map_or("?".to_string(), |c| format!("{:.2}", c)),
        ));
    }
    prompt
}

fn serp_analysis_prompt(project: &Project, keyword: &Keyword, snapshot: &[SerpEntry]) -> String {
    let mut prompt = format!(
        "The site {} targets the keyword \"{}\". These are the current top \
         search results. Assess the competition and suggest how to outrank \
         them. Position | domain | title:\n",
        project.domain, keyword.keyword
    );
    for entry in snapshot.iter().take(ANALYSIS_SERP_LIMIT) {
        prompt.push_str(&format!(
            "{} | {} | {}\n",
            entry.position,
            entry.domain.as_deref().unwrap_or("?"),
            entry.title.as_deref().unwrap_or("?"),
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxConversationRepository, SqlxKeywordRepository, SqlxProjectRepository,
        SqlxRankCheckRepository, SqlxSerpRepository, SqlxUsageRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (AssistantService, Uuid) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, is_active, created_at, updated_at)
             VALUES (?, 'ai@example.com', 'hash', 1, datetime('now'), datetime('now'))",
        )
        .bind(user_id.to_string())
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to insert user");

        let service = AssistantService::new(
            SqlxConversationRepository::boxed(pool.clone()),
            SqlxProjectRepository::boxed(pool.clone()),
            SqlxKeywordRepository::boxed(pool.clone()),
            SqlxRankCheckRepository::boxed(pool.clone()),
            SqlxSerpRepository::boxed(pool.clone()),
            Arc::new(UsageService::new(SqlxUsageRepository::boxed(pool))),
        );

        (service, user_id)
    }

    #[tokio::test]
    async fn test_conversation_listing_and_detail() {
        let (service, user_id) = setup().await;

        let conversation = Conversation::new(user_id, None, Some("First chat".to_string()));
        service
            .conversation_repo
            .create(&conversation)
            .await
            .expect("Failed to create conversation");
        service
            .conversation_repo
            .add_message(&ChatMessage::new(
                conversation.id,
                ChatRole::User,
                "How do I improve rankings?".to_string(),
            ))
            .await
            .expect("Failed to add message");

        let listed = service
            .list_conversations(user_id)
            .await
            .expect("Failed to list");
        assert_eq!(listed.len(), 1);

        let detail = service
            .get_conversation(user_id, conversation.id)
            .await
            .expect("Failed to get detail");
        assert_eq!(detail.messages.len(), 1);

        let result = service.get_conversation(Uuid::new_v4(), conversation.id).await;
        assert!(matches!(result, Err(AssistantServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_conversation_scoped() {
        let (service, user_id) = setup().await;

        let conversation = Conversation::new(user_id, None, None);
        service
            .conversation_repo
            .create(&conversation)
            .await
            .expect("Failed to create conversation");

        let result = service
            .delete_conversation(Uuid::new_v4(), conversation.id)
            .await;
        assert!(matches!(result, Err(AssistantServiceError::NotFound(_))));

        service
            .delete_conversation(user_id, conversation.id)
            .await
            .expect("Failed to delete");
        assert!(service.list_conversations(user_id).await.unwrap().is_empty());
    }

    #[test]
    fn test_conversation_title_truncates() {
        assert_eq!(conversation_title("Short question"), "Short question");

        let long = "a".repeat(100);
        let title = conversation_title(&long);
        assert!(title.chars().count() <= 60);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_history_messages_preserves_roles() {
        let conversation_id = Uuid::new_v4();
        let history = vec![
            ChatMessage::new(conversation_id, ChatRole::System, "prompt".to_string()),
            ChatMessage::new(conversation_id, ChatRole::User, "question".to_string()),
            ChatMessage::new(conversation_id, ChatRole::Assistant, "answer".to_string()),
        ];

        let messages = history_messages(&history);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "question");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "answer");
    }

    #[test]
    fn test_system_prompt_includes_project_context() {
        let bare = system_prompt(None);
        assert!(!bare.contains("Current project"));

        let with_context = system_prompt(Some("Current project: Site (example.com)"));
        assert!(with_context.contains("Current project: Site (example.com)"));
    }

    #[test]
    fn test_format_project_context() {
        let project = Project::new(
            Uuid::new_v4(),
            "Site".to_string(),
            "example.com".to_string(),
            None,
        );

        let context = format_project_context(&project, 12, Some(7.25));
        assert!(context.contains("Site (example.com)"));
        assert!(context.contains("Keywords tracked: 12"));
        assert!(context.contains("Average position: 7.2"));

        let no_avg = format_project_context(&project, 0, None);
        assert!(!no_avg.contains("Average position"));
    }

    #[test]
    fn test_keyword_analysis_prompt_contents() {
        let project = Project::new(
            Uuid::new_v4(),
            "Site".to_string(),
            "example.com".to_string(),
            None,
        );
        let mut keyword = Keyword::new(Uuid::new_v4(), "seo tools".to_string());
        keyword.search_volume = Some(8100);
        keyword.keyword_difficulty = Some(62.0);

        let prompt = keyword_analysis_prompt(&project, std::slice::from_ref(&keyword));
        assert!(prompt.contains("seo tools | 8100 | 62 | ?"));
    }
}
