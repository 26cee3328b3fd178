//! Mock implementations for testing
//!
//! These mocks enable end-to-end runs of the agent without real I/O.

use super::traits::*;
use crate::llm::{LlmError, LlmRequest, LlmResponse, ToolDefinition};
use crate::tools::{ToolContext, ToolError, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering every request
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

struct MockTool {
    result: Result<ToolOutput, ToolError>,
    delay: Option<Duration>,
}

/// Mock tool executor with predefined outputs
#[derive(Default)]
pub struct MockToolExecutor {
    tools: HashMap<String, MockTool>,
    definitions: Vec<ToolDefinition>,
    executions: Mutex<Vec<(String, Value)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool with a predefined output
    #[must_use]
    pub fn with_tool(self, name: impl Into<String>, output: ToolOutput) -> Self {
        self.with_result(name, Ok(output), None)
    }

    /// Add a tool whose invocation fails
    #[must_use]
    pub fn with_failing_tool(self, name: impl Into<String>, message: &str) -> Self {
        let name = name.into();
        let error = ToolError::invocation(name.clone(), message);
        self.with_result(name, Err(error), None)
    }

    /// Add a tool that takes `delay` before answering
    #[must_use]
    pub fn with_slow_tool(self, name: impl Into<String>, output: ToolOutput, delay: Duration) -> Self {
        self.with_result(name, Ok(output), Some(delay))
    }

    fn with_result(mut self, name: impl Into<String>, result: Result<ToolOutput, ToolError>, delay: Option<Duration>) -> Self {
        let name = name.into();
        self.definitions.push(ToolDefinition {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        });
        self.tools.insert(name, MockTool { result, delay });
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, name: &str, input: Value, _ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        self.executions.lock().unwrap().push((name.to_string(), input));
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if let Some(delay) = tool.delay {
            tokio::time::sleep(delay).await;
        }
        tool.result.clone()
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}

// ============================================================================
// Agent run scenarios
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Message, Role, ToolCall, Usage};
    use crate::runtime::{AgentRuntime, RuntimeConfig, RuntimeError};
    use crate::session::ScratchHandle;
    use crate::tools::TOOL_NAME;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    type TestRuntime = AgentRuntime<Arc<MockLlmClient>, Arc<MockToolExecutor>>;

    fn runtime(llm: &Arc<MockLlmClient>, tools: &Arc<MockToolExecutor>, config: RuntimeConfig) -> TestRuntime {
        AgentRuntime::new(llm.clone(), tools.clone(), config)
    }

    fn tool_ctx() -> ToolContext {
        ToolContext::new(CancellationToken::new(), "test-session", ScratchHandle::default())
    }

    fn analysis_call(id: &str, artifact: &str) -> ToolCall {
        ToolCall::new(id, TOOL_NAME, json!({ "artifact": artifact }))
    }

    fn roles(conversation: &Conversation) -> Vec<Role> {
        conversation.messages().iter().map(|m| m.role).collect()
    }

    fn analysis_tools() -> Arc<MockToolExecutor> {
        Arc::new(MockToolExecutor::new().with_tool(TOOL_NAME, ToolOutput::success("Found fields: Name, Date")))
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let client = MockLlmClient::new("test-model");
        client.queue_response(LlmResponse::text("Hello!"));

        let request = LlmRequest {
            messages: vec![],
            tools: vec![],
            max_tokens: None,
        };

        let response = client.complete(&request).await.unwrap();
        assert_eq!(response.content.text(), "Hello!");
        assert_eq!(client.recorded_requests().len(), 1);

        // Queue exhausted
        assert!(client.complete(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_tool_executor() {
        let executor = MockToolExecutor::new().with_tool("echo", ToolOutput::success("hi"));

        let output = executor.execute("echo", json!({"a": 1}), tool_ctx()).await.unwrap();
        assert_eq!(output.output, "hi");

        let err = executor.execute("missing", json!({}), tool_ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
        assert_eq!(executor.recorded_executions().len(), 2);
    }

    #[tokio::test]
    async fn test_greeting_without_document() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::text("Please share a document.").with_usage(Usage {
            input_tokens: 42,
            output_tokens: 6,
            total_tokens: 48,
        }));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        let answer = rt.run(&mut conversation, &tool_ctx()).await.unwrap();

        assert_eq!(answer.text(), "Please share a document.");
        let metadata = answer.metadata.unwrap();
        assert!(metadata.latency_ms >= 0.0);
        assert_eq!(metadata.usage.unwrap().total_tokens, 48);
        assert_eq!(roles(&conversation), vec![Role::User, Role::Assistant]);
        assert!(tools.recorded_executions().is_empty());

        // System directive leads the request but is never persisted
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].messages[1].text(), "hello");
        assert!(requests[0].tools.iter().any(|t| t.name == TOOL_NAME));
    }

    #[tokio::test]
    async fn test_document_analysis_round_trip() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![analysis_call("call-1", "files/invoice.pdf")]));
        llm.queue_response(LlmResponse::text("The invoice holds two fields: Name and Date."));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze files/invoice.pdf"));
        let answer = rt.run(&mut conversation, &tool_ctx()).await.unwrap();

        assert_eq!(answer.text(), "The invoice holds two fields: Name and Date.");
        assert_eq!(
            roles(&conversation),
            vec![Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
        );
        assert_eq!(conversation.messages()[1].tool_calls[0].id, "call-1");

        let result = &conversation.messages()[2];
        assert_eq!(result.tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(result.text(), "Found fields: Name, Date");
        assert!(!result.is_error);

        assert_eq!(
            tools.recorded_executions(),
            vec![(TOOL_NAME.to_string(), json!({ "artifact": "files/invoice.pdf" }))]
        );

        // Second reasoning step sees the tool result
        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::ToolResult);
        assert_eq!(last.text(), "Found fields: Name, Date");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![ToolCall::new("call-1", "made_up_tool", json!({}))]));
        llm.queue_response(LlmResponse::text("That capability is not available."));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("do something"));
        let answer = rt.run(&mut conversation, &tool_ctx()).await.unwrap();

        assert_eq!(answer.text(), "That capability is not available.");
        let result = &conversation.messages()[2];
        assert!(result.is_error);
        assert!(result.text().contains("Unknown tool: made_up_tool"));

        let requests = llm.recorded_requests();
        let seen = requests[1].messages.last().unwrap();
        assert!(seen.is_error);
        assert_eq!(seen.tool_call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn test_parallel_calls_keep_emission_order() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![
            ToolCall::new("call-slow", "slow", json!({})),
            ToolCall::new("call-fast", "fast", json!({})),
        ]));
        llm.queue_response(LlmResponse::text("done"));
        let tools = Arc::new(
            MockToolExecutor::new()
                .with_slow_tool("slow", ToolOutput::success("slow result"), Duration::from_millis(50))
                .with_tool("fast", ToolOutput::success("fast result")),
        );
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("go"));
        rt.run(&mut conversation, &tool_ctx()).await.unwrap();

        let ids: Vec<_> = conversation
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["call-slow", "call-fast"]);
        assert_eq!(conversation.messages()[2].text(), "slow result");
    }

    #[tokio::test]
    async fn test_model_error_keeps_partial_history() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![analysis_call("call-1", "files/a.pdf")]));
        llm.queue_error(LlmError::server_error("upstream exploded"));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze files/a.pdf"));
        let err = rt.run(&mut conversation, &tool_ctx()).await.unwrap_err();

        assert!(matches!(err, RuntimeError::ModelInvocation(_)));
        assert!(err.is_retryable());
        assert_eq!(roles(&conversation), vec![Role::User, Role::Assistant, Role::ToolResult]);
    }

    #[tokio::test]
    async fn test_tool_failure_aborts_request() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![analysis_call("call-1", "files/gone.pdf")]));
        let tools = Arc::new(MockToolExecutor::new().with_failing_tool(TOOL_NAME, "artifact not found"));
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze files/gone.pdf"));
        let err = rt.run(&mut conversation, &tool_ctx()).await.unwrap_err();

        assert!(matches!(err, RuntimeError::ToolInvocation(_)));
        assert!(!err.is_retryable());
        // The call is never re-issued
        assert_eq!(tools.recorded_executions().len(), 1);
        assert_eq!(llm.recorded_requests().len(), 1);
        // The stored call still gets its answer
        assert_eq!(roles(&conversation), vec![Role::User, Role::Assistant, Role::ToolResult]);
        let closing = &conversation.messages()[2];
        assert!(closing.is_error);
        assert_eq!(closing.tool_call_id.as_deref(), Some("call-1"));
        assert!(closing.text().contains("artifact not found"));
    }

    #[tokio::test]
    async fn test_turn_limit_stops_tool_loop() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        for i in 0..5 {
            llm.queue_response(LlmResponse::tool_calls(vec![analysis_call(&format!("call-{i}"), "files/a.pdf")]));
        }
        let tools = analysis_tools();
        let config = RuntimeConfig {
            max_turns: 2,
            ..RuntimeConfig::default()
        };
        let rt = runtime(&llm, &tools, config);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("loop forever"));
        let err = rt.run(&mut conversation, &tool_ctx()).await.unwrap_err();

        assert!(matches!(err, RuntimeError::TurnLimitExceeded { max_turns: 2 }));
        assert_eq!(llm.recorded_requests().len(), 2);
        // The over-limit request is not persisted
        assert_eq!(roles(&conversation), vec![Role::User, Role::Assistant, Role::ToolResult]);
    }

    #[tokio::test]
    async fn test_model_timeout_is_retryable() {
        let llm = Arc::new(MockLlmClient::new("test-model").with_delay(Duration::from_secs(5)));
        llm.queue_response(LlmResponse::text("too late"));
        let tools = analysis_tools();
        let config = RuntimeConfig {
            llm_timeout: Duration::from_millis(20),
            ..RuntimeConfig::default()
        };
        let rt = runtime(&llm, &tools, config);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        let err = rt.run(&mut conversation, &tool_ctx()).await.unwrap_err();

        assert!(matches!(err, RuntimeError::ModelTimeout(_)));
        assert!(err.is_retryable());
        assert_eq!(conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_timeout_cancels_run() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![analysis_call("call-1", "files/big.pdf")]));
        let tools = Arc::new(MockToolExecutor::new().with_slow_tool(
            TOOL_NAME,
            ToolOutput::success("late"),
            Duration::from_secs(5),
        ));
        let config = RuntimeConfig {
            tool_timeout: Duration::from_millis(20),
            ..RuntimeConfig::default()
        };
        let rt = runtime(&llm, &tools, config);
        let ctx = tool_ctx();

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze files/big.pdf"));
        let err = rt.run(&mut conversation, &ctx).await.unwrap_err();

        assert!(matches!(err, RuntimeError::ToolTimeout { ref tool, .. } if tool == TOOL_NAME));
        assert!(err.is_retryable());
        assert!(ctx.cancel.is_cancelled());
        assert_eq!(roles(&conversation), vec![Role::User, Role::Assistant, Role::ToolResult]);
        assert!(conversation.messages()[2].is_error);
    }

    #[tokio::test]
    async fn test_failed_parallel_turn_answers_every_call() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::tool_calls(vec![
            analysis_call("call-1", "files/a.pdf"),
            ToolCall::new("call-2", "broken", json!({})),
        ]));
        let tools = Arc::new(
            MockToolExecutor::new()
                .with_tool(TOOL_NAME, ToolOutput::success("Found fields: Name"))
                .with_failing_tool("broken", "disk on fire"),
        );
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Analyze both"));
        rt.run(&mut conversation, &tool_ctx()).await.unwrap_err();

        let answered: Vec<_> = conversation.messages()[2..]
            .iter()
            .map(|m| (m.role, m.tool_call_id.clone(), m.is_error))
            .collect();
        assert_eq!(
            answered,
            vec![
                (Role::ToolResult, Some("call-1".to_string()), true),
                (Role::ToolResult, Some("call-2".to_string()), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_history_is_rejected() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let err = rt.run(&mut Conversation::new(), &tool_ctx()).await.unwrap_err();

        assert!(matches!(err, RuntimeError::InvalidTransition(_)));
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_history_grows_across_runs() {
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_response(LlmResponse::text("Please share a document."));
        llm.queue_response(LlmResponse::tool_calls(vec![analysis_call("call-1", "files/b.pdf")]));
        llm.queue_response(LlmResponse::text("Name and Date."));
        let tools = analysis_tools();
        let rt = runtime(&llm, &tools, RuntimeConfig::default());

        let mut conversation = Conversation::new();
        let mut lengths = vec![];

        conversation.push(Message::user("hello"));
        rt.run(&mut conversation, &tool_ctx()).await.unwrap();
        lengths.push(conversation.len());

        conversation.push(Message::user("Here it is: files/b.pdf"));
        rt.run(&mut conversation, &tool_ctx()).await.unwrap();
        lengths.push(conversation.len());

        assert_eq!(lengths, vec![2, 6]);
        // Second run reasons over the first run's history
        let requests = llm.recorded_requests();
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[1].messages[2].text(), "Please share a document.");
    }
}
