//! Integration tests for the editor against a mocked chat-completions API.

use blog_writer::editor::{EDIT_FAILED_SUMMARY, EditOptions, Editor};
use blog_writer::llm::{ChatClient, LlmProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGINAL: &str = "# Remote Work\n\nRemote work is growing quickly across many industries.\n\n## Benefits\n\nFlexibility and focus.";

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "model": "llama-3.1-8b-instant",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

fn client_for(server: &MockServer) -> ChatClient {
    ChatClient::new(
        LlmProvider::Groq,
        "test-key",
        format!("{}/openai/v1", server.uri()),
        "llama-3.1-8b-instant",
    )
    .expect("Failed to build client")
}

#[tokio::test]
async fn test_llm_failure_keeps_original_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let editor = Editor::new(10);
    let result = editor
        .apply_edit(&client_for(&server), ORIGINAL, "Make it shorter", EditOptions::default())
        .await;

    assert!(!result.success);
    assert_eq!(result.edited_content, ORIGINAL);
    assert_eq!(result.changes_summary, EDIT_FAILED_SUMMARY);
    assert!(result.diff_text.is_empty());
    assert!(result.error_message.unwrap().contains("500"));
    assert!(editor.history().is_empty());
}

#[tokio::test]
async fn test_successful_edit_tracks_version_and_diff() {
    let server = MockServer::start().await;
    let edited = "# Remote Work\n\nRemote work is growing.\n\n## Benefits\n\nFlexibility and focus.";
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "max_tokens": 4000, "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(edited)))
        .expect(1)
        .mount(&server)
        .await;

    let editor = Editor::new(10);
    let result = editor
        .apply_edit(&client_for(&server), ORIGINAL, "Make it shorter", EditOptions::default())
        .await;

    assert!(result.success);
    assert_eq!(result.edited_content, edited);
    assert_eq!(result.provider_used, "groq");
    assert_eq!(result.model_used, "llama-3.1-8b-instant");
    assert!(result.diff_text.starts_with("--- original\n+++ edited\n"));
    assert!(result.changes_summary.contains("Applied instruction: 'Make it shorter'"));
    assert!(result.changes_summary.contains("Lines added: 1, Lines removed: 1"));
    assert!(result.changes_summary.contains("-4 words (16 → 12)"));

    let history = editor.history();
    assert_eq!(history.len(), 1);
    assert_eq!(Some(history[0].version_id.clone()), result.version_id);
    assert_eq!(history[0].content, edited);
}

#[tokio::test]
async fn test_untracked_edit_leaves_history_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("# Remote Work\n\nShort.")))
        .mount(&server)
        .await;

    let editor = Editor::new(10);
    let options = EditOptions {
        track_version: false,
        ..EditOptions::default()
    };
    let result = editor
        .apply_edit(&client_for(&server), ORIGINAL, "Make it shorter", options)
        .await;

    assert!(result.success);
    assert!(result.version_id.is_none());
    assert!(editor.history().is_empty());
}

#[tokio::test]
async fn test_history_is_bounded_across_edits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("```markdown\n# Remote Work\n\nEdited.\n```")))
        .mount(&server)
        .await;

    let editor = Editor::new(2);
    let client = client_for(&server);
    let mut ids = Vec::new();
    for i in 0..3 {
        let result = editor
            .apply_edit(&client, ORIGINAL, &format!("Edit number {i}"), EditOptions::default())
            .await;
        assert_eq!(result.edited_content, "# Remote Work\n\nEdited.");
        ids.push(result.version_id.unwrap());
    }

    let history = editor.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version_id, ids[1]);
    assert_eq!(history[1].version_id, ids[2]);
    assert_eq!(history[1].parent_version.as_deref(), Some(ids[1].as_str()));
    assert!(editor.undo_to_version(&ids[0]).is_none());
}
