use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// The AI panel is scripted: every tool produces a fixed template filled with
/// the caller's input. Deterministic on purpose, there is no model behind it.
const TOOLS: &[(&str, &str)] = &[
    ("lesson-outline", "Draft a lesson outline from a topic"),
    ("quiz-draft", "Draft quiz questions from a topic"),
    ("summarizer", "Summarize a passage for students"),
    ("feedback-draft", "Draft feedback wording from rough notes"),
];

fn scripted_output(tool: &str, input: &str) -> Option<String> {
    match tool {
        "lesson-outline" => Some(format!(
            "Lesson outline: {}\n1. Warm-up discussion (5 min)\n2. Core concept walkthrough (20 min)\n3. Guided practice (15 min)\n4. Exit ticket (5 min)",
            input
        )),
        "quiz-draft" => Some(format!(
            "Quiz draft: {}\nQ1. Define the key term in your own words.\nQ2. Give one worked example.\nQ3. Explain a common mistake and how to avoid it.",
            input
        )),
        "summarizer" => Some(format!(
            "Summary: {} — key points condensed for a student audience. Review the original before sharing.",
            input
        )),
        "feedback-draft" => Some(format!(
            "Feedback draft: {} Consider opening with a strength, then one concrete next step.",
            input
        )),
        _ => None,
    }
}

fn handle_tools_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let tools: Vec<serde_json::Value> = TOOLS
        .iter()
        .map(|(id, description)| json!({ "id": id, "description": description }))
        .collect();
    ok(&req.id, json!({ "tools": tools }))
}

fn handle_tools_run(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let tool = match req.params.get("tool").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing tool", None),
    };
    let input = match req.params.get("input").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing input", None),
    };
    if input.is_empty() {
        return err(&req.id, "bad_params", "input must not be empty", None);
    }

    match scripted_output(&tool, &input) {
        Some(output) => ok(&req.id, json!({ "tool": tool, "output": output })),
        None => err(
            &req.id,
            "not_found",
            format!("unknown tool: {}", tool),
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ai.tools.list" => Some(handle_tools_list(state, req)),
        "ai.tools.run" => Some(handle_tools_run(state, req)),
        _ => None,
    }
}
