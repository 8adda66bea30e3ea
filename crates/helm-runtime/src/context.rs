//! Context assembly for model calls.
//!
//! Each turn the controller hands the gateway a system preamble derived from
//! the enabled tool catalog plus a fixed trailing window of the session
//! transcript — not a token-budget-aware truncation.

use helm_core::messages::Context;
use helm_core::tools::Tool;
use helm_sessions::Session;

/// Build the system preamble from the enabled tool catalog.
pub fn build_preamble(catalog: &[Tool]) -> String {
    let mut preamble = String::from(
        "You are Helm, an agent that completes tasks by reasoning and using tools. \
         Work step by step: request tool calls when you need to act or observe, and \
         reply with plain text once the task is done.",
    );
    if catalog.is_empty() {
        preamble.push_str("\n\nNo tools are currently available; answer directly.");
    } else {
        preamble.push_str("\n\nAvailable tools:\n");
        for tool in catalog {
            preamble.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        }
    }
    preamble
}

/// Build the context for one model call.
pub fn build_context(session: &Session, catalog: Vec<Tool>, window: usize) -> Context {
    Context {
        system_prompt: Some(build_preamble(&catalog)),
        messages: session.recent_messages(window).to_vec(),
        tools: Some(catalog),
    }
}
