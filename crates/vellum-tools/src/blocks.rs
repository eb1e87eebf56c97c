//! Splits a chat message into prose and ```` ```tool_code ```` blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[expect(clippy::expect_used)]
static TOOL_CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?sm)^[ \t]*```[ \t]*tool_code[^\n]*$(.*?)^[ \t]*```[ \t]*$")
        .expect("tool_code block pattern is valid")
});

#[expect(clippy::expect_used)]
static OPEN_TOOL_CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[ \t]*tool_code[^\n]*$").expect("tool_code fence pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum MessageSegment {
    Text(String),
    ToolCode(String),
    /// A block whose closing fence has not arrived yet (message still streaming).
    PartialToolCode(String),
}

pub fn split_message(message: &str) -> Vec<MessageSegment> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for captures in TOOL_CODE_BLOCK.captures_iter(message) {
        let (Some(whole), Some(body)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last_end {
            segments.push(MessageSegment::Text(
                message[last_end..whole.start()].to_string(),
            ));
        }
        segments.push(MessageSegment::ToolCode(trim_block(body.as_str())));
        last_end = whole.end();
    }

    let rest = &message[last_end..];
    if let Some(open) = OPEN_TOOL_CODE_FENCE.find(rest) {
        if open.start() > 0 {
            segments.push(MessageSegment::Text(rest[..open.start()].to_string()));
        }
        segments.push(MessageSegment::PartialToolCode(trim_block(
            &rest[open.end()..],
        )));
    } else if !rest.is_empty() {
        segments.push(MessageSegment::Text(rest.to_string()));
    }

    segments
}

/// Sources of all complete tool_code blocks, in message order.
pub fn tool_code_blocks(message: &str) -> Vec<String> {
    split_message(message)
        .into_iter()
        .filter_map(|segment| match segment {
            MessageSegment::ToolCode(code) => Some(code),
            _ => None,
        })
        .collect()
}

fn trim_block(body: &str) -> String {
    body.trim_matches(|c| c == '\n' || c == '\r').to_string()
}
