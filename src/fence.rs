//! Fenced code block detection for model replies
//!
//! Only the first block counts. The opening fence may carry a lowercase
//! language tag, but only when the tag is followed directly by a newline;
//! anything else after the fence is treated as part of the code.

use crate::error::ExchangeError;

pub const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub body: String,
}

/// A classified model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Code(CodeBlock),
}

impl Reply {
    pub fn is_code(&self) -> bool {
        matches!(self, Reply::Code(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Text(text) => text,
            Reply::Code(block) => block.body,
        }
    }
}

/// Classify reply text as prose or code.
///
/// Text containing a fence is always code. If the fence is never closed the
/// raw text is kept as the code body, untouched.
pub fn classify(text: &str) -> Result<Reply, ExchangeError> {
    if !text.contains(FENCE) {
        if text.is_empty() {
            return Err(ExchangeError::EmptyExtraction);
        }
        return Ok(Reply::Text(text.to_string()));
    }

    let block = first_block(text).unwrap_or_else(|| CodeBlock {
        language: None,
        body: text.to_string(),
    });

    if block.body.is_empty() {
        return Err(ExchangeError::EmptyExtraction);
    }

    Ok(Reply::Code(block))
}

/// Find the first closed fenced block, trimming its body
pub fn first_block(text: &str) -> Option<CodeBlock> {
    let open = text.find(FENCE)?;
    let after = &text[open + FENCE.len()..];

    let tag_len = after.bytes().take_while(u8::is_ascii_lowercase).count();
    let (language, content) = match after[tag_len..].strip_prefix('\n') {
        Some(rest) => ((tag_len > 0).then(|| after[..tag_len].to_string()), rest),
        None => (None, after),
    };

    let close = content.find(FENCE)?;
    Some(CodeBlock {
        language,
        body: content[..close].trim().to_string(),
    })
}
