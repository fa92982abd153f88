//! Prompting the generative fallback and decoding what it sends back.
//!
//! Model output is free text. Decoding tries, in order:
//! 1. the whole output as a JSON list
//! 2. the first balanced `[...]` span in the output
//! 3. that span with single quotes turned into double quotes, when it has
//!    no double quotes of its own
//!
//! Items with a blank question or answer are dropped.

use tracing::debug;

use crate::error::GenerativeParseFailure;
use crate::model::QaPair;

/// Build the instruction sent to the generative fallback.
pub fn generation_prompt(count: usize) -> String {
    format!(
        "Generate {count} simple programming interview questions and their short answers. \
         Respond in strict JSON format ONLY: a JSON array of objects with the keys \
         \"question\" and \"answer\", nothing else. Example: \
         [{{\"question\": \"What is Python?\", \"answer\": \"A programming language\"}}]"
    )
}

/// Decode generated text into question/answer pairs.
pub fn parse_generated_pairs(text: &str) -> Result<Vec<QaPair>, GenerativeParseFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerativeParseFailure::new("empty output", text));
    }

    let mut last_error = match decode_list(trimmed) {
        Ok(pairs) => return Ok(pairs),
        Err(e) => e,
    };
    debug!(error = %last_error, "strict decode failed, looking for a bracketed list");

    let Some(span) = first_bracketed_span(trimmed) else {
        return Err(GenerativeParseFailure::new(
            format!("no bracketed list found ({last_error})"),
            text,
        ));
    };

    match decode_list(span) {
        Ok(pairs) => return Ok(pairs),
        Err(e) => last_error = e,
    }

    if !span.contains('"') && span.contains('\'') {
        debug!("retrying bracketed list with single quotes normalized");
        match decode_list(&span.replace('\'', "\"")) {
            Ok(pairs) => return Ok(pairs),
            Err(e) => last_error = e,
        }
    }

    Err(GenerativeParseFailure::new(last_error, text))
}

fn decode_list(candidate: &str) -> Result<Vec<QaPair>, String> {
    let pairs: Vec<QaPair> = serde_json::from_str(candidate).map_err(|e| e.to_string())?;
    Ok(pairs
        .into_iter()
        .map(|p| QaPair::new(p.question.trim(), p.answer.trim()))
        .filter(|p| !p.question.is_empty() && !p.answer.is_empty())
        .collect())
}

/// The first `[` and its matching `]`, skipping brackets inside string
/// literals. `None` when the list never closes.
pub fn first_bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let rest = &text[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in rest.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
