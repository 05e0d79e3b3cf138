use anyhow::{anyhow, bail, Result};

use crate::env::EnvMap;

/// Replaces `{NAME}` with the value from `env`, falling back to the process
/// environment. `{NAME:-fallback}` supplies a literal used when neither has
/// the key. `\{` and `\}` produce literal braces; a `{` not followed by a
/// name character is copied through unchanged (JSON bodies stay intact).
pub fn expand_placeholders(input: &str, env: &EnvMap) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.peek().copied() {
                Some(next) if next == '{' || next == '}' => {
                    output.push(next);
                    chars.next();
                }
                _ => output.push('\\'),
            },
            '{' if chars.peek().copied().is_some_and(is_start_char) => {
                let mut token = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    token.push(next);
                }
                if !closed {
                    bail!("Unterminated template placeholder: {{{token}");
                }
                output.push_str(&resolve(&token, env)?);
            }
            _ => output.push(ch),
        }
    }

    Ok(output)
}

fn resolve(token: &str, env: &EnvMap) -> Result<String> {
    let (key, fallback) = match token.split_once(":-") {
        Some((key, fallback)) => (key, Some(fallback)),
        None => (token, None),
    };

    if !is_valid_key(key) {
        bail!("Invalid template variable: {key}");
    }

    env.get(key)
        .cloned()
        .or_else(|| std::env::var(key).ok())
        .or_else(|| fallback.map(str::to_string))
        .ok_or_else(|| anyhow!("Missing template variable: {key}"))
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if is_start_char(c) => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
}

fn is_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
