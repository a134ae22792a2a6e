//! Quote-aware command-line tokenizer
//!
//! Splits one DSL command line (already stripped of its two-character prefix)
//! into tokens. Unquoted runs of non-whitespace are single tokens; `"` and
//! `'` open quoted tokens. Inside quotes, a backslash escapes a following
//! backslash or the active quote character; any other escaped character keeps
//! its backslash verbatim. Unterminated quotes and dangling backslashes are
//! tolerated — the content consumed so far becomes the token.

/// Tokenize a command-line fragment into a list of tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }

        let c = chars[pos];
        if c == '"' || c == '\'' {
            let (token, next) = consume_quoted(&chars, pos, c);
            tokens.push(token);
            pos = next;
        } else {
            let start = pos;
            while pos < chars.len() && !chars[pos].is_whitespace() {
                pos += 1;
            }
            tokens.push(chars[start..pos].iter().collect());
        }
    }

    tokens
}

/// Consume a quoted token starting at the opening quote.
/// Returns the unescaped content and the position after the closing quote
/// (or end of input for unterminated quotes).
fn consume_quoted(chars: &[char], mut pos: usize, quote: char) -> (String, usize) {
    pos += 1; // skip opening quote
    let mut content = String::new();

    while pos < chars.len() {
        let c = chars[pos];
        if c == '\\' {
            pos += 1;
            if pos >= chars.len() {
                // Dangling backslash
                content.push('\\');
                break;
            }
            let next = chars[pos];
            if next == '\\' || next == quote {
                content.push(next);
            } else {
                // Any other escaped char keeps the backslash
                content.push('\\');
                content.push(next);
            }
            pos += 1;
        } else if c == quote {
            pos += 1; // skip closing quote
            break;
        } else {
            content.push(c);
            pos += 1;
        }
    }

    (content, pos)
}
