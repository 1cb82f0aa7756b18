//! Parser for hierarchical query strings.
//!
//! Grammar:
//! ```text
//! expr      = operand operator operand | operand
//! operator  = "<<=>>" | "<=>" | ">>" | "=>" | ">"
//! operand   = "(" operand ")" | operand "|" operand | operand "+" operand | term
//! term      = ["-"] atom ["~"]
//! atom      = "ref:" text | "ref:((" uid "))" | "regex:" "/" pattern "/" flags?
//!           | "regex:" pattern | text
//! ```
//!
//! Operators are detected on the raw string, outside parentheses and quoted
//! text. A regex body containing `>` is therefore split as an operator; quote
//! the whole term or avoid `>` in hierarchical queries.

use crate::error::{Result, SearchError};
use crate::markup::block_ref::as_block_ref;
use crate::search::types::*;
use crate::types::Combine;

const OPERATOR_CHARS: [char; 3] = ['<', '=', '>'];
const REGEX_PREFIX: &str = "regex:";
const REF_PREFIX: &str = "ref:";

// ============================================================================
// Scanner
// ============================================================================

/// One character of the input with its structural context.
#[derive(Debug, Clone, Copy)]
struct Slot {
    pos: usize,
    ch: char,
    /// Parenthesis depth; parentheses themselves carry the outer depth.
    depth: usize,
    quoted: bool,
    in_regex: bool,
}

impl Slot {
    fn top_level(&self) -> bool {
        self.depth == 0 && !self.quoted
    }

    /// Top level and outside regex bodies; where `|` and `+` split.
    fn splittable(&self) -> bool {
        self.top_level() && !self.in_regex
    }
}

/// Whether the previous character allows a quote or prefix to start here.
fn at_token_start(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || "(+|<=>-".contains(c),
    }
}

/// Byte offset of the first unescaped `/` in a regex body.
fn find_regex_end(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '/' {
            return Some(i);
        }
    }
    None
}

fn scan(input: &str) -> Result<Vec<Slot>> {
    let mut slots = Vec::with_capacity(input.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut regex_until: Option<usize> = None;
    let mut prev: Option<char> = None;

    for (pos, ch) in input.char_indices() {
        let mut slot = Slot {
            pos,
            ch,
            depth,
            quoted: false,
            in_regex: false,
        };

        if let Some(end) = regex_until {
            slot.in_regex = true;
            if pos >= end {
                regex_until = None;
            }
        } else if let Some(q) = quote {
            slot.quoted = true;
            if ch == q {
                quote = None;
            }
        } else {
            match ch {
                '"' | '\'' if at_token_start(prev) && input[pos + 1..].contains(ch) => {
                    quote = Some(ch);
                    slot.quoted = true;
                }
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return Err(SearchError::parse(format!(
                            "Unmatched ')' at position {}",
                            pos
                        )));
                    }
                    depth -= 1;
                    slot.depth = depth;
                }
                'r' if at_token_start(prev) && input[pos..].starts_with("regex:/") => {
                    let body_start = pos + REGEX_PREFIX.len() + 1;
                    if let Some(offset) = find_regex_end(&input[body_start..]) {
                        regex_until = Some(body_start + offset);
                        slot.in_regex = true;
                    }
                }
                _ => {}
            }
        }

        slots.push(slot);
        prev = Some(ch);
    }

    if depth != 0 {
        return Err(SearchError::parse("Unclosed '(' in query"));
    }

    Ok(slots)
}

// ============================================================================
// Operator detection
// ============================================================================

/// A top-level run of operator characters.
#[derive(Debug, Clone, Copy)]
struct OperatorRun {
    operator: HierOperator,
    start: usize,
    end: usize,
}

fn find_operator_runs(input: &str, slots: &[Slot]) -> Result<Vec<OperatorRun>> {
    let mut runs = Vec::new();
    let mut i = 0;

    while i < slots.len() {
        let slot = slots[i];
        if !(slot.top_level() && OPERATOR_CHARS.contains(&slot.ch)) {
            i += 1;
            continue;
        }

        let start = slot.pos;
        let mut j = i;
        while j + 1 < slots.len()
            && slots[j + 1].top_level()
            && OPERATOR_CHARS.contains(&slots[j + 1].ch)
        {
            j += 1;
        }
        let end = slots[j].pos + slots[j].ch.len_utf8();
        let token = &input[start..end];

        match HierOperator::from_token(token) {
            Some(operator) => runs.push(OperatorRun {
                operator,
                start,
                end,
            }),
            // Comparison-like runs (`>=`, `<>`, `<`, `=`) stay plain text.
            None if is_malformed_operator(token) => {
                return Err(SearchError::parse(format!(
                    "Unknown operator '{}' at position {}",
                    token, start
                )));
            }
            None => {}
        }

        i = j + 1;
    }

    Ok(runs)
}

/// A run that looks like a mistyped structural operator (`==>`, `>>>`).
fn is_malformed_operator(token: &str) -> bool {
    token.len() >= 2
        && token.ends_with('>')
        && (token.contains('=') || token.matches('>').count() >= 2)
}

// ============================================================================
// Operands
// ============================================================================

fn parse_operand(text: &str) -> Result<Expression> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SearchError::parse("Empty operand"));
    }

    let slots = scan(text)?;

    if let Some(inner) = strip_wrapping_parens(text, &slots) {
        return parse_operand(inner);
    }

    for (sep, operator) in [('|', Combine::Or), ('+', Combine::And)] {
        let parts = split_top_level(text, &slots, sep);
        if parts.len() > 1 {
            let operands = parts
                .into_iter()
                .map(|part| {
                    if part.trim().is_empty() {
                        Err(SearchError::parse(format!(
                            "Empty operand around '{}' in '{}'",
                            sep, text
                        )))
                    } else {
                        parse_operand(part)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expression::Compound { operator, operands });
        }
    }

    parse_term(text).map(Expression::Term)
}

/// If the whole text is wrapped in one pair of parentheses, return the inside.
fn strip_wrapping_parens<'a>(text: &'a str, slots: &[Slot]) -> Option<&'a str> {
    let first = slots.first()?;
    if first.ch != '(' || first.quoted || first.in_regex {
        return None;
    }
    let close = slots
        .iter()
        .skip(1)
        .find(|s| s.ch == ')' && s.top_level() && !s.in_regex)?;
    if close.pos + 1 == text.len() {
        Some(&text[1..close.pos])
    } else {
        None
    }
}

fn split_top_level<'a>(text: &'a str, slots: &[Slot], sep: char) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut last = 0;
    for slot in slots.iter().filter(|s| s.ch == sep && s.splittable()) {
        parts.push(&text[last..slot.pos]);
        last = slot.pos + sep.len_utf8();
    }
    parts.push(&text[last..]);
    parts
}

// ============================================================================
// Terms
// ============================================================================

/// Strip matching wrapping quotes until none remain.
fn strip_quotes(mut text: &str) -> &str {
    loop {
        let bytes = text.as_bytes();
        if bytes.len() >= 2
            && (bytes[0] == b'"' || bytes[0] == b'\'')
            && bytes[bytes.len() - 1] == bytes[0]
        {
            text = &text[1..text.len() - 1];
        } else {
            return text;
        }
    }
}

fn parse_term(raw: &str) -> Result<Term> {
    let mut text = raw.trim();

    let mut negate = false;
    if text.len() > 1 && text.starts_with('-') && !text[1..].starts_with(char::is_whitespace) {
        negate = true;
        text = &text[1..];
    }

    let mut expand = false;
    if text.len() > 1 && text.ends_with('~') {
        expand = true;
        text = text[..text.len() - 1].trim_end();
    }

    let text = strip_quotes(text);
    if text.trim().is_empty() {
        return Err(SearchError::parse(format!("Empty term in '{}'", raw)));
    }

    let kind_and_text = if let Some(rest) = text.strip_prefix(REF_PREFIX) {
        match as_block_ref(rest) {
            Some(id) => (TermKind::BlockRef, id.to_string()),
            None => (TermKind::PageRef, parse_ref_body(rest)?),
        }
    } else if let Some(rest) = text.strip_prefix(REGEX_PREFIX) {
        let (pattern, flags) = parse_regex_body(rest)?;
        (TermKind::Regex { flags }, pattern)
    } else {
        (TermKind::Text, text.to_string())
    };

    let (kind, text) = kind_and_text;
    Ok(Term {
        text,
        kind,
        negate,
        expand,
    })
}

/// `ref:` body: a bare title, `[[Title]]`, `#Title` or `#[[Title]]`.
fn parse_ref_body(rest: &str) -> Result<String> {
    let mut title = strip_quotes(rest.trim());
    title = title.strip_prefix('#').unwrap_or(title);
    if let Some(inner) = title.strip_prefix("[[").and_then(|t| t.strip_suffix("]]")) {
        title = inner;
    }
    let title = title.trim();
    if title.is_empty() {
        return Err(SearchError::parse("Empty page reference after 'ref:'"));
    }
    Ok(title.to_string())
}

/// `regex:` body: `/pattern/flags` or a bare flag-less pattern.
pub(crate) fn parse_regex_body(rest: &str) -> Result<(String, Option<String>)> {
    let rest = rest.trim();

    if let Some(body) = rest.strip_prefix('/') {
        if let Some(close) = body.rfind('/') {
            let flags = &body[close + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                let pattern = &body[..close];
                if pattern.is_empty() {
                    return Err(SearchError::parse("Empty regex pattern"));
                }
                let flags = (!flags.is_empty()).then(|| flags.to_string());
                return Ok((pattern.to_string(), flags));
            }
        }
    }

    if rest.is_empty() {
        return Err(SearchError::parse("Empty regex pattern after 'regex:'"));
    }
    Ok((rest.to_string(), None))
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a query string with the operators' default depths.
pub fn parse(input: &str) -> Result<Expression> {
    parse_with_depth(input, None)
}

/// Parse a query string, overriding the operator's depth when `max_depth` is set.
pub fn parse_with_depth(input: &str, max_depth: Option<usize>) -> Result<Expression> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SearchError::parse("Empty query"));
    }

    let slots = scan(trimmed)?;
    let runs = find_operator_runs(trimmed, &slots)?;

    let Some(run) = HierOperator::PRECEDENCE
        .iter()
        .find_map(|op| runs.iter().find(|r| r.operator == *op))
        .copied()
    else {
        return parse_operand(trimmed);
    };

    if runs.len() > 1 {
        return Err(SearchError::parse(format!(
            "Hierarchical operators cannot be combined: found {} operators in '{}'",
            runs.len(),
            trimmed
        )));
    }

    let left = trimmed[..run.start].trim();
    let right = trimmed[run.end..].trim();
    if left.is_empty() || right.is_empty() {
        return Err(SearchError::parse(format!(
            "Operator '{}' needs operands on both sides",
            run.operator
        )));
    }

    Ok(Expression::Hierarchical {
        operator: run.operator,
        left: Box::new(parse_operand(left)?),
        right: Box::new(parse_operand(right)?),
        max_depth: max_depth.unwrap_or(run.operator.default_depth()),
    })
}

// ============================================================================
// Tests
// ============================================================================
