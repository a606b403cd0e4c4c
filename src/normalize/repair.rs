//! Best-effort repair of almost-JSON model output
//!
//! A single forward scan that rewrites the text into something `serde_json` accepts. It
//! tracks the open containers and whether an object is waiting for a key, which is enough
//! to fix the slips models make most often:
//!
//! - prose before or after the outermost array
//! - `//` and `/* */` comments
//! - single-quoted strings and bare object keys
//! - `True`/`False`/`None` style literals and unquoted string values
//! - trailing, doubled and missing commas (`}{`)
//! - output cut off mid-string or with containers left open
//!
//! The result is not guaranteed to be valid JSON; the caller re-decodes and reports.

/// Rewrite `input` into (hopefully) valid JSON.
pub fn repair_json(input: &str) -> String {
    let span = outer_span(input);
    if span.is_empty() {
        return input.trim().to_string();
    }
    let mut scanner = Scanner::new(span);
    scanner.run();
    scanner.finish()
}

/// Slice from the opening bracket of the case array to its last matching closer.
///
/// The array start is the first `[` that opens an object or is empty, so bracketed prose
/// like `[3]` ahead of the payload is passed over. Failing that, the first `[`, then the
/// first `{`.
fn outer_span(input: &str) -> &str {
    let (start, closer) = match (array_start(input), input.find('{')) {
        (Some(start), _) => (start, ']'),
        (None, Some(start)) => (start, '}'),
        (None, None) => return "",
    };
    match input.rfind(closer) {
        Some(end) if end > start => &input[start..=end],
        _ => &input[start..],
    }
}

fn array_start(input: &str) -> Option<usize> {
    let opens_cases = |index: usize| {
        matches!(
            input[index + 1..].trim_start().chars().next(),
            Some('{') | Some(']')
        )
    };
    input
        .match_indices('[')
        .map(|(index, _)| index)
        .find(|&index| opens_cases(index))
        .or_else(|| input.find('['))
}

struct Frame {
    closer: char,
    expecting_key: bool,
    dangling_key: bool,
}

impl Frame {
    fn is_object(&self) -> bool {
        self.closer == '}'
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    out: String,
    frames: Vec<Frame>,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            out: String::with_capacity(text.len() + 16),
            frames: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '/' if self.peek_at(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                '"' | '\'' => {
                    self.separate();
                    self.claim_key();
                    self.copy_string(c);
                }
                '{' | '[' => {
                    self.separate();
                    self.out.push(c);
                    self.frames.push(Frame {
                        closer: if c == '{' { '}' } else { ']' },
                        expecting_key: c == '{',
                        dangling_key: false,
                    });
                    self.pos += 1;
                }
                '}' | ']' => {
                    self.close(c);
                    self.pos += 1;
                }
                ',' => {
                    self.comma();
                    self.pos += 1;
                }
                ':' => {
                    self.colon();
                    self.pos += 1;
                }
                c if c.is_whitespace() => {
                    self.out.push(c);
                    self.pos += 1;
                }
                c if is_word_char(c) => self.word(),
                '/' if last_significant(&self.out) == Some(':') => self.bare_value(String::new()),
                _ => self.pos += 1,
            }
        }
    }

    fn finish(mut self) -> String {
        while let Some(frame) = self.frames.pop() {
            self.tidy_before_close(&frame);
            self.out.push(frame.closer);
        }
        self.out
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.chars.len() {
            if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    /// Insert the punctuation a value needs after a previous value or a key with no colon.
    fn separate(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let ends_value = match last_significant(&self.out) {
            Some('"' | '}' | ']') => true,
            Some(c) => c.is_alphanumeric(),
            None => false,
        };
        if !ends_value {
            return;
        }
        if frame.dangling_key {
            self.out.push(':');
            frame.dangling_key = false;
            frame.expecting_key = false;
        } else {
            self.out.push(',');
            frame.expecting_key = frame.is_object();
        }
    }

    /// Mark the upcoming token as a key when the enclosing object is waiting for one.
    fn claim_key(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(frame) if frame.is_object() && frame.expecting_key => {
                frame.expecting_key = false;
                frame.dangling_key = true;
                true
            }
            _ => false,
        }
    }

    fn close(&mut self, closer: char) {
        if !self.frames.iter().any(|f| f.closer == closer) {
            return;
        }
        while let Some(frame) = self.frames.pop() {
            self.tidy_before_close(&frame);
            self.out.push(frame.closer);
            if frame.closer == closer {
                break;
            }
        }
    }

    fn tidy_before_close(&mut self, frame: &Frame) {
        self.trim_end();
        if self.out.ends_with(',') {
            self.out.pop();
            self.trim_end();
        }
        if self.out.ends_with(':') {
            self.out.push_str("null");
        } else if frame.dangling_key {
            self.out.push_str(":null");
        }
    }

    fn comma(&mut self) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        match last_significant(&self.out) {
            Some(',' | '[' | '{') | None => return,
            Some(':') => self.out.push_str("null"),
            _ if frame.dangling_key => self.out.push_str(":null"),
            _ => {}
        }
        self.out.push(',');
        frame.dangling_key = false;
        frame.expecting_key = frame.is_object();
    }

    fn colon(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.dangling_key {
                frame.dangling_key = false;
                self.out.push(':');
            }
        }
    }

    fn copy_string(&mut self, quote: char) {
        self.pos += 1;
        self.out.push('"');
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                c if c == quote => {
                    self.out.push('"');
                    return;
                }
                '\\' => match self.peek() {
                    Some('\'') => {
                        self.out.push('\'');
                        self.pos += 1;
                    }
                    Some(next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                        self.out.push('\\');
                        self.out.push(next);
                        self.pos += 1;
                    }
                    Some(_) => self.out.push_str("\\\\"),
                    None => {}
                },
                c => push_escaped(&mut self.out, c),
            }
        }
        // cut off mid-string
        self.out.push('"');
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        self.separate();
        if self.claim_key() {
            push_quoted(&mut self.out, &word);
            return;
        }
        if let Some(literal) = literal(&word) {
            self.out.push_str(literal);
        } else if let Some(number) = number(&word) {
            self.out.push_str(&number);
        } else if last_significant(&self.out) == Some(':') {
            self.bare_value(word);
        } else {
            push_quoted(&mut self.out, &word);
        }
    }

    /// Unquoted object value: everything up to the next delimiter becomes one string.
    fn bare_value(&mut self, mut text: String) {
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        push_quoted(&mut self.out, text.trim_end());
    }

    fn trim_end(&mut self) {
        let len = self.out.trim_end().len();
        self.out.truncate(len);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '+' | '.' | '$')
}

fn last_significant(out: &str) -> Option<char> {
    out.trim_end().chars().next_back()
}

fn literal(word: &str) -> Option<&'static str> {
    match word {
        "true" | "True" | "TRUE" => Some("true"),
        "false" | "False" | "FALSE" => Some("false"),
        "null" | "Null" | "NULL" | "None" | "none" | "undefined" | "NaN" => Some("null"),
        _ => None,
    }
}

fn number(word: &str) -> Option<String> {
    let word = word.strip_prefix('+').unwrap_or(word);
    if let Ok(number) = serde_json::from_str::<serde_json::Number>(word) {
        return Some(number.to_string());
    }
    word.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(|n| n.to_string())
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        push_escaped(out, c);
    }
    out.push('"');
}
