//! `WWW-Authenticate` challenge parsing
//!
//! A 401 response may carry several `WWW-Authenticate` headers, and a single header
//! value may list several challenges:
//!
//! ```text
//! Basic realm="registry", Bearer realm="https://auth.example/token",service="registry.example"
//! ```
//!
//! Schemes and parameter names are case-insensitive and are stored lowercased.

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use std::collections::HashMap;

/// One authentication challenge issued by a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: String,
    pub parameters: HashMap<String, String>,
}

impl Challenge {
    fn param(&self, name: &str) -> &str {
        self.parameters.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn realm(&self) -> &str {
        self.param("realm")
    }

    pub fn service(&self) -> &str {
        self.param("service")
    }

    pub fn scope(&self) -> &str {
        self.param("scope")
    }

    pub fn is_scheme(&self, scheme: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme)
    }
}

/// All challenges in a response's headers, in header order
pub fn response_challenges(headers: &HeaderMap) -> Vec<Challenge> {
    headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_challenges)
        .collect()
}

/// Parse every challenge in a single header value
pub fn parse_challenges(value: &str) -> Vec<Challenge> {
    let mut cursor = Cursor::new(value);
    let mut challenges = Vec::new();

    while !cursor.at_end() {
        cursor.skip_separators();
        let scheme = cursor.token();
        if scheme.is_empty() {
            // Not a token character; skip it rather than loop forever
            cursor.bump();
            continue;
        }

        let mut challenge = Challenge {
            scheme: scheme.to_ascii_lowercase(),
            parameters: HashMap::new(),
        };

        loop {
            cursor.skip_whitespace();
            let checkpoint = cursor.pos;
            let key = cursor.token();
            cursor.skip_whitespace();
            if key.is_empty() || cursor.peek() != Some('=') {
                // Either the end of input or the scheme of the next challenge
                cursor.pos = checkpoint;
                break;
            }
            cursor.bump();
            cursor.skip_whitespace();

            let value = if cursor.peek() == Some('"') {
                cursor.quoted_string()
            } else {
                cursor.bare_value().to_string()
            };
            challenge.parameters.insert(key.to_ascii_lowercase(), value);

            cursor.skip_whitespace();
            if cursor.peek() == Some(',') {
                cursor.bump();
            } else {
                break;
            }
        }

        challenges.push(challenge);
    }

    challenges
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c == ' ' || c == '\t');
    }

    fn skip_separators(&mut self) {
        self.take_while(|c| c == ' ' || c == '\t' || c == ',');
    }

    /// RFC 7230 token
    fn token(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
    }

    /// Unquoted parameter value, up to the next separator
    fn bare_value(&mut self) -> &'a str {
        self.take_while(|c| c != ',' && c != ' ' && c != '\t')
    }

    /// Quoted string with backslash escapes; an unterminated string runs to the end
    fn quoted_string(&mut self) -> String {
        self.bump();
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.bump();
            match c {
                '"' => break,
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        value.push(escaped);
                        self.bump();
                    }
                }
                other => value.push(other),
            }
        }
        value
    }
}
