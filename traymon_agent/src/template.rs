//! Overlay text templates.
//!
//! A template is plain text with `{token}` placeholders drawn from a closed
//! set of metric names. `{{` and `}}` produce literal braces. Templates are
//! parsed once when configuration is loaded, so an unknown placeholder is a
//! configuration error rather than a formatting failure at render time.

use std::fmt;
use std::str::FromStr;

use crate::error::TemplateError;

/// Default overlay layout: one metric per line.
pub const DEFAULT_FORMAT: &str = "{cpu}\n{ram}\n{net}\n{disk}\n{gpu}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Cpu,
    Ram,
    Net,
    Disk,
    Gpu,
}

impl Token {
    pub const ALL: [Token; 5] = [Token::Cpu, Token::Ram, Token::Net, Token::Disk, Token::Gpu];

    pub fn name(self) -> &'static str {
        match self {
            Token::Cpu => "cpu",
            Token::Ram => "ram",
            Token::Net => "net",
            Token::Disk => "disk",
            Token::Gpu => "gpu",
        }
    }
}

impl FromStr for Token {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Token::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| TemplateError::UnknownToken(s.to_string()))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Rendered text for every token, one entry per metric category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    pub cpu: String,
    pub ram: String,
    pub net: String,
    pub disk: String,
    pub gpu: String,
}

impl Tokens {
    pub fn get(&self, token: Token) -> &str {
        match token {
            Token::Cpu => &self.cpu,
            Token::Ram => &self.ram,
            Token::Net => &self.net,
            Token::Disk => &self.disk,
            Token::Gpu => &self.gpu,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((at, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => return Err(TemplateError::Unclosed(at)),
                            Some((_, c)) => name.push(c),
                        }
                    }
                    if name.is_empty() {
                        return Err(TemplateError::EmptyToken(at));
                    }
                    let token = name.parse::<Token>()?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token(token));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                        continue;
                    }
                    return Err(TemplateError::StrayClose(at));
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Tokens referenced by the template, in order of appearance.
    pub fn tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Token(t) => Some(*t),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, values: &Tokens) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Token(t) => out.push_str(values.get(*t)),
            }
        }
        out
    }

    /// Render for display: surrounding whitespace trimmed, never empty.
    pub fn render_display(&self, values: &Tokens) -> String {
        let rendered = self.render(values);
        let trimmed = rendered.trim();
        if trimmed.is_empty() {
            " ".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Token(Token::Cpu),
                Segment::Literal("\n".into()),
                Segment::Token(Token::Ram),
                Segment::Literal("\n".into()),
                Segment::Token(Token::Net),
                Segment::Literal("\n".into()),
                Segment::Token(Token::Disk),
                Segment::Literal("\n".into()),
                Segment::Token(Token::Gpu),
            ],
        }
    }
}
