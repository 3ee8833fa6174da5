//! Bracket notation for lexical units
//!
//! A unit is written `^lemma<tag1><tag2>{child child ...}$`. An optional
//! `/lemma<tag>` segment after the source reading carries a target-side
//! reading for already bitext-annotated input. A backslash before any
//! character strips it of its syntactic meaning.

use crate::error::TreeParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that must be escaped to survive a print/parse cycle.
const SPECIAL: &[char] = &['^', '$', '<', '>', '{', '}', '/', '\\'];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub lemma: String,
    pub tags: Vec<String>,
}

/// A parsed tree node with owned children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lu {
    pub lemma: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Reading>,
    pub children: Vec<Lu>,
}

impl Lu {
    pub fn new(lemma: &str, tags: &[&str], children: Vec<Lu>) -> Self {
        Self {
            lemma: lemma.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            target: None,
            children,
        }
    }

    /// Parse exactly one unit; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, TreeParseError> {
        let mut parser = Parser::new(s);
        parser.skip_whitespace();
        if parser.at_end() {
            return Err(TreeParseError::Empty);
        }
        let lu = parser.unit()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(TreeParseError::TrailingInput { offset: parser.pos });
        }
        Ok(lu)
    }

    /// Parse a whitespace-separated run of top-level units.
    pub fn parse_sequence(s: &str) -> Result<Vec<Self>, TreeParseError> {
        let mut parser = Parser::new(s);
        let mut units = Vec::new();
        loop {
            parser.skip_whitespace();
            if parser.at_end() {
                break;
            }
            units.push(parser.unit()?);
        }
        if units.is_empty() {
            return Err(TreeParseError::Empty);
        }
        Ok(units)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Pre-order walk of this unit and everything beneath it.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Number of units in this subtree, self included.
    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

/// Depth-first, pre-order iterator over a [`Lu`] subtree.
pub struct Iter<'a> {
    stack: Vec<&'a Lu>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Lu;

    fn next(&mut self) -> Option<Self::Item> {
        let lu = self.stack.pop()?;
        self.stack.extend(lu.children.iter().rev());
        Some(lu)
    }
}

pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn write_reading(f: &mut fmt::Formatter<'_>, lemma: &str, tags: &[String]) -> fmt::Result {
    f.write_str(&escape(lemma))?;
    for tag in tags {
        write!(f, "<{}>", escape(tag))?;
    }
    Ok(())
}

impl fmt::Display for Lu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("^")?;
        write_reading(f, &self.lemma, &self.tags)?;
        if let Some(target) = &self.target {
            f.write_str("/")?;
            write_reading(f, &target.lemma, &target.tags)?;
        }
        if !self.children.is_empty() {
            f.write_str("{")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str("}")?;
        }
        f.write_str("$")
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), TreeParseError> {
        let offset = self.pos;
        match self.bump() {
            Some(c) if c == want => Ok(()),
            _ if want == '^' => Err(TreeParseError::MissingOpen { offset }),
            _ => Err(TreeParseError::MissingClose { offset }),
        }
    }

    fn unit(&mut self) -> Result<Lu, TreeParseError> {
        self.expect('^')?;
        let source = self.reading()?;
        let target = if self.peek() == Some('/') {
            self.bump();
            Some(self.reading()?)
        } else {
            None
        };
        let children = if self.peek() == Some('{') {
            self.children()?
        } else {
            Vec::new()
        };
        self.expect('$')?;
        Ok(Lu {
            lemma: source.lemma,
            tags: source.tags,
            target,
            children,
        })
    }

    fn reading(&mut self) -> Result<Reading, TreeParseError> {
        let mut lemma = String::new();
        loop {
            match self.peek() {
                None => return Err(TreeParseError::MissingClose { offset: self.pos }),
                Some('\\') => {
                    self.bump();
                    lemma.push(self.bump().ok_or(TreeParseError::DanglingEscape)?);
                }
                Some('<') | Some('/') | Some('{') | Some('$') => break,
                Some(c @ ('^' | '>' | '}')) => {
                    return Err(TreeParseError::Unexpected {
                        found: c,
                        offset: self.pos,
                    })
                }
                Some(c) => {
                    self.bump();
                    lemma.push(c);
                }
            }
        }

        let mut tags = Vec::new();
        while self.peek() == Some('<') {
            let start = self.pos;
            self.bump();
            let mut tag = String::new();
            loop {
                match self.bump() {
                    None => return Err(TreeParseError::UnterminatedTag { offset: start }),
                    Some('\\') => tag.push(self.bump().ok_or(TreeParseError::DanglingEscape)?),
                    Some('>') => break,
                    Some(c) => tag.push(c),
                }
            }
            tags.push(tag);
        }

        match self.peek() {
            None | Some('/') | Some('{') | Some('$') => Ok(Reading { lemma, tags }),
            Some(c) => Err(TreeParseError::Unexpected {
                found: c,
                offset: self.pos,
            }),
        }
    }

    fn children(&mut self) -> Result<Vec<Lu>, TreeParseError> {
        let start = self.pos;
        self.bump();
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(TreeParseError::UnterminatedChildren { offset: start }),
                Some('}') => {
                    self.bump();
                    return Ok(children);
                }
                Some('^') => children.push(self.unit()?),
                Some(c) => {
                    return Err(TreeParseError::Unexpected {
                        found: c,
                        offset: self.pos,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leaf_with_tags() {
        let lu = Lu::parse("^dog<n><sg>$").unwrap();
        assert_eq!(lu.lemma, "dog");
        assert_eq!(lu.tags, vec!["n", "sg"]);
        assert!(lu.is_leaf());
        assert_eq!(lu.primary_tag(), Some("n"));
    }

    #[test]
    fn parses_nested_children() {
        let lu = Lu::parse("^NP<NP>{^the<det>$ ^big<adj>$ ^dog<n>$}$").unwrap();
        assert_eq!(lu.lemma, "NP");
        assert_eq!(lu.children.len(), 3);
        assert_eq!(lu.children[2].lemma, "dog");
        assert_eq!(lu.len(), 4);
    }

    #[test]
    fn parses_target_segment() {
        let lu = Lu::parse("^dog<n><sg>/perro<n><m><sg>$").unwrap();
        assert_eq!(lu.lemma, "dog");
        let target = lu.target.as_ref().unwrap();
        assert_eq!(target.lemma, "perro");
        assert_eq!(target.tags, vec!["n", "m", "sg"]);
    }

    #[test]
    fn backslash_suppresses_syntax() {
        let lu = Lu::parse(r"^a\<b\$c\{<n>$").unwrap();
        assert_eq!(lu.lemma, "a<b$c{");
        assert_eq!(lu.tags, vec!["n"]);
        assert_eq!(lu.to_string(), r"^a\<b\$c\{<n>$");
    }

    #[test]
    fn canonical_string_round_trips() {
        let inputs = [
            "^dog<n><sg>$",
            "^S<S>{^NP<NP>{^the<det><def>$ ^dog<n><sg>$}$ ^sleep<vblex><pres>$}$",
            "^de la<pr>$",
            "^<sent>$",
            "^dog<n>/perro<n><m>{^a<b>$}$",
        ];
        for input in inputs {
            let lu = Lu::parse(input).unwrap();
            assert_eq!(lu.to_string(), input);
        }
    }

    #[test]
    fn iterator_is_preorder_and_includes_self() {
        let lu = Lu::parse("^a<x>{^b<x>{^c<x>$ ^d<x>$}$ ^e<x>$}$").unwrap();
        let lemmas: Vec<&str> = lu.iter().map(|n| n.lemma.as_str()).collect();
        assert_eq!(lemmas, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn rejects_missing_delimiters() {
        assert_eq!(
            Lu::parse("dog<n>$"),
            Err(TreeParseError::MissingOpen { offset: 0 })
        );
        assert!(matches!(
            Lu::parse("^dog<n>"),
            Err(TreeParseError::MissingClose { .. })
        ));
    }

    #[test]
    fn rejects_unterminated_blocks() {
        assert_eq!(
            Lu::parse("^dog<n$"),
            Err(TreeParseError::UnterminatedTag { offset: 4 })
        );
        assert_eq!(
            Lu::parse("^NP<NP>{^dog<n>$"),
            Err(TreeParseError::UnterminatedChildren { offset: 7 })
        );
        assert_eq!(Lu::parse(r"^dog\"), Err(TreeParseError::DanglingEscape));
    }

    #[test]
    fn rejects_trailing_input() {
        assert!(matches!(
            Lu::parse("^a<n>$ ^b<n>$"),
            Err(TreeParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn parses_sequences() {
        let units = Lu::parse_sequence(" ^a<n>$ ^b<v>{^c<x>$}$ ").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].children[0].lemma, "c");
        assert_eq!(Lu::parse_sequence("   "), Err(TreeParseError::Empty));
    }
}
