//! Whitespace-separated node notation shared by tree-aligner input and output.
//!
//! Tokens are `L<n>`/`R<n>` (a node with a side marker), bare integers,
//! and the list delimiters `[ ]` (children) and `( )` (alignment).

use crate::error::AlignmentError;
use crate::types::{NodeId, Side};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([LR])?(\d+)|([\[\]()])").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Index(usize),
    Marked(Side, usize),
    Open(char),
    Close(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Index(n) => write!(f, "{n}"),
            Token::Marked(side, n) => write!(f, "{}{n}", side.marker()),
            Token::Open(c) | Token::Close(c) => write!(f, "{c}"),
        }
    }
}

/// One structural element of a notation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Bare index: selects an existing node (or the leading node count)
    Select(NodeId),
    /// Side-marked index: declares a node on that side
    Introduce(Side, NodeId),
    Children(Vec<NodeId>),
    Alignment(Vec<NodeId>),
}

pub fn tokenize(line: &str) -> Result<Vec<Token>, AlignmentError> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in TOKEN_REGEX.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        check_gap(&line[last..whole.start()])?;
        last = whole.end();

        if let Some(delim) = caps.get(3) {
            let c = delim.as_str().chars().next().unwrap_or('(');
            tokens.push(match c {
                '[' | '(' => Token::Open(c),
                _ => Token::Close(c),
            });
            continue;
        }

        let digits = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let value: usize = digits.parse().map_err(|_| AlignmentError::BadToken {
            token: whole.as_str().to_string(),
        })?;
        let marker = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Side::from_marker);
        tokens.push(match marker {
            Some(side) => Token::Marked(side, value),
            None => Token::Index(value),
        });
    }
    check_gap(&line[last..])?;
    Ok(tokens)
}

fn check_gap(gap: &str) -> Result<(), AlignmentError> {
    match gap.split_whitespace().next() {
        Some(token) => Err(AlignmentError::BadToken {
            token: token.to_string(),
        }),
        None => Ok(()),
    }
}

fn closing(open: char) -> char {
    if open == '[' {
        ']'
    } else {
        ')'
    }
}

fn opening(close: char) -> char {
    if close == ']' {
        '['
    } else {
        '('
    }
}

pub fn parse(line: &str) -> Result<Vec<Item>, AlignmentError> {
    let mut tokens = tokenize(line)?.into_iter();
    let mut items = Vec::new();
    while let Some(token) = tokens.next() {
        match token {
            Token::Index(n) => items.push(Item::Select(n)),
            Token::Marked(side, n) => items.push(Item::Introduce(side, n)),
            Token::Close(c) => return Err(AlignmentError::Unbalanced { open: opening(c) }),
            Token::Open(open) => {
                let close = closing(open);
                let mut list = Vec::new();
                loop {
                    match tokens.next() {
                        Some(Token::Index(n)) => list.push(n),
                        Some(Token::Close(c)) if c == close => break,
                        Some(other) => {
                            return Err(AlignmentError::BadToken {
                                token: other.to_string(),
                            })
                        }
                        None => return Err(AlignmentError::Unbalanced { open }),
                    }
                }
                items.push(if open == '[' {
                    Item::Children(list)
                } else {
                    Item::Alignment(list)
                });
            }
        }
    }
    Ok(items)
}

pub fn render(items: &[Item]) -> String {
    fn list(out: &mut Vec<String>, open: &str, ids: &[NodeId], close: &str) {
        out.push(open.to_string());
        out.extend(ids.iter().map(|id| id.to_string()));
        out.push(close.to_string());
    }

    let mut out = Vec::new();
    for item in items {
        match item {
            Item::Select(n) => out.push(n.to_string()),
            Item::Introduce(side, n) => out.push(format!("{}{n}", side.marker())),
            Item::Children(ids) => list(&mut out, "[", ids, "]"),
            Item::Alignment(ids) => list(&mut out, "(", ids, ")"),
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_compact_and_spaced_forms() {
        let compact = tokenize("L8[1 2](9)").unwrap();
        let spaced = tokenize(" L8 [ 1 2 ] ( 9 ) ").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(
            compact,
            vec![
                Token::Marked(Side::Left, 8),
                Token::Open('['),
                Token::Index(1),
                Token::Index(2),
                Token::Close(']'),
                Token::Open('('),
                Token::Index(9),
                Token::Close(')'),
            ]
        );
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert_eq!(
            tokenize("0 ( x3 )"),
            Err(AlignmentError::BadToken {
                token: "x".to_string()
            })
        );
        assert!(tokenize("0 ( 3 ) ;").is_err());
    }

    #[test]
    fn parses_items() {
        let items = parse("R9 [ 6 7 ] 9 ( 8 ) 0 ( )").unwrap();
        assert_eq!(
            items,
            vec![
                Item::Introduce(Side::Right, 9),
                Item::Children(vec![6, 7]),
                Item::Select(9),
                Item::Alignment(vec![8]),
                Item::Select(0),
                Item::Alignment(vec![]),
            ]
        );
    }

    #[test]
    fn reports_unbalanced_lists() {
        assert_eq!(
            parse("0 ( 3"),
            Err(AlignmentError::Unbalanced { open: '(' })
        );
        assert_eq!(parse("0 ]"), Err(AlignmentError::Unbalanced { open: '[' }));
        assert!(matches!(
            parse("0 ( 3 ]"),
            Err(AlignmentError::BadToken { .. })
        ));
    }

    #[test]
    fn render_matches_parse() {
        let line = "L9 [ 1 2 ] 9 ( 6 )";
        assert_eq!(render(&parse(line).unwrap()), line);
        assert_eq!(render(&[Item::Alignment(vec![])]), "( )");
    }
}
