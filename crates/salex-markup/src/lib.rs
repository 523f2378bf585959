//! Inline markup of Salex text fields.
//!
//! A field is a sequence of literal text runs and bracketed elements
//! `[tag content]`, where `tag` is one of a fixed vocabulary ([`Tag`]) and
//! `content` is markup again. `\[`, `\]` and `\\` escape the bracket and
//! backslash characters. Elements may be empty (`[i ]`), and an empty element
//! still produces a node and a fragment.
//!
//! ```rust
//! use salex_markup::{Tag, parse};
//!
//! let markup = parse("hi [rp bla [i again]] [sub more]").unwrap();
//! let frags: Vec<_> = markup.fragments().collect();
//! assert_eq!(frags[2].text, "again");
//! assert_eq!(frags[2].tags, vec![Tag::RegisterPlain, Tag::Italic]);
//! assert_eq!(markup.plain_text(), "hi bla again more");
//! assert_eq!(markup.to_string(), "hi [rp bla [i again]] [sub more]");
//! ```

use std::fmt;
use std::slice;

use thiserror::Error;

/// Element names accepted inside `[` … `]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Tag {
    Bold,
    Italic,
    Underline,
    SmallCaps,
    /// `r`: register marker, rendered in plain roman.
    Register,
    /// `rp`: register marker, rendered small.
    RegisterPlain,
    Superscript,
    Subscript,
    /// `källa`: source citation.
    Source,
}

impl Tag {
    pub const ALL: [Tag; 9] = [
        Tag::Bold,
        Tag::Italic,
        Tag::Underline,
        Tag::SmallCaps,
        Tag::Register,
        Tag::RegisterPlain,
        Tag::Superscript,
        Tag::Subscript,
        Tag::Source,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tag::Bold => "b",
            Tag::Italic => "i",
            Tag::Underline => "u",
            Tag::SmallCaps => "caps",
            Tag::Register => "r",
            Tag::RegisterPlain => "rp",
            Tag::Superscript => "sup",
            Tag::Subscript => "sub",
            Tag::Source => "källa",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Malformed markup. Offsets are byte positions in the input.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SyntaxError {
    #[error("unknown tag `{name}` at byte {offset}")]
    UnknownTag { name: String, offset: usize },
    #[error("tag `{name}` must be followed by a space (byte {offset})")]
    MissingSpace { name: String, offset: usize },
    #[error("`]` at byte {offset} closes nothing")]
    UnexpectedClose { offset: usize },
    #[error("`[` at byte {offset} is never closed")]
    Unclosed { offset: usize },
    #[error("dangling `\\` at end of input")]
    DanglingEscape,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Text(String),
    Tagged { tag: Tag, children: Vec<Node> },
}

/// Parsed markup: an ordered sequence of nodes.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Markup {
    nodes: Vec<Node>,
}

impl Markup {
    /// Wrap text that is already plain, without interpreting brackets.
    pub fn from_plain(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            nodes: vec![Node::Text(text.to_string())],
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Text runs annotated with their enclosing tags, outer to inner.
    ///
    /// Lazy; call again to restart.
    pub fn fragments(&self) -> Fragments<'_> {
        Fragments {
            stack: vec![self.nodes.iter()],
            tags: Vec::new(),
        }
    }

    /// All text with the tags dropped.
    pub fn plain_text(&self) -> String {
        self.fragments().map(|f| f.text).collect()
    }

    /// Serialize back to markup. Inverse of [`parse`] up to escaping.
    pub fn to_markup_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(&self.nodes, f)
    }
}

fn write_nodes(nodes: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for node in nodes {
        match node {
            Node::Text(text) => f.write_str(&escape(text))?,
            Node::Tagged { tag, children } => {
                write!(f, "[{tag} ")?;
                write_nodes(children, f)?;
                f.write_str("]")?;
            }
        }
    }
    Ok(())
}

/// A text run and the tags around it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub tags: Vec<Tag>,
}

impl Fragment<'_> {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Iterator returned by [`Markup::fragments`].
#[derive(Clone, Debug)]
pub struct Fragments<'a> {
    stack: Vec<slice::Iter<'a, Node>>,
    // One tag per stack frame below the root.
    tags: Vec<Tag>,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment<'a>;

    fn next(&mut self) -> Option<Fragment<'a>> {
        loop {
            let frame = self.stack.last_mut()?;
            match frame.next() {
                None => {
                    self.stack.pop();
                    self.tags.pop();
                }
                Some(Node::Text(text)) => {
                    return Some(Fragment {
                        text,
                        tags: self.tags.clone(),
                    });
                }
                Some(Node::Tagged { tag, children }) if children.is_empty() => {
                    let mut tags = self.tags.clone();
                    tags.push(*tag);
                    return Some(Fragment { text: "", tags });
                }
                Some(Node::Tagged { tag, children }) => {
                    self.tags.push(*tag);
                    self.stack.push(children.iter());
                }
            }
        }
    }
}

/// Parse a markup string.
pub fn parse(text: &str) -> Result<Markup, SyntaxError> {
    let mut parser = Parser { src: text, pos: 0 };
    let nodes = parser.sequence(None)?;
    Ok(Markup { nodes })
}

/// Parse and return only the text.
pub fn strip(text: &str) -> Result<String, SyntaxError> {
    parse(text).map(|m| m.plain_text())
}

/// Escape brackets and backslashes so `text` parses as a single text run.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    /// Parse until end of input (top level) or the `]` closing `open`.
    fn sequence(&mut self, open: Option<usize>) -> Result<Vec<Node>, SyntaxError> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                if let Some(offset) = open {
                    return Err(SyntaxError::Unclosed { offset });
                }
                flush(&mut text, &mut nodes);
                return Ok(nodes);
            };
            match c {
                '\\' => {
                    self.bump(c);
                    let escaped = self.peek().ok_or(SyntaxError::DanglingEscape)?;
                    self.bump(escaped);
                    // Only brackets and backslash are unescaped; other pairs stay verbatim.
                    if !matches!(escaped, '[' | ']' | '\\') {
                        text.push('\\');
                    }
                    text.push(escaped);
                }
                '[' => {
                    flush(&mut text, &mut nodes);
                    let start = self.pos;
                    self.bump(c);
                    let tag = self.tag()?;
                    let children = self.sequence(Some(start))?;
                    nodes.push(Node::Tagged { tag, children });
                }
                ']' => {
                    if open.is_none() {
                        return Err(SyntaxError::UnexpectedClose { offset: self.pos });
                    }
                    self.bump(c);
                    flush(&mut text, &mut nodes);
                    return Ok(nodes);
                }
                other => {
                    text.push(other);
                    self.bump(other);
                }
            }
        }
    }

    fn tag(&mut self) -> Result<Tag, SyntaxError> {
        let rest = &self.src[self.pos..];
        let end = rest
            .find(|c: char| matches!(c, ' ' | '[' | ']' | '\\'))
            .unwrap_or(rest.len());
        let name = &rest[..end];
        let tag = Tag::from_name(name).ok_or_else(|| SyntaxError::UnknownTag {
            name: name.to_string(),
            offset: self.pos,
        })?;
        if !rest[end..].starts_with(' ') {
            return Err(SyntaxError::MissingSpace {
                name: name.to_string(),
                offset: self.pos + end,
            });
        }
        self.pos += end + 1;
        Ok(tag)
    }
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn parses_nested_elements() {
        let markup = parse("hello [i this is] [b a simple [sup test]]").unwrap();
        assert_eq!(
            markup.nodes(),
            &[
                text("hello "),
                Node::Tagged {
                    tag: Tag::Italic,
                    children: vec![text("this is")],
                },
                text(" "),
                Node::Tagged {
                    tag: Tag::Bold,
                    children: vec![
                        text("a simple "),
                        Node::Tagged {
                            tag: Tag::Superscript,
                            children: vec![text("test")],
                        },
                    ],
                },
            ]
        );
    }

    #[test]
    fn fragments_carry_enclosing_tags() {
        let markup = parse("hi [rp bla [i again]] [sub more]").unwrap();
        let frags: Vec<(&str, Vec<Tag>)> = markup.fragments().map(|f| (f.text, f.tags)).collect();
        assert_eq!(
            frags,
            vec![
                ("hi ", vec![]),
                ("bla ", vec![Tag::RegisterPlain]),
                ("again", vec![Tag::RegisterPlain, Tag::Italic]),
                (" ", vec![]),
                ("more", vec![Tag::Subscript]),
            ]
        );
        assert_eq!(markup.fragments().count(), 5);
    }

    #[test]
    fn empty_elements_are_kept() {
        let markup = parse("a[i ]b").unwrap();
        assert_eq!(markup.nodes().len(), 3);
        let frags: Vec<_> = markup.fragments().collect();
        assert_eq!(frags[1].text, "");
        assert_eq!(frags[1].tags, vec![Tag::Italic]);
        assert_eq!(markup.to_string(), "a[i ]b");
    }

    #[test]
    fn unescapes_brackets_and_backslash_only() {
        let markup = parse(r"uttal \[ˈkat:\] och \\ samt \n").unwrap();
        assert_eq!(markup.plain_text(), r"uttal [ˈkat:] och \ samt \n");
        assert_eq!(markup.to_string(), r"uttal \[ˈkat:\] och \\ samt \\n");
        assert_eq!(parse(&markup.to_string()).unwrap(), markup);
    }

    #[test]
    fn accepts_non_ascii_tag_names() {
        let markup = parse("[källa SAOL 14]").unwrap();
        assert_eq!(markup.fragments().next().unwrap().tags, vec![Tag::Source]);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            parse("a [x b]"),
            Err(SyntaxError::UnknownTag {
                name: "x".into(),
                offset: 3
            })
        );
        assert!(matches!(parse("[bold x]"), Err(SyntaxError::UnknownTag { .. })));
        assert!(matches!(parse("[i]"), Err(SyntaxError::MissingSpace { .. })));
        assert_eq!(parse("a]"), Err(SyntaxError::UnexpectedClose { offset: 1 }));
        assert_eq!(parse("x [i y"), Err(SyntaxError::Unclosed { offset: 2 }));
        assert_eq!(parse("x\\"), Err(SyntaxError::DanglingEscape));
    }

    #[test]
    fn strip_and_escape() {
        assert_eq!(strip("[b fet] text").unwrap(), "fet text");
        assert_eq!(escape("a[b]\\"), "a\\[b\\]\\\\");
        assert_eq!(Markup::from_plain("").nodes().len(), 0);
    }

    fn markup_string() -> impl Strategy<Value = String> {
        let leaf = "[a-zåäö ,.()\\[\\]\\\\]{0,6}".prop_map(|s| escape(&s));
        leaf.prop_recursive(4, 32, 4, |inner| {
            let tag = prop::sample::select(Tag::ALL.to_vec());
            prop::collection::vec(
                prop_oneof![
                    inner.clone(),
                    (tag, inner).prop_map(|(t, body)| format!("[{t} {body}]")),
                ],
                0..4,
            )
            .prop_map(|parts| parts.concat())
        })
    }

    proptest! {
        #[test]
        fn serialization_round_trips(source in markup_string()) {
            let parsed = parse(&source).unwrap();
            let reparsed = parse(&parsed.to_markup_text()).unwrap();
            prop_assert_eq!(reparsed, parsed);
        }

        #[test]
        fn stripping_is_idempotent(source in markup_string()) {
            let plain = strip(&source).unwrap();
            prop_assert_eq!(Markup::from_plain(&plain).plain_text(), plain.clone());
            prop_assert_eq!(strip(&escape(&plain)).unwrap(), plain);
        }
    }
}
