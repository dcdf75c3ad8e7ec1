//! Regex subset translation for `pattern` and `patternProperties`.
//!
//! The supported subset (everything else is a structured rejection):
//! literal characters, `.`, character classes with ranges and negation,
//! the escapes `\d \D \w \W \s \S`, control escapes (`\n \r \t \f \v`),
//! `\xHH`/`\uHHHH`, punctuation escapes, grouping `(...)` / `(?:...)`,
//! alternation `|`, the quantifiers `* + ?` (lazy variants accepted, the
//! language is identical), bounded repetition `{m}` / `{m,n}` / `{m,}`,
//! and `^`/`$` anchors at the pattern edges. Back-references, lookaround,
//! word boundaries, `\p{...}` classes, and mid-pattern anchors are
//! rejected.
//!
//! The solver alphabet is printable ASCII (0x20–0x7E); `.` and negated
//! classes are computed as explicit range unions against that alphabet.
//! JSON Schema `pattern` has search semantics, so unanchored sides are
//! padded with `Σ*` before translation.

use miette::Diagnostic;
use std::collections::BTreeSet;
use thiserror::Error;
use z3::ast::Regexp;

const ALPHABET_LO: char = ' ';
const ALPHABET_HI: char = '~';

/// Cap on the node count after bounded-repetition expansion.
const MAX_EXPANDED_NODES: usize = 256;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum RegexError {
    #[error("cannot parse pattern `{pattern}` at offset {position}: {message}")]
    #[diagnostic(code(jsonsub::regex::parse))]
    Parse {
        pattern: String,
        position: usize,
        message: String,
    },

    #[error("pattern `{pattern}` uses an unsupported feature: {feature}")]
    #[diagnostic(
        code(jsonsub::regex::unsupported),
        help("back-references, lookaround, and unicode property classes are outside the supported subset")
    )]
    Unsupported { pattern: String, feature: String },

    #[error("pattern `{pattern}` expands past the repetition budget ({limit} nodes)")]
    #[diagnostic(code(jsonsub::regex::too_large))]
    TooLarge { pattern: String, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Literal(String),
    Class(Vec<(char, char)>),
    AnyChar,
    Concat(Vec<Node>),
    Alternate(Vec<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
    Optional(Box<Node>),
    Repeat {
        inner: Box<Node>,
        min: u32,
        max: Option<u32>,
    },
}

/// A parsed pattern, ready for Z3 translation and for static matching
/// against concrete keys.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    node: Node,
    anchored_start: bool,
    anchored_end: bool,
}

pub fn parse(pattern: &str) -> Result<CompiledPattern, RegexError> {
    let chars: Vec<char> = pattern.chars().collect();
    let anchored_start = chars.first() == Some(&'^');
    let mut body_start = usize::from(anchored_start);
    let mut body_end = chars.len();
    let anchored_end = body_end > body_start
        && chars[body_end - 1] == '$'
        && escape_parity_even(&chars[body_start..body_end - 1]);
    if anchored_end {
        body_end -= 1;
    }
    // Guard against `^` consumed above being the whole pattern.
    if body_start > body_end {
        body_start = body_end;
    }

    let mut parser = Parser {
        pattern,
        chars: &chars[body_start..body_end],
        pos: 0,
        offset: body_start,
    };
    let node = parser.alternation()?;
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unbalanced `)`"));
    }
    Ok(CompiledPattern {
        source: pattern.to_string(),
        node,
        anchored_start,
        anchored_end,
    })
}

// Even number of trailing backslashes means the following char is unescaped.
fn escape_parity_even(prefix: &[char]) -> bool {
    prefix.iter().rev().take_while(|&&c| c == '\\').count() % 2 == 0
}

struct Parser<'a> {
    pattern: &'a str,
    chars: &'a [char],
    pos: usize,
    offset: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> RegexError {
        RegexError::Parse {
            pattern: self.pattern.to_string(),
            position: self.offset + self.pos,
            message: message.into(),
        }
    }

    fn unsupported(&self, feature: impl Into<String>) -> RegexError {
        RegexError::Unsupported {
            pattern: self.pattern.to_string(),
            feature: feature.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn alternation(&mut self) -> Result<Node, RegexError> {
        let mut branches = vec![self.concat()?];
        while self.peek() == Some('|') {
            self.bump();
            branches.push(self.concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().expect("single branch"))
        } else {
            Ok(Node::Alternate(branches))
        }
    }

    fn concat(&mut self) -> Result<Node, RegexError> {
        let mut parts: Vec<Node> = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.atom()?;
            let quantified = self.quantifier(atom)?;
            match (&quantified, parts.last_mut()) {
                (Node::Literal(next), Some(Node::Literal(prev))) => prev.push_str(next),
                _ => parts.push(quantified),
            }
        }
        match parts.len() {
            0 => Ok(Node::Literal(String::new())),
            1 => Ok(parts.pop().expect("single part")),
            _ => Ok(Node::Concat(parts)),
        }
    }

    fn atom(&mut self) -> Result<Node, RegexError> {
        match self.bump() {
            Some('(') => {
                if self.peek() == Some('?') {
                    self.bump();
                    match self.peek() {
                        Some(':') => {
                            self.bump();
                        }
                        Some('=') | Some('!') => return Err(self.unsupported("lookahead")),
                        Some('<') => return Err(self.unsupported("lookbehind or named group")),
                        _ => return Err(self.error("malformed group modifier")),
                    }
                }
                let inner = self.alternation()?;
                if self.bump() != Some(')') {
                    return Err(self.error("unterminated group"));
                }
                Ok(inner)
            }
            Some('[') => self.class(),
            Some('\\') => self.escape(false),
            Some('.') => Ok(Node::AnyChar),
            Some('^') | Some('$') => Err(self.unsupported("anchor inside pattern")),
            Some(c @ ('*' | '+' | '?')) => {
                Err(self.error(format!("quantifier `{c}` with nothing to repeat")))
            }
            Some(c) => Ok(Node::Literal(c.to_string())),
            None => Err(self.error("unexpected end of pattern")),
        }
    }

    fn quantifier(&mut self, atom: Node) -> Result<Node, RegexError> {
        let node = match self.peek() {
            Some('*') => {
                self.bump();
                Node::Star(Box::new(atom))
            }
            Some('+') => {
                self.bump();
                Node::Plus(Box::new(atom))
            }
            Some('?') => {
                self.bump();
                Node::Optional(Box::new(atom))
            }
            Some('{') => match self.try_braces()? {
                Some((min, max)) => {
                    if let Some(max) = max {
                        if max < min {
                            return Err(self.error("repetition maximum below minimum"));
                        }
                    }
                    Node::Repeat {
                        inner: Box::new(atom),
                        min,
                        max,
                    }
                }
                // Not a quantifier; the brace is an ordinary character.
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        // Lazy quantifiers match the same language.
        if self.peek() == Some('?') {
            self.bump();
        }
        Ok(node)
    }

    /// Parse `{m}`, `{m,n}`, `{m,}` after the opening brace has been seen.
    /// Returns `None` (position restored) when the braces are not a valid
    /// quantifier, in which case `{` is treated as a literal.
    fn try_braces(&mut self) -> Result<Option<(u32, Option<u32>)>, RegexError> {
        let saved = self.pos;
        self.bump(); // consume '{'
        let min = self.digits();
        let Some(min) = min else {
            self.pos = saved;
            return Ok(None);
        };
        match self.peek() {
            Some('}') => {
                self.bump();
                Ok(Some((min, Some(min))))
            }
            Some(',') => {
                self.bump();
                let max = self.digits();
                if self.peek() == Some('}') {
                    self.bump();
                    Ok(Some((min, max)))
                } else {
                    self.pos = saved;
                    Ok(None)
                }
            }
            _ => {
                self.pos = saved;
                Ok(None)
            }
        }
    }

    fn digits(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == start {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }

    fn class(&mut self) -> Result<Node, RegexError> {
        let negated = self.peek() == Some('^');
        if negated {
            self.bump();
        }
        let mut ranges: Vec<(char, char)> = Vec::new();
        loop {
            let c = match self.bump() {
                Some(']') if !ranges.is_empty() || negated => break,
                Some(']') => {
                    // leading `]` is a literal member
                    ']'
                }
                Some('\\') => match self.escape(true)? {
                    Node::Literal(s) => s.chars().next().expect("escape yields one char"),
                    Node::Class(mut escaped) => {
                        ranges.append(&mut escaped);
                        continue;
                    }
                    _ => return Err(self.error("unsupported escape in class")),
                },
                Some(c) => c,
                None => return Err(self.error("unterminated character class")),
            };
            if self.peek() == Some('-')
                && self.chars.get(self.pos + 1).is_some_and(|&n| n != ']')
            {
                self.bump();
                let hi = match self.bump() {
                    Some('\\') => match self.escape(true)? {
                        Node::Literal(s) => s.chars().next().expect("escape yields one char"),
                        _ => return Err(self.error("class escape cannot end a range")),
                    },
                    Some(hi) => hi,
                    None => return Err(self.error("unterminated character class")),
                };
                if hi < c {
                    return Err(self.error("character range out of order"));
                }
                ranges.push((c, hi));
            } else {
                ranges.push((c, c));
            }
        }
        let ranges = if negated {
            complement_ranges(&ranges)
        } else {
            ranges
        };
        if ranges.is_empty() {
            return Err(self.unsupported("empty character class"));
        }
        Ok(Node::Class(ranges))
    }

    fn escape(&mut self, in_class: bool) -> Result<Node, RegexError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("dangling escape at end of pattern"))?;
        let class = |ranges: &[(char, char)]| Node::Class(ranges.to_vec());
        match c {
            'd' => Ok(class(&[('0', '9')])),
            'D' => Ok(Node::Class(complement_ranges(&[('0', '9')]))),
            'w' => Ok(class(&[('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')])),
            'W' => Ok(Node::Class(complement_ranges(&[
                ('0', '9'),
                ('A', 'Z'),
                ('_', '_'),
                ('a', 'z'),
            ]))),
            's' => Ok(class(&[
                ('\t', '\t'),
                ('\n', '\n'),
                ('\u{b}', '\u{c}'),
                ('\r', '\r'),
                (' ', ' '),
            ])),
            'S' => Ok(Node::Class(complement_ranges(&[(' ', ' ')]))),
            'n' => Ok(Node::Literal("\n".into())),
            'r' => Ok(Node::Literal("\r".into())),
            't' => Ok(Node::Literal("\t".into())),
            'f' => Ok(Node::Literal("\u{c}".into())),
            'v' => Ok(Node::Literal("\u{b}".into())),
            '0' => Ok(Node::Literal("\0".into())),
            'x' => self.hex_escape(2),
            'u' => self.hex_escape(4),
            '1'..='9' => Err(self.unsupported("back-reference")),
            'b' | 'B' if !in_class => Err(self.unsupported("word boundary")),
            'b' if in_class => Ok(Node::Literal("\u{8}".into())),
            'p' | 'P' => Err(self.unsupported("unicode property class")),
            'c' => Err(self.unsupported("control escape")),
            'k' => Err(self.unsupported("named back-reference")),
            other => Ok(Node::Literal(other.to_string())),
        }
    }

    fn hex_escape(&mut self, width: usize) -> Result<Node, RegexError> {
        let mut code = 0u32;
        for _ in 0..width {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("malformed hex escape"))?;
            code = code * 16 + d;
        }
        let c = char::from_u32(code).ok_or_else(|| self.error("hex escape out of range"))?;
        Ok(Node::Literal(c.to_string()))
    }
}

/// Complement of a range union within the printable-ASCII alphabet.
fn complement_ranges(ranges: &[(char, char)]) -> Vec<(char, char)> {
    let mut sorted: Vec<(char, char)> = ranges.to_vec();
    sorted.sort();
    let mut out = Vec::new();
    let mut next = ALPHABET_LO;
    for &(lo, hi) in &sorted {
        if lo > next {
            let upper = char_before(lo).min(ALPHABET_HI);
            if next <= upper {
                out.push((next, upper));
            }
        }
        if hi >= next {
            next = match char_after(hi) {
                Some(c) => c,
                None => return out,
            };
        }
        if next > ALPHABET_HI {
            return out;
        }
    }
    if next <= ALPHABET_HI {
        out.push((next, ALPHABET_HI));
    }
    out
}

fn char_before(c: char) -> char {
    char::from_u32(c as u32 - 1).unwrap_or(c)
}

fn char_after(c: char) -> Option<char> {
    char::from_u32(c as u32 + 1)
}

impl CompiledPattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Translate into a Z3 regex denoting the *search* semantics of the
    /// pattern: unanchored sides are padded with `Σ*`.
    pub fn to_regexp(&self) -> Result<Regexp, RegexError> {
        let budget = self.expanded_size();
        if budget > MAX_EXPANDED_NODES {
            return Err(RegexError::TooLarge {
                pattern: self.source.clone(),
                limit: MAX_EXPANDED_NODES,
            });
        }
        let core = translate(&self.node);
        let pad = any_char().star();
        Ok(match (self.anchored_start, self.anchored_end) {
            (true, true) => core,
            (true, false) => Regexp::concat(&[&core, &pad]),
            (false, true) => Regexp::concat(&[&pad, &core]),
            (false, false) => Regexp::concat(&[&pad, &core, &pad]),
        })
    }

    /// Static search match against a concrete string, mirroring the Z3
    /// translation. Used for `patternProperties` over the sealed key
    /// universe and to validate probe exemplars.
    pub fn matches(&self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        let starts: Vec<usize> = if self.anchored_start {
            vec![0]
        } else {
            (0..=chars.len()).collect()
        };
        for start in starts {
            let ends = match_ends(&self.node, &chars, start);
            if self.anchored_end {
                if ends.contains(&chars.len()) {
                    return true;
                }
            } else if !ends.is_empty() {
                return true;
            }
        }
        false
    }

    /// A shortest-ish concrete string matching the pattern, when one can be
    /// synthesized structurally. Returns `None` for patterns whose minimal
    /// form is the empty string.
    pub fn exemplar(&self) -> Option<String> {
        let candidate = exemplar_of(&self.node)?;
        if candidate.is_empty() || !self.matches(&candidate) {
            return None;
        }
        Some(candidate)
    }

    fn expanded_size(&self) -> usize {
        expanded_size(&self.node)
    }
}

fn expanded_size(node: &Node) -> usize {
    match node {
        Node::Literal(_) | Node::Class(_) | Node::AnyChar => 1,
        Node::Concat(parts) | Node::Alternate(parts) => {
            parts.iter().map(expanded_size).sum::<usize>() + 1
        }
        Node::Star(inner) | Node::Plus(inner) | Node::Optional(inner) => {
            expanded_size(inner) + 1
        }
        Node::Repeat { inner, min, max } => {
            let copies = max.unwrap_or(min + 1).max(*min) as usize;
            expanded_size(inner).saturating_mul(copies.max(1)) + 1
        }
    }
}

fn any_char() -> Regexp {
    Regexp::range(ALPHABET_LO, ALPHABET_HI)
}

fn translate(node: &Node) -> Regexp {
    match node {
        Node::Literal(s) => Regexp::literal(s),
        Node::Class(ranges) => {
            let parts: Vec<Regexp> = ranges
                .iter()
                .map(|&(lo, hi)| Regexp::range(lo, hi))
                .collect();
            if parts.len() == 1 {
                parts.into_iter().next().expect("single range")
            } else {
                let refs: Vec<&Regexp> = parts.iter().collect();
                Regexp::union(&refs)
            }
        }
        Node::AnyChar => any_char(),
        Node::Concat(parts) => {
            let translated: Vec<Regexp> = parts.iter().map(translate).collect();
            let refs: Vec<&Regexp> = translated.iter().collect();
            Regexp::concat(&refs)
        }
        Node::Alternate(parts) => {
            let translated: Vec<Regexp> = parts.iter().map(translate).collect();
            let refs: Vec<&Regexp> = translated.iter().collect();
            Regexp::union(&refs)
        }
        Node::Star(inner) => translate(inner).star(),
        Node::Plus(inner) => translate(inner).plus(),
        Node::Optional(inner) => translate(inner).option(),
        Node::Repeat { inner, min, max } => {
            let base = translate(inner);
            let mut parts: Vec<Regexp> = Vec::new();
            for _ in 0..*min {
                parts.push(base.clone());
            }
            match max {
                Some(max) => {
                    for _ in *min..*max {
                        parts.push(base.option());
                    }
                }
                None => parts.push(base.star()),
            }
            if parts.is_empty() {
                Regexp::literal("")
            } else {
                let refs: Vec<&Regexp> = parts.iter().collect();
                Regexp::concat(&refs)
            }
        }
    }
}

fn match_ends(node: &Node, s: &[char], start: usize) -> BTreeSet<usize> {
    let mut ends = BTreeSet::new();
    match node {
        Node::Literal(lit) => {
            let lit: Vec<char> = lit.chars().collect();
            if s.len() >= start + lit.len() && s[start..start + lit.len()] == lit[..] {
                ends.insert(start + lit.len());
            }
        }
        Node::Class(ranges) => {
            if let Some(&c) = s.get(start) {
                if ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) {
                    ends.insert(start + 1);
                }
            }
        }
        Node::AnyChar => {
            if start < s.len() {
                ends.insert(start + 1);
            }
        }
        Node::Concat(parts) => {
            let mut positions = BTreeSet::from([start]);
            for part in parts {
                let mut next = BTreeSet::new();
                for &p in &positions {
                    next.extend(match_ends(part, s, p));
                }
                positions = next;
                if positions.is_empty() {
                    break;
                }
            }
            ends = positions;
        }
        Node::Alternate(parts) => {
            for part in parts {
                ends.extend(match_ends(part, s, start));
            }
        }
        Node::Star(inner) => {
            ends = closure(inner, s, BTreeSet::from([start]));
        }
        Node::Plus(inner) => {
            let first = match_ends(inner, s, start);
            ends = closure(inner, s, first);
        }
        Node::Optional(inner) => {
            ends.insert(start);
            ends.extend(match_ends(inner, s, start));
        }
        Node::Repeat { inner, min, max } => {
            let mut positions = BTreeSet::from([start]);
            for _ in 0..*min {
                let mut next = BTreeSet::new();
                for &p in &positions {
                    next.extend(match_ends(inner, s, p));
                }
                positions = next;
                if positions.is_empty() {
                    break;
                }
            }
            match max {
                Some(max) => {
                    ends.extend(positions.iter().copied());
                    for _ in *min..*max {
                        let mut next = BTreeSet::new();
                        for &p in &positions {
                            next.extend(match_ends(inner, s, p));
                        }
                        if next.is_empty() {
                            break;
                        }
                        ends.extend(next.iter().copied());
                        positions = next;
                    }
                }
                None => ends = closure(inner, s, positions),
            }
        }
    }
    ends
}

// Reflexive-transitive closure of one inner step, for `*`-shaped nodes.
fn closure(inner: &Node, s: &[char], seed: BTreeSet<usize>) -> BTreeSet<usize> {
    let mut reached = seed.clone();
    let mut frontier = seed;
    while !frontier.is_empty() {
        let mut next = BTreeSet::new();
        for &p in &frontier {
            for e in match_ends(inner, s, p) {
                if reached.insert(e) {
                    next.insert(e);
                }
            }
        }
        frontier = next;
    }
    reached
}

fn exemplar_of(node: &Node) -> Option<String> {
    match node {
        Node::Literal(s) => Some(s.clone()),
        Node::Class(ranges) => ranges.first().map(|&(lo, _)| lo.to_string()),
        Node::AnyChar => Some("a".to_string()),
        Node::Concat(parts) => {
            let mut out = String::new();
            for part in parts {
                out.push_str(&exemplar_of(part)?);
            }
            Some(out)
        }
        Node::Alternate(parts) => parts.first().and_then(exemplar_of),
        Node::Star(_) | Node::Optional(_) => Some(String::new()),
        Node::Plus(inner) => exemplar_of(inner),
        Node::Repeat { inner, min, .. } => {
            let unit = exemplar_of(inner)?;
            Some(unit.repeat(*min as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matches(pattern: &str, accepted: &[&str], rejected: &[&str]) {
        let compiled = parse(pattern).unwrap_or_else(|e| panic!("parse `{pattern}`: {e}"));
        for s in accepted {
            assert!(compiled.matches(s), "`{pattern}` should match `{s}`");
        }
        for s in rejected {
            assert!(!compiled.matches(s), "`{pattern}` should not match `{s}`");
        }
    }

    #[test]
    fn literal_search_is_unanchored() {
        assert_matches("abc", &["abc", "xxabcyy"], &["ab", "axbxc"]);
    }

    #[test]
    fn anchors_pin_the_pattern_edges() {
        assert_matches("^abc$", &["abc"], &["xabc", "abcx"]);
        assert_matches("^ab", &["abc"], &["cab"]);
        assert_matches("bc$", &["abc"], &["bcd"]);
    }

    #[test]
    fn classes_ranges_and_negation() {
        assert_matches("^[a-c]+$", &["abc", "a"], &["abd", ""]);
        assert_matches("^[^0-9]$", &["a", "_"], &["3", "ab"]);
        assert_matches("^[]a]$", &["]", "a"], &["b"]);
    }

    #[test]
    fn escapes_and_shorthand_classes() {
        assert_matches(r"^\d{2}$", &["42"], &["4", "4a", "123"]);
        assert_matches(r"^\w+$", &["snake_case9"], &["has space"]);
        assert_matches(r"^a\.b$", &["a.b"], &["axb"]);
        assert_matches(r"^\x41$", &["A"], &["B"]);
    }

    #[test]
    fn alternation_and_groups() {
        assert_matches("^(foo|bar)$", &["foo", "bar"], &["baz", "foobar"]);
        assert_matches("^(?:ab)+$", &["ab", "abab"], &["aba"]);
    }

    #[test]
    fn bounded_repetition() {
        assert_matches("^a{2,3}$", &["aa", "aaa"], &["a", "aaaa"]);
        assert_matches("^a{2}$", &["aa"], &["a", "aaa"]);
        assert_matches("^a{2,}$", &["aa", "aaaaa"], &["a"]);
    }

    #[test]
    fn lazy_quantifiers_are_accepted_with_identical_language() {
        assert_matches("^a+?$", &["a", "aaa"], &[""]);
        assert_matches("^ab??$", &["a", "ab"], &["abb"]);
    }

    #[test]
    fn literal_brace_without_quantifier_shape() {
        assert_matches("^a{x}$", &["a{x}"], &["a"]);
    }

    #[test]
    fn email_like_search_pattern() {
        assert_matches(".*@.*", &["a@b", "@"], &["ab"]);
    }

    #[test]
    fn unsupported_features_are_rejected_not_approximated() {
        for (pattern, needle) in [
            (r"(a)\1", "back-reference"),
            (r"a(?=b)", "lookahead"),
            (r"a(?<=b)", "lookbehind"),
            (r"\p{L}+", "unicode property"),
            (r"a\bb", "word boundary"),
            ("a^b", "anchor inside"),
        ] {
            let err = parse(pattern).expect_err(pattern);
            assert!(
                matches!(err, RegexError::Unsupported { .. }),
                "`{pattern}` should be rejected as unsupported ({needle}), got {err:?}"
            );
        }
    }

    #[test]
    fn malformed_patterns_are_parse_errors() {
        for pattern in ["(ab", "[a-", "*a", "a{3,1}"] {
            let err = parse(pattern).expect_err(pattern);
            assert!(
                matches!(err, RegexError::Parse { .. }),
                "`{pattern}` should be a parse error, got {err:?}"
            );
        }
    }

    #[test]
    fn exemplar_synthesizes_a_matching_key() {
        let compiled = parse("^x_[a-z]+$").unwrap();
        let probe = compiled.exemplar().unwrap();
        assert!(compiled.matches(&probe));
        assert_eq!(probe, "x_a");
    }

    #[test]
    fn exemplar_declines_empty_minimal_forms() {
        let compiled = parse("a*").unwrap();
        assert_eq!(compiled.exemplar(), None);
    }

    #[test]
    fn complement_ranges_cover_the_alphabet_gap() {
        let complement = complement_ranges(&[('0', '9')]);
        assert!(complement.contains(&(' ', '/')));
        assert!(complement.contains(&(':', '~')));
    }

    #[test]
    fn z3_membership_agrees_with_static_matching() {
        use z3::ast::Ast;
        use z3::{SatResult, Solver};

        let compiled = parse("^https?://.*$").unwrap();
        let re = compiled.to_regexp().unwrap();
        let solver = Solver::new();
        let s = z3::ast::String::new_const("s");
        solver.assert(&s._eq(&z3::ast::String::from("https://example.org")));
        solver.assert(&s.regex_matches(&re));
        assert_eq!(solver.check(), SatResult::Sat);

        let solver = Solver::new();
        let s = z3::ast::String::new_const("s");
        solver.assert(&s._eq(&z3::ast::String::from("ftp://example.org")));
        solver.assert(&s.regex_matches(&re));
        assert_eq!(solver.check(), SatResult::Unsat);
    }
}
