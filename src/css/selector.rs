use crate::dom::{Document, NodeId};

/// CSS specificity as an (id, class/attribute, type) tuple. Derived ordering
/// is the cascade tie-break ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    /// Synthetic specificity for inline `style` attributes; beats any
    /// selector a stylesheet can express.
    pub const INLINE: Specificity = Specificity(u32::MAX, 0, 0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimplePart {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    /// `[name]` or `[name=value]`.
    Attr { name: String, value: Option<String> },
}

/// One compound selector: all parts must match the same element.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub parts: Vec<SimplePart>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// A complex selector: compounds joined right-to-left by combinators.
/// `compounds.len() == combinators.len() + 1`, rightmost compound last.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        let mut s = Specificity::default();
        for compound in &self.compounds {
            for part in &compound.parts {
                match part {
                    SimplePart::Id(_) => s.0 += 1,
                    SimplePart::Class(_) | SimplePart::Attr { .. } => s.1 += 1,
                    SimplePart::Type(_) => s.2 += 1,
                    SimplePart::Universal => {}
                }
            }
        }
        s
    }

    /// Match this selector against `element`, walking combinators
    /// right-to-left up the ancestor chain.
    pub fn matches(&self, doc: &Document, element: NodeId) -> bool {
        let last = match self.compounds.last() {
            Some(c) => c,
            None => return false,
        };
        if !compound_matches(doc, element, last) {
            return false;
        }
        let mut current = element;
        // Walk remaining compounds from right to left.
        for i in (0..self.combinators.len()).rev() {
            let compound = &self.compounds[i];
            match self.combinators[i] {
                Combinator::Child => {
                    let parent = match doc.node(current).parent {
                        Some(p) => p,
                        None => return false,
                    };
                    if !compound_matches(doc, parent, compound) {
                        return false;
                    }
                    current = parent;
                }
                Combinator::Descendant => {
                    let mut found = None;
                    for anc in doc.ancestors(current) {
                        if compound_matches(doc, anc, compound) {
                            found = Some(anc);
                            break;
                        }
                    }
                    match found {
                        Some(anc) => current = anc,
                        None => return false,
                    }
                }
            }
        }
        true
    }
}

fn compound_matches(doc: &Document, element: NodeId, compound: &Compound) -> bool {
    let node = doc.node(element);
    let tag = match node.tag() {
        Some(t) => t,
        None => return false,
    };
    compound.parts.iter().all(|part| match part {
        SimplePart::Universal => true,
        SimplePart::Type(t) => tag == t,
        SimplePart::Id(id) => node.attr("id") == Some(id.as_str()),
        SimplePart::Class(c) => node
            .attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|x| x == c))
            .unwrap_or(false),
        SimplePart::Attr { name, value } => match (node.attr(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        },
    })
}

/// Parse a comma-separated selector list. Selectors using syntax we do not
/// support (pseudo-classes, sibling combinators) are rejected with an error
/// string so the collector can record a parse warning and move on.
pub fn parse_selector_list(input: &str) -> Result<Vec<Selector>, String> {
    let mut out = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        out.push(parse_selector(part)?);
    }
    if out.is_empty() {
        return Err(format!("empty selector list: {input:?}"));
    }
    Ok(out)
}

fn parse_selector(input: &str) -> Result<Selector, String> {
    if input.contains(':') {
        return Err(format!("unsupported pseudo selector: {input:?}"));
    }
    if input.contains('+') || input.contains('~') {
        return Err(format!("unsupported sibling combinator: {input:?}"));
    }

    // Normalize child combinators so whitespace splitting sees them as
    // standalone tokens.
    let normalized = input.replace('>', " > ");
    let tokens: Vec<&str> = normalized.split_ascii_whitespace().collect();

    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending_child = false;
    for token in tokens {
        if token == ">" {
            if compounds.is_empty() || pending_child {
                return Err(format!("misplaced child combinator in {input:?}"));
            }
            pending_child = true;
            continue;
        }
        let compound = parse_compound(token)?;
        if !compounds.is_empty() {
            combinators.push(if pending_child {
                Combinator::Child
            } else {
                Combinator::Descendant
            });
        }
        pending_child = false;
        compounds.push(compound);
    }
    if compounds.is_empty() || pending_child {
        return Err(format!("incomplete selector: {input:?}"));
    }
    Ok(Selector {
        compounds,
        combinators,
    })
}

fn parse_compound(token: &str) -> Result<Compound, String> {
    let mut parts = Vec::new();
    let mut chars = token.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '*' => parts.push(SimplePart::Universal),
            '#' | '.' => {
                let mut name = String::new();
                while let Some(&(_, nc)) = chars.peek() {
                    if nc == '#' || nc == '.' || nc == '[' {
                        break;
                    }
                    name.push(nc);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(format!("empty name in selector token {token:?}"));
                }
                parts.push(if c == '#' {
                    SimplePart::Id(name)
                } else {
                    SimplePart::Class(name)
                });
            }
            '[' => {
                let rest = &token[start + 1..];
                let end = rest
                    .find(']')
                    .ok_or_else(|| format!("unterminated attribute selector in {token:?}"))?;
                let inner = &rest[..end];
                let (name, value) = match inner.split_once('=') {
                    Some((n, v)) => (
                        n.trim().to_lowercase(),
                        Some(v.trim().trim_matches(['"', '\'']).to_string()),
                    ),
                    None => (inner.trim().to_lowercase(), None),
                };
                if name.is_empty() {
                    return Err(format!("empty attribute name in {token:?}"));
                }
                parts.push(SimplePart::Attr { name, value });
                // Advance past the consumed bracket expression.
                while let Some((_, nc)) = chars.next() {
                    if nc == ']' {
                        break;
                    }
                }
            }
            _ if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                let mut name = String::new();
                name.push(c.to_ascii_lowercase());
                while let Some(&(_, nc)) = chars.peek() {
                    if nc.is_ascii_alphanumeric() || nc == '-' || nc == '_' {
                        name.push(nc.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                parts.push(SimplePart::Type(name));
            }
            _ => return Err(format!("unsupported character {c:?} in selector {token:?}")),
        }
    }
    if parts.is_empty() {
        return Err(format!("empty compound selector {token:?}"));
    }
    Ok(Compound { parts })
}
