//! Structural extraction of decipher, helper and n-transform code from player scripts

use crate::diag;
use regex::Regex;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

/// Placeholder in a terminator template replaced by the head's escaped parameter list
const PARAMS_PLACEHOLDER: &str = "{params}";

/// Which pass a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    Decipher,
    Helper,
    NTransform,
}

/// How many matches a pattern contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchArity {
    First,
    All,
}

/// One entry of a pattern table.
///
/// With a `terminator`, `source` is a head whose first group captures a parameter list. The match
/// runs from the head to the first terminator instance (at least one character past the head)
/// built from that same list.
#[derive(Debug, Clone, Copy)]
pub struct PatternDescriptor {
    pub family: PatternFamily,
    pub source: &'static str,
    pub arity: MatchArity,
    pub terminator: Option<&'static str>,
}

impl PatternDescriptor {
    const fn first(family: PatternFamily, source: &'static str) -> Self {
        Self {
            family,
            source,
            arity: MatchArity::First,
            terminator: None,
        }
    }

    const fn all(family: PatternFamily, source: &'static str) -> Self {
        Self {
            family,
            source,
            arity: MatchArity::All,
            terminator: None,
        }
    }

    const fn delimited(
        family: PatternFamily,
        head: &'static str,
        terminator: &'static str,
    ) -> Self {
        Self {
            family,
            source: head,
            arity: MatchArity::First,
            terminator: Some(terminator),
        }
    }
}

pub const DECIPHER_PATTERNS: &[PatternDescriptor] = &[
    PatternDescriptor::delimited(
        PatternFamily::Decipher,
        r#"function(?: \w+)?\s*\(((?:\w+,)*\w+)\)\s*\{"#,
        r#"return (?:\w+\.)?join\.call\({params}, ""\)\}"#,
    ),
    PatternDescriptor::first(
        PatternFamily::Decipher,
        r#"\w+\.prototype\.get=function\(\)\{return this\.j\}"#,
    ),
    PatternDescriptor::first(
        PatternFamily::Decipher,
        r#"function(?: \w+)?\s*\((?:\w+,)*\w+\)\s*\{[\s\S]+?\.join\(""\)\}"#,
    ),
];

pub const HELPER_PATTERNS: &[PatternDescriptor] = &[
    PatternDescriptor::all(PatternFamily::Helper, r#"var \w+=\{.+?\};"#),
    PatternDescriptor::all(PatternFamily::Helper, r#"var \w+\s*=\s*\{.+?\};"#),
];

pub const N_TRANSFORM_PATTERNS: &[PatternDescriptor] = &[
    PatternDescriptor::first(PatternFamily::NTransform, r#"function\(\w\)\{[\s\S]+?\}"#),
    PatternDescriptor::first(
        PatternFamily::NTransform,
        r#"\w\[i\]=\w\[(\w%\w\.length)\]"#,
    ),
    PatternDescriptor::first(PatternFamily::NTransform, r#"\w=\w\.split\(""\);"#),
];

struct CompiledPattern {
    descriptor: &'static PatternDescriptor,
    regex: Regex,
}

/// Every family matches across newlines
fn build(source: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?s){}", source))
}

fn compile(table: &'static [PatternDescriptor]) -> Vec<CompiledPattern> {
    table
        .iter()
        .filter_map(|descriptor| match build(descriptor.source) {
            Ok(regex) => Some(CompiledPattern { descriptor, regex }),
            Err(e) => {
                warn!("Skipping {:?} pattern {}: {}", descriptor.family, descriptor.source, e);
                None
            }
        })
        .collect()
}

static DECIPHER: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| compile(DECIPHER_PATTERNS));
static HELPERS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| compile(HELPER_PATTERNS));
static N_TRANSFORM: LazyLock<Vec<CompiledPattern>> =
    LazyLock::new(|| compile(N_TRANSFORM_PATTERNS));

/// Terminator search for one parameter list.
///
/// Heads are visited in increasing offset order, so the last result stays valid for later
/// searches until a head starts past it.
struct Terminator {
    regex: Regex,
    last: Option<Option<(usize, usize)>>,
}

impl Terminator {
    fn new(template: &str, params: &str) -> Result<Self, regex::Error> {
        let source = template.replace(PARAMS_PLACEHOLDER, &regex::escape(params));
        Ok(Self {
            regex: build(&source)?,
            last: None,
        })
    }

    /// End offset of the first terminator starting at or after `from`
    fn end_from(&mut self, body: &str, from: usize) -> Option<usize> {
        match self.last {
            Some(None) => return None,
            Some(Some((start, end))) if start >= from => return Some(end),
            _ => {}
        }
        let found = self.regex.find_at(body, from).map(|m| (m.start(), m.end()));
        self.last = Some(found);
        found.map(|(_, end)| end)
    }
}

/// Leftmost head whose parameter list is closed by its terminator, lazily
fn find_delimited(
    body: &str,
    head: &Regex,
    template: &str,
) -> Result<Option<String>, regex::Error> {
    let mut terminators: HashMap<&str, Terminator> = HashMap::new();

    for captures in head.captures_iter(body) {
        let (Some(whole), Some(params)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        // the body between head and terminator is never empty
        let Some(next) = body[whole.end()..].chars().next() else {
            break;
        };
        let from = whole.end() + next.len_utf8();

        let terminator = match terminators.entry(params.as_str()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Terminator::new(template, params.as_str())?),
        };
        if let Some(end) = terminator.end_from(body, from) {
            return Ok(Some(body[whole.start()..end].to_string()));
        }
    }
    Ok(None)
}

/// Ordered extracted fragments.
///
/// Index 0 is the decipher function, the last index is the n-transform function when there are at
/// least two fragments, and everything in between is helper material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FragmentList(Vec<String>);

impl FragmentList {
    pub fn new(fragments: Vec<String>) -> Self {
        Self(fragments)
    }

    pub fn decipher(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn helpers(&self) -> &[String] {
        match self.0.len() {
            0 | 1 => &[],
            len => &self.0[1..len - 1],
        }
    }

    pub fn n_transform(&self) -> Option<&str> {
        if self.0.len() < 2 {
            return None;
        }
        self.0.last().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-family extraction result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFunctions {
    pub decipher: Option<String>,
    pub helpers: Vec<String>,
    pub n_transform: Option<String>,
}

impl ExtractedFunctions {
    pub fn has_decipher(&self) -> bool {
        self.decipher.is_some()
    }

    /// Flatten into positional order: decipher, helpers, n-transform
    pub fn into_fragment_list(self) -> FragmentList {
        let mut fragments = Vec::with_capacity(self.helpers.len() + 2);
        fragments.extend(self.decipher);
        fragments.extend(self.helpers);
        fragments.extend(self.n_transform);
        FragmentList(fragments)
    }
}

fn run_pass(body: &str, patterns: &[CompiledPattern]) -> Vec<String> {
    for pattern in patterns {
        let descriptor = pattern.descriptor;
        let short: String = descriptor.source.chars().take(40).collect();

        let found: Result<Vec<String>, regex::Error> =
            match (descriptor.arity, descriptor.terminator) {
                (_, Some(template)) => {
                    find_delimited(body, &pattern.regex, template).map(|m| m.into_iter().collect())
                }
                (MatchArity::First, None) => Ok(pattern
                    .regex
                    .find(body)
                    .map(|m| m.as_str().to_string())
                    .into_iter()
                    .collect()),
                (MatchArity::All, None) => Ok(pattern
                    .regex
                    .find_iter(body)
                    .map(|m| m.as_str().to_string())
                    .collect()),
            };

        match found {
            Ok(found) if !found.is_empty() => {
                diag!(
                    "{:?} matched {} block(s) with: {}...",
                    descriptor.family,
                    found.len(),
                    short
                );
                return found;
            }
            Ok(_) => diag!("{:?} no match for: {}...", descriptor.family, short),
            Err(e) => diag!("{:?} pattern error for {}...: {}", descriptor.family, short, e),
        }
    }
    Vec::new()
}

/// Run all three passes over a player script
pub fn extract_functions(body: &str) -> ExtractedFunctions {
    let extracted = ExtractedFunctions {
        decipher: run_pass(body, &DECIPHER).into_iter().next(),
        helpers: run_pass(body, &HELPERS),
        n_transform: run_pass(body, &N_TRANSFORM).into_iter().next(),
    };
    diag!(
        "Extracted decipher={} helpers={} n_transform={}",
        extracted.decipher.is_some(),
        extracted.helpers.len(),
        extracted.n_transform.is_some()
    );
    extracted
}

/// Extract the positional fragment list from a player script. Never fails; may be empty.
pub fn extract(body: &str) -> FragmentList {
    extract_functions(body).into_fragment_list()
}
