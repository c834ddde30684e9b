//! HTML injection rules.
//!
//! A rule splices content into HTML documents around (or in place of) each
//! match of a key-phrase. Key-phrases match case-insensitively with `.`
//! spanning newlines; literal key-phrases are escaped before compiling.
//!
//! Where the content comes from is abstracted by [`ContentSource`]: a file in
//! the archive, or any callback the embedding application registers.

use std::path::PathBuf;
use std::sync::Arc;

use regex::bytes::{Regex, RegexBuilder};
use rehost_core::{ArchiveRoot, Error, InjectPosition, InjectionRule};

/// What a content source can see while producing its text.
#[derive(Debug, Clone, Copy)]
pub struct InjectionContext<'a> {
    pub rule: &'a InjectionRule,
    pub archive_root: &'a ArchiveRoot,
    /// The request URL rewritten onto the original domain.
    pub original_url: &'a str,
}

/// Producer of injected content.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn render(&self, ctx: &InjectionContext<'_>) -> Result<Vec<u8>, Error>;
}

/// Content read from a file; relative paths resolve inside the archive root.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ContentSource for FileSource {
    async fn render(&self, ctx: &InjectionContext<'_>) -> Result<Vec<u8>, Error> {
        let path = ctx.archive_root.path().join(&self.path);
        Ok(tokio::fs::read(path).await?)
    }
}

/// Content produced by a closure.
pub struct CallbackSource<F> {
    callback: F,
}

impl<F> CallbackSource<F>
where
    F: Fn(&InjectionContext<'_>) -> Result<Vec<u8>, Error> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait::async_trait]
impl<F> ContentSource for CallbackSource<F>
where
    F: Fn(&InjectionContext<'_>) -> Result<Vec<u8>, Error> + Send + Sync,
{
    async fn render(&self, ctx: &InjectionContext<'_>) -> Result<Vec<u8>, Error> {
        (self.callback)(ctx)
    }
}

/// A compiled rule bound to its content source.
#[derive(Clone)]
pub struct Injection {
    rule: InjectionRule,
    pattern: Regex,
    source: Arc<dyn ContentSource>,
}

impl std::fmt::Debug for Injection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injection").field("rule", &self.rule).finish_non_exhaustive()
    }
}

impl Injection {
    /// Bind a rule to an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRule` if the limit is neither -1 nor positive or
    /// the key-phrase does not compile.
    pub fn new(rule: InjectionRule, source: Arc<dyn ContentSource>) -> Result<Self, Error> {
        if rule.limit == 0 || rule.limit < -1 {
            return Err(Error::InvalidRule(format!("limit {} for {:?}", rule.limit, rule.keyphrase)));
        }
        let pattern = compile_pattern(&rule)?;
        Ok(Self { rule, pattern, source })
    }

    /// Bind a configured rule to the archive file it names.
    pub fn from_rule(rule: InjectionRule) -> Result<Self, Error> {
        let source = Arc::new(FileSource::new(&rule.file));
        Self::new(rule, source)
    }

    pub fn rule(&self) -> &InjectionRule {
        &self.rule
    }

    /// Apply this rule to a document.
    ///
    /// A source that fails to produce content leaves the document unchanged.
    pub async fn apply(&self, document: Vec<u8>, archive_root: &ArchiveRoot, original_url: &str) -> Vec<u8> {
        let ctx = InjectionContext { rule: &self.rule, archive_root, original_url };
        match self.source.render(&ctx).await {
            Ok(included) => splice(&self.pattern, &self.rule, &document, &included),
            Err(e) => {
                tracing::warn!(keyphrase = %self.rule.keyphrase, file = %self.rule.file, error = %e, "skipping injection rule");
                document
            }
        }
    }
}

/// Compile a rule's key-phrase. Matching is byte-wise, so documents in any
/// charset are searched.
pub fn compile_pattern(rule: &InjectionRule) -> Result<Regex, Error> {
    let pattern = if rule.regex { escape_non_ascii(&rule.keyphrase) } else { escape_bytes(&rule.keyphrase) };
    RegexBuilder::new(&pattern)
        .unicode(false)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| Error::InvalidRule(e.to_string()))
}

/// Escape a literal key-phrase, spelling non-ASCII characters as UTF-8 bytes.
fn escape_bytes(text: &str) -> String {
    let mut buf = [0u8; 4];
    text.chars()
        .map(|c| if c.is_ascii() { regex::escape(c.encode_utf8(&mut buf)) } else { hex_bytes(c) })
        .collect()
}

/// Spell non-ASCII characters of a regex key-phrase as UTF-8 byte escapes.
/// Outside a class the bytes are grouped so repetition applies to the whole
/// character.
fn escape_non_ascii(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                escaped.push(c);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '[' => {
                in_class = true;
                escaped.push(c);
            }
            ']' => {
                in_class = false;
                escaped.push(c);
            }
            c if c.is_ascii() => escaped.push(c),
            c if in_class => escaped.push_str(&hex_bytes(c)),
            c => {
                escaped.push_str("(?:");
                escaped.push_str(&hex_bytes(c));
                escaped.push(')');
            }
        }
    }
    escaped
}

fn hex_bytes(c: char) -> String {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf).bytes().map(|b| format!("\\x{b:02X}")).collect()
}

/// Escape `$` so injected text is never read as a capture reference.
pub fn escape_replacement(text: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(text.len());
    for &byte in text {
        if byte == b'$' {
            escaped.push(b'$');
        }
        escaped.push(byte);
    }
    escaped
}

/// Splice `included` into `document` at the rule's matches.
pub fn splice(pattern: &Regex, rule: &InjectionRule, document: &[u8], included: &[u8]) -> Vec<u8> {
    let escaped = escape_replacement(included);
    let replacement = match rule.position {
        InjectPosition::Before => [escaped.as_slice(), b"${0}".as_slice()].concat(),
        InjectPosition::After => [b"${0}".as_slice(), escaped.as_slice()].concat(),
        InjectPosition::Replace => escaped,
    };
    pattern
        .replacen(document, rule.match_limit(), replacement.as_slice())
        .into_owned()
}
