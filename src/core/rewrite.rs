//! Chunk-fed identifier rewriter.
//!
//! Consumes the text of a single source file through [`Rewriter::append`] in
//! chunks of arbitrary size, replaces field/method/parameter references and
//! declarations with their mapped names, injects documentation blocks above
//! field and method declarations and pushes the transformed text to the
//! output sink. [`Rewriter::finish`] must be called after the last chunk so
//! buffered content is flushed.
//!
//! The mapped source must follow a few conventions:
//! - names of fields, methods and parameters are unique across all classes
//!   and appear nowhere except their declarations and references,
//! - member declarations are indented with four spaces or one tab,
//! - naming: fields `field_[0-9]+_[A-Za-z_]+`, methods
//!   `func_[0-9]+_[A-Za-z_]+`, parameters `p_[0-9A-Za-z_]+_[0-9]+_`.
//!
//! An occurrence may be split across two `append` calls. The rewriter only
//! commits a match once nothing at or before it could still be changed by
//! future input; undecidable tails stay buffered. Identifier recognition is
//! byte-oriented and so restricted to ASCII names, but chunk boundaries
//! inside multi-byte characters are the caller's concern (see
//! `infra::io::ChunkedReader`), not a correctness hazard here.

use std::io::Write;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::store::MappingStore;
use crate::core::wrap::{TextWrapper, WrapError};

const FIELD_REGEX: &str = "field_[0-9]+_[A-Za-z_]+";
const METHOD_REGEX: &str = "func_[0-9]+_[A-Za-z_]+";
const PARAM_REGEX: &str = "p_[0-9A-Za-z_]+_[0-9]+_";
const INDENTATION_REGEX: &str = " {4}|\t";

/// Declarations of members overriding a superclass member are not
/// documented; the annotation on the preceding line suppresses them.
const OVERRIDE_ANNOTATION: &str = "@Override";

/// Width of injected documentation blocks, prefix included.
const DOC_LINE_LENGTH: usize = 80;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let declaration = format!(
        "(?P<line_break>\r\n|[\r\n])(?P<indent>{INDENTATION_REGEX})(?:[0-9A-Za-z_$.\\[\\]]+ )*\
         (?:(?P<field_decl>{FIELD_REGEX}) *[=;]|(?P<method_decl>{METHOD_REGEX})\\()"
    );
    let pattern = format!(
        "(?:{declaration}|(?P<field>{FIELD_REGEX})|(?P<method>{METHOD_REGEX})|(?P<param>{PARAM_REGEX}))"
    );
    Regex::new(&pattern).expect("rewrite pattern")
});

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// `append` was called after `finish`.
    #[error("rewriter has already finished")]
    Finished,

    #[error("building documentation block failed")]
    Doc(#[from] WrapError),

    #[error("writing rewritten output failed")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug)]
enum Category {
    Field,
    Method,
    Param,
}

struct Declaration {
    line_break: String,
    indent: String,
}

struct FoundMatch {
    start: usize,
    end: usize,
    category: Category,
    name_range: Range<usize>,
    name: String,
    /// Present for declaration sites; carries the captured layout strings
    /// so the injected block matches the file's conventions.
    declaration: Option<Declaration>,
}

/// Rewrites one file's worth of character data. Create a fresh instance per
/// file.
pub struct Rewriter<'a, W> {
    sink: W,
    store: &'a MappingStore,
    /// Unemitted tail of the input. Everything in front of it has been
    /// rewritten (or ruled out) and flushed to the sink.
    buffer: String,
    /// Characters most recently flushed, so the override check can look
    /// behind the buffer start regardless of chunk boundaries.
    history: String,
    /// A match was found whose extent could still change with more input.
    has_possible_match: bool,
    has_finished: bool,
}

impl<'a, W: Write> Rewriter<'a, W> {
    pub fn new(sink: W, store: &'a MappingStore) -> Self {
        Self {
            sink,
            store,
            buffer: String::new(),
            history: String::new(),
            has_possible_match: false,
            has_finished: false,
        }
    }

    /// Appends a chunk and processes as much of the buffered input as can
    /// already be decided.
    pub fn append(&mut self, chunk: &str) -> Result<(), RewriteError> {
        if self.has_finished {
            return Err(RewriteError::Finished);
        }

        // Is set again if a match is still possible
        self.has_possible_match = false;
        self.buffer.push_str(chunk);
        self.scan(false)
    }

    /// Applies a final pending match without waiting for more input, then
    /// flushes the remaining buffer. Afterwards `append` is rejected.
    pub fn finish(&mut self) -> Result<(), RewriteError> {
        self.has_finished = true;

        if self.has_possible_match {
            self.has_possible_match = false;
            self.scan(true)?;
        }

        self.flush_to(self.buffer.len())?;
        self.sink.flush()?;
        Ok(())
    }

    fn scan(&mut self, at_finish: bool) -> Result<(), RewriteError> {
        loop {
            match self.find_match() {
                Some(found) => {
                    if !at_finish {
                        // A suffix starting at or before the match may still
                        // grow into a different (earlier or longer) match;
                        // keep it buffered until more input decides.
                        if let Some(viable) = self.earliest_viable_partial(found.start) {
                            self.has_possible_match = true;
                            self.flush_to(viable)?;
                            return Ok(());
                        }
                        if found.end == self.buffer.len() {
                            self.has_possible_match = true;
                            self.flush_to(found.start)?;
                            return Ok(());
                        }
                    }

                    self.process_match(found)?;

                    if at_finish {
                        // A single final match is applied at finish
                        return Ok(());
                    }
                }
                None => {
                    if at_finish {
                        return Ok(());
                    }
                    // Flush everything that can never become part of a match
                    let keep_from = self
                        .earliest_viable_partial(self.buffer.len())
                        .unwrap_or(self.buffer.len());
                    self.flush_to(keep_from)?;
                    return Ok(());
                }
            }
        }
    }

    /// Leftmost committed match, honoring the override suppression the
    /// pattern itself cannot express: a declaration's line break must not
    /// directly follow the override annotation, and the `\n` of a `\r\n`
    /// pair never starts a declaration of its own.
    fn find_match(&self) -> Option<FoundMatch> {
        let mut search_from = 0;

        while search_from <= self.buffer.len() {
            let caps = PATTERN.captures_at(&self.buffer, search_from)?;

            if let Some(line_break) = caps.name("line_break") {
                let start = line_break.start();
                let suppressed = self.override_precedes(start)
                    || (line_break.as_str() == "\n" && self.carriage_return_precedes(start));

                if suppressed {
                    search_from = line_break.end();
                    continue;
                }
            }

            return extract(&caps);
        }

        None
    }

    fn process_match(&mut self, found: FoundMatch) -> Result<(), RewriteError> {
        let store = self.store;
        // Renaming shifts indices; track the match end relative to the
        // buffer end and recompute afterwards.
        let end_offset = self.buffer.len() - found.end;

        let renamed = match found.category {
            Category::Field => store.field_mapping(&found.name),
            Category::Method => store.method_mapping(&found.name),
            Category::Param => store.param_mapping(&found.name),
        };
        if let Some(renamed) = renamed {
            self.buffer.replace_range(found.name_range.clone(), renamed);
        }

        if let Some(declaration) = &found.declaration {
            let doc = match found.category {
                Category::Field => store.field_doc(&found.name),
                Category::Method => store.method_doc(&found.name),
                Category::Param => None,
            };
            if let Some(doc) = doc {
                // Inserting at the match start is safe after the rename
                // because the replaced range lies strictly behind it. The
                // captured line break is re-emitted at the block start, so
                // the original one stays in place.
                let block = doc_block(doc, &declaration.line_break, &declaration.indent)?;
                self.buffer.insert_str(found.start, &block);
            }
        }

        let end_index = self.buffer.len() - end_offset;
        self.flush_to(end_index)
    }

    fn flush_to(&mut self, up_to: usize) -> Result<(), RewriteError> {
        if up_to == 0 {
            return Ok(());
        }

        self.sink.write_all(self.buffer[..up_to].as_bytes())?;
        self.remember_flushed(up_to);
        self.buffer.drain(..up_to);
        Ok(())
    }

    /// Keeps the tail of the flushed text as look-behind context for the
    /// override check.
    fn remember_flushed(&mut self, up_to: usize) {
        let mut context = std::mem::take(&mut self.history);
        context.push_str(&self.buffer[..up_to]);

        let keep = OVERRIDE_ANNOTATION.len();
        if context.len() > keep {
            let mut cut = context.len() - keep;
            while !context.is_char_boundary(cut) {
                cut += 1;
            }
            context.drain(..cut);
        }

        self.history = context;
    }

    /// Whether the override annotation ends directly before buffer position
    /// `pos`, looking into the flushed history when the buffer is too short.
    fn override_precedes(&self, pos: usize) -> bool {
        if pos >= OVERRIDE_ANNOTATION.len() {
            return self.buffer[..pos].ends_with(OVERRIDE_ANNOTATION);
        }

        let mut context =
            String::with_capacity(self.history.len() + pos);
        context.push_str(&self.history);
        context.push_str(&self.buffer[..pos]);
        context.ends_with(OVERRIDE_ANNOTATION)
    }

    fn carriage_return_precedes(&self, pos: usize) -> bool {
        if pos > 0 {
            self.buffer.as_bytes()[pos - 1] == b'\r'
        } else {
            self.history.ends_with('\r')
        }
    }

    /// Earliest position at or before `limit` whose suffix, taken in full,
    /// could still grow into a pattern match once more input arrives.
    /// Emulates the "hit end of input" signal of a backtracking matcher.
    fn earliest_viable_partial(&self, limit: usize) -> Option<usize> {
        let bytes = self.buffer.as_bytes();
        let upper = bytes.len().min(limit + 1);

        for pos in 0..upper {
            let viable = match bytes[pos] {
                b'\r' => self.declaration_viable_from(pos),
                b'\n' => {
                    !self.carriage_return_precedes(pos) && self.declaration_viable_from(pos)
                }
                b'f' => {
                    ident_prefix_reaches_end(&self.buffer[pos..], "field_")
                        || ident_prefix_reaches_end(&self.buffer[pos..], "func_")
                }
                b'p' => param_prefix_reaches_end(&self.buffer[pos..]),
                _ => false,
            };

            if viable {
                return Some(pos);
            }
        }

        None
    }

    /// Whether a declaration could start at the line break at `pos` and
    /// consume everything up to the buffer end.
    fn declaration_viable_from(&self, pos: usize) -> bool {
        if self.override_precedes(pos) {
            return false;
        }

        let bytes = self.buffer.as_bytes();
        let mut at = pos + 1;
        if bytes[pos] == b'\r' {
            if at == bytes.len() {
                // May yet become "\r\n"
                return true;
            }
            if bytes[at] == b'\n' {
                at += 1;
            }
        }

        // Indentation: one tab or exactly four spaces
        if bytes.get(at) == Some(&b'\t') {
            at += 1;
        } else {
            for _ in 0..4 {
                match bytes.get(at) {
                    None => return true,
                    Some(b' ') => at += 1,
                    Some(_) => return false,
                }
            }
        }

        declaration_body_viable(&self.buffer[at..])
    }
}

/// Builds the documentation block inserted in front of a declaration,
/// reusing the line break and indentation captured from the match.
fn doc_block(documentation: &str, line_break: &str, indent: &str) -> Result<String, WrapError> {
    let prefix = format!("{indent} * ");
    let wrapper = TextWrapper::new(DOC_LINE_LENGTH, &prefix, line_break)?;

    let mut block =
        String::with_capacity(documentation.len() + 4 * (indent.len() + line_break.len() + 4));
    block.push_str(line_break);
    block.push_str(indent);
    block.push_str("/**");
    block.push_str(line_break);
    block.push_str(&wrapper.transform(documentation));
    block.push_str(line_break);
    block.push_str(indent);
    block.push_str(" */");
    Ok(block)
}

fn extract(caps: &Captures) -> Option<FoundMatch> {
    let whole = caps.get(0)?;

    let (category, name, declaration) = if let Some(name) = caps.name("field_decl") {
        (Category::Field, name, declaration_context(caps))
    } else if let Some(name) = caps.name("method_decl") {
        (Category::Method, name, declaration_context(caps))
    } else if let Some(name) = caps.name("field") {
        (Category::Field, name, None)
    } else if let Some(name) = caps.name("method") {
        (Category::Method, name, None)
    } else {
        (Category::Param, caps.name("param")?, None)
    };

    Some(FoundMatch {
        start: whole.start(),
        end: whole.end(),
        category,
        name_range: name.range(),
        name: name.as_str().to_string(),
        declaration,
    })
}

fn declaration_context(caps: &Captures) -> Option<Declaration> {
    Some(Declaration {
        line_break: caps.name("line_break")?.as_str().to_string(),
        indent: caps.name("indent")?.as_str().to_string(),
    })
}

fn is_type_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'.' | b'[' | b']')
}

fn is_field_ident(text: &str) -> bool {
    full_ident_match(text, "field_")
}

fn full_ident_match(text: &str, literal: &str) -> bool {
    let Some(rest) = text.strip_prefix(literal) else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let Some(rest) = rest[digits..].strip_prefix('_') else {
        return false;
    };
    !rest.is_empty()
        && rest
            .bytes()
            .all(|byte| byte.is_ascii_alphabetic() || byte == b'_')
}

/// Whether `tail` (the part after the indentation) could still grow into
/// type-like tokens followed by a field or method declarator, consuming the
/// whole remaining buffer on the way.
fn declaration_body_viable(tail: &str) -> bool {
    let bytes = tail.as_bytes();
    let mut at = 0;

    loop {
        let run_start = at;
        while at < bytes.len() && is_type_char(bytes[at]) {
            at += 1;
        }
        if at == bytes.len() {
            // The run reaches the end; more input decides what it becomes
            return true;
        }

        let run = &tail[run_start..at];
        if bytes[at] != b' ' {
            // A complete declarator ('=', ';' or '(' right here) is the
            // finder's concern; anything else is a dead end.
            return false;
        }

        // A field declarator may sit in front of spaces that have not yet
        // been followed by '=' or ';'.
        if is_field_ident(run) {
            let mut spaces = at;
            while spaces < bytes.len() && bytes[spaces] == b' ' {
                spaces += 1;
            }
            if spaces == bytes.len() {
                return true;
            }
        }

        if run.is_empty() {
            // Consecutive spaces cannot continue a token chain
            return false;
        }

        // Treat the run plus one space as a type token and carry on
        at += 1;
    }
}

/// Whether `tail` is entirely a prefix of `<literal><digits>_<letters>`:
/// the identifier has not ended inside the buffer, so more input could
/// complete or extend it.
fn ident_prefix_reaches_end(tail: &str, literal: &str) -> bool {
    let bytes = tail.as_bytes();
    let literal = literal.as_bytes();
    let mut at = 0;

    while at < bytes.len() && at < literal.len() {
        if bytes[at] != literal[at] {
            return false;
        }
        at += 1;
    }
    if at == bytes.len() {
        return true;
    }

    let digit_start = at;
    while at < bytes.len() && bytes[at].is_ascii_digit() {
        at += 1;
    }
    if at == bytes.len() {
        return true;
    }
    if at == digit_start || bytes[at] != b'_' {
        return false;
    }
    at += 1;

    while at < bytes.len() && (bytes[at].is_ascii_alphabetic() || bytes[at] == b'_') {
        at += 1;
    }
    at == bytes.len()
}

/// Whether `tail` is entirely a prefix of `p_<word>_<digits>_`. Any run of
/// word characters after `p_` can still be extended into the full form.
fn param_prefix_reaches_end(tail: &str) -> bool {
    let bytes = tail.as_bytes();
    if bytes[0] != b'p' {
        return false;
    }
    if bytes.len() == 1 {
        return true;
    }
    if bytes[1] != b'_' {
        return false;
    }
    bytes[2..]
        .iter()
        .all(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
}
