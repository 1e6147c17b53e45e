//! Reader: turns source text into top-level values.
//!
//! `lexer` splits text into tokens; this module classifies them and builds
//! the nested forms with one recursive-descent builder per form (list, map,
//! program, `IF`, `FOR`, `WHILE`). Bare words are resolved against the live
//! command registry at the moment they are read.
//!
//! `import NAME` is handled at the token level: the named unit is loaded
//! through a [`SourceLoader`] and its tokens are spliced into the stream where
//! the import appeared, so an import is valid at any nesting level and never
//! shows up in the produced values.

pub(crate) mod lexer;

use crate::registry::Registry;
use crate::value::{CommandRef, ForNode, IfNode, MapKey, Program, Value, WhileNode};
use crate::{DEFAULT_MAX_READ_DEPTH, Error, ParseError};
use lexer::{Keyword, LexError, Lexer, Token};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

/// Maximum number of sources (the root text plus nested imports) open at once
pub const MAX_IMPORT_NESTING: usize = 16;

/// File extension of importable units
pub const SOURCE_EXTENSION: &str = "rpn";

/// Hook used to resolve `import NAME`
pub trait SourceLoader {
    /// Return the source text of the named unit
    fn load(&self, name: &str) -> Result<String, Error>;
}

/// Loader that refuses every import
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImports;

impl SourceLoader for NoImports {
    fn load(&self, name: &str) -> Result<String, Error> {
        Err(Error::failed(format!("cannot import `{name}`: imports are disabled")))
    }
}

/// Loads `NAME.rpn` from a list of directories; dots in the name separate
/// subdirectories, so `math.trig` is looked up as `math/trig.rpn`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    search_paths: Vec<PathBuf>,
}

impl FileLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        FileLoader { search_paths }
    }

    fn relative_path(name: &str) -> PathBuf {
        let mut path: PathBuf = name.split('.').collect();
        path.set_extension(SOURCE_EXTENSION);
        path
    }
}

impl SourceLoader for FileLoader {
    fn load(&self, name: &str) -> Result<String, Error> {
        let relative = Self::relative_path(name);
        for dir in &self.search_paths {
            let candidate = dir.join(&relative);
            if candidate.is_file() {
                tracing::debug!(module = name, path = %candidate.display(), "importing");
                return std::fs::read_to_string(&candidate).map_err(|e| {
                    Error::failed(format!("cannot read {}: {e}", candidate.display()))
                });
            }
        }
        Err(Error::NameNotFound(format!(
            "module `{name}` ({} not found in import paths)",
            relative.display()
        )))
    }
}

/// Everything the reader consults while building values
#[derive(Clone, Copy)]
pub struct ReadContext<'a> {
    pub registry: &'a Registry,
    /// Namespace recorded in every program read
    pub namespace: &'a str,
    pub loader: &'a dyn SourceLoader,
    pub max_depth: usize,
}

impl<'a> ReadContext<'a> {
    pub fn new(registry: &'a Registry, namespace: &'a str, loader: &'a dyn SourceLoader) -> Self {
        ReadContext {
            registry,
            namespace,
            loader,
            max_depth: DEFAULT_MAX_READ_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug)]
struct Source {
    name: String,
    lexer: Lexer,
}

/// Where a form was opened, for unterminated-form diagnostics
#[derive(Debug, Clone, Copy)]
struct Opened {
    /// Number of open sources when the form started
    level: usize,
    offset: usize,
}

/// Incremental reader over one root text.
///
/// Each [`Reader::read_next`] call produces one complete top-level value.
#[derive(Debug)]
pub struct Reader {
    sources: Vec<Source>,
    unit_start: usize,
}

impl Reader {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Reader {
            sources: vec![Source {
                name: name.into(),
                lexer: Lexer::new(text),
            }],
            unit_start: 0,
        }
    }

    /// Read the next top-level value, or `None` at end of input.
    ///
    /// Registry lookups happen here, so words registered after one call are
    /// visible to the next.
    pub fn read_next(&mut self, ctx: &ReadContext<'_>) -> Result<Option<Value>, Error> {
        self.unit_start = self.sources[0].lexer.skip_to_token();
        let Some((token, offset)) = self.next_token(ctx)? else {
            return Ok(None);
        };
        self.build_value(ctx, token, offset, 0, None).map(Some)
    }

    /// Read every remaining top-level value
    pub fn read_all(&mut self, ctx: &ReadContext<'_>) -> Result<Vec<Value>, Error> {
        let mut values = Vec::new();
        while let Some(value) = self.read_next(ctx)? {
            values.push(value);
        }
        Ok(values)
    }

    /// Root text from the start of the unit being read, used to keep an
    /// unterminated form until more input arrives
    pub fn unit_text(&self) -> &str {
        let text = self.root().lexer.text();
        &text[self.unit_start.min(text.len())..]
    }

    fn root(&self) -> &Source {
        &self.sources[0]
    }

    fn current(&self) -> &Source {
        // The root source is never popped
        self.sources.last().unwrap_or(&self.sources[0])
    }

    fn opened_at(&self, offset: usize) -> Opened {
        Opened {
            level: self.sources.len(),
            offset,
        }
    }

    fn malformed(&self, message: impl Into<String>, offset: usize, found: Option<String>) -> Error {
        let source = self.current();
        tracing::trace!(source = %source.name, offset, "malformed token");
        Error::MalformedToken(ParseError::with_context(
            message,
            source.lexer.text(),
            offset,
            found,
        ))
    }

    fn unterminated(&self, form: &str, terminator: &str, opened: Opened) -> Error {
        let message = format!("end of input inside {form}, expected `{terminator}`");
        let error = if opened.level == 1 {
            ParseError::with_context(message, self.root().lexer.text(), opened.offset, None)
        } else {
            ParseError::from_message(message)
        };
        Error::UnterminatedForm(error)
    }

    /// Next token from the innermost source, splicing in imports and
    /// closing finished imported sources
    fn next_token(&mut self, ctx: &ReadContext<'_>) -> Result<Option<(Token, usize)>, Error> {
        loop {
            let level = self.sources.len();
            let source = match self.sources.last_mut() {
                Some(source) => source,
                None => return Ok(None),
            };
            match source.lexer.next_token() {
                Ok(Some((Token::Import, at))) => self.open_import(ctx, at)?,
                Ok(Some(next)) => return Ok(Some(next)),
                Ok(None) if level > 1 => {
                    let finished = self.sources.pop();
                    if let Some(finished) = finished {
                        tracing::debug!(module = %finished.name, "import finished");
                    }
                }
                Ok(None) => return Ok(None),
                // A string still open at the end of the root text may be
                // continued by more input, like any other open form
                Err((LexError::UnterminatedString, offset)) if level == 1 => {
                    return Err(Error::UnterminatedForm(ParseError::with_context(
                        LexError::UnterminatedString.message(),
                        source.lexer.text(),
                        offset,
                        None,
                    )));
                }
                Err((error, offset)) => {
                    let found = source.lexer.text()[offset..]
                        .split_whitespace()
                        .next()
                        .map(str::to_owned);
                    return Err(self.malformed(error.message(), offset, found));
                }
            }
        }
    }

    fn open_import(&mut self, ctx: &ReadContext<'_>, at: usize) -> Result<(), Error> {
        let name = match self.sources.last_mut().map(|s| s.lexer.next_token()) {
            Some(Ok(Some((Token::Word(name) | Token::Str(name), _)))) => name,
            Some(Ok(other)) => {
                let found = other.map(|(t, _)| t.describe());
                return Err(self.malformed("`import` must be followed by a module name", at, found));
            }
            Some(Err((error, offset))) => return Err(self.malformed(error.message(), offset, None)),
            None => return Ok(()),
        };
        if self.sources.len() >= MAX_IMPORT_NESTING {
            return Err(Error::failed(format!(
                "cannot import `{name}`: more than {MAX_IMPORT_NESTING} nested imports"
            )));
        }
        let text = ctx.loader.load(&name)?;
        tracing::debug!(module = %name, depth = self.sources.len(), "import started");
        self.sources.push(Source {
            name,
            lexer: Lexer::new(text),
        });
        Ok(())
    }

    fn check_depth(
        &self,
        ctx: &ReadContext<'_>,
        depth: usize,
        offset: usize,
        found: &Token,
    ) -> Result<(), Error> {
        if depth > ctx.max_depth {
            Err(self.malformed(
                format!("forms nested deeper than {} levels", ctx.max_depth),
                offset,
                Some(found.describe()),
            ))
        } else {
            Ok(())
        }
    }

    /// Turn one token into a value, recursing into a builder when the token
    /// opens a form. `depth` counts the forms already open around it.
    fn build_value(
        &mut self,
        ctx: &ReadContext<'_>,
        token: Token,
        offset: usize,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        if matches!(
            token,
            Token::StartList
                | Token::StartMap
                | Token::StartProgram
                | Token::Keyword(Keyword::If | Keyword::For | Keyword::While)
        ) {
            self.check_depth(ctx, depth + 1, offset, &token)?;
        }
        let opened = self.opened_at(offset);
        match token {
            Token::Integer(n) => Ok(Value::Integer(n)),
            Token::Str(s) => Ok(Value::String(s)),
            Token::NoneLiteral => Ok(Value::None),
            Token::Word(word) => Ok(resolve_word(ctx.registry, word)),
            Token::Keyword(Keyword::Exit) => ctx
                .registry
                .lookup(Keyword::Exit.as_str())
                .map(|command| Value::Command(CommandRef::new(command)))
                .ok_or_else(|| Error::NameNotFound(Keyword::Exit.as_str().to_owned())),
            Token::StartList => self.build_list(ctx, opened, depth + 1, enclosing),
            Token::StartMap => self.build_map(ctx, opened, depth + 1, enclosing),
            Token::StartProgram => self.build_program(ctx, opened, depth + 1, enclosing),
            Token::Keyword(Keyword::If) => self.build_if(ctx, opened, depth + 1, enclosing),
            Token::Keyword(Keyword::For) => self.build_for(ctx, opened, depth + 1, enclosing),
            Token::Keyword(Keyword::While) => self.build_while(ctx, opened, depth + 1, enclosing),
            stray @ (Token::EndList
            | Token::EndMap
            | Token::EndProgram
            | Token::Keyword(_)) => Err(self.malformed(
                "terminator without a matching opening form",
                offset,
                Some(stray.describe()),
            )),
            Token::Import => Err(self.malformed("unexpected `import`", offset, None)),
        }
    }

    /// Next token inside a form; end of input is an unterminated form
    fn form_token(
        &mut self,
        ctx: &ReadContext<'_>,
        form: &str,
        terminator: &str,
        opened: Opened,
    ) -> Result<(Token, usize), Error> {
        match self.next_token(ctx)? {
            Some(next) => Ok(next),
            None => Err(self.unterminated(form, terminator, opened)),
        }
    }

    fn build_list(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        let mut items = Vec::new();
        loop {
            match self.form_token(ctx, "a list", "]", opened)? {
                (Token::EndList, _) => return Ok(Value::list(items)),
                (token, offset) => {
                    items.push(self.build_value(ctx, token, offset, depth, enclosing)?)
                }
            }
        }
    }

    fn build_map(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        let mut items = Vec::new();
        let end = loop {
            match self.form_token(ctx, "a map", "}", opened)? {
                (Token::EndMap, offset) => break offset,
                (token, offset) => {
                    items.push(self.build_value(ctx, token, offset, depth, enclosing)?)
                }
            }
        };
        if items.len() % 2 != 0 {
            return Err(self.malformed(
                "map literal needs key/value pairs",
                end,
                Some("}".to_owned()),
            ));
        }
        let mut entries = BTreeMap::new();
        let mut items = items.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            entries.insert(MapKey::try_from(key)?, value);
        }
        Ok(Value::map(entries))
    }

    fn build_program(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        let mut outcome = Ok(());
        let program = Rc::new_cyclic(|myself: &Weak<Program>| {
            let body = self.build_program_body(ctx, opened, depth, myself);
            let body = body.unwrap_or_else(|e| {
                outcome = Err(e);
                Vec::new()
            });
            Program::new(body, ctx.namespace, enclosing.cloned())
        });
        outcome.map(|()| Value::Program(program))
    }

    fn build_program_body(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        myself: &Weak<Program>,
    ) -> Result<Vec<Value>, Error> {
        let mut body = Vec::new();
        loop {
            match self.form_token(ctx, "a program", ">>", opened)? {
                (Token::EndProgram, _) => return Ok(body),
                (token, offset) => {
                    body.push(self.build_value(ctx, token, offset, depth, Some(myself))?)
                }
            }
        }
    }

    fn build_if(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        #[derive(Clone, Copy)]
        enum Section {
            Cond,
            Then,
            Else,
        }

        let mut node = IfNode::default();
        let mut section = Section::Cond;
        loop {
            let (token, offset) = self.form_token(ctx, "IF", "ENDIF", opened)?;
            let marker = match &token {
                Token::Keyword(k @ (Keyword::Then | Keyword::Else | Keyword::EndIf)) => Some(*k),
                _ => None,
            };
            match (marker, section) {
                (Some(Keyword::Then), Section::Cond) => section = Section::Then,
                (Some(Keyword::Else), Section::Then) => section = Section::Else,
                (Some(Keyword::EndIf), Section::Then | Section::Else) => {
                    return Ok(Value::If(Rc::new(node)));
                }
                (Some(_), _) => {
                    let message = match section {
                        Section::Cond => "IF needs THEN before ELSE or ENDIF",
                        Section::Then => "THEN repeated inside IF",
                        Section::Else => "THEN or ELSE after ELSE inside IF",
                    };
                    return Err(self.malformed(message, offset, Some(token.describe())));
                }
                (None, _) => {
                    let value = self.build_value(ctx, token, offset, depth, enclosing)?;
                    match section {
                        Section::Cond => node.cond.push(value),
                        Section::Then => node.then.push(value),
                        Section::Else => node.otherwise.push(value),
                    }
                }
            }
        }
    }

    fn build_for(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        let mut node = ForNode::default();
        loop {
            match self.form_token(ctx, "FOR", "ENDFOR", opened)? {
                (Token::Keyword(Keyword::EndFor), _) => return Ok(Value::For(Rc::new(node))),
                (token, offset) => node
                    .body
                    .push(self.build_value(ctx, token, offset, depth, enclosing)?),
            }
        }
    }

    fn build_while(
        &mut self,
        ctx: &ReadContext<'_>,
        opened: Opened,
        depth: usize,
        enclosing: Option<&Weak<Program>>,
    ) -> Result<Value, Error> {
        let mut node = WhileNode::default();
        let mut in_body = false;
        loop {
            let (token, offset) = self.form_token(ctx, "WHILE", "ENDWHILE", opened)?;
            match token {
                Token::Keyword(Keyword::Repeat) if !in_body => in_body = true,
                Token::Keyword(Keyword::EndWhile) if in_body => {
                    return Ok(Value::While(Rc::new(node)));
                }
                Token::Keyword(Keyword::Repeat | Keyword::EndWhile) => {
                    let message = if in_body {
                        "REPEAT repeated inside WHILE"
                    } else {
                        "WHILE needs REPEAT before ENDWHILE"
                    };
                    return Err(self.malformed(message, offset, Some(token.describe())));
                }
                token => {
                    let value = self.build_value(ctx, token, offset, depth, enclosing)?;
                    if in_body {
                        node.body.push(value);
                    } else {
                        node.cond.push(value);
                    }
                }
            }
        }
    }
}

/// A registered word becomes a command reference, `NAME?` a help query for
/// a registered `NAME`, and anything else a string holding the word.
fn resolve_word(registry: &Registry, word: String) -> Value {
    if let Some(command) = registry.lookup(&word) {
        return Value::Command(CommandRef::new(command));
    }
    if let Some(base) = word.strip_suffix('?')
        && let Some(command) = registry.lookup(base)
    {
        return Value::Command(CommandRef::help_query(command));
    }
    Value::String(word)
}

/// Read all of `text` with imports disabled
pub fn read_str(registry: &Registry, namespace: &str, text: &str) -> Result<Vec<Value>, Error> {
    let ctx = ReadContext::new(registry, namespace, &NoImports);
    Reader::new("<string>", text).read_all(&ctx)
}
