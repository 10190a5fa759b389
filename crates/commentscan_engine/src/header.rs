/* 📖 # Why read file headers before parsing whole files?

Deciding whether a file belongs to the package only needs the leading comments and
the `package`/`import` clauses. Reading just that part keeps resolution cheap and
leaves the full syntax tree to the files that actually get scanned.

A build constraint only counts while it sits in the header: `// +build` lines must
also be followed by a blank line, so only those before the last blank line of the
header are considered. `//go:build` lines count anywhere in the header.
*/

use std::path::Path;

use commentscan_base::error::{CommentscanError, ErrorKind};
use commentscan_base::{CommentscanResult, FilePath};

use crate::build_context::BuildContext;
use crate::constraint::{is_go_build, is_plus_build, parse_go_build, parse_plus_build};

/// What the header of a Go source file declares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileHeader {
    pub package_name: String,
    /// The `//go:build` line, if present
    pub go_build: Option<String>,
    /// `// +build` lines before the last blank line of the header
    pub plus_build: Vec<String>,
    /// Import paths, unquoted
    pub imports: Vec<String>,
}

impl FileHeader {
    /// Whether the file is compiled under `context`.
    ///
    /// A `//go:build` line takes precedence over `// +build` lines.
    pub fn should_build(&self, context: &BuildContext, path: &FilePath) -> CommentscanResult<bool> {
        let has_tag = |tag: &str| context.match_tag(tag);
        if let Some(line) = &self.go_build {
            let expr = parse_go_build(line).map_err(|message| {
                invalid_constraint(path, format!("parsing //go:build line: {}", message))
            })?;
            return Ok(expr.eval(&has_tag));
        }
        for line in &self.plus_build {
            let expr = parse_plus_build(line).map_err(|message| {
                invalid_constraint(path, format!("parsing // +build line: {}", message))
            })?;
            if !expr.eval(&has_tag) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Files importing the pseudo package `C` need cgo.
    pub fn is_cgo(&self) -> bool {
        self.imports.iter().any(|import| import == "C")
    }
}

fn invalid_constraint(path: &FilePath, message: String) -> Box<CommentscanError> {
    Box::new(CommentscanError::new(ErrorKind::InvalidBuildConstraint {
        path: path.as_path().to_path_buf(),
        message,
    }))
}

/// Read the build constraints, package clause and imports of a Go source file.
pub fn parse_file_header(path: &FilePath, source: &str) -> CommentscanResult<FileHeader> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (constraint_region, go_build) = scan_comment_header(source)
        .map_err(|message| invalid_constraint(path, message))?;
    let plus_build = constraint_region
        .lines()
        .map(str::trim)
        .filter(|line| is_plus_build(line))
        .map(str::to_string)
        .collect();

    let (package_name, imports) = read_clauses(path.as_path(), source)?;
    Ok(FileHeader {
        package_name,
        go_build,
        plus_build,
        imports,
    })
}

/// Returns the header up to its last blank line and the `//go:build` line.
fn scan_comment_header(source: &str) -> Result<(&str, Option<String>), String> {
    let mut end = 0;
    let mut offset = 0;
    let mut ended = false;
    let mut in_block_comment = false;
    let mut go_build: Option<String> = None;

    'lines: for raw_line in source.split_inclusive('\n') {
        offset += raw_line.len();
        let mut line = raw_line.trim();
        if line.is_empty() && !ended {
            end = offset;
            continue;
        }
        if !line.starts_with("//") {
            ended = true;
        }
        if !in_block_comment && is_go_build(line) {
            if go_build.is_some() {
                return Err("multiple //go:build comments".to_string());
            }
            go_build = Some(line.to_string());
        }

        while !line.is_empty() {
            if in_block_comment {
                match line.find("*/") {
                    Some(index) => {
                        in_block_comment = false;
                        line = line[index + 2..].trim();
                        continue;
                    }
                    None => continue 'lines,
                }
            }
            if line.starts_with("//") {
                continue 'lines;
            }
            if let Some(rest) = line.strip_prefix("/*") {
                in_block_comment = true;
                line = rest.trim();
                continue;
            }
            break 'lines;
        }
    }
    Ok((&source[..end], go_build))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Str(_) => "string literal".to_string(),
            Token::Punct(c) => format!("'{}'", c),
            Token::Eof => "'EOF'".to_string(),
        }
    }
}

struct Positioned {
    token: Token,
    line: usize,
    column: usize,
}

/// Just enough of a Go lexer to read package and import clauses.
struct Lexer<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn rest(&self) -> &str {
        &self.source[self.position..]
    }

    fn error(&self, line: usize, column: usize, message: &str) -> (usize, usize, String) {
        (line, column, message.to_string())
    }

    fn skip_trivia(&mut self) -> Result<(), (usize, usize, String)> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.rest().starts_with("/*") => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        if self.rest().starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(self.error(line, column, "comment not terminated"));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Positioned, (usize, usize, String)> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let positioned = |token| Positioned {
            token,
            line,
            column,
        };
        let Some(c) = self.bump() else {
            return Ok(positioned(Token::Eof));
        };
        if c.is_alphanumeric() || c == '_' {
            let mut ident = String::from(c);
            while let Some(next) = self.peek_char() {
                if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                ident.push(next);
                self.bump();
            }
            return Ok(positioned(Token::Ident(ident)));
        }
        match c {
            '"' => {
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some('\n') | None => {
                            return Err(self.error(line, column, "string literal not terminated"));
                        }
                        Some(other) => value.push(other),
                    }
                }
                Ok(positioned(Token::Str(value)))
            }
            '`' => {
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('`') => break,
                        None => {
                            return Err(self.error(
                                line,
                                column,
                                "raw string literal not terminated",
                            ));
                        }
                        Some(other) => value.push(other),
                    }
                }
                Ok(positioned(Token::Str(value)))
            }
            other => Ok(positioned(Token::Punct(other))),
        }
    }
}

fn read_clauses(path: &Path, source: &str) -> CommentscanResult<(String, Vec<String>)> {
    let syntax_error = |(line, column, message): (usize, usize, String)| {
        Box::new(CommentscanError::new(ErrorKind::Syntax {
            path: path.to_path_buf(),
            line,
            column,
            message,
        }))
    };
    let expected = |what: &str, found: &Positioned| {
        syntax_error((
            found.line,
            found.column,
            format!("expected {}, found {}", what, found.token.describe()),
        ))
    };

    let mut lexer = Lexer::new(source);
    let keyword = lexer.next_token().map_err(syntax_error)?;
    if keyword.token != Token::Ident("package".to_string()) {
        return Err(expected("'package'", &keyword));
    }
    let name = lexer.next_token().map_err(syntax_error)?;
    let Token::Ident(package_name) = name.token.clone() else {
        return Err(expected("package name", &name));
    };

    let mut imports = Vec::new();
    let mut next = lexer.next_token().map_err(syntax_error)?;
    loop {
        match &next.token {
            Token::Punct(';') => {}
            Token::Ident(keyword) if keyword == "import" => {
                let first = lexer.next_token().map_err(syntax_error)?;
                if first.token == Token::Punct('(') {
                    loop {
                        let spec = lexer.next_token().map_err(syntax_error)?;
                        match spec.token {
                            Token::Punct(')') => break,
                            Token::Punct(';') => continue,
                            _ => imports.push(
                                read_import_spec(&mut lexer, spec)
                                    .map_err(syntax_error)?
                                    .map_err(|found| expected("import path", &found))?,
                            ),
                        }
                    }
                } else {
                    imports.push(
                        read_import_spec(&mut lexer, first)
                            .map_err(syntax_error)?
                            .map_err(|found| expected("import path", &found))?,
                    );
                }
            }
            _ => break,
        }
        next = lexer.next_token().map_err(syntax_error)?;
    }
    Ok((package_name, imports))
}

/// Reads `[name] "path"`, the outer error is a lexing failure, the inner one an unexpected token.
fn read_import_spec(
    lexer: &mut Lexer<'_>,
    first: Positioned,
) -> Result<Result<String, Positioned>, (usize, usize, String)> {
    let path_token = match first.token {
        Token::Ident(_) | Token::Punct('.') => lexer.next_token()?,
        _ => first,
    };
    match path_token.token {
        Token::Str(path) => Ok(Ok(path)),
        _ => Ok(Err(path_token)),
    }
}
