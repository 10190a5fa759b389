/* 📖 # Why group comments instead of matching single comments?

A Go doc comment usually spans several `//` lines, and a match should report the
whole block with the line it starts on. Comments are grouped the way the Go parser
groups them: a comment trailing code on the same line only absorbs further comments
on that line, and any other comment absorbs the following comments as long as no
blank line or code separates them.

Parsing goes through tree-sitter so comment-like text inside string literals is
never mistaken for a comment, and so a malformed file is reported instead of
silently yielding partial results.
*/

use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

use commentscan_base::error::{CommentscanError, ErrorKind};
use commentscan_base::{CommentscanResult, FilePath};

/// A run of adjacent comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    /// 1-based line of the first comment
    pub start_line: usize,
    /// 1-based line the last comment ends on
    pub end_line: usize,
    /// Comments exactly as written, joined with newlines
    pub raw_text: String,
    /// Comment text without markers or directives
    pub text: String,
}

pub struct CommentParser {
    parser: Parser,
    directive: Regex,
}

impl std::fmt::Debug for CommentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentParser").finish_non_exhaustive()
    }
}

impl CommentParser {
    pub fn new() -> CommentscanResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| commentscan_base::err!("Failed to load the Go grammar: {}", e))?;
        let directive = Regex::new(r"^[a-z0-9]+:[a-z0-9]")
            .map_err(|e| commentscan_base::err!("Invalid directive pattern: {}", e))?;
        Ok(Self { parser, directive })
    }

    /// Parse `source` and return its comment groups in source order.
    pub fn parse_comment_groups(
        &mut self,
        path: &FilePath,
        source: &str,
    ) -> CommentscanResult<Vec<CommentGroup>> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| commentscan_base::err!("Parsing {} did not produce a tree", path))?;
        let leaves = collect_leaves(&tree).map_err(|node| syntax_error(path, source, node))?;

        let mut groups = Vec::new();
        let mut pending: Option<PendingGroup> = None;
        let mut last_code_line: Option<usize> = None;
        let mut comment_since_code = false;

        for leaf in leaves {
            let text = &source[leaf.byte_range()];
            if leaf.kind() != "comment" {
                if text.trim().is_empty() {
                    continue;
                }
                if let Some(group) = pending.take() {
                    groups.push(self.finish(group));
                }
                last_code_line = Some(leaf.end_position().row + 1);
                comment_since_code = false;
                continue;
            }

            let comment = text.replace('\r', "");
            let line = leaf.start_position().row + 1;
            let end_line = line + comment.matches('\n').count();
            match pending.as_mut() {
                Some(group) if line <= group.end_line + group.slack => {
                    group.end_line = end_line;
                    group.comments.push(comment);
                }
                _ => {
                    if let Some(group) = pending.take() {
                        groups.push(self.finish(group));
                    }
                    let trails_code = !comment_since_code && last_code_line == Some(line);
                    pending = Some(PendingGroup {
                        start_line: line,
                        end_line,
                        slack: if trails_code { 0 } else { 1 },
                        comments: vec![comment],
                    });
                }
            }
            comment_since_code = true;
        }
        if let Some(group) = pending.take() {
            groups.push(self.finish(group));
        }
        Ok(groups)
    }

    fn finish(&self, group: PendingGroup) -> CommentGroup {
        CommentGroup {
            start_line: group.start_line,
            end_line: group.end_line,
            text: self.render(&group.comments),
            raw_text: group.comments.join("\n"),
        }
    }

    /// Comment markers and directive comments removed, blank lines normalised.
    fn render(&self, comments: &[String]) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for comment in comments {
            let body = if let Some(body) = comment.strip_prefix("//") {
                if let Some(stripped) = body.strip_prefix(' ') {
                    stripped
                } else if self.is_directive(body) {
                    continue;
                } else {
                    body
                }
            } else if let Some(body) = comment.strip_prefix("/*") {
                body.strip_suffix("*/").unwrap_or(body)
            } else {
                comment.as_str()
            };
            lines.extend(
                body.split('\n')
                    .map(|line| line.trim_end_matches([' ', '\t', '\n', '\r'])),
            );
        }

        let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
        for line in lines {
            if !line.is_empty() || kept.last().is_some_and(|previous| !previous.is_empty()) {
                kept.push(line);
            }
        }
        if kept.last().is_some_and(|last| !last.is_empty()) {
            kept.push("");
        }
        kept.join("\n")
    }

    fn is_directive(&self, body: &str) -> bool {
        body.starts_with("line ")
            || body.starts_with("extern ")
            || body.starts_with("export ")
            || self.directive.is_match(body)
    }
}

struct PendingGroup {
    start_line: usize,
    end_line: usize,
    /// How many lines may separate the next comment from the end of this group
    slack: usize,
    comments: Vec<String>,
}

/// Leaves in document order, or the first error node.
fn collect_leaves(tree: &Tree) -> Result<Vec<Node<'_>>, Node<'_>> {
    let check_errors = tree.root_node().has_error();
    let mut cursor = tree.walk();
    let mut leaves = Vec::new();
    loop {
        let node = cursor.node();
        if check_errors && (node.is_error() || node.is_missing()) {
            return Err(node);
        }
        if node.child_count() == 0 {
            leaves.push(node);
        } else if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Ok(leaves);
            }
        }
    }
}

fn syntax_error(path: &FilePath, source: &str, node: Node<'_>) -> Box<CommentscanError> {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing {}", node.kind())
    } else {
        let snippet: String = source[node.byte_range()]
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .chars()
            .take(24)
            .collect();
        if snippet.is_empty() {
            "unexpected end of file".to_string()
        } else {
            format!("unexpected `{}`", snippet)
        }
    };
    Box::new(CommentscanError::new(ErrorKind::Syntax {
        path: path.as_path().to_path_buf(),
        line: position.row + 1,
        column: position.column + 1,
        message,
    }))
}
