/* 📖 # Why does a binary-only marker discard the whole file?

A package distributed as compiled archives only ships stub sources whose comments
say nothing about the real code. Once a comment group carries the
`go:binary-only-package` marker the file's matches are meaningless, so extraction
stops and reports `FileScan::BinaryOnly` instead of a partial result. The caller
decides what that means for the rest of the package.
*/

use tracing::{debug, info, instrument};

use commentscan_base::{CommentscanResult, FilePath, PalHandle};

use crate::comment_parser::{CommentGroup, CommentParser};
use crate::model::{CommentMatch, TokenMatches};

/// Marker declaring a binary-only package.
pub const BINARY_ONLY_SENTINEL: &str = "go:binary-only-package";

/// Outcome of scanning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileScan {
    /// Matches per token, tokens without matches are absent
    Matches(TokenMatches),
    /// The file carries the binary-only marker
    BinaryOnly,
}

/// Test comment groups against the tokens, in group order and then token order.
pub fn match_comment_groups(
    file_name: &str,
    groups: &[CommentGroup],
    tokens: &[String],
) -> FileScan {
    let mut matches = TokenMatches::new();
    for group in groups {
        if group.raw_text.contains(BINARY_ONLY_SENTINEL) {
            return FileScan::BinaryOnly;
        }
        for token in tokens {
            if group.text.contains(token.as_str()) {
                matches
                    .entry(token.clone())
                    .or_default()
                    .push(CommentMatch {
                        file_name: file_name.to_string(),
                        line_number: group.start_line,
                        line_content: group.text.clone(),
                    });
            }
        }
    }
    FileScan::Matches(matches)
}

/// Read, parse and match a single file.
#[instrument(skip(pal, parser, tokens), fields(file = %path))]
pub fn extract_file(
    pal: &PalHandle,
    parser: &mut CommentParser,
    path: &FilePath,
    tokens: &[String],
) -> CommentscanResult<FileScan> {
    debug!("extracting comments");
    let source = pal.read_file_to_string(path)?;
    let groups = parser.parse_comment_groups(path, &source)?;
    let scan = match_comment_groups(&path.to_string(), &groups, tokens);
    match &scan {
        FileScan::BinaryOnly => info!("found binary-only marker"),
        FileScan::Matches(matches) => debug!(
            groups = groups.len(),
            matched_tokens = matches.len(),
            "extracted comments"
        ),
    }
    Ok(scan)
}
