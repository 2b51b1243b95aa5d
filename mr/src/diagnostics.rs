//! Commit-lint diagnostics
//!
//! Every kind of lint finding is one variant of [`Issue`]. Formatting is an
//! exhaustive match, so a new kind does not compile until it has a message.

use std::fmt;
use std::path::{Path, PathBuf};

use markstore::Hash;

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Ways a tag commit message can be malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCommitError {
    TooManyLines,
    BadFormat,
    TooManyChanges,
    TagDiffers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceKind {
    Tab,
    CarriageReturn,
    Trailing,
}

impl WhitespaceKind {
    fn describe(self) -> &'static str {
        match self {
            WhitespaceKind::Tab => "tab",
            WhitespaceKind::CarriageReturn => "carriage return",
            WhitespaceKind::Trailing => "trailing whitespace",
        }
    }
}

/// One offending character, `index` counts characters of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitespaceError {
    pub kind: WhitespaceKind,
    pub index: usize,
}

/// Inclusive run of errors of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitespaceRange {
    pub kind: WhitespaceKind,
    pub start: usize,
    pub end: usize,
}

/// Merge adjacent errors of the same kind. Input must be ordered by index.
pub fn merge_ranges(errors: &[WhitespaceError]) -> Vec<WhitespaceRange> {
    let mut merged: Vec<WhitespaceRange> = Vec::new();
    for error in errors {
        match merged.last_mut() {
            Some(last) if last.kind == error.kind && error.index == last.end + 1 => last.end = error.index,
            _ => merged.push(WhitespaceRange {
                kind: error.kind,
                start: error.index,
                end: error.index,
            }),
        }
    }
    merged
}

/// A lint finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    DuplicateIssues { id: String, others: Vec<Hash> },
    Tag { name: String },
    Branch { name: String },
    SelfReview,
    TooFewReviewers { required: usize, actual: usize },
    InvalidReviewers { invalid: Vec<String> },
    MergeMessage { expected: String },
    TagCommit(TagCommitError),
    Committer { committer: String, project: String },
    Whitespace {
        path: PathBuf,
        row: usize,
        line: String,
        errors: Vec<WhitespaceError>,
    },
    Message { additional: Vec<String> },
    Issues { message: Vec<String> },
    Executable { path: PathBuf },
    AuthorName,
    AuthorEmail,
    CommitterName,
    CommitterEmail { domain: String },
    Blacklist,
    Binary { path: PathBuf },
}

impl Issue {
    /// Kinds that only make sense against the server's view of a change
    pub fn server_only(&self) -> bool {
        matches!(
            self,
            Issue::Branch { .. }
                | Issue::TooFewReviewers { .. }
                | Issue::InvalidReviewers { .. }
                | Issue::CommitterEmail { .. }
        )
    }
}

/// An issue with the check that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub check: String,
    pub severity: Severity,
    /// Offending commit, absent for repository-wide findings
    pub commit: Option<Hash>,
    pub issue: Issue,
}

/// Formats diagnostics as plain lines
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    local: bool,
}

impl Formatter {
    /// `local` suppresses the server-only kinds
    pub fn new(local: bool) -> Self {
        Self { local }
    }

    fn header(d: &Diagnostic, message: &str) -> String {
        match &d.commit {
            Some(hash) => format!("[{}] {}: {}: {}", d.check, d.severity, hash.abbreviate(), message),
            None => format!("[{}] {}: {}", d.check, d.severity, message),
        }
    }

    /// Lines describing `d`; empty when the kind is suppressed
    pub fn format(&self, d: &Diagnostic) -> Vec<String> {
        if self.local && d.issue.server_only() {
            return Vec::new();
        }
        let line = |message: String| vec![Self::header(d, &message)];

        match &d.issue {
            Issue::DuplicateIssues { id, others } => {
                let hash = d.commit.as_ref().map(Hash::abbreviate).unwrap_or("<unknown>");
                let mut lines = line(format!("issue id '{}' in commit {} is already used in commits:", id, hash));
                lines.extend(others.iter().map(|h| format!("         - {}", h.abbreviate())));
                lines
            }
            Issue::Tag { name } => line(format!("illegal tag name: {}", name)),
            Issue::Branch { name } => line(format!("illegal branch name: {}", name)),
            Issue::SelfReview => line("self-reviews are not allowed".to_string()),
            Issue::TooFewReviewers { required, actual } => {
                let noun = if *required == 1 { "reviewer" } else { "reviewers" };
                line(format!("{} {} required, found {}", required, noun, actual))
            }
            Issue::InvalidReviewers { invalid } => {
                let verb = if invalid.len() == 1 { "is" } else { "are" };
                line(format!("{} {} not part of OpenJDK", invalid.join(", "), verb))
            }
            Issue::MergeMessage { expected } => line(format!(
                "merge commits should only use the commit message '{}'",
                expected
            )),
            Issue::TagCommit(error) => line(
                match error {
                    TagCommitError::TooManyLines => "message should only be one line",
                    TagCommitError::BadFormat => {
                        "message should be of format 'Added tag <tag> for changeset <hash>'"
                    }
                    TagCommitError::TooManyChanges => "should only add one line to .hgtags",
                    TagCommitError::TagDiffers => "tag differs in commit message and .hgtags",
                }
                .to_string(),
            ),
            Issue::Committer { committer, project } => {
                line(format!("{} is not committer in project {}", committer, project))
            }
            Issue::Whitespace {
                path,
                row,
                line: text,
                errors,
            } => whitespace(d, path, *row, text, errors),
            Issue::Message { additional } => {
                let mut lines = line("contains additional lines in commit message".to_string());
                lines.extend(additional.iter().map(|l| format!("> {}", l)));
                lines
            }
            Issue::Issues { message } => {
                let mut lines = line("missing reference to JBS issue in commit message".to_string());
                lines.extend(message.iter().map(|l| format!("> {}", l)));
                lines
            }
            Issue::Executable { path } => line(format!("file {} is executable", path.display())),
            Issue::AuthorName => line("missing author name".to_string()),
            Issue::AuthorEmail => line("missing author email".to_string()),
            Issue::CommitterName => line("missing committer name".to_string()),
            Issue::CommitterEmail { domain } => line(format!("missing committer email from domain {}", domain)),
            Issue::Blacklist => line("commit is blacklisted".to_string()),
            Issue::Binary { path } => line(format!("adds binary file: {}", path.display())),
        }
    }
}

fn escape(c: char) -> Option<&'static str> {
    match c {
        '\t' => Some("\\t"),
        '\r' => Some("\\r"),
        _ => None,
    }
}

/// Message, escaped line and a caret line pointing at the offending characters
fn whitespace(d: &Diagnostic, path: &Path, row: usize, text: &str, errors: &[WhitespaceError]) -> Vec<String> {
    let hash = d.commit.as_ref().map(Hash::abbreviate).unwrap_or("<unknown>");
    let prefix = format!("{}: {}: ", d.severity, hash);
    let indent = " ".repeat(prefix.chars().count());

    let ranges = merge_ranges(errors);
    let mut kinds: Vec<&str> = Vec::new();
    for range in &ranges {
        let kind = range.kind.describe();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    let describe = format!("Whitespace error ({})", kinds.join(", "));

    let mut escaped = String::new();
    let mut hints = String::new();
    for (index, c) in text.chars().enumerate() {
        let shown = escape(c).map(str::to_string).unwrap_or_else(|| c.to_string());
        let marked = ranges.iter().any(|r| r.start <= index && index <= r.end);
        let mark = if marked { '^' } else { ' ' };
        hints.extend(std::iter::repeat_n(mark, shown.chars().count()));
        escaped.push_str(&shown);
    }

    vec![
        format!("{}{} in {}:{}", prefix, describe, path.display(), row),
        format!("{}{}", indent, escaped),
        format!("{}{}", indent, hints.trim_end()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> Hash {
        Hash::parse("0123456789abcdef0123456789abcdef01234567").unwrap()
    }

    fn diagnostic(issue: Issue) -> Diagnostic {
        Diagnostic {
            check: "reviewers".to_string(),
            severity: Severity::Error,
            commit: Some(hash()),
            issue,
        }
    }

    fn every_kind() -> Vec<Issue> {
        vec![
            Issue::DuplicateIssues {
                id: "8000000".to_string(),
                others: vec![hash()],
            },
            Issue::Tag { name: "bad tag".to_string() },
            Issue::Branch { name: "bad".to_string() },
            Issue::SelfReview,
            Issue::TooFewReviewers { required: 1, actual: 0 },
            Issue::InvalidReviewers {
                invalid: vec!["foo".to_string()],
            },
            Issue::MergeMessage {
                expected: "Merge".to_string(),
            },
            Issue::TagCommit(TagCommitError::TooManyLines),
            Issue::TagCommit(TagCommitError::BadFormat),
            Issue::TagCommit(TagCommitError::TooManyChanges),
            Issue::TagCommit(TagCommitError::TagDiffers),
            Issue::Committer {
                committer: "duke".to_string(),
                project: "jdk".to_string(),
            },
            Issue::Whitespace {
                path: PathBuf::from("README"),
                row: 3,
                line: "a\tb ".to_string(),
                errors: vec![
                    WhitespaceError {
                        kind: WhitespaceKind::Tab,
                        index: 1,
                    },
                    WhitespaceError {
                        kind: WhitespaceKind::Trailing,
                        index: 3,
                    },
                ],
            },
            Issue::Message {
                additional: vec!["extra".to_string()],
            },
            Issue::Issues {
                message: vec!["Fix".to_string()],
            },
            Issue::Executable {
                path: PathBuf::from("run.sh"),
            },
            Issue::AuthorName,
            Issue::AuthorEmail,
            Issue::CommitterName,
            Issue::CommitterEmail {
                domain: "openjdk.org".to_string(),
            },
            Issue::Blacklist,
            Issue::Binary {
                path: PathBuf::from("a.bin"),
            },
        ]
    }

    #[test]
    fn test_every_kind_formats() {
        let formatter = Formatter::new(false);
        for issue in every_kind() {
            let lines = formatter.format(&diagnostic(issue.clone()));
            assert!(!lines.is_empty(), "{:?}", issue);
        }
    }

    #[test]
    fn test_local_suppresses_server_only_kinds() {
        let formatter = Formatter::new(true);
        let suppressed: Vec<Issue> = every_kind()
            .into_iter()
            .filter(|i| formatter.format(&diagnostic(i.clone())).is_empty())
            .collect();
        assert_eq!(suppressed.len(), 4);
        assert!(suppressed.iter().all(Issue::server_only));
    }

    #[test]
    fn test_header_format() {
        let lines = Formatter::new(false).format(&diagnostic(Issue::TooFewReviewers { required: 2, actual: 1 }));
        assert_eq!(lines, vec!["[reviewers] ERROR: 01234567: 2 reviewers required, found 1"]);
    }

    #[test]
    fn test_header_without_commit() {
        let mut d = diagnostic(Issue::Tag { name: "x".to_string() });
        d.commit = None;
        d.severity = Severity::Warning;
        assert_eq!(Formatter::new(false).format(&d), vec!["[reviewers] WARNING: illegal tag name: x"]);
    }

    #[test]
    fn test_duplicate_issues_lists_commits() {
        let lines = Formatter::new(false).format(&diagnostic(Issue::DuplicateIssues {
            id: "1".to_string(),
            others: vec![hash(), hash()],
        }));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "         - 01234567");
    }

    #[test]
    fn test_merge_ranges() {
        let e = |kind, index| WhitespaceError { kind, index };
        let ranges = merge_ranges(&[
            e(WhitespaceKind::Tab, 0),
            e(WhitespaceKind::Tab, 1),
            e(WhitespaceKind::Trailing, 2),
            e(WhitespaceKind::Trailing, 3),
            e(WhitespaceKind::Trailing, 5),
        ]);
        assert_eq!(
            ranges,
            vec![
                WhitespaceRange {
                    kind: WhitespaceKind::Tab,
                    start: 0,
                    end: 1
                },
                WhitespaceRange {
                    kind: WhitespaceKind::Trailing,
                    start: 2,
                    end: 3
                },
                WhitespaceRange {
                    kind: WhitespaceKind::Trailing,
                    start: 5,
                    end: 5
                },
            ]
        );
        assert!(merge_ranges(&[]).is_empty());
    }

    #[test]
    fn test_whitespace_hints_align_with_escaped_line() {
        let lines = Formatter::new(false).format(&diagnostic(Issue::Whitespace {
            path: PathBuf::from("README"),
            row: 3,
            line: "a\tb ".to_string(),
            errors: vec![
                WhitespaceError {
                    kind: WhitespaceKind::Tab,
                    index: 1,
                },
                WhitespaceError {
                    kind: WhitespaceKind::Trailing,
                    index: 3,
                },
            ],
        }));
        let indent = " ".repeat("ERROR: 01234567: ".len());
        assert_eq!(
            lines[0],
            "ERROR: 01234567: Whitespace error (tab, trailing whitespace) in README:3"
        );
        assert_eq!(lines[1], format!("{}a\\tb ", indent));
        assert_eq!(lines[2], format!("{} ^^ ^", indent));
    }
}
