//! Mark and commit hash types

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Error returned when a string is not a valid commit hash
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid commit hash '{0}'")]
pub struct HashError(pub String);

/// Hexadecimal commit identifier, normalised to lowercase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(String);

impl Hash {
    /// Parse a hex string into a hash
    pub fn parse(hex: &str) -> Result<Self, HashError> {
        let trimmed = hex.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError(hex.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Full hex representation
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Short form used in diagnostics
    pub fn abbreviate(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link between one source commit and the target commit it was translated into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mark {
    pub key: u32,
    pub source: Hash,
    pub target: Hash,
}

impl Mark {
    pub fn new(key: u32, source: Hash, target: Hash) -> Self {
        Self { key, source, target }
    }

    /// Parse one `<key> <target> <source>` line
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, StoreError> {
        let parse_err = |reason: String| StoreError::Parse { line: line_no, reason };

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() != 3 {
            return Err(parse_err(format!("expected 3 fields, found {}", words.len())));
        }

        let key = words[0]
            .parse::<u32>()
            .map_err(|e| parse_err(format!("bad key '{}': {}", words[0], e)))?;
        let target = Hash::parse(words[1]).map_err(|e| parse_err(e.to_string()))?;
        let source = Hash::parse(words[2]).map_err(|e| parse_err(e.to_string()))?;

        Ok(Self { key, source, target })
    }

    /// Serialize as one newline-terminated line
    pub fn to_line(&self) -> String {
        format!("{} {} {}\n", self.key, self.target, self.source)
    }
}

/// Parse the full contents of a marks file, skipping blank lines
pub(crate) fn parse_marks(content: &str) -> Result<Vec<Mark>, StoreError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| Mark::parse_line(line, idx + 1))
        .collect()
}

/// Render marks as file contents
pub(crate) fn format_marks(marks: &[Mark]) -> String {
    marks.iter().map(Mark::to_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "1111111111111111111111111111111111111111";
    const DST: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn test_hash_normalises_case() {
        let hash = Hash::parse("ABCDEF0123").unwrap();
        assert_eq!(hash.hex(), "abcdef0123");
        assert_eq!(hash.abbreviate(), "abcdef01");
    }

    #[test]
    fn test_hash_rejects_garbage() {
        assert!(Hash::parse("").is_err());
        assert!(Hash::parse("xyz").is_err());
        assert!(Hash::parse("12 34").is_err());
    }

    #[test]
    fn test_line_field_order_is_key_target_source() {
        let mark = Mark::parse_line(&format!("7 {} {}", DST, SRC), 1).unwrap();
        assert_eq!(mark.key, 7);
        assert_eq!(mark.target.hex(), DST);
        assert_eq!(mark.source.hex(), SRC);
        assert_eq!(mark.to_line(), format!("7 {} {}\n", DST, SRC));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let content = format!("1 {} {}\n\nbogus line\n", DST, SRC);
        match parse_marks(&content) {
            Err(StoreError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let content = format!("\n1 {} {}\n\n", DST, SRC);
        let marks = parse_marks(&content).unwrap();
        assert_eq!(marks.len(), 1);
    }
}
