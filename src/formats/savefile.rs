//! Persisted selection tokens.
//!
//! The save file stores gene names each followed by a literal `||`:
//!
//! ```text
//! g1||g2||
//! ```
//!
//! Readers must tolerate empty tokens (the trailing one in particular).

use std::fs;
use std::io;
use std::path::PathBuf;

/// Token separator.
pub const DELIMITER: &str = "||";

/// Encodes tokens as `a||b||`.
pub fn encode_tokens<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for token in tokens {
        out.push_str(token.as_ref());
        out.push_str(DELIMITER);
    }
    out
}

/// Splits saved content into tokens, skipping empty ones.
pub fn decode_tokens(content: &str) -> Vec<String> {
    content
        .split(DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where the selection is persisted.
///
/// The session writes through this trait so headless runs and tests do not
/// need a dataset directory.
pub trait SaveStore {
    /// Reads the persisted tokens.
    fn load(&self) -> io::Result<Vec<String>>;
    /// Replaces the persisted tokens.
    fn store(&mut self, tokens: &[String]) -> io::Result<()>;
}

/// `savefile.txt` inside a dataset directory.
#[derive(Debug, Clone)]
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SaveStore for SaveFile {
    fn load(&self) -> io::Result<Vec<String>> {
        Ok(decode_tokens(&fs::read_to_string(&self.path)?))
    }

    fn store(&mut self, tokens: &[String]) -> io::Result<()> {
        fs::write(&self.path, encode_tokens(tokens))
    }
}

/// Save store kept in memory, holding the encoded text.
#[derive(Debug, Clone, Default)]
pub struct MemorySave {
    pub content: Option<String>,
}

impl SaveStore for MemorySave {
    fn load(&self) -> io::Result<Vec<String>> {
        match &self.content {
            Some(content) => Ok(decode_tokens(content)),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "nothing saved yet")),
        }
    }

    fn store(&mut self, tokens: &[String]) -> io::Result<()> {
        self.content = Some(encode_tokens(tokens));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode_tokens(["g1", "g2"]), "g1||g2||");
        assert_eq!(encode_tokens(Vec::<String>::new()), "");
    }

    #[test]
    fn test_decode_tolerates_empty_tokens() {
        assert_eq!(decode_tokens("g1||g2||"), vec!["g1", "g2"]);
        assert_eq!(decode_tokens("g1||||g2"), vec!["g1", "g2"]);
        assert_eq!(decode_tokens("||g1\n"), vec!["g1"]);
        assert!(decode_tokens("").is_empty());
    }

    #[test]
    fn test_save_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut save = SaveFile::new(dir.path().join("savefile.txt"));
        assert!(save.load().is_err());

        save.store(&["g1".to_string(), "g2".to_string()]).unwrap();
        assert_eq!(fs::read_to_string(save.path()).unwrap(), "g1||g2||");
        assert_eq!(save.load().unwrap(), vec!["g1", "g2"]);
    }
}
