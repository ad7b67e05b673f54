//! First-run scaffolding and token loading.
//!
//! Makes sure the data directory and tokens file exist before any workflow
//! runs, and reads the tokens file into a list of OAuth tokens.

use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Header written to a freshly created tokens file.
const TOKENS_TEMPLATE: &str = "\
# followctl tokens file
# One OAuth token per line. Blank lines and lines starting with '#' are ignored.
# Tokens may be given with or without the 'oauth:' prefix.
";

/// Error type for bootstrap operations.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Could not create the data directory or tokens file.
    #[error("Failed to create {path}: {source}")]
    Create {
        /// Path that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Could not read the tokens file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// What [`ensure_layout`] had to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scaffold {
    /// The tokens file's parent directory was created.
    pub created_dir: bool,
    /// The tokens file was created from the template.
    pub created_tokens_file: bool,
}

/// Create the tokens file (and its parent directory) if missing.
///
/// Existing files are never touched.
pub fn ensure_layout(tokens_path: &Path) -> Result<Scaffold, BootstrapError> {
    let mut scaffold = Scaffold::default();

    if let Some(parent) = tokens_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| BootstrapError::Create {
                path: parent.to_path_buf(),
                source,
            })?;
            info!("Created data directory {}", parent.display());
            scaffold.created_dir = true;
        }
    }

    if !tokens_path.exists() {
        fs::write(tokens_path, TOKENS_TEMPLATE).map_err(|source| BootstrapError::Create {
            path: tokens_path.to_path_buf(),
            source,
        })?;
        info!("Created tokens file {}", tokens_path.display());
        scaffold.created_tokens_file = true;
    }

    Ok(scaffold)
}

/// Read all tokens from `tokens_path`.
pub fn load_tokens(tokens_path: &Path) -> Result<Vec<String>, BootstrapError> {
    let contents = fs::read_to_string(tokens_path).map_err(|source| BootstrapError::Read {
        path: tokens_path.to_path_buf(),
        source,
    })?;
    let tokens = parse_tokens(&contents);
    debug!("Loaded {} token(s) from {}", tokens.len(), tokens_path.display());
    Ok(tokens)
}

/// Parse the tokens file format.
///
/// One token per line; blank lines and `#` comments are skipped, surrounding
/// whitespace and an `oauth:` prefix are stripped, duplicates are dropped.
pub fn parse_tokens(contents: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let token = strip_oauth_prefix(trimmed);
        if token.is_empty() || tokens.iter().any(|t| t == token) {
            continue;
        }
        tokens.push(token.to_string());
    }
    tokens
}

fn strip_oauth_prefix(token: &str) -> &str {
    match token.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("oauth:") => &token[6..],
        _ => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_layout_creates_dir_and_file() {
        let temp = TempDir::new().unwrap();
        let tokens = temp.path().join(".followctl/tokens.txt");

        let scaffold = ensure_layout(&tokens).unwrap();

        assert!(scaffold.created_dir);
        assert!(scaffold.created_tokens_file);
        assert!(tokens.exists());
        let contents = fs::read_to_string(&tokens).unwrap();
        assert!(contents.starts_with("# followctl tokens file"));
        assert!(parse_tokens(&contents).is_empty());
    }

    #[test]
    fn test_ensure_layout_leaves_existing_file() {
        let temp = TempDir::new().unwrap();
        let tokens = temp.path().join("tokens.txt");
        fs::write(&tokens, "abc123\n").unwrap();

        let scaffold = ensure_layout(&tokens).unwrap();

        assert_eq!(scaffold, Scaffold::default());
        assert_eq!(fs::read_to_string(&tokens).unwrap(), "abc123\n");
    }

    #[test]
    fn test_load_tokens_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_tokens(&temp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, BootstrapError::Read { .. }));
        assert!(err.to_string().contains("nope.txt"));
    }

    #[test]
    fn test_load_tokens_reads_file() {
        let temp = TempDir::new().unwrap();
        let tokens = temp.path().join("tokens.txt");
        fs::write(&tokens, "one\ntwo\n").unwrap();
        assert_eq!(load_tokens(&tokens).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_parse_tokens_skips_comments_and_blanks() {
        let contents = "# header\n\n  abc  \n# another\ndef\n";
        assert_eq!(parse_tokens(contents), vec!["abc", "def"]);
    }

    #[test]
    fn test_parse_tokens_strips_oauth_prefix() {
        let contents = "oauth:abc\nOAuth:def\noauthghi\n";
        assert_eq!(parse_tokens(contents), vec!["abc", "def", "oauthghi"]);
    }

    #[test]
    fn test_parse_tokens_drops_duplicates() {
        let contents = "abc\noauth:abc\ndef\nabc\n";
        assert_eq!(parse_tokens(contents), vec!["abc", "def"]);
    }

    #[test]
    fn test_parse_tokens_bare_prefix_is_skipped() {
        assert!(parse_tokens("oauth:\n").is_empty());
    }
}
