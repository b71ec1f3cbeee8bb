// Batch Input
// Reads expression batches from text, one assignment per line

use std::fs;
use std::io;
use std::path::Path;

/// Split batch text into expressions.
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn parse_batch(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a batch file
pub fn read_batch(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_batch(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_batch() {
        let text = "# setup\na = 1\n\n   b = a + 1  \n# done\n";
        assert_eq!(parse_batch(text), vec!["a = 1", "b = a + 1"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_batch("\n  \n# only comments\n").is_empty());
    }

    #[test]
    fn test_read_batch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x = 5").unwrap();
        writeln!(file, "x += 3").unwrap();

        assert_eq!(read_batch(file.path()).unwrap(), vec!["x = 5", "x += 3"]);
    }

    #[test]
    fn test_read_missing_batch() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_batch(dir.path().join("missing.calc")).is_err());
    }
}
