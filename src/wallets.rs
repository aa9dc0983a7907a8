// src/wallets.rs
use eyre::{Result, WrapErr};
use std::path::Path;
use tracing::info;

/// Read the address list, one per line. Blank lines are kept as-is.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read address list {}", path.display()))?;

    let addresses = parse(&content);
    info!("Loaded {} addresses from {}", addresses.len(), path.display());
    Ok(addresses)
}

pub fn parse(content: &str) -> Vec<String> {
    content.lines().map(|line| line.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_trims_each_line() {
        let addresses = parse("0xaaa\n  0xbbb  \r\n\t0xccc\n");
        assert_eq!(addresses, vec!["0xaaa", "0xbbb", "0xccc"]);
    }

    #[test]
    fn test_blank_lines_are_not_filtered() {
        let addresses = parse("0xaaa\n\n   \n0xbbb");
        assert_eq!(addresses, vec!["0xaaa", "", "", "0xbbb"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0x1111\n0x2222\n").unwrap();

        let addresses = load(file.path()).unwrap();
        assert_eq!(addresses, vec!["0x1111", "0x2222"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load("/nonexistent/wallets.txt").is_err());
    }
}
