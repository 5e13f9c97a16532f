use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Parsed `KEY=VALUE` override file.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    pub values: HashMap<String, String>,
    pub warnings: Vec<String>,
}

/// Blank lines and `#` comments are ignored, quotes around a value are
/// stripped, and lines without `=` are reported as warnings. Later
/// duplicates win.
pub fn parse_env_file(content: &str) -> EnvFile {
    let mut out = EnvFile::default();
    for (idx, line) in content.lines().enumerate() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((key, value)) = s.split_once('=') else {
            out.warnings
                .push(format!("override file line {}: expected KEY=VALUE, skipped", idx + 1));
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            out.warnings
                .push(format!("override file line {}: empty key, skipped", idx + 1));
            continue;
        }
        let value = value.trim().trim_matches('\'').trim_matches('"');
        out.values.insert(key.to_string(), value.to_string());
    }
    out
}

/// Returns `Ok(None)` when the file does not exist.
pub fn load_env_file(path: &Path) -> io::Result<Option<EnvFile>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_env_file(&content))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
