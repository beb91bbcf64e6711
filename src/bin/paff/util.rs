use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use paff::Container;

pub fn decode_value_arg(arg: &str) -> Result<(Vec<u8>, &'static str)> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok((buf, "stdin"));
    }
    if let Some(p) = arg.strip_prefix('@') {
        return Ok((read_all(&PathBuf::from(p))?, "file"));
    }
    if let Some(hx) = arg.strip_prefix("hex:") {
        let v = hex::decode(hx.trim()).map_err(|e| anyhow!("invalid hex value: {}", e))?;
        return Ok((v, "hex"));
    }
    Ok((arg.as_bytes().to_vec(), "literal"))
}

pub fn read_all(p: &Path) -> Result<Vec<u8>> {
    std::fs::read(p).with_context(|| format!("read {}", p.display()))
}

/// Map a signed CLI index onto the library's index type.
pub fn to_index(c: &Container, index: i64) -> Result<usize> {
    usize::try_from(index)
        .map_err(|_| anyhow!("partition index {} out of range (count {})", index, c.len()))
}

pub fn display_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => format!("(binary {} B)", bytes.len()),
    }
}

pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let line: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        out.push_str(&line.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_arg_forms() {
        assert_eq!(decode_value_arg("abc").unwrap(), (b"abc".to_vec(), "literal"));
        assert_eq!(decode_value_arg("hex:00ff").unwrap(), (vec![0, 255], "hex"));
        assert!(decode_value_arg("hex:0").is_err());
    }

    #[test]
    fn hex_dump_wraps_at_16() {
        let s = hex_dump(&[0xab; 17]);
        assert_eq!(s.lines().count(), 2);
        assert!(s.starts_with("ab ab"));
    }
}
