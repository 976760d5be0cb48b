// corpus.rs: Line-oriented corpus files.
//
// Token and type lists are plain UTF-8, one item per line. Lines are trimmed and
// blank lines dropped; nothing else is validated. Outputs are written atomically.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;

/// Read a one-item-per-line list file.
pub fn read_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_list(BufReader::new(file)).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse list lines from any reader. Trims each line (including a trailing `\r`)
/// and skips lines that are empty after trimming.
pub fn parse_list<R: BufRead>(reader: R) -> anyhow::Result<Vec<String>> {
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let item = line.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
    Ok(items)
}

/// Write `body` to `dest` via a `.tmp` sibling and rename, so a crash never leaves
/// a truncated file under the final name.
pub fn write_atomic(dest: &Path, body: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir {}", parent.display()))?;
    }

    let tmp_path = dest.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(body)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, dest)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), dest.display()))?;

    Ok(())
}
