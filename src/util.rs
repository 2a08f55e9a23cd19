use crate::config::Hashing;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// Hash an input file for job identity. `fast_2x16mb` hashes the head and tail
/// windows plus the length, which is enough to tell uploads apart without
/// reading multi-gigabyte scans end to end.
pub fn hash_file(hashing: &Hashing, path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = f.metadata().with_context(|| "metadata")?.len();

    let mut h = Sha256::new();
    match hashing.mode.as_str() {
        "full_sha256" => {
            let mut buf = vec![0u8; 1024 * 1024];
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                h.update(&buf[..n]);
            }
        }
        "fast_2x16mb" => {
            let w = hashing.fast_window_bytes.min(size);
            if w > 0 {
                hash_window(&mut h, &mut f, 0, w)?;
                if size > w {
                    hash_window(&mut h, &mut f, size - w, w)?;
                }
            }
            h.update(size.to_le_bytes());
        }
        other => anyhow::bail!("unknown hashing.mode: {other}"),
    }
    Ok(format!("{:x}", h.finalize()))
}

fn hash_window(h: &mut Sha256, f: &mut File, offset: u64, len: u64) -> Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    f.read_exact(&mut buf)?;
    h.update(&buf);
    Ok(())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
