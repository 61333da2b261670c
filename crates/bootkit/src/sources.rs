//! Upstream tarball locations.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArchive {
    pub url: String,
    /// Archive file name, e.g. `linux-6.6.30.tar.xz`.
    pub file_name: String,
    /// Top-level directory inside the archive.
    pub dir_name: String,
}

impl SourceArchive {
    fn new(base: &str, stem: String) -> Self {
        let file_name = format!("{stem}.tar.xz");
        Self {
            url: format!("{base}/{file_name}"),
            file_name,
            dir_name: stem,
        }
    }
}

pub fn kernel(version: &str) -> Result<SourceArchive> {
    let major = version
        .split('.')
        .next()
        .filter(|m| !m.is_empty() && m.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| Error::msg(format!("invalid kernel version '{version}'")))?;
    Ok(SourceArchive::new(
        &format!("https://cdn.kernel.org/pub/linux/kernel/v{major}.x"),
        format!("linux-{version}"),
    ))
}

pub fn qemu(version: &str) -> SourceArchive {
    SourceArchive::new("https://download.qemu.org", format!("qemu-{version}"))
}

pub fn e2fsprogs(version: &str) -> SourceArchive {
    SourceArchive::new(
        &format!("https://mirrors.edge.kernel.org/pub/linux/kernel/people/tytso/e2fsprogs/v{version}"),
        format!("e2fsprogs-{version}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_url_uses_major_series() {
        let src = kernel("6.6.30").unwrap();
        assert_eq!(
            src.url,
            "https://cdn.kernel.org/pub/linux/kernel/v6.x/linux-6.6.30.tar.xz"
        );
        assert_eq!(src.dir_name, "linux-6.6.30");
    }

    #[test]
    fn kernel_rejects_garbage_version() {
        assert!(kernel(".1").is_err());
    }

    #[test]
    fn e2fsprogs_url_has_versioned_directory() {
        let src = e2fsprogs("1.47.1");
        assert!(src.url.ends_with("/v1.47.1/e2fsprogs-1.47.1.tar.xz"));
    }
}
