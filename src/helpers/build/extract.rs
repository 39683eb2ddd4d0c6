//! Source archive extraction
//!
//! Native extraction for tar (gz/xz/bz2/zst/plain) and zip archives.
//! No external tools are required.

use crate::core::error::{InstallError, Result};
use crate::core::output;
use crate::helpers::internal::progress::{self, ProgressGuard};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

/// Archive formats a source tarball may come in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect archive format from filename extension
    pub fn from_filename(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Self::TarZst)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Canonical file extension, without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarBz2 => "tar.bz2",
            Self::TarZst => "tar.zst",
            Self::Tar => "tar",
            Self::Zip => "zip",
        }
    }
}

fn tar_error(archive: &Path, what: &str, e: impl std::fmt::Display) -> InstallError {
    InstallError::filesystem(archive, format!("{}: {}", what, e))
}

fn normalize_lexical(path: &Path) -> PathBuf {
    // Lexically normalize a path (no filesystem access), used to validate
    // link targets without following symlinks.
    let mut out = PathBuf::new();
    let mut has_root = false;

    for c in path.components() {
        match c {
            Component::Prefix(p) => {
                out.clear();
                out.push(p.as_os_str());
                has_root = true;
            }
            Component::RootDir => {
                out.push(Component::RootDir.as_os_str());
                has_root = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = out
                    .components()
                    .next_back()
                    .is_some_and(|last| matches!(last, Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !has_root {
                    out.push("..");
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    out
}

fn ensure_no_symlink_components(dest: &Path, full_path: &Path) -> Result<()> {
    let rel = full_path
        .strip_prefix(dest)
        .map_err(|_| InstallError::filesystem(full_path, "archive path outside destination"))?;

    let mut cur = dest.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(md) = std::fs::symlink_metadata(&cur)
            && md.file_type().is_symlink()
        {
            return Err(InstallError::filesystem(
                &cur,
                "extraction blocked: symlink in path component",
            ));
        }
    }

    Ok(())
}

fn ensure_link_target_within_dest(dest: &Path, link_parent: &Path, link_name: &Path) -> Result<()> {
    if link_name.is_absolute()
        || link_name
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(InstallError::filesystem(
            link_parent,
            format!("archive contains absolute link target: {}", link_name.display()),
        ));
    }

    let candidate = normalize_lexical(&link_parent.join(link_name));
    let norm_dest = normalize_lexical(dest);
    if candidate.strip_prefix(&norm_dest).is_err() {
        return Err(InstallError::filesystem(
            link_parent,
            format!("archive link target escapes destination: {}", link_name.display()),
        ));
    }

    Ok(())
}

/// Extract a tar stream with path-safety checks
fn extract_tar<R: Read>(archive_path: &Path, reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| tar_error(archive_path, "tar read error", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| tar_error(archive_path, "tar entry error", e))?;
        let path = entry
            .path()
            .map_err(|e| tar_error(archive_path, "tar path error", e))?
            .into_owned();

        if path.is_absolute() || path.components().any(|c| c == Component::ParentDir) {
            return Err(InstallError::filesystem(
                archive_path,
                format!("archive contains unsafe path: {}", path.display()),
            ));
        }

        // Some archives contain a "." entry
        if path.as_os_str().is_empty() || path == Path::new(".") {
            continue;
        }

        // GitHub tarballs carry a pax global header; it is not a file
        let entry_type = entry.header().entry_type();
        if entry_type == tar::EntryType::XGlobalHeader {
            continue;
        }

        let full_path = dest.join(&path);
        ensure_no_symlink_components(dest, &full_path)?;

        let is_link = entry_type == tar::EntryType::Symlink || entry_type == tar::EntryType::Link;
        let link_name = if is_link {
            let name = entry
                .link_name()
                .map_err(|e| tar_error(archive_path, "tar link error", e))?
                .ok_or_else(|| {
                    InstallError::filesystem(
                        archive_path,
                        format!("link without target: {}", path.display()),
                    )
                })?;
            Some(name.into_owned())
        } else {
            None
        };

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
        }

        match link_name {
            // Hard link targets are relative to the archive root
            Some(target) if entry_type == tar::EntryType::Link => {
                ensure_link_target_within_dest(dest, dest, &target)?;
                let target = dest.join(&target);
                ensure_no_symlink_components(dest, &target)?;
                unpack_hard_link(&target, &full_path)?;
            }
            // Symlink targets are relative to the link's directory
            Some(target) => {
                let link_parent = full_path.parent().unwrap_or(dest);
                ensure_link_target_within_dest(dest, link_parent, &target)?;
                unpack_entry(&mut entry, &full_path)?;
            }
            None => unpack_entry(&mut entry, &full_path)?,
        }
    }

    Ok(())
}

fn unpack_entry<R: Read>(entry: &mut tar::Entry<'_, R>, full_path: &Path) -> Result<()> {
    entry
        .unpack(full_path)
        .map(|_| ())
        .map_err(|e| InstallError::filesystem(full_path, format!("unpack error: {}", e)))
}

fn unpack_hard_link(target: &Path, full_path: &Path) -> Result<()> {
    if !target.is_file() {
        return Err(InstallError::filesystem(
            full_path,
            format!("hard link target not extracted: {}", target.display()),
        ));
    }
    if std::fs::symlink_metadata(full_path).is_ok() {
        std::fs::remove_file(full_path).map_err(|e| InstallError::filesystem(full_path, e))?;
    }
    std::fs::hard_link(target, full_path)
        .map_err(|e| InstallError::filesystem(full_path, format!("hard link error: {}", e)))
}

fn open(archive_path: &Path) -> Result<BufReader<File>> {
    let file = File::open(archive_path).map_err(|e| InstallError::filesystem(archive_path, e))?;
    Ok(BufReader::new(file))
}

/// Extract a zip archive
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| InstallError::filesystem(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| tar_error(archive_path, "zip read error", e))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| tar_error(archive_path, "zip entry error", e))?;

        let outpath = match file.enclosed_name() {
            Some(path) => dest.join(path),
            None => {
                return Err(InstallError::filesystem(
                    archive_path,
                    format!("archive contains unsafe path: {}", file.name()),
                ));
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| InstallError::filesystem(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
        }
        let mut outfile =
            File::create(&outpath).map_err(|e| InstallError::filesystem(&outpath, e))?;
        std::io::copy(&mut file, &mut outfile).map_err(|e| InstallError::filesystem(&outpath, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}

/// Extract `archive_path` into `dest` using `format`.
pub fn extract_with_format(archive_path: &Path, dest: &Path, format: ArchiveFormat) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| InstallError::filesystem(dest, e))?;

    let filename = archive_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "archive".to_string());

    let pb = progress::create_spinner(&format!("extracting {}", filename));
    let _guard = ProgressGuard::new(&pb);

    match format {
        ArchiveFormat::TarGz => extract_tar(
            archive_path,
            flate2::read::GzDecoder::new(open(archive_path)?),
            dest,
        ),
        ArchiveFormat::TarXz => extract_tar(
            archive_path,
            xz2::read::XzDecoder::new(open(archive_path)?),
            dest,
        ),
        ArchiveFormat::TarBz2 => extract_tar(
            archive_path,
            bzip2::read::BzDecoder::new(open(archive_path)?),
            dest,
        ),
        ArchiveFormat::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(open(archive_path)?)
                .map_err(|e| tar_error(archive_path, "zstd init error", e))?;
            extract_tar(archive_path, decoder, dest)
        }
        ArchiveFormat::Tar => extract_tar(archive_path, open(archive_path)?, dest),
        ArchiveFormat::Zip => extract_zip(archive_path, dest),
    }
}

/// Extract a source archive and return the source root.
///
/// If the archive unpacks to a single top-level directory (as release
/// tarballs do, e.g. `yarrharr-2.4.2/`), that directory is the source root.
pub fn extract_source(archive_path: &Path, dest: &Path) -> Result<PathBuf> {
    let name = archive_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let format = ArchiveFormat::from_filename(&name).ok_or_else(|| {
        InstallError::filesystem(archive_path, "cannot detect archive format")
    })?;

    extract_with_format(archive_path, dest, format)?;
    output::detail(&format!("extracted {}", name));

    source_root(dest)
}

fn source_root(dest: &Path) -> Result<PathBuf> {
    let entries: Vec<PathBuf> = std::fs::read_dir(dest)
        .map_err(|e| InstallError::filesystem(dest, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    match entries.as_slice() {
        [single] if single.is_dir() => Ok(single.clone()),
        _ => Ok(dest.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ArchiveFormat::from_filename("v2.4.2.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("foo.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("foo.TAR.XZ"), Some(ArchiveFormat::TarXz));
        assert_eq!(ArchiveFormat::from_filename("foo.tbz2"), Some(ArchiveFormat::TarBz2));
        assert_eq!(ArchiveFormat::from_filename("foo.tar.zst"), Some(ArchiveFormat::TarZst));
        assert_eq!(ArchiveFormat::from_filename("foo.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_filename("foo.tar"), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_filename("foo.rpm"), None);
    }

    #[test]
    fn test_extract_source_single_top_level_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("yarrharr-2.4.2.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("yarrharr-2.4.2/CMakeLists.txt", "project(yarrharr)\n"),
                ("yarrharr-2.4.2/src/main.cpp", "int main() {}\n"),
            ],
        );

        let dest = dir.path().join("src");
        let root = extract_source(&archive, &dest).unwrap();
        assert_eq!(root, dest.join("yarrharr-2.4.2"));
        assert!(root.join("CMakeLists.txt").is_file());
        assert!(root.join("src/main.cpp").is_file());
    }

    #[test]
    fn test_extract_source_flat_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("flat.tar.gz");
        write_tar_gz(&archive, &[("CMakeLists.txt", "x"), ("main.cpp", "y")]);

        let dest = dir.path().join("src");
        let root = extract_source(&archive, &dest).unwrap();
        assert_eq!(root, dest);
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("pkg-1.0/README", options).unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }

        let dest = dir.path().join("out");
        let root = extract_source(&archive, &dest).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("README")).unwrap(), "hello");
    }

    #[test]
    fn test_unknown_format_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.rar");
        std::fs::write(&archive, b"not an archive").unwrap();

        let err = extract_source(&archive, &dir.path().join("out")).unwrap_err();
        assert_eq!(err.kind(), "FilesystemError");
    }

    #[test]
    fn test_link_target_escape_rejected() {
        let dest = Path::new("/build/src");
        let parent = Path::new("/build/src/pkg");
        assert!(ensure_link_target_within_dest(dest, parent, Path::new("../../etc")).is_err());
        assert!(ensure_link_target_within_dest(dest, parent, Path::new("/etc/passwd")).is_err());
        assert!(ensure_link_target_within_dest(dest, parent, Path::new("lib/x.so")).is_ok());
    }

    #[test]
    fn test_normalize_lexical() {
        assert_eq!(normalize_lexical(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexical(Path::new("../x")), PathBuf::from("../x"));
    }

    /// Tar entry of any type; the name is written raw so unsafe paths
    /// can be represented
    fn raw_entry(
        builder: &mut tar::Builder<impl Write>,
        name: &str,
        entry_type: tar::EntryType,
        link: Option<&str>,
        content: &[u8],
    ) {
        let mut header = tar::Header::new_gnu();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_entry_type(entry_type);
        header.set_size(content.len() as u64);
        header.set_mode(if entry_type.is_dir() { 0o755 } else { 0o644 });
        if let Some(link) = link {
            header.set_link_name(link).unwrap();
        }
        header.set_cksum();
        builder.append(&header, content).unwrap();
    }

    fn write_raw_tar_gz(
        path: &Path,
        entries: &[(&str, tar::EntryType, Option<&str>, &str)],
    ) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, entry_type, link, content) in entries {
            raw_entry(&mut builder, name, *entry_type, *link, content.as_bytes());
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn plain_tar(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in files {
            raw_entry(&mut builder, name, tar::EntryType::Regular, None, content.as_bytes());
        }
        builder.into_inner().unwrap()
    }

    const FILE: tar::EntryType = tar::EntryType::Regular;

    #[test]
    fn test_extract_tar_hard_link_within_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg-1.0.tar.gz");
        write_raw_tar_gz(
            &archive,
            &[
                ("pkg-1.0/a.txt", FILE, None, "shared"),
                ("pkg-1.0/b.txt", tar::EntryType::Link, Some("pkg-1.0/a.txt"), ""),
            ],
        );

        let root = extract_source(&archive, &dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("b.txt")).unwrap(), "shared");
    }

    #[test]
    fn test_extract_tar_hard_link_not_resolved_against_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg-1.0.tar.gz");
        // Cargo.toml exists in the test's working directory, not in the archive
        write_raw_tar_gz(
            &archive,
            &[
                ("pkg-1.0/a.txt", FILE, None, "x"),
                ("pkg-1.0/leak", tar::EntryType::Link, Some("Cargo.toml"), ""),
            ],
        );

        let dest = dir.path().join("out");
        let err = extract_source(&archive, &dest).unwrap_err();
        assert_eq!(err.kind(), "FilesystemError");
        assert!(!dest.join("pkg-1.0/leak").exists());
    }

    #[test]
    fn test_extract_tar_blocks_hard_link_outside_dest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let archive = dir.path().join("pkg.tar.gz");
        let dest = dir.path().join("out");

        for link in ["../secret.txt", "/etc/passwd"] {
            write_raw_tar_gz(&archive, &[("hl", tar::EntryType::Link, Some(link), "")]);
            let err = extract_with_format(&archive, &dest, ArchiveFormat::TarGz).unwrap_err();
            assert!(err.to_string().contains("link target"), "{}", err);
            assert!(!dest.join("hl").exists());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_blocks_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.tar.gz");
        let dest = dir.path().join("out");

        for link in ["../../outside", "/"] {
            write_raw_tar_gz(
                &archive,
                &[("pkg/a", tar::EntryType::Symlink, Some(link), "")],
            );
            let err = extract_with_format(&archive, &dest, ArchiveFormat::TarGz).unwrap_err();
            assert!(err.to_string().contains("link target"), "{}", err);
            assert!(std::fs::symlink_metadata(dest.join("pkg/a")).is_err());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_blocks_write_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.tar.gz");
        let dest = dir.path().join("out");
        write_raw_tar_gz(
            &archive,
            &[
                ("pkg/real/", tar::EntryType::Directory, None, ""),
                ("pkg/lib", tar::EntryType::Symlink, Some("real"), ""),
                ("pkg/lib/evil.txt", FILE, None, "pwned"),
            ],
        );

        let err = extract_with_format(&archive, &dest, ArchiveFormat::TarGz).unwrap_err();
        assert!(err.to_string().contains("symlink in path component"), "{}", err);
        assert!(!dest.join("pkg/real/evil.txt").exists());
    }

    #[test]
    fn test_extract_tar_rejects_unsafe_entry_paths() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.tar.gz");
        let dest = dir.path().join("nested/out");

        for name in ["../evil.txt", "pkg/../../evil.txt", "/tmp/evil.txt"] {
            write_raw_tar_gz(&archive, &[(name, FILE, None, "pwned")]);
            let err = extract_with_format(&archive, &dest, ArchiveFormat::TarGz).unwrap_err();
            assert!(err.to_string().contains("unsafe path"), "{}", err);
        }
        assert!(!dir.path().join("nested/evil.txt").exists());
    }

    #[test]
    fn test_extract_compressed_tar_formats() {
        let dir = tempfile::tempdir().unwrap();
        let tarball = plain_tar(&[("pkg-1.0/CMakeLists.txt", "project(pkg)\n")]);

        let xz = {
            let mut enc = xz2::write::XzEncoder::new(Vec::new(), 6);
            enc.write_all(&tarball).unwrap();
            enc.finish().unwrap()
        };
        let bz2 = {
            let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            enc.write_all(&tarball).unwrap();
            enc.finish().unwrap()
        };
        let zst = zstd::stream::encode_all(&tarball[..], 0).unwrap();

        for (name, bytes) in [
            ("pkg-1.0.tar.xz", xz),
            ("pkg-1.0.tar.bz2", bz2),
            ("pkg-1.0.tar.zst", zst),
            ("pkg-1.0.tar", tarball.clone()),
        ] {
            let archive = dir.path().join(name);
            std::fs::write(&archive, bytes).unwrap();

            let dest = dir.path().join(format!("out-{}", name));
            let root = extract_source(&archive, &dest).unwrap();
            assert_eq!(
                std::fs::read_to_string(root.join("CMakeLists.txt")).unwrap(),
                "project(pkg)\n",
                "{}",
                name
            );
        }
    }
}
