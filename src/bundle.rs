use std::convert::TryFrom;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

const MAGIC: &[u8; 4] = b"PSCN";
const HEADER_LEN: usize = 16;
const TRAILER_LEN: usize = 16;

/// Payload entry listed in the bundle table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

/// Single-file container for a portal scene: manifest XML plus mesh and
/// texture payloads addressed by name.
#[derive(Debug, Clone)]
pub struct SceneBundle {
    backing: BundleBacking,
    version: u32,
    entries: Vec<BundleEntry>,
    manifest_xml: String,
}

#[derive(Debug, Clone)]
enum BundleBacking {
    File(PathBuf),
    Memory { _label: String, data: Arc<[u8]> },
}

impl SceneBundle {
    /// Opens a bundle from disk and eagerly loads the manifest XML blob.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut file = File::open(&path_buf)
            .with_context(|| format!("unable to open {}", path_buf.display()))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .context("unable to read bundle into memory")?;

        let (version, entries, manifest_xml) = parse_bundle(&data)?;

        Ok(Self {
            backing: BundleBacking::File(path_buf),
            version,
            entries,
            manifest_xml,
        })
    }

    /// Creates a bundle from bytes already resident in memory.
    pub fn from_bytes(label: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let storage: Arc<[u8]> = Arc::from(data.into_boxed_slice());
        let (version, entries, manifest_xml) = parse_bundle(&storage)?;
        Ok(Self {
            backing: BundleBacking::Memory {
                _label: label.into(),
                data: Arc::clone(&storage),
            },
            version,
            entries,
            manifest_xml,
        })
    }

    /// Returns the format version stored in the bundle header.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the raw scene manifest contained in the bundle.
    pub fn manifest_xml(&self) -> &str {
        &self.manifest_xml
    }

    /// Returns the list of payloads bundled alongside the manifest.
    pub fn files(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Looks up a payload entry by name.
    pub fn file(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Extracts the raw bytes for the provided entry name.
    pub fn extract_file(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .file(name)
            .ok_or_else(|| anyhow!("file not found in bundle: {name}"))?;
        self.extract_entry(entry)
    }

    /// Extracts the raw bytes for a previously looked-up entry.
    pub fn extract_entry(&self, entry: &BundleEntry) -> Result<Vec<u8>> {
        match &self.backing {
            BundleBacking::File(path) => {
                let mut file = File::open(path)
                    .with_context(|| format!("unable to reopen bundle {}", path.display()))?;
                file.seek(SeekFrom::Start(entry.offset))
                    .with_context(|| format!("unable to seek to {}", entry.name))?;
                let mut buffer = vec![0u8; entry.size as usize];
                file.read_exact(&mut buffer)
                    .with_context(|| format!("unable to read {} from bundle", entry.name))?;
                Ok(buffer)
            }
            BundleBacking::Memory { data, .. } => {
                let start = entry.offset as usize;
                let end = start + entry.size as usize;
                if end > data.len() {
                    return Err(anyhow!(
                        "entry {} extends past bundle bounds ({} > {})",
                        entry.name,
                        end,
                        data.len()
                    ));
                }
                Ok(data[start..end].to_vec())
            }
        }
    }
}

fn parse_bundle(data: &[u8]) -> Result<(u32, Vec<BundleEntry>, String)> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(anyhow!(
            "bundle too small to contain header (len={})",
            data.len()
        ));
    }

    let magic = &data[..4];
    if magic != MAGIC {
        return Err(anyhow!(
            "invalid bundle magic: expected PSCN, found {:?}",
            magic
        ));
    }

    let version = u32::from_le_bytes(data[4..8].try_into().expect("slice length verified"));
    let toc_offset = u64::from_le_bytes(data[8..16].try_into().expect("slice length verified"));

    let (entries, manifest_offset, manifest_size) = parse_toc(data, toc_offset)?;
    let manifest_xml = extract_manifest(data, manifest_offset, manifest_size)?;
    Ok((version, entries, manifest_xml))
}

fn parse_toc(data: &[u8], toc_offset: u64) -> Result<(Vec<BundleEntry>, u64, u64)> {
    let len = data.len();
    let toc_start = usize::try_from(toc_offset)
        .map_err(|_| anyhow!("TOC offset exceeds usize range: {toc_offset}"))?;
    let toc_end = len - TRAILER_LEN;
    if toc_start < HEADER_LEN || toc_start > toc_end {
        return Err(anyhow!("TOC offset {toc_offset} is outside bundle bounds"));
    }

    let mut cursor = toc_start;
    let entry_count = read_u32(data, &mut cursor, toc_end)?;
    let mut entries = Vec::with_capacity(entry_count as usize);

    for _ in 0..entry_count {
        let name_len = read_u32(data, &mut cursor, toc_end)? as usize;
        if cursor
            .checked_add(name_len)
            .filter(|end| *end <= toc_end)
            .is_none()
        {
            return Err(anyhow!("entry name extends past TOC region"));
        }
        let name = String::from_utf8(data[cursor..cursor + name_len].to_vec())
            .map_err(|err| anyhow!("invalid UTF-8 in entry name: {err}"))?;
        cursor += name_len;

        let offset = read_u64(data, &mut cursor, toc_end)?;
        let size = read_u64(data, &mut cursor, toc_end)?;
        if offset
            .checked_add(size)
            .filter(|end| *end <= len as u64)
            .is_none()
        {
            return Err(anyhow!(
                "entry {name} points outside bundle bounds (offset={offset}, size={size}, len={len})"
            ));
        }
        entries.push(BundleEntry { name, offset, size });
    }

    if cursor != toc_end {
        return Err(anyhow!(
            "TOC parsing ended at {cursor}, expected {toc_end}"
        ));
    }

    let manifest_offset =
        u64::from_le_bytes(data[toc_end..toc_end + 8].try_into().expect("slice length verified"));
    let manifest_size =
        u64::from_le_bytes(data[toc_end + 8..len].try_into().expect("slice length verified"));

    Ok((entries, manifest_offset, manifest_size))
}

fn read_u32(data: &[u8], cursor: &mut usize, limit: usize) -> Result<u32> {
    if *cursor + 4 > limit {
        return Err(anyhow!("unexpected end of bundle while reading 32-bit value"));
    }
    let value = u32::from_le_bytes(
        data[*cursor..*cursor + 4]
            .try_into()
            .expect("slice length verified"),
    );
    *cursor += 4;
    Ok(value)
}

fn read_u64(data: &[u8], cursor: &mut usize, limit: usize) -> Result<u64> {
    if *cursor + 8 > limit {
        return Err(anyhow!("unexpected end of bundle while reading 64-bit value"));
    }
    let value = u64::from_le_bytes(
        data[*cursor..*cursor + 8]
            .try_into()
            .expect("slice length verified"),
    );
    *cursor += 8;
    Ok(value)
}

fn extract_manifest(data: &[u8], offset: u64, size: u64) -> Result<String> {
    let start = usize::try_from(offset)
        .map_err(|_| anyhow!("manifest offset exceeds usize range: {offset}"))?;
    let size = usize::try_from(size)
        .map_err(|_| anyhow!("manifest size exceeds usize range: {size}"))?;
    if start
        .checked_add(size)
        .filter(|end| *end <= data.len())
        .is_none()
    {
        return Err(anyhow!(
            "manifest blob points outside bundle bounds (offset={start}, size={size}, len={})",
            data.len()
        ));
    }
    String::from_utf8(data[start..start + size].to_vec())
        .map_err(|err| anyhow!("manifest XML is not valid UTF-8: {err}"))
}

/// Serializes a bundle buffer from manifest text and named payloads.
///
/// Production bundles come from the authoring pipeline; this writer exists
/// for fixtures and the CLI integration test.
pub fn write_bundle(manifest: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let manifest_bytes = manifest.as_bytes();

    let mut buffer = Vec::new();
    buffer.extend_from_slice(MAGIC);
    buffer.extend_from_slice(&1u32.to_le_bytes());
    buffer.extend_from_slice(&0u64.to_le_bytes()); // TOC offset patched below

    let mut entries = Vec::new();
    for (name, data) in files {
        entries.push((name.to_string(), buffer.len() as u64, data.len() as u64));
        buffer.extend_from_slice(data);
    }

    let manifest_offset = buffer.len() as u64;
    buffer.extend_from_slice(manifest_bytes);

    let toc_offset = buffer.len() as u64;
    buffer.extend_from_slice(&(files.len() as u32).to_le_bytes());
    for (name, offset, size) in &entries {
        buffer.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buffer.extend_from_slice(name.as_bytes());
        buffer.extend_from_slice(&offset.to_le_bytes());
        buffer.extend_from_slice(&size.to_le_bytes());
    }
    buffer.extend_from_slice(&manifest_offset.to_le_bytes());
    buffer.extend_from_slice(&(manifest_bytes.len() as u64).to_le_bytes());

    buffer[8..16].copy_from_slice(&toc_offset.to_le_bytes());
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    static MANIFEST: Lazy<String> = Lazy::new(|| {
        "<scene>\n  <baked>textures/baked.png</baked>\n  <node>\n    <name>Circle</name>\n    <mesh>meshes/circle.obj</mesh>\n  </node>\n</scene>\n"
            .to_string()
    });

    fn create_bundle(files: &[(&str, &[u8])]) -> (NamedTempFile, SceneBundle) {
        let buffer = write_bundle(&MANIFEST, files);
        let mut tmp = NamedTempFile::new().expect("tmp file");
        tmp.write_all(&buffer).expect("write bundle");
        let bundle = SceneBundle::open(tmp.path()).expect("open bundle");
        (tmp, bundle)
    }

    #[test]
    fn open_bundle_reads_manifest_and_files() {
        let (_tmp, bundle) = create_bundle(&[("meshes/circle.obj", b"v 0 0 0")]);
        assert_eq!(bundle.version(), 1);
        assert_eq!(bundle.manifest_xml(), MANIFEST.as_str());
        assert_eq!(bundle.files().len(), 1);
        assert_eq!(bundle.files()[0].name, "meshes/circle.obj");
    }

    #[test]
    fn extract_file_returns_bytes() {
        let (_tmp, bundle) = create_bundle(&[("textures/baked.png", b"not a real png")]);
        let bytes = bundle.extract_file("textures/baked.png").unwrap();
        assert_eq!(bytes, b"not a real png");
    }

    #[test]
    fn extract_missing_file_is_error() {
        let (_tmp, bundle) = create_bundle(&[]);
        assert!(bundle.extract_file("meshes/missing.obj").is_err());
    }

    #[test]
    fn from_bytes_matches_on_disk_parse() {
        let buffer = write_bundle(&MANIFEST, &[("a", b"1"), ("b", b"22")]);
        let bundle = SceneBundle::from_bytes("in-memory", buffer).unwrap();
        assert_eq!(bundle.files().len(), 2);
        assert_eq!(bundle.extract_file("b").unwrap(), b"22");
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buffer = write_bundle(&MANIFEST, &[]);
        buffer[..4].copy_from_slice(b"XXXX");
        assert!(SceneBundle::from_bytes("bad", buffer).is_err());
    }

    #[test]
    fn rejects_truncated_bundle() {
        let buffer = write_bundle(&MANIFEST, &[]);
        let truncated = buffer[..HEADER_LEN].to_vec();
        assert!(SceneBundle::from_bytes("short", truncated).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_toc() {
        let mut buffer = write_bundle(&MANIFEST, &[]);
        buffer[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(SceneBundle::from_bytes("toc", buffer).is_err());
    }
}
