//! Reading single entries out of a remote ZIP archive.
//!
//! IPSWs are ZIP archives of several gigabytes; the build manifest inside is a
//! few hundred kilobytes. [`RangeReader`] turns a [`RangeSource`] into a
//! seekable reader so the `zip` crate only ever pulls the end records, the
//! central directory, and the one entry we ask for.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode, Url};
use tokio::runtime::Handle;
use tracing::instrument;
use zip::ZipArchive;
use zip::result::{ZipError, ZipResult};

use crate::error::{ErrorKind, Result};

/// Smallest range fetched at once; the directory parser reads in small steps.
pub const READ_AHEAD: u64 = 64 * 1024;
/// Entries bigger than this are never buffered; no manifest comes close.
pub const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// Random access to the bytes of a (probably remote) file.
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Total size of the file in bytes.
    async fn len(&self) -> Result<u64>;

    /// Exactly `length` bytes starting at `offset`.
    async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>>;
}

/// [`RangeSource`] over HTTP `Range` requests.
#[derive(Debug, Clone)]
pub struct HttpRangeSource {
    http: Client,
    url: Url,
}
impl HttpRangeSource {
    pub fn new(http: Client, url: &str) -> Result<Self> {
        let url = Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn len(&self) -> Result<u64> {
        let response = self
            .http
            .head(self.url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .or_raise(|| ErrorKind::Network(format!("HEAD {} failed", self.url)))?;
        // Read the header itself; a HEAD response has no body to size.
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or_raise(|| ErrorKind::Network(format!("no content length for {}", self.url)))
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let end = offset
            .checked_add(length - 1)
            .ok_or_raise(|| ErrorKind::InvalidArchive(format!("range of {length} bytes at {offset} overflows")))?;
        let response = self
            .http
            .get(self.url.clone())
            .header(RANGE, format!("bytes={offset}-{end}"))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("GET {} failed", self.url)))?;
        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            exn::bail!(ErrorKind::Network(format!("range request to {} answered {status}", self.url)));
        }
        let body = response
            .bytes()
            .await
            .or_raise(|| ErrorKind::Network(format!("failed to read range of {}", self.url)))?;
        if body.len() as u64 != length {
            exn::bail!(ErrorKind::Network(format!(
                "expected {length} bytes from {}, received {}",
                self.url,
                body.len()
            )));
        }
        Ok(body.to_vec())
    }
}

/// [`RangeSource`] over bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}
impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: Arc::from(data.into()) }
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let start = usize::try_from(offset).or_raise(|| ErrorKind::InvalidArchive("offset out of range".to_string()))?;
        let length = usize::try_from(length).or_raise(|| ErrorKind::InvalidArchive("length out of range".to_string()))?;
        let end = start
            .checked_add(length)
            .ok_or_raise(|| ErrorKind::InvalidArchive(format!("range of {length} bytes at {start} overflows")))?;
        self.data
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_raise(|| ErrorKind::InvalidArchive(format!("read of {length} bytes at {start} past end of file")))
    }
}

/// Blocking [`Read`] + [`Seek`] over a [`RangeSource`].
///
/// Must only be used off the async runtime (inside
/// [`spawn_blocking`](tokio::task::spawn_blocking)): every cache miss blocks
/// on one ranged read. A failed read surfaces as an [`io::Error`] wrapping the
/// source's [`ErrorKind`].
#[derive(Debug, Clone)]
pub struct RangeReader<S> {
    source: S,
    runtime: Handle,
    len: u64,
    position: u64,
    window: Vec<u8>,
    window_start: u64,
}
impl<S: RangeSource> RangeReader<S> {
    pub fn new(source: S, runtime: Handle, len: u64) -> Self {
        Self { source, runtime, len, position: 0, window: Vec::new(), window_start: 0 }
    }

    fn window_offset(&self) -> Option<usize> {
        let offset = usize::try_from(self.position.checked_sub(self.window_start)?).ok()?;
        (offset < self.window.len()).then_some(offset)
    }
}

impl<S: RangeSource> Read for RangeReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.len {
            return Ok(0);
        }
        let offset = match self.window_offset() {
            Some(offset) => offset,
            None => {
                let length = READ_AHEAD.max(buf.len() as u64).min(self.len - self.position);
                self.window = self
                    .runtime
                    .block_on(self.source.read_range(self.position, length))
                    .map_err(|err| io::Error::other((*err).clone()))?;
                self.window_start = self.position;
                0
            },
        };
        let available = self.window.get(offset..).unwrap_or_default();
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.position = self.position.saturating_add(count as u64);
        Ok(count)
    }
}

impl<S> Seek for RangeReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        self.position = target.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek out of range"))?;
        Ok(self.position)
    }
}

/// A ZIP archive read lazily through a [`RangeSource`].
#[derive(Debug)]
pub struct RemoteZip<S> {
    archive: ZipArchive<RangeReader<S>>,
}
impl<S: RangeSource + Clone + 'static> RemoteZip<S> {
    /// Reads the archive's central directory.
    #[instrument(skip(source), fields(size, entries))]
    pub async fn open(source: S) -> Result<Self> {
        let size = source.len().await?;
        let reader = RangeReader::new(source, Handle::current(), size);
        let archive = tokio::task::spawn_blocking(move || ZipArchive::new(reader))
            .await
            .or_raise(|| ErrorKind::Io)?;
        let archive = raise_zip(archive, "unreadable central directory")?;

        let span = tracing::Span::current();
        span.record("size", size);
        span.record("entries", archive.len());
        Ok(Self { archive })
    }

    /// Entry names in central directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// The first file entry whose name satisfies `predicate`.
    pub fn find(&self, predicate: impl Fn(&str) -> bool) -> Option<&str> {
        self.names().find(|name| !name.ends_with('/') && predicate(name))
    }

    /// Fetches and decompresses one entry.
    #[instrument(skip(self))]
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || read_entry(&mut archive, &name)).await.or_raise(|| ErrorKind::Io)?
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = raise_zip(archive.by_name(name), name)?;
    if file.size() > MAX_ENTRY_SIZE || file.compressed_size() > MAX_ENTRY_SIZE {
        exn::bail!(ErrorKind::InvalidArchive(format!("entry {name} is too large")));
    }
    let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
    let read = file.read_to_end(&mut data).map_err(ZipError::Io);
    raise_zip(read, name)?;
    Ok(data)
}

/// Raises a `zip` failure, keeping the kind of a failed range read.
fn raise_zip<T>(result: ZipResult<T>, context: &str) -> Result<T> {
    let err = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let kind = match &err {
        ZipError::Io(io) => io.get_ref().and_then(|inner| inner.downcast_ref::<ErrorKind>()).cloned(),
        ZipError::UnsupportedArchive(reason) => Some(ErrorKind::UnsupportedArchive(format!("{context}: {reason}"))),
        _ => None,
    };
    let kind = kind.unwrap_or_else(|| ErrorKind::InvalidArchive(format!("{context}: {err}")));
    Err(err).or_raise(|| kind)
}

/// Archives for tests, written with the `zip` crate itself.
#[cfg(test)]
pub(crate) mod fixture {
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub(crate) struct File<'a> {
        pub name: &'a str,
        pub data: &'a [u8],
        pub method: CompressionMethod,
    }

    pub(crate) fn stored<'a>(name: &'a str, data: &'a [u8]) -> File<'a> {
        File { name, data, method: CompressionMethod::Stored }
    }

    pub(crate) fn deflated<'a>(name: &'a str, data: &'a [u8]) -> File<'a> {
        File { name, data, method: CompressionMethod::Deflated }
    }

    /// Builds an archive; `large` writes ZIP64 headers for every entry.
    /// Names ending in `/` become directories.
    pub(crate) fn archive(files: &[File<'_>], large: bool, comment: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for file in files {
            let options = SimpleFileOptions::default().compression_method(file.method).large_file(large);
            if file.name.ends_with('/') {
                writer.add_directory(file.name, options).unwrap();
            } else {
                writer.start_file(file.name, options).unwrap();
                writer.write_all(file.data).unwrap();
            }
        }
        writer.set_comment(comment);
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{archive, deflated, stored};
    use super::*;
    use rstest::rstest;

    const MANIFEST: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0"><dict><key>ProductBuildVersion</key><string>18E5154a</string></dict></plist>"#;

    const LOCAL_HEADER: &[u8] = b"PK\x03\x04";
    const CENTRAL_HEADER: &[u8] = b"PK\x01\x02";

    fn positions(data: &[u8], signature: &[u8]) -> Vec<usize> {
        data.windows(signature.len()).enumerate().filter(|(_, w)| *w == signature).map(|(i, _)| i).collect()
    }

    async fn open(data: Vec<u8>) -> Result<RemoteZip<MemorySource>> {
        RemoteZip::open(MemorySource::new(data)).await
    }

    #[rstest]
    #[case::plain(false, "")]
    #[case::commented(false, "signed by nobody")]
    #[case::zip64(true, "")]
    #[tokio::test]
    async fn test_reads_entries(#[case] large: bool, #[case] comment: &str) {
        let files = [
            stored("Firmware/all_flash/", b""),
            deflated("Restore.plist", b"<plist/>"),
            deflated("BuildManifest.plist", MANIFEST),
            stored("kernelcache.release.n104", &[0xAA; 512]),
        ];
        let zip = open(archive(&files, large, comment)).await.unwrap();
        let names: Vec<_> = zip.names().collect();
        assert_eq!(
            names,
            vec!["Firmware/all_flash/", "Restore.plist", "BuildManifest.plist", "kernelcache.release.n104"]
        );

        let manifest = zip.find(|name| name.contains("Manifest")).unwrap();
        assert_eq!(zip.read(manifest).await.unwrap(), MANIFEST);

        let kernel = zip.find(|name| name.starts_with("kernelcache")).unwrap();
        assert_eq!(zip.read(kernel).await.unwrap(), vec![0xAA; 512]);
    }

    #[tokio::test]
    async fn test_reads_past_read_ahead() {
        let padding = vec![0x55; READ_AHEAD as usize * 2];
        let files = [stored("padding.bin", &padding), deflated("BuildManifest.plist", MANIFEST)];
        let zip = open(archive(&files, false, "")).await.unwrap();
        assert_eq!(zip.read("padding.bin").await.unwrap(), padding);
        assert_eq!(zip.read("BuildManifest.plist").await.unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_find_skips_directories() {
        let files = [stored("Manifests/", b""), stored("BuildManifest.plist", b"manifest")];
        let zip = open(archive(&files, false, "")).await.unwrap();
        assert_eq!(zip.find(|name| name.contains("Manifest")), Some("BuildManifest.plist"));
    }

    #[tokio::test]
    async fn test_not_a_zip() {
        let err = open(vec![0u8; 4096]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
        let err = open(b"PK".to_vec()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn test_truncated_directory() {
        let mut data = archive(&[stored("BuildManifest.plist", b"manifest")], false, "");
        // Cut into the central directory, keeping the end record pointing at it.
        let directory = positions(&data, CENTRAL_HEADER)[0];
        let tail = data.split_off(directory + 10);
        let end = positions(&tail, b"PK\x05\x06")[0];
        data.truncate(directory + 4);
        data.extend(&tail[end..]);
        let err = open(data).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let mut data = archive(&[stored("BuildManifest.plist", b"manifest")], false, "");
        // Claim the entry is LZMA, which this reader isn't built to inflate.
        let local = positions(&data, LOCAL_HEADER)[0];
        let central = positions(&data, CENTRAL_HEADER)[0];
        data[local + 8..local + 10].copy_from_slice(&14u16.to_le_bytes());
        data[central + 10..central + 12].copy_from_slice(&14u16.to_le_bytes());

        let zip = open(data).await.unwrap();
        let err = zip.read("BuildManifest.plist").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedArchive(_)));
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let zip = open(archive(&[stored("Restore.plist", b"")], false, "")).await.unwrap();
        let err = zip.read("BuildManifest.plist").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    /// Fails every read with a network error.
    #[derive(Clone, Debug)]
    struct Unreachable(u64);

    #[async_trait]
    impl RangeSource for Unreachable {
        async fn len(&self) -> Result<u64> {
            Ok(self.0)
        }

        async fn read_range(&self, _: u64, _: u64) -> Result<Vec<u8>> {
            exn::bail!(ErrorKind::Network("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_read_failure_keeps_kind() {
        let err = RemoteZip::open(Unreachable(10_000)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_memory_source_bounds() {
        let source = MemorySource::new(b"0123456789".to_vec());
        assert_eq!(source.len().await.unwrap(), 10);
        assert_eq!(source.read_range(2, 3).await.unwrap(), b"234");
        assert!(source.read_range(8, 3).await.is_err());
        let err = source.read_range(u64::MAX, 2).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn test_http_range_overflow() {
        let source = HttpRangeSource::new(Client::new(), "https://cdn.example/a.ipsw").unwrap();
        let err = source.read_range(u64::MAX, 2).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn test_range_reader_seek() {
        let mut reader = RangeReader::new(MemorySource::new(b"0123456789".to_vec()), Handle::current(), 10);
        assert_eq!(reader.seek(SeekFrom::End(-3)).unwrap(), 7);
        assert_eq!(reader.seek(SeekFrom::Current(-7)).unwrap(), 0);
        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
        reader.seek(SeekFrom::Start(5)).unwrap();
        assert!(reader.seek(SeekFrom::Current(i64::MAX)).is_ok());
        reader.seek(SeekFrom::Start(u64::MAX)).unwrap();
        assert!(reader.seek(SeekFrom::Current(1)).is_err());
    }

    #[tokio::test]
    async fn test_range_reader_reads() {
        let source = MemorySource::new(b"0123456789".to_vec());
        let handle = Handle::current();
        let data = tokio::task::spawn_blocking(move || {
            let mut reader = RangeReader::new(source, handle, 10);
            reader.seek(SeekFrom::Start(4)).unwrap();
            let mut data = Vec::new();
            reader.read_to_end(&mut data).unwrap();
            data
        })
        .await
        .unwrap();
        assert_eq!(data, b"456789");
    }
}
