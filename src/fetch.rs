//! Streams a bzip2-compressed remote dump into a local file.
//!
//! Decompressed bytes go to a temp file next to the destination which is
//! renamed into place only after the compressed stream ended cleanly, so an
//! existing destination file always holds a complete download.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use bzip2::read::MultiBzDecoder;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::util::{ensure_directory, parent_or_current};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const PROGRESS_LOG_EVERY_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchProgress {
    pub chunks: u64,
    pub bytes_written: u64,
}

pub trait SourceFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(FetchProgress),
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StreamingFetcher {
    connect_timeout: Duration,
    chunk_size: usize,
}

impl Default for StreamingFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_CHUNK_SIZE)
    }
}

impl StreamingFetcher {
    pub fn new(connect_timeout: Duration, chunk_size: usize) -> Self {
        Self {
            connect_timeout,
            chunk_size: chunk_size.max(1),
        }
    }

    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        if let Some(path) = url.strip_prefix("file://") {
            let file = File::open(path).map_err(|err| PipelineError::fetch(url, err))?;
            return Ok(Box::new(file));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PipelineError::fetch(url, "unsupported URL scheme"));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(self.connect_timeout)
            .build();
        let response = agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(code, _response) => {
                PipelineError::fetch(url, format!("server returned status {code}"))
            }
            ureq::Error::Transport(transport) => {
                PipelineError::fetch(url, format!("transport error: {transport}"))
            }
        })?;

        Ok(Box::new(response.into_reader()))
    }
}

impl SourceFetcher for StreamingFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(FetchProgress),
    ) -> Result<()> {
        let parent = parent_or_current(dest);
        ensure_directory(parent)?;

        let reader = self.open(url)?;
        let mut decoder = MultiBzDecoder::new(reader);

        let file_name = dest
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("download");
        let mut partial = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|err| PipelineError::io(parent, err))?;

        let mut buf = vec![0_u8; self.chunk_size];
        let mut progress = FetchProgress::default();

        loop {
            let count = match decoder.read(&mut buf) {
                Ok(0) => break,
                Ok(count) => count,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(PipelineError::fetch(url, format!("stream failed: {err}")));
                }
            };

            partial
                .write_all(&buf[..count])
                .map_err(|err| PipelineError::io(partial.path(), err))?;

            progress.chunks += 1;
            progress.bytes_written += count as u64;
            on_progress(progress);
        }

        partial
            .as_file()
            .sync_all()
            .map_err(|err| PipelineError::io(partial.path(), err))?;
        partial
            .persist(dest)
            .map_err(|err| PipelineError::io(dest, err.error))?;

        debug!(
            url,
            path = %dest.display(),
            bytes = progress.bytes_written,
            chunks = progress.chunks,
            "fetch completed"
        );

        Ok(())
    }
}

/// Progress callback state that logs every 32 MiB of decompressed output.
#[derive(Debug)]
pub struct ProgressLog {
    label: String,
    next_mark: u64,
}

impl ProgressLog {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next_mark: PROGRESS_LOG_EVERY_BYTES,
        }
    }

    pub fn observe(&mut self, progress: FetchProgress) {
        if progress.bytes_written < self.next_mark {
            return;
        }

        info!(
            source = %self.label,
            mib = progress.bytes_written / (1024 * 1024),
            "downloading"
        );
        while self.next_mark <= progress.bytes_written {
            self.next_mark += PROGRESS_LOG_EVERY_BYTES;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use bzip2::Compression;
    use bzip2::write::BzEncoder;

    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("compress");
        encoder.finish().expect("finish")
    }

    fn file_url(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    fn sample_xml() -> Vec<u8> {
        let mut xml = b"<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<dictionary revision=\"1234\">\n".to_vec();
        for index in 0..2000 {
            xml.extend_from_slice(format!("  <lemma id=\"{index}\"/>\n").as_bytes());
        }
        xml.extend_from_slice(b"</dictionary>\n");
        xml
    }

    fn remote_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).expect("write fixture");
        path
    }

    #[test]
    fn fetch_writes_decompressed_payload_in_chunks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let xml = sample_xml();
        let remote = remote_fixture(dir.path(), "dict.xml.bz2", &compress(&xml));
        let dest = dir.path().join("work").join("dict.xml");

        let fetcher = StreamingFetcher::new(DEFAULT_CONNECT_TIMEOUT, 1024);
        let mut seen = Vec::new();
        fetcher
            .fetch(&file_url(&remote), &dest, &mut |progress| seen.push(progress))
            .expect("fetch");

        assert_eq!(fs::read(&dest).expect("read dest"), xml);
        assert!(seen.len() > 1, "expected several chunks, got {}", seen.len());
        assert!(seen.windows(2).all(|pair| pair[0].bytes_written < pair[1].bytes_written));
        assert_eq!(seen.last().map(|p| p.bytes_written), Some(xml.len() as u64));
    }

    #[test]
    fn truncated_stream_leaves_no_destination_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let compressed = compress(&sample_xml());
        let truncated = &compressed[..compressed.len() / 2];
        let remote = remote_fixture(dir.path(), "dict.xml.bz2", truncated);
        let dest = dir.path().join("dict.xml");

        let err = StreamingFetcher::default()
            .fetch(&file_url(&remote), &dest, &mut |_| {})
            .expect_err("truncated stream must fail");

        assert!(matches!(err, PipelineError::FetchFailure { .. }), "{err}");
        assert!(!dest.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty(), "partial files left: {leftovers:?}");
    }

    #[test]
    fn failed_refetch_keeps_previous_complete_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("dict.xml");
        fs::write(&dest, b"previous complete dump").expect("seed");
        let remote = remote_fixture(dir.path(), "dict.xml.bz2", b"not bzip2 at all");

        StreamingFetcher::default()
            .fetch(&file_url(&remote), &dest, &mut |_| {})
            .expect_err("garbage must fail");

        assert_eq!(fs::read(&dest).expect("read"), b"previous complete dump");
    }

    #[test]
    fn missing_local_source_is_a_fetch_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = file_url(&dir.path().join("absent.xml.bz2"));

        let err = StreamingFetcher::default()
            .fetch(&url, &dir.path().join("dict.xml"), &mut |_| {})
            .expect_err("missing source");
        assert!(matches!(err, PipelineError::FetchFailure { .. }));
    }

    #[test]
    fn unsupported_scheme_is_rejected_before_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = StreamingFetcher::default()
            .fetch("ftp://example.org/dict.xml.bz2", &dir.path().join("dict.xml"), &mut |_| {})
            .expect_err("ftp is not supported");
        assert!(err.to_string().contains("unsupported URL scheme"), "{err}");
    }

    #[test]
    fn progress_log_advances_marks_past_large_jumps() {
        let mut log = ProgressLog::new("dictionary");
        log.observe(FetchProgress {
            chunks: 1,
            bytes_written: 100 * 1024 * 1024,
        });
        assert_eq!(log.next_mark, 128 * 1024 * 1024);
    }
}
