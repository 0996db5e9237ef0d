use crate::{
    error::{Result, TaskError},
    io::{
        disposition::filename_from_content_disposition,
        paths::numbered_file_name,
        progress::{emit_progress, TaskProgress},
    },
};

use reqwest::{blocking::Client, header::CONTENT_DISPOSITION};
use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

pub fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Reader adapter that reports upload progress as bytes are consumed.
pub struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, total: u64) -> Self {
        Self {
            inner,
            sent: 0,
            total,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            emit_progress(TaskProgress::Uploading {
                sent: self.sent,
                total: self.total,
            });
        }
        Ok(n)
    }
}

/// Fetch `url` into `dir`, streaming through a temp file that is only moved
/// into place once the body has been read completely.
///
/// The file name comes from `Content-Disposition` when present, otherwise
/// `fallback_name` is used. A taken name gets a `_1`, `_2`, ... suffix.
pub fn download_to_dir(
    client: &Client,
    url: &str,
    dir: &Path,
    fallback_name: &str,
    label: &str,
    timeout: Duration,
) -> Result<PathBuf> {
    let mut resp = client.get(url).timeout(timeout).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(TaskError::Network {
            status: Some(status.as_u16()),
            message: format!("download of {url} failed"),
        });
    }

    let file_name = resp
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| fallback_name.to_string());

    let total = resp.content_length().unwrap_or(0);
    let mut tmp = NamedTempFile::new_in(dir)?;
    let mut buf = [0u8; 8192];
    let mut done = 0u64;

    loop {
        let n = resp.read(&mut buf).map_err(|e| TaskError::network(e.to_string()))?;
        if n == 0 {
            break;
        }
        tmp.write_all(&buf[..n])?;
        done += n as u64;
        emit_progress(TaskProgress::Downloading {
            label: label.to_string(),
            done,
            total,
        });
    }
    tmp.flush()?;

    persist_unique(tmp, dir, &file_name)
}

const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Move `tmp` to `dir/name`, or to the first free `name_1`, `name_2`, ...
/// An existing file is never replaced.
fn persist_unique(mut tmp: NamedTempFile, dir: &Path, name: &str) -> Result<PathBuf> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let dest = dir.join(numbered_file_name(name, n));
        match tmp.persist_noclobber(&dest) {
            Ok(_) => return Ok(dest),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(TaskError::Io(e.error)),
        }
    }
    Err(TaskError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {name} in {}", dir.display()),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_reader_passes_bytes_through() {
        let data = vec![7u8; 20_000];
        let mut reader = ProgressReader::new(&data[..], data.len() as u64);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(reader.sent, 20_000);
    }

    #[test]
    fn persist_never_replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for body in [b"first", b"secnd", b"third"] {
            let mut tmp = NamedTempFile::new_in(dir.path()).unwrap();
            tmp.write_all(body).unwrap();
            paths.push(persist_unique(tmp, dir.path(), "song_vocals.mp3").unwrap());
        }

        assert_eq!(paths[0], dir.path().join("song_vocals.mp3"));
        assert_eq!(paths[1], dir.path().join("song_vocals_1.mp3"));
        assert_eq!(paths[2], dir.path().join("song_vocals_2.mp3"));
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"first");
        assert_eq!(std::fs::read(&paths[2]).unwrap(), b"third");
    }
}
