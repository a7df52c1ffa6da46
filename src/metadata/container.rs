//! Supported audio containers and content sniffing

use lofty::file::FileType;
use lofty::probe::Probe;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Audio container kinds the sync pipeline knows how to tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// MPEG layer III with an ID3v2 tag
    Mp3,
    /// FLAC with Vorbis comment and picture blocks
    Flac,
}

impl ContainerKind {
    /// Parse the container name declared by the gateway
    pub fn from_declared(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "mp3" | "mpeg" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// Infer the container from the extension of a URL path
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = url::Url::parse(url).ok()?;
        let last = parsed.path_segments()?.next_back()?;
        let (_, ext) = last.rsplit_once('.')?;
        Self::from_declared(ext)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }

    /// The lofty file type a valid file of this kind sniffs as
    pub fn file_type(self) -> FileType {
        match self {
            Self::Mp3 => FileType::Mpeg,
            Self::Flac => FileType::Flac,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Identify a file from its leading bytes, ignoring its name
pub fn sniff(path: &Path) -> io::Result<Option<FileType>> {
    let reader = BufReader::new(File::open(path)?);
    let probe = Probe::new(reader).guess_file_type()?;
    Ok(probe.file_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_declared() {
        assert_eq!(ContainerKind::from_declared("MP3"), Some(ContainerKind::Mp3));
        assert_eq!(ContainerKind::from_declared("flac"), Some(ContainerKind::Flac));
        assert_eq!(ContainerKind::from_declared("m4a"), None);
    }

    #[test]
    fn test_from_url_ignores_query() {
        assert_eq!(
            ContainerKind::from_url("http://m7.music.126.net/a/b/c.mp3?x=1"),
            Some(ContainerKind::Mp3)
        );
        assert_eq!(ContainerKind::from_url("http://host/noext"), None);
        assert_eq!(ContainerKind::from_url("not a url"), None);
    }

    #[test]
    fn test_sniff_flac_regardless_of_name() {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(b"fLaC\x80\x00\x00\x22").unwrap();
        file.write_all(&[0u8; 34]).unwrap();
        file.flush().unwrap();
        assert_eq!(sniff(file.path()).unwrap(), Some(FileType::Flac));
    }

    #[test]
    fn test_sniff_garbage() {
        let mut file = tempfile::Builder::new().suffix(".flac").tempfile().unwrap();
        file.write_all(b"<html>not audio</html>").unwrap();
        file.flush().unwrap();
        assert_eq!(sniff(file.path()).unwrap(), None);
    }
}
