//! Stream boundary: memento trees to and from byte sinks
//!
//! The codec never retries; I/O and XML errors propagate unchanged.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::format::tree::{read_document, write_document, TreeNode};

/// Compression filter applied around the XML text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain UTF-8 text
    #[default]
    None,
    /// gzip container
    Gzip,
    /// Raw deflate stream
    Deflate,
}

impl Compression {
    /// Pick a filter from a file name: `.gz` means gzip, anything else plain text.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "deflate" => Ok(Compression::Deflate),
            other => Err(Error::config(format!(
                "Invalid compression: {}. Valid options: none, gzip, deflate",
                other
            ))),
        }
    }
}

/// Write a memento tree as UTF-8 XML through the chosen filter.
pub fn write_memento<W: Write>(root: &TreeNode, sink: W, compression: Compression) -> Result<()> {
    match compression {
        Compression::None => write_document(sink, root),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(sink, flate2::Compression::default());
            write_document(&mut encoder, root)?;
            encoder.finish()?;
            Ok(())
        }
        Compression::Deflate => {
            let mut encoder = DeflateEncoder::new(sink, flate2::Compression::default());
            write_document(&mut encoder, root)?;
            encoder.finish()?;
            Ok(())
        }
    }
}

/// Read a memento tree, decompressing first when asked to.
pub fn read_memento<R: Read>(source: R, compression: Compression) -> Result<TreeNode> {
    match compression {
        Compression::None => read_document(BufReader::new(source)),
        Compression::Gzip => read_document(BufReader::new(GzDecoder::new(source))),
        Compression::Deflate => read_document(BufReader::new(DeflateDecoder::new(source))),
    }
}

/// Write a memento to a file.
pub fn save_to_path(root: &TreeNode, path: impl AsRef<Path>, compression: Compression) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut sink = BufWriter::new(file);
    write_memento(root, &mut sink, compression)?;
    sink.flush()?;
    Ok(())
}

/// Read a memento from a file.
pub fn load_from_path(path: impl AsRef<Path>, compression: Compression) -> Result<TreeNode> {
    let file = File::open(path.as_ref())?;
    read_memento(file, compression)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        let mut root = TreeNode::new("StudyMemento");
        let mut study = TreeNode::new("Study").with_attribute("UID", "1.2.3");
        for i in 0..50 {
            let mut leaf = TreeNode::new("Attribute").with_attribute("Tag", format!("{:08X}", i));
            leaf.text = Some(format!("value {}", i));
            study.push(leaf);
        }
        root.push(study);
        root
    }

    #[test]
    fn test_round_trip_each_filter() {
        for compression in [Compression::None, Compression::Gzip, Compression::Deflate] {
            let mut bytes = Vec::new();
            write_memento(&sample(), &mut bytes, compression).unwrap();
            let parsed = read_memento(bytes.as_slice(), compression).unwrap();
            assert_eq!(parsed, sample(), "{:?}", compression);
        }
    }

    #[test]
    fn test_compression_shrinks_repetitive_output() {
        let mut plain = Vec::new();
        let mut gz = Vec::new();
        write_memento(&sample(), &mut plain, Compression::None).unwrap();
        write_memento(&sample(), &mut gz, Compression::Gzip).unwrap();
        assert!(gz.len() < plain.len());
    }

    #[test]
    fn test_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.xml.gz");
        let compression = Compression::for_path(&path);
        assert_eq!(compression, Compression::Gzip);

        save_to_path(&sample(), &path, compression).unwrap();
        assert_eq!(load_from_path(&path, compression).unwrap(), sample());
    }

    #[test]
    fn test_io_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path(dir.path().join("missing.xml"), Compression::None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_parse_compression_names() {
        assert_eq!("GZIP".parse::<Compression>().unwrap(), Compression::Gzip);
        assert!("zip".parse::<Compression>().is_err());
    }
}
