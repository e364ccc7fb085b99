//! Local file output.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rdfweaver_core::{Graph, RdfFormat};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::OutputError;
use crate::RdfOutput;

/// Where a [`FileSink`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub directory: PathBuf,
    /// Base file name. The format's extension is added when it has none.
    pub filename: String,
    pub format: RdfFormat,
}

impl FileTarget {
    pub fn new(
        directory: impl Into<PathBuf>,
        filename: impl Into<String>,
        format: RdfFormat,
    ) -> Self {
        Self {
            directory: directory.into(),
            filename: filename.into(),
            format,
        }
    }
}

/// Writes each saved graph to a new file, never overwriting: when
/// `rdfOutput.nt` exists the graph goes to `rdfOutput1.nt`, then
/// `rdfOutput2.nt`, and so on. Missing directories are created.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    filename: String,
    format: RdfFormat,
}

impl FileSink {
    pub fn new(target: FileTarget) -> Result<Self, OutputError> {
        let name = target.filename.trim();
        if name.is_empty() {
            return Err(OutputError::InvalidTarget("file name must be set".into()));
        }
        if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(OutputError::InvalidTarget(format!(
                "file name '{}' must not contain a directory",
                name
            )));
        }

        let filename = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{}.{}", name, target.format.extension())
        };

        Ok(Self {
            directory: target.directory,
            filename,
            format: target.format,
        })
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    /// Serialize `graph` into the first unused file name and return its path.
    pub async fn write(&self, graph: &Graph) -> Result<PathBuf, OutputError> {
        let body = self.format.to_bytes(graph)?;
        fs::create_dir_all(&self.directory).await?;

        let mut increment = 0;
        loop {
            let path = match increment {
                0 => self.directory.join(&self.filename),
                n => self.directory.join(incremented_filename(&self.filename, n)),
            };
            // create_new so a file appearing between check and write is never clobbered
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(&body).await?;
                    file.flush().await?;
                    info!(
                        "Wrote {} triples as {} to {}",
                        graph.len(),
                        self.format,
                        path.display()
                    );
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", path.display());
                    increment += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl RdfOutput for FileSink {
    async fn save(&self, graph: &Graph) -> Result<(), OutputError> {
        self.write(graph).await.map(|_| ())
    }

    fn destination(&self) -> String {
        self.directory.join(&self.filename).display().to_string()
    }
}

/// `rdfOutput.nt` with 2 becomes `rdfOutput2.nt`; `out` becomes `out2`.
pub fn incremented_filename(filename: &str, increment: usize) -> String {
    let path = Path::new(filename);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{}{}.{}", stem, increment, ext),
        _ => format!("{}{}", filename, increment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfweaver_core::{named_node, Literal, Triple};
    use tempfile::TempDir;

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            named_node("http://example.com/Customer/1").unwrap(),
            named_node("http://example.com/Customer#name").unwrap(),
            Literal::new_simple_literal("Ann"),
        ));
        graph
    }

    #[test]
    fn test_incremented_filename() {
        assert_eq!(incremented_filename("rdfOutput.nt", 1), "rdfOutput1.nt");
        assert_eq!(incremented_filename("rdfOutput.nt", 12), "rdfOutput12.nt");
        assert_eq!(incremented_filename("out", 1), "out1");
        assert_eq!(incremented_filename("archive.tar.gz", 1), "archive.tar1.gz");
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("rdfOutput.nt"), "keep me").unwrap();

        let sink = FileSink::new(FileTarget::new(dir.path(), "rdfOutput.nt", RdfFormat::NTriples)).unwrap();
        let path = sink.write(&graph()).await.unwrap();

        assert_eq!(path, dir.path().join("rdfOutput1.nt"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rdfOutput.nt")).unwrap(),
            "keep me"
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<http://example.com/Customer/1> <http://example.com/Customer#name> \"Ann\" .\n"
        );
    }

    #[tokio::test]
    async fn test_successive_saves_increment() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(FileTarget::new(dir.path(), "rdfOutput.nt", RdfFormat::NTriples)).unwrap();

        for _ in 0..3 {
            sink.save(&graph()).await.unwrap();
        }

        assert!(dir.path().join("rdfOutput.nt").exists());
        assert!(dir.path().join("rdfOutput1.nt").exists());
        assert!(dir.path().join("rdfOutput2.nt").exists());
    }

    #[tokio::test]
    async fn test_missing_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = FileSink::new(FileTarget::new(&nested, "graph", RdfFormat::Turtle)).unwrap();

        let path = sink.write(&graph()).await.unwrap();
        assert_eq!(path, nested.join("graph.ttl"));
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_names_rejected() {
        assert!(FileSink::new(FileTarget::new("/tmp", " ", RdfFormat::NTriples)).is_err());
        assert!(FileSink::new(FileTarget::new("/tmp", "a/b.nt", RdfFormat::NTriples)).is_err());
    }

    #[test]
    fn test_destination() {
        let sink = FileSink::new(FileTarget::new("/data/out", "graph", RdfFormat::NQuads)).unwrap();
        assert_eq!(sink.destination(), "/data/out/graph.nq");
    }
}
