//! Output selection.

use tracing::info;

use crate::error::OutputError;
use crate::file::{FileSink, FileTarget};
use crate::remote::{RemoteSink, RemoteTarget};
use crate::RdfOutput;

/// Which sink to build, with its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDescriptor {
    File(FileTarget),
    Remote(RemoteTarget),
}

/// Build the sink selected by `descriptor`.
pub fn build_output(descriptor: OutputDescriptor) -> Result<Box<dyn RdfOutput>, OutputError> {
    let output: Box<dyn RdfOutput> = match descriptor {
        OutputDescriptor::File(target) => Box::new(FileSink::new(target)?),
        OutputDescriptor::Remote(target) => Box::new(RemoteSink::new(target)?),
    };
    info!("Output destination: {}", output.destination());
    Ok(output)
}
