use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SckanError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("species has no region asset: {0}")]
    #[diagnostic(help("add the species coordinate file to the asset directory"))]
    UnsupportedSpecies(String),

    #[error("SPARQL request failed: {0}")]
    RemoteHttp(String),

    #[error("SPARQL endpoint returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("malformed SPARQL response: {0}")]
    MalformedResponse(String),

    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to write output: {0}")]
    Output(String),

    #[error("failed to read region asset at {0}")]
    AssetRead(Utf8PathBuf),

    #[error("failed to parse region asset {path}: {message}")]
    AssetParse { path: Utf8PathBuf, message: String },
}

impl SckanError {
    /// True for every failure of the remote query endpoint.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SckanError::RemoteHttp(_)
                | SckanError::RemoteStatus { .. }
                | SckanError::MalformedResponse(_)
        )
    }
}
