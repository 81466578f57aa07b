use thiserror::Error;
use weave_codegen::CodegenError;
use weave_core::{CoreError, ModulePath};

/// Fatal run errors. Anything recoverable is a diagnostic instead.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("fetch {module} {version} (required by {required_by}): {source}")]
    Fetch {
        module: ModulePath,
        version: String,
        required_by: String,
        #[source]
        source: CoreError,
    },

    #[error("unknown package: {0}")]
    UnknownPackage(ModulePath),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}
