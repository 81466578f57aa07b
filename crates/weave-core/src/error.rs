use std::path::PathBuf;

use thiserror::Error;

use crate::module_path::ModulePath;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("cannot create unique module name for {0}")]
    ModuleNameExhausted(ModulePath),

    #[error("fetch {module} {version}: {message}")]
    Fetch {
        module: ModulePath,
        version: String,
        message: String,
    },

    #[error("parse {module}: {message}")]
    Parse { module: ModulePath, message: String },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("binding list {path}: {message}")]
    BindingList { path: PathBuf, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}
