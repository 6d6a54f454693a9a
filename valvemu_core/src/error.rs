use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EmuError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing open input")]
    MissingOpenInput,
    #[error("missing close input")]
    MissingCloseInput,
    #[error("missing power-sense input")]
    MissingPowerInput,
    #[error("missing position output")]
    MissingPositionOutput,
    #[error("missing tank output")]
    MissingTankOutput,
    #[error("missing storage")]
    MissingStorage,
    #[error("missing interpolation table")]
    MissingTable,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
