use thiserror::Error;

use crate::dispatch::DispatchError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid base url '{0}': expected an http(s) url")]
    InvalidBaseUrl(String),
    #[error("invalid flash ttl '{0}': expected 1 to 9223372036854775 seconds")]
    InvalidFlashTtl(u64),
    #[error("invalid flash fade '{0}' ms: ttl plus fade is out of range")]
    InvalidFlashFade(u64),
    #[error("failed to load template '{name}': {detail}")]
    TemplateLoad { name: String, detail: String },
    #[error("template '{name}' is missing placeholder '{placeholder}'")]
    TemplateMissingPlaceholder { name: String, placeholder: String },
    #[error("control '{0}' is already bound")]
    AlreadyBound(String),
    #[error("no action bound to control '{0}'")]
    UnboundControl(String),
    #[error("unknown form '{0}'")]
    UnknownForm(String),
    #[error("clearing data was not requested; open the confirmation first")]
    ConfirmationNotRequested,
    #[error("{0}")]
    ActionFailed(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
