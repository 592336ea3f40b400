use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CovError {
    IoError(std::io::Error),
    SettingsParsing(serde_yaml::Error),
    Workbook(calamine::XlsxError),
    InputNotFound(PathBuf),
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },
    Validation(String),
    Render(String),
    Template(tera::Error),
    ToolNotFound(String),
    ToolFailed {
        tool: String,
        code: Option<i32>,
        detail: String,
    },
    Address(lettre::address::AddressError),
    Message(lettre::error::Error),
    ContentType(lettre::message::header::ContentTypeErr),
    Transport(lettre::transport::smtp::Error),
    MissingSetting(String),
    State(String),
}

impl std::error::Error for CovError {}

impl Display for CovError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CovError::IoError(io_error) => write!(f, "{}", io_error),
            CovError::SettingsParsing(error) => write!(f, "Invalid settings document: {}", error),
            CovError::Workbook(error) => write!(f, "{}", error),
            CovError::InputNotFound(path) => {
                write!(f, "File not found: {}", path.display())
            }
            CovError::SheetNotFound {
                requested,
                available,
            } => write!(
                f,
                "Sheet '{}' not found in workbook. Available sheets: {}",
                requested,
                available.join(", ")
            ),
            CovError::Validation(error) => write!(f, "{}", error),
            CovError::Render(error) => write!(f, "{}", error),
            CovError::Template(error) => write!(f, "{}", error),
            CovError::ToolNotFound(tool) => write!(
                f,
                "'{}' executable not found. Make sure it is installed and on your PATH.",
                tool
            ),
            CovError::ToolFailed { tool, code, detail } => match code {
                Some(code) => write!(f, "'{}' exited with status {}: {}", tool, code, detail),
                None => write!(f, "'{}' was terminated by a signal: {}", tool, detail),
            },
            CovError::Address(error) => write!(f, "{}", error),
            CovError::Message(error) => write!(f, "{}", error),
            CovError::ContentType(error) => write!(f, "{}", error),
            CovError::Transport(error) => write!(f, "{}", error),
            CovError::MissingSetting(key) => write!(f, "Missing setting: {}", key),
            CovError::State(error) => write!(f, "{}", error),
        }
    }
}

impl From<std::io::Error> for CovError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_yaml::Error> for CovError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SettingsParsing(err)
    }
}

impl From<calamine::XlsxError> for CovError {
    fn from(err: calamine::XlsxError) -> Self {
        Self::Workbook(err)
    }
}

impl<E: std::error::Error + Send + Sync> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for CovError
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<tera::Error> for CovError {
    fn from(err: tera::Error) -> Self {
        Self::Template(err)
    }
}

impl From<lettre::address::AddressError> for CovError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::Address(err)
    }
}

impl From<lettre::error::Error> for CovError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Message(err)
    }
}

impl From<lettre::message::header::ContentTypeErr> for CovError {
    fn from(err: lettre::message::header::ContentTypeErr) -> Self {
        Self::ContentType(err)
    }
}

impl From<lettre::transport::smtp::Error> for CovError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Transport(err)
    }
}
