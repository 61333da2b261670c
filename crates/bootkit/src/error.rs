use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnsupportedArchitecture(String),
    UnsupportedProfile(String),
    UnsupportedLibc(String),
    Msg(String),
}

impl Error {
    pub fn msg<M: Into<String>>(msg: M) -> Self {
        Self::Msg(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedArchitecture(v) => write!(
                f,
                "unsupported architecture '{v}' (expected one of: amd64, arm64)"
            ),
            Self::UnsupportedProfile(v) => write!(
                f,
                "unsupported build profile '{v}' (expected one of: minimal, default, full)"
            ),
            Self::UnsupportedLibc(v) => write!(
                f,
                "unsupported libc variant '{v}' (expected one of: glibc, musl)"
            ),
            Self::Msg(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::msg(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
