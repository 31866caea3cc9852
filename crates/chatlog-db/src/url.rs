use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::InitError;

/// Location of the SQLite backend.
///
/// Accepts SQLAlchemy-style urls (`sqlite:///relative.db`,
/// `sqlite:////absolute.db`, `sqlite+aiosqlite:///...`), sqlx-style urls
/// (`sqlite://path`, `sqlite::memory:`) and bare filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    Memory,
    File(PathBuf),
}

impl FromStr for DatabaseUrl {
    type Err = InitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InitError::UnsupportedUrl(s.to_string()));
        }
        if s == ":memory:" {
            return Ok(Self::Memory);
        }

        let Some((scheme, rest)) = s.split_once(':').filter(|(scheme, _)| is_scheme(scheme)) else {
            return Ok(Self::File(PathBuf::from(s)));
        };
        if scheme != "sqlite" && !scheme.starts_with("sqlite+") {
            return Err(InitError::UnsupportedUrl(s.to_string()));
        }

        let path = match rest.strip_prefix("//") {
            Some(after_authority) => after_authority.strip_prefix('/').unwrap_or(after_authority),
            None => rest,
        };
        match path {
            "" | ":memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

/// A url scheme is at least two characters, so Windows drive letters stay paths.
fn is_scheme(s: &str) -> bool {
    s.len() > 1
        && s.starts_with(|c: char| c.is_ascii_alphabetic())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(p: &str) -> DatabaseUrl {
        DatabaseUrl::File(PathBuf::from(p))
    }

    #[test]
    fn sqlalchemy_style() {
        assert_eq!("sqlite:///./chat_logs.db".parse::<DatabaseUrl>().unwrap(), file("./chat_logs.db"));
        assert_eq!(
            "sqlite+aiosqlite:///./chat_logs.db".parse::<DatabaseUrl>().unwrap(),
            file("./chat_logs.db")
        );
        assert_eq!("sqlite:////var/lib/chat.db".parse::<DatabaseUrl>().unwrap(), file("/var/lib/chat.db"));
        assert_eq!("sqlite://".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!("sqlite:///:memory:".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
    }

    #[test]
    fn sqlx_style_and_bare_paths() {
        assert_eq!("sqlite::memory:".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!(":memory:".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!("sqlite://data/chat.db".parse::<DatabaseUrl>().unwrap(), file("data/chat.db"));
        assert_eq!("chat_logs.db".parse::<DatabaseUrl>().unwrap(), file("chat_logs.db"));
        assert_eq!("/tmp/a:b.db".parse::<DatabaseUrl>().unwrap(), file("/tmp/a:b.db"));
    }

    #[test]
    fn other_backends_are_rejected() {
        assert!(matches!(
            "postgresql+asyncpg://user@host/db".parse::<DatabaseUrl>(),
            Err(InitError::UnsupportedUrl(_))
        ));
        assert!(matches!("  ".parse::<DatabaseUrl>(), Err(InitError::UnsupportedUrl(_))));
    }
}
