use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// How a mapping treats more than one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MultiValueBehaviour {
    /// One field, first value only.
    #[default]
    Lazy,
    /// One field per value, up to the highest count observed in the run.
    Greedy,
    /// One row per value.
    Inline,
    /// As `Inline`, logging a warning whenever a value repeats.
    Warn,
}

impl MultiValueBehaviour {
    /// True for behaviours that multiply rows rather than columns.
    pub fn is_inline(&self) -> bool {
        matches!(self, MultiValueBehaviour::Inline | MultiValueBehaviour::Warn)
    }
}

impl FromStr for MultiValueBehaviour {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" => Ok(MultiValueBehaviour::Lazy),
            "greedy" => Ok(MultiValueBehaviour::Greedy),
            "inline" => Ok(MultiValueBehaviour::Inline),
            "warn" => Ok(MultiValueBehaviour::Warn),
            _ => Err(ConfigError::UnknownBehaviour(s.to_string())),
        }
    }
}

impl fmt::Display for MultiValueBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MultiValueBehaviour::Lazy => "Lazy",
            MultiValueBehaviour::Greedy => "Greedy",
            MultiValueBehaviour::Inline => "Inline",
            MultiValueBehaviour::Warn => "Warn",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("GREEDY".parse::<MultiValueBehaviour>().unwrap(), MultiValueBehaviour::Greedy);
        assert_eq!(" warn ".parse::<MultiValueBehaviour>().unwrap(), MultiValueBehaviour::Warn);
        assert!(matches!(
            "eager".parse::<MultiValueBehaviour>(),
            Err(ConfigError::UnknownBehaviour(name)) if name == "eager"
        ));
    }

    #[test]
    fn test_default_is_lazy() {
        assert_eq!(MultiValueBehaviour::default(), MultiValueBehaviour::Lazy);
        assert!(MultiValueBehaviour::Warn.is_inline());
        assert!(!MultiValueBehaviour::Greedy.is_inline());
    }
}
