use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Builds output field names from a mapping's base name, the 0-based position
/// of the value, and the enclosing container's name and iteration index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NameFormat {
    /// `{name}`
    NoCounts,
    /// `{name}` for the first value, `{name}_{n}` afterwards.
    #[default]
    Compact,
    /// `{name}_{n}`
    WithCount,
    /// `{parent}_{name}` for the first value, `{parent}_{name}_{n}` afterwards.
    WithParentName,
    /// `{name}_{parent_count}_{n}`
    WithParentCount,
    /// A pattern using `{name}`, `{index}`, `{count}`, `{parent}`,
    /// `{parent_index}` and `{parent_count}`.
    Custom(String),
}

impl NameFormat {
    pub fn format(
        &self,
        name: &str,
        index: usize,
        parent: Option<&str>,
        parent_index: usize,
    ) -> String {
        let count = index + 1;
        match self {
            NameFormat::NoCounts => name.to_string(),
            NameFormat::Compact => compact(name, index),
            NameFormat::WithCount => format!("{}_{}", name, count),
            NameFormat::WithParentName => match parent {
                Some(parent) => compact(&format!("{}_{}", parent, name), index),
                None => compact(name, index),
            },
            NameFormat::WithParentCount => format!("{}_{}_{}", name, parent_index + 1, count),
            NameFormat::Custom(pattern) => pattern
                .replace("{name}", name)
                .replace("{index}", &index.to_string())
                .replace("{count}", &count.to_string())
                .replace("{parent_index}", &parent_index.to_string())
                .replace("{parent_count}", &(parent_index + 1).to_string())
                .replace("{parent}", parent.unwrap_or_default()),
        }
    }
}

fn compact(name: &str, index: usize) -> String {
    if index == 0 {
        name.to_string()
    } else {
        format!("{}_{}", name, index + 1)
    }
}

impl FromStr for NameFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('{') {
            return Ok(NameFormat::Custom(s.to_string()));
        }
        match s.trim().to_ascii_lowercase().as_str() {
            "nocounts" => Ok(NameFormat::NoCounts),
            "compact" => Ok(NameFormat::Compact),
            "withcount" => Ok(NameFormat::WithCount),
            "withparentname" => Ok(NameFormat::WithParentName),
            "withparentcount" => Ok(NameFormat::WithParentCount),
            _ => Err(ConfigError::UnknownNameFormat(s.to_string())),
        }
    }
}

impl fmt::Display for NameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameFormat::NoCounts => f.write_str("NoCounts"),
            NameFormat::Compact => f.write_str("Compact"),
            NameFormat::WithCount => f.write_str("WithCount"),
            NameFormat::WithParentName => f.write_str("WithParentName"),
            NameFormat::WithParentCount => f.write_str("WithParentCount"),
            NameFormat::Custom(pattern) => f.write_str(pattern),
        }
    }
}
