//! # Port Configuration Output
//!
//! Rewrites the raw output of a port-configuration query into a normalized
//! [`PortConfig`] document.
//!
//! Engine output carries the query result as an embedded JSON object. The
//! last complete top-level object in the text is parsed, its
//! `stdout_lines[0]` configuration lines are interpreted for the switch OS,
//! and every occurrence of the object is replaced by the normalized JSON.
//! Surrounding text is kept as-is.
//!
//! Only `fos` configuration syntax is understood.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Switch OS whose `switchport` configuration lines are understood.
pub const FOS: &str = "fos";

const MODE_PREFIX: &str = "switchport mode ";
const ACCESS_VLAN_PREFIX: &str = "switchport access vlan ";
const TRUNK_VLANS_PREFIX: &str = "switchport trunk allowed vlan ";

/// Normalized port configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Switchport mode, e.g. `access` or `trunk`.
    pub mode: Option<String>,
    /// Access VLAN.
    pub vlan: Option<i64>,
    /// Allowed trunk VLANs in range notation, e.g. `1-12,15,17-20`.
    pub trunked_vlans: String,
}

/// Errors from [`format_port_config`].
#[derive(Error, Debug)]
pub enum FormatError {
    /// The output's braces do not balance.
    #[error("invalid json format: unbalanced braces in '{fragment}'")]
    UnbalancedBraces {
        /// Text collected from the unterminated object.
        fragment: String,
    },

    /// The output contains no embedded object.
    #[error("no configuration object found in output")]
    NoConfiguration,

    /// The embedded object is not valid JSON.
    #[error("invalid json format: {0}")]
    Json(#[from] serde_json::Error),

    /// The object has no `stdout_lines[0]` list of strings.
    #[error("configuration object has no stdout_lines")]
    MissingStdoutLines,

    /// An access VLAN line does not carry an integer.
    #[error("invalid access vlan in '{line}'")]
    InvalidVlan {
        /// The offending configuration line.
        line: String,
    },

    /// The OS has no configuration parser.
    #[error("invalid os type '{os}'")]
    UnsupportedOs {
        /// The requested OS.
        os: String,
    },
}

/// Replace the port configuration object embedded in `data` with its
/// normalized [`PortConfig`] JSON.
pub fn format_port_config(data: &str, os: &str) -> Result<String, FormatError> {
    let source = last_object(data)?;
    let parsed: Value = serde_json::from_str(&source.replace('\n', " "))?;

    let config = match os {
        FOS => parse_fos(&parsed)?,
        other => {
            return Err(FormatError::UnsupportedOs {
                os: other.to_string(),
            })
        }
    };
    Ok(data.replace(source, &serde_json::to_string(&config)?))
}

/// The last complete top-level `{...}` span in `data`.
fn last_object(data: &str) -> Result<&str, FormatError> {
    let mut depth = 0usize;
    let mut start = None;
    let mut last = None;
    for (i, c) in data.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    last = start.map(|s| &data[s..=i]);
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        let fragment = start.map_or("", |s| &data[s..]);
        return Err(FormatError::UnbalancedBraces {
            fragment: fragment.to_string(),
        });
    }
    last.ok_or(FormatError::NoConfiguration)
}

fn parse_fos(parsed: &Value) -> Result<PortConfig, FormatError> {
    let lines = parsed
        .get("stdout_lines")
        .and_then(|v| v.get(0))
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingStdoutLines)?;

    let mut config = PortConfig::default();
    for line in lines.iter().filter_map(Value::as_str) {
        if let Some(mode) = line.strip_prefix(MODE_PREFIX) {
            config.mode = Some(mode.to_string());
        } else if let Some(vlan) = line.strip_prefix(ACCESS_VLAN_PREFIX) {
            let vlan = vlan.trim().parse().map_err(|_| FormatError::InvalidVlan {
                line: line.to_string(),
            })?;
            config.vlan = Some(vlan);
        } else if let Some(vlans) = line.strip_prefix(TRUNK_VLANS_PREFIX) {
            config.trunked_vlans = vlans.to_string();
        }
    }
    Ok(config)
}
