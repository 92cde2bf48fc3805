//! ChannelInfo - measurement channel identity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// One named, unit-labeled measurement stream.
///
/// Identity is the display key `"{name} ({unit})"`: two channels with the
/// same name and unit are interchangeable and map to the same table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelInfo {
    name: String,
    unit: String,
}

impl ChannelInfo {
    /// Create a channel.
    ///
    /// # Errors
    /// Returns [`ContractError::InvalidChannel`] if `name` or `unit` is empty.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Result<Self, ContractError> {
        let name = name.into();
        let unit = unit.into();

        if name.trim().is_empty() {
            return Err(ContractError::invalid_channel(
                format!("({unit})"),
                "channel name cannot be empty",
            ));
        }
        if unit.trim().is_empty() {
            return Err(ContractError::invalid_channel(
                name,
                "channel unit cannot be empty",
            ));
        }

        Ok(Self { name, unit })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Column key of this channel
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_key() {
        let channel = ChannelInfo::new("torque", "Nm").unwrap();
        assert_eq!(channel.display(), "torque (Nm)");
        assert_eq!(channel.to_string(), "torque (Nm)");
    }

    #[test]
    fn test_same_name_and_unit_are_interchangeable() {
        let a = ChannelInfo::new("load", "N").unwrap();
        let b = ChannelInfo::new("load", "N").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.display(), b.display());
    }

    #[test]
    fn test_empty_parts_rejected() {
        assert!(matches!(
            ChannelInfo::new("", "Nm"),
            Err(ContractError::InvalidChannel { .. })
        ));
        assert!(matches!(
            ChannelInfo::new("torque", "  "),
            Err(ContractError::InvalidChannel { .. })
        ));
    }
}
