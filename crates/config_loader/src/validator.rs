//! Configuration validation
//!
//! Rules:
//! - field-level constraints declared on the blueprint types
//! - sensor id unique
//! - channel key unique within a sensor and across all sensors
//! - generator parameters finite, sine frequency > 0, sequence non-empty

use std::collections::{HashMap, HashSet};

use contracts::{AcquisitionBlueprint, ContractError, GeneratorConfig};
use ::validator::Validate;

/// Validate an AcquisitionBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &AcquisitionBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_sensor_ids(blueprint)?;
    validate_channel_keys(blueprint)?;
    validate_generators(blueprint)?;
    Ok(())
}

fn validate_fields(blueprint: &AcquisitionBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let fields = errors
            .errors()
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ContractError::config_validation(fields, errors.to_string())
    })
}

fn validate_sensor_ids(blueprint: &AcquisitionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sensor in &blueprint.sensors {
        if !seen.insert(sensor.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("sensors[id={}]", sensor.id),
                "duplicate sensor id",
            ));
        }
    }
    Ok(())
}

fn validate_channel_keys(blueprint: &AcquisitionBlueprint) -> Result<(), ContractError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for sensor in &blueprint.sensors {
        for channel in &sensor.channels {
            let key = channel.key();
            if let Some(owner) = owners.insert(key.clone(), sensor.id.as_str()) {
                return Err(ContractError::config_validation(
                    format!("sensors[{}].channels[{}]", sensor.id, key),
                    format!("duplicate channel key (already on sensor '{owner}')"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_generators(blueprint: &AcquisitionBlueprint) -> Result<(), ContractError> {
    for sensor in &blueprint.sensors {
        let field = format!("sensors[{}].generator", sensor.id);
        match &sensor.generator {
            GeneratorConfig::Nan => {}
            GeneratorConfig::Constant { value } => {
                if !value.is_finite() {
                    return Err(ContractError::config_validation(field, "value must be finite"));
                }
            }
            GeneratorConfig::Gaussian { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(ContractError::config_validation(
                        field,
                        format!("invalid gaussian parameters mean={mean}, std_dev={std_dev}"),
                    ));
                }
            }
            GeneratorConfig::Sine { frequency_hz, .. } => {
                if *frequency_hz <= 0.0 {
                    return Err(ContractError::config_validation(
                        field,
                        format!("frequency_hz must be > 0, got {frequency_hz}"),
                    ));
                }
            }
            GeneratorConfig::Sequence { values } => {
                if values.is_empty() {
                    return Err(ContractError::config_validation(
                        field,
                        "sequence cannot be empty",
                    ));
                }
            }
        }
    }
    Ok(())
}
