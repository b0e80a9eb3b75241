//! 配置校验模块
//!
//! 校验规则：
//! - episode_length >= 1, episode_count >= 1
//! - num_ego >= 1 (没有 ego 就没有数据)
//! - tick_interval > 0, timeout_sec > 0
//! - save_path 非空
//! - towns 覆盖表非空且不重复
//! - ood.classes 非空且不重复

use std::collections::HashSet;

use contracts::{HarvestConfig, HarvestError};

/// 校验 HarvestConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &HarvestConfig) -> Result<(), HarvestError> {
    validate_run(config)?;
    validate_connection(config)?;
    validate_world(config)?;
    validate_ood(config)?;
    Ok(())
}

fn validate_run(config: &HarvestConfig) -> Result<(), HarvestError> {
    let run = &config.run;

    if run.save_path.as_os_str().is_empty() {
        return Err(HarvestError::config_validation(
            "run.save_path",
            "save_path must not be empty",
        ));
    }
    if run.episode_length == 0 {
        return Err(HarvestError::config_validation(
            "run.episode_length",
            "episode_length must be >= 1 capture tick",
        ));
    }
    if run.episode_count == 0 {
        return Err(HarvestError::config_validation(
            "run.episode_count",
            "episode_count must be >= 1",
        ));
    }
    if run.num_ego == 0 {
        return Err(HarvestError::config_validation(
            "run.num_ego",
            "at least one ego vehicle is required",
        ));
    }
    Ok(())
}

fn validate_connection(config: &HarvestConfig) -> Result<(), HarvestError> {
    let connection = &config.connection;

    if connection.timeout_sec <= 0.0 {
        return Err(HarvestError::config_validation(
            "connection.timeout_sec",
            format!("timeout must be > 0, got {}", connection.timeout_sec),
        ));
    }
    if connection.host.is_empty() {
        return Err(HarvestError::config_validation(
            "connection.host",
            "host must not be empty",
        ));
    }
    Ok(())
}

fn validate_world(config: &HarvestConfig) -> Result<(), HarvestError> {
    let world = &config.world;

    if world.tick_interval <= 0.0 {
        return Err(HarvestError::config_validation(
            "world.tick_interval",
            format!("tick_interval must be > 0, got {}", world.tick_interval),
        ));
    }

    if let Some(towns) = &world.towns {
        if towns.is_empty() {
            return Err(HarvestError::config_validation(
                "world.towns",
                "town rotation override must not be empty",
            ));
        }
        let mut seen = HashSet::new();
        for town in towns {
            if !seen.insert(town) {
                return Err(HarvestError::config_validation(
                    format!("world.towns[{town}]"),
                    "duplicate town in rotation",
                ));
            }
        }
    }
    Ok(())
}

fn validate_ood(config: &HarvestConfig) -> Result<(), HarvestError> {
    let Some(ood) = &config.ood else {
        return Ok(());
    };

    if ood.classes.is_empty() {
        return Err(HarvestError::config_validation(
            "ood.classes",
            "ood enabled but no actor classes listed",
        ));
    }
    let mut seen = HashSet::new();
    for class in &ood.classes {
        if !seen.insert(class) {
            return Err(HarvestError::config_validation(
                format!("ood.classes[{class}]"),
                "duplicate ood class",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OodConfig;

    fn minimal_config() -> HarvestConfig {
        serde_json::from_str(r#"{"run": {"save_path": "./dataset", "episode_length": 10}}"#)
            .unwrap()
    }

    #[test]
    fn minimal_config_is_valid() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn rejects_zero_ego() {
        let mut config = minimal_config();
        config.run.num_ego = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("num_ego"));
    }

    #[test]
    fn rejects_empty_ood_classes() {
        let mut config = minimal_config();
        config.ood = Some(OodConfig { classes: vec![] });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_ood_classes() {
        let mut config = minimal_config();
        config.ood = Some(OodConfig {
            classes: vec!["walker.animal.deer".into(), "walker.animal.deer".into()],
        });
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_duplicate_towns() {
        let mut config = minimal_config();
        config.world.towns = Some(vec!["Town01".into(), "Town01".into()]);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_nonpositive_tick_interval() {
        let mut config = minimal_config();
        config.world.tick_interval = 0.0;
        assert!(validate(&config).is_err());
    }
}
