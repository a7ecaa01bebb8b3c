//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, VadConfig};
use crate::domain::error::ConfigError;
use crate::domain::recording::{Bitrate, Duration, VadTuning};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::Unset { key } => handle_unset(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let mut config = store.load().await?;
    set_value(&mut config, key, Some(value))?;
    store.save(&config).await?;

    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_unset<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let mut config = store.load().await?;
    set_value(&mut config, key, None)?;
    store.save(&config).await?;

    presenter.success(&format!("{} unset", key));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;

    let config = store.load().await?;
    presenter.output(get_value(&config, key).as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, get_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Read a key as its display string
fn get_value(config: &AppConfig, key: &str) -> Option<String> {
    let vad = config.vad.as_ref();
    match key {
        "device_id" => config.device_id.clone(),
        "bitrate_kbps" => config.bitrate_kbps.map(|v| v.to_string()),
        "output_dir" => config.output_dir.clone(),
        "max_duration" => config.max_duration.clone(),
        "vad.aggressiveness" => vad.and_then(|v| v.aggressiveness).map(|v| v.to_string()),
        "vad.onset_ms" => vad.and_then(|v| v.onset_ms).map(|v| v.to_string()),
        "vad.redemption_ms" => vad.and_then(|v| v.redemption_ms).map(|v| v.to_string()),
        "vad.min_speech_ms" => vad.and_then(|v| v.min_speech_ms).map(|v| v.to_string()),
        "vad.pre_speech_pad_ms" => vad.and_then(|v| v.pre_speech_pad_ms).map(|v| v.to_string()),
        _ => None,
    }
}

/// Validate and write a key; `None` clears it
fn set_value(config: &mut AppConfig, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match key {
        "device_id" => {
            config.device_id = value
                .map(|v| {
                    let trimmed = v.trim();
                    if trimmed.is_empty() {
                        return Err(invalid(key, "Device id cannot be empty"));
                    }
                    Ok(trimmed.to_string())
                })
                .transpose()?;
        }
        "bitrate_kbps" => {
            config.bitrate_kbps = value
                .map(|v| {
                    v.parse::<Bitrate>()
                        .map(|b| b.kbps())
                        .map_err(|e| invalid(key, e.to_string()))
                })
                .transpose()?;
        }
        "output_dir" => config.output_dir = value.map(str::to_string),
        "max_duration" => {
            config.max_duration = value
                .map(|v| {
                    v.parse::<Duration>()
                        .map(|d| d.to_string())
                        .map_err(|e| invalid(key, e.to_string()))
                })
                .transpose()?;
        }
        vad_key => {
            let field = vad_key
                .strip_prefix("vad.")
                .ok_or_else(|| invalid(key, "Unknown key"))?;
            let parsed = value.map(|v| parse_vad_value(key, field, v)).transpose()?;
            let vad = config.vad.get_or_insert_with(VadConfig::default);
            match field {
                "aggressiveness" => vad.aggressiveness = parsed.map(|v| v as u8),
                "onset_ms" => vad.onset_ms = parsed,
                "redemption_ms" => vad.redemption_ms = parsed,
                "min_speech_ms" => vad.min_speech_ms = parsed,
                "pre_speech_pad_ms" => vad.pre_speech_pad_ms = parsed,
                _ => return Err(invalid(key, "Unknown key")),
            }
            if config.vad.as_ref() == Some(&VadConfig::default()) {
                config.vad = None;
            }
        }
    }
    Ok(())
}

fn parse_vad_value(key: &str, field: &str, value: &str) -> Result<u32, ConfigError> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|_| invalid(key, "Value must be a whole number"))?;

    if field == "aggressiveness" && parsed > u32::from(VadTuning::MAX_AGGRESSIVENESS) {
        return Err(invalid(
            key,
            format!("Value must be between 0 and {}", VadTuning::MAX_AGGRESSIVENESS),
        ));
    }
    if field.ends_with("_ms") && field != "pre_speech_pad_ms" && parsed == 0 {
        return Err(invalid(key, "Value must be greater than zero"));
    }
    Ok(parsed)
}
