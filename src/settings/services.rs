use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::SettingsRequest;
use super::repo_types::{
    Preferences, Settings, Theme, DEFAULT_CURRENCY, DEFAULT_NOTIFICATIONS, DEFAULT_THEME,
};
use crate::couples::services::active_couple_id;
use crate::db::Store;
use crate::error::AppError;

fn parse_theme(raw: Option<&str>) -> Result<Theme, AppError> {
    match raw.map(str::trim).unwrap_or_default().to_lowercase().as_str() {
        "" => Ok(DEFAULT_THEME),
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        "system" => Ok(Theme::System),
        other => Err(AppError::invalid(format!(
            "theme must be one of light, dark, system (got {other})"
        ))),
    }
}

fn parse_currency(raw: Option<&str>) -> Result<String, AppError> {
    let code = raw.map(str::trim).unwrap_or_default();
    if code.is_empty() {
        return Ok(DEFAULT_CURRENCY.to_string());
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::invalid("currency must be a 3-letter ISO code"));
    }
    Ok(code.to_ascii_uppercase())
}

pub fn preferences(req: &SettingsRequest, couple_id: Option<Uuid>) -> Result<Preferences, AppError> {
    Ok(Preferences {
        theme: parse_theme(req.theme.as_deref())?,
        currency: parse_currency(req.currency.as_deref())?,
        notifications: req.notifications.unwrap_or(DEFAULT_NOTIFICATIONS),
        couple_id,
    })
}

/// Stored settings, or the defaults when the user never saved any.
pub async fn get(store: &dyn Store, user_id: Uuid, now: OffsetDateTime) -> Result<Settings, AppError> {
    if let Some(settings) = store.find_settings(user_id).await? {
        return Ok(settings);
    }
    let mut defaults = Settings::defaults(user_id, now);
    defaults.couple_id = active_couple_id(store, user_id).await?;
    Ok(defaults)
}

pub async fn update(
    store: &dyn Store,
    user_id: Uuid,
    req: &SettingsRequest,
    now: OffsetDateTime,
) -> Result<Settings, AppError> {
    let couple_id = active_couple_id(store, user_id).await?;
    let prefs = preferences(req, couple_id)?;
    let settings = store.upsert_settings(user_id, &prefs, now).await?;
    info!(%user_id, "settings saved");
    Ok(settings)
}
