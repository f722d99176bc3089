use serde::Deserialize;

/// Body of `PUT /settings`. Blank theme or currency fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub notifications: Option<bool>,
}
