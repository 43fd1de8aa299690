use serde::{Deserialize, Serialize};

/// UI font scaling step. Wire values match the stored document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontSize {
    #[serde(rename = "sm")]
    Small,
    #[default]
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "lg")]
    Large,
    #[serde(rename = "xl")]
    ExtraLarge,
}

/// Per-user settings singleton, stored at
/// `users/{uid}/settings/userSettings`. Created with defaults on first read
/// if absent, never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub high_contrast_mode: bool,
    #[serde(default)]
    pub font_size: FontSize,
}

/// Merge-update for the settings singleton.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_contrast_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
}

/// A single settings change, dispatched from the settings panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingUpdate {
    HighContrastMode(bool),
    FontSize(FontSize),
}

impl SettingUpdate {
    pub fn into_patch(self) -> SettingsPatch {
        match self {
            SettingUpdate::HighContrastMode(on) => SettingsPatch {
                high_contrast_mode: Some(on),
                ..SettingsPatch::default()
            },
            SettingUpdate::FontSize(size) => SettingsPatch {
                font_size: Some(size),
                ..SettingsPatch::default()
            },
        }
    }
}

impl SettingsPatch {
    pub fn apply_to(&self, settings: &mut UserSettings) {
        if let Some(on) = self.high_contrast_mode {
            settings.high_contrast_mode = on;
        }
        if let Some(size) = self.font_size {
            settings.font_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run() {
        let settings = UserSettings::default();
        assert!(!settings.high_contrast_mode);
        assert_eq!(settings.font_size, FontSize::Base);
    }

    #[test]
    fn font_size_wire_values() {
        assert_eq!(serde_json::to_string(&FontSize::Small).unwrap(), "\"sm\"");
        assert_eq!(
            serde_json::to_string(&FontSize::ExtraLarge).unwrap(),
            "\"xl\""
        );
    }

    #[test]
    fn update_becomes_sparse_patch() {
        let patch = SettingUpdate::FontSize(FontSize::Large).into_patch();
        let json = serde_json::to_value(patch).unwrap();
        assert_eq!(json, serde_json::json!({ "font_size": "lg" }));

        let mut settings = UserSettings::default();
        settings.high_contrast_mode = true;
        patch.apply_to(&mut settings);
        assert_eq!(settings.font_size, FontSize::Large);
        assert!(settings.high_contrast_mode, "unrelated field untouched");
    }
}
