/// Palette resolved from the high-contrast setting. Presentation components
/// read these values; nothing here is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: &'static str,
    pub text: &'static str,
    pub card_background: &'static str,
    pub card_border: &'static str,
    pub input_background: &'static str,
    pub input_border: &'static str,
    pub user_bubble: &'static str,
    pub ai_bubble: &'static str,
    pub sidebar_background: &'static str,
    pub sidebar_text: &'static str,
    pub sidebar_active: &'static str,
}

impl Theme {
    pub fn resolve(high_contrast: bool) -> Self {
        if high_contrast {
            Self {
                background: "#111827",
                text: "#f3f4f6",
                card_background: "#1f2937",
                card_border: "#374151",
                input_background: "#374151",
                input_border: "#4b5563",
                user_bubble: "#065f46",
                ai_bubble: "#3730a3",
                sidebar_background: "#1f2937",
                sidebar_text: "#e5e7eb",
                sidebar_active: "#374151",
            }
        } else {
            Self {
                background: "#f3f4f6",
                text: "#1f2937",
                card_background: "#ffffff",
                card_border: "#e5e7eb",
                input_background: "#ffffff",
                input_border: "#d1d5db",
                user_bubble: "#d1fae5",
                ai_bubble: "#e0e7ff",
                sidebar_background: "#f9fafb",
                sidebar_text: "#374151",
                sidebar_active: "#e5e7eb",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_contrast_flips_palette() {
        assert_ne!(Theme::resolve(true), Theme::resolve(false));
        assert_eq!(Theme::resolve(false).card_background, "#ffffff");
    }
}
