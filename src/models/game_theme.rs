use serde::{Deserialize, Serialize};

/// A named color/shape palette attached to a board by value. Picking a
/// built-in theme copies it into the board, so later customization never
/// mutates the shared defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameTheme {
    pub name: String,
    pub background_color: String,
    pub background_image: Option<String>,
    pub card_color: String,
    pub card_text_color: String,
    pub header_color: String,
    pub header_text_color: String,
    pub title_color: String,
    pub border_radius: u32,
}

impl GameTheme {
    pub fn defaults() -> Vec<GameTheme> {
        return vec![
            GameTheme {
                name: "Classic Blue".to_string(),
                background_color: "#0f1419".to_string(),
                background_image: None,
                card_color: "#1e40af".to_string(),
                card_text_color: "#ffffff".to_string(),
                header_color: "#3b82f6".to_string(),
                header_text_color: "#ffffff".to_string(),
                title_color: "#60a5fa".to_string(),
                border_radius: 8,
            },
            GameTheme {
                name: "Royal Purple".to_string(),
                background_color: "#1e1b4b".to_string(),
                background_image: None,
                card_color: "#7c3aed".to_string(),
                card_text_color: "#ffffff".to_string(),
                header_color: "#8b5cf6".to_string(),
                header_text_color: "#ffffff".to_string(),
                title_color: "#a78bfa".to_string(),
                border_radius: 12,
            },
            GameTheme {
                name: "Emerald Green".to_string(),
                background_color: "#064e3b".to_string(),
                background_image: None,
                card_color: "#059669".to_string(),
                card_text_color: "#ffffff".to_string(),
                header_color: "#10b981".to_string(),
                header_text_color: "#ffffff".to_string(),
                title_color: "#34d399".to_string(),
                border_radius: 6,
            },
            GameTheme {
                name: "Sunset Orange".to_string(),
                background_color: "#7c2d12".to_string(),
                background_image: None,
                card_color: "#ea580c".to_string(),
                card_text_color: "#ffffff".to_string(),
                header_color: "#f97316".to_string(),
                header_text_color: "#ffffff".to_string(),
                title_color: "#fb923c".to_string(),
                border_radius: 10,
            },
        ];
    }

    pub fn by_name(name: &str) -> Option<GameTheme> {
        return Self::defaults().into_iter().find(|t| t.name == name);
    }
}

impl Default for GameTheme {
    fn default() -> Self {
        return Self::defaults().remove(0);
    }
}
