use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Palette for categories without a configured color. Indexed by the
/// category's sorted rank, wrapping around.
pub const DEFAULT_PALETTE: [&str; 20] = [
    "cyan!20",
    "green!20",
    "yellow!40",
    "purple!20",
    "orange!30",
    "red!20",
    "blue!20",
    "pink!20",
    "teal!20",
    "lime!30",
    "magenta!20",
    "brown!20",
    "violet!20",
    "olive!30",
    "navy!20",
    "maroon!20",
    "gray!30",
    "indigo!20",
    "gold!30",
    "coral!20",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub color_single: String,
    pub color_multi: String,
    pub color_adaptive: String,
    pub color_vl: String,
    pub color_dense: String,
    pub color_attention: String,
    pub color_hybrid: String,
    pub axis_color: String,
    pub conn_color: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            color_single: "cyan!20".to_string(),
            color_multi: "green!20".to_string(),
            color_adaptive: "yellow!40".to_string(),
            color_vl: "purple!20".to_string(),
            color_dense: "orange!30".to_string(),
            color_attention: "red!20".to_string(),
            color_hybrid: "gray!30".to_string(),
            axis_color: "black!70".to_string(),
            conn_color: "gray!60".to_string(),
        }
    }
}

impl ColorConfig {
    /// Fixed color for one of the well-known method families.
    pub fn known_color(&self, category: &str) -> Option<&str> {
        let color = match category {
            "singleproto" => &self.color_single,
            "multiproto" => &self.color_multi,
            "adaptive" => &self.color_adaptive,
            "vl" => &self.color_vl,
            "dense" => &self.color_dense,
            "attention" => &self.color_attention,
            "hybrid" => &self.color_hybrid,
            _ => return None,
        };
        Some(color.as_str())
    }

    /// `rank` is the category's position among the dataset's sorted
    /// categories; it only matters for unknown categories.
    pub fn color_for(&self, category: &str, rank: usize) -> String {
        match self.known_color(category) {
            Some(color) => color.to_string(),
            None => DEFAULT_PALETTE[rank % DEFAULT_PALETTE.len()].to_string(),
        }
    }

    /// Builds the mapping for exactly the given categories. Duplicates are
    /// collapsed before ranking.
    pub fn category_colors<S: AsRef<str>>(&self, categories: &[S]) -> BTreeMap<String, String> {
        let mut sorted: Vec<&str> = categories.iter().map(|c| c.as_ref()).collect();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
            .into_iter()
            .enumerate()
            .map(|(rank, category)| (category.to_string(), self.color_for(category, rank)))
            .collect()
    }
}

/// Border derived from a fill: the hue before the first `!`, darkened.
pub fn border_color(fill: &str) -> String {
    let base = fill.split('!').next().unwrap_or(fill);
    format!("{base}!60!black")
}
