use crate::theme::ColorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("visual.max_lines must be 1 or 2, got {0}")]
    InvalidMaxLines(u8),
    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub timeline_width: String,
    pub year_spacing: f32,
    pub branch_distance: f32,
    pub spine_length: f32,
    pub smart_spacing: bool,
    pub min_year_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            timeline_width: "16cm".to_string(),
            year_spacing: 2.7,
            branch_distance: 1.2,
            spine_length: 0.4,
            smart_spacing: false,
            min_year_spacing: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TimeDirection {
    Right,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLogicConfig {
    pub time_direction: TimeDirection,
    pub start_year: i32,
    pub end_year: i32,
    /// `order`, `odd`, `even`, or a comma-separated year list.
    pub upper_years: String,
    pub lower_years: String,
}

impl Default for TimeLogicConfig {
    fn default() -> Self {
        Self {
            time_direction: TimeDirection::Right,
            start_year: 2019,
            end_year: 2025,
            upper_years: "order".to_string(),
            lower_years: "even".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub node_width: String,
    pub node_height: String,
    pub node_font: String,
    pub ref_font: String,
    pub inner_sep: String,
    pub line_width: String,
    pub rounded_corners: String,
    pub max_lines: u8,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            node_width: "2.6cm".to_string(),
            node_height: "0.5cm".to_string(),
            node_font: r"\tiny\bfseries".to_string(),
            ref_font: r"\tiny".to_string(),
            inner_sep: "1.5pt".to_string(),
            line_width: "0.8pt".to_string(),
            rounded_corners: "3pt".to_string(),
            max_lines: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowConfig {
    pub arrow_style: String,
    pub arrow_color: String,
    pub arrow_shorten: String,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            arrow_style: "-{Stealth[length=3mm, width=2mm]}".to_string(),
            arrow_color: "gray!70".to_string(),
            arrow_shorten: "0.38cm".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub input_file: String,
    pub output_file: String,
    pub show_legend: bool,
    pub caption: String,
    /// Appended to the caption text, before the legend.
    pub caption_suffix: String,
    pub label: String,
    pub adjustbox_width: String,
    /// Text placed before the legend swatches inside the caption.
    pub legend_title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            input_file: String::new(),
            output_file: "timeline.tex".to_string(),
            show_legend: true,
            caption: "时间线鱼骨图".to_string(),
            caption_suffix: "。".to_string(),
            label: "fig:timeline".to_string(),
            adjustbox_width: r"0.8\textwidth".to_string(),
            legend_title: "颜色标识：".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub time_logic: TimeLogicConfig,
    pub visual: VisualConfig,
    pub colors: ColorConfig,
    pub arrows: ArrowConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.visual.max_lines {
            1 | 2 => Ok(()),
            other => Err(ConfigError::InvalidMaxLines(other)),
        }
    }

    /// Returns a copy with every field present in `overrides` replaced.
    pub fn merge(&self, overrides: &ConfigFile) -> Config {
        let mut config = self.clone();
        config.apply(overrides.clone());
        config
    }

    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(layout) = file.layout {
            if let Some(v) = layout.timeline_width {
                self.layout.timeline_width = v;
            }
            if let Some(v) = layout.year_spacing {
                self.layout.year_spacing = v;
            }
            if let Some(v) = layout.branch_distance {
                self.layout.branch_distance = v;
            }
            if let Some(v) = layout.spine_length {
                self.layout.spine_length = v;
            }
            if let Some(v) = layout.smart_spacing {
                self.layout.smart_spacing = v;
            }
            if let Some(v) = layout.min_year_spacing {
                self.layout.min_year_spacing = v;
            }
        }

        if let Some(time) = file.time_logic {
            if let Some(v) = time.time_direction {
                self.time_logic.time_direction = v;
            }
            if let Some(v) = time.start_year {
                self.time_logic.start_year = v;
            }
            if let Some(v) = time.end_year {
                self.time_logic.end_year = v;
            }
            if let Some(v) = time.upper_years {
                self.time_logic.upper_years = v;
            }
            if let Some(v) = time.lower_years {
                self.time_logic.lower_years = v;
            }
        }

        if let Some(visual) = file.visual {
            if let Some(v) = visual.node_width {
                self.visual.node_width = v;
            }
            if let Some(v) = visual.node_height {
                self.visual.node_height = v;
            }
            if let Some(v) = visual.node_font {
                self.visual.node_font = v;
            }
            if let Some(v) = visual.ref_font {
                self.visual.ref_font = v;
            }
            if let Some(v) = visual.inner_sep {
                self.visual.inner_sep = v;
            }
            if let Some(v) = visual.line_width {
                self.visual.line_width = v;
            }
            if let Some(v) = visual.rounded_corners {
                self.visual.rounded_corners = v;
            }
            if let Some(v) = visual.max_lines {
                self.visual.max_lines = v;
            }
        }

        if let Some(colors) = file.colors {
            if let Some(v) = colors.color_single {
                self.colors.color_single = v;
            }
            if let Some(v) = colors.color_multi {
                self.colors.color_multi = v;
            }
            if let Some(v) = colors.color_adaptive {
                self.colors.color_adaptive = v;
            }
            if let Some(v) = colors.color_vl {
                self.colors.color_vl = v;
            }
            if let Some(v) = colors.color_dense {
                self.colors.color_dense = v;
            }
            if let Some(v) = colors.color_attention {
                self.colors.color_attention = v;
            }
            if let Some(v) = colors.color_hybrid {
                self.colors.color_hybrid = v;
            }
            if let Some(v) = colors.axis_color {
                self.colors.axis_color = v;
            }
            if let Some(v) = colors.conn_color {
                self.colors.conn_color = v;
            }
        }

        if let Some(arrows) = file.arrows {
            if let Some(v) = arrows.arrow_style {
                self.arrows.arrow_style = v;
            }
            if let Some(v) = arrows.arrow_color {
                self.arrows.arrow_color = v;
            }
            if let Some(v) = arrows.arrow_shorten {
                self.arrows.arrow_shorten = v;
            }
        }

        if let Some(output) = file.output {
            if let Some(v) = output.input_file {
                self.output.input_file = v;
            }
            if let Some(v) = output.output_file {
                self.output.output_file = v;
            }
            if let Some(v) = output.show_legend {
                self.output.show_legend = v;
            }
            if let Some(v) = output.caption {
                self.output.caption = v;
            }
            if let Some(v) = output.caption_suffix {
                self.output.caption_suffix = v;
            }
            if let Some(v) = output.label {
                self.output.label = v;
            }
            if let Some(v) = output.adjustbox_width {
                self.output.adjustbox_width = v;
            }
            if let Some(v) = output.legend_title {
                self.output.legend_title = v;
            }
        }
    }

    pub fn save_yaml(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Partial config: only the fields that are present override the base.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub layout: Option<LayoutOverrides>,
    pub time_logic: Option<TimeLogicOverrides>,
    pub visual: Option<VisualOverrides>,
    pub colors: Option<ColorOverrides>,
    pub arrows: Option<ArrowOverrides>,
    pub output: Option<OutputOverrides>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutOverrides {
    pub timeline_width: Option<String>,
    pub year_spacing: Option<f32>,
    pub branch_distance: Option<f32>,
    pub spine_length: Option<f32>,
    pub smart_spacing: Option<bool>,
    pub min_year_spacing: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeLogicOverrides {
    pub time_direction: Option<TimeDirection>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub upper_years: Option<String>,
    pub lower_years: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualOverrides {
    pub node_width: Option<String>,
    pub node_height: Option<String>,
    pub node_font: Option<String>,
    pub ref_font: Option<String>,
    pub inner_sep: Option<String>,
    pub line_width: Option<String>,
    pub rounded_corners: Option<String>,
    pub max_lines: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorOverrides {
    pub color_single: Option<String>,
    pub color_multi: Option<String>,
    pub color_adaptive: Option<String>,
    pub color_vl: Option<String>,
    pub color_dense: Option<String>,
    pub color_attention: Option<String>,
    pub color_hybrid: Option<String>,
    pub axis_color: Option<String>,
    pub conn_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrowOverrides {
    pub arrow_style: Option<String>,
    pub arrow_color: Option<String>,
    pub arrow_shorten: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputOverrides {
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    pub show_legend: Option<bool>,
    pub caption: Option<String>,
    pub caption_suffix: Option<String>,
    pub label: Option<String>,
    pub adjustbox_width: Option<String>,
    pub legend_title: Option<String>,
}

pub fn parse_config_file(contents: &str, extension: &str) -> anyhow::Result<ConfigFile> {
    let parsed = match extension.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => {
            // An empty YAML document deserializes to unit, not a map.
            if contents.trim().is_empty() {
                ConfigFile::default()
            } else {
                serde_yaml::from_str(contents)?
            }
        }
        "json" => match serde_json::from_str(contents) {
            Ok(parsed) => parsed,
            Err(_) => json5::from_str(contents)?,
        },
        other => return Err(ConfigError::UnsupportedFormat(format!(".{other}")).into()),
    };
    Ok(parsed)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let contents = std::fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("failed to read config {}: {err}", path.display()))?;
    let parsed = parse_config_file(&contents, extension)?;
    config.apply(parsed);
    config.validate()?;

    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_only_present_fields() {
        let yaml = r#"
layout:
  smart_spacing: true
  year_spacing: 3
visual:
  max_lines: 2
output:
  caption: Methods
"#;
        let parsed = parse_config_file(yaml, "yaml").unwrap();
        let config = Config::default().merge(&parsed);
        assert!(config.layout.smart_spacing);
        assert_eq!(config.layout.year_spacing, 3.0);
        assert_eq!(config.layout.branch_distance, 1.2);
        assert_eq!(config.visual.max_lines, 2);
        assert_eq!(config.visual.node_width, "2.6cm");
        assert_eq!(config.output.caption, "Methods");
        assert!(config.output.show_legend);
    }

    #[test]
    fn json5_fallback_accepts_comments() {
        let json = r#"{
  // widen the axis
  "layout": { "year_spacing": 3.5, },
  "time_logic": { "upper_years": "odd", "time_direction": "left" },
}"#;
        let parsed = parse_config_file(json, "json").unwrap();
        let config = Config::default().merge(&parsed);
        assert_eq!(config.layout.year_spacing, 3.5);
        assert_eq!(config.time_logic.upper_years, "odd");
        assert_eq!(config.time_logic.time_direction, TimeDirection::Left);
    }

    #[test]
    fn later_layers_win() {
        let file: ConfigFile =
            serde_json::from_str(r#"{"colors": {"axis_color": "blue"}, "arrows": {"arrow_color": "red"}}"#)
                .unwrap();
        let flags: ConfigFile = serde_json::from_str(r#"{"colors": {"axis_color": "green"}}"#).unwrap();
        let config = Config::default().merge(&file).merge(&flags);
        assert_eq!(config.colors.axis_color, "green");
        assert_eq!(config.arrows.arrow_color, "red");
        assert_eq!(config.colors.conn_color, "gray!60");
    }

    #[test]
    fn rejects_unknown_extension_and_bad_max_lines() {
        assert!(parse_config_file("{}", "toml").is_err());
        let mut config = Config::default();
        config.visual.max_lines = 3;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxLines(3)));
    }

    #[test]
    fn empty_yaml_is_defaults() {
        let parsed = parse_config_file("", "yml").unwrap();
        assert_eq!(Config::default().merge(&parsed), Config::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.layout.smart_spacing = true;
        config.output.label = "fig:methods".to_string();

        let yaml_path = dir.path().join("config.yaml");
        config.save_yaml(&yaml_path).unwrap();
        assert_eq!(load_config(Some(&yaml_path)).unwrap(), config);

        let json_path = dir.path().join("config.json");
        config.save_json(&json_path).unwrap();
        assert_eq!(load_config(Some(&json_path)).unwrap(), config);
    }
}
