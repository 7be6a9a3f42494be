#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
#[cfg(feature = "cli")]
pub mod logging;
pub mod parser;
pub mod render;
pub mod sample;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ConfigError, ConfigFile, LayoutConfig, load_config};
pub use ir::{Dataset, Record};
pub use layout::{LayoutParameters, Side, SideRule, calculate_layout, determine_side};
pub use parser::{DataError, load_dataset};
pub use render::{generate, write_output};
pub use theme::ColorConfig;
