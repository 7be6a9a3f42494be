use crate::config::{
    ArrowOverrides, ColorOverrides, ConfigFile, LayoutOverrides, OutputOverrides, TimeDirection,
    TimeLogicOverrides, VisualOverrides, load_config,
};
use crate::layout_dump::write_layout_dump;
use crate::logging::init_logging;
use crate::parser::{load_dataset, validate_file};
use crate::render::{generate, write_output};
use crate::sample::write_sample_csv;
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "fishbone",
    version,
    about = "Generate LaTeX/TikZ timeline fishbone diagrams from CSV/JSON data",
    after_help = "Examples:\n  fishbone -i data.csv -o timeline.tex\n  fishbone -i data.csv --smart-spacing --max-lines 2\n  fishbone -i data.csv -c config.yaml\n  fishbone --create-sample sample_data.csv\n  fishbone --validate data.csv"
)]
pub struct Args {
    /// Create a sample CSV file and exit
    #[arg(long = "create-sample", value_name = "FILE", conflicts_with_all = ["validate", "input"])]
    pub create_sample: Option<PathBuf>,

    /// Validate a data file and exit
    #[arg(long = "validate", value_name = "FILE", conflicts_with = "input")]
    pub validate: Option<PathBuf>,

    /// Input CSV or JSON file
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output LaTeX file, or '-' for stdout [default: timeline.tex]
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Write the computed layout as JSON
    #[arg(long = "dump-layout", value_name = "FILE")]
    pub dump_layout: Option<PathBuf>,

    #[arg(long = "timeline-width", help_heading = "Layout")]
    pub timeline_width: Option<String>,

    /// Year spacing in cm [default: 2.7]
    #[arg(long = "year-spacing", help_heading = "Layout")]
    pub year_spacing: Option<f32>,

    /// Branch distance in cm [default: 1.2]
    #[arg(long = "branch-distance", help_heading = "Layout")]
    pub branch_distance: Option<f32>,

    /// Spine length in cm [default: 0.4]
    #[arg(long = "spine-length", help_heading = "Layout")]
    pub spine_length: Option<f32>,

    /// Adapt spacing to the densest year
    #[arg(long = "smart-spacing", help_heading = "Layout")]
    pub smart_spacing: bool,

    /// Lower bound for smart spacing in cm [default: 2.0]
    #[arg(long = "min-year-spacing", help_heading = "Layout")]
    pub min_year_spacing: Option<f32>,

    #[arg(long = "time-direction", value_enum, help_heading = "Time logic")]
    pub time_direction: Option<TimeDirection>,

    #[arg(long = "start-year", help_heading = "Time logic")]
    pub start_year: Option<i32>,

    #[arg(long = "end-year", help_heading = "Time logic")]
    pub end_year: Option<i32>,

    /// Years above the axis: order, odd, even, or a comma-separated list
    #[arg(long = "upper-years", help_heading = "Time logic")]
    pub upper_years: Option<String>,

    #[arg(long = "lower-years", help_heading = "Time logic")]
    pub lower_years: Option<String>,

    #[arg(long = "node-width", help_heading = "Visual style")]
    pub node_width: Option<String>,

    #[arg(long = "node-height", help_heading = "Visual style")]
    pub node_height: Option<String>,

    #[arg(long = "node-font", allow_hyphen_values = true, help_heading = "Visual style")]
    pub node_font: Option<String>,

    #[arg(long = "ref-font", allow_hyphen_values = true, help_heading = "Visual style")]
    pub ref_font: Option<String>,

    #[arg(long = "inner-sep", help_heading = "Visual style")]
    pub inner_sep: Option<String>,

    #[arg(long = "line-width", help_heading = "Visual style")]
    pub line_width: Option<String>,

    #[arg(long = "rounded-corners", help_heading = "Visual style")]
    pub rounded_corners: Option<String>,

    /// Lines per method node: 1 or 2
    #[arg(long = "max-lines", value_parser = clap::value_parser!(u8).range(1..=2), help_heading = "Visual style")]
    pub max_lines: Option<u8>,

    #[arg(long = "color-single", help_heading = "Colors")]
    pub color_single: Option<String>,

    #[arg(long = "color-multi", help_heading = "Colors")]
    pub color_multi: Option<String>,

    #[arg(long = "color-adaptive", help_heading = "Colors")]
    pub color_adaptive: Option<String>,

    #[arg(long = "color-vl", help_heading = "Colors")]
    pub color_vl: Option<String>,

    #[arg(long = "color-dense", help_heading = "Colors")]
    pub color_dense: Option<String>,

    #[arg(long = "color-attention", help_heading = "Colors")]
    pub color_attention: Option<String>,

    #[arg(long = "color-hybrid", help_heading = "Colors")]
    pub color_hybrid: Option<String>,

    #[arg(long = "axis-color", help_heading = "Colors")]
    pub axis_color: Option<String>,

    #[arg(long = "conn-color", help_heading = "Colors")]
    pub conn_color: Option<String>,

    /// Arrow tip in TikZ syntax
    #[arg(long = "arrow-style", allow_hyphen_values = true, help_heading = "Arrows")]
    pub arrow_style: Option<String>,

    #[arg(long = "arrow-color", help_heading = "Arrows")]
    pub arrow_color: Option<String>,

    #[arg(long = "arrow-shorten", help_heading = "Arrows")]
    pub arrow_shorten: Option<String>,

    #[arg(long = "show-legend", conflicts_with = "hide_legend", help_heading = "Output")]
    pub show_legend: bool,

    #[arg(long = "hide-legend", help_heading = "Output")]
    pub hide_legend: bool,

    #[arg(long = "caption", help_heading = "Output")]
    pub caption: Option<String>,

    #[arg(long = "caption-suffix", help_heading = "Output")]
    pub caption_suffix: Option<String>,

    #[arg(long = "label", help_heading = "Output")]
    pub label: Option<String>,

    #[arg(long = "adjustbox-width", help_heading = "Output")]
    pub adjustbox_width: Option<String>,

    #[arg(long = "legend-title", help_heading = "Output")]
    pub legend_title: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only report errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Flags given on the command line, as the topmost config layer.
    pub fn overrides(&self) -> ConfigFile {
        let legend = if self.hide_legend {
            Some(false)
        } else if self.show_legend {
            Some(true)
        } else {
            None
        };

        ConfigFile {
            layout: Some(LayoutOverrides {
                timeline_width: self.timeline_width.clone(),
                year_spacing: self.year_spacing,
                branch_distance: self.branch_distance,
                spine_length: self.spine_length,
                smart_spacing: self.smart_spacing.then_some(true),
                min_year_spacing: self.min_year_spacing,
            }),
            time_logic: Some(TimeLogicOverrides {
                time_direction: self.time_direction,
                start_year: self.start_year,
                end_year: self.end_year,
                upper_years: self.upper_years.clone(),
                lower_years: self.lower_years.clone(),
            }),
            visual: Some(VisualOverrides {
                node_width: self.node_width.clone(),
                node_height: self.node_height.clone(),
                node_font: self.node_font.clone(),
                ref_font: self.ref_font.clone(),
                inner_sep: self.inner_sep.clone(),
                line_width: self.line_width.clone(),
                rounded_corners: self.rounded_corners.clone(),
                max_lines: self.max_lines,
            }),
            colors: Some(ColorOverrides {
                color_single: self.color_single.clone(),
                color_multi: self.color_multi.clone(),
                color_adaptive: self.color_adaptive.clone(),
                color_vl: self.color_vl.clone(),
                color_dense: self.color_dense.clone(),
                color_attention: self.color_attention.clone(),
                color_hybrid: self.color_hybrid.clone(),
                axis_color: self.axis_color.clone(),
                conn_color: self.conn_color.clone(),
            }),
            arrows: Some(ArrowOverrides {
                arrow_style: self.arrow_style.clone(),
                arrow_color: self.arrow_color.clone(),
                arrow_shorten: self.arrow_shorten.clone(),
            }),
            output: Some(OutputOverrides {
                input_file: self.input.as_ref().map(|p| p.display().to_string()),
                output_file: self.output.as_ref().map(|p| p.display().to_string()),
                show_legend: legend,
                caption: self.caption.clone(),
                caption_suffix: self.caption_suffix.clone(),
                label: self.label.clone(),
                adjustbox_width: self.adjustbox_width.clone(),
                legend_title: self.legend_title.clone(),
            }),
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level())?;

    if let Some(path) = args.create_sample.as_deref() {
        let dataset = write_sample_csv(path)?;
        if !args.quiet {
            println!("[OK] sample data written: {}", path.display());
            println!(
                "  {} records, {} years",
                dataset.len(),
                dataset.years().len()
            );
        }
        return Ok(());
    }

    if let Some(path) = args.validate.as_deref() {
        return match validate_file(path) {
            Ok(summary) => {
                println!("[OK] data is valid: {}", path.display());
                println!("{summary}");
                Ok(())
            }
            Err(err) => {
                println!("[ERROR] validation failed: {}", path.display());
                Err(err.into())
            }
        };
    }

    let Some(input) = args.input.as_deref() else {
        return Err(anyhow::anyhow!(
            "an input file is required (-i/--input), or use --create-sample / --validate"
        ));
    };

    let config = load_config(args.config.as_deref())?.merge(&args.overrides());
    config.validate()?;

    let dataset = load_dataset(input)?;
    let latex = generate(&dataset, &config);

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &dataset, &config)?;
    }

    let output = PathBuf::from(&config.output.output_file);
    if output == Path::new("-") {
        write_output(&latex, None)?;
    } else {
        write_output(&latex, Some(&output))?;
        if !args.quiet {
            println!("[OK] generated: {}", output.display());
        }
    }

    Ok(())
}
