use crate::config::Config;
use crate::ir::Dataset;
use crate::layout::{
    LayoutParameters, Side, SideCount, assign_sides, calculate_layout, node_distribution,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub adjusted_spacing: f32,
    pub adjusted_branch: f32,
    pub total_width: f32,
    pub max_nodes: usize,
    pub smart_spacing: bool,
    pub upper_years: String,
    pub years: Vec<YearDump>,
    pub categories: Vec<CategoryDump>,
}

#[derive(Debug, Serialize)]
pub struct YearDump {
    pub year: i32,
    pub x: f32,
    pub side: Side,
    pub count: usize,
    pub above: usize,
    pub below: usize,
    pub methods: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDump {
    pub name: String,
    pub fill: String,
    pub count: usize,
}

impl LayoutDump {
    pub fn from_layout(params: &LayoutParameters, dataset: &Dataset, config: &Config) -> Self {
        let sides = assign_sides(params, &config.time_logic.upper_years);
        let distribution = node_distribution(dataset, &sides);
        let groups = dataset.by_year();

        let years = params
            .years
            .iter()
            .map(|year| {
                let counts = distribution.get(year).copied().unwrap_or(SideCount {
                    above: 0,
                    below: 0,
                    total: 0,
                });
                YearDump {
                    year: *year,
                    x: params.position(*year),
                    side: sides.get(year).copied().unwrap_or(Side::Above),
                    count: counts.total,
                    above: counts.above,
                    below: counts.below,
                    methods: groups
                        .get(year)
                        .map(|records| records.iter().map(|r| r.name.clone()).collect())
                        .unwrap_or_default(),
                }
            })
            .collect();

        let counts = dataset.category_counts();
        let categories = config
            .colors
            .category_colors(&dataset.categories())
            .into_iter()
            .map(|(name, fill)| CategoryDump {
                count: counts.get(&name).copied().unwrap_or(0),
                name,
                fill,
            })
            .collect();

        LayoutDump {
            adjusted_spacing: params.adjusted_spacing,
            adjusted_branch: params.adjusted_branch,
            total_width: params.total_width,
            max_nodes: params.max_nodes,
            smart_spacing: config.layout.smart_spacing,
            upper_years: config.time_logic.upper_years.clone(),
            years,
            categories,
        }
    }
}

pub fn write_layout_dump(path: &Path, dataset: &Dataset, config: &Config) -> anyhow::Result<()> {
    let params = calculate_layout(dataset, &config.layout);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(&params, dataset, config);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
