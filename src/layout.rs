use crate::config::{LayoutConfig, TimeLogicConfig};
use crate::ir::Dataset;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Horizontal footprint assumed per node when smart spacing is on (cm).
pub const NODE_FOOTPRINT_CM: f32 = 2.5;
/// Extra branch length needed per stacked node (cm).
pub const BRANCH_PER_NODE_CM: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParameters {
    /// Distinct years, ascending.
    pub years: Vec<i32>,
    /// X coordinate of each year in cm.
    pub positions: BTreeMap<i32, f32>,
    pub adjusted_spacing: f32,
    pub adjusted_branch: f32,
    pub total_width: f32,
    pub year_counts: BTreeMap<i32, usize>,
    pub max_nodes: usize,
}

impl LayoutParameters {
    pub fn position(&self, year: i32) -> f32 {
        self.positions.get(&year).copied().unwrap_or(0.0)
    }
}

pub fn calculate_layout(dataset: &Dataset, config: &LayoutConfig) -> LayoutParameters {
    let mut year_counts: BTreeMap<i32, usize> = BTreeMap::new();
    for record in &dataset.records {
        *year_counts.entry(record.year).or_insert(0) += 1;
    }
    let max_nodes = year_counts.values().copied().max().unwrap_or(1).max(1);
    let years: Vec<i32> = year_counts.keys().copied().collect();

    info!(years = years.len(), max_nodes, "computing timeline layout");

    let (adjusted_spacing, adjusted_branch) = if config.smart_spacing {
        let required_width = max_nodes as f32 * NODE_FOOTPRINT_CM;
        let spacing = config
            .min_year_spacing
            .max(required_width.min(config.year_spacing));
        let branch = config
            .branch_distance
            .max(max_nodes as f32 * BRANCH_PER_NODE_CM);
        debug!(
            spacing = %format!("{spacing:.2}"),
            branch = %format!("{branch:.2}"),
            "smart spacing adjusted"
        );
        (spacing, branch)
    } else {
        (config.year_spacing, config.branch_distance)
    };

    let positions: BTreeMap<i32, f32> = years
        .iter()
        .enumerate()
        .map(|(idx, year)| (*year, idx as f32 * adjusted_spacing))
        .collect();

    let total_width = if years.len() > 1 {
        (years.len() - 1) as f32 * adjusted_spacing
    } else {
        0.0
    };

    info!(total_width = %format!("{total_width:.2}"), "layout computed");

    LayoutParameters {
        years,
        positions,
        adjusted_spacing,
        adjusted_branch,
        total_width,
        year_counts,
        max_nodes,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Above => "above",
            Side::Below => "below",
        }
    }

    /// Anchor of a method block facing the axis.
    pub fn anchor(self) -> &'static str {
        match self {
            Side::Above => "south",
            Side::Below => "north",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Above => "upper",
            Side::Below => "lower",
        }
    }

    fn from_flag(above: bool) -> Self {
        if above { Side::Above } else { Side::Below }
    }
}

/// Parsed form of `time_logic.upper_years`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideRule {
    /// Alternate by position in the sorted year list.
    Order,
    Odd,
    Even,
    /// Explicit set of years placed above the axis.
    Years(Vec<i32>),
}

impl SideRule {
    /// Malformed year lists fall back to `Order` with a warning.
    pub fn parse(rule: &str) -> Self {
        let rule = rule.trim().to_lowercase();
        match rule.as_str() {
            "order" | "sequence" | "index" => return SideRule::Order,
            "odd" => return SideRule::Odd,
            "even" => return SideRule::Even,
            _ => {}
        }

        let parsed: Result<Vec<i32>, _> = rule
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::parse::<i32>)
            .collect();
        match parsed {
            Ok(years) => SideRule::Years(years),
            Err(err) => {
                warn!(rule = %rule, error = %err, "invalid upper_years rule, falling back to 'order'");
                SideRule::Order
            }
        }
    }

    pub fn side(&self, year: i32, year_order: &[i32]) -> Side {
        match self {
            SideRule::Order => {
                let index = year_order.iter().position(|y| *y == year).unwrap_or(0);
                Side::from_flag(index % 2 == 0)
            }
            SideRule::Odd => Side::from_flag(year.rem_euclid(2) == 1),
            SideRule::Even => Side::from_flag(year.rem_euclid(2) == 0),
            SideRule::Years(years) => Side::from_flag(years.contains(&year)),
        }
    }
}

pub fn determine_side(year: i32, time_config: &TimeLogicConfig, year_order: &[i32]) -> Side {
    SideRule::parse(&time_config.upper_years).side(year, year_order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideCount {
    pub above: usize,
    pub below: usize,
    pub total: usize,
}

/// Above/below placement for every year on the axis.
pub type SideMap = BTreeMap<i32, Side>;

/// The side rule is parsed once so every consumer sees the same placement.
pub fn assign_sides(params: &LayoutParameters, upper_years: &str) -> SideMap {
    let rule = SideRule::parse(upper_years);
    params
        .years
        .iter()
        .map(|year| (*year, rule.side(*year, &params.years)))
        .collect()
}

/// Number of method nodes on each side of the axis, per year.
pub fn node_distribution(dataset: &Dataset, sides: &SideMap) -> BTreeMap<i32, SideCount> {
    dataset
        .by_year()
        .into_iter()
        .map(|(year, records)| {
            let total = records.len();
            let side = sides.get(&year).copied().unwrap_or(Side::Above);
            let count = SideCount {
                above: if side == Side::Above { total } else { 0 },
                below: if side == Side::Below { total } else { 0 },
                total,
            };
            (year, count)
        })
        .collect()
}
