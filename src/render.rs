use crate::config::{Config, LayoutConfig, OutputConfig, VisualConfig};
use crate::ir::{Dataset, Record};
use crate::layout::{LayoutParameters, Side, SideMap, assign_sides, calculate_layout};
use crate::theme::border_color;
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

const RULE: &str = "% ========================================";

/// Category name to fill color, for exactly the categories in the dataset.
pub type ColorMap = BTreeMap<String, String>;

/// Renders the complete figure. Same dataset and config always give the same
/// bytes.
pub fn generate(dataset: &Dataset, config: &Config) -> String {
    info!(records = dataset.len(), "generating LaTeX");

    let categories = dataset.categories();
    info!(
        count = categories.len(),
        categories = %categories.join(", "),
        "categories detected"
    );
    let colors = config.colors.category_colors(&categories);
    let params = calculate_layout(dataset, &config.layout);
    let sides = assign_sides(&params, &config.time_logic.upper_years);

    let latex = render_latex(dataset, &params, &sides, &colors, config);
    info!(
        chars = latex.chars().count(),
        lines = latex.lines().count(),
        "LaTeX generated"
    );
    latex
}

/// Concatenates the sections in drawing order.
pub fn render_latex(
    dataset: &Dataset,
    params: &LayoutParameters,
    sides: &SideMap,
    colors: &ColorMap,
    config: &Config,
) -> String {
    let parts = [
        preamble(&config.output),
        styles(colors, config),
        axis(params),
        method_nodes(dataset, params, sides, &config.visual),
        background_layer(params, sides, &config.layout),
        year_markers(params),
        bounding_box(),
        caption(colors, &config.output),
    ];
    parts.join("\n")
}

fn side_of(sides: &SideMap, year: i32) -> Side {
    sides.get(&year).copied().unwrap_or(Side::Above)
}

pub fn preamble(output: &OutputConfig) -> String {
    let lines = [
        "% Required packages/settings (add these in LaTeX preamble):".to_string(),
        r"% \usepackage{tikz}".to_string(),
        r"% \usepackage{xcolor}".to_string(),
        r"% \usepackage{adjustbox} % provide smart scaling".to_string(),
        r"% \usepackage{geometry}".to_string(),
        r"% \geometry{a4paper, left=2.5cm, right=2.5cm,".to_string(),
        r"%   top=2.5cm, bottom=2.5cm}".to_string(),
        r"% \usetikzlibrary{positioning, matrix, fit,".to_string(),
        r"%   backgrounds, shapes, arrows.meta}".to_string(),
        String::new(),
        r"\begin{figure}[htbp]".to_string(),
        r"\centering".to_string(),
        format!(
            r"\begin{{adjustbox}}{{center, max width={}, max height=0.8\textheight, keepaspectratio}}",
            output.adjustbox_width
        ),
        r"\pgfdeclarelayer{background}".to_string(),
        r"\pgfdeclarelayer{foreground}".to_string(),
        r"\pgfsetlayers{background,main,foreground}".to_string(),
        r"\begin{tikzpicture}[".to_string(),
        "    scale=1.0,".to_string(),
        "    transform shape,".to_string(),
        r"    font=\footnotesize\sffamily,".to_string(),
    ];
    lines.join("\n")
}

/// One style per category followed by the fixed helper styles; closes the
/// tikzpicture option list.
pub fn styles(colors: &ColorMap, config: &Config) -> String {
    let visual = &config.visual;
    let mut out = vec![
        format!("    {RULE}"),
        "    % Category color definitions".to_string(),
        format!("    {RULE}"),
    ];

    for (category, fill) in colors {
        out.push(format!(
            "    {category}/.style={{\n        fill={fill}, draw={}, line width={},\n        rounded corners={}, minimum width={}, minimum height={},\n        align=center, font={}, text=black!80, inner sep={}\n    }},",
            border_color(fill),
            visual.line_width,
            visual.rounded_corners,
            visual.node_width,
            visual.node_height,
            visual.node_font,
            visual.inner_sep,
        ));
    }

    out.extend([
        "    year/.style={".to_string(),
        "        circle, fill=white, draw=black,".to_string(),
        "        line width=1.2pt,".to_string(),
        r"        minimum size=0.75cm, font=\bfseries\footnotesize, inner sep=0pt".to_string(),
        "    },".to_string(),
        "    axis/.style={".to_string(),
        format!("        line width=1.5pt, draw={}", config.colors.axis_color),
        "    },".to_string(),
        "    arrow/.style={".to_string(),
        format!("        {},", config.arrows.arrow_style),
        "        line width=0.8pt,".to_string(),
        format!("        draw={},", config.arrows.arrow_color),
        format!("        shorten >={},", config.arrows.arrow_shorten),
        format!("        shorten <={}", config.arrows.arrow_shorten),
        "    },".to_string(),
        "    spine/.style={".to_string(),
        "        line width=0.8pt, draw=gray!50, -".to_string(),
        "    },".to_string(),
        "    conn/.style={".to_string(),
        format!("        line width=0.5pt, draw={}", config.colors.conn_color),
        "    },".to_string(),
        "    methodmatrix/.style={".to_string(),
        "        matrix of nodes, row sep=4pt, column sep=3pt,".to_string(),
        "        nodes in empty cells, inner sep=0pt".to_string(),
        "    }".to_string(),
        "]".to_string(),
    ]);

    out.join("\n")
}

/// Axis line, one coordinate per year and an arrow between neighbours.
pub fn axis(params: &LayoutParameters) -> String {
    let mut lines = vec![
        format!("    {RULE}"),
        "    % 1. Draw timeline axis and define year coordinates".to_string(),
        format!("    {RULE}"),
        format!(r"    \draw[axis] (0,0) -- ({},0);", fmt_cm(params.total_width)),
        String::new(),
        "    % Define year positions".to_string(),
    ];

    for year in &params.years {
        lines.push(format!(
            r"    \coordinate (Y{year}) at ({},0);",
            fmt_cm(params.position(*year))
        ));
    }

    if params.years.len() > 1 {
        let pairs: Vec<String> = params
            .years
            .windows(2)
            .map(|pair| format!("{}/{}", pair[0], pair[1]))
            .collect();
        lines.push(String::new());
        lines.push("    % Draw arrows between year nodes".to_string());
        lines.push(format!(r"    \foreach \year/\nextyear in {{{}}} {{", pairs.join(",")));
        lines.push(r"        \draw[arrow] (Y\year) -- (Y\nextyear);".to_string());
        lines.push("    }".to_string());
    }

    lines.join("\n")
}

/// Text inside a method node: the name plus its citation, on one or two lines.
pub fn format_method_text(name: &str, citation_key: &str, visual: &VisualConfig) -> String {
    let reference = format!(r"{{{}\cite{{{citation_key}}}}}", visual.ref_font);
    if visual.max_lines == 1 {
        format!("{name}~{reference}")
    } else {
        format!(r"{name}\\[-2pt]{reference}")
    }
}

pub fn method_nodes(
    dataset: &Dataset,
    params: &LayoutParameters,
    sides: &SideMap,
    visual: &VisualConfig,
) -> String {
    let mut lines = vec![
        String::new(),
        format!("    {RULE}"),
        "    % 2. Define all method nodes".to_string(),
        format!("    {RULE}"),
    ];
    let branch = fmt_cm(params.adjusted_branch);

    for (year, group) in dataset.by_year() {
        let side = side_of(sides, year);
        lines.push(String::new());
        lines.push(format!("    % --- {year} ({}) ---", side.label()));

        if let [record] = group.as_slice() {
            lines.push(format!(
                r"    \node[{}, {}={branch}cm of Y{year}] (M{year}) {{{}}};",
                record.category,
                side.as_str(),
                format_method_text(&record.name, &record.citation_key, visual)
            ));
            continue;
        }

        lines.push(format!(
            r"    \matrix[methodmatrix, {}={branch}cm of Y{year}, anchor={}] (M{year}) {{",
            side.as_str(),
            side.anchor()
        ));
        for row in matrix_rows(&group) {
            match row {
                [single] => lines.push(format!(r"        {} \\", matrix_cell(single, visual))),
                [left, right] => {
                    lines.push(format!("        {} &", matrix_cell(left, visual)));
                    lines.push(format!(r"        {} \\", matrix_cell(right, visual)));
                }
                _ => {}
            }
        }
        lines.push("    };".to_string());
    }

    lines.join("\n")
}

/// Years with more than three methods are packed two per row.
fn matrix_rows<'a>(group: &'a [&'a Record]) -> Vec<&'a [&'a Record]> {
    if group.len() > 3 {
        group.chunks(2).collect()
    } else {
        group.chunks(1).collect()
    }
}

fn matrix_cell(record: &Record, visual: &VisualConfig) -> String {
    format!(
        r"\node[{}] {{{}}};",
        record.category,
        format_method_text(&record.name, &record.citation_key, visual)
    )
}

/// Spines and method connectors, drawn beneath everything else.
pub fn background_layer(params: &LayoutParameters, sides: &SideMap, layout: &LayoutConfig) -> String {
    let spine = fmt_cm(layout.spine_length);
    let mut lines = vec![
        String::new(),
        format!("    {RULE}"),
        "    % 3. Draw all connections in background layer".to_string(),
        format!("    {RULE}"),
        r"    \begin{pgfonlayer}{background}".to_string(),
        "        % Year node spines".to_string(),
        format!(r"        \foreach \year in {{{}}} {{", year_list(&params.years)),
        format!(r"            \draw[spine] (Y\year.north) -- ++(0,{spine});"),
        format!(r"            \draw[spine] (Y\year.south) -- ++(0,-{spine});"),
        "        }".to_string(),
        String::new(),
        "        % Connect methods to year nodes".to_string(),
    ];

    for year in &params.years {
        let side = side_of(sides, *year);
        let shift = match side {
            Side::Above => spine.clone(),
            Side::Below => format!("-{spine}"),
        };
        lines.push(format!(
            r"        \draw[conn] (M{year}.{}) -- ([yshift={shift}cm]Y{year});",
            side.anchor()
        ));
    }

    lines.push(r"    \end{pgfonlayer}".to_string());
    lines.join("\n")
}

/// Year circles go on the foreground layer so arrows never cover them.
pub fn year_markers(params: &LayoutParameters) -> String {
    let lines = [
        String::new(),
        format!("    {RULE}"),
        "    % 4. Draw year nodes on top layer".to_string(),
        format!("    {RULE}"),
        r"    \begin{pgfonlayer}{foreground}".to_string(),
        format!(r"        \foreach \year in {{{}}} {{", year_list(&params.years)),
        r"            \node[year] at (Y\year) {\year};".to_string(),
        "        }".to_string(),
        r"    \end{pgfonlayer}".to_string(),
    ];
    lines.join("\n")
}

pub fn bounding_box() -> String {
    let lines = [
        String::new(),
        format!("    {RULE}"),
        "    % 5. Extend bounding box".to_string(),
        format!("    {RULE}"),
        r"    \path (current bounding box.south west) +(-0.3,-0.5) (current bounding box.north east) +(0.3,0.5);"
            .to_string(),
    ];
    lines.join("\n")
}

/// Closes the picture and writes caption, legend and label.
pub fn caption(colors: &ColorMap, output: &OutputConfig) -> String {
    let mut lines = vec![
        r"\end{tikzpicture}".to_string(),
        r"\end{adjustbox}".to_string(),
        format!(r"\caption{{{}{}", output.caption, output.caption_suffix),
    ];

    if output.show_legend {
        let swatches: Vec<String> = colors
            .iter()
            .map(|(category, fill)| legend_swatch(category, fill))
            .collect();
        lines.push(format!("{}{}", output.legend_title, swatches.join(" ")));
    }

    lines.push("}".to_string());
    lines.push(format!(r"\label{{{}}}", output.label));
    lines.push(r"\end{figure}".to_string());
    lines.join("\n")
}

fn legend_swatch(category: &str, fill: &str) -> String {
    format!(
        r"{{\protect\tikz[baseline=-0.5ex]\protect\node[fill={fill},draw={},rounded corners=2pt,inner sep=2pt,font=\tiny] {{{category}}};}}",
        border_color(fill)
    )
}

fn year_list(years: &[i32]) -> String {
    years
        .iter()
        .map(|year| year.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Centimetre values with at most three decimals and no trailing zeros.
pub fn fmt_cm(value: f32) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

pub fn write_output(latex: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, latex)?;
            info!(path = %path.display(), chars = latex.chars().count(), "LaTeX file written");
        }
        None => {
            print!("{}", latex);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeLogicConfig;

    fn scenario() -> Dataset {
        Dataset::new(vec![
            Record::new(2020, "a", "M1", "R1"),
            Record::new(2021, "b", "M2", "R2"),
            Record::new(2022, "a", "M3", "R3"),
        ])
    }

    fn prepared(dataset: &Dataset, config: &Config) -> (LayoutParameters, SideMap, ColorMap) {
        let params = calculate_layout(dataset, &config.layout);
        let sides = assign_sides(&params, &config.time_logic.upper_years);
        let colors = config.colors.category_colors(&dataset.categories());
        (params, sides, colors)
    }

    fn balanced(text: &str) -> bool {
        let mut depth: i64 = 0;
        let mut prev = '\0';
        for ch in text.chars() {
            if prev != '\\' {
                match ch {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth < 0 {
                    return false;
                }
            }
            prev = if prev == '\\' && ch == '\\' { '\0' } else { ch };
        }
        depth == 0
    }

    #[test]
    fn formats_centimetres() {
        assert_eq!(fmt_cm(0.0), "0");
        assert_eq!(fmt_cm(2.7), "2.7");
        assert_eq!(fmt_cm(2.7 * 3.0), "8.1");
        assert_eq!(fmt_cm(1.25), "1.25");
        assert_eq!(fmt_cm(-0.0001), "0");
    }

    #[test]
    fn method_text_on_one_or_two_lines() {
        let mut visual = VisualConfig::default();
        assert_eq!(
            format_method_text("MyMethod", "MyRef", &visual),
            r"MyMethod~{\tiny\cite{MyRef}}"
        );
        visual.max_lines = 2;
        assert_eq!(
            format_method_text("MyMethod", "MyRef", &visual),
            r"MyMethod\\[-2pt]{\tiny\cite{MyRef}}"
        );
        assert_eq!(
            format_method_text(r"R\&D 100\%", "K", &VisualConfig::default()),
            r"R\&D 100\%~{\tiny\cite{K}}"
        );
    }

    #[test]
    fn escaped_names_pass_through_matrix_cells() {
        let config = Config::default();
        let dataset = Dataset::new(vec![
            Record::new(2020, "a", r"Top\%", "K1"),
            Record::new(2020, "a", r"R\&D", "K2"),
        ]);
        let (params, sides, _) = prepared(&dataset, &config);
        let text = method_nodes(&dataset, &params, &sides, &config.visual);
        assert!(text.contains(r"        \node[a] {Top\%~{\tiny\cite{K1}}}; \\"));
        assert!(text.contains(r"        \node[a] {R\&D~{\tiny\cite{K2}}}; \\"));
        assert!(!text.contains(r"\\%"));
        assert!(balanced(&text));
        assert!(balanced(&generate(&dataset, &config)));
    }

    #[test]
    fn preamble_uses_adjustbox_width() {
        let output = OutputConfig {
            adjustbox_width: r"\linewidth".to_string(),
            ..OutputConfig::default()
        };
        let text = preamble(&output);
        assert!(text.contains(r"\begin{figure}[htbp]"));
        assert!(text.contains(r"max width=\linewidth,"));
        assert!(text.contains(r"\pgfsetlayers{background,main,foreground}"));
        assert!(text.ends_with(r"font=\footnotesize\sffamily,"));
    }

    #[test]
    fn style_per_category_with_derived_border() {
        let config = Config::default();
        let (_, _, colors) = prepared(&scenario(), &config);
        let text = styles(&colors, &config);
        assert_eq!(text.matches("/.style={").count(), 2 + 6);
        assert!(text.contains("    a/.style={\n        fill=cyan!20, draw=cyan!60!black, line width=0.8pt,"));
        assert!(text.contains("    b/.style={\n        fill=green!20, draw=green!60!black,"));
        assert!(text.find("a/.style").unwrap() < text.find("b/.style").unwrap());
        assert!(text.contains("draw=black!70"));
        assert!(text.contains("-{Stealth[length=3mm, width=2mm]},"));
        assert!(text.ends_with("    }\n]"));
    }

    #[test]
    fn axis_has_coordinates_and_arrows() {
        let config = Config::default();
        let (params, _, _) = prepared(&scenario(), &config);
        let text = axis(&params);
        assert!(text.contains(r"\draw[axis] (0,0) -- (5.4,0);"));
        assert!(text.contains(r"\coordinate (Y2020) at (0,0);"));
        assert!(text.contains(r"\coordinate (Y2021) at (2.7,0);"));
        assert!(text.contains(r"\coordinate (Y2022) at (5.4,0);"));
        assert!(text.contains(r"\foreach \year/\nextyear in {2020/2021,2021/2022} {"));
    }

    #[test]
    fn single_year_axis_has_no_arrows() {
        let dataset = Dataset::new(vec![Record::new(2024, "a", "Solo", "S")]);
        let (params, _, _) = prepared(&dataset, &Config::default());
        let text = axis(&params);
        assert!(!text.contains(r"\draw[arrow]"));
        assert!(text.contains(r"\draw[axis] (0,0) -- (0,0);"));
    }

    #[test]
    fn single_records_become_plain_nodes() {
        let config = Config::default();
        let dataset = scenario();
        let (params, sides, _) = prepared(&dataset, &config);
        let text = method_nodes(&dataset, &params, &sides, &config.visual);
        assert_eq!(text.matches(r"\node[").count(), 3);
        assert_eq!(text.matches(r"\matrix[").count(), 0);
        assert!(text.contains(r"\node[a, above=1.2cm of Y2020] (M2020) {M1~{\tiny\cite{R1}}};"));
        assert!(text.contains(r"\node[b, below=1.2cm of Y2021] (M2021) {M2~{\tiny\cite{R2}}};"));
        assert!(text.contains("% --- 2021 (lower) ---"));
    }

    #[test]
    fn small_groups_use_one_cell_per_row() {
        let config = Config::default();
        let dataset = Dataset::new(vec![
            Record::new(2020, "a", "M1", "R1"),
            Record::new(2020, "b", "M2", "R2"),
            Record::new(2020, "a", "M3", "R3"),
        ]);
        let (params, sides, _) = prepared(&dataset, &config);
        let text = method_nodes(&dataset, &params, &sides, &config.visual);
        assert_eq!(text.matches(r"\matrix[").count(), 1);
        assert_eq!(text.matches(r"\node[").count(), 3);
        assert_eq!(text.matches(r" \\").count(), 3);
        assert!(!text.contains(" &"));
        assert!(text.contains(r"\matrix[methodmatrix, above=1.2cm of Y2020, anchor=south] (M2020) {"));
        let m1 = text.find("M1~").unwrap();
        let m2 = text.find("M2~").unwrap();
        let m3 = text.find("M3~").unwrap();
        assert!(m1 < m2 && m2 < m3);
    }

    #[test]
    fn dense_groups_pair_cells() {
        let config = Config::default();
        let records: Vec<Record> = (0..5)
            .map(|idx| Record::new(2021, "a", &format!("N{idx}"), &format!("K{idx}")))
            .chain([Record::new(2020, "b", "First", "F")])
            .collect();
        let dataset = Dataset::new(records);
        let (params, sides, _) = prepared(&dataset, &config);
        let text = method_nodes(&dataset, &params, &sides, &config.visual);
        assert_eq!(text.matches(r"\matrix[").count(), 1);
        assert_eq!(text.matches(r"\node[").count(), 6);
        assert_eq!(text.matches(" &\n").count(), 2);
        assert!(text.contains(r"\matrix[methodmatrix, below=1.2cm of Y2021, anchor=north] (M2021) {"));
        assert!(text.contains("        \\node[a] {N4~{\\tiny\\cite{K4}}}; \\\\\n    };"));
    }

    #[test]
    fn connectors_follow_side() {
        let config = Config::default();
        let (params, sides, _) = prepared(&scenario(), &config);
        let text = background_layer(&params, &sides, &config.layout);
        assert!(text.contains(r"\foreach \year in {2020,2021,2022} {"));
        assert!(text.contains(r"\draw[spine] (Y\year.north) -- ++(0,0.4);"));
        assert!(text.contains(r"\draw[spine] (Y\year.south) -- ++(0,-0.4);"));
        assert!(text.contains(r"\draw[conn] (M2020.south) -- ([yshift=0.4cm]Y2020);"));
        assert!(text.contains(r"\draw[conn] (M2021.north) -- ([yshift=-0.4cm]Y2021);"));
        assert_eq!(text.matches(r"\draw[conn]").count(), 3);
        assert!(text.trim_end().ends_with(r"\end{pgfonlayer}"));
    }

    #[test]
    fn sides_agree_with_explicit_rule() {
        let mut config = Config::default();
        config.time_logic = TimeLogicConfig {
            upper_years: "2021".to_string(),
            ..TimeLogicConfig::default()
        };
        let dataset = scenario();
        let (params, sides, _) = prepared(&dataset, &config);
        let nodes = method_nodes(&dataset, &params, &sides, &config.visual);
        let conns = background_layer(&params, &sides, &config.layout);
        assert!(nodes.contains("below=1.2cm of Y2020"));
        assert!(nodes.contains("above=1.2cm of Y2021"));
        assert!(conns.contains(r"(M2020.north) -- ([yshift=-0.4cm]Y2020)"));
        assert!(conns.contains(r"(M2021.south) -- ([yshift=0.4cm]Y2021)"));
    }

    #[test]
    fn caption_with_and_without_legend() {
        let config = Config::default();
        let (_, _, colors) = prepared(&scenario(), &config);
        let text = caption(&colors, &config.output);
        assert!(text.contains("\\caption{时间线鱼骨图。\n颜色标识："));
        assert!(text.contains("颜色标识："));
        assert_eq!(text.matches(r"\protect\tikz").count(), 2);
        assert!(text.contains(r"\protect\node[fill=cyan!20,draw=cyan!60!black,"));
        assert!(text.contains(r"\label{fig:timeline}"));
        assert!(balanced(&text));

        let output = OutputConfig {
            show_legend: false,
            caption: "Methods".to_string(),
            caption_suffix: String::new(),
            ..OutputConfig::default()
        };
        let text = caption(&colors, &output);
        assert!(!text.contains(r"\tikz"));
        assert!(text.contains("\\caption{Methods\n}\n"));
        assert!(text.ends_with(r"\end{figure}"));
        assert!(balanced(&text));
    }

    #[test]
    fn full_document_is_balanced_and_deterministic() {
        let config = Config::default();
        let dataset = scenario();
        let first = generate(&dataset, &config);
        let second = generate(&dataset, &config);
        assert_eq!(first, second);
        assert!(balanced(&first));
        assert!(first.starts_with("% Required packages"));
        assert!(first.ends_with(r"\end{figure}"));
        assert_eq!(first.matches(r"\begin{pgfonlayer}").count(), 2);
        assert_eq!(first.matches(r"\end{pgfonlayer}").count(), 2);
    }
}
