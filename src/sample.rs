use crate::ir::{Dataset, Record};
use crate::parser::Column;
use std::path::Path;
use tracing::info;

const SAMPLE: [(i32, &str, &str, &str); 18] = [
    (2019, "singleproto", "PANet", "Wang2019PANet"),
    (2020, "multiproto", "PPNet", "Liu2020PPNet"),
    (2021, "multiproto", "ASGNet", "Li2021ASGNet"),
    (2021, "dense", "HSNet", "Min2021HSNet"),
    (2021, "attention", "CWT", "Lu2021CWT"),
    (2022, "singleproto", "PFENet", "Tian2022PFENet"),
    (2022, "singleproto", "BAM", "Lang2022BAM"),
    (2022, "adaptive", "DPCN", "Liu2022DynamicPC"),
    (2023, "adaptive", "Self-reg", "Ding2023Selfregularized"),
    (2023, "attention", "HDMNet", "Peng2023HDMNet"),
    (2023, "hybrid", "SCCAN", "Xu2023SCCAN"),
    (2024, "vl", "Proto-CLIP", "P2024ProtoCLIP"),
    (2024, "vl", "TransBA", "Chen2024TransformerBA"),
    (2024, "vl", "Zhu et al.", "Zhu2024Unleashing"),
    (2024, "adaptive", "AdaptiveSS", "Shen2024AdaptiveSS"),
    (2024, "hybrid", "DAM", "Chen2024DAM"),
    (2025, "multiproto", "HMPD", "Xu2025HMPD"),
    (2025, "multiproto", "ProtoPT", "Yu2025PrototypicalPT"),
];

/// Few-shot segmentation methods, 2019-2025.
pub fn sample_dataset() -> Dataset {
    SAMPLE
        .iter()
        .map(|(year, category, name, key)| Record::new(*year, category, name, key))
        .collect()
}

pub fn write_sample_csv(path: &Path) -> anyhow::Result<Dataset> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let dataset = sample_dataset();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for record in &dataset.records {
        writer.write_record([
            record.year.to_string().as_str(),
            record.category.as_str(),
            record.name.as_str(),
            record.citation_key.as_str(),
        ])?;
    }
    writer.flush()?;

    info!(
        path = %path.display(),
        records = dataset.len(),
        years = dataset.years().len(),
        "sample data written"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_dataset;

    #[test]
    fn sample_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.csv");
        let written = write_sample_csv(&path).unwrap();
        let loaded = load_dataset(&path).unwrap();
        assert_eq!(written, loaded);
        assert_eq!(loaded.len(), 18);
        assert_eq!(loaded.years(), (2019..=2025).collect::<Vec<_>>());
    }
}
