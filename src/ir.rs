use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One method entry on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub category: String,
    pub name: String,
    pub citation_key: String,
}

impl Record {
    pub fn new(year: i32, category: &str, name: &str, citation_key: &str) -> Self {
        Self {
            year,
            category: category.to_string(),
            name: name.to_string(),
            citation_key: citation_key.to_string(),
        }
    }
}

/// Validated records in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct categories, sorted lexicographically.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> =
            self.records.iter().map(|r| r.category.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Records grouped by year; each group keeps file order.
    pub fn by_year(&self) -> BTreeMap<i32, Vec<&Record>> {
        let mut groups: BTreeMap<i32, Vec<&Record>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.year).or_default().push(record);
        }
        groups
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
