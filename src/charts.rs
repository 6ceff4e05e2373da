//! Chart-data shapers: pure functions turning fetched document lists into
//! labeled series for the dashboard, the per-collection analytics views, and
//! the workbook exporter.
//!
//! Shapers never query the store and never fail. Grouping keys fall back to
//! "Unknown" when the field is absent or empty, package figures that carry
//! no digits are left out of numeric aggregation, and an empty result always
//! collapses to a single "No Data" placeholder so renderers are never handed
//! an empty series.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mongodb::bson::Document;
use serde::Serialize;

use crate::{
    company::CompanyRecord,
    placement::PlacementRecord,
    query::extract_numeric,
    student::StudentRecord,
};

/// Label used when a grouping field is absent or empty.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// Fixed value axis used by the dashboard placements-by-branch chart.
pub const PLACEMENT_AXIS: [i64; 7] = [0, 50, 100, 150, 200, 250, 300];

/// A single labeled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData<V = i64> {
    pub labels: Vec<String>,
    pub values: Vec<V>,
}

impl<V: Default> ChartData<V> {
    /// Placeholder series for charts with nothing to show.
    pub fn no_data() -> Self {
        Self {
            labels: vec!["No Data".to_string()],
            values: vec![V::default()],
        }
    }
}

impl<V> ChartData<V> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A labeled series with a precomputed value-axis range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData3 {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub y_range: Vec<i64>,
}

/// Two aligned per-branch series, total students against placed students.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchComparison {
    pub branches: Vec<String>,
    pub students: Vec<i64>,
    pub placed: Vec<i64>,
}

// -- Grouping helpers --

/// Frequency counter that remembers first-seen order, so untruncated charts
/// and tie-breaks read in document order.
#[derive(Debug, Default)]
struct Tally {
    order: Vec<String>,
    counts: HashMap<String, i64>,
}

impl Tally {
    fn bump(&mut self, key: String) {
        match self.counts.get_mut(&key) {
            Some(n) => *n += 1,
            None => {
                self.counts.insert(key.clone(), 1);
                self.order.push(key);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn into_pairs(self) -> Vec<(String, i64)> {
        let Tally { order, mut counts } = self;
        order
            .into_iter()
            .map(|key| {
                let count = counts.remove(&key).unwrap_or(0);
                (key, count)
            })
            .collect()
    }
}

fn group_key(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_GROUP.to_string(),
    }
}

/// Sort descending by count and keep the first `n`. The sort is stable, so
/// ties stay in first-seen order.
fn top_n(mut pairs: Vec<(String, i64)>, n: usize) -> Vec<(String, i64)> {
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs.truncate(n);
    pairs
}

fn split(pairs: Vec<(String, i64)>) -> ChartData {
    let mut labels = Vec::with_capacity(pairs.len());
    let mut values = Vec::with_capacity(pairs.len());
    for (label, value) in pairs {
        labels.push(label);
        values.push(value);
    }
    ChartData { labels, values }
}

/// Equivalent of an end-exclusive integer range with a step.
fn axis_range(end: i64, step: i64) -> Vec<i64> {
    let mut range = Vec::new();
    let mut v = 0;
    while v < end {
        range.push(v);
        v += step;
    }
    range
}

// -- Dashboard shapers --

/// Student headcount per branch, first eight branches in document order.
pub fn students_by_branch(students: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in students {
        tally.bump(group_key(StudentRecord::new(doc).branch()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    let mut pairs = tally.into_pairs();
    pairs.truncate(8);
    split(pairs)
}

/// Company counts across fixed LPA buckets, with a value axis scaled to the
/// largest bucket.
pub fn company_package_ranges(companies: &[Document]) -> ChartData3 {
    const BUCKETS: [&str; 5] = ["5-10", "10-15", "15-20", "20-25", "25-30"];

    if companies.is_empty() {
        let (y_max, y_step) = bucket_axis(0);
        return ChartData3 {
            labels: vec!["No Data".to_string()],
            values: vec![0],
            y_range: axis_range(y_max + y_step, y_step),
        };
    }

    let mut counts = [0i64; 5];
    for doc in companies {
        let record = CompanyRecord::new(doc);
        let Some(n) = record.package().and_then(extract_numeric) else {
            continue;
        };
        let slot = if n < 10.0 {
            0
        } else if n < 15.0 {
            1
        } else if n < 20.0 {
            2
        } else if n < 25.0 {
            3
        } else {
            4
        };
        counts[slot] += 1;
    }

    let max = counts.iter().copied().max().unwrap_or(0);
    let (y_max, y_step) = bucket_axis(max);
    ChartData3 {
        labels: BUCKETS.iter().map(|b| b.to_string()).collect(),
        values: counts.to_vec(),
        y_range: axis_range(y_max + y_step, y_step),
    }
}

fn bucket_axis(max: i64) -> (i64, i64) {
    let y_max = 50.max((max as f64 * 1.1) as i64);
    let y_step = 5.max(y_max / 10);
    (y_max, y_step)
}

/// Total record counts for the three collections, with a value axis scaled
/// to the largest count.
pub fn records_count(
    students: &[Document],
    companies: &[Document],
    placements: &[Document],
) -> ChartData3 {
    let values = vec![
        students.len() as i64,
        companies.len() as i64,
        placements.len() as i64,
    ];
    let max = values.iter().copied().max().unwrap_or(0);
    let step = 25.max(max / 10);
    ChartData3 {
        labels: vec![
            "Students".to_string(),
            "Companies".to_string(),
            "Placements".to_string(),
        ],
        values,
        y_range: axis_range((max as f64 * 1.2) as i64 + step, step),
    }
}

/// Total students against placed students, per branch, branches sorted.
pub fn students_vs_placed_by_branch(
    students: &[Document],
    placements: &[Document],
) -> BranchComparison {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for doc in students {
        *totals
            .entry(group_key(StudentRecord::new(doc).branch()))
            .or_insert(0) += 1;
    }
    let mut placed: HashMap<String, i64> = HashMap::new();
    for doc in placements {
        *placed
            .entry(group_key(PlacementRecord::new(doc).student_branch()))
            .or_insert(0) += 1;
    }

    let branches: BTreeSet<&String> = totals.keys().chain(placed.keys()).collect();
    if branches.is_empty() {
        return BranchComparison {
            branches: vec!["No Data".to_string()],
            students: vec![0],
            placed: vec![0],
        };
    }

    let mut out = BranchComparison {
        branches: Vec::new(),
        students: Vec::new(),
        placed: Vec::new(),
    };
    for branch in branches {
        out.branches.push(branch.clone());
        out.students.push(totals.get(branch).copied().unwrap_or(0));
        out.placed.push(placed.get(branch).copied().unwrap_or(0));
    }
    out
}

/// Placed against unplaced headcount. With no students on file the split is
/// meaningless, so a "No Students" placeholder keeps the pie renderable.
pub fn placement_stats(students: &[Document], placements: &[Document]) -> ChartData {
    if students.is_empty() {
        return ChartData {
            labels: vec!["No Students".to_string()],
            values: vec![0, 0],
        };
    }
    let total = students.len() as i64;
    let placed = placements.len() as i64;
    ChartData {
        labels: vec!["Placed".to_string(), "Unplaced".to_string()],
        values: vec![placed, total - placed],
    }
}

/// Placement rate per branch as a percentage, branches sorted. A branch
/// with placements but no students on file rates as zero rather than
/// dividing by nothing.
pub fn placement_rate_by_branch(
    students: &[Document],
    placements: &[Document],
) -> ChartData<f64> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for doc in students {
        *totals
            .entry(group_key(StudentRecord::new(doc).branch()))
            .or_insert(0) += 1;
    }
    let mut placed: HashMap<String, i64> = HashMap::new();
    for doc in placements {
        *placed
            .entry(group_key(PlacementRecord::new(doc).student_branch()))
            .or_insert(0) += 1;
    }

    let branches: BTreeSet<&String> = totals.keys().chain(placed.keys()).collect();
    if branches.is_empty() {
        return ChartData::no_data();
    }

    let mut data = ChartData {
        labels: Vec::new(),
        values: Vec::new(),
    };
    for branch in branches {
        let total = totals.get(branch).copied().unwrap_or(0);
        let done = placed.get(branch).copied().unwrap_or(0);
        let rate = if total > 0 {
            done as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        data.labels.push(branch.clone());
        data.values.push(rate);
    }
    data
}

/// Mean package figure per branch from the first numeric run of each
/// package string, rounded to two decimals, branches sorted.
pub fn avg_package_by_branch(placements: &[Document]) -> ChartData<f64> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for doc in placements {
        let record = PlacementRecord::new(doc);
        let Some(n) = record.package().and_then(extract_numeric) else {
            continue;
        };
        groups
            .entry(group_key(record.student_branch()))
            .or_default()
            .push(n);
    }
    if groups.is_empty() {
        return ChartData::no_data();
    }

    let mut data = ChartData {
        labels: Vec::new(),
        values: Vec::new(),
    };
    for (branch, figures) in groups {
        let avg = figures.iter().sum::<f64>() / figures.len() as f64;
        data.labels.push(branch);
        data.values.push((avg * 100.0).round() / 100.0);
    }
    data
}

// -- Company analytics shapers --

/// Company counts per sector, in document order.
pub fn industry_distribution(companies: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in companies {
        tally.bump(group_key(CompanyRecord::new(doc).sector()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(tally.into_pairs())
}

/// Company counts per distinct raw package string, top eight.
pub fn company_package_distribution(companies: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in companies {
        tally.bump(group_key(CompanyRecord::new(doc).package()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(top_n(tally.into_pairs(), 8))
}

/// Top twenty companies by offered package figure. Companies whose package
/// string carries no digits do not rank.
pub fn top_companies_by_package(companies: &[Document]) -> ChartData<f64> {
    let mut ranked: Vec<(String, f64)> = Vec::new();
    for doc in companies {
        let record = CompanyRecord::new(doc);
        let Some(n) = record.package().and_then(extract_numeric) else {
            continue;
        };
        ranked.push((group_key(record.name()), n));
    }
    if ranked.is_empty() {
        return ChartData::no_data();
    }

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(20);

    let mut data = ChartData {
        labels: Vec::new(),
        values: Vec::new(),
    };
    for (name, value) in ranked {
        data.labels.push(name);
        data.values.push(value);
    }
    data
}

// -- Placement analytics shapers --

/// Placement counts per branch, in document order.
pub fn placements_by_branch(placements: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in placements {
        tally.bump(group_key(PlacementRecord::new(doc).student_branch()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(tally.into_pairs())
}

/// Dashboard variant: branches sorted by name, with the fixed value axis
/// the dashboard chart has always used.
pub fn placements_by_branch_dashboard(placements: &[Document]) -> ChartData3 {
    let y_range = PLACEMENT_AXIS.to_vec();
    let mut tally = Tally::default();
    for doc in placements {
        tally.bump(group_key(PlacementRecord::new(doc).student_branch()));
    }
    if tally.is_empty() {
        return ChartData3 {
            labels: vec!["No Data".to_string()],
            values: vec![0],
            y_range,
        };
    }

    let mut pairs = tally.into_pairs();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data = split(pairs);
    ChartData3 {
        labels: data.labels,
        values: data.values,
        y_range,
    }
}

/// Placement counts per distinct raw package string, top eight.
pub fn placements_by_package(placements: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in placements {
        tally.bump(group_key(PlacementRecord::new(doc).package()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(top_n(tally.into_pairs(), 8))
}

/// Top `n` companies by placement count. The dashboard shows eight, the
/// placement view and the workbook show ten.
pub fn top_companies_by_placements(placements: &[Document], n: usize) -> ChartData {
    let mut tally = Tally::default();
    for doc in placements {
        tally.bump(group_key(PlacementRecord::new(doc).company_name()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(top_n(tally.into_pairs(), n))
}

/// Placement counts per HR contact, top eight.
pub fn placements_by_hr(placements: &[Document]) -> ChartData {
    let mut tally = Tally::default();
    for doc in placements {
        tally.bump(group_key(PlacementRecord::new(doc).hr_name()));
    }
    if tally.is_empty() {
        return ChartData::no_data();
    }
    split(top_n(tally.into_pairs(), 8))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    fn student(branch: &str) -> Document {
        doc! { "name": "A", "branch": branch }
    }

    fn nested_student(branch: &str) -> Document {
        doc! { "personal_info": { "name": "A", "branch": branch } }
    }

    fn placement(branch: &str, company: &str, package: &str) -> Document {
        doc! {
            "student_name": "A",
            "student_branch": branch,
            "company_name": company,
            "package": package,
        }
    }

    #[test]
    fn students_by_branch_counts_both_schemas() {
        let students = vec![
            student("CSE"),
            nested_student("CSE"),
            student("ECE"),
            doc! { "name": "NO BRANCH" },
        ];
        let data = students_by_branch(&students);
        assert_eq!(data.labels, vec!["CSE", "ECE", "Unknown"]);
        assert_eq!(data.values, vec![2, 1, 1]);
    }

    #[test]
    fn students_by_branch_keeps_first_eight_in_order() {
        let students: Vec<Document> = (0..12).map(|i| student(&format!("B{i:02}"))).collect();
        let data = students_by_branch(&students);
        assert_eq!(data.len(), 8);
        assert_eq!(data.labels[0], "B00");
        assert_eq!(data.labels[7], "B07");
    }

    #[test]
    fn empty_input_yields_placeholder() {
        assert_eq!(students_by_branch(&[]), ChartData::no_data());
        assert_eq!(placements_by_hr(&[]), ChartData::no_data());
        assert_eq!(industry_distribution(&[]), ChartData::no_data());
        assert_eq!(
            placement_rate_by_branch(&[], &[]),
            ChartData::<f64>::no_data()
        );
    }

    #[test]
    fn package_ranges_buckets_and_axis() {
        let companies = vec![
            doc! { "company_name": "A", "package": "6 LPA" },
            doc! { "company_name": "B", "package": "12 LPA" },
            doc! { "company_name": "C", "package": "22" },
            doc! { "company_name": "D", "package": "30 LPA" },
            doc! { "company_name": "E", "package": "COMPETITIVE" },
        ];
        let data = company_package_ranges(&companies);
        assert_eq!(data.labels, vec!["5-10", "10-15", "15-20", "20-25", "25-30"]);
        assert_eq!(data.values, vec![1, 1, 0, 1, 1]);
        // Max bucket is 1, so the axis falls back to the 0..=50 floor.
        assert_eq!(data.y_range.first(), Some(&0));
        assert_eq!(data.y_range.last(), Some(&50));
        assert_eq!(data.y_range[1], 5);
    }

    #[test]
    fn records_count_axis_scales_with_step_floor() {
        let students: Vec<Document> = (0..3).map(|_| student("CSE")).collect();
        let data = records_count(&students, &[], &[]);
        assert_eq!(data.labels, vec!["Students", "Companies", "Placements"]);
        assert_eq!(data.values, vec![3, 0, 0]);
        // 1.2 * 3 truncates to 3, then one 25-wide step past it.
        assert_eq!(data.y_range, vec![0, 25]);
    }

    #[test]
    fn placement_stats_splits_placed_and_unplaced() {
        let students: Vec<Document> = (0..5).map(|_| student("CSE")).collect();
        let placements = vec![placement("CSE", "ACME", "6 LPA")];
        let data = placement_stats(&students, &placements);
        assert_eq!(data.labels, vec!["Placed", "Unplaced"]);
        assert_eq!(data.values, vec![1, 4]);
    }

    #[test]
    fn placement_stats_without_students() {
        let placements = vec![placement("CSE", "ACME", "6 LPA")];
        let data = placement_stats(&[], &placements);
        assert_eq!(data.labels, vec!["No Students"]);
        assert_eq!(data.values, vec![0, 0]);
        assert_eq!(placement_stats(&[], &[]).labels, vec!["No Students"]);
    }

    #[test]
    fn rate_by_branch_covers_union_of_branches() {
        let students = vec![student("CSE"), student("CSE"), student("ECE")];
        let placements = vec![
            placement("CSE", "ACME", "6 LPA"),
            placement("MECH", "ACME", "6 LPA"),
        ];
        let data = placement_rate_by_branch(&students, &placements);
        assert_eq!(data.labels, vec!["CSE", "ECE", "MECH"]);
        assert_eq!(data.values, vec![50.0, 0.0, 0.0]);
    }

    #[test]
    fn vs_placed_aligns_series_over_sorted_union() {
        let students = vec![student("ECE"), nested_student("CSE"), student("CSE")];
        let placements = vec![placement("CSE", "ACME", "6 LPA")];
        let data = students_vs_placed_by_branch(&students, &placements);
        assert_eq!(data.branches, vec!["CSE", "ECE"]);
        assert_eq!(data.students, vec![2, 1]);
        assert_eq!(data.placed, vec![1, 0]);
    }

    #[test]
    fn avg_package_skips_unparsable_and_rounds() {
        let placements = vec![
            placement("CSE", "ACME", "6 LPA"),
            placement("CSE", "GLOBEX", "7 LPA"),
            placement("CSE", "INITECH", "COMPETITIVE"),
            placement("ECE", "ACME", "10 LPA"),
        ];
        let data = avg_package_by_branch(&placements);
        assert_eq!(data.labels, vec!["CSE", "ECE"]);
        assert_eq!(data.values, vec![6.5, 10.0]);
    }

    #[test]
    fn top_companies_by_package_ranks_numeric_only() {
        let companies = vec![
            doc! { "company_name": "LOW", "package": "4 LPA" },
            doc! { "company_name": "TEXT", "package": "BEST IN CLASS" },
            doc! { "company_name": "HIGH", "package": "21 LPA" },
            doc! { "company_name": "MID", "package": "9" },
        ];
        let data = top_companies_by_package(&companies);
        assert_eq!(data.labels, vec!["HIGH", "MID", "LOW"]);
        assert_eq!(data.values, vec![21.0, 9.0, 4.0]);
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let placements = vec![
            placement("CSE", "ALPHA", "5"),
            placement("CSE", "BETA", "5"),
            placement("CSE", "BETA", "5"),
            placement("CSE", "GAMMA", "5"),
        ];
        let data = top_companies_by_placements(&placements, 3);
        assert_eq!(data.labels, vec!["BETA", "ALPHA", "GAMMA"]);
        assert_eq!(data.values, vec![2, 1, 1]);
    }

    #[test]
    fn dashboard_branch_chart_sorts_and_fixes_axis() {
        let placements = vec![
            placement("MECH", "ACME", "5"),
            placement("CSE", "ACME", "5"),
            placement("CSE", "GLOBEX", "5"),
        ];
        let data = placements_by_branch_dashboard(&placements);
        assert_eq!(data.labels, vec!["CSE", "MECH"]);
        assert_eq!(data.values, vec![2, 1]);
        assert_eq!(data.y_range, PLACEMENT_AXIS.to_vec());
    }

    #[test]
    fn view_branch_chart_keeps_document_order() {
        let placements = vec![
            placement("MECH", "ACME", "5"),
            placement("CSE", "ACME", "5"),
            placement("MECH", "GLOBEX", "5"),
        ];
        let data = placements_by_branch(&placements);
        assert_eq!(data.labels, vec!["MECH", "CSE"]);
        assert_eq!(data.values, vec![2, 1]);
    }

    #[test]
    fn package_distribution_groups_raw_strings() {
        let placements = vec![
            placement("CSE", "A", "6 LPA"),
            placement("CSE", "B", "6 LPA"),
            placement("CSE", "C", "600000"),
        ];
        let data = placements_by_package(&placements);
        assert_eq!(data.labels, vec!["6 LPA", "600000"]);
        assert_eq!(data.values, vec![2, 1]);
    }
}
