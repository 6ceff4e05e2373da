//! Exporters: CSV files for record tables and a JSON workbook model for
//! spreadsheet output.
//!
//! The workbook model mirrors what the spreadsheet side consumes: named
//! sheets with a header row, data rows, column widths, and an optional
//! embedded chart whose categories come from the first column. This module
//! only shapes and serializes; it never talks to the store.

use std::{fs, path::Path};

use chrono::Local;
use mongodb::bson::Document;
use serde::Serialize;
use serde_json::Value;

use crate::{
    charts,
    company::CompanyRecord,
    error::Result,
    letters::LetterPresence,
    placement::PlacementRecord,
};

pub const COMPANY_CSV_HEADERS: [&str; 6] = [
    "Company Name",
    "Email",
    "Contact",
    "HR Name",
    "Package",
    "Address",
];

pub const PLACEMENT_CSV_HEADERS: [&str; 13] = [
    "Student Name",
    "Branch",
    "Company",
    "Package",
    "HR Name",
    "Contact",
    "Email",
    "Address",
    "Offer Letter",
    "Placement Suggestion",
    "Company Levels",
    "Skills Required",
    "Important Notes",
];

/// `<prefix>_<timestamp>.<extension>` in the local timezone.
pub fn default_filename(prefix: &str, extension: &str) -> String {
    format!(
        "{prefix}_{}.{extension}",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

// -- Workbook model --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pie,
    Bar,
    HorizontalBar,
    ClusteredBar,
}

/// An embedded chart. Categories always come from column 1 of the sheet;
/// `value_columns` name the series. When `series_from_header` is set the
/// series takes its name from the header row, otherwise the data range
/// starts below it.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub anchor: &'static str,
    pub width: u32,
    pub height: u32,
    pub value_columns: Vec<u32>,
    pub series_from_header: bool,
    pub show_percent: bool,
    pub show_category: bool,
    pub show_value: bool,
}

impl ChartSpec {
    fn pie(title: &str) -> Self {
        Self {
            kind: ChartKind::Pie,
            title: title.to_string(),
            anchor: "D2",
            width: 15,
            height: 10,
            value_columns: vec![2],
            series_from_header: true,
            show_percent: true,
            show_category: false,
            show_value: false,
        }
    }

    fn bar(title: &str) -> Self {
        Self {
            kind: ChartKind::Bar,
            title: title.to_string(),
            anchor: "D2",
            width: 15,
            height: 10,
            value_columns: vec![2],
            series_from_header: true,
            show_percent: false,
            show_category: false,
            show_value: true,
        }
    }

    fn horizontal_bar(title: &str) -> Self {
        Self {
            kind: ChartKind::HorizontalBar,
            width: 18,
            height: 12,
            ..Self::bar(title)
        }
    }

    fn clustered_bar(title: &str) -> Self {
        Self {
            kind: ChartKind::ClusteredBar,
            anchor: "F2",
            width: 18,
            height: 10,
            value_columns: vec![2, 3],
            ..Self::bar(title)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<&'static str>,
    pub column_widths: Vec<u32>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut rendered = self.to_json()?;
        rendered.push('\n');
        fs::write(path, rendered)?;
        Ok(())
    }
}

fn count_rows(data: &charts::ChartData) -> Vec<Vec<Value>> {
    data.labels
        .iter()
        .zip(&data.values)
        .map(|(label, value)| vec![Value::from(label.as_str()), Value::from(*value)])
        .collect()
}

fn count_rows3(data: &charts::ChartData3) -> Vec<Vec<Value>> {
    data.labels
        .iter()
        .zip(&data.values)
        .map(|(label, value)| vec![Value::from(label.as_str()), Value::from(*value)])
        .collect()
}

fn decimal_rows(data: &charts::ChartData<f64>) -> Vec<Vec<Value>> {
    data.labels
        .iter()
        .zip(&data.values)
        .map(|(label, value)| vec![Value::from(label.as_str()), Value::from(*value)])
        .collect()
}

// -- Record exports --

/// The companies table as displayed: one sheet, no chart.
pub fn companies_sheet(companies: &[Document]) -> Sheet {
    let rows = companies
        .iter()
        .map(|doc| {
            let record = CompanyRecord::new(doc);
            vec![
                Value::from(record.name().unwrap_or_default()),
                Value::from(record.email().unwrap_or_default()),
                Value::from(record.contact().unwrap_or_default()),
                Value::from(record.hr_name().unwrap_or_default()),
                Value::from(record.package().unwrap_or_default()),
                Value::from(record.address().unwrap_or_default()),
            ]
        })
        .collect();
    Sheet {
        name: "Companies".to_string(),
        headers: COMPANY_CSV_HEADERS.to_vec(),
        column_widths: vec![25, 25, 15, 20, 15, 30],
        rows,
        chart: None,
    }
}

pub fn companies_workbook(companies: &[Document]) -> Workbook {
    Workbook {
        sheets: vec![companies_sheet(companies)],
    }
}

/// The placements table as displayed. `letter_status` is the resolved
/// offer-letter presence per row, in the same order as `placements`.
pub fn placements_sheet(placements: &[Document], letter_status: &[LetterPresence]) -> Sheet {
    let rows = placements
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let record = PlacementRecord::new(doc);
            let presence = letter_status.get(i).copied().unwrap_or(LetterPresence::No);
            vec![
                Value::from(record.student_name().unwrap_or_default()),
                Value::from(record.student_branch().unwrap_or_default()),
                Value::from(record.company_name().unwrap_or_default()),
                Value::from(record.package().unwrap_or_default()),
                Value::from(record.hr_name().unwrap_or_default()),
                Value::from(record.contact().unwrap_or_default()),
                Value::from(record.email().unwrap_or_default()),
                Value::from(record.address().unwrap_or_default()),
                Value::from(presence.label()),
                Value::from(record.placement_suggestion().unwrap_or_default()),
                Value::from(record.company_levels().unwrap_or_default()),
                Value::from(record.skills_required().unwrap_or_default()),
                Value::from(record.important_suggestions().unwrap_or_default()),
            ]
        })
        .collect();
    Sheet {
        name: "Placements".to_string(),
        headers: PLACEMENT_CSV_HEADERS.to_vec(),
        column_widths: vec![25, 15, 25, 15, 20, 15, 25, 30, 15, 25, 20, 30, 30],
        rows,
        chart: None,
    }
}

pub fn placements_workbook(
    placements: &[Document],
    letter_status: &[LetterPresence],
) -> Workbook {
    Workbook {
        sheets: vec![placements_sheet(placements, letter_status)],
    }
}

// -- Analytics workbooks --

pub fn company_analytics_workbook(companies: &[Document]) -> Workbook {
    let industry = charts::industry_distribution(companies);
    let packages = charts::company_package_distribution(companies);
    let top = charts::top_companies_by_package(companies);

    Workbook {
        sheets: vec![
            Sheet {
                name: "Industry Distribution".to_string(),
                headers: vec!["Industry Type", "Number of Companies"],
                column_widths: vec![25, 22],
                rows: count_rows(&industry),
                chart: Some(ChartSpec::pie("Industry Type Distribution")),
            },
            Sheet {
                name: "Package Distribution".to_string(),
                headers: vec!["Package Range", "Number of Companies"],
                column_widths: vec![20, 22],
                rows: count_rows(&packages),
                chart: Some(ChartSpec::bar("Company Package Distribution")),
            },
            Sheet {
                name: "Top 20 Companies".to_string(),
                headers: vec!["Company Name", "Package (LPA)"],
                column_widths: vec![35, 18],
                rows: decimal_rows(&top),
                chart: Some(ChartSpec::horizontal_bar("Top 20 Companies by Package")),
            },
        ],
    }
}

pub fn placement_analytics_workbook(placements: &[Document]) -> Workbook {
    let branches = charts::placements_by_branch(placements);
    let packages = charts::placements_by_package(placements);
    let top = charts::top_companies_by_placements(placements, 10);
    let hr = charts::placements_by_hr(placements);

    Workbook {
        sheets: vec![
            Sheet {
                name: "Placements by Branch".to_string(),
                headers: vec!["Branch", "Number of Placements"],
                column_widths: vec![20, 22],
                rows: count_rows(&branches),
                chart: Some(ChartSpec::pie("Placements by Branch")),
            },
            Sheet {
                name: "Placements by Package".to_string(),
                headers: vec!["Package", "Number of Placements"],
                column_widths: vec![20, 22],
                rows: count_rows(&packages),
                chart: Some(ChartSpec::bar("Placements by Package")),
            },
            Sheet {
                name: "Top Companies".to_string(),
                headers: vec!["Company Name", "Number of Placements"],
                column_widths: vec![30, 22],
                rows: count_rows(&top),
                chart: Some(ChartSpec::bar("Top 10 Companies by Placements")),
            },
            Sheet {
                name: "Placements by HR".to_string(),
                headers: vec!["HR Name", "Number of Placements"],
                column_widths: vec![25, 22],
                rows: count_rows(&hr),
                chart: Some(ChartSpec::pie("Placements by HR")),
            },
        ],
    }
}

pub fn dashboard_workbook(
    students: &[Document],
    companies: &[Document],
    placements: &[Document],
) -> Workbook {
    let branches = charts::students_by_branch(students);
    let packages = charts::company_package_ranges(companies);
    let records = charts::records_count(students, companies, placements);
    let comparison = charts::students_vs_placed_by_branch(students, placements);

    // The dashboard pie skips the header row and labels slices with the
    // branch name, unlike every other pie in the exports.
    let mut branch_pie = ChartSpec::pie("Students by Branch");
    branch_pie.series_from_header = false;
    branch_pie.show_category = true;

    let comparison_rows = comparison
        .branches
        .iter()
        .zip(comparison.students.iter().zip(&comparison.placed))
        .map(|(branch, (total, placed))| {
            let rate = if *total > 0 {
                *placed as f64 / *total as f64 * 100.0
            } else {
                0.0
            };
            vec![
                Value::from(branch.as_str()),
                Value::from(*total),
                Value::from(*placed),
                Value::from(format!("{rate:.1}%")),
            ]
        })
        .collect();

    Workbook {
        sheets: vec![
            Sheet {
                name: "Students by Branch".to_string(),
                headers: vec!["Branch", "Count"],
                column_widths: vec![20, 15],
                rows: count_rows(&branches),
                chart: Some(branch_pie),
            },
            Sheet {
                name: "Package Distribution".to_string(),
                headers: vec!["Package Range (LPA)", "Count"],
                column_widths: vec![25, 15],
                rows: count_rows3(&packages),
                chart: Some(ChartSpec::bar("Company Package Ranges (LPA)")),
            },
            Sheet {
                name: "Total Records".to_string(),
                headers: vec!["Category", "Count"],
                column_widths: vec![20, 15],
                rows: count_rows3(&records),
                chart: Some(ChartSpec::bar("Total Records Count")),
            },
            Sheet {
                name: "Students vs Placed".to_string(),
                headers: vec![
                    "Branch",
                    "Total Students",
                    "Placed Students",
                    "Placement Rate (%)",
                ],
                column_widths: vec![20, 18, 18, 20],
                rows: comparison_rows,
                chart: Some(ChartSpec::clustered_bar("Students vs Placed by Branch")),
            },
        ],
    }
}

// -- CSV exports --

pub fn write_companies_csv(path: &Path, companies: &[Document]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COMPANY_CSV_HEADERS)?;
    for doc in companies {
        let record = CompanyRecord::new(doc);
        writer.write_record([
            record.name().unwrap_or_default(),
            record.email().unwrap_or_default(),
            record.contact().unwrap_or_default(),
            record.hr_name().unwrap_or_default(),
            record.package().unwrap_or_default(),
            record.address().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_placements_csv(
    path: &Path,
    placements: &[Document],
    letter_status: &[LetterPresence],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(PLACEMENT_CSV_HEADERS)?;
    for (i, doc) in placements.iter().enumerate() {
        let record = PlacementRecord::new(doc);
        let presence = letter_status.get(i).copied().unwrap_or(LetterPresence::No);
        writer.write_record([
            record.student_name().unwrap_or_default(),
            record.student_branch().unwrap_or_default(),
            record.company_name().unwrap_or_default(),
            record.package().unwrap_or_default(),
            record.hr_name().unwrap_or_default(),
            record.contact().unwrap_or_default(),
            record.email().unwrap_or_default(),
            record.address().unwrap_or_default(),
            presence.label(),
            record.placement_suggestion().unwrap_or_default(),
            record.company_levels().unwrap_or_default(),
            record.skills_required().unwrap_or_default(),
            record.important_suggestions().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    fn company(name: &str, package: &str) -> Document {
        doc! {
            "company_name": name,
            "email": "hr@acme.com",
            "contact_info": "9876543210",
            "hr_name": "PRIYA",
            "package": package,
            "address": "PUNE",
        }
    }

    fn placement(student: &str, company: &str) -> Document {
        doc! {
            "student_name": student,
            "student_branch": "CSE",
            "company_name": company,
            "package": "6 LPA",
            "hr_name": "PRIYA",
            "contact_info": "9876543210",
            "email": "hr@acme.com",
            "address": "PUNE",
            "placement_suggestion": "PREPARE DSA",
            "company_levels": "3 ROUNDS",
            "skills_required": "RUST",
            "important_suggestions": "NONE",
        }
    }

    #[test]
    fn companies_sheet_maps_display_columns() {
        let sheet = companies_sheet(&[company("ACME", "12 LPA")]);
        assert_eq!(sheet.name, "Companies");
        assert_eq!(sheet.headers, COMPANY_CSV_HEADERS.to_vec());
        assert_eq!(sheet.column_widths, vec![25, 25, 15, 20, 15, 30]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][0], Value::from("ACME"));
        assert_eq!(sheet.rows[0][4], Value::from("12 LPA"));
        assert!(sheet.chart.is_none());
    }

    #[test]
    fn companies_sheet_reads_legacy_field_names() {
        let legacy = doc! { "company_Name": "OLD CORP", "contact_no": "12345" };
        let sheet = companies_sheet(&[legacy]);
        assert_eq!(sheet.rows[0][0], Value::from("OLD CORP"));
        assert_eq!(sheet.rows[0][2], Value::from("12345"));
    }

    #[test]
    fn placements_sheet_carries_letter_status() {
        let placements = vec![placement("RAVI", "ACME"), placement("ASHA", "GLOBEX")];
        let status = vec![LetterPresence::Yes, LetterPresence::Missing];
        let sheet = placements_sheet(&placements, &status);
        assert_eq!(sheet.headers.len(), 13);
        assert_eq!(sheet.rows[0][8], Value::from("Yes"));
        assert_eq!(sheet.rows[1][8], Value::from("Missing"));
    }

    #[test]
    fn placements_sheet_defaults_status_to_no() {
        let placements = vec![placement("RAVI", "ACME")];
        let sheet = placements_sheet(&placements, &[]);
        assert_eq!(sheet.rows[0][8], Value::from("No"));
    }

    #[test]
    fn dashboard_workbook_layout() {
        let students = vec![
            doc! { "name": "A", "branch": "CSE" },
            doc! { "name": "B", "branch": "CSE" },
            doc! { "name": "C", "branch": "ECE" },
        ];
        let companies = vec![company("ACME", "12 LPA")];
        let placements = vec![placement("A", "ACME")];

        let workbook = dashboard_workbook(&students, &companies, &placements);
        let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Students by Branch",
                "Package Distribution",
                "Total Records",
                "Students vs Placed"
            ]
        );

        let pie = workbook.sheets[0].chart.as_ref().unwrap();
        assert_eq!(pie.kind, ChartKind::Pie);
        assert!(!pie.series_from_header);
        assert!(pie.show_category);

        let comparison = &workbook.sheets[3];
        assert_eq!(comparison.rows[0][0], Value::from("CSE"));
        assert_eq!(comparison.rows[0][1], Value::from(2i64));
        assert_eq!(comparison.rows[0][2], Value::from(1i64));
        assert_eq!(comparison.rows[0][3], Value::from("50.0%"));
        let clustered = comparison.chart.as_ref().unwrap();
        assert_eq!(clustered.kind, ChartKind::ClusteredBar);
        assert_eq!(clustered.anchor, "F2");
        assert_eq!(clustered.value_columns, vec![2, 3]);
    }

    #[test]
    fn company_analytics_has_three_charted_sheets() {
        let companies = vec![company("ACME", "12 LPA"), company("GLOBEX", "8 LPA")];
        let workbook = company_analytics_workbook(&companies);
        assert_eq!(workbook.sheets.len(), 3);
        assert_eq!(
            workbook.sheets[2].chart.as_ref().unwrap().kind,
            ChartKind::HorizontalBar
        );
        assert_eq!(workbook.sheets[2].column_widths, vec![35, 18]);
        assert_eq!(workbook.sheets[2].rows[0][1], Value::from(12.0));
    }

    #[test]
    fn placement_analytics_has_four_charted_sheets() {
        let placements = vec![placement("RAVI", "ACME")];
        let workbook = placement_analytics_workbook(&placements);
        let titles: Vec<&str> = workbook
            .sheets
            .iter()
            .map(|s| s.chart.as_ref().unwrap().title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Placements by Branch",
                "Placements by Package",
                "Top 10 Companies by Placements",
                "Placements by HR"
            ]
        );
        assert_eq!(
            workbook.sheets[2].chart.as_ref().unwrap().kind,
            ChartKind::Bar
        );
    }

    #[test]
    fn workbook_json_is_tagged_by_chart_kind() {
        let workbook = company_analytics_workbook(&[company("ACME", "12 LPA")]);
        let rendered = workbook.to_json().unwrap();
        assert!(rendered.contains("\"kind\": \"pie\""));
        assert!(rendered.contains("\"kind\": \"horizontal_bar\""));
        assert!(rendered.contains("\"anchor\": \"D2\""));
    }

    #[test]
    fn csv_round_trip_matches_displayed_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companies.csv");
        write_companies_csv(&path, &[company("ACME", "12 LPA")]).unwrap();

        let rendered = std::fs::read_to_string(&path).unwrap();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Company Name,Email,Contact,HR Name,Package,Address"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ACME,hr@acme.com,9876543210,PRIYA,12 LPA,PUNE"
        );
    }

    #[test]
    fn placement_csv_includes_letter_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placements.csv");
        write_placements_csv(&path, &[placement("RAVI", "ACME")], &[LetterPresence::Yes])
            .unwrap();

        let rendered = std::fs::read_to_string(&path).unwrap();
        let mut lines = rendered.lines();
        assert!(lines.next().unwrap().starts_with("Student Name,Branch,"));
        let row = lines.next().unwrap();
        assert!(row.contains(",Yes,"));
    }

    #[test]
    fn default_filenames_carry_prefix_and_extension() {
        let name = default_filename("home_dashboard", "json");
        assert!(name.starts_with("home_dashboard_"));
        assert!(name.ends_with(".json"));
        // prefix + _YYYYMMDD_HHMMSS + .json
        assert_eq!(name.len(), "home_dashboard_".len() + 15 + ".json".len());
    }
}
