use mongodb::bson::{Document, doc};

/// Multiplier applied to package values quoted in lakhs per annum.
pub const LPA_SCALE: f64 = 100_000.0;

/// Unqualified package numbers below this are read on the LPA scale.
/// "8" means 8 LPA; "800000" is already in rupees.
pub const LPA_PLAIN_CUTOFF: f64 = 1000.0;

/// Result cap used when a limit string cannot be parsed.
pub const DEFAULT_RESULT_LIMIT: i64 = 50;

/// Extract the first consecutive digit run from free text.
///
/// Returns `None` when the text contains no digits. "12 LPA" yields
/// `12.0`; "9.5" yields `9.0` (the run stops at the dot, matching how
/// package strings have always been read).
pub fn extract_numeric(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Normalize a free-text package value to rupees per annum.
///
/// The only unit inference in the codebase lives here: the first numeric
/// run is multiplied by [`LPA_SCALE`] when the text mentions "lpa" in any
/// case, or when the bare number is below [`LPA_PLAIN_CUTOFF`]. Values at
/// or above the cutoff without a unit are taken as already-absolute
/// amounts. Returns `None` for text with no numeric content.
pub fn normalize_package(text: &str) -> Option<f64> {
    let n = extract_numeric(text)?;
    if text.to_lowercase().contains("lpa") || n < LPA_PLAIN_CUTOFF {
        Some(n * LPA_SCALE)
    } else {
        Some(n)
    }
}

/// Resolve a result-limit string to a fixed cap or unbounded.
///
/// "All" (any case) means no cap. Anything else parses as a positive
/// integer, falling back to [`DEFAULT_RESULT_LIMIT`].
pub fn resolve_limit(raw: &str) -> Option<i64> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return None;
    }
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Some(n),
        _ => Some(DEFAULT_RESULT_LIMIT),
    }
}

#[derive(Debug, Clone)]
struct FilterField {
    label: &'static str,
    /// Current field name first, legacy aliases after.
    names: Vec<&'static str>,
    value: String,
}

/// An ordered set of named free-text filters plus an optional package
/// threshold input, convertible to a store predicate and a display
/// summary.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    fields: Vec<FilterField>,
    package: Option<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-name text filter. Empty or whitespace-only values are
    /// dropped so that absence never becomes a match-nothing condition.
    pub fn field(self, label: &'static str, name: &'static str, value: &str) -> Self {
        self.push(label, vec![name], value)
    }

    /// Add a filter that matches across the current field name and its
    /// legacy aliases with OR semantics.
    pub fn aliased_field(
        self,
        label: &'static str,
        names: &[&'static str],
        value: &str,
    ) -> Self {
        self.push(label, names.to_vec(), value)
    }

    fn push(mut self, label: &'static str, names: Vec<&'static str>, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.fields.push(FilterField {
                label,
                names,
                value: value.to_string(),
            });
        }
        self
    }

    /// Set the raw minimum-package input.
    pub fn package(mut self, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.package = Some(value.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.package.is_none()
    }

    /// The normalized package threshold, if the package input carries a
    /// positive numeric run. Non-numeric inputs filter by substring in the
    /// predicate instead and have no threshold.
    pub fn package_threshold(&self) -> Option<f64> {
        let raw = self.package.as_deref()?;
        let n = extract_numeric(raw)?;
        if n > 0.0 { normalize_package(raw) } else { None }
    }

    /// Build the store predicate: per-field case-insensitive substring
    /// conditions, OR across legacy aliases, AND across fields. An empty
    /// set yields the empty document, which matches everything.
    ///
    /// A numeric package input contributes no condition here; the precise
    /// threshold comparison runs client-side after the fetch. Only a
    /// non-numeric package input falls back to a substring condition.
    pub fn predicate(&self) -> Document {
        let mut conditions: Vec<Document> = Vec::new();

        for field in &self.fields {
            if field.names.len() == 1 {
                conditions.push(regex_condition(field.names[0], &field.value));
            } else {
                let alternatives: Vec<Document> = field
                    .names
                    .iter()
                    .map(|name| regex_condition(name, &field.value))
                    .collect();
                conditions.push(doc! { "$or": alternatives });
            }
        }

        if let Some(raw) = &self.package {
            if self.package_threshold().is_none() {
                conditions.push(regex_condition("package", raw));
            }
        }

        if conditions.is_empty() {
            Document::new()
        } else {
            doc! { "$and": conditions }
        }
    }

    /// Human-readable summary of the active filters, for display beside
    /// results: `"Label: value"` parts joined by `" | "`.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.label, f.value))
            .collect();
        if let Some(raw) = &self.package {
            parts.push(format!("Package: {raw}"));
        }
        if parts.is_empty() {
            "No filters applied".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

fn regex_condition(name: &str, value: &str) -> Document {
    doc! { name: { "$regex": value, "$options": "i" } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_numeric_first_run() {
        assert_eq!(extract_numeric("12 LPA"), Some(12.0));
        assert_eq!(extract_numeric("around 9 to 11"), Some(9.0));
        assert_eq!(extract_numeric("9.5"), Some(9.0));
    }

    #[test]
    fn extract_numeric_no_digits() {
        assert_eq!(extract_numeric("competitive"), None);
        assert_eq!(extract_numeric(""), None);
    }

    #[test]
    fn normalize_scales_lpa_text() {
        assert_eq!(normalize_package("6 LPA"), Some(600_000.0));
        assert_eq!(normalize_package("12lpa"), Some(1_200_000.0));
    }

    #[test]
    fn normalize_scales_small_plain_numbers() {
        assert_eq!(normalize_package("8"), Some(800_000.0));
        assert_eq!(normalize_package("999"), Some(99_900_000.0));
    }

    #[test]
    fn normalize_keeps_absolute_amounts() {
        assert_eq!(normalize_package("600000"), Some(600_000.0));
        assert_eq!(normalize_package("1200000"), Some(1_200_000.0));
    }

    #[test]
    fn normalize_non_numeric_is_none() {
        assert_eq!(normalize_package("negotiable"), None);
    }

    #[test]
    fn resolve_limit_all_is_unbounded() {
        assert_eq!(resolve_limit("All"), None);
        assert_eq!(resolve_limit("all"), None);
    }

    #[test]
    fn resolve_limit_parses_and_falls_back() {
        assert_eq!(resolve_limit("20"), Some(20));
        assert_eq!(resolve_limit("100"), Some(100));
        assert_eq!(resolve_limit("garbage"), Some(DEFAULT_RESULT_LIMIT));
        assert_eq!(resolve_limit("-5"), Some(DEFAULT_RESULT_LIMIT));
    }

    #[test]
    fn empty_filter_set_matches_all() {
        let set = FilterSet::new()
            .aliased_field("Name", &["company_name", "company_Name"], "  ")
            .field("Email", "email", "");
        assert!(set.is_empty());
        assert_eq!(set.predicate(), Document::new());
    }

    #[test]
    fn single_field_condition() {
        let set = FilterSet::new().field("Email", "email", "acme.in");
        let predicate = set.predicate();
        let conditions = predicate.get_array("$and").unwrap();
        assert_eq!(conditions.len(), 1);
        let first = conditions[0].as_document().unwrap();
        let email = first.get_document("email").unwrap();
        assert_eq!(email.get_str("$regex").unwrap(), "acme.in");
        assert_eq!(email.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn aliased_field_expands_to_or() {
        let set =
            FilterSet::new().aliased_field("Name", &["company_name", "company_Name"], "ACME");
        let predicate = set.predicate();
        let conditions = predicate.get_array("$and").unwrap();
        let or = conditions[0].as_document().unwrap().get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
        assert!(or[0].as_document().unwrap().contains_key("company_name"));
        assert!(or[1].as_document().unwrap().contains_key("company_Name"));
    }

    #[test]
    fn numeric_package_adds_no_condition() {
        let set = FilterSet::new().package("8");
        assert_eq!(set.predicate(), Document::new());
        assert_eq!(set.package_threshold(), Some(800_000.0));
    }

    #[test]
    fn non_numeric_package_falls_back_to_substring() {
        let set = FilterSet::new().package("competitive");
        let predicate = set.predicate();
        let conditions = predicate.get_array("$and").unwrap();
        let pkg = conditions[0].as_document().unwrap().get_document("package").unwrap();
        assert_eq!(pkg.get_str("$regex").unwrap(), "competitive");
        assert_eq!(set.package_threshold(), None);
    }

    #[test]
    fn zero_package_has_no_threshold() {
        let set = FilterSet::new().package("0 LPA");
        assert_eq!(set.package_threshold(), None);
    }

    #[test]
    fn summary_joins_active_filters() {
        let set = FilterSet::new()
            .field("Name", "student_name", "RAVI")
            .field("Branch", "student_branch", "")
            .package("8");
        assert_eq!(set.summary(), "Name: RAVI | Package: 8");
    }

    #[test]
    fn summary_without_filters() {
        assert_eq!(FilterSet::new().summary(), "No filters applied");
    }
}
