use std::collections::HashSet;

use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, Document, doc, oid::ObjectId},
};

use crate::{
    connection::ConnectionProvider,
    error::Result,
    query::FilterSet,
};

/// Read-only view over a student document.
///
/// Students exist in two historical shapes: the current flat layout and a
/// legacy one that nests the same fields under `personal_info`. Every
/// accessor reads the flat field first and falls back to the nested one,
/// skipping empty strings so a blank flat field does not shadow legacy
/// data.
pub struct StudentRecord<'a>(&'a Document);

impl<'a> StudentRecord<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self(doc)
    }

    /// `name`, legacy `personal_info.name`.
    pub fn name(&self) -> Option<&'a str> {
        flat_or_nested(self.0, "name")
    }

    /// `branch`, legacy `personal_info.branch`.
    pub fn branch(&self) -> Option<&'a str> {
        flat_or_nested(self.0, "branch")
    }

    /// `admission_year`, legacy `personal_info.admission_year`. Stored as
    /// either a string or an integer; rendered canonically as text.
    pub fn admission_year(&self) -> Option<String> {
        year_value(self.0.get("admission_year"))
            .or_else(|| {
                self.0
                    .get_document("personal_info")
                    .ok()
                    .and_then(|info| year_value(info.get("admission_year")))
            })
    }

    /// `contact_no`, legacy `personal_info.contact_no`.
    pub fn contact_no(&self) -> Option<&'a str> {
        flat_or_nested(self.0, "contact_no")
    }

    /// `email`, legacy `personal_info.email`.
    pub fn email(&self) -> Option<&'a str> {
        flat_or_nested(self.0, "email")
    }

    /// Whether this student belongs to the given admission batch,
    /// regardless of which schema or value type the year was stored in.
    pub fn batch_year_matches(&self, year: i32) -> bool {
        self.admission_year()
            .map(|stored| stored == year.to_string())
            .unwrap_or(false)
    }
}

fn flat_or_nested<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    match doc.get_str(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => doc
            .get_document("personal_info")
            .ok()
            .and_then(|info| info.get_str(key).ok())
            .filter(|v| !v.is_empty()),
    }
}

fn year_value(value: Option<&Bson>) -> Option<String> {
    match value? {
        Bson::String(s) if !s.is_empty() => Some(s.clone()),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        Bson::Double(n) => Some((*n as i64).to_string()),
        _ => None,
    }
}

/// Form input for a new student. Names and branches are stored
/// upper-cased; the email keeps its original case.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub branch: String,
    pub admission_year: String,
    pub contact_no: String,
    pub email: Option<String>,
}

impl NewStudent {
    /// The flat current-schema document this student is written as.
    pub fn document(&self) -> Document {
        let mut doc = doc! {
            "name": self.name.trim().to_uppercase(),
            "branch": self.branch.trim().to_uppercase(),
            "admission_year": self.admission_year.trim(),
            "contact_no": self.contact_no.trim(),
        };
        if let Some(email) = self.email.as_deref() {
            if !email.trim().is_empty() {
                doc.insert("email", email.trim());
            }
        }
        doc
    }
}

/// Search filters for the student view. Every field carries its nested
/// legacy alias so either schema matches at the store.
pub fn search_filters(name: &str, branch: &str, year: &str, contact: &str) -> FilterSet {
    FilterSet::new()
        .aliased_field("Name", &["name", "personal_info.name"], name)
        .aliased_field("Branch", &["branch", "personal_info.branch"], branch)
        .aliased_field(
            "Year",
            &["admission_year", "personal_info.admission_year"],
            year,
        )
        .aliased_field(
            "Contact",
            &["contact_no", "personal_info.contact_no"],
            contact,
        )
}

pub fn search_projection() -> Document {
    doc! {
        "name": 1,
        "branch": 1,
        "admission_year": 1,
        "contact_no": 1,
        "email": 1,
        "personal_info": 1,
    }
}

pub struct StudentStore {
    collection: Collection<Document>,
}

impl StudentStore {
    pub async fn open(provider: &ConnectionProvider) -> Result<Self> {
        Ok(Self {
            collection: provider.students().await?,
        })
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    pub async fn insert(&self, student: &NewStudent) -> Result<String> {
        let result = self.collection.insert_one(student.document()).await?;
        Ok(inserted_key(&result.inserted_id))
    }

    pub async fn update(&self, id: &ObjectId, student: &NewStudent) -> Result<()> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": student.document() })
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Newest-first sample for dashboards and cache warm-up.
    pub async fn sample(&self, limit: i64) -> Result<Vec<Document>> {
        self.collection
            .find(doc! {})
            .projection(search_projection())
            .sort(doc! { "_id": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await
            .map_err(Into::into)
    }

    /// The full collection, for workbook exports that aggregate
    /// everything.
    pub async fn all(&self) -> Result<Vec<Document>> {
        self.collection
            .find(doc! {})
            .await?
            .try_collect()
            .await
            .map_err(Into::into)
    }

    /// Upper-cased names of every student admitted in `year`, scanning
    /// both schema shapes and both stored value types.
    pub async fn batch_names(&self, year: i32) -> Result<HashSet<String>> {
        let docs = self.all().await?;
        let mut names = HashSet::new();
        for doc in &docs {
            let record = StudentRecord::new(doc);
            if record.batch_year_matches(year) {
                if let Some(name) = record.name() {
                    names.insert(name.to_uppercase());
                }
            }
        }
        Ok(names)
    }
}

pub(crate) fn inserted_key(id: &Bson) -> String {
    match id.as_object_id() {
        Some(oid) => oid.to_hex(),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flat_schema() {
        let doc = doc! { "name": "RAVI KUMAR", "branch": "CSE", "admission_year": "2022" };
        let record = StudentRecord::new(&doc);
        assert_eq!(record.name(), Some("RAVI KUMAR"));
        assert_eq!(record.branch(), Some("CSE"));
        assert_eq!(record.admission_year().as_deref(), Some("2022"));
    }

    #[test]
    fn falls_back_to_nested_schema() {
        let doc = doc! {
            "personal_info": { "name": "ANITA", "branch": "ECE", "admission_year": 2021 }
        };
        let record = StudentRecord::new(&doc);
        assert_eq!(record.name(), Some("ANITA"));
        assert_eq!(record.branch(), Some("ECE"));
        assert_eq!(record.admission_year().as_deref(), Some("2021"));
    }

    #[test]
    fn empty_flat_field_does_not_shadow_nested() {
        let doc = doc! { "branch": "", "personal_info": { "branch": "CSE" } };
        assert_eq!(StudentRecord::new(&doc).branch(), Some("CSE"));
    }

    #[test]
    fn year_matches_across_stored_types() {
        let as_string = doc! { "admission_year": "2022" };
        let as_int = doc! { "admission_year": 2022 };
        let nested = doc! { "personal_info": { "admission_year": 2022_i64 } };
        assert!(StudentRecord::new(&as_string).batch_year_matches(2022));
        assert!(StudentRecord::new(&as_int).batch_year_matches(2022));
        assert!(StudentRecord::new(&nested).batch_year_matches(2022));
        assert!(!StudentRecord::new(&as_int).batch_year_matches(2023));
    }

    #[test]
    fn missing_year_never_matches() {
        let doc = doc! { "name": "X" };
        assert!(!StudentRecord::new(&doc).batch_year_matches(2022));
    }

    #[test]
    fn new_student_document_casing() {
        let student = NewStudent {
            name: "ravi kumar".into(),
            branch: "cse".into(),
            admission_year: " 2022 ".into(),
            contact_no: "9876543210".into(),
            email: Some("Ravi@Example.com".into()),
        };
        let doc = student.document();
        assert_eq!(doc.get_str("name").unwrap(), "RAVI KUMAR");
        assert_eq!(doc.get_str("branch").unwrap(), "CSE");
        assert_eq!(doc.get_str("admission_year").unwrap(), "2022");
        assert_eq!(doc.get_str("email").unwrap(), "Ravi@Example.com");
    }

    #[test]
    fn blank_email_is_omitted() {
        let student = NewStudent {
            name: "A".into(),
            branch: "B".into(),
            admission_year: "2022".into(),
            contact_no: "1".into(),
            email: Some("  ".into()),
        };
        assert!(!student.document().contains_key("email"));
    }

    #[test]
    fn search_filters_cover_both_schemas() {
        let set = search_filters("ravi", "", "", "");
        let predicate = set.predicate();
        let conditions = predicate.get_array("$and").unwrap();
        let or = conditions[0]
            .as_document()
            .unwrap()
            .get_array("$or")
            .unwrap();
        assert!(or[0].as_document().unwrap().contains_key("name"));
        assert!(
            or[1]
                .as_document()
                .unwrap()
                .contains_key("personal_info.name")
        );
    }
}
