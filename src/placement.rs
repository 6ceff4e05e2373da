use std::collections::HashSet;

use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, DateTime, Document, doc, oid::ObjectId},
};

use crate::{
    connection::ConnectionProvider,
    error::Result,
    query::FilterSet,
    student::inserted_key,
};

/// Read-only view over a placement document.
pub struct PlacementRecord<'a>(&'a Document);

impl<'a> PlacementRecord<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self(doc)
    }

    pub fn student_name(&self) -> Option<&'a str> {
        self.0.get_str("student_name").ok()
    }

    pub fn student_branch(&self) -> Option<&'a str> {
        self.0.get_str("student_branch").ok()
    }

    pub fn batch(&self) -> Option<&'a str> {
        self.0.get_str("batch").ok()
    }

    pub fn company_name(&self) -> Option<&'a str> {
        self.0.get_str("company_name").ok()
    }

    pub fn position(&self) -> Option<&'a str> {
        self.0.get_str("position").ok()
    }

    pub fn year_of_placement(&self) -> Option<&'a str> {
        self.0.get_str("year_of_placement").ok()
    }

    pub fn package(&self) -> Option<&'a str> {
        self.0.get_str("package").ok()
    }

    pub fn hr_name(&self) -> Option<&'a str> {
        self.0.get_str("hr_name").ok()
    }

    pub fn contact(&self) -> Option<&'a str> {
        self.0.get_str("contact_info").ok()
    }

    pub fn email(&self) -> Option<&'a str> {
        self.0.get_str("email").ok()
    }

    pub fn address(&self) -> Option<&'a str> {
        self.0.get_str("address").ok()
    }

    pub fn placement_suggestion(&self) -> Option<&'a str> {
        self.0.get_str("placement_suggestion").ok()
    }

    pub fn company_levels(&self) -> Option<&'a str> {
        self.0.get_str("company_levels").ok()
    }

    pub fn skills_required(&self) -> Option<&'a str> {
        self.0.get_str("skills_required").ok()
    }

    pub fn important_suggestions(&self) -> Option<&'a str> {
        self.0.get_str("important_suggestions").ok()
    }

    /// Link into the offer-letter store; `None` when absent or null.
    pub fn letter_key(&self) -> Option<&'a str> {
        self.0.get_str("offer_letter_pdf_key").ok().filter(|k| !k.is_empty())
    }

    pub fn has_offer_letter(&self) -> bool {
        self.0.get_bool("has_offer_letter").unwrap_or(false)
    }

    pub fn created_date(&self) -> Option<DateTime> {
        self.0.get_datetime("created_date").ok().copied()
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.0.get_object_id("_id").ok()
    }
}

/// Form input for a placement outcome. Most fields are stored
/// upper-cased; the placement year, email, and contact keep their
/// original form.
#[derive(Debug, Clone, Default)]
pub struct NewPlacement {
    pub student_name: String,
    pub student_branch: String,
    pub batch: String,
    pub company_name: String,
    pub position: String,
    pub year_of_placement: String,
    pub package: String,
    pub email: String,
    pub contact_info: String,
    pub hr_name: String,
    pub address: String,
    pub placement_suggestion: String,
    pub company_levels: String,
    pub skills_required: String,
    pub important_suggestions: String,
}

impl NewPlacement {
    fn base_document(&self) -> Document {
        doc! {
            "student_name": self.student_name.trim().to_uppercase(),
            "student_branch": self.student_branch.trim().to_uppercase(),
            "batch": self.batch.trim().to_uppercase(),
            "company_name": self.company_name.trim().to_uppercase(),
            "position": self.position.trim().to_uppercase(),
            "year_of_placement": self.year_of_placement.trim(),
            "package": self.package.trim().to_uppercase(),
            "email": self.email.trim(),
            "contact_info": self.contact_info.trim(),
            "hr_name": self.hr_name.trim().to_uppercase(),
            "address": self.address.trim().to_uppercase(),
            "placement_suggestion": self.placement_suggestion.trim().to_uppercase(),
            "company_levels": self.company_levels.trim().to_uppercase(),
            "skills_required": self.skills_required.trim().to_uppercase(),
            "important_suggestions": self.important_suggestions.trim().to_uppercase(),
        }
    }

    /// The full document written on insert or duplicate overwrite,
    /// including the letter linkage and a fresh creation timestamp.
    pub fn document(&self, letter_key: Option<&str>) -> Document {
        let mut doc = self.base_document();
        doc.insert(
            "offer_letter_pdf_key",
            match letter_key {
                Some(key) => Bson::String(key.to_string()),
                None => Bson::Null,
            },
        );
        doc.insert("has_offer_letter", letter_key.is_some());
        doc.insert("created_date", DateTime::now());
        doc
    }

    /// The `$set` payload for the edit flow. Edits never touch the
    /// creation timestamp or the letter linkage.
    pub fn update_document(&self) -> Document {
        self.base_document()
    }

    /// Exact-match probe for the uniqueness rule: one record per
    /// student and company pair.
    pub fn duplicate_probe(&self) -> Document {
        doc! {
            "$and": [
                { "student_name": self.student_name.trim().to_uppercase() },
                { "company_name": self.company_name.trim().to_uppercase() },
            ]
        }
    }
}

/// Filters for the placement search view, in display order.
pub fn search_filters(student: &str, company: &str, branch: &str, hr: &str) -> FilterSet {
    FilterSet::new()
        .field("Student", "student_name", student)
        .field("Company", "company_name", company)
        .field("Branch", "student_branch", branch)
        .field("HR Name", "hr_name", hr)
}

/// Lookup predicate for the delete flow: substring on student and/or
/// company name, at least one required (the caller validates that).
pub fn lookup_filters(student: &str, company: &str) -> FilterSet {
    FilterSet::new()
        .field("Student", "student_name", student)
        .field("Company", "company_name", company)
}

pub fn search_projection() -> Document {
    doc! {
        "student_name": 1,
        "student_branch": 1,
        "batch": 1,
        "company_name": 1,
        "position": 1,
        "year_of_placement": 1,
        "package": 1,
        "hr_name": 1,
        "contact_info": 1,
        "email": 1,
        "address": 1,
        "offer_letter_pdf_key": 1,
        "placement_suggestion": 1,
        "company_levels": 1,
        "skills_required": 1,
        "important_suggestions": 1,
        "has_offer_letter": 1,
        "created_date": 1,
    }
}

pub fn analytics_projection() -> Document {
    doc! {
        "student_name": 1,
        "student_branch": 1,
        "company_name": 1,
        "package": 1,
        "hr_name": 1,
        "placement_date": 1,
    }
}

/// Keep placements whose upper-cased student name is in the batch set.
pub fn filter_by_batch(placements: Vec<Document>, names: &HashSet<String>) -> Vec<Document> {
    placements
        .into_iter()
        .filter(|p| {
            let name = p.get_str("student_name").unwrap_or("").to_uppercase();
            names.contains(&name)
        })
        .collect()
}

/// Keep placements whose branch equals `branch`, ignoring case.
pub fn filter_by_branch(placements: Vec<Document>, branch: &str) -> Vec<Document> {
    placements
        .into_iter()
        .filter(|p| {
            p.get_str("student_branch")
                .unwrap_or("")
                .eq_ignore_ascii_case(branch)
        })
        .collect()
}

/// Status line shown above the analytics charts.
pub fn analytics_status(parts: &[String], shown: usize, total: usize) -> String {
    if parts.is_empty() {
        format!("All Data - {total} placements")
    } else {
        format!("{} - {} placements", parts.join(" | "), shown)
    }
}

pub struct PlacementStore {
    collection: Collection<Document>,
}

impl PlacementStore {
    pub async fn open(provider: &ConnectionProvider) -> Result<Self> {
        Ok(Self {
            collection: provider.placements().await?,
        })
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    pub async fn find_duplicate(&self, placement: &NewPlacement) -> Result<Option<Document>> {
        self.collection
            .find_one(placement.duplicate_probe())
            .await
            .map_err(Into::into)
    }

    pub async fn insert(
        &self,
        placement: &NewPlacement,
        letter_key: Option<&str>,
    ) -> Result<String> {
        let result = self
            .collection
            .insert_one(placement.document(letter_key))
            .await?;
        Ok(inserted_key(&result.inserted_id))
    }

    /// Replace an existing record's fields after a confirmed duplicate,
    /// letter linkage and creation timestamp included.
    pub async fn overwrite(
        &self,
        id: &ObjectId,
        placement: &NewPlacement,
        letter_key: Option<&str>,
    ) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": placement.document(letter_key) },
            )
            .await?;
        Ok(())
    }

    /// Edit-flow update; see [`NewPlacement::update_document`].
    pub async fn update(&self, id: &ObjectId, placement: &NewPlacement) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": placement.update_document() },
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn find(&self, predicate: Document) -> Result<Vec<Document>> {
        self.collection
            .find(predicate)
            .await?
            .try_collect()
            .await
            .map_err(Into::into)
    }

    /// Newest-first sample with the analytics projection, for dashboards
    /// and cache warm-up.
    pub async fn sample(&self, limit: i64) -> Result<Vec<Document>> {
        self.collection
            .find(doc! {})
            .projection(analytics_projection())
            .sort(doc! { "_id": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await
            .map_err(Into::into)
    }

    pub async fn all(&self) -> Result<Vec<Document>> {
        self.collection
            .find(doc! {})
            .await?
            .try_collect()
            .await
            .map_err(Into::into)
    }
}
