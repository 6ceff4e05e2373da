use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Document, doc, oid::ObjectId},
};

use crate::{
    connection::ConnectionProvider,
    error::Result,
    query::FilterSet,
    student::inserted_key,
};

/// Read-only view over a company document.
///
/// Older records spell the name field `company_Name` and the contact
/// field `contact_no`; accessors try the current name first.
pub struct CompanyRecord<'a>(&'a Document);

impl<'a> CompanyRecord<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self(doc)
    }

    /// `company_name`, legacy `company_Name`.
    pub fn name(&self) -> Option<&'a str> {
        aliased(self.0, "company_name", "company_Name")
    }

    pub fn email(&self) -> Option<&'a str> {
        self.0.get_str("email").ok()
    }

    /// `contact_info`, legacy `contact_no`.
    pub fn contact(&self) -> Option<&'a str> {
        aliased(self.0, "contact_info", "contact_no")
    }

    pub fn hr_name(&self) -> Option<&'a str> {
        self.0.get_str("hr_name").ok()
    }

    pub fn package(&self) -> Option<&'a str> {
        self.0.get_str("package").ok()
    }

    pub fn website(&self) -> Option<&'a str> {
        self.0.get_str("website").ok()
    }

    pub fn address(&self) -> Option<&'a str> {
        self.0.get_str("address").ok()
    }

    pub fn sector(&self) -> Option<&'a str> {
        self.0.get_str("sector").ok()
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.0.get_object_id("_id").ok()
    }
}

fn aliased<'a>(doc: &'a Document, current: &str, legacy: &str) -> Option<&'a str> {
    doc.get_str(current).or_else(|_| doc.get_str(legacy)).ok()
}

/// Form input for a company. Name, HR name, package, and address are
/// stored upper-cased; email, contact, and website keep their original
/// form.
#[derive(Debug, Clone, Default)]
pub struct NewCompany {
    pub company_name: String,
    pub email: String,
    pub contact_info: String,
    pub hr_name: String,
    pub package: String,
    pub website: String,
    pub address: String,
}

impl NewCompany {
    pub fn document(&self) -> Document {
        doc! {
            "company_name": self.company_name.trim().to_uppercase(),
            "email": self.email.trim(),
            "contact_info": self.contact_info.trim(),
            "hr_name": self.hr_name.trim().to_uppercase(),
            "package": self.package.trim().to_uppercase(),
            "website": self.website.trim(),
            "address": self.address.trim().to_uppercase(),
        }
    }

    /// Exact-match probe for the application-level uniqueness rule:
    /// same stored name or same email.
    pub fn duplicate_probe(&self) -> Document {
        doc! {
            "$or": [
                { "company_name": self.company_name.trim().to_uppercase() },
                { "email": self.email.trim() },
            ]
        }
    }
}

/// Filters for the company search view, in display order.
pub fn search_filters(name: &str, email: &str, hr: &str, contact: &str) -> FilterSet {
    FilterSet::new()
        .aliased_field("Name", &["company_name", "company_Name"], name)
        .field("Email", "email", email)
        .field("HR Name", "hr_name", hr)
        .aliased_field("Contact", &["contact_info", "contact_no"], contact)
}

pub fn search_projection() -> Document {
    doc! {
        "company_name": 1,
        "company_Name": 1,
        "email": 1,
        "contact_info": 1,
        "contact_no": 1,
        "hr_name": 1,
        "package": 1,
        "website": 1,
        "address": 1,
    }
}

pub fn analytics_projection() -> Document {
    doc! {
        "company_name": 1,
        "company_Name": 1,
        "sector": 1,
        "package": 1,
        "hr_name": 1,
        "email": 1,
        "contact_info": 1,
    }
}

/// Predicate for the delete lookup. The name matches as a substring;
/// the contact input matches the email or contact field exactly, after
/// upper-casing. Returns `None` when both inputs are blank.
pub fn delete_search_predicate(name: &str, contact: &str) -> Option<Document> {
    let name = name.trim().to_uppercase();
    let contact = contact.trim().to_uppercase();

    let mut conditions = Vec::new();
    if !name.is_empty() {
        conditions.push(doc! { "company_name": { "$regex": &name, "$options": "i" } });
    }
    if !contact.is_empty() {
        conditions.push(doc! {
            "$or": [
                { "email": &contact },
                { "contact_info": &contact },
            ]
        });
    }

    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(doc! { "$and": conditions }),
    }
}

pub struct CompanyStore {
    collection: Collection<Document>,
}

impl CompanyStore {
    pub async fn open(provider: &ConnectionProvider) -> Result<Self> {
        Ok(Self {
            collection: provider.companies().await?,
        })
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// The existing record that would collide with `company`, if any.
    pub async fn find_duplicate(&self, company: &NewCompany) -> Result<Option<Document>> {
        self.collection
            .find_one(company.duplicate_probe())
            .await
            .map_err(Into::into)
    }

    pub async fn insert(&self, company: &NewCompany) -> Result<String> {
        let result = self.collection.insert_one(company.document()).await?;
        Ok(inserted_key(&result.inserted_id))
    }

    pub async fn update(&self, id: &ObjectId, company: &NewCompany) -> Result<()> {
        self.collection
            .update_one(doc! { "_id": id }, doc! { "$set": company.document() })
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_upper_cases_selected_fields() {
        let company = NewCompany {
            company_name: "acme systems".into(),
            email: "Jobs@Acme.in".into(),
            contact_info: "+91 98765 43210".into(),
            hr_name: "priya s".into(),
            package: "12 lpa".into(),
            website: "https://acme.in".into(),
            address: "pune".into(),
        };
        let doc = company.document();
        assert_eq!(doc.get_str("company_name").unwrap(), "ACME SYSTEMS");
        assert_eq!(doc.get_str("email").unwrap(), "Jobs@Acme.in");
        assert_eq!(doc.get_str("contact_info").unwrap(), "+91 98765 43210");
        assert_eq!(doc.get_str("hr_name").unwrap(), "PRIYA S");
        assert_eq!(doc.get_str("package").unwrap(), "12 LPA");
        assert_eq!(doc.get_str("website").unwrap(), "https://acme.in");
        assert_eq!(doc.get_str("address").unwrap(), "PUNE");
    }

    #[test]
    fn duplicate_probe_matches_name_or_email() {
        let company = NewCompany {
            company_name: "acme".into(),
            email: "jobs@acme.in".into(),
            ..Default::default()
        };
        let probe = company.duplicate_probe();
        let or = probe.get_array("$or").unwrap();
        assert_eq!(
            or[0].as_document().unwrap().get_str("company_name").unwrap(),
            "ACME"
        );
        assert_eq!(
            or[1].as_document().unwrap().get_str("email").unwrap(),
            "jobs@acme.in"
        );
    }

    #[test]
    fn record_reads_legacy_field_names() {
        let doc = doc! { "company_Name": "OLD CO", "contact_no": "12345" };
        let record = CompanyRecord::new(&doc);
        assert_eq!(record.name(), Some("OLD CO"));
        assert_eq!(record.contact(), Some("12345"));
    }

    #[test]
    fn record_prefers_current_field_names() {
        let doc = doc! { "company_name": "NEW CO", "company_Name": "OLD CO" };
        assert_eq!(CompanyRecord::new(&doc).name(), Some("NEW CO"));
    }

    #[test]
    fn delete_predicate_exact_contact_match() {
        let predicate = delete_search_predicate("", "jobs@acme.in").unwrap();
        let or = predicate.get_array("$or").unwrap();
        assert_eq!(
            or[0].as_document().unwrap().get_str("email").unwrap(),
            "JOBS@ACME.IN"
        );
        assert_eq!(
            or[1]
                .as_document()
                .unwrap()
                .get_str("contact_info")
                .unwrap(),
            "JOBS@ACME.IN"
        );
    }

    #[test]
    fn delete_predicate_combines_with_and() {
        let predicate = delete_search_predicate("acme", "12345").unwrap();
        assert!(predicate.contains_key("$and"));
        assert!(delete_search_predicate(" ", "").is_none());
    }
}
