//! Offer-letter blob store, backed by the separate letters database.
//!
//! Letters are small PDFs (100 KB cap) stored inline with their metadata.
//! Removal is a soft delete: the document flips to "inactive" and every
//! lookup filters on the active status, so a deleted letter reads as
//! absent without losing the audit trail. Keys are the document id in hex;
//! records created under the old scheme are still reachable through their
//! `custom_key` field.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use chrono::{DateTime, Utc};
use mongodb::{
    Collection,
    bson::{Binary, DateTime as BsonDateTime, Document, doc, oid::ObjectId, spec::BinarySubtype},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    connection::ConnectionProvider,
    error::{Error, Result},
    student::inserted_key,
};

/// Largest accepted offer letter, in bytes.
pub const LETTER_SIZE_CAP: u64 = 102_400;

const STATUS_ACTIVE: &str = "active";
const STATUS_INACTIVE: &str = "inactive";

/// How a letter is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delete {
    /// Remove the document outright.
    Hard,
    /// Flip the status to inactive and record when (and optionally why).
    Soft { reason: Option<String> },
}

/// Letter metadata, payload excluded.
#[derive(Debug, Clone, Serialize)]
pub struct LetterInfo {
    pub key: String,
    pub student_name: String,
    pub company_name: String,
    pub filename: String,
    pub size: i64,
    pub uploaded: Option<DateTime<Utc>>,
}

impl LetterInfo {
    fn from_document(doc: &Document) -> Self {
        let size = doc
            .get_i64("pdf_size")
            .or_else(|_| doc.get_i32("pdf_size").map(i64::from))
            .unwrap_or(0);
        Self {
            key: doc
                .get_object_id("_id")
                .map(|id| id.to_hex())
                .unwrap_or_default(),
            student_name: doc.get_str("student_name").unwrap_or_default().to_string(),
            company_name: doc.get_str("company_name").unwrap_or_default().to_string(),
            filename: doc.get_str("filename").unwrap_or_default().to_string(),
            size,
            uploaded: doc.get_datetime("upload_date").ok().map(|dt| dt.to_chrono()),
        }
    }
}

/// A letter written out for viewing: the temp file path handed to the
/// platform viewer, plus whose letter it is.
#[derive(Debug)]
pub struct OpenedLetter {
    pub path: PathBuf,
    pub student_name: String,
    pub company_name: String,
}

/// Whether a placement's linked letter is actually present in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterPresence {
    /// Key present and the letter resolves.
    Yes,
    /// Key present but nothing active under it.
    Missing,
    /// No letter was ever attached.
    No,
}

impl LetterPresence {
    pub fn label(self) -> &'static str {
        match self {
            LetterPresence::Yes => "Yes",
            LetterPresence::Missing => "Missing",
            LetterPresence::No => "No",
        }
    }
}

pub struct LetterStore {
    collection: Collection<Document>,
}

impl LetterStore {
    pub async fn open(provider: &ConnectionProvider) -> Result<Self> {
        Ok(Self {
            collection: provider.letters().await?,
        })
    }

    /// Store a PDF for a student+company pair, returning its key.
    ///
    /// The size cap is enforced from file metadata before any byte is read.
    /// An active letter for the same pair is replaced in place and keeps its
    /// key; otherwise a new document is inserted.
    pub async fn store(&self, path: &Path, student: &str, company: &str) -> Result<String> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    kind: "offer letter file",
                    name: path.display().to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        if metadata.len() > LETTER_SIZE_CAP {
            return Err(Error::TooLarge {
                size: metadata.len(),
                cap: LETTER_SIZE_CAP,
            });
        }

        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let student = student.to_uppercase();
        let company = company.to_uppercase();

        let document = doc! {
            "student_name": &student,
            "company_name": &company,
            "filename": filename,
            "upload_date": BsonDateTime::now(),
            "pdf_size": bytes.len() as i64,
            "pdf_data": Binary { subtype: BinarySubtype::Generic, bytes },
            "status": STATUS_ACTIVE,
        };

        let probe = doc! {
            "student_name": &student,
            "company_name": &company,
            "status": STATUS_ACTIVE,
        };
        if let Some(existing) = self.collection.find_one(probe).await? {
            let id = existing.get_object_id("_id")?;
            self.collection
                .update_one(doc! { "_id": id }, doc! { "$set": document })
                .await?;
            info!(student = %student, company = %company, "offer letter replaced");
            Ok(id.to_hex())
        } else {
            let inserted = self.collection.insert_one(document).await?;
            info!(student = %student, company = %company, "offer letter stored");
            Ok(inserted_key(&inserted.inserted_id))
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .find_active(key, Some(metadata_projection()))
            .await?
            .is_some())
    }

    /// Metadata for a letter, payload excluded. `None` when no active
    /// letter resolves under the key.
    pub async fn info(&self, key: &str) -> Result<Option<LetterInfo>> {
        Ok(self
            .find_active(key, Some(metadata_projection()))
            .await?
            .as_ref()
            .map(LetterInfo::from_document))
    }

    /// Write the letter to a temp file and hand it to the platform viewer.
    /// The temp file is removed again if the viewer cannot be launched.
    pub async fn view(&self, key: &str) -> Result<OpenedLetter> {
        let Some(found) = self.find_active(key, None).await? else {
            return Err(Error::NotFound {
                kind: "offer letter",
                name: key.to_string(),
            });
        };
        let Ok(data) = found.get_binary_generic("pdf_data") else {
            return Err(Error::NotFound {
                kind: "offer letter content",
                name: key.to_string(),
            });
        };
        let student = found.get_str("student_name").unwrap_or("offer").to_string();
        let company = found.get_str("company_name").unwrap_or_default().to_string();

        let path = write_view_copy(&student, data)?;
        if let Err(err) = open_with_system_viewer(&path) {
            let _ = fs::remove_file(&path);
            return Err(err);
        }
        debug!(path = %path.display(), "offer letter opened");
        Ok(OpenedLetter {
            path,
            student_name: student,
            company_name: company,
        })
    }

    /// Remove a letter. Returns whether anything matched.
    pub async fn delete(&self, key: &str, mode: Delete) -> Result<bool> {
        match mode {
            Delete::Hard => {
                if let Some(id) = object_id_key(key) {
                    let result = self.collection.delete_one(doc! { "_id": id }).await?;
                    if result.deleted_count > 0 {
                        return Ok(true);
                    }
                }
                let result = self
                    .collection
                    .delete_one(doc! { "custom_key": key })
                    .await?;
                Ok(result.deleted_count > 0)
            }
            Delete::Soft { reason } => {
                let mut set = doc! {
                    "status": STATUS_INACTIVE,
                    "deleted_date": BsonDateTime::now(),
                };
                if let Some(reason) = reason {
                    set.insert("deleted_reason", reason);
                }
                if let Some(id) = object_id_key(key) {
                    let result = self
                        .collection
                        .update_one(doc! { "_id": id }, doc! { "$set": set.clone() })
                        .await?;
                    if result.modified_count > 0 {
                        return Ok(true);
                    }
                }
                let result = self
                    .collection
                    .update_one(doc! { "custom_key": key }, doc! { "$set": set })
                    .await?;
                Ok(result.modified_count > 0)
            }
        }
    }

    /// Active letters, newest upload first, with optional exact filters on
    /// the upper-cased student or company name.
    pub async fn list(
        &self,
        student: Option<&str>,
        company: Option<&str>,
    ) -> Result<Vec<LetterInfo>> {
        use futures::TryStreamExt;

        let mut filter = doc! { "status": STATUS_ACTIVE };
        if let Some(student) = student {
            filter.insert("student_name", student.to_uppercase());
        }
        if let Some(company) = company {
            filter.insert("company_name", company.to_uppercase());
        }

        let found: Vec<Document> = self
            .collection
            .find(filter)
            .projection(metadata_projection())
            .sort(doc! { "upload_date": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(found.iter().map(LetterInfo::from_document).collect())
    }

    /// Presence of a placement's linked letter for display and export.
    /// A store error during the probe reads as missing rather than failing
    /// the whole listing.
    pub async fn presence(&self, key: Option<&str>) -> LetterPresence {
        match key {
            None => LetterPresence::No,
            Some(key) if key.is_empty() => LetterPresence::No,
            Some(key) => match self.exists(key).await {
                Ok(true) => LetterPresence::Yes,
                Ok(false) => LetterPresence::Missing,
                Err(err) => {
                    debug!(error = %err, "letter presence probe failed");
                    LetterPresence::Missing
                }
            },
        }
    }

    /// Resolve a key to an active letter: document id first when the key
    /// looks like one, then the legacy `custom_key` field.
    async fn find_active(
        &self,
        key: &str,
        projection: Option<Document>,
    ) -> Result<Option<Document>> {
        if let Some(id) = object_id_key(key) {
            let mut find = self
                .collection
                .find_one(doc! { "_id": id, "status": STATUS_ACTIVE });
            if let Some(p) = projection.clone() {
                find = find.projection(p);
            }
            if let Some(found) = find.await? {
                return Ok(Some(found));
            }
        }

        let mut find = self
            .collection
            .find_one(doc! { "custom_key": key, "status": STATUS_ACTIVE });
        if let Some(p) = projection {
            find = find.projection(p);
        }
        Ok(find.await?)
    }
}

fn metadata_projection() -> Document {
    doc! { "pdf_data": 0 }
}

/// Parse the key as a document id when it has the right shape: 24 hex
/// characters, any case.
fn object_id_key(key: &str) -> Option<ObjectId> {
    if key.len() == 24 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        ObjectId::parse_str(key).ok()
    } else {
        None
    }
}

fn write_view_copy(student: &str, data: &[u8]) -> Result<PathBuf> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix(&format!("{student}_"))
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(data)?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

#[cfg(target_os = "windows")]
fn open_with_system_viewer(path: &Path) -> Result<()> {
    run_viewer(Command::new("cmd").args(["/C", "start", ""]).arg(path))
}

#[cfg(target_os = "macos")]
fn open_with_system_viewer(path: &Path) -> Result<()> {
    run_viewer(Command::new("open").arg(path))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn open_with_system_viewer(path: &Path) -> Result<()> {
    run_viewer(Command::new("xdg-open").arg(path))
}

fn run_viewer(command: &mut Command) -> Result<()> {
    let status = command.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "viewer exited with {status}"
        )))
    }
}
