// ABOUTME: The Fragment entity: validated construction, metadata ownership, and persistence via a backend.
// ABOUTME: The backend is always supplied by the caller; there is no ambient store.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::backend::{SharedBackend, StorageError};
use crate::error::{FragmentError, Missing, Result};
use crate::media::{Format, MediaType};
use crate::record::{FragmentListing, FragmentRecord};

/// Caller input for creating a fragment.
#[derive(Debug, Clone, Default)]
pub struct NewFragment {
    pub id: Option<String>,
    pub owner_id: Option<String>,
    pub media_type: Option<String>,
    pub size: Option<i64>,
}

impl NewFragment {
    /// Input for a brand new fragment with a generated id.
    pub fn new(owner_id: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: None,
            owner_id: Some(owner_id.into()),
            media_type: Some(media_type.into()),
            size: None,
        }
    }
}

/// A fragment bound to the backend it persists through.
#[derive(Clone)]
pub struct Fragment {
    record: FragmentRecord,
    media: MediaType,
    backend: SharedBackend,
    /// False while a caller-supplied id has not yet been checked for reuse.
    id_claimed: bool,
}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fragment")
            .field("record", &self.record)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Fragment {
    /// Validate `input` and build an unsaved fragment with no payload.
    ///
    /// Nothing is written to the backend until [`Fragment::save`] or
    /// [`Fragment::set_data`] is called. A supplied `size` must not be
    /// negative but is otherwise ignored: size is zero until a payload is set.
    /// A supplied `id` is checked against every owner on the first write and
    /// rejected with `Validation` if it is already taken.
    pub fn new(backend: SharedBackend, input: NewFragment) -> Result<Self> {
        let owner_id = input
            .owner_id
            .filter(|o| !o.is_empty())
            .ok_or_else(|| FragmentError::Validation("missing owner id".to_string()))?;

        let raw_type = input
            .media_type
            .ok_or_else(|| FragmentError::Validation("missing type".to_string()))?;
        let media = MediaType::parse(&raw_type)?;

        if let Some(size) = input.size.filter(|size| *size < 0) {
            return Err(FragmentError::Validation(format!(
                "size cannot be negative: {size}"
            )));
        }

        let (id, id_claimed) = match input.id {
            Some(id) if id.is_empty() => {
                return Err(FragmentError::Validation("id cannot be empty".to_string()));
            }
            Some(id) => (id, false),
            None => (Ulid::new().to_string(), true),
        };

        let now = Utc::now();
        Ok(Self {
            record: FragmentRecord {
                id,
                owner_id,
                created: now,
                updated: now,
                media_type: media.as_str().to_string(),
                size: 0,
            },
            media,
            backend,
            id_claimed,
        })
    }

    /// Rebuild an entity from a stored record.
    pub fn from_record(backend: SharedBackend, record: FragmentRecord) -> Result<Self> {
        let media = MediaType::parse(&record.media_type).map_err(|e| StorageError::Corrupt {
            backend: backend.name(),
            message: format!("fragment {} has unusable type: {e}", record.id),
        })?;
        Ok(Self {
            record,
            media,
            backend,
            id_claimed: true,
        })
    }

    /// Fetch a fragment's metadata. Fails with `NotFound` when absent.
    pub async fn by_id(backend: &SharedBackend, owner_id: &str, id: &str) -> Result<Self> {
        let record = backend
            .get_metadata(owner_id, id)
            .await?
            .ok_or_else(|| FragmentError::not_found(id, Missing::Fragment))?;
        Self::from_record(backend.clone(), record)
    }

    /// List an owner's fragments in insertion order. Never fails for an
    /// owner with no fragments; the listing is simply empty.
    pub async fn by_user(
        backend: &SharedBackend,
        owner_id: &str,
        expand: bool,
    ) -> Result<FragmentListing> {
        Ok(backend.list_metadata(owner_id, expand).await?)
    }

    /// Remove a fragment's metadata and payload.
    ///
    /// A fragment that does not exist yields `NotFound` and nothing is removed.
    /// Otherwise both removals are issued and both are awaited even if one
    /// fails; a payload that was already gone is not an error.
    pub async fn delete(backend: &SharedBackend, owner_id: &str, id: &str) -> Result<()> {
        if backend.get_metadata(owner_id, id).await?.is_none() {
            return Err(FragmentError::not_found(id, Missing::Fragment));
        }

        let (metadata, data) = tokio::join!(
            backend.delete_metadata(owner_id, id),
            backend.delete_data(owner_id, id),
        );
        if let Err(e) = &metadata {
            tracing::error!(owner_id, id, error = %e, "failed to delete fragment metadata");
        }
        if let Err(e) = &data {
            tracing::error!(owner_id, id, error = %e, "failed to delete fragment data");
        }
        metadata?;
        data?;
        Ok(())
    }

    /// Persist the current metadata, refreshing `updated`.
    pub async fn save(&mut self) -> Result<()> {
        self.claim_id().await?;
        self.touch();
        self.backend.put_metadata(&self.record).await?;
        Ok(())
    }

    /// Write the payload and record its size.
    ///
    /// The new size is only durable once [`Fragment::save`] is called
    /// afterwards; this method does not save metadata on its own.
    pub async fn set_data(&mut self, data: Bytes) -> Result<()> {
        self.claim_id().await?;
        let size = data.len() as u64;
        self.backend
            .put_data(&self.record.owner_id, &self.record.id, data)
            .await?;
        self.record.size = size;
        self.touch();
        Ok(())
    }

    /// Fetch the payload. A fragment whose metadata exists but whose payload
    /// does not is reported as `NotFound`, never as empty content.
    pub async fn get_data(&self) -> Result<Bytes> {
        self.backend
            .get_data(&self.record.owner_id, &self.record.id)
            .await?
            .ok_or_else(|| FragmentError::not_found(&self.record.id, Missing::Data))
    }

    /// Replace the payload, provided `declared_type` matches the stored type.
    ///
    /// The comparison is on base type/subtype; parameters such as `charset`
    /// may differ. A mismatch is rejected before any storage call.
    pub async fn update(&mut self, declared_type: &str, data: Bytes) -> Result<()> {
        let same_type = MediaType::parse(declared_type)
            .map(|declared| declared.format() == self.media.format())
            .unwrap_or(false);
        if !same_type {
            return Err(FragmentError::TypeImmutable {
                stored: self.record.media_type.clone(),
                declared: declared_type.to_string(),
            });
        }
        self.set_data(data).await?;
        self.save().await
    }

    /// Refuse a supplied id that some owner already holds. Checked once, so
    /// the fragment's own later writes are not mistaken for a clash.
    async fn claim_id(&mut self) -> Result<()> {
        if self.id_claimed {
            return Ok(());
        }
        if let Some(holder) = self.backend.find_owner(&self.record.id).await? {
            tracing::warn!(
                id = %self.record.id,
                owner_id = %self.record.owner_id,
                holder = %holder,
                "rejected reuse of fragment id"
            );
            return Err(FragmentError::Validation(format!(
                "id already in use: {}",
                self.record.id
            )));
        }
        self.id_claimed = true;
        Ok(())
    }

    fn touch(&mut self) {
        self.record.updated = Utc::now().max(self.record.updated);
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn owner_id(&self) -> &str {
        &self.record.owner_id
    }

    pub fn size(&self) -> u64 {
        self.record.size
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.record.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.record.updated
    }

    /// The type exactly as declared at creation.
    pub fn media_type(&self) -> &MediaType {
        &self.media
    }

    /// The base type/subtype, e.g. `text/html` for `text/html; charset=utf-8`.
    pub fn mime_type(&self) -> &'static str {
        self.media.essence()
    }

    pub fn format(&self) -> Format {
        self.media.format()
    }

    pub fn is_text(&self) -> bool {
        self.media.is_text()
    }

    /// Media types this fragment can be served as.
    pub fn formats(&self) -> Vec<&'static str> {
        self.format().targets().iter().map(|f| f.essence()).collect()
    }

    pub fn record(&self) -> &FragmentRecord {
        &self.record
    }

    pub fn into_record(self) -> FragmentRecord {
        self.record
    }
}
