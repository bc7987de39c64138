//! # Persistence adapter
//!
//! The engine talks to storage only through [`PersistenceAdapter`]. The
//! HTTP implementation lives in `folio-client`; [`MemoryAdapter`] backs
//! tests, fixtures and the offline CLI.
//!
//! Every adapter must keep (page, selector) unique among active records:
//! a create for a pair that already has an active record updates it in
//! place instead.

use crate::errors::AdapterError;
use crate::model::{
    AdminStatus, ImageUpload, OverrideId, OverrideRecord, SavePayload, SectionOrder,
    UploadedImage,
};
use async_trait::async_trait;
use chrono::Utc;
use folio_common::PageSlug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// All active overrides for `page`
    async fn load_overrides(&self, page: &PageSlug) -> AdapterResult<Vec<OverrideRecord>>;

    /// Create or update. `original_content` is ignored on update.
    async fn save_override(&self, payload: &SavePayload) -> AdapterResult<OverrideRecord>;

    /// Logical delete
    async fn delete_override(&self, id: &OverrideId) -> AdapterResult<()>;

    async fn get_section_order(&self, page: &PageSlug) -> AdapterResult<SectionOrder>;

    async fn set_section_order(
        &self,
        page: &PageSlug,
        order: &[String],
    ) -> AdapterResult<SectionOrder>;

    async fn upload_image(&self, file: &ImageUpload) -> AdapterResult<UploadedImage>;

    async fn check_admin_status(&self) -> AdapterResult<AdminStatus>;
}

/// Serializable contents of a [`MemoryAdapter`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
    #[serde(default)]
    pub section_orders: Vec<SectionOrder>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<OverrideRecord>,
    section_orders: BTreeMap<PageSlug, Vec<String>>,
    next_id: u64,
    is_admin: bool,
    offline: bool,
    uploads: Vec<String>,
}

impl MemoryState {
    fn check_online(&self) -> AdapterResult<()> {
        if self.offline {
            Err(AdapterError::Transport("adapter is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn active_position(&self, page: &PageSlug, selector: &str) -> Option<usize> {
        self.records.iter().position(|record| {
            record.is_active && &record.target_page == page && record.target_selector == selector
        })
    }

    fn allocate_id(&mut self) -> OverrideId {
        let used: Vec<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        loop {
            self.next_id += 1;
            let candidate = self.next_id.to_string();
            if !used.contains(&candidate.as_str()) {
                return OverrideId::new(candidate);
            }
        }
    }
}

/// In-process store with the same uniqueness and original-content rules
/// a real backend enforces
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    state: Mutex<MemoryState>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let adapter = Self::new();
        {
            let mut state = adapter.lock();
            state.records = snapshot.overrides;
            state.section_orders = snapshot
                .section_orders
                .into_iter()
                .map(|order| (order.page, order.order))
                .collect();
        }
        adapter
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.lock();
        MemorySnapshot {
            overrides: state.records.clone(),
            section_orders: state
                .section_orders
                .iter()
                .map(|(page, order)| SectionOrder::new(page.clone(), order.clone()))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Make every call fail with a transport error
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn set_admin(&self, is_admin: bool) {
        self.lock().is_admin = is_admin;
    }

    /// Every record ever stored, inactive ones included
    pub fn all_records(&self) -> Vec<OverrideRecord> {
        self.lock().records.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.lock().uploads.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave a record half-written
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    async fn load_overrides(&self, page: &PageSlug) -> AdapterResult<Vec<OverrideRecord>> {
        let state = self.lock();
        state.check_online()?;
        Ok(state
            .records
            .iter()
            .filter(|record| record.is_active && &record.target_page == page)
            .cloned()
            .collect())
    }

    async fn save_override(&self, payload: &SavePayload) -> AdapterResult<OverrideRecord> {
        let mut state = self.lock();
        state.check_online()?;
        let now = Utc::now();

        let position = match &payload.id {
            Some(id) => {
                let position = state
                    .records
                    .iter()
                    .position(|record| record.is_active && &record.id == id)
                    .ok_or_else(|| AdapterError::NotFound(id.to_string()))?;

                if let Some(other) =
                    state.active_position(&payload.target_page, &payload.target_selector)
                {
                    if other != position {
                        return Err(AdapterError::Conflict(payload.target_selector.clone()));
                    }
                }
                Some(position)
            }
            None => state.active_position(&payload.target_page, &payload.target_selector),
        };

        let record = match position {
            Some(position) => {
                let record = &mut state.records[position];
                record.update_from(payload, now);
                debug!(id = %record.id, selector = %record.target_selector, "Updated override");
                record.clone()
            }
            None => {
                let id = state.allocate_id();
                let record = OverrideRecord::from_payload(id, payload, now);
                debug!(id = %record.id, selector = %record.target_selector, "Created override");
                state.records.push(record.clone());
                record
            }
        };

        Ok(record)
    }

    async fn delete_override(&self, id: &OverrideId) -> AdapterResult<()> {
        let mut state = self.lock();
        state.check_online()?;
        let record = state
            .records
            .iter_mut()
            .find(|record| record.is_active && &record.id == id)
            .ok_or_else(|| AdapterError::NotFound(id.to_string()))?;
        record.is_active = false;
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn get_section_order(&self, page: &PageSlug) -> AdapterResult<SectionOrder> {
        let state = self.lock();
        state.check_online()?;
        Ok(SectionOrder::new(
            page.clone(),
            state.section_orders.get(page).cloned().unwrap_or_default(),
        ))
    }

    async fn set_section_order(
        &self,
        page: &PageSlug,
        order: &[String],
    ) -> AdapterResult<SectionOrder> {
        let mut state = self.lock();
        state.check_online()?;
        state.section_orders.insert(page.clone(), order.to_vec());
        Ok(SectionOrder::new(page.clone(), order.to_vec()))
    }

    async fn upload_image(&self, file: &ImageUpload) -> AdapterResult<UploadedImage> {
        let mut state = self.lock();
        state.check_online()?;
        if !file.mime_type.starts_with("image/") {
            return Err(AdapterError::Status {
                status: 415,
                body: format!("unsupported media type '{}'", file.mime_type),
            });
        }
        let url = format!("/uploads/{}-{}", Uuid::new_v4(), file.file_name);
        state.uploads.push(url.clone());
        Ok(UploadedImage { url })
    }

    async fn check_admin_status(&self) -> AdapterResult<AdminStatus> {
        let state = self.lock();
        state.check_online()?;
        Ok(AdminStatus {
            is_admin: state.is_admin,
        })
    }
}
