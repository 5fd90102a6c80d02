// proposal-pdf: screen controller tying the wizard, the store and the exporter

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use crate::error::{AppError, SaveError, StoreError};
use crate::export::{DocumentExporter, ExportedDocument};
use crate::record::Record;
use crate::store::{Listener, RecordStore, StoredRecord, Subscription};
use crate::wizard::Wizard;

const UNTITLED: &str = "Untitled";
const EMPTY_FIELD: &str = "\u{2014}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Welcome,
    Form,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(String),
    Updated(String),
}

impl SaveOutcome {
    pub fn id(&self) -> &str {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => id,
        }
    }
}

/// Summary shown for each saved proposal in the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalCard {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub headcount: String,
    pub responsible_parties: String,
}

impl ProposalCard {
    pub fn from_stored(stored: &StoredRecord) -> Self {
        let or_dash = |value: &str| {
            let value = value.trim();
            if value.is_empty() {
                EMPTY_FIELD.to_string()
            } else {
                value.to_string()
            }
        };
        let name = stored.record.name.trim();
        ProposalCard {
            id: stored.id.clone(),
            title: if name.is_empty() { UNTITLED.to_string() } else { name.to_string() },
            duration: or_dash(&stored.record.capacity.duration),
            headcount: or_dash(&stored.record.capacity.headcount),
            responsible_parties: or_dash(&stored.record.responsible_parties),
        }
    }
}

/// Case-insensitive substring match over name, responsible parties and
/// thematic axes. A blank query matches everything.
pub fn matches_query(record: &Record, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [&record.name, &record.responsible_parties, &record.axes]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
}

pub fn search(items: Vec<StoredRecord>, query: &str) -> Vec<StoredRecord> {
    items.into_iter().filter(|item| matches_query(&item.record, query)).collect()
}

// ============================================================================
// Saving
// ============================================================================

/// Clears the saving flag on every exit path.
#[derive(Debug)]
struct SavingGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SavingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A validated save waiting to be written.
#[derive(Debug)]
pub struct PendingSave {
    record: Arc<Record>,
    id: Option<String>,
    _guard: SavingGuard,
}

impl PendingSave {
    /// Creates or updates depending on whether the proposal already has an
    /// id. The saving flag is released when this returns.
    pub fn execute(self, store: &dyn RecordStore) -> Result<SaveOutcome, SaveError> {
        let result = match &self.id {
            Some(id) => store.update(id, &self.record).map(|_| SaveOutcome::Updated(id.clone())),
            None => store.create(&self.record).map(SaveOutcome::Created),
        };
        match result {
            Ok(outcome) => {
                info!("event=save status=ok id={}", outcome.id());
                Ok(outcome)
            }
            Err(e) => {
                error!("event=save status=error reason=\"{}\"", e);
                Err(SaveError::StoreWriteFailed(e))
            }
        }
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    store: Arc<dyn RecordStore>,
    wizard: Wizard,
    exporter: DocumentExporter,
    view: View,
    saving: Arc<AtomicBool>,
}

impl Session {
    pub fn new(store: Arc<dyn RecordStore>, wizard: Wizard, exporter: DocumentExporter) -> Self {
        Session {
            store,
            wizard,
            exporter,
            view: View::default(),
            saving: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut Wizard {
        &mut self.wizard
    }

    pub fn exporter(&self) -> &DocumentExporter {
        &self.exporter
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn show(&mut self, view: View) {
        self.view = view;
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// Validates the current proposal and claims the saving flag.
    pub fn begin_save(&self) -> Result<PendingSave, SaveError> {
        let record = Arc::clone(self.wizard.record());
        if !record.has_name() {
            return Err(SaveError::MissingRequiredField);
        }
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SaveError::SaveInProgress);
        }
        Ok(PendingSave {
            record,
            id: self.wizard.current_id().map(str::to_string),
            _guard: SavingGuard {
                flag: Arc::clone(&self.saving),
            },
        })
    }

    /// Tracks the id of a newly created proposal.
    pub fn finish_save(&mut self, outcome: &SaveOutcome) {
        if let SaveOutcome::Created(id) = outcome {
            self.wizard.set_current_id(Some(id.clone()));
        }
    }

    pub fn save(&mut self) -> Result<SaveOutcome, SaveError> {
        let pending = self.begin_save()?;
        let outcome = pending.execute(self.store.as_ref())?;
        self.finish_save(&outcome);
        Ok(outcome)
    }

    /// Starts a blank proposal in the form view.
    pub fn new_record(&mut self) {
        self.wizard.reset();
        self.view = View::Form;
    }

    /// Loads a saved proposal into the wizard.
    pub fn open(&mut self, id: &str) -> Result<(), StoreError> {
        let stored = self.get(id)?;
        self.wizard.open(stored.id, stored.record);
        self.view = View::Form;
        info!("event=open status=ok id={}", id);
        Ok(())
    }

    /// Deletes a saved proposal. Deleting the one being edited turns the
    /// form back into an unsaved draft.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.store.delete(id)?;
        if self.wizard.current_id() == Some(id) {
            self.wizard.set_current_id(None);
        }
        info!("event=delete status=ok id={}", id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<StoredRecord, StoreError> {
        self.store
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn list(&self, query: &str) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(search(self.store.list()?, query))
    }

    pub fn cards(&self, query: &str) -> Result<Vec<ProposalCard>, StoreError> {
        Ok(self.list(query)?.iter().map(ProposalCard::from_stored).collect())
    }

    pub fn subscribe_list(&self, listener: Listener) -> Subscription {
        self.store.subscribe(listener)
    }

    pub fn export(&self) -> Result<ExportedDocument, AppError> {
        self.exporter.build(self.wizard.record())
    }
}

// ============================================================================
// Tests
// ============================================================================
