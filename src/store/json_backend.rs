//! JSON snapshot persistence for the record store.
//!
//! Keeps the whole record set in memory and rewrites one schema-versioned
//! snapshot file after every mutation, atomically via a temp file. Suited to
//! per-class record volumes; a transactional database backend would
//! implement [`RecordStore`] directly instead.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::expense::{Expense, ExpenseAmendment, ExpenseDraft, ExpensePatch};
use crate::domain::obligation::{ObligationDraft, PaymentObligation};
use crate::domain::payment::{Payment, PaymentDraft};
use crate::errors::{EngineError, EngineResult};
use crate::store::memory::MemoryStore;
use crate::store::{
    ExpenseFilter, ExpenseResolution, PaymentFilter, PaymentResolution, RecordStore,
};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;

const TMP_SUFFIX: &str = "tmp";

/// Serialized form of the full record set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordBook {
    #[serde(default)]
    pub schema_version: u8,
    #[serde(default)]
    pub obligations: Vec<PaymentObligation>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub amendments: Vec<ExpenseAmendment>,
}

/// File-backed record store: a [`MemoryStore`] plus a snapshot file.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Serializes each mutation with the snapshot write that follows it,
    /// so the file on disk always contains every committed mutation and
    /// concurrent writers never race on the rename.
    write_guard: Mutex<()>,
}

impl JsonStore {
    /// Opens the snapshot at `path`, creating an empty store if the file
    /// does not exist yet. Snapshots written by a newer schema are refused.
    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let book: RecordBook = serde_json::from_str(&data)?;
            if book.schema_version > CURRENT_SCHEMA_VERSION {
                return Err(EngineError::Validation(format!(
                    "record book schema v{} is newer than supported v{}",
                    book.schema_version, CURRENT_SCHEMA_VERSION
                )));
            }
            MemoryStore::from_book(book)
        } else {
            MemoryStore::new()
        };
        Ok(Self {
            path,
            inner,
            write_guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_guard
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn persist(&self) -> EngineResult<()> {
        let book = self.inner.snapshot();
        let json = serde_json::to_string_pretty(&book)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension(format!("{TMP_SUFFIX}.{}", Uuid::new_v4().simple()));
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl RecordStore for JsonStore {
    fn insert_obligation(
        &self,
        draft: ObligationDraft,
        now: DateTime<Utc>,
    ) -> EngineResult<PaymentObligation> {
        let _guard = self.lock_writes();
        let obligation = self.inner.insert_obligation(draft, now)?;
        self.persist()?;
        Ok(obligation)
    }

    fn obligation(&self, id: Uuid) -> EngineResult<Option<PaymentObligation>> {
        self.inner.obligation(id)
    }

    fn list_obligations(&self) -> EngineResult<Vec<PaymentObligation>> {
        self.inner.list_obligations()
    }

    fn set_obligation_active(&self, id: Uuid, active: bool) -> EngineResult<PaymentObligation> {
        let _guard = self.lock_writes();
        let obligation = self.inner.set_obligation_active(id, active)?;
        self.persist()?;
        Ok(obligation)
    }

    fn insert_payment(&self, draft: PaymentDraft, now: DateTime<Utc>) -> EngineResult<Payment> {
        let _guard = self.lock_writes();
        let payment = self.inner.insert_payment(draft, now)?;
        self.persist()?;
        Ok(payment)
    }

    fn payment(&self, id: Uuid) -> EngineResult<Option<Payment>> {
        self.inner.payment(id)
    }

    fn list_payments(&self, filter: &PaymentFilter) -> EngineResult<Vec<Payment>> {
        self.inner.list_payments(filter)
    }

    fn resolve_payment(&self, id: Uuid, resolution: PaymentResolution) -> EngineResult<Payment> {
        let _guard = self.lock_writes();
        let payment = self.inner.resolve_payment(id, resolution)?;
        self.persist()?;
        Ok(payment)
    }

    fn insert_expense(&self, draft: ExpenseDraft, now: DateTime<Utc>) -> EngineResult<Expense> {
        let _guard = self.lock_writes();
        let expense = self.inner.insert_expense(draft, now)?;
        self.persist()?;
        Ok(expense)
    }

    fn expense(&self, id: Uuid) -> EngineResult<Option<Expense>> {
        self.inner.expense(id)
    }

    fn list_expenses(&self, filter: &ExpenseFilter) -> EngineResult<Vec<Expense>> {
        self.inner.list_expenses(filter)
    }

    fn resolve_expense(&self, id: Uuid, resolution: ExpenseResolution) -> EngineResult<Expense> {
        let _guard = self.lock_writes();
        let expense = self.inner.resolve_expense(id, resolution)?;
        self.persist()?;
        Ok(expense)
    }

    fn apply_amendment(&self, id: Uuid, patch: &ExpensePatch) -> EngineResult<(Expense, Expense)> {
        let _guard = self.lock_writes();
        let result = self.inner.apply_amendment(id, patch)?;
        self.persist()?;
        Ok(result)
    }

    fn record_amendment(&self, amendment: ExpenseAmendment) -> EngineResult<()> {
        let _guard = self.lock_writes();
        self.inner.record_amendment(amendment)?;
        self.persist()?;
        Ok(())
    }

    fn list_amendments(&self, expense_id: Uuid) -> EngineResult<Vec<ExpenseAmendment>> {
        self.inner.list_amendments(expense_id)
    }
}
