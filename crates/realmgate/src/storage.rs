//! Account persistence.
//!
//! The account handler never keeps account records between requests. It
//! reads a fresh copy through [`Storage`], modifies it, and writes it back
//! with [`Storage::persist`].

use std::collections::HashMap;

use realmgate_protocol::AccountId;

use crate::account::{digest, Account, Character};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error("username {0:?} is taken")]
    NameTaken(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Where account records live.
///
/// Methods are synchronous: the handler calls them while holding its lock,
/// so a backend that talks to a database should keep a write-behind cache
/// and answer from memory.
///
/// Lookups return owned copies. A backend is free to hand out whatever it
/// has on file; callers never hold on to the result past one request.
pub trait Storage: Send + 'static {
    fn find_account_by_name(&self, name: &str) -> Option<Account>;

    fn find_account_by_id(&self, id: AccountId) -> Option<Account>;

    /// Stores a new account and returns the id assigned to it.
    fn add_account(&mut self, account: Account) -> Result<AccountId, StorageError>;

    /// Removes an account and, with it, its characters.
    fn delete_account(&mut self, id: AccountId) -> Result<Account, StorageError>;

    /// Writes back a modified copy of an existing account.
    fn persist(&mut self, account: &Account) -> Result<(), StorageError>;

    /// `email` is the plain address; backends compare digests.
    fn email_exists(&self, email: &str) -> bool;

    /// Character names are unique across all accounts.
    fn character_name_exists(&self, name: &str) -> bool;

    /// The account with this name, if `password` matches it.
    fn verify_credentials(&self, name: &str, password: &str) -> Option<Account> {
        self.find_account_by_name(name)
            .filter(|account| account.check_password(password))
    }

    fn characters(&self, id: AccountId) -> Option<Vec<Character>> {
        self.find_account_by_id(id).map(|account| account.characters)
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-process storage. Everything is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    accounts: HashMap<AccountId, Account>,
    by_name: HashMap<String, AccountId>,
    next_id: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn find_account_by_name(&self, name: &str) -> Option<Account> {
        self.by_name
            .get(name)
            .and_then(|id| self.accounts.get(id))
            .cloned()
    }

    fn find_account_by_id(&self, id: AccountId) -> Option<Account> {
        self.accounts.get(&id).cloned()
    }

    fn add_account(&mut self, mut account: Account) -> Result<AccountId, StorageError> {
        if self.by_name.contains_key(&account.name) {
            return Err(StorageError::NameTaken(account.name));
        }
        self.next_id += 1;
        let id = AccountId(self.next_id);
        account.id = id;
        self.by_name.insert(account.name.clone(), id);
        self.accounts.insert(id, account);
        tracing::debug!(%id, "account stored");
        Ok(id)
    }

    fn delete_account(&mut self, id: AccountId) -> Result<Account, StorageError> {
        let account = self.accounts.remove(&id).ok_or(StorageError::NotFound(id))?;
        self.by_name.remove(&account.name);
        tracing::debug!(%id, "account deleted");
        Ok(account)
    }

    fn persist(&mut self, account: &Account) -> Result<(), StorageError> {
        let stored = self
            .accounts
            .get_mut(&account.id)
            .ok_or(StorageError::NotFound(account.id))?;
        *stored = account.clone();
        Ok(())
    }

    fn email_exists(&self, email: &str) -> bool {
        let wanted = digest(email);
        self.accounts.values().any(|a| a.email_digest() == wanted)
    }

    fn character_name_exists(&self, name: &str) -> bool {
        self.accounts
            .values()
            .flat_map(|a| a.characters.iter())
            .any(|c| c.name == name)
    }
}
