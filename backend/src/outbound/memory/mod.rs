//! In-process adapters for every lending port.
//!
//! [`MemoryStore`] backs development runs without PostgreSQL and the HTTP and
//! behaviour tests. A single mutex guards all tables, so each port call is
//! atomic with respect to every other call, matching the conditional-write
//! semantics of the Diesel adapters.

mod borrow;
mod directory;
mod feedback;
mod invitations;
mod membership;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::domain::ports::{FIXTURE_BORROWER, FIXTURE_LENDER, FixtureAccount, ItemSummary};
use crate::domain::{
    BorrowRequest, Collection, CollectionMember, EmailAddress, Invitation, IssueNumber,
    MemberRole, UserContact, UserId,
};

/// Item owned by the fixture lender in the development data set.
pub const DEV_ITEM_ID: Uuid = Uuid::from_u128(0x5a1d_0c6e_2f3b_4c1a_9e7d_0000_0000_1001);
/// Library owned by the fixture lender; the fixture borrower is a member.
pub const DEV_LIBRARY_ID: Uuid = Uuid::from_u128(0x5a1d_0c6e_2f3b_4c1a_9e7d_0000_0000_2001);
/// Branch the fixture accounts can be invited to.
pub const DEV_BRANCH_ID: Uuid = Uuid::from_u128(0x5a1d_0c6e_2f3b_4c1a_9e7d_0000_0000_3001);

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<UserId, UserContact>,
    items: HashMap<Uuid, ItemSummary>,
    collections: HashMap<Uuid, Collection>,
    members: HashMap<(Uuid, UserId), CollectionMember>,
    branch_members: HashMap<(Uuid, UserId), bool>,
    invitations: HashMap<Uuid, Invitation>,
    borrow_requests: HashMap<Uuid, BorrowRequest>,
    votes: BTreeSet<(IssueNumber, UserId)>,
}

/// Shared in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    #[cfg(any(test, feature = "test-support"))]
    faults: Mutex<Faults>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    transfer_after_owner_swap: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store pre-loaded with the fixture accounts, one item and one library.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.add_user(fixture_contact(FIXTURE_LENDER, "Lena Lender", "+447700900001"));
        store.add_user(fixture_contact(FIXTURE_BORROWER, "Bo Borrower", "+447700900002"));
        store.add_item(ItemSummary {
            id: DEV_ITEM_ID,
            owner_id: FIXTURE_LENDER.user_id,
            title: "Cordless drill".to_owned(),
        });
        store.add_collection(Collection {
            id: DEV_LIBRARY_ID,
            owner_id: FIXTURE_LENDER.user_id,
            name: "Elm Street tool library".to_owned(),
        });
        store.add_member(CollectionMember {
            user_id: FIXTURE_BORROWER.user_id,
            collection_id: DEV_LIBRARY_ID,
            role: MemberRole::Member,
            is_active: true,
        });
        store
    }

    /// Register a user.
    pub fn add_user(&self, contact: UserContact) {
        self.lock().users.insert(contact.user_id, contact);
    }

    /// Register an item.
    pub fn add_item(&self, item: ItemSummary) {
        self.lock().items.insert(item.id, item);
    }

    /// Register a collection.
    pub fn add_collection(&self, collection: Collection) {
        self.lock().collections.insert(collection.id, collection);
    }

    /// Register or replace a collection membership.
    pub fn add_member(&self, member: CollectionMember) {
        self.lock()
            .members
            .insert((member.collection_id, member.user_id), member);
    }

    /// Snapshot of a collection.
    pub fn collection(&self, collection_id: &Uuid) -> Option<Collection> {
        self.lock().collections.get(collection_id).cloned()
    }

    /// Members of a collection, ordered by user id.
    pub fn members_of(&self, collection_id: &Uuid) -> Vec<CollectionMember> {
        let mut members: Vec<_> = self
            .lock()
            .members
            .values()
            .filter(|m| m.collection_id == *collection_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.user_id);
        members
    }

    /// Whether the user is an active member of the branch.
    pub fn is_branch_member(&self, branch_id: &Uuid, user_id: &UserId) -> bool {
        self.lock()
            .branch_members
            .get(&(*branch_id, *user_id))
            .copied()
            .unwrap_or(false)
    }

    /// Number of branch membership rows for a user across all branches.
    pub fn branch_membership_rows(&self, user_id: &UserId) -> usize {
        self.lock()
            .branch_members
            .keys()
            .filter(|(_, uid)| uid == user_id)
            .count()
    }

    /// Snapshot of a borrow request.
    pub fn borrow_request(&self, id: &Uuid) -> Option<BorrowRequest> {
        self.lock().borrow_requests.get(id).cloned()
    }

    /// Snapshot of an invitation.
    pub fn invitation(&self, id: &Uuid) -> Option<Invitation> {
        self.lock().invitations.get(id).cloned()
    }

    /// Rewrite a stored invitation.
    pub fn update_invitation(&self, id: &Uuid, update: impl FnOnce(&mut Invitation)) {
        if let Some(invitation) = self.lock().invitations.get_mut(id) {
            update(invitation);
        }
    }
}

fn fixture_contact(account: FixtureAccount, name: &str, phone: &str) -> UserContact {
    UserContact {
        user_id: account.user_id,
        display_name: name.to_owned(),
        email: EmailAddress::new(account.email).ok(),
        phone: Some(phone.to_owned()),
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Make the next ownership transfers fail after the owner swap and
    /// before the previous owner's admin membership is written.
    pub fn fail_transfer_after_owner_swap(&self, failing: bool) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transfer_after_owner_swap = failing;
    }

    fn transfer_fault(&self) -> bool {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .transfer_after_owner_swap
    }
}

#[cfg(not(any(test, feature = "test-support")))]
impl MemoryStore {
    fn transfer_fault(&self) -> bool {
        false
    }
}
