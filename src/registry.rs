//! The worth registry: two mutable input tiers, one published snapshot.
//!
//! Callers mutate the pre-assigned or post-assigned tier through
//! [`Registry::register`] and trigger [`Registry::compute`] to merge both
//! tiers into a fresh immutable [`Snapshot`]. The snapshot is published by
//! swapping a pointer to a fully built structure, so readers never block and
//! never see a partial merge. Every recompute writes all three mappings
//! through the [`Persistor`].

use std::collections::BTreeMap;
use std::collections::btree_map::Iter;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

// readers pin the current snapshot, writers publish a replacement wholesale
use arc_swap::ArcSwap;

use tracing::{debug, info, warn};

use crate::error::{ExchequerError, Result};
use crate::persist::{Persistor, Record};
use crate::stack::{Directory, Stack, StackKey};
use crate::worth::Worth;

// ------------- Tier -------------
/// Which of the two input tiers a registration lands in.
///
/// Pre-assigned worths are the base layer; post-assigned worths win over
/// anything the merge produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Pre,
    Post,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

// ------------- TierKeeper -------------
/// Keeper of one input tier: a key-unique mapping from canonical keys to
/// worths. Re-keeping a key replaces its worth, it never accumulates.
#[derive(Debug, Default)]
pub struct TierKeeper {
    kept: BTreeMap<StackKey, Worth>,
}

impl TierKeeper {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn keep(&mut self, key: StackKey, worth: Worth) -> bool {
        self.kept.insert(key, worth).is_some()
    }
    pub fn get(&self, key: &StackKey) -> Option<Worth> {
        self.kept.get(key).copied()
    }
    pub fn iter(&self) -> Iter<'_, StackKey, Worth> {
        self.kept.iter()
    }
    pub fn kept(&self) -> &BTreeMap<StackKey, Worth> {
        &self.kept
    }
    /// Folds restored entries into the tier, keeping the restored worth on
    /// collision.
    pub fn absorb(&mut self, worths: BTreeMap<StackKey, Worth>) {
        self.kept.extend(worths);
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Snapshot -------------
/// The published result of a merge: an immutable mapping sorted by the
/// canonical key order. Exactly one snapshot is live at any time.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    worths: BTreeMap<StackKey, Worth>,
}

impl Snapshot {
    pub(crate) fn new(worths: BTreeMap<StackKey, Worth>) -> Self {
        Self { worths }
    }
    pub fn worth(&self, key: &StackKey) -> Option<Worth> {
        self.worths.get(key).copied()
    }
    pub fn iter(&self) -> Iter<'_, StackKey, Worth> {
        self.worths.iter()
    }
    pub fn worths(&self) -> &BTreeMap<StackKey, Worth> {
        &self.worths
    }
    pub fn len(&self) -> usize {
        self.worths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.worths.is_empty()
    }
}

// ------------- Registry -------------
// This sets up the registry with the necessary structures
pub struct Registry {
    // owns keepers for the two input tiers
    pre_keeper: Arc<Mutex<TierKeeper>>,
    post_keeper: Arc<Mutex<TierKeeper>>,
    // the live snapshot, replaced as a whole on publication
    snapshot: ArcSwap<Snapshot>,
    // a recompute runs from working copy to persisted result without interleaving
    compute_guard: Mutex<()>,
    // responsible for the persistence layer
    persistor: Arc<Mutex<Persistor>>,
    // the host's resource directory, consulted when wrapping
    directory: Arc<dyn Directory>,
}

impl Registry {
    pub fn new(persistor: Persistor, directory: Arc<dyn Directory>) -> Registry {
        Registry {
            pre_keeper: Arc::new(Mutex::new(TierKeeper::new())),
            post_keeper: Arc::new(Mutex::new(TierKeeper::new())),
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            compute_guard: Mutex::new(()),
            persistor: Arc::new(Mutex::new(persistor)),
            directory,
        }
    }
    // functions to access the owned keepers and collaborators
    pub fn pre_keeper(&self) -> Arc<Mutex<TierKeeper>> {
        Arc::clone(&self.pre_keeper)
    }
    pub fn post_keeper(&self) -> Arc<Mutex<TierKeeper>> {
        Arc::clone(&self.post_keeper)
    }
    pub fn persistor(&self) -> Arc<Mutex<Persistor>> {
        Arc::clone(&self.persistor)
    }
    pub fn directory(&self) -> Arc<dyn Directory> {
        Arc::clone(&self.directory)
    }
    /// The live snapshot. Loading it never blocks and the returned map stays
    /// valid however many recomputes happen afterwards.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
    /// Wraps a stack against the host directory and looks its unit worth up
    /// in the live snapshot.
    pub fn worth_of(&self, stack: &Stack) -> Result<Option<Worth>> {
        let key = StackKey::wrap(self.directory.as_ref(), stack)?;
        Ok(self.snapshot.load().worth(&key))
    }

    /// Assigns a worth to whatever the stack identifies.
    ///
    /// The stack is wrapped at a unit quantity for the lookup key while the
    /// worth is factored by the stack's original quantity, so the stored
    /// worth is always per unit. Unknown identifiers are rejected with
    /// [`ExchequerError::Unwrappable`] and leave every mapping untouched.
    ///
    /// A pre-tier assignment only becomes visible once a recompute runs;
    /// pass `regenerate` to run one synchronously before returning. A
    /// post-tier assignment is published into the live snapshot immediately,
    /// unfactored, and its factored form is kept in the post tier so it
    /// survives the next recompute.
    pub fn register(&self, stack: &Stack, worth: Worth, tier: Tier, regenerate: bool) -> Result<()> {
        let key = StackKey::wrap(self.directory.as_ref(), stack)?;
        let factored = worth.factor(stack.quantity())?;
        match tier {
            Tier::Pre => {
                self.lock_pre()?.keep(key.clone(), factored);
                debug!(key = %key, worth = factored.get(), "pre worth kept");
                if regenerate {
                    self.compute()?;
                }
            }
            Tier::Post => {
                self.snapshot.rcu(|current| {
                    let mut worths = current.worths.clone();
                    worths.insert(key.clone(), worth);
                    Snapshot::new(worths)
                });
                self.lock_post()?.keep(key.clone(), factored);
                debug!(key = %key, worth = worth.get(), "post worth published");
            }
        }
        Ok(())
    }

    /// Merges both input tiers into a fresh snapshot and publishes it.
    ///
    /// The merge is reproducible: the same two tiers always bake the same
    /// snapshot. A persistence failure is reported but does not unpublish
    /// the snapshot, which stays authoritative in memory.
    pub fn compute(&self) -> Result<()> {
        let _guard = self.lock_compute()?;

        // both tiers stay locked from working copy to publication, so no
        // mutation interleaves with an in-progress merge
        let snapshot = {
            let pre = self.lock_pre()?;
            let post = self.lock_post()?;

            // the working copy of the worth mapping
            let mut working = BTreeMap::new();

            // layer in all pre-assigned worths
            for (key, worth) in pre.iter() {
                working.insert(key.clone(), *worth);
            }

            // worths derived from the known ways to make a resource would be
            // seeded here from the pre-assigned layer
            // TODO implement recipe-derived worths

            // layer in all post-assigned worths, these win over anything above
            for (key, worth) in post.iter() {
                working.insert(key.clone(), *worth);
            }

            // bake the working copy and publish it wholesale
            let snapshot = Arc::new(Snapshot::new(working));
            self.snapshot.store(Arc::clone(&snapshot));
            snapshot
        };
        info!(entries = snapshot.len(), "snapshot published");

        self.save()
    }

    /// Writes the pre tier, the post tier and the snapshot to their three
    /// records. Each write is independent; the first failure is reported
    /// after all three have been attempted.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.snapshot.load();
        let pre = self.lock_pre()?;
        let post = self.lock_post()?;
        let persistor = self.lock_persistor()?;
        let mut first_failure = None;
        for (record, worths) in [
            (Record::Snapshot, snapshot.worths()),
            (Record::Pre, pre.kept()),
            (Record::Post, post.kept()),
        ] {
            if let Err(error) = persistor.persist(record, worths) {
                warn!(record = %record, error = %error, "record write failed");
                first_failure.get_or_insert(error);
            }
        }
        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Restores the three records from durable storage.
    ///
    /// A missing tier record leaves that tier as it is. A missing snapshot
    /// record triggers a recompute from whatever the tiers now hold. Any
    /// other persistence failure is returned untouched.
    pub fn load(&self) -> Result<()> {
        let restored_snapshot = {
            let persistor = self.lock_persistor()?;
            if let Some(worths) = persistor.restore(Record::Pre)? {
                self.lock_pre()?.absorb(worths);
            }
            if let Some(worths) = persistor.restore(Record::Post)? {
                self.lock_post()?.absorb(worths);
            }
            persistor.restore(Record::Snapshot)?
        };
        match restored_snapshot {
            Some(worths) => {
                let snapshot = Snapshot::new(worths);
                info!(entries = snapshot.len(), "snapshot restored");
                self.snapshot.store(Arc::new(snapshot));
                Ok(())
            }
            None => {
                warn!("no snapshot record found, regenerating");
                self.compute()
            }
        }
    }

    fn lock_pre(&self) -> Result<MutexGuard<'_, TierKeeper>> {
        self.pre_keeper.lock().map_err(|e| ExchequerError::Lock(e.to_string()))
    }
    fn lock_post(&self) -> Result<MutexGuard<'_, TierKeeper>> {
        self.post_keeper.lock().map_err(|e| ExchequerError::Lock(e.to_string()))
    }
    fn lock_persistor(&self) -> Result<MutexGuard<'_, Persistor>> {
        self.persistor.lock().map_err(|e| ExchequerError::Lock(e.to_string()))
    }
    fn lock_compute(&self) -> Result<MutexGuard<'_, ()>> {
        self.compute_guard.lock().map_err(|e| ExchequerError::Lock(e.to_string()))
    }
}
