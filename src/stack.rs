//! Stackable resource identifiers and their canonical, totally ordered keys.
//!
//! A [`Stack`] names "some quantity of some resource": a discrete item (with
//! an optional sub-variant tag), a fluid (whose volume is its quantity), or a
//! wildcard standing for any member of a named category. A [`StackKey`] is a
//! stack that has been validated against the host [`Directory`] and
//! normalized to a unit quantity; only keys appear in the keepers and in the
//! published snapshot. The order over keys is strict and total so that
//! merges, lookups and serialized records come out identical across runs.

use serde::{Deserialize, Serialize};

use lazy_static::lazy_static;
use regex::Regex;

// identifier sets use a fast hasher, membership checks happen on every wrap
use seahash::SeaHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::BuildHasherDefault;
use std::sync::Mutex;

// custom made ordering for stacks
use std::cmp::Ordering;

// used to print out readable forms of a stack
use std::fmt;
use std::str::FromStr;

use crate::error::{ExchequerError, Result};

pub type IdentifierHasher = BuildHasherDefault<SeaHasher>;

// ------------- Stack -------------
/// Some quantity of some stackable resource.
///
/// For items and categories the quantity is a count; for fluids it is the
/// volume. Ordering ranks the variants Item < Fluid < Category, then compares
/// identifying fields, with the quantity as the final tie-break.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stack {
    Item {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<u16>,
        count: u32,
    },
    Fluid {
        id: String,
        volume: u32,
    },
    Category {
        name: String,
        count: u32,
    },
}

impl Stack {
    pub fn item(id: impl Into<String>) -> Self {
        Self::Item { id: id.into(), variant: None, count: 1 }
    }
    pub fn item_variant(id: impl Into<String>, variant: u16) -> Self {
        Self::Item { id: id.into(), variant: Some(variant), count: 1 }
    }
    pub fn fluid(id: impl Into<String>) -> Self {
        Self::Fluid { id: id.into(), volume: 1 }
    }
    pub fn category(name: impl Into<String>) -> Self {
        Self::Category { name: name.into(), count: 1 }
    }
    /// The count of an item or category stack, the volume of a fluid stack.
    pub fn quantity(&self) -> u32 {
        match self {
            Self::Item { count, .. } => *count,
            Self::Fluid { volume, .. } => *volume,
            Self::Category { count, .. } => *count,
        }
    }
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        match &mut self {
            Self::Item { count, .. } => *count = quantity,
            Self::Fluid { volume, .. } => *volume = quantity,
            Self::Category { count, .. } => *count = quantity,
        }
        self
    }
    pub fn identifier(&self) -> &str {
        match self {
            Self::Item { id, .. } => id,
            Self::Fluid { id, .. } => id,
            Self::Category { name, .. } => name,
        }
    }
    // fixed variant rank, the first field of the total order
    fn rank(&self) -> u8 {
        match self {
            Self::Item { .. } => 0,
            Self::Fluid { .. } => 1,
            Self::Category { .. } => 2,
        }
    }
}

impl Ord for Stack {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Self::Item { id: a, variant: av, count: ac },
                Self::Item { id: b, variant: bv, count: bc },
            ) => (a, av, ac).cmp(&(b, bv, bc)),
            (
                Self::Fluid { id: a, volume: ac },
                Self::Fluid { id: b, volume: bc },
            ) => (a, ac).cmp(&(b, bc)),
            (
                Self::Category { name: a, count: ac },
                Self::Category { name: b, count: bc },
            ) => (a, ac).cmp(&(b, bc)),
            (_, _) => self.rank().cmp(&other.rank()),
        }
    }
}
impl PartialOrd for Stack {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Item { id, variant: None, .. } => write!(f, "item({})", id)?,
            Self::Item { id, variant: Some(v), .. } => write!(f, "item({}, {})", id, v)?,
            Self::Fluid { id, .. } => write!(f, "fluid({})", id)?,
            Self::Category { name, .. } => write!(f, "category({})", name)?,
        }
        if self.quantity() != 1 {
            write!(f, " * {}", self.quantity())?;
        }
        Ok(())
    }
}

lazy_static! {
    static ref STACK_LITERAL: Regex = Regex::new(
        r"^(item|fluid|category)\(\s*([A-Za-z0-9_.:/-]+)\s*(?:,\s*([0-9]+)\s*)?\)(?:\s*\*\s*([0-9]+))?$"
    )
    .unwrap();
}

impl FromStr for Stack {
    type Err = ExchequerError;
    /// Parses the display form: `item(carrot, 1)`, `fluid(water) * 500`,
    /// `category(ore_iron)`.
    fn from_str(text: &str) -> Result<Self> {
        let captures = STACK_LITERAL.captures(text.trim()).ok_or_else(|| ExchequerError::Parse {
            message: format!("not a stack literal: {}", text.trim()),
            command: None,
        })?;
        let identifier = captures[2].to_string();
        let variant = match captures.get(3) {
            Some(v) => Some(v.as_str().parse::<u16>().map_err(|e| ExchequerError::Parse {
                message: format!("variant tag out of range: {}", e),
                command: None,
            })?),
            None => None,
        };
        let quantity = match captures.get(4) {
            Some(q) => q.as_str().parse::<u32>().map_err(|e| ExchequerError::Parse {
                message: format!("quantity out of range: {}", e),
                command: None,
            })?,
            None => 1,
        };
        let stack = match &captures[1] {
            "item" => Stack::Item { id: identifier, variant, count: quantity },
            "fluid" if variant.is_none() => Stack::Fluid { id: identifier, volume: quantity },
            "category" if variant.is_none() => Stack::Category { name: identifier, count: quantity },
            _ => {
                return Err(ExchequerError::Parse {
                    message: format!("only items take a variant tag: {}", text.trim()),
                    command: None,
                });
            }
        };
        Ok(stack)
    }
}

// ------------- StackKey -------------
/// A stack accepted by the host directory and normalized to a unit quantity.
///
/// Keys are immutable and only come out of [`StackKey::wrap`], so whatever a
/// keeper or a snapshot holds is already canonical.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackKey {
    stack: Stack,
}

impl StackKey {
    /// Wraps a raw stack, failing when the directory does not recognize its
    /// identifier or the stack carries no quantity at all.
    pub fn wrap(directory: &dyn Directory, stack: &Stack) -> Result<StackKey> {
        if stack.quantity() == 0 {
            return Err(ExchequerError::Unwrappable(stack.to_string()));
        }
        match directory.canonicalize(stack) {
            Some(canonical) => Ok(StackKey { stack: canonical.with_quantity(1) }),
            None => Err(ExchequerError::Unwrappable(stack.to_string())),
        }
    }
    /// Pure predicate form of [`StackKey::wrap`].
    pub fn can_wrap(directory: &dyn Directory, stack: &Stack) -> bool {
        stack.quantity() > 0 && directory.canonicalize(stack).is_some()
    }
    pub fn stack(&self) -> &Stack {
        &self.stack
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.stack)
    }
}

// ------------- Directory -------------
/// The host environment's view of which resources exist.
///
/// The registry only ever consults it to validate and canonicalize an
/// identifier; both operations must be deterministic for a given input.
pub trait Directory: Send + Sync {
    /// The canonical form of a raw stack, or None when its identifier is
    /// unknown to the host.
    fn canonicalize(&self, stack: &Stack) -> Option<Stack>;
    /// Every known member of a named category.
    fn category_members(&self, name: &str) -> Vec<Stack>;
}

fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_ascii_lowercase()
}

#[derive(Debug, Default)]
struct Declared {
    items: HashSet<String, IdentifierHasher>,
    fluids: HashSet<String, IdentifierHasher>,
    categories: HashMap<String, BTreeSet<String>, IdentifierHasher>,
}

/// An in-memory [`Directory`] fed by `declare` commands.
///
/// This stands in for the host's own registries; nothing here is persisted,
/// the host is expected to declare its resources anew on every start.
#[derive(Debug, Default)]
pub struct DeclaredDirectory {
    declared: Mutex<Declared>,
}

impl DeclaredDirectory {
    pub fn new() -> Self {
        Self::default()
    }
    fn declared(&self) -> std::sync::MutexGuard<'_, Declared> {
        self.declared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    /// Declares an item identifier, reporting whether it was already known.
    pub fn declare_item(&self, id: &str) -> bool {
        !self.declared().items.insert(normalize_identifier(id))
    }
    pub fn declare_fluid(&self, id: &str) -> bool {
        !self.declared().fluids.insert(normalize_identifier(id))
    }
    /// Declares a category and extends its membership with the given item
    /// identifiers, reporting whether the category was already known.
    pub fn declare_category(&self, name: &str, members: &[String]) -> bool {
        let mut declared = self.declared();
        let previously_known = declared.categories.contains_key(&normalize_identifier(name));
        let membership = declared.categories.entry(normalize_identifier(name)).or_default();
        for member in members {
            membership.insert(normalize_identifier(member));
        }
        previously_known
    }
    pub fn len(&self) -> usize {
        let declared = self.declared();
        declared.items.len() + declared.fluids.len() + declared.categories.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for DeclaredDirectory {
    fn canonicalize(&self, stack: &Stack) -> Option<Stack> {
        let identifier = normalize_identifier(stack.identifier());
        if identifier.is_empty() {
            return None;
        }
        let declared = self.declared();
        let known = match stack {
            Stack::Item { .. } => declared.items.contains(&identifier),
            Stack::Fluid { .. } => declared.fluids.contains(&identifier),
            Stack::Category { .. } => declared.categories.contains_key(&identifier),
        };
        if !known {
            return None;
        }
        let canonical = match stack {
            Stack::Item { variant, count, .. } => {
                Stack::Item { id: identifier, variant: *variant, count: *count }
            }
            Stack::Fluid { volume, .. } => Stack::Fluid { id: identifier, volume: *volume },
            Stack::Category { count, .. } => Stack::Category { name: identifier, count: *count },
        };
        Some(canonical)
    }
    fn category_members(&self, name: &str) -> Vec<Stack> {
        match self.declared().categories.get(&normalize_identifier(name)) {
            Some(membership) => membership.iter().map(Stack::item).collect(),
            None => Vec::new(),
        }
    }
}
