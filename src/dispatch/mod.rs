/*!
Function table exchange.

A function table is an ordered list of `(capability id, function)` entries
ending in a terminator. Producers build their tables statically; consumers
scan them up to the terminator, capture the entries they recognise into a
typed registry and skip everything else.
*/

pub mod ids;
pub mod provider;
pub mod upcalls;

use std::collections::HashSet;
use std::fmt;

use crate::error::TableError;

pub use provider::{ProviderDispatch, ProviderFunctions};
pub use upcalls::{CoreCapabilities, CoreDispatch, CoreHandle};

/// A list element that can mark the end of a list
pub trait Terminated {
    /// True for the terminator entry
    fn is_terminator(&self) -> bool;
}

/// Iterate the entries of a terminated list, stopping at the terminator
pub fn terminated<T: Terminated>(items: &[T]) -> impl Iterator<Item = &T> {
    items.iter().take_while(|item| !item.is_terminator())
}

/// One entry of a function table
pub trait DispatchEntry: Copy {
    /// Capability id of this entry (zero for the terminator)
    fn function_id(&self) -> u32;

    /// True for the terminator entry
    fn is_end(&self) -> bool {
        self.function_id() == ids::END
    }
}

/// Whether an `Unknown` entry's id lies outside its namespace.
///
/// `known` says whether the namespace assigns `id`. A colliding id would
/// shadow a real capability, and zero would end the scan early.
pub(crate) fn is_foreign_id(id: u32, known: bool) -> bool {
    id != ids::END && !known
}

/// Read-only view of a producer's function table
#[derive(Clone, Copy)]
pub struct FunctionTable<'a, E> {
    entries: &'a [E],
}

impl<'a, E> FunctionTable<'a, E> {
    /// Wrap a slice of entries
    pub const fn new(entries: &'a [E]) -> Self {
        Self { entries }
    }

    /// The raw entries, terminator included
    pub fn as_slice(&self) -> &'a [E] {
        self.entries
    }
}

impl<'a, E: DispatchEntry> FunctionTable<'a, E> {
    /// Entries up to (not including) the terminator
    pub fn entries(self) -> impl Iterator<Item = &'a E> {
        self.entries.iter().take_while(|entry| !entry.is_end())
    }

    /// Number of entries before the terminator
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// True if the table has no entries before the terminator
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a terminator is present
    pub fn is_terminated(&self) -> bool {
        self.entries.iter().any(|entry| entry.is_end())
    }

    /// First entry carrying the given id
    pub fn find(&self, id: u32) -> Option<&'a E> {
        if id == ids::END {
            return None;
        }
        self.entries().find(|entry| entry.function_id() == id)
    }

    /// Check that the table is terminated and has no duplicate ids
    pub fn validate(&self) -> Result<(), TableError> {
        if !self.is_terminated() {
            return Err(TableError::Unterminated);
        }

        let mut seen = HashSet::new();
        for entry in self.entries() {
            if !seen.insert(entry.function_id()) {
                return Err(TableError::DuplicateId(entry.function_id()));
            }
        }
        Ok(())
    }
}

impl<E: DispatchEntry> fmt::Debug for FunctionTable<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries().map(|entry| entry.function_id()))
            .finish()
    }
}

/// Outcome of scanning a table into a registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries matched to a known capability
    pub captured: usize,
    /// Entries with ids this side does not know
    pub ignored: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Entry(u32);

    impl DispatchEntry for Entry {
        fn function_id(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_scan_stops_at_terminator() {
        let raw = [Entry(1), Entry(2), Entry(0), Entry(3)];
        let table = FunctionTable::new(&raw);

        let seen: Vec<u32> = table.entries().map(|e| e.0).collect();
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(table.len(), 2);
        assert!(table.find(3).is_none());
        assert!(table.find(ids::END).is_none());
    }

    #[test]
    fn test_validate() {
        assert!(FunctionTable::new(&[Entry(1), Entry(2), Entry(0)]).validate().is_ok());
        assert_eq!(
            FunctionTable::new(&[Entry(1), Entry(2)]).validate(),
            Err(TableError::Unterminated)
        );
        assert_eq!(
            FunctionTable::new(&[Entry(1), Entry(1), Entry(0)]).validate(),
            Err(TableError::DuplicateId(1))
        );
        // duplicates past the terminator are never looked at
        assert!(FunctionTable::new(&[Entry(1), Entry(0), Entry(1)]).validate().is_ok());
    }

    #[test]
    fn test_foreign_ids() {
        assert!(is_foreign_id(4096, false));
        assert!(!is_foreign_id(11, true));
        assert!(!is_foreign_id(ids::END, false));
    }

    #[test]
    fn test_empty_table() {
        let table = FunctionTable::new(&[Entry(0)]);
        assert!(table.is_empty());
        assert!(table.is_terminated());
    }
}
