//! Town registry: which stations are worth a message.

use std::collections::HashMap;

use crate::domain::Location;

/// What the registry knows about a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TownEntry<'a> {
    /// A station serving a named town
    Town(&'a str),
    /// A station listed without a town; gets a message with no town text
    NoTown,
}

/// Mapping from station key to town description.
///
/// Keys are CRS codes or, for locations without a code, TIPLOCs or
/// location names. Lookups ignore surrounding whitespace and case.
///
/// ```
/// use train_bot::domain::{Crs, Location};
/// use train_bot::messages::{TownEntry, TownRegistry};
///
/// let towns = TownRegistry::new([
///     ("CAK", Some("Cark-in-Cartmel")),
///     ("LPG", None),
/// ]);
///
/// let cark = Location::new("Cark", Some(Crs::parse("CAK").unwrap()));
/// assert_eq!(towns.lookup(&cark), Some(TownEntry::Town("Cark-in-Cartmel")));
///
/// let llan = Location::new("Llanfairpwll", Some(Crs::parse("LPG").unwrap()));
/// assert_eq!(towns.lookup(&llan), Some(TownEntry::NoTown));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TownRegistry {
    towns: HashMap<String, Option<String>>,
}

impl TownRegistry {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let towns = entries
            .into_iter()
            .map(|(key, town)| (normalize(key.as_ref()), town.map(Into::into)))
            .collect();
        Self { towns }
    }

    /// Registry entry for a location. A station with a CRS code is only
    /// matched by that code; other locations by TIPLOC, then by name.
    pub fn lookup(&self, location: &Location) -> Option<TownEntry<'_>> {
        match location.code() {
            Some(code) => self.lookup_key(code.as_str()),
            None => location
                .tiploc()
                .into_iter()
                .chain([location.name()])
                .find_map(|key| self.lookup_key(key)),
        }
    }

    /// Registry entry for a raw key.
    pub fn lookup_key(&self, key: &str) -> Option<TownEntry<'_>> {
        self.towns.get(&normalize(key)).map(|town| match town {
            Some(town) => TownEntry::Town(town.as_str()),
            None => TownEntry::NoTown,
        })
    }

    /// The description to use for a location in message text: its town
    /// when registered, else its own name.
    pub fn describe<'a>(&'a self, location: &'a Location) -> &'a str {
        match self.lookup(location) {
            Some(TownEntry::Town(town)) => town,
            _ => location.name(),
        }
    }

    pub fn len(&self) -> usize {
        self.towns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towns.is_empty()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_uppercase()
}
