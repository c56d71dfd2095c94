//! [`Catalog`] – insertion-ordered, key-addressable store of drivers or
//! stimuli.
//!
//! Classification inserts entries in joint order; the simulation layer then
//! updates them in that same order every tick, and behaviors look them up by
//! their canonical identity key.

use std::collections::HashMap;

use crate::driver::Driver;
use crate::stimulus::Stimulus;

/// Ordered collection keyed by canonical identity string.
pub struct Catalog<T: ?Sized> {
    entries: Vec<(String, Box<T>)>,
    index: HashMap<String, usize>,
}

pub type DriverSet = Catalog<dyn Driver>;
pub type StimulusSet = Catalog<dyn Stimulus>;

impl<T: ?Sized> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: ?Sized> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`.  Returns `false` and leaves the catalog
    /// untouched when the key is already present.
    pub fn insert(&mut self, key: String, value: Box<T>) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| self.entries[i].1.as_ref())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => Some(self.entries[i].1.as_mut()),
            None => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v.as_mut()))
    }
}

impl Catalog<dyn Driver> {
    /// Insert a driver under its own identity key.
    pub fn add(&mut self, driver: Box<dyn Driver>) -> bool {
        let key = driver.id().key();
        self.insert(key, driver)
    }

    /// Run one update step on every driver in insertion order.
    pub fn update_all(&mut self, dt: f32) {
        for (_, driver) in self.entries.iter_mut() {
            driver.update(dt);
        }
    }

    /// Re-read preference subscriptions on every driver.
    pub fn sync_preferences(&mut self) {
        for (_, driver) in self.entries.iter_mut() {
            driver.sync_preferences();
        }
    }
}

impl Catalog<dyn Stimulus> {
    /// Insert a stimulus under its own identity key.
    pub fn add(&mut self, stimulus: Box<dyn Stimulus>) -> bool {
        let key = stimulus.id().key();
        self.insert(key, stimulus)
    }

    /// Sample every stimulus in insertion order.
    pub fn update_all(&mut self, dt: f32) {
        for (_, stimulus) in self.entries.iter_mut() {
            stimulus.update(dt);
        }
    }
}
