//! Bounded recency cache of generated questions
//!
//! Used to notice when a backend repeats itself. A hit is informational
//! only; the question is still handed to the caller.

use crate::config::CacheSettings;
use crate::question::Question;
use chrono::{DateTime, TimeDelta, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Normalized cache key for a question text
pub fn cache_key(question_text: &str) -> String {
    question_text.trim().to_lowercase()
}

/// One remembered question
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCacheEntry {
    pub question: Question,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
}

/// Result of recording a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// First time this question text was seen
    Inserted,
    /// Seen before; `access_count` includes this sighting
    Duplicate { access_count: u32 },
}

impl CacheOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CacheOutcome::Duplicate { .. })
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub duplicates: u64,
    pub evictions: u64,
    pub expired: u64,
}

struct CacheInner {
    entries: LruCache<String, QuestionCacheEntry>,
    duplicates: u64,
    evictions: u64,
    expired: u64,
}

impl CacheInner {
    fn prune_expired(&mut self, now: DateTime<Utc>, ttl: Option<TimeDelta>) {
        let Some(ttl) = ttl else {
            return;
        };

        // Expiry follows creation time, which LRU order does not track
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| now - entry.created_at > ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            self.entries.pop(&key);
            self.expired += 1;
        }
    }
}

/// LRU cache keyed by normalized question text, with optional TTL
pub struct DuplicateCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Option<TimeDelta>,
}

impl DuplicateCache {
    /// Create a cache holding at most `capacity` questions
    ///
    /// A capacity of zero disables remembering entirely.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(cap),
                duplicates: 0,
                evictions: 0,
                expired: 0,
            }),
            capacity,
            ttl: ttl.and_then(|t| TimeDelta::from_std(t).ok()),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity, settings.ttl())
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a generated question, reporting whether it was seen before
    pub fn record(&self, question: &Question) -> CacheOutcome {
        self.record_at(question, Utc::now())
    }

    fn record_at(&self, question: &Question, now: DateTime<Utc>) -> CacheOutcome {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.prune_expired(now, self.ttl);

        let key = cache_key(&question.question_text);
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.last_accessed = now;
            entry.access_count += 1;
            inner.duplicates += 1;
            return CacheOutcome::Duplicate {
                access_count: entry.access_count,
            };
        }

        if self.capacity == 0 {
            return CacheOutcome::Inserted;
        }

        let entry = QuestionCacheEntry {
            question: question.clone(),
            created_at: now,
            last_accessed: now,
            access_count: 1,
        };
        // The key is new, so a returned pair is the evicted LRU entry
        if inner.entries.push(key, entry).is_some() {
            inner.evictions += 1;
        }
        CacheOutcome::Inserted
    }

    /// Whether a question text is currently remembered
    pub fn contains(&self, question_text: &str) -> bool {
        self.get(question_text).is_some()
    }

    /// Look up an entry without touching its recency
    pub fn get(&self, question_text: &str) -> Option<QuestionCacheEntry> {
        let mut inner = self.lock();
        inner.prune_expired(Utc::now(), self.ttl);
        inner.entries.peek(&cache_key(question_text)).cloned()
    }

    /// Entries seen most often, most frequent first
    pub fn most_accessed(&self, limit: usize) -> Vec<QuestionCacheEntry> {
        let inner = self.lock();
        let mut entries: Vec<_> = inner.entries.iter().map(|(_, e)| e.clone()).collect();
        entries.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then(b.last_accessed.cmp(&a.last_accessed))
        });
        entries.truncate(limit);
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            duplicates: inner.duplicates,
            evictions: inner.evictions,
            expired: inner.expired,
        }
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.duplicates = 0;
        inner.evictions = 0;
        inner.expired = 0;
    }
}
