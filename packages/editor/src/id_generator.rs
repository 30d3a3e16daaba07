use chrono::Utc;
use crc32fast::Hasher;
use std::collections::HashSet;

/// Derive a short, stable seed from an arbitrary label using CRC32
pub fn get_session_seed(label: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for blocks created during one editing session
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Session ID (CRC32)
    count: u64,   // Sequential counter
}

impl IdGenerator {
    pub fn new(label: &str) -> Self {
        Self {
            seed: get_session_seed(label),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Seed from the current wall-clock time so ids differ across sessions
    pub fn for_session() -> Self {
        let now = Utc::now();
        Self::new(&format!(
            "{}-{}",
            now.timestamp_millis(),
            now.timestamp_subsec_nanos()
        ))
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Generate an ID that is not in `taken`, and reserve it
    pub fn fresh_id(&mut self, taken: &mut HashSet<String>) -> String {
        loop {
            let id = self.new_id();
            if taken.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Get session seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::for_session()
    }
}
