//! Issuance of unique task codes.
//!
//! The generator keeps a registry of issued codes plus the codes reserved by
//! creations that have not been persisted yet. Sampling a candidate and
//! reserving it happen under one lock, so two concurrent callers can never
//! hold the same code.

use crate::task::domain::{CODE_LENGTH, CODE_SEPARATOR, TaskCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Default number of candidates sampled before giving up.
pub const MAX_GENERATION_ATTEMPTS: u32 = 1000;

/// Errors returned while generating task codes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodeGenerationError {
    /// Every sampled candidate was already taken.
    #[error("unable to generate a unique task code after {attempts} attempts")]
    Exhausted {
        /// Number of candidates sampled.
        attempts: u32,
    },
}

/// Thread-safe generator of `AA-00-xxxx` task codes.
#[derive(Debug)]
pub struct CodeGenerator {
    max_attempts: u32,
    registry: Mutex<CodeRegistry>,
}

#[derive(Debug)]
struct CodeRegistry {
    rng: StdRng,
    issued: HashSet<TaskCode>,
    reserved: HashSet<TaskCode>,
}

impl CodeGenerator {
    /// Creates a generator seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates a generator with a fixed seed, yielding a reproducible
    /// candidate sequence.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            max_attempts: MAX_GENERATION_ATTEMPTS,
            registry: Mutex::new(CodeRegistry {
                rng,
                issued: HashSet::new(),
                reserved: HashSet::new(),
            }),
        }
    }

    /// Sets how many candidates are sampled before generation fails.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn registry(&self) -> MutexGuard<'_, CodeRegistry> {
        // The registry holds plain sets, so state left by a panicking holder
        // is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Samples a code that is neither issued nor reserved, and reserves it.
    ///
    /// The reservation is held until [`register`](Self::register) or
    /// [`release`](Self::release) is called for the code.
    ///
    /// # Errors
    ///
    /// Returns [`CodeGenerationError::Exhausted`] when no free candidate is
    /// found within the attempt budget.
    pub fn generate(&self) -> Result<TaskCode, CodeGenerationError> {
        let mut registry = self.registry();
        for _ in 0..self.max_attempts {
            let candidate = sample_code(&mut registry.rng);
            if registry.issued.contains(&candidate) || registry.reserved.contains(&candidate) {
                continue;
            }
            registry.reserved.insert(candidate.clone());
            return Ok(candidate);
        }
        tracing::warn!(attempts = self.max_attempts, "task code space exhausted");
        Err(CodeGenerationError::Exhausted {
            attempts: self.max_attempts,
        })
    }

    /// Generates a code wrapped in a guard that releases it unless committed.
    ///
    /// # Errors
    ///
    /// Returns [`CodeGenerationError::Exhausted`] when generation fails.
    pub fn reserve(&self) -> Result<CodeReservation<'_>, CodeGenerationError> {
        let code = self.generate()?;
        Ok(CodeReservation {
            generator: self,
            code,
            committed: false,
        })
    }

    /// Returns `true` when `code` matches the `AA-00-xxxx` layout.
    #[must_use]
    pub fn validate_format(code: &str) -> bool {
        code.len() == CODE_LENGTH && TaskCode::is_well_formed(code)
    }

    /// Returns `true` when `code` has been issued.
    #[must_use]
    pub fn exists(&self, code: &str) -> bool {
        self.registry().issued.contains(code)
    }

    /// Records `code` as issued. Malformed codes are ignored.
    pub fn register(&self, code: &str) {
        let Ok(parsed) = TaskCode::parse(code) else {
            return;
        };
        let mut registry = self.registry();
        registry.reserved.remove(&parsed);
        registry.issued.insert(parsed);
    }

    /// Records every code in `codes` as issued.
    pub fn register_all<'a>(&self, codes: impl IntoIterator<Item = &'a TaskCode>) {
        let mut registry = self.registry();
        for code in codes {
            registry.reserved.remove(code);
            registry.issued.insert(code.clone());
        }
    }

    /// Drops a pending reservation without issuing the code.
    pub fn release(&self, code: &TaskCode) {
        self.registry().reserved.remove(code);
    }

    /// Returns the issued codes in ascending order.
    #[must_use]
    pub fn issued_codes(&self) -> Vec<TaskCode> {
        let mut codes: Vec<TaskCode> = self.registry().issued.iter().cloned().collect();
        codes.sort();
        codes
    }

    /// Forgets every issued and reserved code.
    pub fn clear(&self) {
        let mut registry = self.registry();
        registry.issued.clear();
        registry.reserved.clear();
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A reserved code that is released on drop unless committed.
#[derive(Debug)]
#[must_use = "dropping a reservation releases the code"]
pub struct CodeReservation<'a> {
    generator: &'a CodeGenerator,
    code: TaskCode,
    committed: bool,
}

impl CodeReservation<'_> {
    /// Returns the reserved code.
    #[must_use]
    pub const fn code(&self) -> &TaskCode {
        &self.code
    }

    /// Marks the code as issued.
    pub fn commit(mut self) {
        self.generator.register(self.code.as_str());
        self.committed = true;
    }
}

impl Drop for CodeReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.generator.release(&self.code);
        }
    }
}

fn sample_code(rng: &mut StdRng) -> TaskCode {
    let mut code = String::with_capacity(CODE_LENGTH);
    for _ in 0..2 {
        code.push(char::from(b'A' + rng.gen_range(0..26_u8)));
    }
    code.push(CODE_SEPARATOR);
    for _ in 0..2 {
        code.push(char::from(b'0' + rng.gen_range(0..10_u8)));
    }
    code.push(CODE_SEPARATOR);
    for _ in 0..4 {
        code.push(lowercase_alphanumeric(rng.gen_range(0..36_u8)));
    }
    TaskCode::from_generated(code)
}

const fn lowercase_alphanumeric(index: u8) -> char {
    if index < 10 {
        (b'0' + index) as char
    } else {
        (b'a' + index - 10) as char
    }
}
