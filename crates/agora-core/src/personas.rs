//! Persona directory: loads AI persona profiles from disk.
//!
//! Profiles are markdown files named `NNN_Name.md`; the body is the
//! persona's system prompt. Loading happens once at startup (and on
//! explicit reload); the resulting map is published atomically behind an
//! `RwLock<Arc<..>>` so concurrent readers always observe either the old
//! map or the fully-populated new one, never a partial state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use agora_types::persona::{Persona, parse_profile_filename};

/// Profiles shorter than this (trimmed) are skipped as not meaningful.
const MIN_PROFILE_LENGTH: usize = 10;

/// In-memory collection of loaded personas, keyed by display name.
pub struct PersonaDirectory {
    profiles_dir: PathBuf,
    personas: RwLock<Arc<HashMap<String, Persona>>>,
}

impl PersonaDirectory {
    /// Create an empty directory rooted at `profiles_dir`. Call
    /// [`reload`](Self::reload) to populate it.
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        PersonaDirectory {
            profiles_dir: profiles_dir.into(),
            personas: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Create and immediately load from `profiles_dir`.
    pub fn load(profiles_dir: impl Into<PathBuf>) -> Self {
        let dir = Self::new(profiles_dir);
        dir.reload();
        dir
    }

    /// Scan the profiles directory and publish a freshly built map,
    /// replacing the previous one in a single swap. Returns the number of
    /// personas loaded. Unreadable or too-short files are skipped with a
    /// warning, never fatal.
    pub fn reload(&self) -> usize {
        let fresh = scan_profiles(&self.profiles_dir);
        let count = fresh.len();
        *self
            .personas
            .write()
            .expect("persona directory lock poisoned") = Arc::new(fresh);
        tracing::info!(
            personas = count,
            dir = %self.profiles_dir.display(),
            "persona directory loaded"
        );
        count
    }

    /// A consistent snapshot of the current persona map.
    pub fn snapshot(&self) -> Arc<HashMap<String, Persona>> {
        Arc::clone(
            &self
                .personas
                .read()
                .expect("persona directory lock poisoned"),
        )
    }

    /// Look up a persona by display name.
    pub fn get(&self, name: &str) -> Option<Persona> {
        self.snapshot().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

/// Read every `*.md` profile under `dir` into a persona map.
fn scan_profiles(dir: &Path) -> HashMap<String, Persona> {
    let mut personas = HashMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "persona directory not readable");
            return personas;
        }
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some((name, user_id)) = parse_profile_filename(&file_name) else {
            continue;
        };

        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "skipping unreadable profile");
                continue;
            }
        };

        if content.trim().len() < MIN_PROFILE_LENGTH {
            tracing::warn!(file = %file_name, "skipping empty or too-short profile");
            continue;
        }

        // user_id uniqueness invariant: first file with an ordinal wins.
        if personas
            .values()
            .any(|p: &Persona| p.user_id == user_id)
        {
            tracing::warn!(file = %file_name, %user_id, "skipping profile with duplicate user id");
            continue;
        }

        tracing::debug!(persona = %name, %user_id, file = %file_name, "persona profile loaded");
        personas.insert(
            name.clone(),
            Persona {
                file_name,
                name,
                user_id,
                system_prompt: content,
            },
        );
    }

    personas
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
