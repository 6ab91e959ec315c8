use super::{ParamKind, ParameterBackend};
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// In-memory parameter service for tests; records every write
pub struct InMemoryParameterBackend {
    entries: RwLock<HashMap<String, (String, ParamKind)>>,
    writes: RwLock<Vec<String>>,
    read_failure: RwLock<Option<String>>,
}

impl InMemoryParameterBackend {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            writes: RwLock::new(Vec::new()),
            read_failure: RwLock::new(None),
        }
    }

    /// Insert an entry without recording it as a pipeline write
    pub fn seed(&self, path: &str, value: &str, kind: ParamKind) {
        self.entries
            .write()
            .unwrap()
            .insert(path.to_string(), (value.to_string(), kind));
    }

    pub fn value_of(&self, path: &str) -> Option<String> {
        self.entries.read().unwrap().get(path).map(|(v, _)| v.clone())
    }

    pub fn kind_of(&self, path: &str) -> Option<ParamKind> {
        self.entries.read().unwrap().get(path).map(|(_, k)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Paths written through `put_parameter`, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.read().unwrap().clone()
    }

    /// Make every subsequent read fail with `message`
    pub fn fail_reads(&self, message: &str) {
        *self.read_failure.write().unwrap() = Some(message.to_string());
    }
}

impl Default for InMemoryParameterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterBackend for InMemoryParameterBackend {
    fn get_parameter(&self, path: &str) -> Result<Option<String>> {
        if let Some(message) = self.read_failure.read().unwrap().as_ref() {
            anyhow::bail!("{}", message);
        }

        Ok(self.value_of(path))
    }

    fn put_parameter(
        &self,
        path: &str,
        value: &str,
        kind: ParamKind,
        _description: Option<&str>,
    ) -> Result<()> {
        self.seed(path, value, kind);
        self.writes.write().unwrap().push(path.to_string());
        Ok(())
    }

    fn list_parameters(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let scope = format!("{}/", prefix.trim_end_matches('/'));

        Ok(self
            .entries
            .read()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(&scope))
            .cloned()
            .collect())
    }
}
