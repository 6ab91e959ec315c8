use super::{ControlPlaneError, CredentialControlPlane, ProviderKind, SecretMaterial};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredProvider {
    pub provider_ref: String,
    pub material: SecretMaterial,
}

/// In-memory control plane for tests
pub struct InMemoryControlPlane {
    providers: Mutex<HashMap<(ProviderKind, String), StoredProvider>>,
    created: Mutex<usize>,
    updated: Mutex<usize>,
    reject_with: Mutex<Option<String>>,
    race_next_create: Mutex<bool>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(HashMap::new()),
            created: Mutex::new(0),
            updated: Mutex::new(0),
            reject_with: Mutex::new(None),
            race_next_create: Mutex::new(false),
        }
    }

    pub fn provider(&self, kind: ProviderKind, name: &str) -> Option<StoredProvider> {
        self.providers
            .lock()
            .unwrap()
            .get(&(kind, name.to_string()))
            .cloned()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.lock().unwrap().len()
    }

    pub fn create_calls(&self) -> usize {
        *self.created.lock().unwrap()
    }

    pub fn update_calls(&self) -> usize {
        *self.updated.lock().unwrap()
    }

    /// Reject every create and update with `message`
    pub fn reject_writes(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    /// Let another writer create the provider between our lookup and our create
    pub fn race_next_create(&self) {
        *self.race_next_create.lock().unwrap() = true;
    }

    fn reference(kind: ProviderKind, name: &str) -> String {
        let segment = match kind {
            ProviderKind::ApiKey => "apikeycredentialprovider",
            ProviderKind::OAuth => "oauth2credentialprovider",
        };
        format!(
            "arn:aws:bedrock-agentcore:us-east-1:123456789012:token-vault/default/{}/{}",
            segment, name
        )
    }

    fn check_rejection(&self) -> Result<(), ControlPlaneError> {
        match self.reject_with.lock().unwrap().as_ref() {
            Some(message) => Err(ControlPlaneError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialControlPlane for InMemoryControlPlane {
    fn find_provider(
        &self,
        kind: ProviderKind,
        name: &str,
    ) -> Result<Option<String>, ControlPlaneError> {
        Ok(self.provider(kind, name).map(|p| p.provider_ref))
    }

    fn create_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<String, ControlPlaneError> {
        self.check_rejection()?;
        let kind = material.kind();
        let provider = StoredProvider {
            provider_ref: Self::reference(kind, name),
            material: material.clone(),
        };

        let mut raced = self.race_next_create.lock().unwrap();
        let mut providers = self.providers.lock().unwrap();
        if *raced {
            *raced = false;
            providers.insert((kind, name.to_string()), provider);
            return Err(ControlPlaneError::Conflict(format!(
                "credential provider {} already exists",
                name
            )));
        }

        if providers.contains_key(&(kind, name.to_string())) {
            return Err(ControlPlaneError::Conflict(format!(
                "credential provider {} already exists",
                name
            )));
        }

        *self.created.lock().unwrap() += 1;
        let provider_ref = provider.provider_ref.clone();
        providers.insert((kind, name.to_string()), provider);
        Ok(provider_ref)
    }

    fn update_provider(
        &self,
        name: &str,
        material: &SecretMaterial,
    ) -> Result<(), ControlPlaneError> {
        self.check_rejection()?;
        let mut providers = self.providers.lock().unwrap();
        let stored = providers
            .get_mut(&(material.kind(), name.to_string()))
            .ok_or_else(|| ControlPlaneError::Rejected(format!("{} not found", name)))?;

        stored.material = material.clone();
        *self.updated.lock().unwrap() += 1;
        Ok(())
    }
}
