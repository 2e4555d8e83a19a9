use std::collections::HashMap;
use std::sync::Arc;

use super::{Client, ProviderKind};

/// The OAuth clients the portal was configured with. A provider without credentials
/// is simply absent, so its login entry point answers 404.
#[derive(Clone, Default)]
pub struct Registry {
    clients: HashMap<ProviderKind, Arc<Client>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, client: Client) -> Self {
        self.clients.insert(client.kind(), Arc::new(client));
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<Client>> {
        self.clients.get(&kind).cloned()
    }
}
