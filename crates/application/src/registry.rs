use rustc_hash::FxHashSet;
use std::sync::RwLock;
use tracing::debug;
use uwsgi_dns_domain::Fqdn;

/// The set of domains currently resolved to localhost.
///
/// Shared (behind `Arc`) between the subscription listener, the stats
/// poller, and every query worker. Writers hold the lock only for the
/// in-memory mutation; nothing network-bound ever happens under it, so a
/// burst of queries is never stalled by a slow poll cycle.
pub struct DomainRegistry {
    domains: RwLock<FxHashSet<Fqdn>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(FxHashSet::default()),
        }
    }

    /// Insert one domain. Idempotent: returns `false` when the domain was
    /// already present, without taking the write lock.
    pub fn add(&self, domain: &Fqdn) -> bool {
        {
            let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());
            if domains.contains(domain) {
                return false;
            }
        }

        let mut domains = self.domains.write().unwrap_or_else(|e| e.into_inner());
        let inserted = domains.insert(domain.clone());
        if inserted {
            debug!(domain = %domain, total = domains.len(), "Domain registered");
        }
        inserted
    }

    /// Swap the whole set. A replace with an equal set is a no-op and
    /// returns `false` so callers do not log churn on every poll.
    pub fn replace(&self, domains: FxHashSet<Fqdn>) -> bool {
        {
            let current = self.domains.read().unwrap_or_else(|e| e.into_inner());
            if *current == domains {
                return false;
            }
        }

        let mut current = self.domains.write().unwrap_or_else(|e| e.into_inner());
        debug!(
            before = current.len(),
            after = domains.len(),
            "Domain set replaced"
        );
        *current = domains;
        true
    }

    pub fn contains(&self, domain: &Fqdn) -> bool {
        self.domains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Fqdn> {
        self.domains
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
