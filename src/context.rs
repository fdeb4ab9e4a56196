use std::sync::{Arc, PoisonError, RwLock};

use crate::config::AppConfig;
use crate::domain::derivation::DerivationEngine;
use crate::services::TicketStore;

/// Shared handle to the active engine. Readers take a snapshot `Arc`; a
/// reconfiguration replaces the whole engine, never edits it in place.
#[derive(Clone)]
pub struct EngineHandle {
    current: Arc<RwLock<Arc<DerivationEngine>>>,
}

impl EngineHandle {
    pub fn new(engine: DerivationEngine) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    pub fn snapshot(&self) -> Arc<DerivationEngine> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn replace(&self, engine: DerivationEngine) -> Arc<DerivationEngine> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(engine))
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub engine: EngineHandle,
    pub store: Arc<dyn TicketStore>,
}

impl AppContext {
    pub fn new(config: AppConfig, store: Arc<dyn TicketStore>) -> Self {
        let engine = EngineHandle::new(config.engine());
        Self {
            config,
            engine,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{CategoryRule, RuleTable};
    use crate::domain::urgency::UrgencyClassifier;

    #[test]
    fn replace_swaps_whole_engine() {
        let handle = EngineHandle::new(DerivationEngine::builtin());
        let before = handle.snapshot();

        let rules = RuleTable::from_rules(vec![CategoryRule::new("Rural", "Prodesal", 12, "UDEL")])
            .unwrap();
        let previous = handle.replace(DerivationEngine::new(rules, UrgencyClassifier::builtin()));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.lookup_rule("Rural").unit, "PDTI");
        assert_eq!(handle.snapshot().lookup_rule("Rural").unit, "Prodesal");
    }

    #[test]
    fn concurrent_readers_see_consistent_results() {
        let handle = EngineHandle::new(DerivationEngine::builtin());
        let workers = (0..8)
            .map(|_| {
                let handle = handle.clone();
                std::thread::spawn(move || {
                    (0..200)
                        .map(|_| handle.snapshot().derive("Seguridad", Some("ruido")))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        for worker in workers {
            let results = worker.join().unwrap();
            assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        }
    }
}
