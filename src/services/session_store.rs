// src/services/session_store.rs

//! Sessões da vitrine, uma por comprador.
//!
//! Cada sessão tem o próprio `Mutex`: duas mensagens do mesmo comprador são
//! processadas em ordem, e compradores diferentes nunca esperam um pelo outro.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tokio::{sync::Mutex, task::JoinHandle};

#[derive(Debug)]
pub struct Session<S> {
    pub state: S,
    last_seen: Instant,
}

impl<S> Session<S> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() > ttl
    }
}

pub type SessionGuard<S> = tokio::sync::OwnedMutexGuard<Session<S>>;

pub struct SessionStore<S> {
    sessions: DashMap<String, Arc<Mutex<Session<S>>>>,
    ttl: Duration,
}

impl<S> SessionStore<S>
where
    S: Default + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: DashMap::new(), ttl }
    }

    /// Trava a sessão do comprador, criando-a (ou reiniciando, se expirou).
    pub async fn lock(&self, key: &str) -> SessionGuard<S> {
        loop {
            // A referência do DashMap não pode atravessar o `.await`
            let slot = self
                .sessions
                .entry(key.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(Session { state: S::default(), last_seen: Instant::now() }))
                })
                .clone();

            let mut session = slot.clone().lock_owned().await;

            // A entrada pode ter sido removida enquanto esperávamos o lock
            let still_mapped = self
                .sessions
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &slot));
            if !still_mapped {
                continue;
            }

            if session.is_expired(self.ttl) {
                tracing::debug!(buyer = %key, "Sessão expirada; reiniciando");
                session.state = S::default();
            }
            session.last_seen = Instant::now();
            return session;
        }
    }

    /// Remove sessões ociosas há mais que o TTL. Sessões em uso, ou que
    /// alguém já pegou para travar, ficam.
    pub fn sweep(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => !session.is_expired(ttl),
                Err(_) => true,
            }
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = self.len(), "Sessões expiradas removidas");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    enum Step {
        #[default]
        Idle,
        Shopping(u32),
    }

    #[tokio::test]
    async fn sessions_are_independent_per_buyer() {
        let store: SessionStore<Step> = SessionStore::new(Duration::from_secs(60));
        {
            let mut a = store.lock("a").await;
            a.state = Step::Shopping(1);
        }
        assert_eq!(store.lock("b").await.state, Step::Idle);
        assert_eq!(store.lock("a").await.state, Step::Shopping(1));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn same_buyer_is_serialized() {
        let store: Arc<SessionStore<Step>> = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let guard = store.lock("a").await;

        let other = store.clone();
        let waiter = tokio::spawn(async move { other.lock("a").await.state.clone() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // outro comprador não espera
        let _b = store.lock("b").await;

        drop(guard);
        assert_eq!(waiter.await.unwrap(), Step::Idle);
    }

    #[tokio::test]
    async fn expired_sessions_restart_and_are_swept() {
        let store: SessionStore<Step> = SessionStore::new(Duration::from_millis(20));
        store.lock("a").await.state = Step::Shopping(7);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.lock("a").await.state, Step::Idle);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweep_keeps_sessions_in_use() {
        let store: SessionStore<Step> = SessionStore::new(Duration::from_millis(10));
        let _held = store.lock("a").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sweep_keeps_sessions_about_to_be_locked() {
        let store: SessionStore<Step> = SessionStore::new(Duration::from_millis(10));
        store.lock("a").await.state = Step::Shopping(2);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // mesmo passo de `lock`: slot clonado, lock ainda não obtido
        let pending = store.sessions.get("a").unwrap().value().clone();
        assert_eq!(store.sweep(), 0);
        assert_eq!(store.len(), 1);

        drop(pending);
        assert_eq!(store.sweep(), 1);
    }

    #[tokio::test]
    async fn lock_moves_to_the_mapped_slot_when_its_entry_vanishes() {
        let store: Arc<SessionStore<Step>> = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let guard = store.lock("a").await;

        let other = store.clone();
        let waiter = tokio::spawn(async move { other.lock("a").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.sessions.remove("a");
        drop(guard);

        let held = waiter.await.unwrap();
        assert_eq!(store.len(), 1);
        // o guard devolvido é o da entrada atual do mapa
        assert!(store.sessions.get("a").unwrap().try_lock().is_err());
        drop(held);
        assert!(store.sessions.get("a").unwrap().try_lock().is_ok());
    }
}
