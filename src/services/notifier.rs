// src/services/notifier.rs

//! Avisos para usuários (donos de apartamento e financeiro).
//!
//! O envio é "dispare e esqueça": falhas e ausência de ouvintes nunca
//! desfazem a operação que gerou o aviso.

use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 1024;

pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: Uuid, message: &str);

    fn notify_all(&self, user_ids: &[Uuid], message: &str) {
        for user_id in user_ids {
            self.notify(*user_id, message);
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Publica cada aviso num canal `broadcast`; o stream SSE de cada usuário
/// filtra os seus.
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Avisos destinados a `user_id`, a partir de agora. Receptores lentos
    /// perdem os avisos mais antigos em vez de travar quem publica.
    pub fn stream_for(&self, user_id: Uuid) -> impl Stream<Item = Notification> + Send + 'static + use<> {
        futures_util::stream::unfold(self.subscribe(), move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(n) if n.user_id == user_id => return Some((n, rx)),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user_id, skipped, "Stream de avisos atrasado; avisos descartados");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, user_id: Uuid, message: &str) {
        tracing::info!(%user_id, text = message, "Aviso enviado");
        let notification = Notification {
            user_id,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        // Erro aqui só significa que ninguém está ouvindo.
        let _ = self.sender.send(notification);
    }
}
