// src/services/payment/manual_pix.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::PaymentProvider;
use crate::{
    common::{error::AppError, money::Money},
    models::payment::{ProviderKind, MANUAL_PIX_PREFIX},
};

/// PIX para a chave do administrador, conferido manualmente pelo financeiro.
#[derive(Debug, Clone, Default)]
pub struct ManualPixProvider;

#[async_trait]
impl PaymentProvider for ManualPixProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ManualPix
    }

    fn requires_manual_confirmation(&self) -> bool {
        true
    }

    async fn create_payment(&self, amount: Money, destination_key: &str) -> Result<String, AppError> {
        let payment_id = format!("{}{}", MANUAL_PIX_PREFIX, Uuid::new_v4());
        tracing::info!(%payment_id, %amount, destination = %destination_key, "Pagamento PIX manual criado");
        Ok(payment_id)
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<bool, AppError> {
        tracing::debug!(%payment_id, "PIX manual aguarda confirmação do financeiro");
        Ok(false)
    }
}
