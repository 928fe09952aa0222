// src/services/payment.rs

//! Provedores de pagamento e o roteador que escolhe entre eles.

pub mod gateway;
pub mod manual_pix;
pub mod router;

use async_trait::async_trait;

use crate::{
    common::{error::AppError, money::Money},
    models::payment::ProviderKind,
};

pub use gateway::{GatewayFlavor, GatewayProvider};
pub use manual_pix::ManualPixProvider;
pub use router::PaymentRouter;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// `true` quando só uma pessoa pode confirmar o pagamento.
    fn requires_manual_confirmation(&self) -> bool;

    /// Cria a cobrança e devolve o ID de correlação do provedor.
    async fn create_payment(&self, amount: Money, destination_key: &str) -> Result<String, AppError>;

    /// `true` somente quando o provedor reporta o pagamento como concluído.
    async fn confirm_payment(&self, payment_id: &str) -> Result<bool, AppError>;
}
