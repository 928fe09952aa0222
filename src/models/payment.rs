// src/models/payment.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prefixo dos IDs gerados pelo PIX manual. Qualquer ID com este prefixo só
/// pode ser confirmado por uma pessoa, independente do provedor ativo.
pub const MANUAL_PIX_PREFIX: &str = "PIX_";

pub fn is_manual_payment_id(payment_id: &str) -> bool {
    payment_id.starts_with(MANUAL_PIX_PREFIX)
}

/// Provedores conhecidos. A ordem de declaração é a ordem de prioridade na
/// escolha do provedor ativo.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "provider_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    ManualPix,
    MercadoPago,
    PayPal,
    Stripe,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::ManualPix,
        ProviderKind::MercadoPago,
        ProviderKind::PayPal,
        ProviderKind::Stripe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::ManualPix => "PIXDefault",
            ProviderKind::MercadoPago => "MercadoPago",
            ProviderKind::PayPal => "PayPal",
            ProviderKind::Stripe => "Stripe",
        }
    }

    /// Prefixo das variáveis de ambiente (`PAYMENT_<X>_ENABLED`, ...).
    pub fn env_key(self) -> &'static str {
        match self {
            ProviderKind::ManualPix => "PIX",
            ProviderKind::MercadoPago => "MERCADOPAGO",
            ProviderKind::PayPal => "PAYPAL",
            ProviderKind::Stripe => "STRIPE",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resultado de `create_payment`: quem criou e o ID de correlação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRef {
    pub provider: ProviderKind,
    pub payment_id: String,
}

impl PaymentRef {
    pub fn is_manual(&self) -> bool {
        is_manual_payment_id(&self.payment_id)
    }
}
