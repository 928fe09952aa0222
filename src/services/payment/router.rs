// src/services/payment/router.rs

use std::{collections::BTreeMap, sync::Arc};

use super::{GatewayProvider, ManualPixProvider, PaymentProvider};
use crate::{
    common::{error::AppError, money::Money},
    config::settings::PaymentSettings,
    models::payment::{is_manual_payment_id, PaymentRef, ProviderKind},
};

/// Registro dos provedores habilitados, montado uma vez na inicialização.
///
/// A chave `ProviderKind` ordena por prioridade: o ativo é sempre o primeiro
/// (PIX manual quando habilitado).
#[derive(Clone)]
pub struct PaymentRouter {
    providers: BTreeMap<ProviderKind, Arc<dyn PaymentProvider>>,
    active: Arc<dyn PaymentProvider>,
}

impl std::fmt::Debug for PaymentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRouter")
            .field("enabled", &self.enabled())
            .finish()
    }
}

impl PaymentRouter {
    pub fn new(providers: Vec<Arc<dyn PaymentProvider>>) -> Result<Self, AppError> {
        let providers: BTreeMap<_, _> = providers.into_iter().map(|p| (p.kind(), p)).collect();
        let active = providers
            .values()
            .next()
            .cloned()
            .ok_or(AppError::NoProviderAvailable)?;
        Ok(Self { providers, active })
    }

    pub fn from_settings(settings: &PaymentSettings) -> Result<Self, AppError> {
        let mut providers: Vec<Arc<dyn PaymentProvider>> = Vec::new();
        if settings.manual_pix_enabled {
            providers.push(Arc::new(ManualPixProvider));
        }
        for gateway in &settings.gateways {
            providers.push(Arc::new(GatewayProvider::new(gateway, settings.timeout)?));
        }

        let router = Self::new(providers)?;
        tracing::info!(
            active = %router.active_kind(),
            enabled = ?router.enabled(),
            manual = router.active_requires_manual_confirmation(),
            "Provedores de pagamento carregados"
        );
        Ok(router)
    }

    pub fn active_kind(&self) -> ProviderKind {
        self.active.kind()
    }

    pub fn enabled(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }

    pub fn active_requires_manual_confirmation(&self) -> bool {
        self.active.requires_manual_confirmation()
    }

    pub async fn create_payment(&self, amount: Money, destination_key: &str) -> Result<PaymentRef, AppError> {
        let provider = &self.active;
        let payment_id = provider.create_payment(amount, destination_key).await?;
        Ok(PaymentRef { provider: provider.kind(), payment_id })
    }

    /// IDs `PIX_` nunca saem para a rede: aguardam a aprovação humana.
    pub async fn confirm_payment(&self, payment_id: &str) -> Result<bool, AppError> {
        if is_manual_payment_id(payment_id) {
            return Ok(false);
        }
        self.active.confirm_payment(payment_id).await
    }

    /// Consulta o provedor que criou o pagamento, e não o ativo.
    pub async fn confirm_payment_via(&self, provider: ProviderKind, payment_id: &str) -> Result<bool, AppError> {
        if is_manual_payment_id(payment_id) {
            return Ok(false);
        }
        let provider = self.providers.get(&provider).ok_or_else(|| {
            tracing::warn!(%provider, %payment_id, "Provedor da venda não está mais habilitado");
            AppError::NoProviderAvailable
        })?;
        provider.confirm_payment(payment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGateway {
        kind: ProviderKind,
        confirms: AtomicUsize,
        answer: bool,
    }

    impl FakeGateway {
        fn new(kind: ProviderKind, answer: bool) -> Arc<Self> {
            Arc::new(Self { kind, confirms: AtomicUsize::new(0), answer })
        }
    }

    #[async_trait]
    impl PaymentProvider for FakeGateway {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn requires_manual_confirmation(&self) -> bool {
            false
        }

        async fn create_payment(&self, _amount: Money, _destination_key: &str) -> Result<String, AppError> {
            Ok(format!("{}-123", self.kind.env_key()))
        }

        async fn confirm_payment(&self, _payment_id: &str) -> Result<bool, AppError> {
            self.confirms.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(matches!(PaymentRouter::new(vec![]), Err(AppError::NoProviderAvailable)));
    }

    #[tokio::test]
    async fn manual_pix_wins_when_enabled() {
        let stripe = FakeGateway::new(ProviderKind::Stripe, true);
        let providers: Vec<Arc<dyn PaymentProvider>> = vec![stripe, Arc::new(ManualPixProvider)];
        let router = PaymentRouter::new(providers).unwrap();

        assert_eq!(router.active_kind(), ProviderKind::ManualPix);
        assert!(router.active_requires_manual_confirmation());
        let payment = router.create_payment(Money::from_cents(2500), "chave").await.unwrap();
        assert!(payment.is_manual());
        assert_eq!(payment.provider, ProviderKind::ManualPix);
    }

    #[tokio::test]
    async fn first_gateway_by_priority_is_active_without_pix() {
        let stripe = FakeGateway::new(ProviderKind::Stripe, true);
        let mp = FakeGateway::new(ProviderKind::MercadoPago, true);
        let providers: Vec<Arc<dyn PaymentProvider>> = vec![stripe, mp];
        let router = PaymentRouter::new(providers).unwrap();

        assert_eq!(router.active_kind(), ProviderKind::MercadoPago);
        assert_eq!(router.enabled(), vec![ProviderKind::MercadoPago, ProviderKind::Stripe]);
        let payment = router.create_payment(Money::from_cents(100), "chave").await.unwrap();
        assert_eq!(payment.payment_id, "MERCADOPAGO-123");
    }

    #[tokio::test]
    async fn pix_ids_never_reach_a_gateway() {
        let mp = FakeGateway::new(ProviderKind::MercadoPago, true);
        let providers: Vec<Arc<dyn PaymentProvider>> = vec![mp.clone()];
        let router = PaymentRouter::new(providers).unwrap();

        assert!(!router.confirm_payment("PIX_abc").await.unwrap());
        assert!(!router.confirm_payment_via(ProviderKind::MercadoPago, "PIX_abc").await.unwrap());
        assert_eq!(mp.confirms.load(Ordering::SeqCst), 0);

        assert!(router.confirm_payment("123").await.unwrap());
        assert_eq!(mp.confirms.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn confirmation_goes_to_the_creating_provider() {
        let mp = FakeGateway::new(ProviderKind::MercadoPago, false);
        let stripe = FakeGateway::new(ProviderKind::Stripe, true);
        let providers: Vec<Arc<dyn PaymentProvider>> = vec![mp.clone(), stripe.clone()];
        let router = PaymentRouter::new(providers).unwrap();

        assert!(router.confirm_payment_via(ProviderKind::Stripe, "pi_1").await.unwrap());
        assert_eq!(stripe.confirms.load(Ordering::SeqCst), 1);
        assert_eq!(mp.confirms.load(Ordering::SeqCst), 0);

        let err = router.confirm_payment_via(ProviderKind::PayPal, "ORDER-1").await.unwrap_err();
        assert!(matches!(err, AppError::NoProviderAvailable));
    }

    #[test]
    fn settings_without_providers_fail() {
        let settings = PaymentSettings {
            manual_pix_enabled: false,
            gateways: vec![],
            timeout: std::time::Duration::from_secs(1),
        };
        assert!(matches!(PaymentRouter::from_settings(&settings), Err(AppError::NoProviderAvailable)));
    }
}
