// src/services/payment/gateway.rs

//! Gateways HTTP (Mercado Pago, PayPal, Stripe). Todos seguem o mesmo
//! contrato: POST cria a cobrança e devolve `id`; GET consulta `status`.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder};
use serde_json::{json, Value};

use super::PaymentProvider;
use crate::{
    common::{error::AppError, money::Money},
    config::settings::GatewaySettings,
    models::payment::ProviderKind,
};

const PURCHASE_DESCRIPTION: &str = "Compra na vitrine";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFlavor {
    MercadoPago,
    PayPal,
    Stripe,
}

impl GatewayFlavor {
    pub fn from_kind(kind: ProviderKind) -> Option<Self> {
        match kind {
            ProviderKind::MercadoPago => Some(GatewayFlavor::MercadoPago),
            ProviderKind::PayPal => Some(GatewayFlavor::PayPal),
            ProviderKind::Stripe => Some(GatewayFlavor::Stripe),
            ProviderKind::ManualPix => None,
        }
    }

    pub fn kind(self) -> ProviderKind {
        match self {
            GatewayFlavor::MercadoPago => ProviderKind::MercadoPago,
            GatewayFlavor::PayPal => ProviderKind::PayPal,
            GatewayFlavor::Stripe => ProviderKind::Stripe,
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            GatewayFlavor::MercadoPago => "https://api.mercadopago.com",
            GatewayFlavor::PayPal => "https://api.sandbox.paypal.com",
            GatewayFlavor::Stripe => "https://api.stripe.com",
        }
    }

    fn create_path(self) -> &'static str {
        match self {
            GatewayFlavor::MercadoPago => "/v1/payments",
            GatewayFlavor::PayPal => "/v2/checkout/orders",
            GatewayFlavor::Stripe => "/v1/payment_intents",
        }
    }

    /// Valor de `status` que significa pagamento concluído.
    fn success_status(self) -> &'static str {
        match self {
            GatewayFlavor::MercadoPago => "approved",
            GatewayFlavor::PayPal => "COMPLETED",
            GatewayFlavor::Stripe => "succeeded",
        }
    }
}

pub struct GatewayProvider {
    flavor: GatewayFlavor,
    client: Client,
    base_url: String,
    authorization: String,
}

impl GatewayProvider {
    /// Falha com `ConfigurationError` se faltar qualquer segredo exigido pelo gateway.
    pub fn new(settings: &GatewaySettings, timeout: Duration) -> Result<Self, AppError> {
        let flavor = GatewayFlavor::from_kind(settings.kind).ok_or_else(|| {
            AppError::ConfigurationError(format!("{} não é um gateway HTTP", settings.kind))
        })?;

        let blank = |value: &str| value.trim().is_empty();
        let authorization = match flavor {
            GatewayFlavor::MercadoPago => {
                if blank(&settings.access_token) {
                    return Err(missing(flavor, "ACCESS_TOKEN"));
                }
                format!("Bearer {}", settings.access_token)
            }
            GatewayFlavor::PayPal => {
                if blank(&settings.client_id) || blank(&settings.client_secret) {
                    return Err(missing(flavor, "CLIENT_ID/CLIENT_SECRET"));
                }
                let raw = format!("{}:{}", settings.client_id, settings.client_secret);
                format!("Basic {}", STANDARD.encode(raw))
            }
            GatewayFlavor::Stripe => {
                if blank(&settings.secret_key) {
                    return Err(missing(flavor, "SECRET_KEY"));
                }
                format!("Bearer {}", settings.secret_key)
            }
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("cliente HTTP de {}: {}", flavor.kind(), e)))?;

        let base_url = settings
            .api_url
            .as_deref()
            .filter(|url| !blank(url))
            .unwrap_or(flavor.default_base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { flavor, client, base_url, authorization })
    }

    pub fn flavor(&self) -> GatewayFlavor {
        self.flavor
    }

    fn create_request(&self, amount: Money) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, self.flavor.create_path());
        let request = self.client.post(url).header(AUTHORIZATION, &self.authorization);
        match self.flavor {
            GatewayFlavor::MercadoPago => request.json(&json!({
                "transaction_amount": amount.to_decimal(),
                "description": PURCHASE_DESCRIPTION,
                "payment_method_id": "pix",
                "payer": { "email": "comprador@vitrine.local" },
            })),
            GatewayFlavor::PayPal => request.json(&json!({
                "intent": "CAPTURE",
                "purchase_units": [{
                    "description": PURCHASE_DESCRIPTION,
                    "amount": { "currency_code": "BRL", "value": amount.to_decimal().to_string() },
                }],
            })),
            // Stripe só aceita form-urlencoded, valor em centavos
            GatewayFlavor::Stripe => request.form(&[
                ("amount", amount.cents().to_string()),
                ("currency", "brl".to_string()),
                ("payment_method_types[]", "card".to_string()),
                ("description", PURCHASE_DESCRIPTION.to_string()),
            ]),
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Value, AppError> {
        let kind = self.flavor.kind();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::ProviderError(format!("{}: tempo esgotado ao {}", kind, action))
            } else {
                AppError::ProviderError(format!("{}: falha ao {}: {}", kind, action, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderError(format!(
                "{}: {} respondeu {} - {}",
                kind, action, status, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::ProviderError(format!("{}: resposta inválida ao {}: {}", kind, action, e)))
    }
}

fn missing(flavor: GatewayFlavor, field: &str) -> AppError {
    AppError::ConfigurationError(format!(
        "PAYMENT_{}_{} não está configurado",
        flavor.kind().env_key(),
        field
    ))
}

/// O `id` pode vir como texto ou número, dependendo do gateway.
fn extract_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PaymentProvider for GatewayProvider {
    fn kind(&self) -> ProviderKind {
        self.flavor.kind()
    }

    fn requires_manual_confirmation(&self) -> bool {
        false
    }

    async fn create_payment(&self, amount: Money, destination_key: &str) -> Result<String, AppError> {
        let body = self.send(self.create_request(amount), "criar pagamento").await?;
        let payment_id = extract_id(&body).ok_or_else(|| {
            AppError::ProviderError(format!("{}: ID do pagamento não encontrado na resposta", self.kind()))
        })?;
        tracing::info!(provider = %self.kind(), %payment_id, %amount, destination = %destination_key, "Pagamento criado no gateway");
        Ok(payment_id)
    }

    async fn confirm_payment(&self, payment_id: &str) -> Result<bool, AppError> {
        let url = format!("{}{}/{}", self.base_url, self.flavor.create_path(), payment_id);
        let request = self.client.get(url).header(AUTHORIZATION, &self.authorization);
        let body = self.send(request, "consultar pagamento").await?;

        let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
        let confirmed = status == self.flavor.success_status();
        tracing::debug!(provider = %self.kind(), %payment_id, %status, confirmed, "Status consultado no gateway");
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        authorization: Arc<Mutex<Vec<String>>>,
        bodies: Arc<Mutex<Vec<String>>>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings(kind: ProviderKind, api_url: Option<String>) -> GatewaySettings {
        GatewaySettings {
            kind,
            api_url,
            access_token: "APP_USR-token".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            secret_key: "sk_test_abc".into(),
        }
    }

    fn record(captured: &Captured, headers: &HeaderMap, body: String) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        captured.authorization.lock().unwrap().push(auth);
        captured.bodies.lock().unwrap().push(body);
    }

    #[tokio::test]
    async fn mercado_pago_creates_and_confirms() {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/v1/payments",
                post(|State(c): State<Captured>, headers: HeaderMap, body: String| async move {
                    record(&c, &headers, body);
                    Json(json!({ "id": 1319432876, "status": "pending" }))
                }),
            )
            .route(
                "/v1/payments/{id}",
                get(|Path(id): Path<String>| async move {
                    let status = if id == "1319432876" { "approved" } else { "pending" };
                    Json(json!({ "id": id, "status": status }))
                }),
            )
            .with_state(captured.clone());
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::MercadoPago, Some(base)), Duration::from_secs(5)).unwrap();
        let id = provider.create_payment(Money::from_cents(2500), "chave").await.unwrap();

        assert_eq!(id, "1319432876");
        assert!(provider.confirm_payment(&id).await.unwrap());
        assert!(!provider.confirm_payment("42").await.unwrap());

        assert_eq!(captured.authorization.lock().unwrap()[0], "Bearer APP_USR-token");
        let body: Value = serde_json::from_str(&captured.bodies.lock().unwrap()[0]).unwrap();
        assert_eq!(body["payment_method_id"], "pix");
        assert_eq!(body["transaction_amount"].as_f64(), Some(25.0));
    }

    #[tokio::test]
    async fn paypal_uses_basic_auth() {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/v2/checkout/orders",
                post(|State(c): State<Captured>, headers: HeaderMap, body: String| async move {
                    record(&c, &headers, body);
                    Json(json!({ "id": "5O190127TN364715T", "status": "CREATED" }))
                }),
            )
            .route(
                "/v2/checkout/orders/{id}",
                get(|| async { Json(json!({ "status": "COMPLETED" })) }),
            )
            .with_state(captured.clone());
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::PayPal, Some(base)), Duration::from_secs(5)).unwrap();
        let id = provider.create_payment(Money::from_cents(1999), "chave").await.unwrap();

        assert_eq!(id, "5O190127TN364715T");
        assert!(provider.confirm_payment(&id).await.unwrap());
        assert_eq!(
            captured.authorization.lock().unwrap()[0],
            format!("Basic {}", STANDARD.encode("client:secret"))
        );
        let body: Value = serde_json::from_str(&captured.bodies.lock().unwrap()[0]).unwrap();
        assert_eq!(body["purchase_units"][0]["amount"]["value"], "19.99");
        assert_eq!(body["purchase_units"][0]["amount"]["currency_code"], "BRL");
    }

    #[tokio::test]
    async fn stripe_sends_centavos_as_form() {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/v1/payment_intents",
                post(|State(c): State<Captured>, headers: HeaderMap, body: String| async move {
                    record(&c, &headers, body);
                    Json(json!({ "id": "pi_3Nq", "status": "requires_payment_method" }))
                }),
            )
            .route(
                "/v1/payment_intents/{id}",
                get(|| async { Json(json!({ "status": "processing" })) }),
            )
            .with_state(captured.clone());
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::Stripe, Some(base)), Duration::from_secs(5)).unwrap();
        let id = provider.create_payment(Money::from_cents(2500), "chave").await.unwrap();

        assert_eq!(id, "pi_3Nq");
        assert!(!provider.confirm_payment(&id).await.unwrap());
        let body = captured.bodies.lock().unwrap()[0].clone();
        assert!(body.contains("amount=2500"));
        assert!(body.contains("currency=brl"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_provider_error() {
        let app = Router::new().route(
            "/v1/payments",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid token") }),
        );
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::MercadoPago, Some(base)), Duration::from_secs(5)).unwrap();
        let err = provider.create_payment(Money::from_cents(100), "chave").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(_)));
    }

    #[tokio::test]
    async fn missing_id_is_a_provider_error() {
        let app = Router::new().route("/v1/payments", post(|| async { Json(json!({ "status": "pending" })) }));
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::MercadoPago, Some(base)), Duration::from_secs(5)).unwrap();
        let err = provider.create_payment(Money::from_cents(100), "chave").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(_)));
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let app = Router::new().route(
            "/v1/payment_intents/{id}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "status": "succeeded" }))
            }),
        );
        let base = serve(app).await;

        let provider =
            GatewayProvider::new(&settings(ProviderKind::Stripe, Some(base)), Duration::from_millis(100)).unwrap();
        let err = provider.confirm_payment("pi_lento").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(msg) if msg.contains("tempo esgotado")));
    }

    #[test]
    fn blank_secrets_fail_at_construction() {
        let mut mp = settings(ProviderKind::MercadoPago, None);
        mp.access_token = "  ".into();
        assert!(matches!(
            GatewayProvider::new(&mp, Duration::from_secs(1)),
            Err(AppError::ConfigurationError(_))
        ));

        let mut paypal = settings(ProviderKind::PayPal, None);
        paypal.client_secret.clear();
        assert!(matches!(
            GatewayProvider::new(&paypal, Duration::from_secs(1)),
            Err(AppError::ConfigurationError(_))
        ));

        let manual = settings(ProviderKind::ManualPix, None);
        assert!(matches!(
            GatewayProvider::new(&manual, Duration::from_secs(1)),
            Err(AppError::ConfigurationError(_))
        ));
    }

    #[test]
    fn falls_back_to_the_public_base_url() {
        let provider = GatewayProvider::new(&settings(ProviderKind::Stripe, None), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, "https://api.stripe.com");
        assert_eq!(provider.flavor(), GatewayFlavor::Stripe);
    }
}
