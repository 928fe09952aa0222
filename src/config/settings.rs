// src/config/settings.rs

//! Configuração lida do ambiente (`.env` via dotenvy).

use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};

use crate::models::payment::ProviderKind;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Credenciais de um gateway habilitado. Campos ausentes ficam vazios e são
/// validados na construção do provedor.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub kind: ProviderKind,
    pub api_url: Option<String>,
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub manual_pix_enabled: bool,
    // Apenas os gateways com `PAYMENT_<X>_ENABLED=true`
    pub gateways: Vec<GatewaySettings>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub uploads_dir: PathBuf,
    // Chave PIX exibida ao comprador no fluxo manual
    pub pix_admin_key: String,
    pub session_ttl: Duration,
    pub payment: PaymentSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} deve ser definida", key))
        };
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse_u64 = |key: &str, default: u64| -> anyhow::Result<u64> {
            match optional(key) {
                Some(v) => v.parse().with_context(|| format!("{} deve ser um número inteiro", key)),
                None => Ok(default),
            }
        };

        let flag = |key: &str, default: bool| -> anyhow::Result<bool> {
            match optional(key).map(|v| v.to_ascii_lowercase()) {
                None => Ok(default),
                Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
                Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
                Some(v) => Err(anyhow!("{} tem valor booleano inválido: '{}'", key, v)),
            }
        };

        let mut gateways = Vec::new();
        let mut manual_pix_enabled = false;
        for kind in ProviderKind::ALL {
            let prefix = format!("PAYMENT_{}", kind.env_key());
            // O PIX manual vem habilitado por padrão; gateways só quando pedidos.
            let enabled = flag(&format!("{prefix}_ENABLED"), kind == ProviderKind::ManualPix)?;
            if !enabled {
                continue;
            }
            if kind == ProviderKind::ManualPix {
                manual_pix_enabled = true;
                continue;
            }
            gateways.push(GatewaySettings {
                kind,
                api_url: optional(&format!("{prefix}_API_URL")),
                access_token: optional(&format!("{prefix}_ACCESS_TOKEN")).unwrap_or_default(),
                client_id: optional(&format!("{prefix}_CLIENT_ID")).unwrap_or_default(),
                client_secret: optional(&format!("{prefix}_CLIENT_SECRET")).unwrap_or_default(),
                secret_key: optional(&format!("{prefix}_SECRET_KEY")).unwrap_or_default(),
            });
        }

        let max_connections = parse_u64("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS as u64)?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_connections: u32::try_from(max_connections)
                .context("DATABASE_MAX_CONNECTIONS fora do intervalo")?,
            uploads_dir: PathBuf::from(optional("UPLOADS_DIR").unwrap_or_else(|| DEFAULT_UPLOADS_DIR.to_string())),
            pix_admin_key: optional("PIX_ADMIN_KEY").unwrap_or_default(),
            session_ttl: Duration::from_secs(parse_u64("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?),
            payment: PaymentSettings {
                manual_pix_enabled,
                gateways,
                timeout: Duration::from_secs(parse_u64("PAYMENT_TIMEOUT_SECS", DEFAULT_PAYMENT_TIMEOUT_SECS)?),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let mut env: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), "postgres://localhost/backoffice".to_string()),
            ("JWT_SECRET".to_string(), "segredo".to_string()),
        ]);
        for (k, v) in pairs {
            env.insert(k.to_string(), v.to_string());
        }
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_enable_only_manual_pix() {
        let s = settings(&[]).unwrap();
        assert!(s.payment.manual_pix_enabled);
        assert!(s.payment.gateways.is_empty());
        assert_eq!(s.payment.timeout, Duration::from_secs(10));
        assert_eq!(s.session_ttl, Duration::from_secs(1800));
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
    }

    #[test]
    fn enabled_gateways_carry_their_credentials() {
        let s = settings(&[
            ("PAYMENT_PIX_ENABLED", "false"),
            ("PAYMENT_STRIPE_ENABLED", "true"),
            ("PAYMENT_STRIPE_SECRET_KEY", "sk_test_123"),
            ("PAYMENT_PAYPAL_ENABLED", "0"),
        ])
        .unwrap();
        assert!(!s.payment.manual_pix_enabled);
        assert_eq!(s.payment.gateways.len(), 1);
        let stripe = &s.payment.gateways[0];
        assert_eq!(stripe.kind, ProviderKind::Stripe);
        assert_eq!(stripe.secret_key, "sk_test_123");
        assert!(stripe.api_url.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Settings::from_lookup(|key| (key == "JWT_SECRET").then(|| "x".to_string())).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn rejects_garbage_flags_and_numbers() {
        assert!(settings(&[("PAYMENT_MERCADOPAGO_ENABLED", "talvez")]).is_err());
        assert!(settings(&[("PAYMENT_TIMEOUT_SECS", "dez")]).is_err());
    }
}
