// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Valor inválido: {0}")]
    InvalidAmount(String),

    #[error("Taxa de retenção inválida: {0}")]
    InvalidRate(String),

    #[error("Dados inválidos: {0}")]
    InvalidInput(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("Saldo insuficiente")]
    InsufficientBalance,

    #[error("Produto indisponível")]
    ProductUnavailable,

    #[error("Somente pagamentos PIX manuais podem ser rejeitados manualmente")]
    NotManualPayment,

    #[error("{0} já está em estado final")]
    AlreadyTerminal(&'static str),

    #[error("Nenhum dono associado à transação")]
    NoOwnerAssociated,

    #[error("Protocolo fechado")]
    ProtocolClosed,

    // Alteração concorrente detectada; o cliente pode tentar novamente.
    #[error("Conflito de concorrência: {0}")]
    Conflict(String),

    #[error("Falha no provedor de pagamento: {0}")]
    ProviderError(String),

    #[error("Configuração inválida: {0}")]
    ConfigurationError(String),

    #[error("Nenhum provedor de pagamento habilitado")]
    NoProviderAvailable,

    #[error("Falha no armazenamento de arquivos: {0}")]
    StorageError(String),

    #[error("Erro de banco de dados")]
    DatabaseError(sqlx::Error),

    // `anyhow::Error` captura o contexto de erros inesperados.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            // 40001 = serialization_failure, 40P01 = deadlock_detected
            let retryable = matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"));
            if db_err.is_unique_violation() || retryable {
                return AppError::Conflict(db_err.message().to_string());
            }
        }
        AppError::DatabaseError(e)
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidAmount(_)
            | AppError::InvalidRate(_)
            | AppError::InvalidInput(_)
            | AppError::NotManualPayment => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProductUnavailable
            | AppError::AlreadyTerminal(_)
            | AppError::ProtocolClosed
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientBalance | AppError::NoOwnerAssociated => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigurationError(_) | AppError::NoProviderAvailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "details": details,
            }));
            return (status, body).into_response();
        }

        // Erros 5xx não expõem detalhes; o `tracing` registra a mensagem completa.
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = ?self, "Erro Interno do Servidor: {}", self);
            if status == StatusCode::SERVICE_UNAVAILABLE {
                self.to_string()
            } else {
                "Ocorreu um erro inesperado.".to_string()
            }
        } else {
            if status == StatusCode::BAD_GATEWAY {
                tracing::warn!("{}", self);
            }
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}
