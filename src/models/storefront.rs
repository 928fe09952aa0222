// src/models/storefront.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Atualização recebida do transporte de chat (texto digitado ou clique em botão).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontUpdate {
    #[validate(length(min = 1, max = 64, message = "O campo 'buyerId' é obrigatório."))]
    #[schema(example = "1074263794")]
    pub buyer_id: String,

    #[schema(example = "apt101")]
    pub text: Option<String>,

    #[schema(example = "confirm_yes")]
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyButton {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontReply {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ReplyButton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl StorefrontReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), buttons: Vec::new(), image_url: None }
    }

    pub fn with_buttons(mut self, buttons: Vec<ReplyButton>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontResponse {
    pub replies: Vec<StorefrontReply>,
}
