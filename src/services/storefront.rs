// src/services/storefront.rs

//! Vitrine conversacional: o comprador informa o código do apartamento,
//! escolhe um produto do catálogo e confirma a compra.
//!
//! `decide` é puro (passo atual + entrada -> comando); `StorefrontService`
//! executa o comando contra o banco e o provedor de pagamento.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ApartmentRepository,
    models::{
        sale::PollOutcome,
        storefront::{ReplyButton, StorefrontReply, StorefrontUpdate},
    },
    services::{ledger_service::LedgerService, session_store::SessionStore},
};

pub const CONFIRM_YES: &str = "confirm_yes";
pub const CONFIRM_NO: &str = "confirm_no";

const MSG_WELCOME: &str = "Envie o código do apartamento (ex.: apt101) para começar.";
const MSG_USE_BUTTONS: &str = "Por favor, confirme ou cancele a compra usando os botões.";
const MSG_NOT_FOUND: &str = "Apartamento não encontrado. Verifique o código e tente novamente.";
const MSG_BUY_USAGE: &str = "Uso: /buy N (N é o número do produto na lista).";
const MSG_UNAVAILABLE: &str = "Produto não disponível.";
const MSG_CANCELLED: &str = "Compra cancelada. Digite /buy N para escolher outro produto.";
const MSG_EMPTY_CATALOGUE: &str = "Nenhum produto disponível neste apartamento no momento.";
const MSG_UNKNOWN_COMMAND: &str = "Comando desconhecido. Use /start para recomeçar.";
const MSG_PAYMENT_ERROR: &str = "Não foi possível processar o pagamento. Tente novamente mais tarde.";

/// Em que ponto da conversa o comprador está.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    Idle,
    SelectingProduct {
        apartment_id: Uuid,
        catalogue: Vec<Uuid>,
    },
    ConfirmingPurchase {
        apartment_id: Uuid,
        catalogue: Vec<Uuid>,
        product_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Text(String),
    /// `/buy N`; `None` quando N está ausente ou não é número
    Buy(Option<usize>),
    ConfirmYes,
    ConfirmNo,
    UnknownCommand,
    UnknownCallback,
}

impl Input {
    pub fn parse(update: &StorefrontUpdate) -> Input {
        if let Some(data) = update.callback_data.as_deref() {
            return match data.trim() {
                CONFIRM_YES => Input::ConfirmYes,
                CONFIRM_NO => Input::ConfirmNo,
                _ => Input::UnknownCallback,
            };
        }

        let text = update.text.as_deref().unwrap_or_default().trim().to_lowercase();
        let Some(command) = text.strip_prefix('/') else {
            return Input::Text(text);
        };

        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("start") => Input::Start,
            Some("buy") => Input::Buy(parts.next().and_then(|n| n.parse().ok())),
            _ => Input::UnknownCommand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say { text: &'static str, next: Step },
    LookupApartment { identifier: String },
    ShowProduct { apartment_id: Uuid, catalogue: Vec<Uuid>, product_id: Uuid },
    Purchase { apartment_id: Uuid, catalogue: Vec<Uuid>, product_id: Uuid },
    Ignore,
}

pub fn decide(step: &Step, input: Input) -> Command {
    match (step, input) {
        (_, Input::Start) => Command::Say { text: MSG_WELCOME, next: Step::Idle },

        // Com a confirmação aberta, só os botões contam
        (
            Step::ConfirmingPurchase { apartment_id, catalogue, product_id },
            input,
        ) => match input {
            Input::ConfirmYes => Command::Purchase {
                apartment_id: *apartment_id,
                catalogue: catalogue.clone(),
                product_id: *product_id,
            },
            Input::ConfirmNo => Command::Say {
                text: MSG_CANCELLED,
                next: Step::SelectingProduct { apartment_id: *apartment_id, catalogue: catalogue.clone() },
            },
            Input::UnknownCallback => Command::Ignore,
            _ => Command::Say { text: MSG_USE_BUTTONS, next: step.clone() },
        },

        (_, Input::ConfirmYes | Input::ConfirmNo | Input::UnknownCallback) => Command::Ignore,
        (_, Input::UnknownCommand) => Command::Say { text: MSG_UNKNOWN_COMMAND, next: step.clone() },

        (_, Input::Text(text)) if text.is_empty() => Command::Say { text: MSG_WELCOME, next: step.clone() },
        (_, Input::Text(identifier)) => Command::LookupApartment { identifier },

        (Step::Idle, Input::Buy(_)) => Command::Say { text: MSG_WELCOME, next: Step::Idle },
        (Step::SelectingProduct { .. }, Input::Buy(None)) => {
            Command::Say { text: MSG_BUY_USAGE, next: step.clone() }
        }
        (Step::SelectingProduct { apartment_id, catalogue }, Input::Buy(Some(n))) => {
            match n.checked_sub(1).and_then(|i| catalogue.get(i)) {
                Some(product_id) => Command::ShowProduct {
                    apartment_id: *apartment_id,
                    catalogue: catalogue.clone(),
                    product_id: *product_id,
                },
                None => Command::Say { text: MSG_UNAVAILABLE, next: step.clone() },
            }
        }
    }
}

fn confirmation_buttons() -> Vec<ReplyButton> {
    vec![
        ReplyButton { label: "Sim".into(), data: CONFIRM_YES.into() },
        ReplyButton { label: "Não".into(), data: CONFIRM_NO.into() },
    ]
}

#[derive(Clone)]
pub struct StorefrontService {
    apartment_repo: ApartmentRepository,
    ledger: LedgerService,
    sessions: Arc<SessionStore<Step>>,
    pix_admin_key: String,
}

impl StorefrontService {
    pub fn new(
        apartment_repo: ApartmentRepository,
        ledger: LedgerService,
        sessions: Arc<SessionStore<Step>>,
        pix_admin_key: String,
    ) -> Self {
        Self { apartment_repo, ledger, sessions, pix_admin_key }
    }

    /// Processa uma mensagem do comprador. A sessão fica travada até o fim,
    /// então mensagens do mesmo comprador são tratadas uma de cada vez.
    pub async fn handle(&self, update: &StorefrontUpdate) -> Result<Vec<StorefrontReply>, AppError> {
        let buyer_id = update.buyer_id.trim();
        let mut session = self.sessions.lock(buyer_id).await;

        let input = Input::parse(update);
        let command = decide(&session.state, input);
        tracing::debug!(buyer = %buyer_id, step = ?session.state, ?command, "Vitrine");

        let (replies, next) = match command {
            Command::Ignore => (Vec::new(), session.state.clone()),
            Command::Say { text, next } => (vec![StorefrontReply::text(text)], next),
            Command::LookupApartment { identifier } => self.lookup_apartment(&identifier, &session.state).await?,
            Command::ShowProduct { apartment_id, catalogue, product_id } => {
                self.show_product(apartment_id, catalogue, product_id).await?
            }
            Command::Purchase { apartment_id, catalogue, product_id } => {
                self.purchase(buyer_id, apartment_id, catalogue, product_id).await?
            }
        };

        session.state = next;
        Ok(replies)
    }

    async fn lookup_apartment(
        &self,
        identifier: &str,
        current: &Step,
    ) -> Result<(Vec<StorefrontReply>, Step), AppError> {
        let Some(apartment) = self.apartment_repo.find_by_identifier(identifier).await? else {
            return Ok((vec![StorefrontReply::text(MSG_NOT_FOUND)], current.clone()));
        };

        let products = self.apartment_repo.list_available_products(apartment.id).await?;
        if products.is_empty() {
            return Ok((vec![StorefrontReply::text(MSG_EMPTY_CATALOGUE)], Step::Idle));
        }

        let mut listing = format!("Produtos disponíveis em {}:\n", apartment.name);
        for (i, product) in products.iter().enumerate() {
            listing.push_str(&format!("{}. {} - {}\n", i + 1, product.name, product.price));
        }
        listing.push_str("Digite /buy N para comprar.");

        let next = Step::SelectingProduct {
            apartment_id: apartment.id,
            catalogue: products.iter().map(|p| p.id).collect(),
        };
        Ok((vec![StorefrontReply::text(listing)], next))
    }

    async fn show_product(
        &self,
        apartment_id: Uuid,
        catalogue: Vec<Uuid>,
        product_id: Uuid,
    ) -> Result<(Vec<StorefrontReply>, Step), AppError> {
        let product = self
            .apartment_repo
            .find_product(self.apartment_repo.pool(), product_id)
            .await?
            .filter(|p| p.is_available && p.apartment_id == apartment_id);

        let Some(product) = product else {
            return Ok((
                vec![StorefrontReply::text(MSG_UNAVAILABLE)],
                Step::SelectingProduct { apartment_id, catalogue },
            ));
        };

        let mut text = format!("{}\nPreço: {}", product.name, product.price);
        if !product.description.is_empty() {
            text = format!("{}\n{}", text, product.description);
        }
        text.push_str("\nConfirmar a compra?");

        let reply = StorefrontReply::text(text)
            .with_image(product.image_url.clone())
            .with_buttons(confirmation_buttons());
        Ok((vec![reply], Step::ConfirmingPurchase { apartment_id, catalogue, product_id }))
    }

    async fn purchase(
        &self,
        buyer_id: &str,
        apartment_id: Uuid,
        catalogue: Vec<Uuid>,
        product_id: Uuid,
    ) -> Result<(Vec<StorefrontReply>, Step), AppError> {
        let back_to_catalogue = Step::SelectingProduct { apartment_id, catalogue };

        let detail = match self.ledger.record_sale(product_id, buyer_id).await {
            Ok(detail) => detail,
            Err(AppError::ProductUnavailable) | Err(AppError::NotFound(_)) => {
                return Ok((vec![StorefrontReply::text(MSG_UNAVAILABLE)], back_to_catalogue));
            }
            Err(e @ (AppError::ProviderError(_) | AppError::NoProviderAvailable | AppError::Conflict(_))) => {
                tracing::warn!(buyer = %buyer_id, %product_id, error = %e, "Falha ao registrar compra");
                return Ok((vec![StorefrontReply::text(MSG_PAYMENT_ERROR)], back_to_catalogue));
            }
            Err(e) => return Err(e),
        };

        let lock_code = self
            .apartment_repo
            .find_product(self.apartment_repo.pool(), product_id)
            .await?
            .map(|p| p.lock_code)
            .unwrap_or_default();

        let sale = &detail.sale;
        if sale.is_manual() {
            let replies = vec![
                StorefrontReply::text(format!(
                    "Compra confirmada! Código do cadeado: {}",
                    lock_code
                )),
                StorefrontReply::text(format!(
                    "Faça um PIX de {} para a chave {} e aguarde a confirmação do financeiro.",
                    sale.amount, self.pix_admin_key
                )),
                StorefrontReply::text(sale.payment_id.clone()),
            ];
            return Ok((replies, Step::Idle));
        }

        let mut replies = vec![StorefrontReply::text(format!(
            "Pagamento criado (ID {}). Aguarde a confirmação.",
            sale.payment_id
        ))];

        // Uma consulta imediata; o restante fica com a sincronização periódica
        match self.ledger.poll_sale(sale.id).await {
            Ok(PollOutcome::Confirmed) => replies.push(StorefrontReply::text(format!(
                "Pagamento confirmado! Código do cadeado: {}",
                lock_code
            ))),
            Ok(_) => replies.push(StorefrontReply::text(
                "Pagamento ainda pendente. O código do cadeado será liberado após a confirmação.",
            )),
            Err(e) => {
                tracing::warn!(sale_id = %sale.id, error = %e, "Consulta imediata ao provedor falhou");
                replies.push(StorefrontReply::text(
                    "Pagamento ainda pendente. O código do cadeado será liberado após a confirmação.",
                ));
            }
        }

        Ok((replies, Step::Idle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(text: Option<&str>, callback: Option<&str>) -> StorefrontUpdate {
        StorefrontUpdate {
            buyer_id: "1074263794".into(),
            text: text.map(String::from),
            callback_data: callback.map(String::from),
        }
    }

    fn selecting(n: usize) -> (Uuid, Vec<Uuid>, Step) {
        let apartment_id = Uuid::new_v4();
        let catalogue: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let step = Step::SelectingProduct { apartment_id, catalogue: catalogue.clone() };
        (apartment_id, catalogue, step)
    }

    #[test]
    fn parses_commands_text_and_callbacks() {
        assert_eq!(Input::parse(&update(Some("/start"), None)), Input::Start);
        assert_eq!(Input::parse(&update(Some(" /BUY 2 "), None)), Input::Buy(Some(2)));
        assert_eq!(Input::parse(&update(Some("/buy dois"), None)), Input::Buy(None));
        assert_eq!(Input::parse(&update(Some("/help"), None)), Input::UnknownCommand);
        assert_eq!(Input::parse(&update(Some("  APT101 "), None)), Input::Text("apt101".into()));
        assert_eq!(Input::parse(&update(None, Some("confirm_yes"))), Input::ConfirmYes);
        assert_eq!(Input::parse(&update(Some("ignorado"), Some("confirm_no"))), Input::ConfirmNo);
        assert_eq!(Input::parse(&update(None, Some("outro"))), Input::UnknownCallback);
    }

    #[test]
    fn idle_text_looks_up_apartment() {
        assert_eq!(
            decide(&Step::Idle, Input::Text("apt101".into())),
            Command::LookupApartment { identifier: "apt101".into() }
        );
    }

    #[test]
    fn buy_picks_product_by_one_based_index() {
        let (apartment_id, catalogue, step) = selecting(3);
        assert_eq!(
            decide(&step, Input::Buy(Some(2))),
            Command::ShowProduct { apartment_id, catalogue: catalogue.clone(), product_id: catalogue[1] }
        );
    }

    #[test]
    fn buy_out_of_range_keeps_selection() {
        let (_, _, step) = selecting(2);
        for n in [0, 3] {
            assert_eq!(
                decide(&step, Input::Buy(Some(n))),
                Command::Say { text: MSG_UNAVAILABLE, next: step.clone() }
            );
        }
        assert_eq!(
            decide(&step, Input::Buy(None)),
            Command::Say { text: MSG_BUY_USAGE, next: step.clone() }
        );
    }

    #[test]
    fn buy_without_apartment_asks_for_code() {
        assert_eq!(
            decide(&Step::Idle, Input::Buy(Some(1))),
            Command::Say { text: MSG_WELCOME, next: Step::Idle }
        );
    }

    #[test]
    fn confirmation_never_leaves_on_free_text() {
        let (apartment_id, catalogue, _) = selecting(1);
        let step = Step::ConfirmingPurchase { apartment_id, catalogue: catalogue.clone(), product_id: catalogue[0] };

        for input in [Input::Text("apt202".into()), Input::Buy(Some(1)), Input::UnknownCommand] {
            assert_eq!(decide(&step, input), Command::Say { text: MSG_USE_BUTTONS, next: step.clone() });
        }
        assert_eq!(decide(&step, Input::UnknownCallback), Command::Ignore);
    }

    #[test]
    fn confirm_yes_purchases_and_no_cancels() {
        let (apartment_id, catalogue, selecting_step) = selecting(1);
        let product_id = catalogue[0];
        let step = Step::ConfirmingPurchase { apartment_id, catalogue: catalogue.clone(), product_id };

        assert_eq!(
            decide(&step, Input::ConfirmYes),
            Command::Purchase { apartment_id, catalogue, product_id }
        );
        assert_eq!(
            decide(&step, Input::ConfirmNo),
            Command::Say { text: MSG_CANCELLED, next: selecting_step }
        );
    }

    #[test]
    fn stray_buttons_are_ignored_outside_confirmation() {
        assert_eq!(decide(&Step::Idle, Input::ConfirmYes), Command::Ignore);
        let (_, _, step) = selecting(1);
        assert_eq!(decide(&step, Input::ConfirmNo), Command::Ignore);
    }

    #[test]
    fn start_always_resets() {
        let (_, catalogue, step) = selecting(1);
        assert_eq!(decide(&step, Input::Start), Command::Say { text: MSG_WELCOME, next: Step::Idle });
        let confirming = Step::ConfirmingPurchase {
            apartment_id: Uuid::new_v4(),
            catalogue: catalogue.clone(),
            product_id: catalogue[0],
        };
        assert_eq!(decide(&confirming, Input::Start), Command::Say { text: MSG_WELCOME, next: Step::Idle });
    }
}
