//! GPv2 order construction, signing, and submission.

use crate::metrics;
use alloy_primitives::{Address, U256};
use alloy_signer::SignerSync;
use std::sync::Arc;
use swap_orderbook::{
	apply_to_buy_amount, Orderbook, OrderbookError, OrderSubmission, Quote,
};
use swap_types::{
	with_0x_prefix, AppDataDocument, GpV2Order, OrderKind, OrderUid, SigningScheme,
	SupportedChain, Token, ORDER_VALIDITY_SECS,
};
use swap_vault::DerivedVault;
use thiserror::Error;

/// Errors that can occur while signing or submitting an order.
#[derive(Debug, Error)]
pub enum SigningError {
	#[error("orderbook error: {0}")]
	Orderbook(#[from] OrderbookError),
	#[error("signing error: {0}")]
	Signer(String),
}

/// Builds the sell order for a quoted swap.
///
/// `buy_amount` is the quote's amount with the slippage tolerance applied
/// in exact integer arithmetic; `valid_to` is 24 hours out; the fee rides
/// inside the sell amount (fee-in-price), so `fee_amount` is zero.
pub fn build_sell_order(
	quote: &Quote,
	slippage_bps: u32,
	sell_token: Address,
	buy_token: &Token,
	recipient: Address,
	app_data_hash: alloy_primitives::B256,
	now_unix: u64,
) -> GpV2Order {
	GpV2Order {
		sell_token,
		buy_token: buy_token.orderbook_address(),
		receiver: recipient,
		sell_amount: quote.sell_amount,
		buy_amount: apply_to_buy_amount(quote.buy_amount, slippage_bps),
		valid_to: (now_unix + ORDER_VALIDITY_SECS) as u32,
		app_data: app_data_hash,
		fee_amount: U256::ZERO,
		kind: OrderKind::Sell,
		partially_fillable: false,
	}
}

/// Signs orders under the settlement domain and submits them.
pub struct OrderSigner {
	orderbook: Arc<dyn Orderbook>,
}

impl OrderSigner {
	pub fn new(orderbook: Arc<dyn Orderbook>) -> Self {
		Self { orderbook }
	}

	/// Uploads the app-data document, signs the order with the vault key,
	/// and submits it. Returns the orderbook-assigned UID.
	pub async fn sign_and_submit(
		&self,
		chain: SupportedChain,
		vault: &DerivedVault,
		order: &GpV2Order,
		document: &AppDataDocument,
		quote_id: Option<i64>,
	) -> Result<OrderUid, SigningError> {
		// The orderbook rejects orders whose appData hash it has not seen.
		self.orderbook
			.upload_app_data(chain, order.app_data, &document.canonical_json())
			.await?;

		let digest = order.signing_digest(chain.id());
		let signature = vault
			.signer()
			.sign_hash_sync(&digest)
			.map_err(|e| SigningError::Signer(e.to_string()))?;

		let submission = OrderSubmission {
			sell_token: order.sell_token,
			buy_token: order.buy_token,
			receiver: order.receiver,
			sell_amount: order.sell_amount,
			buy_amount: order.buy_amount,
			valid_to: order.valid_to,
			app_data: order.app_data,
			fee_amount: order.fee_amount,
			kind: order.kind,
			partially_fillable: order.partially_fillable,
			sell_token_balance: swap_types::order::BALANCE_ERC20.to_string(),
			buy_token_balance: swap_types::order::BALANCE_ERC20.to_string(),
			signing_scheme: SigningScheme::Eip712,
			signature: with_0x_prefix(&hex::encode(signature.as_bytes())),
			from: vault.address(),
			quote_id,
		};

		let uid = self.orderbook.submit_order(chain, &submission).await?;
		metrics::ORDERS_SUBMITTED.inc();
		Ok(uid)
	}
}
