//! HTTP implementation of the orderbook client.

use crate::{amount_string, Orderbook, OrderbookError, OrderState, OrderSubmission, Quote, Trade};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use swap_types::{OrderUid, SupportedChain};

/// Wire shape of a quote request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteApiRequest {
	sell_token: Address,
	buy_token: Address,
	from: Address,
	kind: &'static str,
	#[serde(with = "amount_string")]
	sell_amount_before_fee: U256,
}

/// Wire shape of a quote response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteApiResponse {
	quote: QuoteApiBody,
	id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteApiBody {
	#[serde(with = "amount_string")]
	sell_amount: U256,
	#[serde(with = "amount_string")]
	buy_amount: U256,
	#[serde(with = "amount_string")]
	fee_amount: U256,
	valid_to: u64,
}

/// Wire shape of an orderbook error body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderbookErrorBody {
	#[allow(dead_code)]
	error_type: Option<String>,
	description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppDataUpload<'a> {
	full_app_data: &'a str,
}

/// HTTP client for the settlement orderbook.
pub struct HttpOrderbook {
	client: reqwest::Client,
	/// Scheme and host, e.g. `https://api.cow.fi`. The per-chain network
	/// slug and `/api/v1` are appended per request.
	base_url: String,
}

impl HttpOrderbook {
	/// Creates a client with connection pooling and the given timeout.
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OrderbookError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(timeout)
			.build()
			.map_err(|e| OrderbookError::Network(format!("failed to create HTTP client: {}", e)))?;
		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, chain: SupportedChain, path: &str) -> String {
		format!(
			"{}/{}/api/v1/{}",
			self.base_url,
			chain.orderbook_slug(),
			path
		)
	}

	/// Turns a non-2xx response into a rejection carrying the server's
	/// message verbatim.
	async fn rejection(response: reqwest::Response) -> OrderbookError {
		let raw = match response.text().await {
			Ok(text) => text,
			Err(e) => return OrderbookError::Network(e.to_string()),
		};
		match serde_json::from_str::<OrderbookErrorBody>(&raw) {
			Ok(body) => OrderbookError::Rejected(body.description.unwrap_or(raw)),
			Err(_) => OrderbookError::Rejected(raw),
		}
	}
}

#[async_trait]
impl Orderbook for HttpOrderbook {
	async fn quote(
		&self,
		chain: SupportedChain,
		sell_token: Address,
		buy_token: Address,
		sell_amount: U256,
		from: Address,
	) -> Result<Quote, OrderbookError> {
		let request = QuoteApiRequest {
			sell_token,
			buy_token,
			from,
			kind: "sell",
			sell_amount_before_fee: sell_amount,
		};

		let response = self
			.client
			.post(self.url(chain, "quote"))
			.json(&request)
			.send()
			.await
			.map_err(|e| OrderbookError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(Self::rejection(response).await);
		}

		let body: QuoteApiResponse = response
			.json()
			.await
			.map_err(|e| OrderbookError::InvalidResponse(e.to_string()))?;
		Ok(Quote {
			quote_id: body.id,
			sell_amount: body.quote.sell_amount,
			buy_amount: body.quote.buy_amount,
			fee_amount: body.quote.fee_amount,
			valid_to: body.quote.valid_to,
		})
	}

	async fn upload_app_data(
		&self,
		chain: SupportedChain,
		hash: B256,
		document: &str,
	) -> Result<(), OrderbookError> {
		let response = self
			.client
			.put(self.url(chain, &format!("app_data/{}", hash)))
			.json(&AppDataUpload {
				full_app_data: document,
			})
			.send()
			.await
			.map_err(|e| OrderbookError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(Self::rejection(response).await);
		}
		Ok(())
	}

	async fn submit_order(
		&self,
		chain: SupportedChain,
		submission: &OrderSubmission,
	) -> Result<OrderUid, OrderbookError> {
		let response = self
			.client
			.post(self.url(chain, "orders"))
			.json(submission)
			.send()
			.await
			.map_err(|e| OrderbookError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(Self::rejection(response).await);
		}

		// The orderbook answers with the bare UID as a JSON string.
		let uid: String = response
			.json()
			.await
			.map_err(|e| OrderbookError::InvalidResponse(e.to_string()))?;
		OrderUid::from_str(&uid).map_err(OrderbookError::InvalidResponse)
	}

	async fn order_status(
		&self,
		chain: SupportedChain,
		uid: &OrderUid,
	) -> Result<OrderState, OrderbookError> {
		let response = self
			.client
			.get(self.url(chain, &format!("orders/{}", uid)))
			.send()
			.await
			.map_err(|e| OrderbookError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(Self::rejection(response).await);
		}

		response
			.json()
			.await
			.map_err(|e| OrderbookError::InvalidResponse(e.to_string()))
	}

	async fn trades(
		&self,
		chain: SupportedChain,
		uid: &OrderUid,
	) -> Result<Vec<Trade>, OrderbookError> {
		#[derive(Debug, Deserialize)]
		#[serde(rename_all = "camelCase")]
		struct TradeEntry {
			tx_hash: Option<String>,
			#[serde(with = "amount_string")]
			buy_amount: U256,
			#[serde(with = "amount_string")]
			sell_amount: U256,
			block_number: u64,
		}

		let response = self
			.client
			.get(self.url(chain, &format!("trades?orderUid={}", uid)))
			.send()
			.await
			.map_err(|e| OrderbookError::Network(e.to_string()))?;

		if !response.status().is_success() {
			return Err(Self::rejection(response).await);
		}

		let entries: Vec<TradeEntry> = response
			.json()
			.await
			.map_err(|e| OrderbookError::InvalidResponse(e.to_string()))?;

		// Only settled fills carry a settlement transaction.
		Ok(entries
			.into_iter()
			.filter_map(|entry| {
				entry.tx_hash.map(|tx_hash| Trade {
					tx_hash,
					buy_amount: entry.buy_amount,
					sell_amount: entry.sell_amount,
					block_number: entry.block_number,
				})
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, b256};
	use httpmock::prelude::*;
	use swap_types::{OrderKind, OrderStatus, SigningScheme};

	const SELL: Address = address!("cbB7C0000aB88B473b1f5aFd9ef808440eed33Bf");
	const BUY: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
	const FROM: Address = address!("1111111111111111111111111111111111111111");

	fn client(server: &MockServer) -> HttpOrderbook {
		HttpOrderbook::new(server.base_url(), Duration::from_secs(5)).unwrap()
	}

	fn test_uid() -> OrderUid {
		OrderUid::new(
			b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
			FROM,
			1_700_000_000,
		)
	}

	#[tokio::test]
	async fn test_quote_success() {
		let server = MockServer::start();
		let mock = server.mock(|when, then| {
			when.method(POST).path("/base/api/v1/quote");
			then.status(200).json_body(serde_json::json!({
				"quote": {
					"sellAmount": "9900",
					"buyAmount": "123456",
					"feeAmount": "100",
					"validTo": 1700000000u64,
				},
				"id": 42,
			}));
		});

		let quote = client(&server)
			.quote(SupportedChain::Base, SELL, BUY, U256::from(10_000u64), FROM)
			.await
			.unwrap();

		mock.assert();
		assert_eq!(quote.quote_id, Some(42));
		assert_eq!(quote.sell_amount, U256::from(9_900u64));
		assert_eq!(quote.buy_amount, U256::from(123_456u64));
		assert_eq!(quote.fee_amount, U256::from(100u64));
		assert_eq!(quote.valid_to, 1_700_000_000);
	}

	#[tokio::test]
	async fn test_quote_rejection_preserves_upstream_message() {
		let server = MockServer::start();
		server.mock(|when, then| {
			when.method(POST).path("/mainnet/api/v1/quote");
			then.status(400).json_body(serde_json::json!({
				"errorType": "SellAmountDoesNotCoverFee",
				"description": "sell amount does not cover fee",
			}));
		});

		let err = client(&server)
			.quote(SupportedChain::Ethereum, SELL, BUY, U256::from(1u64), FROM)
			.await
			.unwrap_err();

		match err {
			OrderbookError::Rejected(message) => {
				assert_eq!(message, "sell amount does not cover fee")
			},
			other => panic!("expected Rejected, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_upload_app_data_puts_document() {
		let server = MockServer::start();
		let hash = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
		let mock = server.mock(|when, then| {
			when.method(PUT)
				.path(format!("/base/api/v1/app_data/{}", hash))
				.json_body(serde_json::json!({"fullAppData": "{\"a\":1}"}));
			then.status(201);
		});

		client(&server)
			.upload_app_data(SupportedChain::Base, hash, "{\"a\":1}")
			.await
			.unwrap();
		mock.assert();
	}

	#[tokio::test]
	async fn test_submit_order_returns_uid() {
		let server = MockServer::start();
		let uid = test_uid();
		let mock = server.mock(|when, then| {
			when.method(POST).path("/base/api/v1/orders");
			then.status(201).json_body(serde_json::json!(uid.to_string()));
		});

		let submission = OrderSubmission {
			sell_token: SELL,
			buy_token: BUY,
			receiver: FROM,
			sell_amount: U256::from(10_000u64),
			buy_amount: U256::from(9_950u64),
			valid_to: 1_700_000_000,
			app_data: b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
			fee_amount: U256::ZERO,
			kind: OrderKind::Sell,
			partially_fillable: false,
			sell_token_balance: "erc20".to_string(),
			buy_token_balance: "erc20".to_string(),
			signing_scheme: SigningScheme::Eip712,
			signature: "0xdeadbeef".to_string(),
			from: FROM,
			quote_id: Some(42),
		};

		let returned = client(&server)
			.submit_order(SupportedChain::Base, &submission)
			.await
			.unwrap();
		mock.assert();
		assert_eq!(returned, uid);
	}

	#[tokio::test]
	async fn test_order_status_parses_executed_amounts() {
		let server = MockServer::start();
		let uid = test_uid();
		server.mock(|when, then| {
			when.method(GET).path(format!("/base/api/v1/orders/{}", uid));
			then.status(200).json_body(serde_json::json!({
				"status": "FULFILLED",
				"executedBuyAmount": "9951",
				"executedSellAmount": "10000",
			}));
		});

		let state = client(&server)
			.order_status(SupportedChain::Base, &uid)
			.await
			.unwrap();
		assert_eq!(state.status, OrderStatus::Fulfilled);
		assert_eq!(state.executed_buy_amount, Some(U256::from(9_951u64)));
		assert_eq!(state.executed_sell_amount, Some(U256::from(10_000u64)));
	}

	#[tokio::test]
	async fn test_trades_filters_unsettled_entries() {
		let server = MockServer::start();
		let uid = test_uid();
		server.mock(|when, then| {
			when.method(GET)
				.path("/base/api/v1/trades")
				.query_param("orderUid", uid.to_string());
			then.status(200).json_body(serde_json::json!([
				{
					"txHash": null,
					"buyAmount": "1",
					"sellAmount": "2",
					"blockNumber": 100u64,
				},
				{
					"txHash": "0xsettlement",
					"buyAmount": "9951",
					"sellAmount": "10000",
					"blockNumber": 101u64,
				},
			]));
		});

		let trades = client(&server)
			.trades(SupportedChain::Base, &uid)
			.await
			.unwrap();
		assert_eq!(trades.len(), 1);
		assert_eq!(trades[0].tx_hash, "0xsettlement");
		assert_eq!(trades[0].block_number, 101);
	}
}
