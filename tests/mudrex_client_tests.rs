mod harness;

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;

use harness::mudrex_stub::{MudrexStub, BAD_SECRET};
use harness::temp_db::TempDb;
use signalbot::adapter::outbound::mudrex::{MudrexConfig, MudrexConnector};
use signalbot::application::broadcast::SignalBroadcaster;
use signalbot::domain::signal::{OrderType, Side};
use signalbot::domain::subscriber::ApiCredentials;
use signalbot::domain::trade::TradeStatus;
use signalbot::error::ExchangeError;
use signalbot::port::outbound::exchange::{ExchangeConnector, MarginType, OrderRequest};
use signalbot::port::outbound::store::SubscriberStore;
use signalbot::testkit::domain::{market_signal, new_subscriber};

fn connector(base_url: String) -> MudrexConnector {
    let mut config = MudrexConfig::default();
    config.base_url = base_url;
    config.http.retry_backoff_ms = 0;
    MudrexConnector::from_config(&config)
}

fn account(secret: &str) -> ApiCredentials {
    ApiCredentials::new("api-key-unused", secret)
}

#[tokio::test]
async fn balance_and_asset_lookup() {
    let (stub, base_url) = MudrexStub::start("500.25").await;
    let exchange = connector(base_url).connect(&account("good-secret-0001"));

    assert_eq!(exchange.futures_balance().await.unwrap(), dec!(500.25));

    let xrp = exchange.asset("XRPUSDT").await.unwrap().unwrap();
    assert_eq!(xrp.quantity_step, dec!(0.1));
    assert_eq!(xrp.min_quantity, dec!(1));
    assert_eq!(xrp.last_price, Some(dec!(2)));

    assert!(exchange.asset("NOPEUSDT").await.unwrap().is_none());

    let requests = stub.requests();
    assert_eq!(requests[0].path, "/futures/funds");
    assert!(requests
        .iter()
        .all(|r| r.auth.as_deref() == Some("good-secret-0001")));
}

#[tokio::test]
async fn rejected_secret_is_an_auth_failure() {
    let (_stub, base_url) = MudrexStub::start("500").await;
    let exchange = connector(base_url).connect(&account(BAD_SECRET));

    match exchange.futures_balance().await {
        Err(ExchangeError::AuthFailed(message)) => assert_eq!(message, "invalid api secret"),
        other => panic!("expected auth failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_exchange_is_a_transport_error() {
    let exchange = connector("http://127.0.0.1:1/fapi/v1".to_string())
        .connect(&account("good-secret-0001"));

    let err = exchange.futures_balance().await.unwrap_err();
    assert!(matches!(
        err,
        ExchangeError::Transport(_) | ExchangeError::Timeout
    ));
}

#[tokio::test]
async fn order_lifecycle_wire_format() {
    let (stub, base_url) = MudrexStub::start("500").await;
    let exchange = connector(base_url).connect(&account("good-secret-0001"));

    exchange
        .set_leverage("XRPUSDT", 10, MarginType::Isolated)
        .await
        .unwrap();
    let leverage = stub.requests_to("/XRPUSDT/leverage");
    assert_eq!(
        leverage[0].body,
        json!({"margin_type": "ISOLATED", "leverage": "10"})
    );

    let order = exchange
        .place_order(&OrderRequest {
            symbol: "XRPUSDT".into(),
            side: Side::Short,
            order_type: OrderType::Limit,
            quantity: dec!(25.0),
            price: Some(dec!(2.50)),
            leverage: 10,
        })
        .await
        .unwrap();
    assert_eq!(order.order_id, "ORD-1");
    let body = &stub.requests_to("/XRPUSDT/order")[0].body;
    assert_eq!(body["quantity"], "25");
    assert_eq!(body["order_type"], "SHORT");
    assert_eq!(body["trigger_type"], "LIMIT");
    assert_eq!(body["order_price"], "2.5");
    assert_eq!(body["reduce_only"], false);

    let position = exchange.position_for_symbol("xrpusdt").await.unwrap().unwrap();
    assert_eq!(position.position_id, "POS-XRPUSDT");
    assert_eq!(position.side, Some(Side::Short));
    assert_eq!(position.quantity, dec!(25));

    exchange
        .set_risk_order(&position.position_id, Some(dec!(2.8)), None)
        .await
        .unwrap();
    assert_eq!(
        stub.requests_to("/riskorder")[0].body,
        json!({"is_stoploss": true, "is_takeprofit": false, "stoploss_price": "2.8"})
    );

    exchange
        .close_partial(&position.position_id, dec!(12.50))
        .await
        .unwrap();
    assert_eq!(
        stub.requests_to("/close/partial")[0].body,
        json!({"quantity": "12.5"})
    );

    exchange.close_position(&position.position_id).await.unwrap();
    assert!(stub.positions().is_empty());
}

#[tokio::test]
async fn broadcast_against_the_exchange_api() {
    let (stub, base_url) = MudrexStub::start("1000").await;
    let db = TempDb::create();
    let store = db.store();

    let mut good = new_subscriber(1, "key-0000000001", dec!(50));
    good.credentials = account("good-secret-0001");
    let mut revoked = new_subscriber(2, "key-0000000002", dec!(50));
    revoked.credentials = account(BAD_SECRET);
    store.upsert_subscriber(&good).await.unwrap();
    store.upsert_subscriber(&revoked).await.unwrap();

    let broadcaster = SignalBroadcaster::new(store, Arc::new(connector(base_url)));
    let results = broadcaster
        .broadcast_signal(&market_signal("SIG-LIVE", "XRPUSDT"))
        .await
        .unwrap();

    assert_eq!(results[0].status, TradeStatus::Success);
    assert_eq!(results[0].order_id.as_deref(), Some("ORD-1"));
    assert_eq!(results[0].quantity.as_deref(), Some("25"));
    assert_eq!(results[1].status, TradeStatus::ApiError);
    assert!(results[1].message.contains("invalid api secret"));

    let order = &stub.requests_to("/XRPUSDT/order")[0].body;
    assert_eq!(order["trigger_type"], "MARKET");
    assert!(order.get("order_price").is_none());
}
