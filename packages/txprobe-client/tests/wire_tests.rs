//! Client tests against the mock warehouse endpoint over real HTTP.

use std::future::Future;
use std::sync::Arc;

use ntest::timeout;
use tokio::net::TcpListener;

use txprobe_client::WarehouseConnector;
use txprobe_core::harness::Outcome;
use txprobe_core::sim::{codes, SimulatedWarehouse, TransactionModel};
use txprobe_core::statement;
use txprobe_core::{
    ConnectionConfig, Connector, Executor, ProbeError, RunDriver, SessionTarget,
};
use txprobe_mock::{build_router, serve_listener, MockConfig};

const EXPECTED: &str = "There are 2 rows in the table, thus transactions work as expected.";

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Starts a mock endpoint on an ephemeral port.
///
/// Returns a client configuration pointing at it and the backing warehouse.
async fn start_mock(mock: MockConfig) -> (ConnectionConfig, SimulatedWarehouse) {
    let mut config = ConnectionConfig::new(&mock.account, &mock.username, &mock.password);
    let router = build_router(mock);
    let warehouse = router.state().warehouse.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_listener(listener, Arc::new(router)));

    config.base_url = Some(format!("http://{}/", addr));
    config.request_timeout_ms = 2000;
    (config, warehouse)
}

#[timeout(10000)]
#[test]
fn test_login_and_count() {
    block_on(async {
        let (config, _) = start_mock(MockConfig::default()).await;
        let connector = WarehouseConnector::new(config).unwrap();
        let session = connector.connect(&SessionTarget::default()).await.unwrap();

        session.execute(statement::CREATE_TABLE).await.unwrap();
        session.execute(&statement::insert_value(1)).await.unwrap();
        assert_eq!(session.count().await.unwrap(), 1);
        session.execute(statement::ROLLBACK).await.unwrap();
        assert_eq!(session.count().await.unwrap(), 0);
        session.execute(statement::DROP_TABLE).await.unwrap();
    });
}

#[timeout(10000)]
#[test]
fn test_bad_password_is_connection_error() {
    block_on(async {
        let (mut config, _) = start_mock(MockConfig::default()).await;
        config.password = "wrong".to_string();
        let connector = WarehouseConnector::new(config).unwrap();

        let err = connector
            .connect(&SessionTarget::default())
            .await
            .unwrap_err();
        match err {
            ProbeError::Connection(msg) => assert!(msg.contains("390100"), "{}", msg),
            other => panic!("expected connection error, got {:?}", other),
        }
    });
}

#[timeout(10000)]
#[test]
fn test_unknown_database_is_connection_error() {
    block_on(async {
        let (config, _) = start_mock(MockConfig::default()).await;
        let connector = WarehouseConnector::new(config).unwrap();

        let err = connector
            .connect(&SessionTarget::new("NO_SUCH_DB", "PUBLIC"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Connection(_)));
    });
}

#[timeout(10000)]
#[test]
fn test_statement_rejection_carries_code() {
    block_on(async {
        let (config, _) = start_mock(MockConfig::default()).await;
        let connector = WarehouseConnector::new(config).unwrap();
        let session = connector.connect(&SessionTarget::default()).await.unwrap();

        session.execute(statement::CREATE_TABLE).await.unwrap();
        let sql = statement::insert(statement::MALFORMED_VALUE);
        let err = session.execute(&sql).await.unwrap_err();
        assert_eq!(err.code(), Some(codes::NUMERIC_VALUE));
        match err {
            ProbeError::Statement { sql: failed, .. } => assert_eq!(failed, sql),
            other => panic!("expected statement error, got {:?}", other),
        }

        // the session stays usable after a rejection
        session.execute(statement::DROP_TABLE).await.unwrap();
    });
}

#[timeout(10000)]
#[test]
fn test_result_polling() {
    block_on(async {
        let mock = MockConfig {
            result_polls: 2,
            ..MockConfig::default()
        };
        let (config, _) = start_mock(mock).await;
        let connector = WarehouseConnector::new(config).unwrap();
        let session = connector.connect(&SessionTarget::default()).await.unwrap();

        session.execute(statement::CREATE_TABLE).await.unwrap();
        assert_eq!(session.count().await.unwrap(), 0);
        session.execute(statement::DROP_TABLE).await.unwrap();
    });
}

#[timeout(10000)]
#[test]
fn test_sessions_are_isolated() {
    block_on(async {
        let (config, _) = start_mock(MockConfig::default()).await;
        let connector = WarehouseConnector::new(config).unwrap();
        let writer = connector.connect(&SessionTarget::default()).await.unwrap();
        let reader = connector.connect(&SessionTarget::default()).await.unwrap();

        writer.execute(statement::CREATE_TABLE).await.unwrap();
        writer.execute(&statement::insert_value(7)).await.unwrap();
        assert_eq!(writer.count().await.unwrap(), 1);
        assert_eq!(reader.count().await.unwrap(), 0);

        writer.execute(statement::COMMIT).await.unwrap();
        assert_eq!(reader.count().await.unwrap(), 1);
        reader.execute(statement::DROP_TABLE).await.unwrap();
    });
}

#[timeout(10000)]
#[test]
fn test_full_run_over_http() {
    block_on(async {
        let (config, warehouse) = start_mock(MockConfig::default()).await;
        let target = config.target.clone();
        let connector = WarehouseConnector::new(config).unwrap();
        let driver = RunDriver::new(connector, target.clone(), None);
        let mut out = Vec::new();

        let report = driver.run(&mut out).await.unwrap();

        let expected = format!(
            "Running the test with the default connection.\n{e}\n\n\
             Running the test with explicit BEGIN statements.\n{e}\n\n\
             Running the test without autocommit.\n{e}\nDone\n",
            e = EXPECTED
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
        assert!(report
            .stages
            .iter()
            .all(|(_, r)| r.outcome == Outcome::Expected));
        assert!(!warehouse
            .table_exists(&target, statement::TEST_TABLE)
            .unwrap());
    });
}

#[timeout(10000)]
#[test]
fn test_full_run_flags_statement_autocommit() {
    block_on(async {
        let mock = MockConfig {
            model: TransactionModel::StatementAutocommit,
            ..MockConfig::default()
        };
        let (config, _) = start_mock(mock).await;
        let target = config.target.clone();
        let driver = RunDriver::new(WarehouseConnector::new(config).unwrap(), target, None);
        let mut out = Vec::new();

        driver.run(&mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("There are 4 rows in the table, thus transactions don't work.\n"));
        assert!(text.ends_with("Done\n"));
    });
}
