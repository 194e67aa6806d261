//! Device query protocol tests against a simulated device

mod common;

use atermscan::{device::mode, DeviceClient, DeviceProbe, ScanError};
use common::{closed_port, spawn_device, spawn_responder};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::test]
async fn test_identify_device() {
    let device = spawn_device("FooRouter", "2").await;
    let client = DeviceClient::new(device.port).unwrap();

    let found = assert_ok!(client.identify(LOCALHOST).await);

    assert_eq!(found.address, LOCALHOST);
    assert_eq!(found.product_name, "FooRouter");
    assert_eq!(found.system_mode, mode::LOCAL_ROUTER);
    assert_eq!(found.system_mode.code, 2);
    assert_eq!(found.system_mode.name, "Local Router");
    assert_eq!(found.system_mode.name_ja, "ローカルルーター");
}

#[tokio::test]
async fn test_request_format() {
    let device = spawn_device("FooRouter", "2").await;
    let client = DeviceClient::new(device.port).unwrap();
    client.identify(LOCALHOST).await.unwrap();

    let requests = device.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/aterm_httpif.cgi/getparamcmd_no_auth");
        assert_eq!(
            request.content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
    }
    // product name strictly before system mode
    assert_eq!(requests[0].body, "REQ_ID=PRODUCT_NAME_GET");
    assert_eq!(requests[1].body, "REQ_ID=SYS_MODE_GET");
}

#[tokio::test]
async fn test_not_found_is_protocol_error() {
    let responder = spawn_responder(|_| (404, "Not Found".to_string())).await;
    let client = DeviceClient::new(responder.port).unwrap();

    let err = assert_err!(client.identify(LOCALHOST).await);

    assert!(matches!(err, ScanError::Protocol(_)));
    assert!(!err.is_ignorable());
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_failed_product_name_skips_mode_exchange() {
    let responder = spawn_responder(|_| (500, String::new())).await;
    let client = DeviceClient::new(responder.port).unwrap();

    assert_err!(client.identify(LOCALHOST).await);

    let requests = responder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, "REQ_ID=PRODUCT_NAME_GET");
}

#[tokio::test]
async fn test_unexpected_param_name() {
    let responder = spawn_responder(|_| (200, "SOMETHING_ELSE=1".to_string())).await;
    let client = DeviceClient::new(responder.port).unwrap();

    let err = client.fetch_product_name(LOCALHOST).await.unwrap_err();

    assert!(matches!(err, ScanError::Protocol(_)));
    assert!(err.to_string().contains("SOMETHING_ELSE=1"));
}

#[tokio::test]
async fn test_unsupported_mode() {
    let device = spawn_device("FooRouter", "99").await;
    let client = DeviceClient::new(device.port).unwrap();

    let err = client.fetch_system_mode(LOCALHOST).await.unwrap_err();
    assert!(matches!(err, ScanError::UnsupportedMode(99)));
    assert!(err.is_protocol_error());

    let err = client.identify(LOCALHOST).await.unwrap_err();
    assert!(matches!(err, ScanError::UnsupportedMode(99)));
}

#[tokio::test]
async fn test_non_numeric_mode() {
    let device = spawn_device("FooRouter", "bridge").await;
    let client = DeviceClient::new(device.port).unwrap();

    let err = client.fetch_system_mode(LOCALHOST).await.unwrap_err();
    assert!(matches!(err, ScanError::Protocol(_)));
}

#[tokio::test]
async fn test_trimmed_values() {
    let device = spawn_device("  WX3600HP \r", " 10 ").await;
    let client = DeviceClient::new(device.port).unwrap();

    assert_eq!(client.fetch_product_name(LOCALHOST).await.unwrap(), "WX3600HP");
    assert_eq!(client.fetch_system_mode(LOCALHOST).await.unwrap(), mode::MESH_REPEATER);
}

#[tokio::test]
async fn test_connection_refused_is_ignorable() {
    let client = DeviceClient::new(closed_port().await).unwrap();

    let result = timeout(Duration::from_secs(5), client.identify(LOCALHOST)).await;
    let err = result.expect("refused connection should fail fast").unwrap_err();

    assert!(err.is_ignorable(), "unexpected error: {}", err);
}
