use std::net::SocketAddr;
use std::sync::Arc;

use http::{Method, StatusCode, Uri, Version};
use micro_exchange::Request;
use micro_exchange::connection::{Connection, PendingWrite, SecureSession};
use micro_exchange::protocol::ErrorKind;
use mockall::mock;
use mockall::predicate::always;

mock! {
    pub Conn {}

    impl Connection for Conn {
        fn id(&self) -> u64;
        fn peer_addr(&self) -> Option<SocketAddr>;
        fn is_connected(&self) -> bool;
        fn is_incoming(&self) -> bool;
        fn secure_session(&self) -> Option<SecureSession>;
        fn write_request(&self, write: PendingWrite);
    }
}

fn request(connection: MockConn) -> Request {
    Request::incoming(Arc::new(connection), Method::GET, Uri::from_static("/"), Version::HTTP_11)
}

#[tokio::test]
async fn each_chunk_is_one_write() {
    let mut connection = MockConn::new();
    connection.expect_id().return_const(42u64);
    connection
        .expect_write_request()
        .withf(|write| write.exchange_id == 42 && write.keep_open)
        .times(3)
        .returning(|write| write.complete(true));
    connection
        .expect_write_request()
        .withf(|write| !write.keep_open && &write.bytes[..] == b"0\r\n\r\n")
        .times(1)
        .returning(|write| write.complete(true));

    let mut request = request(connection);
    request.start_chunked(StatusCode::OK).unwrap();
    request.send_chunk("a").unwrap();
    request.send_chunk("b").unwrap();
    request.end_chunked().unwrap();

    request.flushed().await.unwrap();
    assert!(request.bytes_written() > 0);
}

#[tokio::test]
async fn failed_write_is_sticky() {
    let mut connection = MockConn::new();
    connection.expect_id().return_const(1u64);
    connection.expect_write_request().with(always()).times(1).returning(|write| write.complete(false));

    let mut request = request(connection);
    request.reply(StatusCode::OK).unwrap();

    assert_eq!(request.flushed().await.unwrap_err().kind(), ErrorKind::TransportFailure);
    assert!(request.has_connection_error());
    assert!(!request.is_ok());
}

#[test]
fn secure_session_and_peer_come_from_connection() {
    let mut connection = MockConn::new();
    connection.expect_id().return_const(5u64);
    connection.expect_is_connected().return_const(true);
    connection.expect_peer_addr().returning(|| "10.0.0.1:443".parse().ok());
    connection.expect_secure_session().returning(|| {
        Some(SecureSession { protocol: "TLSv1.3".into(), cipher: "TLS_AES_128_GCM_SHA256".into(), peer_subject: None })
    });

    let request = request(connection);
    assert!(request.is_connected());
    assert!(request.is_secure());
    assert_eq!(request.client_addr().map(|a| a.port()), Some(443));
    assert_eq!(request.secure_session().unwrap().protocol, "TLSv1.3");
    assert_eq!(request.log_prefix().to_string(), "REQ5:");
}
