mod common;

/// End-to-end scenarios against a real `Server` bound to a loopback port,
/// exercised with raw framed bytes (mirroring the literal-byte scenarios in
/// the base spec) and with independent client stacks (`async-socks5`,
/// `reqwest`) for the higher-level relay/concurrency checks.
mod socks5_proxy {

    use crate::common::{
        self,
        listeners::{self, cancel_listener, AsyncListener},
        next_available_address, utils,
    };
    use futures::{stream::FuturesUnordered, StreamExt};
    use httptest::{matchers::request::method_path, responders::status_code, Expectation, ServerBuilder};
    use log::info;
    use socks5_relay::auth::{AuthHandler, CredentialStore, InMemoryCredentialStore};
    use std::sync::Arc;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    #[tokio::test]
    async fn single_client_http_through_proxy() {
        common::init_logging();

        let proxy_addr = next_available_address();
        let http_server_addr = next_available_address();

        let proxy = listeners::Socks5ServerListener::new(proxy_addr);
        let proxy = proxy.run().await;

        let http_server = ServerBuilder::new()
            .bind_addr(http_server_addr)
            .run()
            .expect("unable to bind HTTP server");

        http_server.expect(Expectation::matching(method_path("GET", "/hello_world")).respond_with(status_code(200)));

        let response = utils::http::create_http_client_with_proxy(common::socks5_proxy(proxy_addr))
            .get(http_server.url_str("/hello_world").to_string())
            .send()
            .await
            .expect("unable to send GET request to HTTP server through proxy");

        assert_eq!(200, response.status());

        cancel_listener!(proxy);
    }

    // S1 — NoAuth CONNECT to IPv4, success: arbitrary payload bytes flow in
    // both directions verbatim until EOF, exercised concurrently across many
    // independent clients.
    #[tokio::test]
    async fn multiple_clients_relay_arbitrary_bytes() {
        common::init_logging();

        let num_clients = 100;
        let proxy_addr = next_available_address();
        let echo_server_addr = next_available_address();

        let proxy = listeners::Socks5ServerListener::new(proxy_addr);
        let proxy = proxy.run().await;

        let echo = listeners::tcp_echo_server::TcpEchoServer::bind(echo_server_addr).await;
        let echo = echo.run().await;

        let client_tasks: FuturesUnordered<_> = (0..num_clients)
            .map(|i| async move {
                info!("started client #{i}");
                common::ping_pong_data_through_socks5(echo_server_addr, proxy_addr).await;
                info!("finished client #{i}");
            })
            .collect();

        client_tasks.collect::<()>().await;

        cancel_listener!(proxy);
        cancel_listener!(echo);
    }

    // S2/S3 — RFC 1929 username/password negotiation, success and failure,
    // against the literal greeting/sub-negotiation bytes from base spec §8.
    #[tokio::test]
    async fn userpassword_success_then_relays() {
        common::init_logging();

        let store = Arc::new(InMemoryCredentialStore::new());
        store.add("alice", "s3cret", false).await.unwrap();

        let proxy_addr = next_available_address();
        let echo_server_addr = next_available_address();

        let auth_handlers: Arc<[AuthHandler]> = Arc::from(vec![AuthHandler::UserPassword(store)]);
        let proxy = listeners::Socks5ServerListener::with_auth_handlers(proxy_addr, auth_handlers);
        let proxy = proxy.run().await;

        let echo = listeners::tcp_echo_server::TcpEchoServer::bind(echo_server_addr).await;
        let echo = echo.run().await;

        let mut stream = TcpStream::connect(proxy_addr).await.unwrap();

        // Greeting: offer UserPassword only.
        stream.write_all(&[0x05, 0x01, 0x02]).await.unwrap();
        let mut method_sel = [0u8; 2];
        stream.read_exact(&mut method_sel).await.unwrap();
        assert_eq!([0x05, 0x02], method_sel);

        // RFC 1929 sub-negotiation: ULEN=5 "alice", PLEN=6 "s3cret".
        stream
            .write_all(&[0x01, 0x05, b'a', b'l', b'i', b'c', b'e', 0x06, b's', b'3', b'c', b'r', b'e', b't'])
            .await
            .unwrap();
        let mut auth_reply = [0u8; 2];
        stream.read_exact(&mut auth_reply).await.unwrap();
        assert_eq!([0x01, 0x00], auth_reply);

        // CONNECT to the echo server's IPv4 loopback address.
        let echo_port = echo_server_addr.port().to_be_bytes();
        let mut request = vec![0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1];
        request.extend_from_slice(&echo_port);
        stream.write_all(&request).await.unwrap();

        let mut reply = [0u8; 10];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!([0x05, 0x00, 0x00, 0x01], &reply[0..4]);

        // Relay is live: payload echoes back verbatim.
        let payload = utils::generate_data(256);
        stream.write_all(&payload).await.unwrap();
        let mut echoed = vec![0u8; 256];
        stream.read_exact(&mut echoed).await.unwrap();
        assert_eq!(payload, echoed);

        cancel_listener!(proxy);
        cancel_listener!(echo);
    }

    #[tokio::test]
    async fn userpassword_failure_closes_connection() {
        common::init_logging();

        let store = Arc::new(InMemoryCredentialStore::new());
        store.add("alice", "s3cret", false).await.unwrap();

        let proxy_addr = next_available_address();
        let auth_handlers: Arc<[AuthHandler]> = Arc::from(vec![AuthHandler::UserPassword(store)]);
        let proxy = listeners::Socks5ServerListener::with_auth_handlers(proxy_addr, auth_handlers);
        let proxy = proxy.run().await;

        let mut stream = TcpStream::connect(proxy_addr).await.unwrap();

        stream.write_all(&[0x05, 0x01, 0x02]).await.unwrap();
        let mut method_sel = [0u8; 2];
        stream.read_exact(&mut method_sel).await.unwrap();
        assert_eq!([0x05, 0x02], method_sel);

        // Wrong password.
        stream
            .write_all(&[0x01, 0x05, b'a', b'l', b'i', b'c', b'e', 0x03, b'b', b'a', b'd'])
            .await
            .unwrap();
        let mut auth_reply = [0u8; 2];
        stream.read_exact(&mut auth_reply).await.unwrap();
        assert_eq!([0x01, 0x01], auth_reply);

        // Server closes without sending anything further.
        let mut probe = [0u8; 1];
        let n = stream.read(&mut probe).await.unwrap();
        assert_eq!(0, n);

        cancel_listener!(proxy);
    }

    // S4 — client offers only GSSAPI, server only supports NoAuth: server
    // replies 0x05 0xFF and closes.
    #[tokio::test]
    async fn no_acceptable_auth_method_closes_connection() {
        common::init_logging();

        let proxy_addr = next_available_address();
        let proxy = listeners::Socks5ServerListener::new(proxy_addr);
        let proxy = proxy.run().await;

        let mut stream = TcpStream::connect(proxy_addr).await.unwrap();
        stream.write_all(&[0x05, 0x01, 0x01]).await.unwrap();

        let mut reply = [0u8; 2];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!([0x05, 0xFF], reply);

        let mut probe = [0u8; 1];
        let n = stream.read(&mut probe).await.unwrap();
        assert_eq!(0, n);

        cancel_listener!(proxy);
    }

    // S5 — CONNECT supported, client sends BIND: server replies
    // COMMAND_NOT_SUPPORTED (0x07) with a zeroed bound address, then closes.
    #[tokio::test]
    async fn unsupported_command_replies_and_closes() {
        common::init_logging();

        let proxy_addr = next_available_address();
        let proxy = listeners::Socks5ServerListener::new(proxy_addr);
        let proxy = proxy.run().await;

        let mut stream = TcpStream::connect(proxy_addr).await.unwrap();
        stream.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut method_sel = [0u8; 2];
        stream.read_exact(&mut method_sel).await.unwrap();
        assert_eq!([0x05, 0x00], method_sel);

        // BIND (0x02) to 127.0.0.1:80.
        stream.write_all(&[0x05, 0x02, 0x00, 0x01, 127, 0, 0, 1, 0x00, 0x50]).await.unwrap();

        let mut reply = [0u8; 10];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!([0x05, 0x07, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], reply);

        let mut probe = [0u8; 1];
        let n = stream.read(&mut probe).await.unwrap();
        assert_eq!(0, n);

        cancel_listener!(proxy);
    }

    // S6 — unsupported ATYP: server replies ADDRESS_TYPE_NOT_SUPPORTED
    // (0x08) with a zeroed bound address, then closes.
    #[tokio::test]
    async fn unsupported_address_type_replies_and_closes() {
        common::init_logging();

        let proxy_addr = next_available_address();
        let proxy = listeners::Socks5ServerListener::new(proxy_addr);
        let proxy = proxy.run().await;

        let mut stream = TcpStream::connect(proxy_addr).await.unwrap();
        stream.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut method_sel = [0u8; 2];
        stream.read_exact(&mut method_sel).await.unwrap();
        assert_eq!([0x05, 0x00], method_sel);

        // ATYP 0x05 is not a value RFC 1928 defines.
        stream.write_all(&[0x05, 0x01, 0x00, 0x05, 0x00, 0x00]).await.unwrap();

        let mut reply = [0u8; 10];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!([0x05, 0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], reply);

        cancel_listener!(proxy);
    }
}
