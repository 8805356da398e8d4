//! `ssserver`: thin accept-loop binary wiring config, logging, and the
//! decorator together. The listener accept-loop itself and the upstream
//! dial target resolution are external collaborators per `spec.md` §1 —
//! this binary demonstrates the wiring a real deployment would do, kept
//! intentionally small.

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Arg, Command};
use log::{error, info, warn};
use tokio::net::TcpListener;

use ssr_protocol::kdf::derive_master_key;
use ssr_protocol::CipherKind;
use ssr_service::config::Config;
use ssr_service::copy::{duplex_copy, spawn_guarded};
use ssr_service::decorator::{split_decorator, Decorator, EncryptionCodec};
use ssr_service::obfs::ObfsKind;
use ssr_service::protocol::ProtocolKind;
use ssr_service::server_info::ServerInfo;
use ssr_service::traffic::NullReporter;

fn parse_args() -> String {
    let matches = Command::new("ssserver")
        .about("ShadowsocksR server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("path to a json5 config file")
                .default_value("config.json5"),
        )
        .get_matches();

    matches.get_one::<String>("config").unwrap().clone()
}

async fn handle_connection(socket: tokio::net::TcpStream, config: Arc<Config>) {
    let kind = match CipherKind::from_name(&config.method) {
        Ok(k) => k,
        Err(e) => {
            error!("rejecting connection: {e}");
            return;
        }
    };
    let key = derive_master_key(&config.password, kind.key_len());

    let server_info_inner = ssr_service::server_info::ServerInfoInner {
        key: key.clone(),
        key_str: config.password.clone(),
        obfs_param: config.obfs_param.clone(),
        protocol_param: config.protocol_param.clone(),
        users: config.users.clone(),
        overhead: ssr_service::server_info::DEFAULT_HEAD_LEN,
        buffer_size: ssr_service::server_info::BUF_SIZE,
        tcp_mss: ssr_service::server_info::TCP_MSS,
        ..Default::default()
    };
    let server_info = ServerInfo::new(server_info_inner);

    let obfs = match ObfsKind::new(&config.obfs_method, server_info.clone()) {
        Ok(o) => o,
        Err(e) => {
            warn!("obfuscation setup rejected: {e}");
            return;
        }
    };
    let protocol = match ProtocolKind::new(&config.protocol_method, server_info.clone()) {
        Ok(p) => p,
        Err(e) => {
            warn!("sub-protocol setup rejected: {e}");
            return;
        }
    };
    let encryption = EncryptionCodec::new(kind, key);

    let mut decorator = Decorator::new(socket, obfs, protocol, encryption, server_info, config.single, 0, Arc::new(NullReporter));

    // Peek the destination address the client wants to reach, per the
    // SOCKS-style address header every plaintext payload starts with.
    let mut header_buf = vec![0u8; 512];
    let n = match decorator.read(&mut header_buf).await {
        Ok(0) => return,
        Ok(n) => n,
        Err(e) => {
            warn!("handshake failed: {e}");
            return;
        }
    };

    let (address, consumed) = match ssr_protocol::socks::Address::parse(&header_buf[..n]) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("could not parse target address: {e}");
            return;
        }
    };

    info!("proxying to {address}");

    let upstream = match tokio::net::TcpStream::connect(address.to_string()).await {
        Ok(s) => s,
        Err(e) => {
            warn!("could not reach upstream {address}: {e}");
            return;
        }
    };

    let leftover = header_buf[consumed..n].to_vec();

    let (mut upstream_read, mut upstream_write) = upstream.into_split();
    if !leftover.is_empty() {
        use tokio::io::AsyncWriteExt;
        if upstream_write.write_all(&leftover).await.is_err() {
            return;
        }
    }

    // The decorator owns its socket exclusively and isn't itself
    // `AsyncRead`/`AsyncWrite`, so it is split into a mutex-shared
    // read/write pair (`split_decorator`) before handing both directions
    // to the shared `duplex_copy` engine alongside the already-split
    // upstream socket.
    let (decorator_read, decorator_write) = split_decorator(decorator);

    match duplex_copy(decorator_read, decorator_write, upstream_read, upstream_write).await {
        Ok((to_upstream, to_client)) => {
            info!("connection closed: {to_upstream} bytes to upstream, {to_client} bytes to client");
        }
        Err(e) => warn!("duplex copy ended with error: {e}"),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config_path = parse_args();
    let text = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        error!("could not read config {config_path}: {e}, falling back to an empty default");
        r#"{ method: "aes-256-gcm", password: "", }"#.to_owned()
    });
    let config = Config::from_json5(&text).unwrap_or_else(|e| {
        panic!("invalid config {config_path}: {e}");
    });
    let config = Arc::new(config);

    let listen_addr: SocketAddr = config.tcp_listen.parse().expect("tcp_listen must be a valid socket address");
    let listener = TcpListener::bind(listen_addr).await?;
    info!("ssserver listening on {listen_addr}");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };
        info!("accepted connection from {peer}");

        let config = config.clone();
        spawn_guarded(async move {
            handle_connection(socket, config).await;
            Ok(0)
        });
    }
}
