//! TXT query primitive tests.
//!
//! Hickory transport tests talk to a DNS responder bound on the loopback
//! interface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use hickory_resolver::proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_resolver::proto::rr::rdata::TXT;
use hickory_resolver::proto::rr::{RData, Record};
use parking_lot::Mutex;
use tokio::net::UdpSocket;

use horizon_lattice_dnsaddr::transport::{
    HickoryTransport, MemoryTransport, ShutdownSignal, TxtQuery, TxtTransport, lookup_txt,
};
use horizon_lattice_dnsaddr::{
    DnsAddrConfig, DnsAddrResolver, Error, Multiaddr, NameServerProtocol, TxtEntry,
};

const PEER: &str = "QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN";

/// A UDP DNS server on 127.0.0.1 that records every question it receives.
struct Responder {
    addr: SocketAddr,
    count: Arc<AtomicUsize>,
    names: Arc<Mutex<Vec<String>>>,
}

impl Responder {
    /// Answer each request with `respond`, or stay silent when it returns `None`.
    async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Message) -> Option<Message> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind responder socket");
        let addr = socket.local_addr().expect("Failed to get local address");
        let count = Arc::new(AtomicUsize::new(0));
        let names = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&count);
        let seen_names = Arc::clone(&names);
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let Ok(request) = Message::from_vec(&buf[..len]) else {
                    continue;
                };
                seen.fetch_add(1, Ordering::SeqCst);
                if let Some(query) = request.queries().first() {
                    seen_names.lock().push(query.name().to_string());
                }
                if let Some(response) = respond(&request) {
                    let bytes = response.to_vec().expect("Failed to encode response");
                    let _ = socket.send_to(&bytes, peer).await;
                }
            }
        });

        Self { addr, count, names }
    }

    fn transport(&self, timeout: Duration) -> HickoryTransport {
        HickoryTransport::pinned(&[self.addr], NameServerProtocol::Udp, timeout)
            .expect("Failed to create pinned transport")
    }

    fn config(&self) -> DnsAddrConfig {
        DnsAddrConfig::with_nameservers(vec![self.addr]).protocol(NameServerProtocol::Udp)
    }

    fn query_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }
}

fn reply(request: &Message, code: ResponseCode, answers: Vec<Record>) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(true)
        .set_response_code(code);
    response.add_queries(request.queries().to_vec());
    response.add_answers(answers);
    response
}

/// One TXT record per entry of `records`, each made of the given character-strings.
fn txt_reply(request: &Message, records: &[&[&str]]) -> Message {
    let Some(name) = request.queries().first().map(|q| q.name().clone()) else {
        return reply(request, ResponseCode::FormErr, Vec::new());
    };
    let answers = records
        .iter()
        .map(|strings| {
            let txt = TXT::from_bytes(strings.iter().map(|s| s.as_bytes()).collect());
            Record::from_rdata(name.clone(), 60, RData::TXT(txt))
        })
        .collect();
    reply(request, ResponseCode::NoError, answers)
}

#[tokio::test]
async fn test_lookup_returns_entries_in_order() {
    let transport = MemoryTransport::new().with_txt(
        "_dnsaddr.example.com",
        ["dnsaddr=/ip4/192.0.2.1/tcp/1", "other=x", "dnsaddr=/ip4/192.0.2.2/tcp/2"],
    );
    let query = TxtQuery::dnsaddr("example.com", Duration::from_secs(1));

    let answer = lookup_txt(&transport, &query, &mut ShutdownSignal::never())
        .await
        .unwrap();
    assert_eq!(answer.name, "_dnsaddr.example.com");
    assert_eq!(
        answer.entries,
        vec![
            TxtEntry::new("dnsaddr", "/ip4/192.0.2.1/tcp/1"),
            TxtEntry::new("other", "x"),
            TxtEntry::new("dnsaddr", "/ip4/192.0.2.2/tcp/2"),
        ]
    );
}

#[tokio::test]
async fn test_value_keeps_later_separators() {
    let transport = MemoryTransport::new().with_txt("_dnsaddr.eq.example", ["dnsaddr=a=b=c"]);
    let query = TxtQuery::dnsaddr("eq.example", Duration::from_secs(1));

    let answer = lookup_txt(&transport, &query, &mut ShutdownSignal::never())
        .await
        .unwrap();
    assert_eq!(answer.entries, vec![TxtEntry::new("dnsaddr", "a=b=c")]);
}

#[tokio::test]
async fn test_lookup_timeout() {
    let transport = MemoryTransport::new();
    transport.stall("_dnsaddr.slow.example");
    let query = TxtQuery::dnsaddr("slow.example", Duration::from_millis(5));

    let start = Instant::now();
    let result = lookup_txt(&transport, &query, &mut ShutdownSignal::never()).await;
    assert!(matches!(result, Err(Error::Timeout { .. })));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_lookup_failure() {
    let transport = MemoryTransport::new();
    transport.fail("_dnsaddr.bad.example", "connection refused");
    let query = TxtQuery::dnsaddr("bad.example", Duration::from_secs(1));

    let err = lookup_txt(&transport, &query, &mut ShutdownSignal::never())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::query_failed("_dnsaddr.bad.example", "connection refused")
    );
}

#[tokio::test]
async fn test_answer_display() {
    let transport = MemoryTransport::new().with_txt(
        "_dnsaddr.example.com",
        ["dnsaddr=/ip4/192.0.2.1/tcp/1", "dnsaddr=/ip4/192.0.2.2/tcp/2"],
    );
    let query = TxtQuery::dnsaddr("example.com", Duration::from_secs(1));
    let answer = lookup_txt(&transport, &query, &mut ShutdownSignal::never())
        .await
        .unwrap();

    let text = answer.to_string();
    assert!(text.starts_with("Query for: _dnsaddr.example.com"));
    assert!(text.contains("Record Count: 2"));
    assert!(text.contains("dnsaddr=/ip4/192.0.2.2/tcp/2"));
}

#[tokio::test]
async fn test_hickory_transport_from_config() {
    let transport = HickoryTransport::from_config(&DnsAddrConfig::google()).unwrap();
    assert_eq!(transport.kind(), "pinned");

    let tcp = DnsAddrConfig::cloudflare().protocol(NameServerProtocol::Tcp);
    assert!(HickoryTransport::from_config(&tcp).is_ok());

    let empty = DnsAddrConfig::with_nameservers(Vec::new());
    assert!(matches!(
        HickoryTransport::from_config(&empty),
        Err(Error::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_system_transport_creation() {
    // Containers without /etc/resolv.conf report an unsupported platform
    match HickoryTransport::system(Duration::from_secs(3)) {
        Ok(transport) => assert_eq!(transport.kind(), "system"),
        Err(e) => assert_eq!(e, Error::UnsupportedPlatform),
    }
}

#[tokio::test]
async fn test_hickory_concatenates_character_strings() {
    let tail = format!("/tcp/4001/p2p/{PEER}");
    let responder = Responder::start(move |request| {
        Some(txt_reply(
            request,
            &[
                &["dnsaddr=/ip4/192.0.2.1", tail.as_str()],
                &["dnsaddr=/ip4/192.0.2.2/tcp/4001"],
            ],
        ))
    })
    .await;
    let transport = responder.transport(Duration::from_secs(2));
    let query = TxtQuery::dnsaddr("chunked.example", Duration::from_secs(2));

    let answer = lookup_txt(&transport, &query, &mut ShutdownSignal::never())
        .await
        .unwrap();
    assert_eq!(answer.entries.len(), 2);
    assert!(answer.entries.contains(&TxtEntry::new(
        "dnsaddr",
        format!("/ip4/192.0.2.1/tcp/4001/p2p/{PEER}")
    )));
    assert!(answer
        .entries
        .contains(&TxtEntry::new("dnsaddr", "/ip4/192.0.2.2/tcp/4001")));
}

#[tokio::test]
async fn test_hickory_nxdomain_is_empty() {
    let responder =
        Responder::start(|request| Some(reply(request, ResponseCode::NXDomain, Vec::new()))).await;
    let transport = responder.transport(Duration::from_secs(2));

    let entries = transport.query("_dnsaddr.missing.example").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_hickory_sends_one_absolute_query() {
    let responder =
        Responder::start(|request| Some(reply(request, ResponseCode::NXDomain, Vec::new()))).await;
    let transport = responder.transport(Duration::from_secs(2));

    transport.query("_dnsaddr.x.example").await.unwrap();

    assert_eq!(responder.query_count(), 1);
    let names = responder.names();
    assert_eq!(names.len(), 1);
    assert!(names[0].eq_ignore_ascii_case("_dnsaddr.x.example."));
}

#[tokio::test]
async fn test_hickory_silent_server_times_out() {
    let responder = Responder::start(|_| None).await;
    let transport = responder.transport(Duration::from_millis(50));
    let query = TxtQuery::dnsaddr("bootstrap.libp2p.io", Duration::from_millis(50));

    let start = Instant::now();
    let result = lookup_txt(&transport, &query, &mut ShutdownSignal::never()).await;
    assert_eq!(
        result,
        Err(Error::Timeout {
            name: "_dnsaddr.bootstrap.libp2p.io".to_string(),
            timeout: Duration::from_millis(50),
        })
    );
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_resolve_over_hickory() {
    let nested = format!("dnsaddr=/dnsaddr/sv15.example/p2p/{PEER}");
    let concrete = format!("dnsaddr=/ip4/139.178.91.71/tcp/4001/p2p/{PEER}");
    let responder = Responder::start(move |request| {
        let name = request.queries().first()?.name().to_string().to_ascii_lowercase();
        match name.as_str() {
            "_dnsaddr.bootstrap.example." => Some(txt_reply(request, &[&[nested.as_str()]])),
            "_dnsaddr.sv15.example." => Some(txt_reply(request, &[&[concrete.as_str()]])),
            _ => Some(reply(request, ResponseCode::NXDomain, Vec::new())),
        }
    })
    .await;

    let resolver = DnsAddrResolver::new(responder.config());
    resolver.start().unwrap();
    let resolved = resolver
        .resolve_str(&format!("/dnsaddr/bootstrap.example/p2p/{PEER}"))
        .await
        .unwrap();

    let expected: Multiaddr = format!("/ip4/139.178.91.71/tcp/4001/p2p/{PEER}")
        .parse()
        .unwrap();
    assert_eq!(resolved, vec![expected]);
    assert_eq!(responder.query_count(), 2);
}

#[tokio::test]
async fn test_stop_cancels_hickory_lookup() {
    let responder = Responder::start(|_| None).await;
    let resolver = DnsAddrResolver::new(responder.config());
    resolver.start().unwrap();

    let handle = resolver.spawn_resolve(
        format!("/dnsaddr/slow.example/p2p/{PEER}")
            .parse()
            .unwrap(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    resolver.stop();

    let result = tokio::time::timeout(Duration::from_secs(1), handle.join())
        .await
        .expect("stop should end the resolution promptly");
    assert_eq!(result, Err(Error::Cancelled));
}
