//! A supervised loop sending UDP datagrams, with send faults injected.

#![cfg(unix)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tunvisor::{Event, EventKind, FatalHandler, LoopError, Node, NodeConfig};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, String)>>,
}

impl FatalHandler for Recorder {
    fn terminate(&self, source: &str, reason: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_string(), reason.to_string()));
    }
}

struct Harness {
    node: Arc<Node>,
    fatal: Arc<Recorder>,
    inject: Arc<Mutex<Option<io::Error>>>,
    sent: Arc<AtomicU32>,
    _peer: UdpSocket,
}

async fn harness() -> Harness {
    let fatal = Arc::new(Recorder::default());
    let node = Node::builder(NodeConfig::default())
        .with_fatal_handler(fatal.clone())
        .build();

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr: SocketAddr = peer.local_addr().unwrap();
    let sock = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let inject: Arc<Mutex<Option<io::Error>>> = Arc::new(Mutex::new(None));
    let sent = Arc::new(AtomicU32::new(0));

    let (n, i, s) = (Arc::clone(&node), Arc::clone(&inject), Arc::clone(&sent));
    node.run_named_loop("udp-link", move |ctx: CancellationToken| {
        let (node, inject, sent, sock) = (n.clone(), i.clone(), s.clone(), sock.clone());
        async move {
            let injected = inject.lock().unwrap().take();
            let res = match injected {
                Some(err) => Err(err),
                None => sock.send_to(b"ping", peer_addr).await.map(|_| ()),
            };
            match res {
                Ok(()) => {
                    sent.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => node.report_link_send_fault(&err),
            }

            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(2)) => {}
            }
            Ok::<(), LoopError>(())
        }
    });

    Harness {
        node,
        fatal,
        inject,
        sent,
        _peer: peer,
    }
}

async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
    .expect("event not published in time")
}

async fn wait_sent_above(sent: &AtomicU32, floor: u32) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while sent.load(Ordering::SeqCst) <= floor {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("loop stopped sending");
}

#[tokio::test]
async fn network_unreachable_is_logged_and_loop_continues() {
    let h = harness().await;
    let mut rx = h.node.subscribe();
    wait_sent_above(&h.sent, 0).await;

    *h.inject.lock().unwrap() = Some(io::Error::from_raw_os_error(libc::ENETUNREACH));
    let ev = next_of(&mut rx, EventKind::TransientSendFault).await;
    assert_eq!(ev.errno, Some(libc::ENETUNREACH));

    let before = h.sent.load(Ordering::SeqCst);
    wait_sent_above(&h.sent, before).await;
    assert!(!h.node.is_done());
    assert!(h.fatal.calls.lock().unwrap().is_empty());

    h.node.stop().await;
    assert_eq!(h.node.outstanding(), 0);
}

#[tokio::test]
async fn permission_denied_is_fatal() {
    let h = harness().await;
    let mut rx = h.node.subscribe();
    wait_sent_above(&h.sent, 0).await;

    *h.inject.lock().unwrap() = Some(io::Error::from_raw_os_error(libc::EACCES));
    let ev = next_of(&mut rx, EventKind::FatalFault).await;
    assert_eq!(ev.errno, Some(libc::EACCES));
    assert_eq!(ev.origin.as_deref(), Some("link_send"));

    {
        let calls = h.fatal.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "link_send");
    }
    h.node.stop().await;
}

#[tokio::test]
async fn send_faults_after_stop_never_escalate() {
    let h = harness().await;
    h.node.stop().await;

    h.node
        .report_link_send_fault(&io::Error::from_raw_os_error(libc::EACCES));
    h.node
        .report_link_send_fault(&io::Error::other("socket gone"));
    assert!(h.fatal.calls.lock().unwrap().is_empty());
}
