//! End-to-end reactor scenarios over files and socket pairs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::rc::Rc;

use streamux::prelude::*;

type Received = Rc<RefCell<HashMap<String, Vec<String>>>>;
type Names = Rc<RefCell<Vec<String>>>;

fn reactor() -> Reactor {
    streamux::init_test_logging();
    Reactor::with_config(ChannelConfig::builtin()).unwrap()
}

// ============================================================================
// Single channel
// ============================================================================

#[test]
fn rot13_reaches_the_file() {
    let mut reactor = reactor();
    let file = tempfile::tempfile().unwrap();
    let mut observer = file.try_clone().unwrap();

    reactor
        .register("rot13", file, Handler::Default, Handler::Default)
        .unwrap();
    let ch = reactor.get_mut("rot13").unwrap();
    ch.push_write_stage(Box::new(Rot13)).unwrap();
    assert_eq!(ch.write(b"Hello world!").unwrap(), 12);

    reactor.run(0).unwrap();

    observer.seek(SeekFrom::Start(0)).unwrap();
    let mut text = String::new();
    observer.read_to_string(&mut text).unwrap();
    assert_eq!(text, "Uryyb jbeyq!");
    assert_eq!(reactor.get("rot13").unwrap().pending_output_len(), 0);
}

#[test]
fn idle_reactor_returns_at_once() {
    let mut reactor = reactor();
    assert_eq!(reactor.run(0).unwrap(), 0);

    let (a, _peer) = UnixStream::pair().unwrap();
    reactor.register("quiet", a, Handler::Default, Handler::Default).unwrap();
    assert_eq!(reactor.run(0).unwrap(), 0);
    assert_eq!(reactor.len(), 1);
}

#[test]
fn eof_removes_exactly_one_channel() {
    let mut reactor = reactor();
    let reader = || {
        Handler::custom(|_, ch: &mut FilteredChannel, _| {
            ch.read(64)?;
            Ok(())
        })
    };

    let (a, peer_a) = UnixStream::pair().unwrap();
    let (b, _peer_b) = UnixStream::pair().unwrap();
    reactor.register("a", a, reader(), Handler::Default).unwrap();
    reactor.register("b", b, reader(), Handler::Default).unwrap();

    peer_a.shutdown(Shutdown::Write).unwrap();
    reactor.run_once().unwrap();

    assert_eq!(reactor.len(), 1);
    assert_eq!(reactor.names(), vec!["b"]);
    let mut buf = [0u8; 8];
    assert_eq!((&peer_a).read(&mut buf).unwrap(), 0);
}

#[test]
fn ready_channels_dispatch_in_registration_order() {
    let mut reactor = reactor();
    let order: Names = Rc::default();

    let mut peers = Vec::new();
    for name in ["A", "B"] {
        let (ours, mut theirs) = UnixStream::pair().unwrap();
        theirs.write_all(name.as_bytes()).unwrap();
        peers.push(theirs);

        let order = Rc::clone(&order);
        let on_read = Handler::custom(move |_, ch: &mut FilteredChannel, name: &str| {
            ch.read(64)?;
            order.borrow_mut().push(name.to_string());
            Ok(())
        });
        reactor.register(name, ours, on_read, Handler::Default).unwrap();
    }

    reactor.run_once().unwrap();
    assert_eq!(*order.borrow(), vec!["A", "B"]);
}

// ============================================================================
// Bidirectional exchange
// ============================================================================

/// Reads a counter, answers with the next one, and hangs up after nine.
///
/// Messages are three bytes so base64 never pads mid-stream.
fn counter(received: &Received) -> Handler {
    let received = Rc::clone(received);
    Handler::custom(move |reactor, ch: &mut FilteredChannel, name: &str| {
        let data = ch.read(32)?;
        if data.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8(data).unwrap();
        let value: u32 = text.trim().parse().unwrap();
        received
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(text);

        if value < 9 {
            ch.write(format!("{}  ", value + 1).as_bytes())?;
        } else {
            reactor.remove(name)?;
        }
        Ok(())
    })
}

fn recording_close(closed: &Names) -> Handler {
    let closed = Rc::clone(closed);
    Handler::custom(move |reactor, _ch: &mut FilteredChannel, name: &str| {
        closed.borrow_mut().push(name.to_string());
        reactor.remove(name)
    })
}

/// `a2b` sends base64 then rot13; `b2a` sends rot13 then base64. Each
/// side's read chain lists the peer's write stages with decode in place
/// of encode, so running it reversed undoes them.
fn exchange(on_close: impl Fn() -> Handler) -> (Received, Reactor) {
    let mut reactor = reactor();
    let received = Received::default();
    let (a, b) = UnixStream::pair().unwrap();

    let mut a2b = FilteredChannel::new(a, ChannelConfig::builtin()).unwrap();
    a2b.push_write_stage(Box::new(Base64Encode::new())).unwrap();
    a2b.push_write_stage(Box::new(Rot13)).unwrap();
    a2b.push_read_stage(Box::new(Rot13)).unwrap();
    a2b.push_read_stage(Box::new(Base64Decode::new())).unwrap();

    let mut b2a = FilteredChannel::new(b, ChannelConfig::builtin()).unwrap();
    b2a.push_write_stage(Box::new(Rot13)).unwrap();
    b2a.push_write_stage(Box::new(Base64Encode::new())).unwrap();
    b2a.push_read_stage(Box::new(Base64Decode::new())).unwrap();
    b2a.push_read_stage(Box::new(Rot13)).unwrap();

    reactor
        .register_channel("a2b", a2b, counter(&received), on_close())
        .unwrap();
    reactor
        .register_channel("b2a", b2a, counter(&received), on_close())
        .unwrap();

    reactor.get_mut("a2b").unwrap().write(b"0  ").unwrap();
    reactor.run(0).unwrap();
    (received, reactor)
}

fn expected() -> HashMap<String, Vec<String>> {
    let numbers = |start: u32| -> Vec<String> {
        (start..10).step_by(2).map(|n| format!("{}  ", n)).collect()
    };
    HashMap::from([("b2a".to_string(), numbers(0)), ("a2b".to_string(), numbers(1))])
}

#[test]
fn bidirectional_exchange_with_default_close() {
    let (received, reactor) = exchange(|| Handler::Default);
    assert_eq!(*received.borrow(), expected());
    assert!(reactor.is_empty());
}

#[test]
fn bidirectional_exchange_with_close_handler() {
    let closed = Names::default();
    let (received, reactor) = exchange(|| recording_close(&closed));

    assert_eq!(*received.borrow(), expected());
    assert_eq!(*closed.borrow(), vec!["b2a"]);
    assert!(reactor.is_empty());
}
