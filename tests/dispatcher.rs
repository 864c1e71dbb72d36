// tests/dispatcher.rs
mod common;

use common::sent_commands;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;
use voxel_turtle::{
    ChannelTransport, CommandDispatcher, CommandResult, EngineError, OutputLine, Resolution,
    Transport, TransportError,
};

fn setup() -> (Arc<CommandDispatcher<ChannelTransport>>, ChannelTransport) {
    let (ours, peer) = ChannelTransport::pair();
    (Arc::new(CommandDispatcher::new(ours, "builder")), peer)
}

fn result_for(id: Uuid) -> CommandResult {
    CommandResult {
        correlation_id: id,
        success: true,
        output: vec![OutputLine::new("commands.generic.success", &[])],
    }
}

fn counting_callback(
    counter: &Arc<AtomicUsize>,
) -> impl FnOnce(&CommandResult) -> voxel_turtle::EngineResult<()> + Send + 'static {
    let counter = Arc::clone(counter);
    move |_: &CommandResult| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_request_carries_id_and_origin() {
    let (dispatcher, peer) = setup();
    let id = dispatcher.send("say hi", |_| Ok(())).unwrap();

    let sent = sent_commands(&peer);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].correlation_id, id);
    assert_eq!(sent[0].origin, "builder");
    assert_eq!(sent[0].text, "say hi");
    assert!(dispatcher.is_pending(&id));
}

#[test]
fn test_result_resolves_exactly_once() {
    let (dispatcher, _peer) = setup();
    let fired = Arc::new(AtomicUsize::new(0));
    let id = dispatcher.send("list", counting_callback(&fired)).unwrap();

    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Resolved);
    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Unmatched);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.pending_count(), 0);
}

#[test]
fn test_unknown_id_is_dropped_silently() {
    let (dispatcher, _peer) = setup();
    let fired = Arc::new(AtomicUsize::new(0));
    dispatcher.send("list", counting_callback(&fired)).unwrap();

    assert_eq!(
        dispatcher.resolve(&result_for(Uuid::new_v4())),
        Resolution::Unmatched
    );
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.pending_count(), 1);
}

#[test]
fn test_fire_and_forget_registers_nothing() {
    let (dispatcher, peer) = setup();
    let id = dispatcher.send_no_callback("setblock 0 0 0 stone 0").unwrap();

    assert_eq!(dispatcher.pending_count(), 0);
    assert_eq!(sent_commands(&peer)[0].correlation_id, id);
    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Unmatched);
}

#[test]
fn test_callback_error_is_reported() {
    let (dispatcher, _peer) = setup();
    let id = dispatcher
        .send("testforblock", |_| Err(EngineError::Parse("nope".to_string())))
        .unwrap();
    assert_eq!(
        dispatcher.resolve(&result_for(id)),
        Resolution::Failed(EngineError::Parse("nope".to_string()))
    );
}

#[test]
fn test_callback_may_send_follow_up() {
    let (dispatcher, peer) = setup();
    let follow_up = Arc::clone(&dispatcher);
    let id = dispatcher
        .send("first", move |_| follow_up.send_no_callback("second").map(|_| ()))
        .unwrap();

    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Resolved);
    let texts: Vec<String> = sent_commands(&peer).into_iter().map(|r| r.text).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn test_sweep_purges_stale_requests() {
    let (dispatcher, _peer) = setup();
    let fired = Arc::new(AtomicUsize::new(0));
    let id = dispatcher.send("slow", counting_callback(&fired)).unwrap();

    assert!(dispatcher.sweep_expired(Duration::from_secs(60)).is_empty());
    std::thread::sleep(Duration::from_millis(20));
    let expired = dispatcher.sweep_expired(Duration::from_millis(5));

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].correlation_id, id);
    assert_eq!(expired[0].command, "slow");
    assert!(expired[0].age >= Duration::from_millis(5));
    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Unmatched);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_send_withdraws_callback() {
    let (dispatcher, _peer) = setup();
    dispatcher.transport().close();

    let result = dispatcher.send("lost", |_| Ok(()));
    assert_eq!(result, Err(EngineError::Transport(TransportError::Closed)));
    assert_eq!(dispatcher.pending_count(), 0);
}

#[test]
fn test_concurrent_senders_share_the_table() {
    let (dispatcher, peer) = setup();
    let fired = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let fired = Arc::clone(&fired);
            std::thread::spawn(move || {
                for i in 0..50 {
                    dispatcher
                        .send(format!("say {t}-{i}"), counting_callback(&fired))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sent = sent_commands(&peer);
    assert_eq!(sent.len(), 200);
    assert_eq!(dispatcher.pending_count(), 200);
    for request in &sent {
        assert_eq!(
            dispatcher.resolve(&result_for(request.correlation_id)),
            Resolution::Resolved
        );
    }
    assert_eq!(fired.load(Ordering::SeqCst), 200);
}

#[test]
fn test_abandon_drops_everything() {
    let (dispatcher, _peer) = setup();
    let fired = Arc::new(AtomicUsize::new(0));
    let id = dispatcher.send("a", counting_callback(&fired)).unwrap();
    dispatcher.send("b", counting_callback(&fired)).unwrap();

    assert_eq!(dispatcher.abandon_all(), 2);
    assert_eq!(dispatcher.resolve(&result_for(id)), Resolution::Unmatched);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
