//! Crate-level dispatcher tests and BDD scenarios.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;

use crate::client::Client;
use crate::decode::{self, Axis, AxisValues};
use crate::error::{CommandError, DecodeError, ShutdownError};
use crate::transport::Transport;

mod support;

use self::support::{Gate, Script, spin_until};

const SETTLE: Duration = Duration::from_secs(5);

fn client(script: Script) -> (Client, support::Transcript) {
    let (transport, transcript) = script.build();
    let client = Client::with_transport(transport).expect("spawn dispatcher");
    (client, transcript)
}

#[rstest]
fn commands_are_written_without_reading() {
    let (client, transcript) = client(Script::new());
    let replies = ["start", "pause", "stop"].map(|request| client.send(request));
    for reply in replies {
        reply.wait_timeout(SETTLE).expect("command written");
    }
    assert_eq!(transcript.writes(), ["start", "pause", "stop"]);
    assert_eq!(transcript.reads(), 0);
}

#[rstest]
fn each_query_receives_the_response_to_its_own_request() {
    let (client, transcript) = client(
        Script::new()
            .respond("line", "120")
            .respond("speed", "1500.5")
            .respond("isestop", "1")
            .respond("pos", "X:1\nY:2\nZ:-3\n"),
    );

    let line = client.query("line", decode::integer);
    let speed = client.query("speed", decode::float);
    let estop = client.query("isestop", |text| Ok(decode::boolean(text)));
    let position = client.query_as::<AxisValues>("pos");

    assert_eq!(line.wait_timeout(SETTLE).expect("line"), 120);
    assert!((speed.wait_timeout(SETTLE).expect("speed") - 1500.5).abs() < f64::EPSILON);
    assert!(estop.wait_timeout(SETTLE).expect("estop"));
    let position = position.wait_timeout(SETTLE).expect("position");
    assert!((position.get(Axis::Z) + 3.0).abs() < f64::EPSILON);
    assert_eq!(transcript.reads(), 4);
}

#[rstest]
fn submissions_from_many_threads_keep_per_thread_order() {
    let (client, transcript) = client(Script::new());
    let client = Arc::new(client);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let replies: Vec<_> = (0..25)
                    .map(|step| client.send(format!("param w{worker}={step}")))
                    .collect();
                for reply in replies {
                    reply.wait_timeout(SETTLE).expect("command written");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }

    let writes = transcript.writes();
    assert_eq!(writes.len(), 100);
    for worker in 0..4 {
        let prefix = format!("param w{worker}=");
        let steps: Vec<u32> = writes
            .iter()
            .filter_map(|line| line.strip_prefix(&prefix))
            .map(|step| step.parse().expect("step number"))
            .collect();
        assert_eq!(steps, (0..25).collect::<Vec<_>>());
    }
}

#[rstest]
fn next_request_waits_for_the_round_trip_in_flight() {
    let gate = Gate::default();
    let (client, transcript) = client(Script::new().hold("posx", "2.5", &gate));

    let held = client.query("posx", decode::float);
    let next = client.send("start");
    transcript.wait_for_write("posx");
    thread::sleep(Duration::from_millis(30));
    assert_eq!(transcript.writes(), ["posx"]);

    gate.open();
    assert!((held.wait_timeout(SETTLE).expect("held query") - 2.5).abs() < f64::EPSILON);
    next.wait_timeout(SETTLE).expect("command after hold");
    assert_eq!(transcript.writes(), ["posx", "start"]);
}

#[rstest]
#[case::read(Script::new().fail_read("posy"))]
#[case::write(Script::new().fail_write("posy"))]
#[case::decode(Script::new().respond("posy", "not-a-number"))]
fn a_failed_round_trip_affects_only_its_own_request(#[case] script: Script) {
    let (client, _transcript) = client(script.respond("posx", "1").respond("posz", "3"));

    let before = client.query("posx", decode::float);
    let failing = client.query("posy", decode::float);
    let after = client.query("posz", decode::float);

    assert!(before.wait_timeout(SETTLE).is_ok());
    assert!(failing.wait_timeout(SETTLE).is_err());
    assert!((after.wait_timeout(SETTLE).expect("later query") - 3.0).abs() < f64::EPSILON);
}

#[rstest]
fn read_failures_are_reported_as_read_errors() {
    let (client, _transcript) = client(Script::new().fail_read("posx"));
    let error = client
        .query("posx", decode::float)
        .wait_timeout(SETTLE)
        .expect_err("read fails");
    assert!(matches!(error, CommandError::Read(_)), "got {error}");
}

#[rstest]
fn panicking_decoder_does_not_stop_the_dispatcher() {
    let (client, _transcript) = client(Script::new().respond("a", "1").respond("b", "2"));

    let broken = client.query("a", |_| -> Result<i64, DecodeError> { panic!("decoder bug") });
    let healthy = client.query("b", decode::integer);

    let error = broken.wait_timeout(SETTLE).expect_err("panic surfaces");
    assert!(matches!(error, CommandError::Decode(DecodeError::Panicked { .. })));
    assert_eq!(healthy.wait_timeout(SETTLE).expect("healthy query"), 2);
}

#[rstest]
#[case("start\nstop")]
#[case("")]
fn invalid_requests_never_reach_the_controller(#[case] request: &str) {
    let (client, transcript) = client(Script::new());
    let error = client.send(request).wait().expect_err("rejected");
    assert!(matches!(error, CommandError::InvalidRequest { .. }));
    client.terminate().expect("terminate");
    assert!(transcript.writes().is_empty());
}

#[rstest]
fn dropped_reply_does_not_disturb_later_requests() {
    let (client, _transcript) = client(Script::new().respond("a", "1").respond("b", "2"));
    drop(client.query("a", decode::integer));
    assert_eq!(client.query("b", decode::integer).wait_timeout(SETTLE).expect("b"), 2);
}

#[rstest]
fn termination_finishes_in_flight_work_and_cancels_the_backlog() {
    let gate = Gate::default();
    let (client, transcript) = client(
        Script::new()
            .hold("pos", "X:1\nY:2\n", &gate)
            .respond("line", "5"),
    );

    let in_flight = client.query_as::<AxisValues>("pos");
    transcript.wait_for_write("pos");
    let queued_query = client.query("line", decode::integer);
    let queued_command = client.send("stop");

    thread::scope(|scope| {
        let terminating = scope.spawn(|| client.terminate());
        spin_until(|| client.is_terminated());
        gate.open();
        terminating
            .join()
            .expect("terminate thread")
            .expect("clean shutdown");
    });

    let position = in_flight.wait_timeout(SETTLE).expect("in-flight query completes");
    assert!((position.get(Axis::Y) - 2.0).abs() < f64::EPSILON);
    assert!(matches!(queued_query.wait(), Err(CommandError::Cancelled)));
    assert!(matches!(queued_command.wait(), Err(CommandError::Cancelled)));
    assert!(transcript.is_closed());
    assert_eq!(transcript.writes(), ["pos"]);
}

#[rstest]
fn requests_after_termination_are_cancelled_immediately() {
    let (client, transcript) = client(Script::new().respond("line", "1"));
    client.terminate().expect("terminate");
    client.terminate().expect("second terminate is a no-op");

    assert!(matches!(client.send("start").wait(), Err(CommandError::Cancelled)));
    assert!(matches!(
        client.query("line", decode::integer).wait(),
        Err(CommandError::Cancelled)
    ));
    assert!(transcript.writes().is_empty());
}

struct FaultyTransport;

impl Transport for FaultyTransport {
    fn write_request(&mut self, request: &[u8]) -> io::Result<()> {
        assert_ne!(request, b"fault\n", "transport fault");
        Ok(())
    }

    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        Ok(b"0\n".to_vec())
    }
}

#[rstest]
fn transport_panic_cancels_current_and_later_requests() {
    let client = Client::with_transport(FaultyTransport).expect("spawn dispatcher");
    let faulted = client.send("fault");
    let queued = client.query("line", decode::integer);

    assert!(matches!(
        faulted.wait_timeout(SETTLE),
        Err(CommandError::Cancelled)
    ));
    assert!(matches!(
        queued.wait_timeout(SETTLE),
        Err(CommandError::Cancelled)
    ));
    spin_until(|| client.is_terminated());
    assert!(matches!(
        client.send("start").wait_timeout(SETTLE),
        Err(CommandError::Cancelled)
    ));
    assert!(matches!(
        client.terminate(),
        Err(ShutdownError::WorkerPanicked)
    ));
}

#[rstest]
fn dropping_the_client_closes_the_connection() {
    let (client, transcript) = client(Script::new());
    client.send("start").wait_timeout(SETTLE).expect("command written");
    drop(client);
    assert!(transcript.is_closed());
}
