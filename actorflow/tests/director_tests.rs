//! End-to-end runs of the process director

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use actorflow::process::{
    ActorError, CapacityPolicy, Director, DirectorError, DirectorState, Model, ModelError,
    StopReason,
};
use actorflow::{KernelConfig, Session, Token};
use actorflow_types::TypeDescriptor;
use common::{Fault, Faulty, Forwarder, Idler, Paced, Repeater, Sink, Source, Ticker};
use pretty_assertions::assert_eq;

fn session() -> Arc<Session> {
    Arc::new(Session::standard())
}

fn session_with(edit: impl FnOnce(&mut KernelConfig)) -> Arc<Session> {
    let mut config = KernelConfig::default();
    edit(&mut config);
    Arc::new(Session::with_config(config))
}

fn ints(values: &[i32]) -> Vec<Token> {
    values.iter().copied().map(Token::Int).collect()
}

#[test]
fn test_pipeline_delivers_in_order() {
    let mut model = Model::new(session());
    let source = model.add_actor(Source::new("source", ints(&[1, 2, 3])));
    let sink = Sink::new("sink").with_limit(3);
    let received = sink.handle();
    let sink = model.add_actor(sink);
    model
        .connect_with_policy(source, "out", sink, "in", CapacityPolicy::Unbounded)
        .unwrap();

    let mut director = Director::new(model);
    let summary = director.run().unwrap();

    assert_eq!(summary.reason, StopReason::AllFinished);
    assert_eq!(*received.lock().unwrap(), ints(&[1, 2, 3]));
    assert_eq!(director.state(), DirectorState::Stopped);
}

#[test]
fn test_stop_request_ends_concurrent_actors() {
    let mut model = Model::new(session());
    let mut probes = Vec::new();
    for name in ["a", "b", "c"] {
        let (ticker, probe) = Ticker::new(name);
        model.add_actor(ticker);
        probes.push(probe);
    }
    let mut director = Director::new(model);
    let handle = director.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.request_stop();
    });

    let summary = director.run().unwrap();
    stopper.join().unwrap();

    assert_eq!(summary.reason, StopReason::StopRequested);
    assert_eq!(director.state(), DirectorState::Stopped);
    let counts: Vec<usize> = probes.iter().map(|p| p.firings()).collect();
    for probe in &probes {
        assert!(probe.firings() > 0);
        assert!(probe.wrapped_up());
    }
    thread::sleep(Duration::from_millis(20));
    let after: Vec<usize> = probes.iter().map(|p| p.firings()).collect();
    assert_eq!(counts, after, "no actor may fire after stop");
}

#[test]
fn test_actor_error_stops_run_and_is_reported() {
    let mut model = Model::new(session());
    let (ticker, probe) = Ticker::new("ticker");
    model.add_actor(ticker);
    model.add_actor(Faulty::new("faulty", 3, Fault::Error));

    let mut director = Director::new(model);
    let err = director.run().unwrap_err();

    match err {
        DirectorError::ActorFailed(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].actor, "faulty");
            assert_eq!(failures[0].error, ActorError::failed("boom"));
        }
        other => panic!("expected ActorFailed, got {:?}", other),
    }
    assert!(probe.wrapped_up());
    assert_eq!(director.state(), DirectorState::Stopped);
}

#[test]
fn test_fire_and_wrapup_failures_are_aggregated() {
    let mut model = Model::new(session());
    model.add_actor(Faulty::new("faulty", 1, Fault::ErrorAndWrapup));
    let mut director = Director::new(model);

    let err = director.run().unwrap_err();
    assert_eq!(
        err.to_string(),
        "2 actor(s) failed: actor 'faulty' failed: boom; actor 'faulty' failed: wrapup failed"
    );
}

#[test]
fn test_panic_is_reported_as_failure() {
    let mut model = Model::new(session());
    model.add_actor(Faulty::new("panicky", 1, Fault::Panic));
    let mut director = Director::new(model);

    match director.run().unwrap_err() {
        DirectorError::ActorFailed(failures) => {
            assert_eq!(failures[0].error, ActorError::Panicked("kaboom".to_string()));
        }
        other => panic!("expected ActorFailed, got {:?}", other),
    }
}

#[test]
fn test_read_deadlock_ends_run_normally() {
    // the sink keeps waiting after the source is done
    let mut model = Model::new(session());
    let source = model.add_actor(Source::new("source", ints(&[1, 2])));
    let sink = Sink::new("sink");
    let received = sink.handle();
    let sink = model.add_actor(sink);
    model
        .connect_with_policy(source, "out", sink, "in", CapacityPolicy::Unbounded)
        .unwrap();

    let mut director = Director::new(model);
    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::Deadlock);
    assert_eq!(*received.lock().unwrap(), ints(&[1, 2]));
}

#[test]
fn test_write_deadlock_is_an_error() {
    let mut model = Model::new(session());
    let producer = model.add_actor(Repeater {
        name: "producer".to_string(),
        value: Token::Int(1),
    });
    let idler = model.add_actor(Idler {
        name: "idler".to_string(),
    });
    model
        .connect_with_policy(producer, "out", idler, "in", CapacityPolicy::Bounded(1))
        .unwrap();

    let mut director = Director::new(model);
    match director.run().unwrap_err() {
        DirectorError::Deadlock { readers, writers } => {
            assert_eq!(readers, 0);
            assert_eq!(writers, 1);
        }
        other => panic!("expected Deadlock, got {:?}", other),
    }
    assert_eq!(director.state(), DirectorState::Stopped);
}

#[test]
fn test_fire_at_paces_firings() {
    let mut model = Model::new(session());
    let (paced, times) = Paced::new("paced", 0.02, 4);
    model.add_actor(paced);

    let mut director = Director::new(model);
    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::AllFinished);
    assert_eq!(summary.firings, 4);

    let times = times.lock().unwrap();
    assert_eq!(times.len(), 4);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= 0.02 - 1e-9, "fired early: {:?}", *times);
    }
}

#[test]
fn test_stop_during_pending_activation_skips_firing() {
    let mut model = Model::new(session());
    let (paced, times) = Paced::new("slow", 30.0, 3);
    model.add_actor(paced);

    let mut director = Director::new(model);
    let handle = director.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.request_stop();
    });

    let started = Instant::now();
    let summary = director.run().unwrap();
    stopper.join().unwrap();

    assert_eq!(summary.reason, StopReason::StopRequested);
    assert_eq!(summary.firings, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(times.lock().unwrap().len(), 1);
}

#[test]
fn test_director_fire_at_delays_first_firing() {
    let mut model = Model::new(session());
    let (paced, times) = Paced::new("once", 1.0, 1);
    let id = model.add_actor(paced);

    let director = Director::new(model);
    director.fire_at(id, 0.05).unwrap();
    assert!(matches!(
        director.fire_at(id, f64::NAN),
        Err(DirectorError::InvalidTime(_))
    ));

    let mut director = director;
    director.run().unwrap();
    assert!(times.lock().unwrap()[0] >= 0.05);
}

#[test]
fn test_stop_time_ends_run() {
    let session = session_with(|config| config.director.stop_time = Some(0.05));
    let mut model = Model::new(session);
    let (ticker, probe) = Ticker::new("ticker");
    model.add_actor(ticker);

    let mut director = Director::new(model);
    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::StopTime);
    assert!(summary.model_time >= 0.05);
    assert!(probe.wrapped_up());
}

#[test]
fn test_type_conflict_fails_initialize() {
    let mut model = Model::new(session());
    let source = model.add_actor(
        Source::new("source", vec![Token::from("text")]).typed(TypeDescriptor::STRING),
    );
    let sink = model.add_actor(Sink::new("sink").typed(TypeDescriptor::INT));
    model.connect(source, "out", sink, "in").unwrap();

    let mut director = Director::new(model);
    match director.initialize().unwrap_err() {
        DirectorError::TypeConflict(conflict) => {
            let names: Vec<&str> = conflict.conflicts.iter().map(|c| c.name.as_str()).collect();
            assert!(names.contains(&"source.out"), "{:?}", names);
        }
        other => panic!("expected TypeConflict, got {:?}", other),
    }
    assert_eq!(director.state(), DirectorState::Idle);
    assert!(director.solution().is_some());
}

#[test]
fn test_resolved_types_convert_tokens() {
    let mut model = Model::new(session());
    let source = model.add_actor(Source::new("source", ints(&[1, 2])).typed(TypeDescriptor::INT));
    let forwarder = model.add_actor(Forwarder {
        name: "forwarder".to_string(),
    });
    let sink = Sink::new("sink").with_limit(2).typed(TypeDescriptor::DOUBLE);
    let received = sink.handle();
    let sink = model.add_actor(sink);
    model
        .connect_with_policy(source, "out", forwarder, "in", CapacityPolicy::Unbounded)
        .unwrap();
    model
        .connect_with_policy(forwarder, "out", sink, "in", CapacityPolicy::Unbounded)
        .unwrap();

    let mut director = Director::new(model);
    director.initialize().unwrap();
    assert_eq!(
        director.resolved_port_type(source, "out"),
        Some(&TypeDescriptor::INT)
    );
    assert_eq!(
        director.resolved_port_type(forwarder, "in"),
        Some(&TypeDescriptor::DOUBLE)
    );
    assert_eq!(
        director.resolved_port_type(forwarder, "out"),
        Some(&TypeDescriptor::DOUBLE)
    );

    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::Deadlock);
    assert_eq!(
        *received.lock().unwrap(),
        vec![Token::Double(1.0), Token::Double(2.0)]
    );
}

#[test]
fn test_send_without_lossless_conversion_fails() {
    let mut model = Model::new(session());
    let source =
        model.add_actor(Source::new("source", vec![Token::Double(1.5)]).typed(TypeDescriptor::INT));
    let sink = model.add_actor(Sink::new("sink"));
    model.connect(source, "out", sink, "in").unwrap();

    let mut director = Director::new(model);
    match director.run().unwrap_err() {
        DirectorError::ActorFailed(failures) => {
            assert_eq!(
                failures[0].error,
                ActorError::TypeMismatch {
                    port: "out".to_string(),
                    expected: TypeDescriptor::INT,
                    found: TypeDescriptor::DOUBLE,
                }
            );
        }
        other => panic!("expected ActorFailed, got {:?}", other),
    }
}

#[test]
fn test_initialize_twice_is_invalid() {
    let mut model = Model::new(session());
    let (ticker, _probe) = Ticker::new("ticker");
    model.add_actor(ticker);

    let mut director = Director::new(model);
    director.initialize().unwrap();
    match director.initialize().unwrap_err() {
        DirectorError::InvalidState { operation, state } => {
            assert_eq!(operation, "initialize");
            assert_eq!(state, DirectorState::Running);
        }
        other => panic!("expected InvalidState, got {:?}", other),
    }
    director.request_stop();
    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::StopRequested);
}

#[test]
fn test_model_can_run_again() {
    let mut model = Model::new(session());
    let source = model.add_actor(Source::new("source", ints(&[7])));
    let sink = Sink::new("sink").with_limit(1);
    let received = sink.handle();
    let sink = model.add_actor(sink);
    model
        .connect_with_policy(source, "out", sink, "in", CapacityPolicy::Unbounded)
        .unwrap();

    let mut director = Director::new(model);
    director.run().unwrap();
    received.lock().unwrap().clear();
    // the sink's limit counts the shared buffer
    let summary = director.run().unwrap();
    assert_eq!(summary.reason, StopReason::AllFinished);
    assert_eq!(*received.lock().unwrap(), ints(&[7]));
}

#[test]
fn test_model_rejects_bad_connections() {
    let session = session();
    let mut model = Model::new(Arc::clone(&session));
    let source = model.add_actor(Source::new("source", Vec::new()));
    let sink = model.add_actor(Sink::new("sink"));
    assert_eq!(session.version(), 2);

    assert_eq!(
        model.connect(source, "missing", sink, "in"),
        Err(ModelError::UnknownPort {
            actor: "source".to_string(),
            port: "missing".to_string(),
            direction: "output",
        })
    );
    assert_eq!(
        model.connect_with_policy(source, "out", sink, "in", CapacityPolicy::Bounded(0)),
        Err(ModelError::ZeroCapacity)
    );
    model
        .connect_with_policy(source, "out", sink, "in", CapacityPolicy::Unbounded)
        .unwrap();
    assert_eq!(session.version(), 3);
    assert_eq!(
        model.connect_with_policy(source, "out", sink, "in", CapacityPolicy::Rendezvous),
        Err(ModelError::PolicyMismatch {
            actor: "sink".to_string(),
            port: "in".to_string(),
            existing: CapacityPolicy::Unbounded,
        })
    );
}
