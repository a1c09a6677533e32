use anyhow::anyhow;
use evented_core::{
    EventError, EventOptions, EventsError, ExternalEvent, InMemoryTransport, Transport,
};
use serde_json::{Value, json};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

fn external(mock: &Arc<InMemoryTransport>, routing: &str) -> ExternalEvent {
    let transport: Arc<dyn Transport> = mock.clone();
    let options = EventOptions::builder()
        .routing(routing)
        .transport(transport)
        .build();
    ExternalEvent::new("participant", "OrderPlaced", &options, None).unwrap()
}

#[test]
fn transport_subscription_follows_first_and_last_subscriber() {
    let mock = Arc::new(InMemoryTransport::new());
    let event = external(&mock, "orders.placed");
    assert_eq!(mock.subscribe_calls(), 0);

    event.subscribe_as("a", |_: &[Value]| Ok(())).unwrap();
    event.subscribe_as("b", |_: &[Value]| Ok(())).unwrap();
    event.subscribe_as("c", |_: &[Value]| Ok(())).unwrap();
    assert_eq!(mock.subscribe_calls(), 1);
    assert_eq!(mock.subscribed_routings(), vec!["orders.placed".to_string()]);

    event.unsubscribe("a").unwrap();
    event.unsubscribe("b").unwrap();
    assert_eq!(mock.unsubscribe_calls(), 0);

    event.unsubscribe("c").unwrap();
    assert_eq!(mock.unsubscribe_calls(), 1);
    assert!(!mock.is_subscribed("orders.placed"));

    // 再次出现订阅者时重新订阅
    event.subscribe_as("d", |_: &[Value]| Ok(())).unwrap();
    assert_eq!(mock.subscribe_calls(), 2);
}

#[test]
fn delivery_reaches_every_current_subscriber_with_routing_and_payload() {
    let mock = Arc::new(InMemoryTransport::new());
    let event = external(&mock, "orders.placed");
    let seen: Arc<Mutex<Vec<(String, Vec<Value>)>>> = Arc::default();

    for name in ["first", "second"] {
        let sink = seen.clone();
        event
            .subscribe_as(name, move |args: &[Value]| {
                sink.lock().unwrap().push((name.to_string(), args.to_vec()));
                Ok(())
            })
            .unwrap();
    }

    let payload = json!({"order": 7, "total": "12.50"});
    assert!(mock.deliver("orders.placed", payload.clone()).unwrap());
    assert!(!mock.deliver("orders.cancelled", json!(null)).unwrap());

    let expected = vec![json!("orders.placed"), payload];
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("first".to_string(), expected.clone()),
            ("second".to_string(), expected),
        ]
    );
}

#[test]
fn publish_on_loopback_transport_fires_the_subscribed_event() {
    let mock = Arc::new(InMemoryTransport::new());
    let event = external(&mock, "orders.placed");
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();

    let sink = seen.clone();
    event
        .subscribe(move |args: &[Value]| {
            sink.lock().unwrap().push(args[1].clone());
            Ok(())
        })
        .unwrap();

    mock.publish("orders.placed", json!(1)).unwrap();
    mock.publish("orders.other", json!(2)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![json!(1)]);
    assert_eq!(mock.published().len(), 2);
}

#[test]
fn subscriber_failure_surfaces_from_delivery() {
    let mock = Arc::new(InMemoryTransport::new());
    let event = external(&mock, "orders.placed");
    event
        .subscribe_as("broken", |_: &[Value]| Err(anyhow!("database offline")))
        .unwrap();

    let err = mock.deliver("orders.placed", json!({})).unwrap_err();
    match err {
        EventsError::SubscriberFailed {
            event, subscriber, ..
        } => {
            assert_eq!(event, "OrderPlaced");
            assert_eq!(subscriber, "broken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_routing_or_transport_is_reported() {
    let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());

    let err = ExternalEvent::new("host", "Foo", &EventOptions::external("r"), None).unwrap_err();
    assert!(matches!(
        err,
        EventsError::Event(EventError::MissingTransport { .. })
    ));
    assert!(err.to_string().contains("transport"));

    let only_transport = EventOptions::builder().transport(transport).build();
    let err = ExternalEvent::new("host", "Foo", &only_transport, None).unwrap_err();
    assert!(matches!(
        err,
        EventsError::Event(EventError::MissingRouting { .. })
    ));
    assert!(err.to_string().contains("routing"));
}

#[test]
fn dropping_a_subscribed_event_releases_the_routing() {
    let mock = Arc::new(InMemoryTransport::new());
    {
        let event = external(&mock, "orders.placed");
        event.subscribe(|_: &[Value]| Ok(())).unwrap();
        assert!(mock.is_subscribed("orders.placed"));
    }
    assert!(!mock.is_subscribed("orders.placed"));
    assert!(!mock.deliver("orders.placed", json!(1)).unwrap());
}

#[test]
fn concurrent_subscribe_and_unsubscribe_keep_one_transport_subscription() {
    let mock = Arc::new(InMemoryTransport::new());
    let event = external(&mock, "orders.placed");
    let threads = 8;
    let barrier = Barrier::new(threads);

    thread::scope(|scope| {
        for worker in 0..threads {
            let event = &event;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for round in 0..200 {
                    let name = format!("w{worker}-{}", round % 3);
                    event.subscribe_as(name.as_str(), |_: &[Value]| Ok(())).unwrap();
                    event.unsubscribe(&name).unwrap();
                }
                // 偶数号线程留下一个订阅者
                if worker % 2 == 0 {
                    event.subscribe_as(format!("w{worker}-kept"), |_: &[Value]| Ok(())).unwrap();
                }
            });
        }
    });

    assert_eq!(event.subscriber_count(), threads / 2);
    assert_eq!(mock.subscription_count("orders.placed"), 1);
    assert_eq!(
        mock.subscribe_calls() - mock.unsubscribe_calls(),
        usize::from(!event.is_empty())
    );

    event.clear().unwrap();
    assert!(!mock.is_subscribed("orders.placed"));
    assert_eq!(mock.subscribe_calls(), mock.unsubscribe_calls());
}
