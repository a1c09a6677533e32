use evented_core::{Event, EventOptions, ExternalEvent, InMemoryTransport, Transport};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug)]
enum Op {
    Subscribe(u8),
    Unsubscribe(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Subscribe),
        (0u8..8).prop_map(Op::Unsubscribe),
    ]
}

fn counting(hits: &Arc<AtomicUsize>, expected: Value) -> impl Fn(&[Value]) -> anyhow::Result<()> + Send + Sync + 'static {
    let hits = hits.clone();
    move |args: &[Value]| {
        assert_eq!(args, std::slice::from_ref(&expected));
        hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

proptest! {
    #[test]
    fn fire_reaches_exactly_the_live_subscribers(ops in prop::collection::vec(op(), 0..40)) {
        let event = Event::new("host", "Counted");
        let hits = Arc::new(AtomicUsize::new(0));
        let mut live = BTreeSet::new();

        for op in ops {
            match op {
                Op::Subscribe(id) => {
                    let result = event.subscribe_as(format!("s{id}"), counting(&hits, json!("x")));
                    prop_assert_eq!(result.is_ok(), live.insert(id));
                }
                Op::Unsubscribe(id) => {
                    let result = event.unsubscribe(&format!("s{id}"));
                    prop_assert_eq!(result.is_ok(), live.remove(&id));
                }
            }
            prop_assert_eq!(event.subscriber_count(), live.len());
        }

        event.fire(&[json!("x")]).unwrap();
        prop_assert_eq!(hits.load(Ordering::SeqCst), live.len());
    }

    #[test]
    fn transport_subscription_is_open_iff_subscribers_exist(ops in prop::collection::vec(op(), 0..40)) {
        let mock = Arc::new(InMemoryTransport::new());
        let transport: Arc<dyn Transport> = mock.clone();
        let event = ExternalEvent::new("host", "Remote", &EventOptions::external("remote"), Some(&transport)).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        for op in ops {
            match op {
                Op::Subscribe(id) => {
                    let _ = event.subscribe_as(format!("s{id}"), counting(&hits, json!(null)));
                }
                Op::Unsubscribe(id) => {
                    let _ = event.unsubscribe(&format!("s{id}"));
                }
            }
            prop_assert_eq!(mock.is_subscribed("remote"), !event.is_empty());
        }
        prop_assert_eq!(
            mock.subscribe_calls() - mock.unsubscribe_calls(),
            usize::from(!event.is_empty())
        );
    }
}
