use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&count);
    (count, move |_: &u32| {
        inner.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn emit_reaches_registered_listener() {
    let set = ListenerSet::<u32>::new();
    let (count, listener) = counter();
    let _sub = set.register(listener);

    set.emit(&1);
    set.emit(&2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn unsubscribe_detaches_listener() {
    let set = ListenerSet::<u32>::new();
    let (count, listener) = counter();
    let sub = set.register(listener);
    assert_eq!(set.len(), 1);

    sub.unsubscribe();
    set.emit(&1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(set.is_empty());
}

#[test]
fn dropping_subscription_detaches_listener() {
    let set = ListenerSet::<u32>::new();
    let (count, listener) = counter();
    {
        let _sub = set.register(listener);
    }
    set.emit(&1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn unsubscribe_only_removes_its_own_listener() {
    let set = ListenerSet::<u32>::new();
    let (a_count, a) = counter();
    let (b_count, b) = counter();
    let sub_a = set.register(a);
    let _sub_b = set.register(b);

    sub_a.unsubscribe();
    set.emit(&7);
    assert_eq!(a_count.load(Ordering::SeqCst), 0);
    assert_eq!(b_count.load(Ordering::SeqCst), 1);
}

#[test]
fn listener_may_reenter_the_set() {
    let set = ListenerSet::<u32>::new();
    let reentrant = set.clone();
    let _sub = set.register(move |_| {
        // Would deadlock if emit held the registry lock.
        assert_eq!(reentrant.len(), 1);
    });
    set.emit(&0);
}

#[test]
fn subscription_outliving_set_is_harmless() {
    let (_count, listener) = counter();
    let sub = {
        let set = ListenerSet::<u32>::new();
        set.register(listener)
    };
    assert!(sub.is_active());
    sub.unsubscribe();
}
