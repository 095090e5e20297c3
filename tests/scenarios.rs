//! End-to-end coffee house scenarios on virtual time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coffeehouse::{
    Coffee, CoffeeHouse, Event, EventKind, GuestStatus, HouseConfig, HouseStatus, OverloadPolicy,
    Subscribe,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

fn fast() -> HouseConfig {
    let mut cfg = HouseConfig::default();
    cfg.barista.prepare_duration = Duration::from_millis(10);
    cfg.barista.prepare_jitter = Duration::ZERO;
    cfg.guest.finish_duration = Duration::from_millis(10);
    cfg.monitor.interval = Duration::from_millis(50);
    cfg
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

fn count(events: &[Event], kind: EventKind, process: &str) -> usize {
    events
        .iter()
        .filter(|e| e.kind == kind && e.is_about(process))
        .count()
}

async fn wait_for(house: &CoffeeHouse, what: impl Fn(&HouseStatus) -> bool) -> HouseStatus {
    for _ in 0..2000 {
        let status = house.status().await.expect("house is open");
        if what(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[derive(Default)]
struct Collector(Mutex<Vec<Event>>);

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_a_every_guest_drinks_exactly_its_limit() {
    let mut cfg = fast();
    cfg.barista.accuracy = 100;
    let collector = Arc::new(Collector::default());
    let house = CoffeeHouse::builder(cfg)
        .with_subscribers(vec![collector.clone() as Arc<dyn Subscribe>])
        .build()
        .expect("valid config");

    house.admit(3, Coffee::Cappuccino, Some(2));
    let status = wait_for(&house, |s| s.exhausted == 3).await;

    assert_eq!(status.admitted, 3);
    assert_eq!(status.active_guests, 0);
    assert_eq!(status.total_consumed, 6);
    let names: Vec<&str> = status.guests.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["guest-1", "guest-2", "guest-3"]);
    for guest in &status.guests {
        assert_eq!(guest.consumed, 2);
        assert_eq!(guest.limit, 2);
        assert_eq!(guest.coffee, Coffee::Cappuccino);
        assert_eq!(guest.status, GuestStatus::Exhausted);
    }

    house.shutdown().await.expect("clean shutdown");
    let events = collector.0.lock().clone();
    assert_eq!(events.iter().filter(|e| e.kind == EventKind::GuestExhausted).count(), 3);
    assert_eq!(events.iter().filter(|e| e.kind == EventKind::OrderServed).count(), 6);
    assert_eq!(events.iter().filter(|e| e.kind == EventKind::OrderFailed).count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_guests_give_up_after_perseverance_plus_one_failures() {
    let mut cfg = fast();
    cfg.barista.accuracy = 0;
    cfg.guest.perseverance = 2;
    cfg.waiter.max_complaint_count = 10;
    let house = CoffeeHouse::open(cfg).expect("valid config");
    let mut rx = house.subscribe();

    house.admit(2, Coffee::Latte, None);
    let status = wait_for(&house, |s| s.faulted == 2).await;
    assert_eq!(status.active_guests, 0);
    assert_eq!(status.total_consumed, 0);

    let events = drain(&mut rx);
    for guest in ["guest-1", "guest-2"] {
        assert_eq!(count(&events, EventKind::OrderFailed, guest), 3, "{guest}");
        let fault = events
            .iter()
            .find(|e| e.kind == EventKind::ProcessFaulted && e.is_about(guest))
            .expect("guest fault");
        assert_eq!(fault.directive, Some("stop"));
    }
    assert_eq!(count(&events, EventKind::ProcessRestarted, "waiter"), 0);

    let pool = house.pool_stats().await.expect("pool stats");
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.available, 2);
    assert_eq!(pool.in_flight, 0);

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn scenario_c_overload_is_reported_once_and_growth_is_capped() {
    let mut cfg = fast();
    cfg.barista.prepare_duration = Duration::from_secs(1);
    cfg.pool.min_size = 2;
    cfg.pool.max_size = 4;
    cfg.monitor.high_water_mark = 5;
    cfg.monitor.consecutive_samples = 3;
    cfg.overload.policy = OverloadPolicy::GrowPool;
    cfg.overload.grow_step = 10;
    let house = CoffeeHouse::open(cfg).expect("valid config");
    let mut rx = house.subscribe();

    house.admit(20, Coffee::Espresso, Some(1));
    tokio::time::sleep(Duration::from_millis(600)).await;

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::OverloadDetected, "monitor"), 1);
    assert_eq!(count(&events, EventKind::PoolResized, "barista-pool"), 1);

    let pool = house.pool_stats().await.expect("pool stats");
    assert_eq!(pool.size(), 4);
    assert_eq!(pool.in_flight, 20);
    let status = house.status().await.expect("status");
    assert_eq!(status.pool_size, 4);

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn scenario_c_shedding_rejects_admissions_until_the_backlog_clears() {
    let mut cfg = fast();
    cfg.barista.prepare_duration = Duration::from_millis(100);
    cfg.monitor.high_water_mark = 5;
    cfg.monitor.consecutive_samples = 3;
    cfg.overload.policy = OverloadPolicy::ShedLoad;
    let house = CoffeeHouse::open(cfg).expect("valid config");
    let mut rx = house.subscribe();

    house.admit(20, Coffee::MochaPlay, Some(1));
    let status = wait_for(&house, |s| s.shedding).await;
    assert_eq!(status.admitted, 20);

    house.admit(2, Coffee::MochaPlay, Some(1));
    let status = house.status().await.expect("status");
    assert_eq!(status.admitted, 20);
    assert_eq!(status.rejected, 2);

    let status = wait_for(&house, |s| !s.shedding).await;
    assert_eq!(status.rejected, 2);
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::AdmissionRejected, "house"), 1);
    assert_eq!(count(&events, EventKind::OverloadDetected, "monitor"), 1);
    assert_eq!(count(&events, EventKind::OverloadCleared, "monitor"), 1);

    house.admit(1, Coffee::MochaPlay, Some(1));
    let status = wait_for(&house, |s| s.exhausted == 21).await;
    assert_eq!(status.total_consumed, 21);

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn scenario_d_waiter_restart_resets_complaints() {
    let mut cfg = fast();
    cfg.waiter.max_complaint_count = 2;
    cfg.guest.perseverance = 5;
    let brews = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&brews);
    let house = CoffeeHouse::builder(cfg)
        .with_brew(move |_worker: &str, _coffee: Coffee| seen.fetch_add(1, Ordering::SeqCst) >= 3)
        .build()
        .expect("valid config");
    let mut rx = house.subscribe();

    house.admit(1, Coffee::Akkaccino, Some(2));
    let status = wait_for(&house, |s| s.exhausted == 1).await;
    assert_eq!(status.guests[0].consumed, 2);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::OrderFailed, "guest-1"), 3);
    assert_eq!(count(&events, EventKind::OrderServed, "guest-1"), 2);
    assert_eq!(count(&events, EventKind::ProcessFaulted, "waiter"), 1);
    let restarted: Vec<&Event> = events
        .iter()
        .filter(|e| e.kind == EventKind::ProcessRestarted && e.is_about("waiter"))
        .collect();
    assert_eq!(restarted.len(), 1);
    assert_eq!(restarted[0].attempt, Some(1));

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn worker_fault_restarts_only_that_worker() {
    let mut cfg = fast();
    cfg.barista.max_failures = 1;
    cfg.guest.perseverance = 20;
    cfg.waiter.max_complaint_count = 100;
    let house = CoffeeHouse::builder(cfg)
        .with_brew(|worker: &str, _coffee: Coffee| worker != "barista-1")
        .build()
        .expect("valid config");
    let mut rx = house.subscribe();

    house.admit(2, Coffee::CaffeJava, Some(3));
    let status = wait_for(&house, |s| s.exhausted == 2).await;
    assert_eq!(status.total_consumed, 6);

    let events = drain(&mut rx);
    assert!(count(&events, EventKind::ProcessRestarted, "barista-1") >= 1);
    assert_eq!(count(&events, EventKind::ProcessRestarted, "barista-2"), 0);
    assert_eq!(count(&events, EventKind::ProcessRestarted, "barista-pool"), 0);

    let pool = house.pool_stats().await.expect("pool stats");
    assert_eq!(pool.workers, vec!["barista-1".to_string(), "barista-2".to_string()]);
    assert_eq!(pool.in_flight, 0);
    assert_eq!(status.pool_size, 2);

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn consumption_never_exceeds_limit_under_load() {
    let mut cfg = fast();
    cfg.barista.prepare_jitter = Duration::from_millis(20);
    cfg.guest.finish_duration = Duration::from_millis(3);
    let house = CoffeeHouse::open(cfg).expect("valid config");

    house.admit(5, Coffee::Espresso, Some(3));
    house.admit(5, Coffee::Latte, Some(1));
    loop {
        let status = house.status().await.expect("status");
        for guest in &status.guests {
            assert!(guest.consumed <= guest.limit, "{guest:?}");
        }
        if status.exhausted == 10 {
            assert_eq!(status.total_consumed, 20);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    house.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn status_is_idempotent_without_activity() {
    let house = CoffeeHouse::open(fast()).expect("valid config");
    house.admit_default(2, Coffee::Latte);
    wait_for(&house, |s| s.exhausted == 2).await;

    let first = house.status().await.expect("status");
    let second = house.status().await.expect("status");
    assert_eq!(first, second);
    assert_eq!(first.total_consumed, 6);

    house.shutdown().await.expect("clean shutdown");
    assert!(house.status().await.is_err());
}

fn failed_with(events: &[Event], needle: &str) -> usize {
    events
        .iter()
        .filter(|e| e.kind == EventKind::OrderFailed)
        .filter(|e| e.reason.as_deref().is_some_and(|r| r.contains(needle)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn single_worker_fault_does_not_starve_waiting_guests() {
    let mut cfg = fast();
    cfg.pool.min_size = 1;
    cfg.pool.max_size = 1;
    cfg.barista.max_failures = 1;
    cfg.guest.perseverance = 3;
    cfg.waiter.max_complaint_count = 10;
    let brews = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&brews);
    let house = CoffeeHouse::builder(cfg)
        .with_brew(move |_worker: &str, _coffee: Coffee| seen.fetch_add(1, Ordering::SeqCst) >= 2)
        .build()
        .expect("valid config");
    let mut rx = house.subscribe();

    house.admit(5, Coffee::Espresso, Some(1));
    let status = wait_for(&house, |s| s.exhausted == 5).await;
    assert_eq!(status.faulted, 0);
    assert_eq!(status.total_consumed, 5);
    assert_eq!(brews.load(Ordering::SeqCst), 7);

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::ProcessRestarted, "barista-1"), 1);
    assert_eq!(failed_with(&events, "wrong coffee"), 2);
    assert_eq!(failed_with(&events, "no barista available"), 0);
    let failed = events.iter().filter(|e| e.kind == EventKind::OrderFailed).count();
    assert_eq!(failed_with(&events, "worker restarted"), failed - 2);

    let pool = house.pool_stats().await.expect("pool stats");
    assert_eq!(pool.available, 1);
    assert_eq!(pool.in_flight, 0);
    assert_eq!(pool.queued, 0);

    house.shutdown().await.expect("clean shutdown");
}

async fn barista_restarts_after(wrong: u32, max_failures: u32) -> usize {
    let mut cfg = fast();
    cfg.pool.min_size = 1;
    cfg.pool.max_size = 1;
    cfg.barista.max_failures = max_failures;
    cfg.guest.perseverance = 10;
    cfg.waiter.max_complaint_count = 10;
    let brews = Arc::new(AtomicU32::new(0));
    let house = CoffeeHouse::builder(cfg)
        .with_brew(move |_worker: &str, _coffee: Coffee| brews.fetch_add(1, Ordering::SeqCst) >= wrong)
        .build()
        .expect("valid config");
    let mut rx = house.subscribe();

    house.admit(1, Coffee::Latte, Some(1));
    wait_for(&house, |s| s.exhausted == 1).await;
    let events = drain(&mut rx);
    house.shutdown().await.expect("clean shutdown");

    assert_eq!(failed_with(&events, "wrong coffee"), wrong as usize);
    count(&events, EventKind::ProcessRestarted, "barista-1")
}

#[tokio::test(start_paused = true)]
async fn barista_tolerates_max_failures_in_a_row() {
    assert_eq!(barista_restarts_after(2, 2).await, 0);
    assert_eq!(barista_restarts_after(3, 2).await, 1);
}
