mod common;

use std::time::Duration;

use hosted_osal::hal::sync::{MutexOps, SpinlockOps};
use hosted_osal::{
    DeliveryContext, GpioConfig, GpioMode, GpioPortId, InterruptTrigger, OsError, PinLevel,
    ThreadSpec, Timeout, TimerMode, handle,
};
use hosted_osal::hal::event::{ANY_EVENT_ID, WIFI_EVENT, WifiEvent};

use crate::common::{FakeClock, Hits, bare_metal};

#[test]
fn test_blocking_calls_spin_on_the_tick_source() {
    let (_backend, adapter, _clock, _pins) = bare_metal(4096, FakeClock::stepping(1000));
    let queue = adapter.queue(1, 2).unwrap();

    let mut item = [0u8; 2];
    assert_eq!(
        queue.receive(&mut item, Timeout::NonBlocking),
        Err(OsError::WouldBlock)
    );
    assert_eq!(queue.receive(&mut item, Timeout::ms(5)), Err(OsError::Timeout));

    queue.send(&[4, 2], Timeout::Forever).unwrap();
    assert_eq!(queue.send(&[0, 0], Timeout::ms(3)), Err(OsError::Timeout));
    queue.receive(&mut item, Timeout::Forever).unwrap();
    assert_eq!(item, [4, 2]);

    let before = adapter.uptime();
    adapter.sleep_ms(3);
    assert!(adapter.uptime() - before >= Duration::from_millis(3));
}

#[test]
fn test_deferred_threads_run_from_the_loop() {
    let (backend, adapter, _clock, _pins) = bare_metal(4096, FakeClock::manual());
    let hits = Hits::default();

    let spawn = |name: &str| {
        let h = hits.clone();
        adapter
            .spawn(&ThreadSpec::new(name), move || h.hit())
            .unwrap()
    };

    let _first = spawn("first");
    let _second = spawn("second");
    assert_eq!(hits.count(), 0);
    assert_eq!(backend.run_pending_threads(), 2);
    assert_eq!(hits.count(), 2);
    assert_eq!(backend.run_pending_threads(), 0);

    // Deleted before the loop got to it.
    let cancelled = spawn("cancelled");
    drop(cancelled);
    assert_eq!(backend.run_pending_threads(), 0);
    assert_eq!(hits.count(), 2);

    let _late = spawn("late");
    adapter.shutdown();
    assert_eq!(backend.run_pending_threads(), 0);
}

#[test]
fn test_soft_timers_follow_the_clock() {
    let (backend, adapter, clock, _pins) = bare_metal(4096, FakeClock::manual());
    let periodic = Hits::default();
    let once = Hits::default();

    let _periodic = {
        let h = periodic.clone();
        adapter
            .timer(Duration::from_millis(10), TimerMode::Periodic, move || h.hit())
            .unwrap()
    };
    let _once = {
        let h = once.clone();
        adapter
            .timer(Duration::from_millis(15), TimerMode::OneShot, move || h.hit())
            .unwrap()
    };

    assert_eq!(backend.poll_timers(), 0);
    clock.advance_ms(10);
    assert_eq!(backend.poll_timers(), 1);
    clock.advance_ms(10);
    assert_eq!(backend.poll_timers(), 2);

    // Missed periods collapse into one expiry.
    clock.advance_ms(35);
    assert_eq!(backend.poll_timers(), 1);
    clock.advance_ms(5);
    assert_eq!(backend.poll_timers(), 1);

    assert_eq!(periodic.count(), 4);
    assert_eq!(once.count(), 1);
}

#[test]
fn test_timer_past_clock_range_never_fires() {
    let (backend, adapter, clock, _pins) = bare_metal(4096, FakeClock::manual());
    clock.advance_ms(1);

    let far = Hits::default();
    let mut far_timers = [TimerMode::OneShot, TimerMode::Periodic].map(|mode| {
        let h = far.clone();
        adapter.timer(Duration::MAX, mode, move || h.hit()).unwrap()
    });
    let near = Hits::default();
    let _near = {
        let h = near.clone();
        adapter
            .timer(Duration::from_millis(5), TimerMode::OneShot, move || h.hit())
            .unwrap()
    };

    clock.advance_ms(1_000_000);
    assert_eq!(backend.poll_timers(), 1);
    assert_eq!(near.count(), 1);
    assert_eq!(far.count(), 0);

    for timer in &mut far_timers {
        timer.stop().unwrap();
    }
}

#[test]
fn test_gpio_interrupts_dispatch_from_isr() {
    let (backend, adapter, _clock, pins) = bare_metal(4096, FakeClock::manual());
    assert_eq!(adapter.backend().gpio_delivery(), DeliveryContext::Interrupt);

    assert_eq!(
        adapter.gpio_port(GpioPortId(0)).unwrap_err(),
        OsError::Invalid
    );
    let port = adapter.gpio_port(GpioPortId::DEFAULT).unwrap();
    assert_eq!(
        adapter.gpio_port(GpioPortId::DEFAULT).unwrap_err(),
        OsError::Invalid
    );

    port.config(3, &GpioConfig::new(GpioMode::INPUT)).unwrap();
    let hits = Hits::default();
    let h = hits.clone();
    port.on_interrupt(3, InterruptTrigger::RisingEdge, move |pin| {
        assert_eq!(pin, 3);
        h.hit();
    })
    .unwrap();
    assert_eq!(pins.trigger(3), InterruptTrigger::RisingEdge);

    assert_eq!(port.set_interrupt_raw(3, 6, None), Err(OsError::Invalid));
    assert_eq!(pins.trigger(3), InterruptTrigger::RisingEdge);

    pins.drive(3, PinLevel::High);
    assert_eq!(backend.handle_gpio_interrupt(), 1);
    assert_eq!(backend.handle_gpio_interrupt(), 0);
    assert_eq!(hits.count(), 1);
    assert_eq!(port.read(3), Ok(PinLevel::High));

    port.config(5, &GpioConfig::new(GpioMode::OUTPUT)).unwrap();
    port.write(5, PinLevel::High).unwrap();
    assert_eq!(pins.level(5), PinLevel::High);
    assert_eq!(port.read(5), Err(OsError::Invalid));
    assert_eq!(
        port.config(8, &GpioConfig::new(GpioMode::INPUT)),
        Err(OsError::Invalid)
    );
}

#[test]
fn test_failed_trigger_rolls_pin_back() {
    let (_backend, adapter, _clock, pins) = bare_metal(4096, FakeClock::manual());
    let port = adapter.gpio_port(GpioPortId::DEFAULT).unwrap();
    port.config(6, &GpioConfig::new(GpioMode::OUTPUT)).unwrap();

    pins.refuse_triggers();
    let armed = GpioConfig::new(GpioMode::INPUT).trigger(InterruptTrigger::AnyEdge);
    assert_eq!(port.config(6, &armed), Err(OsError::Fail));
    assert_eq!(pins.mode(6), GpioMode::OUTPUT);
    port.write(6, PinLevel::High).unwrap();

    // The rollback itself fails: the trigger error still wins.
    pins.limit_configure(1);
    assert_eq!(port.config(6, &armed), Err(OsError::Fail));
    assert_eq!(pins.mode(6), GpioMode::INPUT);
    assert_eq!(port.read(6), Err(OsError::Invalid));
}

#[test]
fn test_events_are_delivered_synchronously() {
    let (_backend, adapter, _clock, _pins) = bare_metal(4096, FakeClock::manual());
    assert_eq!(adapter.backend().event_delivery(), DeliveryContext::Caller);

    let hits = Hits::default();
    let h = hits.clone();
    let mut sub = adapter
        .subscribe(WIFI_EVENT, ANY_EVENT_ID, move |_| h.hit())
        .unwrap();

    adapter
        .post_wifi(WifiEvent::StaDisconnected, &[0; 4], Timeout::NonBlocking)
        .unwrap();
    assert_eq!(hits.count(), 1);

    sub.destroy().unwrap();
    adapter
        .post_wifi(WifiEvent::StaDisconnected, &[], Timeout::NonBlocking)
        .unwrap();
    assert_eq!(hits.count(), 1);
}

#[test]
fn test_lock_misuse_is_invalid() {
    let (backend, adapter, _clock, _pins) = bare_metal(4096, FakeClock::stepping(1000));

    let mutex = adapter.mutex().unwrap();
    let raw = mutex.raw().unwrap();
    assert_eq!(backend.mutex_unlock(raw), Err(OsError::Invalid));
    let guard = mutex.lock(Timeout::NonBlocking).unwrap();
    assert_eq!(mutex.lock(Timeout::NonBlocking).err(), Some(OsError::WouldBlock));
    assert_eq!(mutex.lock(Timeout::ms(2)).err(), Some(OsError::Timeout));
    guard.unlock().unwrap();

    let lock = adapter.spinlock().unwrap();
    assert_eq!(
        backend.spinlock_give(lock.raw().unwrap()),
        Err(OsError::Invalid)
    );
    drop(lock.take().unwrap());
}

#[test]
fn test_heap_budget_is_enforced() {
    let (_backend, adapter, _clock, _pins) = bare_metal(256, FakeClock::manual());

    assert_eq!(adapter.malloc(300).unwrap_err(), OsError::NoMemory);
    let mut held = Some(adapter.malloc(200).unwrap());
    assert_eq!(adapter.malloc(100).unwrap_err(), OsError::NoMemory);

    hosted_osal::mem::free(&mut held);
    let mut none: Option<hosted_osal::handle::Queue> = None;
    handle::destroy(&mut none).unwrap();

    let stats = adapter.heap_stats();
    assert_eq!(stats.free, 256);
    assert_eq!(stats.outstanding(), 0);
}
