use std::error::Error;
use std::sync::Barrier;
use std::thread;

use crate::{Device, DeviceConfig, DeviceError, Mode};

fn device_in(mode: Mode) -> Result<Device, Box<dyn Error>> {
    let cfg = DeviceConfig::builder()
        .name("mode-test")
        .capacity(64)
        .default_mode(mode)
        .build()?;
    Ok(Device::new(cfg)?)
}

#[test]
fn fifo_across_many_writes() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::Shared)?;
    let handle = device.open()?;
    let chunks: [&[u8]; 4] = [b"one ", b"two ", b"three ", b"four"];
    for chunk in chunks.iter() {
        assert_eq!(handle.write(*chunk)?, chunk.len());
    }

    let expected: Vec<u8> = chunks.concat();
    let mut out = vec![0u8; expected.len()];
    assert_eq!(handle.read(&mut out)?, expected.len());
    assert_eq!(out, expected);
    Ok(())
}

#[test]
fn shared_mode_exposes_bytes_to_later_handles() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::Shared)?;
    let a = device.open()?;
    a.write(b"hello")?;

    let b = device.open()?;
    assert!(!b.is_private());
    let mut buf = [0u8; 8];
    assert_eq!(b.read(&mut buf)?, 5);
    assert_eq!(&buf[..5], b"hello");
    Ok(())
}

#[test]
fn isolated_mode_keeps_handles_apart() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::IsolatedMulti)?;
    let a = device.open()?;
    let b = device.open()?;
    assert!(a.is_private() && b.is_private());

    a.write(b"for a only")?;
    let mut buf = [0u8; 16];
    assert_eq!(b.read(&mut buf)?, 0);
    assert_eq!(device.shared_len(), 0);

    assert_eq!(a.read(&mut buf)?, 10);
    assert_eq!(&buf[..10], b"for a only");
    Ok(())
}

#[test]
fn isolated_sessions_have_independent_capacity() -> Result<(), Box<dyn Error>> {
    let cfg = DeviceConfig::builder()
        .capacity(4)
        .default_mode(Mode::IsolatedMulti)
        .build()?;
    let device = Device::new(cfg)?;
    let a = device.open()?;
    let b = device.open()?;
    assert_eq!(a.write(b"aaaa")?, 4);
    assert_eq!(b.write(b"bbbb")?, 4);
    assert_eq!(a.write(b"a"), Err(DeviceError::Overflow));
    Ok(())
}

#[test]
fn exclusive_mode_rejects_second_open_until_close() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::Shared)?;
    device.control(1)?;

    let first = device.open()?;
    assert_eq!(device.open().err(), Some(DeviceError::Busy));
    assert_eq!(device.open().err(), Some(DeviceError::Busy));

    first.close();
    let second = device.open()?;
    assert_eq!(second.mode(), Mode::ExclusiveSingle);
    Ok(())
}

#[test]
fn exclusive_owner_starts_from_drained_queue() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::ExclusiveSingle)?;
    let first = device.open()?;
    first.write(b"stale")?;
    first.close();

    let second = device.open()?;
    assert_eq!(second.pending(), 0);
    Ok(())
}

#[test]
fn concurrent_exclusive_opens_admit_one() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::Shared)?;
    device.control(1)?;
    let opened = Barrier::new(2);
    let (device, opened) = (&device, &opened);

    let results: Vec<Result<u64, DeviceError>> = thread::scope(|s| {
        let workers: Vec<_> = (0..2)
            .map(move |_| {
                s.spawn(move || {
                    let res = device.open();
                    // Hold any handle until both threads have tried.
                    opened.wait();
                    res.map(|handle| handle.id())
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().expect("open thread panicked")).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results.iter().filter(|r| **r == Err(DeviceError::Busy)).count(),
        1
    );
    Ok(())
}

#[test]
fn mode_change_does_not_affect_open_handles() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::IsolatedMulti)?;
    let private = device.open()?;
    device.set_mode(Mode::Shared);
    let shared = device.open()?;

    private.write(b"mine")?;
    assert_eq!(shared.pending(), 0);
    assert_eq!(private.pending(), 4);
    assert_eq!(private.mode(), Mode::IsolatedMulti);
    Ok(())
}

#[test]
fn shutdown_drains_shared_session() -> Result<(), Box<dyn Error>> {
    let device = device_in(Mode::Shared)?;
    let handle = device.open()?;
    handle.write(b"xyz")?;
    assert_eq!(device.shared_len(), 3);

    // The handle outlives the device and still sees the drained session.
    device.shutdown();
    assert_eq!(handle.pending(), 0);
    Ok(())
}
