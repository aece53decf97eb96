use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};
use serde_derive::{Deserialize, Serialize};
use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};

use fifodev::{Device, DeviceConfig, DeviceError, Handle};

#[derive(clap::Parser)]
#[clap(about = "Drives concurrent readers and writers against one fifodev device")]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "fifodev-bench.toml")]
    config: String,
    /// Mode command applied before the run: 0 shared, 1 exclusive-single, 2 isolated-multi.
    #[clap(long)]
    mode: Option<u32>,
    #[clap(long)]
    writers: Option<usize>,
    #[clap(long)]
    readers: Option<usize>,
    #[clap(long)]
    seconds: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct BenchConfig {
    device: DeviceConfig,
    writers: usize,
    readers: usize,
    /// Bytes offered per write call.
    chunk_size: usize,
    /// Operations a worker performs before closing and reopening its handle.
    ops_per_open: usize,
    seconds: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            device: DeviceConfig::default(),
            writers: 2,
            readers: 2,
            chunk_size: 16,
            ops_per_open: 1024,
            seconds: 5,
        }
    }
}

#[derive(Default)]
struct Totals {
    written: AtomicU64,
    read: AtomicU64,
    overflows: AtomicU64,
    busy: AtomicU64,
    opens: AtomicU64,
}

struct Run<'a> {
    device: &'a Device,
    cfg: &'a BenchConfig,
    closing: &'a AtomicBool,
    deadline: Instant,
    totals: &'a Totals,
}

impl<'a> Run<'a> {
    #[inline]
    fn should_stop(&self) -> bool {
        self.closing.load(Ordering::Relaxed) || Instant::now() >= self.deadline
    }

    /// Opens a handle, backing off while an exclusive owner holds the device.
    fn open(&self) -> Option<Handle> {
        while !self.should_stop() {
            match self.device.open() {
                Ok(handle) => {
                    self.totals.opens.fetch_add(1, Ordering::Relaxed);
                    return Some(handle);
                }
                Err(DeviceError::Busy) => {
                    self.totals.busy.fetch_add(1, Ordering::Relaxed);
                    thread::sleep(Duration::from_micros(200));
                }
                Err(e) => {
                    error!("open failed: {}", e);
                    return None;
                }
            }
        }
        None
    }

    fn writer(&self, id: usize) {
        let chunk = vec![b'a' + (id % 26) as u8; self.cfg.chunk_size];
        while let Some(handle) = self.open() {
            for _ in 0..self.cfg.ops_per_open {
                if self.should_stop() {
                    return;
                }
                match handle.write(chunk.as_slice()) {
                    Ok(n) => {
                        self.totals.written.fetch_add(n as u64, Ordering::Relaxed);
                    }
                    Err(DeviceError::Overflow) => {
                        self.totals.overflows.fetch_add(1, Ordering::Relaxed);
                        thread::yield_now();
                    }
                    Err(e) => {
                        error!("writer {}: {}", id, e);
                        return;
                    }
                }
            }
        }
    }

    fn reader(&self, id: usize) {
        let mut buf = vec![0u8; self.cfg.chunk_size.max(1) * 4];
        while let Some(handle) = self.open() {
            for _ in 0..self.cfg.ops_per_open {
                if self.should_stop() {
                    return;
                }
                match handle.read(buf.as_mut_slice()) {
                    Ok(0) => thread::yield_now(),
                    Ok(n) => {
                        self.totals.read.fetch_add(n as u64, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("reader {}: {}", id, e);
                        return;
                    }
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Overflow and busy logs fire per call under load.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("fifodev_bench=info,fifodev=error"),
    )
    .init();

    let opts: Opts = Opts::parse();
    let mut cfg: BenchConfig = confy::load_path(&opts.config)?;
    if let Some(writers) = opts.writers {
        cfg.writers = writers;
    }
    if let Some(readers) = opts.readers {
        cfg.readers = readers;
    }
    if let Some(seconds) = opts.seconds {
        cfg.seconds = seconds;
    }
    println!("{:?}", &cfg);

    let device = Device::new(cfg.device.clone())?;
    if let Some(cmd) = opts.mode {
        device.control(cmd)?;
    }

    let closing = Arc::new(AtomicBool::new(false));
    for signal in [SIGHUP, SIGINT, SIGQUIT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&closing))?;
    }

    let totals = Totals::default();
    let run = Run {
        device: &device,
        cfg: &cfg,
        closing: &closing,
        deadline: Instant::now() + Duration::from_secs(cfg.seconds),
        totals: &totals,
    };

    let start = Instant::now();
    thread::scope(|s| {
        let run = &run;
        for id in 0..cfg.writers {
            s.spawn(move || run.writer(id));
        }
        for id in 0..cfg.readers {
            s.spawn(move || run.reader(id));
        }
    });
    let duration = start.elapsed();

    if closing.load(Ordering::Relaxed) {
        info!("stopped by signal");
    }
    report(&totals, duration, device.current_mode());
    device.shutdown();
    Ok(())
}

fn report(totals: &Totals, duration: Duration, mode: fifodev::Mode) {
    let millis = duration.as_millis().max(1) as f64;
    let written = totals.written.load(Ordering::Relaxed);
    let read = totals.read.load(Ordering::Relaxed);
    println!("mode: {}", mode);
    println!(
        "written: {} bytes ({:.1}K/s), read: {} bytes ({:.1}K/s)",
        written,
        written as f64 / millis,
        read,
        read as f64 / millis
    );
    println!(
        "opens: {}, busy: {}, overflows: {}, time: {:#?}",
        totals.opens.load(Ordering::Relaxed),
        totals.busy.load(Ordering::Relaxed),
        totals.overflows.load(Ordering::Relaxed),
        duration
    );
}
