use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use serialport::SerialPortInfo;

use crate::protocol::{self, LineAssembler, Reading};

const READ_TIMEOUT: Duration = Duration::from_millis(50);
// No sensor line comes close to this; a longer run means the terminator was lost.
const MAX_PENDING_BYTES: usize = 4096;

#[derive(Debug)]
pub enum LinkEvent {
    Reading(Reading),
    Error(String),
    Closed,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("sensor link worker is gone")]
    Disconnected,
}

/// Owns the worker thread that talks to the sensor.
///
/// The worker holds the port and the line buffer. Parsed readings reach the
/// UI loop through the event channel in arrival order.
pub struct SensorLink {
    tx: Sender<Vec<u8>>,
    close_tx: Sender<()>,
    worker: JoinHandle<()>,
}

impl SensorLink {
    pub fn connect(
        port_name: &str,
        baud_rate: u32,
    ) -> Result<(Self, Receiver<LinkEvent>), LinkError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| LinkError::Open {
                port: port_name.to_string(),
                source,
            })?;
        info!(port = port_name, baud_rate, "sensor link opened");
        Ok(Self::spawn(port))
    }

    pub fn spawn<P>(port: P) -> (Self, Receiver<LinkEvent>)
    where
        P: Read + Write + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel::<LinkEvent>();
        let (write_tx, write_rx) = mpsc::channel::<Vec<u8>>();
        let (close_tx, close_rx) = mpsc::channel::<()>();

        let worker = thread::spawn(move || {
            run_worker(port, write_rx, close_rx, &event_tx);
            let _ = event_tx.send(LinkEvent::Closed);
        });

        let link = Self {
            tx: write_tx,
            close_tx,
            worker,
        };
        (link, event_rx)
    }

    pub fn request_reading(&self, request_byte: u8) -> Result<(), LinkError> {
        self.tx
            .send(vec![request_byte])
            .map_err(|_| LinkError::Disconnected)
    }

    pub fn close(self) {
        let _ = self.close_tx.send(());
        if self.worker.join().is_err() {
            warn!("sensor link worker panicked");
        }
        info!("sensor link closed");
    }
}

fn run_worker<P: Read + Write>(
    mut port: P,
    write_rx: Receiver<Vec<u8>>,
    close_rx: Receiver<()>,
    event_tx: &Sender<LinkEvent>,
) {
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 1024];

    loop {
        match write_rx.try_recv() {
            Ok(data) => {
                if let Err(e) = port.write_all(&data).and_then(|_| port.flush()) {
                    warn!("write error: {e}");
                    let _ = event_tx.send(LinkEvent::Error(format!("write error: {e}")));
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }

        match port.read(&mut buf) {
            Ok(n) if n > 0 => {
                for record in assembler.push(&buf[..n]) {
                    debug!(line = %record, "data received from sensor");
                    match protocol::parse_record(&record) {
                        Ok(reading) => {
                            if event_tx.send(LinkEvent::Reading(reading)).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(line = %record, "dropping record: {e}"),
                    }
                }
                if assembler.pending() > MAX_PENDING_BYTES {
                    warn!(bytes = assembler.pending(), "no line terminator, discarding buffer");
                    assembler.clear();
                }
            }
            Ok(_) => {}
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!("read error: {e}");
                let _ = event_tx.send(LinkEvent::Error(format!("read error: {e}")));
                break;
            }
        }

        if close_rx.try_recv().is_ok() {
            break;
        }
    }
}

pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().context("list available ports")?;
    Ok(ports)
}
