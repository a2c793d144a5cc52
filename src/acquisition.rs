//! # Acquisition Loop
//!
//! Connects to the device, turns incoming lines into samples and reconnects
//! whenever the link drops.
//!
//! Connection state is published on a `watch` channel so the UI can show
//! it. A `watch<bool>` shutdown signal stops the loop at any await point.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::serial::{PortProvider, SerialLink};
use crate::telemetry::{decode_line, lock_buffer, parse_line, ParseError, Sample, SharedBuffer};

/// Message shown when a live connection drops
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Attempting to reconnect...";

/// Connection status as seen by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Scanning ports
    Connecting,

    /// Receiving from a device
    Connected { port: String },

    /// Waiting before the next scan
    ///
    /// `lost_connection` is true when a live session just ended, and false
    /// when a scan found nothing to open.
    Disconnected { reason: String, lost_connection: bool },

    /// Acquisition has shut down
    Stopped,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected { .. })
    }
}

/// Why a read session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Stream closed or failed
    Disconnected(String),
    /// Shutdown was requested
    Shutdown,
}

/// Serial acquisition task
pub struct Acquisition<P: PortProvider> {
    provider: P,
    config: SerialConfig,
    buffer: SharedBuffer,
    recorder: Option<mpsc::Sender<Sample>>,
    state_tx: watch::Sender<LinkState>,
    shutdown: watch::Receiver<bool>,
    log_every: Option<u64>,
}

impl<P: PortProvider> Acquisition<P> {
    /// Create the task and the receiver for its connection state
    ///
    /// # Arguments
    ///
    /// * `provider` - Source of serial ports
    /// * `config` - Port, baud rate, timeouts and line delimiter
    /// * `buffer` - Shared sample buffer
    /// * `recorder` - Sender for samples to record, if recording
    /// * `shutdown` - Set to `true` (or drop the sender) to stop
    pub fn new(
        provider: P,
        config: SerialConfig,
        buffer: SharedBuffer,
        recorder: Option<mpsc::Sender<Sample>>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, watch::Receiver<LinkState>) {
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);

        let acquisition = Self {
            provider,
            config,
            buffer,
            recorder,
            state_tx,
            shutdown,
            log_every: None,
        };

        (acquisition, state_rx)
    }

    /// Log a summary at `info` every `n` accepted samples
    pub fn with_sample_log_interval(mut self, n: u64) -> Self {
        self.log_every = Some(n.max(1));
        self
    }

    /// Connect, read and reconnect until shutdown
    ///
    /// Each failed scan or dropped session is followed by a pause of
    /// `reconnect_interval_ms` before the next scan.
    pub async fn run(mut self) {
        let retry_delay = Duration::from_millis(self.config.reconnect_interval_ms);

        while !self.is_shutdown() {
            self.publish(LinkState::Connecting);

            match SerialLink::connect(&self.provider, &self.config) {
                Ok(link) => {
                    let port = link.device_path().to_string();
                    self.publish(LinkState::Connected { port: port.clone() });

                    match self.run_session(link.into_stream()).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Disconnected(reason) => {
                            warn!("Lost connection to {}: {}", port, reason);
                            warn!("{}", CONNECTION_LOST_MESSAGE);
                            self.publish(LinkState::Disconnected {
                                reason,
                                lost_connection: true,
                            });
                        }
                    }
                }
                Err(e) => {
                    info!("Disconnected: {}", e);
                    self.publish(LinkState::Disconnected {
                        reason: e.to_string(),
                        lost_connection: false,
                    });
                }
            }

            if self.wait_for_retry(retry_delay).await {
                break;
            }
        }

        info!("Acquisition stopped");
        self.publish(LinkState::Stopped);
    }

    /// Read lines from one open stream until it closes, fails or shutdown
    pub async fn run_session<R: AsyncRead + Unpin>(&mut self, stream: R) -> SessionEnd {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::with_capacity(64);

        loop {
            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut line) => read,
                _ = self.shutdown.changed() => return SessionEnd::Shutdown,
            };

            match read {
                Ok(0) => {
                    if !line.is_empty() {
                        self.handle_line(&line);
                    }
                    return SessionEnd::Disconnected("end of stream".to_string());
                }
                Ok(_) => {
                    self.handle_line(&line);
                    line.clear();
                }
                // Partial bytes stay in `line` and are completed by the next read
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return SessionEnd::Disconnected(e.to_string()),
            }
        }
    }

    /// Parse one raw line and store it
    ///
    /// # Returns
    ///
    /// * `Option<Sample>` - The stored sample, or `None` if the line was discarded
    pub fn handle_line(&mut self, raw: &[u8]) -> Option<Sample> {
        let text = decode_line(raw);

        let reading = match parse_line(&text, self.config.delimiter) {
            Ok(reading) => reading,
            Err(ParseError::Empty) => {
                debug!("Skipping empty line");
                return None;
            }
            Err(e) => {
                warn!("Discarding line {:?}: {}", text, e);
                return None;
            }
        };

        let sample = lock_buffer(&self.buffer).push(reading);
        debug!("Sample {}: {:?}", sample.time, sample.reading);

        if self.should_log_sample(sample.time) {
            let r = &sample.reading;
            info!(
                "Sample {}: {:.2} °C, {:.2} V, {:.3} A, {:.2} W",
                sample.time, r.temperature, r.voltage, r.current, r.power
            );
        }

        if let Some(tx) = &self.recorder {
            match tx.try_send(sample.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(dropped)) => {
                    warn!("Recorder is falling behind, sample {} not recorded", dropped.time);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Recorder has stopped, samples will no longer be recorded");
                    self.recorder = None;
                }
            }
        }

        Some(sample)
    }

    fn should_log_sample(&self, time: u64) -> bool {
        self.log_every.map_or(false, |n| time % n == 0)
    }

    fn publish(&self, state: LinkState) {
        self.state_tx.send_replace(state);
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep before the next scan; returns `true` if shutdown arrived first
    async fn wait_for_retry(&mut self, delay: Duration) -> bool {
        let interrupted = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown.changed() => true,
        };
        interrupted || self.is_shutdown()
    }
}
