//! The replay controller: streams buffered bars to an [`OutputSink`] at a
//! client-configured tick cadence, driven by `play`/`pause` commands and
//! kept topped up by a background prefetch task.

pub mod sink;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Duration as TokioDuration, Interval};

use crate::bar::Bar;
use crate::bar_source::{Aggregator, BarStore};
use crate::config::EngineConfig;
use crate::error::ReplayError;
use crate::persistence::model::SymbolId;
use crate::replay::sink::{OutputSink, ReplayTick};
use crate::time::Timeframe;

/// Commands a client may send to a running [`ReplayController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Command {
    Play {
        frame: Timeframe,
        #[serde(rename = "chartFrame")]
        chart_frame: Timeframe,
        seconds: u64,
        rth: bool,
    },
    Pause,
}

impl Command {
    /// Validates a `Play` command the way the original's `PlayCommand.Valid`
    /// does: both frames must be non-empty and the tick cadence positive.
    pub fn validate(&self) -> Result<(), ReplayError> {
        match self {
            Command::Play { frame, chart_frame, seconds, .. } => {
                if frame.is_empty() {
                    return Err(ReplayError::InvalidPlayCommand("frame is empty".into()));
                }
                if chart_frame.is_empty() {
                    return Err(ReplayError::InvalidPlayCommand("chartFrame is empty".into()));
                }
                if *seconds == 0 {
                    return Err(ReplayError::InvalidPlayCommand("seconds must be positive".into()));
                }
                Ok(())
            }
            Command::Pause => Ok(()),
        }
    }
}

struct SharedState {
    paused: bool,
    timeframe: Timeframe,
    chart_frame: Timeframe,
    rth: bool,
    current_millis: i64,
    buffers: HashMap<SymbolId, Vec<Bar>>,
}

/// Streams bars for a fixed set of symbols, starting at `start_millis`,
/// over two cooperating background tasks: a ticker that pops buffered bars
/// on a timer, and a prefetch loop that keeps the buffers topped up.
pub struct ReplayController {
    command_tx: mpsc::UnboundedSender<Command>,
    shutdown: Arc<tokio::sync::Notify>,
}

impl ReplayController {
    /// Spawns the ticker and prefetch tasks and returns a handle that can
    /// send [`Command`]s to them.
    pub fn spawn<S, O>(
        symbol_ids: Vec<SymbolId>,
        start_millis: i64,
        aggregator: Arc<Aggregator<S>>,
        config: Arc<EngineConfig>,
        sink: Arc<O>,
    ) -> Self
    where
        S: BarStore + 'static,
        O: OutputSink + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let refresh_now = Arc::new(tokio::sync::Notify::new());
        let shutdown = Arc::new(tokio::sync::Notify::new());

        let state = Arc::new(Mutex::new(SharedState {
            paused: true,
            timeframe: Timeframe::default(),
            chart_frame: Timeframe::default(),
            rth: false,
            current_millis: start_millis,
            buffers: symbol_ids.iter().map(|s| (*s, Vec::new())).collect(),
        }));

        tokio::spawn(ticker_loop(state.clone(), command_rx, sink, refresh_now.clone(), shutdown.clone()));
        tokio::spawn(prefetch_loop(symbol_ids, state, aggregator, config, refresh_now, shutdown.clone()));

        Self { command_tx, shutdown }
    }

    pub fn play(&self, frame: Timeframe, chart_frame: Timeframe, seconds: u64, rth: bool) -> Result<(), ReplayError> {
        self.send(Command::Play { frame, chart_frame, seconds, rth })
    }

    pub fn pause(&self) -> Result<(), ReplayError> {
        self.send(Command::Pause)
    }

    /// Pauses, then signals both the ticker and prefetch loops to exit.
    pub fn close(self) -> Result<(), ReplayError> {
        self.pause()?;
        self.shutdown.notify_waiters();
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), ReplayError> {
        command.validate()?;
        self.command_tx.send(command).map_err(|_| ReplayError::ChannelClosed)
    }
}

async fn ticker_loop<O: OutputSink>(
    state: Arc<Mutex<SharedState>>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    sink: Arc<O>,
    refresh_now: Arc<tokio::sync::Notify>,
    shutdown: Arc<tokio::sync::Notify>,
) {
    let mut ticker: Interval = tokio::time::interval(TokioDuration::from_secs(1));

    loop {
        tokio::select! {
            _ = shutdown.notified() => return,
            command = command_rx.recv() => {
                match command {
                    None => return,
                    Some(Command::Play { frame, chart_frame, seconds, rth }) => {
                        tracing::info!(%frame, %chart_frame, seconds, rth, "play command received");
                        let mut guard = state.lock().await;
                        guard.paused = false;
                        guard.timeframe = frame;
                        guard.chart_frame = chart_frame;
                        guard.rth = rth;
                        for buffer in guard.buffers.values_mut() {
                            buffer.clear();
                        }
                        drop(guard);
                        // A freshly constructed interval's first tick fires
                        // immediately, so the next select! iteration emits
                        // right away without an extra manual tick here.
                        ticker = tokio::time::interval(TokioDuration::from_secs(seconds.max(1)));
                        refresh_now.notify_one();
                    }
                    Some(Command::Pause) => {
                        tracing::info!("pause command received");
                        state.lock().await.paused = true;
                    }
                }
            }
            _ = ticker.tick() => {
                let mut guard = state.lock().await;
                if guard.paused {
                    continue;
                }

                let timeframe = guard.timeframe;
                let current = guard.current_millis;
                let next_boundary = current + timeframe.millis();

                let mut tick = ReplayTick::default();
                for (symbol_id, buffer) in guard.buffers.iter_mut() {
                    let mut emitted = Vec::new();
                    while let Some(first) = buffer.first() {
                        if first.date_millis <= current || first.date_millis - current <= timeframe.millis() {
                            emitted.push(buffer.remove(0));
                        } else {
                            break;
                        }
                    }
                    if emitted.is_empty() {
                        emitted.push(Bar::dummy(next_boundary));
                    }
                    tick.bars.insert(*symbol_id, emitted);
                }
                guard.current_millis = next_boundary;
                drop(guard);

                sink.send(tick).await;
            }
        }
    }
}

async fn prefetch_loop<S: BarStore>(
    symbol_ids: Vec<SymbolId>,
    state: Arc<Mutex<SharedState>>,
    aggregator: Arc<Aggregator<S>>,
    config: Arc<EngineConfig>,
    refresh_now: Arc<tokio::sync::Notify>,
    shutdown: Arc<tokio::sync::Notify>,
) {
    let mut interval = tokio::time::interval(TokioDuration::from_secs(config.replay.prefetch_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = shutdown.notified() => return,
            _ = interval.tick() => {}
            _ = refresh_now.notified() => {}
        }

        let (paused, timeframe, chart_frame, rth, current_millis, short_lengths) = {
            let guard = state.lock().await;
            let short: Vec<(SymbolId, usize)> = symbol_ids
                .iter()
                .map(|id| (*id, guard.buffers.get(id).map(Vec::len).unwrap_or(0)))
                .collect();
            (guard.paused, guard.timeframe, guard.chart_frame, guard.rth, guard.current_millis, short)
        };

        if paused || timeframe.is_empty() {
            continue;
        }

        let fetch_frame = if chart_frame.millis() < timeframe.millis() { chart_frame } else { timeframe };
        let window_end = current_millis + (config.replay.fetch_threshold as i64) * timeframe.millis();

        for (symbol_id, len) in short_lengths {
            if len > config.replay.fetch_threshold {
                continue;
            }
            let Some(start) = chrono::DateTime::from_timestamp_millis(current_millis) else { continue };
            let Some(end) = chrono::DateTime::from_timestamp_millis(window_end) else { continue };

            if let Ok(new_bars) = aggregator.get_bars_between(symbol_id, fetch_frame, start, end, rth).await {
                let mut guard = state.lock().await;
                if let Some(buffer) = guard.buffers.get_mut(&symbol_id) {
                    let last_date = buffer.last().map(|b| b.date_millis).unwrap_or(i64::MIN);
                    buffer.extend(new_bars.into_iter().filter(|b| b.date_millis > last_date));
                }
            }
        }
    }
}
