//! Progress bar widget
//!
//! Maps a fraction in [0, 1] onto a background offset inside a fixed-width
//! track. `update` only stores the target; a tick timer moves the rendered
//! offset towards it once the track width is known.

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::events::{EventSink, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    /// Track width not measurable yet
    Waiting,
    Moved,
    Settled,
}

#[derive(Debug)]
struct BarState {
    fraction: f64,
    label: String,
    width: Option<u32>,
    current: i64,
    rendered: Option<i64>,
    generation: u64,
    animating: bool,
}

impl BarState {
    fn step(&mut self, bar_id: &str, sink: &dyn EventSink) -> Tick {
        let Some(width) = self.width else {
            return Tick::Waiting;
        };
        let target = (self.fraction * width as f64).round() as i64;
        if target == self.current && self.rendered.is_some() {
            return Tick::Settled;
        }
        self.current = target;
        let offset = self.current - width as i64;
        self.rendered = Some(offset);
        sink.emit(UiEvent::BarRendered {
            bar_id: bar_id.to_string(),
            background_offset: offset,
            label: self.label.clone(),
        });
        Tick::Moved
    }
}

pub struct ProgressBar {
    id: String,
    tick: Duration,
    sink: Arc<dyn EventSink>,
    state: Arc<Mutex<BarState>>,
    timers: CancellationToken,
}

impl ProgressBar {
    /// `width` is `None` while the track graphic has not been measured
    pub fn new(
        id: impl Into<String>,
        width: Option<u32>,
        tick: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            id: id.into(),
            tick,
            sink,
            state: Arc::new(Mutex::new(BarState {
                fraction: 0.0,
                label: String::new(),
                width,
                current: 0,
                rendered: None,
                generation: 0,
                animating: false,
            })),
            timers: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Store a new target and restart the tick timer.
    ///
    /// `None`, NaN and values outside [0, 1] are ignored and leave the bar
    /// unchanged. Returns whether the value was accepted.
    pub async fn update(&self, fraction: Option<f64>, label: impl Into<String>) -> bool {
        let Some(fraction) = fraction else {
            return false;
        };
        if !(0.0..=1.0).contains(&fraction) {
            return false;
        }

        let mut state = self.state.lock().await;
        state.fraction = fraction;
        state.label = label.into();
        state.generation += 1;
        let generation = state.generation;

        if state.step(&self.id, self.sink.as_ref()) == Tick::Settled {
            state.animating = false;
            return true;
        }
        state.animating = true;
        drop(state);

        self.spawn_timer(generation);
        true
    }

    fn spawn_timer(&self, generation: u64) {
        let state = self.state.clone();
        let sink = self.sink.clone();
        let id = self.id.clone();
        let period = self.tick;
        let cancelled = self.timers.child_token();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately and `update` already stepped once
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let mut state = state.lock().await;
                        if state.generation != generation {
                            break;
                        }
                        if state.step(&id, sink.as_ref()) == Tick::Settled {
                            state.animating = false;
                            debug!("progress_bar_settled: {} offset={:?}", id, state.rendered);
                            break;
                        }
                    }
                }
            }
        });
    }

    /// The track became measurable (graphic loaded): re-apply the stored target
    pub async fn set_track_width(&self, width: u32) {
        let (fraction, label) = {
            let mut state = self.state.lock().await;
            state.width = Some(width);
            (state.fraction, state.label.clone())
        };
        self.update(Some(fraction), label).await;
    }

    pub async fn fraction(&self) -> f64 {
        self.state.lock().await.fraction
    }

    pub async fn label(&self) -> String {
        self.state.lock().await.label.clone()
    }

    /// Background offset currently drawn, `None` before the first render
    pub async fn rendered_offset(&self) -> Option<i64> {
        self.state.lock().await.rendered
    }

    /// Whether the tick timer is still running
    pub async fn is_animating(&self) -> bool {
        self.state.lock().await.animating
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.timers.cancel();
    }
}
