//! Plot geometry and the debounced resampler

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tangent_core::TangentError;
use tangent_expr::CompiledExpr;
use tangent_numeric::{merge_asymptotes, sample, Sampling, Viewport};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What to plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub expression: String,
    pub variable: String,
    pub viewport: Viewport,
    pub px_width: u32,
}

impl PlotRequest {
    pub fn new(expression: impl Into<String>, viewport: Viewport, px_width: u32) -> Self {
        Self { expression: expression.into(), variable: "x".to_string(), viewport, px_width }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }
}

/// Plot geometry for one viewport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotFrame {
    pub viewport: Viewport,
    #[serde(flatten)]
    pub sampling: Sampling,
    /// Asymptote estimates with near duplicates merged
    pub merged_asymptotes: Vec<f64>,
}

pub type PlotResult = Result<PlotFrame, TangentError>;

/// Sample an expression across a viewport
pub fn plot(request: &PlotRequest) -> PlotResult {
    if !request.viewport.is_valid() {
        return Err(TangentError::invalid_input(format!(
            "viewport [{}, {}] is empty or not finite",
            request.viewport.min, request.viewport.max
        )));
    }
    let compiled = CompiledExpr::compile(&request.expression);
    if let Some(err) = compiled.error() {
        return Err(err.clone());
    }

    let sampling = sample(compiled.bind(&request.variable), request.viewport, request.px_width);
    let merged_asymptotes = merge_asymptotes(&sampling.asymptotes, request.viewport);
    Ok(PlotFrame { viewport: request.viewport, sampling, merged_asymptotes })
}

/// Defers sampling to the next frame tick
///
/// Scheduling again before the tick cancels the waiting request, so a burst
/// of viewport changes produces one frame. Frames are published on a watch
/// channel.
pub struct Resampler {
    frame: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    frames: Arc<watch::Sender<Option<PlotResult>>>,
}

impl Resampler {
    pub fn new(frame: Duration) -> Self {
        let (frames, _) = watch::channel(None);
        Self { frame, pending: Mutex::new(None), frames: Arc::new(frames) }
    }

    /// Replace any waiting request with `request`. Must run inside a tokio runtime.
    pub fn schedule(&self, request: PlotRequest) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                tracing::trace!("superseded pending resample");
            }
            previous.abort();
        }

        let frame = self.frame;
        let frames = Arc::clone(&self.frames);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(frame).await;
            let result = plot(&request);
            match &result {
                Ok(f) => tracing::debug!(
                    expression = %request.expression,
                    segments = f.sampling.segments.len(),
                    asymptotes = f.merged_asymptotes.len(),
                    "resampled"
                ),
                Err(e) => tracing::debug!(expression = %request.expression, error = %e, "resample failed"),
            }
            frames.send_replace(Some(result));
        }));
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PlotResult>> {
        self.frames.subscribe()
    }

    /// Most recently published frame
    pub fn latest(&self) -> Option<PlotResult> {
        self.frames.borrow().clone()
    }
}

impl Drop for Resampler {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
