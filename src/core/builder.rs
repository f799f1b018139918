use std::sync::Arc;

use super::{config::Config, context::Context, supervisor::Supervisor};
use crate::model::Physiology;
use crate::subscribers::Subscribe;
use crate::tasks::{AlertSink, StdoutSink};

/// Builder for a [`Supervisor`] with optional collaborators.
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    patient: Option<Arc<dyn Physiology>>,
    sink: Option<Arc<dyn AlertSink>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            patient: None,
            sink: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Each one gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the built-in linear patient model.
    pub fn with_patient(mut self, patient: Arc<dyn Physiology>) -> Self {
        self.patient = Some(patient);
        self
    }

    /// Replaces standard output as the destination of alert lines.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the shared [`Context`] and the supervisor around it.
    pub fn build(self) -> Supervisor {
        let ctx = match self.patient {
            Some(patient) => Context::with_patient(self.cfg, patient),
            None => Context::new(self.cfg),
        };
        let sink = self.sink.unwrap_or_else(|| Arc::new(StdoutSink));
        Supervisor::new_internal(ctx, self.subscribers, sink)
    }
}
