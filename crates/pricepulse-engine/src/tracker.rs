use chrono::Utc;
use pricepulse_contracts::errors::PipelineError;
use pricepulse_contracts::events::EventWriter;
use pricepulse_contracts::products::{Product, ProductInput};
use serde_json::json;

use crate::pipeline::{event_payload, PricePipeline};

const FAILURE_PREFIX: &str = "Failed to add product.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Valuating,
    Succeeded { product_id: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Busy,
    BlankInput,
}

/// Accepted submission, handed back to [`Tracker::complete`].
#[derive(Debug)]
#[must_use = "a started submission keeps the tracker busy until completed"]
pub(crate) struct Submission {
    input: ProductInput,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Added(Product),
    Failed(String),
    Ignored(IgnoreReason),
}

/// Owns the tracked product list and runs one submission at a time through
/// the pipeline. Newest products come first.
pub struct Tracker {
    products: Vec<Product>,
    loading: bool,
    error: Option<String>,
    phase: Phase,
    events: EventWriter,
}

impl Tracker {
    pub fn new(events: EventWriter) -> Self {
        Self {
            products: Vec::new(),
            loading: false,
            error: None,
            phase: Phase::Idle,
            events,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Starts a submission. Ignored while another one is in flight or when
    /// the input value is blank; neither case touches the error slot.
    pub(crate) fn begin(&mut self, input: &ProductInput) -> Result<Submission, IgnoreReason> {
        if self.loading {
            return Err(IgnoreReason::Busy);
        }
        if input.is_blank() {
            return Err(IgnoreReason::BlankInput);
        }
        self.loading = true;
        self.error = None;
        self.phase = Phase::Resolving;
        self.events.record(
            "submission_started",
            event_payload(json!({ "kind": input.kind.as_str() })),
        );
        Ok(Submission {
            input: input.clone(),
        })
    }

    pub(crate) fn complete(&mut self, pipeline: &PricePipeline, submission: Submission) -> SubmitOutcome {
        let outcome = match self.run(pipeline, &submission.input) {
            Ok(product) => {
                self.events.record(
                    "product_added",
                    event_payload(json!({
                        "id": product.id,
                        "name": product.name,
                        "price": product.price,
                        "deal_status": product.deal_status.as_str(),
                    })),
                );
                self.phase = Phase::Succeeded {
                    product_id: product.id.clone(),
                };
                self.products.insert(0, product.clone());
                SubmitOutcome::Added(product)
            }
            Err(err) => {
                let message = format!("{FAILURE_PREFIX} {err}");
                self.events.record(
                    "submission_failed",
                    event_payload(json!({
                        "kind": submission.input.kind.as_str(),
                        "soft": err.is_soft(),
                        "error": message,
                    })),
                );
                self.error = Some(message.clone());
                self.phase = Phase::Failed {
                    message: message.clone(),
                };
                SubmitOutcome::Failed(message)
            }
        };
        self.loading = false;
        outcome
    }

    /// Runs one submission to completion; the only public entry, so the
    /// busy flag is always released.
    pub fn submit(&mut self, pipeline: &PricePipeline, input: &ProductInput) -> SubmitOutcome {
        match self.begin(input) {
            Ok(submission) => self.complete(pipeline, submission),
            Err(reason) => SubmitOutcome::Ignored(reason),
        }
    }

    fn run(&mut self, pipeline: &PricePipeline, input: &ProductInput) -> Result<Product, PipelineError> {
        let identity = pipeline
            .resolve_identity(input)?
            .filter(|identity| !identity.name.trim().is_empty())
            .ok_or(PipelineError::IdentityNotFound)?;
        self.phase = Phase::Valuating;
        let valuation = pipeline.analyze_valuation(&identity.name)?;
        Ok(Product::assemble(self.next_product_id(), identity, valuation))
    }

    fn next_product_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        while self.get(&millis.to_string()).is_some() {
            millis += 1;
        }
        millis.to_string()
    }

    /// Flips the notification flag of one product; `None` for unknown ids.
    pub fn toggle_notifications(&mut self, id: &str) -> Option<bool> {
        let product = self.products.iter_mut().find(|product| product.id == id)?;
        product.notifications = !product.notifications;
        let enabled = product.notifications;
        self.events.record(
            "notifications_toggled",
            event_payload(json!({ "id": id, "notifications": enabled })),
        );
        Some(enabled)
    }

    pub fn remove_product(&mut self, id: &str) -> Option<Product> {
        let index = self.products.iter().position(|product| product.id == id)?;
        let removed = self.products.remove(index);
        self.events.record(
            "product_removed",
            event_payload(json!({ "id": id, "name": removed.name })),
        );
        Some(removed)
    }
}
