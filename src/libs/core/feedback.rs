use crate::libs::core::account::FILL_ALL_FIELDS;
use crate::libs::storage::records::FeedbackRecord;
use crate::libs::storage::storage_traits::DocumentStore;
use crate::ChatError;
use std::sync::Arc;
use tracing::{error, info};

pub struct FeedbackService {
    store: Arc<dyn DocumentStore>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn submit_feedback(&self, name: &str, message: &str) -> Result<(), ChatError> {
        if name.is_empty() || message.is_empty() {
            return Err(ChatError::validation(FILL_ALL_FIELDS));
        }

        let record = FeedbackRecord::new(name.to_string(), message.to_string());
        match self.store.add_feedback(&record) {
            Ok(document) => {
                info!("feedback stored at {}", document.path());
                Ok(())
            }
            Err(err) => {
                error!("Error submitting feedback: {err}");
                Err(err.into())
            }
        }
    }
}
