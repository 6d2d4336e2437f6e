//! Caller-supplied diagnostic sink.
//!
//! Detection and matching report stage progress, candidate rejections and the
//! top ranked matches through this trait. Messages never affect control flow.

/// Receiver for human-readable diagnostic messages.
pub trait Diagnostics {
    fn note(&mut self, message: &str);
}

impl<F: FnMut(&str)> Diagnostics for F {
    fn note(&mut self, message: &str) {
        self(message)
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Diagnostics for Silent {
    fn note(&mut self, _message: &str) {}
}

/// Collects messages in order, mostly useful in tests and reports.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub messages: Vec<String>,
}

impl Diagnostics for Collected {
    fn note(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// Forward a message to the sink and mirror it as a `tracing` debug event.
pub fn emit(diag: &mut dyn Diagnostics, message: impl AsRef<str>) {
    let message = message.as_ref();
    tracing::debug!(target: "cardscan", "{}", message);
    diag.note(message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |m: &str| seen.push(m.to_owned());
            emit(&mut sink, "Image preprocessed");
            emit(&mut sink, format!("Found {} contours", 3));
        }
        assert_eq!(seen, vec!["Image preprocessed", "Found 3 contours"]);
    }

    #[test]
    fn collected_keeps_order() {
        let mut sink = Collected::default();
        emit(&mut sink, "a");
        emit(&mut sink, "b");
        assert_eq!(sink.messages, vec!["a", "b"]);
    }
}
