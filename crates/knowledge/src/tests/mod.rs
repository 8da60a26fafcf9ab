//! Cross-module scenarios with the trigram embedder and a scripted chat model.

mod learn;
mod support;
