use std::pin::Pin;

/// A boxed async stream, used for generator streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;
