use kvscan_error::KvResult;

/// Caller-supplied sink that receives elements one at a time.
///
/// The core only calls [`accept`](StreamingChannel::accept) while the command
/// that was handed the channel is executing, from a single call at a time, and
/// never keeps the channel afterwards. An `Err` aborts delivery of the current
/// page and fails the command.
pub trait StreamingChannel<E> {
    fn accept(
        &mut self,
        element: E,
    ) -> KvResult<()>;
}

impl<E, F> StreamingChannel<E> for F
where
    F: FnMut(E) -> KvResult<()>,
{
    fn accept(
        &mut self,
        element: E,
    ) -> KvResult<()> {
        self(element)
    }
}

/// Channel that materializes every element it receives.
///
/// Bulk-mode commands run through the same delivery routine with a
/// `Collector`, so a bulk page and a streamed page of the same reply contain
/// the same elements in the same order.
#[derive(Debug)]
pub struct Collector<E> {
    elements: Vec<E>,
}

impl<E> Collector<E> {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn into_inner(self) -> Vec<E> {
        self.elements
    }
}

impl<E> Default for Collector<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> StreamingChannel<E> for Collector<E> {
    fn accept(
        &mut self,
        element: E,
    ) -> KvResult<()> {
        self.elements.push(element);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_channel() {
        let mut seen = Vec::new();
        {
            let mut channel = |n: u32| -> KvResult<()> {
                seen.push(n);
                Ok(())
            };
            channel.accept(1).unwrap();
            channel.accept(2).unwrap();
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_collector_keeps_order() {
        let mut c = Collector::new();
        for n in [3, 1, 2] {
            c.accept(n).unwrap();
        }
        assert_eq!(c.len(), 3);
        assert_eq!(c.into_inner(), vec![3, 1, 2]);
    }
}
