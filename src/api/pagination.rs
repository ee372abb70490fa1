// src/api/pagination.rs
//! Cursor pagination over list endpoints.

use crate::error::AppError;

/// One page of results from a cursor-paginated endpoint.
#[derive(Debug)]
pub struct PageBatch<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Lazy iterator over all items of a paginated endpoint.
///
/// Batches are fetched on demand, so a caller that stops early (for
/// example a targeted single-page backup) never pays for the pages it
/// does not consume. A fetch error is yielded as an `Err` item and
/// ends the iteration.
pub struct Paginated<'a, T> {
    fetch: Box<dyn FnMut(Option<&str>) -> Result<PageBatch<T>, AppError> + 'a>,
    buffer: std::vec::IntoIter<T>,
    cursor: Option<String>,
    started: bool,
    done: bool,
}

impl<'a, T> Paginated<'a, T> {
    pub fn new<F>(fetch: F) -> Self
    where
        F: FnMut(Option<&str>) -> Result<PageBatch<T>, AppError> + 'a,
    {
        Self {
            fetch: Box::new(fetch),
            buffer: Vec::new().into_iter(),
            cursor: None,
            started: false,
            done: false,
        }
    }
}

impl<T> Iterator for Paginated<'_, T> {
    type Item = Result<T, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            // First call has no cursor; later calls resume where the
            // previous batch left off.
            if self.started && self.cursor.is_none() {
                return None;
            }
            self.started = true;

            match (self.fetch)(self.cursor.as_deref()) {
                Ok(batch) => {
                    self.cursor = batch.next_cursor;
                    if !batch.has_more || self.cursor.is_none() {
                        self.done = true;
                        self.cursor = None;
                    }
                    if batch.results.is_empty() && self.done {
                        return None;
                    }
                    self.buffer = batch.results.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    self.cursor = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(items: &[u32], next: Option<&str>) -> PageBatch<u32> {
        PageBatch {
            results: items.to_vec(),
            next_cursor: next.map(String::from),
            has_more: next.is_some(),
        }
    }

    #[test]
    fn walks_all_batches_in_order() {
        let iter = Paginated::new(|cursor| match cursor {
            None => Ok(batch(&[1, 2], Some("c1"))),
            Some("c1") => Ok(batch(&[3], Some("c2"))),
            Some("c2") => Ok(batch(&[4, 5], None)),
            other => panic!("unexpected cursor {:?}", other),
        });
        let items: Vec<u32> = iter.map(Result::unwrap).collect();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_batch_terminates() {
        let iter = Paginated::new(|_| Ok(batch(&[7], None)));
        let items: Vec<u32> = iter.map(Result::unwrap).collect();
        assert_eq!(items, vec![7]);
    }

    #[test]
    fn empty_endpoint_yields_nothing() {
        let mut iter = Paginated::new(|_| Ok(batch(&[], None)));
        assert!(iter.next().is_none());
    }

    #[test]
    fn early_stop_skips_later_fetches() {
        let mut fetches = 0u32;
        {
            let mut iter = Paginated::new(|_| {
                fetches += 1;
                Ok(batch(&[1, 2, 3], Some("more")))
            });
            assert_eq!(iter.next().unwrap().unwrap(), 1);
            assert_eq!(iter.next().unwrap().unwrap(), 2);
        }
        assert_eq!(fetches, 1);
    }

    #[test]
    fn fetch_error_ends_iteration() {
        let mut iter = Paginated::new(|cursor| match cursor {
            None => Ok(batch(&[1], Some("c1"))),
            _ => Err(AppError::MalformedResponse("bad batch".to_string())),
        });
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
