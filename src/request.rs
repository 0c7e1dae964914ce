//! The request queue (§4.1).

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::error::{AcquireError, ErrorCode};

/// One pending `acquire` call.
pub struct Request<V> {
    pub id: u64,
    pub created_at: Instant,
    /// `Some` for an aging request, `None` for an ageless one.
    pub deadline: Option<Instant>,
    pub origin: Option<String>,
    completion: Option<oneshot::Sender<Result<V, AcquireError>>>,
}

impl<V> Request<V> {
    pub fn new(
        id: u64,
        created_at: Instant,
        deadline: Option<Instant>,
        origin: Option<String>,
        completion: oneshot::Sender<Result<V, AcquireError>>,
    ) -> Self {
        Self {
            id,
            created_at,
            deadline,
            origin,
            completion: Some(completion),
        }
    }

    /// Fire the completion exactly once (§3 invariant 5). A second call
    /// is a no-op, guarding against the programmer error of completing a
    /// request twice from two different code paths.
    pub fn complete(mut self, result: Result<V, AcquireError>) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(result);
        }
    }

    pub fn fail(self, code: ErrorCode) {
        let origin = self.origin.clone();
        self.complete(Err(AcquireError::new(code, origin)));
    }
}

/// Holds pending acquire requests split by deadline class (§4.1).
///
/// `aging` stays sorted by ascending deadline so the head can be
/// timeout-checked in O(1); `ageless` is plain FIFO.
#[derive(Default)]
pub struct RequestQueue<V> {
    aging: VecDeque<Request<V>>,
    ageless: VecDeque<Request<V>>,
    next_id: u64,
}

impl<V> RequestQueue<V> {
    pub fn new() -> Self {
        Self {
            aging: VecDeque::new(),
            ageless: VecDeque::new(),
            next_id: 0,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub fn len(&self) -> usize {
        self.aging.len() + self.ageless.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an aging request, keeping the queue sorted by ascending
    /// deadline (§3 invariant 7); ties preserve enqueue order by
    /// inserting after any existing entry with an equal deadline.
    pub fn push_aging(&mut self, request: Request<V>) {
        let deadline = request
            .deadline
            .expect("push_aging requires a request with a deadline");
        let pos = self
            .aging
            .iter()
            .position(|r| r.deadline.expect("aging request") > deadline)
            .unwrap_or(self.aging.len());
        self.aging.insert(pos, request);
    }

    pub fn push_ageless(&mut self, request: Request<V>) {
        self.ageless.push_back(request);
    }

    /// Pop and fail every aging request whose deadline has passed.
    pub fn expire_aging(&mut self, now: Instant) -> Vec<Request<V>> {
        let mut expired = Vec::new();
        while let Some(front) = self.aging.front() {
            if front.deadline.expect("aging request") < now {
                expired.push(self.aging.pop_front().expect("front exists"));
            } else {
                break;
            }
        }
        expired
    }

    pub fn pop_aging(&mut self) -> Option<Request<V>> {
        self.aging.pop_front()
    }

    pub fn pop_ageless(&mut self) -> Option<Request<V>> {
        self.ageless.pop_front()
    }

    /// Drain every queued request (used by drain, §4.6).
    pub fn drain_all(&mut self) -> Vec<Request<V>> {
        let mut all: Vec<_> = self.aging.drain(..).collect();
        all.extend(self.ageless.drain(..));
        all
    }

    #[cfg(test)]
    pub fn aging_is_sorted(&self) -> bool {
        self.aging
            .iter()
            .zip(self.aging.iter().skip(1))
            .all(|(a, b)| a.deadline <= b.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(id: u64, deadline_ms: u64, now: Instant) -> (Request<()>, oneshot::Receiver<Result<(), AcquireError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Request::new(
                id,
                now,
                Some(now + std::time::Duration::from_millis(deadline_ms)),
                None,
                tx,
            ),
            rx,
        )
    }

    #[test]
    fn aging_stays_sorted_on_insert() {
        let now = Instant::now();
        let mut queue: RequestQueue<()> = RequestQueue::new();
        let (r1, _rx1) = req(1, 300, now);
        let (r2, _rx2) = req(2, 100, now);
        let (r3, _rx3) = req(3, 200, now);
        queue.push_aging(r1);
        queue.push_aging(r2);
        queue.push_aging(r3);
        assert!(queue.aging_is_sorted());
        assert_eq!(queue.pop_aging().unwrap().id, 2);
        assert_eq!(queue.pop_aging().unwrap().id, 3);
        assert_eq!(queue.pop_aging().unwrap().id, 1);
    }

    #[tokio::test]
    async fn complete_fires_exactly_once() {
        let (tx, rx) = oneshot::channel();
        let request = Request::new(0, Instant::now(), None, None, tx);
        request.complete(Ok(()));
        assert_eq!(rx.await.unwrap(), Ok(()));
    }
}
