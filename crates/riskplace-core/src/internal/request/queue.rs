use crate::internal::common::error::PlacementError;
use crate::internal::request::Request;
use crate::{GroupId, RequestId, Set, SimTime};

/// Pending requests of one scheduling pass.
///
/// Requests keep their insertion order, which is the order in which they are
/// offered to the schedulers.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    requests: Vec<Request>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    #[inline]
    pub fn push(&mut self, request: Request) {
        self.requests.push(request);
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Request] {
        &self.requests
    }

    pub fn get(&self, request_id: RequestId) -> crate::Result<&Request> {
        self.requests
            .iter()
            .find(|r| r.id() == request_id)
            .ok_or(PlacementError::RequestNotFound(request_id))
    }

    /// Removes and returns the requests that arrived in `[from, to)`.
    pub fn take_arrived(&mut self, from: SimTime, to: SimTime) -> Vec<Request> {
        let (arrived, rest) = std::mem::take(&mut self.requests)
            .into_iter()
            .partition(|r| (from..to).contains(&r.arrival()));
        self.requests = rest;
        arrived
    }

    #[inline]
    pub fn max_group(&self) -> Option<GroupId> {
        self.requests.iter().map(|r| r.group()).max()
    }

    pub fn group_count(&self) -> usize {
        self.requests
            .iter()
            .map(|r| r.group())
            .collect::<Set<_>>()
            .len()
    }

    /// Sheds the most recent cohort: removes every request having the maximal
    /// group id and returns them in their queue order.
    pub fn remove_newest_group(&mut self) -> Vec<Request> {
        let Some(newest) = self.max_group() else {
            return Vec::new();
        };
        let (shed, rest) = std::mem::take(&mut self.requests)
            .into_iter()
            .partition(|r| r.group() == newest);
        self.requests = rest;
        shed
    }

    pub fn into_vec(self) -> Vec<Request> {
        self.requests
    }
}

impl FromIterator<Request> for RequestQueue {
    fn from_iter<T: IntoIterator<Item = Request>>(iter: T) -> Self {
        RequestQueue {
            requests: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::tests::utils::request::RequestBuilder;
    use std::time::Duration;

    fn queue() -> RequestQueue {
        [
            RequestBuilder::cloud(1, 2, 2).group(1).arrival_secs(10).finish(),
            RequestBuilder::edge(2, 1, 1).group(2).arrival_secs(20).finish(),
            RequestBuilder::cloud(3, 2, 2).group(2).arrival_secs(30).finish(),
            RequestBuilder::edge(4, 1, 1).group(1).arrival_secs(40).finish(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_remove_newest_group() {
        let mut q = queue();
        assert_eq!(q.group_count(), 2);
        let shed = q.remove_newest_group();
        let ids: Vec<_> = shed.iter().map(|r| r.id().as_num()).collect();
        assert_eq!(ids, vec![2, 3]);
        let left: Vec<_> = q.iter().map(|r| r.id().as_num()).collect();
        assert_eq!(left, vec![1, 4]);

        assert_eq!(q.remove_newest_group().len(), 2);
        assert!(q.is_empty());
        assert!(q.remove_newest_group().is_empty());
        assert_eq!(q.max_group(), None);
    }

    #[test]
    fn test_take_arrived_window() {
        let mut q = queue();
        let arrived = q.take_arrived(Duration::from_secs(20), Duration::from_secs(40));
        let ids: Vec<_> = arrived.iter().map(|r| r.id().as_num()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_get_missing() {
        let q = queue();
        assert!(q.get(RequestId::new(3)).is_ok());
        assert!(matches!(
            q.get(RequestId::new(99)),
            Err(PlacementError::RequestNotFound(_))
        ));
    }
}
