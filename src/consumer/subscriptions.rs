//! Tracks what a consumer is subscribed to, what the group has
//! assigned it, and where it is within each assigned partition.
//! `Inner::perform_assignment`/`synced_group` in
//! `consumer::coordinator` are the only writers; `consumer::fetcher`
//! and `consumer::consumer` are the readers driving the poll loop.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use errors::Result;
use protocol::Offset;
use network::TopicPartition;

/// Where a consumer stands within one assigned partition.
#[derive(Clone, Debug, Default)]
pub struct TopicPartitionState {
    /// Next offset to fetch from.
    pub position: Option<Offset>,
    /// Last offset successfully committed to the group.
    pub committed: Option<Offset>,
    pub paused: bool,
}

pub struct Subscriptions<'a> {
    /// Topics this consumer itself subscribed to.
    subscription: HashSet<Cow<'a, str>>,
    /// Topics the whole group is subscribed to, as learned from the
    /// leader's assignment pass (a superset of `subscription`).
    group_subscription: HashSet<String>,
    assignment: HashMap<TopicPartition<'static>, TopicPartitionState>,
}

impl<'a> Subscriptions<'a> {
    pub fn new<I, S>(topics: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<Cow<'a, str>>
    {
        let subscription: HashSet<Cow<'a, str>> = topics.into_iter().map(Into::into).collect();
        let group_subscription = subscription.iter().map(|t| t.clone().into_owned()).collect();

        Subscriptions {
            subscription,
            group_subscription,
            assignment: HashMap::new(),
        }
    }

    /// Topics this consumer itself subscribed to.
    pub fn topics(&self) -> Vec<&str> {
        self.subscription.iter().map(|t| t.as_ref()).collect()
    }

    /// Records the topics the group as a whole now covers, learned
    /// while the leader performs assignment.
    pub fn group_subscribe<'t, I>(&mut self, topics: I)
        where I: IntoIterator<Item = &'t String>
    {
        self.group_subscription = topics.into_iter().cloned().collect();
    }

    pub fn group_subscription(&self) -> &HashSet<String> {
        &self.group_subscription
    }

    /// Replaces the current assignment with what the group just handed
    /// this member, resetting position/committed tracking for
    /// partitions that weren't already assigned.
    pub fn assign_from_subscribed(&mut self, partitions: Vec<TopicPartition<'static>>) -> Result<()> {
        let mut assignment = HashMap::with_capacity(partitions.len());

        for tp in partitions {
            let state = self.assignment.remove(&tp).unwrap_or_default();
            assignment.insert(tp, state);
        }

        self.assignment = assignment;

        Ok(())
    }

    pub fn assigned_partitions(&self) -> Vec<TopicPartition<'static>> {
        self.assignment.keys().cloned().collect()
    }

    pub fn is_assigned(&self, tp: &TopicPartition<'static>) -> bool {
        self.assignment.contains_key(tp)
    }

    pub fn position(&self, tp: &TopicPartition<'static>) -> Option<Offset> {
        self.assignment.get(tp).and_then(|state| state.position)
    }

    pub fn seek(&mut self, tp: &TopicPartition<'static>, offset: Offset) {
        if let Some(state) = self.assignment.get_mut(tp) {
            state.position = Some(offset);
        }
    }

    pub fn committed(&self, tp: &TopicPartition<'static>) -> Option<Offset> {
        self.assignment.get(tp).and_then(|state| state.committed)
    }

    pub fn mark_committed(&mut self, tp: &TopicPartition<'static>, offset: Offset) {
        if let Some(state) = self.assignment.get_mut(tp) {
            state.committed = Some(offset);
        }
    }

    pub fn pause(&mut self, tp: &TopicPartition<'static>) {
        if let Some(state) = self.assignment.get_mut(tp) {
            state.paused = true;
        }
    }

    pub fn resume(&mut self, tp: &TopicPartition<'static>) {
        if let Some(state) = self.assignment.get_mut(tp) {
            state.paused = false;
        }
    }

    pub fn is_paused(&self, tp: &TopicPartition<'static>) -> bool {
        self.assignment.get(tp).map(|state| state.paused).unwrap_or(false)
    }

    /// Assigned, unpaused partitions, with the offset to start the next
    /// fetch at (the tracked position if we've started consuming it, or
    /// `None` to fall back to the configured auto-offset-reset policy).
    pub fn fetchable_partitions(&self) -> Vec<(TopicPartition<'static>, Option<Offset>)> {
        self.assignment
            .iter()
            .filter(|&(_, state)| !state.paused)
            .map(|(tp, state)| (tp.clone(), state.position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_then_track_position() {
        let mut subscriptions = Subscriptions::new(vec!["orders"]);
        assert_eq!(subscriptions.topics(), vec!["orders"]);

        let tp = TopicPartition::new("orders".to_owned(), 0);
        subscriptions.assign_from_subscribed(vec![tp.clone()]).unwrap();

        assert!(subscriptions.is_assigned(&tp));
        assert_eq!(subscriptions.position(&tp), None);

        subscriptions.seek(&tp, 42);
        assert_eq!(subscriptions.position(&tp), Some(42));

        subscriptions.mark_committed(&tp, 42);
        assert_eq!(subscriptions.committed(&tp), Some(42));
    }

    #[test]
    fn pause_excludes_from_fetchable() {
        let mut subscriptions = Subscriptions::new(vec!["orders"]);
        let tp = TopicPartition::new("orders".to_owned(), 0);
        subscriptions.assign_from_subscribed(vec![tp.clone()]).unwrap();

        subscriptions.pause(&tp);
        assert!(subscriptions.fetchable_partitions().is_empty());

        subscriptions.resume(&tp);
        assert_eq!(subscriptions.fetchable_partitions().len(), 1);
    }
}
