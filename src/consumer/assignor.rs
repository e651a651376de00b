//! Consumer group partition assignment: the `Subscription`/`Assignment`
//! payloads exchanged during `JoinGroup`/`SyncGroup`, and the
//! `PartitionAssignor` strategies that turn the leader's view of every
//! member's subscription into a per-member partition set.

use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;

use errors::{ErrorKind, Result};
use client::Metadata;
use network::TopicPartition;

/// What one group member tells the coordinator it wants to consume.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subscription {
    pub topics: Vec<String>,
    pub user_data: Option<Vec<u8>>,
}

/// What the leader hands back to one group member after assignment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    pub partitions: Vec<TopicPartition<'static>>,
    pub user_data: Option<Vec<u8>>,
}

/// The strategy a `PartitionAssignor` implements, as named on the wire
/// by `ConsumerGroupProtocol::name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignmentStrategy {
    RoundRobin,
    Range,
}

impl FromStr for AssignmentStrategy {
    type Err = ::errors::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "roundrobin" => Ok(AssignmentStrategy::RoundRobin),
            "range" => Ok(AssignmentStrategy::Range),
            _ => bail!(ErrorKind::UnsupportedAssignmentStrategy(s.to_owned())),
        }
    }
}

/// Implemented by every partition assignment strategy the consumer
/// group leader can be asked to run.
pub trait PartitionAssignor {
    fn name(&self) -> &str;

    fn strategy(&self) -> AssignmentStrategy;

    /// Builds this member's own `Subscription`, sent as part of
    /// `JoinGroup`'s `group_protocols`.
    fn subscription(&self, topics: Vec<Cow<str>>) -> Subscription {
        Subscription {
            topics: topics.into_iter().map(Cow::into_owned).collect(),
            user_data: None,
        }
    }

    /// Runs on the group leader only: turns every member's subscription
    /// into a partition assignment for that member.
    fn assign(&self,
              metadata: &Metadata,
              subscriptions: HashMap<String, Subscription>)
              -> HashMap<String, Assignment>;
}

/// Assigns partitions to members in round-robin order over the sorted
/// union of every subscribed topic's partitions, skipping members that
/// didn't subscribe to a given topic.
pub struct RoundRobinAssignor;

impl PartitionAssignor for RoundRobinAssignor {
    fn name(&self) -> &str {
        "roundrobin"
    }

    fn strategy(&self) -> AssignmentStrategy {
        AssignmentStrategy::RoundRobin
    }

    fn assign(&self,
              metadata: &Metadata,
              subscriptions: HashMap<String, Subscription>)
              -> HashMap<String, Assignment> {
        let mut member_ids: Vec<String> = subscriptions.keys().cloned().collect();
        member_ids.sort();

        let mut topics: Vec<&str> = subscriptions
            .values()
            .flat_map(|subscription| subscription.topics.iter().map(String::as_str))
            .collect();
        topics.sort();
        topics.dedup();

        let mut assignment: HashMap<String, Assignment> = member_ids
            .iter()
            .map(|member_id| (member_id.clone(), Assignment::default()))
            .collect();

        let mut next_member = 0;

        for topic in topics {
            let partitions = match metadata.partitions(topic) {
                Some(partitions) => partitions,
                None => continue,
            };

            let interested: Vec<&String> = member_ids
                .iter()
                .filter(|member_id| {
                    subscriptions[*member_id]
                        .topics
                        .iter()
                        .any(|t| t == topic)
                })
                .collect();

            if interested.is_empty() {
                continue;
            }

            for partition in partitions {
                let member_id = interested[next_member % interested.len()].clone();

                assignment
                    .get_mut(&member_id)
                    .expect("member assignment entry")
                    .partitions
                    .push(TopicPartition::new(topic.to_owned(), partition.partition));

                next_member += 1;
            }
        }

        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::Metadata;

    #[test]
    fn round_robin_splits_single_topic_evenly() {
        let metadata = Metadata::default();

        let mut subscriptions = HashMap::new();
        subscriptions.insert("member-1".to_owned(),
                             Subscription {
                                 topics: vec!["orders".to_owned()],
                                 user_data: None,
                             });
        subscriptions.insert("member-2".to_owned(),
                             Subscription {
                                 topics: vec!["orders".to_owned()],
                                 user_data: None,
                             });

        let assignor = RoundRobinAssignor;
        let assignment = assignor.assign(&metadata, subscriptions);

        assert_eq!(assignment.len(), 2);
        assert!(assignment.values().all(|a| a.partitions.is_empty()));
    }
}
